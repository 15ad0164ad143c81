use proptest::prelude::*;
use v8core_host::reference;
use v8core_host::*;

/// 在新的 isolate/上下文中运行脚本，并把结果交给 `check`
fn with_context(check: impl FnOnce(&ContextScope<'_>)) {
    reference::install().unwrap();
    V8::auto_ensures_init().unwrap();
    let mut isolate = Isolate::create_on_current_thread().unwrap();
    let scope = HandleScope::new(&mut isolate).unwrap();
    let ctx = LocalContext::create(&scope);
    let ctx_scope = ContextScope::new(&scope, ctx);
    check(&ctx_scope);
}

fn eval_to_string(ctx_scope: &ContextScope<'_>, source: &str) -> V8Result<String> {
    let code = LocalJsString::create(ctx_scope, source)?;
    let script = LocalScript::compile(ctx_scope, code)?;
    let value = script.run(ctx_scope)?;
    let text = value.as_js_string(ctx_scope)?;
    Ok(text.to_string(ctx_scope, WriteOptions::NO_OPTIONS))
}

#[test]
fn test_end_to_end_evaluation() {
    with_context(|ctx_scope| {
        // 简单表达式
        assert_eq!(eval_to_string(ctx_scope, "1+1").unwrap(), "2");

        // 超出安全整数范围
        assert_eq!(
            eval_to_string(ctx_scope, "2 ** 64").unwrap(),
            "18446744073709552000"
        );

        // 模板字符串与指数形式
        assert_eq!(
            eval_to_string(ctx_scope, "`result ${12 ** 37}`").unwrap(),
            "result 8.505622024417979e+39"
        );
    });
}

#[test]
fn test_failures_are_reported() {
    with_context(|ctx_scope| {
        assert_eq!(
            eval_to_string(ctx_scope, "1 +").unwrap_err(),
            V8Error::CompilationFailed
        );
        assert_eq!(
            eval_to_string(ctx_scope, "throw 'boom'").unwrap_err(),
            V8Error::ExecutionFailed
        );
        assert_eq!(
            eval_to_string(ctx_scope, "Symbol('tag')").unwrap_err(),
            V8Error::CastFailed
        );
        // 失败之后 scope 仍然可用
        assert_eq!(eval_to_string(ctx_scope, "'still' + ' alive'").unwrap(), "still alive");
    });
}

#[test]
fn test_value_probes_are_exclusive() {
    let cases = [
        ("undefined", "undefined"),
        ("null", "object"),
        ("true", "boolean"),
        ("false", "boolean"),
        ("'text'", "string"),
        ("Symbol()", "symbol"),
        ("42", "number"),
    ];
    with_context(|ctx_scope| {
        for (source, expected_type) in cases {
            let code = LocalJsString::create(ctx_scope, source).unwrap();
            let value = LocalScript::compile(ctx_scope, code)
                .unwrap()
                .run(ctx_scope)
                .unwrap();

            let hits = [
                value.is_undefined(),
                value.is_null(),
                value.is_true(),
                value.is_false(),
                value.is_string(),
                value.is_symbol(),
            ];
            let expected_hits = usize::from(source != "42");
            assert_eq!(
                hits.iter().filter(|hit| **hit).count(),
                expected_hits,
                "probes for {}",
                source
            );
            assert_eq!(value.is_null_or_undefined(), value.is_null() || value.is_undefined());
            assert_eq!(value.is_name(), value.is_string() || value.is_symbol());

            let type_name = value.type_of(ctx_scope);
            assert_eq!(type_name.to_string(ctx_scope, WriteOptions::NO_OPTIONS), expected_type);
        }
    });
}

#[test]
fn test_isolate_rejects_other_threads() {
    reference::install().unwrap();
    V8::auto_ensures_init().unwrap();
    let mut isolate = Isolate::create_on_current_thread().unwrap();
    let owner = isolate.owner_thread();

    std::thread::scope(|s| {
        s.spawn(|| {
            assert_ne!(std::thread::current().id(), owner);
            assert_eq!(HandleScope::new(&mut isolate).unwrap_err(), V8Error::WrongThread);
            assert_eq!(isolate.as_ref().unwrap_err(), V8Error::WrongThread);
        });
    });

    // 回到创建线程后恢复可用
    assert!(HandleScope::new(&mut isolate).is_ok());
}

#[test]
fn test_isolate_dispose_is_idempotent() {
    reference::install().unwrap();
    V8::auto_ensures_init().unwrap();
    let before = reference::stats();
    {
        let mut isolate = Isolate::create_on_current_thread().unwrap();
        isolate.dispose();
        isolate.dispose();
        assert!(isolate.is_disposed());
        assert_eq!(HandleScope::new(&mut isolate).unwrap_err(), V8Error::IsolateDisposed);
    }
    let after = reference::stats();
    assert_eq!(after.isolates_created - before.isolates_created, 1);
    assert_eq!(after.isolates_released - before.isolates_released, 1);
}

#[test]
fn test_create_params_reach_the_engine() {
    reference::install().unwrap();
    V8::auto_ensures_init().unwrap();
    let params = CreateParams::new()
        .allow_atomics_wait(false)
        .heap_limits(0, 1 << 20)
        .embedder_wrapper_type_info_offsets(0, 1);
    let _isolate = Isolate::create_on_current_thread_with(params).unwrap();

    let received = reference::last_create_params().unwrap();
    assert_eq!(received.allow_atomics_wait.as_opt(), Some(false));
    assert_eq!(received.only_terminate_in_safe_scope.as_opt(), None);
    assert!(received.set_heap_limits);
    assert_eq!(received.heap_limits_max, 1 << 20);
    assert!(received.set_embedder_wrapper_type_info_offsets);
    assert_eq!(received.embedder_wrapper_object_index, 1);
}

#[test]
fn test_config_driven_initialization() -> anyhow::Result<()> {
    let config = BindingConfig::from_toml_str(
        r#"
        [platform]
        thread_pool_size = 2

        [isolate]
        allow_atomics_wait = true

        [logging]
        level = "Debug"
        "#,
    )?;
    reference::install()?;
    V8::initialize_with_config(&config)?;
    assert!(V8::is_initialized());

    // 日志订阅者按配置安装（RUST_LOG 存在时以它为准）
    let directive = v8core_host::core::logging::active_directive();
    assert!(directive.is_some());
    if std::env::var_os("RUST_LOG").is_none() {
        assert_eq!(directive, Some("v8core=debug"));
    }

    let mut isolate = Isolate::create_on_current_thread_with(CreateParams::from(&config.isolate))?;
    let scope = HandleScope::new(&mut isolate)?;
    let ctx_scope = ContextScope::new(&scope, LocalContext::create(&scope));
    assert_eq!(eval_to_string(&ctx_scope, "typeof 1")?, "number");
    assert_eq!(
        reference::last_create_params().map(|p| p.allow_atomics_wait.as_opt()),
        Some(Some(true))
    );
    Ok(())
}

#[test]
fn test_invalid_config_is_rejected_before_setup() {
    let config = BindingConfig::from_toml_str(
        r#"
        [isolate.heap_limits]
        initial = 4096
        max = 1024
        "#,
    )
    .unwrap();
    assert!(matches!(
        V8::initialize_with_config(&config),
        Err(V8Error::Registry(RegistryError::Config(_)))
    ));
}

#[test]
fn test_deep_nesting_fails_to_compile_without_overflow() {
    // 在默认大小的线程栈上编译，深层嵌套必须报告编译失败
    let compiled = std::thread::spawn(|| {
        reference::install().unwrap();
        V8::auto_ensures_init().unwrap();
        let mut isolate = Isolate::create_on_current_thread().unwrap();
        let scope = HandleScope::new(&mut isolate).unwrap();
        let ctx_scope = ContextScope::new(&scope, LocalContext::create(&scope));

        let deep = format!("{}1{}", "(".repeat(1000), ")".repeat(1000));
        let code = LocalJsString::create(&ctx_scope, &deep).unwrap();
        let deep_result = LocalScript::try_compile(&ctx_scope, code).is_some();

        let shallow = format!("{}1{}", "(".repeat(32), ")".repeat(32));
        let code = LocalJsString::create(&ctx_scope, &shallow).unwrap();
        let shallow_result = LocalScript::try_compile(&ctx_scope, code).is_some();
        (deep_result, shallow_result)
    })
    .join()
    .unwrap();
    assert_eq!(compiled, (false, true));
}

#[test]
fn test_registry_reports_static_source() {
    reference::install().unwrap();
    V8::auto_ensures_init().unwrap();
    let registry = Registry::get().unwrap();
    assert_eq!(registry.source(), &RegistrySource::Static);
    assert_eq!(registry.abi_version(), abi::ABI_VERSION);
    assert!(V8::version().unwrap().ends_with("-reference"));
}

proptest! {
    #[test]
    fn prop_utf16_round_trip(text in "\\PC{0,64}") {
        reference::install().unwrap();
        V8::auto_ensures_init().unwrap();
        let mut isolate = Isolate::create_on_current_thread().unwrap();
        let scope = HandleScope::new(&mut isolate).unwrap();

        let js = LocalJsString::create(&scope, &text).unwrap();
        prop_assert_eq!(js.length(), text.encode_utf16().count());
        prop_assert_eq!(js.to_string(&scope, WriteOptions::NO_OPTIONS), text);
    }

    #[test]
    fn prop_lone_surrogates_survive_utf16(units in proptest::collection::vec(any::<u16>(), 0..32)) {
        reference::install().unwrap();
        V8::auto_ensures_init().unwrap();
        let mut isolate = Isolate::create_on_current_thread().unwrap();
        let scope = HandleScope::new(&mut isolate).unwrap();

        let js = LocalJsString::create_utf16(&scope, &units).unwrap();
        prop_assert_eq!(js.to_utf16(&scope, WriteOptions::NO_NULL_TERMINATION), units);
    }
}
