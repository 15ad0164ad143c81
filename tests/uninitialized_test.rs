//! 引擎初始化是进程级状态，未初始化场景单独放在一个测试进程中

use v8core_host::reference;
use v8core_host::*;

#[test]
fn test_isolate_requires_initialized_engine() {
    let registry = reference::install().unwrap();
    assert_eq!(registry.source(), &RegistrySource::Static);
    assert!(!V8::is_initialized());

    assert_eq!(
        Isolate::create_on_current_thread().unwrap_err(),
        V8Error::Uninitialized
    );
    assert_eq!(
        Isolate::create_on_current_thread_with(CreateParams::new()).unwrap_err(),
        V8Error::Uninitialized
    );
    assert_eq!(V8::current_platform().unwrap_err(), V8Error::Uninitialized);

    // initialize 没有 platform 时不会生效
    V8::initialize().unwrap();
    assert!(!V8::is_initialized());

    // platform 的创建不依赖初始化
    let platform = Platform::new(1, false).unwrap();
    V8::initialize_platform(&platform).unwrap();
    V8::initialize().unwrap();
    assert!(V8::is_initialized());

    assert_eq!(V8::current_platform().unwrap(), &platform);
    assert!(Isolate::create_on_current_thread().is_ok());
}
