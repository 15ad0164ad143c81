//! 参考引擎导出的函数表
//!
//! 句柄编码：
//! - `OwnedIsolateOpaque` / `IsolateOpaque*` 指向 `IsolateState`
//! - `HandleScopeOpaque` 指向 `ScopeCell`
//! - `ContextScopeOpaque` 指向 `ContextScopeState`
//! - 局部上下文、脚本、字符串、值都指向所属帧中的 `Slot`
//! - `PlatformOpaque` 第一个字保存 `Arc<PlatformState>` 的裸指针

use super::eval::{self, Value};
use super::heap::{IsolateState, ScopeCell, Slot};
use super::{record, set_last_params};
use crate::abi::*;
use std::ffi::{c_int, c_void};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

const TARGET: &str = "v8core::reference";

/// 与宿主 `WriteOptions::NO_NULL_TERMINATION` 相同的位
const NO_NULL_TERMINATION: c_int = 2;

static VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "-reference");

static INITIALIZED: AtomicBool = AtomicBool::new(false);
static PLATFORM: Mutex<Option<SharedPtrOpaque>> = Mutex::new(None);

struct PlatformState {
    thread_pool_size: u32,
    idle_task_support: bool,
    single_threaded: bool,
}

struct ContextScopeState {
    isolate: *mut IsolateState,
    id: u64,
    /// 外层 scope 本体的副本（同一个 `ScopeCell`）
    isolate_scope: HandleScopeOpaque,
    /// 进入上下文后的 scope 本体
    context_scope: HandleScopeOpaque,
}

// ============================================================================
// 句柄编解码
// ============================================================================

unsafe fn scope_cell<'a>(scope: *mut HandleScopeOpaque) -> Option<&'a ScopeCell> {
    let scope = scope.as_ref()?;
    (scope.0 as *const ScopeCell).as_ref()
}

unsafe fn slot<'a>(ptr: *const c_void) -> Option<&'a Slot> {
    (ptr as *const Slot).as_ref()
}

unsafe fn value_at<'a>(ptr: *const ValueOpaque) -> Option<&'a Value> {
    match slot(ptr as *const c_void)? {
        Slot::Value(value) => Some(value),
        _ => None,
    }
}

unsafe fn string_at<'a>(ptr: LocalStringOpaque) -> Option<&'a [u16]> {
    match slot(ptr.0)? {
        Slot::Value(Value::String(units)) => Some(units),
        _ => None,
    }
}

/// 在 scope 的当前帧中分配
unsafe fn alloc_in(scope: *mut HandleScopeOpaque, slot: Slot) -> Option<*mut Slot> {
    let cell = scope_cell(scope)?;
    let state = cell.isolate.as_mut()?;
    state.alloc(cell.frame, slot)
}

/// 需要已进入上下文的 scope
unsafe fn entered_cell<'a>(scope: *mut HandleScopeOpaque, operation: &str) -> Option<&'a ScopeCell> {
    let cell = scope_cell(scope)?;
    if cell.context.is_none() {
        tracing::debug!(target: TARGET, "{} requires an entered context", operation);
        return None;
    }
    Some(cell)
}

fn platform_bits(state: Arc<PlatformState>) -> PlatformOpaque {
    tracing::trace!(
        target: TARGET,
        "Platform created (threads: {}, idle tasks: {}, single-threaded: {})",
        state.thread_pool_size,
        state.idle_task_support,
        state.single_threaded
    );
    PlatformOpaque(SharedPtrOpaque([Arc::into_raw(state) as usize, 0]))
}

fn lossy(units: &[u16]) -> String {
    String::from_utf16_lossy(units)
}

// ============================================================================
// V8
// ============================================================================

unsafe extern "C" fn v8_initialize_platform(ptr: PlatformOpaque) {
    let previous = match PLATFORM.lock() {
        Ok(mut guard) => guard.replace(ptr.0),
        Err(poisoned) => poisoned.into_inner().replace(ptr.0),
    };
    if let Some(previous) = previous {
        platform_drop(PlatformOpaque(previous));
    }
    tracing::debug!(target: TARGET, "Platform {:#x} installed", ptr.0 .0[0]);
}

unsafe extern "C" fn v8_initialize() {
    let has_platform = match PLATFORM.lock() {
        Ok(guard) => guard.is_some(),
        Err(poisoned) => poisoned.into_inner().is_some(),
    };
    if !has_platform {
        tracing::error!(target: TARGET, "initialize called before a platform was installed");
        return;
    }
    INITIALIZED.store(true, Ordering::Release);
}

unsafe extern "C" fn v8_auto_ensures_init() {
    let mut guard = match PLATFORM.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    if INITIALIZED.load(Ordering::Acquire) {
        return;
    }
    if guard.is_none() {
        *guard = Some(platform_ctor(0, false).0);
    }
    INITIALIZED.store(true, Ordering::Release);
    tracing::info!(target: TARGET, "Reference engine initialized");
}

unsafe extern "C" fn v8_is_initialized() -> bool {
    INITIALIZED.load(Ordering::Acquire)
}

unsafe extern "C" fn v8_current_platform() -> PlatformOpaque {
    let current = match PLATFORM.lock() {
        Ok(guard) => *guard,
        Err(poisoned) => *poisoned.into_inner(),
    };
    match current {
        Some(bits) => platform_clone(PlatformOpaque(bits)),
        None => PlatformOpaque(SharedPtrOpaque([0, 0])),
    }
}

unsafe extern "C" fn v8_version() -> ByteSlice {
    ByteSlice::new(VERSION.as_bytes())
}

// ============================================================================
// Platform
// ============================================================================

unsafe extern "C" fn platform_drop(ptr: PlatformOpaque) {
    let raw = ptr.0 .0[0] as *const PlatformState;
    if raw.is_null() {
        return;
    }
    record(|stats| stats.platform_releases += 1);
    drop(Arc::from_raw(raw));
}

unsafe extern "C" fn platform_clone(ptr: PlatformOpaque) -> PlatformOpaque {
    let raw = ptr.0 .0[0] as *const PlatformState;
    if raw.is_null() {
        return ptr;
    }
    Arc::increment_strong_count(raw);
    record(|stats| stats.platform_clones += 1);
    ptr
}

unsafe extern "C" fn platform_ctor(thread_pool_size: u32, idle_task_support: bool) -> PlatformOpaque {
    record(|stats| stats.platforms_created += 1);
    platform_bits(Arc::new(PlatformState {
        thread_pool_size,
        idle_task_support,
        single_threaded: false,
    }))
}

unsafe extern "C" fn platform_ctor_single_threaded(idle_task_support: bool) -> PlatformOpaque {
    record(|stats| stats.platforms_created += 1);
    platform_bits(Arc::new(PlatformState {
        thread_pool_size: 0,
        idle_task_support,
        single_threaded: true,
    }))
}

// ============================================================================
// Isolate
// ============================================================================

unsafe extern "C" fn isolate_drop(ptr: OwnedIsolateOpaque) {
    let raw = ptr.0 as *mut IsolateState;
    if raw.is_null() {
        return;
    }
    let state = Box::from_raw(raw);
    if state.open_frames() > 0 {
        tracing::warn!(
            target: TARGET,
            "Isolate dropped with {} open HandleScope(s)",
            state.open_frames()
        );
    }
    record(|stats| stats.isolates_released += 1);
}

unsafe extern "C" fn isolate_ctor(params: IsolateCreateParams) -> OwnedIsolateOpaque {
    set_last_params(params);
    record(|stats| stats.isolates_created += 1);
    let state = Box::new(IsolateState::new(params));
    OwnedIsolateOpaque(Box::into_raw(state) as usize)
}

unsafe extern "C" fn isolate_ctor_default() -> OwnedIsolateOpaque {
    isolate_ctor(IsolateCreateParams::default())
}

unsafe extern "C" fn isolate_deref(ptr: *mut OwnedIsolateOpaque) -> *mut IsolateOpaque {
    match ptr.as_ref() {
        Some(owned) => owned.0 as *mut IsolateOpaque,
        None => std::ptr::null_mut(),
    }
}

// ============================================================================
// HandleScope
// ============================================================================

unsafe extern "C" fn handle_scope_ctor_isolate(ptr: *mut OwnedIsolateOpaque) -> HandleScopeOpaque {
    let isolate = isolate_deref(ptr) as *mut IsolateState;
    let Some(state) = isolate.as_mut() else {
        tracing::error!(target: TARGET, "HandleScope opened on a null isolate");
        return HandleScopeOpaque(0);
    };
    let frame = state.open_frame();
    record(|stats| stats.handle_scopes_opened += 1);
    let cell = Box::new(ScopeCell {
        isolate,
        frame,
        context: None,
    });
    HandleScopeOpaque(Box::into_raw(cell) as usize)
}

unsafe extern "C" fn handle_scope_deref_to_isolate(ptr: *mut HandleScopeOpaque) -> *mut IsolateOpaque {
    match scope_cell(ptr) {
        Some(cell) => cell.isolate as *mut IsolateOpaque,
        None => std::ptr::null_mut(),
    }
}

unsafe extern "C" fn handle_scope_drop(ptr: HandleScopeOpaque) {
    let raw = ptr.0 as *mut ScopeCell;
    if raw.is_null() {
        return;
    }
    let cell = Box::from_raw(raw);
    if let Some(state) = cell.isolate.as_mut() {
        state.close_frame(cell.frame);
    }
    record(|stats| stats.handle_scopes_closed += 1);
}

// ============================================================================
// Context / ContextScope
// ============================================================================

unsafe extern "C" fn context_ctor(scope: *mut HandleScopeOpaque) -> LocalContextOpaque {
    let Some(cell) = scope_cell(scope) else {
        return LocalContextOpaque(0);
    };
    let Some(state) = cell.isolate.as_mut() else {
        return LocalContextOpaque(0);
    };
    let id = state.new_context();
    match state.alloc(cell.frame, Slot::Context(id)) {
        Some(slot) => LocalContextOpaque(slot as usize),
        None => LocalContextOpaque(0),
    }
}

unsafe extern "C" fn context_scope_ctor_isolate(
    scope: *mut HandleScopeOpaque,
    ctx: LocalContextOpaque,
) -> ContextScopeOpaque {
    let Some(cell) = scope_cell(scope) else {
        return ContextScopeOpaque(0);
    };
    let Some(state) = cell.isolate.as_mut() else {
        return ContextScopeOpaque(0);
    };
    let context = match slot(ctx.0 as *const c_void) {
        Some(Slot::Context(id)) => Some(*id),
        _ => {
            tracing::error!(target: TARGET, "ContextScope opened with an invalid context handle");
            None
        }
    };
    let id = state.enter_context();
    record(|stats| stats.context_scopes_opened += 1);

    let entered = Box::new(ScopeCell {
        isolate: cell.isolate,
        frame: cell.frame,
        context,
    });
    let scope_state = Box::new(ContextScopeState {
        isolate: cell.isolate,
        id,
        isolate_scope: HandleScopeOpaque((*scope).0),
        context_scope: HandleScopeOpaque(Box::into_raw(entered) as usize),
    });
    ContextScopeOpaque(Box::into_raw(scope_state) as usize)
}

unsafe fn context_scope_state<'a>(ptr: *mut ContextScopeOpaque) -> Option<&'a mut ContextScopeState> {
    let ptr = ptr.as_ref()?;
    (ptr.0 as *mut ContextScopeState).as_mut()
}

unsafe extern "C" fn context_scope_drop(ptr: ContextScopeOpaque) {
    let raw = ptr.0 as *mut ContextScopeState;
    if raw.is_null() {
        return;
    }
    let scope_state = Box::from_raw(raw);
    drop(Box::from_raw(scope_state.context_scope.0 as *mut ScopeCell));
    if let Some(state) = scope_state.isolate.as_mut() {
        state.exit_context(scope_state.id);
    }
    record(|stats| stats.context_scopes_closed += 1);
}

unsafe extern "C" fn context_scope_deref_to_isolate(ptr: *mut ContextScopeOpaque) -> *mut IsolateOpaque {
    match context_scope_state(ptr) {
        Some(scope_state) => scope_state.isolate as *mut IsolateOpaque,
        None => std::ptr::null_mut(),
    }
}

unsafe extern "C" fn context_scope_deref_to_isolate_scope(ptr: *mut ContextScopeOpaque) -> HandleScopeObject {
    HandleScopeObject {
        ptr: match context_scope_state(ptr) {
            Some(scope_state) => &mut scope_state.isolate_scope as *mut HandleScopeOpaque,
            None => std::ptr::null_mut(),
        },
        vt: &HANDLE_SCOPE_IMPL_VTABLE,
    }
}

unsafe extern "C" fn context_scope_deref_to_context_scope(ptr: *mut ContextScopeOpaque) -> HandleScopeObject {
    HandleScopeObject {
        ptr: match context_scope_state(ptr) {
            Some(scope_state) => &mut scope_state.context_scope as *mut HandleScopeOpaque,
            None => std::ptr::null_mut(),
        },
        vt: &HANDLE_SCOPE_IMPL_VTABLE,
    }
}

// ============================================================================
// Script
// ============================================================================

unsafe extern "C" fn script_ctor_compile(
    scope: *mut HandleScopeOpaque,
    source: LocalStringOpaque,
    ret: *mut LocalScriptOpaque,
) -> bool {
    if entered_cell(scope, "compile").is_none() || ret.is_null() {
        return false;
    }
    let Some(source) = string_at(source) else {
        return false;
    };
    let program = match eval::compile(source) {
        Ok(program) => program,
        Err(err) => {
            tracing::debug!(target: TARGET, "{}", err);
            return false;
        }
    };
    match alloc_in(scope, Slot::Script(program)) {
        Some(slot) => {
            *ret = LocalScriptOpaque(slot as usize);
            true
        }
        None => false,
    }
}

unsafe extern "C" fn script_run(
    ptr: LocalScriptOpaque,
    scope: *mut HandleScopeOpaque,
    ret: *mut LocalValueOpaque,
) -> bool {
    if entered_cell(scope, "run").is_none() || ret.is_null() {
        return false;
    }
    let Some(Slot::Script(program)) = slot(ptr.0 as *const c_void) else {
        return false;
    };
    let value = match program.run() {
        Ok(value) => value,
        Err(thrown) => {
            let message = eval::to_js_string(&thrown)
                .map(|units| lossy(&units))
                .unwrap_or_else(|_| "Symbol()".to_string());
            tracing::debug!(target: TARGET, "Uncaught {}", message);
            return false;
        }
    };
    match alloc_in(scope, Slot::Value(value)) {
        Some(slot) => {
            *ret = LocalValueOpaque(slot as *mut c_void);
            true
        }
        None => false,
    }
}

// ============================================================================
// Value
// ============================================================================

unsafe extern "C" fn value_deref(ptr: LocalValueOpaque) -> *const ValueOpaque {
    ptr.0 as *const ValueOpaque
}

unsafe extern "C" fn value_type_of(ptr: *const ValueOpaque, scope: *mut HandleScopeOpaque) -> LocalStringOpaque {
    let Some(value) = value_at(ptr) else {
        return LocalStringOpaque::null();
    };
    let name = Value::string(eval::type_of(value));
    match alloc_in(scope, Slot::Value(name)) {
        Some(slot) => LocalStringOpaque(slot as *mut c_void),
        None => LocalStringOpaque::null(),
    }
}

macro_rules! probe {
    ($name:ident, $pattern:pat) => {
        unsafe extern "C" fn $name(ptr: *const ValueOpaque) -> bool {
            matches!(value_at(ptr), Some($pattern))
        }
    };
}

probe!(value_is_undefined, Value::Undefined);
probe!(value_is_null, Value::Null);
probe!(value_is_null_or_undefined, Value::Null | Value::Undefined);
probe!(value_is_true, Value::Bool(true));
probe!(value_is_false, Value::Bool(false));
probe!(value_is_name, Value::String(_) | Value::Symbol(_));
probe!(value_is_string, Value::String(_));
probe!(value_is_symbol, Value::Symbol(_));

unsafe extern "C" fn value_to_string(
    ptr: *const ValueOpaque,
    scope: *mut HandleScopeOpaque,
    ret: *mut LocalStringOpaque,
) -> bool {
    if entered_cell(scope, "ToString").is_none() || ret.is_null() {
        return false;
    }
    let Some(value) = value_at(ptr) else {
        return false;
    };
    let units = match eval::to_js_string(value) {
        Ok(units) => units,
        Err(_) => {
            tracing::debug!(target: TARGET, "Cannot convert a Symbol value to a string");
            return false;
        }
    };
    match alloc_in(scope, Slot::Value(Value::String(units))) {
        Some(slot) => {
            *ret = LocalStringOpaque(slot as *mut c_void);
            true
        }
        None => false,
    }
}

// ============================================================================
// String
// ============================================================================

unsafe extern "C" fn string_ctor_utf16(
    scope: *mut HandleScopeOpaque,
    buffer: *const CharSlice,
    ret: *mut LocalStringOpaque,
) -> bool {
    let (Some(cell), Some(buffer)) = (scope_cell(scope), buffer.as_ref()) else {
        return false;
    };
    if ret.is_null() {
        return false;
    }
    let Some(state) = cell.isolate.as_mut() else {
        return false;
    };
    let bytes = buffer.len() * std::mem::size_of::<u16>();
    if let Some(limit) = state.heap_limit() {
        if bytes > limit {
            tracing::debug!(
                target: TARGET,
                "String of {} bytes exceeds heap limit of {} bytes",
                bytes,
                limit
            );
            return false;
        }
    }
    match state.alloc(cell.frame, Slot::Value(Value::String(buffer.to_vec()))) {
        Some(slot) => {
            *ret = LocalStringOpaque(slot as *mut c_void);
            true
        }
        None => false,
    }
}

unsafe extern "C" fn string_len(ptr: LocalStringOpaque) -> usize {
    string_at(ptr).map_or(0, <[u16]>::len)
}

unsafe extern "C" fn string_read_utf16(
    ptr: LocalStringOpaque,
    _scope: *mut IsolateOpaque,
    buffer: *mut CharSliceMut,
    start: usize,
    options: c_int,
) -> usize {
    let (Some(units), Some(buffer)) = (string_at(ptr), buffer.as_mut()) else {
        return 0;
    };
    let out: &mut [u16] = buffer;
    let available = units.len().saturating_sub(start);
    let written = available.min(out.len());
    if written > 0 {
        out[..written].copy_from_slice(&units[start..start + written]);
    }
    if written < out.len() && options & NO_NULL_TERMINATION == 0 {
        out[written] = 0;
    }
    written
}

// ============================================================================
// 表
// ============================================================================

static V8_VTABLE: V8VTable = V8VTable {
    initialize_platform: v8_initialize_platform,
    initialize: v8_initialize,
    auto_ensures_init: v8_auto_ensures_init,
    is_initialized: v8_is_initialized,
    current_platform: v8_current_platform,
    version: v8_version,
};

static PLATFORM_VTABLE: PlatformVTable = PlatformVTable {
    drop: platform_drop,
    clone: platform_clone,
    ctor: platform_ctor,
    ctor_single_threaded: platform_ctor_single_threaded,
};

static ISOLATE_VTABLE: IsolateVTable = IsolateVTable {
    drop: isolate_drop,
    ctor: isolate_ctor,
    ctor_default: isolate_ctor_default,
    deref: isolate_deref,
};

static HANDLE_SCOPE_IMPL_VTABLE: HandleScopeImplVTable = HandleScopeImplVTable {
    drop: handle_scope_drop,
};

static HANDLE_SCOPE_VTABLE: HandleScopeVTable = HandleScopeVTable {
    ctor_isolate: handle_scope_ctor_isolate,
    deref_to_isolate: handle_scope_deref_to_isolate,
    isolate: &HANDLE_SCOPE_IMPL_VTABLE,
};

static CONTEXT_VTABLE: ContextVTable = ContextVTable { ctor: context_ctor };

static CONTEXT_SCOPE_IMPL_VTABLE: ContextScopeImplVTable = ContextScopeImplVTable {
    drop: context_scope_drop,
    deref_to_isolate: context_scope_deref_to_isolate,
    deref_to_isolate_scope: context_scope_deref_to_isolate_scope,
    deref_to_context_scope: context_scope_deref_to_context_scope,
};

static CONTEXT_SCOPE_VTABLE: ContextScopeVTable = ContextScopeVTable {
    ctor_isolate: context_scope_ctor_isolate,
    isolate: &CONTEXT_SCOPE_IMPL_VTABLE,
};

static SCRIPT_VTABLE: ScriptVTable = ScriptVTable {
    ctor_compile: script_ctor_compile,
    run: script_run,
};

static VALUE_VTABLE: ValueVTable = ValueVTable {
    deref: value_deref,
    type_of: value_type_of,
    is_undefined: value_is_undefined,
    is_null: value_is_null,
    is_null_or_undefined: value_is_null_or_undefined,
    is_true: value_is_true,
    is_false: value_is_false,
    is_name: value_is_name,
    is_string: value_is_string,
    is_symbol: value_is_symbol,
    to_string: value_to_string,
};

static STRING_VTABLE: StringVTable = StringVTable {
    ctor_utf16: string_ctor_utf16,
    len: string_len,
    read_utf16: string_read_utf16,
};

pub(super) static ROOT_VTABLE: RootVTable = RootVTable {
    v8: &V8_VTABLE,
    platform: &PLATFORM_VTABLE,
    isolate: &ISOLATE_VTABLE,
    handle_scope: &HANDLE_SCOPE_VTABLE,
    context: &CONTEXT_VTABLE,
    context_scope: &CONTEXT_SCOPE_VTABLE,
    script: &SCRIPT_VTABLE,
    value: &VALUE_VTABLE,
    string: &STRING_VTABLE,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::stats;

    /// 直接经由函数表打开两层 scope，并按错误顺序关闭
    #[test]
    fn test_out_of_order_scope_close_is_reported() {
        unsafe {
            let mut owned = isolate_ctor_default();
            let before = stats().scope_order_violations;

            let outer = handle_scope_ctor_isolate(&mut owned);
            let inner = handle_scope_ctor_isolate(&mut owned);
            handle_scope_drop(outer);
            handle_scope_drop(inner);

            assert_eq!(stats().scope_order_violations - before, 1);
            isolate_drop(owned);
        }
    }

    #[test]
    fn test_compile_outside_context_fails() {
        unsafe {
            let mut owned = isolate_ctor_default();
            let mut scope = handle_scope_ctor_isolate(&mut owned);

            let source: Vec<u16> = "1 + 1".encode_utf16().collect();
            let slice = CharSlice::new(&source);
            let mut text = LocalStringOpaque::null();
            assert!(string_ctor_utf16(&mut scope, &slice, &mut text));

            let mut script = LocalScriptOpaque(0);
            assert!(!script_ctor_compile(&mut scope, text, &mut script));

            handle_scope_drop(scope);
            isolate_drop(owned);
        }
    }

    #[test]
    fn test_context_scope_views_share_the_isolate() {
        unsafe {
            let mut owned = isolate_ctor_default();
            let mut scope = handle_scope_ctor_isolate(&mut owned);
            let ctx = context_ctor(&mut scope);
            let mut ctx_scope = context_scope_ctor_isolate(&mut scope, ctx);

            let outer = context_scope_deref_to_isolate_scope(&mut ctx_scope);
            let entered = context_scope_deref_to_context_scope(&mut ctx_scope);
            let isolate = isolate_deref(&mut owned);
            assert_eq!(handle_scope_deref_to_isolate(outer.ptr), isolate);
            assert_eq!(handle_scope_deref_to_isolate(entered.ptr), isolate);
            assert_eq!(context_scope_deref_to_isolate(&mut ctx_scope), isolate);
            assert_eq!(*outer.ptr, HandleScopeOpaque(scope.0));

            context_scope_drop(ctx_scope);
            handle_scope_drop(scope);
            isolate_drop(owned);
        }
    }

    #[test]
    fn test_platform_refcount() {
        unsafe {
            let platform = platform_ctor_single_threaded(false);
            let clone = platform_clone(PlatformOpaque(platform.0));
            assert_eq!(clone, PlatformOpaque(platform.0));
            platform_drop(clone);
            platform_drop(platform);
            platform_drop(PlatformOpaque(SharedPtrOpaque([0, 0])));
        }
    }
}
