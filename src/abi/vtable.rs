//! 各子系统函数指针表
//!
//! 所有子系统表都经由同一个 [`RootVTable`] 取得，保证来自同一 ABI 版本。

use super::*;
use std::ffi::{c_char, c_int};

/// 统计计数器查找回调
pub type CounterLookupCallback = extern "C" fn(name: *const c_char) -> *mut i32;

#[repr(C)]
pub struct RootVTable {
    pub v8: *const V8VTable,
    pub platform: *const PlatformVTable,
    pub isolate: *const IsolateVTable,
    pub handle_scope: *const HandleScopeVTable,
    pub context: *const ContextVTable,
    pub context_scope: *const ContextScopeVTable,
    pub script: *const ScriptVTable,
    pub value: *const ValueVTable,
    pub string: *const StringVTable,
}

// 表在注册后只读，指针指向进程生命周期内有效的静态数据
unsafe impl Send for RootVTable {}
unsafe impl Sync for RootVTable {}

#[repr(C)]
pub struct V8VTable {
    pub initialize_platform: unsafe extern "C" fn(ptr: PlatformOpaque),
    pub initialize: unsafe extern "C" fn(),
    pub auto_ensures_init: unsafe extern "C" fn(),
    pub is_initialized: unsafe extern "C" fn() -> bool,
    pub current_platform: unsafe extern "C" fn() -> PlatformOpaque,
    pub version: unsafe extern "C" fn() -> ByteSlice,
}

#[repr(C)]
pub struct PlatformVTable {
    pub drop: unsafe extern "C" fn(ptr: PlatformOpaque),
    pub clone: unsafe extern "C" fn(ptr: PlatformOpaque) -> PlatformOpaque,
    pub ctor: unsafe extern "C" fn(thread_pool_size: u32, idle_task_support: bool) -> PlatformOpaque,
    pub ctor_single_threaded: unsafe extern "C" fn(idle_task_support: bool) -> PlatformOpaque,
}

/// isolate 创建参数，每个选项带有“是否设置”标记
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct IsolateCreateParams {
    pub counter_lookup_callback: Option<CounterLookupCallback>,
    pub allow_atomics_wait: OptionBool,
    pub only_terminate_in_safe_scope: OptionBool,
    pub set_embedder_wrapper_type_info_offsets: bool,
    pub embedder_wrapper_type_index: c_int,
    pub embedder_wrapper_object_index: c_int,
    pub set_heap_limits: bool,
    pub heap_limits_initial: usize,
    pub heap_limits_max: usize,
}

#[repr(C)]
pub struct IsolateVTable {
    pub drop: unsafe extern "C" fn(ptr: OwnedIsolateOpaque),
    pub ctor: unsafe extern "C" fn(params: IsolateCreateParams) -> OwnedIsolateOpaque,
    pub ctor_default: unsafe extern "C" fn() -> OwnedIsolateOpaque,
    pub deref: unsafe extern "C" fn(ptr: *mut OwnedIsolateOpaque) -> *mut IsolateOpaque,
}

#[repr(C)]
pub struct HandleScopeVTable {
    pub ctor_isolate: unsafe extern "C" fn(ptr: *mut OwnedIsolateOpaque) -> HandleScopeOpaque,
    pub deref_to_isolate: unsafe extern "C" fn(ptr: *mut HandleScopeOpaque) -> *mut IsolateOpaque,
    pub isolate: *const HandleScopeImplVTable,
}

unsafe impl Send for HandleScopeVTable {}
unsafe impl Sync for HandleScopeVTable {}

/// 原生侧返回的 scope 视图：指向原生持有的 scope 本体及其实现表
#[repr(C)]
#[derive(Debug)]
pub struct HandleScopeObject {
    pub ptr: *mut HandleScopeOpaque,
    pub vt: *const HandleScopeImplVTable,
}

#[repr(C)]
pub struct HandleScopeImplVTable {
    pub drop: unsafe extern "C" fn(ptr: HandleScopeOpaque),
}

#[repr(C)]
pub struct ContextVTable {
    pub ctor: unsafe extern "C" fn(scope: *mut HandleScopeOpaque) -> LocalContextOpaque,
}

#[repr(C)]
pub struct ContextScopeVTable {
    pub ctor_isolate: unsafe extern "C" fn(
        scope: *mut HandleScopeOpaque,
        ctx: LocalContextOpaque,
    ) -> ContextScopeOpaque,
    pub isolate: *const ContextScopeImplVTable,
}

unsafe impl Send for ContextScopeVTable {}
unsafe impl Sync for ContextScopeVTable {}

#[repr(C)]
pub struct ContextScopeImplVTable {
    pub drop: unsafe extern "C" fn(ptr: ContextScopeOpaque),
    pub deref_to_isolate: unsafe extern "C" fn(ptr: *mut ContextScopeOpaque) -> *mut IsolateOpaque,
    pub deref_to_isolate_scope: unsafe extern "C" fn(ptr: *mut ContextScopeOpaque) -> HandleScopeObject,
    pub deref_to_context_scope: unsafe extern "C" fn(ptr: *mut ContextScopeOpaque) -> HandleScopeObject,
}

#[repr(C)]
pub struct ScriptVTable {
    pub ctor_compile: unsafe extern "C" fn(
        scope: *mut HandleScopeOpaque,
        source: LocalStringOpaque,
        ret: *mut LocalScriptOpaque,
    ) -> bool,
    pub run: unsafe extern "C" fn(
        ptr: LocalScriptOpaque,
        scope: *mut HandleScopeOpaque,
        ret: *mut LocalValueOpaque,
    ) -> bool,
}

#[repr(C)]
pub struct ValueVTable {
    pub deref: unsafe extern "C" fn(ptr: LocalValueOpaque) -> *const ValueOpaque,

    // type check
    pub type_of: unsafe extern "C" fn(
        ptr: *const ValueOpaque,
        scope: *mut HandleScopeOpaque,
    ) -> LocalStringOpaque,
    pub is_undefined: unsafe extern "C" fn(ptr: *const ValueOpaque) -> bool,
    pub is_null: unsafe extern "C" fn(ptr: *const ValueOpaque) -> bool,
    pub is_null_or_undefined: unsafe extern "C" fn(ptr: *const ValueOpaque) -> bool,
    pub is_true: unsafe extern "C" fn(ptr: *const ValueOpaque) -> bool,
    pub is_false: unsafe extern "C" fn(ptr: *const ValueOpaque) -> bool,
    pub is_name: unsafe extern "C" fn(ptr: *const ValueOpaque) -> bool,
    pub is_string: unsafe extern "C" fn(ptr: *const ValueOpaque) -> bool,
    pub is_symbol: unsafe extern "C" fn(ptr: *const ValueOpaque) -> bool,

    // cast
    pub to_string: unsafe extern "C" fn(
        ptr: *const ValueOpaque,
        scope: *mut HandleScopeOpaque,
        ret: *mut LocalStringOpaque,
    ) -> bool,
}

#[repr(C)]
pub struct StringVTable {
    pub ctor_utf16: unsafe extern "C" fn(
        scope: *mut HandleScopeOpaque,
        buffer: *const CharSlice,
        ret: *mut LocalStringOpaque,
    ) -> bool,
    pub len: unsafe extern "C" fn(ptr: LocalStringOpaque) -> usize,
    pub read_utf16: unsafe extern "C" fn(
        ptr: LocalStringOpaque,
        scope: *mut IsolateOpaque,
        buffer: *mut CharSliceMut,
        start: usize,
        options: c_int,
    ) -> usize,
}
