//! 作用域栈：HandleScope / ContextScope
//!
//! 作用域按严格的栈顺序打开和关闭。子作用域与局部句柄都借用其所在的
//! 作用域，因此父作用域在子作用域或局部句柄存活期间既不能被释放也不能
//! 被移动：
//!
//! ```compile_fail
//! use v8core_host::{ContextScope, HandleScope, Isolate, LocalContext, V8};
//!
//! v8core_host::reference::install().unwrap();
//! V8::auto_ensures_init().unwrap();
//! let mut isolate = Isolate::create_on_current_thread().unwrap();
//! let scope = HandleScope::new(&mut isolate).unwrap();
//! let ctx = LocalContext::create(&scope);
//! let ctx_scope = ContextScope::new(&scope, ctx);
//! drop(scope); // 父作用域先于子作用域关闭
//! ctx_scope.as_isolate();
//! ```
//!
//! 局部句柄也不能逃出创建它的作用域：
//!
//! ```compile_fail
//! use v8core_host::{HandleScope, Isolate, LocalJsString, V8};
//!
//! v8core_host::reference::install().unwrap();
//! V8::auto_ensures_init().unwrap();
//! let mut isolate = Isolate::create_on_current_thread().unwrap();
//! let text = {
//!     let scope = HandleScope::new(&mut isolate).unwrap();
//!     LocalJsString::create(&scope, "escaped").unwrap()
//! };
//! text.length();
//! ```
//!
//! 同一个 HandleScope 上同时只能打开一个 ContextScope，兄弟作用域会在
//! 创建时 panic。

use super::context::LocalContext;
use super::isolate::{Isolate, IsolateRef};
use crate::abi::{
    ContextScopeImplVTable, ContextScopeOpaque, HandleScopeImplVTable, HandleScopeObject,
    HandleScopeOpaque, IsolateOpaque,
};
use crate::core::V8Result;
use crate::registry;
use std::cell::{Cell, UnsafeCell};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};

/// 上下文级作用域标记
pub enum Context {}

/// 能给出 isolate 指针的对象
pub trait AsIsolate {
    fn isolate_ptr(&self) -> *mut IsolateOpaque;

    fn as_isolate(&self) -> IsolateRef<'_> {
        IsolateRef::from_raw(self.isolate_ptr())
    }
}

/// isolate 级 handle scope，在其中创建的局部句柄存活 `'s`
pub trait AsIsolateScope<'s>: AsIsolate {
    fn isolate_scope_ptr(&self) -> *mut HandleScopeOpaque;
}

/// 进入了上下文的 handle scope（编译、执行、类型转换需要）
pub trait AsContextScope<'s>: AsIsolateScope<'s> {
    fn context_scope_ptr(&self) -> *mut HandleScopeOpaque;
}

// ============================================================================
// HandleScope
// ============================================================================

/// isolate 级 handle scope
///
/// 关闭时释放其中创建的所有局部句柄。
pub struct HandleScope<'i> {
    raw: UnsafeCell<HandleScopeOpaque>,
    vt: &'static HandleScopeImplVTable,
    disposed: AtomicBool,
    context_open: Cell<bool>,
    _isolate: PhantomData<&'i mut Isolate>,
    _not_send: PhantomData<*mut ()>,
}

impl<'i> HandleScope<'i> {
    /// 在 isolate 上打开 handle scope
    pub fn new(isolate: &'i mut Isolate) -> V8Result<Self> {
        let owned = isolate.enter()?;
        let registry = registry::loaded();
        let raw = unsafe { (registry.handle_scope.ctor_isolate)(owned) };
        tracing::trace!(target: "v8core::scope", "HandleScope {:#x} opened", raw.0);
        Ok(Self {
            raw: UnsafeCell::new(raw),
            vt: registry.handle_scope_isolate,
            disposed: AtomicBool::new(false),
            context_open: Cell::new(false),
            _isolate: PhantomData,
            _not_send: PhantomData,
        })
    }

    fn raw_ptr(&self) -> *mut HandleScopeOpaque {
        if self.is_disposed() {
            panic!("HandleScope used after dispose");
        }
        self.raw.get()
    }

    /// 关闭 scope，重复调用无效果
    pub fn dispose(&mut self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let raw = HandleScopeOpaque(self.raw.get_mut().0);
        tracing::trace!(target: "v8core::scope", "HandleScope {:#x} closed", raw.0);
        unsafe { (self.vt.drop)(raw) };
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl Drop for HandleScope<'_> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for HandleScope<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleScope")
            .field("disposed", &self.is_disposed())
            .field("context_open", &self.context_open.get())
            .finish()
    }
}

impl AsIsolate for HandleScope<'_> {
    fn isolate_ptr(&self) -> *mut IsolateOpaque {
        unsafe { (registry::loaded().handle_scope.deref_to_isolate)(self.raw_ptr()) }
    }
}

impl<'s, 'i: 's> AsIsolateScope<'s> for HandleScope<'i> {
    fn isolate_scope_ptr(&self) -> *mut HandleScopeOpaque {
        self.raw_ptr()
    }
}

// ============================================================================
// HandleScopeRef
// ============================================================================

/// 由 ContextScope 解引用得到的非拥有 scope 视图，不负责关闭
pub struct HandleScopeRef<'a, C> {
    ptr: *mut HandleScopeOpaque,
    _marker: PhantomData<(&'a (), *mut C)>,
}

impl<'a, C> HandleScopeRef<'a, C> {
    // 视图不负责关闭，原生层随对象给出的实现表不需要保留
    fn from_object(object: HandleScopeObject) -> Self {
        Self {
            ptr: object.ptr,
            _marker: PhantomData,
        }
    }

    pub fn as_ptr(&self) -> *mut HandleScopeOpaque {
        self.ptr
    }
}

impl<C> AsIsolate for HandleScopeRef<'_, C> {
    fn isolate_ptr(&self) -> *mut IsolateOpaque {
        unsafe { (registry::loaded().handle_scope.deref_to_isolate)(self.ptr) }
    }
}

impl<'s, 'a: 's> AsIsolateScope<'s> for HandleScopeRef<'a, Isolate> {
    fn isolate_scope_ptr(&self) -> *mut HandleScopeOpaque {
        self.ptr
    }
}

// 上下文级 scope 同时也是 isolate 级 scope
impl<'s, 'a: 's> AsIsolateScope<'s> for HandleScopeRef<'a, Context> {
    fn isolate_scope_ptr(&self) -> *mut HandleScopeOpaque {
        self.ptr
    }
}

impl<'s, 'a: 's> AsContextScope<'s> for HandleScopeRef<'a, Context> {
    fn context_scope_ptr(&self) -> *mut HandleScopeOpaque {
        self.ptr
    }
}

// ============================================================================
// ContextScope
// ============================================================================

/// 进入某个上下文的作用域
pub struct ContextScope<'c> {
    raw: UnsafeCell<ContextScopeOpaque>,
    vt: &'static ContextScopeImplVTable,
    disposed: AtomicBool,
    parent: &'c Cell<bool>,
    _not_send: PhantomData<*mut ()>,
}

impl<'c> ContextScope<'c> {
    /// 在 handle scope 中进入上下文
    ///
    /// # Panics
    ///
    /// 父 scope 上已经打开了另一个 ContextScope 时 panic。
    pub fn new<'i>(scope: &'c HandleScope<'i>, context: LocalContext<'c>) -> Self {
        if scope.context_open.replace(true) {
            panic!("HandleScope already has an open ContextScope");
        }
        let registry = registry::loaded();
        let raw = unsafe { (registry.context_scope.ctor_isolate)(scope.raw_ptr(), context.raw()) };
        tracing::trace!(target: "v8core::scope", "ContextScope {:#x} opened", raw.0);
        Self {
            raw: UnsafeCell::new(raw),
            vt: registry.context_scope_isolate,
            disposed: AtomicBool::new(false),
            parent: &scope.context_open,
            _not_send: PhantomData,
        }
    }

    fn raw_ptr(&self) -> *mut ContextScopeOpaque {
        if self.is_disposed() {
            panic!("ContextScope used after dispose");
        }
        self.raw.get()
    }

    /// 退出上下文，重复调用无效果
    pub fn dispose(&mut self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let raw = ContextScopeOpaque(self.raw.get_mut().0);
        tracing::trace!(target: "v8core::scope", "ContextScope {:#x} closed", raw.0);
        unsafe { (self.vt.drop)(raw) };
        self.parent.set(false);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// 外层 isolate 级 handle scope（每次调用都向原生层询问）
    pub fn as_isolate_scope(&self) -> HandleScopeRef<'_, Isolate> {
        HandleScopeRef::from_object(unsafe { (self.vt.deref_to_isolate_scope)(self.raw_ptr()) })
    }

    /// 上下文级 handle scope（每次调用都向原生层询问）
    pub fn as_handle_scope(&self) -> HandleScopeRef<'_, Context> {
        HandleScopeRef::from_object(unsafe { (self.vt.deref_to_context_scope)(self.raw_ptr()) })
    }
}

impl Drop for ContextScope<'_> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for ContextScope<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextScope")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl AsIsolate for ContextScope<'_> {
    fn isolate_ptr(&self) -> *mut IsolateOpaque {
        unsafe { (self.vt.deref_to_isolate)(self.raw_ptr()) }
    }
}

impl<'s, 'c: 's> AsIsolateScope<'s> for ContextScope<'c> {
    fn isolate_scope_ptr(&self) -> *mut HandleScopeOpaque {
        self.as_isolate_scope().as_ptr()
    }
}

impl<'s, 'c: 's> AsContextScope<'s> for ContextScope<'c> {
    fn context_scope_ptr(&self) -> *mut HandleScopeOpaque {
        self.as_handle_scope().as_ptr()
    }
}

#[cfg(all(test, feature = "reference-engine"))]
mod tests {
    use super::*;
    use crate::reference;
    use crate::runtime::{LocalJsString, V8};

    fn isolate() -> Isolate {
        crate::reference::install().unwrap();
        V8::auto_ensures_init().unwrap();
        Isolate::create_on_current_thread().unwrap()
    }

    #[test]
    fn test_handle_scope_dispose_is_idempotent() {
        let mut isolate = isolate();
        let before = reference::stats();
        {
            let mut scope = HandleScope::new(&mut isolate).unwrap();
            scope.dispose();
            scope.dispose();
            assert!(scope.is_disposed());
        }
        let after = reference::stats();
        assert_eq!(after.handle_scopes_opened - before.handle_scopes_opened, 1);
        assert_eq!(after.handle_scopes_closed - before.handle_scopes_closed, 1);
    }

    #[test]
    fn test_context_scope_dispose_is_idempotent() {
        let mut isolate = isolate();
        let scope = HandleScope::new(&mut isolate).unwrap();
        let before = reference::stats();
        {
            let ctx = LocalContext::create(&scope);
            let mut ctx_scope = ContextScope::new(&scope, ctx);
            ctx_scope.dispose();
            ctx_scope.dispose();
        }
        let after = reference::stats();
        assert_eq!(after.context_scopes_opened - before.context_scopes_opened, 1);
        assert_eq!(after.context_scopes_closed - before.context_scopes_closed, 1);
        assert_eq!(after.scope_order_violations, before.scope_order_violations);
    }

    #[test]
    fn test_context_scope_derefs_share_isolate() {
        let mut isolate = isolate();
        let scope = HandleScope::new(&mut isolate).unwrap();
        let ctx = LocalContext::create(&scope);
        let ctx_scope = ContextScope::new(&scope, ctx);

        let direct = ctx_scope.as_isolate();
        assert_eq!(direct, ctx_scope.as_isolate_scope().as_isolate());
        assert_eq!(direct, ctx_scope.as_handle_scope().as_isolate());
        assert_eq!(direct, scope.as_isolate());
        assert_eq!(ctx_scope.as_isolate_scope().as_ptr(), ctx_scope.as_isolate_scope().as_ptr());
    }

    #[test]
    fn test_sequential_context_scopes() {
        let mut isolate = isolate();
        let scope = HandleScope::new(&mut isolate).unwrap();
        for _ in 0..2 {
            let ctx = LocalContext::create(&scope);
            let _ctx_scope = ContextScope::new(&scope, ctx);
        }
        assert!(!scope.context_open.get());
    }

    #[test]
    #[should_panic(expected = "HandleScope already has an open ContextScope")]
    fn test_sibling_context_scope_panics() {
        let mut isolate = isolate();
        let scope = HandleScope::new(&mut isolate).unwrap();
        let first = ContextScope::new(&scope, LocalContext::create(&scope));
        let _second = ContextScope::new(&scope, LocalContext::create(&scope));
        drop(first);
    }

    #[test]
    #[should_panic(expected = "HandleScope used after dispose")]
    fn test_use_after_dispose_panics() {
        let mut isolate = isolate();
        let mut scope = HandleScope::new(&mut isolate).unwrap();
        scope.dispose();
        let _ = LocalJsString::try_create(&scope, "late");
    }

    #[test]
    fn test_parent_handles_survive_child_close() {
        let mut isolate = isolate();
        let scope = HandleScope::new(&mut isolate).unwrap();
        let outer = LocalJsString::create(&scope, "outer").unwrap();
        {
            let ctx = LocalContext::create(&scope);
            let ctx_scope = ContextScope::new(&scope, ctx);
            let inner = LocalJsString::create(&ctx_scope, "inner").unwrap();
            assert_eq!(inner.to_string(&ctx_scope, Default::default()), "inner");
        }
        assert_eq!(outer.to_string(&scope, Default::default()), "outer");
    }
}
