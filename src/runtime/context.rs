use super::scope::AsIsolateScope;
use crate::abi::LocalContextOpaque;
use crate::registry;
use std::marker::PhantomData;

/// 局部上下文句柄
#[derive(Debug, Clone, Copy)]
pub struct LocalContext<'s> {
    raw: LocalContextOpaque,
    _scope: PhantomData<&'s ()>,
    _not_send: PhantomData<*mut ()>,
}

impl<'s> LocalContext<'s> {
    /// 在 isolate 级 scope 中创建新上下文（不会失败）
    pub fn create<S>(scope: &'s S) -> Self
    where
        S: AsIsolateScope<'s> + ?Sized,
    {
        let raw = unsafe { (registry::loaded().context.ctor)(scope.isolate_scope_ptr()) };
        tracing::trace!(target: "v8core::scope", "Context {:#x} created", raw.0);
        Self {
            raw,
            _scope: PhantomData,
            _not_send: PhantomData,
        }
    }

    pub(crate) fn raw(&self) -> LocalContextOpaque {
        self.raw
    }
}
