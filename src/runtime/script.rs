use super::scope::AsContextScope;
use super::string::LocalJsString;
use super::value::LocalJsValue;
use crate::abi::{LocalScriptOpaque, LocalValueOpaque};
use crate::core::{V8Error, V8Result};
use crate::registry;
use std::marker::PhantomData;

/// 已编译的局部脚本句柄
#[derive(Debug, Clone, Copy)]
pub struct LocalScript<'s> {
    raw: LocalScriptOpaque,
    _scope: PhantomData<&'s ()>,
}

impl<'s> LocalScript<'s> {
    /// 编译源码，语法错误时返回 `None`
    pub fn try_compile<S>(scope: &'s S, source: LocalJsString<'_>) -> Option<Self>
    where
        S: AsContextScope<'s> + ?Sized,
    {
        let mut ret = LocalScriptOpaque(0);
        let ok = unsafe {
            (registry::loaded().script.ctor_compile)(scope.context_scope_ptr(), source.raw(), &mut ret)
        };
        if !ok {
            tracing::debug!(target: "v8core::script", "Script compilation failed");
            return None;
        }
        Some(Self {
            raw: ret,
            _scope: PhantomData,
        })
    }

    pub fn compile<S>(scope: &'s S, source: LocalJsString<'_>) -> V8Result<Self>
    where
        S: AsContextScope<'s> + ?Sized,
    {
        Self::try_compile(scope, source).ok_or(V8Error::CompilationFailed)
    }

    /// 运行脚本，抛出异常时返回 `None`
    pub fn try_run<'a, S>(&self, scope: &'a S) -> Option<LocalJsValue<'a>>
    where
        S: AsContextScope<'a> + ?Sized,
    {
        let mut ret = LocalValueOpaque::null();
        let ok = unsafe { (registry::loaded().script.run)(self.raw, scope.context_scope_ptr(), &mut ret) };
        if !ok {
            tracing::debug!(target: "v8core::script", "Script execution failed");
            return None;
        }
        Some(LocalJsValue::from_raw(ret))
    }

    fallible_pair!(
        pub fn run['a, S](&self, scope: &'a S) -> LocalJsValue<'a>
            where [S: AsContextScope<'a> + ?Sized]
            = try_run => ExecutionFailed
    );
}
