//! 局部值句柄与值引用
//!
//! 类型探测直接转发给原生层；转换为字符串可能失败（例如 Symbol）。

use super::scope::AsContextScope;
use super::string::LocalJsString;
use crate::abi::{LocalStringOpaque, LocalValueOpaque, ValueOpaque};
use crate::registry;
use std::marker::PhantomData;

/// 非拥有的值引用
#[derive(Debug, Clone, Copy)]
pub struct JsValueRef<'s> {
    ptr: *const ValueOpaque,
    _scope: PhantomData<&'s ()>,
}

macro_rules! probes {
    ($($(#[$meta:meta])* $name:ident;)*) => {
        $(
            $(#[$meta])*
            pub fn $name(&self) -> bool {
                unsafe { (registry::loaded().value.$name)(self.ptr) }
            }
        )*
    };
}

impl<'s> JsValueRef<'s> {
    probes! {
        is_undefined;
        is_null;
        /// 等价于 `is_null() || is_undefined()`
        is_null_or_undefined;
        is_true;
        is_false;
        /// 字符串或 Symbol
        is_name;
        is_string;
        is_symbol;
    }

    /// `typeof` 运算结果
    pub fn type_of<'a, S>(&self, scope: &'a S) -> LocalJsString<'a>
    where
        S: AsContextScope<'a> + ?Sized,
    {
        let raw = unsafe { (registry::loaded().value.type_of)(self.ptr, scope.context_scope_ptr()) };
        LocalJsString::from_raw(raw)
    }

    /// 按脚本语义转换为字符串，失败时返回 `None`
    pub fn try_as_js_string<'a, S>(&self, scope: &'a S) -> Option<LocalJsString<'a>>
    where
        S: AsContextScope<'a> + ?Sized,
    {
        let mut ret = LocalStringOpaque::null();
        let ok = unsafe {
            (registry::loaded().value.to_string)(self.ptr, scope.context_scope_ptr(), &mut ret)
        };
        ok.then(|| LocalJsString::from_raw(ret))
    }

    fallible_pair!(
        pub fn as_js_string['a, S](&self, scope: &'a S) -> LocalJsString<'a>
            where [S: AsContextScope<'a> + ?Sized]
            = try_as_js_string => CastFailed
    );
}

/// 局部值句柄
#[derive(Debug, Clone, Copy)]
pub struct LocalJsValue<'s> {
    raw: LocalValueOpaque,
    _scope: PhantomData<&'s ()>,
}

macro_rules! forward_probes {
    ($($name:ident),* $(,)?) => {
        $(
            pub fn $name(&self) -> bool {
                self.as_ref().$name()
            }
        )*
    };
}

impl<'s> LocalJsValue<'s> {
    pub(crate) fn from_raw(raw: LocalValueOpaque) -> Self {
        Self {
            raw,
            _scope: PhantomData,
        }
    }

    /// 解引用为值引用（每次都向原生层询问）
    pub fn as_ref(&self) -> JsValueRef<'s> {
        JsValueRef {
            ptr: unsafe { (registry::loaded().value.deref)(self.raw) },
            _scope: PhantomData,
        }
    }

    forward_probes!(
        is_undefined,
        is_null,
        is_null_or_undefined,
        is_true,
        is_false,
        is_name,
        is_string,
        is_symbol,
    );

    pub fn type_of<'a, S>(&self, scope: &'a S) -> LocalJsString<'a>
    where
        S: AsContextScope<'a> + ?Sized,
    {
        self.as_ref().type_of(scope)
    }

    pub fn try_as_js_string<'a, S>(&self, scope: &'a S) -> Option<LocalJsString<'a>>
    where
        S: AsContextScope<'a> + ?Sized,
    {
        self.as_ref().try_as_js_string(scope)
    }

    fallible_pair!(
        pub fn as_js_string['a, S](&self, scope: &'a S) -> LocalJsString<'a>
            where [S: AsContextScope<'a> + ?Sized]
            = try_as_js_string => CastFailed
    );
}
