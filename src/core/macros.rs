//! 核心宏定义
//!
//! 提供统一的宏来减少代码重复

/// 为结构体实现Default trait的宏
///
/// 使用示例:
/// ```rust
/// use v8core_host::impl_default;
///
/// struct MyStruct {
///     field1: u32,
///     field2: String,
/// }
///
/// impl_default!(MyStruct {
///     field1: 0,
///     field2: String::new(),
/// });
/// ```
#[macro_export]
macro_rules! impl_default {
    ($struct_name:ident {
        $($field:ident: $value:expr),* $(,)?
    }) => {
        impl Default for $struct_name {
            fn default() -> Self {
                Self {
                    $($field: $value),*
                }
            }
        }
    };
}

/// 为局部句柄生成“try 变体 + 抛错变体”的配对方法
///
/// 原生层以 `bool` 报告失败；try 变体返回 `Option`，
/// 非 try 变体把 `None` 转换为固定的错误类型。
/// 泛型参数写在方括号里，约束写在 `where [...]` 里。
///
/// 使用示例:
/// ```rust
/// use v8core_host::{fallible_pair, V8Error, V8Result};
///
/// struct Probe;
///
/// impl Probe {
///     fn try_get<T: Into<u32>>(&self, value: T, ok: bool) -> Option<u32> {
///         ok.then(|| value.into())
///     }
///
///     fallible_pair!(
///         /// 失败时返回 `CastFailed`
///         pub fn get[T](&self, value: T, ok: bool) -> u32
///             where [T: Into<u32>]
///             = try_get => CastFailed
///     );
/// }
///
/// assert_eq!(Probe.get(7u8, true), Ok(7));
/// assert_eq!(Probe.get(7u8, false), Err(V8Error::CastFailed));
/// ```
#[macro_export]
macro_rules! fallible_pair {
    (
        $(#[$meta:meta])*
        $vis:vis fn $name:ident [$($generics:tt)*] (&self $(, $arg:ident : $ty:ty)* $(,)?) -> $ret:ty
            $(where [$($bounds:tt)*])?
            = $try_name:ident => $kind:ident
    ) => {
        $(#[$meta])*
        $vis fn $name<$($generics)*>(&self $(, $arg: $ty)*) -> $crate::V8Result<$ret>
        $(where $($bounds)*)?
        {
            self.$try_name($($arg),*).ok_or($crate::V8Error::$kind)
        }
    };
}
