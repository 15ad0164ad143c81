//! 局部字符串句柄
//!
//! 文本以 UTF-16 代码单元跨越边界。构造时原生层只拿到调用期间有效的
//! 借用视图，必须自行复制。

use super::scope::{AsIsolate, AsIsolateScope};
use super::write_options::WriteOptions;
use crate::abi::{CharSlice, CharSliceMut, LocalStringOpaque};
use crate::core::{V8Error, V8Result};
use crate::registry;
use std::marker::PhantomData;

/// 局部字符串句柄
#[derive(Debug, Clone, Copy)]
pub struct LocalJsString<'s> {
    raw: LocalStringOpaque,
    _scope: PhantomData<&'s ()>,
}

impl<'s> LocalJsString<'s> {
    pub(crate) fn from_raw(raw: LocalStringOpaque) -> Self {
        Self {
            raw,
            _scope: PhantomData,
        }
    }

    pub(crate) fn raw(&self) -> LocalStringOpaque {
        self.raw
    }

    /// 从 UTF-16 代码单元创建字符串，失败时返回 `None`
    pub fn try_create_utf16<S>(scope: &'s S, text: &[u16]) -> Option<Self>
    where
        S: AsIsolateScope<'s> + ?Sized,
    {
        let slice = CharSlice::new(text);
        let mut ret = LocalStringOpaque::null();
        let ok = unsafe {
            (registry::loaded().string.ctor_utf16)(scope.isolate_scope_ptr(), &slice, &mut ret)
        };
        ok.then(|| Self::from_raw(ret))
    }

    /// 从 UTF-16 代码单元创建字符串
    pub fn create_utf16<S>(scope: &'s S, text: &[u16]) -> V8Result<Self>
    where
        S: AsIsolateScope<'s> + ?Sized,
    {
        Self::try_create_utf16(scope, text).ok_or(V8Error::StringCreationFailed)
    }

    /// 从 Rust 字符串创建（先编码为 UTF-16）
    pub fn try_create<S>(scope: &'s S, text: &str) -> Option<Self>
    where
        S: AsIsolateScope<'s> + ?Sized,
    {
        let units: Vec<u16> = text.encode_utf16().collect();
        Self::try_create_utf16(scope, &units)
    }

    pub fn create<S>(scope: &'s S, text: &str) -> V8Result<Self>
    where
        S: AsIsolateScope<'s> + ?Sized,
    {
        Self::try_create(scope, text).ok_or(V8Error::StringCreationFailed)
    }

    /// UTF-16 代码单元个数
    pub fn length(&self) -> usize {
        unsafe { (registry::loaded().string.len)(self.raw) }
    }

    pub fn is_empty(&self) -> bool {
        self.length() == 0
    }

    /// 从开头写出到 `buffer`，返回写出的代码单元数（不含结尾的 0）
    pub fn read_utf16<S>(&self, scope: &S, buffer: &mut [u16], options: WriteOptions) -> usize
    where
        S: AsIsolate + ?Sized,
    {
        self.read_utf16_from(scope, buffer, 0, options)
    }

    /// 从第 `start` 个代码单元开始写出
    pub fn read_utf16_from<S>(
        &self,
        scope: &S,
        buffer: &mut [u16],
        start: usize,
        options: WriteOptions,
    ) -> usize
    where
        S: AsIsolate + ?Sized,
    {
        let mut slice = CharSliceMut::new(buffer);
        unsafe {
            (registry::loaded().string.read_utf16)(
                self.raw,
                scope.isolate_ptr(),
                &mut slice,
                start,
                options.bits(),
            )
        }
    }

    /// 全部代码单元
    pub fn to_utf16<S>(&self, scope: &S, options: WriteOptions) -> Vec<u16>
    where
        S: AsIsolate + ?Sized,
    {
        let mut buffer = vec![0u16; self.length()];
        let written = self.read_utf16(scope, &mut buffer, options);
        buffer.truncate(written);
        buffer
    }

    /// 转换为 Rust 字符串，孤立代理项替换为 U+FFFD
    pub fn to_string<S>(&self, scope: &S, options: WriteOptions) -> String
    where
        S: AsIsolate + ?Sized,
    {
        String::from_utf16_lossy(&self.to_utf16(scope, options))
    }
}

#[cfg(all(test, feature = "reference-engine"))]
mod tests {
    use super::*;
    use crate::runtime::{HandleScope, Isolate, V8};

    fn units(text: &str) -> Vec<u16> {
        text.encode_utf16().collect()
    }

    #[test]
    fn test_create_and_read() {
        crate::reference::install().unwrap();
        V8::auto_ensures_init().unwrap();
        let mut isolate = Isolate::create_on_current_thread().unwrap();
        let scope = HandleScope::new(&mut isolate).unwrap();

        let text = LocalJsString::create(&scope, "héllo 🌍").unwrap();
        assert_eq!(text.length(), units("héllo 🌍").len());
        assert_eq!(text.to_string(&scope, WriteOptions::NO_OPTIONS), "héllo 🌍");

        let empty = LocalJsString::create_utf16(&scope, &[]).unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.to_string(&scope, WriteOptions::NO_OPTIONS), "");
    }

    #[test]
    fn test_null_termination() {
        crate::reference::install().unwrap();
        V8::auto_ensures_init().unwrap();
        let mut isolate = Isolate::create_on_current_thread().unwrap();
        let scope = HandleScope::new(&mut isolate).unwrap();
        let text = LocalJsString::create(&scope, "abc").unwrap();

        let mut buffer = [0xFFFFu16; 5];
        let written = text.read_utf16(&scope, &mut buffer, WriteOptions::NO_OPTIONS);
        assert_eq!(written, 3);
        assert_eq!(buffer, [97, 98, 99, 0, 0xFFFF]);

        let mut buffer = [0xFFFFu16; 5];
        let written = text.read_utf16(&scope, &mut buffer, WriteOptions::NO_NULL_TERMINATION);
        assert_eq!(written, 3);
        assert_eq!(buffer, [97, 98, 99, 0xFFFF, 0xFFFF]);
    }

    #[test]
    fn test_read_from_offset_and_truncation() {
        crate::reference::install().unwrap();
        V8::auto_ensures_init().unwrap();
        let mut isolate = Isolate::create_on_current_thread().unwrap();
        let scope = HandleScope::new(&mut isolate).unwrap();
        let text = LocalJsString::create(&scope, "abcdef").unwrap();

        let mut buffer = [0u16; 2];
        assert_eq!(text.read_utf16_from(&scope, &mut buffer, 2, WriteOptions::NO_OPTIONS), 2);
        assert_eq!(buffer, units("cd")[..]);

        let mut buffer = [0u16; 8];
        assert_eq!(text.read_utf16_from(&scope, &mut buffer, 10, WriteOptions::NO_OPTIONS), 0);
    }

    #[test]
    fn test_lone_surrogate_is_preserved() {
        crate::reference::install().unwrap();
        V8::auto_ensures_init().unwrap();
        let mut isolate = Isolate::create_on_current_thread().unwrap();
        let scope = HandleScope::new(&mut isolate).unwrap();

        let raw = [0x61, 0xD800, 0x62];
        let text = LocalJsString::create_utf16(&scope, &raw).unwrap();
        assert_eq!(text.to_utf16(&scope, WriteOptions::NO_OPTIONS), raw);
        assert_eq!(text.to_string(&scope, WriteOptions::NO_OPTIONS), "a\u{FFFD}b");
    }

    #[test]
    fn test_heap_limit_rejects_large_string() {
        crate::reference::install().unwrap();
        V8::auto_ensures_init().unwrap();
        let params = crate::runtime::CreateParams::new().heap_limits(0, 64);
        let mut isolate = Isolate::create_on_current_thread_with(params).unwrap();
        let scope = HandleScope::new(&mut isolate).unwrap();

        let large = "x".repeat(100);
        assert!(LocalJsString::try_create(&scope, &large).is_none());
        assert_eq!(
            LocalJsString::create(&scope, &large).unwrap_err(),
            V8Error::StringCreationFailed
        );
        assert!(LocalJsString::try_create(&scope, "small").is_some());
    }
}
