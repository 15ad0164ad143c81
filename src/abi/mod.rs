//! 原生 ABI 描述
//!
//! 与原生库 `v8core` 导出的根 vtable 逐字节对应的 `#[repr(C)]` 类型：
//! - 不透明句柄（只在 vtable 调用之间传递，绑定层从不解释其内容）
//! - 指针 + 长度切片（UTF-16 文本、版本字节串）
//! - 三态布尔 `OptionBool`
//! - 各子系统的函数指针表（见 [`vtable`]）

use std::ffi::c_void;
use std::ops::{Deref, DerefMut};

pub mod vtable;

pub use vtable::*;

/// 根 vtable 导出符号
pub const ROOT_VTABLE_SYMBOL: &str = "coplt_v8core_get_root_vtable";

/// ABI 版本导出符号（可选；缺失时视为版本 1）
pub const ABI_VERSION_SYMBOL: &str = "coplt_v8core_abi_version";

/// 本绑定层理解的 ABI 版本
pub const ABI_VERSION: u32 = 1;

// ============================================================================
// 不透明句柄
// ============================================================================

/// 原生 `Isolate` 引用目标，只以指针形式出现
#[repr(C)]
pub struct IsolateOpaque {
    _private: [u8; 0],
}

/// 独占所有权的原生 isolate
#[repr(C)]
#[derive(Debug, PartialEq, Eq)]
pub struct OwnedIsolateOpaque(pub usize);

/// 原生 handle scope 本体（宿主按值持有，调用时传递其地址）
#[repr(C)]
#[derive(Debug, PartialEq, Eq)]
pub struct HandleScopeOpaque(pub usize);

/// 原生 context scope 本体
#[repr(C)]
#[derive(Debug, PartialEq, Eq)]
pub struct ContextScopeOpaque(pub usize);

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalContextOpaque(pub usize);

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalScriptOpaque(pub usize);

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalStringOpaque(pub *mut c_void);

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalValueOpaque(pub *mut c_void);

/// 原生 `Value` 引用目标，只以指针形式出现
#[repr(C)]
pub struct ValueOpaque {
    _private: [u8; 0],
}

/// 原生 `std::shared_ptr` 的两个机器字
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SharedPtrOpaque(pub [usize; 2]);

/// 引用计数的原生 platform
#[repr(C)]
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct PlatformOpaque(pub SharedPtrOpaque);

impl LocalStringOpaque {
    /// 失败时写回的空句柄
    pub const fn null() -> Self {
        Self(std::ptr::null_mut())
    }
}

impl LocalValueOpaque {
    pub const fn null() -> Self {
        Self(std::ptr::null_mut())
    }
}

impl PlatformOpaque {
    /// 仅比较原生身份，不影响引用计数
    pub fn identity(&self) -> SharedPtrOpaque {
        self.0
    }

    /// 复制句柄字节（不增加引用计数，调用方负责配对 clone/drop）
    pub fn copy_bits(&self) -> PlatformOpaque {
        PlatformOpaque(self.0)
    }
}

// ============================================================================
// 切片
// ============================================================================

/// 只读字节切片（版本字符串等）
#[repr(C)]
#[derive(Debug)]
pub struct ByteSlice {
    pub ptr: *const u8,
    pub len: usize,
}

impl ByteSlice {
    pub fn new(slice: &[u8]) -> Self {
        Self {
            ptr: slice.as_ptr(),
            len: slice.len(),
        }
    }
}

impl Deref for ByteSlice {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        if self.len == 0 {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }
}

/// 只读 UTF-16 切片
#[repr(C)]
#[derive(Debug)]
pub struct CharSlice {
    pub ptr: *const u16,
    pub len: usize,
}

impl CharSlice {
    pub fn new(slice: &[u16]) -> Self {
        Self {
            ptr: slice.as_ptr(),
            len: slice.len(),
        }
    }
}

impl Deref for CharSlice {
    type Target = [u16];

    fn deref(&self) -> &Self::Target {
        if self.len == 0 {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }
}

/// 可写 UTF-16 输出缓冲
#[repr(C)]
#[derive(Debug)]
pub struct CharSliceMut {
    pub ptr: *mut u16,
    pub len: usize,
}

impl CharSliceMut {
    pub fn new(slice: &mut [u16]) -> Self {
        Self {
            ptr: slice.as_mut_ptr(),
            len: slice.len(),
        }
    }
}

impl Deref for CharSliceMut {
    type Target = [u16];

    fn deref(&self) -> &Self::Target {
        if self.len == 0 {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }
}

impl DerefMut for CharSliceMut {
    fn deref_mut(&mut self) -> &mut Self::Target {
        if self.len == 0 {
            return &mut [];
        }
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.len) }
    }
}

// ============================================================================
// 三态布尔
// ============================================================================

/// 未设置 / false / true，未设置时由引擎使用默认值
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum OptionBool {
    #[default]
    None = 255,
    False = 0,
    True = 1,
}

impl OptionBool {
    pub fn as_opt(self) -> Option<bool> {
        self.into()
    }
}

impl From<OptionBool> for Option<bool> {
    fn from(value: OptionBool) -> Self {
        match value {
            OptionBool::None => None,
            OptionBool::False => Some(false),
            OptionBool::True => Some(true),
        }
    }
}

impl From<Option<bool>> for OptionBool {
    fn from(value: Option<bool>) -> Self {
        match value {
            None => Self::None,
            Some(false) => Self::False,
            Some(true) => Self::True,
        }
    }
}

impl From<bool> for OptionBool {
    fn from(value: bool) -> Self {
        if value {
            Self::True
        } else {
            Self::False
        }
    }
}
