use std::ffi::c_int;
use std::ops::{BitOr, BitOrAssign};

/// 字符串写出选项位集，原样转发给原生层
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WriteOptions(c_int);

impl WriteOptions {
    pub const NO_OPTIONS: Self = Self(0);
    pub const HINT_MANY_WRITES_EXPECTED: Self = Self(1);
    /// 不在输出末尾追加 0
    pub const NO_NULL_TERMINATION: Self = Self(2);
    pub const PRESERVE_ONE_BYTE_NULL: Self = Self(4);
    /// 用 U+FFFD 替换无效 UTF-8 序列（仅 UTF-8 写出有效）
    pub const REPLACE_INVALID_UTF8: Self = Self(8);

    pub const fn from_bits(bits: c_int) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> c_int {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for WriteOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for WriteOptions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_wire_values() {
        assert_eq!(WriteOptions::default(), WriteOptions::NO_OPTIONS);
        assert_eq!(WriteOptions::HINT_MANY_WRITES_EXPECTED.bits(), 1);
        assert_eq!(WriteOptions::NO_NULL_TERMINATION.bits(), 2);
        assert_eq!(WriteOptions::PRESERVE_ONE_BYTE_NULL.bits(), 4);
        assert_eq!(WriteOptions::REPLACE_INVALID_UTF8.bits(), 8);
    }

    #[test]
    fn test_combination() {
        let mut options = WriteOptions::NO_NULL_TERMINATION;
        options |= WriteOptions::REPLACE_INVALID_UTF8;
        assert_eq!(options.bits(), 10);
        assert!(options.contains(WriteOptions::NO_NULL_TERMINATION));
        assert!(!options.contains(WriteOptions::HINT_MANY_WRITES_EXPECTED));
        assert!(options.contains(WriteOptions::NO_OPTIONS));
    }

    proptest! {
        #[test]
        fn prop_bitor_contains_both(a in 0i32..16, b in 0i32..16) {
            let a = WriteOptions::from_bits(a);
            let b = WriteOptions::from_bits(b);
            let both = a | b;
            prop_assert!(both.contains(a));
            prop_assert!(both.contains(b));
            prop_assert_eq!(both.bits(), a.bits() | b.bits());
        }
    }
}
