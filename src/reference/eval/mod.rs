//! 参考引擎的表达式求值器
//!
//! 只覆盖观察绑定层契约所需的子集：原始值字面量、模板字符串、
//! 一元/二元/条件运算、`Symbol(...)` 与 `throw`。

mod interp;
mod lexer;
mod number;
mod parser;

pub(crate) use interp::{to_js_string, type_of};
pub(crate) use parser::Program;

use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

static NEXT_SYMBOL: AtomicU64 = AtomicU64::new(1);

/// 求值器中的值（字符串以 UTF-16 保存）
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Vec<u16>),
    Symbol(Symbol),
}

/// 每次创建都唯一的 Symbol
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Symbol {
    id: u64,
    pub description: Option<Vec<u16>>,
}

impl Symbol {
    pub fn new(description: Option<Vec<u16>>) -> Self {
        Self {
            id: NEXT_SYMBOL.fetch_add(1, Ordering::Relaxed),
            description,
        }
    }
}

impl Value {
    pub fn string(text: &str) -> Self {
        Value::String(text.encode_utf16().collect())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("SyntaxError: {message}")]
pub(crate) struct SyntaxError {
    message: String,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// 编译 UTF-16 源码
pub(crate) fn compile(source: &[u16]) -> Result<Program, SyntaxError> {
    parser::parse_program(&String::from_utf16_lossy(source))
}
