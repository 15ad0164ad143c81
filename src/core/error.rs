//! 统一错误处理模块
//!
//! 提供绑定层范围内的统一错误类型定义
//!
//! ## 错误类型分层
//!
//! - **注册表错误** (`RegistryError`): 原生库定位、符号解析、ABI 版本校验失败
//! - **操作错误** (`V8Error`): 引擎操作失败（字符串、编译、执行、类型转换等）
//!
//! 配置错误在建立注册表时转换为 `RegistryError::Config`。
//!
//! 原生层只通过布尔值报告失败，因此操作错误不携带任何额外负载。
//! `V8Error` 可以同时承载注册表错误。

use crate::config::ConfigError;
use thiserror::Error;

/// 引擎操作错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum V8Error {
    #[error("V8 engine is not initialized")]
    Uninitialized,

    #[error("Failed to create js string")]
    StringCreationFailed,

    #[error("Failed to compile script")]
    CompilationFailed,

    #[error("Script execution failed")]
    ExecutionFailed,

    #[error("Failed to cast js value to js string")]
    CastFailed,

    #[error("Isolate used on a thread other than the one that created it")]
    WrongThread,

    #[error("Isolate already disposed")]
    IsolateDisposed,

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// vtable 注册表错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Failed to load native library: {0}")]
    LibraryLoad(String),

    #[error("Native library does not export symbol: {0}")]
    SymbolMissing(String),

    #[error("ABI version mismatch: expected {expected}, found {found}")]
    AbiMismatch { expected: u32, found: u32 },

    #[error("Native vtable is null: {0}")]
    NullTable(&'static str),

    #[error("Registry already initialized with a different root vtable")]
    AlreadyInitialized,

    #[error("No native library configured")]
    NotConfigured,

    #[error("Invalid binding configuration: {0}")]
    Config(String),
}

// 配置错误携带 io::Error，无法比较，这里只保留描述
impl From<ConfigError> for RegistryError {
    fn from(err: ConfigError) -> Self {
        RegistryError::Config(err.to_string())
    }
}

impl From<ConfigError> for V8Error {
    fn from(err: ConfigError) -> Self {
        V8Error::Registry(err.into())
    }
}

/// 结果类型别名
pub type V8Result<T> = Result<T, V8Error>;
pub type RegistryResult<T> = Result<T, RegistryError>;
