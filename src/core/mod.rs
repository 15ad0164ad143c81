//! 核心模块
//!
//! 包含绑定层的基础设施：
//! - `error` - 错误类型定义
//! - `macros` - 通用宏
//! - `logging` - 日志初始化

pub mod error;
pub mod logging;
#[macro_use]
pub mod macros;

// 重新导出错误类型
pub use error::{RegistryError, RegistryResult, V8Error, V8Result};
