/// 原生库配置

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use super::{ConfigResult, ConfigError};
use crate::abi::{ABI_VERSION_SYMBOL, ROOT_VTABLE_SYMBOL};

/// 原生库配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// 原生库路径（未设置时使用进程内参考引擎）
    pub path: Option<PathBuf>,

    /// 根 vtable 导出符号
    pub root_symbol: String,

    /// ABI 版本导出符号
    pub abi_symbol: String,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            path: None,
            root_symbol: ROOT_VTABLE_SYMBOL.to_string(),
            abi_symbol: ABI_VERSION_SYMBOL.to_string(),
        }
    }
}

impl LibraryConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(path) = &self.path {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::ValidationError("Empty library path".to_string()));
            }
        }
        if self.root_symbol.trim().is_empty() {
            return Err(ConfigError::ValidationError("Empty root vtable symbol".to_string()));
        }
        if self.abi_symbol.trim().is_empty() {
            return Err(ConfigError::ValidationError("Empty ABI version symbol".to_string()));
        }
        Ok(())
    }
}
