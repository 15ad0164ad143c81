//! 日志初始化
//!
//! 配置 tracing 日志框架。`RUST_LOG` 环境变量优先于配置中的日志级别。

use crate::config::{LogLevel, LoggingConfig};
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

/// 本 crate 安装的订阅者所用的过滤指令
static ACTIVE_DIRECTIVE: OnceLock<String> = OnceLock::new();

/// 初始化日志系统
///
/// 使用 `try_init`，重复调用（或宿主已安装订阅者）时静默忽略。
/// 返回本次调用是否实际安装了订阅者。
pub fn init(config: &LoggingConfig) -> bool {
    if !config.log_to_console {
        return false;
    }
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directive_for(config.level)));
    let directive = filter.to_string();
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok();
    if installed {
        let _ = ACTIVE_DIRECTIVE.set(directive);
        tracing::info!(target: "v8core", "Logging initialized at {:?}", config.level);
    }
    installed
}

/// 由 [`init`] 安装的订阅者的过滤指令；宿主自行安装订阅者时为 `None`
pub fn active_directive() -> Option<&'static str> {
    ACTIVE_DIRECTIVE.get().map(String::as_str)
}

/// 日志级别对应的过滤指令（只作用于本 crate 的 target）
pub fn directive_for(level: LogLevel) -> String {
    let level = match level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    };
    format!("v8core={}", level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_for() {
        assert_eq!(directive_for(LogLevel::Debug), "v8core=debug");
        assert_eq!(directive_for(LogLevel::Error), "v8core=error");
    }

    #[test]
    fn test_disabled_console_skips_install() {
        let config = LoggingConfig {
            log_to_console: false,
            ..LoggingConfig::default()
        };
        assert!(!init(&config));
    }
}
