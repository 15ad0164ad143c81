/// 统一配置系统
///
/// 提供TOML/JSON配置文件、环境变量和运行时动态调整
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod isolate;
pub mod library;
pub mod platform;

pub use isolate::{EmbedderWrapperOffsets, HeapLimitsConfig, IsolateConfig};
pub use library::LibraryConfig;
pub use platform::PlatformConfig;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 文件读取错误
    #[error("Config file error: {0}")]
    FileError(#[from] std::io::Error),
    /// 解析错误
    #[error("Config parse error: {0}")]
    ParseError(String),
    /// 验证错误
    #[error("Config validation error: {0}")]
    ValidationError(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// 绑定层主配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BindingConfig {
    /// 原生库配置
    #[serde(default)]
    pub library: LibraryConfig,

    /// 平台配置
    #[serde(default)]
    pub platform: PlatformConfig,

    /// Isolate 创建配置
    #[serde(default)]
    pub isolate: IsolateConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BindingConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 从TOML文件加载配置
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_toml_str(&content)
    }

    /// 从TOML字符串解析配置
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 从JSON文件加载配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_json_str(&content)
    }

    /// 从JSON字符串解析配置
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 保存为TOML文件
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(ConfigError::FileError)
    }

    /// 保存为JSON文件
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(ConfigError::FileError)
    }

    /// 从环境变量覆盖配置
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// 以任意键值来源覆盖配置（环境变量覆盖的实现）
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // 原生库
        if let Some(val) = lookup("V8CORE_LIBRARY_PATH") {
            if !val.is_empty() {
                self.library.path = Some(PathBuf::from(val));
            }
        }

        // 平台
        if let Some(val) = lookup("V8CORE_THREAD_POOL_SIZE") {
            if let Ok(size) = val.parse() {
                self.platform.thread_pool_size = size;
            }
        }
        if let Some(val) = lookup("V8CORE_IDLE_TASK_SUPPORT") {
            self.platform.idle_task_support = val.parse().unwrap_or(self.platform.idle_task_support);
        }
        if let Some(val) = lookup("V8CORE_SINGLE_THREADED") {
            self.platform.single_threaded = val.parse().unwrap_or(self.platform.single_threaded);
        }

        // 日志
        if let Some(val) = lookup("V8CORE_LOG_LEVEL") {
            if let Some(level) = LogLevel::parse(&val) {
                self.logging.level = level;
            }
        }
    }

    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        self.library.validate()?;
        self.platform.validate()?;
        self.isolate.validate()?;
        Ok(())
    }

    /// 自动查找并加载配置文件
    ///
    /// 按以下顺序查找：
    /// 1. ./v8core.toml
    /// 2. ./v8core.json
    /// 3. ~/.config/v8core/config.toml
    /// 4. 使用默认配置
    ///
    /// 只跳过不存在的文件；存在但无法读取或解析的文件返回错误。
    /// 找到的配置随后应用环境变量覆盖。
    pub fn load_or_default() -> ConfigResult<Self> {
        let mut config = Self::discover(&Self::search_paths())?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// 默认的配置文件查找位置
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("v8core.toml"), PathBuf::from("v8core.json")];
        if let Some(home) = env::var_os("HOME") {
            paths.push(
                PathBuf::from(home)
                    .join(".config")
                    .join("v8core")
                    .join("config.toml"),
            );
        }
        paths
    }

    /// 加载候选列表中第一个存在的文件（`.json` 按 JSON，其余按 TOML）
    pub fn discover(candidates: &[PathBuf]) -> ConfigResult<Self> {
        for path in candidates {
            if !path.exists() {
                continue;
            }
            let loaded = match path.extension().and_then(|ext| ext.to_str()) {
                Some("json") => Self::from_json_file(path),
                _ => Self::from_toml_file(path),
            };
            let config = loaded.map_err(|err| match err {
                ConfigError::ParseError(message) => {
                    ConfigError::ParseError(format!("{}: {}", path.display(), message))
                }
                other => other,
            })?;
            tracing::debug!(target: "v8core::config", "Loaded config from {:?}", path);
            return Ok(config);
        }

        tracing::debug!(target: "v8core::config", "Using default configuration");
        Ok(Self::default())
    }
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: LogLevel,

    /// 是否输出到控制台
    pub log_to_console: bool,
}

use crate::impl_default;

impl_default!(LoggingConfig {
    level: LogLevel::Warn,
    log_to_console: true,
});

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    /// 跟踪
    Trace,
    /// 调试
    Debug,
    /// 信息
    Info,
    /// 警告
    Warn,
    /// 错误
    Error,
}

impl LogLevel {
    /// 不区分大小写解析
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = BindingConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.library.path.is_none());
        assert_eq!(config.library.root_symbol, "coplt_v8core_get_root_vtable");
    }

    #[test]
    fn test_toml_serialization() {
        let mut config = BindingConfig::default();
        config.platform.thread_pool_size = 4;
        config.isolate.heap_limits = Some(HeapLimitsConfig {
            initial: 0,
            max: 64 * 1024 * 1024,
        });
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: BindingConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_json_serialization() {
        let mut config = BindingConfig::default();
        config.isolate.allow_atomics_wait = Some(false);
        let json_str = serde_json::to_string(&config).unwrap();
        let parsed: BindingConfig = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed.isolate.allow_atomics_wait, Some(false));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = BindingConfig::from_toml_str(
            r#"
            [platform]
            thread_pool_size = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.platform.thread_pool_size, 2);
        assert!(!config.platform.idle_task_support);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("V8CORE_LIBRARY_PATH", "/opt/v8core/libv8core.so"),
            ("V8CORE_THREAD_POOL_SIZE", "8"),
            ("V8CORE_IDLE_TASK_SUPPORT", "true"),
            ("V8CORE_LOG_LEVEL", "DEBUG"),
        ]
        .into_iter()
        .collect();

        let mut config = BindingConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(
            config.library.path.as_deref(),
            Some(Path::new("/opt/v8core/libv8core.so"))
        );
        assert_eq!(config.platform.thread_pool_size, 8);
        assert!(config.platform.idle_task_support);
        assert_eq!(config.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_invalid_override_keeps_value() {
        let mut config = BindingConfig::default();
        config.apply_overrides(|key| match key {
            "V8CORE_THREAD_POOL_SIZE" => Some("many".to_string()),
            "V8CORE_LOG_LEVEL" => Some("loud".to_string()),
            _ => None,
        });
        assert_eq!(config.platform.thread_pool_size, 0);
        assert_eq!(config.logging.level, LogLevel::Warn);
    }

    #[test]
    fn test_validation_errors() {
        let mut config = BindingConfig::default();
        config.isolate.heap_limits = Some(HeapLimitsConfig { initial: 10, max: 5 });
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));

        let mut config = BindingConfig::default();
        config.platform.single_threaded = true;
        config.platform.thread_pool_size = 2;
        assert!(config.validate().is_err());

        let mut config = BindingConfig::default();
        config.library.root_symbol = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BindingConfig::default();
        config.platform.idle_task_support = true;

        let toml_path = dir.path().join("v8core.toml");
        config.save_toml(&toml_path).unwrap();
        assert_eq!(BindingConfig::from_toml_file(&toml_path).unwrap(), config);

        let json_path = dir.path().join("v8core.json");
        config.save_json(&json_path).unwrap();
        assert_eq!(BindingConfig::from_json_file(&json_path).unwrap(), config);
    }

    #[test]
    fn test_discover_skips_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BindingConfig::default();
        config.platform.thread_pool_size = 3;
        let json_path = dir.path().join("v8core.json");
        config.save_json(&json_path).unwrap();

        let candidates = vec![dir.path().join("v8core.toml"), json_path];
        assert_eq!(BindingConfig::discover(&candidates).unwrap(), config);

        let nothing = vec![dir.path().join("absent.toml")];
        assert_eq!(BindingConfig::discover(&nothing).unwrap(), BindingConfig::default());
    }

    #[test]
    fn test_discover_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let toml_path = dir.path().join("v8core.toml");
        fs::write(
            &toml_path,
            "[library]\npath = \"/nonexistent/libv8core.so\"\n[platform]\nthread_pool_size = \"four\"\n",
        )
        .unwrap();
        let json_path = dir.path().join("v8core.json");
        BindingConfig::default().save_json(&json_path).unwrap();

        // 后面的有效文件不能掩盖前面的坏文件
        let result = BindingConfig::discover(&[toml_path, json_path]);
        match result {
            Err(ConfigError::ParseError(message)) => assert!(message.contains("v8core.toml")),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file() {
        let result = BindingConfig::from_toml_file("/nonexistent/v8core.toml");
        assert!(matches!(result, Err(ConfigError::FileError(_))));
    }
}
