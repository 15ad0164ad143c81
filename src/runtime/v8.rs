//! 引擎级初始化与查询

use super::platform::Platform;
use crate::config::BindingConfig;
use crate::core::{logging, V8Error, V8Result};
use crate::registry::Registry;
use std::sync::OnceLock;

static VERSION: OnceLock<String> = OnceLock::new();
static CURRENT_PLATFORM: OnceLock<Platform> = OnceLock::new();

/// 引擎全局操作
///
/// 手动初始化顺序为 `initialize_platform` 然后 `initialize`；
/// 也可以直接调用 `auto_ensures_init`。
pub struct V8;

impl V8 {
    /// 设置引擎使用的 platform，需在 `initialize` 之前调用
    ///
    /// 引擎持有传入 platform 的一个克隆，调用方仍然拥有原引用。
    pub fn initialize_platform(platform: &Platform) -> V8Result<()> {
        let registry = Registry::global()?;
        let cloned = platform.clone_raw();
        unsafe { (registry.v8.initialize_platform)(cloned) };
        tracing::debug!(target: "v8core::engine", "Platform installed");
        Ok(())
    }

    pub fn initialize() -> V8Result<()> {
        let registry = Registry::global()?;
        unsafe { (registry.v8.initialize)() };
        tracing::info!(target: "v8core::engine", "V8 initialized: {}", Self::is_initialized());
        Ok(())
    }

    /// 未初始化时使用默认 platform 完成初始化
    pub fn auto_ensures_init() -> V8Result<()> {
        let registry = Registry::global()?;
        unsafe { (registry.v8.auto_ensures_init)() };
        Ok(())
    }

    /// 按配置加载原生库、创建 platform 并初始化引擎，已初始化时直接返回
    ///
    /// 先校验配置并按 `config.logging` 安装日志订阅者。
    pub fn initialize_with_config(config: &BindingConfig) -> V8Result<()> {
        config.validate()?;
        logging::init(&config.logging);
        Registry::from_config(&config.library)?;
        if Self::is_initialized() {
            tracing::debug!(target: "v8core::engine", "V8 already initialized");
            return Ok(());
        }
        let platform = Platform::from_config(&config.platform)?;
        Self::initialize_platform(&platform)?;
        Self::initialize()
    }

    /// 注册表尚未建立时视为未初始化
    pub fn is_initialized() -> bool {
        match Registry::get() {
            Some(registry) => unsafe { (registry.v8.is_initialized)() },
            None => false,
        }
    }

    pub fn assert_initialized() -> V8Result<()> {
        if Self::is_initialized() {
            Ok(())
        } else {
            Err(V8Error::Uninitialized)
        }
    }

    /// 原生层报告的版本字节
    pub fn version_bytes() -> V8Result<&'static [u8]> {
        let registry = Registry::global()?;
        let slice = unsafe { (registry.v8.version)() };
        if slice.len == 0 {
            return Ok(&[]);
        }
        // 版本串是原生库中的静态数据
        Ok(unsafe { std::slice::from_raw_parts(slice.ptr, slice.len) })
    }

    /// 引擎版本（首次查询后缓存）
    pub fn version() -> V8Result<&'static str> {
        if let Some(version) = VERSION.get() {
            return Ok(version.as_str());
        }
        let bytes = Self::version_bytes()?;
        Ok(VERSION
            .get_or_init(|| String::from_utf8_lossy(bytes).into_owned())
            .as_str())
    }

    /// 引擎当前使用的 platform（首次查询后缓存）
    pub fn current_platform() -> V8Result<&'static Platform> {
        Self::assert_initialized()?;
        if let Some(platform) = CURRENT_PLATFORM.get() {
            return Ok(platform);
        }
        let registry = Registry::global()?;
        Ok(CURRENT_PLATFORM.get_or_init(|| {
            Platform::from_raw(unsafe { (registry.v8.current_platform)() })
        }))
    }
}
