//! 引用计数的原生 platform

use crate::abi::PlatformOpaque;
use crate::config::PlatformConfig;
use crate::core::V8Result;
use crate::registry::{self, Registry};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};

/// 原生 platform 的一个共享引用
///
/// `clone` 增加原生引用计数；相等性按原生对象身份比较。
pub struct Platform {
    raw: PlatformOpaque,
    disposed: AtomicBool,
}

impl Platform {
    /// 默认 platform 实现
    ///
    /// `thread_pool_size` 为后台工作线程数，0 表示按在线处理器数自动选择。
    pub fn new(thread_pool_size: u32, idle_task_support: bool) -> V8Result<Self> {
        let registry = Registry::global()?;
        let raw = unsafe { (registry.platform.ctor)(thread_pool_size, idle_task_support) };
        tracing::debug!(
            target: "v8core::platform",
            "Platform created (threads: {}, idle tasks: {})",
            thread_pool_size,
            idle_task_support
        );
        Ok(Self::from_raw(raw))
    }

    /// 禁用工作线程池的 platform（需配合引擎的单线程标志）
    pub fn new_single_threaded(idle_task_support: bool) -> V8Result<Self> {
        let registry = Registry::global()?;
        let raw = unsafe { (registry.platform.ctor_single_threaded)(idle_task_support) };
        tracing::debug!(target: "v8core::platform", "Single-threaded platform created");
        Ok(Self::from_raw(raw))
    }

    /// 按配置创建
    pub fn from_config(config: &PlatformConfig) -> V8Result<Self> {
        if config.single_threaded {
            Self::new_single_threaded(config.idle_task_support)
        } else {
            Self::new(config.thread_pool_size, config.idle_task_support)
        }
    }

    pub(crate) fn from_raw(raw: PlatformOpaque) -> Self {
        Self {
            raw,
            disposed: AtomicBool::new(false),
        }
    }

    /// 增加一次原生引用，所有权交给调用方
    pub(crate) fn clone_raw(&self) -> PlatformOpaque {
        if self.is_disposed() {
            panic!("Platform used after dispose");
        }
        unsafe { (registry::loaded().platform.clone)(self.raw.copy_bits()) }
    }

    /// 释放本引用，重复调用无效果
    pub fn dispose(&mut self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        unsafe { (registry::loaded().platform.drop)(self.raw.copy_bits()) };
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl Clone for Platform {
    fn clone(&self) -> Self {
        Self::from_raw(self.clone_raw())
    }
}

impl Drop for Platform {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl PartialEq for Platform {
    fn eq(&self, other: &Self) -> bool {
        self.raw.identity() == other.raw.identity()
    }
}

impl Eq for Platform {}

impl Hash for Platform {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.identity().hash(state);
    }
}

impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Platform")
            .field("raw", &self.raw.identity())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(all(test, feature = "reference-engine"))]
mod tests {
    use super::*;
    use crate::reference;
    use std::collections::HashSet;

    #[test]
    fn test_clone_shares_identity() {
        reference::install().unwrap();
        let platform = Platform::new(2, false).unwrap();
        let clone = platform.clone();
        assert_eq!(platform, clone);

        let other = Platform::new(2, false).unwrap();
        assert_ne!(platform, other);

        let set: HashSet<_> = [&platform, &clone, &other].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_dispose_is_idempotent() {
        reference::install().unwrap();
        let before = reference::stats();
        {
            let mut platform = Platform::new_single_threaded(true).unwrap();
            platform.dispose();
            platform.dispose();
        }
        let after = reference::stats();
        assert_eq!(after.platforms_created - before.platforms_created, 1);
        assert_eq!(after.platform_releases - before.platform_releases, 1);
    }

    #[test]
    fn test_clone_and_release_balance() {
        reference::install().unwrap();
        let before = reference::stats();
        {
            let platform = Platform::from_config(&PlatformConfig::default()).unwrap();
            let _a = platform.clone();
            let _b = platform.clone();
        }
        let after = reference::stats();
        assert_eq!(after.platform_clones - before.platform_clones, 2);
        assert_eq!(after.platform_releases - before.platform_releases, 3);
    }
}
