/// 平台配置

use serde::{Deserialize, Serialize};
use super::{ConfigResult, ConfigError};

/// 后台线程池上限（超过时多半是配置写错）
const MAX_THREAD_POOL_SIZE: u32 = 1024;

/// 平台配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// 后台工作线程数，0 表示按在线处理器数自动选择
    pub thread_pool_size: u32,

    /// 是否支持空闲任务
    pub idle_task_support: bool,

    /// 禁用工作线程池（需配合引擎的单线程标志）
    pub single_threaded: bool,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            thread_pool_size: 0,
            idle_task_support: false,
            single_threaded: false,
        }
    }
}

impl PlatformConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if self.thread_pool_size > MAX_THREAD_POOL_SIZE {
            return Err(ConfigError::ValidationError(format!(
                "Thread pool size {} exceeds {}",
                self.thread_pool_size, MAX_THREAD_POOL_SIZE
            )));
        }
        if self.single_threaded && self.thread_pool_size != 0 {
            return Err(ConfigError::ValidationError(
                "Single-threaded platform cannot have a thread pool".to_string(),
            ));
        }
        Ok(())
    }
}
