/// Isolate 创建配置

use serde::{Deserialize, Serialize};
use super::{ConfigResult, ConfigError};

/// 堆大小限制（字节）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeapLimitsConfig {
    /// 初始堆大小，0 表示由引擎决定
    pub initial: usize,
    /// 堆大小硬上限
    pub max: usize,
}

/// 嵌入器包装对象的类型信息偏移
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedderWrapperOffsets {
    pub type_index: i32,
    pub object_index: i32,
}

/// Isolate 创建配置，未设置的选项沿用引擎默认值
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsolateConfig {
    /// 是否允许 Atomics.wait
    pub allow_atomics_wait: Option<bool>,

    /// 无 SafeForTerminationScope 时推迟终止
    pub only_terminate_in_safe_scope: Option<bool>,

    /// 堆大小限制
    pub heap_limits: Option<HeapLimitsConfig>,

    /// 嵌入器包装偏移
    pub embedder_wrapper_offsets: Option<EmbedderWrapperOffsets>,
}

impl IsolateConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(limits) = self.heap_limits {
            if limits.max == 0 {
                return Err(ConfigError::ValidationError("Heap limit max must be positive".to_string()));
            }
            if limits.max < limits.initial {
                return Err(ConfigError::ValidationError(format!(
                    "Heap limit max {} is below initial {}",
                    limits.max, limits.initial
                )));
            }
        }
        if let Some(offsets) = self.embedder_wrapper_offsets {
            if offsets.type_index < 0 || offsets.object_index < 0 {
                return Err(ConfigError::ValidationError("Negative embedder wrapper offset".to_string()));
            }
        }
        Ok(())
    }
}
