//! vtable 注册表
//!
//! 进程内唯一、惰性建立、建立后只读的函数指针表集合。所有子系统表都从
//! 同一个根表取得。建立失败（找不到原生库、ABI 版本不符、表指针为空）
//! 以初始化错误返回，绝不静默忽略。

mod loader;

use crate::abi::*;
use crate::config::{BindingConfig, LibraryConfig};
use crate::core::{RegistryError, RegistryResult};
use libloading::Library;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// 串行化建立过程（比较现有根表与候选根表需要原子地完成）
static INIT_LOCK: Mutex<()> = Mutex::new(());

/// 根表来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrySource {
    /// 进程内静态表
    Static,
    /// 动态加载的原生库
    Library(PathBuf),
}

/// 已解析的 vtable 集合
pub struct Registry {
    root: &'static RootVTable,
    pub(crate) v8: &'static V8VTable,
    pub(crate) platform: &'static PlatformVTable,
    pub(crate) isolate: &'static IsolateVTable,
    pub(crate) handle_scope: &'static HandleScopeVTable,
    pub(crate) handle_scope_isolate: &'static HandleScopeImplVTable,
    pub(crate) context: &'static ContextVTable,
    pub(crate) context_scope: &'static ContextScopeVTable,
    pub(crate) context_scope_isolate: &'static ContextScopeImplVTable,
    pub(crate) script: &'static ScriptVTable,
    pub(crate) value: &'static ValueVTable,
    pub(crate) string: &'static StringVTable,
    abi_version: u32,
    source: RegistrySource,
    /// 保持原生库映射
    _library: Option<Library>,
}

fn table<T>(ptr: *const T, name: &'static str) -> RegistryResult<&'static T> {
    unsafe { ptr.as_ref() }.ok_or(RegistryError::NullTable(name))
}

impl Registry {
    /// 校验根表并解析全部子系统表
    fn resolve(
        root: *const RootVTable,
        abi_version: u32,
        source: RegistrySource,
        library: Option<Library>,
    ) -> RegistryResult<Self> {
        if abi_version != ABI_VERSION {
            return Err(RegistryError::AbiMismatch {
                expected: ABI_VERSION,
                found: abi_version,
            });
        }

        let root = table(root, "root")?;
        let handle_scope = table(root.handle_scope, "handle_scope")?;
        let context_scope = table(root.context_scope, "context_scope")?;

        Ok(Self {
            root,
            v8: table(root.v8, "v8")?,
            platform: table(root.platform, "platform")?,
            isolate: table(root.isolate, "isolate")?,
            handle_scope,
            handle_scope_isolate: table(handle_scope.isolate, "handle_scope.isolate")?,
            context: table(root.context, "context")?,
            context_scope,
            context_scope_isolate: table(context_scope.isolate, "context_scope.isolate")?,
            script: table(root.script, "script")?,
            value: table(root.value, "value")?,
            string: table(root.string, "string")?,
            abi_version,
            source,
            _library: library,
        })
    }

    /// 发布到进程全局；同一根表重复发布是幂等的
    fn publish(candidate: Registry) -> RegistryResult<&'static Registry> {
        let _guard = INIT_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = REGISTRY.get() {
            return if std::ptr::eq(existing.root, candidate.root) {
                Ok(existing)
            } else {
                Err(RegistryError::AlreadyInitialized)
            };
        }
        let registry = REGISTRY.get_or_init(|| candidate);
        tracing::debug!(
            target: "v8core::registry",
            "Registry established from {:?}",
            registry.source
        );
        Ok(registry)
    }

    /// 安装进程内（静态链接）的根表
    pub fn install(root: &'static RootVTable, abi_version: u32) -> RegistryResult<&'static Registry> {
        let candidate = Self::resolve(root, abi_version, RegistrySource::Static, None)?;
        Self::publish(candidate)
    }

    /// 以默认符号名加载原生库
    pub fn load(path: impl AsRef<Path>) -> RegistryResult<&'static Registry> {
        Self::load_with(path, &LibraryConfig::default())
    }

    /// 以指定符号名加载原生库
    pub fn load_with(path: impl AsRef<Path>, config: &LibraryConfig) -> RegistryResult<&'static Registry> {
        let path = path.as_ref();
        let loaded = loader::open(path, config)?;
        let candidate = Self::resolve(
            loaded.root,
            loaded.abi_version,
            RegistrySource::Library(path.to_path_buf()),
            Some(loaded.library),
        )?;
        Self::publish(candidate)
    }

    /// 按库配置建立注册表
    ///
    /// 已有注册表时直接返回；没有配置库路径时返回 `NotConfigured`，
    /// 进程内参考引擎只能通过显式安装启用。
    pub fn from_config(config: &LibraryConfig) -> RegistryResult<&'static Registry> {
        if let Some(existing) = REGISTRY.get() {
            return Ok(existing);
        }
        match &config.path {
            Some(path) => Self::load_with(path, config),
            None => Err(RegistryError::NotConfigured),
        }
    }

    /// 取得注册表，首次使用时按发现的配置建立
    ///
    /// 配置文件存在但无法解析或校验失败时返回 `RegistryError::Config`。
    pub fn global() -> RegistryResult<&'static Registry> {
        if let Some(existing) = REGISTRY.get() {
            return Ok(existing);
        }
        let config = BindingConfig::load_or_default()?;
        config.validate()?;
        Self::from_config(&config.library)
    }

    /// 已建立的注册表（不会触发建立）
    pub fn get() -> Option<&'static Registry> {
        REGISTRY.get()
    }

    pub fn abi_version(&self) -> u32 {
        self.abi_version
    }

    pub fn source(&self) -> &RegistrySource {
        &self.source
    }

    /// 根表地址（用于判断两个注册请求是否指向同一组表）
    pub fn root(&self) -> *const RootVTable {
        self.root
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("root", &(self.root as *const RootVTable))
            .field("abi_version", &self.abi_version)
            .field("source", &self.source)
            .finish()
    }
}

/// 句柄操作使用的注册表
///
/// 任何句柄都只能在注册表建立之后创建，这里缺失意味着不变量被破坏。
pub(crate) fn loaded() -> &'static Registry {
    match REGISTRY.get() {
        Some(registry) => registry,
        None => panic!("v8core vtable registry used before initialization"),
    }
}
