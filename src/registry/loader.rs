//! 原生库加载
//!
//! 通过 libloading 打开 `v8core` 共享库并解析根 vtable 与 ABI 版本符号。

use crate::abi::{RootVTable, ABI_VERSION};
use crate::config::LibraryConfig;
use crate::core::{RegistryError, RegistryResult};
use libloading::{Library, Symbol};
use std::path::Path;

/// 根 vtable 入口函数
type GetRootVTable = unsafe extern "C" fn() -> *const RootVTable;

/// ABI 版本入口函数
type GetAbiVersion = unsafe extern "C" fn() -> u32;

/// 已打开的原生库及其导出的根表
pub(crate) struct LoadedLibrary {
    /// 库句柄，保持映射直到进程结束
    pub library: Library,
    pub root: *const RootVTable,
    pub abi_version: u32,
}

/// 打开原生库并解析入口符号
///
/// 不含目录的库名交给系统加载器按搜索路径查找。
pub(crate) fn open(path: &Path, config: &LibraryConfig) -> RegistryResult<LoadedLibrary> {
    unsafe {
        let library = Library::new(path).map_err(|e| {
            RegistryError::LibraryLoad(format!("{}: {}", path.display(), e))
        })?;

        let (root, abi_version) = {
            // 约定：原生库必须导出根 vtable 入口
            let get_root: Symbol<GetRootVTable> = library
                .get(config.root_symbol.as_bytes())
                .map_err(|_| RegistryError::SymbolMissing(config.root_symbol.clone()))?;

            // ABI 版本符号可选，缺失时按版本 1 处理
            let abi_version = match library.get::<GetAbiVersion>(config.abi_symbol.as_bytes()) {
                Ok(get_version) => get_version(),
                Err(_) => ABI_VERSION,
            };

            (get_root(), abi_version)
        };

        tracing::info!(
            target: "v8core::registry",
            "Loaded native library {} (abi {})",
            path.display(),
            abi_version
        );

        Ok(LoadedLibrary {
            library,
            root,
            abi_version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_library_file() {
        let config = LibraryConfig::default();
        let result = open(Path::new("/nonexistent/libv8core.so"), &config);
        assert!(matches!(result, Err(RegistryError::LibraryLoad(_))));
    }

    #[test]
    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    fn test_bare_name_uses_loader_search_path() {
        // libc 总在搜索路径上，能打开说明没有按文件路径预先拒绝
        let result = open(Path::new("libc.so.6"), &LibraryConfig::default());
        assert!(matches!(
            result,
            Err(RegistryError::SymbolMissing(ref symbol)) if symbol == "coplt_v8core_get_root_vtable"
        ));
    }

    #[test]
    fn test_missing_bare_name_reports_loader_error() {
        let result = open(Path::new("libv8core_not_installed.so"), &LibraryConfig::default());
        match result {
            Err(RegistryError::LibraryLoad(message)) => {
                assert!(message.contains("libv8core_not_installed.so"))
            }
            _ => panic!("expected a library load error"),
        }
    }

    #[test]
    fn test_non_library_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("libv8core.so");
        std::fs::write(&path, b"not an elf").unwrap();

        let result = open(&path, &LibraryConfig::default());
        assert!(matches!(result, Err(RegistryError::LibraryLoad(_))));
    }
}
