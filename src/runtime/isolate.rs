//! Isolate：顶层执行环境
//!
//! 独占一个原生 isolate，记录创建线程，只释放一次。

use super::scope::AsIsolate;
use super::v8::V8;
use crate::abi::{CounterLookupCallback, IsolateCreateParams, IsolateOpaque, OwnedIsolateOpaque};
use crate::config::IsolateConfig;
use crate::core::{V8Error, V8Result};
use crate::registry;
use std::cell::Cell;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, ThreadId};

/// isolate 创建参数
///
/// 只有显式设置过的选项会转发给引擎，其余沿用引擎默认值。
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateParams {
    raw: IsolateCreateParams,
}

impl CreateParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// 统计计数器查找回调
    ///
    /// # Safety
    ///
    /// 回调会被引擎在任意时刻以任意计数器名调用，返回的指针必须在
    /// isolate 存活期间有效（或为空）。
    pub unsafe fn counter_lookup_callback(mut self, callback: CounterLookupCallback) -> Self {
        self.raw.counter_lookup_callback = Some(callback);
        self
    }

    /// 是否允许调用 `Atomics.wait`
    pub fn allow_atomics_wait(mut self, value: impl Into<Option<bool>>) -> Self {
        let value: Option<bool> = value.into();
        self.raw.allow_atomics_wait = value.into();
        self
    }

    /// 无安全终止作用域时推迟终止
    pub fn only_terminate_in_safe_scope(mut self, value: impl Into<Option<bool>>) -> Self {
        let value: Option<bool> = value.into();
        self.raw.only_terminate_in_safe_scope = value.into();
        self
    }

    /// 快速 C API 使用的包装对象类型信息偏移
    pub fn embedder_wrapper_type_info_offsets(mut self, type_index: i32, object_index: i32) -> Self {
        self.raw.set_embedder_wrapper_type_info_offsets = true;
        self.raw.embedder_wrapper_type_index = type_index;
        self.raw.embedder_wrapper_object_index = object_index;
        self
    }

    /// 堆大小限制（字节）。`initial` 为 0 时由引擎决定初始大小。
    pub fn heap_limits(mut self, initial: usize, max: usize) -> Self {
        self.raw.set_heap_limits = true;
        self.raw.heap_limits_initial = initial;
        self.raw.heap_limits_max = max;
        self
    }

    pub fn get_allow_atomics_wait(&self) -> Option<bool> {
        self.raw.allow_atomics_wait.as_opt()
    }

    pub fn get_only_terminate_in_safe_scope(&self) -> Option<bool> {
        self.raw.only_terminate_in_safe_scope.as_opt()
    }

    pub fn get_heap_limits(&self) -> Option<(usize, usize)> {
        self.raw
            .set_heap_limits
            .then_some((self.raw.heap_limits_initial, self.raw.heap_limits_max))
    }

    pub fn get_embedder_wrapper_type_info_offsets(&self) -> Option<(i32, i32)> {
        self.raw.set_embedder_wrapper_type_info_offsets.then_some((
            self.raw.embedder_wrapper_type_index,
            self.raw.embedder_wrapper_object_index,
        ))
    }

    /// 原样转发给原生层的参数块
    pub fn as_raw(&self) -> &IsolateCreateParams {
        &self.raw
    }
}

impl From<&IsolateConfig> for CreateParams {
    fn from(config: &IsolateConfig) -> Self {
        let mut params = CreateParams::new()
            .allow_atomics_wait(config.allow_atomics_wait)
            .only_terminate_in_safe_scope(config.only_terminate_in_safe_scope);
        if let Some(limits) = config.heap_limits {
            params = params.heap_limits(limits.initial, limits.max);
        }
        if let Some(offsets) = config.embedder_wrapper_offsets {
            params = params.embedder_wrapper_type_info_offsets(offsets.type_index, offsets.object_index);
        }
        params
    }
}

/// 独占的 isolate
///
/// 可以移交给其他线程（`Send`），但不能共享（`!Sync`）；
/// 进入 isolate 的操作只允许在创建线程上执行。
pub struct Isolate {
    raw: OwnedIsolateOpaque,
    owner: ThreadId,
    disposed: AtomicBool,
    _not_sync: PhantomData<Cell<()>>,
}

impl Isolate {
    /// 以引擎默认参数在当前线程创建 isolate
    pub fn create_on_current_thread() -> V8Result<Self> {
        V8::assert_initialized()?;
        let raw = unsafe { (registry::loaded().isolate.ctor_default)() };
        Ok(Self::adopt(raw))
    }

    /// 以给定参数在当前线程创建 isolate
    pub fn create_on_current_thread_with(params: CreateParams) -> V8Result<Self> {
        V8::assert_initialized()?;
        let raw = unsafe { (registry::loaded().isolate.ctor)(params.raw) };
        Ok(Self::adopt(raw))
    }

    fn adopt(raw: OwnedIsolateOpaque) -> Self {
        let owner = thread::current().id();
        tracing::debug!(target: "v8core::isolate", "Isolate {:#x} created on {:?}", raw.0, owner);
        Self {
            raw,
            owner,
            disposed: AtomicBool::new(false),
            _not_sync: PhantomData,
        }
    }

    /// 释放原生 isolate，重复调用无效果
    pub fn dispose(&mut self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        if thread::current().id() != self.owner {
            tracing::warn!(
                target: "v8core::isolate",
                "Isolate {:#x} released off its creating thread",
                self.raw.0
            );
        }
        unsafe { (registry::loaded().isolate.drop)(OwnedIsolateOpaque(self.raw.0)) };
        tracing::debug!(target: "v8core::isolate", "Isolate {:#x} disposed", self.raw.0);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// 创建线程
    pub fn owner_thread(&self) -> ThreadId {
        self.owner
    }

    /// 进入 isolate 前的检查：未释放且位于创建线程
    pub(crate) fn enter(&mut self) -> V8Result<*mut OwnedIsolateOpaque> {
        if self.is_disposed() {
            return Err(V8Error::IsolateDisposed);
        }
        if thread::current().id() != self.owner {
            return Err(V8Error::WrongThread);
        }
        Ok(&mut self.raw)
    }

    /// 非拥有的 isolate 视图
    pub fn as_ref(&mut self) -> V8Result<IsolateRef<'_>> {
        let raw = self.enter()?;
        let ptr = unsafe { (registry::loaded().isolate.deref)(raw) };
        Ok(IsolateRef::from_raw(ptr))
    }
}

impl Drop for Isolate {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Isolate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Isolate")
            .field("raw", &format_args!("{:#x}", self.raw.0))
            .field("owner", &self.owner)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// 非拥有的 isolate 引用，只在来源存活期间有效
#[derive(Debug, Clone, Copy)]
pub struct IsolateRef<'a> {
    ptr: *mut IsolateOpaque,
    _marker: PhantomData<&'a ()>,
}

impl<'a> IsolateRef<'a> {
    pub(crate) fn from_raw(ptr: *mut IsolateOpaque) -> Self {
        Self {
            ptr,
            _marker: PhantomData,
        }
    }

    pub fn as_ptr(&self) -> *mut IsolateOpaque {
        self.ptr
    }
}

impl PartialEq for IsolateRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.ptr, other.ptr)
    }
}

impl Eq for IsolateRef<'_> {}

impl AsIsolate for IsolateRef<'_> {
    fn isolate_ptr(&self) -> *mut IsolateOpaque {
        self.ptr
    }
}
