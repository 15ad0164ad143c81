//! 进程内参考引擎
//!
//! 用纯 Rust 实现完整的根 vtable，使绑定层在没有原生 `v8core` 库时也能
//! 运行和测试。它遵守与原生库相同的句柄约定：
//!
//! - isolate 持有一个 handle scope 帧栈，局部句柄分配在创建它的帧中，
//!   帧关闭时一并释放
//! - 编译、执行、`ToString` 需要已进入上下文的 scope
//! - 乱序关闭 scope 会记录一次顺序违规（见 [`EngineStats`]）
//! - platform 以原子引用计数共享
//!
//! 脚本由一个表达式求值器执行，支持原始值、模板字符串、算术/比较/逻辑
//! 运算、`typeof`、`Symbol(...)` 与 `throw`。

mod eval;
mod heap;
mod vtables;

use crate::abi::{IsolateCreateParams, RootVTable, ABI_VERSION};
use crate::core::RegistryResult;
use crate::registry::Registry;
use std::cell::Cell;

/// 引擎事件计数（按线程统计，测试可并行运行）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub isolates_created: u64,
    pub isolates_released: u64,
    pub handle_scopes_opened: u64,
    pub handle_scopes_closed: u64,
    pub context_scopes_opened: u64,
    pub context_scopes_closed: u64,
    pub platforms_created: u64,
    pub platform_clones: u64,
    pub platform_releases: u64,
    /// 非栈顶 scope 被关闭的次数
    pub scope_order_violations: u64,
}

thread_local! {
    static STATS: Cell<EngineStats> = Cell::new(EngineStats::default());
    static LAST_PARAMS: Cell<Option<IsolateCreateParams>> = const { Cell::new(None) };
}

pub(crate) fn record(update: impl FnOnce(&mut EngineStats)) {
    STATS.with(|cell| {
        let mut stats = cell.get();
        update(&mut stats);
        cell.set(stats);
    });
}

fn set_last_params(params: IsolateCreateParams) {
    LAST_PARAMS.with(|cell| cell.set(Some(params)));
}

/// 当前线程的计数快照
pub fn stats() -> EngineStats {
    STATS.with(Cell::get)
}

/// 当前线程最近一次创建 isolate 时收到的参数
pub fn last_create_params() -> Option<IsolateCreateParams> {
    LAST_PARAMS.with(Cell::get)
}

/// 参考引擎的根 vtable
pub fn root_vtable() -> &'static RootVTable {
    &vtables::ROOT_VTABLE
}

/// 把参考引擎注册为进程的 vtable 来源（重复调用返回同一注册表）
pub fn install() -> RegistryResult<&'static Registry> {
    Registry::install(root_vtable(), ABI_VERSION)
}
