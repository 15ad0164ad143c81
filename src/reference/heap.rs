//! isolate 的句柄堆：帧栈、局部句柄槽位、上下文栈

use super::eval::{Program, Value};
use super::record;
use crate::abi::IsolateCreateParams;

/// 局部句柄指向的槽位，地址在所属帧关闭前保持不变
#[derive(Debug)]
pub(crate) enum Slot {
    Value(Value),
    Script(Program),
    Context(u64),
}

#[derive(Debug)]
struct Frame {
    id: u64,
    slots: Vec<Box<Slot>>,
}

/// 单个 isolate 的全部状态
#[derive(Debug)]
pub(crate) struct IsolateState {
    params: IsolateCreateParams,
    frames: Vec<Frame>,
    context_scopes: Vec<u64>,
    next_id: u64,
}

/// handle scope 的原生本体（宿主持有其地址）
#[derive(Debug)]
pub(crate) struct ScopeCell {
    pub isolate: *mut IsolateState,
    pub frame: u64,
    pub context: Option<u64>,
}

impl IsolateState {
    pub fn new(params: IsolateCreateParams) -> Self {
        Self {
            params,
            frames: Vec::new(),
            context_scopes: Vec::new(),
            next_id: 1,
        }
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// 字符串字节上限（未设置堆限制时为 `None`）
    pub fn heap_limit(&self) -> Option<usize> {
        self.params
            .set_heap_limits
            .then_some(self.params.heap_limits_max)
            .filter(|max| *max > 0)
    }

    pub fn open_frame(&mut self) -> u64 {
        let id = self.next_id();
        self.frames.push(Frame {
            id,
            slots: Vec::new(),
        });
        id
    }

    /// 关闭帧并释放其槽位；不是栈顶时记录一次顺序违规但仍然释放
    pub fn close_frame(&mut self, id: u64) {
        match self.frames.iter().rposition(|frame| frame.id == id) {
            Some(pos) if pos + 1 == self.frames.len() => {
                self.frames.pop();
            }
            Some(pos) => {
                record(|stats| stats.scope_order_violations += 1);
                tracing::error!(
                    target: "v8core::reference",
                    "HandleScope {} closed while {} newer scope(s) remain open",
                    id,
                    self.frames.len() - pos - 1
                );
                self.frames.remove(pos);
            }
            None => {
                tracing::error!(target: "v8core::reference", "Closing unknown HandleScope {}", id);
            }
        }
    }

    /// 在帧中分配槽位，帧已关闭时返回 `None`
    pub fn alloc(&mut self, frame: u64, slot: Slot) -> Option<*mut Slot> {
        let frame = self.frames.iter_mut().rev().find(|f| f.id == frame)?;
        let mut boxed = Box::new(slot);
        let ptr: *mut Slot = &mut *boxed;
        frame.slots.push(boxed);
        Some(ptr)
    }

    pub fn new_context(&mut self) -> u64 {
        self.next_id()
    }

    pub fn enter_context(&mut self) -> u64 {
        let id = self.next_id();
        self.context_scopes.push(id);
        id
    }

    pub fn exit_context(&mut self, id: u64) {
        match self.context_scopes.iter().rposition(|scope| *scope == id) {
            Some(pos) if pos + 1 == self.context_scopes.len() => {
                self.context_scopes.pop();
            }
            Some(pos) => {
                record(|stats| stats.scope_order_violations += 1);
                tracing::error!(
                    target: "v8core::reference",
                    "ContextScope {} exited out of order",
                    id
                );
                self.context_scopes.remove(pos);
            }
            None => {
                tracing::error!(target: "v8core::reference", "Exiting unknown ContextScope {}", id);
            }
        }
    }

    pub fn open_frames(&self) -> usize {
        self.frames.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::stats;

    #[test]
    fn test_frames_release_slots_in_order() {
        let mut state = IsolateState::new(IsolateCreateParams::default());
        let outer = state.open_frame();
        let inner = state.open_frame();
        assert!(state.alloc(inner, Slot::Value(Value::Null)).is_some());
        state.close_frame(inner);
        assert!(state.alloc(inner, Slot::Value(Value::Null)).is_none());
        assert!(state.alloc(outer, Slot::Context(7)).is_some());
        state.close_frame(outer);
        assert_eq!(state.open_frames(), 0);
    }

    #[test]
    fn test_out_of_order_close_is_counted() {
        let before = stats().scope_order_violations;
        let mut state = IsolateState::new(IsolateCreateParams::default());
        let outer = state.open_frame();
        let inner = state.open_frame();
        state.close_frame(outer);
        state.close_frame(inner);
        assert_eq!(stats().scope_order_violations - before, 1);
        assert_eq!(state.open_frames(), 0);

        let first = state.enter_context();
        let second = state.enter_context();
        state.exit_context(first);
        state.exit_context(second);
        assert_eq!(stats().scope_order_violations - before, 2);
    }

    #[test]
    fn test_heap_limit_requires_flag() {
        let mut params = IsolateCreateParams::default();
        assert_eq!(IsolateState::new(params).heap_limit(), None);
        params.set_heap_limits = true;
        params.heap_limits_max = 64;
        assert_eq!(IsolateState::new(params).heap_limit(), Some(64));
    }
}
