//! Task stack arena.
//!
//! Every task owns one heap-allocated stack for its whole life. The arena
//! hands out [`TaskId`]s and never moves or frees a stack, so an id stays
//! valid for as long as the port exists.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use crate::frame::StackPointer;

// ── Task identifiers ────────────────────────────────────────────

/// Index of a task's stack in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u16);

impl TaskId {
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

// ── Task state ──────────────────────────────────────────────────

/// Where a task stands with respect to its saved frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Stack allocated, no frame yet.
    Uninitialised,
    /// A frame sits at `top`, waiting to be restored.
    Suspended,
    /// The task's context is live on the core.
    Running,
}

// ── Task stack ──────────────────────────────────────────────────

/// A task's stack memory and its saved top-of-stack.
pub struct TaskStack {
    memory: Box<[u8]>,
    /// Top-of-stack: the saved frame while `Suspended`, what the task
    /// left on its stack (its parameter) while `Running`.
    pub top: StackPointer,
    pub state: TaskState,
}

impl TaskStack {
    pub fn new(size: usize) -> Self {
        let memory = vec![0u8; size].into_boxed_slice();
        let top = StackPointer::empty(&memory);
        Self {
            memory,
            top,
            state: TaskState::Uninitialised,
        }
    }

    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut [u8] {
        &mut self.memory
    }

    pub fn size(&self) -> usize {
        self.memory.len()
    }

    /// Pointer of the stack with nothing on it.
    pub fn empty_top(&self) -> StackPointer {
        StackPointer::empty(&self.memory)
    }

    /// Bytes between the top and the end of the stack.
    pub fn used_bytes(&self) -> usize {
        self.size() - self.top.offset()
    }
}

impl fmt::Debug for TaskStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskStack")
            .field("size", &self.size())
            .field("top", &self.top)
            .field("state", &self.state)
            .finish()
    }
}

// ── Arena ───────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct StackArena {
    stacks: Vec<TaskStack>,
}

impl StackArena {
    pub const fn new() -> Self {
        Self { stacks: Vec::new() }
    }

    /// Allocate a zeroed stack of `size` bytes. `None` once every id is
    /// taken.
    pub fn allocate(&mut self, size: usize) -> Option<TaskId> {
        let id = TaskId::new(u16::try_from(self.stacks.len()).ok()?);
        self.stacks.push(TaskStack::new(size));
        Some(id)
    }

    pub fn get(&self, id: TaskId) -> Option<&TaskStack> {
        self.stacks.get(id.index())
    }

    pub fn get_mut(&mut self, id: TaskId) -> Option<&mut TaskStack> {
        self.stacks.get_mut(id.index())
    }

    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TaskId, &TaskStack)> {
        self.stacks
            .iter()
            .enumerate()
            .map(|(i, stack)| (TaskId::new(i as u16), stack))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_handed_out_in_order() {
        let mut arena = StackArena::new();
        let a = arena.allocate(32).unwrap();
        let b = arena.allocate(64).unwrap();
        assert_eq!((a.index(), b.index()), (0, 1));
        assert_eq!(arena.get(b).map(TaskStack::size), Some(64));
        assert!(arena.get(TaskId::new(2)).is_none());
    }

    #[test]
    fn ids_never_wrap() {
        let mut arena = StackArena::new();
        for _ in 0..=u16::MAX as usize {
            assert!(arena.allocate(0).is_some());
        }
        assert_eq!(arena.allocate(0), None);
        assert_eq!(arena.len(), u16::MAX as usize + 1);

        let last = TaskId::new(u16::MAX);
        arena.get_mut(last).unwrap().state = TaskState::Running;
        assert_eq!(arena.get(TaskId::new(0)).unwrap().state, TaskState::Uninitialised);
    }

    #[test]
    fn fresh_stack_is_empty_and_uninitialised() {
        let stack = TaskStack::new(48);
        assert_eq!(stack.state, TaskState::Uninitialised);
        assert_eq!(stack.top, stack.empty_top());
        assert_eq!(stack.used_bytes(), 0);
        assert!(stack.memory().iter().all(|&b| b == 0));
    }
}
