//! Task stacks, context switching and scheduler start-up.

pub mod arena;
pub mod bootstrap;
pub mod switch;

pub use arena::{StackArena, TaskId, TaskStack, TaskState};
pub use switch::{InterruptHint, Resumption};

/// Where the port is in the save/restore cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchPhase {
    /// The scheduler has not started; only the bootstrap restore is legal.
    Boot,
    /// A task is running; the next step is a save.
    Running,
    /// A save or restore is moving bytes.
    Switching,
    /// A context was saved; the next step is a restore.
    Saved,
}
