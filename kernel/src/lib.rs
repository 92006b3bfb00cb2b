// =============================================================================
// WizPort — Scheduler Port for PIC18 / wizC
// =============================================================================
//
// The architecture layer under a preemptive task scheduler on an 8-bit
// PIC18 with a hardware return stack and no frame pointer.
//
// WHAT IT PROVIDES:
//   - a byte-exact stack frame the core's own RETURN/RETFIE resumes
//     (`frame`),
//   - critical section nesting that survives task switches (`sync`),
//   - context save/restore, yield and the tick interrupt (`task::switch`),
//   - scheduler start and stop (`task::bootstrap`),
//   - the minimum task stack size (`stack_size`),
//   - a heap wrapper that keeps other tasks out of the allocator (`memory`).
//
// WHAT IT DOES NOT:
//   Pick tasks, count ticks or manage blocks of memory. Those belong to the
//   scheduler core and the allocator behind the traits in `hooks`.
//
// Everything operates on a `khal::Pic18`, so the same code runs against the
// silicon model on a host and in tests.
// =============================================================================

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod config;
pub mod error;
pub mod frame;
pub mod hooks;
pub mod memory;
pub mod port;
pub mod scratch;
pub mod stack_size;
pub mod sync;
pub mod task;

pub use config::{NestingPolicy, PortConfig, TargetProfile};
pub use error::PortError;
pub use frame::{FrameError, StackPointer};
pub use hooks::{Dispatch, SchedulerCore, TickSource};
pub use memory::{GeneralAllocator, GuardedHeap, LinkedListAllocator};
pub use port::Port;
pub use scratch::{FixedScratch, Routine, ScratchSizeProvider};
pub use task::{InterruptHint, Resumption, TaskId, TaskState};
