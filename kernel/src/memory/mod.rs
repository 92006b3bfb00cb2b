//! Dynamic memory shared between tasks.

pub mod heap;

pub use heap::{GeneralAllocator, GuardedHeap, LinkedListAllocator, SuspendGuard};
