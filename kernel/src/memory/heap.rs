//! Task-safe heap — general-purpose allocator behind scheduler suspension.
//!
//! **Foundation:** any [`GeneralAllocator`] can sit behind the wrapper. The
//! one shipped here, [`LinkedListAllocator`], is `linked_list_allocator::Heap`
//! with a size header in front of every block, so `free` needs nothing but
//! the pointer.
//!
//! **Exclusion:** allocator state is shared by every task. Rather than
//! masking interrupts for the length of a first-fit search, the wrapper
//! suspends the scheduler: the tick keeps counting but no other task can
//! run until the call finishes. The inner `spin::Mutex` only makes the
//! wrapper `Sync`; with switching suspended it is never contended.

use core::alloc::Layout;
use core::mem::{self, MaybeUninit};
use core::ptr::NonNull;

use linked_list_allocator::Heap;
use spin::{Mutex, MutexGuard};

use crate::hooks::SchedulerCore;

/// A black-box allocator.
pub trait GeneralAllocator {
	/// Allocate `size` bytes, or `None` when out of memory.
	fn allocate(&mut self, size: usize) -> Option<NonNull<u8>>;

	/// Return a block to the allocator.
	///
	/// # Safety
	///
	/// `ptr` must have come from [`allocate`](GeneralAllocator::allocate)
	/// on this allocator and must not have been freed since.
	unsafe fn free(&mut self, ptr: NonNull<u8>);
}

// ── Scheduler suspension ────────────────────────────────────────

/// Keeps the scheduler suspended while alive.
///
/// Created with `suspend_all`, dropped with `resume_all`, so every exit
/// path resumes exactly once.
pub struct SuspendGuard<'a, C: SchedulerCore + ?Sized> {
	sched: &'a mut C,
}

impl<'a, C: SchedulerCore + ?Sized> SuspendGuard<'a, C> {
	pub fn new(sched: &'a mut C) -> Self {
		sched.suspend_all();
		Self { sched }
	}
}

impl<C: SchedulerCore + ?Sized> Drop for SuspendGuard<'_, C> {
	fn drop(&mut self) {
		// A switch that happened while resuming is the scheduler's business.
		let _ = self.sched.resume_all();
	}
}

// ── Guarded heap ────────────────────────────────────────────────

pub struct GuardedHeap<A> {
	inner: Mutex<A>,
}

impl<A: GeneralAllocator> GuardedHeap<A> {
	pub const fn new(allocator: A) -> Self {
		Self {
			inner: Mutex::new(allocator),
		}
	}

	/// Allocate with task switches suspended. The allocator's answer is
	/// passed through unchanged.
	pub fn malloc<C>(&self, sched: &mut C, size: usize) -> Option<NonNull<u8>>
	where
		C: SchedulerCore + ?Sized,
	{
		let _suspended = SuspendGuard::new(sched);
		let block = self.inner.lock().allocate(size);
		if block.is_none() {
			log::warn!("heap: allocation of {} bytes failed", size);
		}
		block
	}

	/// Free with task switches suspended. `None` does nothing and leaves
	/// the scheduler alone.
	///
	/// # Safety
	///
	/// Same contract as [`GeneralAllocator::free`].
	pub unsafe fn free<C>(&self, sched: &mut C, ptr: Option<NonNull<u8>>)
	where
		C: SchedulerCore + ?Sized,
	{
		let Some(ptr) = ptr else {
			return;
		};
		let _suspended = SuspendGuard::new(sched);
		// SAFETY: forwarded from the caller.
		unsafe { self.inner.lock().free(ptr) };
	}

	/// The wrapped allocator, for inspection.
	pub fn allocator(&self) -> MutexGuard<'_, A> {
		self.inner.lock()
	}
}

// ── Linked-list backend ─────────────────────────────────────────

/// Bytes in front of every block holding its requested size.
const HEADER: usize = mem::size_of::<usize>();

fn block_layout(size: usize) -> Option<Layout> {
	Layout::from_size_align(size.checked_add(HEADER)?, HEADER).ok()
}

/// First-fit allocator over one static region.
pub struct LinkedListAllocator {
	heap: Heap,
}

impl LinkedListAllocator {
	/// An allocator with no memory; every allocation fails.
	pub const fn empty() -> Self {
		Self { heap: Heap::empty() }
	}

	pub fn from_slice(region: &'static mut [MaybeUninit<u8>]) -> Self {
		Self {
			heap: Heap::from_slice(region),
		}
	}

	/// Bytes handed out, headers and padding included.
	pub fn used(&self) -> usize {
		self.heap.used()
	}

	pub fn free_bytes(&self) -> usize {
		self.heap.free()
	}
}

impl GeneralAllocator for LinkedListAllocator {
	fn allocate(&mut self, size: usize) -> Option<NonNull<u8>> {
		let layout = block_layout(size)?;
		let base = self.heap.allocate_first_fit(layout).ok()?;
		// SAFETY: the block is at least HEADER + size bytes and aligned
		// for usize.
		unsafe {
			base.as_ptr().cast::<usize>().write(size);
			Some(NonNull::new_unchecked(base.as_ptr().add(HEADER)))
		}
	}

	unsafe fn free(&mut self, ptr: NonNull<u8>) {
		// SAFETY: `ptr` came from `allocate`, so a header sits right
		// below it.
		unsafe {
			let base = ptr.as_ptr().sub(HEADER);
			let size = base.cast::<usize>().read();
			if let Some(layout) = block_layout(size) {
				self.heap.deallocate(NonNull::new_unchecked(base), layout);
			}
		}
	}
}
