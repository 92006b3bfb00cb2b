//! Scheduler start and stop.

use crate::hooks::{Dispatch, SchedulerCore, TickSource};
use crate::port::Port;
use crate::scratch::ScratchSizeProvider;

impl<S: ScratchSizeProvider> Port<S> {
    /// Start the first task. Never returns.
    ///
    /// Arms the tick, then restores the scheduler's current task exactly
    /// as if it had been suspended, and hands the core to `dispatch`. A
    /// freshly built frame holds nesting 0, so the task starts with
    /// interrupts enabled and the boot sentinel is gone.
    ///
    /// # Panics
    ///
    /// When called a second time.
    pub fn start_scheduler<C, T, D>(&mut self, sched: &mut C, tick: &mut T, dispatch: &mut D) -> !
    where
        C: SchedulerCore + ?Sized,
        T: TickSource + ?Sized,
        D: Dispatch + ?Sized,
    {
        if self.started {
            panic!("scheduler already started");
        }
        self.started = true;

        tick.setup_tick(&mut self.cpu);
        let first = self.restore_context(&*sched);
        log::debug!(
            "bootstrap: starting {} at {:#07x} ({} tasks)",
            first.task,
            first.address,
            self.stacks.len()
        );

        dispatch.dispatch(&mut self.cpu)
    }

    /// Stop the scheduler. The device has nowhere to return to, so this
    /// resets it.
    pub fn end_scheduler<D>(&mut self, dispatch: &mut D) -> !
    where
        D: Dispatch + ?Sized,
    {
        log::warn!("bootstrap: scheduler stopped, resetting");
        self.cpu.disable_interrupts();
        dispatch.reset(&mut self.cpu)
    }
}
