//! Collaborators the port calls out to.
//!
//! The port moves bytes between the core and task stacks. Deciding which
//! task runs, arming the tick hardware and jumping into code all belong to
//! someone else, and reach the port through these traits.

use khal::timer::Timer0;
use khal::Pic18;

use crate::task::TaskId;

/// The portable half of the scheduler.
pub trait SchedulerCore {
    /// The task whose frame the next save or restore touches.
    fn current_task(&self) -> TaskId;

    /// Choose the next task to run; may change [`current_task`].
    ///
    /// [`current_task`]: SchedulerCore::current_task
    fn switch_context(&mut self);

    /// Stop context switches until the matching [`resume_all`].
    /// Calls nest.
    ///
    /// [`resume_all`]: SchedulerCore::resume_all
    fn suspend_all(&mut self);

    /// Undo one [`suspend_all`]. Returns whether a switch happened while
    /// resuming.
    ///
    /// [`suspend_all`]: SchedulerCore::suspend_all
    fn resume_all(&mut self) -> bool;

    /// Tick bookkeeping, run from the tick interrupt before any switch.
    fn increment_tick(&mut self);
}

/// Hardware that raises the periodic tick interrupt.
pub trait TickSource {
    /// Program and enable the tick. Must leave GIEH alone: interrupts
    /// come on with the first task's restore.
    fn setup_tick(&mut self, cpu: &mut Pic18);
}

impl TickSource for Timer0 {
    fn setup_tick(&mut self, cpu: &mut Pic18) {
        self.arm(cpu);
    }
}

/// Hands the core over for good.
pub trait Dispatch {
    /// Start executing at `cpu.pc()` with the loaded context.
    fn dispatch(&mut self, cpu: &mut Pic18) -> !;

    /// Reset the device.
    fn reset(&mut self, cpu: &mut Pic18) -> !;
}
