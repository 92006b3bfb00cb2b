//! Context save and restore.
//!
//! A save drains the live core into the current task's stack: registers,
//! compiler scratch, every pending hardware return address and the critical
//! nesting counter, in the same layout the frame builder produces. A
//! restore reads the (possibly different) current task's frame back and
//! returns from the call that entered the port, with `RETFIE` when the task
//! was outside any critical section and a plain `RETURN` otherwise.
//!
//! Voluntary yields and the tick interrupt are the only places a task can
//! be suspended. Both are a save, a scheduler decision, and a restore, with
//! interrupts masked from the first byte saved to the last byte restored.

use bitflags::bitflags;
use khal::{CodeAddress, Intcon};

use super::{SwitchPhase, TaskId, TaskState};
use crate::config::NO_CRITICAL_NESTING;
use crate::frame::{ContextImage, FrameReader, FrameWriter};
use crate::hooks::SchedulerCore;
use crate::port::Port;
use crate::scratch::ScratchSizeProvider;

bitflags! {
    /// What the caller knows about the interrupt state of the code being
    /// suspended.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InterruptHint: u8 {
        /// The suspended code ran with GIEH set even though the core
        /// cleared it on vectoring. Only valid outside critical sections.
        const FORCED_ON = 1 << 7;
    }
}

impl InterruptHint {
    /// Nothing beyond what the nesting counter already records.
    pub const UNCHANGED: Self = Self::empty();
}

/// The task a restore resumed and where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resumption {
    pub task: TaskId,
    /// Program counter after the return.
    pub address: CodeAddress,
    pub interrupts_enabled: bool,
}

impl<S: ScratchSizeProvider> Port<S> {
    /// Save the running task's context into its stack.
    ///
    /// # Panics
    ///
    /// On a save while another save is pending, before the scheduler
    /// started, with `FORCED_ON` inside a critical section, or when the
    /// frame does not fit the task's stack.
    pub fn save_context<C>(&mut self, sched: &C, hint: InterruptHint)
    where
        C: SchedulerCore + ?Sized,
    {
        self.cpu.disable_interrupts();

        match self.phase {
            SwitchPhase::Running => {}
            SwitchPhase::Boot => panic!("context save before the scheduler started"),
            SwitchPhase::Switching | SwitchPhase::Saved => {
                panic!("re-entrant context save")
            }
        }
        let nesting = self.nesting.current();
        if hint.contains(InterruptHint::FORCED_ON) && nesting != NO_CRITICAL_NESTING {
            panic!(
                "interrupt-context save inside a critical section (nesting {})",
                nesting
            );
        }
        self.phase = SwitchPhase::Switching;

        let task = sched.current_task();
        let image = ContextImage {
            registers: *self.cpu.registers(),
            scratch: *self.cpu.scratch(),
            return_stack: *self.cpu.return_stack(),
            nesting,
        };
        let (schema, scratch_len) = (self.schema, self.frame_scratch);
        let Some(stack) = self.stacks.get_mut(task) else {
            panic!("context save for {} which has no stack", task);
        };
        if stack.state != TaskState::Running {
            panic!("context save for {} which is {:?}", task, stack.state);
        }

        let top = stack.top;
        let mut out = FrameWriter::new(stack.memory_mut(), top);
        if let Err(err) = image.encode(schema, scratch_len, &mut out) {
            panic!("context save for {} failed: {}", task, err);
        }
        stack.top = out.finish();
        stack.state = TaskState::Suspended;
        self.cpu.return_stack_mut().clear();
        self.phase = SwitchPhase::Saved;

        log::trace!(
            "switch: saved {} ({} return entries, nesting {}), sp {}",
            task,
            image.return_stack.depth(),
            nesting,
            stack.top.offset()
        );
    }

    /// Restore the current task's context and return into it.
    ///
    /// # Panics
    ///
    /// Without a preceding save (outside bootstrap), when the current task
    /// has no saved frame, or when the frame is corrupt.
    pub fn restore_context<C>(&mut self, sched: &C) -> Resumption
    where
        C: SchedulerCore + ?Sized,
    {
        self.cpu.disable_interrupts();

        match self.phase {
            SwitchPhase::Boot | SwitchPhase::Saved => {}
            SwitchPhase::Running | SwitchPhase::Switching => {
                panic!("context restore without a saved context")
            }
        }
        self.phase = SwitchPhase::Switching;

        let task = sched.current_task();
        let (schema, scratch_len) = (self.schema, self.frame_scratch);
        let Some(stack) = self.stacks.get_mut(task) else {
            panic!("context restore for {} which has no stack", task);
        };
        if stack.state != TaskState::Suspended {
            panic!("context restore for {} which is {:?}", task, stack.state);
        }

        let mut input = FrameReader::new(stack.memory(), stack.top);
        let image = match ContextImage::decode(schema, scratch_len, &mut input) {
            Ok(image) => image,
            Err(err) => panic!("corrupt frame for {}: {}", task, err),
        };
        stack.top = input.finish();
        stack.state = TaskState::Running;

        self.nesting.load(image.nesting);
        *self.cpu.return_stack_mut() = image.return_stack;
        self.cpu.scratch_mut()[..scratch_len].copy_from_slice(&image.scratch[..scratch_len]);
        for field in schema.context {
            self.cpu.set_sfr(field.register, image.registers.get(field.register));
        }

        let resumed = if self.nesting.is_outside() {
            self.cpu.retfie()
        } else {
            self.cpu.ret()
        };
        let address = match resumed {
            Ok(address) => address,
            Err(err) => panic!("frame for {} holds no return address: {}", task, err),
        };
        self.phase = SwitchPhase::Running;

        log::trace!(
            "switch: restored {} at {:#07x}, nesting {}",
            task,
            address,
            image.nesting
        );

        Resumption {
            task,
            address,
            interrupts_enabled: self.cpu.interrupts_enabled(),
        }
    }

    /// Give up the core: save, let the scheduler pick, restore.
    ///
    /// Entered by a `CALL` from task code, so the top of the hardware
    /// return stack is where the yielding task continues.
    pub fn yield_now<C>(&mut self, sched: &mut C) -> Resumption
    where
        C: SchedulerCore + ?Sized,
    {
        self.save_context(&*sched, InterruptHint::UNCHANGED);
        sched.switch_context();
        self.restore_context(&*sched)
    }

    /// Body of the tick interrupt. The core has already vectored: the
    /// interrupted PC is on the return stack and GIEH is clear.
    pub fn tick_interrupt<C>(&mut self, sched: &mut C) -> Resumption
    where
        C: SchedulerCore + ?Sized,
    {
        self.save_context(&*sched, InterruptHint::FORCED_ON);

        let intcon = self.cpu.intcon();
        self.cpu.set_intcon(intcon.difference(Intcon::TMR0IF));

        sched.increment_tick();
        if self.config.preemptive {
            sched.switch_context();
        }
        self.restore_context(&*sched)
    }
}
