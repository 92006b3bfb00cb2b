// =============================================================================
// WizPort — Port Context
// =============================================================================
//
// Everything the port keeps between calls lives in one `Port` value:
//
//   - the live critical nesting counter,
//   - the core whose registers are switched,
//   - the arena of task stacks,
//   - the cached minimum stack size,
//   - the switch phase used to catch a save or restore issued at the
//     wrong moment.
//
// There is exactly one `Port` per image and it is passed around by `&mut`.
// The tick interrupt and task code never run at the same time on this
// single core, so that is all the exclusion it needs.
//
// The scratch size is queried once, here. The builder and the context
// switch must agree on it or a freshly built frame would not restore.
// =============================================================================

use khal::cpu::SCRATCH_RAM_BYTES;
use khal::{CodeAddress, Pic18};
use spin::Once;

use crate::config::{PortConfig, TargetProfile};
use crate::error::PortError;
use crate::frame::{self, FrameSchema, StackPointer};
use crate::scratch::{Routine, ScratchSizeProvider};
use crate::stack_size;
use crate::sync::CriticalNesting;
use crate::task::{StackArena, SwitchPhase, TaskId, TaskStack, TaskState};

pub struct Port<S: ScratchSizeProvider> {
    pub(crate) schema: &'static FrameSchema,
    scratch: S,
    /// Scratch bytes in every frame (builder and switch alike).
    pub(crate) frame_scratch: usize,
    pub(crate) config: PortConfig,
    pub(crate) nesting: CriticalNesting,
    pub(crate) cpu: Pic18,
    pub(crate) stacks: StackArena,
    min_stack: Once<u16>,
    pub(crate) phase: SwitchPhase,
    pub(crate) started: bool,
}

impl<S: ScratchSizeProvider> Port<S> {
    /// Build the port for `profile`. Interrupts are masked and the nesting
    /// counter holds the boot sentinel.
    pub fn new(profile: TargetProfile, scratch: S, config: PortConfig) -> Result<Self, PortError> {
        let stack_init = scratch.scratch_size(Routine::StackInit);
        let context_switch = scratch.scratch_size(Routine::ContextSwitch);
        if stack_init != context_switch {
            return Err(PortError::ScratchMismatch {
                stack_init,
                context_switch,
            });
        }
        if stack_init as usize > SCRATCH_RAM_BYTES {
            return Err(PortError::ScratchTooLarge {
                requested: stack_init,
                capacity: SCRATCH_RAM_BYTES,
            });
        }

        let mut cpu = Pic18::new();
        cpu.disable_interrupts();

        log::debug!(
            "port: {} profile, {} scratch bytes, {:?} nesting policy",
            profile,
            stack_init,
            config.nesting_policy
        );

        Ok(Self {
            schema: FrameSchema::for_profile(profile),
            scratch,
            frame_scratch: stack_init as usize,
            config,
            nesting: CriticalNesting::boot(config.nesting_policy),
            cpu,
            stacks: StackArena::new(),
            min_stack: Once::new(),
            phase: SwitchPhase::Boot,
            started: false,
        })
    }

    /// Port for the profile this image was built for.
    pub fn for_build(scratch: S, config: PortConfig) -> Result<Self, PortError> {
        Self::new(TargetProfile::BUILD, scratch, config)
    }

    // ── Tasks ───────────────────────────────────────────────────

    /// Allocate a zeroed stack of `size` bytes.
    pub fn create_task(&mut self, size: usize) -> Result<TaskId, PortError> {
        self.stacks.allocate(size).ok_or(PortError::TooManyTasks)
    }

    /// Lay out `task`'s first frame so that its first restore enters
    /// `entry` with `parameter` on its stack.
    ///
    /// Only a task that has never run may be built. Before the first
    /// restore a pending frame may be rebuilt from scratch; after it, a
    /// suspended frame is live context and is refused.
    pub fn initialise_task(
        &mut self,
        task: TaskId,
        entry: CodeAddress,
        parameter: u16,
    ) -> Result<StackPointer, PortError> {
        let schema = self.schema;
        let scratch_len = self.frame_scratch;
        let stack = self
            .stacks
            .get_mut(task)
            .ok_or(PortError::UnknownTask(task))?;

        let rebuildable = match stack.state {
            TaskState::Uninitialised => true,
            TaskState::Suspended => self.phase == SwitchPhase::Boot,
            TaskState::Running => false,
        };
        if !rebuildable {
            return Err(PortError::TaskAlreadyStarted(task));
        }

        let top = stack.empty_top();
        let sp = frame::initialise_stack(
            stack.memory_mut(),
            top,
            entry,
            parameter,
            schema,
            scratch_len,
        )?;
        stack.top = sp;
        stack.state = TaskState::Suspended;

        log::debug!(
            "port: {} enters at {:#07x} with parameter {:#06x}, {} of {} stack bytes used",
            task,
            entry,
            parameter,
            stack.used_bytes(),
            stack.size()
        );
        Ok(sp)
    }

    pub fn task(&self, task: TaskId) -> Option<&TaskStack> {
        self.stacks.get(task)
    }

    /// Raw access to a task's stack, for stack checks and debuggers.
    pub fn task_mut(&mut self, task: TaskId) -> Option<&mut TaskStack> {
        self.stacks.get_mut(task)
    }

    pub fn tasks(&self) -> &StackArena {
        &self.stacks
    }

    // ── Critical sections ───────────────────────────────────────

    pub fn enter_critical(&mut self) {
        self.nesting.enter(&mut self.cpu);
    }

    pub fn exit_critical(&mut self) {
        self.nesting.exit(&mut self.cpu);
    }

    /// Live critical nesting counter.
    pub fn critical_nesting(&self) -> u8 {
        self.nesting.current()
    }

    // ── Sizing ──────────────────────────────────────────────────

    /// Minimum task stack size in bytes. Computed on first use.
    pub fn minimal_stack_size(&self) -> u16 {
        *self.min_stack.call_once(|| {
            let scratch = self.scratch.scratch_size(Routine::MinimalStackSize);
            stack_size::minimal_stack_size(self.schema, scratch)
        })
    }

    // ── Accessors ───────────────────────────────────────────────

    pub fn profile(&self) -> TargetProfile {
        self.schema.profile
    }

    pub fn schema(&self) -> &'static FrameSchema {
        self.schema
    }

    pub fn config(&self) -> &PortConfig {
        &self.config
    }

    /// Scratch bytes carried by every frame.
    pub fn frame_scratch(&self) -> usize {
        self.frame_scratch
    }

    pub fn cpu(&self) -> &Pic18 {
        &self.cpu
    }

    /// The core, as task code sees it between switches.
    pub fn cpu_mut(&mut self) -> &mut Pic18 {
        &mut self.cpu
    }

    pub fn is_started(&self) -> bool {
        self.started
    }
}
