//! Shared fixtures for the scenario tests.

#![allow(dead_code)]

use khal::CodeAddress;
use wizport::{FixedScratch, Port, PortConfig, Resumption, SchedulerCore, TargetProfile, TaskId};

/// Round-robin over a fixed task list. Switching is skipped while
/// suspended, like a real scheduler core would defer it.
#[derive(Debug, Default)]
pub struct RoundRobin {
    pub tasks: Vec<TaskId>,
    pub current: usize,
    pub ticks: u32,
    pub switches: u32,
    pub suspended: u32,
}

impl RoundRobin {
    pub fn new(tasks: Vec<TaskId>) -> Self {
        Self {
            tasks,
            ..Self::default()
        }
    }
}

impl SchedulerCore for RoundRobin {
    fn current_task(&self) -> TaskId {
        self.tasks[self.current]
    }

    fn switch_context(&mut self) {
        if self.suspended == 0 {
            self.current = (self.current + 1) % self.tasks.len();
            self.switches += 1;
        }
    }

    fn suspend_all(&mut self) {
        self.suspended += 1;
    }

    fn resume_all(&mut self) -> bool {
        self.suspended -= 1;
        false
    }

    fn increment_tick(&mut self) {
        self.ticks += 1;
    }
}

pub const YIELD_ROUTINE: CodeAddress = CodeAddress::new(0x0040);

/// A port with one task per `(entry, parameter)`, each on a 96-byte stack.
pub fn port_with_tasks(
    profile: TargetProfile,
    scratch: u8,
    config: PortConfig,
    tasks: &[(u32, u16)],
) -> (Port<FixedScratch>, RoundRobin) {
    let mut port = Port::new(profile, FixedScratch(scratch), config).unwrap();
    let mut ids = Vec::new();
    for &(entry, parameter) in tasks {
        let id = port.create_task(96).unwrap();
        port.initialise_task(id, CodeAddress::new(entry), parameter)
            .unwrap();
        ids.push(id);
    }
    (port, RoundRobin::new(ids))
}

/// Task code calling the yield routine from `return_to - 2`.
pub fn call_yield(
    port: &mut Port<FixedScratch>,
    sched: &mut RoundRobin,
    return_to: u32,
) -> Resumption {
    port.cpu_mut()
        .call(YIELD_ROUTINE, CodeAddress::new(return_to))
        .unwrap();
    port.yield_now(sched)
}

/// The tick firing while the running task is at `pc`.
pub fn tick_at(port: &mut Port<FixedScratch>, sched: &mut RoundRobin, pc: u32) -> Resumption {
    let cpu = port.cpu_mut();
    cpu.set_pc(CodeAddress::new(pc));
    cpu.vector_interrupt().unwrap();
    port.tick_interrupt(sched)
}

/// Stack bytes from the top of memory downward.
pub fn top_down(port: &Port<FixedScratch>, task: TaskId) -> Vec<u8> {
    let stack = port.task(task).unwrap();
    stack.memory()[stack.top.offset()..].iter().rev().copied().collect()
}
