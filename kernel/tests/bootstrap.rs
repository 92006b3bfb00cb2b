//! Starting and stopping the scheduler.
//!
//! `start_scheduler` and `end_scheduler` never return, so the dispatch
//! used here unwinds with a snapshot of the core instead of jumping.

mod common;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use common::port_with_tasks;
use khal::timer::{TickConfig, Timer0};
use khal::{CodeAddress, Intcon, Pic18};
use wizport::{Dispatch, FixedScratch, Port, PortConfig, TargetProfile, TickSource};

#[derive(Debug, PartialEq, Eq)]
struct Dispatched {
    pc: CodeAddress,
    interrupts_enabled: bool,
    tick_armed: bool,
}

#[derive(Debug, PartialEq, Eq)]
struct Reset {
    pc: CodeAddress,
    interrupts_enabled: bool,
}

struct Unwind;

impl Dispatch for Unwind {
    fn dispatch(&mut self, cpu: &mut Pic18) -> ! {
        panic::panic_any(Dispatched {
            pc: cpu.pc(),
            interrupts_enabled: cpu.interrupts_enabled(),
            tick_armed: cpu.intcon().contains(Intcon::TMR0IE),
        })
    }

    fn reset(&mut self, cpu: &mut Pic18) -> ! {
        let interrupts_enabled = cpu.interrupts_enabled();
        cpu.reset();
        panic::panic_any(Reset {
            pc: cpu.pc(),
            interrupts_enabled,
        })
    }
}

/// Run `f`, which must diverge, and hand back what it unwound with.
fn diverge(f: impl FnOnce()) -> Box<dyn Any + Send> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => panic!("a diverging call returned"),
        Err(payload) => payload,
    }
}

fn timer() -> Timer0 {
    Timer0::for_tick_rate(TickConfig::DEFAULT).unwrap()
}

#[test]
fn first_task_starts_at_its_entry_with_interrupts_on() {
    let (mut port, mut sched) = port_with_tasks(
        TargetProfile::Base,
        2,
        PortConfig::DEFAULT,
        &[(0x0480, 0x0042), (0x0500, 0)],
    );
    let mut tick = timer();

    let payload = diverge(|| port.start_scheduler(&mut sched, &mut tick, &mut Unwind));
    assert_eq!(
        payload.downcast_ref::<Dispatched>(),
        Some(&Dispatched {
            pc: CodeAddress::new(0x0480),
            interrupts_enabled: true,
            tick_armed: true,
        })
    );
    assert!(port.is_started());
    assert!(tick.is_armed());
    assert_eq!(port.critical_nesting(), 0);

    // The parameter is left where the task's code reads it.
    let stack = port.task(sched.tasks[0]).unwrap();
    assert_eq!(&stack.memory()[stack.top.offset()..], &[0x42, 0x00]);
}

#[test]
fn starting_twice_is_fatal() {
    let (mut port, mut sched) =
        port_with_tasks(TargetProfile::Base, 0, PortConfig::DEFAULT, &[(0x0100, 0)]);
    let mut tick = timer();

    diverge(|| port.start_scheduler(&mut sched, &mut tick, &mut Unwind));
    let payload = diverge(|| port.start_scheduler(&mut sched, &mut tick, &mut Unwind));
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"scheduler already started"));
}

#[test]
fn tick_is_armed_before_the_first_restore() {
    struct Recorder {
        saw_interrupts: Option<bool>,
    }

    impl TickSource for Recorder {
        fn setup_tick(&mut self, cpu: &mut Pic18) {
            self.saw_interrupts = Some(cpu.interrupts_enabled());
        }
    }

    let (mut port, mut sched) =
        port_with_tasks(TargetProfile::Base, 0, PortConfig::DEFAULT, &[(0x0100, 0)]);
    let mut tick = Recorder { saw_interrupts: None };
    diverge(|| port.start_scheduler(&mut sched, &mut tick, &mut Unwind));
    assert_eq!(tick.saw_interrupts, Some(false));
}

#[test]
fn end_scheduler_resets_the_device() {
    let (mut port, mut sched) =
        port_with_tasks(TargetProfile::Base, 0, PortConfig::DEFAULT, &[(0x0100, 0)]);
    let mut tick = timer();
    diverge(|| port.start_scheduler(&mut sched, &mut tick, &mut Unwind));

    let payload = diverge(|| port.end_scheduler(&mut Unwind));
    assert_eq!(
        payload.downcast_ref::<Reset>(),
        Some(&Reset {
            pc: khal::cpu::RESET_VECTOR,
            interrupts_enabled: false,
        })
    );
    assert_eq!(port.cpu().intcon(), Intcon::RESET);
}

#[test]
fn minimal_stack_size_follows_the_build_profile() {
    let port = Port::for_build(FixedScratch(6), PortConfig::DEFAULT).unwrap();
    let expected = match TargetProfile::BUILD {
        TargetProfile::Base => 13 + 10 * 2 + 20 + 6,
        TargetProfile::Extended => 15 + 10 * 3 + 20 + 6,
    };
    assert_eq!(port.minimal_stack_size(), expected);
    assert_eq!(port.profile(), TargetProfile::BUILD);
}

#[test]
fn a_minimal_stack_survives_a_deep_switch() {
    let mut port = Port::new(
        TargetProfile::Extended,
        FixedScratch(4),
        PortConfig::DEFAULT,
    )
    .unwrap();
    let size = port.minimal_stack_size() as usize;
    let task = port.create_task(size).unwrap();
    port.initialise_task(task, CodeAddress::new(0x1_0000), 7).unwrap();
    let mut sched = common::RoundRobin::new(vec![task]);
    port.restore_context(&sched);

    for i in 0..9 {
        port.cpu_mut()
            .call(CodeAddress::new(0x0900), CodeAddress::new(0x0A00 + i))
            .unwrap();
    }
    let resumed = common::call_yield(&mut port, &mut sched, 0x0B00);
    assert_eq!(resumed.address, CodeAddress::new(0x0B00));
    assert_eq!(port.cpu().return_stack().depth(), 9);
}
