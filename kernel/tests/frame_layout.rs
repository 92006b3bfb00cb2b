//! Initial stack frames as the first restore sees them.

mod common;

use common::{call_yield, port_with_tasks, top_down};
use khal::{CodeAddress, Sfr};
use proptest::prelude::*;
use wizport::frame::{decode_initial_frame, BASE_SCHEMA, EXTENDED_SCHEMA};
use wizport::{FixedScratch, FrameError, Port, PortConfig, PortError, TargetProfile, TaskState};

#[test]
fn base_frame_matches_the_documented_bytes() {
    let (port, sched) = port_with_tasks(
        TargetProfile::Base,
        3,
        PortConfig::DEFAULT,
        &[(0x9ABC, 0x1234)],
    );
    let task = sched.tasks[0];

    let mut expected = vec![0x12, 0x34];
    expected.extend([
        0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xAA, 0xCC, 0xDD, 0xFF,
    ]);
    expected.extend([0x00; 3]);
    expected.extend([0x9A, 0xBC, 0x01, 0x00]);
    assert_eq!(top_down(&port, task), expected);
}

#[test]
fn extended_frame_adds_upper_bytes() {
    let (port, sched) = port_with_tasks(
        TargetProfile::Extended,
        0,
        PortConfig::DEFAULT,
        &[(0x1_2345, 0xCAFE)],
    );
    let task = sched.tasks[0];

    let mut expected = vec![0xCA, 0xFE];
    expected.extend([
        0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xAA, 0x00, 0xCC, 0xDD, 0xEE, 0xFF,
    ]);
    expected.extend([0x01, 0x23, 0x45, 0x01, 0x00]);
    assert_eq!(top_down(&port, task), expected);
}

#[test]
fn frame_nesting_is_zero_even_at_boot() {
    let (port, sched) =
        port_with_tasks(TargetProfile::Base, 0, PortConfig::DEFAULT, &[(0x0100, 0)]);
    assert_eq!(port.critical_nesting(), 0x7F);
    assert_eq!(top_down(&port, sched.tasks[0]).last(), Some(&0x00));
}

#[test]
fn stack_too_small_for_a_frame_is_reported() {
    let mut port = Port::new(TargetProfile::Base, FixedScratch(8), PortConfig::DEFAULT).unwrap();
    let task = port.create_task(16).unwrap();
    assert_eq!(
        port.initialise_task(task, CodeAddress::new(0x0100), 0),
        Err(PortError::Frame(FrameError::StackExhausted {
            needed: 2 + 13 + 8 + 2 + 2,
            available: 16
        }))
    );
    assert!(port.task(task).unwrap().memory().iter().all(|&b| b == 0));
}

#[test]
fn pending_frame_can_be_rebuilt_before_the_first_restore() {
    let mut port = Port::new(TargetProfile::Base, FixedScratch(0), PortConfig::DEFAULT).unwrap();
    let task = port.create_task(64).unwrap();
    let first = port.initialise_task(task, CodeAddress::new(0x0100), 1).unwrap();
    let second = port.initialise_task(task, CodeAddress::new(0x0200), 2).unwrap();
    assert_eq!(first, second);

    let stack = port.task(task).unwrap();
    let frame = decode_initial_frame(stack.memory(), stack.top, &BASE_SCHEMA, 0).unwrap();
    assert_eq!(frame.entry(), Some(CodeAddress::new(0x0200)));
    assert_eq!(frame.parameter, 2);
}

#[test]
fn running_task_cannot_be_rebuilt() {
    let (mut port, mut sched) = port_with_tasks(
        TargetProfile::Base,
        0,
        PortConfig::DEFAULT,
        &[(0x0100, 0), (0x0200, 0)],
    );
    let a = sched.tasks[0];
    port.restore_context(&sched);
    let before = port.task(a).unwrap().top;

    assert_eq!(
        port.initialise_task(a, CodeAddress::new(0x0300), 3),
        Err(PortError::TaskAlreadyStarted(a))
    );
    assert_eq!(port.task(a).unwrap().state, TaskState::Running);
    assert_eq!(port.task(a).unwrap().top, before);

    // The refused rebuild left nothing behind: the yield still saves.
    let to_b = call_yield(&mut port, &mut sched, 0x0104);
    assert_eq!(to_b.address, CodeAddress::new(0x0200));
}

#[test]
fn suspended_context_survives_a_refused_rebuild() {
    let (mut port, mut sched) = port_with_tasks(
        TargetProfile::Base,
        0,
        PortConfig::DEFAULT,
        &[(0x0100, 0), (0x0200, 0), (0x0300, 0)],
    );
    let (a, c) = (sched.tasks[0], sched.tasks[2]);
    port.restore_context(&sched);
    call_yield(&mut port, &mut sched, 0x0104);
    let saved = top_down(&port, a);

    // C still holds its pending frame, but the scheduler has started.
    for task in [a, c] {
        assert_eq!(port.task(task).unwrap().state, TaskState::Suspended);
        assert_eq!(
            port.initialise_task(task, CodeAddress::new(0x0400), 3),
            Err(PortError::TaskAlreadyStarted(task))
        );
    }
    assert_eq!(top_down(&port, a), saved);

    let to_c = call_yield(&mut port, &mut sched, 0x0204);
    assert_eq!((to_c.task, to_c.address), (c, CodeAddress::new(0x0300)));
    let back = call_yield(&mut port, &mut sched, 0x0304);
    assert_eq!((back.task, back.address), (a, CodeAddress::new(0x0104)));
}

#[test]
fn task_created_after_start_can_still_be_built() {
    let (mut port, sched) =
        port_with_tasks(TargetProfile::Base, 0, PortConfig::DEFAULT, &[(0x0100, 0)]);
    port.restore_context(&sched);

    let late = port.create_task(64).unwrap();
    assert!(port.initialise_task(late, CodeAddress::new(0x0400), 9).is_ok());
    assert_eq!(port.task(late).unwrap().state, TaskState::Suspended);
}

proptest! {
    #[test]
    fn built_frames_decode_to_what_was_asked(
        extended in any::<bool>(),
        raw_entry in 0u32..0x20_0000,
        parameter in any::<u16>(),
        scratch in 0u8..=24,
    ) {
        let profile = if extended { TargetProfile::Extended } else { TargetProfile::Base };
        let entry = if extended { raw_entry } else { raw_entry & 0xFFFF };
        let (port, sched) =
            port_with_tasks(profile, scratch, PortConfig::DEFAULT, &[(entry, parameter)]);
        let stack = port.task(sched.tasks[0]).unwrap();
        let schema = if extended { &EXTENDED_SCHEMA } else { &BASE_SCHEMA };

        let frame =
            decode_initial_frame(stack.memory(), stack.top, schema, scratch as usize).unwrap();
        prop_assert_eq!(frame.entry(), Some(CodeAddress::new(entry)));
        prop_assert_eq!(frame.parameter, parameter);
        prop_assert_eq!(frame.image.nesting, 0);
        prop_assert_eq!(frame.top, stack.empty_top());
        prop_assert_eq!(frame.image.registers.get(Sfr::Status), 0x11);
        prop_assert_eq!(frame.image.registers.get(Sfr::Pclath), 0xFF);
    }
}
