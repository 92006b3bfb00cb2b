//! Minimum task stack size.

use crate::config::{MINIMAL_CALL_RETURN_DEPTH, OTHER_STACK_BYTES};
use crate::frame::FrameSchema;

/// Smallest stack a task can be created with: one saved context, room to
/// spill [`MINIMAL_CALL_RETURN_DEPTH`] return entries, the fixed frame
/// bytes plus headroom, and the compiler scratch area.
pub const fn minimal_stack_size(schema: &FrameSchema, scratch_len: u8) -> u16 {
    schema.context.len() as u16
        + MINIMAL_CALL_RETURN_DEPTH * schema.return_entry_bytes as u16
        + OTHER_STACK_BYTES
        + scratch_len as u16
}
