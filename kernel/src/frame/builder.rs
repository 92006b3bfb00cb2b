//! Initial stack frame of a new task.
//!
//! The frame is laid out exactly as if the task had been running, called
//! the yield routine and been saved: the task's parameter sits where its
//! code expects to find it, the registers hold placeholders, the scratch
//! area is clear, and the only pending return address is the task's entry
//! point, so the first restore "returns" into the task.

use khal::CodeAddress;

use super::cursor::{FrameReader, FrameWriter, StackPointer};
use super::schema::FrameSchema;
use super::{check_scratch_len, ContextImage, FrameError};
use crate::config::NO_CRITICAL_NESTING;

/// Bytes the task parameter occupies above the context.
pub const PARAMETER_BYTES: usize = 2;

/// Build the initial frame below `top` and return the new stack pointer.
///
/// `scratch_len` is the scratch size reported for the builder routine
/// itself. The nesting byte is always [`NO_CRITICAL_NESTING`]: a new task
/// never starts inside a critical section, whatever the boot sentinel is.
///
/// Nothing is written when the frame does not fit or the entry point
/// cannot be encoded.
pub fn initialise_stack(
    memory: &mut [u8],
    top: StackPointer,
    entry: CodeAddress,
    parameter: u16,
    schema: &FrameSchema,
    scratch_len: usize,
) -> Result<StackPointer, FrameError> {
    check_scratch_len(scratch_len)?;
    if schema.return_entry_bytes < 3 && !entry.fits_16_bits() {
        return Err(FrameError::AddressOutOfRange {
            address: entry,
            profile: schema.profile,
        });
    }

    let mut image = ContextImage::empty();
    for field in schema.context {
        image.registers.set(field.register, field.initial);
    }
    image
        .return_stack
        .push(entry)
        .map_err(|_| FrameError::CorruptChainDepth(1))?;
    image.nesting = NO_CRITICAL_NESTING;

    let mut out = FrameWriter::new(memory, top);
    out.reserve(PARAMETER_BYTES + schema.frame_bytes(scratch_len, 1))?;

    out.push((parameter >> 8) as u8)?;
    out.push(parameter as u8)?;
    image.encode(schema, scratch_len, &mut out)?;

    Ok(out.finish())
}

/// A built frame read back in restore order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialFrame {
    pub image: ContextImage,
    pub parameter: u16,
    /// Stack pointer once the frame and the parameter are popped.
    pub top: StackPointer,
}

impl InitialFrame {
    pub fn entry(&self) -> Option<CodeAddress> {
        self.image.return_stack.top()
    }
}

/// Decode a frame produced by [`initialise_stack`].
pub fn decode_initial_frame(
    memory: &[u8],
    sp: StackPointer,
    schema: &FrameSchema,
    scratch_len: usize,
) -> Result<InitialFrame, FrameError> {
    let mut input = FrameReader::new(memory, sp);
    let image = ContextImage::decode(schema, scratch_len, &mut input)?;
    let low = input.pop()?;
    let high = input.pop()?;
    Ok(InitialFrame {
        image,
        parameter: u16::from_be_bytes([high, low]),
        top: input.finish(),
    })
}
