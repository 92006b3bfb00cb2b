//! The suspended-context stack frame.
//!
//! A frame, in save order (pushed downward, popped upward):
//!
//! ```text
//!   high addresses   [ parameter high, parameter low ]   builder only
//!                    context registers (schema order)
//!                    compiler scratch bytes
//!                    return entries, most recent first ([U] H L each)
//!                    chain depth
//!   low addresses    critical nesting                    <- saved SP + 1
//! ```
//!
//! The builder and the context save share [`ContextImage::encode`], and the
//! restore is its exact inverse, so a frame built for a new task and a
//! frame saved from a running one are indistinguishable.

pub mod builder;
pub mod cursor;
pub mod schema;

use core::fmt;

use khal::cpu::{RegisterFile, SCRATCH_RAM_BYTES};
use khal::stack::RETURN_STACK_DEPTH;
use khal::{CodeAddress, ReturnStack};

use crate::config::TargetProfile;

pub use builder::{decode_initial_frame, initialise_stack, InitialFrame};
pub use cursor::{FrameReader, FrameWriter, StackPointer};
pub use schema::{ContextField, FrameSchema, Presence, BASE_SCHEMA, EXTENDED_SCHEMA};

/// Frame encoding and decoding failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// The frame does not fit below the stack pointer.
    StackExhausted { needed: usize, available: usize },
    /// A pop ran past the top of the task's memory.
    Truncated,
    /// The saved chain depth exceeds the hardware return stack.
    CorruptChainDepth(u8),
    /// A return address the profile cannot encode.
    AddressOutOfRange { address: CodeAddress, profile: TargetProfile },
    /// More scratch bytes than the core has scratch RAM.
    ScratchTooLarge { len: usize, capacity: usize },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::StackExhausted { needed, available } => write!(
                f,
                "stack frame needs {} bytes but only {} are free",
                needed, available
            ),
            FrameError::Truncated => f.write_str("stack frame runs past the top of the stack"),
            FrameError::CorruptChainDepth(depth) => write!(
                f,
                "saved return chain depth {} exceeds the {}-entry hardware stack",
                depth, RETURN_STACK_DEPTH
            ),
            FrameError::AddressOutOfRange { address, profile } => write!(
                f,
                "return address {:#x} cannot be encoded for the {} profile",
                address, profile
            ),
            FrameError::ScratchTooLarge { len, capacity } => write!(
                f,
                "{} scratch bytes requested, scratch RAM holds {}",
                len, capacity
            ),
        }
    }
}

/// Everything a frame carries besides the builder's parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextImage {
    pub registers: RegisterFile,
    pub scratch: [u8; SCRATCH_RAM_BYTES],
    pub return_stack: ReturnStack,
    pub nesting: u8,
}

impl ContextImage {
    pub const fn empty() -> Self {
        Self {
            registers: RegisterFile::zeroed(),
            scratch: [0; SCRATCH_RAM_BYTES],
            return_stack: ReturnStack::new(),
            nesting: 0,
        }
    }

    /// Push the image. Either the whole frame is written or nothing is.
    pub fn encode(
        &self,
        schema: &FrameSchema,
        scratch_len: usize,
        out: &mut FrameWriter<'_>,
    ) -> Result<(), FrameError> {
        check_scratch_len(scratch_len)?;
        let width = schema.return_entry_bytes;
        let chain = self.return_stack.as_slice();
        if width < 3 {
            if let Some(&address) = chain.iter().find(|a| !a.fits_16_bits()) {
                return Err(FrameError::AddressOutOfRange {
                    address,
                    profile: schema.profile,
                });
            }
        }
        out.reserve(schema.frame_bytes(scratch_len, chain.len()))?;

        for field in schema.context {
            out.push(self.registers.get(field.register))?;
        }
        for &byte in &self.scratch[..scratch_len] {
            out.push(byte)?;
        }
        for &address in chain.iter().rev() {
            out.push_address(address, width)?;
        }
        out.push(self.return_stack.depth())?;
        out.push(self.nesting)
    }

    /// Pop an image pushed by [`ContextImage::encode`].
    pub fn decode(
        schema: &FrameSchema,
        scratch_len: usize,
        input: &mut FrameReader<'_>,
    ) -> Result<Self, FrameError> {
        check_scratch_len(scratch_len)?;
        let mut image = Self::empty();

        image.nesting = input.pop()?;
        let depth = input.pop()?;
        if depth as usize > RETURN_STACK_DEPTH {
            return Err(FrameError::CorruptChainDepth(depth));
        }
        for _ in 0..depth {
            let address = input.pop_address(schema.return_entry_bytes)?;
            image
                .return_stack
                .push(address)
                .map_err(|_| FrameError::CorruptChainDepth(depth))?;
        }
        for byte in image.scratch[..scratch_len].iter_mut().rev() {
            *byte = input.pop()?;
        }
        for field in schema.context.iter().rev() {
            image.registers.set(field.register, input.pop()?);
        }
        Ok(image)
    }
}

pub(crate) fn check_scratch_len(len: usize) -> Result<(), FrameError> {
    if len > SCRATCH_RAM_BYTES {
        return Err(FrameError::ScratchTooLarge {
            len,
            capacity: SCRATCH_RAM_BYTES,
        });
    }
    Ok(())
}
