//! Byte cursors over a task stack.
//!
//! Task stacks grow downward. A [`StackPointer`] is an offset into the
//! task's memory: everything below it is free, the next push lands at
//! `offset - 1`, and a pop reads the byte at `offset` before moving up.

use khal::CodeAddress;

use super::FrameError;

/// Saved top-of-stack of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StackPointer(usize);

impl StackPointer {
    /// Pointer of an empty stack backed by `memory`.
    pub fn empty(memory: &[u8]) -> Self {
        Self(memory.len())
    }

    pub const fn from_offset(offset: usize) -> Self {
        Self(offset)
    }

    pub const fn offset(self) -> usize {
        self.0
    }

    /// Bytes that can still be pushed.
    pub const fn free_bytes(self) -> usize {
        self.0
    }
}

/// Pushes bytes downward from a stack pointer.
pub struct FrameWriter<'a> {
    memory: &'a mut [u8],
    sp: usize,
}

impl<'a> FrameWriter<'a> {
    pub fn new(memory: &'a mut [u8], sp: StackPointer) -> Self {
        let sp = sp.offset().min(memory.len());
        Self { memory, sp }
    }

    /// Fail early when `bytes` more pushes would run off the bottom.
    pub fn reserve(&self, bytes: usize) -> Result<(), FrameError> {
        if bytes > self.sp {
            return Err(FrameError::StackExhausted {
                needed: bytes,
                available: self.sp,
            });
        }
        Ok(())
    }

    pub fn push(&mut self, byte: u8) -> Result<(), FrameError> {
        self.reserve(1)?;
        self.sp -= 1;
        self.memory[self.sp] = byte;
        Ok(())
    }

    /// Push one return-address entry: TOSU (when `width` is 3), TOSH, TOSL.
    pub fn push_address(&mut self, address: CodeAddress, width: u8) -> Result<(), FrameError> {
        if width == 3 {
            self.push(address.upper())?;
        }
        self.push(address.high())?;
        self.push(address.low())
    }

    pub fn position(&self) -> StackPointer {
        StackPointer(self.sp)
    }

    pub fn finish(self) -> StackPointer {
        StackPointer(self.sp)
    }
}

/// Pops bytes upward from a stack pointer.
pub struct FrameReader<'a> {
    memory: &'a [u8],
    sp: usize,
}

impl<'a> FrameReader<'a> {
    pub fn new(memory: &'a [u8], sp: StackPointer) -> Self {
        Self { memory, sp: sp.offset() }
    }

    pub fn pop(&mut self) -> Result<u8, FrameError> {
        let byte = *self.memory.get(self.sp).ok_or(FrameError::Truncated)?;
        self.sp += 1;
        Ok(byte)
    }

    /// Pop one return-address entry written by [`FrameWriter::push_address`].
    pub fn pop_address(&mut self, width: u8) -> Result<CodeAddress, FrameError> {
        let low = self.pop()?;
        let high = self.pop()?;
        let upper = if width == 3 { self.pop()? } else { 0 };
        Ok(CodeAddress::from_bytes(upper, high, low))
    }

    pub fn finish(self) -> StackPointer {
        StackPointer(self.sp)
    }
}
