//! PIC18 hardware call/return stack.
//!
//! The return stack is not part of data memory: it is a 31-entry, 21-bit
//! wide LIFO that `CALL`/`RCALL` push and `RETURN`/`RETFIE` pop. Software
//! can only reach the top entry (TOSU:TOSH:TOSL) and the stack pointer
//! (STKPTR), which is why a context switch has to drain it entry by entry.

use core::fmt;

/// Number of entries in the hardware return stack.
pub const RETURN_STACK_DEPTH: usize = 31;

/// Program memory addresses are 21 bits wide.
pub const CODE_ADDRESS_MASK: u32 = 0x1F_FFFF;

/// A program memory address (what the PC and every return stack entry hold).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CodeAddress(u32);

impl CodeAddress {
    /// Wrap a raw address, dropping anything above bit 20.
    pub const fn new(raw: u32) -> Self {
        Self(raw & CODE_ADDRESS_MASK)
    }

    /// Rebuild an address from its TOSU/TOSH/TOSL bytes.
    pub const fn from_bytes(upper: u8, high: u8, low: u8) -> Self {
        Self::new(((upper as u32) << 16) | ((high as u32) << 8) | low as u32)
    }

    pub const fn value(self) -> u32 {
        self.0
    }

    /// TOSL.
    pub const fn low(self) -> u8 {
        self.0 as u8
    }

    /// TOSH.
    pub const fn high(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// TOSU (only five bits are implemented).
    pub const fn upper(self) -> u8 {
        (self.0 >> 16) as u8
    }

    /// Whether the address is reachable with a 16-bit pointer.
    pub const fn fits_16_bits(self) -> bool {
        self.0 <= 0xFFFF
    }
}

impl fmt::LowerHex for CodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// Return stack faults. On silicon these set STKFUL/STKUNF and, with the
/// STVREN configuration bit, reset the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackError {
    /// A push with all 31 entries in use.
    Overflow,
    /// A pop from an empty stack.
    Underflow,
}

impl fmt::Display for StackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackError::Overflow => f.write_str("hardware return stack overflow"),
            StackError::Underflow => f.write_str("hardware return stack underflow"),
        }
    }
}

/// The hardware return stack. Entry 0 is the oldest (bottom) return address.
#[derive(Clone, Copy)]
pub struct ReturnStack {
    entries: [CodeAddress; RETURN_STACK_DEPTH],
    depth: u8,
}

impl ReturnStack {
    pub const fn new() -> Self {
        Self {
            entries: [CodeAddress::new(0); RETURN_STACK_DEPTH],
            depth: 0,
        }
    }

    /// Number of pending return addresses (STKPTR<4:0>).
    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn is_empty(&self) -> bool {
        self.depth == 0
    }

    /// Top of stack, if any.
    pub fn top(&self) -> Option<CodeAddress> {
        self.as_slice().last().copied()
    }

    /// Pending entries, oldest first.
    pub fn as_slice(&self) -> &[CodeAddress] {
        &self.entries[..self.depth as usize]
    }

    pub fn push(&mut self, address: CodeAddress) -> Result<(), StackError> {
        let slot = self
            .entries
            .get_mut(self.depth as usize)
            .ok_or(StackError::Overflow)?;
        *slot = address;
        self.depth += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Result<CodeAddress, StackError> {
        if self.depth == 0 {
            return Err(StackError::Underflow);
        }
        self.depth -= 1;
        Ok(self.entries[self.depth as usize])
    }

    /// Empty the stack (what a context save leaves behind).
    pub fn clear(&mut self) {
        self.depth = 0;
    }
}

impl Default for ReturnStack {
    fn default() -> Self {
        Self::new()
    }
}

// Slots above the stack pointer are stale and do not take part.
impl PartialEq for ReturnStack {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for ReturnStack {}

impl fmt::Debug for ReturnStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}
