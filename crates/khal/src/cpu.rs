// =============================================================================
// WizPort — PIC18 Core Model
// =============================================================================
//
// The state a context switch has to preserve on a PIC18 running code built
// by the wizC/fedC compiler:
//
//   - the special function registers the compiler keeps live across calls
//     (STATUS, WREG, BSR, PROD, FSR0, FSR1, the table pointer/latch and the
//     PC latches),
//   - the compiler's scratch area in access RAM (page 0 overhead plus the
//     locals optimiser area),
//   - the hardware return stack,
//   - INTCON, of which only GIEH matters to the scheduler.
//
// FSR2 is the software stack pointer. It is not part of the register file
// here because the port keeps each task's stack pointer in its own arena
// slot instead.
//
// The port crate manipulates a `Pic18` exactly the way the firmware would
// manipulate the SFRs, which keeps the context switch testable on a host.
// =============================================================================

use crate::intcon::Intcon;
use crate::stack::{CodeAddress, ReturnStack, StackError};

/// Bytes of access RAM reserved for compiler scratch storage.
pub const SCRATCH_RAM_BYTES: usize = 64;

/// High-priority interrupt vector.
pub const HIGH_PRIORITY_VECTOR: CodeAddress = CodeAddress::new(0x0008);

/// Reset vector.
pub const RESET_VECTOR: CodeAddress = CodeAddress::new(0x0000);

/// Special function registers that belong to a task's context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Sfr {
    Status,
    Wreg,
    Bsr,
    Prodh,
    Prodl,
    Fsr0h,
    Fsr0l,
    Fsr1h,
    Fsr1l,
    Tablat,
    Tblptru,
    Tblptrh,
    Tblptrl,
    Pclatu,
    Pclath,
}

impl Sfr {
    pub const COUNT: usize = 15;

    pub const ALL: [Sfr; Sfr::COUNT] = [
        Sfr::Status,
        Sfr::Wreg,
        Sfr::Bsr,
        Sfr::Prodh,
        Sfr::Prodl,
        Sfr::Fsr0h,
        Sfr::Fsr0l,
        Sfr::Fsr1h,
        Sfr::Fsr1l,
        Sfr::Tablat,
        Sfr::Tblptru,
        Sfr::Tblptrh,
        Sfr::Tblptrl,
        Sfr::Pclatu,
        Sfr::Pclath,
    ];

    /// Datasheet name.
    pub const fn name(self) -> &'static str {
        match self {
            Sfr::Status => "STATUS",
            Sfr::Wreg => "WREG",
            Sfr::Bsr => "BSR",
            Sfr::Prodh => "PRODH",
            Sfr::Prodl => "PRODL",
            Sfr::Fsr0h => "FSR0H",
            Sfr::Fsr0l => "FSR0L",
            Sfr::Fsr1h => "FSR1H",
            Sfr::Fsr1l => "FSR1L",
            Sfr::Tablat => "TABLAT",
            Sfr::Tblptru => "TBLPTRU",
            Sfr::Tblptrh => "TBLPTRH",
            Sfr::Tblptrl => "TBLPTRL",
            Sfr::Pclatu => "PCLATU",
            Sfr::Pclath => "PCLATH",
        }
    }

    #[inline]
    const fn index(self) -> usize {
        self as usize
    }
}

/// The register file, indexed by [`Sfr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegisterFile([u8; Sfr::COUNT]);

impl RegisterFile {
    pub const fn zeroed() -> Self {
        Self([0; Sfr::COUNT])
    }

    #[inline]
    pub fn get(&self, reg: Sfr) -> u8 {
        self.0[reg.index()]
    }

    #[inline]
    pub fn set(&mut self, reg: Sfr, value: u8) {
        self.0[reg.index()] = value;
    }
}

/// T0CON after a power-on reset: timer on, 8-bit, T0CKI pin, 1:256.
pub const T0CON_RESET: u8 = 0xFF;

/// A PIC18 core: everything a task switch reads or writes.
#[derive(Debug, Clone)]
pub struct Pic18 {
    registers: RegisterFile,
    intcon: Intcon,
    return_stack: ReturnStack,
    scratch: [u8; SCRATCH_RAM_BYTES],
    pc: CodeAddress,
    t0con: u8,
    tmr0: u16,
}

impl Pic18 {
    /// Core state right after a power-on reset.
    pub const fn new() -> Self {
        Self {
            registers: RegisterFile::zeroed(),
            intcon: Intcon::RESET,
            return_stack: ReturnStack::new(),
            scratch: [0; SCRATCH_RAM_BYTES],
            pc: RESET_VECTOR,
            t0con: T0CON_RESET,
            tmr0: 0,
        }
    }

    // ── Registers ───────────────────────────────────────────────

    pub fn sfr(&self, reg: Sfr) -> u8 {
        self.registers.get(reg)
    }

    pub fn set_sfr(&mut self, reg: Sfr, value: u8) {
        self.registers.set(reg, value);
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    // ── Compiler scratch RAM ────────────────────────────────────

    pub fn scratch(&self) -> &[u8; SCRATCH_RAM_BYTES] {
        &self.scratch
    }

    pub fn scratch_mut(&mut self) -> &mut [u8; SCRATCH_RAM_BYTES] {
        &mut self.scratch
    }

    // ── Interrupts ──────────────────────────────────────────────

    pub fn intcon(&self) -> Intcon {
        self.intcon
    }

    pub fn set_intcon(&mut self, value: Intcon) {
        self.intcon = value;
    }

    /// `BCF INTCON, GIEH`.
    #[inline]
    pub fn disable_interrupts(&mut self) {
        self.intcon.remove(Intcon::GIEH);
    }

    /// `BSF INTCON, GIEH`.
    #[inline]
    pub fn enable_interrupts(&mut self) {
        self.intcon.insert(Intcon::GIEH);
    }

    #[inline]
    pub fn interrupts_enabled(&self) -> bool {
        self.intcon.high_priority_enabled()
    }

    // ── Timer0 ──────────────────────────────────────────────────

    pub fn t0con(&self) -> u8 {
        self.t0con
    }

    pub fn set_t0con(&mut self, value: u8) {
        self.t0con = value;
    }

    /// TMR0H:TMR0L.
    pub fn tmr0(&self) -> u16 {
        self.tmr0
    }

    pub fn set_tmr0(&mut self, value: u16) {
        self.tmr0 = value;
    }

    // ── Control flow ────────────────────────────────────────────

    pub fn pc(&self) -> CodeAddress {
        self.pc
    }

    pub fn set_pc(&mut self, pc: CodeAddress) {
        self.pc = pc;
    }

    pub fn return_stack(&self) -> &ReturnStack {
        &self.return_stack
    }

    pub fn return_stack_mut(&mut self) -> &mut ReturnStack {
        &mut self.return_stack
    }

    /// `CALL target`: push the return address, jump.
    pub fn call(&mut self, target: CodeAddress, return_to: CodeAddress) -> Result<(), StackError> {
        self.return_stack.push(return_to)?;
        self.pc = target;
        Ok(())
    }

    /// `RETURN`: pop TOS into the PC.
    pub fn ret(&mut self) -> Result<CodeAddress, StackError> {
        self.pc = self.return_stack.pop()?;
        Ok(self.pc)
    }

    /// `RETFIE`: return and set GIEH in one uninterruptible step.
    pub fn retfie(&mut self) -> Result<CodeAddress, StackError> {
        let pc = self.ret()?;
        self.enable_interrupts();
        Ok(pc)
    }

    /// What the core does when a high-priority interrupt is accepted:
    /// push the PC, clear GIEH, jump to the vector.
    pub fn vector_interrupt(&mut self) -> Result<(), StackError> {
        self.return_stack.push(self.pc)?;
        self.disable_interrupts();
        self.pc = HIGH_PRIORITY_VECTOR;
        Ok(())
    }

    /// Power-on reset of the core state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for Pic18 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boots_with_interrupts_masked() {
        let cpu = Pic18::new();
        assert!(!cpu.interrupts_enabled());
        assert_eq!(cpu.pc(), RESET_VECTOR);
        assert!(cpu.return_stack().is_empty());
    }

    #[test]
    fn sfr_order_matches_discriminants() {
        for (i, reg) in Sfr::ALL.iter().enumerate() {
            assert_eq!(*reg as usize, i, "{}", reg.name());
        }
    }

    #[test]
    fn call_then_return() {
        let mut cpu = Pic18::new();
        cpu.call(CodeAddress::new(0x400), CodeAddress::new(0x124)).unwrap();
        assert_eq!(cpu.pc(), CodeAddress::new(0x400));
        assert_eq!(cpu.ret(), Ok(CodeAddress::new(0x124)));
        assert_eq!(cpu.pc(), CodeAddress::new(0x124));
    }

    #[test]
    fn interrupt_entry_and_retfie() {
        let mut cpu = Pic18::new();
        cpu.enable_interrupts();
        cpu.set_pc(CodeAddress::new(0x0300));
        cpu.vector_interrupt().unwrap();
        assert!(!cpu.interrupts_enabled());
        assert_eq!(cpu.pc(), HIGH_PRIORITY_VECTOR);
        assert_eq!(cpu.retfie(), Ok(CodeAddress::new(0x0300)));
        assert!(cpu.interrupts_enabled());
    }
}
