//! INTCON — the PIC18 interrupt control register.
//!
//! With priority levels enabled (IPEN = 1) bit 7 is GIEH, the master
//! enable for high-priority interrupts, and bit 6 is GIEL. The scheduler
//! tick runs on the high-priority vector, so GIEH is the bit that decides
//! whether a task can be preempted.

use bitflags::bitflags;

bitflags! {
    /// INTCON bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Intcon: u8 {
        /// Global enable for high-priority interrupts.
        const GIEH   = 1 << 7;
        /// Global enable for low-priority interrupts.
        const GIEL   = 1 << 6;
        /// Timer0 overflow interrupt enable.
        const TMR0IE = 1 << 5;
        /// INT0 external interrupt enable.
        const INT0IE = 1 << 4;
        /// Port B change interrupt enable.
        const RBIE   = 1 << 3;
        /// Timer0 overflow flag.
        const TMR0IF = 1 << 2;
        /// INT0 external interrupt flag.
        const INT0IF = 1 << 1;
        /// Port B change flag.
        const RBIF   = 1 << 0;
    }
}

impl Intcon {
    /// INTCON after a power-on reset: everything off.
    pub const RESET: Self = Self::empty();

    /// Whether the high-priority vector can be taken.
    pub fn high_priority_enabled(self) -> bool {
        self.contains(Self::GIEH)
    }
}

impl Default for Intcon {
    fn default() -> Self {
        Self::RESET
    }
}
