//! Timer0 — the scheduler tick.
//!
//! Timer0 runs in 16-bit mode off the instruction clock (Fosc/4). The
//! overflow interrupt fires every `(65536 - reload) * prescale` instruction
//! cycles, so the tick rate fixes both the prescaler and the reload value.

use core::fmt;

use crate::cpu::Pic18;

const TMR0ON: u8 = 1 << 7;
const PSA: u8 = 1 << 3;
use crate::intcon::Intcon;

/// Timer0 prescaler (T0CON<2:0>, or bypassed with PSA = 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prescaler {
    Bypass,
    By2,
    By4,
    By8,
    By16,
    By32,
    By64,
    By128,
    By256,
}

impl Prescaler {
    const ALL: [Prescaler; 9] = [
        Prescaler::Bypass,
        Prescaler::By2,
        Prescaler::By4,
        Prescaler::By8,
        Prescaler::By16,
        Prescaler::By32,
        Prescaler::By64,
        Prescaler::By128,
        Prescaler::By256,
    ];

    /// PSA and T0PS<2:0> as written to T0CON.
    pub const fn t0con_bits(self) -> u8 {
        match self {
            Prescaler::Bypass => PSA,
            Prescaler::By2 => 0b000,
            Prescaler::By4 => 0b001,
            Prescaler::By8 => 0b010,
            Prescaler::By16 => 0b011,
            Prescaler::By32 => 0b100,
            Prescaler::By64 => 0b101,
            Prescaler::By128 => 0b110,
            Prescaler::By256 => 0b111,
        }
    }

    pub const fn divisor(self) -> u32 {
        match self {
            Prescaler::Bypass => 1,
            Prescaler::By2 => 2,
            Prescaler::By4 => 4,
            Prescaler::By8 => 8,
            Prescaler::By16 => 16,
            Prescaler::By32 => 32,
            Prescaler::By64 => 64,
            Prescaler::By128 => 128,
            Prescaler::By256 => 256,
        }
    }
}

/// Clock and tick rate the timer is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickConfig {
    /// Oscillator frequency (Fosc).
    pub cpu_clock_hz: u32,
    /// Scheduler ticks per second.
    pub tick_rate_hz: u32,
}

impl TickConfig {
    /// 20 MHz crystal, 1 kHz tick.
    pub const DEFAULT: Self = Self {
        cpu_clock_hz: 20_000_000,
        tick_rate_hz: 1_000,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    /// Zero tick rate, or fewer than one instruction cycle per tick.
    RateTooHigh { tick_rate_hz: u32 },
    /// The period does not fit even with the largest prescaler.
    RateTooLow { tick_rate_hz: u32 },
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerError::RateTooHigh { tick_rate_hz } => {
                write!(f, "tick rate {} Hz is faster than the instruction clock", tick_rate_hz)
            }
            TimerError::RateTooLow { tick_rate_hz } => {
                write!(f, "tick rate {} Hz needs more than a 16-bit period at 1:256", tick_rate_hz)
            }
        }
    }
}

/// Timer0 configured as the periodic tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer0 {
    reload: u16,
    prescaler: Prescaler,
    armed: bool,
}

impl Timer0 {
    /// Pick the smallest prescaler whose period fits in 16 bits.
    pub fn for_tick_rate(config: TickConfig) -> Result<Self, TimerError> {
        let instruction_hz = config.cpu_clock_hz / 4;
        let tick_rate_hz = config.tick_rate_hz;
        if tick_rate_hz == 0 || instruction_hz < tick_rate_hz {
            return Err(TimerError::RateTooHigh { tick_rate_hz });
        }
        let cycles = instruction_hz / tick_rate_hz;

        for prescaler in Prescaler::ALL {
            let counts = cycles / prescaler.divisor();
            if counts == 0 {
                break;
            }
            if counts <= 0x1_0000 {
                return Ok(Self {
                    reload: (0x1_0000 - counts) as u16,
                    prescaler,
                    armed: false,
                });
            }
        }
        Err(TimerError::RateTooLow { tick_rate_hz })
    }

    /// TMR0H:TMR0L value the counter starts from.
    pub fn reload(&self) -> u16 {
        self.reload
    }

    pub fn prescaler(&self) -> Prescaler {
        self.prescaler
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// T0CON for this timer: running, 16-bit, instruction clock.
    pub fn t0con(&self) -> u8 {
        TMR0ON | self.prescaler.t0con_bits()
    }

    /// Load the counter, start the timer and enable the overflow interrupt.
    /// GIEH is left alone: the first context restore turns it on.
    pub fn arm(&mut self, cpu: &mut Pic18) {
        cpu.set_t0con(0);
        cpu.set_tmr0(self.reload);
        cpu.set_t0con(self.t0con());

        let mut intcon = cpu.intcon();
        intcon.remove(Intcon::TMR0IF);
        intcon.insert(Intcon::TMR0IE);
        cpu.set_intcon(intcon);
        self.armed = true;
    }
}
