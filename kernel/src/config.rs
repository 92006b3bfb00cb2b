//! Build-wide configuration: target profile, nesting policy, scheduler mode.

use core::fmt;

/// Addressing profile of the target part.
///
/// Parts with more than 64 KiB of program memory implement TBLPTRU and
/// PCLATU, and their return addresses need the third (TOSU) byte. The
/// profile is fixed for a whole image; nothing switches it at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetProfile {
    /// Up to 64 KiB of program memory.
    Base,
    /// More than 64 KiB of program memory.
    Extended,
}

impl TargetProfile {
    /// The profile this image was built for (`extended-rom` feature).
    #[cfg(feature = "extended-rom")]
    pub const BUILD: TargetProfile = TargetProfile::Extended;
    /// The profile this image was built for (`extended-rom` feature).
    #[cfg(not(feature = "extended-rom"))]
    pub const BUILD: TargetProfile = TargetProfile::Base;
}

impl fmt::Display for TargetProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetProfile::Base => f.write_str("base (<= 64 KiB ROM)"),
            TargetProfile::Extended => f.write_str("extended (> 64 KiB ROM)"),
        }
    }
}

/// What to do when the critical nesting counter would wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestingPolicy {
    /// Treat it as a fatal invariant violation (panic).
    Fatal,
    /// Clamp the counter and log a warning.
    Saturate,
}

/// Port configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortConfig {
    pub nesting_policy: NestingPolicy,
    /// Whether the tick interrupt reschedules. A cooperative build only
    /// counts ticks from the interrupt and switches on yield.
    pub preemptive: bool,
}

impl PortConfig {
    pub const DEFAULT: Self = Self {
        nesting_policy: NestingPolicy::Fatal,
        preemptive: true,
    };
}

impl Default for PortConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Nesting value a task starts with: not inside any critical section.
pub const NO_CRITICAL_NESTING: u8 = 0;

/// Nesting value before the scheduler starts.
///
/// Half of what a byte holds, so enter/exit pairs issued during boot move
/// the counter around without ever reaching zero and unmasking interrupts.
/// The first restored task replaces it with its own saved counter.
pub const SENTINEL_NESTING: u8 = 0x7F;

/// Call/return depth every task stack must be able to absorb.
pub const MINIMAL_CALL_RETURN_DEPTH: u16 = 10;

/// Parameter (2), chain depth (1), nesting (1) and 16 bytes of headroom.
pub const OTHER_STACK_BYTES: u16 = 20;
