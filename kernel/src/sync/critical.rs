// =============================================================================
// WizPort — Critical Section Nesting
// =============================================================================
//
// A critical section on this port is "GIEH clear". Sections nest, so the
// port counts them instead of saving and restoring INTCON at each level:
// the compiler gives us no frame pointer, which rules out keeping the
// previous interrupt state on the caller's stack the way a spinlock guard
// would.
//
// HOW IT WORKS:
//   - enter: clear GIEH, then bump the counter.
//   - exit:  drop the counter; GIEH is set again only when it reaches 0.
//   - The counter is part of every task's saved frame, so each task
//     resumes at its own depth. A task suspended inside a section comes
//     back with GIEH clear, one suspended outside comes back with GIEH set.
//
// BOOT:
//   Before the first task runs the counter holds 0x7F. Whatever enter/exit
//   pairs initialisation code issues, the counter stays far from zero and
//   interrupts stay off until the first restore loads a task's own count.
//
// WRAP-AROUND:
//   Exiting at 0 or entering at 0xFF breaks the invariant. `Fatal` panics,
//   `Saturate` holds the counter where it is and logs a warning.
// =============================================================================

use khal::Pic18;

use crate::config::{NestingPolicy, NO_CRITICAL_NESTING, SENTINEL_NESTING};

/// The live critical section nesting counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CriticalNesting {
    count: u8,
    policy: NestingPolicy,
}

impl CriticalNesting {
    /// Counter as it stands before the scheduler starts.
    pub const fn boot(policy: NestingPolicy) -> Self {
        Self {
            count: SENTINEL_NESTING,
            policy,
        }
    }

    pub fn current(&self) -> u8 {
        self.count
    }

    pub fn policy(&self) -> NestingPolicy {
        self.policy
    }

    /// Whether a resume at this depth runs with interrupts enabled.
    pub fn is_outside(&self) -> bool {
        self.count == NO_CRITICAL_NESTING
    }

    /// Enter a critical section. Interrupts are masked on every call, not
    /// only the outermost one.
    pub fn enter(&mut self, cpu: &mut Pic18) {
        cpu.disable_interrupts();
        match self.count.checked_add(1) {
            Some(next) => self.count = next,
            None => match self.policy {
                NestingPolicy::Fatal => panic!("critical section nesting overflow"),
                NestingPolicy::Saturate => {
                    log::warn!("critical: nesting saturated at {:#04x}", self.count)
                }
            },
        }
    }

    /// Leave a critical section; the outermost exit unmasks interrupts.
    pub fn exit(&mut self, cpu: &mut Pic18) {
        match self.count.checked_sub(1) {
            Some(next) => {
                self.count = next;
                if next == NO_CRITICAL_NESTING {
                    cpu.enable_interrupts();
                }
            }
            None => match self.policy {
                NestingPolicy::Fatal => panic!("critical section exit without a matching enter"),
                NestingPolicy::Saturate => log::warn!("critical: exit at nesting 0 ignored"),
            },
        }
    }

    /// Load a counter popped from a task's frame.
    pub(crate) fn load(&mut self, count: u8) {
        self.count = count;
    }
}
