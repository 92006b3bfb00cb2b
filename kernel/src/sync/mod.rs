// =============================================================================
// WizPort — Synchronization
// =============================================================================
//
// A single core has exactly two ways to keep other code out:
//
//   - critical sections mask the high-priority interrupt (tick included),
//     see `critical`;
//   - scheduler suspension stops task switches but leaves interrupts on,
//     see `memory::heap::SuspendGuard`.
//
// Hold a critical section for a handful of instructions only. Anything
// longer belongs under scheduler suspension.
// =============================================================================

pub mod critical;

pub use critical::CriticalNesting;
