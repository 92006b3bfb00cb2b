//! Compiler scratch-space query.
//!
//! wizC keeps temporaries and optimised locals in a fixed access-RAM area
//! (OVERHEADPAGE0 - LOCOPTSIZE + MAXLOCOPTSIZE bytes). The size is only
//! known to the toolchain, so the firmware reads it from an assembler
//! constant. Everything else in the port asks a [`ScratchSizeProvider`].

/// Routine on whose behalf the scratch size is queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Routine {
    /// The stack frame builder.
    StackInit,
    /// Context save/restore.
    ContextSwitch,
    /// The minimum stack size calculator.
    MinimalStackSize,
}

/// Supplies the scratch size. Queried once per routine when the port is
/// built; implementations must be reentrant.
pub trait ScratchSizeProvider {
    fn scratch_size(&self, routine: Routine) -> u8;
}

/// A scratch size validated against the toolchain and hardcoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedScratch(pub u8);

impl ScratchSizeProvider for FixedScratch {
    fn scratch_size(&self, _routine: Routine) -> u8 {
        self.0
    }
}

impl<F: Fn(Routine) -> u8> ScratchSizeProvider for F {
    fn scratch_size(&self, routine: Routine) -> u8 {
        self(routine)
    }
}
