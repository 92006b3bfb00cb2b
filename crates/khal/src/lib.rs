//! Hardware Abstraction Layer for PIC18 parts running the WizPort scheduler.
#![no_std]

pub mod cpu;
pub mod intcon;
pub mod stack;
pub mod timer;

pub use cpu::{Pic18, Sfr};
pub use intcon::Intcon;
pub use stack::{CodeAddress, ReturnStack};
