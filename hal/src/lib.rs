//! # Hardware Abstraction Layer (HAL)
//!
//! This crate defines the traits through which the mailbox layer reaches
//! the (simulated) processor and its devices.
//!
//! ## Philosophy
//!
//! **The processor is a collaborator, not a global.**
//!
//! The kernel never pokes a status register directly. It asks a
//! [`ProcessorHal`] for the current status word, writes a new one back, and
//! asks it to halt the machine when an invariant is broken. Device status
//! registers are read through [`DeviceHal`].
//!
//! ## Design Principles
//!
//! 1. **Trait-based**: All hardware access goes through traits
//! 2. **Testable**: Every trait has a simulated implementation in `sim_kernel`
//! 3. **Fatal is explicit**: Halting takes a typed [`HaltReason`] and never returns

pub mod cpu;
pub mod devices;
pub mod psr;

pub use cpu::{HaltReason, ProcessorHal};
pub use devices::{DeviceError, DeviceHal, DeviceType};
pub use psr::{Psr, PsrError};
