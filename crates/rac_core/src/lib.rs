//! # RAC Core
//!
//! Core types for RAC (Rydberg Atom Compiler).
//!
//! This crate provides:
//! - `Gate` / `Program`: two-qubit gate lists to be compiled
//! - `Site` / mapping helpers: qubit-to-trap-site assignments
//! - `ChipGeometry` and the physical constants of the trap array
//! - `RoutedStage`: the per-layer routing output consumed by code generation
//! - `RacError`: unified error type
//! - `CompilerConfig`: the knobs shared by every pipeline stage
//!
//! ## Example
//!
//! ```rust
//! use rac_core::prelude::*;
//!
//! let program = Program::from_pairs([(0, 1), (1, 2)], None).unwrap();
//! assert_eq!(program.num_qubits, 3);
//! assert_eq!(program.gates[0], Gate::new(1, 0).unwrap());
//! ```

pub mod config;
pub mod error;
pub mod geometry;
pub mod prelude;
pub mod types;

pub use config::{CompilerConfig, RoutingStrategy};
pub use error::{RacError, Result};
pub use geometry::ChipGeometry;
pub use types::{Gate, GateRef, Program, QubitSlot, RoutedLayer, RoutedStage, Site};
