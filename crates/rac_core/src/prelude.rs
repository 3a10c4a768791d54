//! Convenience re-exports for downstream crates.

pub use crate::config::{CompilerConfig, RoutingStrategy};
pub use crate::error::{RacError, Result};
pub use crate::geometry::ChipGeometry;
pub use crate::types::{Gate, GateRef, Program, QubitSlot, RoutedLayer, RoutedStage, Site};
