//! Data model of the compiler: gates, programs, mappings, routed layers.

mod gate;
mod mapping;
mod program;
mod routed;

pub use gate::Gate;
pub use mapping::Site;
pub use program::Program;
pub use routed::{GateRef, QubitSlot, RoutedLayer, RoutedStage};
