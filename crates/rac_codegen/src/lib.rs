//! Hardware code generation for RAC.
//!
//! Consumes the router's sub-layer plan and emits the validated
//! instruction stream (`Init`, `Move`, `Activate`, `Deactivate`,
//! `Rydberg`) that realizes it. Every instruction verifies its geometric
//! preconditions against the shared array state before mutating it; a
//! violation is a compiler bug and surfaces as a fatal
//! `RacError::Geometry`.

pub mod builder;
pub mod inst;
pub mod state;

pub use builder::{CodeGen, StageProgram};
pub use inst::{ComboInst, Inst, InstRecord};
pub use state::{ArrayState, Snapshot};
