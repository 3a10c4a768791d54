//! Compilation passes for RAC: gate scheduling, qubit placement and
//! atom-motion routing.
//!
//! The passes run in sequence and communicate through `rac_core` types:
//! a `Program` is scheduled into qubit-disjoint layers, the layers drive
//! the simulated-annealing placement of qubits on the chip, and each layer
//! is then routed into the sub-layer motion plan consumed by code
//! generation.

pub mod placer;
pub mod router;
pub mod scheduler;
pub mod verify;

pub use placer::{place, place_partial};
pub use router::{route_stage, RouteOutcome};
pub use scheduler::{gates_by_layer, schedule, schedule_asap, schedule_commuting};
