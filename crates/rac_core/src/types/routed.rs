//! Routing output: the sub-layer decomposition of one scheduled layer.

use super::Site;
use serde::{Deserialize, Serialize};

/// State of one qubit inside a routing sub-layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QubitSlot {
    /// Qubit id
    pub id: usize,
    /// Whether the movable lattice carries this qubit out of this sub-layer
    pub carried: bool,
    /// Site x coordinate after this sub-layer
    pub x: usize,
    /// Site y coordinate after this sub-layer
    pub y: usize,
    /// AOD column index assigned by the router
    pub col: usize,
    /// AOD row index assigned by the router
    pub row: usize,
}

impl QubitSlot {
    /// A resting qubit pinned at `site`, with its AOD indices defaulted to
    /// the site coordinates (the convention the router assigns on pickup).
    pub fn at_rest(id: usize, site: Site) -> Self {
        Self {
            id,
            carried: false,
            x: site.x,
            y: site.y,
            col: site.x,
            row: site.y,
        }
    }

    /// The site this slot rests at.
    pub fn site(&self) -> Site {
        Site::new(self.x, self.y)
    }
}

/// A gate fired by the Rydberg pulse closing a routed stage.
///
/// `q0` is the qubit that was moved onto its partner's site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateRef {
    /// Index of the gate within its scheduled layer
    pub id: usize,
    pub q0: usize,
    pub q1: usize,
}

/// One atomic motion step: the qubit states after the step, plus the gates
/// fired once the step completes (non-empty only on the final sub-layer of
/// the interaction phase).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutedLayer {
    pub qubits: Vec<QubitSlot>,
    pub gates: Vec<GateRef>,
}

impl RoutedLayer {
    /// A motionless sub-layer with every qubit at rest under `mapping`.
    pub fn at_rest(mapping: &[Site]) -> Self {
        Self {
            qubits: mapping
                .iter()
                .enumerate()
                .map(|(i, &site)| QubitSlot::at_rest(i, site))
                .collect(),
            gates: Vec::new(),
        }
    }
}

/// The full routing of one scheduled layer: an ordered sequence of
/// sub-layers, beginning with the pre-layer resting state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutedStage {
    pub layers: Vec<RoutedLayer>,
}
