//! Qubit placement by simulated annealing.
//!
//! The cost of a mapping is the layer-weighted wirelength of all scheduled
//! gates: early layers dominate through `weight(L) = max(1 - 0.1 L, 0.1)`.
//! The full placer assigns every qubit from scratch; the partial placer
//! re-places a target subset while the rest of the array stays pinned.

mod anneal;
mod full;
mod partial;

pub use full::place;
pub use partial::place_partial;

use rac_core::prelude::*;

/// Weight of a scheduled layer in the wirelength cost.
pub(crate) fn layer_weight(level: usize) -> f64 {
    (1.0 - 0.1 * level as f64).max(0.1)
}

/// Distance between the mapped endpoints of a gate.
pub(crate) fn gate_dist(mapping: &[Site], gate: &Gate, l2: bool) -> f64 {
    let (a, b) = (mapping[gate.q0], mapping[gate.q1]);
    if l2 {
        a.dist_sq(&b)
    } else {
        a.dist(&b)
    }
}

/// Working grid for the annealer: a square window of side `ceil(sqrt(Nq)) + 4`
/// clipped to the chip, falling back to the whole chip when the window
/// cannot hold every qubit.
pub(crate) fn window_dims(chip_dim: (usize, usize), n_qubits: usize) -> (usize, usize) {
    let length = (n_qubits as f64).sqrt().ceil() as usize + 4;
    let dims = (chip_dim.0.min(length), chip_dim.1.min(length));
    if dims.0 * dims.1 < n_qubits {
        chip_dim
    } else {
        dims
    }
}

/// Per-qubit index of the gates touching it, as `(layer, index-in-layer)`.
pub(crate) fn qubit_gate_index(layers: &[Vec<Gate>], n_qubits: usize) -> Vec<Vec<(usize, usize)>> {
    let mut index = vec![Vec::new(); n_qubits];
    for (l, gates) in layers.iter().enumerate() {
        for (g, gate) in gates.iter().enumerate() {
            index[gate.q0].push((l, g));
            index[gate.q1].push((l, g));
        }
    }
    index
}

/// Weighted wirelength of a specific gate set.
pub(crate) fn gates_cost(
    layers: &[Vec<Gate>],
    mapping: &[Site],
    gates: &[(usize, usize)],
    l2: bool,
) -> f64 {
    gates
        .iter()
        .map(|&(l, g)| layer_weight(l) * gate_dist(mapping, &layers[l][g], l2))
        .sum()
}

/// Weighted wirelength of the whole schedule.
pub(crate) fn full_cost(layers: &[Vec<Gate>], mapping: &[Site], l2: bool) -> f64 {
    layers
        .iter()
        .enumerate()
        .map(|(l, gates)| {
            let wl: f64 = gates.iter().map(|g| gate_dist(mapping, g, l2)).sum();
            wl * layer_weight(l)
        })
        .sum()
}

/// A single relocation, kept so a rejected move can be undone.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MoveRec {
    pub qubit: usize,
    pub from: Site,
}

/// Mapping plus its inverse occupancy grid.
pub(crate) struct Board {
    pub mapping: Vec<Site>,
    cell: Vec<Vec<Option<usize>>>,
}

impl Board {
    pub fn new(grid: (usize, usize), mapping: Vec<Site>) -> Result<Self> {
        let mut cell = vec![vec![None; grid.1]; grid.0];
        for (i, s) in mapping.iter().enumerate() {
            if s.x >= grid.0 || s.y >= grid.1 {
                return Err(RacError::placement(format!(
                    "qubit {i} mapped outside the working grid at ({}, {})",
                    s.x, s.y
                )));
            }
            cell[s.x][s.y] = Some(i);
        }
        Ok(Self { mapping, cell })
    }

    pub fn occupant(&self, s: Site) -> Option<usize> {
        self.cell[s.x][s.y]
    }

    /// Moves `qubit` to `to`; an occupant of `to` is swapped onto the
    /// vacated site. Returns the displaced qubit, if any.
    pub fn relocate(&mut self, qubit: usize, to: Site) -> Option<usize> {
        let from = self.mapping[qubit];
        let displaced = self.cell[to.x][to.y];
        self.mapping[qubit] = to;
        self.cell[to.x][to.y] = Some(qubit);
        self.cell[from.x][from.y] = if to == from { Some(qubit) } else { displaced };
        if let Some(d) = displaced {
            if d != qubit {
                self.mapping[d] = from;
            }
        }
        displaced
    }

    /// Undoes a relocation by swapping the qubit back to its old site.
    pub fn undo(&mut self, rec: &MoveRec) {
        self.relocate(rec.qubit, rec.from);
    }
}

/// Gates whose wirelength a relocation can change: the mover's gates plus
/// the displaced qubit's. Sorted and deduplicated so the floating-point
/// accumulation order is reproducible.
pub(crate) fn affected_gates(
    qubit_gates: &[Vec<(usize, usize)>],
    qubit: usize,
    displaced: Option<usize>,
) -> Vec<(usize, usize)> {
    let mut affected = qubit_gates[qubit].clone();
    if let Some(d) = displaced {
        affected.extend_from_slice(&qubit_gates[d]);
    }
    affected.sort_unstable();
    affected.dedup();
    affected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_weight_floor() {
        assert_eq!(layer_weight(0), 1.0);
        assert!((layer_weight(3) - 0.7).abs() < 1e-12);
        assert_eq!(layer_weight(40), 0.1);
    }

    #[test]
    fn test_window_dims() {
        // 9 qubits -> window side 7, clipped to the chip
        assert_eq!(window_dims((16, 16), 9), (7, 7));
        assert_eq!(window_dims((5, 5), 9), (5, 5));
        // window too small for the qubits -> whole chip
        assert_eq!(window_dims((2, 30), 20), (2, 30));
    }

    #[test]
    fn test_board_swap_semantics() {
        let mapping = vec![Site::new(0, 0), Site::new(1, 1)];
        let mut board = Board::new((2, 2), mapping).unwrap();
        let displaced = board.relocate(0, Site::new(1, 1));
        assert_eq!(displaced, Some(1));
        assert_eq!(board.mapping[0], Site::new(1, 1));
        assert_eq!(board.mapping[1], Site::new(0, 0));
        assert_eq!(board.occupant(Site::new(0, 0)), Some(1));

        board.undo(&MoveRec {
            qubit: 0,
            from: Site::new(0, 0),
        });
        assert_eq!(board.mapping[0], Site::new(0, 0));
        assert_eq!(board.mapping[1], Site::new(1, 1));
    }

    #[test]
    fn test_board_rejects_out_of_grid() {
        let mapping = vec![Site::new(5, 0)];
        assert!(Board::new((2, 2), mapping).is_err());
    }

    #[test]
    fn test_full_cost_matches_incremental_view() {
        let layers = vec![
            vec![Gate::new(0, 1).unwrap()],
            vec![Gate::new(1, 2).unwrap()],
        ];
        let mapping = vec![Site::new(0, 0), Site::new(3, 4), Site::new(3, 5)];
        let cost = full_cost(&layers, &mapping, false);
        assert!((cost - (1.0 * 5.0 + 0.9 * 1.0)).abs() < 1e-12);

        let index = qubit_gate_index(&layers, 3);
        let all: Vec<(usize, usize)> = vec![(0, 0), (1, 0)];
        assert!((gates_cost(&layers, &mapping, &all, false) - cost).abs() < 1e-12);
        assert_eq!(affected_gates(&index, 1, None), all);
    }
}
