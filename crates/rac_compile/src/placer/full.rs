//! Full placement: assign every qubit to a site from scratch.

use super::anneal::Annealer;
use super::{affected_gates, full_cost, gates_cost, qubit_gate_index, window_dims, Board, MoveRec};
use rac_core::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::info;

const BEST_EPS: f64 = 1e-9;

/// Finds a qubit layout minimizing layer-weighted wirelength.
///
/// Deterministic: the annealer runs on a locally seeded PRNG (seed 0), so
/// identical inputs produce identical mappings.
pub fn place(
    chip_dim: (usize, usize),
    n_qubits: usize,
    layers: &[Vec<Gate>],
    l2: bool,
) -> Result<Vec<Site>> {
    info!("starting SA placement for {} qubits", n_qubits);
    if l2 {
        info!("using squared-Euclidean wirelength");
    }
    if n_qubits == 0 {
        return Ok(Vec::new());
    }
    let dims = window_dims(chip_dim, n_qubits);
    if dims.0 * dims.1 < n_qubits {
        return Err(RacError::placement(format!(
            "{}x{} grid cannot hold {} qubits",
            dims.0, dims.1, n_qubits
        )));
    }

    let qubit_gates = qubit_gate_index(layers, n_qubits);
    let mut rng = StdRng::seed_from_u64(0);

    // random initial permutation of cells among qubits
    let mut cells: Vec<usize> = (0..dims.0 * dims.1).collect();
    cells.shuffle(&mut rng);
    let mapping: Vec<Site> = cells[..n_qubits]
        .iter()
        .map(|&c| Site::new(c / dims.1, c % dims.1))
        .collect();
    let mut board = Board::new(dims, mapping)?;

    let mut current = full_cost(layers, &board.mapping, l2);
    let mut best = board.mapping.clone();
    let mut best_cost = current;

    let mut ann = Annealer::new();

    // burn-in: every move is kept, uphill deltas calibrate the temperature
    let mut uphill_sum = 0.0;
    let mut uphill_cnt = 0usize;
    for _ in 0..ann.burn_in_moves() {
        let (delta, _) = propose(&mut board, &qubit_gates, layers, l2, dims, &mut rng);
        current += delta;
        if best_cost - current > BEST_EPS {
            best.clone_from(&board.mapping);
            best_cost = current;
        }
        if delta > 0.0 {
            uphill_sum += delta;
            uphill_cnt += 1;
        }
    }
    ann.set_initial_temperature(uphill_sum, uphill_cnt);

    while !ann.frozen() {
        ann.begin_epoch();
        for _ in 0..ann.moves_per_epoch() {
            let (delta, rec) = propose(&mut board, &qubit_gates, layers, l2, dims, &mut rng);
            ann.record(delta);
            if delta <= 0.0 {
                current += delta;
                if best_cost - current > BEST_EPS {
                    best.clone_from(&board.mapping);
                    best_cost = current;
                }
            } else if ann.accepts_uphill(delta, &mut rng) {
                current += delta;
            } else {
                board.undo(&rec);
            }
        }
        ann.end_epoch();
        if ann.over_epoch_cap() {
            break;
        }
    }

    info!(cost = best_cost, "SA placement finished");
    Ok(best)
}

/// Applies one random relocation and returns its cost delta. The move is
/// left applied; the caller undoes it on rejection.
fn propose(
    board: &mut Board,
    qubit_gates: &[Vec<(usize, usize)>],
    layers: &[Vec<Gate>],
    l2: bool,
    dims: (usize, usize),
    rng: &mut StdRng,
) -> (f64, MoveRec) {
    let qubit = rng.gen_range(0..board.mapping.len());
    let to = Site::new(rng.gen_range(0..dims.0), rng.gen_range(0..dims.1));
    let from = board.mapping[qubit];

    let affected = affected_gates(qubit_gates, qubit, board.occupant(to));
    let before = gates_cost(layers, &board.mapping, &affected, l2);
    board.relocate(qubit, to);
    let after = gates_cost(layers, &board.mapping, &affected, l2);

    (after - before, MoveRec { qubit, from })
}
