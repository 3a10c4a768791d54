//! Partial placement: re-place a subset of qubits, the rest stay pinned.
//!
//! Used after routing a layer: the atoms the lattice displaced get a new
//! resting place minimizing the wirelength of the remaining layers.

use super::anneal::Annealer;
use super::{affected_gates, full_cost, gates_cost, qubit_gate_index, window_dims, Board, MoveRec};
use rac_core::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use tracing::info;

const BEST_EPS: f64 = 1e-9;

/// Re-places `targets` starting from `initial`, holding all other qubits
/// fixed. Candidate destinations are the free cells of the annealing
/// window plus the targets' own sites, so the fixed majority is never
/// disturbed.
pub fn place_partial(
    chip_dim: (usize, usize),
    n_qubits: usize,
    layers: &[Vec<Gate>],
    initial: &[Site],
    targets: &[usize],
    l2: bool,
) -> Result<Vec<Site>> {
    info!("starting partial SA placement for {} qubits", targets.len());
    if l2 {
        info!("using squared-Euclidean wirelength");
    }
    if targets.is_empty() {
        return Ok(initial.to_vec());
    }
    let dims = window_dims(chip_dim, n_qubits);

    // candidate cells: free window cells plus the targets' current sites
    let occupied: HashSet<Site> = initial.iter().copied().collect();
    let mut positions: Vec<Site> = Vec::new();
    for x in 0..dims.0 {
        for y in 0..dims.1 {
            let s = Site::new(x, y);
            if !occupied.contains(&s) {
                positions.push(s);
            }
        }
    }
    for &q in targets {
        positions.push(initial[q]);
    }

    // the occupancy grid spans the whole chip: pinned qubits may sit
    // outside the annealing window
    let grid = (chip_dim.0.max(dims.0), chip_dim.1.max(dims.1));
    let mut board = Board::new(grid, initial.to_vec())?;

    let qubit_gates = qubit_gate_index(layers, n_qubits);
    let mut rng = StdRng::seed_from_u64(0);

    let mut current = full_cost(layers, &board.mapping, l2);
    let mut best = board.mapping.clone();
    let mut best_cost = current;

    let mut ann = Annealer::new();

    let mut uphill_sum = 0.0;
    let mut uphill_cnt = 0usize;
    for _ in 0..ann.burn_in_moves() {
        let (delta, _) = propose(
            &mut board,
            &qubit_gates,
            layers,
            l2,
            targets,
            &positions,
            &mut rng,
        );
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
            let (delta, rec) = propose(
                &mut board,
                &qubit_gates,
                layers,
                l2,
                targets,
                &positions,
                &mut rng,
            );
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

    info!(cost = best_cost, "partial SA placement finished");
    Ok(best)
}

fn propose(
    board: &mut Board,
    qubit_gates: &[Vec<(usize, usize)>],
    layers: &[Vec<Gate>],
    l2: bool,
    targets: &[usize],
    positions: &[Site],
    rng: &mut StdRng,
) -> (f64, MoveRec) {
    let qubit = targets[rng.gen_range(0..targets.len())];
    let to = positions[rng.gen_range(0..positions.len())];
    let from = board.mapping[qubit];

    let displaced = board.occupant(to);
    // candidate cells are free cells or target sites, so any occupant of
    // the destination must itself be movable
    debug_assert!(displaced.map_or(true, |d| targets.contains(&d)));

    let affected = affected_gates(qubit_gates, qubit, displaced);
    let before = gates_cost(layers, &board.mapping, &affected, l2);
    board.relocate(qubit, to);
    let after = gates_cost(layers, &board.mapping, &affected, l2);

    (after - before, MoveRec { qubit, from })
}
