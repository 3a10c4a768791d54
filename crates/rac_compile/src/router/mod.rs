//! Atom-motion routing.
//!
//! For each scheduled layer the router repeatedly extracts a set of
//! motions that a single rigid lattice move can realize (pairwise
//! `compatible_2d`), moving one atom of every satisfied gate onto its
//! partner's site. Once the layer's gates are all satisfied, the displaced
//! atoms are either shuttled back to where they started
//! (reverse-to-initial) or re-placed for the remaining layers by the
//! partial placer.

pub mod compat;
pub mod mis;

pub use compat::{compatible_2d, Motion};
pub use mis::{GreedyFirstFit, MisSolver, Redumis, SeededMaximal};

use crate::placer::place_partial;
use rac_core::prelude::*;
use rayon::prelude::*;
use std::time::{Duration, Instant};
use tracing::info;

/// Cap on the candidate motion list entering MIS when windowing is on.
pub const WINDOW_CAP: usize = 1000;

/// Result of routing one scheduled layer.
#[derive(Debug)]
pub struct RouteOutcome {
    /// Sub-layer decomposition, starting from the pre-layer resting state
    pub stage: RoutedStage,
    /// Mapping the next layer starts from
    pub final_mapping: Vec<Site>,
    /// Time spent inside the partial placer
    pub placement_time: Duration,
}

fn strategy_solver(strategy: RoutingStrategy) -> Box<dyn MisSolver> {
    match strategy {
        RoutingStrategy::Mis => Box::new(Redumis::new("mis")),
        RoutingStrategy::MaximalIs => Box::new(SeededMaximal::default()),
        RoutingStrategy::MaximalIsSorted => Box::new(GreedyFirstFit),
    }
}

/// Two candidate motions per remaining gate (each endpoint onto the
/// other's site), truncated to the window cap when requested.
fn build_candidates(remain: &[Gate], mapping: &[Site], use_window: bool) -> Vec<Motion> {
    let cap = if use_window {
        WINDOW_CAP.min(2 * remain.len())
    } else {
        2 * remain.len()
    };
    let mut motions = Vec::with_capacity(cap);
    for gate in remain.iter().take(cap / 2) {
        let a = mapping[gate.q0];
        let b = mapping[gate.q1];
        motions.push(Motion::new(a.x, b.x, a.y, b.y));
        motions.push(Motion::new(b.x, a.x, b.y, a.y));
    }
    motions
}

/// All incompatible motion pairs. The pairwise test is embarrassingly
/// parallel; `flat_map_iter` keeps the (i, j) output order deterministic.
fn conflict_edges(motions: &[Motion]) -> Vec<(usize, usize)> {
    (0..motions.len())
        .into_par_iter()
        .flat_map_iter(|i| {
            let a = motions[i];
            (i + 1..motions.len()).filter_map(move |j| {
                if compatible_2d(&a, &motions[j]) {
                    None
                } else {
                    Some((i, j))
                }
            })
        })
        .collect()
}

fn sorted_by_descending_dist<T, F>(mut items: Vec<T>, dist: F) -> Vec<T>
where
    F: Fn(&T) -> f64,
{
    items.sort_by(|a, b| {
        dist(b)
            .partial_cmp(&dist(a))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    items
}

/// Routes scheduled layer `stage_idx`, starting from `mapping`.
///
/// `layer_gates` holds every scheduled layer: the re-placement tail
/// optimizes over the layers still ahead.
pub fn route_stage(
    chip: &ChipGeometry,
    n_qubits: usize,
    stage_idx: usize,
    layer_gates: &[Vec<Gate>],
    mapping: Vec<Site>,
    config: &CompilerConfig,
) -> Result<RouteOutcome> {
    let mut qubit_mapping = mapping;
    let initial_mapping = qubit_mapping.clone();
    let mut placement_time = Duration::ZERO;

    let mut layers = vec![RoutedLayer::at_rest(&qubit_mapping)];
    let last_layer = RoutedLayer::at_rest(&qubit_mapping);

    let stage_list = &layer_gates[stage_idx];
    let sorted_strategy = config.routing_strategy == RoutingStrategy::MaximalIsSorted;
    let mut remain: Vec<Gate> = stage_list.clone();
    if sorted_strategy {
        let map = &qubit_mapping;
        remain = sorted_by_descending_dist(remain, |g| map[g.q0].dist(&map[g.q1]));
    }

    let mut solver = strategy_solver(config.routing_strategy);
    let mut fired: Vec<GateRef> = Vec::new();
    let mut touched: Vec<usize> = Vec::new();
    let mut touched_seen = vec![false; n_qubits];

    while !remain.is_empty() {
        let motions = build_candidates(&remain, &qubit_mapping, config.use_window);
        let edges = conflict_edges(&motions);
        let selected = solver.solve(motions.len(), &edges)?;

        let mut selected_mask = vec![false; motions.len()];
        let mut target_of: Vec<Option<usize>> = vec![None; n_qubits];
        let mut movers: Vec<usize> = Vec::new();
        for &i in &selected {
            selected_mask[i] = true;
            let gate = remain[i / 2];
            let (mover, partner) = if i % 2 == 0 {
                (gate.q0, gate.q1)
            } else {
                (gate.q1, gate.q0)
            };
            movers.push(mover);
            target_of[mover] = Some(partner);
            if !touched_seen[mover] {
                touched_seen[mover] = true;
                touched.push(mover);
            }
            let id = stage_list
                .iter()
                .position(|g| g == &gate)
                .ok_or_else(|| RacError::routing(format!("gate {gate:?} not in its layer")))?;
            fired.push(GateRef {
                id,
                q0: mover,
                q1: partner,
            });
        }

        // movers land on their partner's site; partners never move in the
        // same sub-layer, so update order is irrelevant
        for q in 0..n_qubits {
            if let Some(p) = target_of[q] {
                qubit_mapping[q] = qubit_mapping[p];
            }
        }

        layers.push(RoutedLayer::at_rest(&qubit_mapping));
        let prev = layers.len() - 2;
        for &m in &movers {
            layers[prev].qubits[m].carried = true;
        }

        remain = remain
            .into_iter()
            .enumerate()
            .filter(|(g, _)| {
                !selected_mask.get(2 * g).copied().unwrap_or(false)
                    && !selected_mask.get(2 * g + 1).copied().unwrap_or(false)
            })
            .map(|(_, gate)| gate)
            .collect();
    }

    if let Some(last) = layers.last_mut() {
        last.gates = fired;
    }

    let mut final_mapping = initial_mapping.clone();
    if stage_idx + 1 < layer_gates.len() || config.reverse_to_initial {
        if config.reverse_to_initial {
            append_reverse_tail(&mut layers, n_qubits, last_layer);
        } else {
            info!(
                "finding a mapping for interaction stage {}/{}",
                stage_idx + 2,
                layer_gates.len()
            );
            let remaining = &layer_gates[stage_idx..];
            let t = Instant::now();
            let new_mapping = place_partial(
                (chip.nx, chip.ny),
                n_qubits,
                remaining,
                &initial_mapping,
                &touched,
                config.l2,
            )?;
            placement_time += t.elapsed();

            append_replace_tail(
                &mut layers,
                n_qubits,
                &mut qubit_mapping,
                &new_mapping,
                touched,
                config,
                solver.as_mut(),
            )?;
            final_mapping = new_mapping;
        }
    }

    if let Some(last) = layers.last_mut() {
        for q in &mut last.qubits {
            q.carried = false;
        }
    }

    Ok(RouteOutcome {
        stage: RoutedStage { layers },
        final_mapping,
        placement_time,
    })
}

/// Mirrors the forward sub-layers so every displaced atom returns to its
/// pre-layer site, leaving the mapping unchanged across the stage.
fn append_reverse_tail(layers: &mut Vec<RoutedLayer>, n_qubits: usize, last_layer: RoutedLayer) {
    let n = layers.len();
    if n >= 2 {
        for q in 0..n_qubits {
            let src = layers[n - 2].qubits[q];
            let dst = &mut layers[n - 1].qubits[q];
            dst.carried = src.carried;
            dst.col = src.col;
            dst.row = src.row;
        }
    }
    let mut reverse_layers = Vec::new();
    for i in (1..n.saturating_sub(1)).rev() {
        let mut layer = RoutedLayer {
            qubits: layers[i].qubits.clone(),
            gates: Vec::new(),
        };
        for q in 0..n_qubits {
            layer.qubits[q].carried = layers[i - 1].qubits[q].carried;
            layer.qubits[q].col = layers[i - 1].qubits[q].col;
            layer.qubits[q].row = layers[i - 1].qubits[q].row;
        }
        reverse_layers.push(layer);
    }
    layers.append(&mut reverse_layers);
    layers.push(last_layer);
}

/// Shuttles every touched atom from its gate position to the home chosen
/// by the partial placer, under the same compatibility filter. The
/// distance-sorted strategy falls back to the library MIS here.
fn append_replace_tail(
    layers: &mut Vec<RoutedLayer>,
    n_qubits: usize,
    qubit_mapping: &mut [Site],
    new_mapping: &[Site],
    touched: Vec<usize>,
    config: &CompilerConfig,
    solver: &mut dyn MisSolver,
) -> Result<()> {
    let mut pending = touched;
    if config.routing_strategy == RoutingStrategy::MaximalIsSorted {
        let map = &*qubit_mapping;
        pending = sorted_by_descending_dist(pending, |&q| map[q].dist(&new_mapping[q]));
    }
    let mut library = SeededMaximal::default();

    while !pending.is_empty() {
        let cap = if config.use_window {
            WINDOW_CAP.min(pending.len())
        } else {
            pending.len()
        };
        let motions: Vec<Motion> = pending
            .iter()
            .take(cap)
            .map(|&q| {
                Motion::new(
                    qubit_mapping[q].x,
                    new_mapping[q].x,
                    qubit_mapping[q].y,
                    new_mapping[q].y,
                )
            })
            .collect();
        let edges = conflict_edges(&motions);
        let moved = match config.routing_strategy {
            RoutingStrategy::Mis => solver.solve(motions.len(), &edges)?,
            _ => library.solve(motions.len(), &edges)?,
        };

        let mut moved_mask = vec![false; motions.len()];
        let mut movers = Vec::new();
        for &i in &moved {
            moved_mask[i] = true;
            let q = pending[i];
            movers.push(q);
            qubit_mapping[q] = new_mapping[q];
        }

        layers.push(RoutedLayer::at_rest(qubit_mapping));
        let prev = layers.len() - 2;
        for &m in &movers {
            layers[prev].qubits[m].carried = true;
        }

        pending = pending
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !moved_mask.get(*i).copied().unwrap_or(false))
            .map(|(_, q)| q)
            .collect();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(strategy: RoutingStrategy, r2i: bool) -> CompilerConfig {
        CompilerConfig {
            routing_strategy: strategy,
            reverse_to_initial: r2i,
            ..CompilerConfig::default()
        }
    }

    fn line_mapping(n: usize) -> Vec<Site> {
        (0..n).map(|i| Site::new(i, 0)).collect()
    }

    #[test]
    fn test_candidates_come_in_incompatible_pairs() {
        let gates = vec![Gate::new(0, 1).unwrap()];
        let mapping = vec![Site::new(0, 0), Site::new(3, 2)];
        let motions = build_candidates(&gates, &mapping, false);
        assert_eq!(motions.len(), 2);
        assert!(!compatible_2d(&motions[0], &motions[1]));
    }

    #[test]
    fn test_window_caps_candidates() {
        let n = 700;
        let gates: Vec<Gate> = (0..n).map(|i| Gate::new(2 * i, 2 * i + 1).unwrap()).collect();
        let mapping = line_mapping(2 * n);
        assert_eq!(build_candidates(&gates, &mapping, false).len(), 2 * n);
        assert_eq!(build_candidates(&gates, &mapping, true).len(), WINDOW_CAP);
    }

    #[test]
    fn test_selected_motions_pairwise_compatible() {
        let chip = ChipGeometry::square(8);
        let layer = vec![
            Gate::new(0, 1).unwrap(),
            Gate::new(2, 3).unwrap(),
            Gate::new(4, 5).unwrap(),
        ];
        let layers = vec![layer];
        let mapping = line_mapping(6);
        let out = route_stage(
            &chip,
            6,
            0,
            &layers,
            mapping,
            &config(RoutingStrategy::MaximalIsSorted, true),
        )
        .unwrap();

        // every sub-layer's carried motions must be pairwise compatible
        for w in out.stage.layers.windows(2) {
            let motions: Vec<Motion> = w[0]
                .qubits
                .iter()
                .filter(|q| q.carried)
                .map(|q| {
                    let after = w[1].qubits[q.id];
                    Motion::new(q.x, after.x, q.y, after.y)
                })
                .collect();
            for i in 0..motions.len() {
                for j in i + 1..motions.len() {
                    assert!(compatible_2d(&motions[i], &motions[j]));
                }
            }
        }
    }

    #[test]
    fn test_every_gate_fired_exactly_once() {
        let chip = ChipGeometry::square(8);
        let layer = vec![
            Gate::new(0, 1).unwrap(),
            Gate::new(2, 3).unwrap(),
            Gate::new(4, 5).unwrap(),
        ];
        let layers = vec![layer.clone()];
        let out = route_stage(
            &chip,
            6,
            0,
            &layers,
            line_mapping(6),
            &config(RoutingStrategy::MaximalIsSorted, true),
        )
        .unwrap();

        let mut fired: Vec<usize> = out
            .stage
            .layers
            .iter()
            .flat_map(|l| l.gates.iter().map(|g| g.id))
            .collect();
        fired.sort_unstable();
        assert_eq!(fired, vec![0, 1, 2]);
    }

    #[test]
    fn test_reverse_to_initial_restores_mapping() {
        let chip = ChipGeometry::square(6);
        let layers = vec![vec![Gate::new(0, 2).unwrap(), Gate::new(1, 3).unwrap()]];
        let mapping = vec![
            Site::new(0, 0),
            Site::new(2, 2),
            Site::new(4, 0),
            Site::new(2, 4),
        ];
        let out = route_stage(
            &chip,
            4,
            0,
            &layers,
            mapping.clone(),
            &config(RoutingStrategy::MaximalIsSorted, true),
        )
        .unwrap();

        assert_eq!(out.final_mapping, mapping);
        let last = out.stage.layers.last().unwrap();
        for (q, slot) in last.qubits.iter().enumerate() {
            assert_eq!(slot.site(), mapping[q]);
            assert!(!slot.carried);
        }
    }

    #[test]
    fn test_replace_tail_ends_on_partial_placement() {
        let chip = ChipGeometry::square(6);
        let layers = vec![
            vec![Gate::new(0, 1).unwrap()],
            vec![Gate::new(1, 2).unwrap()],
        ];
        let mapping = vec![Site::new(0, 0), Site::new(3, 0), Site::new(3, 3)];
        let out = route_stage(
            &chip,
            3,
            0,
            &layers,
            mapping,
            &config(RoutingStrategy::MaximalIsSorted, false),
        )
        .unwrap();

        // the stage must end with every atom resting at its final site
        let last = out.stage.layers.last().unwrap();
        for (q, slot) in last.qubits.iter().enumerate() {
            assert_eq!(slot.site(), out.final_mapping[q]);
        }
        // the final mapping is still injective
        for i in 0..3 {
            for j in i + 1..3 {
                assert_ne!(out.final_mapping[i], out.final_mapping[j]);
            }
        }
    }
}
