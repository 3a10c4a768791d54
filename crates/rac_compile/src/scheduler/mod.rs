//! Gate scheduling.
//!
//! Order-independent programs are partitioned into layers by Misra–Gries
//! edge coloring of the interaction graph: gates sharing a color share no
//! qubit, and at most Δ+1 layers are produced. Order-dependent programs
//! fall back to as-soon-as-possible list scheduling.

pub mod graph;
pub mod sequence_view;

use graph::InteractionGraph;
use rac_core::prelude::*;
use sequence_view::SequenceView;
use std::collections::HashSet;
use tracing::debug;

/// Grows the maximal fan of `x` starting from neighbor `f`: each appended
/// neighbor's edge to `x` is colored, and that color is free at the fan's
/// current last vertex.
fn maximal_fan(g: &InteractionGraph, x: usize, f: usize) -> Vec<usize> {
    let mut fan = vec![f];
    let mut last = f;
    let mut grew = true;
    while grew {
        grew = false;
        for &v in g.neighbors(x) {
            if !fan.contains(&v)
                && g.edge_is_colored(x, v)
                && g.color_is_free_at(g.edge_color(x, v), last)
            {
                fan.push(v);
                last = v;
                grew = true;
            }
        }
    }
    fan
}

/// Smallest color free at `x` and smallest color free at `fan_last`.
fn free_colors_cd(g: &InteractionGraph, x: usize, fan_last: usize) -> (u32, u32) {
    let mut c = 1;
    while !g.color_is_free_at(c, x) {
        c += 1;
    }
    let mut d = 1;
    while !g.color_is_free_at(d, fan_last) {
        d += 1;
    }
    (c, d)
}

/// Walks the alternating cd-path starting at `x` along color `d`, flipping
/// each traversed edge to the other color of the pair. Returns the path
/// length.
fn invert_cd_path(g: &mut InteractionGraph, x: usize, c: u32, d: u32) -> usize {
    let (mut u, mut c, mut d) = (x, c, d);
    let mut seen = HashSet::from([x]);
    let mut maximal = false;
    while !maximal {
        maximal = true;
        for i in 0..g.neighbors(u).len() {
            let v = g.neighbors(u)[i];
            if g.edge_color(u, v) == d && !seen.contains(&v) {
                g.set_edge_color(u, v, c);
                u = v;
                std::mem::swap(&mut c, &mut d);
                maximal = false;
                seen.insert(v);
                break;
            }
        }
    }
    seen.len() - 1
}

/// First fan vertex at which color `d` is free, with its position.
fn find_w_in_fan(g: &InteractionGraph, d: u32, fan: &[usize]) -> Option<(usize, usize)> {
    fan.iter()
        .enumerate()
        .find(|(_, &u)| g.color_is_free_at(d, u))
        .map(|(i, &u)| (i, u))
}

/// Shifts colors along a fan prefix: each edge `(x, u)` takes the color of
/// its successor edge `(x, u+)`.
fn rotate_fan(g: &mut InteractionGraph, x: usize, fan_prefix: SequenceView<'_, usize>) {
    for i in 1..fan_prefix.len() {
        let c = g.edge_color(x, fan_prefix[i]);
        g.set_edge_color(x, fan_prefix[i - 1], c);
    }
}

/// Partitions an order-independent program into qubit-disjoint layers via
/// Misra–Gries edge coloring.
///
/// The returned layers hold gate indices into `gates`. Exceeding Vizing's
/// bound of Δ+1 colors indicates a bug in the coloring itself and is
/// reported as a scheduling error.
pub fn schedule_commuting(n_qubits: usize, gates: &[Gate]) -> Result<Vec<Vec<usize>>> {
    let mut g = InteractionGraph::new(n_qubits);
    let mut delta = 0;
    for gate in gates {
        delta = delta.max(g.add_edge(gate.q0, gate.q1));
    }

    let mut max_color = 0;
    for gate in gates {
        let (x, f) = (gate.q0, gate.q1);
        let fan = maximal_fan(&g, x, f);
        let fan_last = *fan.last().unwrap_or(&f);
        let (c, d) = free_colors_cd(&g, x, fan_last);
        let cd_path_len = invert_cd_path(&mut g, x, c, d);
        let (w_idx, w) = if cd_path_len > 0 {
            find_w_in_fan(&g, d, &fan).ok_or_else(|| {
                RacError::scheduling(format!("no fan vertex of {x} has color {d} free"))
            })?
        } else {
            (fan.len() - 1, fan_last)
        };
        rotate_fan(&mut g, x, SequenceView::new(&fan).prefix(w_idx + 1));
        g.set_edge_color(x, w, d);
        max_color = max_color.max(d);
    }

    if max_color as usize > delta + 1 {
        return Err(RacError::scheduling(format!(
            "edge coloring used {max_color} colors, above the Vizing bound {}",
            delta + 1
        )));
    }
    debug!(colors = max_color, delta, "edge coloring finished");

    let mut layers = vec![Vec::new(); max_color as usize];
    for (i, gate) in gates.iter().enumerate() {
        layers[(g.edge_color(gate.q0, gate.q1) - 1) as usize].push(i);
    }
    Ok(layers)
}

/// As-soon-as-possible scheduling for order-dependent programs: each gate
/// lands in the earliest layer after the last use of either operand.
pub fn schedule_asap(n_qubits: usize, gates: &[Gate]) -> Vec<Vec<usize>> {
    let mut layers: Vec<Vec<usize>> = Vec::new();
    let mut next_free = vec![0usize; n_qubits];
    for (i, gate) in gates.iter().enumerate() {
        let t = next_free[gate.q0].max(next_free[gate.q1]);
        if t >= layers.len() {
            layers.push(Vec::new());
        }
        layers[t].push(i);
        next_free[gate.q0] = t + 1;
        next_free[gate.q1] = t + 1;
    }
    layers
}

/// Schedules a program, dispatching on gate order dependence.
pub fn schedule(program: &Program, dependency: bool) -> Result<Vec<Vec<usize>>> {
    if dependency {
        Ok(schedule_asap(program.num_qubits, &program.gates))
    } else {
        schedule_commuting(program.num_qubits, &program.gates)
    }
}

/// Resolves a schedule of gate indices into per-layer gate lists.
pub fn gates_by_layer(schedule: &[Vec<usize>], gates: &[Gate]) -> Vec<Vec<Gate>> {
    schedule
        .iter()
        .map(|layer| layer.iter().map(|&i| gates[i]).collect())
        .collect()
}
