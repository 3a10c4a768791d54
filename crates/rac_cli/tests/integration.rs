//! End-to-end pipeline tests.
//!
//! The emitted instruction stream is replayed by a small simulator that
//! applies every record to tracked col/row/atom state, re-checking the
//! lattice ordering invariant, pickup/dropoff coincidence, and that the
//! Rydberg pulses reproduce exactly the scheduled gates.

use rac_cli::pipeline::{RacPipeline, SolveResult};
use rac_codegen::InstRecord;
use rac_core::geometry::{AOD_SEP, R_B};
use rac_core::CompilerConfig;

fn compile(
    arch: usize,
    pairs: &[(usize, usize)],
    tweak: impl FnOnce(&mut CompilerConfig),
) -> SolveResult {
    let mut config = CompilerConfig::default();
    tweak(&mut config);
    let mut pipeline = RacPipeline::new(config);
    pipeline.set_architecture(arch, arch, arch, arch);
    pipeline.set_program(pairs.iter().copied(), None).unwrap();
    pipeline.solve().unwrap()
}

fn count_rydbergs(result: &SolveResult) -> usize {
    result
        .records
        .iter()
        .filter(|r| matches!(r, InstRecord::Rydberg(_)))
        .count()
}

/// Replays the stream, asserting geometric invariants along the way.
/// Returns the gate pairs of each Rydberg pulse, in order.
struct Replay {
    fired: Vec<Vec<(usize, usize)>>,
    final_positions: Vec<(i64, i64)>,
    init_positions: Vec<(i64, i64)>,
}

fn replay(records: &[InstRecord]) -> Replay {
    let init = match records.first() {
        Some(InstRecord::Init(init)) => init,
        other => panic!("stream must start with Init, got {other:?}"),
    };
    let n_q = init.n_q;
    let mut atom_pos = vec![(0i64, 0i64); n_q];
    for (i, &q) in init.slm_qubit_idx.iter().enumerate() {
        atom_pos[q] = init.slm_qubit_xys[i];
    }
    let init_positions = atom_pos.clone();

    let mut col_x: Vec<Option<i64>> = vec![None; init.c_high];
    let mut row_y: Vec<Option<i64>> = vec![None; init.r_high];
    // carried atom -> (col, row) it rides on
    let mut binding: Vec<Option<(usize, usize)>> = vec![None; n_q];
    let mut fired: Vec<Vec<(usize, usize)>> = Vec::new();

    let check_order = |tracks: &[Option<i64>], what: &str| {
        let active: Vec<i64> = tracks.iter().filter_map(|t| *t).collect();
        for w in active.windows(2) {
            assert!(
                w[0] + AOD_SEP <= w[1],
                "{what} order violated: {} then {}",
                w[0],
                w[1]
            );
        }
    };

    for record in &records[1..] {
        match record {
            InstRecord::Init(_) => panic!("Init may only appear once"),
            InstRecord::Activate(a) => {
                for (i, &c) in a.col_idx.iter().enumerate() {
                    assert!(col_x[c].is_none(), "col {c} activated twice");
                    col_x[c] = Some(a.col_xs[i]);
                }
                for (i, &r) in a.row_idx.iter().enumerate() {
                    assert!(row_y[r].is_none(), "row {r} activated twice");
                    row_y[r] = Some(a.row_ys[i]);
                }
                check_order(&col_x, "column");
                check_order(&row_y, "row");
                for &q in &a.pickup_qs {
                    let (x, y) = atom_pos[q];
                    let c = col_x
                        .iter()
                        .position(|&cx| cx == Some(x))
                        .unwrap_or_else(|| panic!("no active col under picked atom {q}"));
                    let r = row_y
                        .iter()
                        .position(|&ry| ry == Some(y))
                        .unwrap_or_else(|| panic!("no active row under picked atom {q}"));
                    assert!(binding[q].is_none(), "atom {q} picked twice");
                    binding[q] = Some((c, r));
                }
            }
            InstRecord::Deactivate(d) => {
                for &q in &d.dropoff_qs {
                    assert!(binding[q].take().is_some(), "atom {q} dropped but not carried");
                    assert!(
                        init.all_slms.contains(&atom_pos[q]),
                        "atom {q} dropped at {:?}, not a known static trap",
                        atom_pos[q]
                    );
                }
                for &c in &d.col_idx {
                    assert!(col_x[c].take().is_some(), "col {c} deactivated twice");
                }
                for &r in &d.row_idx {
                    assert!(row_y[r].take().is_some(), "row {r} deactivated twice");
                }
                for (q, b) in binding.iter().enumerate() {
                    if let Some((c, r)) = b {
                        assert!(
                            col_x[*c].is_some() && row_y[*r].is_some(),
                            "atom {q} lost its trap without a dropoff"
                        );
                    }
                }
            }
            InstRecord::Move(m) => {
                for shift in &m.cols {
                    assert_eq!(
                        col_x[shift.id],
                        Some(shift.begin),
                        "col {} begin position disagrees",
                        shift.id
                    );
                    col_x[shift.id] = Some(shift.end);
                }
                for shift in &m.rows {
                    assert_eq!(
                        row_y[shift.id],
                        Some(shift.begin),
                        "row {} begin position disagrees",
                        shift.id
                    );
                    row_y[shift.id] = Some(shift.end);
                }
                check_order(&col_x, "column");
                check_order(&row_y, "row");
                for (q, b) in binding.iter().enumerate() {
                    if let Some((c, r)) = b {
                        atom_pos[q] = (
                            col_x[*c].expect("carried atom on inactive col"),
                            row_y[*r].expect("carried atom on inactive row"),
                        );
                    }
                }
            }
            InstRecord::Rydberg(ryd) => {
                let mut pulse = Vec::new();
                for g in &ryd.gates {
                    let (ax, ay) = atom_pos[g.q0];
                    let (bx, by) = atom_pos[g.q1];
                    let d2 = (ax - bx).pow(2) + (ay - by).pow(2);
                    assert!(
                        d2 <= R_B * R_B,
                        "gate ({}, {}) fired at distance^2 {d2}",
                        g.q0,
                        g.q1
                    );
                    pulse.push((g.q0.min(g.q1), g.q0.max(g.q1)));
                }
                fired.push(pulse);
            }
        }
    }

    Replay {
        fired,
        final_positions: atom_pos,
        init_positions,
    }
}

fn assert_fires_program(result: &SolveResult, pairs: &[(usize, usize)]) {
    let replayed = replay(&result.records);
    let mut fired: Vec<(usize, usize)> = replayed.fired.into_iter().flatten().collect();
    let mut expected: Vec<(usize, usize)> =
        pairs.iter().map(|&(a, b)| (a.min(b), a.max(b))).collect();
    fired.sort_unstable();
    expected.sort_unstable();
    assert_eq!(fired, expected, "Rydberg pulses must cover the program");
}

// ============================================================================
// Concrete scenarios
// ============================================================================

#[test]
fn test_two_gate_line() {
    let program = [(0, 1), (1, 2)];
    let result = compile(4, &program, |_| {});

    assert_eq!(result.num_layers, 2);
    let inits = result
        .records
        .iter()
        .filter(|r| matches!(r, InstRecord::Init(_)))
        .count();
    assert_eq!(inits, 1);
    assert!(matches!(result.records[0], InstRecord::Init(_)));
    assert_eq!(count_rydbergs(&result), 2);
    assert!(result
        .records
        .iter()
        .any(|r| matches!(r, InstRecord::Move(_))));

    assert_fires_program(&result, &program);
}

#[test]
fn test_triangle_takes_three_layers() {
    let program = [(0, 1), (1, 2), (0, 2)];
    let result = compile(4, &program, |_| {});

    assert_eq!(result.num_layers, 3);
    assert_eq!(count_rydbergs(&result), 3);
    assert_fires_program(&result, &program);
}

#[test]
fn test_disjoint_gates_pack_into_one_layer() {
    let program = [(0, 1), (2, 3)];
    let result = compile(4, &program, |_| {});

    assert_eq!(result.num_layers, 1);
    assert_eq!(count_rydbergs(&result), 1);
    let replayed = replay(&result.records);
    assert_eq!(replayed.fired.len(), 1);
    assert_eq!(replayed.fired[0].len(), 2);
}

#[test]
fn test_dependency_mode_preserves_order() {
    let program = [(0, 1), (0, 1), (1, 2)];
    let result = compile(4, &program, |c| c.dependency = true);

    assert_eq!(result.num_layers, 3);
    let replayed = replay(&result.records);
    assert_eq!(
        replayed.fired,
        vec![vec![(0, 1)], vec![(0, 1)], vec![(1, 2)]]
    );
}

#[test]
fn test_reverse_to_initial_round_trips_positions() {
    let program = [(0, 1), (1, 2), (0, 2)];
    let result = compile(4, &program, |c| c.reverse_to_initial = true);

    let replayed = replay(&result.records);
    assert_eq!(
        replayed.final_positions, replayed.init_positions,
        "r2i must restore every atom after the last stage"
    );
    assert_fires_program(&result, &program);
}

#[test]
fn test_window_flag_still_covers_program() {
    let program = [(0, 1), (2, 3), (4, 5), (1, 2), (3, 4)];
    let result = compile(6, &program, |c| c.use_window = true);
    assert_fires_program(&result, &program);
}

// ============================================================================
// Cross-cutting properties
// ============================================================================

#[test]
fn test_compact_stream_is_deterministic() {
    let program = [(0, 1), (1, 2), (2, 3), (0, 3)];
    let a = compile(5, &program, |_| {});
    let b = compile(5, &program, |_| {});

    let a_json = serde_json::to_string(&a.compact_records()).unwrap();
    let b_json = serde_json::to_string(&b.compact_records()).unwrap();
    assert_eq!(a_json, b_json);
}

#[test]
fn test_full_code_attaches_snapshots() {
    let program = [(0, 1), (1, 2)];
    let result = compile(4, &program, |c| c.full_code = true);

    let has_state = |r: &InstRecord| {
        let json = serde_json::to_value(r).unwrap();
        !json["state"].as_object().map_or(true, |m| m.is_empty())
    };
    assert!(result.records.iter().all(has_state));
    assert!(result.compact_records().iter().all(|r| !has_state(r)));
}

#[test]
fn test_random_regular_graph_compiles_and_replays() {
    let edges = rac_cli::graphs::random_regular_graph(12, 0).unwrap();
    let result = compile(8, &edges, |c| c.reverse_to_initial = true);

    // commutative scheduling respects the Vizing bound: degree 3 -> <= 4
    assert!(result.num_layers <= 4);
    assert_fires_program(&result, &edges);

    // every pulse is a qubit-disjoint layer
    let replayed = replay(&result.records);
    for pulse in &replayed.fired {
        let mut used = std::collections::HashSet::new();
        for &(a, b) in pulse {
            assert!(used.insert(a), "qubit {a} used twice in one pulse");
            assert!(used.insert(b), "qubit {b} used twice in one pulse");
        }
    }
}

#[test]
fn test_replacement_mode_compiles_and_replays() {
    // default terminal policy: displaced atoms are re-placed for the
    // remaining layers
    let program = [(0, 1), (1, 2), (2, 3), (3, 4), (0, 4)];
    let result = compile(5, &program, |_| {});
    assert_fires_program(&result, &program);
}

#[test]
fn test_verifiers_do_not_abort() {
    let program = [(0, 1), (1, 2)];
    let result = compile(4, &program, |c| c.verify = true);
    assert_eq!(count_rydbergs(&result), 2);
}

#[test]
fn test_caller_supplied_mapping_is_honored() {
    use rac_core::Site;

    let mut pipeline = RacPipeline::new(CompilerConfig::default());
    pipeline.set_architecture(4, 4, 4, 4);
    pipeline.set_program([(0, 1)], None).unwrap();
    pipeline.set_initial_mapping(vec![Site::new(1, 2), Site::new(3, 0)]);
    let result = pipeline.solve().unwrap();

    let init = match &result.records[0] {
        InstRecord::Init(init) => init,
        other => panic!("expected Init, got {other:?}"),
    };
    use rac_core::geometry::{X_SITE_SEP, Y_SITE_SEP};
    assert_eq!(init.slm_qubit_xys[0], (X_SITE_SEP, 2 * Y_SITE_SEP));
    assert_eq!(init.slm_qubit_xys[1], (3 * X_SITE_SEP, 0));
    assert_fires_program(&result, &[(0, 1)]);
}

#[test]
fn test_trivial_layout_compiles() {
    let program = [(0, 1), (2, 3)];
    let result = compile(4, &program, |c| {
        c.trivial_layout = true;
        c.reverse_to_initial = true;
    });
    assert_fires_program(&result, &program);
}
