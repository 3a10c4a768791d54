//! Diagnostic verifiers for scheduling and placement output.
//!
//! These report through `tracing` and never abort compilation; a non-zero
//! return is a signal for the operator, not a control-flow decision.

use rac_core::prelude::*;
use tracing::{error, info};

/// Checks that a schedule partitions the program and that no layer uses a
/// qubit twice. Returns the number of findings.
pub fn verify_scheduling(n_qubits: usize, gates: &[Gate], schedule: &[Vec<usize>]) -> usize {
    let mut findings = 0;
    let mut scheduled_at = vec![None; gates.len()];
    for (stage, layer) in schedule.iter().enumerate() {
        let mut qubit_gate = vec![None; n_qubits];
        for &g in layer {
            if let Some(prev) = scheduled_at[g] {
                findings += 1;
                error!(
                    "gate {g} is already scheduled in stage {prev}, \
                     but is assigned to stage {stage} again"
                );
            }
            scheduled_at[g] = Some(stage);
            for q in gates[g].qubits() {
                if let Some(other) = qubit_gate[q] {
                    findings += 1;
                    error!(
                        "qubit {q} is already used by gate {other}, but gate {g} \
                         uses it in the same stage {stage}"
                    );
                }
                qubit_gate[q] = Some(g);
            }
        }
    }
    for (g, stage) in scheduled_at.iter().enumerate() {
        if stage.is_none() {
            findings += 1;
            error!("gate {g} is not scheduled");
        }
    }
    if findings == 0 {
        info!("gate scheduling verification: pass");
    }
    findings
}

/// Checks that a mapping stays on the chip and assigns one site per qubit.
/// Returns the number of findings.
pub fn verify_mapping(chip: &ChipGeometry, n_qubits: usize, mapping: &[Site]) -> usize {
    let mut findings = 0;
    let mut occupant = vec![vec![None; chip.ny]; chip.nx];
    for (q, site) in mapping.iter().enumerate() {
        if !chip.contains(site.x, site.y) {
            findings += 1;
            error!(
                "qubit {q} is mapped outside the chip at ({}, {})",
                site.x, site.y
            );
            continue;
        }
        if let Some(other) = occupant[site.x][site.y] {
            findings += 1;
            error!(
                "qubit {q} overlaps qubit {other} at ({}, {})",
                site.x, site.y
            );
        }
        occupant[site.x][site.y] = Some(q);
    }
    if mapping.len() != n_qubits {
        findings += 1;
        error!(
            "not all qubits are mapped: {} sites for {} qubits",
            mapping.len(),
            n_qubits
        );
    }
    if findings == 0 {
        info!("qubit placement verification: pass");
    }
    findings
}
