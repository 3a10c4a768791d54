//! Programs: ordered sequences of two-qubit gates.

use super::Gate;
use crate::error::{RacError, Result};
use serde::{Deserialize, Serialize};

/// An ordered list of two-qubit gates over `num_qubits` qubits.
///
/// Qubit indices are assumed consecutive from zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    /// Number of qubits
    pub num_qubits: usize,
    /// Gate sequence
    pub gates: Vec<Gate>,
}

impl Program {
    /// Creates an empty program over a fixed number of qubits.
    pub fn new(num_qubits: usize) -> Self {
        Self {
            num_qubits,
            gates: Vec::new(),
        }
    }

    /// Builds a program from raw qubit pairs.
    ///
    /// When `num_qubits` is `None` it is inferred as one past the largest
    /// index mentioned. When given, every index must be in range.
    pub fn from_pairs(
        pairs: impl IntoIterator<Item = (usize, usize)>,
        num_qubits: Option<usize>,
    ) -> Result<Self> {
        let mut gates = Vec::new();
        let mut max_q = 0usize;
        for (a, b) in pairs {
            let gate = Gate::new(a, b)?;
            max_q = max_q.max(gate.q1);
            gates.push(gate);
        }
        let inferred = if gates.is_empty() { 0 } else { max_q + 1 };
        let num_qubits = match num_qubits {
            Some(n) => {
                if inferred > n {
                    return Err(RacError::InvalidQubit(max_q, n));
                }
                n
            }
            None => inferred,
        };
        Ok(Self { num_qubits, gates })
    }

    /// Appends a gate, validating its qubit indices.
    pub fn push(&mut self, gate: Gate) -> Result<()> {
        if gate.q1 >= self.num_qubits {
            return Err(RacError::InvalidQubit(gate.q1, self.num_qubits));
        }
        self.gates.push(gate);
        Ok(())
    }

    /// Number of gates in the program.
    pub fn len(&self) -> usize {
        self.gates.len()
    }

    /// Whether the program has no gates.
    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }
}
