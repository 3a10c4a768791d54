//! Mutable array state threaded through instruction construction.
//!
//! Cols, rows and atoms carry real coordinates in whole micrometers; the
//! site grid and AOD landing offsets keep every legal position integral,
//! so coincidence checks are exact comparisons.

use serde::{Serialize, Serializer};

/// Atoms park off-grid below/left of the chip until `Init` pins them.
const X_OFF_GRID: i64 = -(2 * rac_core::geometry::AOD_SEP) - 1;
const Y_OFF_GRID: i64 = -(4 * rac_core::geometry::AOD_SEP) - 1;

/// Which trap system currently holds an atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapArray {
    /// Static trap
    Slm,
    /// Movable lattice intersection
    Aod,
}

/// One atom.
#[derive(Debug, Clone)]
pub struct AtomState {
    pub id: usize,
    pub array: TrapArray,
    /// AOD column index while (about to be) carried
    pub col: Option<usize>,
    /// AOD row index while (about to be) carried
    pub row: Option<usize>,
    pub x: i64,
    pub y: i64,
}

/// One steerable AOD column.
#[derive(Debug, Clone)]
pub struct ColTrack {
    pub id: usize,
    pub active: bool,
    pub x: i64,
}

/// One steerable AOD row.
#[derive(Debug, Clone)]
pub struct RowTrack {
    pub id: usize,
    pub active: bool,
    pub y: i64,
}

/// The complete movable-lattice state, owned by one code generation run.
///
/// `record_state` decides whether instructions snapshot the state into
/// their emitted records ("full" mode).
#[derive(Debug, Clone)]
pub struct ArrayState {
    pub cols: Vec<ColTrack>,
    pub rows: Vec<RowTrack>,
    pub atoms: Vec<AtomState>,
    pub record_state: bool,
}

impl ArrayState {
    pub fn new(n_qubits: usize, n_cols: usize, n_rows: usize, record_state: bool) -> Self {
        Self {
            cols: (0..n_cols)
                .map(|id| ColTrack {
                    id,
                    active: false,
                    x: X_OFF_GRID,
                })
                .collect(),
            rows: (0..n_rows)
                .map(|id| RowTrack {
                    id,
                    active: false,
                    y: Y_OFF_GRID,
                })
                .collect(),
            atoms: (0..n_qubits)
                .map(|id| AtomState {
                    id,
                    array: TrapArray::Slm,
                    col: None,
                    row: None,
                    x: X_OFF_GRID,
                    y: Y_OFF_GRID,
                })
                .collect(),
            record_state,
        }
    }

    /// A structural copy of the current state, or `None` in compact mode.
    pub fn snapshot(&self) -> Option<Snapshot> {
        if !self.record_state {
            return None;
        }
        Some(Snapshot {
            qubits: self
                .atoms
                .iter()
                .map(|a| QubitSnap {
                    id: a.id,
                    x: a.x,
                    y: a.y,
                    array: match a.array {
                        TrapArray::Slm => "SLM",
                        TrapArray::Aod => "AOD",
                    },
                    c: a.col.map_or(-1, |c| c as i64),
                    r: a.row.map_or(-1, |r| r as i64),
                })
                .collect(),
            cols: self
                .cols
                .iter()
                .map(|c| ColSnap {
                    id: c.id,
                    active: c.active,
                    x: c.x,
                })
                .collect(),
            rows: self
                .rows
                .iter()
                .map(|r| RowSnap {
                    id: r.id,
                    active: r.active,
                    y: r.y,
                })
                .collect(),
        })
    }
}

/// Per-instruction state snapshot, attached in full-code mode for the
/// animation consumers.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub qubits: Vec<QubitSnap>,
    pub cols: Vec<ColSnap>,
    pub rows: Vec<RowSnap>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QubitSnap {
    pub id: usize,
    pub x: i64,
    pub y: i64,
    pub array: &'static str,
    pub c: i64,
    pub r: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColSnap {
    pub id: usize,
    pub active: bool,
    pub x: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RowSnap {
    pub id: usize,
    pub active: bool,
    pub y: i64,
}

/// Serializes an elided snapshot as `{}` so compact and full streams keep
/// the same shape.
pub(crate) fn state_or_empty<S: Serializer>(
    state: &Option<Snapshot>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match state {
        Some(snap) => snap.serialize(serializer),
        None => serde_json::Map::new().serialize(serializer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_state_is_parked() {
        let st = ArrayState::new(2, 3, 3, false);
        assert_eq!(st.atoms.len(), 2);
        assert!(st.cols.iter().all(|c| !c.active));
        assert!(st.atoms.iter().all(|a| a.x < 0 && a.y < 0));
        assert!(st.snapshot().is_none());
    }

    #[test]
    fn test_snapshot_in_full_mode() {
        let st = ArrayState::new(1, 1, 1, true);
        let snap = st.snapshot().unwrap();
        assert_eq!(snap.qubits.len(), 1);
        assert_eq!(snap.qubits[0].array, "SLM");
        assert_eq!(snap.qubits[0].c, -1);
    }
}
