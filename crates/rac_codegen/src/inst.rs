//! Hardware instructions.
//!
//! Each instruction is constructed against the mutable `ArrayState`:
//! construction verifies every geometric precondition, applies the
//! operation to the state, then captures the emitted record (plus a
//! snapshot in full mode). `ComboInst` groups instructions recursively
//! and supports removing trivial (zero-duration) children before
//! emission.

use crate::state::{state_or_empty, ArrayState, Snapshot, TrapArray};
use rac_core::geometry::{move_duration, AOD_SEP, R_B, T_ACTIVATE, T_INIT, T_RYDBERG};
use rac_core::prelude::*;
use serde::Serialize;
use tracing::warn;

/// A planned track move: a column (or row) travels `begin -> end`.
#[derive(Debug, Clone, Copy)]
pub struct TrackShift {
    pub id: usize,
    pub begin: i64,
    pub end: i64,
}

/// A track position for activation or deactivation.
#[derive(Debug, Clone, Copy)]
pub struct TrackPos {
    pub id: usize,
    pub pos: i64,
}

/// Emitted record of a non-trivial track move.
#[derive(Debug, Clone, Serialize)]
pub struct ShiftRec {
    pub id: usize,
    pub shift: i64,
    pub begin: i64,
    pub end: i64,
}

/// A serializable instruction record. The `type` tag distinguishes the
/// variants in the emitted JSON stream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum InstRecord {
    Init(InitInst),
    Move(MoveInst),
    Activate(ActivateInst),
    Deactivate(DeactivateInst),
    Rydberg(RydbergInst),
}

impl InstRecord {
    pub fn name(&self) -> &str {
        match self {
            Self::Init(i) => &i.name,
            Self::Move(i) => &i.name,
            Self::Activate(i) => &i.name,
            Self::Deactivate(i) => &i.name,
            Self::Rydberg(i) => &i.name,
        }
    }

    pub fn duration(&self) -> f64 {
        match self {
            Self::Init(i) => i.duration,
            Self::Move(i) => i.duration,
            Self::Activate(i) => i.duration,
            Self::Deactivate(i) => i.duration,
            Self::Rydberg(i) => i.duration,
        }
    }

    /// Drops the attached snapshot, turning a full record into a compact
    /// one.
    pub fn strip_state(&mut self) {
        match self {
            Self::Init(i) => i.state = None,
            Self::Move(i) => i.state = None,
            Self::Activate(i) => i.state = None,
            Self::Deactivate(i) => i.state = None,
            Self::Rydberg(i) => i.state = None,
        }
    }
}

/// The very first instruction: pins every atom to a static trap.
#[derive(Debug, Clone, Serialize)]
pub struct InitInst {
    pub name: String,
    pub duration: f64,
    pub n_q: usize,
    pub x_high: usize,
    pub y_high: usize,
    pub c_high: usize,
    pub r_high: usize,
    pub slm_qubit_idx: Vec<usize>,
    pub slm_qubit_xys: Vec<(i64, i64)>,
    /// Every static trap touched over the whole program
    pub all_slms: Vec<(i64, i64)>,
    #[serde(serialize_with = "state_or_empty")]
    pub state: Option<Snapshot>,
}

impl InitInst {
    /// `atoms` lists `(qubit, x, y)` static-trap targets for every qubit.
    pub fn new(
        st: &mut ArrayState,
        atoms: &[(usize, i64, i64)],
        dims: (usize, usize, usize, usize),
    ) -> Result<Self> {
        // verify: no two atoms may share a static trap
        for i in 0..atoms.len() {
            for j in i + 1..atoms.len() {
                if (atoms[i].1, atoms[i].2) == (atoms[j].1, atoms[j].2) {
                    return Err(RacError::geometry(format!(
                        "Init: SLM qubits {} and {} share trap ({}, {})",
                        atoms[i].0, atoms[j].0, atoms[i].1, atoms[i].2
                    )));
                }
            }
        }

        // operate
        let mut all_slms = Vec::with_capacity(atoms.len());
        for &(q, x, y) in atoms {
            st.atoms[q].array = TrapArray::Slm;
            st.atoms[q].x = x;
            st.atoms[q].y = y;
            all_slms.push((x, y));
        }

        Ok(Self {
            name: "Init".to_string(),
            duration: T_INIT,
            n_q: st.atoms.len(),
            x_high: dims.0,
            y_high: dims.1,
            c_high: dims.2,
            r_high: dims.3,
            slm_qubit_idx: atoms.iter().map(|&(q, _, _)| q).collect(),
            slm_qubit_xys: atoms.iter().map(|&(_, x, y)| (x, y)).collect(),
            all_slms,
            state: st.snapshot(),
        })
    }

    /// Accumulates further static traps touched later in the program.
    pub fn add_slms(&mut self, slms: impl IntoIterator<Item = (i64, i64)>) {
        for slm in slms {
            if !self.all_slms.contains(&slm) {
                self.all_slms.push(slm);
            }
        }
    }
}

/// A simultaneous translation of active columns and rows.
#[derive(Debug, Clone, Serialize)]
pub struct MoveInst {
    pub name: String,
    pub cols: Vec<ShiftRec>,
    pub rows: Vec<ShiftRec>,
    pub duration: f64,
    #[serde(serialize_with = "state_or_empty")]
    pub state: Option<Snapshot>,
}

impl MoveInst {
    pub fn new(
        st: &mut ArrayState,
        name: String,
        col_moves: &[TrackShift],
        row_moves: &[TrackShift],
    ) -> Result<Self> {
        Self::verify(st, &name, col_moves, row_moves)?;

        // operate
        let mut cols = Vec::new();
        let mut rows = Vec::new();
        let mut max_distance = 0i64;
        for m in col_moves {
            let distance = (m.end - m.begin).abs();
            if distance > 0 {
                cols.push(ShiftRec {
                    id: m.id,
                    shift: m.end - m.begin,
                    begin: m.begin,
                    end: m.end,
                });
                st.cols[m.id].x = m.end;
                max_distance = max_distance.max(distance);
            }
        }
        for m in row_moves {
            let distance = (m.end - m.begin).abs();
            if distance > 0 {
                rows.push(ShiftRec {
                    id: m.id,
                    shift: m.end - m.begin,
                    begin: m.begin,
                    end: m.end,
                });
                st.rows[m.id].y = m.end;
                max_distance = max_distance.max(distance);
            }
        }

        // carried atoms follow their intersection
        for i in 0..st.atoms.len() {
            if st.atoms[i].array == TrapArray::Aod {
                let (c, r) = match (st.atoms[i].col, st.atoms[i].row) {
                    (Some(c), Some(r)) => (c, r),
                    _ => {
                        return Err(RacError::geometry(format!(
                            "{name}: carried atom {i} has no lattice index"
                        )))
                    }
                };
                st.atoms[i].x = st.cols[c].x;
                st.atoms[i].y = st.rows[r].y;
            }
        }

        Ok(Self {
            name,
            cols,
            rows,
            duration: move_duration(max_distance),
            state: st.snapshot(),
        })
    }

    fn verify(
        st: &ArrayState,
        name: &str,
        col_moves: &[TrackShift],
        row_moves: &[TrackShift],
    ) -> Result<()> {
        // columns: begin positions must match the live state, and strict
        // ordering with AOD_SEP gaps must hold before and after
        let mut active_idx = Vec::new();
        let mut active_xs: Vec<i64> = Vec::new();
        for col in &st.cols {
            if col.active {
                if let Some(&last) = active_xs.last() {
                    if col.x < last + AOD_SEP {
                        return Err(RacError::geometry(format!(
                            "{name}: col beginning position invalid, col {} at x={} while \
                             col {} at x={last}",
                            col.id,
                            col.x,
                            active_idx.last().copied().unwrap_or(0),
                        )));
                    }
                }
                active_idx.push(col.id);
                active_xs.push(col.x);
            }
        }
        for m in col_moves {
            let j = active_idx
                .iter()
                .position(|&id| id == m.id)
                .ok_or_else(|| {
                    RacError::geometry(format!("{name}: col {} to move is not activated", m.id))
                })?;
            if m.begin != active_xs[j] {
                return Err(RacError::geometry(format!(
                    "{name}: col {} beginning x does not agree, {} given but {} actual",
                    m.id, m.begin, active_xs[j]
                )));
            }
            active_xs[j] = m.end;
        }
        for i in 1..active_xs.len() {
            if active_xs[i - 1] + AOD_SEP > active_xs[i] {
                return Err(RacError::geometry(format!(
                    "{name}: col ending position invalid, col {} at x={} while col {} at x={}",
                    active_idx[i - 1],
                    active_xs[i - 1],
                    active_idx[i],
                    active_xs[i]
                )));
            }
        }

        // rows, symmetrically
        let mut active_idx = Vec::new();
        let mut active_ys: Vec<i64> = Vec::new();
        for row in &st.rows {
            if row.active {
                if let Some(&last) = active_ys.last() {
                    if row.y < last + AOD_SEP {
                        return Err(RacError::geometry(format!(
                            "{name}: row beginning position invalid, row {} at y={} while \
                             row {} at y={last}",
                            row.id,
                            row.y,
                            active_idx.last().copied().unwrap_or(0),
                        )));
                    }
                }
                active_idx.push(row.id);
                active_ys.push(row.y);
            }
        }
        for m in row_moves {
            let j = active_idx
                .iter()
                .position(|&id| id == m.id)
                .ok_or_else(|| {
                    RacError::geometry(format!("{name}: row {} to move is not activated", m.id))
                })?;
            if m.begin != active_ys[j] {
                return Err(RacError::geometry(format!(
                    "{name}: row {} beginning y does not agree, {} given but {} actual",
                    m.id, m.begin, active_ys[j]
                )));
            }
            active_ys[j] = m.end;
        }
        for i in 1..active_ys.len() {
            if active_ys[i - 1] + AOD_SEP > active_ys[i] {
                return Err(RacError::geometry(format!(
                    "{name}: row ending position invalid, row {} at y={} while row {} at y={}",
                    active_idx[i - 1],
                    active_ys[i - 1],
                    active_idx[i],
                    active_ys[i]
                )));
            }
        }
        Ok(())
    }
}

/// Activates columns and rows; atoms at fresh intersections are picked up.
#[derive(Debug, Clone, Serialize)]
pub struct ActivateInst {
    pub name: String,
    pub col_idx: Vec<usize>,
    pub col_xs: Vec<i64>,
    pub row_idx: Vec<usize>,
    pub row_ys: Vec<i64>,
    pub pickup_qs: Vec<usize>,
    pub duration: f64,
    #[serde(serialize_with = "state_or_empty")]
    pub state: Option<Snapshot>,
}

impl ActivateInst {
    pub fn new(
        st: &mut ArrayState,
        name: String,
        cols: &[TrackPos],
        rows: &[TrackPos],
        pickup_qs: &[usize],
    ) -> Result<Self> {
        Self::verify(st, &name, cols, rows, pickup_qs)?;

        // operate
        for p in cols {
            st.cols[p.id].active = true;
            st.cols[p.id].x = p.pos;
        }
        for p in rows {
            st.rows[p.id].active = true;
            st.rows[p.id].y = p.pos;
        }
        for &q in pickup_qs {
            st.atoms[q].array = TrapArray::Aod;
        }

        Ok(Self {
            name,
            col_idx: cols.iter().map(|p| p.id).collect(),
            col_xs: cols.iter().map(|p| p.pos).collect(),
            row_idx: rows.iter().map(|p| p.id).collect(),
            row_ys: rows.iter().map(|p| p.pos).collect(),
            pickup_qs: pickup_qs.to_vec(),
            duration: T_ACTIVATE,
            state: st.snapshot(),
        })
    }

    fn verify(
        st: &ArrayState,
        name: &str,
        cols: &[TrackPos],
        rows: &[TrackPos],
        pickup_qs: &[usize],
    ) -> Result<()> {
        for p in cols {
            if st.cols[p.id].active {
                return Err(RacError::geometry(format!(
                    "{name}: col {} already activated",
                    p.id
                )));
            }
            for j in 0..p.id {
                if st.cols[j].active && st.cols[j].x > p.pos - AOD_SEP {
                    return Err(RacError::geometry(format!(
                        "{name}: col {j} at x={} is too far right for col {} to activate at x={}",
                        st.cols[j].x, p.id, p.pos
                    )));
                }
            }
            for j in p.id + 1..st.cols.len() {
                if st.cols[j].active && st.cols[j].x - AOD_SEP < p.pos {
                    return Err(RacError::geometry(format!(
                        "{name}: col {j} at x={} is too far left for col {} to activate at x={}",
                        st.cols[j].x, p.id, p.pos
                    )));
                }
            }
        }
        for p in rows {
            if st.rows[p.id].active {
                return Err(RacError::geometry(format!(
                    "{name}: row {} already activated",
                    p.id
                )));
            }
            for j in 0..p.id {
                if st.rows[j].active && st.rows[j].y > p.pos - AOD_SEP {
                    return Err(RacError::geometry(format!(
                        "{name}: row {j} at y={} is too low for row {} to activate at y={}",
                        st.rows[j].y, p.id, p.pos
                    )));
                }
            }
            for j in p.id + 1..st.rows.len() {
                if st.rows[j].active && st.rows[j].y - AOD_SEP < p.pos {
                    return Err(RacError::geometry(format!(
                        "{name}: row {j} at y={} is too high for row {} to activate at y={}",
                        st.rows[j].y, p.id, p.pos
                    )));
                }
            }
        }

        // trap intersections created by this activation
        let active_xs: Vec<i64> = st.cols.iter().filter(|c| c.active).map(|c| c.x).collect();
        let active_ys: Vec<i64> = st.rows.iter().filter(|r| r.active).map(|r| r.y).collect();
        let mut fresh_xys = Vec::new();
        for &x in &active_xs {
            for r in rows {
                fresh_xys.push((x, r.pos));
            }
        }
        for &y in &active_ys {
            for c in cols {
                fresh_xys.push((c.pos, y));
            }
        }
        for c in cols {
            for r in rows {
                fresh_xys.push((c.pos, r.pos));
            }
        }

        for (q, atom) in st.atoms.iter().enumerate() {
            let at_fresh_trap = fresh_xys.contains(&(atom.x, atom.y));
            if pickup_qs.contains(&q) {
                if !at_fresh_trap {
                    return Err(RacError::geometry(format!(
                        "{name}: q {q} not picked up by col {:?} row {:?} at x={} y={}",
                        atom.col, atom.row, atom.x, atom.y
                    )));
                }
            } else if at_fresh_trap {
                return Err(RacError::geometry(format!(
                    "{name}: q {q} wrongfully picked up by col {:?} row {:?} at x={} y={}",
                    atom.col, atom.row, atom.x, atom.y
                )));
            }
        }
        Ok(())
    }
}

/// Deactivates columns and rows; atoms at vanishing intersections drop
/// into static traps.
#[derive(Debug, Clone, Serialize)]
pub struct DeactivateInst {
    pub name: String,
    pub col_idx: Vec<usize>,
    pub col_xs: Vec<i64>,
    pub row_idx: Vec<usize>,
    pub row_ys: Vec<i64>,
    pub dropoff_qs: Vec<usize>,
    pub duration: f64,
    #[serde(serialize_with = "state_or_empty")]
    pub state: Option<Snapshot>,
}

impl DeactivateInst {
    pub fn new(
        st: &mut ArrayState,
        name: String,
        cols: &[TrackPos],
        rows: &[TrackPos],
        dropoff_qs: &[usize],
    ) -> Result<Self> {
        Self::verify(st, &name, cols, rows, dropoff_qs)?;

        // operate
        for p in cols {
            st.cols[p.id].active = false;
        }
        for p in rows {
            st.rows[p.id].active = false;
        }
        for &q in dropoff_qs {
            st.atoms[q].array = TrapArray::Slm;
        }

        Ok(Self {
            name,
            col_idx: cols.iter().map(|p| p.id).collect(),
            col_xs: cols.iter().map(|p| p.pos).collect(),
            row_idx: rows.iter().map(|p| p.id).collect(),
            row_ys: rows.iter().map(|p| p.pos).collect(),
            dropoff_qs: dropoff_qs.to_vec(),
            duration: T_ACTIVATE,
            state: st.snapshot(),
        })
    }

    fn verify(
        st: &ArrayState,
        name: &str,
        cols: &[TrackPos],
        rows: &[TrackPos],
        dropoff_qs: &[usize],
    ) -> Result<()> {
        for p in cols {
            if !st.cols[p.id].active {
                return Err(RacError::geometry(format!(
                    "{name}: col {} already deactivated",
                    p.id
                )));
            }
            for j in 0..p.id {
                if st.cols[j].active && st.cols[j].x > p.pos - AOD_SEP {
                    return Err(RacError::geometry(format!(
                        "{name}: col {j} at x={} is too far right for col {} to deactivate at x={}",
                        st.cols[j].x, p.id, p.pos
                    )));
                }
            }
            for j in p.id + 1..st.cols.len() {
                if st.cols[j].active && st.cols[j].x - AOD_SEP < p.pos {
                    return Err(RacError::geometry(format!(
                        "{name}: col {j} at x={} is too far left for col {} to deactivate at x={}",
                        st.cols[j].x, p.id, p.pos
                    )));
                }
            }
        }
        for p in rows {
            if !st.rows[p.id].active {
                return Err(RacError::geometry(format!(
                    "{name}: row {} already deactivated",
                    p.id
                )));
            }
            for j in 0..p.id {
                if st.rows[j].active && st.rows[j].y > p.pos - AOD_SEP {
                    return Err(RacError::geometry(format!(
                        "{name}: row {j} at y={} is too low for row {} to deactivate at y={}",
                        st.rows[j].y, p.id, p.pos
                    )));
                }
            }
            for j in p.id + 1..st.rows.len() {
                if st.rows[j].active && st.rows[j].y - AOD_SEP < p.pos {
                    return Err(RacError::geometry(format!(
                        "{name}: row {j} at y={} is too high for row {} to deactivate at y={}",
                        st.rows[j].y, p.id, p.pos
                    )));
                }
            }
        }

        // intersections that disappear with the deactivated rows
        let active_xs: Vec<i64> = st.cols.iter().filter(|c| c.active).map(|c| c.x).collect();
        let mut vanishing_xys = Vec::new();
        for &x in &active_xs {
            for r in rows {
                vanishing_xys.push((x, r.pos));
            }
        }

        for (q, atom) in st.atoms.iter().enumerate() {
            let at_vanishing_trap = vanishing_xys.contains(&(atom.x, atom.y));
            if dropoff_qs.contains(&q) {
                if !at_vanishing_trap {
                    return Err(RacError::geometry(format!(
                        "{name}: q {q} not dropped off from col {:?} row {:?} at x={} y={}",
                        atom.col, atom.row, atom.x, atom.y
                    )));
                }
            } else if atom.array == TrapArray::Aod && at_vanishing_trap {
                return Err(RacError::geometry(format!(
                    "{name}: q {q} wrongfully dropped off from col {:?} row {:?} at x={} y={}",
                    atom.col, atom.row, atom.x, atom.y
                )));
            }
        }
        Ok(())
    }
}

/// The global entangling pulse: fires every gate whose atoms sit within
/// Rydberg range.
#[derive(Debug, Clone, Serialize)]
pub struct RydbergInst {
    pub name: String,
    pub gates: Vec<GateRef>,
    pub duration: f64,
    #[serde(serialize_with = "state_or_empty")]
    pub state: Option<Snapshot>,
}

impl RydbergInst {
    pub fn new(st: &mut ArrayState, stage: usize, gates: Vec<GateRef>) -> Result<Self> {
        let name = format!("Rydberg_{stage}:Rydberg");
        // the router guarantees co-location; a stretched pair is worth a
        // diagnostic but the pulse fires regardless
        for g in &gates {
            let (a, b) = (&st.atoms[g.q0], &st.atoms[g.q1]);
            let d2 = (a.x - b.x).pow(2) + (a.y - b.y).pow(2);
            if d2 > R_B * R_B {
                warn!(
                    "{name}: q {} at ({}, {}) and q {} at ({}, {}) are outside Rydberg range",
                    g.q0, a.x, a.y, g.q1, b.x, b.y
                );
            }
        }
        Ok(Self {
            name,
            gates,
            duration: T_RYDBERG,
            state: st.snapshot(),
        })
    }
}

/// An instruction tree node.
#[derive(Debug, Clone)]
pub enum Inst {
    Init(InitInst),
    Move(MoveInst),
    Activate(ActivateInst),
    Deactivate(DeactivateInst),
    Rydberg(RydbergInst),
    Combo(ComboInst),
}

impl Inst {
    /// Trivial instructions take no time and can be elided.
    pub fn is_trivial(&self) -> bool {
        match self {
            Self::Init(i) => i.duration == 0.0,
            Self::Move(i) => i.duration == 0.0,
            Self::Activate(i) => i.duration == 0.0,
            Self::Deactivate(i) => i.duration == 0.0,
            Self::Rydberg(i) => i.duration == 0.0,
            Self::Combo(c) => c.is_trivial(),
        }
    }

    /// Recursively removes trivial children.
    pub fn remove_trivial(&mut self) {
        if let Self::Combo(c) = self {
            c.remove_trivial();
        }
    }

    /// Appends this subtree's records, in order, to `out`.
    pub fn emit(&self, out: &mut Vec<InstRecord>) {
        match self {
            Self::Init(i) => out.push(InstRecord::Init(i.clone())),
            Self::Move(i) => out.push(InstRecord::Move(i.clone())),
            Self::Activate(i) => out.push(InstRecord::Activate(i.clone())),
            Self::Deactivate(i) => out.push(InstRecord::Deactivate(i.clone())),
            Self::Rydberg(i) => out.push(InstRecord::Rydberg(i.clone())),
            Self::Combo(c) => {
                for inst in &c.insts {
                    inst.emit(out);
                }
            }
        }
    }
}

/// A named ordered group of instructions (or further groups).
#[derive(Debug, Clone)]
pub struct ComboInst {
    pub name: String,
    pub insts: Vec<Inst>,
}

impl ComboInst {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            insts: Vec::new(),
        }
    }

    pub fn push(&mut self, inst: Inst) {
        self.insts.push(inst);
    }

    pub fn prepend(&mut self, inst: Inst) {
        self.insts.insert(0, inst);
    }

    pub fn is_trivial(&self) -> bool {
        self.insts.iter().all(Inst::is_trivial)
    }

    pub fn remove_trivial(&mut self) {
        for inst in &mut self.insts {
            inst.remove_trivial();
        }
        self.insts.retain(|inst| !inst.is_trivial());
    }

    /// Flattens the tree into the ordered record stream.
    pub fn emit(&self) -> Vec<InstRecord> {
        let mut out = Vec::new();
        for inst in &self.insts {
            inst.emit(&mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ArrayState {
        ArrayState::new(2, 4, 4, false)
    }

    fn init_two_atoms(st: &mut ArrayState) -> InitInst {
        InitInst::new(st, &[(0, 0, 0), (1, 19, 0)], (4, 4, 4, 4)).unwrap()
    }

    #[test]
    fn test_init_rejects_shared_trap() {
        let mut st = state();
        let err = InitInst::new(&mut st, &[(0, 0, 0), (1, 0, 0)], (4, 4, 4, 4));
        assert!(matches!(err, Err(RacError::Geometry(_))));
    }

    #[test]
    fn test_init_pins_atoms() {
        let mut st = state();
        let init = init_two_atoms(&mut st);
        assert_eq!(st.atoms[1].x, 19);
        assert_eq!(init.all_slms.len(), 2);
    }

    #[test]
    fn test_add_slms_deduplicates() {
        let mut st = state();
        let mut init = init_two_atoms(&mut st);
        init.add_slms([(0, 0), (5, 5)]);
        assert_eq!(init.all_slms.len(), 3);
    }

    #[test]
    fn test_activate_picks_up_atom() {
        let mut st = state();
        init_two_atoms(&mut st);
        st.atoms[0].col = Some(0);
        st.atoms[0].row = Some(0);
        let act = ActivateInst::new(
            &mut st,
            "Activate".to_string(),
            &[TrackPos { id: 0, pos: 0 }],
            &[TrackPos { id: 0, pos: 0 }],
            &[0],
        )
        .unwrap();
        assert_eq!(act.duration, T_ACTIVATE);
        assert!(st.cols[0].active);
        assert_eq!(st.atoms[0].array, TrapArray::Aod);
    }

    #[test]
    fn test_activate_requires_pickup_coincidence() {
        let mut st = state();
        init_two_atoms(&mut st);
        // claiming to pick up q0 at an intersection it does not sit on
        let err = ActivateInst::new(
            &mut st,
            "Activate".to_string(),
            &[TrackPos { id: 0, pos: 5 }],
            &[TrackPos { id: 0, pos: 0 }],
            &[0],
        );
        assert!(matches!(err, Err(RacError::Geometry(_))));
    }

    #[test]
    fn test_activate_rejects_accidental_pickup() {
        let mut st = state();
        init_two_atoms(&mut st);
        // a fresh intersection lands on q1, which is not being picked up
        let err = ActivateInst::new(
            &mut st,
            "Activate".to_string(),
            &[TrackPos { id: 0, pos: 19 }],
            &[TrackPos { id: 0, pos: 0 }],
            &[],
        );
        assert!(matches!(err, Err(RacError::Geometry(_))));
    }

    #[test]
    fn test_move_keeps_track_order() {
        let mut st = state();
        init_two_atoms(&mut st);
        st.atoms[0].col = Some(0);
        st.atoms[0].row = Some(0);
        ActivateInst::new(
            &mut st,
            "Activate".to_string(),
            &[TrackPos { id: 0, pos: 0 }, TrackPos { id: 1, pos: 4 }],
            &[TrackPos { id: 0, pos: 0 }],
            &[0],
        )
        .unwrap();

        // crossing col 1 over col 0 must be rejected
        let err = MoveInst::new(
            &mut st,
            "Move".to_string(),
            &[TrackShift {
                id: 1,
                begin: 4,
                end: -1,
            }],
            &[],
        );
        assert!(matches!(err, Err(RacError::Geometry(_))));

        // a parallel shift is fine, and the carried atom follows
        let mv = MoveInst::new(
            &mut st,
            "Move".to_string(),
            &[
                TrackShift {
                    id: 0,
                    begin: 0,
                    end: 10,
                },
                TrackShift {
                    id: 1,
                    begin: 4,
                    end: 14,
                },
            ],
            &[],
        )
        .unwrap();
        assert!(mv.duration > 0.0);
        assert_eq!(st.atoms[0].x, 10);
    }

    #[test]
    fn test_move_begin_must_agree() {
        let mut st = state();
        init_two_atoms(&mut st);
        ActivateInst::new(
            &mut st,
            "Activate".to_string(),
            &[TrackPos { id: 0, pos: 2 }],
            &[],
            &[],
        )
        .unwrap();
        let err = MoveInst::new(
            &mut st,
            "Move".to_string(),
            &[TrackShift {
                id: 0,
                begin: 7,
                end: 9,
            }],
            &[],
        );
        assert!(matches!(err, Err(RacError::Geometry(_))));
    }

    #[test]
    fn test_zero_length_move_is_trivial() {
        let mut st = state();
        init_two_atoms(&mut st);
        let mv = MoveInst::new(&mut st, "Move".to_string(), &[], &[]).unwrap();
        assert_eq!(mv.duration, 0.0);
        assert!(Inst::Move(mv).is_trivial());
    }

    #[test]
    fn test_deactivate_drops_atom() {
        let mut st = state();
        init_two_atoms(&mut st);
        st.atoms[0].col = Some(0);
        st.atoms[0].row = Some(0);
        ActivateInst::new(
            &mut st,
            "Activate".to_string(),
            &[TrackPos { id: 0, pos: 0 }],
            &[TrackPos { id: 0, pos: 0 }],
            &[0],
        )
        .unwrap();
        DeactivateInst::new(
            &mut st,
            "Deactivate".to_string(),
            &[],
            &[TrackPos { id: 0, pos: 0 }],
            &[0],
        )
        .unwrap();
        assert_eq!(st.atoms[0].array, TrapArray::Slm);
        assert!(!st.rows[0].active);
    }

    #[test]
    fn test_combo_trivial_elision_is_recursive() {
        let mut st = state();
        init_two_atoms(&mut st);
        let trivial = MoveInst::new(&mut st, "Move".to_string(), &[], &[]).unwrap();

        let mut inner = ComboInst::new("inner");
        inner.push(Inst::Move(trivial.clone()));
        let mut outer = ComboInst::new("outer");
        outer.push(Inst::Combo(inner));
        outer.push(Inst::Move(trivial));

        assert!(outer.is_trivial());
        outer.remove_trivial();
        assert!(outer.insts.is_empty());
        assert!(outer.emit().is_empty());
    }
}
