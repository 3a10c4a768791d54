//! Shared simulated-annealing schedule.
//!
//! Both placers use the same cooling scheme: a 100-move burn-in fixes the
//! initial temperature from the mean uphill delta, each epoch runs 400
//! moves, and cooling is divided by an extra factor for the first few
//! epochs.

use rand::rngs::StdRng;
use rand::Rng;

const T_DEFAULT: f64 = 100_000.0;
const T1_DEFAULT: f64 = 4.0;
const T_FROZEN: f64 = 1e-6;
const P_UPHILL: f64 = 0.987;
const MOVES_PER_EPOCH: usize = 400;
const EARLY_EPOCHS: usize = 7;
const EARLY_DIVISOR: f64 = 100.0;
const EPOCH_CAP: usize = 10_000;
const BURN_IN_MOVES: usize = 100;

/// Temperature state of one annealing run.
#[derive(Debug)]
pub(crate) struct Annealer {
    t: f64,
    t1: f64,
    epoch: usize,
    delta_sum: f64,
    delta_cnt: usize,
}

impl Annealer {
    pub fn new() -> Self {
        Self {
            t: T_DEFAULT,
            t1: T1_DEFAULT,
            epoch: 0,
            delta_sum: 0.0,
            delta_cnt: 0,
        }
    }

    pub fn burn_in_moves(&self) -> usize {
        BURN_IN_MOVES
    }

    pub fn moves_per_epoch(&self) -> usize {
        MOVES_PER_EPOCH
    }

    /// Sets `T1 = (mean uphill delta) / -ln(p0)` from the burn-in. With no
    /// uphill move observed the default is kept.
    pub fn set_initial_temperature(&mut self, uphill_sum: f64, uphill_cnt: usize) {
        if uphill_cnt > 0 {
            self.t1 = (uphill_sum / uphill_cnt as f64) / -P_UPHILL.ln();
        }
        self.t = self.t1;
    }

    pub fn begin_epoch(&mut self) {
        self.epoch += 1;
        self.delta_sum = 0.0;
        self.delta_cnt = 0;
    }

    /// Records a proposed move's cost delta.
    pub fn record(&mut self, delta: f64) {
        self.delta_cnt += 1;
        self.delta_sum += delta.abs();
    }

    /// Metropolis acceptance for an uphill move.
    pub fn accepts_uphill(&self, delta: f64, rng: &mut StdRng) -> bool {
        rng.gen::<f64>() <= (-delta / self.t).exp()
    }

    pub fn end_epoch(&mut self) {
        let avg = self.delta_sum / self.delta_cnt as f64;
        self.t = if self.epoch <= EARLY_EPOCHS {
            self.t1 * avg / self.epoch as f64 / EARLY_DIVISOR
        } else {
            self.t1 * avg / self.epoch as f64
        };
    }

    pub fn frozen(&self) -> bool {
        self.t <= T_FROZEN
    }

    pub fn over_epoch_cap(&self) -> bool {
        self.epoch > EPOCH_CAP
    }
}
