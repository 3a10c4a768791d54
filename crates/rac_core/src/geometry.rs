//! Chip geometry and physical constants of the trap array.
//!
//! All lengths are in micrometers, all durations in microseconds.

use serde::{Deserialize, Serialize};

/// Rydberg interaction range.
pub const R_B: i64 = 6;
/// Minimum separation between two active AOD lines.
pub const AOD_SEP: i64 = 2;
/// Distance sufficient to suppress unwanted Rydberg interaction.
pub const RYD_SEP: i64 = 15;
/// Total width spanned by the static traps of a site.
pub const SITE_WIDTH: i64 = 4;
/// Horizontal separation between neighboring sites.
pub const X_SITE_SEP: i64 = RYD_SEP + SITE_WIDTH;
/// Vertical separation between neighboring sites.
pub const Y_SITE_SEP: i64 = RYD_SEP;

/// Duration of a Rydberg pulse.
pub const T_RYDBERG: f64 = 0.36;
/// Duration of (de)activating an AOD line.
pub const T_ACTIVATE: f64 = 15.0;
/// Duration charged to the initial load of the array.
pub const T_INIT: f64 = 24.0;

/// Duration of an AOD move over `distance` micrometers, per the
/// heating-limited ramp model of Bluvstein et al.
pub fn move_duration(distance: i64) -> f64 {
    200.0 * ((distance as f64) / 110.0).sqrt()
}

/// Rectangular chip: `nx * ny` interaction sites, `nc` steerable AOD
/// columns and `nr` steerable AOD rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipGeometry {
    /// Number of site columns
    pub nx: usize,
    /// Number of site rows
    pub ny: usize,
    /// Number of AOD columns
    pub nc: usize,
    /// Number of AOD rows
    pub nr: usize,
}

impl ChipGeometry {
    /// Creates a chip geometry with the given dimensions.
    pub fn new(nx: usize, ny: usize, nc: usize, nr: usize) -> Self {
        Self { nx, ny, nc, nr }
    }

    /// Creates a square chip where every dimension equals `n`.
    pub fn square(n: usize) -> Self {
        Self::new(n, n, n, n)
    }

    /// Total number of interaction sites.
    pub fn sites(&self) -> usize {
        self.nx * self.ny
    }

    /// Whether a site coordinate lies on the chip.
    pub fn contains(&self, x: usize, y: usize) -> bool {
        x < self.nx && y < self.ny
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_separations() {
        assert_eq!(X_SITE_SEP, 19);
        assert_eq!(Y_SITE_SEP, 15);
        assert!(SITE_WIDTH < R_B, "atoms in one site must interact");
    }

    #[test]
    fn test_move_duration() {
        assert_eq!(move_duration(0), 0.0);
        assert!((move_duration(110) - 200.0).abs() < 1e-12);
        assert!(move_duration(19) < move_duration(38));
    }

    #[test]
    fn test_square_chip() {
        let chip = ChipGeometry::square(16);
        assert_eq!(chip.sites(), 256);
        assert!(chip.contains(15, 15));
        assert!(!chip.contains(16, 0));
    }
}
