//! Simulation clock values.
//!
//! All clocks are integer milliseconds so that tick arithmetic is exact and identical on every
//! peer. Conversions to seconds only happen where a value feeds into float physics.

use std::ops::{Add, AddAssign, Sub};

use serde::{Deserialize, Serialize};

/// A point on the simulation clock, in milliseconds.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SimTime(pub u64);

impl SimTime {
    /// The start of the simulation.
    pub const ZERO: Self = Self(0);

    /// Creates a time from milliseconds.
    pub fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// Creates a time from seconds, rounded to the nearest millisecond. Negative values clamp
    /// to zero.
    pub fn from_secs_f32(secs: f32) -> Self {
        if secs <= 0.0 {
            Self::ZERO
        } else {
            Self((secs * 1000.0).round() as u64)
        }
    }

    /// Milliseconds since the start of the simulation.
    pub fn millis(self) -> u64 {
        self.0
    }

    /// Seconds since the start of the simulation.
    pub fn seconds(self) -> f32 {
        self.0 as f32 / 1000.0
    }

    /// Difference to an earlier time, or zero if `earlier` is actually later.
    pub fn saturating_sub(self, earlier: Self) -> Self {
        Self(self.0.saturating_sub(earlier.0))
    }

    /// Shifts the time by a (possibly fractional) number of seconds.
    pub fn add_secs(self, secs: f32) -> Self {
        Self(self.0.saturating_add(Self::from_secs_f32(secs).0))
    }
}

impl Add for SimTime {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for SimTime {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for SimTime {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.saturating_sub(rhs)
    }
}
