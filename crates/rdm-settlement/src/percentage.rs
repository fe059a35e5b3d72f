// percentage.rs — Clamped completion percentage in basis points.
//
// The external evaluator reports completion as a float in [0, 100]. We
// clamp it once and keep it as an integer number of basis points so every
// threshold check and token split below is exact integer arithmetic.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Tolerance, in basis points, for float error when flooring.
const FLOAT_SLACK: f64 = 1e-6;

/// A completion percentage in the closed range [0, 100], stored as basis
/// points (1% = 100 bp).
///
/// Serialized as the raw basis-point integer. Deserializing a value above
/// 10 000 fails rather than silently clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Percentage(u32);

impl Percentage {
    /// Basis points per whole percent.
    pub const SCALE: u32 = 100;

    /// 0%.
    pub const ZERO: Percentage = Percentage(0);

    /// 100%.
    pub const FULL: Percentage = Percentage(100 * Self::SCALE);

    /// Clamp a reported float into [0, 100] and floor it to a whole basis
    /// point, so a value just under a threshold never lands on it.
    ///
    /// Returns `None` for NaN, which has no meaningful position on the scale.
    pub fn from_reported(value: f64) -> Option<Self> {
        if value.is_nan() {
            return None;
        }
        let clamped = value.clamp(0.0, 100.0);
        // Absorbs binary representation error (59.99 * 100 is 5998.999...).
        let scaled = clamped * f64::from(Self::SCALE) + FLOAT_SLACK;
        Some(Self((scaled.floor() as u32).min(Self::FULL.0)))
    }

    /// Build from a whole percentage, clamping anything above 100.
    pub fn from_whole(percent: u32) -> Self {
        Self(percent.min(100) * Self::SCALE)
    }

    pub fn basis_points(self) -> u32 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.0) / f64::from(Self::SCALE)
    }

    /// True if this percentage is at or above `percent` whole percent.
    pub fn at_least(self, percent: u8) -> bool {
        self.0 >= u32::from(percent) * Self::SCALE
    }

    /// The complementary share, `100% - self`.
    pub fn complement(self) -> Self {
        Self(Self::FULL.0 - self.0)
    }
}

impl TryFrom<u32> for Percentage {
    type Error = String;

    fn try_from(basis_points: u32) -> Result<Self, Self::Error> {
        if basis_points > Self::FULL.0 {
            return Err(format!(
                "percentage out of range: {} basis points (max {})",
                basis_points,
                Self::FULL.0
            ));
        }
        Ok(Self(basis_points))
    }
}

impl From<Percentage> for u32 {
    fn from(p: Percentage) -> u32 {
        p.0
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / Self::SCALE;
        let frac = self.0 % Self::SCALE;
        if frac == 0 {
            write!(f, "{}%", whole)
        } else {
            write!(f, "{}.{:02}%", whole, frac)
        }
    }
}
