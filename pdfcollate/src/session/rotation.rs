//! Page rotation in quarter turns.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PdfCollateError, Result};

/// Clockwise page rotation, always one of 0, 90, 180 or 270 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Rotation(u16);

impl Rotation {
    /// No rotation.
    pub const NONE: Self = Self(0);

    /// Build a rotation from any multiple of 90 degrees, negative values included.
    ///
    /// # Errors
    ///
    /// Returns [`PdfCollateError::InvalidRotation`] when `degrees` is not a
    /// multiple of 90.
    pub fn from_degrees(degrees: i32) -> Result<Self> {
        if degrees % 90 != 0 {
            return Err(PdfCollateError::InvalidRotation { degrees });
        }
        Ok(Self(degrees.rem_euclid(360) as u16))
    }

    /// Rotation in degrees, in `[0, 360)`.
    pub fn degrees(self) -> u16 {
        self.0
    }

    /// Apply a further `delta` degrees, wrapping into `[0, 360)`.
    ///
    /// # Errors
    ///
    /// Returns [`PdfCollateError::InvalidRotation`] when `delta` is not a
    /// multiple of 90.
    pub fn rotated_by(self, delta: i32) -> Result<Self> {
        let delta = Self::from_degrees(delta)?;
        Ok(self.combine(delta))
    }

    /// Sum of two rotations.
    pub fn combine(self, other: Self) -> Self {
        Self((self.0 + other.0) % 360)
    }

    /// Whether the page's width and height swap under this rotation.
    pub fn is_quarter_turn(self) -> bool {
        self.0 == 90 || self.0 == 270
    }

    /// Whether this is the identity rotation.
    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl TryFrom<i32> for Rotation {
    type Error = PdfCollateError;

    fn try_from(degrees: i32) -> Result<Self> {
        Self::from_degrees(degrees)
    }
}

impl From<Rotation> for i32 {
    fn from(rotation: Rotation) -> Self {
        i32::from(rotation.0)
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.0)
    }
}
