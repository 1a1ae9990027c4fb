//! Fixed-point math utilities for deterministic simulation.
//!
//! Unit positions and speeds are fixed-point so that a match replayed with
//! the same commands lands on bit-identical state on every platform.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

use crate::map::TilePos;

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Fixed-point 2D vector in tile units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Centre point of a tile.
    #[must_use]
    pub fn tile_center(tile: TilePos) -> Self {
        let half = Fixed::from_num(1) / Fixed::from_num(2);
        Self::new(
            Fixed::from_num(tile.x) + half,
            Fixed::from_num(tile.y) + half,
        )
    }

    /// Tile containing this point, or `None` for negative coordinates.
    #[must_use]
    pub fn to_tile(self) -> Option<TilePos> {
        if self.x < Fixed::ZERO || self.y < Fixed::ZERO {
            return None;
        }
        Some(TilePos::new(
            self.x.floor().to_num::<u32>(),
            self.y.floor().to_num::<u32>(),
        ))
    }

    /// Calculate squared distance (avoids sqrt for comparisons).
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Step toward `target` by at most `max_step` along each axis.
    ///
    /// Movement on the grid is axis-aligned between tile centres, so a
    /// per-axis clamp is an exact straight-line step for 4-way paths and a
    /// Chebyshev step for diagonals.
    #[must_use]
    pub fn step_toward(self, target: Self, max_step: Fixed) -> Self {
        Self::new(
            approach(self.x, target.x, max_step),
            approach(self.y, target.y, max_step),
        )
    }
}

fn approach(from: Fixed, to: Fixed, max_step: Fixed) -> Fixed {
    if to > from {
        (from + max_step).min(to)
    } else {
        (from - max_step).max(to)
    }
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_center_round_trips_to_tile() {
        let tile = TilePos::new(7, 3);
        let center = Vec2Fixed::tile_center(tile);
        assert_eq!(center.x, Fixed::from_num(7.5));
        assert_eq!(center.to_tile(), Some(tile));
    }

    #[test]
    fn negative_point_has_no_tile() {
        let p = Vec2Fixed::new(Fixed::from_num(-1), Fixed::from_num(2));
        assert_eq!(p.to_tile(), None);
    }

    #[test]
    fn step_toward_clamps_at_target() {
        let from = Vec2Fixed::new(Fixed::from_num(0), Fixed::from_num(0));
        let to = Vec2Fixed::new(Fixed::from_num(1), Fixed::from_num(0));

        let half = Fixed::from_num(1) / Fixed::from_num(2);
        let mid = from.step_toward(to, half);
        assert_eq!(mid.x, half);
        assert_eq!(mid.y, Fixed::ZERO);

        let done = mid.step_toward(to, Fixed::from_num(3));
        assert_eq!(done, to);
    }

    #[test]
    fn step_toward_moves_backwards() {
        let from = Vec2Fixed::new(Fixed::from_num(4), Fixed::from_num(4));
        let to = Vec2Fixed::new(Fixed::from_num(4), Fixed::from_num(2));
        let next = from.step_toward(to, Fixed::from_num(1));
        assert_eq!(next.y, Fixed::from_num(3));
    }
}
