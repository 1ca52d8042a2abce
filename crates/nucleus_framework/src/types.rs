//! # Core Type Definitions
//!
//! This module contains the fundamental types shared by the region tracker,
//! the command pipeline and the jail service.
//!
//! ## Key Types
//!
//! - [`PlayerId`] - Unique identifier for a player session
//! - [`WorldId`] - Name of a host world
//! - [`Position`] - 3D position with double precision
//! - [`Location`] - A position bound to a world
//! - [`RegionBounds`] - Axis-aligned cuboid used by regions
//!
//! ## Design Principles
//!
//! - **Type Safety**: Wrapper types prevent ID confusion (PlayerId vs RegionId)
//! - **Precision**: Double-precision floats for accurate large-world positioning
//! - **Serialization**: All types support serde so they can live in config files

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a player.
///
/// This is a wrapper around UUID that provides type safety and ensures
/// player IDs cannot be confused with other types of IDs in the system.
///
/// # Examples
///
/// ```rust
/// use nucleus_framework::PlayerId;
///
/// let player_id = PlayerId::new();
/// let parsed: PlayerId = "550e8400-e29b-41d4-a716-446655440000".parse()?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    /// Creates a new random player ID using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::str::FromStr for PlayerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a registered region.
///
/// Two handles refer to the same region exactly when their ids are equal,
/// which is what the tracker uses for cache membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionId(pub Uuid);

impl RegionId {
    /// Creates a new random region ID using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RegionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of a world hosted by the server.
///
/// World names are compared case-sensitively, the same way the host does.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorldId(pub String);

impl WorldId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for WorldId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Spatial Types
// ============================================================================

/// Represents a 3D position in a world.
///
/// # Examples
///
/// ```rust
/// use nucleus_framework::Position;
///
/// let spawn_point = Position::new(0.0, 64.0, 0.0);
/// assert_eq!(spawn_point.block_x(), 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate (east-west axis)
    pub x: f64,
    /// Y coordinate (vertical axis)
    pub y: f64,
    /// Z coordinate (north-south axis)
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Calculates the Euclidean distance to another position.
    pub fn distance(&self, other: Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn block_x(&self) -> i64 {
        self.x.floor() as i64
    }

    pub fn block_y(&self) -> i64 {
        self.y.floor() as i64
    }

    pub fn block_z(&self) -> i64 {
        self.z.floor() as i64
    }

    pub(crate) fn as_point(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

/// A position inside a specific world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub world: WorldId,
    pub position: Position,
}

impl Location {
    pub fn new(world: impl Into<WorldId>, x: f64, y: f64, z: f64) -> Self {
        Self {
            world: world.into(),
            position: Position::new(x, y, z),
        }
    }

    /// Chunk column coordinates (16x16) containing this location.
    pub fn chunk(&self) -> (i64, i64) {
        (
            self.position.block_x().div_euclid(16),
            self.position.block_z().div_euclid(16),
        )
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:.1}, {:.1}, {:.1})",
            self.world, self.position.x, self.position.y, self.position.z
        )
    }
}

/// Axis-aligned cuboid boundaries of a region.
///
/// Bounds are inclusive on both ends. Constructing bounds from two arbitrary
/// corners normalizes them so that every `min_*` is at most its `max_*`.
///
/// # Examples
///
/// ```rust
/// use nucleus_framework::{Position, RegionBounds};
///
/// let bounds = RegionBounds::from_corners(Position::new(10.0, 0.0, 10.0), Position::new(-10.0, 64.0, -10.0));
/// assert!(bounds.contains(&Position::new(0.0, 32.0, 0.0)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionBounds {
    /// Minimum X coordinate (western boundary)
    pub min_x: f64,
    /// Maximum X coordinate (eastern boundary)
    pub max_x: f64,
    /// Minimum Y coordinate (bottom boundary)
    pub min_y: f64,
    /// Maximum Y coordinate (top boundary)
    pub max_y: f64,
    /// Minimum Z coordinate (northern boundary)
    pub min_z: f64,
    /// Maximum Z coordinate (southern boundary)
    pub max_z: f64,
}

impl RegionBounds {
    pub fn from_corners(a: Position, b: Position) -> Self {
        Self {
            min_x: a.x.min(b.x),
            max_x: a.x.max(b.x),
            min_y: a.y.min(b.y),
            max_y: a.y.max(b.y),
            min_z: a.z.min(b.z),
            max_z: a.z.max(b.z),
        }
    }

    pub fn contains(&self, position: &Position) -> bool {
        position.x >= self.min_x
            && position.x <= self.max_x
            && position.y >= self.min_y
            && position.y <= self.max_y
            && position.z >= self.min_z
            && position.z <= self.max_z
    }

    pub fn min(&self) -> [f64; 3] {
        [self.min_x, self.min_y, self.min_z]
    }

    pub fn max(&self) -> [f64; 3] {
        [self.max_x, self.max_y, self.max_z]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_normalized_from_corners() {
        let bounds = RegionBounds::from_corners(
            Position::new(5.0, 70.0, -3.0),
            Position::new(-5.0, 60.0, 3.0),
        );
        assert_eq!(bounds.min(), [-5.0, 60.0, -3.0]);
        assert_eq!(bounds.max(), [5.0, 70.0, 3.0]);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let bounds = RegionBounds::from_corners(Position::new(0.0, 0.0, 0.0), Position::new(10.0, 10.0, 10.0));
        assert!(bounds.contains(&Position::new(10.0, 10.0, 10.0)));
        assert!(bounds.contains(&Position::new(0.0, 0.0, 0.0)));
        assert!(!bounds.contains(&Position::new(10.01, 5.0, 5.0)));
    }

    #[test]
    fn test_chunk_of_negative_location() {
        let location = Location::new("world", -1.0, 64.0, 17.0);
        assert_eq!(location.chunk(), (-1, 1));
    }

    #[test]
    fn test_player_id_round_trips_through_display() {
        let id = PlayerId::new();
        let parsed: PlayerId = id.to_string().parse().expect("valid uuid");
        assert_eq!(id, parsed);
    }
}
