//! Error types for the match simulation.

use thiserror::Error;

use crate::map::TilePos;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all match simulation errors.
///
/// None of these are fatal: every command that fails leaves the match
/// state exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// Invalid entity reference.
    #[error("Entity not found: {0}")]
    EntityNotFound(u64),

    /// Invalid resource deposit reference.
    #[error("Resource deposit not found: {0}")]
    DepositNotFound(u32),

    /// No route exists between two tiles for the requesting mover.
    #[error("No path from ({}, {}) to ({}, {})", from.x, from.y, to.x, to.y)]
    NoPath {
        /// Tile the search started from.
        from: TilePos,
        /// Requested destination.
        to: TilePos,
    },

    /// Insufficient resources.
    #[error("Insufficient resources: need {required} {resource}, have {available}")]
    InsufficientResources {
        /// Resource type.
        resource: String,
        /// Amount required.
        required: u32,
        /// Amount available.
        available: u32,
    },

    /// Production queue is at capacity.
    #[error("Production queue is full")]
    QueueFull,

    /// A structure could not be placed on the requested tiles.
    #[error("Placement rejected: {0}")]
    PlacementRejected(String),

    /// Order cannot be carried out by this entity.
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    /// Match configuration is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration text failed to parse.
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),
}
