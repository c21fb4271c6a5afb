//! Store errors.

use crate::shapes::EntityId;
use thiserror::Error;

/// Precondition violations reported by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unknown entity: {0}")]
    UnknownEntity(EntityId),
    #[error("Id already in use: {0}")]
    DuplicateId(EntityId),
    #[error("Grouping needs at least two selected items, found {0}")]
    NotEnoughSelected(usize),
    #[error("Cannot group a selection that contains group {0}")]
    CannotNestGroups(EntityId),
    #[error("Multi-selection overlay has no bounding box")]
    OverlayUnavailable,
    #[error("No drag in progress")]
    NotDragging,
    #[error("No rendered position for {0}")]
    PositionUnavailable(EntityId),
    #[error("Non-finite position for {id}: ({x}, {y})")]
    InvalidPosition { id: EntityId, x: f64, y: f64 },
    #[error("Invalid step value: {0}")]
    InvalidDelta(f64),
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
