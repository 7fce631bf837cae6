//! Error types for loading and session operations.
//!
//! The per-tick engine never fails: degenerate geometry and dangling
//! references are skipped for that tick. Only configuration loading and the
//! host-facing [`crate::lab::Lab`] operations report errors.

use thiserror::Error;

use crate::types::{ItemId, ItemType};

/// Error loading equipment defaults.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("catalog entry not found: {0}")]
    NotFound(String),
}

/// Error loading or validating a [`crate::config::LabConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("configuration validation failed: {0}")]
    Invalid(String),
}

/// Error from a scene-editing operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LabError {
    #[error("no item with id {0}")]
    UnknownItem(ItemId),

    #[error("item {id} is a {actual:?}, expected {expected:?}")]
    WrongKind {
        id: ItemId,
        expected: ItemType,
        actual: ItemType,
    },

    #[error("item {id} is a {actual:?}, which has no mass to set")]
    Massless { id: ItemId, actual: ItemType },

    #[error("item {id} has no attach point {point:?}")]
    UnknownAttachPoint { id: ItemId, point: String },

    #[error("item {0} is still in the tray")]
    InTray(ItemId),
}
