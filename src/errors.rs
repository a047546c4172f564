use thiserror::Error;

use crate::validation::ValidationError;

/// Errors surfaced by the menu registry and engine.
///
/// Predicate, action and render failures never show up here: they degrade to
/// `false`, a chat message or an empty slot respectively.
#[derive(Debug, Error)]
pub enum MenuError {
    /// No menu with this identifier is registered.
    #[error("menu not found: {0}")]
    NotFound(String),

    /// The definition could not be sanitized into a usable id/name/size.
    #[error("invalid menu definition {id}: {reason}")]
    InvalidDefinition { id: String, reason: String },

    /// The engine is disabled because the display assets are not available.
    #[error("menus are disabled until the display assets are ready")]
    Disabled,

    /// Wrapper around IO errors (directory listing, file reads).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON menu definition failed to parse.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML menu definition failed to parse.
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Identifier or command failed validation.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}
