//! Error types for the typeahead core.

use thiserror::Error;

/// Errors raised by configuration, entity construction and snapshots.
///
/// Configuration variants are fatal at registration time. Provider failures
/// are not represented here; they degrade to empty results (see
/// [`ProviderError`]).
#[derive(Debug, Error)]
pub enum TypeaheadError {
    #[error("duplicate typeahead type `{0}`: each config type must be unique")]
    DuplicateType(String),

    #[error("typeahead config is missing required field `{field}`")]
    MissingField { field: &'static str },

    #[error("typeahead config `{type_name}` has maxResults = 0")]
    InvalidMaxResults { type_name: String },

    #[error("typeahead entity display text must not be empty")]
    EmptyDisplayText,

    #[error("failed to build trigger pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("snapshot has node type `{0}`, expected `typeahead`")]
    UnexpectedNodeType(String),

    #[error("snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("document rejected the edit: {0}")]
    Document(String),

    #[error("no typeahead config registered for type `{0}`")]
    UnknownType(String),

    #[error("no typeahead config at index {index} ({len} registered)")]
    ConfigIndexOutOfRange { index: usize, len: usize },

    #[error("no typeahead session is active")]
    NoActiveSession,

    #[error("typeahead menu has no highlighted option")]
    NoOptionHighlighted,
}

/// Failure reported by a search provider for one query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("search provider failed: {0}")]
pub struct ProviderError(pub String);

pub type Result<T> = std::result::Result<T, TypeaheadError>;
