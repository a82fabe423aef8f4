//! Error types for quote evaluation
//!
//! Every failure carries a stable tag (see [`QuoteError::code`]) so that
//! the persistence and transport layers can surface it without parsing
//! messages.

use crate::models::ResourceKind;
use std::fmt;
use thiserror::Error;

/// Kind of entity a name failed to resolve to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Usage,
    Budget,
    Optimizer,
    Location,
    Term,
    Type,
    Price,
    Resource,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Usage => "usage",
            EntityKind::Budget => "budget",
            EntityKind::Optimizer => "optimizer",
            EntityKind::Location => "location",
            EntityKind::Term => "term",
            EntityKind::Type => "type",
            EntityKind::Price => "price",
            EntityKind::Resource => "resource",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by the lookup engine, the budget leveler and their collaborators
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QuoteError {
    /// No catalog offer matched, even after the wide pass
    #[error("no catalog offer matches {kind} '{key}'")]
    NoMatch { kind: ResourceKind, key: String },

    /// A referenced name does not resolve in the active catalog or quote
    #[error("{entity} '{name}' not found")]
    NotFound { entity: EntityKind, name: String },

    /// Inconsistent quantities or an OS/engine mismatch with a pinned price
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// Malformed utilization profile
    #[error("invalid workload '{input}': {reason}")]
    InvalidWorkload { input: String, reason: String },

    /// The catalog repository failed to answer a query
    #[error("catalog query failed: {0}")]
    Catalog(String),

    /// The quote store failed to persist or read a resource
    #[error("quote store failure: {0}")]
    Store(String),

    /// A background lookup task panicked or was cancelled
    #[error("lookup task failed: {0}")]
    Task(String),
}

impl QuoteError {
    pub fn no_match(kind: ResourceKind, key: impl Into<String>) -> Self {
        Self::NoMatch {
            kind,
            key: key.into(),
        }
    }

    pub fn not_found(entity: EntityKind, name: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            name: name.into(),
        }
    }

    /// Stable validation tag, e.g. `no-match-instance` or `not-found-usage`
    pub fn code(&self) -> String {
        match self {
            QuoteError::NoMatch { kind, .. } => format!("no-match-{}", kind),
            QuoteError::NotFound { entity, .. } => format!("not-found-{}", entity),
            QuoteError::ConstraintViolation(_) => "constraint-violation".to_string(),
            QuoteError::InvalidWorkload { .. } => "invalid-workload".to_string(),
            QuoteError::Catalog(_) => "catalog-failure".to_string(),
            QuoteError::Store(_) => "store-failure".to_string(),
            QuoteError::Task(_) => "task-failure".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, QuoteError>;
