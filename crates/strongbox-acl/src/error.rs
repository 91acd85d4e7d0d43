//! Error types for strongbox-acl

use std::fmt;

use strongbox_core::PermissionId;
use thiserror::Error;
use uuid::Uuid;

use crate::types::{GrantKey, Scope};

/// Result type alias for strongbox-acl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Graph in which a cycle was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Graph {
    /// The category tree.
    Category,
    /// Group nesting.
    Group,
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Graph::Category => write!(f, "category"),
            Graph::Group => write!(f, "group"),
        }
    }
}

/// Errors that can occur in strongbox-acl
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Error from strongbox-core
    #[error("Core error: {0}")]
    Core(#[from] strongbox_core::Error),

    /// Kind name is not in the configured whitelist for its scope.
    #[error("{scope} kind '{kind}' is not permitted")]
    InvalidKind {
        /// Side of the grant
        scope: Scope,
        /// Offending kind name
        kind: String,
    },

    /// Level is unknown or not storable.
    #[error("The given permission type is not valid: {level}")]
    InvalidLevel {
        /// Offending level as given
        level: String,
    },

    /// Foreign key is not a well-formed UUID.
    #[error("{field} must be an uuid in correct format (got '{value}')")]
    InvalidForeignKey {
        /// Form field
        field: &'static str,
        /// Value as given
        value: String,
    },

    /// Foreign key does not resolve to a live instance.
    #[error("the {field} must be relative to an existing instance of {kind} ({id})")]
    DanglingReference {
        /// Form field
        field: &'static str,
        /// Declared model kind
        kind: &'static str,
        /// Unresolved id
        id: Uuid,
    },

    /// Category tree or group nesting loops back on itself.
    #[error("Cyclic {graph} hierarchy detected at {id}")]
    CyclicHierarchy {
        /// Which graph is corrupted
        graph: Graph,
        /// Node at which the cycle closed
        id: Uuid,
    },

    /// No permission with this id.
    #[error("Permission not found: {id}")]
    NotFound {
        /// Requested id
        id: PermissionId,
    },

    /// A new grant's id already belongs to the grant for another pair.
    #[error("Permission id {id} is already used by {existing}")]
    DuplicateId {
        /// Conflicting id
        id: PermissionId,
        /// Pair the id belongs to
        existing: GrantKey,
    },

    /// An external directory lookup failed.
    #[error("Directory error: {message}")]
    Directory {
        /// Human-readable error message
        message: String,
        /// Source error if available
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Creates an invalid-kind error.
    pub fn invalid_kind(scope: Scope, kind: impl Into<String>) -> Self {
        Error::InvalidKind {
            scope,
            kind: kind.into(),
        }
    }

    /// Creates an invalid-level error.
    pub fn invalid_level(level: impl fmt::Display) -> Self {
        Error::InvalidLevel {
            level: level.to_string(),
        }
    }

    /// Creates a directory error with a message.
    pub fn directory<S: Into<String>>(message: S) -> Self {
        Error::Directory {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a directory error with a message and source error.
    pub fn directory_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Directory {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The form field this error should be shown against, if any.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Error::InvalidKind { scope, .. } => Some(scope.kind_field()),
            Error::InvalidLevel { .. } => Some("type"),
            Error::InvalidForeignKey { field, .. } | Error::DanglingReference { field, .. } => {
                Some(*field)
            }
            _ => None,
        }
    }

    /// Whether this error rejects caller input (as opposed to a fault).
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidKind { .. }
                | Error::InvalidLevel { .. }
                | Error::InvalidForeignKey { .. }
                | Error::DanglingReference { .. }
        )
    }

    /// Whether this error signals corrupted upstream data.
    pub fn is_integrity_fault(&self) -> bool {
        matches!(self, Error::CyclicHierarchy { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_kind_field_and_display() {
        let err = Error::invalid_kind(Scope::Aro, "Role");
        assert_eq!(err.field(), Some("aro"));
        assert_eq!(err.to_string(), "ARO kind 'Role' is not permitted");
        assert!(err.is_validation());
    }

    #[test]
    fn test_invalid_level_field() {
        let err = Error::invalid_level("none");
        assert_eq!(err.field(), Some("type"));
        assert!(err.to_string().contains("none"));
    }

    #[test]
    fn test_dangling_reference_field() {
        let err = Error::DanglingReference {
            field: "aco_foreign_key",
            kind: "Resource",
            id: Uuid::nil(),
        };
        assert_eq!(err.field(), Some("aco_foreign_key"));
        assert!(err.to_string().contains("existing instance of Resource"));
        assert!(!err.is_integrity_fault());
    }

    #[test]
    fn test_cyclic_hierarchy_is_integrity_fault() {
        let err = Error::CyclicHierarchy {
            graph: Graph::Category,
            id: Uuid::nil(),
        };
        assert!(err.is_integrity_fault());
        assert!(!err.is_validation());
        assert_eq!(err.field(), None);
        assert!(err.to_string().starts_with("Cyclic category hierarchy"));
    }

    #[test]
    fn test_directory_error_with_source() {
        let io = std::io::Error::other("connection reset");
        let err = Error::directory_with_source("group lookup failed", io);
        assert!(err.to_string().contains("group lookup failed"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(Error::directory("x").field().is_none());
    }

    #[test]
    fn test_error_implements_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
