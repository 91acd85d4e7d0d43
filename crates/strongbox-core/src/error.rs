//! Error types for strongbox-core

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias for strongbox-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in strongbox-core
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Configuration is missing, malformed, or names something unknown.
    #[error("Configuration error: {message}")]
    Config {
        /// What configuration is problematic
        message: String,
    },

    /// I/O error tied to a specific file.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// File the operation was working on
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// TOML deserialization error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Creates a new configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Wraps an I/O error with the path it happened on.
    pub fn io_with_path(source: std::io::Error, path: impl AsRef<Path>) -> Self {
        Error::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = Error::config("unknown ACO kind 'Tag'");
        assert_eq!(
            err.to_string(),
            "Configuration error: unknown ACO kind 'Tag'"
        );
    }

    #[test]
    fn test_io_error_keeps_path() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = Error::io_with_path(io, "/etc/strongbox/acl.toml");
        let msg = err.to_string();
        assert!(msg.contains("/etc/strongbox/acl.toml"));
        assert!(msg.contains("missing"));
    }

    #[test]
    fn test_toml_error_converts() {
        let parse_err = toml::from_str::<toml::Table>("= nope").unwrap_err();
        let err: Error = parse_err.into();
        assert!(matches!(err, Error::Toml(_)));
    }

    #[test]
    fn test_error_implements_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
