//! Strongbox Core: shared types, errors, identifiers, and configuration.
//!
//! This crate provides the foundational pieces used by the access-control
//! engine. It has no internal Strongbox dependencies (dependency level 0).
//!
//! # Modules
//!
//! - [`error`]: Error types and Result alias
//! - [`ids`]: Permission identifiers and identifier-generation strategies
//! - [`config`]: Kind whitelists and engine configuration

pub mod config;
pub mod error;
pub mod ids;

// Re-export key types at crate root for convenience
pub use config::{AclConfig, RegistryConfig};
pub use error::{Error, Result};
pub use ids::{IdStrategy, PermissionId};
