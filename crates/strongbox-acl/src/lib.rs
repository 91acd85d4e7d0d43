//! Strongbox ACL: the access-control engine.
//!
//! Decides what each user may do with each secret. Grants attach a
//! [`PrivilegeLevel`] to an (object, requestor) pair, where the object is a
//! resource or a category and the requestor is a user or a group. A user's
//! effective level on an object is the highest level granted to them or to
//! any of their groups, on the object or on any category it inherits from.
//!
//! # Modules
//!
//! - [`types`]: Levels, object and requestor references, and grants
//! - [`registry`]: Kind whitelists and input validation
//! - [`store`]: Permission storage and snapshots
//! - [`directory`]: Collaborator traits for existence, categories, and groups
//! - [`hierarchy`]: Category ancestor and descendant walks
//! - [`membership`]: Transitive group membership
//! - [`resolver`]: Effective privilege computation
//! - [`access`]: The [`AccessControl`] facade
//! - [`audit`]: History of grant mutations
//! - [`error`]: Error types and Result alias
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use strongbox_acl::{AccessControl, Aco, Aro, MemoryDirectory, PrivilegeLevel};
//! use strongbox_core::AclConfig;
//! use uuid::Uuid;
//!
//! # tokio_test_block(async {
//! let dir = Arc::new(MemoryDirectory::new());
//! let (user, secret) = (Uuid::new_v4(), Uuid::new_v4());
//! dir.add_user(user);
//! dir.add_resource(secret, []);
//!
//! let acl = AccessControl::in_memory(AclConfig::default(), dir).unwrap();
//! acl.grant(Aco::Resource(secret), Aro::User(user), PrivilegeLevel::Update)
//!     .await
//!     .unwrap();
//! assert!(acl
//!     .is_allowed_to(user, Aco::Resource(secret), PrivilegeLevel::Read)
//!     .await
//!     .unwrap());
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

pub mod access;
pub mod audit;
pub mod directory;
pub mod error;
pub mod hierarchy;
pub mod membership;
pub mod registry;
pub mod resolver;
pub mod store;
pub mod types;

/// Log target for corrupted collaborator data, such as cyclic hierarchies.
pub const INTEGRITY_LOG_TARGET: &str = "strongbox_acl::integrity";

// Re-export key types at crate root for convenience
pub use access::AccessControl;
pub use audit::{AuditAction, AuditEvent, HistoryFilter};
pub use directory::{CategoryTree, Directory, ExistenceCheck, GroupDirectory, MemoryDirectory};
pub use error::{Error, Graph, Result};
pub use hierarchy::{HierarchyResolver, InheritedScope};
pub use membership::MembershipResolver;
pub use registry::{KindRegistry, ParsedRequest, PermissionRequest};
pub use resolver::{Capabilities, Decision, PrivilegeResolver};
pub use store::{GrantSnapshot, MemoryPermissionStore, PermissionStore, UpsertOutcome};
pub use types::{
    Aco, AcoKind, Aro, AroKind, Contain, GrantKey, Permission, PermissionTypeInfo,
    PermissionView, PrivilegeLevel, Scope,
};
