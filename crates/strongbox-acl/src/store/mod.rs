//! Permission storage.
//!
//! The [`PermissionStore`] trait is the transactional boundary of the
//! engine: every method is one atomic unit, and [`PermissionStore::snapshot`]
//! hands out an immutable view that the resolver reads for the whole of a
//! single decision.
//!
//! # Backends
//!
//! - [`MemoryPermissionStore`]: copy-on-write table behind a `tokio` lock

mod memory;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use strongbox_core::PermissionId;
use uuid::Uuid;

use crate::audit::{AuditEvent, HistoryFilter};
use crate::error::Result;
use crate::types::{Aco, Aro, GrantKey, Permission, PrivilegeLevel};

pub use memory::MemoryPermissionStore;

/// What an upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No grant existed for the key; one was created.
    Created,
    /// The existing grant's level changed.
    Updated {
        /// Level before the change.
        previous: PrivilegeLevel,
    },
    /// The existing grant already had the requested level.
    Unchanged,
}

/// Abstract permission storage.
///
/// Implementations must keep `(aco, aro)` unique: an upsert for a key that
/// already has a grant changes that grant in place. Each method runs as a
/// single atomic unit with respect to every other method.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Create or update the grant for `key`.
    ///
    /// `new_id` is used only when a grant is created.
    async fn upsert(
        &self,
        key: GrantKey,
        level: PrivilegeLevel,
        new_id: PermissionId,
        actor: Option<Uuid>,
    ) -> Result<(Permission, UpsertOutcome)>;

    /// Remove the grant for `key`, returning it if it existed.
    async fn remove(&self, key: GrantKey, actor: Option<Uuid>) -> Result<Option<Permission>>;

    /// Remove every grant on any of `acos`, as one atomic unit.
    async fn remove_all_for_acos(
        &self,
        acos: &[Aco],
        actor: Option<Uuid>,
    ) -> Result<Vec<Permission>>;

    /// Remove every grant on `aco`.
    async fn remove_all_for_aco(&self, aco: Aco, actor: Option<Uuid>) -> Result<Vec<Permission>> {
        self.remove_all_for_acos(&[aco], actor).await
    }

    /// Remove every grant given to `aro`.
    async fn remove_all_for_aro(&self, aro: Aro, actor: Option<Uuid>) -> Result<Vec<Permission>>;

    /// Change the level of the grant with id `id`.
    async fn set_level(
        &self,
        id: PermissionId,
        level: PrivilegeLevel,
        actor: Option<Uuid>,
    ) -> Result<(Permission, UpsertOutcome)>;

    /// Fetch a grant by id.
    async fn get(&self, id: PermissionId) -> Result<Option<Permission>>;

    /// Fetch the grant for `key`.
    async fn find(&self, key: GrantKey) -> Result<Option<Permission>>;

    /// Grants on `aco`, oldest first.
    async fn list_for_aco(&self, aco: Aco) -> Result<Vec<Permission>>;

    /// Grants given to `aro`, oldest first.
    async fn list_for_aro(&self, aro: Aro) -> Result<Vec<Permission>>;

    /// Consistent read view of every live grant.
    async fn snapshot(&self) -> Result<Arc<GrantSnapshot>>;

    /// Recorded mutations matching `filter`, in commit order.
    async fn history(&self, filter: HistoryFilter) -> Result<Vec<AuditEvent>>;
}

// ============================================================================
// GrantSnapshot
// ============================================================================

/// Immutable set of live grants indexed by key and by id.
#[derive(Debug, Clone, Default)]
pub struct GrantSnapshot {
    by_key: HashMap<GrantKey, Permission>,
    by_id: HashMap<PermissionId, GrantKey>,
}

impl GrantSnapshot {
    /// Empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live grants.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// Whether there are no grants.
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Grant for `key`.
    pub fn get(&self, key: &GrantKey) -> Option<&Permission> {
        self.by_key.get(key)
    }

    /// Grant with id `id`.
    pub fn get_by_id(&self, id: &PermissionId) -> Option<&Permission> {
        self.by_id.get(id).and_then(|key| self.by_key.get(key))
    }

    /// Level granted for `key`, `None` when absent.
    pub fn level(&self, key: &GrantKey) -> PrivilegeLevel {
        self.get(key)
            .map(|p| p.level)
            .unwrap_or(PrivilegeLevel::None)
    }

    /// Grants on `aco`, oldest first.
    pub fn for_aco(&self, aco: &Aco) -> Vec<Permission> {
        self.collect_sorted(|p| p.aco == *aco)
    }

    /// Grants given to `aro`, oldest first.
    pub fn for_aro(&self, aro: &Aro) -> Vec<Permission> {
        self.collect_sorted(|p| p.aro == *aro)
    }

    /// Every grant, oldest first.
    pub fn all(&self) -> Vec<Permission> {
        self.collect_sorted(|_| true)
    }

    fn collect_sorted(&self, keep: impl Fn(&Permission) -> bool) -> Vec<Permission> {
        let mut out: Vec<Permission> = self.by_key.values().filter(|p| keep(p)).cloned().collect();
        out.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)));
        out
    }

    pub(crate) fn insert(&mut self, permission: Permission) {
        let key = permission.key();
        self.by_id.insert(permission.id, key);
        self.by_key.insert(key, permission);
    }

    pub(crate) fn get_mut(&mut self, key: &GrantKey) -> Option<&mut Permission> {
        self.by_key.get_mut(key)
    }

    pub(crate) fn key_of(&self, id: &PermissionId) -> Option<GrantKey> {
        self.by_id.get(id).copied()
    }

    pub(crate) fn remove(&mut self, key: &GrantKey) -> Option<Permission> {
        let removed = self.by_key.remove(key)?;
        self.by_id.remove(&removed.id);
        Some(removed)
    }

    pub(crate) fn any_key(&self, matches: impl Fn(&GrantKey) -> bool) -> bool {
        self.by_key.keys().any(matches)
    }

    pub(crate) fn remove_where(&mut self, matches: impl Fn(&GrantKey) -> bool) -> Vec<Permission> {
        let keys: Vec<GrantKey> = self.by_key.keys().filter(|k| matches(k)).copied().collect();
        let mut removed: Vec<Permission> = keys.iter().filter_map(|k| self.remove(k)).collect();
        removed.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)));
        removed
    }
}
