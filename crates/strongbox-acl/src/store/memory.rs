//! In-memory permission store for tests and simple deployments.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use strongbox_core::PermissionId;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{GrantSnapshot, PermissionStore, UpsertOutcome};
use crate::audit::{AuditAction, AuditEvent, HistoryFilter};
use crate::error::{Error, Result};
use crate::types::{Aco, Aro, GrantKey, Permission, PrivilegeLevel};

/// In-memory permission store.
///
/// Grants live in a copy-on-write table. Writers hold the write lock for the
/// duration of one mutation and its audit event; readers only hold the read
/// lock long enough to clone the table's `Arc`.
pub struct MemoryPermissionStore {
    state: RwLock<State>,
}

#[derive(Default)]
struct State {
    grants: Arc<GrantSnapshot>,
    history: Vec<AuditEvent>,
    sequence: u64,
}

impl State {
    fn record(&mut self, permission: &Permission, action: AuditAction, actor: Option<Uuid>) {
        self.sequence += 1;
        self.history.push(AuditEvent {
            sequence: self.sequence,
            at: Utc::now(),
            permission_id: permission.id,
            key: permission.key(),
            action,
            actor,
        });
    }

    fn change_level(
        &mut self,
        key: &GrantKey,
        level: PrivilegeLevel,
        actor: Option<Uuid>,
    ) -> Option<(Permission, UpsertOutcome)> {
        let current = self.grants.get(key)?;
        if current.level == level {
            return Some((current.clone(), UpsertOutcome::Unchanged));
        }

        let existing = Arc::make_mut(&mut self.grants).get_mut(key)?;
        let previous = existing.level;
        existing.level = level;
        existing.modified = Utc::now();
        existing.modified_by = actor;
        let updated = existing.clone();
        self.record(
            &updated,
            AuditAction::LevelChanged {
                from: previous,
                to: level,
            },
            actor,
        );
        Some((updated, UpsertOutcome::Updated { previous }))
    }

    fn cascade(
        &mut self,
        matches: impl Fn(&GrantKey) -> bool,
        actor: Option<Uuid>,
    ) -> Vec<Permission> {
        if !self.grants.any_key(&matches) {
            return Vec::new();
        }
        let removed = Arc::make_mut(&mut self.grants).remove_where(matches);
        for permission in &removed {
            self.record(
                permission,
                AuditAction::Cascaded {
                    level: permission.level,
                },
                actor,
            );
        }
        removed
    }
}

impl MemoryPermissionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
        }
    }

    /// Number of live grants.
    pub async fn len(&self) -> usize {
        self.state.read().await.grants.len()
    }

    /// Whether the store holds no grants.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryPermissionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PermissionStore for MemoryPermissionStore {
    async fn upsert(
        &self,
        key: GrantKey,
        level: PrivilegeLevel,
        new_id: PermissionId,
        actor: Option<Uuid>,
    ) -> Result<(Permission, UpsertOutcome)> {
        let mut state = self.state.write().await;
        if let Some(outcome) = state.change_level(&key, level, actor) {
            return Ok(outcome);
        }
        if let Some(existing) = state.grants.key_of(&new_id) {
            return Err(Error::DuplicateId {
                id: new_id,
                existing,
            });
        }

        let now = Utc::now();
        let permission = Permission {
            id: new_id,
            aco: key.aco,
            aro: key.aro,
            level,
            created: now,
            modified: now,
            created_by: actor,
            modified_by: actor,
        };
        Arc::make_mut(&mut state.grants).insert(permission.clone());
        state.record(&permission, AuditAction::Created { level }, actor);
        Ok((permission, UpsertOutcome::Created))
    }

    async fn remove(&self, key: GrantKey, actor: Option<Uuid>) -> Result<Option<Permission>> {
        let mut state = self.state.write().await;
        if state.grants.get(&key).is_none() {
            return Ok(None);
        }
        let removed = Arc::make_mut(&mut state.grants).remove(&key);
        if let Some(permission) = &removed {
            state.record(
                permission,
                AuditAction::Revoked {
                    level: permission.level,
                },
                actor,
            );
        }
        Ok(removed)
    }

    async fn remove_all_for_acos(
        &self,
        acos: &[Aco],
        actor: Option<Uuid>,
    ) -> Result<Vec<Permission>> {
        let mut state = self.state.write().await;
        Ok(state.cascade(|key| acos.contains(&key.aco), actor))
    }

    async fn remove_all_for_aro(&self, aro: Aro, actor: Option<Uuid>) -> Result<Vec<Permission>> {
        let mut state = self.state.write().await;
        Ok(state.cascade(|key| key.aro == aro, actor))
    }

    async fn set_level(
        &self,
        id: PermissionId,
        level: PrivilegeLevel,
        actor: Option<Uuid>,
    ) -> Result<(Permission, UpsertOutcome)> {
        let mut state = self.state.write().await;
        let key = state.grants.key_of(&id).ok_or(Error::NotFound { id })?;
        state
            .change_level(&key, level, actor)
            .ok_or(Error::NotFound { id })
    }

    async fn get(&self, id: PermissionId) -> Result<Option<Permission>> {
        Ok(self.state.read().await.grants.get_by_id(&id).cloned())
    }

    async fn find(&self, key: GrantKey) -> Result<Option<Permission>> {
        Ok(self.state.read().await.grants.get(&key).cloned())
    }

    async fn list_for_aco(&self, aco: Aco) -> Result<Vec<Permission>> {
        Ok(self.snapshot().await?.for_aco(&aco))
    }

    async fn list_for_aro(&self, aro: Aro) -> Result<Vec<Permission>> {
        Ok(self.snapshot().await?.for_aro(&aro))
    }

    async fn snapshot(&self) -> Result<Arc<GrantSnapshot>> {
        Ok(Arc::clone(&self.state.read().await.grants))
    }

    async fn history(&self, filter: HistoryFilter) -> Result<Vec<AuditEvent>> {
        let state = self.state.read().await;
        Ok(state
            .history
            .iter()
            .filter(|event| filter.matches(event))
            .cloned()
            .collect())
    }
}
