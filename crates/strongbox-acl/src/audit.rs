//! Append-only history of grant mutations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strongbox_core::PermissionId;
use uuid::Uuid;

use crate::types::{Aco, Aro, GrantKey, PrivilegeLevel};

/// What happened to a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AuditAction {
    /// A new grant was stored.
    Created {
        /// Initial level.
        level: PrivilegeLevel,
    },
    /// An existing grant's level changed.
    LevelChanged {
        /// Previous level.
        from: PrivilegeLevel,
        /// New level.
        to: PrivilegeLevel,
    },
    /// The grant was revoked explicitly.
    Revoked {
        /// Level at the time of removal.
        level: PrivilegeLevel,
    },
    /// The grant was removed because its object or requestor was destroyed.
    Cascaded {
        /// Level at the time of removal.
        level: PrivilegeLevel,
    },
}

/// One recorded mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Monotonic position in the store's history, starting at 1.
    pub sequence: u64,
    /// Commit time.
    pub at: DateTime<Utc>,
    /// Grant affected.
    pub permission_id: PermissionId,
    /// Object/requestor pair of the grant.
    pub key: GrantKey,
    /// What happened.
    #[serde(flatten)]
    pub action: AuditAction,
    /// Acting user, when the caller supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<Uuid>,
}

/// Selects events from the history. Empty filter selects everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    /// Only events for this object.
    pub aco: Option<Aco>,
    /// Only events for this requestor.
    pub aro: Option<Aro>,
    /// Only events for this grant.
    pub permission_id: Option<PermissionId>,
    /// Only events after this sequence number.
    pub after: Option<u64>,
}

impl HistoryFilter {
    /// Everything.
    pub fn all() -> Self {
        Self::default()
    }

    /// Events touching `aco`.
    pub fn for_aco(aco: Aco) -> Self {
        Self {
            aco: Some(aco),
            ..Self::default()
        }
    }

    /// Events touching `aro`.
    pub fn for_aro(aro: Aro) -> Self {
        Self {
            aro: Some(aro),
            ..Self::default()
        }
    }

    /// Events for one grant.
    pub fn for_permission(id: PermissionId) -> Self {
        Self {
            permission_id: Some(id),
            ..Self::default()
        }
    }

    /// Whether `event` passes this filter.
    pub fn matches(&self, event: &AuditEvent) -> bool {
        self.aco.is_none_or(|aco| event.key.aco == aco)
            && self.aro.is_none_or(|aro| event.key.aro == aro)
            && self.permission_id.is_none_or(|id| event.permission_id == id)
            && self.after.is_none_or(|after| event.sequence > after)
    }
}
