//! Effective privilege computation.
//!
//! A user's level on an object is the highest level granted to the user or
//! to any group they belong to, on the object itself or on any category it
//! inherits from. Inheritance only ever adds: a lower grant closer to the
//! object never masks a higher one further up.

use std::cmp::Reverse;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::error::Result;
use crate::hierarchy::HierarchyResolver;
use crate::membership::MembershipResolver;
use crate::store::PermissionStore;
use crate::types::{Aco, Aro, GrantKey, Permission, PrivilegeLevel};

/// Outcome of a resolution, with the grant that decided it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    /// Effective level.
    pub level: PrivilegeLevel,
    /// Grant that supplied `level`; `None` when nothing applied.
    pub granted_by: Option<Permission>,
    /// Scope distance of the deciding grant (0 is the object itself).
    pub distance: Option<usize>,
    /// Number of applicable grants found.
    pub considered: usize,
}

impl Decision {
    fn deny() -> Self {
        Self {
            level: PrivilegeLevel::None,
            granted_by: None,
            distance: None,
            considered: 0,
        }
    }

    /// Whether the decision satisfies `required`.
    pub fn allows(&self, required: PrivilegeLevel) -> bool {
        self.level.satisfies(required)
    }
}

/// Which actions a user may perform on an object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    /// At least `Read`.
    pub can_read: bool,
    /// At least `Update`.
    pub can_update: bool,
    /// `Admin`.
    pub can_admin: bool,
}

impl From<PrivilegeLevel> for Capabilities {
    fn from(level: PrivilegeLevel) -> Self {
        Self {
            can_read: level.satisfies(PrivilegeLevel::Read),
            can_update: level.satisfies(PrivilegeLevel::Update),
            can_admin: level.satisfies(PrivilegeLevel::Admin),
        }
    }
}

/// Computes effective privilege from grants, categories, and groups.
#[derive(Clone)]
pub struct PrivilegeResolver {
    store: Arc<dyn PermissionStore>,
    hierarchy: HierarchyResolver,
    membership: MembershipResolver,
}

impl PrivilegeResolver {
    /// Assemble a resolver from its three inputs.
    pub fn new(
        store: Arc<dyn PermissionStore>,
        hierarchy: HierarchyResolver,
        membership: MembershipResolver,
    ) -> Self {
        Self {
            store,
            hierarchy,
            membership,
        }
    }

    /// Effective level of `user` on `aco`.
    pub async fn resolve(&self, user: Uuid, aco: Aco) -> Result<PrivilegeLevel> {
        Ok(self.explain(user, aco).await?.level)
    }

    /// Whether `user` holds at least `required` on `aco`.
    pub async fn is_allowed_to(
        &self,
        user: Uuid,
        aco: Aco,
        required: PrivilegeLevel,
    ) -> Result<bool> {
        Ok(self.resolve(user, aco).await?.satisfies(required))
    }

    /// Read/update/admin flags for `user` on `aco`.
    pub async fn capabilities(&self, user: Uuid, aco: Aco) -> Result<Capabilities> {
        Ok(Capabilities::from(self.resolve(user, aco).await?))
    }

    /// Resolve and report which grant decided the outcome.
    ///
    /// Among grants at the winning level, the nearest scope wins, then a
    /// grant to the user over one to a group, then the lowest grant id.
    pub async fn explain(&self, user: Uuid, aco: Aco) -> Result<Decision> {
        let snapshot = self.store.snapshot().await?;

        let mut identities = vec![Aro::User(user)];
        identities.extend(
            self.membership
                .groups_of(user)
                .await?
                .into_iter()
                .map(Aro::Group),
        );
        let scopes = self.hierarchy.inherited_scopes(aco).await?;

        let mut best: Option<(usize, &Permission)> = None;
        let mut considered = 0;
        for scope in &scopes {
            for aro in &identities {
                let Some(grant) = snapshot.get(&GrantKey::new(scope.aco, *aro)) else {
                    continue;
                };
                considered += 1;
                let better = match best {
                    None => true,
                    Some((distance, current)) => {
                        rank(grant, scope.distance) < rank(current, distance)
                    }
                };
                if better {
                    best = Some((scope.distance, grant));
                }
            }
        }

        let decision = match best {
            Some((distance, grant)) => Decision {
                level: grant.level,
                granted_by: Some(grant.clone()),
                distance: Some(distance),
                considered,
            },
            None => Decision::deny(),
        };
        log::debug!(
            "resolve user:{user} on {aco}: {} ({} grants over {} scopes and {} identities)",
            decision.level,
            considered,
            scopes.len(),
            identities.len()
        );
        Ok(decision)
    }
}

/// Sort key for candidate grants; the smallest wins.
fn rank(grant: &Permission, distance: usize) -> (Reverse<PrivilegeLevel>, usize, u8, Uuid) {
    let identity = match grant.aro {
        Aro::User(_) => 0,
        Aro::Group(_) => 1,
    };
    (
        Reverse(grant.level),
        distance,
        identity,
        *grant.id.as_uuid(),
    )
}
