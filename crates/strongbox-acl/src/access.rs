//! The access-control facade.
//!
//! [`AccessControl`] ties the registry, the permission store, and the
//! directory collaborators together behind the operations callers use:
//! granting, revoking, cascading on destruction, listing, and deciding.

use std::sync::Arc;

use strongbox_core::{AclConfig, IdStrategy, PermissionId};
use uuid::Uuid;

use crate::audit::{AuditEvent, HistoryFilter};
use crate::directory::{Directory, ExistenceCheck, MemoryDirectory};
use crate::error::{Error, Result};
use crate::hierarchy::HierarchyResolver;
use crate::membership::MembershipResolver;
use crate::registry::{KindRegistry, PermissionRequest};
use crate::resolver::{Capabilities, Decision, PrivilegeResolver};
use crate::store::{MemoryPermissionStore, PermissionStore, UpsertOutcome};
use crate::types::{Aco, Aro, Contain, GrantKey, Permission, PermissionView, PrivilegeLevel, Scope};

/// Entry point to the access-control engine.
///
/// Cheap to clone; clones share the same store and collaborators.
#[derive(Clone)]
pub struct AccessControl {
    inner: Arc<Inner>,
}

struct Inner {
    registry: KindRegistry,
    id_strategy: IdStrategy,
    store: Arc<dyn PermissionStore>,
    existence: Arc<dyn ExistenceCheck>,
    hierarchy: HierarchyResolver,
    membership: MembershipResolver,
    resolver: PrivilegeResolver,
}

impl AccessControl {
    /// Build an engine over `store`, using `directory` for every
    /// collaborator lookup.
    pub fn new<D>(
        config: AclConfig,
        store: Arc<dyn PermissionStore>,
        directory: Arc<D>,
    ) -> Result<Self>
    where
        D: Directory + 'static,
    {
        Self::with_collaborators(
            config,
            store,
            directory.clone(),
            HierarchyResolver::new(directory.clone()),
            MembershipResolver::new(directory),
        )
    }

    /// Build an engine with an in-memory store over `directory`.
    pub fn in_memory(config: AclConfig, directory: Arc<MemoryDirectory>) -> Result<Self> {
        Self::new(config, Arc::new(MemoryPermissionStore::new()), directory)
    }

    /// Build an engine from separately supplied collaborators.
    pub fn with_collaborators(
        config: AclConfig,
        store: Arc<dyn PermissionStore>,
        existence: Arc<dyn ExistenceCheck>,
        hierarchy: HierarchyResolver,
        membership: MembershipResolver,
    ) -> Result<Self> {
        config.validate()?;
        log::debug!(
            "access control ready: id_strategy={}, aco_kinds={:?}, aro_kinds={:?}",
            config.id_strategy,
            config.registry.aco_kinds,
            config.registry.aro_kinds
        );
        let resolver = PrivilegeResolver::new(store.clone(), hierarchy.clone(), membership.clone());
        Ok(Self {
            inner: Arc::new(Inner {
                registry: KindRegistry::new(config.registry),
                id_strategy: config.id_strategy,
                store,
                existence,
                hierarchy,
                membership,
                resolver,
            }),
        })
    }

    /// Kind whitelist in force.
    pub fn registry(&self) -> &KindRegistry {
        &self.inner.registry
    }

    /// The underlying privilege resolver.
    pub fn resolver(&self) -> &PrivilegeResolver {
        &self.inner.resolver
    }

    /// Category hierarchy helper.
    pub fn hierarchy(&self) -> &HierarchyResolver {
        &self.inner.hierarchy
    }

    /// Group membership helper.
    pub fn membership(&self) -> &MembershipResolver {
        &self.inner.membership
    }

    // ========================================================================
    // Grants
    // ========================================================================

    /// Give `aro` the privilege `level` on `aco`.
    ///
    /// Granting again for the same pair changes the level of the existing
    /// grant; it never creates a second one.
    pub async fn grant(&self, aco: Aco, aro: Aro, level: PrivilegeLevel) -> Result<Permission> {
        self.grant_as(aco, aro, level, None).await
    }

    /// [`grant`](Self::grant), recording `actor` as the author.
    pub async fn grant_as(
        &self,
        aco: Aco,
        aro: Aro,
        level: PrivilegeLevel,
        actor: Option<Uuid>,
    ) -> Result<Permission> {
        let registry = &self.inner.registry;
        registry.check_aco(&aco)?;
        registry.check_aro(&aro)?;
        registry.check_level(level)?;
        self.ensure_exists(aco, aro).await?;

        let key = GrantKey::new(aco, aro);
        let new_id = self.inner.id_strategy.permission_id(&aco.id(), &aro.id());
        let (permission, outcome) = self.inner.store.upsert(key, level, new_id, actor).await?;
        match outcome {
            UpsertOutcome::Created => {
                log::info!("granted {level} to {aro} on {aco} ({})", permission.id);
            }
            UpsertOutcome::Updated { previous } => {
                log::info!("changed {aro} on {aco} from {previous} to {level} ({})", permission.id);
            }
            UpsertOutcome::Unchanged => {
                log::debug!("{aro} already holds {level} on {aco}");
            }
        }
        Ok(permission)
    }

    /// Grant from untyped form input.
    ///
    /// Fields are checked in form order; the first bad field is reported.
    pub async fn grant_raw(&self, request: &PermissionRequest) -> Result<Permission> {
        self.grant_raw_as(request, None).await
    }

    /// [`grant_raw`](Self::grant_raw), recording `actor` as the author.
    pub async fn grant_raw_as(
        &self,
        request: &PermissionRequest,
        actor: Option<Uuid>,
    ) -> Result<Permission> {
        let parsed = self.inner.registry.parse_request(request)?;
        self.grant_as(parsed.aco, parsed.aro, parsed.level, actor).await
    }

    /// Change the level of an existing grant by id.
    pub async fn update_level(
        &self,
        id: PermissionId,
        level: PrivilegeLevel,
    ) -> Result<Permission> {
        self.update_level_as(id, level, None).await
    }

    /// [`update_level`](Self::update_level), recording `actor` as the author.
    pub async fn update_level_as(
        &self,
        id: PermissionId,
        level: PrivilegeLevel,
        actor: Option<Uuid>,
    ) -> Result<Permission> {
        self.inner.registry.check_level(level)?;
        let (permission, outcome) = self.inner.store.set_level(id, level, actor).await?;
        if let UpsertOutcome::Updated { previous } = outcome {
            log::info!("changed permission {id} from {previous} to {level}");
        }
        Ok(permission)
    }

    async fn ensure_exists(&self, aco: Aco, aro: Aro) -> Result<()> {
        if !self.inner.existence.aco_exists(aco).await? {
            return Err(Error::DanglingReference {
                field: Scope::Aco.foreign_key_field(),
                kind: aco.kind().as_str(),
                id: aco.id(),
            });
        }
        if !self.inner.existence.aro_exists(aro).await? {
            return Err(Error::DanglingReference {
                field: Scope::Aro.foreign_key_field(),
                kind: aro.kind().as_str(),
                id: aro.id(),
            });
        }
        Ok(())
    }

    // ========================================================================
    // Revocation and cascades
    // ========================================================================

    /// Remove the grant for `(aco, aro)`. Returns `false` if there was none.
    pub async fn revoke(&self, aco: Aco, aro: Aro) -> Result<bool> {
        self.revoke_as(aco, aro, None).await
    }

    /// [`revoke`](Self::revoke), recording `actor` as the author.
    pub async fn revoke_as(&self, aco: Aco, aro: Aro, actor: Option<Uuid>) -> Result<bool> {
        let removed = self.inner.store.remove(GrantKey::new(aco, aro), actor).await?;
        match &removed {
            Some(permission) => log::info!("revoked {} from {aro} on {aco}", permission.level),
            None => log::debug!("nothing to revoke for {aro} on {aco}"),
        }
        Ok(removed.is_some())
    }

    /// Remove every grant on `aco`.
    pub async fn revoke_all_for_aco(&self, aco: Aco) -> Result<Vec<Permission>> {
        let removed = self.inner.store.remove_all_for_aco(aco, None).await?;
        log_cascade(&aco.to_string(), removed.len());
        Ok(removed)
    }

    /// Remove every grant given to `aro`.
    pub async fn revoke_all_for_aro(&self, aro: Aro) -> Result<Vec<Permission>> {
        let removed = self.inner.store.remove_all_for_aro(aro, None).await?;
        log_cascade(&aro.to_string(), removed.len());
        Ok(removed)
    }

    /// Drop grants on a resource that no longer exists.
    pub async fn on_resource_destroyed(&self, resource: Uuid) -> Result<Vec<Permission>> {
        self.revoke_all_for_aco(Aco::Resource(resource)).await
    }

    /// Drop grants on a category and every category beneath it.
    ///
    /// Call before the category rows are removed from the directory; the
    /// subtree is read from it.
    pub async fn on_category_destroyed(&self, category: Uuid) -> Result<Vec<Permission>> {
        let mut acos = vec![Aco::Category(category)];
        acos.extend(
            self.inner
                .hierarchy
                .descendants(category)
                .await?
                .into_iter()
                .map(Aco::Category),
        );
        let removed = self.inner.store.remove_all_for_acos(&acos, None).await?;
        let subtree = format!("category subtree of {category} ({} nodes)", acos.len());
        log_cascade(&subtree, removed.len());
        Ok(removed)
    }

    /// Drop grants given to a user that no longer exists.
    pub async fn on_user_destroyed(&self, user: Uuid) -> Result<Vec<Permission>> {
        self.revoke_all_for_aro(Aro::User(user)).await
    }

    /// Drop grants given to a group that no longer exists.
    pub async fn on_group_destroyed(&self, group: Uuid) -> Result<Vec<Permission>> {
        self.revoke_all_for_aro(Aro::Group(group)).await
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Grant by id.
    pub async fn get(&self, id: PermissionId) -> Result<Option<Permission>> {
        self.inner.store.get(id).await
    }

    /// Grants stored directly on `aco`, oldest first.
    pub async fn list_direct_for_aco(&self, aco: Aco) -> Result<Vec<Permission>> {
        self.inner.store.list_for_aco(aco).await
    }

    /// Grants given directly to `aro`, oldest first.
    pub async fn list_direct_for_aro(&self, aro: Aro) -> Result<Vec<Permission>> {
        self.inner.store.list_for_aro(aro).await
    }

    /// [`list_direct_for_aco`](Self::list_direct_for_aco) with eager-loaded data.
    pub async fn list_direct_for_aco_with(
        &self,
        aco: Aco,
        contain: Contain,
    ) -> Result<Vec<PermissionView>> {
        Ok(views(self.list_direct_for_aco(aco).await?, contain))
    }

    /// [`list_direct_for_aro`](Self::list_direct_for_aro) with eager-loaded data.
    pub async fn list_direct_for_aro_with(
        &self,
        aro: Aro,
        contain: Contain,
    ) -> Result<Vec<PermissionView>> {
        Ok(views(self.list_direct_for_aro(aro).await?, contain))
    }

    /// Recorded grant mutations matching `filter`.
    pub async fn history(&self, filter: HistoryFilter) -> Result<Vec<AuditEvent>> {
        self.inner.store.history(filter).await
    }

    // ========================================================================
    // Decisions
    // ========================================================================

    /// Effective level of `user` on `aco`.
    pub async fn resolve(&self, user: Uuid, aco: Aco) -> Result<PrivilegeLevel> {
        self.inner.resolver.resolve(user, aco).await
    }

    /// Whether `user` holds at least `required` on `aco`.
    pub async fn is_allowed_to(
        &self,
        user: Uuid,
        aco: Aco,
        required: PrivilegeLevel,
    ) -> Result<bool> {
        self.inner.resolver.is_allowed_to(user, aco, required).await
    }

    /// Effective level plus the grant that decided it.
    pub async fn explain(&self, user: Uuid, aco: Aco) -> Result<Decision> {
        self.inner.resolver.explain(user, aco).await
    }

    /// Read/update/admin flags for `user` on `aco`.
    pub async fn capabilities(&self, user: Uuid, aco: Aco) -> Result<Capabilities> {
        self.inner.resolver.capabilities(user, aco).await
    }
}

fn views(permissions: Vec<Permission>, contain: Contain) -> Vec<PermissionView> {
    permissions
        .into_iter()
        .map(|p| PermissionView::new(p, contain))
        .collect()
}

fn log_cascade(target: &str, removed: usize) {
    if removed > 0 {
        log::info!("cascaded {removed} grants for {target}");
    } else {
        log::debug!("no grants to cascade for {target}");
    }
}
