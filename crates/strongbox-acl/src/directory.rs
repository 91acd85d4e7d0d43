//! Collaborator interfaces the engine reads from.
//!
//! Users, groups, resources, and the category tree are owned elsewhere. The
//! engine only asks whether an instance exists, who a category's parent is,
//! and who belongs to which group.
//!
//! [`MemoryDirectory`] implements all three traits for tests and simple
//! deployments.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::types::{Aco, Aro};

/// Existence lookups used when a grant is created.
#[async_trait]
pub trait ExistenceCheck: Send + Sync {
    /// Whether the referenced object is live.
    async fn aco_exists(&self, aco: Aco) -> Result<bool>;

    /// Whether the referenced requestor is live.
    async fn aro_exists(&self, aro: Aro) -> Result<bool>;
}

/// Read access to the category tree.
#[async_trait]
pub trait CategoryTree: Send + Sync {
    /// Parent of `category`, `None` for a root.
    async fn parent_of(&self, category: Uuid) -> Result<Option<Uuid>>;

    /// Direct children of `category`.
    async fn children_of(&self, category: Uuid) -> Result<Vec<Uuid>>;

    /// Categories `resource` declares membership in.
    async fn categories_of(&self, resource: Uuid) -> Result<Vec<Uuid>>;
}

/// Read access to group membership.
///
/// Nesting is optional: directories without nested groups keep the default
/// `subgroups_of` / `parent_groups_of`, which report none.
#[async_trait]
pub trait GroupDirectory: Send + Sync {
    /// Users directly in `group`.
    async fn direct_members_of(&self, group: Uuid) -> Result<Vec<Uuid>>;

    /// Groups `user` is directly in.
    async fn groups_containing(&self, user: Uuid) -> Result<Vec<Uuid>>;

    /// Groups nested directly inside `group`.
    async fn subgroups_of(&self, _group: Uuid) -> Result<Vec<Uuid>> {
        Ok(Vec::new())
    }

    /// Groups that directly contain `group`.
    async fn parent_groups_of(&self, _group: Uuid) -> Result<Vec<Uuid>> {
        Ok(Vec::new())
    }
}

/// Everything the engine needs from the outside world.
pub trait Directory: ExistenceCheck + CategoryTree + GroupDirectory {}

impl<T> Directory for T where T: ExistenceCheck + CategoryTree + GroupDirectory {}

// ============================================================================
// MemoryDirectory
// ============================================================================

/// In-memory users, groups, resources, and category tree.
///
/// Mutators take `&self` so the directory can be shared behind an `Arc`
/// with the engine while a test reshapes it.
#[derive(Default)]
pub struct MemoryDirectory {
    data: RwLock<DirectoryData>,
}

#[derive(Default)]
struct DirectoryData {
    users: HashSet<Uuid>,
    groups: HashSet<Uuid>,
    resources: HashMap<Uuid, BTreeSet<Uuid>>,
    categories: HashMap<Uuid, Option<Uuid>>,
    members: HashMap<Uuid, BTreeSet<Uuid>>,
    subgroups: HashMap<Uuid, BTreeSet<Uuid>>,
}

impl MemoryDirectory {
    /// Empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, DirectoryData> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, DirectoryData> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a user.
    pub fn add_user(&self, user: Uuid) {
        self.write().users.insert(user);
    }

    /// Register a group.
    pub fn add_group(&self, group: Uuid) {
        self.write().groups.insert(group);
    }

    /// Register a category under `parent` (or as a root).
    pub fn add_category(&self, category: Uuid, parent: Option<Uuid>) {
        self.write().categories.insert(category, parent);
    }

    /// Re-point a category's parent. Does not check for cycles.
    pub fn set_parent(&self, category: Uuid, parent: Option<Uuid>) {
        self.write().categories.insert(category, parent);
    }

    /// Register a resource filed in `categories`.
    pub fn add_resource(&self, resource: Uuid, categories: impl IntoIterator<Item = Uuid>) {
        self.write()
            .resources
            .insert(resource, categories.into_iter().collect());
    }

    /// Put `user` in `group`.
    pub fn add_member(&self, group: Uuid, user: Uuid) {
        self.write().members.entry(group).or_default().insert(user);
    }

    /// Take `user` out of `group`.
    pub fn remove_member(&self, group: Uuid, user: Uuid) {
        if let Some(members) = self.write().members.get_mut(&group) {
            members.remove(&user);
        }
    }

    /// Nest `child` inside `parent`. Does not check for cycles.
    pub fn add_subgroup(&self, parent: Uuid, child: Uuid) {
        self.write().subgroups.entry(parent).or_default().insert(child);
    }

    /// Delete a user and their memberships.
    pub fn remove_user(&self, user: Uuid) {
        let mut data = self.write();
        data.users.remove(&user);
        for members in data.members.values_mut() {
            members.remove(&user);
        }
    }

    /// Delete a group, its memberships, and its nesting links.
    pub fn remove_group(&self, group: Uuid) {
        let mut data = self.write();
        data.groups.remove(&group);
        data.members.remove(&group);
        data.subgroups.remove(&group);
        for children in data.subgroups.values_mut() {
            children.remove(&group);
        }
    }

    /// Delete a resource.
    pub fn remove_resource(&self, resource: Uuid) {
        self.write().resources.remove(&resource);
    }

    /// Delete a category. Children and filed resources are left as they are.
    pub fn remove_category(&self, category: Uuid) {
        let mut data = self.write();
        data.categories.remove(&category);
        for filed in data.resources.values_mut() {
            filed.remove(&category);
        }
    }
}

#[async_trait]
impl ExistenceCheck for MemoryDirectory {
    async fn aco_exists(&self, aco: Aco) -> Result<bool> {
        let data = self.read();
        Ok(match aco {
            Aco::Resource(id) => data.resources.contains_key(&id),
            Aco::Category(id) => data.categories.contains_key(&id),
        })
    }

    async fn aro_exists(&self, aro: Aro) -> Result<bool> {
        let data = self.read();
        Ok(match aro {
            Aro::User(id) => data.users.contains(&id),
            Aro::Group(id) => data.groups.contains(&id),
        })
    }
}

#[async_trait]
impl CategoryTree for MemoryDirectory {
    async fn parent_of(&self, category: Uuid) -> Result<Option<Uuid>> {
        Ok(self.read().categories.get(&category).copied().flatten())
    }

    async fn children_of(&self, category: Uuid) -> Result<Vec<Uuid>> {
        let data = self.read();
        let mut children: Vec<Uuid> = data
            .categories
            .iter()
            .filter(|(_, parent)| **parent == Some(category))
            .map(|(id, _)| *id)
            .collect();
        children.sort();
        Ok(children)
    }

    async fn categories_of(&self, resource: Uuid) -> Result<Vec<Uuid>> {
        Ok(self
            .read()
            .resources
            .get(&resource)
            .map(|filed| filed.iter().copied().collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl GroupDirectory for MemoryDirectory {
    async fn direct_members_of(&self, group: Uuid) -> Result<Vec<Uuid>> {
        Ok(self
            .read()
            .members
            .get(&group)
            .map(|m| m.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn groups_containing(&self, user: Uuid) -> Result<Vec<Uuid>> {
        let data = self.read();
        let mut groups: Vec<Uuid> = data
            .members
            .iter()
            .filter(|(_, members)| members.contains(&user))
            .map(|(group, _)| *group)
            .collect();
        groups.sort();
        Ok(groups)
    }

    async fn subgroups_of(&self, group: Uuid) -> Result<Vec<Uuid>> {
        Ok(self
            .read()
            .subgroups
            .get(&group)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn parent_groups_of(&self, group: Uuid) -> Result<Vec<Uuid>> {
        let data = self.read();
        let mut parents: Vec<Uuid> = data
            .subgroups
            .iter()
            .filter(|(_, children)| children.contains(&group))
            .map(|(parent, _)| *parent)
            .collect();
        parents.sort();
        Ok(parents)
    }
}
