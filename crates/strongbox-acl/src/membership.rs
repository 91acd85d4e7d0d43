//! Group membership resolution.
//!
//! Expands nested groups in both directions: down from a group to every
//! user it transitively contains, and up from a user to every group that
//! transitively contains them. A group that is (indirectly) nested in
//! itself fails with [`Error::CyclicHierarchy`].

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use uuid::Uuid;

use crate::directory::GroupDirectory;
use crate::error::{Error, Graph, Result};
use crate::INTEGRITY_LOG_TARGET;

#[derive(Debug, Clone, Copy)]
enum Direction {
    /// Towards nested subgroups.
    Down,
    /// Towards containing groups.
    Up,
}

enum Step {
    Enter(Uuid),
    Leave(Uuid),
}

/// Resolves transitive group membership over a [`GroupDirectory`].
#[derive(Clone)]
pub struct MembershipResolver {
    groups: Arc<dyn GroupDirectory>,
}

impl MembershipResolver {
    /// Wrap a group directory.
    pub fn new(groups: Arc<dyn GroupDirectory>) -> Self {
        Self { groups }
    }

    /// Every user in `group`, including members of nested groups.
    pub async fn members_of(&self, group: Uuid) -> Result<BTreeSet<Uuid>> {
        let nested = self.walk(vec![group], Direction::Down).await?;
        let mut users = BTreeSet::new();
        for g in nested {
            users.extend(self.groups.direct_members_of(g).await?);
        }
        Ok(users)
    }

    /// Every group `user` belongs to, directly or through nesting.
    pub async fn groups_of(&self, user: Uuid) -> Result<BTreeSet<Uuid>> {
        let direct = self.groups.groups_containing(user).await?;
        let all = self.walk(direct, Direction::Up).await?;
        Ok(all.into_iter().collect())
    }

    /// Depth-first walk from `starts`, returning every group visited.
    ///
    /// Revisiting a group that is still on the current path is a cycle;
    /// revisiting one reached through another branch is not.
    async fn walk(&self, starts: Vec<Uuid>, direction: Direction) -> Result<Vec<Uuid>> {
        let mut visited = Vec::new();
        let mut done: HashSet<Uuid> = HashSet::new();
        let mut on_path: HashSet<Uuid> = HashSet::new();
        let mut stack: Vec<Step> = starts.into_iter().rev().map(Step::Enter).collect();

        while let Some(step) = stack.pop() {
            match step {
                Step::Enter(group) => {
                    if on_path.contains(&group) {
                        log::error!(
                            target: INTEGRITY_LOG_TARGET,
                            "group nesting is cyclic: {group} contains itself"
                        );
                        return Err(Error::CyclicHierarchy {
                            graph: Graph::Group,
                            id: group,
                        });
                    }
                    if done.contains(&group) {
                        continue;
                    }
                    on_path.insert(group);
                    visited.push(group);
                    stack.push(Step::Leave(group));

                    let mut next = match direction {
                        Direction::Down => self.groups.subgroups_of(group).await?,
                        Direction::Up => self.groups.parent_groups_of(group).await?,
                    };
                    next.sort();
                    stack.extend(next.into_iter().rev().map(Step::Enter));
                }
                Step::Leave(group) => {
                    on_path.remove(&group);
                    done.insert(group);
                }
            }
        }
        Ok(visited)
    }
}
