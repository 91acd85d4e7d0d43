//! Shared fixtures for strongbox-acl integration tests.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use strongbox_acl::{AccessControl, MemoryDirectory};
use strongbox_core::AclConfig;
use uuid::Uuid;

/// A directory plus an engine over it.
pub struct Harness {
    pub dir: Arc<MemoryDirectory>,
    pub acl: AccessControl,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(AclConfig::default())
    }

    pub fn with_config(config: AclConfig) -> Self {
        let dir = Arc::new(MemoryDirectory::new());
        let acl = AccessControl::in_memory(config, dir.clone()).unwrap();
        Self { dir, acl }
    }

    pub fn user(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.dir.add_user(id);
        id
    }

    pub fn group(&self, members: &[Uuid]) -> Uuid {
        let id = Uuid::new_v4();
        self.dir.add_group(id);
        for member in members {
            self.dir.add_member(id, *member);
        }
        id
    }

    pub fn category(&self, parent: Option<Uuid>) -> Uuid {
        let id = Uuid::new_v4();
        self.dir.add_category(id, parent);
        id
    }

    pub fn resource(&self, categories: &[Uuid]) -> Uuid {
        let id = Uuid::new_v4();
        self.dir.add_resource(id, categories.iter().copied());
        id
    }
}
