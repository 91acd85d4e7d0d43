//! End-to-end access-control scenarios.

#![allow(clippy::unwrap_used)]

mod common;

use common::Harness;
use strongbox_acl::{Aco, AuditAction, Aro, Error, Graph, HistoryFilter, PrivilegeLevel};
use strongbox_core::{AclConfig, IdStrategy};

// ============================================================================
// Grants
// ============================================================================

#[tokio::test]
async fn test_last_write_wins_without_duplicates() {
    let h = Harness::new();
    let user = h.user();
    let secret = Aco::Resource(h.resource(&[]));

    for level in [
        PrivilegeLevel::Read,
        PrivilegeLevel::Admin,
        PrivilegeLevel::Update,
    ] {
        h.acl.grant(secret, Aro::User(user), level).await.unwrap();
    }

    let grants = h.acl.list_direct_for_aco(secret).await.unwrap();
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].level, PrivilegeLevel::Update);
}

#[tokio::test]
async fn test_identical_grant_is_idempotent() {
    let h = Harness::new();
    let user = Aro::User(h.user());
    let secret = Aco::Resource(h.resource(&[]));

    let first = h.acl.grant(secret, user, PrivilegeLevel::Read).await.unwrap();
    let second = h.acl.grant(secret, user, PrivilegeLevel::Read).await.unwrap();

    assert_eq!(first, second);
    let history = h.acl.history(HistoryFilter::all()).await.unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn test_concurrent_grants_for_one_pair() {
    let h = Harness::new();
    let user = Aro::User(h.user());
    let secret = Aco::Resource(h.resource(&[]));

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let acl = h.acl.clone();
            tokio::spawn(async move { acl.grant(secret, user, PrivilegeLevel::Read).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(h.acl.list_direct_for_aco(secret).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_deterministic_ids_are_stable_across_engines() {
    let first = Harness::with_config(AclConfig::deterministic());
    let second = Harness::with_config(AclConfig::deterministic());
    let (user, secret) = (first.user(), first.resource(&[]));
    second.dir.add_user(user);
    second.dir.add_resource(secret, []);

    let a = first
        .acl
        .grant(Aco::Resource(secret), Aro::User(user), PrivilegeLevel::Read)
        .await
        .unwrap();
    let b = second
        .acl
        .grant(Aco::Resource(secret), Aro::User(user), PrivilegeLevel::Admin)
        .await
        .unwrap();

    assert_eq!(a.id, b.id);
    assert_eq!(a.id, IdStrategy::Deterministic.permission_id(&secret, &user));
}

// ============================================================================
// Resolution
// ============================================================================

#[tokio::test]
async fn test_default_deny() {
    let h = Harness::new();
    let user = h.user();
    let secret = Aco::Resource(h.resource(&[]));
    assert_eq!(h.acl.resolve(user, secret).await.unwrap(), PrivilegeLevel::None);
    assert!(!h.acl.is_allowed_to(user, secret, PrivilegeLevel::Read).await.unwrap());
}

#[tokio::test]
async fn test_admin_on_root_category_is_inherited() {
    let h = Harness::new();
    let user = h.user();
    let root = h.category(None);
    let child = h.category(Some(root));
    let secret = Aco::Resource(h.resource(&[child]));

    h.acl
        .grant(Aco::Category(root), Aro::User(user), PrivilegeLevel::Admin)
        .await
        .unwrap();

    assert_eq!(h.acl.resolve(user, secret).await.unwrap(), PrivilegeLevel::Admin);
    assert_eq!(
        h.acl.resolve(user, Aco::Category(child)).await.unwrap(),
        PrivilegeLevel::Admin
    );
}

#[tokio::test]
async fn test_group_update_allows_update_only() {
    let h = Harness::new();
    let user = h.user();
    let group = h.group(&[user]);
    let secret = Aco::Resource(h.resource(&[]));

    h.acl
        .grant(secret, Aro::Group(group), PrivilegeLevel::Update)
        .await
        .unwrap();

    assert!(h.acl.is_allowed_to(user, secret, PrivilegeLevel::Update).await.unwrap());
    assert!(!h.acl.is_allowed_to(user, secret, PrivilegeLevel::Admin).await.unwrap());
}

#[tokio::test]
async fn test_direct_then_group_then_revoke() {
    let h = Harness::new();
    let u1 = h.user();
    let g1 = h.group(&[u1]);
    let r1 = Aco::Resource(h.resource(&[]));

    h.acl.grant(r1, Aro::User(u1), PrivilegeLevel::Read).await.unwrap();
    assert_eq!(h.acl.resolve(u1, r1).await.unwrap(), PrivilegeLevel::Read);

    h.acl.grant(r1, Aro::Group(g1), PrivilegeLevel::Admin).await.unwrap();
    assert_eq!(h.acl.resolve(u1, r1).await.unwrap(), PrivilegeLevel::Admin);

    assert!(h.acl.revoke(r1, Aro::Group(g1)).await.unwrap());
    assert_eq!(h.acl.resolve(u1, r1).await.unwrap(), PrivilegeLevel::Read);

    let decision = h.acl.explain(u1, r1).await.unwrap();
    assert_eq!(decision.granted_by.unwrap().aro, Aro::User(u1));
}

#[tokio::test]
async fn test_cyclic_category_tree_fails_resolution() {
    let h = Harness::new();
    let user = h.user();
    let a = h.category(None);
    let b = h.category(Some(a));
    h.dir.set_parent(a, Some(b));
    let secret = Aco::Resource(h.resource(&[b]));

    let err = h.acl.resolve(user, secret).await.unwrap_err();
    assert!(matches!(
        err,
        Error::CyclicHierarchy {
            graph: Graph::Category,
            ..
        }
    ));
}

#[tokio::test]
async fn test_cyclic_groups_fail_resolution() {
    let h = Harness::new();
    let user = h.user();
    let g1 = h.group(&[user]);
    let g2 = h.group(&[]);
    h.dir.add_subgroup(g1, g2);
    h.dir.add_subgroup(g2, g1);
    let secret = Aco::Resource(h.resource(&[]));

    let err = h.acl.resolve(user, secret).await.unwrap_err();
    assert!(matches!(
        err,
        Error::CyclicHierarchy {
            graph: Graph::Group,
            ..
        }
    ));
}

// ============================================================================
// Cascades and history
// ============================================================================

#[tokio::test]
async fn test_destroying_either_side_cascades() {
    let h = Harness::new();
    let user = h.user();
    let group = h.group(&[user]);
    let secret = h.resource(&[]);
    let r = Aco::Resource(secret);

    h.acl.grant(r, Aro::Group(group), PrivilegeLevel::Update).await.unwrap();
    h.acl.on_group_destroyed(group).await.unwrap();
    assert_eq!(h.acl.resolve(user, r).await.unwrap(), PrivilegeLevel::None);

    h.acl.grant(r, Aro::User(user), PrivilegeLevel::Read).await.unwrap();
    let removed = h.acl.on_resource_destroyed(secret).await.unwrap();
    assert_eq!(removed.len(), 1);
    assert_eq!(h.acl.resolve(user, r).await.unwrap(), PrivilegeLevel::None);
    assert!(h.acl.list_direct_for_aro(Aro::User(user)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_history_records_every_mutation() {
    let h = Harness::new();
    let actor = h.user();
    let user = Aro::User(h.user());
    let r = Aco::Resource(h.resource(&[]));

    h.acl.grant_as(r, user, PrivilegeLevel::Read, Some(actor)).await.unwrap();
    h.acl.grant_as(r, user, PrivilegeLevel::Admin, Some(actor)).await.unwrap();
    h.acl.revoke_as(r, user, Some(actor)).await.unwrap();

    let events = h.acl.history(HistoryFilter::for_aco(r)).await.unwrap();
    let actions: Vec<AuditAction> = events.iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![
            AuditAction::Created {
                level: PrivilegeLevel::Read
            },
            AuditAction::LevelChanged {
                from: PrivilegeLevel::Read,
                to: PrivilegeLevel::Admin
            },
            AuditAction::Revoked {
                level: PrivilegeLevel::Admin
            },
        ]
    );
    assert!(events.iter().all(|e| e.actor == Some(actor)));
    assert!(events.windows(2).all(|w| w[0].sequence < w[1].sequence));
}
