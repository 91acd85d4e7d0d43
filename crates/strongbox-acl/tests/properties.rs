//! Property tests for privilege resolution.

#![allow(clippy::unwrap_used)]

mod common;

use common::Harness;
use proptest::prelude::*;
use strongbox_acl::{Aco, Aro, PrivilegeLevel};

/// Every scope and identity here applies to the one user and resource.
struct World {
    h: Harness,
    user: uuid::Uuid,
    secret: Aco,
    scopes: [Aco; 3],
    identities: [Aro; 3],
}

fn world() -> World {
    let h = Harness::new();
    let user = h.user();
    let inner = h.group(&[user]);
    let outer = h.group(&[]);
    h.dir.add_subgroup(outer, inner);
    let root = h.category(None);
    let child = h.category(Some(root));
    let secret = Aco::Resource(h.resource(&[child]));
    World {
        user,
        secret,
        scopes: [secret, Aco::Category(child), Aco::Category(root)],
        identities: [Aro::User(user), Aro::Group(inner), Aro::Group(outer)],
        h,
    }
}

fn level() -> impl Strategy<Value = PrivilegeLevel> {
    prop::sample::select(PrivilegeLevel::GRANTABLE.to_vec())
}

fn grant() -> impl Strategy<Value = (usize, usize, PrivilegeLevel)> {
    (0..3usize, 0..3usize, level())
}

fn block_on<F: std::future::Future>(f: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(f)
}

proptest! {
    #[test]
    fn prop_resolution_is_max_of_applicable(grants in prop::collection::vec(grant(), 0..12)) {
        block_on(async {
            let w = world();
            let mut expected = std::collections::HashMap::new();
            for (s, i, level) in &grants {
                w.h.acl.grant(w.scopes[*s], w.identities[*i], *level).await.unwrap();
                expected.insert((*s, *i), *level);
            }
            let max = expected.values().copied().max().unwrap_or(PrivilegeLevel::None);
            prop_assert_eq!(w.h.acl.resolve(w.user, w.secret).await.unwrap(), max);
            Ok(())
        })?;
    }

    #[test]
    fn prop_adding_never_lowers_and_removing_never_raises(
        grants in prop::collection::vec(grant(), 0..8),
        extra in grant(),
        victim in 0..8usize,
    ) {
        block_on(async {
            let w = world();
            let mut keys = Vec::new();
            for (s, i, level) in &grants {
                if (*s, *i) == (extra.0, extra.1) {
                    continue;
                }
                w.h.acl.grant(w.scopes[*s], w.identities[*i], *level).await.unwrap();
                keys.push((*s, *i));
            }
            let before = w.h.acl.resolve(w.user, w.secret).await.unwrap();

            w.h.acl.grant(w.scopes[extra.0], w.identities[extra.1], extra.2).await.unwrap();
            let added = w.h.acl.resolve(w.user, w.secret).await.unwrap();
            prop_assert!(added >= before);

            keys.push((extra.0, extra.1));
            let (s, i) = keys[victim % keys.len()];
            w.h.acl.revoke(w.scopes[s], w.identities[i]).await.unwrap();
            let removed = w.h.acl.resolve(w.user, w.secret).await.unwrap();
            prop_assert!(removed <= added);
            Ok(())
        })?;
    }
}
