//! Property tests for identity and merge semantics.
//!
//! 1. Derived uids are deterministic and case-insensitive in the name
//! 2. Attribute merge is idempotent
//! 3. Re-adding the same links never grows a link set

use netscrape_space::{Attrs, Entity, LinkOptions, Resource, Uid};
use proptest::prelude::*;

fn name_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9_.]{0,20}".prop_map(|s| s)
}

fn relation_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("owns".to_string()),
        Just("hasTopic".to_string()),
        Just("isLang".to_string()),
    ]
}

fn attrs_strategy() -> impl Strategy<Value = Attrs> {
    prop::collection::vec(("[a-z]{1,6}", "[a-z0-9]{0,6}"), 0..8)
        .prop_map(|kv| kv.into_iter().collect())
}

proptest! {
    #[test]
    fn derive_is_deterministic(name in name_strategy(), resource in "[a-z]{1,8}") {
        let a = Uid::derive(&name, &resource).unwrap();
        let b = Uid::derive(&name.to_uppercase(), &resource).unwrap();
        prop_assert_eq!(&a, &b);
        let suffix = format!("-{resource}");
        prop_assert!(a.as_str().ends_with(&suffix));
    }

    #[test]
    fn hashed_is_deterministic(parts in prop::collection::vec("[a-z]{0,5}", 1..5)) {
        prop_assert_eq!(Uid::hashed(parts.as_slice()), Uid::hashed(parts.as_slice()));
    }

    #[test]
    fn attrs_merge_is_idempotent(a in attrs_strategy(), b in attrs_strategy()) {
        let mut once = a.clone();
        once.merge(&b);
        let mut twice = once.clone();
        twice.merge(&b);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn link_union_is_idempotent(
        targets in prop::collection::vec((name_strategy(), relation_strategy()), 0..12),
    ) {
        let resource = Resource::new("topic", "topics", "v3", "starred", true).unwrap();
        let base = Entity::new("repo", "global", resource)
            .unwrap()
            .with_uid(Uid::derive("repo", "repo").unwrap());

        let mut observed = base.clone();
        for (name, rel) in &targets {
            observed.link(Uid::derive(name, "topic").unwrap(), LinkOptions::relation(rel.clone()));
        }

        let mut merged = base.clone();
        merged.merge(observed.clone(), true);
        let after_first = merged.links().len();
        merged.merge(observed.clone(), true);

        prop_assert_eq!(merged.links().len(), after_first);
        prop_assert_eq!(after_first, observed.links().len());
    }
}
