use std::collections::BTreeMap;

use allot_core::Experiment;
use allot_registry::{derive_seed, Registry};
use proptest::prelude::*;

fn coin_flip(name: &str) -> Experiment {
    Experiment::new(name, [("heads", 1), ("tails", 1)]).unwrap()
}

#[test]
fn derivation_is_pure_in_its_inputs() {
    assert_eq!(derive_seed(42, "a"), derive_seed(42, "a"));
    assert_eq!(derive_seed(0, "checkout"), derive_seed(0, "checkout"));
    assert_ne!(derive_seed(42, "a"), derive_seed(42, "b"));
}

#[test]
fn set_seed_fans_out_to_all_members() {
    let mut registry = Registry::new();
    registry.add(coin_flip("a"));
    registry.add(coin_flip("b"));

    registry.set_seed(42);

    let seed_a = registry.get("a").unwrap().seed();
    let seed_b = registry.get("b").unwrap().seed();
    assert_eq!(seed_a, Some(derive_seed(42, "a")));
    assert_eq!(seed_b, Some(derive_seed(42, "b")));
    assert_ne!(seed_a, seed_b);
    assert_eq!(registry.global_seed(), Some(42));
}

#[test]
fn late_add_receives_a_derived_seed() {
    let mut registry = Registry::new();
    registry.set_seed(42);

    registry.add(coin_flip("latecomer"));

    assert_eq!(
        registry.get("latecomer").unwrap().seed(),
        Some(derive_seed(42, "latecomer"))
    );
}

#[test]
fn create_test_receives_a_derived_seed() {
    let mut registry = Registry::new();
    registry.set_seed(7);

    registry
        .create_test("factory", [("x", 1), ("y", 1)], BTreeMap::new())
        .unwrap();

    assert_eq!(
        registry.get("factory").unwrap().seed(),
        Some(derive_seed(7, "factory"))
    );
}

#[test]
fn seeding_skips_already_resolved_members() {
    let mut registry = Registry::new();
    registry.add(coin_flip("early"));
    registry.get_mut("early").unwrap().resolve().unwrap();

    registry.set_seed(42);

    assert_eq!(registry.get("early").unwrap().seed(), None);
}

#[test]
fn identically_built_registries_resolve_identically() {
    let build = || {
        let mut registry = Registry::new();
        registry.add(coin_flip("a"));
        registry.add(coin_flip("b"));
        registry.set_seed(1337);
        registry
    };

    let mut first = build();
    let mut second = build();

    for name in ["a", "b"] {
        let choice_a = first.get_mut(name).unwrap().variation().unwrap().to_owned();
        let choice_b = second.get_mut(name).unwrap().variation().unwrap().to_owned();
        assert_eq!(choice_a, choice_b, "member {name} diverged under one seed");
    }
}

proptest! {
    #[test]
    fn derivation_is_deterministic_for_arbitrary_inputs(
        global_seed in any::<u64>(),
        name in "[a-z_]{1,16}",
    ) {
        prop_assert_eq!(derive_seed(global_seed, &name), derive_seed(global_seed, &name));
    }

    #[test]
    fn derived_seed_stays_within_the_difference_bound(
        global_seed in any::<u64>(),
        name in "[a-z_]{1,16}",
    ) {
        // The name hash spans seven hex digits, so the absolute difference
        // can never exceed max(global_seed, 16^7 - 1).
        let bound = global_seed.max(0xFFF_FFFF);
        prop_assert!(derive_seed(global_seed, &name) <= bound);
    }
}

#[test]
fn seeded_constructor_matches_manual_fan_out() {
    let mut manual = Registry::new();
    manual.add(coin_flip("a"));
    manual.add(coin_flip("b"));
    manual.set_seed(42);

    let bulk = Registry::with_tests_seeded([coin_flip("a"), coin_flip("b")], 42);

    for name in ["a", "b"] {
        assert_eq!(
            manual.get(name).unwrap().seed(),
            bulk.get(name).unwrap().seed()
        );
    }
}
