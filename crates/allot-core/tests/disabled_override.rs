use allot_core::Experiment;

#[test]
fn disabled_experiment_serves_first_declared_variation() {
    // With weight zero on the first key, an enabled draw can never select
    // it, whatever the seed; the kill switch must return it anyway.
    let mut test = Experiment::new("kill_switch", [("fallback", 0), ("active", 100)]).unwrap();
    test.set_seed(7);
    test.disable();

    assert_eq!(test.variation().unwrap(), "fallback");
}

#[test]
fn disabled_path_does_not_fix_resolution_state() {
    let mut test = Experiment::new("bots", [("a", 1), ("b", 1)]).unwrap();
    test.disable();

    assert_eq!(test.variation().unwrap(), "a");
    assert!(!test.has_resolved());
    assert_eq!(test.resolved(), None);
}

#[test]
fn disabled_result_is_stable_across_seeds() {
    for seed in 0u64..20 {
        let mut test = Experiment::new("stable", [("first", 1), ("second", 1)]).unwrap();
        test.set_seed(seed);
        test.disable();
        assert_eq!(test.variation().unwrap(), "first");
    }
}

#[test]
fn disabling_after_resolution_changes_served_variation_only() {
    let mut test = Experiment::new("late_disable", [("off", 0), ("on", 10)]).unwrap();
    test.set_seed(1);
    let chosen = test.variation().unwrap().to_owned();
    assert_eq!(chosen, "on");

    test.disable();
    assert_eq!(test.variation().unwrap(), "off");
    assert_eq!(test.resolved(), Some("on"), "the resolved pick is untouched");
}

#[test]
fn disabled_experiment_with_no_variations_still_fails() {
    let mut test = Experiment::new("empty", Vec::<(String, i64)>::new()).unwrap();
    test.disable();

    let err = test.variation().unwrap_err();
    assert_eq!(err.info().code, "experiment-no-variations");
}

#[test]
fn enabled_flags_report_consistently() {
    let mut test = Experiment::new("flags", [("x", 1)]).unwrap();
    assert!(test.is_enabled());
    assert!(!test.is_disabled());

    test.disable();
    assert!(!test.is_enabled());
    assert!(test.is_disabled());
}
