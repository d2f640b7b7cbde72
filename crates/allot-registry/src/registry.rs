use std::collections::BTreeMap;

use allot_core::{AllotError, Experiment};
use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::seed::derive_seed;

/// Insertion-ordered collection of experiments sharing one global seed.
///
/// A registry owns at most one global seed. Once set, every member (present
/// or subsequently added) receives a per-experiment seed derived from
/// `(global_seed, experiment_name)`, so that experiments grouped under one
/// request resolve independently yet reproducibly. Seed injection is a
/// silent no-op for members that have already resolved.
///
/// The intended unit of sharing is one registry per logical unit of work
/// (e.g. one request); the type performs no internal locking.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registry {
    tests: IndexMap<String, Experiment>,
    global_seed: Option<u64>,
}

impl Registry {
    /// Creates an empty, unseeded registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry pre-populated with the given experiments, keyed by
    /// their own names, in iteration order.
    pub fn with_tests(tests: impl IntoIterator<Item = Experiment>) -> Self {
        let mut registry = Self::new();
        for test in tests {
            registry.add(test);
        }
        registry
    }

    /// Creates a pre-populated registry and immediately fans the global seed
    /// out to every member.
    pub fn with_tests_seeded(
        tests: impl IntoIterator<Item = Experiment>,
        global_seed: u64,
    ) -> Self {
        let mut registry = Self::with_tests(tests);
        registry.set_seed(global_seed);
        registry
    }

    /// Returns the global seed, if one was set.
    pub fn global_seed(&self) -> Option<u64> {
        self.global_seed
    }

    /// Stores the global seed and derives a per-experiment seed for every
    /// currently registered member.
    pub fn set_seed(&mut self, global_seed: u64) {
        self.global_seed = Some(global_seed);
        for test in self.tests.values_mut() {
            let seed = derive_seed(global_seed, test.name());
            test.set_seed(seed);
        }
    }

    /// Registers an experiment under its own name, overwriting any member
    /// already stored there. When a global seed is set, the experiment's
    /// derived seed is assigned at add-time.
    pub fn add(&mut self, mut experiment: Experiment) {
        self.inject_seed(&mut experiment);
        self.tests.insert(experiment.name().to_owned(), experiment);
    }

    /// Builds an experiment, registers it and returns the stored instance.
    pub fn create_test<K, I>(
        &mut self,
        name: impl Into<String>,
        weights: I,
        metadata: BTreeMap<String, Value>,
    ) -> Result<&mut Experiment, AllotError>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, i64)>,
    {
        let name = name.into();
        let mut experiment = Experiment::with_metadata(name.clone(), weights, metadata)?;
        self.inject_seed(&mut experiment);
        Ok(match self.tests.entry(name) {
            Entry::Occupied(mut slot) => {
                slot.insert(experiment);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(experiment),
        })
    }

    /// Disables every registered experiment at once.
    pub fn disable_tests(&mut self) {
        for test in self.tests.values_mut() {
            test.disable();
        }
    }

    /// Forces lazy resolution of every registered experiment, discarding the
    /// outcomes. This is a warm-up, not a query: members that cannot resolve
    /// (no variations) are skipped rather than failing the bulk call.
    pub fn run_tests(&mut self) {
        for test in self.tests.values_mut() {
            let _ = test.variation();
        }
    }

    /// Checks whether an experiment is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.tests.contains_key(name)
    }

    /// Returns the experiment registered under `name`, or `None`.
    pub fn get(&self, name: &str) -> Option<&Experiment> {
        self.tests.get(name)
    }

    /// Returns a mutable handle to the experiment registered under `name`.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Experiment> {
        self.tests.get_mut(name)
    }

    /// Registers an experiment under a caller-chosen key, which may differ
    /// from the experiment's own name.
    ///
    /// The derived seed is still computed from the experiment's OWN name,
    /// never from the registration key. Prefer [`Registry::add`] unless the
    /// divergent key is genuinely needed.
    pub fn insert(&mut self, name: impl Into<String>, mut experiment: Experiment) {
        self.inject_seed(&mut experiment);
        self.tests.insert(name.into(), experiment);
    }

    /// Unregisters and returns the experiment stored under `name`; a missing
    /// name yields `None`. Iteration order of the remaining members is
    /// preserved.
    pub fn remove(&mut self, name: &str) -> Option<Experiment> {
        self.tests.shift_remove(name)
    }

    /// Returns how many experiments are registered.
    pub fn len(&self) -> usize {
        self.tests.len()
    }

    /// Checks whether the registry holds no experiments.
    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// Iterates over `(registration_key, experiment)` pairs in insertion
    /// order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Experiment)> {
        self.tests.iter().map(|(name, test)| (name.as_str(), test))
    }

    /// Iterates mutably over the registered experiments in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Experiment)> {
        self.tests
            .iter_mut()
            .map(|(name, test)| (name.as_str(), test))
    }

    fn inject_seed(&self, experiment: &mut Experiment) {
        if let Some(global_seed) = self.global_seed {
            experiment.set_seed(derive_seed(global_seed, experiment.name()));
        }
    }
}
