//! Weighted experiment entity with run-once resolution semantics.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{AllotError, ErrorInfo};
use crate::rng::RngHandle;

/// A named split test: an ordered set of weighted variations that resolves
/// to exactly one of them, at most once per instance.
///
/// Weights are absolute, not percentages; `a: 100, b: 100` gives both
/// variations a 50% share. Insertion order of the weight mapping is
/// significant: it is both the iteration order of the cumulative draw and
/// the variation served while the experiment is disabled.
///
/// The chosen variation is drawn lazily on the first [`Experiment::variation`]
/// call (or eagerly via [`Experiment::resolve`]) and is then fixed for the
/// lifetime of the instance, regardless of later weight, seed, or flag
/// mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experiment {
    name: String,
    weights: IndexMap<String, i64>,
    weight_sum: i64,
    enabled: bool,
    resolved: Option<String>,
    has_resolved: bool,
    seed: Option<u64>,
    metadata: BTreeMap<String, Value>,
}

impl Experiment {
    /// Creates an experiment with the given name and weight mapping.
    ///
    /// The experiment starts enabled, unresolved and unseeded. Fails with a
    /// [`AllotError::Validation`] if any weight is negative.
    pub fn new<N, K, I>(name: N, weights: I) -> Result<Self, AllotError>
    where
        N: Into<String>,
        K: Into<String>,
        I: IntoIterator<Item = (K, i64)>,
    {
        Self::with_metadata(name, weights, BTreeMap::new())
    }

    /// Creates an experiment carrying opaque metadata for the caller's side
    /// channels. The metadata is never consulted by the draw.
    pub fn with_metadata<N, K, I>(
        name: N,
        weights: I,
        metadata: BTreeMap<String, Value>,
    ) -> Result<Self, AllotError>
    where
        N: Into<String>,
        K: Into<String>,
        I: IntoIterator<Item = (K, i64)>,
    {
        let name = name.into();
        let weights: IndexMap<String, i64> = weights
            .into_iter()
            .map(|(key, weight)| (key.into(), weight))
            .collect();
        let weight_sum = validate_weights(&name, &weights)?;
        Ok(Self {
            name,
            weights,
            weight_sum,
            enabled: true,
            resolved: None,
            has_resolved: false,
            seed: None,
            metadata,
        })
    }

    /// Returns the name of the experiment.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns how many variations the experiment contains.
    pub fn variation_count(&self) -> usize {
        self.weights.len()
    }

    /// Returns the weight mapping in insertion order.
    pub fn weights(&self) -> &IndexMap<String, i64> {
        &self.weights
    }

    /// Replaces the weight mapping.
    ///
    /// Every weight must be non-negative; on a [`AllotError::Validation`]
    /// failure the previous mapping and its cached sum are left untouched.
    /// The cached sum is recomputed together with the assignment, so it is
    /// never observed stale. Replacing weights after resolution is accepted
    /// but has no effect on the already-resolved variation.
    pub fn set_weights<K, I>(&mut self, weights: I) -> Result<(), AllotError>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, i64)>,
    {
        let weights: IndexMap<String, i64> = weights
            .into_iter()
            .map(|(key, weight)| (key.into(), weight))
            .collect();
        let weight_sum = validate_weights(&self.name, &weights)?;
        self.weights = weights;
        self.weight_sum = weight_sum;
        Ok(())
    }

    /// Returns the cached sum of all variation weights.
    pub fn weight_sum(&self) -> i64 {
        self.weight_sum
    }

    /// Returns the seed, if one was assigned before resolution.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Assigns the seed that makes the draw reproducible.
    ///
    /// Ignored once the experiment has resolved, so that an assignment
    /// already made keeps its reproducibility.
    pub fn set_seed(&mut self, seed: u64) {
        if !self.has_resolved {
            self.seed = Some(seed);
        }
    }

    /// Disables the experiment: while disabled it always serves its first
    /// declared variation, bypassing the draw. Useful to exclude a request
    /// (e.g. a bot) from a test without touching its configuration.
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Checks whether the experiment is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Checks whether the experiment is disabled.
    pub fn is_disabled(&self) -> bool {
        !self.enabled
    }

    /// Checks whether the experiment has resolved.
    pub fn has_resolved(&self) -> bool {
        self.has_resolved
    }

    /// Returns the resolved variation without forcing resolution.
    pub fn resolved(&self) -> Option<&str> {
        self.resolved.as_deref()
    }

    /// Returns the caller metadata attached to the experiment.
    pub fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }

    /// Replaces the caller metadata wholesale.
    pub fn set_metadata(&mut self, metadata: BTreeMap<String, Value>) {
        self.metadata = metadata;
    }

    /// Returns a single metadata value; an absent key yields `None`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// Stores a single metadata value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// Runs the draw, fixing the chosen variation for the lifetime of the
    /// instance. Calling again once resolved is a no-op.
    ///
    /// A seeded experiment draws through a deterministic generator built
    /// from its seed; an unseeded one draws from entropy. Either way the
    /// generator is scoped to this call. The draw picks `r` uniformly in
    /// `[1, weight_sum]` and walks the mapping in insertion order until the
    /// running sum reaches `r`; zero-weight variations are never chosen.
    ///
    /// Fails with [`AllotError::Config`] when there is no drawable weight
    /// mass: an empty mapping, or a mapping whose weights sum to zero.
    pub fn resolve(&mut self) -> Result<(), AllotError> {
        if self.has_resolved {
            return Ok(());
        }
        if self.weights.is_empty() {
            return Err(no_variations(&self.name));
        }
        if self.weight_sum == 0 {
            return Err(AllotError::Config(
                ErrorInfo::new(
                    "experiment-zero-weight",
                    "cannot run a test whose weights sum to zero",
                )
                .with_context("experiment", &self.name)
                .with_hint("give at least one variation a positive weight"),
            ));
        }
        self.has_resolved = true;
        let mut rng = match self.seed {
            Some(seed) => RngHandle::from_seed(seed),
            None => RngHandle::from_entropy(),
        };
        let draw = rng.gen_range(1..=self.weight_sum);
        let mut running = 0i64;
        for (key, weight) in &self.weights {
            running += *weight;
            if running >= draw {
                self.resolved = Some(key.clone());
                break;
            }
        }
        Ok(())
    }

    /// Returns the variation assigned to this request.
    ///
    /// A disabled experiment always yields its first declared variation,
    /// even one with weight zero; that path consumes no randomness, ignores
    /// the seed and leaves the resolution state untouched. Otherwise the
    /// experiment resolves lazily, at most once, and every later call
    /// returns the cached choice.
    pub fn variation(&mut self) -> Result<&str, AllotError> {
        if self.is_disabled() {
            return match self.weights.keys().next() {
                Some(first) => Ok(first.as_str()),
                None => Err(no_variations(&self.name)),
            };
        }
        self.resolve()?;
        match self.resolved.as_deref() {
            Some(chosen) => Ok(chosen),
            None => Err(no_variations(&self.name)),
        }
    }
}

fn validate_weights(name: &str, weights: &IndexMap<String, i64>) -> Result<i64, AllotError> {
    let mut sum = 0i64;
    for (variation, weight) in weights {
        if *weight < 0 {
            return Err(AllotError::Validation(
                ErrorInfo::new(
                    "experiment-negative-weight",
                    "variation weights must be non-negative integers",
                )
                .with_context("experiment", name)
                .with_context("variation", variation)
                .with_context("weight", weight.to_string()),
            ));
        }
        sum += *weight;
    }
    Ok(sum)
}

fn no_variations(name: &str) -> AllotError {
    AllotError::Config(
        ErrorInfo::new(
            "experiment-no-variations",
            "cannot run a test with no variations",
        )
        .with_context("experiment", name)
        .with_hint("declare at least one weighted variation before resolving"),
    )
}
