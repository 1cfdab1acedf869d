//! Sorted key/value stores for functional dose-volume measures.
//!
//! A store maps a parameter (a dose for Vx, a volume for the other measures)
//! to the measured value. Exact lookup compares keys bit for bit; the
//! nearest-key lookup is a separate, explicit operation.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use dose_common::{DoseEvalError, DoseEvalResult};

/// Result of a lookup together with the key that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasureValue {
    pub key: f64,
    pub value: f64,
}

/// Measure values keyed by parameter, in ascending key order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionalMeasureStore {
    entries: Vec<(f64, f64)>,
}

impl FunctionalMeasureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from `(key, value)` pairs. Later duplicates replace
    /// earlier ones.
    pub fn from_entries<I>(entries: I) -> DoseEvalResult<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut store = Self::new();
        for (key, value) in entries {
            store.insert(key, value)?;
        }
        Ok(store)
    }

    /// Insert or replace the value for `key`. Returns the replaced value.
    ///
    /// Fails with `InvalidParameter` for a NaN key.
    pub fn insert(&mut self, key: f64, value: f64) -> DoseEvalResult<Option<f64>> {
        if key.is_nan() {
            return Err(DoseEvalError::invalid_parameter("measure key must not be NaN"));
        }
        match self.search(key) {
            Ok(i) => Ok(Some(std::mem::replace(&mut self.entries[i].1, value))),
            Err(i) => {
                self.entries.insert(i, (key, value));
                Ok(None)
            }
        }
    }

    fn search(&self, key: f64) -> Result<usize, usize> {
        self.entries.binary_search_by(|(k, _)| k.total_cmp(&key))
    }

    /// Value stored for exactly `key`.
    pub fn get(&self, key: f64) -> Option<f64> {
        self.search(key).ok().map(|i| self.entries[i].1)
    }

    /// Entry whose key is closest to `key`.
    ///
    /// Keys are walked in ascending order while the distance to `key`
    /// decreases; the walk stops at the first key that is not closer than
    /// its predecessor. Equidistant neighbours resolve to the lower key, a
    /// query past either end resolves to the first or last key.
    pub fn nearest(&self, key: f64) -> DoseEvalResult<MeasureValue> {
        if key.is_nan() {
            return Err(DoseEvalError::invalid_parameter("measure key must not be NaN"));
        }
        let mut best: Option<(usize, f64)> = None;
        for (i, (k, _)) in self.entries.iter().enumerate() {
            let distance = (k - key).abs();
            match best {
                Some((_, d)) if distance.partial_cmp(&d) != Some(Ordering::Less) => break,
                _ => best = Some((i, distance)),
            }
        }
        let (i, _) = best.ok_or_else(|| DoseEvalError::data_unavailable("measure store is empty"))?;
        let (key, value) = self.entries[i];
        Ok(MeasureValue { key, value })
    }

    /// Value for `key`, falling back to the nearest key if `find_nearest`.
    ///
    /// # Errors
    /// * `DataUnavailable` if the store is empty, or if `key` is not stored
    ///   and `find_nearest` is false
    pub fn query(&self, key: f64, find_nearest: bool) -> DoseEvalResult<MeasureValue> {
        if let Some(value) = self.get(key) {
            return Ok(MeasureValue { key, value });
        }
        if self.entries.is_empty() {
            return Err(DoseEvalError::data_unavailable("measure store is empty"));
        }
        if find_nearest {
            self.nearest(key)
        } else {
            Err(DoseEvalError::data_unavailable(format!(
                "no measure value stored for {}",
                key
            )))
        }
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = f64> + '_ {
        self.entries.iter().map(|(k, _)| *k)
    }

    /// `(key, value)` pairs in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
