//! A single fitted piece of the PLR model.

use serde::{Deserialize, Serialize};

use crate::key::{key_to_f64, Key};
use crate::search::KeyBounded;

/// Tolerance used when comparing the real-valued fields of two segments.
pub const DELTA: f64 = 0.005;

/// One linear piece: for keys in `[x_start, x_end)` the predicted position is
/// `slope * key + intercept`.
///
/// `x_end` is only tracked by the ranged blob layout; segments decoded from a
/// compact blob have no end key and extend up to the next segment's start.
///
/// Equality is approximate: keys must match exactly, while `slope` and
/// `intercept` may differ by less than [`DELTA`]. This is meant for checking
/// round trips, not for ordering or hashing.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Segment<K> {
    pub x_start: K,
    pub x_end: Option<K>,
    pub slope: f64,
    pub intercept: f64,
}

impl<K> Segment<K> {
    /// A segment without an end key.
    pub fn new(x_start: K, slope: f64, intercept: f64) -> Self {
        Self {
            x_start,
            x_end: None,
            slope,
            intercept,
        }
    }

    pub fn with_end(x_start: K, x_end: K, slope: f64, intercept: f64) -> Self {
        Self {
            x_start,
            x_end: Some(x_end),
            slope,
            intercept,
        }
    }
}

impl<K: Key> Segment<K> {
    /// Predicted position of `key` under this segment's line.
    pub fn predict(&self, key: K) -> f64 {
        self.slope * key_to_f64(key) + self.intercept
    }

    /// Whether `key` falls in `[x_start, x_end)`. Without an end key every key
    /// at or after the start is covered.
    pub fn covers(&self, key: K) -> bool {
        key >= self.x_start && self.x_end.map_or(true, |end| key < end)
    }
}

impl<K: PartialEq> PartialEq for Segment<K> {
    fn eq(&self, other: &Self) -> bool {
        self.x_start == other.x_start
            && self.x_end == other.x_end
            && (self.slope - other.slope).abs() < DELTA
            && (self.intercept - other.intercept).abs() < DELTA
    }
}

impl<K> KeyBounded<K> for Segment<K> {
    fn lower_bound(&self) -> &K {
        &self.x_start
    }
}
