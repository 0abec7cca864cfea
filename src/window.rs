//! The rolling number window.
//!
//! A [`Window`] is an ordered, duplicate-free sequence of integers (oldest
//! first) that never holds more than its [`Capacity`].  It is a plain value:
//! [`merge`] and [`set_capacity`] take a window by reference and hand back new
//! ones, so the caller decides what to keep.
//!
//! ## Merge rule
//!
//! For every incoming value, in arrival order:
//!
//! 1. values already in the window are skipped (the existing occurrence keeps
//!    its position);
//! 2. if the window is full, the oldest element is evicted (one eviction per
//!    insertion);
//! 3. the value is appended.
//!
//! Duplicate detection is a linear scan.  That is fine for the tens of
//! elements this is used with; a large capacity would want a companion set.

use std::collections::VecDeque;
use std::fmt;
use std::num::NonZeroUsize;

use serde::Serialize;

/// Window size used when nothing else is configured.
pub const DEFAULT_CAPACITY: Capacity = Capacity(match NonZeroUsize::new(10) {
    Some(n) => n,
    None => unreachable!(),
});

/// Maximum number of elements a [`Window`] may hold.  Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Capacity(NonZeroUsize);

impl Capacity {
    /// Returns `None` for zero.
    pub fn new(n: usize) -> Option<Self> {
        NonZeroUsize::new(n).map(Self)
    }

    pub fn get(self) -> usize {
        self.0.get()
    }

    /// One larger, saturating at `usize::MAX`.
    pub fn grow(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// One smaller, never below 1.
    pub fn shrink(self) -> Self {
        Self::new(self.get() - 1).unwrap_or(self)
    }
}

impl Default for Capacity {
    fn default() -> Self {
        DEFAULT_CAPACITY
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Bounded, insertion-ordered, duplicate-free sequence of integers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct Window {
    values: VecDeque<i64>,
    #[serde(skip)]
    capacity: Capacity,
}

impl Window {
    /// An empty window with the given capacity.
    pub fn new(capacity: Capacity) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity.get().min(1024)),
            capacity,
        }
    }

    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, value: i64) -> bool {
        self.values.contains(&value)
    }

    /// Values from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.values.iter().copied()
    }

    #[cfg(test)]
    pub fn to_vec(&self) -> Vec<i64> {
        self.iter().collect()
    }

    /// Render as a JSON array, e.g. `[2,3,5]`.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "[]".into())
    }

    /// Insert one value under the merge rule.  Returns the evicted value, if
    /// any; a duplicate is a no-op.
    fn push(&mut self, value: i64) -> Option<i64> {
        if self.contains(value) {
            return None;
        }
        let evicted = if self.values.len() >= self.capacity.get() {
            self.values.pop_front()
        } else {
            None
        };
        self.values.push_back(value);
        evicted
    }
}

/// Result of one [`merge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merge {
    /// The window exactly as it was before the batch was applied.
    pub previous: Window,
    /// The window after the batch was applied.
    pub current: Window,
    /// Values removed from the head, oldest first.
    pub evicted: Vec<i64>,
}

/// Apply `batch` to `window` under the merge rule.
///
/// `window` itself is left untouched; both the before and after states are
/// returned.
pub fn merge(window: &Window, batch: &[i64]) -> Merge {
    let previous = window.clone();
    let mut current = window.clone();
    let evicted = batch.iter().filter_map(|&v| current.push(v)).collect();

    Merge {
        previous,
        current,
        evicted,
    }
}

/// Change the capacity of `window`.
///
/// Shrinking keeps the most recent `capacity` elements.  Growing only raises
/// the eviction threshold for later merges.
pub fn set_capacity(window: &Window, capacity: Capacity) -> Window {
    let mut values = window.values.clone();
    let excess = values.len().saturating_sub(capacity.get());
    values.drain(..excess);
    Window { values, capacity }
}
