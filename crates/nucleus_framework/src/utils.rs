//! # Utility Functions
//!
//! Small helpers shared across the framework.
//!
//! ## Key Items
//!
//! - [`current_timestamp()`] - Consistent timestamp generation
//! - [`ElementCounter`] - Reference counting of hashable elements

use std::collections::HashMap;
use std::hash::Hash;

// ============================================================================
// Utility Functions
// ============================================================================

/// Returns the current Unix timestamp in seconds.
///
/// A clock set before the Unix epoch yields `0` instead of panicking.
pub fn current_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Lower-cases and trims a user supplied name so it can be used as a map key.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

// ============================================================================
// Element Counter
// ============================================================================

/// Counts how many times each element has been added.
///
/// An element whose count drops to zero is removed, so [`ElementCounter::elements`]
/// only ever yields elements that are currently referenced.
///
/// # Examples
///
/// ```rust
/// use nucleus_framework::utils::ElementCounter;
///
/// let mut counter = ElementCounter::new();
/// counter.add("world");
/// counter.add("world");
/// counter.subtract(&"world");
/// assert_eq!(counter.count(&"world"), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ElementCounter<T: Eq + Hash> {
    counts: HashMap<T, usize>,
}

impl<T: Eq + Hash + Clone> ElementCounter<T> {
    pub fn new() -> Self {
        Self {
            counts: HashMap::new(),
        }
    }

    /// Increments the count of `element` and returns the new count.
    pub fn add(&mut self, element: T) -> usize {
        let count = self.counts.entry(element).or_insert(0);
        *count += 1;
        *count
    }

    /// Decrements the count of `element` and returns the new count.
    ///
    /// Subtracting an element that is not counted is a no-op.
    pub fn subtract(&mut self, element: &T) -> usize {
        match self.counts.get_mut(element) {
            Some(count) if *count > 1 => {
                *count -= 1;
                *count
            }
            Some(_) => {
                self.counts.remove(element);
                0
            }
            None => 0,
        }
    }

    pub fn count(&self, element: &T) -> usize {
        self.counts.get(element).copied().unwrap_or(0)
    }

    pub fn contains(&self, element: &T) -> bool {
        self.counts.contains_key(element)
    }

    /// Snapshot of the elements with a non-zero count.
    pub fn elements(&self) -> Vec<T> {
        self.counts.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl<T: Eq + Hash + Clone> Default for ElementCounter<T> {
    fn default() -> Self {
        Self::new()
    }
}
