//! Growable dense storage with an explicit capacity policy
//!
//! Meshes and per-frame requests live in [`DenseVec`]s. The vector tracks its
//! own logical capacity so growth is deterministic: nothing is allocated until
//! the first insert, the first allocation holds `initial` elements and every
//! later growth multiplies the capacity by `numerator / denominator`.

use thiserror::Error;

/// Storage errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("failed to grow storage to {requested} elements of {element_size} bytes")]
    Allocation {
        requested: usize,
        element_size: usize,
    },
}

/// How a [`DenseVec`] grows when full
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrowthPolicy {
    pub initial: usize,
    pub numerator: usize,
    pub denominator: usize,
}

impl GrowthPolicy {
    /// Initial capacity 10, growth factor 1.5
    pub const DEFAULT: Self = Self {
        initial: 10,
        numerator: 3,
        denominator: 2,
    };

    /// Capacity after one growth step from `current`.
    ///
    /// Always strictly larger than `current`.
    pub fn next_capacity(&self, current: usize) -> usize {
        if current == 0 {
            return self.initial.max(1);
        }
        let grown = current.saturating_mul(self.numerator) / self.denominator.max(1);
        grown.max(current + 1)
    }
}

impl Default for GrowthPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Append-only vector with policy-driven growth.
///
/// Elements are only ever appended or cleared all at once; indices handed out
/// by [`DenseVec::push`] are dense and stable until [`DenseVec::clear`].
#[derive(Debug, Clone)]
pub struct DenseVec<T> {
    items: Vec<T>,
    capacity: usize,
    policy: GrowthPolicy,
}

impl<T> Default for DenseVec<T> {
    fn default() -> Self {
        Self::new(GrowthPolicy::DEFAULT)
    }
}

impl<T> DenseVec<T> {
    pub fn new(policy: GrowthPolicy) -> Self {
        Self {
            items: Vec::new(),
            capacity: 0,
            policy,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Logical capacity under the growth policy
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy(&self) -> GrowthPolicy {
        self.policy
    }

    /// Makes room for one more element, growing once if full.
    ///
    /// Returns whether a growth happened. On failure nothing changes.
    pub fn reserve_one(&mut self) -> Result<bool, CoreError> {
        if self.items.len() < self.capacity {
            return Ok(false);
        }

        let new_capacity = self.policy.next_capacity(self.capacity);
        self.items
            .try_reserve_exact(new_capacity - self.items.len())
            .map_err(|_| CoreError::Allocation {
                requested: new_capacity,
                element_size: std::mem::size_of::<T>(),
            })?;
        self.capacity = new_capacity;
        Ok(true)
    }

    /// Appends an element and returns its index
    pub fn push(&mut self, item: T) -> Result<usize, CoreError> {
        self.reserve_one()?;
        let index = self.items.len();
        self.items.push(item);
        Ok(index)
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Drops every element; capacity and backing storage are kept
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<'a, T> IntoIterator for &'a DenseVec<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
