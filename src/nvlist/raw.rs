//! Backing storage of an attribute list.
//!
//! A `RawList` is the unit of storage exchanged with the storage subsystem.
//! Lists it hands over may carry a release hook (its deallocator); the hook
//! runs exactly once, when whichever owner currently holds the storage drops it.

use std::fmt;

use crate::error::NvResult;
use crate::value::AttributeValue;

/// Deallocator attached to foreign storage.
pub type ReleaseHook = Box<dyn FnOnce() + Send>;

/// One stored entry.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPair {
    /// Entry key.
    pub name: String,
    /// Tagged value.
    pub value: AttributeValue,
}

impl RawPair {
    /// Creates a pair.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Allocated list storage.
///
/// Unlike lists built through [`crate::AttributeList`], storage assembled
/// here may contain duplicate keys.
#[derive(Default)]
pub struct RawList {
    pub(crate) pairs: Vec<RawPair>,
    release: Option<ReleaseHook>,
}

impl RawList {
    /// Creates empty storage with no release hook.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates storage holding `pairs` in the given order.
    #[must_use]
    pub fn from_pairs(pairs: Vec<RawPair>) -> Self {
        Self {
            pairs,
            release: None,
        }
    }

    /// Attaches the deallocator to run when this storage is released.
    #[must_use]
    pub fn with_release(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.release = Some(Box::new(hook));
        self
    }

    /// Returns true if a release hook is attached.
    #[must_use]
    pub fn has_release_hook(&self) -> bool {
        self.release.is_some()
    }

    /// Entries in insertion order.
    #[must_use]
    pub fn pairs(&self) -> &[RawPair] {
        &self.pairs
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Deep copy of the entries. The copy is owned by this crate and carries no hook.
    pub(crate) fn try_clone(&self) -> NvResult<Self> {
        let mut pairs = Vec::new();
        pairs.try_reserve_exact(self.pairs.len())?;
        for pair in &self.pairs {
            let mut name = String::new();
            name.try_reserve_exact(pair.name.len())?;
            name.push_str(&pair.name);
            pairs.push(RawPair {
                name,
                value: pair.value.try_clone()?,
            });
        }
        Ok(Self::from_pairs(pairs))
    }
}

impl Clone for RawList {
    fn clone(&self) -> Self {
        Self::from_pairs(self.pairs.clone())
    }
}

impl fmt::Debug for RawList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawList")
            .field("pairs", &self.pairs)
            .field("release_hook", &self.release.is_some())
            .finish()
    }
}

impl Drop for RawList {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}
