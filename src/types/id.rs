// ABOUTME: Phantom-typed identifiers for daemon objects.
// ABOUTME: Keeps container IDs and image IDs from being swapped by accident.

use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Marker types for phantom type parameters.
pub enum ContainerMarker {}
pub enum ImageMarker {}

/// Length of the abbreviated ID form shown by `docker ps`.
const SHORT_LEN: usize = 12;

/// A daemon identifier tagged with the kind of object it names.
///
/// A `ContainerId` can't be passed where an `ImageId` is expected, even though
/// both are plain strings on the wire.
#[must_use = "IDs reference daemon objects and should not be ignored"]
pub struct Id<T> {
    value: String,
    _marker: PhantomData<T>,
}

impl<T> Id<T> {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Abbreviated form, without any `sha256:` algorithm prefix.
    pub fn short(&self) -> &str {
        let hex = self
            .value
            .split_once(':')
            .map(|(_, rest)| rest)
            .unwrap_or(&self.value);
        match hex.char_indices().nth(SHORT_LEN) {
            Some((end, _)) => &hex[..end],
            None => hex,
        }
    }

    /// True if `prefix` abbreviates this ID. Empty prefixes never match.
    pub fn matches_prefix(&self, prefix: &str) -> bool {
        !prefix.is_empty() && self.value.starts_with(prefix)
    }
}

// T is only a marker, so these impls must not require T: Trait.

impl<T> std::fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Id").field(&self.value).finish()
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        Self::new(self.value.clone())
    }
}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for Id<T> {}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T> std::fmt::Display for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

pub type ContainerId = Id<ContainerMarker>;
pub type ImageId = Id<ImageMarker>;
