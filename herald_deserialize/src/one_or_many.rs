use serde::Deserialize;
use std::collections::BTreeSet;
use std::vec::IntoIter;

/// Represents a deserializable collection of `T` that may also be given as a
/// single bare `T`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    /// A single instance of `T`.
    One(T),
    /// A collection of `T`.
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// Returns the number of elements, regardless of representation.
    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(many) => many.len(),
        }
    }

    /// Reports whether this collection holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl<T> IntoIterator for OneOrMany<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        Vec::from(self).into_iter()
    }
}

impl<T> From<OneOrMany<T>> for Vec<T> {
    fn from(value: OneOrMany<T>) -> Self {
        match value {
            OneOrMany::One(one) => vec![one],
            OneOrMany::Many(many) => many,
        }
    }
}

impl<T> From<OneOrMany<T>> for BTreeSet<T>
where
    T: Ord,
{
    fn from(value: OneOrMany<T>) -> Self {
        value.into_iter().collect()
    }
}
