//! Ordered results of a multi-key load

use super::DomainError;

/// Per-key outcomes of a multi-key load, in input order
///
/// There is exactly one slot per requested key, duplicates included. Failed
/// slots carry their own error; they never abort the rest of the load.
#[derive(Debug, Clone)]
pub struct LoadResults<E> {
    results: Vec<Result<E, DomainError>>,
}

impl<E> LoadResults<E> {
    pub fn new(results: Vec<Result<E, DomainError>>) -> Self {
        Self { results }
    }

    /// Successfully loaded entities, in order, with failed slots dropped
    pub fn without_errors(&self) -> Vec<E>
    where
        E: Clone,
    {
        self.results
            .iter()
            .filter_map(|r| r.as_ref().ok().cloned())
            .collect()
    }

    /// Consuming variant of [`Self::without_errors`]
    pub fn into_entities(self) -> Vec<E> {
        self.results.into_iter().filter_map(Result::ok).collect()
    }

    /// Errors of the failed slots, in order
    pub fn errors(&self) -> Vec<&DomainError> {
        self.results.iter().filter_map(|r| r.as_ref().err()).collect()
    }

    pub fn has_errors(&self) -> bool {
        self.results.iter().any(Result::is_err)
    }

    pub fn get(&self, index: usize) -> Option<&Result<E, DomainError>> {
        self.results.get(index)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Result<E, DomainError>> {
        self.results.iter()
    }

    pub fn into_inner(self) -> Vec<Result<E, DomainError>> {
        self.results
    }
}

impl<E> Default for LoadResults<E> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<E> FromIterator<Result<E, DomainError>> for LoadResults<E> {
    fn from_iter<I: IntoIterator<Item = Result<E, DomainError>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<E> IntoIterator for LoadResults<E> {
    type Item = Result<E, DomainError>;
    type IntoIter = std::vec::IntoIter<Result<E, DomainError>>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

impl<'a, E> IntoIterator for &'a LoadResults<E> {
    type Item = &'a Result<E, DomainError>;
    type IntoIter = std::slice::Iter<'a, Result<E, DomainError>>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}
