//! Paginated list responses

use serde::{Deserialize, Serialize};

/// One page of a paginated list response
///
/// Entities embedded in `results` are complete and can be primed into a
/// scope so later lookups by URL skip the remote call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<E> {
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<E>,
}

impl<E> Page<E> {
    pub fn new(results: Vec<E>) -> Self {
        Self {
            count: results.len(),
            next: None,
            previous: None,
            results,
        }
    }

    pub fn with_next(mut self, next: impl Into<String>) -> Self {
        self.next = Some(next.into());
        self
    }

    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }
}

impl<E> Default for Page<E> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
