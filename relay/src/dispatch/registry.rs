//! Implementation registry.
//!
//! Maps type tokens to implementations. Owned exclusively by one
//! [`GenericFn`](super::GenericFn); the root key is always present (it holds
//! the wrapped default body), so every receiver has at least one candidate.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use thiserror::Error;

use super::result::Outcome;
use crate::graph::{TypeGraph, TypeToken};

/// Shared implementation callable: full argument list in, outcome out.
pub type ImplFn<A, R> = Arc<dyn Fn(&[A]) -> Outcome<R> + Send + Sync>;

/// Registration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The registration key is not a type the graph knows.
    #[error("invalid registration key: type token {0:?} is not defined in the dispatch graph")]
    UnknownType(TypeToken),

    /// No key was given and the implementation declares none.
    #[error(
        "invalid registration: implementation declares no dispatch key; \
         use `register(token, f)` or `Implementation::new(f).for_type(token)`"
    )]
    MissingKey,
}

/// Registration result type.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// A registrable implementation.
///
/// May carry its own dispatch key (the registration convenience that
/// otherwise requires an explicit type argument) and an abstract marker
/// that [`GenericFn`](super::GenericFn) surfaces when this is the default.
pub struct Implementation<A, R> {
    func: ImplFn<A, R>,
    declared_key: Option<TypeToken>,
    is_abstract: bool,
}

impl<A, R> Implementation<A, R> {
    /// Wraps a callable with no declared key.
    pub fn new(func: impl Fn(&[A]) -> Outcome<R> + Send + Sync + 'static) -> Self {
        Self {
            func: Arc::new(func),
            declared_key: None,
            is_abstract: false,
        }
    }

    /// Declares the dispatch key this implementation handles.
    pub fn for_type(mut self, key: TypeToken) -> Self {
        self.declared_key = Some(key);
        self
    }

    /// Marks the implementation abstract, for abstract-method tooling.
    pub fn abstract_marker(mut self, is_abstract: bool) -> Self {
        self.is_abstract = is_abstract;
        self
    }

    /// The declared dispatch key, if any.
    pub fn declared_key(&self) -> Option<TypeToken> {
        self.declared_key
    }

    /// Whether this implementation is marked abstract.
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    pub(crate) fn into_func(self) -> ImplFn<A, R> {
        self.func
    }
}

impl<A, R> fmt::Debug for Implementation<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Implementation")
            .field("declared_key", &self.declared_key)
            .field("is_abstract", &self.is_abstract)
            .finish_non_exhaustive()
    }
}

/// The type-keyed implementation table.
///
/// Insertion order is irrelevant to dispatch; the last registration for a
/// key wins.
pub(crate) struct Registry<A, R> {
    entries: IndexMap<TypeToken, ImplFn<A, R>>,
}

impl<A, R> Registry<A, R> {
    /// Creates a registry holding the default implementation under the root.
    pub(crate) fn new(default: ImplFn<A, R>) -> Self {
        let mut entries = IndexMap::new();
        entries.insert(TypeGraph::ROOT, default);
        Self { entries }
    }

    /// Stores an implementation, overwriting any prior entry for the key.
    pub(crate) fn insert(&mut self, key: TypeToken, func: ImplFn<A, R>) {
        self.entries.insert(key, func);
    }

    pub(crate) fn get(&self, key: TypeToken) -> Option<&ImplFn<A, R>> {
        self.entries.get(&key)
    }

    pub(crate) fn keys(&self) -> Vec<TypeToken> {
        self.entries.keys().copied().collect()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
