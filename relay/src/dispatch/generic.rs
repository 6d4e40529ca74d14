//! Generic function dispatcher.
//!
//! [`GenericFn`] wraps a default implementation and dispatches calls on the
//! run-time type of the first argument, walking the resolved candidate
//! order until one implementation produces a real result.
//!
//! Resolved orders are cached per receiver type. A cache entry is tagged
//! with the graph version at computation time and discarded once the graph
//! has moved on; any registration clears the whole cache, since a new key
//! can change any receiver's order. Registry and cache share one mutex so
//! a resolved order is always consistent with the registry it indexes into;
//! user implementations run outside the lock.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use super::linearize::candidate_order;
use super::registry::{ImplFn, Implementation, Registry, RegistryError, RegistryResult};
use super::result::{DispatchError, DispatchResult, Outcome};
use crate::graph::{TypeGraph, TypeToken, Typed};

struct CachedOrder {
    order: Arc<[TypeToken]>,
    /// Graph version when the order was computed.
    version: u64,
}

struct DispatchState<A, R> {
    registry: Registry<A, R>,
    cache: FxHashMap<TypeToken, CachedOrder>,
}

/// A single-dispatch generic function with fall-through.
///
/// The wrapped default implementation acts as the root candidate; further
/// implementations are attached with [`register`](Self::register). Calls
/// dispatch on the first argument's type and fall through past any
/// candidate that returns [`Outcome::Decline`].
pub struct GenericFn<A, R> {
    name: String,
    graph: Arc<TypeGraph>,
    is_abstract: bool,
    state: Mutex<DispatchState<A, R>>,
}

impl<A, R> GenericFn<A, R> {
    /// Wraps `default` as a generic function dispatching over `graph`.
    pub fn new(
        name: impl Into<String>,
        graph: Arc<TypeGraph>,
        default: Implementation<A, R>,
    ) -> Self {
        let is_abstract = default.is_abstract();
        Self {
            name: name.into(),
            graph,
            is_abstract,
            state: Mutex::new(DispatchState {
                registry: Registry::new(default.into_func()),
                cache: FxHashMap::default(),
            }),
        }
    }

    /// The generic function's name, used in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the wrapped default carries the abstract marker.
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// The graph this function dispatches over.
    pub fn graph(&self) -> &Arc<TypeGraph> {
        &self.graph
    }

    /// Registers an implementation for an explicit type key.
    ///
    /// Overwrites any prior implementation for that exact key and clears
    /// the dispatch cache. Returns the stored callable, so one
    /// implementation can be reused under further keys.
    pub fn register(
        &self,
        key: TypeToken,
        func: impl Fn(&[A]) -> Outcome<R> + Send + Sync + 'static,
    ) -> RegistryResult<ImplFn<A, R>> {
        self.register_impl(Implementation::new(func).for_type(key))
    }

    /// Registers an [`Implementation`], using its declared key.
    pub fn register_impl(&self, imp: Implementation<A, R>) -> RegistryResult<ImplFn<A, R>> {
        let key = imp.declared_key().ok_or(RegistryError::MissingKey)?;
        if !self.graph.contains(key) {
            return Err(RegistryError::UnknownType(key));
        }
        let func = imp.into_func();
        let mut state = self.state.lock();
        state.registry.insert(key, Arc::clone(&func));
        state.cache.clear();
        debug!(
            function = %self.name,
            ?key,
            "registered implementation; dispatch cache cleared"
        );
        Ok(func)
    }

    /// The resolved candidate order for a receiver type, most specific
    /// first.
    ///
    /// Runs the same resolution (and cache) the call path uses, so it is
    /// where [`DispatchError::Ambiguous`] first surfaces for a receiver.
    pub fn dispatch(&self, receiver: TypeToken) -> DispatchResult<Vec<TypeToken>> {
        let mut state = self.state.lock();
        self.resolve_locked(&mut state, receiver)
            .map(|order| order.to_vec())
    }

    fn resolve_locked(
        &self,
        state: &mut DispatchState<A, R>,
        receiver: TypeToken,
    ) -> DispatchResult<Arc<[TypeToken]>> {
        // The version is read before linearizing: an entry tagged with an
        // older version than the graph's current one is never trusted.
        let version = self.graph.version();
        if let Some(entry) = state.cache.get(&receiver) {
            if entry.version == version {
                trace!(function = %self.name, ?receiver, "dispatch cache hit");
                return Ok(Arc::clone(&entry.order));
            }
            trace!(
                function = %self.name,
                ?receiver,
                stale = entry.version,
                current = version,
                "dispatch cache entry stale"
            );
        }

        let keys = state.registry.keys();
        let order: Arc<[TypeToken]> = candidate_order(&self.graph, receiver, &keys)?.into();
        state.cache.insert(
            receiver,
            CachedOrder {
                order: Arc::clone(&order),
                version,
            },
        );
        debug!(function = %self.name, ?receiver, ?order, "resolved candidate order");
        Ok(order)
    }

    /// Invokes the generic function.
    ///
    /// Dispatches on the first argument's type; every candidate receives
    /// the full argument list. Candidates returning [`Outcome::Decline`]
    /// are skipped in favor of the next most specific one.
    pub fn call(&self, args: &[A]) -> DispatchResult<R>
    where
        A: Typed + fmt::Debug,
    {
        let first = args.first().ok_or_else(|| DispatchError::InvalidCall {
            name: self.name.clone(),
        })?;
        let receiver = first.type_token();

        // Order and implementations are snapshotted under one lock
        // acquisition so they reflect a single registry state.
        let candidates: Vec<(TypeToken, ImplFn<A, R>)> = {
            let mut state = self.state.lock();
            let order = self.resolve_locked(&mut state, receiver)?;
            order
                .iter()
                .filter_map(|&token| {
                    state
                        .registry
                        .get(token)
                        .map(|func| (token, Arc::clone(func)))
                })
                .collect()
        };

        for (token, func) in candidates {
            match func(args) {
                Outcome::Value(value) => {
                    trace!(function = %self.name, candidate = ?token, "candidate handled call");
                    return Ok(value);
                }
                Outcome::Decline => {
                    trace!(function = %self.name, candidate = ?token, "candidate declined");
                }
            }
        }

        Err(DispatchError::Exhausted {
            name: self.name.clone(),
            receiver: self.graph.display_name(receiver),
            argument: format!("{first:?}"),
        })
    }
}

impl<A, R> fmt::Debug for GenericFn<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericFn")
            .field("name", &self.name)
            .field("is_abstract", &self.is_abstract)
            .finish_non_exhaustive()
    }
}
