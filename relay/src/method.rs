//! Method-style binding for generic functions.
//!
//! [`GenericMethod`] adapts a [`GenericFn`] for use where a receiver is
//! bound implicitly as the first argument. Binding yields a [`BoundFn`]
//! that forwards the receiver plus the remaining arguments, keeps the
//! `register` entry points, and preserves the default implementation's
//! abstract marker so abstract-method tooling still recognizes it.

use std::fmt;
use std::sync::Arc;

use crate::dispatch::{
    DispatchResult, GenericFn, ImplFn, Implementation, Outcome, RegistryResult,
};
use crate::graph::{TypeGraph, TypeToken, Typed};

/// A generic function intended to be called as a method.
pub struct GenericMethod<A, R> {
    inner: GenericFn<A, R>,
}

impl<A, R> GenericMethod<A, R> {
    /// Wraps `default` as a generic method dispatching over `graph`.
    pub fn new(
        name: impl Into<String>,
        graph: Arc<TypeGraph>,
        default: Implementation<A, R>,
    ) -> Self {
        Self {
            inner: GenericFn::new(name, graph, default),
        }
    }

    /// Registers an implementation for an explicit type key.
    pub fn register(
        &self,
        key: TypeToken,
        func: impl Fn(&[A]) -> Outcome<R> + Send + Sync + 'static,
    ) -> RegistryResult<ImplFn<A, R>> {
        self.inner.register(key, func)
    }

    /// Registers an [`Implementation`], using its declared key.
    pub fn register_impl(&self, imp: Implementation<A, R>) -> RegistryResult<ImplFn<A, R>> {
        self.inner.register_impl(imp)
    }

    /// Whether the wrapped default carries the abstract marker.
    pub fn is_abstract(&self) -> bool {
        self.inner.is_abstract()
    }

    /// The underlying dispatcher.
    pub fn as_fn(&self) -> &GenericFn<A, R> {
        &self.inner
    }

    /// Binds `receiver` as the implicit first argument.
    pub fn bind(&self, receiver: A) -> BoundFn<'_, A, R> {
        BoundFn {
            method: self,
            receiver,
        }
    }
}

impl<A, R> fmt::Debug for GenericMethod<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericMethod")
            .field("inner", &self.inner)
            .finish()
    }
}

/// A generic method bound to a receiver.
pub struct BoundFn<'m, A, R> {
    method: &'m GenericMethod<A, R>,
    receiver: A,
}

impl<A, R> BoundFn<'_, A, R>
where
    A: Typed + Clone + fmt::Debug,
{
    /// Invokes the method: the bound receiver, then `rest`.
    pub fn call(&self, rest: &[A]) -> DispatchResult<R> {
        let mut args = Vec::with_capacity(rest.len() + 1);
        args.push(self.receiver.clone());
        args.extend_from_slice(rest);
        self.method.inner.call(&args)
    }
}

impl<A, R> BoundFn<'_, A, R> {
    /// Registers through the bound method, identical to
    /// [`GenericMethod::register`].
    pub fn register(
        &self,
        key: TypeToken,
        func: impl Fn(&[A]) -> Outcome<R> + Send + Sync + 'static,
    ) -> RegistryResult<ImplFn<A, R>> {
        self.method.register(key, func)
    }

    /// Whether the wrapped default carries the abstract marker.
    pub fn is_abstract(&self) -> bool {
        self.method.is_abstract()
    }
}
