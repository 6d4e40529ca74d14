//! # Relay
//!
//! Fall-through single-dispatch generic functions over an explicit runtime
//! type graph.
//!
//! A [`GenericFn`] wraps a default implementation and selects among
//! registered implementations based on the run-time type of its first
//! argument, most specific first. Unlike plain single dispatch, a matched
//! implementation may return [`Outcome::Decline`] and control falls
//! through to the next most-specific candidate until one produces a real
//! result or the candidates are exhausted.
//!
//! Specificity comes from a [`TypeGraph`]: true inheritance chains declared
//! at type definition, merged with explicitly declared structural
//! ("virtual") ancestor relations. Ties between unrelated virtual ancestors
//! are rejected as ambiguous rather than resolved by registration order.
//!
//! ```
//! use std::sync::Arc;
//! use relay::{GenericFn, Implementation, Outcome, TypeGraph, TypeToken, Typed};
//!
//! #[derive(Debug, Clone)]
//! enum Value {
//!     Int(TypeToken, i64),
//!     Str(TypeToken, String),
//! }
//!
//! impl Typed for Value {
//!     fn type_token(&self) -> TypeToken {
//!         match self {
//!             Value::Int(t, _) | Value::Str(t, _) => *t,
//!         }
//!     }
//! }
//!
//! let graph = Arc::new(TypeGraph::new());
//! let int_ty = graph.define("Int", &[]).unwrap();
//!
//! let describe: GenericFn<Value, &str> = GenericFn::new(
//!     "describe",
//!     Arc::clone(&graph),
//!     Implementation::new(|_args: &[Value]| Outcome::Value("base")),
//! );
//! describe
//!     .register(int_ty, |_args: &[Value]| Outcome::Value("integer"))
//!     .unwrap();
//!
//! let str_ty = graph.define("Str", &[]).unwrap();
//! assert_eq!(describe.call(&[Value::Int(int_ty, 1)]).unwrap(), "integer");
//! assert_eq!(
//!     describe
//!         .call(&[Value::Str(str_ty, "x".into())])
//!         .unwrap(),
//!     "base"
//! );
//! ```

pub mod dispatch;
pub mod graph;
pub mod method;

pub use dispatch::{
    DispatchError, DispatchResult, GenericFn, ImplFn, Implementation, Outcome, RegistryError,
    RegistryResult,
};
pub use graph::{GraphError, GraphResult, TypeGraph, TypeToken, Typed};
pub use method::{BoundFn, GenericMethod};
