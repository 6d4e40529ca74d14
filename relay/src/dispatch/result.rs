//! Dispatch outcomes and errors.

use thiserror::Error;

use crate::graph::TypeToken;

/// What one implementation produced for one dispatch attempt.
///
/// `Decline` is the fall-through sentinel: a dedicated variant rather than
/// `Option::None`, so implementations can legitimately return any `R`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome<R> {
    /// A real result; the candidate walk stops here.
    Value(R),
    /// Not handled, try the next candidate.
    Decline,
}

impl<R> Outcome<R> {
    /// Whether this outcome is the decline sentinel.
    pub fn is_decline(&self) -> bool {
        matches!(self, Outcome::Decline)
    }
}

/// Errors surfaced by dispatch resolution and invocation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Invocation with no positional arguments.
    #[error("`{name}` requires at least 1 positional argument")]
    InvalidCall {
        /// The generic function's name.
        name: String,
    },

    /// Two unrelated virtual ancestors tie for specificity.
    ///
    /// The registration set itself is contradictory; this is raised the
    /// first time the receiver type is resolved under the conflicting
    /// registrations and is never retried.
    #[error("ambiguous dispatch for `{receiver}`: `{first}` or `{second}`")]
    Ambiguous {
        /// The receiver type being resolved.
        receiver: String,
        /// One competing virtual ancestor.
        first: String,
        /// The other competing virtual ancestor.
        second: String,
    },

    /// Every candidate in the resolved order declined.
    #[error("`{name}`: every candidate declined {argument} of type `{receiver}`")]
    Exhausted {
        /// The generic function's name.
        name: String,
        /// The receiver type's name.
        receiver: String,
        /// The rendered first argument.
        argument: String,
    },

    /// The ancestry relevant to the receiver admits no consistent order.
    #[error("inconsistent ancestry while linearizing `{receiver}`")]
    Inconsistent {
        /// The receiver type being resolved.
        receiver: String,
    },

    /// The first argument's type token is not defined in the graph.
    #[error("receiver type token {token:?} is not defined in the dispatch graph")]
    UnknownReceiver {
        /// The offending token.
        token: TypeToken,
    },
}

/// Dispatch result type.
pub type DispatchResult<T> = Result<T, DispatchError>;
