//! Dispatch resolution and invocation.
//!
//! This module implements the resolution algorithm that selects which
//! implementations to try for the run-time type of a call's first argument,
//! and the fall-through walk over them.
//!
//! # Algorithm Overview
//!
//! 1. **Linearize**: merge the receiver's true ancestor chain with the
//!    chains of its registered virtual ancestors into one specificity order
//! 2. **Restrict**: keep only types with a registered implementation
//! 3. **Walk**: invoke candidates most specific first, skipping any that
//!    return the decline sentinel
//! 4. **Cache**: remember the order per receiver until the registry or the
//!    type graph changes
//!
//! # Module Structure
//!
//! - [`result`] - Outcomes, the decline sentinel, and dispatch errors
//! - [`registry`] - The type-keyed implementation table
//! - [`linearize`] - Candidate-order linearization and ambiguity detection
//! - [`generic`] - The [`GenericFn`] dispatcher

mod generic;
mod linearize;
mod registry;
mod result;

#[cfg(test)]
mod tests;

pub use generic::GenericFn;

pub use registry::{ImplFn, Implementation, RegistryError, RegistryResult};

pub use result::{DispatchError, DispatchResult, Outcome};
