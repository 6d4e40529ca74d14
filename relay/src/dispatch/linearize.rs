//! Candidate-order linearization.
//!
//! The core of dispatch resolution: given a receiver type and the set of
//! registered keys, produce the total specificity order the dispatcher
//! walks. The receiver's true ancestor chain is merged with the true chains
//! of every registered virtual ancestor using a C3-style head merge, then
//! restricted to registered keys.
//!
//! True ancestry is already a total order relative to the receiver, so true
//! ancestors never conflict with each other. Virtual ancestors carry no such
//! order: when two registered virtual ancestors with no subtype relation
//! between them are both placeable at the same merge position, neither is
//! more specific and the registration set is contradictory. That tie is
//! surfaced as [`DispatchError::Ambiguous`] instead of being silently
//! resolved by registration order, which would differ between callers.

use rustc_hash::FxHashSet;
use tracing::trace;

use super::result::{DispatchError, DispatchResult};
use crate::graph::{TypeGraph, TypeToken};

/// Computes the dispatch order for `receiver`, most specific first,
/// restricted to `keys`.
///
/// The returned order never repeats a type and always ends at the root key,
/// so it is non-empty whenever the registry holds its default entry.
pub(crate) fn candidate_order(
    graph: &TypeGraph,
    receiver: TypeToken,
    keys: &[TypeToken],
) -> DispatchResult<Vec<TypeToken>> {
    let true_chain = graph
        .true_chain(receiver)
        .map_err(|_| DispatchError::UnknownReceiver { token: receiver })?;
    let true_set: FxHashSet<TypeToken> = true_chain.iter().copied().collect();
    let key_set: FxHashSet<TypeToken> = keys.iter().copied().collect();

    // The receiver's own chain first: true ancestors win ties against
    // virtuals at equal depth. Then one chain per registered virtual
    // ancestor, each contributing its own true ancestry.
    let mut chains: Vec<Vec<TypeToken>> = vec![true_chain];
    for &key in keys {
        if !true_set.contains(&key) && graph.is_virtual_ancestor(key, receiver) {
            if let Ok(chain) = graph.true_chain(key) {
                chains.push(chain);
            }
        }
    }

    let mut merged: Vec<TypeToken> = Vec::new();
    loop {
        chains.retain(|chain| !chain.is_empty());
        if chains.is_empty() {
            break;
        }

        // Valid heads: not buried in any other chain's tail.
        let mut valid: Vec<TypeToken> = Vec::new();
        for chain in &chains {
            let head = chain[0];
            if valid.contains(&head) {
                continue;
            }
            if !chains.iter().any(|other| other[1..].contains(&head)) {
                valid.push(head);
            }
        }

        let Some(&winner) = valid.first() else {
            return Err(DispatchError::Inconsistent {
                receiver: graph.display_name(receiver),
            });
        };

        // Implicit-tie check: only registered types outside the receiver's
        // true chain can conflict, and only when neither is a true ancestor
        // of the other.
        if !true_set.contains(&winner) && key_set.contains(&winner) {
            for &rival in &valid[1..] {
                if !true_set.contains(&rival)
                    && key_set.contains(&rival)
                    && !graph.is_true_ancestor(winner, rival)
                    && !graph.is_true_ancestor(rival, winner)
                {
                    return Err(DispatchError::Ambiguous {
                        receiver: graph.display_name(receiver),
                        first: graph.display_name(winner),
                        second: graph.display_name(rival),
                    });
                }
            }
        }

        merged.push(winner);
        for chain in &mut chains {
            if chain[0] == winner {
                chain.remove(0);
            }
        }
    }

    let mut order: Vec<TypeToken> = merged
        .into_iter()
        .filter(|token| key_set.contains(token))
        .collect();
    if !order.contains(&TypeGraph::ROOT) {
        order.push(TypeGraph::ROOT);
    }

    trace!(?receiver, ?order, "linearized candidate order");
    Ok(order)
}
