//! Tests for dispatch resolution and invocation.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use super::generic::GenericFn;
use super::registry::{Implementation, RegistryError};
use super::result::{DispatchError, Outcome};
use crate::graph::{TypeGraph, TypeToken, Typed};

#[derive(Debug, Clone, PartialEq)]
struct Obj {
    token: TypeToken,
    n: i64,
}

impl Typed for Obj {
    fn type_token(&self) -> TypeToken {
        self.token
    }
}

fn obj(token: TypeToken, n: i64) -> Obj {
    Obj { token, n }
}

fn base_fn(graph: &Arc<TypeGraph>) -> GenericFn<Obj, String> {
    GenericFn::new(
        "describe",
        Arc::clone(graph),
        Implementation::new(|_args: &[Obj]| Outcome::Value("base".to_string())),
    )
}

#[test]
fn test_root_only_reaches_default() {
    let graph = Arc::new(TypeGraph::new());
    let int_ty = graph.define("Int", &[]).unwrap();
    let describe = base_fn(&graph);

    assert_eq!(describe.call(&[obj(int_ty, 1)]).unwrap(), "base");
    assert_eq!(describe.call(&[obj(TypeGraph::ROOT, 0)]).unwrap(), "base");
}

#[test]
fn test_invalid_call_without_arguments() {
    let graph = Arc::new(TypeGraph::new());
    let describe = base_fn(&graph);

    let err = describe.call(&[]).unwrap_err();
    assert_eq!(
        err,
        DispatchError::InvalidCall {
            name: "describe".to_string()
        }
    );
    insta::assert_snapshot!(
        err.to_string(),
        @"`describe` requires at least 1 positional argument"
    );
}

#[test]
fn test_exact_type_preferred_over_root() {
    let graph = Arc::new(TypeGraph::new());
    let int_ty = graph.define("Int", &[]).unwrap();
    let list_ty = graph.define("List", &[]).unwrap();
    let str_ty = graph.define("Str", &[]).unwrap();
    let describe = base_fn(&graph);
    describe
        .register(int_ty, |_args: &[Obj]| Outcome::Value("integer".to_string()))
        .unwrap();

    assert_eq!(describe.call(&[obj(str_ty, 0)]).unwrap(), "base");
    assert_eq!(describe.call(&[obj(int_ty, 1)]).unwrap(), "integer");
    assert_eq!(describe.call(&[obj(list_ty, 3)]).unwrap(), "base");
}

#[test]
fn test_nearest_true_ancestor_selected() {
    let graph = Arc::new(TypeGraph::new());
    let animal = graph.define("Animal", &[]).unwrap();
    let cat = graph.define("Cat", &[animal]).unwrap();
    let tabby = graph.define("Tabby", &[cat]).unwrap();
    let describe = base_fn(&graph);
    describe
        .register(animal, |_args: &[Obj]| Outcome::Value("animal".to_string()))
        .unwrap();

    assert_eq!(describe.call(&[obj(tabby, 0)]).unwrap(), "animal");

    describe
        .register(cat, |_args: &[Obj]| Outcome::Value("cat".to_string()))
        .unwrap();
    assert_eq!(describe.call(&[obj(tabby, 0)]).unwrap(), "cat");
    assert_eq!(describe.call(&[obj(animal, 0)]).unwrap(), "animal");
}

#[test]
fn test_decline_falls_through_in_specificity_order() {
    let graph = Arc::new(TypeGraph::new());
    let a = graph.define("A", &[]).unwrap();
    let b = graph.define("B", &[a]).unwrap();
    let c = graph.define("C", &[b]).unwrap();
    let describe = base_fn(&graph);
    describe
        .register(c, |_args: &[Obj]| Outcome::Decline)
        .unwrap();
    describe
        .register(b, |_args: &[Obj]| Outcome::Decline)
        .unwrap();
    describe
        .register(a, |_args: &[Obj]| Outcome::Value("outer".to_string()))
        .unwrap();

    assert_eq!(describe.call(&[obj(c, 0)]).unwrap(), "outer");
}

#[test]
fn test_all_candidates_declining_exhausts() {
    let graph = Arc::new(TypeGraph::new());
    let int_ty = graph.define("Int", &[]).unwrap();
    let describe: GenericFn<Obj, String> = GenericFn::new(
        "describe",
        Arc::clone(&graph),
        Implementation::new(|_args: &[Obj]| Outcome::Decline),
    );
    describe
        .register(int_ty, |_args: &[Obj]| Outcome::Decline)
        .unwrap();

    let err = describe.call(&[obj(int_ty, 11)]).unwrap_err();
    match &err {
        DispatchError::Exhausted { name, receiver, .. } => {
            assert_eq!(name, "describe");
            assert_eq!(receiver, "Int");
        }
        other => panic!("expected Exhausted, got {other:?}"),
    }
    insta::assert_snapshot!(
        err.to_string(),
        @"`describe`: every candidate declined Obj { token: TypeToken(1), n: 11 } of type `Int`"
    );
}

#[test]
fn test_small_int_decline_scenario() {
    let graph = Arc::new(TypeGraph::new());
    let int_ty = graph.define("Int", &[]).unwrap();
    let describe = base_fn(&graph);
    describe
        .register(int_ty, |args: &[Obj]| {
            if args[0].n <= 10 {
                Outcome::Value("small".to_string())
            } else {
                Outcome::Decline
            }
        })
        .unwrap();

    assert_eq!(describe.call(&[obj(int_ty, 1)]).unwrap(), "small");
    assert_eq!(describe.call(&[obj(int_ty, 11)]).unwrap(), "base");
}

#[test]
fn test_reregistration_is_idempotent() {
    let graph = Arc::new(TypeGraph::new());
    let int_ty = graph.define("Int", &[]).unwrap();
    let describe = base_fn(&graph);
    for _ in 0..2 {
        describe
            .register(int_ty, |_args: &[Obj]| Outcome::Value("integer".to_string()))
            .unwrap();
    }

    assert_eq!(
        describe.dispatch(int_ty).unwrap(),
        vec![int_ty, TypeGraph::ROOT]
    );
    assert_eq!(describe.call(&[obj(int_ty, 1)]).unwrap(), "integer");
}

#[test]
fn test_registration_invalidates_cache() {
    let graph = Arc::new(TypeGraph::new());
    let animal = graph.define("Animal", &[]).unwrap();
    let cat = graph.define("Cat", &[animal]).unwrap();
    let describe = base_fn(&graph);

    // Prime the cache with the root-only order.
    assert_eq!(describe.call(&[obj(cat, 0)]).unwrap(), "base");

    describe
        .register(cat, |_args: &[Obj]| Outcome::Value("cat".to_string()))
        .unwrap();
    assert_eq!(describe.call(&[obj(cat, 0)]).unwrap(), "cat");
}

#[test]
fn test_graph_version_invalidates_cache() {
    let graph = Arc::new(TypeGraph::new());
    let proto = graph.define("Proto", &[]).unwrap();
    let cat = graph.define("Cat", &[]).unwrap();
    let describe = base_fn(&graph);
    describe
        .register(proto, |_args: &[Obj]| Outcome::Value("proto".to_string()))
        .unwrap();

    // Proto is unrelated to Cat so far; the cached order skips it.
    assert_eq!(describe.call(&[obj(cat, 0)]).unwrap(), "base");

    // Declaring the relation bumps the graph version; the stale entry must
    // not be reused.
    graph.declare_virtual(proto, cat).unwrap();
    assert_eq!(describe.call(&[obj(cat, 0)]).unwrap(), "proto");
}

#[test]
fn test_ambiguity_surfaces_at_invocation() {
    let graph = Arc::new(TypeGraph::new());
    let sized = graph.define("Sized", &[]).unwrap();
    let container = graph.define("Container", &[]).unwrap();
    let bag = graph.define("Bag", &[]).unwrap();
    graph.declare_virtual(sized, bag).unwrap();
    graph.declare_virtual(container, bag).unwrap();

    let describe = base_fn(&graph);
    describe
        .register(sized, |_args: &[Obj]| Outcome::Value("sized".to_string()))
        .unwrap();
    describe
        .register(container, |_args: &[Obj]| {
            Outcome::Value("container".to_string())
        })
        .unwrap();

    let err = describe.call(&[obj(bag, 0)]).unwrap_err();
    assert!(matches!(err, DispatchError::Ambiguous { .. }));
    insta::assert_snapshot!(
        err.to_string(),
        @"ambiguous dispatch for `Bag`: `Sized` or `Container`"
    );
}

#[test]
fn test_true_common_descendant_resolves_ambiguity() {
    let graph = Arc::new(TypeGraph::new());
    let sized = graph.define("Sized", &[]).unwrap();
    let container = graph.define("Container", &[]).unwrap();
    let set_proto = graph.define("Set", &[sized, container]).unwrap();
    let bag = graph.define("Bag", &[]).unwrap();
    graph.declare_virtual(set_proto, bag).unwrap();

    let describe = base_fn(&graph);
    describe
        .register(sized, |_args: &[Obj]| Outcome::Value("sized".to_string()))
        .unwrap();
    describe
        .register(container, |_args: &[Obj]| {
            Outcome::Value("container".to_string())
        })
        .unwrap();
    assert!(matches!(
        describe.call(&[obj(bag, 0)]),
        Err(DispatchError::Ambiguous { .. })
    ));

    describe
        .register(set_proto, |_args: &[Obj]| Outcome::Value("set".to_string()))
        .unwrap();
    assert_eq!(describe.call(&[obj(bag, 0)]).unwrap(), "set");
    assert_eq!(
        describe.dispatch(bag).unwrap(),
        vec![set_proto, sized, container, TypeGraph::ROOT]
    );
}

#[test]
fn test_declined_virtual_falls_through_deterministically() {
    let graph = Arc::new(TypeGraph::new());
    let sized = graph.define("Sized", &[]).unwrap();
    let set_proto = graph.define("Set", &[sized]).unwrap();
    let bag = graph.define("Bag", &[]).unwrap();
    graph.declare_virtual(set_proto, bag).unwrap();

    let describe = base_fn(&graph);
    describe
        .register(set_proto, |_args: &[Obj]| Outcome::Decline)
        .unwrap();
    describe
        .register(sized, |_args: &[Obj]| Outcome::Value("sized".to_string()))
        .unwrap();

    assert_eq!(describe.call(&[obj(bag, 0)]).unwrap(), "sized");
}

#[test]
fn test_register_unknown_token_rejected() {
    let graph = Arc::new(TypeGraph::new());
    let other = Arc::new(TypeGraph::new());
    let stray = other.define("Stray", &[]).unwrap();
    let describe = base_fn(&graph);

    let err = describe
        .register(stray, |_args: &[Obj]| Outcome::Decline)
        .err()
        .unwrap();
    assert_eq!(err, RegistryError::UnknownType(stray));
}

#[test]
fn test_register_impl_without_key_rejected() {
    let graph = Arc::new(TypeGraph::new());
    let describe = base_fn(&graph);

    let err = describe
        .register_impl(Implementation::new(|_args: &[Obj]| Outcome::Decline))
        .err()
        .unwrap();
    assert_eq!(err, RegistryError::MissingKey);
    insta::assert_snapshot!(
        err.to_string(),
        @"invalid registration: implementation declares no dispatch key; use `register(token, f)` or `Implementation::new(f).for_type(token)`"
    );
}

#[test]
fn test_register_impl_with_declared_key() {
    let graph = Arc::new(TypeGraph::new());
    let int_ty = graph.define("Int", &[]).unwrap();
    let describe = base_fn(&graph);
    describe
        .register_impl(
            Implementation::new(|_args: &[Obj]| Outcome::Value("integer".to_string()))
                .for_type(int_ty),
        )
        .unwrap();

    assert_eq!(describe.call(&[obj(int_ty, 1)]).unwrap(), "integer");
}

#[test]
fn test_dispatch_exposes_candidate_order() {
    let graph = Arc::new(TypeGraph::new());
    let animal = graph.define("Animal", &[]).unwrap();
    let cat = graph.define("Cat", &[animal]).unwrap();
    let describe = base_fn(&graph);
    describe
        .register(animal, |_args: &[Obj]| Outcome::Decline)
        .unwrap();

    assert_eq!(
        describe.dispatch(cat).unwrap(),
        vec![animal, TypeGraph::ROOT]
    );
    assert_eq!(describe.dispatch(TypeGraph::ROOT).unwrap(), vec![TypeGraph::ROOT]);
}

#[test]
fn test_unknown_receiver_rejected() {
    let graph = Arc::new(TypeGraph::new());
    let other = Arc::new(TypeGraph::new());
    let stray = other.define("Stray", &[]).unwrap();
    let describe = base_fn(&graph);

    let err = describe.call(&[obj(stray, 0)]).unwrap_err();
    assert!(matches!(err, DispatchError::UnknownReceiver { .. }));
}

#[test]
fn test_full_argument_list_passed_through() {
    let graph = Arc::new(TypeGraph::new());
    let int_ty = graph.define("Int", &[]).unwrap();
    let total: GenericFn<Obj, i64> = GenericFn::new(
        "total",
        Arc::clone(&graph),
        Implementation::new(|args: &[Obj]| Outcome::Value(args.iter().map(|o| o.n).sum())),
    );

    let args = [obj(int_ty, 1), obj(int_ty, 2), obj(int_ty, 3)];
    assert_eq!(total.call(&args).unwrap(), 6);
}
