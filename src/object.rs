//! The type-erased server object model (spec.md §4.2, §9 "Type-erased server
//! objects").
//!
//! The source language wraps concrete resolver sets behind compile-time
//! polymorphism; spec.md §9 prescribes the systems-language translation
//! directly: a `ResolvableObject` trait plus an `Object` struct holding a
//! boxed trait object, a precomputed type-name set, and a resolver map —
//! "avoid deep inheritance; prefer one-level composition". `juniper`'s
//! closest analog is its `GraphQLValue`/`Registry` split
//! (`graphql-rust-juniper/juniper/src/types/base.rs`), but `juniper` resolves
//! fields through generated trait impls rather than a runtime map; this
//! crate needs the map because resolver glue is explicitly out of scope
//! (spec.md §1) and must be supplied by the caller at a single boundary.

use std::{collections::HashMap, collections::HashSet, sync::Arc};

use crate::{
    error::SchemaException,
    executor::params::{Resolver, SelectionSetParams},
};

/// What a caller implements to expose one concrete server type to the
/// engine (spec.md §9).
///
/// `begin_selection_set`/`end_selection_set` bracket every resolution of this
/// object's fields (spec.md §4.2, §5 "`beginSelectionSet` happens-before any
/// child field resolver... `endSelectionSet` happens-after all of them").
/// Both default to no-ops so implementations with no setup/teardown don't
/// have to write empty bodies.
pub trait ResolvableObject: Send + Sync {
    /// The set of type/interface/union names this object matches, used to
    /// filter fragment spreads and inline fragments with a type condition
    /// (spec.md §4.2 `matchesType`).
    fn type_names(&self) -> Vec<String>;

    /// This object's field-name → [`Resolver`] map.
    fn resolvers(&self) -> HashMap<String, Resolver>;

    /// Runs before any child field resolver in a selection set against this
    /// object.
    fn begin_selection_set(&self, _params: &SelectionSetParams) -> Result<(), SchemaException> {
        Ok(())
    }

    /// Runs after every child field resolver in a selection set against this
    /// object, even on an exception path (spec.md §4.2).
    fn end_selection_set(&self, _params: &SelectionSetParams) {}
}

/// A polymorphic server object: a boxed [`ResolvableObject`] plus the
/// type-name set and resolver map precomputed once at construction, so
/// `matches_type`/field lookup never re-walks the inner concept (spec.md
/// §3 `Object`).
///
/// Held behind `Arc` so resolvers may share ownership — per spec.md §9
/// ("model the inner as exclusively owned by the Object, with the Object
/// itself shared among resolvers via shared ownership"), resolvers should
/// not hold a strong back-reference to their own `Object`; if one is needed,
/// capture `Arc::downgrade` instead.
pub struct Object {
    inner: Box<dyn ResolvableObject>,
    type_names: HashSet<String>,
    resolvers: HashMap<String, Resolver>,
}

impl Object {
    /// Wraps a concrete [`ResolvableObject`], precomputing its type-name set
    /// and resolver map.
    pub fn new(inner: impl ResolvableObject + 'static) -> Arc<Self> {
        let type_names = inner.type_names().into_iter().collect();
        let resolvers = inner.resolvers();
        Arc::new(Self {
            inner: Box::new(inner),
            type_names,
            resolvers,
        })
    }

    /// Whether `name` is one of this object's matched type/interface/union
    /// names (spec.md §4.2 `matchesType`).
    pub fn matches_type(&self, name: &str) -> bool {
        self.type_names.contains(name)
    }

    /// Looks up the resolver registered for `field_name`.
    pub fn resolver(&self, field_name: &str) -> Option<&Resolver> {
        self.resolvers.get(field_name)
    }

    /// Forwards to the inner object's `begin_selection_set` hook.
    pub fn begin_selection_set(&self, params: &SelectionSetParams) -> Result<(), SchemaException> {
        self.inner.begin_selection_set(params)
    }

    /// Forwards to the inner object's `end_selection_set` hook.
    pub fn end_selection_set(&self, params: &SelectionSetParams) {
        self.inner.end_selection_set(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    struct Query;

    impl ResolvableObject for Query {
        fn type_names(&self) -> Vec<String> {
            vec!["Query".to_owned()]
        }

        fn resolvers(&self) -> HashMap<String, Resolver> {
            let mut map: HashMap<String, Resolver> = HashMap::new();
            map.insert(
                "n".to_owned(),
                Arc::new(|params| {
                    async move {
                        params.sink.add_int(7);
                        Ok::<_, SchemaException>(())
                    }
                    .boxed()
                }),
            );
            map
        }
    }

    #[test]
    fn matches_its_own_type_name_and_no_others() {
        let object = Object::new(Query);
        assert!(object.matches_type("Query"));
        assert!(!object.matches_type("Mutation"));
    }

    #[test]
    fn looks_up_a_registered_resolver_by_field_name() {
        let object = Object::new(Query);
        assert!(object.resolver("n").is_some());
        assert!(object.resolver("missing").is_none());
    }

    #[test]
    fn default_selection_set_hooks_are_no_ops() {
        struct Bare;
        impl ResolvableObject for Bare {
            fn type_names(&self) -> Vec<String> {
                vec!["Bare".to_owned()]
            }
            fn resolvers(&self) -> HashMap<String, Resolver> {
                HashMap::new()
            }
        }
        let object = Object::new(Bare);
        let params = crate::executor::params::SelectionSetParams {
            operation: Arc::new(crate::executor::params::OperationData {
                state: Arc::new(()),
                variables: crate::value::Map::new(),
                directives: crate::visitor::Directives::default(),
                fragments: Arc::new(HashMap::new()),
            }),
            launch: crate::launch::Launch::Inline,
            resolver_context: crate::executor::params::ResolverContext::Query,
            field_path: Arc::new(crate::executor::path::FieldPath::Root),
            directive_stack: None,
        };
        assert!(object.begin_selection_set(&params).is_ok());
        object.end_selection_set(&params);
    }
}
