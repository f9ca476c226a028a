//! Shared parameter and context types threaded through one resolution
//! (spec.md §3 `OperationData`/`ResolverParams`, §4.8).
//!
//! Grounded on `juniper::executor::{ExecutorDataVariables, Executor, Registry}`
//! (`graphql-rust-juniper/juniper/src/executor/mod.rs`) for the overall shape
//! — a per-operation bundle of variables/fragments/context shared behind an
//! `Arc`, plus a per-field bundle built fresh on every resolver invocation.
//! Unlike `juniper::Executor<'a, 'r, CtxT, S>`, nothing here carries a
//! lifetime parameter: every field is owned or `Arc`-shared, so a
//! `ResolverParams` can be moved wholesale onto a spawned OS thread under
//! [`crate::launch::Launch::ThreadPerTask`]/[`crate::launch::Launch::Queue`]
//! without borrowing from the [`crate::ast::Document`] that produced it.

use std::{any::Any, collections::HashMap, sync::Arc};

use futures::future::BoxFuture;

use crate::{
    assembler::ResolverVisitor,
    ast::{Field, Selection, Spanning},
    error::SchemaException,
    executor::path::{DirectiveStackFrame, FieldPath},
    launch::Launch,
    value::Map,
    visitor::Directives,
};

/// An opaque, shared handle propagated to every resolver (spec.md §6
/// "Input: State"). Resolvers downcast it to whatever concrete context type
/// the caller's glue code agreed on.
pub type State = Arc<dyn Any + Send + Sync>;

/// A resolver: a suspendable function from [`ResolverParams`] to a result
/// that has streamed zero or one value (and possibly errors) into its sink
/// (spec.md §6 "Resolver contract").
///
/// `'static` throughout (no borrowed `ResolverParams`) so the same resolver
/// value can be invoked from a spawned thread under any [`Launch`] policy.
pub type Resolver =
    Arc<dyn Fn(ResolverParams) -> BoxFuture<'static, Result<(), SchemaException>> + Send + Sync>;

/// A parsed `fragment Name on Type { ... }`, reduced to what resolution
/// needs (spec.md §3 `Fragment`).
#[derive(Debug, Clone)]
pub struct Fragment {
    /// The `on Type` condition.
    pub type_condition: String,
    /// The fragment definition's own directives.
    pub directives: Directives,
    /// The fragment's selection set.
    pub selection_set: Arc<[Selection]>,
}

/// Fragment name → definition, built once per operation (spec.md §3
/// `FragmentMap`).
pub type FragmentMap = Arc<HashMap<String, Fragment>>;

/// Which phase of resolution a resolver is being invoked for (spec.md §4.8).
///
/// Distinguishing `Query`/`Mutation` from the three subscription phases lets
/// one resolver map serve both: a subscription field's resolver typically
/// matches on this to decide whether to register a listener, tear one down,
/// or produce a delivered event's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverContext {
    /// Resolving a `query` operation.
    Query,
    /// Resolving a `mutation` operation (always paired with
    /// [`Launch::Inline`], spec.md §4.5).
    Mutation,
    /// A `subscribe` call registering a new subscription.
    NotifySubscribe,
    /// An `unsubscribe` call tearing one down.
    NotifyUnsubscribe,
    /// A `deliver` call re-resolving a live subscription's selection.
    Subscription,
}

/// Per-operation shared state, handed down unchanged to every sub-resolution
/// (spec.md §3 `OperationData`: "shared across concurrent sub-resolutions").
pub struct OperationData {
    /// The opaque caller-provided state handle.
    pub state: State,
    /// The filtered variable map (spec.md §4.7 step 3).
    pub variables: Map,
    /// The operation's own directives.
    pub directives: Directives,
    /// Every fragment definition in the document, by name.
    pub fragments: FragmentMap,
}

/// Parameters threaded through one selection-set resolution (spec.md §3).
///
/// Cloning is cheap: every field is `Arc`-shared or `Copy`, so a sibling
/// field's resolution can carry its own copy (with an extended
/// [`FieldPath`]) without affecting anyone else's.
#[derive(Clone)]
pub struct SelectionSetParams {
    /// The shared per-operation data.
    pub operation: Arc<OperationData>,
    /// The launch policy in effect for this resolution (immutable once
    /// chosen, spec.md §4.5).
    pub launch: Launch,
    /// Which phase of resolution this is.
    pub resolver_context: ResolverContext,
    /// The path from the operation root down to the current position.
    pub field_path: Arc<FieldPath>,
    /// The innermost directive-context frame in scope, if any (spec.md §9).
    pub directive_stack: Option<Arc<DirectiveStackFrame>>,
}

impl SelectionSetParams {
    /// Derives the params for one field step: same operation/launch/context,
    /// an extended path, same directive stack (fields don't push their own
    /// frame — only fragments do, spec.md §4.3).
    pub fn for_field(&self, field_path: Arc<FieldPath>) -> Self {
        Self {
            field_path,
            ..self.clone()
        }
    }

    /// Derives the params for recursing into a fragment's selection set: same
    /// path, a pushed directive frame.
    pub fn for_fragment(&self, directive_stack: Arc<DirectiveStackFrame>) -> Self {
        Self {
            directive_stack: Some(directive_stack),
            ..self.clone()
        }
    }
}

/// Parameters passed to one resolver invocation (spec.md §3 `ResolverParams`).
#[derive(Clone)]
pub struct ResolverParams {
    /// The selection-set-level params in effect for this field.
    pub selection_set_params: SelectionSetParams,
    /// The field's own AST node (name, arguments-as-written, directives).
    pub field: Arc<Spanning<Field>>,
    /// The response name (alias if present, else the field name).
    pub response_name: Arc<str>,
    /// The field's arguments, already resolved against variables.
    pub arguments: Map,
    /// The field's own directives, already resolved against variables.
    pub field_directives: Directives,
    /// The field's sub-selection, if it has one.
    pub sub_selection: Option<Arc<[Selection]>>,
    /// The sink this resolver must stream its result (and any errors) into.
    pub sink: Arc<dyn ResolverVisitor>,
}
