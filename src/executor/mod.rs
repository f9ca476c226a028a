//! The selection executor (spec.md §4.3): walks a selection set against an
//! [`Object`](crate::object::Object), expanding fragments and directives,
//! and streams field results into a [`ResolverVisitor`] sink.
//!
//! Grounded on `juniper::execute_validated_query`/`Executor::resolve_into_type`
//! (`graphql-rust-juniper/juniper/src/executor/mod.rs`) for the overall field
//! loop (alias handling, directive checks, argument building, sub-selection
//! capture), adapted into two phases instead of one:
//!
//! 1. [`collect_fields`] walks the AST synchronously — response-name
//!    dedup, `@skip`/`@include`, fragment lookup and type-condition
//!    filtering, directive-stack pushing — exactly the "single-threaded
//!    cooperative... AST-walking" part of spec.md §5. It reports per-field
//!    errors straight into the sink (unknown field/fragment name, invalid
//!    directive arguments) and otherwise reduces the whole (possibly
//!    fragment-nested) selection set to a flat, source-ordered list of field
//!    work.
//! 2. [`resolve_selection_set`] then resolves that list either strictly in
//!    order (`Mutation`/subscription-lifecycle contexts) or concurrently via
//!    [`futures::future::join_all`] (`Query`/`Subscription` delivery,
//!    spec.md §4.5 "Query root fields may resolve in parallel").
//!
//! Splitting it this way sidesteps an ambiguity spec.md §9 flags outright: a
//! single flat mutex-protected stack ([`crate::assembler`]'s literal
//! reading) cannot stay correctly nested once sibling object-typed fields
//! are genuinely running concurrently. `sink.add_member` is called — fixing
//! response-name order — for every surviving field before any of them is
//! awaited, so ordering holds regardless of completion order.

pub mod params;
pub mod path;

pub use params::{
    Fragment, FragmentMap, OperationData, Resolver, ResolverContext, ResolverParams,
    SelectionSetParams, State,
};
pub use path::{DirectiveStackFrame, DirectiveStackKind, FieldPath};

use std::{collections::HashSet, sync::Arc};

use crate::{
    assembler::ResolverVisitor,
    ast::{Field, FragmentSpread, InlineFragment, Selection, Spanning},
    error::{PathSegment, SchemaError, SchemaException},
    object::Object,
    visitor::{should_skip, visit_arguments, visit_directives, Directives},
};

/// Resolves `selection_set` against `object`, streaming the resulting `Map`
/// into `sink` (spec.md §4.2 `Object::resolve`).
pub async fn resolve_selection_set(
    object: &Arc<Object>,
    selection_set: &[Selection],
    params: &SelectionSetParams,
    sink: &Arc<dyn ResolverVisitor>,
) -> Result<(), SchemaException> {
    object.begin_selection_set(params)?;
    sink.start_object();

    let mut seen = HashSet::new();
    let mut work = Vec::new();
    collect_fields(object, selection_set, params, sink, &mut seen, &mut work);

    match params.resolver_context {
        ResolverContext::Mutation
        | ResolverContext::NotifySubscribe
        | ResolverContext::NotifyUnsubscribe => {
            for item in work {
                run_field(item, params).await;
            }
        }
        ResolverContext::Query | ResolverContext::Subscription => {
            futures::future::join_all(work.into_iter().map(|item| run_field(item, params))).await;
        }
    }

    object.end_selection_set(params);
    Ok(())
}

/// One field that survived dedup/skip/fragment filtering and is ready to be
/// resolved, with everything [`run_field`] needs already captured at the
/// point it was collected (in particular its own directive-stack frame,
/// which can differ between fields flattened in from different fragments).
struct FieldWork {
    resolver: Resolver,
    field: Arc<Spanning<Field>>,
    response_name: Arc<str>,
    arguments: crate::value::Map,
    field_directives: Directives,
    sub_selection: Option<Arc<[Selection]>>,
    directive_stack: Option<Arc<DirectiveStackFrame>>,
    sink: Arc<dyn ResolverVisitor>,
}

fn locate(error: SchemaError, location: crate::ast::SchemaLocation, path: &[PathSegment]) -> SchemaError {
    error.with_location_if_unset(location).with_path_if_unset(path)
}

/// Recursively flattens `selection_set` into `out`, expanding fragment
/// spreads and inline fragments in place and reporting per-field/fragment
/// errors directly into `sink` (spec.md §4.3).
fn collect_fields(
    object: &Arc<Object>,
    selection_set: &[Selection],
    params: &SelectionSetParams,
    sink: &Arc<dyn ResolverVisitor>,
    seen: &mut HashSet<String>,
    out: &mut Vec<FieldWork>,
) {
    for selection in selection_set {
        match selection {
            Selection::Field(node) => collect_field(object, node, params, sink, seen, out),
            Selection::FragmentSpread(node) => {
                collect_fragment_spread(object, node, params, sink, seen, out)
            }
            Selection::InlineFragment(node) => {
                collect_inline_fragment(object, node, params, sink, seen, out)
            }
        }
    }
}

fn collect_field(
    object: &Arc<Object>,
    node: &Arc<Spanning<Field>>,
    params: &SelectionSetParams,
    sink: &Arc<dyn ResolverVisitor>,
    seen: &mut HashSet<String>,
    out: &mut Vec<FieldWork>,
) {
    let field = &node.item;
    let response_name = field.response_name().to_owned();
    if seen.contains(&response_name) {
        return;
    }

    let mut path = params.field_path.flatten();
    path.push(PathSegment::Field(response_name.clone()));

    let Some(resolver) = object.resolver(&field.name.item) else {
        seen.insert(response_name.clone());
        sink.add_error(locate(
            SchemaError::new(format!("Unknown field name: {}", field.name.item)),
            node.location,
            &path,
        ));
        return;
    };

    let field_directives = match visit_directives(&field.directives, &params.operation.variables) {
        Ok(directives) => directives,
        Err(error) => {
            seen.insert(response_name.clone());
            sink.add_error(locate(error, node.location, &path));
            return;
        }
    };

    match should_skip(&field_directives) {
        Ok(true) => {
            seen.insert(response_name);
            return;
        }
        Ok(false) => {}
        Err(error) => {
            seen.insert(response_name.clone());
            sink.add_error(locate(error, node.location, &path));
            return;
        }
    }

    let arguments = match visit_arguments(&field.arguments, &params.operation.variables) {
        Ok(arguments) => arguments,
        Err(error) => {
            seen.insert(response_name.clone());
            sink.add_error(locate(error, node.location, &path));
            return;
        }
    };

    seen.insert(response_name.clone());
    let child_sink = sink.add_member(&response_name);
    out.push(FieldWork {
        resolver: resolver.clone(),
        field: Arc::clone(node),
        response_name: Arc::from(response_name),
        arguments,
        field_directives,
        sub_selection: field.selection_set.clone(),
        directive_stack: params.directive_stack.clone(),
        sink: child_sink,
    });
}

fn collect_fragment_spread(
    object: &Arc<Object>,
    node: &Arc<Spanning<FragmentSpread>>,
    params: &SelectionSetParams,
    sink: &Arc<dyn ResolverVisitor>,
    seen: &mut HashSet<String>,
    out: &mut Vec<FieldWork>,
) {
    let spread = &node.item;
    let path = params.field_path.flatten();

    let Some(fragment) = params.operation.fragments.get(&spread.name.item) else {
        sink.add_error(locate(
            SchemaError::new(format!("Unknown fragment name: {}", spread.name.item)),
            node.location,
            &path,
        ));
        return;
    };

    let spread_directives = match visit_directives(&spread.directives, &params.operation.variables) {
        Ok(directives) => directives,
        Err(error) => {
            sink.add_error(locate(error, node.location, &path));
            return;
        }
    };
    match should_skip(&spread_directives) {
        Ok(true) => return,
        Ok(false) => {}
        Err(error) => {
            sink.add_error(locate(error, node.location, &path));
            return;
        }
    }

    if !object.matches_type(&fragment.type_condition) {
        return;
    }

    let definition_frame = DirectiveStackFrame::push(
        params.directive_stack.as_ref(),
        DirectiveStackKind::FragmentDefinition,
        fragment.directives.clone(),
    );
    let spread_frame = DirectiveStackFrame::push(
        Some(&definition_frame),
        DirectiveStackKind::FragmentSpread,
        spread_directives,
    );
    let nested_params = params.for_fragment(spread_frame);
    let selection_set = Arc::clone(&fragment.selection_set);
    collect_fields(object, &selection_set, &nested_params, sink, seen, out);
}

fn collect_inline_fragment(
    object: &Arc<Object>,
    node: &Arc<Spanning<InlineFragment>>,
    params: &SelectionSetParams,
    sink: &Arc<dyn ResolverVisitor>,
    seen: &mut HashSet<String>,
    out: &mut Vec<FieldWork>,
) {
    let inline = &node.item;
    let path = params.field_path.flatten();

    let directives = match visit_directives(&inline.directives, &params.operation.variables) {
        Ok(directives) => directives,
        Err(error) => {
            sink.add_error(locate(error, node.location, &path));
            return;
        }
    };
    match should_skip(&directives) {
        Ok(true) => return,
        Ok(false) => {}
        Err(error) => {
            sink.add_error(locate(error, node.location, &path));
            return;
        }
    }

    if let Some(type_condition) = &inline.type_condition {
        if !object.matches_type(type_condition) {
            return;
        }
    }

    let frame = DirectiveStackFrame::push(
        params.directive_stack.as_ref(),
        DirectiveStackKind::InlineFragment,
        directives,
    );
    let nested_params = params.for_fragment(frame);
    collect_fields(object, &inline.selection_set, &nested_params, sink, seen, out);
}

async fn run_field(work: FieldWork, base: &SelectionSetParams) {
    let field_path = base
        .field_path
        .child(PathSegment::Field(work.response_name.to_string()), work.field.location);
    let selection_set_params = SelectionSetParams {
        operation: Arc::clone(&base.operation),
        launch: base.launch.clone(),
        resolver_context: base.resolver_context,
        field_path: Arc::clone(&field_path),
        directive_stack: work.directive_stack,
    };

    base.launch.suspend().await;

    let resolver_params = ResolverParams {
        selection_set_params,
        field: work.field,
        response_name: Arc::clone(&work.response_name),
        arguments: work.arguments,
        field_directives: work.field_directives,
        sub_selection: work.sub_selection,
        sink: Arc::clone(&work.sink),
    };
    let location = resolver_params.field.location;

    if let Err(exception) = (work.resolver)(resolver_params).await {
        let path = field_path.flatten();
        for error in exception.errors {
            work.sink.add_error(locate(error, location, &path));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::builder,
        assembler::ValueAssembler,
        launch::Launch,
        value::{Map, Value},
    };
    use futures::FutureExt;
    use std::collections::HashMap;

    struct QueryRoot;

    impl crate::object::ResolvableObject for QueryRoot {
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
                        Ok(())
                    }
                    .boxed()
                }),
            );
            map.insert(
                "s".to_owned(),
                Arc::new(|params| {
                    async move {
                        params.sink.add_string("hi".to_owned());
                        Ok(())
                    }
                    .boxed()
                }),
            );
            map
        }
    }

    fn base_params() -> SelectionSetParams {
        SelectionSetParams {
            operation: Arc::new(OperationData {
                state: Arc::new(()),
                variables: Map::new(),
                directives: Directives::default(),
                fragments: Arc::new(HashMap::new()),
            }),
            launch: Launch::Inline,
            resolver_context: ResolverContext::Query,
            field_path: Arc::new(FieldPath::Root),
            directive_stack: None,
        }
    }

    #[tokio::test]
    async fn resolves_sibling_scalar_fields_in_source_order() {
        let object = Object::new(QueryRoot);
        let selection_set: Arc<[Selection]> = vec![builder::field("n"), builder::field("s")].into();
        let (sink, errors) = ValueAssembler::new_root();
        let params = base_params();

        let dyn_sink: Arc<dyn ResolverVisitor> = sink.clone();
        resolve_selection_set(&object, &selection_set, &params, &dyn_sink)
            .await
            .unwrap();

        let value = sink.finish();
        let map = value.as_map().unwrap();
        let keys: Vec<_> = map.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, vec!["n".to_owned(), "s".to_owned()]);
        assert_eq!(map.get("n"), Some(&Value::Int(7)));
        assert_eq!(map.get("s"), Some(&Value::String("hi".into())));
        assert!(errors.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_field_reports_an_error_without_a_value() {
        let object = Object::new(QueryRoot);
        let selection_set: Arc<[Selection]> = vec![builder::field("missing")].into();
        let (sink, errors) = ValueAssembler::new_root();
        let params = base_params();

        let dyn_sink: Arc<dyn ResolverVisitor> = sink.clone();
        resolve_selection_set(&object, &selection_set, &params, &dyn_sink)
            .await
            .unwrap();

        let value = sink.finish();
        assert!(value.as_map().unwrap().get("missing").is_none());
        let errors = errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("Unknown field name"));
    }

    #[tokio::test]
    async fn skip_directive_omits_the_field_entirely() {
        let object = Object::new(QueryRoot);
        let skipped = builder::with_directive(builder::field("n"), "skip", crate::ast::Literal::Boolean(true));
        let selection_set: Arc<[Selection]> = vec![skipped, builder::field("s")].into();
        let (sink, errors) = ValueAssembler::new_root();
        let params = base_params();

        let dyn_sink: Arc<dyn ResolverVisitor> = sink.clone();
        resolve_selection_set(&object, &selection_set, &params, &dyn_sink)
            .await
            .unwrap();

        let value = sink.finish();
        let map = value.as_map().unwrap();
        assert!(map.get("n").is_none());
        assert_eq!(map.get("s"), Some(&Value::String("hi".into())));
        assert!(errors.lock().unwrap().is_empty());
    }

    struct MutationRoot {
        log: Arc<std::sync::Mutex<Vec<&'static str>>>,
    }

    impl crate::object::ResolvableObject for MutationRoot {
        fn type_names(&self) -> Vec<String> {
            vec!["Mutation".to_owned()]
        }

        fn resolvers(&self) -> HashMap<String, Resolver> {
            let mut map: HashMap<String, Resolver> = HashMap::new();
            let first_log = Arc::clone(&self.log);
            map.insert(
                "first".to_owned(),
                Arc::new(move |params| {
                    let log = Arc::clone(&first_log);
                    async move {
                        log.lock().unwrap().push("first");
                        params.sink.add_int(1);
                        Ok(())
                    }
                    .boxed()
                }),
            );
            let second_log = Arc::clone(&self.log);
            map.insert(
                "second".to_owned(),
                Arc::new(move |params| {
                    let log = Arc::clone(&second_log);
                    async move {
                        log.lock().unwrap().push("second");
                        params.sink.add_int(2);
                        Ok(())
                    }
                    .boxed()
                }),
            );
            map
        }
    }

    #[tokio::test]
    async fn mutation_root_fields_resolve_strictly_left_to_right() {
        // Per spec.md §8 Scenario 5: mutation root fields run serially in
        // source order regardless of the launch policy, unlike query root
        // fields which may interleave. `ThreadPerTask` would let sibling
        // query fields complete out of order; under `Mutation` it must not.
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));
        let object = Object::new(MutationRoot { log: Arc::clone(&log) });
        let selection_set: Arc<[Selection]> =
            vec![builder::field("first"), builder::field("second")].into();
        let (sink, errors) = ValueAssembler::new_root();
        let mut params = base_params();
        params.resolver_context = ResolverContext::Mutation;
        params.launch = Launch::ThreadPerTask;

        let dyn_sink: Arc<dyn ResolverVisitor> = sink.clone();
        resolve_selection_set(&object, &selection_set, &params, &dyn_sink)
            .await
            .unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
        let value = sink.finish();
        let map = value.as_map().unwrap();
        assert_eq!(map.get("first"), Some(&Value::Int(1)));
        assert_eq!(map.get("second"), Some(&Value::Int(2)));
        assert!(errors.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_response_names_resolve_only_once() {
        let object = Object::new(QueryRoot);
        let selection_set: Arc<[Selection]> = vec![builder::field("n"), builder::field("n")].into();
        let (sink, _errors) = ValueAssembler::new_root();
        let params = base_params();

        let dyn_sink: Arc<dyn ResolverVisitor> = sink.clone();
        resolve_selection_set(&object, &selection_set, &params, &dyn_sink)
            .await
            .unwrap();

        let value = sink.finish();
        let map = value.as_map().unwrap();
        assert_eq!(map.len(), 1);
    }
}
