//! The operation dispatcher (spec.md §4.7): turns a validated document plus
//! caller-supplied variables/state/launch policy into a `{data, errors}`
//! response.
//!
//! Grounded on `juniper::execute_validated_query`
//! (`graphql-rust-juniper/juniper/src/executor/mod.rs`) for the overall
//! shape — locate the operation, build the variable map, pick a root type,
//! walk its selection set, wrap the result — adapted to this crate's launch
//! policy and `ResolverVisitor` sink instead of `juniper`'s single-threaded
//! `Executor`.

use std::{collections::HashMap, sync::Arc};

use crate::{
    assembler::ValueAssembler,
    ast::{Document, OperationType},
    error::{SchemaError, SchemaException},
    executor::{
        resolve_selection_set, Fragment, FragmentMap, OperationData, ResolverContext,
        SelectionSetParams, State,
    },
    launch::Launch,
    object::Object,
    response::build_response,
    value::{Map, Value},
    visitor::{visit_directives, visit_value},
};

/// Builds the [`FragmentMap`] for `document` (spec.md §4.7 step 1), resolving
/// each fragment definition's own directives against `variables`.
fn build_fragment_map(document: &Document, variables: &Map) -> Result<FragmentMap, SchemaException> {
    let mut map = HashMap::new();
    for fragment in document.fragment_definitions() {
        let directives =
            visit_directives(&fragment.directives, variables).map_err(SchemaException::from_error)?;
        map.insert(
            fragment.name.clone(),
            Fragment {
                type_condition: fragment.type_condition.clone(),
                directives,
                selection_set: Arc::clone(&fragment.selection_set),
            },
        );
    }
    Ok(Arc::new(map))
}

/// Resolves `document`'s chosen operation against `root_object`, producing a
/// `{data, errors}` [`Value`] (spec.md §4.7).
///
/// `operation_name` selects which top-level operation to run; an empty or
/// absent name picks the first one in the document, per
/// [`Document::find_operation`]. Any [`SchemaException`] that would otherwise
/// abort the flow (missing operation, a subscription given to this
/// query/mutation entry point, a leaf-field violation at the root, ...) is
/// converted to `{data: null, errors: [...]}` rather than propagated (spec.md
/// §4.7 final paragraph).
pub async fn execute_request(
    document: &Document,
    root_object: &Arc<Object>,
    state: State,
    caller_variables: Map,
    operation_name: Option<&str>,
    launch: Launch,
) -> Value {
    match run(document, root_object, state, caller_variables, operation_name, launch).await {
        Ok((data, errors)) => build_response(data, &errors),
        Err(exception) => build_response(Value::Null, &exception.errors),
    }
}

async fn run(
    document: &Document,
    root_object: &Arc<Object>,
    state: State,
    caller_variables: Map,
    operation_name: Option<&str>,
    launch: Launch,
) -> Result<(Value, Vec<SchemaError>), SchemaException> {
    let operation = document.find_operation(operation_name).ok_or_else(|| {
        SchemaException::from_error(SchemaError::new(format!(
            "Missing operation [name: {}]",
            operation_name.unwrap_or("")
        )))
    })?;
    if operation.operation_type == OperationType::Subscription {
        return Err(SchemaException::from_error(SchemaError::new("Unexpected subscription")));
    }

    let mut variables = Map::with_capacity(operation.variable_definitions.len());
    for definition in &operation.variable_definitions {
        if let Some(value) = caller_variables.get(&definition.name) {
            variables.insert(definition.name.clone(), value.clone());
        } else if let Some(default) = &definition.default_value {
            let value = visit_value(default, &Map::new()).map_err(SchemaException::from_error)?;
            variables.insert(definition.name.clone(), value);
        }
    }

    let fragments = build_fragment_map(document, &variables)?;
    let directives =
        visit_directives(&operation.directives, &variables).map_err(SchemaException::from_error)?;

    let (resolver_context, launch) = match operation.operation_type {
        OperationType::Mutation => (ResolverContext::Mutation, Launch::Inline),
        OperationType::Query => (ResolverContext::Query, launch),
        OperationType::Subscription => unreachable!("rejected above"),
    };

    let operation_data = Arc::new(OperationData {
        state,
        variables,
        directives,
        fragments,
    });
    let params = SelectionSetParams {
        operation: operation_data,
        launch,
        resolver_context,
        field_path: Arc::new(crate::executor::FieldPath::Root),
        directive_stack: None,
    };

    let (sink, errors) = ValueAssembler::new_root();
    let dyn_sink: Arc<dyn crate::assembler::ResolverVisitor> = sink.clone();
    resolve_selection_set(root_object, &operation.selection_set, &params, &dyn_sink).await?;

    let data = sink.finish();
    let errors = errors.lock().unwrap().clone();
    Ok((data, errors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ast::builder, executor::Resolver, object::ResolvableObject};
    use futures::FutureExt;
    use pretty_assertions::assert_eq;

    struct QueryRoot;

    impl ResolvableObject for QueryRoot {
        fn type_names(&self) -> Vec<String> {
            vec!["Query".to_owned()]
        }

        fn resolvers(&self) -> HashMap<String, Resolver> {
            let mut map: HashMap<String, Resolver> = HashMap::new();
            map.insert(
                "n".to_owned(),
                Arc::new(|params| {
                    async move { crate::resolve::resolve_scalar(7, &params).await }.boxed()
                }),
            );
            map
        }
    }

    fn document_with(operation: crate::ast::OperationDefinition) -> Document {
        Document::new_validated(vec![crate::ast::Definition::Operation(operation)])
    }

    #[tokio::test]
    async fn resolves_a_simple_query_to_data_with_no_errors() {
        let document = document_with(builder::operation(
            OperationType::Query,
            vec![builder::field("n")],
        ));
        let object = Object::new(QueryRoot);
        let response = execute_request(
            &document,
            &object,
            Arc::new(()),
            Map::new(),
            None,
            Launch::Inline,
        )
        .await;

        let map = response.as_map().unwrap();
        assert!(map.get("errors").is_none());
        let data = map.get("data").unwrap().as_map().unwrap();
        assert_eq!(data.get("n"), Some(&Value::Int(7)));
    }

    #[tokio::test]
    async fn missing_operation_produces_a_null_data_response_with_an_error() {
        let document = Document::new_validated(Vec::new());
        let object = Object::new(QueryRoot);
        let response = execute_request(
            &document,
            &object,
            Arc::new(()),
            Map::new(),
            None,
            Launch::Inline,
        )
        .await;

        let map = response.as_map().unwrap();
        assert_eq!(map.get("data"), Some(&Value::Null));
        let errors = map.get("errors").unwrap().as_list().unwrap();
        assert!(errors[0]
            .as_map()
            .unwrap()
            .get("message")
            .unwrap()
            .as_str()
            .unwrap()
            .contains("Missing operation"));
    }

    #[tokio::test]
    async fn rejects_a_subscription_from_the_query_entry_point() {
        let document = document_with(builder::operation(OperationType::Subscription, vec![]));
        let object = Object::new(QueryRoot);
        let response = execute_request(
            &document,
            &object,
            Arc::new(()),
            Map::new(),
            None,
            Launch::Inline,
        )
        .await;

        let map = response.as_map().unwrap();
        assert_eq!(map.get("data"), Some(&Value::Null));
        let errors = map.get("errors").unwrap().as_list().unwrap();
        assert!(errors[0]
            .as_map()
            .unwrap()
            .get("message")
            .unwrap()
            .as_str()
            .unwrap()
            .contains("Unexpected subscription"));
    }

    #[tokio::test]
    async fn a_leaf_field_violation_reports_an_error_and_nulls_just_that_field() {
        // The offending field's own slot finishes `null` (no value was ever
        // streamed into it) but sibling fields are unaffected — the whole
        // operation is not aborted, matching `GraphQLService.cpp`'s
        // `visitField` catching `schema_exception` per field rather than
        // propagating it out of `Request::resolve`.
        let document = document_with(builder::operation(
            OperationType::Query,
            vec![builder::parent_field("n", vec![builder::field("oops")])],
        ));
        let object = Object::new(QueryRoot);
        let response = execute_request(
            &document,
            &object,
            Arc::new(()),
            Map::new(),
            None,
            Launch::Inline,
        )
        .await;

        let map = response.as_map().unwrap();
        let data = map.get("data").unwrap().as_map().unwrap();
        assert_eq!(data.get("n"), Some(&Value::Null));
        let errors = map.get("errors").unwrap().as_list().unwrap();
        assert!(errors[0]
            .as_map()
            .unwrap()
            .get("message")
            .unwrap()
            .as_str()
            .unwrap()
            .contains("Field may not have sub-fields"));
    }
}
