//! The subscription registry (spec.md §4.8): subscribe/unsubscribe lifecycle
//! plus filtered delivery fan-out.
//!
//! Grounded on `original_source/src/GraphQLService.cpp`'s
//! `Request::{addSubscription, removeSubscription, deliver,
//! collectRegistrations}` (around lines 2144-2460), which this crate's
//! `SubscriptionRegistry` follows closely: a monotonic key counter reset to
//! 0 whenever the registry empties, a `field name -> key set` listener index
//! kept alongside the `key -> registration` map, and a two-phase
//! `deliver` that collects matching registrations under the lock and then
//! resolves/calls back outside it. `juniper` has no subscription-registry
//! analog of its own (its `juniper_subscriptions` crate wraps a `Stream` per
//! subscription instead of a key/filter registry), so the shape here is
//! grounded entirely on `original_source`, expressed with this crate's own
//! `ResolverParams`/`ValueAssembler`/`Launch` machinery in place of
//! `original_source`'s coroutine resolver.
//!
//! **Simplification from `original_source`:** the original keeps a full
//! per-operation-type `_operations` map (`query`/`mutation`/`subscription` ->
//! root `Object`) on `Request`, and further distinguishes "no `subscription`
//! entry at all" (`Subscriptions not supported`) from "entry present but
//! null, and no override passed to `deliver`" (`Missing subscriptionObject`).
//! This crate has no `Request`/schema-registry type (spec.md §1 scopes that
//! out), so [`SubscriptionRegistry`] takes a single `Option<Arc<Object>>` at
//! construction and collapses both cases to *Subscriptions not supported*
//! when it is `None` — documented as an Open Question decision in
//! `DESIGN.md`.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use crate::{
    assembler::{ResolverVisitor, ValueAssembler},
    ast::{Document, InlineFragment, OperationType, Selection, Spanning},
    error::{SchemaError, SchemaException},
    executor::{
        path::FieldPath, Fragment, OperationData, Resolver, ResolverContext, ResolverParams,
        SelectionSetParams, State,
    },
    launch::Launch,
    object::Object,
    response::build_response,
    value::{Map, Value},
    visitor::{should_skip, visit_arguments, visit_directives, visit_value, Directives},
};

/// A subscription's identity, assigned on [`SubscriptionRegistry::subscribe`]
/// (spec.md §3).
pub type SubscriptionKey = u64;

/// A `Fn(response document)` invoked synchronously from
/// [`SubscriptionRegistry::deliver`] (spec.md §6 "Subscription callback
/// contract").
pub type SubscriptionCallback = Arc<dyn Fn(Value) + Send + Sync>;

/// A predicate over a registration's captured arguments or field directives
/// (spec.md §4.8 filter table). Construct with [`equals`] for the literal-map
/// case, or supply any closure for the caller-callback case.
pub type ArgumentsPredicate = Arc<dyn Fn(&Map) -> bool + Send + Sync>;

/// A predicate over a registration's field [`Directives`].
pub type DirectivesPredicate = Arc<dyn Fn(&Directives) -> bool + Send + Sync>;

/// Builds an [`ArgumentsPredicate`] that requires every entry of `required`
/// to be present (by name) and equal in the registration's arguments.
pub fn equals(required: Map) -> ArgumentsPredicate {
    Arc::new(move |actual: &Map| required.iter().all(|(k, v)| actual.get(k) == Some(v)))
}

/// Which registrations [`SubscriptionRegistry::deliver`] should collect
/// (spec.md §4.8 filter table).
pub enum SubscriptionFilter {
    /// All registrations listening to the delivered field.
    All,
    /// Only the registration with this key, if it listens to the field.
    Key(SubscriptionKey),
    /// Registrations whose captured arguments/directives satisfy the given
    /// predicates (a predicate that is `None` matches unconditionally).
    Match {
        /// Argument predicate, checked against the registration's captured
        /// arguments.
        arguments: Option<ArgumentsPredicate>,
        /// Directive predicate, checked against the registration's field
        /// directives.
        directives: Option<DirectivesPredicate>,
    },
}

/// One live subscription registration (spec.md §3 `SubscriptionData`).
struct SubscriptionData {
    operation: Arc<OperationData>,
    field_name: String,
    field: Arc<Spanning<crate::ast::Field>>,
    arguments: Map,
    field_directives: Directives,
    sub_selection: Option<Arc<[Selection]>>,
    resolver: Resolver,
    callback: SubscriptionCallback,
}

impl SubscriptionData {
    /// Invokes this registration's resolver once under `resolver_context`,
    /// suspending per `launch`, and returns whatever it streamed plus any
    /// captured errors. Mirrors [`crate::executor::run_field`] but for a
    /// single standalone field with no enclosing selection set.
    async fn invoke(&self, resolver_context: ResolverContext, launch: Launch) -> (Value, Vec<SchemaError>) {
        let field_path = Arc::new(FieldPath::Root)
            .child(crate::error::PathSegment::Field(self.field_name.clone()), self.field.location);
        let selection_set_params = SelectionSetParams {
            operation: Arc::clone(&self.operation),
            launch: launch.clone(),
            resolver_context,
            field_path: Arc::clone(&field_path),
            directive_stack: None,
        };

        let (sink, errors) = ValueAssembler::new_root();
        let dyn_sink: Arc<dyn ResolverVisitor> = sink.clone();

        launch.suspend().await;

        let resolver_params = ResolverParams {
            selection_set_params,
            field: Arc::clone(&self.field),
            response_name: Arc::from(self.field_name.as_str()),
            arguments: self.arguments.clone(),
            field_directives: self.field_directives.clone(),
            sub_selection: self.sub_selection.clone(),
            sink: dyn_sink,
        };
        let location = resolver_params.field.location;

        let mut all_errors = errors.lock().unwrap().clone();
        if let Err(exception) = (self.resolver)(resolver_params).await {
            let path = field_path.flatten();
            for error in exception.errors {
                all_errors.push(error.with_location_if_unset(location).with_path_if_unset(&path));
            }
        }

        let data = sink.finish();
        (data, all_errors)
    }
}

struct Inner {
    next_key: SubscriptionKey,
    subscriptions: HashMap<SubscriptionKey, Arc<SubscriptionData>>,
    listeners: HashMap<String, HashSet<SubscriptionKey>>,
}

/// The subscription lifecycle manager (spec.md §4.8).
///
/// Held behind `Arc` so `subscribe`/`unsubscribe`/`deliver` can be called
/// concurrently with the lock scoped to just the bookkeeping, per spec.md §5
/// "delivery's resolver invocations run outside the lock".
pub struct SubscriptionRegistry {
    subscription_object: Option<Arc<Object>>,
    inner: Mutex<Inner>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry. `subscription_object` is the root `Object`
    /// subscription fields resolve against; `None` means this server has no
    /// subscription root at all (every `subscribe`/`deliver` call then fails
    /// with *Subscriptions not supported*).
    pub fn new(subscription_object: Option<Arc<Object>>) -> Arc<Self> {
        Arc::new(Self {
            subscription_object,
            inner: Mutex::new(Inner {
                next_key: 0,
                subscriptions: HashMap::new(),
                listeners: HashMap::new(),
            }),
        })
    }

    /// Registers a new subscription from a validated `document`, returning
    /// its [`SubscriptionKey`] (spec.md §4.8 `subscribe`).
    ///
    /// `validate` runs at most once per document (memoized on the document
    /// itself via [`Document::ensure_validated`]) — validation is an
    /// external collaborator (spec.md §1), so the caller supplies it.
    pub async fn subscribe(
        &self,
        document: &Document,
        validate: impl FnOnce(&Document) -> Result<(), Vec<SchemaError>>,
        state: State,
        caller_variables: Map,
        operation_name: Option<&str>,
        launch: Launch,
        callback: SubscriptionCallback,
    ) -> Result<SubscriptionKey, SchemaException> {
        let Some(subscription_object) = self.subscription_object.clone() else {
            return Err(SchemaException::new("Subscriptions not supported"));
        };

        document
            .ensure_validated(validate)
            .map_err(SchemaException::from_errors)?;

        let operation = document.find_operation(operation_name).ok_or_else(|| {
            SchemaException::from_error(SchemaError::new(format!(
                "Missing subscription [name: {}]",
                operation_name.unwrap_or("")
            )))
        })?;
        if operation.operation_type != OperationType::Subscription {
            return Err(SchemaException::from_error(SchemaError::new(format!(
                "Unexpected operation type: {:?}",
                operation.operation_type
            ))));
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

        let mut fragments = HashMap::new();
        for fragment in document.fragment_definitions() {
            let directives = visit_directives(&fragment.directives, &variables)
                .map_err(SchemaException::from_error)?;
            fragments.insert(
                fragment.name.clone(),
                Fragment {
                    type_condition: fragment.type_condition.clone(),
                    directives,
                    selection_set: Arc::clone(&fragment.selection_set),
                },
            );
        }
        let fragments = Arc::new(fragments);

        let operation_directives = visit_directives(&operation.directives, &variables)
            .map_err(SchemaException::from_error)?;

        let mut root_field = None;
        collect_subscription_root_field(
            &subscription_object,
            &operation.selection_set,
            &fragments,
            &variables,
            &mut root_field,
        )?;
        let Some(field_node) = root_field else {
            return Err(SchemaException::from_error(SchemaError::new(
                "Missing subscription root field",
            )));
        };

        let field = &field_node.item;
        let Some(resolver) = subscription_object.resolver(&field.name.item).cloned() else {
            return Err(SchemaException::from_error(SchemaError::new(format!(
                "Unknown field name: {}",
                field.name.item
            ))));
        };
        let field_directives =
            visit_directives(&field.directives, &variables).map_err(SchemaException::from_error)?;
        let arguments =
            visit_arguments(&field.arguments, &variables).map_err(SchemaException::from_error)?;

        let operation_data = Arc::new(OperationData {
            state,
            variables,
            directives: operation_directives,
            fragments,
        });

        let registration = Arc::new(SubscriptionData {
            operation: operation_data,
            field_name: field.name.item.clone(),
            field: Arc::clone(&field_node),
            arguments,
            field_directives,
            sub_selection: field.selection_set.clone(),
            resolver,
            callback,
        });

        let key = {
            let mut inner = self.inner.lock().unwrap();
            let key = inner.next_key;
            inner.next_key += 1;
            inner
                .listeners
                .entry(registration.field_name.clone())
                .or_default()
                .insert(key);
            inner.subscriptions.insert(key, Arc::clone(&registration));
            key
        };

        let (_, errors) = registration.invoke(ResolverContext::NotifySubscribe, launch).await;
        if !errors.is_empty() {
            self.remove(key);
            return Err(SchemaException::from_errors(errors));
        }

        Ok(key)
    }

    /// Tears down subscription `key` (spec.md §4.8 `unsubscribe`): looks up
    /// the registration, invokes its resolver once with
    /// [`ResolverContext::NotifyUnsubscribe`], and only then removes it from
    /// both maps — matching `GraphQLService.cpp`'s `unsubscribe`, which
    /// unlocks and awaits the resolver before re-locking to call
    /// `removeSubscription`. The subscription is removed whether or not the
    /// invocation produces errors; errors are still surfaced to the caller.
    pub async fn unsubscribe(&self, key: SubscriptionKey, launch: Launch) -> Result<(), SchemaException> {
        let Some(registration) = self.lookup(key) else {
            return Ok(());
        };
        let (_, errors) = registration.invoke(ResolverContext::NotifyUnsubscribe, launch).await;
        self.remove(key);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(SchemaException::from_errors(errors))
        }
    }

    /// Clones a registration out of the map without removing it.
    fn lookup(&self, key: SubscriptionKey) -> Option<Arc<SubscriptionData>> {
        self.inner.lock().unwrap().subscriptions.get(&key).cloned()
    }

    fn remove(&self, key: SubscriptionKey) -> Option<Arc<SubscriptionData>> {
        let mut inner = self.inner.lock().unwrap();
        let registration = inner.subscriptions.remove(&key)?;
        if let Some(listener) = inner.listeners.get_mut(&registration.field_name) {
            listener.remove(&key);
            if listener.is_empty() {
                inner.listeners.remove(&registration.field_name);
            }
        }
        inner.next_key = inner.subscriptions.keys().max().map_or(0, |max| max + 1);
        Some(registration)
    }

    /// Re-resolves every registration matching `field`/`filter` and invokes
    /// each one's callback with a `{data, errors}` document (spec.md §4.8
    /// `deliver`). A resolver exception during one delivery is embedded as
    /// that delivery's errors rather than aborting the fan-out.
    pub async fn deliver(&self, field: &str, filter: SubscriptionFilter, launch: Launch) {
        let registrations = self.collect_registrations(field, filter);
        for registration in registrations {
            let (data, errors) = registration.invoke(ResolverContext::Subscription, launch.clone()).await;
            (registration.callback)(build_response(data, &errors));
        }
    }

    fn collect_registrations(&self, field: &str, filter: SubscriptionFilter) -> Vec<Arc<SubscriptionData>> {
        let inner = self.inner.lock().unwrap();
        let Some(keys) = inner.listeners.get(field) else {
            return Vec::new();
        };

        match filter {
            SubscriptionFilter::All => keys
                .iter()
                .filter_map(|key| inner.subscriptions.get(key).cloned())
                .collect(),
            SubscriptionFilter::Key(key) => {
                if keys.contains(&key) {
                    inner.subscriptions.get(&key).cloned().into_iter().collect()
                } else {
                    Vec::new()
                }
            }
            SubscriptionFilter::Match { arguments, directives } => keys
                .iter()
                .filter_map(|key| inner.subscriptions.get(key).cloned())
                .filter(|registration| {
                    arguments
                        .as_ref()
                        .map_or(true, |matches| matches(&registration.arguments))
                        && directives
                            .as_ref()
                            .map_or(true, |matches| matches(&registration.field_directives))
                })
                .collect(),
        }
    }
}

/// Walks `selection_set`, expanding fragments (subject to type condition and
/// `@skip`/`@include`), and records the single root field found in `found`.
/// Fails *Extra subscription root field* if a second one is seen.
fn collect_subscription_root_field(
    subscription_object: &Arc<Object>,
    selection_set: &[Selection],
    fragments: &crate::executor::FragmentMap,
    variables: &Map,
    found: &mut Option<Arc<Spanning<crate::ast::Field>>>,
) -> Result<(), SchemaException> {
    for selection in selection_set {
        match selection {
            Selection::Field(node) => {
                if found.is_some() {
                    return Err(SchemaException::from_error(SchemaError::at(
                        format!("Extra subscription root field name: {}", node.item.name.item),
                        node.location,
                        Vec::new(),
                    )));
                }
                *found = Some(Arc::clone(node));
            }
            Selection::FragmentSpread(node) => {
                let spread = &node.item;
                let Some(fragment) = fragments.get(&spread.name.item) else {
                    return Err(SchemaException::from_error(SchemaError::at(
                        format!("Unknown fragment name: {}", spread.name.item),
                        node.location,
                        Vec::new(),
                    )));
                };
                let directives = visit_directives(&spread.directives, variables)
                    .map_err(SchemaException::from_error)?;
                if should_skip(&directives).map_err(SchemaException::from_error)? {
                    continue;
                }
                if !subscription_object.matches_type(&fragment.type_condition) {
                    continue;
                }
                let selection_set = Arc::clone(&fragment.selection_set);
                collect_subscription_root_field(
                    subscription_object,
                    &selection_set,
                    fragments,
                    variables,
                    found,
                )?;
            }
            Selection::InlineFragment(node) => {
                let inline = inline_fragment_matches(subscription_object, node, variables)?;
                if let Some(selection_set) = inline {
                    collect_subscription_root_field(
                        subscription_object,
                        &selection_set,
                        fragments,
                        variables,
                        found,
                    )?;
                }
            }
        }
    }
    Ok(())
}

fn inline_fragment_matches(
    subscription_object: &Arc<Object>,
    node: &Arc<Spanning<InlineFragment>>,
    variables: &Map,
) -> Result<Option<Arc<[Selection]>>, SchemaException> {
    let inline = &node.item;
    let directives =
        visit_directives(&inline.directives, variables).map_err(SchemaException::from_error)?;
    if should_skip(&directives).map_err(SchemaException::from_error)? {
        return Ok(None);
    }
    if let Some(type_condition) = &inline.type_condition {
        if !subscription_object.matches_type(type_condition) {
            return Ok(None);
        }
    }
    Ok(Some(Arc::clone(&inline.selection_set)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ast::builder, executor::Resolver, object::ResolvableObject};
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct SubscriptionRoot;

    impl ResolvableObject for SubscriptionRoot {
        fn type_names(&self) -> Vec<String> {
            vec!["Subscription".to_owned()]
        }

        fn resolvers(&self) -> HashMap<String, Resolver> {
            let mut map: HashMap<String, Resolver> = HashMap::new();
            map.insert(
                "events".to_owned(),
                Arc::new(|params| {
                    async move {
                        if params.selection_set_params.resolver_context == ResolverContext::Subscription {
                            params.sink.add_string("ping".to_owned());
                        }
                        Ok(())
                    }
                    .boxed()
                }),
            );
            map
        }
    }

    fn document() -> Document {
        Document::new_validated(vec![crate::ast::Definition::Operation(builder::operation(
            OperationType::Subscription,
            vec![builder::field("events")],
        ))])
    }

    #[tokio::test]
    async fn delivers_to_a_matching_registration_and_stops_after_unsubscribe() {
        let registry = SubscriptionRegistry::new(Some(Object::new(SubscriptionRoot)));
        let deliveries = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&deliveries);
        let callback: SubscriptionCallback = Arc::new(move |_doc| {
            counted.fetch_add(1, Ordering::SeqCst);
        });

        let key = registry
            .subscribe(
                &document(),
                |_| Ok(()),
                Arc::new(()),
                Map::new(),
                None,
                Launch::Inline,
                callback,
            )
            .await
            .unwrap();

        registry.deliver("events", SubscriptionFilter::All, Launch::Inline).await;
        assert_eq!(deliveries.load(Ordering::SeqCst), 1);

        registry.unsubscribe(key, Launch::Inline).await.unwrap();
        registry.deliver("events", SubscriptionFilter::All, Launch::Inline).await;
        assert_eq!(deliveries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rejects_a_second_root_field() {
        let document = Document::new_validated(vec![crate::ast::Definition::Operation(
            builder::operation(
                OperationType::Subscription,
                vec![builder::field("events"), builder::field("events")],
            ),
        )]);
        let registry = SubscriptionRegistry::new(Some(Object::new(SubscriptionRoot)));
        let err = registry
            .subscribe(
                &document,
                |_| Ok(()),
                Arc::new(()),
                Map::new(),
                None,
                Launch::Inline,
                Arc::new(|_| {}),
            )
            .await
            .unwrap_err();
        assert!(err.errors[0].message.contains("Extra subscription root field"));
    }

    fn document_with_arg(value: &str) -> Document {
        Document::new_validated(vec![crate::ast::Definition::Operation(builder::operation(
            OperationType::Subscription,
            vec![builder::field_with_arguments(
                "events",
                vec![("room".to_owned(), crate::ast::Literal::String(value.to_owned()))],
            )],
        ))])
    }

    #[tokio::test]
    async fn match_filter_delivers_only_to_subscriptions_with_matching_arguments() {
        // spec.md §8 Scenario 6: a captured-argument filter must select only
        // the registrations whose own arguments satisfy it.
        let registry = SubscriptionRegistry::new(Some(Object::new(SubscriptionRoot)));

        let matching = Arc::new(AtomicUsize::new(0));
        let matching_counted = Arc::clone(&matching);
        let matching_key = registry
            .subscribe(
                &document_with_arg("lobby"),
                |_| Ok(()),
                Arc::new(()),
                Map::new(),
                None,
                Launch::Inline,
                Arc::new(move |_doc| {
                    matching_counted.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .await
            .unwrap();

        let other = Arc::new(AtomicUsize::new(0));
        let other_counted = Arc::clone(&other);
        registry
            .subscribe(
                &document_with_arg("basement"),
                |_| Ok(()),
                Arc::new(()),
                Map::new(),
                None,
                Launch::Inline,
                Arc::new(move |_doc| {
                    other_counted.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .await
            .unwrap();

        let mut required = Map::new();
        required.insert("room".to_owned(), Value::String("lobby".to_owned()));
        registry
            .deliver(
                "events",
                SubscriptionFilter::Match {
                    arguments: Some(equals(required)),
                    directives: None,
                },
                Launch::Inline,
            )
            .await;

        assert_eq!(matching.load(Ordering::SeqCst), 1);
        assert_eq!(other.load(Ordering::SeqCst), 0);

        // A filter that matches nobody delivers to nobody.
        let mut no_match = Map::new();
        no_match.insert("room".to_owned(), Value::String("attic".to_owned()));
        registry
            .deliver(
                "events",
                SubscriptionFilter::Match {
                    arguments: Some(equals(no_match)),
                    directives: None,
                },
                Launch::Inline,
            )
            .await;

        assert_eq!(matching.load(Ordering::SeqCst), 1);
        assert_eq!(other.load(Ordering::SeqCst), 0);

        registry.unsubscribe(matching_key, Launch::Inline).await.unwrap();
    }

    #[tokio::test]
    async fn no_subscription_object_fails_with_subscriptions_not_supported() {
        let registry = SubscriptionRegistry::new(None);
        let err = registry
            .subscribe(
                &document(),
                |_| Ok(()),
                Arc::new(()),
                Map::new(),
                None,
                Launch::Inline,
                Arc::new(|_| {}),
            )
            .await
            .unwrap_err();
        assert!(err.errors[0].message.contains("Subscriptions not supported"));
    }
}
