#![cfg_attr(any(doc, test), doc = include_str!("../README.md"))]
#![cfg_attr(not(any(doc, test)), doc = env!("CARGO_PKG_NAME"))]

//! A core GraphQL execution engine: selection-set walking, fragment
//! expansion, directive evaluation, and query/mutation/subscription
//! dispatch, with resolver glue, parsing, and validation left to the
//! caller (see each module's doc comment for its grounding in spec.md).

pub mod assembler;
pub mod ast;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod launch;
pub mod object;
pub mod resolve;
pub mod response;
pub mod subscriptions;
pub mod value;
pub mod visitor;

pub use crate::{
    assembler::{ResolverVisitor, ValueAssembler},
    ast::{Document, OperationType},
    dispatch::execute_request,
    error::{PathSegment, SchemaError, SchemaException},
    executor::{resolve_selection_set, Resolver, ResolverContext, ResolverParams, State},
    launch::Launch,
    object::{Object, ResolvableObject},
    resolve::{convert_argument, resolve_object, resolve_scalar, GraphQlEnum, Id, Resolvable, Scalar},
    response::build_response,
    subscriptions::{
        equals, ArgumentsPredicate, DirectivesPredicate, SubscriptionCallback, SubscriptionFilter,
        SubscriptionKey, SubscriptionRegistry,
    },
    value::{Map, Value},
};

#[cfg(feature = "queue-launch")]
pub use crate::launch::Queue;
