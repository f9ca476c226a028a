//! Scalar/object result conversion (spec.md §4.4).
//!
//! Two separate concerns spec.md names under one heading get two Rust
//! traits here: [`Scalar`] decodes an AST-derived [`Value`] into an argument
//! or input-field type (`Argument<T>::convert`/`Result<T>::validateScalar`);
//! [`Resolvable`] streams a resolver's already-produced value into a sink
//! (`Result<T>::resolve`'s scalar branch). [`resolve_object`] is the Object
//! branch of the same operation, kept as its own function since it recurses
//! into [`crate::executor::resolve_selection_set`] instead of emitting a
//! leaf value.
//!
//! Grounded on `juniper::types::scalars` (`FromInputValue`/`ToInputValue`,
//! `graphql-rust-juniper/juniper/src/types/scalars.rs`) for the per-scalar
//! conversion rules (Int→Float coercion, strict `Float`-only validation),
//! and on `juniper::ast::Type`'s `List`/`Nullable` nesting
//! (`graphql-rust-juniper/juniper/src/ast.rs`) for the TypeModifier
//! composition — reshaped here as ordinary generic impls
//! (`Option<T>`/`Vec<T>`) instead of a runtime modifier enum, since Rust's
//! type system already expresses "list of", "nullable" as type-level
//! composition.

use std::sync::Arc;

use crate::{
    assembler::ResolverVisitor,
    error::{SchemaError, SchemaException},
    executor::{resolve_selection_set, ResolverParams},
    object::Object,
    value::{Map, Value},
};

/// Decodes an inbound [`Value`] into an argument or input-field type
/// (spec.md §4.4 `Argument<T>::convert`/`Result<T>::validateScalar`).
///
/// `convert` is the permissive decoder used for arguments (Int→Float
/// coercion, String→Id when the bytes are otherwise valid); `validate` is
/// the stricter checker spec.md calls out explicitly for input-side scalars
/// (a `Float` input must already be a `Float` literal/variable, not an
/// `Int`).
pub trait Scalar: Sized {
    /// The scalar's display name, used in `not a valid T value` messages.
    const NAME: &'static str;

    /// Decodes `value`, coercing where spec.md §4.4 allows it.
    fn convert(value: &Value) -> Result<Self, SchemaError>;

    /// Decodes `value` with no coercions beyond what `convert` already
    /// disallows. Defaults to `convert`; scalars with a stricter rule (only
    /// [`f64`] today) override it.
    fn validate(value: &Value) -> Result<Self, SchemaError> {
        Self::convert(value)
    }
}

fn not_a_valid_value<T: Scalar>() -> SchemaError {
    SchemaError::new(format!("not a valid {} value", T::NAME))
}

impl Scalar for i32 {
    const NAME: &'static str = "Int";

    fn convert(value: &Value) -> Result<Self, SchemaError> {
        match value {
            Value::Int(i) => Ok(*i),
            _ => Err(not_a_valid_value::<Self>()),
        }
    }
}

impl Scalar for f64 {
    const NAME: &'static str = "Float";

    fn convert(value: &Value) -> Result<Self, SchemaError> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Int(i) => Ok(f64::from(*i)),
            _ => Err(not_a_valid_value::<Self>()),
        }
    }

    fn validate(value: &Value) -> Result<Self, SchemaError> {
        match value {
            Value::Float(f) => Ok(*f),
            _ => Err(not_a_valid_value::<Self>()),
        }
    }
}

impl Scalar for String {
    const NAME: &'static str = "String";

    fn convert(value: &Value) -> Result<Self, SchemaError> {
        match value {
            Value::String(s) => Ok(s.clone()),
            _ => Err(not_a_valid_value::<Self>()),
        }
    }
}

impl Scalar for bool {
    const NAME: &'static str = "Boolean";

    fn convert(value: &Value) -> Result<Self, SchemaError> {
        match value {
            Value::Bool(b) => Ok(*b),
            _ => Err(not_a_valid_value::<Self>()),
        }
    }
}

/// A GraphQL `ID`, carried as its underlying bytes — distinct from a bare
/// `Vec<u8>` so it cannot collide with a future byte-list scalar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Id(pub Vec<u8>);

impl Scalar for Id {
    const NAME: &'static str = "ID";

    fn convert(value: &Value) -> Result<Self, SchemaError> {
        match value {
            Value::Id(bytes) => Ok(Self(bytes.clone())),
            Value::String(s) => Ok(Self(s.clone().into_bytes())),
            _ => Err(not_a_valid_value::<Self>()),
        }
    }
}

/// A custom enum member, carried by name (spec.md §3: "distinct from
/// String: it carries a name without a type table").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphQlEnum(pub String);

impl Scalar for GraphQlEnum {
    const NAME: &'static str = "enum";

    fn convert(value: &Value) -> Result<Self, SchemaError> {
        match value {
            Value::EnumValue(name) => Ok(Self(name.clone())),
            _ => Err(not_a_valid_value::<Self>()),
        }
    }
}

/// Decodes an argument by name out of an arguments [`Map`], the common case
/// resolver glue needs (missing argument vs. present-but-wrong-type are both
/// `not a valid T value` per spec.md §4.4, since defaults were already
/// applied by [`crate::visitor`] before the map reached the resolver).
pub fn convert_argument<T: Scalar>(arguments: &Map, name: &str) -> Result<T, SchemaError> {
    match arguments.get(name) {
        Some(value) => T::convert(value),
        None => Err(not_a_valid_value::<T>()),
    }
}

/// A value a resolver has already produced, ready to stream into a sink
/// (spec.md §4.4 `Result<T>::resolve`'s scalar branch).
///
/// `Option<T>`/`Vec<T>` compose to express spec.md's TypeModifier chain:
/// `Option<Vec<T>>` is a nullable list, `Vec<Option<T>>` is a list of
/// nullable elements, and so on — "Null awaited values produce `add_null`
/// and stop the chain" falls out of `Option`'s own `emit`.
pub trait Resolvable {
    /// Streams `self` into `sink`.
    fn emit(self, sink: &dyn ResolverVisitor);
}

impl Resolvable for i32 {
    fn emit(self, sink: &dyn ResolverVisitor) {
        sink.add_int(self);
    }
}

impl Resolvable for f64 {
    fn emit(self, sink: &dyn ResolverVisitor) {
        sink.add_float(self);
    }
}

impl Resolvable for String {
    fn emit(self, sink: &dyn ResolverVisitor) {
        sink.add_string(self);
    }
}

impl Resolvable for bool {
    fn emit(self, sink: &dyn ResolverVisitor) {
        sink.add_bool(self);
    }
}

impl Resolvable for Id {
    fn emit(self, sink: &dyn ResolverVisitor) {
        sink.add_id(self.0);
    }
}

impl Resolvable for GraphQlEnum {
    fn emit(self, sink: &dyn ResolverVisitor) {
        sink.add_enum(self.0);
    }
}

impl Resolvable for Value {
    /// Streams an already-built response fragment wholesale — the "arbitrary
    /// Value" scalar type spec.md §4.4 lists alongside the named scalars.
    fn emit(self, sink: &dyn ResolverVisitor) {
        emit_value(self, sink);
    }
}

fn emit_value(value: Value, sink: &dyn ResolverVisitor) {
    match value {
        Value::Null => sink.add_null(),
        Value::Bool(b) => sink.add_bool(b),
        Value::Int(i) => sink.add_int(i),
        Value::Float(f) => sink.add_float(f),
        Value::String(s) => sink.add_string(s),
        Value::EnumValue(name) => sink.add_enum(name),
        Value::Id(bytes) => sink.add_id(bytes),
        Value::List(items) => {
            sink.start_array();
            for item in items {
                let child = sink.add_element();
                emit_value(item, &*child);
            }
        }
        Value::Map(map) => {
            sink.start_object();
            for (key, value) in map {
                let child = sink.add_member(&key);
                emit_value(value, &*child);
            }
        }
    }
}

impl<T: Resolvable> Resolvable for Option<T> {
    fn emit(self, sink: &dyn ResolverVisitor) {
        match self {
            Some(value) => value.emit(sink),
            None => sink.add_null(),
        }
    }
}

impl<T: Resolvable> Resolvable for Vec<T> {
    fn emit(self, sink: &dyn ResolverVisitor) {
        sink.start_array();
        for item in self {
            let child = sink.add_element();
            item.emit(&*child);
        }
    }
}

/// Resolves a scalar (or enum, or arbitrary `Value`) field result: rejects a
/// non-empty sub-selection (spec.md §4.3 "leaf-field discipline"), suspends
/// once more per the launch policy, then streams `value` into the field's
/// sink.
pub async fn resolve_scalar<T: Resolvable>(
    value: T,
    params: &ResolverParams,
) -> Result<(), SchemaException> {
    if params.sub_selection.is_some() {
        return Err(SchemaException::from_error(SchemaError::new(format!(
            "Field may not have sub-fields name: {}",
            params.field.item.response_name()
        ))));
    }
    params.selection_set_params.launch.suspend().await;
    value.emit(&*params.sink);
    Ok(())
}

/// Resolves an object field result: requires a non-empty sub-selection
/// (spec.md §4.3), suspends once more, then recursively resolves that
/// sub-selection against `object`.
pub async fn resolve_object(
    object: &Arc<Object>,
    params: &ResolverParams,
) -> Result<(), SchemaException> {
    let Some(selection_set) = params.sub_selection.clone() else {
        return Err(SchemaException::from_error(SchemaError::new(format!(
            "Field must have sub-fields name: {}",
            params.field.item.response_name()
        ))));
    };
    params.selection_set_params.launch.suspend().await;
    resolve_selection_set(object, &selection_set, &params.selection_set_params, &params.sink).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_converts_strictly() {
        assert_eq!(i32::convert(&Value::Int(3)), Ok(3));
        assert!(i32::convert(&Value::Float(3.0)).is_err());
    }

    #[test]
    fn float_convert_coerces_int_but_validate_does_not() {
        assert_eq!(f64::convert(&Value::Int(3)), Ok(3.0));
        assert!(f64::validate(&Value::Int(3)).is_err());
        assert_eq!(f64::validate(&Value::Float(3.0)), Ok(3.0));
    }

    #[test]
    fn id_accepts_both_id_and_string_values() {
        assert_eq!(Id::convert(&Value::Id(vec![1, 2])).unwrap(), Id(vec![1, 2]));
        assert_eq!(
            Id::convert(&Value::String("ab".into())).unwrap(),
            Id(b"ab".to_vec())
        );
    }

    #[test]
    fn convert_argument_reports_missing_the_same_as_wrong_type() {
        let arguments = Map::new();
        let err = convert_argument::<i32>(&arguments, "x").unwrap_err();
        assert!(err.message.contains("not a valid Int value"));
    }
}
