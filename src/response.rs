//! External response shape (spec.md §6 "Output: Response").
//!
//! Grounded on `juniper::GraphQLError`/`ExecutionError::as_json` in
//! `graphql-rust-juniper/juniper/src/executor/mod.rs`, which build the same
//! `{message, locations, path}` error shape in the same field order; this
//! crate exposes it as a plain [`Value`] rather than going through `Serialize`
//! directly, since JSON encoding itself is out of scope (spec.md §1).

use crate::{
    ast::SchemaLocation,
    error::{PathSegment, SchemaError},
    value::{Map, Value},
};

/// Renders one [`SchemaError`] as a Map with keys `message`, `locations`,
/// `path`, in that order (spec.md §6).
fn render_error(error: &SchemaError) -> Value {
    let mut map = Map::with_capacity(3);
    map.insert("message", Value::String(error.message.clone()));
    if !error.location.is_unknown() {
        map.insert("locations", Value::List(vec![render_location(error.location)]));
    }
    if !error.error_path.is_empty() {
        map.insert(
            "path",
            Value::List(error.error_path.iter().map(render_path_segment).collect()),
        );
    }
    Value::Map(map)
}

fn render_location(location: SchemaLocation) -> Value {
    let mut map = Map::with_capacity(2);
    map.insert("line", Value::Int(location.line as i32));
    map.insert("column", Value::Int(location.column as i32));
    Value::Map(map)
}

fn render_path_segment(segment: &PathSegment) -> Value {
    match segment {
        PathSegment::Field(name) => Value::String(name.clone()),
        PathSegment::Index(i) => Value::Int(*i as i32),
    }
}

/// Assembles the final `{data, errors}` response (spec.md §4.7 step 7):
/// `data` is always present, `errors` only when non-empty.
pub fn build_response(data: Value, errors: &[SchemaError]) -> Value {
    let mut map = Map::with_capacity(2);
    map.insert("data", data);
    if !errors.is_empty() {
        map.insert("errors", Value::List(errors.iter().map(render_error).collect()));
    }
    Value::Map(map)
}
