//! Value and directive construction from AST literals (spec.md §4.1).
//!
//! Grounded on `juniper`'s `InputValue::into_const` (substituting variables)
//! and the `is_excluded` directive check in
//! `graphql-rust-juniper/juniper/src/types/base.rs` (`@skip`/`@include`
//! evaluation order and argument shape), reshaped around this crate's
//! untyped [`Value`] instead of a generic `ScalarValue`.

use crate::{
    ast::{Directive, Literal, Spanning},
    error::SchemaError,
    value::{Map, Value},
};

/// Builds a [`Value`] from a literal AST node, substituting `$variable`
/// references against `variables`.
///
/// No coercion to an expected scalar type happens here (spec.md §4.1) — that
/// is resolver/`Argument<T>::convert` responsibility (spec.md §4.6).
pub fn visit_value(node: &Spanning<Literal>, variables: &Map) -> Result<Value, SchemaError> {
    Ok(match &node.item {
        Literal::Null => Value::Null,
        Literal::Int(i) => Value::Int(*i as i32),
        Literal::Float(f) => Value::Float(*f),
        Literal::String(s) => Value::String(s.clone()),
        Literal::Boolean(b) => Value::Bool(*b),
        Literal::Enum(name) => Value::EnumValue(name.clone()),
        Literal::Variable(name) => variables.get(name).cloned().ok_or_else(|| {
            SchemaError::at(
                format!("Unknown variable name: {name}"),
                node.location,
                Vec::new(),
            )
        })?,
        Literal::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(visit_value(item, variables)?);
            }
            Value::List(out)
        }
        Literal::Object(fields) => {
            let mut map = Map::with_capacity(fields.len());
            for (key, value) in fields {
                map.insert(key.item.clone(), visit_value(value, variables)?);
            }
            Value::Map(map)
        }
    })
}

/// Builds an arguments [`Map`] from an AST `arguments` node, in source
/// order.
pub fn visit_arguments(
    arguments: &crate::ast::Arguments,
    variables: &Map,
) -> Result<Map, SchemaError> {
    let mut map = Map::with_capacity(arguments.len());
    for (name, value) in arguments {
        map.insert(name.item.clone(), visit_value(value, variables)?);
    }
    Ok(map)
}

/// A directive map: name → its resolved argument [`Map`], preserving source
/// order (spec.md §3).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Directives {
    entries: Vec<(String, Map)>,
}

impl Directives {
    /// Looks up the arguments of the first directive named `name`.
    pub fn get(&self, name: &str) -> Option<&Map> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, a)| a)
    }

    /// Iterates directives in source order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Map)> {
        self.entries.iter().map(|(n, a)| (n.as_str(), a))
    }

    /// Whether no directives were present.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builds a [`Directives`] value from an AST `directives` node
/// (`DirectiveVisitor.visit`, spec.md §4.1).
pub fn visit_directives(
    nodes: &[Spanning<Directive>],
    variables: &Map,
) -> Result<Directives, SchemaError> {
    let mut entries = Vec::with_capacity(nodes.len());
    for node in nodes {
        let args = visit_arguments(&node.item.arguments, variables)?;
        entries.push((node.item.name.item.clone(), args));
    }
    Ok(Directives { entries })
}

/// Evaluates `@skip`/`@include` against a directive map, in that fixed order
/// (spec.md §4.1).
///
/// `skip` has skip-when-true polarity, `include` has skip-when-false
/// polarity. Each requires an argument map with exactly one entry named
/// `if` of type `Bool`; anything else is a hard error, never a silent
/// default.
pub fn should_skip(directives: &Directives) -> Result<bool, SchemaError> {
    for (name, polarity_skip_when) in [("skip", true), ("include", false)] {
        let Some(args) = directives.get(name) else {
            continue;
        };
        let condition = read_if_argument(name, args)?;
        return Ok(condition == polarity_skip_when);
    }
    Ok(false)
}

fn read_if_argument(directive_name: &str, args: &Map) -> Result<bool, SchemaError> {
    if args.len() != 1 {
        return Err(SchemaError::new(format!(
            "Invalid arguments: @{directive_name} requires exactly one argument named `if`"
        )));
    }
    match args.get("if") {
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(SchemaError::new(format!(
            "Invalid arguments: @{directive_name}(if:) must be a Boolean"
        ))),
        None => Err(SchemaError::new(format!(
            "Missing argument: @{directive_name} requires an `if` argument"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SchemaLocation;

    fn bool_literal(b: bool) -> Spanning<Literal> {
        Spanning::unlocated(Literal::Boolean(b))
    }

    fn directive(name: &str, if_value: Option<Spanning<Literal>>) -> Spanning<Directive> {
        let mut arguments = Vec::new();
        if let Some(v) = if_value {
            arguments.push((Spanning::unlocated("if".to_owned()), v));
        }
        Spanning::unlocated(Directive {
            name: Spanning::unlocated(name.to_owned()),
            arguments,
        })
    }

    #[test]
    fn skip_if_true_skips() {
        let directives = visit_directives(
            &[directive("skip", Some(bool_literal(true)))],
            &Map::new(),
        )
        .unwrap();
        assert!(should_skip(&directives).unwrap());
    }

    #[test]
    fn include_if_false_skips() {
        let directives = visit_directives(
            &[directive("include", Some(bool_literal(false)))],
            &Map::new(),
        )
        .unwrap();
        assert!(should_skip(&directives).unwrap());
    }

    #[test]
    fn no_directives_never_skips() {
        let directives = Directives::default();
        assert!(!should_skip(&directives).unwrap());
    }

    #[test]
    fn missing_if_argument_errors() {
        let directives = visit_directives(&[directive("skip", None)], &Map::new()).unwrap();
        let err = should_skip(&directives).unwrap_err();
        assert!(err.message.contains("Missing argument"));
    }

    #[test]
    fn unknown_variable_reports_its_location() {
        let node = Spanning::new(Literal::Variable("x".into()), SchemaLocation::new(2, 9));
        let err = visit_value(&node, &Map::new()).unwrap_err();
        assert_eq!(err.location, SchemaLocation::new(2, 9));
        assert!(err.message.contains("Unknown variable name"));
    }
}
