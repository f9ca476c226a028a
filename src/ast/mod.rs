//! Read-only AST types and traversal helpers (spec.md §4.2 "AST reader").
//!
//! The grammar parser that produces this tree is an external collaborator
//! (spec.md §1) — this module only defines the shape the engine reads and a
//! handful of lookup helpers over it (`fragment_definitions`,
//! `find_operation`, `Spanning::location`). The engine never mutates a
//! [`Document`] once built, mirroring `juniper::ast`'s read-only `Document`
//! type (`graphql-rust-juniper/juniper/src/ast.rs`), adapted here to owned
//! `String`s instead of borrowed `&'a str` — the executor has no reason to
//! tie its lifetime to the source text once parsing has already happened
//! upstream.

use std::sync::{Arc, Mutex};

use crate::error::SchemaError;

/// A 1-based source location; `(0, 0)` means "unknown" (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, PartialOrd, Ord, Hash)]
pub struct SchemaLocation {
    /// 1-based line number, or `0` if unknown.
    pub line: u32,
    /// 1-based column number, or `0` if unknown.
    pub column: u32,
}

impl SchemaLocation {
    /// The "unknown location" sentinel.
    pub const UNKNOWN: Self = Self { line: 0, column: 0 };

    /// Constructs a known location.
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// Whether this location carries no real position information.
    pub fn is_unknown(&self) -> bool {
        self.line == 0 && self.column == 0
    }
}

/// Pairs an AST node with the location it was parsed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanning<T> {
    /// The located item.
    pub item: T,
    /// Where `item` started in the source document.
    pub location: SchemaLocation,
}

impl<T> Spanning<T> {
    /// Wraps `item` with `location`.
    pub fn new(item: T, location: SchemaLocation) -> Self {
        Self { item, location }
    }

    /// Wraps `item` with [`SchemaLocation::UNKNOWN`], for synthetic AST nodes
    /// that were never parsed from source (e.g. in tests).
    pub fn unlocated(item: T) -> Self {
        Self {
            item,
            location: SchemaLocation::UNKNOWN,
        }
    }

    /// Maps the wrapped item, keeping the same location.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanning<U> {
        Spanning {
            item: f(self.item),
            location: self.location,
        }
    }
}

/// A literal GraphQL value as written in the query document — as opposed to
/// [`crate::Value`], which is a *resolved* response value. May still contain
/// `Variable` references; [`crate::visitor::ValueVisitor`] substitutes those
/// against the operation's variables to produce a [`crate::Value`].
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// `null`.
    Null,
    /// An integer literal, e.g. `42`.
    Int(i64),
    /// A float literal, e.g. `4.2`.
    Float(f64),
    /// A string literal, with escapes already interpreted by the parser.
    String(String),
    /// `true` / `false`.
    Boolean(bool),
    /// A bare identifier used where an enum value is expected, e.g. `ACTIVE`.
    Enum(String),
    /// A `$name` variable reference.
    Variable(String),
    /// A `[ ... ]` list literal.
    List(Vec<Spanning<Literal>>),
    /// A `{ field: value, ... }` input object literal, preserving source
    /// order.
    Object(Vec<(Spanning<String>, Spanning<Literal>)>),
}

/// One `name: value` argument pair, in source order.
pub type Arguments = Vec<(Spanning<String>, Spanning<Literal>)>;

/// A `@name(args)` directive annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    /// The directive's name, without the leading `@`.
    pub name: Spanning<String>,
    /// The directive's arguments, in source order.
    pub arguments: Arguments,
}

/// A field selection, e.g. `alias: name(arg: 1) { sub }`.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// The response-name alias, if one was given.
    pub alias: Option<Spanning<String>>,
    /// The field's name in the schema.
    pub name: Spanning<String>,
    /// Arguments, in source order.
    pub arguments: Arguments,
    /// Directives attached directly to this field.
    pub directives: Vec<Spanning<Directive>>,
    /// The field's sub-selection, if it has one (`None` for leaf fields).
    ///
    /// `Arc`-shared (like every nested selection set here) so a
    /// [`ResolverParams`](crate::executor::ResolverParams) can carry it into
    /// spawned work without borrowing from the owning [`Document`].
    pub selection_set: Option<Arc<[Selection]>>,
}

impl Field {
    /// The response name: the alias if present, else the field name.
    pub fn response_name(&self) -> &str {
        self.alias
            .as_ref()
            .map(|a| a.item.as_str())
            .unwrap_or(self.name.item.as_str())
    }
}

/// A `...FragmentName` reference.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentSpread {
    /// The referenced fragment's name.
    pub name: Spanning<String>,
    /// Directives attached to the spread itself (distinct from the
    /// fragment definition's own directives).
    pub directives: Vec<Spanning<Directive>>,
}

/// A `... on Type { ... }` or bare `... { ... }` inline fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineFragment {
    /// The `on Type` type condition, if present.
    pub type_condition: Option<String>,
    /// Directives attached to the inline fragment.
    pub directives: Vec<Spanning<Directive>>,
    /// The fragment's selection set.
    pub selection_set: Arc<[Selection]>,
}

/// One entry of a selection set: a field, a named fragment spread, or an
/// inline fragment.
///
/// Each variant is `Arc`-wrapped so that cloning a [`Selection`] (to move it
/// into a resolver invocation that may run on another thread) is a refcount
/// bump, never a deep copy of the sub-tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// A field selection.
    Field(Arc<Spanning<Field>>),
    /// A `...Name` fragment spread.
    FragmentSpread(Arc<Spanning<FragmentSpread>>),
    /// A `... on Type { ... }` inline fragment.
    InlineFragment(Arc<Spanning<InlineFragment>>),
}

/// The three GraphQL operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationType {
    /// `query`.
    Query,
    /// `mutation`.
    Mutation,
    /// `subscription`.
    Subscription,
}

/// A named or anonymous variable declaration on an operation, e.g.
/// `$x: Boolean = false`.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDefinition {
    /// The variable's name, without the leading `$`.
    pub name: String,
    /// The default value, if the operation declares one.
    pub default_value: Option<Spanning<Literal>>,
}

/// A top-level `query` / `mutation` / `subscription` definition.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationDefinition {
    /// Which of the three operation kinds this is.
    pub operation_type: OperationType,
    /// The operation's name, if given.
    pub name: Option<String>,
    /// Declared variables, in source order.
    pub variable_definitions: Vec<VariableDefinition>,
    /// Directives attached to the operation itself.
    pub directives: Vec<Spanning<Directive>>,
    /// The operation's root selection set.
    pub selection_set: Arc<[Selection]>,
}

/// A top-level `fragment Name on Type { ... }` definition.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentDefinition {
    /// The fragment's name, as referenced by `...Name` spreads.
    pub name: String,
    /// The `on Type` type condition.
    pub type_condition: String,
    /// Directives attached to the fragment definition itself.
    pub directives: Vec<Spanning<Directive>>,
    /// The fragment's selection set.
    pub selection_set: Arc<[Selection]>,
}

/// One top-level definition in a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    /// An operation definition.
    Operation(OperationDefinition),
    /// A fragment definition.
    Fragment(FragmentDefinition),
}

/// A parsed (but not necessarily validated) GraphQL query document.
///
/// `validated` starts `None` and is set exactly once, guarded by a mutex
/// (spec.md §5(c)): either a collaborating validator sets it before handing
/// the document to the engine, or [`Document::ensure_validated`] runs and
/// memoizes validation on first use.
#[derive(Debug)]
pub struct Document {
    /// The document's top-level definitions, in source order.
    pub definitions: Vec<Definition>,
    validated: Mutex<Option<Result<(), Vec<SchemaError>>>>,
}

impl Document {
    /// Builds a document from its definitions. `validated` starts unset.
    pub fn new(definitions: Vec<Definition>) -> Self {
        Self {
            definitions,
            validated: Mutex::new(None),
        }
    }

    /// Builds an already-validated document, for callers (or tests) that
    /// trust a validator ran upstream.
    pub fn new_validated(definitions: Vec<Definition>) -> Self {
        Self {
            definitions,
            validated: Mutex::new(Some(Ok(()))),
        }
    }

    /// Iterates every `fragment_definition` in the document.
    pub fn fragment_definitions(&self) -> impl Iterator<Item = &FragmentDefinition> {
        self.definitions.iter().filter_map(|d| match d {
            Definition::Fragment(f) => Some(f),
            Definition::Operation(_) => None,
        })
    }

    /// Iterates every `operation_definition` in the document, in source
    /// order.
    pub fn operation_definitions(&self) -> impl Iterator<Item = &OperationDefinition> {
        self.definitions.iter().filter_map(|d| match d {
            Definition::Operation(op) => Some(op),
            Definition::Fragment(_) => None,
        })
    }

    /// Finds the operation named `name`, or the first operation if `name` is
    /// empty/`None` (spec.md §4.7 step 2).
    pub fn find_operation(&self, name: Option<&str>) -> Option<&OperationDefinition> {
        match name {
            None | Some("") => self.operation_definitions().next(),
            Some(name) => self
                .operation_definitions()
                .find(|op| op.name.as_deref() == Some(name)),
        }
    }

    /// Runs `validate` at most once for this document's lifetime and caches
    /// the result, the way spec.md §6 describes ("the engine may also run
    /// validation on demand and memoize the result").
    pub fn ensure_validated(
        &self,
        validate: impl FnOnce(&Self) -> Result<(), Vec<SchemaError>>,
    ) -> Result<(), Vec<SchemaError>> {
        let mut guard = self.validated.lock().unwrap_or_else(|e| e.into_inner());
        if guard.is_none() {
            *guard = Some(validate(self));
        }
        guard.clone().expect("just set above")
    }
}

/// Small hand-built AST constructors used by this crate's own tests (and
/// available to downstream resolver-glue tests), the way
/// `juniper::validation::test_harness` hands tests a ready-made schema
/// instead of making every test hand-roll one.
#[cfg(any(test, feature = "test-support"))]
pub mod builder {
    use super::*;

    /// A bare field with no arguments, directives, or sub-selection.
    pub fn field(name: &str) -> Selection {
        aliased_field(None, name)
    }

    /// A field with an alias and no arguments, directives, or sub-selection.
    pub fn aliased_field(alias: Option<&str>, name: &str) -> Selection {
        Selection::Field(Arc::new(Spanning::unlocated(Field {
            alias: alias.map(|a| Spanning::unlocated(a.to_owned())),
            name: Spanning::unlocated(name.to_owned()),
            arguments: Vec::new(),
            directives: Vec::new(),
            selection_set: None,
        })))
    }

    /// A field with literal arguments and no alias, directives, or
    /// sub-selection.
    pub fn field_with_arguments(name: &str, arguments: Vec<(String, Literal)>) -> Selection {
        Selection::Field(Arc::new(Spanning::unlocated(Field {
            alias: None,
            name: Spanning::unlocated(name.to_owned()),
            arguments: arguments
                .into_iter()
                .map(|(name, value)| (Spanning::unlocated(name), Spanning::unlocated(value)))
                .collect(),
            directives: Vec::new(),
            selection_set: None,
        })))
    }

    /// A field with a sub-selection.
    pub fn parent_field(name: &str, children: Vec<Selection>) -> Selection {
        Selection::Field(Arc::new(Spanning::unlocated(Field {
            alias: None,
            name: Spanning::unlocated(name.to_owned()),
            arguments: Vec::new(),
            directives: Vec::new(),
            selection_set: Some(children.into()),
        })))
    }

    /// Attaches a `@skip`/`@include`-style boolean directive to a field
    /// selection built by [`field`]/[`parent_field`].
    pub fn with_directive(mut selection: Selection, directive_name: &str, if_value: Literal) -> Selection {
        if let Selection::Field(node) = &mut selection {
            let mut field = node.item.clone();
            field.directives.push(Spanning::unlocated(Directive {
                name: Spanning::unlocated(directive_name.to_owned()),
                arguments: vec![(
                    Spanning::unlocated("if".to_owned()),
                    Spanning::unlocated(if_value),
                )],
            }));
            selection = Selection::Field(Arc::new(Spanning::unlocated(field)));
        }
        selection
    }

    /// A `...name` fragment spread.
    pub fn fragment_spread(name: &str) -> Selection {
        Selection::FragmentSpread(Arc::new(Spanning::unlocated(FragmentSpread {
            name: Spanning::unlocated(name.to_owned()),
            directives: Vec::new(),
        })))
    }

    /// An `... on type_condition { children }` inline fragment.
    pub fn inline_fragment(type_condition: Option<&str>, children: Vec<Selection>) -> Selection {
        Selection::InlineFragment(Arc::new(Spanning::unlocated(InlineFragment {
            type_condition: type_condition.map(str::to_owned),
            directives: Vec::new(),
            selection_set: children.into(),
        })))
    }

    /// A top-level operation with the given selection set.
    pub fn operation(operation_type: OperationType, selection_set: Vec<Selection>) -> OperationDefinition {
        OperationDefinition {
            operation_type,
            name: None,
            variable_definitions: Vec::new(),
            directives: Vec::new(),
            selection_set: selection_set.into(),
        }
    }

    /// A named top-level operation with the given selection set.
    pub fn named_operation(
        operation_type: OperationType,
        name: &str,
        selection_set: Vec<Selection>,
    ) -> OperationDefinition {
        OperationDefinition {
            name: Some(name.to_owned()),
            ..operation(operation_type, selection_set)
        }
    }

    /// A fragment definition.
    pub fn fragment_definition(
        name: &str,
        type_condition: &str,
        selection_set: Vec<Selection>,
    ) -> FragmentDefinition {
        FragmentDefinition {
            name: name.to_owned(),
            type_condition: type_condition.to_owned(),
            directives: Vec::new(),
            selection_set: selection_set.into(),
        }
    }
}
