//! The error taxonomy (spec.md §7).
//!
//! Mirrors the split in `juniper::executor`: `ExecutionError` there is a
//! single structured, per-field error (message + location + path) that gets
//! accumulated without aborting sibling fields; our [`SchemaError`] plays
//! that role. [`SchemaException`] plays the role of the handful of
//! `panic!`/early-`Err` paths in `juniper::executor::execute_validated_query`
//! (missing operation, wrong operation type) that abort the whole operation
//! instead of being captured per-field.

use std::fmt;

use crate::ast::SchemaLocation;

/// One segment of an error's path: either a field response name or a list
/// index — never both at the same position (spec.md §3 invariant).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// A field response name.
    Field(String),
    /// A zero-based list index.
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => write!(f, "{name}"),
            Self::Index(i) => write!(f, "{i}"),
        }
    }
}

/// A single structured GraphQL error, as placed in the response's `errors`
/// array (spec.md §6).
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
#[display("{message}")]
pub struct SchemaError {
    /// Human-readable error message.
    #[error(not(source))]
    pub message: String,
    /// Where in the query source this error originated, if known.
    #[error(not(source))]
    pub location: SchemaLocation,
    /// The path of response-name/index segments leading to the field that
    /// caused this error.
    #[error(not(source))]
    pub error_path: Vec<PathSegment>,
}

impl SchemaError {
    /// Builds an error with no location or path yet known; callers fill
    /// those in as the error propagates up through the executor (spec.md
    /// §4.5: "attach the field's source location to any contained error
    /// whose location is zero; attach the field path where unset").
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: SchemaLocation::UNKNOWN,
            error_path: Vec::new(),
        }
    }

    /// Builds a fully-located error directly.
    pub fn at(message: impl Into<String>, location: SchemaLocation, error_path: Vec<PathSegment>) -> Self {
        Self {
            message: message.into(),
            location,
            error_path,
        }
    }

    /// Fills in `location` if it is currently unknown.
    pub fn with_location_if_unset(mut self, location: SchemaLocation) -> Self {
        if self.location.is_unknown() {
            self.location = location;
        }
        self
    }

    /// Fills in `error_path` if it is currently empty.
    pub fn with_path_if_unset(mut self, error_path: &[PathSegment]) -> Self {
        if self.error_path.is_empty() {
            self.error_path = error_path.to_vec();
        }
        self
    }
}

/// A failure that aborts the entire operation rather than being captured as
/// one of possibly many per-field errors (spec.md §7 "Document navigation
/// errors").
///
/// Carries one or more [`SchemaError`]s so that a single exception can still
/// surface multiple structured errors, which `subscribe`'s validation phase
/// needs (spec.md §4.8).
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
#[display("{}", errors.first().map(|e| e.message.as_str()).unwrap_or("schema exception"))]
pub struct SchemaException {
    /// The structured errors carried by this exception.
    #[error(not(source))]
    pub errors: Vec<SchemaError>,
}

impl SchemaException {
    /// Builds a single-error exception from a message, with no location or
    /// path.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            errors: vec![SchemaError::new(message)],
        }
    }

    /// Builds an exception from an already-complete error.
    pub fn from_error(error: SchemaError) -> Self {
        Self { errors: vec![error] }
    }

    /// Builds an exception carrying several errors at once.
    pub fn from_errors(errors: Vec<SchemaError>) -> Self {
        Self { errors }
    }
}

impl From<SchemaError> for SchemaException {
    fn from(error: SchemaError) -> Self {
        Self::from_error(error)
    }
}
