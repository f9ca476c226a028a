//! The field path and directive-inspection stacks threaded through a
//! resolution (spec.md §3 `FieldPath`, §9 "Directive stacks").
//!
//! `FieldPath` mirrors `juniper::executor::FieldPath` exactly: a linked chain
//! of `Arc`-shared frames so cloning a path to hand to a sibling resolver
//! never copies the whole stack. The three directive stacks follow the same
//! shape per spec.md §9's preference for "shared-immutable linked nodes":
//! pushing a frame never mutates a frame another resolver already holds a
//! reference to.

use std::sync::Arc;

use crate::{ast::SchemaLocation, error::PathSegment, visitor::Directives};

/// A linked chain of path segments from the root down to the current field.
#[derive(Debug, Clone)]
pub enum FieldPath {
    /// The root of a resolution, with no segment of its own yet.
    Root,
    /// One field step, pointing back at its parent.
    Field {
        /// This step's response name or list index.
        segment: PathSegment,
        /// The location of the field/list element that produced this step.
        location: SchemaLocation,
        /// The enclosing path.
        parent: Arc<FieldPath>,
    },
}

impl FieldPath {
    /// Extends this path with one more field step.
    pub fn child(self: &Arc<Self>, segment: PathSegment, location: SchemaLocation) -> Arc<Self> {
        Arc::new(Self::Field {
            segment,
            location,
            parent: Arc::clone(self),
        })
    }

    /// The location most closely associated with this point in the path
    /// (the location of the innermost field step, or unknown at the root).
    pub fn location(&self) -> SchemaLocation {
        match self {
            Self::Root => SchemaLocation::UNKNOWN,
            Self::Field { location, .. } => *location,
        }
    }

    /// Flattens this chain into an ordered `error_path`, root first
    /// (spec.md §3).
    pub fn flatten(&self) -> Vec<PathSegment> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(&self, out: &mut Vec<PathSegment>) {
        if let Self::Field {
            segment, parent, ..
        } = self
        {
            parent.flatten_into(out);
            out.push(segment.clone());
        }
    }
}

/// Which kind of directive-bearing node pushed a [`DirectiveStackFrame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveStackKind {
    /// Pushed by a fragment's own definition (`fragment F on T { ... }`).
    FragmentDefinition,
    /// Pushed by a `...F` spread referencing a fragment.
    FragmentSpread,
    /// Pushed by an inline `... on T { ... }` fragment.
    InlineFragment,
}

/// One frame of a directive-inspection stack (spec.md §9).
///
/// The engine only ever *pushes* and *reads* these; it does not interpret
/// their contents beyond `@skip`/`@include`, which are evaluated before a
/// frame is even pushed. Resolvers may walk `parent` to inspect enclosing
/// fragment context.
#[derive(Debug, Clone)]
pub struct DirectiveStackFrame {
    /// Which AST construct pushed this frame.
    pub kind: DirectiveStackKind,
    /// The directives attached at this frame.
    pub directives: Directives,
    /// The enclosing frame, if any.
    pub parent: Option<Arc<DirectiveStackFrame>>,
}

impl DirectiveStackFrame {
    /// Pushes a new frame on top of an optional existing stack.
    pub fn push(
        parent: Option<&Arc<DirectiveStackFrame>>,
        kind: DirectiveStackKind,
        directives: Directives,
    ) -> Arc<Self> {
        Arc::new(Self {
            kind,
            directives,
            parent: parent.cloned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_root_to_leaf() {
        let root = Arc::new(FieldPath::Root);
        let a = root.child(PathSegment::Field("a".into()), SchemaLocation::new(1, 1));
        let b = a.child(PathSegment::Index(2), SchemaLocation::new(1, 5));
        assert_eq!(
            b.flatten(),
            vec![PathSegment::Field("a".into()), PathSegment::Index(2)]
        );
    }
}
