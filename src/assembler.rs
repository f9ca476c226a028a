//! The result assembler: a [`ResolverVisitor`] sink that resolvers stream
//! events into to build up a [`Value`] tree (spec.md §4.6).
//!
//! spec.md §4.6 describes a single mutex-protected stack of in-progress
//! containers shared across the whole operation. That shape assumes field
//! resolution is linear; under this crate's real concurrency (sibling query
//! fields genuinely running on different threads, §4.5/§5) a single shared
//! stack cannot stay correctly nested — two sibling object-typed fields could
//! each try to `start_object`/`end_object` while the other's frame is still
//! open, and a flat stack has no way to tell whose `end_object` belongs to
//! whom. spec.md §9 flags exactly this as an open question and explicitly
//! tells implementers not to replicate the original's exact lock scopes, only
//! its documented contract (§5: source-name ordering, per-field error capture,
//! no cross-field interleaving in the final tree).
//!
//! This implementation keeps the same event names and per-event semantics,
//! but scopes each container to its own node instead of one global stack:
//! `add_member`/`add_element` return a fresh child sink already registered
//! under its key/index (so parent ordering is fixed at registration time,
//! before any child's value is known), and every node owns its own mutex.
//! Concurrent siblings each hold a distinct node, so there is never a shared
//! stack to corrupt. `juniper`'s own sink equivalent
//! (`graphql-rust-juniper/juniper/src/value/mod.rs`) does not stream at all —
//! `GraphQLValue::resolve` just returns an owned `Value` — so this module has
//! no direct teacher analog; the node-per-slot shape is this crate's
//! resolution of that §9 ambiguity, chosen to satisfy §5's ordering and
//! thread-safety guarantees under genuine concurrency.

use std::sync::{Arc, Mutex};

use indexmap::IndexMap;

use crate::{
    error::SchemaError,
    value::{Map, Value},
};

/// Streaming sink that resolvers (via [`crate::resolve`]) push field values
/// and errors into (spec.md §4.6).
pub trait ResolverVisitor: Send + Sync {
    /// Begins building a `Map` value at this node.
    fn start_object(&self);

    /// Begins building a `List` value at this node.
    fn start_array(&self);

    /// Registers `key` as the next member of this node's `Map`, in call
    /// order, and returns the child sink that member's value should be
    /// streamed into. Must be called after [`ResolverVisitor::start_object`].
    fn add_member(&self, key: &str) -> Arc<dyn ResolverVisitor>;

    /// Appends the next element of this node's `List` and returns the child
    /// sink its value should be streamed into. Must be called after
    /// [`ResolverVisitor::start_array`].
    fn add_element(&self) -> Arc<dyn ResolverVisitor>;

    /// Sets this node's value to `null`.
    fn add_null(&self);
    /// Sets this node's value to a `Boolean`.
    fn add_bool(&self, value: bool);
    /// Sets this node's value to an `Int`.
    fn add_int(&self, value: i32);
    /// Sets this node's value to a `Float`.
    fn add_float(&self, value: f64);
    /// Sets this node's value to a `String`.
    fn add_string(&self, value: String);
    /// Sets this node's value to an enum member, distinct from `String`.
    fn add_enum(&self, value: String);
    /// Sets this node's value to an `ID`'s underlying bytes.
    fn add_id(&self, value: Vec<u8>);

    /// Appends a structured error to the operation's shared error list.
    fn add_error(&self, error: SchemaError);
}

enum Slot {
    Pending,
    Map(IndexMap<String, Arc<ValueAssembler>>),
    List(Vec<Arc<ValueAssembler>>),
    Value(Value),
}

/// The concrete [`ResolverVisitor`] this crate ships: one node per value in
/// the response tree, sharing one operation-wide error list.
pub struct ValueAssembler {
    slot: Mutex<Slot>,
    errors: Arc<Mutex<Vec<SchemaError>>>,
}

impl ValueAssembler {
    /// Creates the root sink for one operation resolution, with a fresh
    /// (empty) error list.
    pub fn new_root() -> (Arc<Self>, Arc<Mutex<Vec<SchemaError>>>) {
        let errors = Arc::new(Mutex::new(Vec::new()));
        (Self::new(Arc::clone(&errors)), errors)
    }

    fn new(errors: Arc<Mutex<Vec<SchemaError>>>) -> Arc<Self> {
        Arc::new(Self {
            slot: Mutex::new(Slot::Pending),
            errors,
        })
    }

    /// Recursively finishes this node (and all of its descendants) into an
    /// owned [`Value`]. A node that never received a value (a resolver that
    /// dropped the sink without emitting anything) finishes as `Null`,
    /// mirroring "a field resolver returning null... is not itself an error"
    /// (spec.md §7) — callers that require a value must check via the field's
    /// own error reporting, not via this fallback.
    pub fn finish(&self) -> Value {
        let slot = std::mem::replace(&mut *self.slot.lock().unwrap(), Slot::Pending);
        match slot {
            Slot::Pending => Value::Null,
            Slot::Value(v) => v,
            Slot::Map(entries) => {
                let mut map = Map::with_capacity(entries.len());
                for (key, child) in entries {
                    map.insert(key, child.finish());
                }
                Value::Map(map)
            }
            Slot::List(items) => Value::List(items.iter().map(|c| c.finish()).collect()),
        }
    }
}

impl ResolverVisitor for ValueAssembler {
    fn start_object(&self) {
        *self.slot.lock().unwrap() = Slot::Map(IndexMap::new());
    }

    fn start_array(&self) {
        *self.slot.lock().unwrap() = Slot::List(Vec::new());
    }

    fn add_member(&self, key: &str) -> Arc<dyn ResolverVisitor> {
        let child = Self::new(Arc::clone(&self.errors));
        let mut slot = self.slot.lock().unwrap();
        match &mut *slot {
            Slot::Map(entries) => {
                entries.insert(key.to_owned(), Arc::clone(&child));
            }
            _ => unreachable!("add_member called without a preceding start_object"),
        }
        child
    }

    fn add_element(&self) -> Arc<dyn ResolverVisitor> {
        let child = Self::new(Arc::clone(&self.errors));
        let mut slot = self.slot.lock().unwrap();
        match &mut *slot {
            Slot::List(items) => items.push(Arc::clone(&child)),
            _ => unreachable!("add_element called without a preceding start_array"),
        }
        child
    }

    fn add_null(&self) {
        *self.slot.lock().unwrap() = Slot::Value(Value::Null);
    }

    fn add_bool(&self, value: bool) {
        *self.slot.lock().unwrap() = Slot::Value(Value::Bool(value));
    }

    fn add_int(&self, value: i32) {
        *self.slot.lock().unwrap() = Slot::Value(Value::Int(value));
    }

    fn add_float(&self, value: f64) {
        *self.slot.lock().unwrap() = Slot::Value(Value::Float(value));
    }

    fn add_string(&self, value: String) {
        *self.slot.lock().unwrap() = Slot::Value(Value::String(value));
    }

    fn add_enum(&self, value: String) {
        *self.slot.lock().unwrap() = Slot::Value(Value::EnumValue(value));
    }

    fn add_id(&self, value: Vec<u8>) {
        *self.slot.lock().unwrap() = Slot::Value(Value::Id(value));
    }

    fn add_error(&self, error: SchemaError) {
        self.errors.lock().unwrap().push(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembles_nested_object_in_registration_order() {
        let (root, _errors) = ValueAssembler::new_root();
        root.start_object();
        let n = root.add_member("n");
        n.add_int(7);
        let s = root.add_member("s");
        s.add_string("hi".into());

        let value = root.finish();
        let map = value.as_map().unwrap();
        let keys: Vec<_> = map.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, vec!["n".to_owned(), "s".to_owned()]);
        assert_eq!(map.get("n"), Some(&Value::Int(7)));
        assert_eq!(map.get("s"), Some(&Value::String("hi".into())));
    }

    #[test]
    fn keeps_registration_order_even_if_children_finish_out_of_order() {
        let (root, _errors) = ValueAssembler::new_root();
        root.start_object();
        let first = root.add_member("first");
        let second = root.add_member("second");
        // Simulate the second field's resolver finishing before the first's.
        second.add_int(2);
        first.add_int(1);

        let value = root.finish();
        let map = value.as_map().unwrap();
        let keys: Vec<_> = map.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, vec!["first".to_owned(), "second".to_owned()]);
    }

    #[test]
    fn shares_one_error_list_across_descendants() {
        let (root, errors) = ValueAssembler::new_root();
        root.start_object();
        let child = root.add_member("a");
        child.add_error(SchemaError::new("boom"));
        root.add_error(SchemaError::new("also boom"));
        assert_eq!(errors.lock().unwrap().len(), 2);
    }
}
