//! The dynamic, tagged response value tree (spec.md §3, §4.1/§4.6).
//!
//! [`Value`] is what resolvers build and what the [`crate::assembler`] streams
//! into; it is deliberately untyped (no generic `ScalarValue` parameter, unlike
//! `juniper::Value<S>`) because the engine itself never needs to know which
//! concrete scalar a field produces — only the code generator and the
//! resolver glue do, and both are out of scope per spec.md §1.

mod object;

pub use self::object::Map;

use serde::{de::Error as _, ser::Error as _, Deserialize, Serialize, Serializer};

/// A single GraphQL response value.
///
/// Mirrors `juniper::Value`'s `Null`/`Scalar`/`List`/`Object` split, but
/// un-nests the scalar kinds the way `spec.md` §3 names them so the executor
/// can match on `Bool`/`Int`/`String`/... directly instead of going through a
/// second `ScalarValue` trait dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// GraphQL `null`.
    Null,
    /// A GraphQL `Boolean`.
    Bool(bool),
    /// A GraphQL `Int`.
    Int(i32),
    /// A GraphQL `Float`.
    Float(f64),
    /// A GraphQL `String`.
    String(String),
    /// A GraphQL enum member, carried by name only — distinct from `String`
    /// (spec.md §3 invariants): no type table is consulted here.
    EnumValue(String),
    /// A GraphQL `ID`, carried as its underlying byte sequence.
    Id(Vec<u8>),
    /// An ordered list of values.
    List(Vec<Value>),
    /// An insertion-order-preserving map of response field names to values.
    Map(Map),
}

impl Value {
    /// Constructs [`Value::Null`].
    pub fn null() -> Self {
        Self::Null
    }

    /// Whether this value is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Views the underlying string, whether stored as `String` or `EnumValue`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::EnumValue(s) => Some(s),
            _ => None,
        }
    }

    /// Views the underlying [`Map`], if this is [`Value::Map`].
    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Views the underlying list, if this is [`Value::List`].
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<Map> for Value {
    fn from(m: Map) -> Self {
        Self::Map(m)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i32(*i),
            Self::Float(f) => {
                if f.is_nan() {
                    return Err(S::Error::custom("cannot serialize NaN as a GraphQL Float"));
                }
                serializer.serialize_f64(*f)
            }
            Self::String(s) | Self::EnumValue(s) => serializer.serialize_str(s),
            Self::Id(bytes) => serializer.serialize_str(&String::from_utf8_lossy(bytes)),
            Self::List(items) => items.serialize(serializer),
            Self::Map(map) => map.serialize(serializer),
        }
    }
}

/// Reconstructs a [`Value`] from a generic JSON document.
///
/// Used for round-tripping scalars and for building `variables` out of a
/// request body, matching how `juniper::InputValue::from_json` hands a JSON
/// blob back to the engine. Enums and IDs are not recovered as their own
/// variants here — JSON carries no tag for them — so this always produces
/// `String`, never `EnumValue`/`Id`; callers that need those reconstruct them
/// explicitly once they know the expected type (resolver-glue concern, out of
/// scope per spec.md §1).
impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let json = serde_json::Value::deserialize(deserializer)?;
        Self::try_from(json).map_err(D::Error::custom)
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = String;

    fn try_from(json: serde_json::Value) -> Result<Self, Self::Error> {
        Ok(match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    if let Ok(i) = i32::try_from(i) {
                        Self::Int(i)
                    } else {
                        Self::Float(i as f64)
                    }
                } else if let Some(f) = n.as_f64() {
                    Self::Float(f)
                } else {
                    return Err(format!("number {n} is not representable"));
                }
            }
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => Self::List(
                items
                    .into_iter()
                    .map(Self::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            serde_json::Value::Object(entries) => {
                let mut map = Map::with_capacity(entries.len());
                for (k, v) in entries {
                    map.insert(k, Self::try_from(v)?);
                }
                Self::Map(map)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json_for_non_ambiguous_scalars() {
        let mut map = Map::new();
        map.insert("n", Value::Int(7));
        map.insert("s", Value::String("hi".into()));
        map.insert("flag", Value::Bool(true));
        map.insert("nothing", Value::Null);
        map.insert("list", Value::List(vec![Value::Int(1), Value::Int(2)]));
        let value = Value::Map(map);

        let json = serde_json::to_value(&value).unwrap();
        let round_tripped: Value = serde_json::from_value(json).unwrap();
        assert_eq!(value, round_tripped);
    }

    #[test]
    fn map_preserves_insertion_order_through_json() {
        let mut map = Map::new();
        map.insert("z", Value::Int(1));
        map.insert("a", Value::Int(2));
        let value = Value::Map(map);

        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"z":1,"a":2}"#);
    }

    #[test]
    fn rejects_nan_float() {
        let value = Value::Float(f64::NAN);
        assert!(serde_json::to_value(&value).is_err());
    }

    #[test]
    fn enum_value_is_distinct_from_string_but_serializes_the_same() {
        let e = Value::EnumValue("ACTIVE".into());
        let s = Value::String("ACTIVE".into());
        assert_ne!(e, s);
        assert_eq!(
            serde_json::to_string(&e).unwrap(),
            serde_json::to_string(&s).unwrap()
        );
    }
}
