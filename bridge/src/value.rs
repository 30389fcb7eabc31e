//! Values carried across a channel
//!
//! `Value` covers every type the standard message codec can encode. Query
//! arguments and results are restricted to the primitive subset.

use crate::error::{BridgeError, Result};

/// A dynamically typed channel value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Int32List(Vec<i32>),
    Int64List(Vec<i64>),
    Float32List(Vec<f32>),
    Float64List(Vec<f64>),
    List(Vec<Value>),
    /// Entries keep insertion order, matching what went over the wire
    Map(Vec<(Value, Value)>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Primitive values are the only ones allowed in query args and results
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::String(_)
        )
    }

    /// True for null, empty strings and empty collections
    pub fn is_empty_value(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::Bytes(v) => v.is_empty(),
            Value::Int32List(v) => v.is_empty(),
            Value::Int64List(v) => v.is_empty(),
            Value::Float32List(v) => v.is_empty(),
            Value::Float64List(v) => v.is_empty(),
            Value::List(v) => v.is_empty(),
            Value::Map(v) => v.is_empty(),
            Value::Bool(_) | Value::Int(_) | Value::Float(_) => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Look up a string key in a map value
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries
                .iter()
                .find(|(k, _)| k.as_str() == Some(key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Name of the variant, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Int32List(_) => "int32 list",
            Value::Int64List(_) => "int64 list",
            Value::Float32List(_) => "float32 list",
            Value::Float64List(_) => "float64 list",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    /// Convert to JSON. Typed lists become number arrays and map keys must be strings.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        use serde_json::Value as Json;

        let json = match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::Float(f) => float_to_json(*f)?,
            Value::String(s) => Json::String(s.clone()),
            Value::Bytes(v) => Json::from(v.clone()),
            Value::Int32List(v) => Json::from(v.clone()),
            Value::Int64List(v) => Json::from(v.clone()),
            Value::Float32List(v) => v
                .iter()
                .map(|f| float_to_json(f64::from(*f)))
                .collect::<Result<Vec<_>>>()?
                .into(),
            Value::Float64List(v) => v
                .iter()
                .map(|f| float_to_json(*f))
                .collect::<Result<Vec<_>>>()?
                .into(),
            Value::List(items) => items
                .iter()
                .map(Value::to_json)
                .collect::<Result<Vec<_>>>()?
                .into(),
            Value::Map(entries) => {
                let mut object = serde_json::Map::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = key.as_str().ok_or_else(|| {
                        BridgeError::Codec(format!(
                            "JSON map keys must be strings, got {}",
                            key.type_name()
                        ))
                    })?;
                    object.insert(key.to_string(), value.to_json()?);
                }
                Json::Object(object)
            }
        };

        Ok(json)
    }

    /// Convert from JSON. Integers that fit in i64 stay integers.
    pub fn from_json(json: &serde_json::Value) -> Value {
        use serde_json::Value as Json;

        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::String(s.clone()),
            Json::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            Json::Object(object) => Value::Map(
                object
                    .iter()
                    .map(|(k, v)| (Value::String(k.clone()), Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

fn float_to_json(f: f64) -> Result<serde_json::Value> {
    serde_json::Number::from_f64(f)
        .map(serde_json::Value::Number)
        .ok_or_else(|| BridgeError::Codec(format!("{} cannot be represented in JSON", f)))
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "{}", s),
            other => write!(f, "<{}>", other.type_name()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<u8> for Value {
    fn from(i: u8) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_primitive_classification() {
        assert!(Value::from("x").is_primitive());
        assert!(Value::from(3).is_primitive());
        assert!(Value::from(true).is_primitive());
        assert!(!Value::Null.is_primitive());
        assert!(!Value::List(vec![]).is_primitive());
    }

    #[test]
    fn test_empty_values() {
        assert!(Value::Null.is_empty_value());
        assert!(Value::from("").is_empty_value());
        assert!(!Value::from(0).is_empty_value());
        assert!(!Value::from(false).is_empty_value());
    }

    #[test]
    fn test_map_lookup() {
        let map = Value::Map(vec![
            (Value::from("supply"), Value::from("BAT1")),
            (Value::Int(7), Value::from("ignored")),
        ]);

        assert_eq!(map.get("supply"), Some(&Value::from("BAT1")));
        assert_eq!(map.get("missing"), None);
        assert_eq!(Value::from("x").get("supply"), None);
    }

    #[test]
    fn test_json_object_conversion() {
        let json = json!({"kind": "osVersion", "n": 5, "f": 1.5, "ok": true, "none": null});
        let value = Value::from_json(&json);

        assert_eq!(value.get("kind"), Some(&Value::from("osVersion")));
        assert_eq!(value.get("n"), Some(&Value::Int(5)));
        assert_eq!(value.get("f"), Some(&Value::Float(1.5)));
        assert_eq!(value.get("none"), Some(&Value::Null));
        assert_eq!(value.to_json().unwrap(), json);
    }

    #[test]
    fn test_json_rejects_non_string_keys() {
        let map = Value::Map(vec![(Value::Int(1), Value::Null)]);
        assert!(matches!(map.to_json(), Err(BridgeError::Codec(_))));
    }

    #[test]
    fn test_json_rejects_nan() {
        assert!(Value::Float(f64::NAN).to_json().is_err());
    }

    #[test]
    fn test_typed_lists_become_arrays() {
        let value = Value::Bytes(vec![1, 2, 3]);
        assert_eq!(value.to_json().unwrap(), json!([1, 2, 3]));
    }
}
