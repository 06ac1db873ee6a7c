// SPDX-License-Identifier: MIT

//! Runtime values the sandbox language operates on.

use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// Produced by an action script that wants its result carried into the
    /// dispatcher's action result (§4.3: "structured attachment descriptor").
    Attachment {
        mime_type: String,
        storage_path: String,
    },
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Attachment { .. } => "attachment",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0,
            Self::String(s) => !s.is_empty(),
            Self::List(l) => !l.is_empty(),
            Self::Map(m) => !m.is_empty(),
            Self::Attachment { .. } => true,
        }
    }

    /// Field access on maps only; lists and scalars have no named fields
    /// (consistent with structured `match_conditions`: arrays terminate
    /// traversal rather than indexing into them).
    pub fn get_field(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Map(m) => m.get(name),
            _ => None,
        }
    }

    pub fn from_json(value: &serde_json::Value) -> Value {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            serde_json::Value::Object(map) => {
                Value::Map(map.iter().map(|(k, v)| (k.clone(), Value::from_json(v))).collect())
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Map(_) => write!(f, "<map>"),
            Self::Attachment { mime_type, .. } => write!(f, "<attachment {mime_type}>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_json_preserves_nested_structure() {
        let json = serde_json::json!({"a": {"b": 1}, "c": [1, 2]});
        let value = Value::from_json(&json);
        let a = value.get_field("a").unwrap();
        assert_eq!(a.get_field("b"), Some(&Value::Number(1.0)));
    }

    #[test]
    fn empty_collections_are_falsy() {
        assert!(!Value::List(vec![]).is_truthy());
        assert!(!Value::String(String::new()).is_truthy());
        assert!(Value::Number(1.0).is_truthy());
    }
}
