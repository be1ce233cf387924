//! Custom mappers: conversion functions for opaque, schema-less types.
//!
//! A mapper is keyed by a type identifier and the kind of JSON primitive it
//! accepts. It is only consulted for types which have no registered schema.

use crate::value::Parsed;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// The JSON primitive kinds a mapper can accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonKind {
    String,
    Number,
    Boolean,
}

impl JsonKind {
    /// The kind of `value`, if it is a primitive a mapper can accept.
    pub fn of(value: &Value) -> Option<JsonKind> {
        match value {
            Value::String(_) => Some(JsonKind::String),
            Value::Number(_) => Some(JsonKind::Number),
            Value::Bool(_) => Some(JsonKind::Boolean),
            _ => None,
        }
    }
}

impl fmt::Display for JsonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JsonKind::String => "string",
            JsonKind::Number => "number",
            JsonKind::Boolean => "boolean",
        })
    }
}

/// A mapper function. It is only ever called with a value of the kind it was
/// registered for.
pub type Mapper = Arc<dyn Fn(&Value) -> Parsed + Send + Sync>;

#[derive(Clone, Default)]
pub struct MapperRegistry {
    mappers: HashMap<(String, JsonKind), Mapper>,
}

impl MapperRegistry {
    pub fn new() -> MapperRegistry {
        MapperRegistry::default()
    }

    /// Register `mapper` for `type_id` and `kind`, replacing any earlier one.
    pub fn register(&mut self, type_id: impl Into<String>, kind: JsonKind, mapper: Mapper) {
        self.mappers.insert((type_id.into(), kind), mapper);
    }

    pub fn lookup(&self, type_id: &str, kind: JsonKind) -> Option<&Mapper> {
        self.mappers.get(&(type_id.to_owned(), kind))
    }

    /// Find the mapper for `type_id` matching the kind of `value`.
    pub fn lookup_for(&self, type_id: &str, value: &Value) -> Option<&Mapper> {
        JsonKind::of(value).and_then(|kind| self.lookup(type_id, kind))
    }

    pub fn len(&self) -> usize {
        self.mappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappers.is_empty()
    }
}

impl fmt::Debug for MapperRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self
            .mappers
            .keys()
            .map(|(type_id, kind)| format!("{}/{}", type_id, kind))
            .collect();
        keys.sort();
        f.debug_struct("MapperRegistry").field("mappers", &keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn constant(value: i64) -> Mapper {
        Arc::new(move |_: &Value| Parsed::from(value))
    }

    #[test]
    fn kinds() {
        assert_eq!(JsonKind::of(&json!("a")), Some(JsonKind::String));
        assert_eq!(JsonKind::of(&json!(1.5)), Some(JsonKind::Number));
        assert_eq!(JsonKind::of(&json!(false)), Some(JsonKind::Boolean));
        assert_eq!(JsonKind::of(&json!(null)), None);
        assert_eq!(JsonKind::of(&json!([])), None);
        assert_eq!(JsonKind::of(&json!({})), None);
    }

    #[test]
    fn keyed_by_type_and_kind() {
        let mut mappers = MapperRegistry::new();
        mappers.register("Id", JsonKind::String, constant(1));
        mappers.register("Id", JsonKind::Number, constant(2));

        let found = mappers.lookup_for("Id", &json!("x")).unwrap();
        assert_eq!(found(&json!("x")), Parsed::from(1));
        let found = mappers.lookup_for("Id", &json!(7)).unwrap();
        assert_eq!(found(&json!(7)), Parsed::from(2));

        assert!(mappers.lookup_for("Id", &json!(true)).is_none());
        assert!(mappers.lookup_for("Other", &json!("x")).is_none());
    }

    #[test]
    fn last_registration_wins() {
        let mut mappers = MapperRegistry::new();
        mappers.register("Id", JsonKind::String, constant(1));
        mappers.register("Id", JsonKind::String, constant(3));

        assert_eq!(mappers.len(), 1);
        let found = mappers.lookup("Id", JsonKind::String).unwrap();
        assert_eq!(found(&json!("x")), Parsed::from(3));
        assert_eq!(format!("{:?}", mappers), r#"MapperRegistry { mappers: ["Id/string"] }"#);
    }
}
