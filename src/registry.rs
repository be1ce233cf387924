//! The registry of type schemas and custom mappers that parsing draws on.

use crate::errors::{ParseError, SchemaError};
use crate::mapper::{JsonKind, Mapper, MapperRegistry};
use crate::parser::{Config, Parser};
use crate::schema::{SchemaBuilder, TypeRef, TypeSchema};
use crate::value::Parsed;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Maps type identifiers to their schemas and custom mappers.
///
/// A registry is built up once, then only read: registration takes `&mut
/// self` and parsing takes `&self`, so the borrow checker guarantees every
/// registration happens before any parse that shares the registry. Share a
/// finished registry between threads with an `Arc`.
///
/// Registering under an identifier which is already taken replaces the
/// earlier registration.
#[derive(Clone, Default)]
pub struct Registry {
    schemas: HashMap<String, TypeSchema>,
    mappers: MapperRegistry,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    /// Check the declarations in `builder` and register the resulting schema.
    pub fn register(&mut self, builder: SchemaBuilder) -> Result<(), SchemaError> {
        let schema = builder.build()?;
        self.insert(schema);
        Ok(())
    }

    /// Register an already-built schema.
    pub fn insert(&mut self, schema: TypeSchema) {
        debug!(
            type_id = schema.type_id(),
            fields = schema.fields().len(),
            "registered type schema"
        );
        self.schemas.insert(schema.type_id().to_owned(), schema);
    }

    pub fn lookup(&self, type_id: &str) -> Option<&TypeSchema> {
        self.schemas.get(type_id)
    }

    /// Register a custom mapper for values of `kind` targeting `type_id`.
    ///
    /// Mappers are only consulted for types without a schema.
    pub fn register_mapper(&mut self, type_id: impl Into<String>, kind: JsonKind, mapper: Mapper) {
        let type_id = type_id.into();
        debug!(type_id = type_id.as_str(), kind = %kind, "registered custom mapper");
        self.mappers.register(type_id, kind, mapper);
    }

    /// Register a mapper building `type_id` out of a JSON string.
    pub fn register_string_mapper<T, F>(&mut self, type_id: impl Into<String>, map: F)
    where
        T: Any + Send + Sync,
        F: Fn(&str) -> T + Send + Sync + 'static,
    {
        let mapper: Mapper = Arc::new(move |value: &Value| match value {
            Value::String(s) => Parsed::instance(map(s)),
            _ => Parsed::Absent,
        });
        self.register_mapper(type_id, JsonKind::String, mapper);
    }

    /// Register a mapper building `type_id` out of a JSON number.
    pub fn register_number_mapper<T, F>(&mut self, type_id: impl Into<String>, map: F)
    where
        T: Any + Send + Sync,
        F: Fn(f64) -> T + Send + Sync + 'static,
    {
        let mapper: Mapper = Arc::new(move |value: &Value| match value.as_f64() {
            Some(n) => Parsed::instance(map(n)),
            None => Parsed::Absent,
        });
        self.register_mapper(type_id, JsonKind::Number, mapper);
    }

    /// Register a mapper building `type_id` out of a JSON boolean.
    pub fn register_boolean_mapper<T, F>(&mut self, type_id: impl Into<String>, map: F)
    where
        T: Any + Send + Sync,
        F: Fn(bool) -> T + Send + Sync + 'static,
    {
        let mapper: Mapper = Arc::new(move |value: &Value| match value.as_bool() {
            Some(b) => Parsed::instance(map(b)),
            None => Parsed::Absent,
        });
        self.register_mapper(type_id, JsonKind::Boolean, mapper);
    }

    pub fn mappers(&self) -> &MapperRegistry {
        &self.mappers
    }

    /// A parser over this registry with the default configuration.
    pub fn parser(&self) -> Parser<'_> {
        Parser::new(self)
    }

    pub fn parser_with_config(&self, config: Config) -> Parser<'_> {
        Parser::new_with_config(self, config)
    }

    /// Shorthand for [`Parser::parse`](../parser/struct.Parser.html#method.parse)
    /// with the default configuration.
    pub fn parse(&self, ty: &TypeRef, json: &Value) -> Result<Parsed, ParseError> {
        self.parser().parse(ty, json)
    }

    /// Shorthand for [`Parser::parse_array`](../parser/struct.Parser.html#method.parse_array)
    /// with the default configuration.
    pub fn parse_array(
        &self,
        element: &TypeRef,
        json: &Value,
        optional: bool,
    ) -> Result<Vec<Parsed>, ParseError> {
        self.parser().parse_array(element, json, optional)
    }

    /// Shorthand for [`Parser::parse_model`](../parser/struct.Parser.html#method.parse_model)
    /// with the default configuration.
    pub fn parse_model<T: Any + Send + Sync>(
        &self,
        type_id: &str,
        json: &Value,
    ) -> Result<T, ParseError> {
        self.parser().parse_model(type_id, json)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut type_ids: Vec<_> = self.schemas.keys().collect();
        type_ids.sort();
        f.debug_struct("Registry")
            .field("schemas", &type_ids)
            .field("mappers", &self.mappers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;
    use crate::schema::Field;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[derive(Debug, PartialEq)]
    struct Celsius(f64);

    #[test]
    fn last_registration_wins() {
        let mut registry = Registry::new();
        registry
            .register(TypeSchema::builder("Thing").field(Field::new("a", TypeRef::String)))
            .unwrap();
        registry
            .register(
                TypeSchema::builder("Thing")
                    .field(Field::new("a", TypeRef::String))
                    .field(Field::new("b", TypeRef::Number)),
            )
            .unwrap();

        assert_eq!(registry.lookup("Thing").unwrap().fields().len(), 2);
        assert!(registry.lookup("Other").is_none());
    }

    #[test]
    fn rejected_schemas_are_not_registered() {
        let mut registry = Registry::new();
        let err = registry
            .register(TypeSchema::builder("Broken").field_at(1, Field::new("b", TypeRef::String)))
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::MissingAnnotation);
        assert!(registry.lookup("Broken").is_none());
    }

    #[test]
    fn typed_mappers() {
        let mut registry = Registry::new();
        registry.register_number_mapper("Celsius", Celsius);
        registry.register_string_mapper("Celsius", |s: &str| {
            Celsius(s.trim_end_matches('C').parse().unwrap_or(0.0))
        });

        let from_number: Celsius = registry.parse_model("Celsius", &json!(21.5)).unwrap();
        assert_eq!(from_number, Celsius(21.5));
        let from_string: Celsius = registry.parse_model("Celsius", &json!("18C")).unwrap();
        assert_eq!(from_string, Celsius(18.0));

        let err = registry
            .parse(&TypeRef::model("Celsius"), &json!(true))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidModelClass);
    }

    #[test]
    fn schema_takes_precedence_over_mapper() {
        let mut registry = Registry::new();
        registry.register_string_mapper("Name", |s: &str| s.to_owned());
        registry
            .register(TypeSchema::builder("Name").field(Field::new("value", TypeRef::String)))
            .unwrap();

        let err = registry
            .parse(&TypeRef::model("Name"), &json!("ada"))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidType);
    }

    #[test]
    fn debug_lists_identifiers() {
        let mut registry = Registry::new();
        registry
            .register(TypeSchema::builder("B").field(Field::new("b", TypeRef::String)))
            .unwrap();
        registry
            .register(TypeSchema::builder("A").field(Field::new("a", TypeRef::String)))
            .unwrap();

        assert_eq!(
            format!("{:?}", registry),
            r#"Registry { schemas: ["A", "B"], mappers: MapperRegistry { mappers: [] } }"#
        );
    }
}
