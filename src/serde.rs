use crate::dates::DateValue;
use crate::errors::SchemaError;
use crate::rules::{self, Rule};
use crate::schema::{Field, SchemaBuilder, TypeRef, TypeSchema};
use crate::value::Parsed;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A serde-friendly description of a type schema, for declaring schemas as
/// data rather than in code.
///
/// Schemas declared this way have no factory, so parsing them produces a
/// [`Record`](../value/struct.Record.html).
#[derive(Debug, PartialEq, Deserialize, Serialize, Default, Clone)]
pub struct SerdeSchema {
    pub id: String,

    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub bindings: BTreeMap<String, String>,

    #[serde(default)]
    pub fields: Vec<SerdeField>,
}

#[derive(Debug, PartialEq, Deserialize, Serialize, Default, Clone)]
pub struct SerdeField {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "type")]
    pub typ: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "elements")]
    pub elems: Option<String>,

    #[serde(default)]
    #[serde(skip_serializing_if = "is_false")]
    pub optional: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(default)]
    #[serde(skip_serializing_if = "is_false")]
    pub raw: bool,

    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub bindings: BTreeMap<String, String>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<SerdeRule>,
}

#[derive(Debug, PartialEq, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub enum SerdeRule {
    Min(f64),
    Max(f64),
    MinLength(usize),
    MaxLength(usize),
    Regexp(String),
    Email,
    After(String),
    Before(String),
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl TypeSchema {
    /// Convert a [`SerdeSchema`](../serde/struct.SerdeSchema.html) into a
    /// checked `TypeSchema`.
    ///
    /// Fails if a field has no name or no type, or if a rule's pattern or
    /// date bound does not parse.
    pub fn from_serde(serde_schema: SerdeSchema) -> Result<TypeSchema, SchemaError> {
        let type_id = serde_schema.id;
        let mut builder = SchemaBuilder::new(type_id.clone());

        for (param, concrete) in &serde_schema.bindings {
            builder = builder.bind(param.clone(), TypeRef::from_name(concrete));
        }

        for (index, serde_field) in serde_schema.fields.into_iter().enumerate() {
            let names = match serde_field.name {
                Some(ref names) => names.clone(),
                None => {
                    return Err(SchemaError::MissingAnnotation { type_id, index });
                }
            };

            let mut field = if serde_field.raw {
                Field::raw(&names)
            } else if let Some(ref elems) = serde_field.elems {
                Field::array(&names, TypeRef::from_name(elems))
            } else if let Some(ref typ) = serde_field.typ {
                Field::new(&names, TypeRef::from_name(typ))
            } else {
                return Err(SchemaError::MissingType {
                    type_id,
                    property: names,
                });
            };

            if serde_field.optional {
                field = field.optional();
            }

            if let Some(default) = serde_field.default {
                field = field.default_value(Parsed::from_json(default));
            }

            for (param, concrete) in &serde_field.bindings {
                field = field.bind(param.clone(), TypeRef::from_name(concrete));
            }

            for serde_rule in serde_field.rules {
                match rule_from_serde(serde_rule) {
                    Ok(rule) => field = field.rule(rule),
                    Err(reason) => {
                        return Err(SchemaError::InvalidRule {
                            type_id,
                            property: names,
                            reason,
                        });
                    }
                }
            }

            builder = builder.field_at(index, field);
        }

        builder.build()
    }
}

fn rule_from_serde(serde_rule: SerdeRule) -> Result<Rule, String> {
    Ok(match serde_rule {
        SerdeRule::Min(bound) => rules::min(bound),
        SerdeRule::Max(bound) => rules::max(bound),
        SerdeRule::MinLength(bound) => rules::min_length(bound),
        SerdeRule::MaxLength(bound) => rules::max_length(bound),
        SerdeRule::Regexp(pattern) => {
            rules::regexp(Regex::new(&pattern).map_err(|err| err.to_string())?)
        }
        SerdeRule::Email => rules::email(),
        SerdeRule::After(bound) => {
            rules::after(bound.parse::<DateValue>().map_err(|err| err.to_string())?)
        }
        SerdeRule::Before(bound) => {
            rules::before(bound.parse::<DateValue>().map_err(|err| err.to_string())?)
        }
    })
}
