use crate::dates;
use crate::errors::{ErrorCode, ParseError};
use crate::registry::Registry;
use crate::rules::{self, Rule};
use crate::schema::{Bindings, TypeRef, TypeSchema};
use crate::value::Parsed;
use json_pointer::JsonPointer;
use serde_json::Value;
use tracing::trace;

pub fn parse(
    registry: &Registry,
    max_depth: usize,
    ty: &TypeRef,
    json: &Value,
) -> Result<Parsed, ParseError> {
    let mut vm = Vm::new(registry, max_depth);
    vm.parse_value(&Expect::required(ty.clone(), None), json)
}

pub fn parse_array(
    registry: &Registry,
    max_depth: usize,
    element: &TypeRef,
    json: &Value,
    optional: bool,
) -> Result<Vec<Parsed>, ParseError> {
    if optional && json.is_null() {
        return Ok(Vec::new());
    }

    let mut vm = Vm::new(registry, max_depth);
    vm.parse_elements(&Expect::required(TypeRef::Array, Some(element.clone())), json)
}

/// What the value at the current position must be converted into.
struct Expect<'s> {
    ty: TypeRef,
    element: Option<TypeRef>,
    optional: bool,
    default: Option<&'s Parsed>,
    rules: &'s [Rule],

    // Bindings handed to the fields of `ty`, if it is a model.
    bindings: Option<&'s Bindings>,
}

impl<'s> Expect<'s> {
    fn required(ty: TypeRef, element: Option<TypeRef>) -> Expect<'s> {
        Expect {
            ty,
            element,
            optional: false,
            default: None,
            rules: &[],
            bindings: None,
        }
    }

    fn fallback(&self) -> Parsed {
        self.default.cloned().unwrap_or(Parsed::Absent)
    }
}

struct Vm<'a> {
    registry: &'a Registry,
    max_depth: usize,
    tokens: Vec<String>,
}

impl<'a> Vm<'a> {
    fn new(registry: &'a Registry, max_depth: usize) -> Vm<'a> {
        Vm {
            registry,
            max_depth,
            tokens: Vec::new(),
        }
    }

    fn parse_value(&mut self, expect: &Expect<'_>, json: &Value) -> Result<Parsed, ParseError> {
        if expect.optional && json.is_null() {
            return Ok(expect.fallback());
        }

        let converted = match expect.ty {
            TypeRef::String => match json {
                Value::String(s) => Parsed::String(s.clone()),
                _ => return Err(self.invalid_type("a string value")),
            },
            TypeRef::Number => match json {
                Value::Number(n) => Parsed::Number(n.clone()),
                _ => return Err(self.invalid_type("a number value")),
            },
            TypeRef::Boolean => match json {
                Value::Bool(b) => Parsed::Bool(*b),
                _ => return Err(self.invalid_type("a boolean value")),
            },
            TypeRef::Date => match json
                .as_str()
                .filter(|s| dates::is_date_string(s))
                .and_then(dates::parse_date)
            {
                Some(date) => Parsed::Date(date),
                None => return Err(self.invalid_type("a date")),
            },
            // Rules were applied to each element on the way down.
            TypeRef::Array => return self.parse_elements(expect, json).map(Parsed::Array),
            TypeRef::Model(ref type_id) => self.parse_model(type_id, json, expect.bindings)?,
            TypeRef::Param(ref name) => {
                let message = format!(
                    "Unbound type parameter {} for property {}",
                    name,
                    self.path_str()
                );
                return Err(self.error(ErrorCode::InvalidModelClass, message));
            }
        };

        if let Some(violation) = rules::first_violation(expect.rules, &converted) {
            let message = format!(
                "Validation failed for property: {}: {}",
                self.path_str(),
                violation
            );
            return Err(self.error(ErrorCode::ValidationFailed, message));
        }

        Ok(converted)
    }

    fn parse_elements(
        &mut self,
        expect: &Expect<'_>,
        json: &Value,
    ) -> Result<Vec<Parsed>, ParseError> {
        let element = match expect.element {
            Some(ref element) => element,
            None => {
                let message = format!(
                    "Missing element type for array property {}",
                    self.path_str()
                );
                return Err(self.error(ErrorCode::InvalidType, message));
            }
        };

        let items = match json.as_array() {
            Some(items) => items,
            None => return Err(self.invalid_type("an array")),
        };

        self.check_depth()?;

        let element_expect = Expect {
            ty: element.clone(),
            element: None,
            optional: false,
            default: None,
            rules: expect.rules,
            bindings: expect.bindings,
        };

        let mut values = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            self.tokens.push(i.to_string());
            values.push(self.parse_value(&element_expect, item)?);
            self.tokens.pop();
        }

        Ok(values)
    }

    fn parse_model(
        &mut self,
        type_id: &str,
        json: &Value,
        bindings: Option<&Bindings>,
    ) -> Result<Parsed, ParseError> {
        let registry = self.registry;
        if let Some(schema) = registry.lookup(type_id) {
            return self.parse_object(schema, json, bindings);
        }

        match registry.mappers().lookup_for(type_id, json) {
            Some(mapper) => {
                trace!(type_id = type_id, "applying custom mapper");
                Ok(mapper(json))
            }
            None => {
                let message = format!(
                    "No schema or mapper registered for type {} at property {}",
                    type_id,
                    self.path_str()
                );
                Err(self.error(ErrorCode::InvalidModelClass, message))
            }
        }
    }

    fn parse_object(
        &mut self,
        schema: &TypeSchema,
        json: &Value,
        inherited: Option<&Bindings>,
    ) -> Result<Parsed, ParseError> {
        self.check_depth()?;

        let object = match json.as_object() {
            Some(object) => object,
            None => {
                let expected = format!("an object of type {}", schema.type_id());
                return Err(self.invalid_type(&expected));
            }
        };

        // Every required field must be present before any is converted.
        let mut located = Vec::with_capacity(schema.fields().len());
        for field in schema.fields() {
            let found = field
                .names()
                .iter()
                .find_map(|name| object.get(name).map(|value| (name, value)));

            if found.is_none() && !field.is_optional() {
                let message = format!(
                    "Missing property {} at path {}",
                    field.display_name(),
                    self.path_str()
                );
                self.tokens
                    .push(field.names().first().cloned().unwrap_or_default());
                return Err(self.error(ErrorCode::MissingProperty, message));
            }

            located.push((field, found));
        }

        let mut values = Vec::with_capacity(located.len());
        for (field, found) in located {
            let (name, value) = match found {
                Some(found) => found,
                None => {
                    values.push(field.default().cloned().unwrap_or(Parsed::Absent));
                    continue;
                }
            };

            self.tokens.push(name.clone());
            let parsed = if field.is_raw() {
                if field.is_optional() && value.is_null() {
                    field.default().cloned().unwrap_or(Parsed::Absent)
                } else {
                    Parsed::Raw(value.clone())
                }
            } else {
                let bindings = schema
                    .bindings()
                    .resolve(inherited)
                    .overlay(&field.bindings().resolve(inherited));
                let expect = Expect {
                    ty: field.ty().resolve(inherited),
                    element: field.element().map(|element| element.resolve(inherited)),
                    optional: field.is_optional(),
                    default: field.default(),
                    rules: field.rules(),
                    bindings: if bindings.is_empty() {
                        None
                    } else {
                        Some(&bindings)
                    },
                };
                self.parse_value(&expect, value)?
            };
            self.tokens.pop();
            values.push(parsed);
        }

        trace!(type_id = schema.type_id(), "constructing value");
        schema.construct(values).map_err(|err| {
            let message = format!(
                "Cannot construct {} at path {}: {}",
                schema.type_id(),
                self.path_str(),
                err
            );
            self.error(ErrorCode::InvalidModelClass, message)
        })
    }

    fn check_depth(&self) -> Result<(), ParseError> {
        if self.tokens.len() >= self.max_depth {
            let message = format!(
                "Maximum depth of {} exceeded at path {}",
                self.max_depth,
                self.path_str()
            );
            return Err(self.error(ErrorCode::MaxDepthExceeded, message));
        }

        Ok(())
    }

    fn invalid_type(&self, expected: &str) -> ParseError {
        let message = format!("Expected {} for property {}", expected, self.path_str());
        self.error(ErrorCode::InvalidType, message)
    }

    fn error(&self, code: ErrorCode, message: String) -> ParseError {
        ParseError::new(code, message, JsonPointer::new(self.tokens.clone()))
    }

    fn path_str(&self) -> String {
        if self.tokens.is_empty() {
            return ".".to_owned();
        }

        JsonPointer::<String, _>::new(self.tokens.as_slice()).to_string()
    }
}
