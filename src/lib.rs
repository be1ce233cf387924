//! `jsonbind` turns loosely-typed JSON into strongly-typed values, driven by
//! schemas registered at runtime.
//!
//! A schema names, for each argument of a type's factory, the JSON property to
//! read it from, the type to convert it into, and any validation rules it must
//! satisfy. Parsing walks the input depth-first and stops at the first
//! violation, reporting a stable error code, a message, and a
//! [`JsonPointer`](https://docs.rs/json-pointer/0.3.2/json_pointer/struct.JsonPointer.html)
//! to the offending part of the input.
//!
//! # Parsing data
//!
//! ```
//! use serde_json::json;
//! use jsonbind::{rules, ErrorCode, Field, Registry, TypeRef, TypeSchema};
//! use failure::Error;
//!
//! #[derive(Debug, PartialEq)]
//! struct Person {
//!     name: String,
//!     age: f64,
//!     phones: Vec<String>,
//! }
//!
//! fn main() -> Result<(), Error> {
//!     let mut registry = Registry::new();
//!     registry.register(
//!         TypeSchema::builder("Person")
//!             .field(Field::new("name", TypeRef::String))
//!             .field(Field::new("age", TypeRef::Number).rule(rules::min(0.0)))
//!             .field(Field::array("phones|phoneNumbers", TypeRef::String).optional())
//!             .factory(3, |args| {
//!                 Ok(Person {
//!                     name: args.next()?,
//!                     age: args.next()?,
//!                     phones: args.next::<Option<Vec<String>>>()?.unwrap_or_default(),
//!                 })
//!             }),
//!     )?;
//!
//!     let person: Person = registry.parse_model(
//!         "Person",
//!         &json!({
//!             "name": "John Doe",
//!             "age": 43,
//!             "phoneNumbers": ["+44 1234567", "+44 2345678"]
//!         }),
//!     )?;
//!     assert_eq!(person.name, "John Doe");
//!     assert_eq!(person.phones.len(), 2);
//!
//!     // The first violation aborts the parse, and says where it was found.
//!     let err = registry
//!         .parse_model::<Person>("Person", &json!({ "name": "Jane Doe", "age": -1 }))
//!         .unwrap_err();
//!     assert_eq!(err.code(), ErrorCode::ValidationFailed);
//!     assert_eq!(err.path().to_string(), "/age");
//!
//!     Ok(())
//! }
//! ```
//!
//! Types without a factory parse into a [`Record`](value/struct.Record.html)
//! of their field values. Schemas can also be declared as data, using
//! [`SerdeSchema`](serde/struct.SerdeSchema.html).
//!
//! # Custom mappers
//!
//! Types which are not JSON objects in the input, such as a temperature
//! written as `"18C"`, can be built by a custom mapper registered against the
//! kind of JSON value it accepts. See
//! [`Registry::register_mapper`](registry/struct.Registry.html#method.register_mapper).

mod vm;

pub mod dates;
pub mod errors;
pub mod mapper;
pub mod parser;
pub mod registry;
pub mod rules;
pub mod schema;
pub mod serde;
pub mod value;

pub use crate::dates::DateValue;
pub use crate::errors::{ArgError, ErrorCode, ParseError, SchemaError};
pub use crate::mapper::{JsonKind, Mapper};
pub use crate::parser::{Config, Parser};
pub use crate::registry::Registry;
pub use crate::rules::Rule;
pub use crate::schema::{Bindings, Field, SchemaBuilder, TypeRef, TypeSchema};
pub use crate::serde::{SerdeField, SerdeRule, SerdeSchema};
pub use crate::value::{Args, FromParsed, Parsed, Record};
