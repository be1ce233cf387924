//! Parse JSON input into typed values.
//!
//! This module contains the entry points for *parsing*: taking a JSON value
//! tree and converting it, according to the schemas in a
//! [`Registry`](../registry/struct.Registry.html), into a typed value. Parsing
//! is fail-fast: the first violation aborts the whole call.
//!
//! See the docs for [`Parser`](struct.Parser.html) for more.

use crate::errors::{ErrorCode, ParseError};
use crate::registry::Registry;
use crate::schema::TypeRef;
use crate::value::Parsed;
use crate::vm;
use json_pointer::JsonPointer;
use serde_json::Value;
use std::any::{self, Any};
use tracing::debug;

/// Parses JSON values against the schemas of a registry.
///
/// A parser only reads its registry, so any number of parsers, on any number
/// of threads, can share one once registration is complete.
#[derive(Debug, Clone)]
pub struct Parser<'r> {
    registry: &'r Registry,
    config: Config,
}

impl<'r> Parser<'r> {
    /// Constructs a new parser using the default configuration.
    pub fn new(registry: &'r Registry) -> Self {
        Self::new_with_config(registry, Config::default())
    }

    /// Constructs a new parser using a configuration.
    pub fn new_with_config(registry: &'r Registry, config: Config) -> Self {
        Self { registry, config }
    }

    /// Parse `json` as a value of type `ty`.
    ///
    /// Returns the first violation found, with a pointer to the part of the
    /// input which was rejected.
    pub fn parse(&self, ty: &TypeRef, json: &Value) -> Result<Parsed, ParseError> {
        vm::parse(self.registry, self.config.max_depth, ty, json).map_err(log_failure)
    }

    /// Parse `json` as an array whose elements are each of type `element`.
    ///
    /// When `optional` is set, a `null` input produces an empty array rather
    /// than an error.
    pub fn parse_array(
        &self,
        element: &TypeRef,
        json: &Value,
        optional: bool,
    ) -> Result<Vec<Parsed>, ParseError> {
        vm::parse_array(
            self.registry,
            self.config.max_depth,
            element,
            json,
            optional,
        )
        .map_err(log_failure)
    }

    /// Parse `json` as the model `type_id`, and take the resulting instance
    /// out as a `T`.
    ///
    /// Fails with `INVALID_MODEL_CLASS` if the type does not produce a `T`,
    /// for instance because it has no factory.
    pub fn parse_model<T: Any + Send + Sync>(
        &self,
        type_id: &str,
        json: &Value,
    ) -> Result<T, ParseError> {
        let parsed = self.parse(&TypeRef::model(type_id), json)?;
        parsed.into_instance().map_err(|found| {
            let err = ParseError::new(
                ErrorCode::InvalidModelClass,
                format!(
                    "Type {} produced {} rather than {}",
                    type_id,
                    found.kind(),
                    any::type_name::<T>()
                ),
                JsonPointer::new(Vec::new()),
            );
            log_failure(err)
        })
    }
}

fn log_failure(err: ParseError) -> ParseError {
    debug!(code = %err.code(), path = %err.path(), "parse failed: {}", err.message());
    err
}

/// Configuration for how parsing should proceed.
#[derive(Debug, Eq, PartialEq, Clone, Hash)]
pub struct Config {
    max_depth: usize,
}

impl Config {
    /// Create a new, default `Config`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum nesting depth of objects and arrays to descend into
    /// before aborting. The default is 128.
    ///
    /// When parsing is aborted because of this maximum depth, it fails with
    /// `MAX_DEPTH_EXCEEDED`. This keeps pathologically nested input from
    /// exhausting the stack.
    pub fn max_depth(&mut self, max_depth: usize) -> &mut Self {
        self.max_depth = max_depth;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self { max_depth: 128 }
    }
}
