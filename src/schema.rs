//! Type schemas and the API for declaring them.
//!
//! A [`TypeSchema`](struct.TypeSchema.html) describes how to build one target
//! type out of a JSON object: an ordered list of [`Field`](struct.Field.html)
//! descriptors, one per argument of the type's factory, plus the factory
//! itself. Schemas are declared with a [`SchemaBuilder`](struct.SchemaBuilder.html)
//! and checked when they are built, so that an argument slot without a
//! property name, or a field beyond the factory's arity, is reported before
//! any parsing takes place.
//!
//! Fields refer to other types by identifier only (see
//! [`TypeRef`](enum.TypeRef.html)). Lookups happen lazily during parsing, so
//! a type may refer to itself, or to a type registered after it.

use crate::errors::{ArgError, SchemaError};
use crate::rules::Rule;
use crate::value::{Args, Parsed, Record};
use std::any::Any;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// A reference to the type a field should be converted into.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    String,
    Number,
    Boolean,
    Date,

    /// An array. The element type is declared on the field.
    Array,

    /// A type registered under the given identifier, either with a schema or
    /// with custom mappers.
    Model(String),

    /// A formal type parameter, resolved through a generic binding.
    Param(String),
}

impl TypeRef {
    pub fn model(type_id: impl Into<String>) -> TypeRef {
        TypeRef::Model(type_id.into())
    }

    pub fn param(name: impl Into<String>) -> TypeRef {
        TypeRef::Param(name.into())
    }

    /// Interpret a type name: one of the built-in names, `$Name` for a formal
    /// parameter, and anything else as a model identifier.
    pub fn from_name(name: &str) -> TypeRef {
        match name {
            "string" => TypeRef::String,
            "number" => TypeRef::Number,
            "boolean" => TypeRef::Boolean,
            "date" => TypeRef::Date,
            "array" => TypeRef::Array,
            _ if name.starts_with('$') => TypeRef::Param(name[1..].to_owned()),
            _ => TypeRef::Model(name.to_owned()),
        }
    }

    /// Substitute a formal parameter with its binding, if one is supplied.
    pub(crate) fn resolve(&self, bindings: Option<&Bindings>) -> TypeRef {
        match (self, bindings) {
            (TypeRef::Param(name), Some(bindings)) => match bindings.get(name) {
                Some(concrete) => concrete.clone(),
                None => self.clone(),
            },
            _ => self.clone(),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::String => f.write_str("string"),
            TypeRef::Number => f.write_str("number"),
            TypeRef::Boolean => f.write_str("boolean"),
            TypeRef::Date => f.write_str("date"),
            TypeRef::Array => f.write_str("array"),
            TypeRef::Model(id) => f.write_str(id),
            TypeRef::Param(name) => write!(f, "${}", name),
        }
    }
}

/// See [`from_name`](#method.from_name).
impl FromStr for TypeRef {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<TypeRef, Infallible> {
        Ok(TypeRef::from_name(s))
    }
}

/// Concrete types supplied for formal type parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings(BTreeMap<String, TypeRef>);

impl Bindings {
    pub fn new() -> Bindings {
        Bindings::default()
    }

    pub fn insert(&mut self, param: impl Into<String>, concrete: TypeRef) {
        self.0.insert(param.into(), concrete);
    }

    pub fn get(&self, param: &str) -> Option<&TypeRef> {
        self.0.get(param)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// These bindings with any formal parameters among the concrete types
    /// substituted from `outer`.
    pub(crate) fn resolve(&self, outer: Option<&Bindings>) -> Bindings {
        Bindings(
            self.0
                .iter()
                .map(|(param, concrete)| (param.clone(), concrete.resolve(outer)))
                .collect(),
        )
    }

    /// These bindings with `other`'s entries taking precedence.
    pub fn overlay(&self, other: &Bindings) -> Bindings {
        let mut merged = self.clone();
        for (param, concrete) in &other.0 {
            merged.0.insert(param.clone(), concrete.clone());
        }
        merged
    }
}

/// How one factory argument is read out of a JSON object.
#[derive(Clone)]
pub struct Field {
    names: Vec<String>,
    ty: TypeRef,
    element: Option<TypeRef>,
    optional: bool,
    default: Option<Parsed>,
    raw: bool,
    bindings: Bindings,
    rules: Vec<Rule>,
}

impl Field {
    /// A field read from the first present property among `names`.
    ///
    /// `names` may list alternatives separated by `|`, such as `"foo|bar"`.
    /// An array declared this way has no element type, and fails to parse.
    pub fn new(names: &str, ty: TypeRef) -> Field {
        Field {
            names: split_names(names),
            ty,
            element: None,
            optional: false,
            default: None,
            raw: false,
            bindings: Bindings::new(),
            rules: Vec::new(),
        }
    }

    /// An array field whose elements are each parsed as `element`.
    pub fn array(names: &str, element: TypeRef) -> Field {
        let mut field = Field::new(names, TypeRef::Array);
        field.element = Some(element);
        field
    }

    /// A field which receives its JSON subtree verbatim, unconverted and
    /// unvalidated.
    pub fn raw(names: &str) -> Field {
        let mut field = Field::new(names, TypeRef::Model("json".to_owned()));
        field.raw = true;
        field
    }

    /// A field which may be absent (or `null`) in the input.
    pub fn optional(mut self) -> Field {
        self.optional = true;
        self
    }

    /// The value an optional field takes when absent. Implies `optional`.
    ///
    /// A default instance is shared between parses, so a factory reads it
    /// with [`Args::model_cloned`](../value/struct.Args.html#method.model_cloned).
    pub fn default_value(mut self, value: impl Into<Parsed>) -> Field {
        self.optional = true;
        self.default = Some(value.into());
        self
    }

    /// Append a validation rule. Rules run in the order they are added.
    pub fn rule(mut self, rule: Rule) -> Field {
        self.rules.push(rule);
        self
    }

    /// Supply a concrete type for a formal parameter of this field's type.
    pub fn bind(mut self, param: impl Into<String>, concrete: TypeRef) -> Field {
        self.bindings.insert(param, concrete);
        self
    }

    /// The candidate property names, in the order they are tried.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    pub fn element(&self) -> Option<&TypeRef> {
        self.element.as_ref()
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn default(&self) -> Option<&Parsed> {
        self.default.as_ref()
    }

    pub fn is_raw(&self) -> bool {
        self.raw
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// The names joined back into their declared form.
    pub fn display_name(&self) -> String {
        self.names.join("|")
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("names", &self.names)
            .field("ty", &self.ty)
            .field("element", &self.element)
            .field("optional", &self.optional)
            .field("default", &self.default)
            .field("raw", &self.raw)
            .field("bindings", &self.bindings)
            .field("rules", &self.rules.len())
            .finish()
    }
}

fn split_names(names: &str) -> Vec<String> {
    names
        .split('|')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .collect()
}

pub(crate) type Factory = Arc<dyn Fn(Args) -> Result<Parsed, ArgError> + Send + Sync>;

/// The registered description of a target type.
#[derive(Clone)]
pub struct TypeSchema {
    type_id: String,
    fields: Vec<Field>,
    bindings: Bindings,
    factory: Option<Factory>,
}

impl TypeSchema {
    pub fn builder(type_id: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(type_id)
    }

    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    /// The field descriptors, in factory-argument order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Bindings supplied to every field of this type.
    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn has_factory(&self) -> bool {
        self.factory.is_some()
    }

    /// Build the target value out of the ordered field values.
    pub(crate) fn construct(&self, values: Vec<Parsed>) -> Result<Parsed, ArgError> {
        match self.factory {
            Some(ref factory) => factory(Args::new(values)),
            None => Ok(Parsed::Record(Record::new(self.type_id.clone(), values))),
        }
    }
}

impl fmt::Debug for TypeSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeSchema")
            .field("type_id", &self.type_id)
            .field("fields", &self.fields)
            .field("bindings", &self.bindings)
            .field("factory", &self.factory.is_some())
            .finish()
    }
}

#[derive(Default)]
struct Slot {
    field: Option<Field>,
    rules: Vec<Rule>,

    // How many of `rules` were attached before `field` was declared.
    rules_before_field: usize,
}

/// Declares a [`TypeSchema`](struct.TypeSchema.html) piece by piece.
///
/// Fields are keyed by factory-argument position. Validation rules can be
/// attached to a position separately from its field declaration. Rules run
/// in the order they were declared: rules attached to the position before
/// its field was declared, then the field's own rules, then rules attached
/// afterwards.
pub struct SchemaBuilder {
    type_id: String,
    slots: BTreeMap<usize, Slot>,
    bindings: Bindings,
    factory: Option<(usize, Factory)>,
}

impl SchemaBuilder {
    pub fn new(type_id: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            type_id: type_id.into(),
            slots: BTreeMap::new(),
            bindings: Bindings::new(),
            factory: None,
        }
    }

    /// Declare a field at the next argument position.
    pub fn field(self, field: Field) -> SchemaBuilder {
        let index = self.slots.keys().next_back().map_or(0, |last| last + 1);
        self.field_at(index, field)
    }

    /// Declare the field at argument position `index`, replacing any earlier
    /// declaration there.
    pub fn field_at(mut self, index: usize, field: Field) -> SchemaBuilder {
        let slot = self.slots.entry(index).or_default();
        slot.rules_before_field = slot.rules.len();
        slot.field = Some(field);
        self
    }

    /// Attach a validation rule to the argument at position `index`.
    pub fn rule(mut self, index: usize, rule: Rule) -> SchemaBuilder {
        self.slots.entry(index).or_default().rules.push(rule);
        self
    }

    /// Supply a concrete type for formal parameter `param` to every field of
    /// this type. A binding declared on the field itself takes precedence.
    pub fn bind(mut self, param: impl Into<String>, concrete: TypeRef) -> SchemaBuilder {
        self.bindings.insert(param, concrete);
        self
    }

    /// Declare the factory which turns the `arity` ordered field values into
    /// an instance of the target type.
    ///
    /// Without a factory, parsing produces a [`Record`](../value/struct.Record.html).
    pub fn factory<T, F>(mut self, arity: usize, factory: F) -> SchemaBuilder
    where
        T: Any + Send + Sync,
        F: Fn(&mut Args) -> Result<T, ArgError> + Send + Sync + 'static,
    {
        let factory: Factory = Arc::new(move |mut args: Args| factory(&mut args).map(Parsed::instance));
        self.factory = Some((arity, factory));
        self
    }

    /// Check the declarations and produce the schema.
    ///
    /// Every position below the arity must carry a field with at least one
    /// property name, and no field may sit at or beyond the arity. The arity
    /// is the factory's, or the number of declared positions when there is no
    /// factory.
    pub fn build(self) -> Result<TypeSchema, SchemaError> {
        let declared = self.slots.keys().next_back().map_or(0, |last| last + 1);
        let arity = match self.factory {
            Some((arity, _)) => arity,
            None => declared,
        };

        if declared > arity {
            return Err(SchemaError::ArityMismatch {
                type_id: self.type_id,
                index: declared - 1,
                arity,
            });
        }

        let mut slots = self.slots;
        let mut fields = Vec::with_capacity(arity);
        for index in 0..arity {
            let slot = slots.remove(&index).unwrap_or_default();
            match slot.field {
                Some(mut field) if !field.names.is_empty() => {
                    let mut rules = slot.rules;
                    let after = rules.split_off(slot.rules_before_field);
                    rules.append(&mut field.rules);
                    rules.extend(after);
                    field.rules = rules;
                    fields.push(field);
                }
                _ => {
                    return Err(SchemaError::MissingAnnotation {
                        type_id: self.type_id,
                        index,
                    })
                }
            }
        }

        Ok(TypeSchema {
            type_id: self.type_id,
            fields,
            bindings: self.bindings,
            factory: self.factory.map(|(_, factory)| factory),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules;
    use pretty_assertions::assert_eq;

    #[test]
    fn type_names() {
        for name in &["string", "number", "boolean", "date", "array", "$T", "Widget"] {
            let parsed: TypeRef = name.parse().unwrap();
            assert_eq!(parsed.to_string(), *name);
        }
        assert_eq!("$T".parse::<TypeRef>().unwrap(), TypeRef::param("T"));
        assert_eq!("Widget".parse::<TypeRef>().unwrap(), TypeRef::model("Widget"));
    }

    #[test]
    fn variant_names() {
        let field = Field::new("foo | bar|", TypeRef::Number);
        assert_eq!(field.names(), &["foo".to_owned(), "bar".to_owned()]);
        assert_eq!(field.display_name(), "foo|bar");
    }

    #[test]
    fn default_implies_optional() {
        let field = Field::new("num", TypeRef::Number).default_value(11);
        assert!(field.is_optional());
        assert_eq!(field.default(), Some(&Parsed::from(11)));
    }

    #[test]
    fn resolve_params() {
        let mut bindings = Bindings::new();
        bindings.insert("T", TypeRef::model("Widget"));

        assert_eq!(
            TypeRef::param("T").resolve(Some(&bindings)),
            TypeRef::model("Widget")
        );
        assert_eq!(TypeRef::param("U").resolve(Some(&bindings)), TypeRef::param("U"));
        assert_eq!(TypeRef::param("T").resolve(None), TypeRef::param("T"));
        assert_eq!(TypeRef::String.resolve(Some(&bindings)), TypeRef::String);
    }

    #[test]
    fn overlay_bindings() {
        let mut base = Bindings::new();
        base.insert("T", TypeRef::String);
        base.insert("U", TypeRef::Number);
        let mut top = Bindings::new();
        top.insert("T", TypeRef::Boolean);

        let merged = base.overlay(&top);
        assert_eq!(merged.get("T"), Some(&TypeRef::Boolean));
        assert_eq!(merged.get("U"), Some(&TypeRef::Number));
    }

    #[test]
    fn build_in_order() {
        let schema = TypeSchema::builder("Simple")
            .field(Field::new("someString", TypeRef::String))
            .field(Field::new("someNumber", TypeRef::Number))
            .rule(1, rules::min(0.0))
            .field(Field::new("someBoolean", TypeRef::Boolean))
            .build()
            .unwrap();

        assert_eq!(schema.type_id(), "Simple");
        assert_eq!(schema.fields().len(), 3);
        assert_eq!(schema.fields()[1].names(), &["someNumber".to_owned()]);
        assert_eq!(schema.fields()[1].rules().len(), 1);
        assert!(!schema.has_factory());
    }

    #[test]
    fn rules_keep_declaration_order() {
        let schema = TypeSchema::builder("Ordered")
            .rule(0, rules::max(1.0))
            .field_at(0, Field::new("value", TypeRef::Number).rule(rules::min(5.0)))
            .rule(0, rules::min(10.0))
            .build()
            .unwrap();

        let messages: Vec<_> = schema.fields()[0]
            .rules()
            .iter()
            .filter_map(|rule| rule(&Parsed::from(3)))
            .collect();
        assert_eq!(
            messages,
            vec![
                "Value cannot be greater than 1".to_owned(),
                "Value cannot be smaller than 5".to_owned(),
                "Value cannot be smaller than 10".to_owned(),
            ]
        );
    }

    #[test]
    fn resolve_bindings_through_outer() {
        let mut inner = Bindings::new();
        inner.insert("T", TypeRef::param("U"));
        inner.insert("V", TypeRef::String);
        let mut outer = Bindings::new();
        outer.insert("U", TypeRef::Number);

        let resolved = inner.resolve(Some(&outer));
        assert_eq!(resolved.get("T"), Some(&TypeRef::Number));
        assert_eq!(resolved.get("V"), Some(&TypeRef::String));
        assert_eq!(inner.resolve(None), inner);
    }

    #[test]
    fn rules_without_field() {
        let err = TypeSchema::builder("Broken")
            .field(Field::new("a", TypeRef::String))
            .rule(1, rules::min(0.0))
            .build()
            .unwrap_err();

        assert_eq!(
            err,
            SchemaError::MissingAnnotation {
                type_id: "Broken".to_owned(),
                index: 1,
            }
        );
    }

    #[test]
    fn blank_names() {
        let err = TypeSchema::builder("Broken")
            .field(Field::new(" | ", TypeRef::String))
            .build()
            .unwrap_err();

        assert_eq!(
            err,
            SchemaError::MissingAnnotation {
                type_id: "Broken".to_owned(),
                index: 0,
            }
        );
    }

    #[test]
    fn factory_arity() {
        let short = TypeSchema::builder("Pair")
            .field(Field::new("a", TypeRef::String))
            .factory(2, |args| args.next::<String>())
            .build()
            .unwrap_err();
        assert_eq!(
            short,
            SchemaError::MissingAnnotation {
                type_id: "Pair".to_owned(),
                index: 1,
            }
        );

        let long = TypeSchema::builder("Pair")
            .field(Field::new("a", TypeRef::String))
            .field(Field::new("b", TypeRef::String))
            .field(Field::new("c", TypeRef::String))
            .factory(2, |args| args.next::<String>())
            .build()
            .unwrap_err();
        assert_eq!(
            long,
            SchemaError::ArityMismatch {
                type_id: "Pair".to_owned(),
                index: 2,
                arity: 2,
            }
        );
    }

    #[test]
    fn construct_with_factory() {
        let schema = TypeSchema::builder("Name")
            .field(Field::new("first", TypeRef::String))
            .factory(1, |args| args.next::<String>().map(|s| s.to_uppercase()))
            .build()
            .unwrap();

        let built = schema.construct(vec![Parsed::from("ada")]).unwrap();
        assert_eq!(built.downcast_ref::<String>(), Some(&"ADA".to_owned()));
    }
}
