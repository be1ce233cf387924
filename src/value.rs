//! The values a parse produces, and typed access to them from factories.

use crate::dates::DateValue;
use crate::errors::ArgError;
use serde_json::{Number, Value};
use std::any::{self, Any};
use std::fmt;
use std::sync::Arc;

/// A value produced by parsing.
///
/// Scalars, dates and arrays map onto the obvious variants. A type declared
/// without a factory produces a [`Record`](struct.Record.html); a type with a
/// factory, or one handled by a custom mapper, produces an opaque
/// `Instance` which can be recovered with
/// [`downcast_ref`](#method.downcast_ref) or [`FromParsed`](trait.FromParsed.html).
#[derive(Clone)]
pub enum Parsed {
    /// An optional field which was absent and had no default.
    Absent,
    Bool(bool),
    Number(Number),
    String(String),
    Date(DateValue),
    Array(Vec<Parsed>),

    /// A JSON subtree passed through unconverted.
    Raw(Value),
    Record(Record),
    Instance(Arc<dyn Any + Send + Sync>),
}

impl Parsed {
    /// Wrap an arbitrary object as an `Instance`.
    pub fn instance<T: Any + Send + Sync>(value: T) -> Parsed {
        Parsed::Instance(Arc::new(value))
    }

    /// Convert plain JSON into the corresponding scalar variant.
    ///
    /// `null` becomes `Absent`. Arrays and objects are kept verbatim as `Raw`.
    pub fn from_json(value: Value) -> Parsed {
        match value {
            Value::Null => Parsed::Absent,
            Value::Bool(b) => Parsed::Bool(b),
            Value::Number(n) => Parsed::Number(n),
            Value::String(s) => Parsed::String(s),
            other => Parsed::Raw(other),
        }
    }

    /// A short name for the kind of this value, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Parsed::Absent => "absent",
            Parsed::Bool(_) => "boolean",
            Parsed::Number(_) => "number",
            Parsed::String(_) => "string",
            Parsed::Date(_) => "date",
            Parsed::Array(_) => "array",
            Parsed::Raw(_) => "raw json",
            Parsed::Record(_) => "record",
            Parsed::Instance(_) => "instance",
        }
    }

    pub fn is_absent(&self) -> bool {
        match self {
            Parsed::Absent => true,
            _ => false,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Parsed::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Parsed::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Parsed::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&DateValue> {
        match self {
            Parsed::Date(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Parsed]> {
        match self {
            Parsed::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> Option<&Value> {
        match self {
            Parsed::Raw(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Parsed::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Borrow the object inside an `Instance`, if it is a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Parsed::Instance(inner) => inner.downcast_ref(),
            _ => None,
        }
    }

    /// Take the object out of an `Instance`.
    ///
    /// Gives the value back unchanged if it is not an instance of `T`, or if
    /// the instance is shared (for example, a default value handed out to
    /// several parses).
    pub fn into_instance<T: Any + Send + Sync>(self) -> Result<T, Parsed> {
        match self {
            Parsed::Instance(inner) => match inner.downcast::<T>() {
                Ok(typed) => Arc::try_unwrap(typed).map_err(|shared| Parsed::Instance(shared)),
                Err(inner) => Err(Parsed::Instance(inner)),
            },
            other => Err(other),
        }
    }

    /// Like [`into_instance`](#method.into_instance), but clones the object
    /// out of a shared instance instead of giving up on it.
    pub fn into_instance_cloned<T: Any + Send + Sync + Clone>(self) -> Result<T, Parsed> {
        match self {
            Parsed::Instance(inner) => match inner.downcast::<T>() {
                Ok(typed) => Ok(Arc::try_unwrap(typed).unwrap_or_else(|shared| (*shared).clone())),
                Err(inner) => Err(Parsed::Instance(inner)),
            },
            other => Err(other),
        }
    }
}

impl fmt::Debug for Parsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parsed::Absent => f.write_str("Absent"),
            Parsed::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Parsed::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Parsed::String(s) => f.debug_tuple("String").field(s).finish(),
            Parsed::Date(d) => f.debug_tuple("Date").field(d).finish(),
            Parsed::Array(items) => f.debug_tuple("Array").field(items).finish(),
            Parsed::Raw(v) => f.debug_tuple("Raw").field(v).finish(),
            Parsed::Record(r) => f.debug_tuple("Record").field(r).finish(),
            Parsed::Instance(_) => f.write_str("Instance(..)"),
        }
    }
}

// Instances compare by identity.
impl PartialEq for Parsed {
    fn eq(&self, other: &Parsed) -> bool {
        match (self, other) {
            (Parsed::Absent, Parsed::Absent) => true,
            (Parsed::Bool(a), Parsed::Bool(b)) => a == b,
            (Parsed::Number(a), Parsed::Number(b)) => a == b,
            (Parsed::String(a), Parsed::String(b)) => a == b,
            (Parsed::Date(a), Parsed::Date(b)) => a == b,
            (Parsed::Array(a), Parsed::Array(b)) => a == b,
            (Parsed::Raw(a), Parsed::Raw(b)) => a == b,
            (Parsed::Record(a), Parsed::Record(b)) => a == b,
            (Parsed::Instance(a), Parsed::Instance(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for Parsed {
    fn from(b: bool) -> Parsed {
        Parsed::Bool(b)
    }
}

impl From<i64> for Parsed {
    fn from(n: i64) -> Parsed {
        Parsed::Number(n.into())
    }
}

impl From<u64> for Parsed {
    fn from(n: u64) -> Parsed {
        Parsed::Number(n.into())
    }
}

impl From<i32> for Parsed {
    fn from(n: i32) -> Parsed {
        Parsed::Number(n.into())
    }
}

/// Non-finite numbers have no JSON representation and become `Absent`.
impl From<f64> for Parsed {
    fn from(n: f64) -> Parsed {
        Number::from_f64(n).map_or(Parsed::Absent, Parsed::Number)
    }
}

impl From<&str> for Parsed {
    fn from(s: &str) -> Parsed {
        Parsed::String(s.to_owned())
    }
}

impl From<String> for Parsed {
    fn from(s: String) -> Parsed {
        Parsed::String(s)
    }
}

impl From<DateValue> for Parsed {
    fn from(d: DateValue) -> Parsed {
        Parsed::Date(d)
    }
}

impl From<Vec<Parsed>> for Parsed {
    fn from(items: Vec<Parsed>) -> Parsed {
        Parsed::Array(items)
    }
}

/// The generic result of parsing a type which has no factory: its identifier
/// and its field values, in argument order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    type_id: String,
    values: Vec<Parsed>,
}

impl Record {
    pub fn new(type_id: impl Into<String>, values: Vec<Parsed>) -> Record {
        Record {
            type_id: type_id.into(),
            values,
        }
    }

    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    /// The value of the field at argument position `index`.
    pub fn get(&self, index: usize) -> Option<&Parsed> {
        self.values.get(index)
    }

    pub fn values(&self) -> &[Parsed] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Parsed> {
        self.values
    }
}

/// Conversion out of a [`Parsed`](enum.Parsed.html) into a concrete Rust type.
///
/// On a mismatch the value is handed back so the caller can report what it
/// found.
pub trait FromParsed: Sized {
    /// What this type expects, for error messages.
    const EXPECTED: &'static str;

    fn from_parsed(parsed: Parsed) -> Result<Self, Parsed>;
}

impl FromParsed for Parsed {
    const EXPECTED: &'static str = "any value";

    fn from_parsed(parsed: Parsed) -> Result<Parsed, Parsed> {
        Ok(parsed)
    }
}

impl FromParsed for String {
    const EXPECTED: &'static str = "string";

    fn from_parsed(parsed: Parsed) -> Result<String, Parsed> {
        match parsed {
            Parsed::String(s) => Ok(s),
            other => Err(other),
        }
    }
}

impl FromParsed for bool {
    const EXPECTED: &'static str = "boolean";

    fn from_parsed(parsed: Parsed) -> Result<bool, Parsed> {
        match parsed {
            Parsed::Bool(b) => Ok(b),
            other => Err(other),
        }
    }
}

impl FromParsed for f64 {
    const EXPECTED: &'static str = "number";

    fn from_parsed(parsed: Parsed) -> Result<f64, Parsed> {
        match parsed.as_f64() {
            Some(n) => Ok(n),
            None => Err(parsed),
        }
    }
}

impl FromParsed for i64 {
    const EXPECTED: &'static str = "integer";

    fn from_parsed(parsed: Parsed) -> Result<i64, Parsed> {
        let n = match &parsed {
            Parsed::Number(n) => n.as_i64(),
            _ => None,
        };
        n.ok_or(parsed)
    }
}

impl FromParsed for u64 {
    const EXPECTED: &'static str = "unsigned integer";

    fn from_parsed(parsed: Parsed) -> Result<u64, Parsed> {
        let n = match &parsed {
            Parsed::Number(n) => n.as_u64(),
            _ => None,
        };
        n.ok_or(parsed)
    }
}

impl FromParsed for DateValue {
    const EXPECTED: &'static str = "date";

    fn from_parsed(parsed: Parsed) -> Result<DateValue, Parsed> {
        match parsed {
            Parsed::Date(d) => Ok(d),
            other => Err(other),
        }
    }
}

impl FromParsed for Value {
    const EXPECTED: &'static str = "raw json";

    fn from_parsed(parsed: Parsed) -> Result<Value, Parsed> {
        match parsed {
            Parsed::Raw(v) => Ok(v),
            other => Err(other),
        }
    }
}

impl FromParsed for Record {
    const EXPECTED: &'static str = "record";

    fn from_parsed(parsed: Parsed) -> Result<Record, Parsed> {
        match parsed {
            Parsed::Record(r) => Ok(r),
            other => Err(other),
        }
    }
}

impl<T: FromParsed> FromParsed for Option<T> {
    const EXPECTED: &'static str = T::EXPECTED;

    fn from_parsed(parsed: Parsed) -> Result<Option<T>, Parsed> {
        match parsed {
            Parsed::Absent => Ok(None),
            other => T::from_parsed(other).map(Some),
        }
    }
}

impl<T: FromParsed> FromParsed for Vec<T> {
    const EXPECTED: &'static str = "array";

    fn from_parsed(parsed: Parsed) -> Result<Vec<T>, Parsed> {
        match parsed {
            Parsed::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                let mut items = items.into_iter();
                while let Some(item) = items.next() {
                    match T::from_parsed(item) {
                        Ok(v) => out.push(v),
                        // Hand back the array, minus the elements already
                        // converted, with the offending element restored.
                        Err(item) => {
                            let mut rest = vec![item];
                            rest.extend(items);
                            return Err(Parsed::Array(rest));
                        }
                    }
                }
                Ok(out)
            }
            other => Err(other),
        }
    }
}

/// Boxed instances, for recursive types such as `Option<Box<Node>>`.
impl<T: Any + Send + Sync> FromParsed for Box<T> {
    const EXPECTED: &'static str = "instance";

    fn from_parsed(parsed: Parsed) -> Result<Box<T>, Parsed> {
        parsed.into_instance().map(Box::new)
    }
}

/// The ordered field values handed to a factory.
///
/// Arguments are read front to back, one per call.
pub struct Args {
    values: std::vec::IntoIter<Parsed>,
    index: usize,
    len: usize,
}

impl Args {
    pub(crate) fn new(values: Vec<Parsed>) -> Args {
        let len = values.len();
        Args {
            values: values.into_iter(),
            index: 0,
            len,
        }
    }

    /// The total number of arguments, read or not.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Read the next argument as a `T`.
    pub fn next<T: FromParsed>(&mut self) -> Result<T, ArgError> {
        let index = self.index;
        let parsed = self.take()?;
        T::from_parsed(parsed).map_err(|found| ArgError::Mismatch {
            index,
            expected: T::EXPECTED,
            found: found.kind(),
        })
    }

    /// Read the next argument as an instance produced by a factory or mapper.
    ///
    /// An instance shared with the schema, as a default value is, cannot be
    /// taken; use [`model_cloned`](#method.model_cloned) for such fields.
    pub fn model<T: Any + Send + Sync>(&mut self) -> Result<T, ArgError> {
        let index = self.index;
        let parsed = self.take()?;
        parsed
            .into_instance()
            .map_err(|found| instance_mismatch::<T>(index, &found))
    }

    /// Like [`model`](#method.model), for an optional field.
    pub fn optional_model<T: Any + Send + Sync>(&mut self) -> Result<Option<T>, ArgError> {
        let index = self.index;
        match self.take()? {
            Parsed::Absent => Ok(None),
            parsed => parsed
                .into_instance()
                .map(Some)
                .map_err(|found| instance_mismatch::<T>(index, &found)),
        }
    }

    /// Read the next argument as an instance, cloning it if it is shared.
    pub fn model_cloned<T: Any + Send + Sync + Clone>(&mut self) -> Result<T, ArgError> {
        let index = self.index;
        let parsed = self.take()?;
        parsed
            .into_instance_cloned()
            .map_err(|found| instance_mismatch::<T>(index, &found))
    }

    /// Like [`model_cloned`](#method.model_cloned), for an optional field.
    pub fn optional_model_cloned<T: Any + Send + Sync + Clone>(
        &mut self,
    ) -> Result<Option<T>, ArgError> {
        let index = self.index;
        match self.take()? {
            Parsed::Absent => Ok(None),
            parsed => parsed
                .into_instance_cloned()
                .map(Some)
                .map_err(|found| instance_mismatch::<T>(index, &found)),
        }
    }

    fn take(&mut self) -> Result<Parsed, ArgError> {
        let index = self.index;
        let parsed = self.values.next().ok_or(ArgError::Exhausted {
            index,
            len: self.len,
        })?;
        self.index += 1;
        Ok(parsed)
    }
}

fn instance_mismatch<T: Any>(index: usize, found: &Parsed) -> ArgError {
    let found = if found.downcast_ref::<T>().is_some() {
        "shared instance"
    } else {
        found.kind()
    };
    ArgError::Mismatch {
        index,
        expected: any::type_name::<T>(),
        found,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[derive(Debug, PartialEq)]
    struct Node {
        name: String,
        next: Option<Box<Node>>,
    }

    #[test]
    fn from_json() {
        assert_eq!(Parsed::from_json(json!(null)), Parsed::Absent);
        assert_eq!(Parsed::from_json(json!(3)), Parsed::from(3));
        assert_eq!(Parsed::from_json(json!("x")), Parsed::from("x"));
        assert_eq!(
            Parsed::from_json(json!({ "a": 1 })),
            Parsed::Raw(json!({ "a": 1 }))
        );
    }

    #[test]
    fn args_read_in_order() {
        let mut args = Args::new(vec![
            Parsed::from("foo"),
            Parsed::from(42),
            Parsed::from(true),
            Parsed::Absent,
            Parsed::Array(vec![Parsed::from(1.5), Parsed::from(2)]),
        ]);

        assert_eq!(args.len(), 5);
        assert_eq!(args.next::<String>(), Ok("foo".to_owned()));
        assert_eq!(args.next::<i64>(), Ok(42));
        assert_eq!(args.next::<bool>(), Ok(true));
        assert_eq!(args.next::<Option<String>>(), Ok(None));
        assert_eq!(args.next::<Vec<f64>>(), Ok(vec![1.5, 2.0]));
        assert_eq!(
            args.next::<String>(),
            Err(ArgError::Exhausted { index: 5, len: 5 })
        );
    }

    #[test]
    fn args_mismatch() {
        let mut args = Args::new(vec![Parsed::from(42)]);
        assert_eq!(
            args.next::<String>(),
            Err(ArgError::Mismatch {
                index: 0,
                expected: "string",
                found: "number",
            })
        );
    }

    #[test]
    fn boxed_instances() {
        let tail = Parsed::instance(Node {
            name: "bar".to_owned(),
            next: None,
        });
        let mut args = Args::new(vec![Parsed::from("foo"), tail]);
        let node = Node {
            name: args.next().unwrap(),
            next: args.next().unwrap(),
        };

        assert_eq!(node.next.unwrap().name, "bar");
    }

    #[test]
    fn shared_instances_are_not_taken() {
        let shared = Parsed::instance(7u8);
        let copy = shared.clone();
        assert_eq!(shared.downcast_ref::<u8>(), Some(&7));
        assert!(shared.into_instance::<u8>().is_err());
        assert_eq!(copy.into_instance::<u8>().ok(), Some(7));
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Gear(&'static str);

    #[test]
    fn shared_instances_can_be_cloned() {
        let shared = Parsed::instance(Gear("std"));
        let mut args = Args::new(vec![shared.clone(), shared.clone()]);

        assert_eq!(
            args.model::<Gear>(),
            Err(ArgError::Mismatch {
                index: 0,
                expected: any::type_name::<Gear>(),
                found: "shared instance",
            })
        );
        assert_eq!(args.model_cloned::<Gear>(), Ok(Gear("std")));
        assert_eq!(shared.downcast_ref::<Gear>(), Some(&Gear("std")));
    }

    #[test]
    fn optional_models() {
        let mut args = Args::new(vec![
            Parsed::Absent,
            Parsed::instance(Gear("fine")),
            Parsed::from("coarse"),
        ]);

        assert_eq!(args.optional_model_cloned::<Gear>(), Ok(None));
        assert_eq!(args.optional_model_cloned::<Gear>(), Ok(Some(Gear("fine"))));
        assert_eq!(
            args.optional_model_cloned::<Gear>(),
            Err(ArgError::Mismatch {
                index: 2,
                expected: any::type_name::<Gear>(),
                found: "string",
            })
        );
    }
}
