//! Request Schema Validation Module
//!
//! Turns an untrusted JSON request body into a [`Validated`] structure the
//! handlers can trust, or rejects it. Validation is all-or-nothing: a single
//! failing field invalidates the whole structure and nothing partial is
//! returned.
//!
//! A schema maps each field name to a [`FieldSpec`]:
//! - a primitive [`FieldType`] (optionally allowed to be absent)
//! - a nested [`Schema`] that must validate recursively
//! - a custom validator whose output is used verbatim

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use num_bigint::BigInt;
use serde_json::Value;

/// Longest integer, in decimal digits, an exponent literal may expand to.
pub const MAX_BIG_INTEGER_DIGITS: usize = 1024;

// ============================================================================
// SCHEMA DEFINITION
// ============================================================================

/// Runtime type a primitive field must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Boolean,
    Number,
    BigInteger,
    Any,
}

/// Primitive type tag: a kind plus whether absence is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldType {
    pub kind: FieldKind,
    pub optional: bool,
}

impl FieldType {
    pub const STRING: FieldType = FieldType::required(FieldKind::String);
    pub const BOOLEAN: FieldType = FieldType::required(FieldKind::Boolean);
    pub const NUMBER: FieldType = FieldType::required(FieldKind::Number);
    pub const BIG_INTEGER: FieldType = FieldType::required(FieldKind::BigInteger);
    pub const ANY: FieldType = FieldType::required(FieldKind::Any);

    pub const STRING_OPTIONAL: FieldType = FieldType::optional(FieldKind::String);
    pub const BOOLEAN_OPTIONAL: FieldType = FieldType::optional(FieldKind::Boolean);
    pub const NUMBER_OPTIONAL: FieldType = FieldType::optional(FieldKind::Number);
    pub const BIG_INTEGER_OPTIONAL: FieldType = FieldType::optional(FieldKind::BigInteger);
    pub const ANY_OPTIONAL: FieldType = FieldType::optional(FieldKind::Any);

    pub const fn required(kind: FieldKind) -> Self {
        Self { kind, optional: false }
    }

    pub const fn optional(kind: FieldKind) -> Self {
        Self { kind, optional: true }
    }
}

/// Custom field validator. Receives the raw value (`None` when absent) and
/// returns the parsed field, or `None` to reject the whole structure.
pub type ValidatorFn = Arc<dyn Fn(Option<&Value>) -> Option<Field> + Send + Sync>;

/// How a single field is checked.
#[derive(Clone)]
pub enum FieldSpec {
    Primitive(FieldType),
    Nested(Schema),
    Validator(ValidatorFn),
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldSpec::Primitive(t) => f.debug_tuple("Primitive").field(t).finish(),
            FieldSpec::Nested(s) => f.debug_tuple("Nested").field(s).finish(),
            FieldSpec::Validator(_) => f.write_str("Validator(..)"),
        }
    }
}

/// Ordered set of field specifications.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<(String, FieldSpec)>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.push((name.into(), FieldSpec::Primitive(field_type)));
        self
    }

    pub fn nested(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.fields.push((name.into(), FieldSpec::Nested(schema)));
        self
    }

    pub fn custom<F>(mut self, name: impl Into<String>, validator: F) -> Self
    where
        F: Fn(Option<&Value>) -> Option<Field> + Send + Sync + 'static,
    {
        self.fields
            .push((name.into(), FieldSpec::Validator(Arc::new(validator))));
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(name, spec)| (name.as_str(), spec))
    }
}

// ============================================================================
// VALIDATED OUTPUT
// ============================================================================

/// A single validated field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Null,
    String(String),
    Boolean(bool),
    Number(f64),
    BigInteger(BigInt),
    Any(Value),
    Object(Validated),
}

/// Structure produced by a successful validation. Every schema field is
/// present; optional fields that were absent hold [`Field::Null`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Validated {
    fields: BTreeMap<String, Field>,
}

impl Validated {
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn is_null(&self, name: &str) -> bool {
        matches!(self.fields.get(name), Some(Field::Null))
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        match self.fields.get(name)? {
            Field::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        match self.fields.get(name)? {
            Field::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        match self.fields.get(name)? {
            Field::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn big_int(&self, name: &str) -> Option<&BigInt> {
        match self.fields.get(name)? {
            Field::BigInteger(n) => Some(n),
            _ => None,
        }
    }

    pub fn object(&self, name: &str) -> Option<&Validated> {
        match self.fields.get(name)? {
            Field::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_fields(self) -> BTreeMap<String, Field> {
        self.fields
    }
}

// ============================================================================
// VALIDATION
// ============================================================================

/// Validates `input` against `schema`.
///
/// # Returns
///
/// * `Some(Validated)` - Every field passed
/// * `None` - The input is not an object, or any field failed
pub fn validate(input: &Value, schema: &Schema) -> Option<Validated> {
    let object = input.as_object()?;
    let mut fields = BTreeMap::new();

    for (name, spec) in schema.fields() {
        let raw = object.get(name);
        let field = match spec {
            FieldSpec::Validator(validator) => match validator(raw) {
                None | Some(Field::Null) => return None,
                Some(field) => field,
            },
            FieldSpec::Nested(nested) => Field::Object(validate(raw?, nested)?),
            FieldSpec::Primitive(field_type) => validate_primitive(raw, *field_type)?,
        };
        fields.insert(name.to_string(), field);
    }

    Some(Validated { fields })
}

fn validate_primitive(raw: Option<&Value>, field_type: FieldType) -> Option<Field> {
    if field_type.kind == FieldKind::Any {
        return Some(Field::Any(raw.cloned().unwrap_or(Value::Null)));
    }

    let raw = match raw {
        None | Some(Value::Null) => {
            return if field_type.optional { Some(Field::Null) } else { None };
        }
        Some(value) => value,
    };

    match (field_type.kind, raw) {
        (FieldKind::String, Value::String(s)) => Some(Field::String(s.clone())),
        (FieldKind::Boolean, Value::Bool(b)) => Some(Field::Boolean(*b)),
        (FieldKind::Number, Value::Number(n)) => {
            n.as_f64().filter(|f| !f.is_nan()).map(Field::Number)
        }
        (FieldKind::BigInteger, _) => parse_big_integer(Some(raw)).map(Field::BigInteger),
        _ => None,
    }
}

/// Parses an arbitrary-precision integer from a JSON string or a whole-valued
/// number.
///
/// Numbers are read from their literal text, so `1e3`, `1000.0` and integers
/// beyond 64 bits all parse exactly. Fails closed: absent, `null`,
/// fractional, and non-numeric input all yield `None`, never a default value.
pub fn parse_big_integer(value: Option<&Value>) -> Option<BigInt> {
    match value? {
        Value::String(s) => {
            let digits = s.strip_prefix('-').unwrap_or(s);
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            BigInt::from_str(s).ok()
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(BigInt::from(i))
            } else if let Some(u) = n.as_u64() {
                Some(BigInt::from(u))
            } else {
                integral_number_literal(&n.to_string())
            }
        }
        _ => None,
    }
}

/// Exact value of a JSON number literal (`-2.50E2`, `1e+3`, `7.000`) when it
/// has no fractional part.
fn integral_number_literal(literal: &str) -> Option<BigInt> {
    let (mantissa, exponent) = match literal.find(['e', 'E']) {
        Some(i) => (&literal[..i], literal[i + 1..].parse::<i64>().ok()?),
        None => (literal, 0),
    };
    let (negative, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, mantissa),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let mut digits = format!("{}{}", int_part, frac_part);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    // Power of ten applied to the concatenated digits
    let scale = exponent.checked_sub(i64::try_from(frac_part.len()).ok()?)?;
    if scale < 0 {
        let dropped = usize::try_from(scale.unsigned_abs()).ok()?.min(digits.len());
        let keep = digits.len() - dropped;
        if !digits[keep..].bytes().all(|b| b == b'0') {
            return None;
        }
        digits.truncate(keep);
        if digits.is_empty() {
            digits.push('0');
        }
    } else {
        let zeros = usize::try_from(scale).ok()?;
        if digits.len().saturating_add(zeros) > MAX_BIG_INTEGER_DIGITS {
            return None;
        }
        digits.extend(std::iter::repeat('0').take(zeros));
    }

    let value = BigInt::from_str(&digits).ok()?;
    Some(if negative { -value } else { value })
}

/// Custom validator adapter for [`parse_big_integer`].
pub fn big_integer_field(value: Option<&Value>) -> Option<Field> {
    parse_big_integer(value).map(Field::BigInteger)
}
