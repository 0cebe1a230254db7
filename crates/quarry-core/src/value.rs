use serde::{Deserialize, Serialize};
use std::fmt;

///
/// Value
/// can be bound as a WHERE parameter
///
/// `Null` → the field's value is SQL NULL.
/// `List` → the right-hand side of `IN`/`between`-style operators; never a
/// stored scalar itself.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn as_list(&self) -> Option<&Vec<Self>> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Scalar rendered as the raw text used for wildcard composition
    /// (`contains`, `starts_with`, `ends_with`).
    #[must_use]
    pub fn as_like_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Uint(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
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
        }
    }
}

impl From<&serde_json::Value> for Value {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null | serde_json::Value::Object(_) => Self::Null,
            serde_json::Value::Bool(v) => Self::Bool(*v),
            serde_json::Value::Number(n) => {
                if let Some(v) = n.as_i64() {
                    Self::Int(v)
                } else if let Some(v) = n.as_u64() {
                    Self::Uint(v)
                } else {
                    n.as_f64().map_or(Self::Null, Self::Float)
                }
            }
            serde_json::Value::String(s) => Self::Text(s.clone()),
            serde_json::Value::Array(items) => Self::List(items.iter().map(Self::from).collect()),
        }
    }
}

///
/// FieldValue
///
/// Conversion into the bind-parameter domain. Lets builder methods accept
/// plain Rust scalars without the caller spelling out `Value` variants.
///

pub trait FieldValue {
    fn to_value(self) -> Value;
}

impl FieldValue for Value {
    fn to_value(self) -> Value {
        self
    }
}

impl FieldValue for () {
    fn to_value(self) -> Value {
        Value::Null
    }
}

impl FieldValue for bool {
    fn to_value(self) -> Value {
        Value::Bool(self)
    }
}

impl FieldValue for &str {
    fn to_value(self) -> Value {
        Value::Text(self.to_string())
    }
}

impl FieldValue for String {
    fn to_value(self) -> Value {
        Value::Text(self)
    }
}

impl FieldValue for f64 {
    fn to_value(self) -> Value {
        Value::Float(self)
    }
}

impl FieldValue for f32 {
    fn to_value(self) -> Value {
        Value::Float(f64::from(self))
    }
}

macro_rules! impl_field_value_int {
    ($($ty:ty),*) => {$(
        impl FieldValue for $ty {
            fn to_value(self) -> Value {
                Value::Int(i64::from(self))
            }
        }
    )*};
}

macro_rules! impl_field_value_uint {
    ($($ty:ty),*) => {$(
        impl FieldValue for $ty {
            fn to_value(self) -> Value {
                Value::Uint(u64::from(self))
            }
        }
    )*};
}

impl_field_value_int!(i8, i16, i32, i64);
impl_field_value_uint!(u8, u16, u32, u64);

impl<T: FieldValue> FieldValue for Option<T> {
    fn to_value(self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }
}

impl<T: FieldValue> FieldValue for Vec<T> {
    fn to_value(self) -> Value {
        Value::List(self.into_iter().map(FieldValue::to_value).collect())
    }
}

///
/// TESTS
///
