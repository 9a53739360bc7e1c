//! Typed item values.
//!
//! Every item holds an [`ItemValue`] and declares a [`DataType`]. A non-null
//! value written to an item must be assignable to the declared type; the
//! check lives in [`DataType::accepts`].

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// The declared type of an item.
///
/// Definitions name the type in lowercase (`data_type = "integer"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Text.
    #[default]
    String,
    /// Whole numbers.
    Integer,
    /// Floating point numbers. Integer values are widened on read.
    Float,
    /// True/false.
    Boolean,
    /// Calendar date without time.
    Date,
    /// Date and time without zone.
    DateTime,
    /// Accepts any value.
    Any,
}

impl DataType {
    /// Returns `true` if `value` may be stored in an item of this type.
    ///
    /// `Null` is assignable to every type.
    pub fn accepts(&self, value: &ItemValue) -> bool {
        match (self, value) {
            (_, ItemValue::Null) | (DataType::Any, _) => true,
            (DataType::Float, ItemValue::Integer(_)) => true,
            (declared, value) => Some(*declared) == value.data_type(),
        }
    }

    /// Parses definition text (such as a default value) into a value of this type.
    ///
    /// An empty string parses to `Null`.
    pub fn parse(&self, text: &str) -> Result<ItemValue, String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(ItemValue::Null);
        }
        match self {
            DataType::String | DataType::Any => Ok(ItemValue::String(text.to_string())),
            DataType::Integer => trimmed
                .parse::<i64>()
                .map(ItemValue::Integer)
                .map_err(|e| e.to_string()),
            DataType::Float => trimmed
                .parse::<f64>()
                .map(ItemValue::Float)
                .map_err(|e| e.to_string()),
            DataType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "yes" | "y" | "1" => Ok(ItemValue::Bool(true)),
                "false" | "no" | "n" | "0" => Ok(ItemValue::Bool(false)),
                other => Err(format!("'{other}' is not a boolean")),
            },
            DataType::Date => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .map(ItemValue::Date)
                .map_err(|e| e.to_string()),
            DataType::DateTime => NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S")
                .map(ItemValue::DateTime)
                .map_err(|e| e.to_string()),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::String => "string",
            DataType::Integer => "integer",
            DataType::Float => "float",
            DataType::Boolean => "boolean",
            DataType::Date => "date",
            DataType::DateTime => "datetime",
            DataType::Any => "any",
        };
        f.write_str(name)
    }
}

/// A nullable item value.
///
/// # Example
///
/// ```
/// use horizon_forms::data::{DataType, ItemValue};
///
/// let value = ItemValue::from("Smith");
/// assert_eq!(value.as_string(), Some("Smith"));
/// assert!(DataType::String.accepts(&value));
/// assert!(!DataType::Integer.accepts(&value));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ItemValue {
    /// No value.
    #[default]
    Null,
    /// Text.
    String(String),
    /// Whole number.
    Integer(i64),
    /// Floating point number.
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// Calendar date.
    Date(NaiveDate),
    /// Date and time.
    DateTime(NaiveDateTime),
}

impl ItemValue {
    /// Returns `true` if this is `ItemValue::Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, ItemValue::Null)
    }

    /// Returns the runtime type of this value, or `None` for `Null`.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            ItemValue::Null => None,
            ItemValue::String(_) => Some(DataType::String),
            ItemValue::Integer(_) => Some(DataType::Integer),
            ItemValue::Float(_) => Some(DataType::Float),
            ItemValue::Bool(_) => Some(DataType::Boolean),
            ItemValue::Date(_) => Some(DataType::Date),
            ItemValue::DateTime(_) => Some(DataType::DateTime),
        }
    }

    /// Name of the runtime type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ItemValue::Null => "null",
            ItemValue::String(_) => "string",
            ItemValue::Integer(_) => "integer",
            ItemValue::Float(_) => "float",
            ItemValue::Bool(_) => "boolean",
            ItemValue::Date(_) => "date",
            ItemValue::DateTime(_) => "datetime",
        }
    }

    /// Attempts to get the value as a string slice.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            ItemValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Attempts to get the value as an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ItemValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempts to get the value as a float, widening integers.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ItemValue::Float(n) => Some(*n),
            ItemValue::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Attempts to get the value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ItemValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Attempts to get the value as a date.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            ItemValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Attempts to get the value as a date and time.
    pub fn as_date_time(&self) -> Option<NaiveDateTime> {
        match self {
            ItemValue::DateTime(d) => Some(*d),
            _ => None,
        }
    }
}

impl fmt::Display for ItemValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemValue::Null => Ok(()),
            ItemValue::String(s) => f.write_str(s),
            ItemValue::Integer(n) => write!(f, "{n}"),
            ItemValue::Float(n) => write!(f, "{n}"),
            ItemValue::Bool(b) => write!(f, "{b}"),
            ItemValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            ItemValue::DateTime(d) => write!(f, "{}", d.format("%Y-%m-%dT%H:%M:%S")),
        }
    }
}

impl From<String> for ItemValue {
    fn from(s: String) -> Self {
        ItemValue::String(s)
    }
}

impl From<&str> for ItemValue {
    fn from(s: &str) -> Self {
        ItemValue::String(s.to_string())
    }
}

impl From<i64> for ItemValue {
    fn from(n: i64) -> Self {
        ItemValue::Integer(n)
    }
}

impl From<i32> for ItemValue {
    fn from(n: i32) -> Self {
        ItemValue::Integer(n as i64)
    }
}

impl From<f64> for ItemValue {
    fn from(n: f64) -> Self {
        ItemValue::Float(n)
    }
}

impl From<bool> for ItemValue {
    fn from(b: bool) -> Self {
        ItemValue::Bool(b)
    }
}

impl From<NaiveDate> for ItemValue {
    fn from(d: NaiveDate) -> Self {
        ItemValue::Date(d)
    }
}

impl From<NaiveDateTime> for ItemValue {
    fn from(d: NaiveDateTime) -> Self {
        ItemValue::DateTime(d)
    }
}

impl<T: Into<ItemValue>> From<Option<T>> for ItemValue {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => ItemValue::Null,
        }
    }
}
