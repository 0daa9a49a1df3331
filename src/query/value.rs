//! Bind values and their coercion against field metadata.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::QueryError;
use crate::catalog::{FieldModel, SqlType};

/// Compares a DATE/TIME/TIMESTAMP column with the database's current date.
pub const TODAY: &str = "*TODAY";
/// Compares a DATE/TIME/TIMESTAMP column with the database's current time.
pub const NOW: &str = "*NOW";

/// A value bound to a `?` placeholder.
///
/// Untagged: strings always land in `Text` and are parsed per column by [`coerce`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BindValue {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    Decimal(Decimal),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
}

impl BindValue {
    pub fn is_null(&self) -> bool {
        matches!(self, BindValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            BindValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// `*TODAY` / `*NOW` placeholders for the current date or time.
    pub fn is_now_token(&self) -> bool {
        matches!(self.as_text(), Some(TODAY) | Some(NOW))
    }
}

impl fmt::Display for BindValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindValue::Null => f.write_str("NULL"),
            BindValue::Bool(b) => write!(f, "{}", b),
            BindValue::Int(i) => write!(f, "{}", i),
            BindValue::Decimal(d) => write!(f, "{}", d),
            BindValue::Text(s) => write!(f, "'{}'", s),
            BindValue::Date(d) => write!(f, "{}", d),
            BindValue::Time(t) => write!(f, "{}", t),
            BindValue::Timestamp(ts) => write!(f, "{}", ts),
        }
    }
}

impl From<&str> for BindValue {
    fn from(value: &str) -> Self {
        BindValue::Text(value.to_string())
    }
}

impl From<String> for BindValue {
    fn from(value: String) -> Self {
        BindValue::Text(value)
    }
}

impl From<i64> for BindValue {
    fn from(value: i64) -> Self {
        BindValue::Int(value)
    }
}

impl From<i32> for BindValue {
    fn from(value: i32) -> Self {
        BindValue::Int(i64::from(value))
    }
}

impl From<Decimal> for BindValue {
    fn from(value: Decimal) -> Self {
        BindValue::Decimal(value)
    }
}

impl From<bool> for BindValue {
    fn from(value: bool) -> Self {
        BindValue::Bool(value)
    }
}

impl From<NaiveDate> for BindValue {
    fn from(value: NaiveDate) -> Self {
        BindValue::Date(value)
    }
}

impl From<NaiveTime> for BindValue {
    fn from(value: NaiveTime) -> Self {
        BindValue::Time(value)
    }
}

impl From<NaiveDateTime> for BindValue {
    fn from(value: NaiveDateTime) -> Self {
        BindValue::Timestamp(value)
    }
}

impl<T: Into<BindValue>> From<Option<T>> for BindValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(BindValue::Null)
    }
}

/// Field values identifying one row; null values leave their field unconstrained.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Key {
    values: Vec<(String, BindValue)>,
}

impl Key {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<BindValue>) -> Self {
        self.values.push((field.into(), value.into()));
        self
    }

    pub fn values(&self) -> &[(String, BindValue)] {
        &self.values
    }

    pub fn get(&self, field: &str) -> Option<&BindValue> {
        self.values
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Convert a caller-supplied value to what the column expects.
///
/// Defined-value codes are replaced by their stored value; text is parsed for
/// numeric, boolean and temporal columns; a date bound to a TIMESTAMP column
/// becomes midnight. The `*TODAY`/`*NOW` tokens pass through untouched.
pub fn coerce(field: &FieldModel, value: BindValue) -> Result<BindValue, QueryError> {
    if value.is_now_token() && field.sql_type.is_temporal() {
        return Ok(value);
    }
    match value {
        BindValue::Text(text) => {
            let raw = match field.defined_value(&text) {
                Some(defined) => defined.value.clone(),
                None => text,
            };
            parse_text(field, raw)
        }
        BindValue::Date(date) if field.sql_type == SqlType::Timestamp => {
            Ok(BindValue::Timestamp(date.and_time(NaiveTime::MIN)))
        }
        other => Ok(other),
    }
}

fn parse_text(field: &FieldModel, text: String) -> Result<BindValue, QueryError> {
    let invalid = |reason: &str, text: &str| QueryError::InvalidValue {
        column: field.name.clone(),
        value: text.to_string(),
        reason: reason.to_string(),
    };
    let trimmed = text.trim();
    match field.sql_type {
        SqlType::Integer => trimmed
            .parse::<i64>()
            .map(BindValue::Int)
            .map_err(|e| invalid(&e.to_string(), &text)),
        SqlType::Decimal => Decimal::from_str(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .map(BindValue::Decimal)
            .map_err(|e| invalid(&e.to_string(), &text)),
        SqlType::Boolean => match trimmed.to_lowercase().as_str() {
            "true" | "1" => Ok(BindValue::Bool(true)),
            "false" | "0" => Ok(BindValue::Bool(false)),
            _ => Err(invalid("expected true/false", &text)),
        },
        SqlType::Date => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .map(BindValue::Date)
            .map_err(|e| invalid(&e.to_string(), &text)),
        SqlType::Time => NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
            .map(BindValue::Time)
            .map_err(|e| invalid(&e.to_string(), &text)),
        SqlType::Timestamp => NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S")
            .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S"))
            .map(BindValue::Timestamp)
            .map_err(|e| invalid(&e.to_string(), &text)),
        _ => Ok(BindValue::Text(text)),
    }
}
