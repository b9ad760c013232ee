//! Validation Layer
//!
//! TigerStyle: Validate everything before any I/O or delay happens.
//!
//! Request bodies are loose JSON objects; the desktop front end sends numbers
//! both as JSON numbers and as numeric strings, so the typed accessors accept
//! either. A field is *missing* when it is absent, `null`, `""` or `[]`.

use crate::error::{ApiError, ApiResult};
use serde_json::{Map, Value};
use std::ops::RangeInclusive;

/// Error text for non-binary strings
pub const BIT_STRING_ERROR: &str = "必须为01比特串";

/// A validated view over one request body
#[derive(Debug, Clone, Default)]
pub struct Params {
    body: Map<String, Value>,
}

impl Params {
    /// Wrap a JSON body. Anything but an object (or `null`) is rejected.
    pub fn from_value(value: Value) -> ApiResult<Self> {
        match value {
            Value::Object(body) => Ok(Self { body }),
            Value::Null => Ok(Self::default()),
            other => Err(ApiError::invalid(
                "body",
                format!("请求体必须为JSON对象, got {}", json_kind(&other)),
            )),
        }
    }

    /// Check that every listed field is present and non-empty.
    ///
    /// Reports all missing fields at once, in the listed order.
    pub fn require(&self, fields: &[&str]) -> ApiResult<()> {
        let missing: Vec<String> = fields
            .iter()
            .filter(|f| self.get(f).is_none())
            .map(|f| f.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ApiError::MissingParams(missing))
        }
    }

    /// Raw value of a present, non-empty field
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.body.get(name).filter(|v| !is_blank(v))
    }

    /// Field as text; numbers and booleans are rendered.
    pub fn text(&self, name: &str) -> ApiResult<String> {
        match self.get(name) {
            None => Err(ApiError::MissingParams(vec![name.to_string()])),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            Some(Value::Bool(b)) => Ok(b.to_string()),
            Some(other) => Err(ApiError::invalid(
                name,
                format!("expected text, got {}", json_kind(other)),
            )),
        }
    }

    /// Field as text, with arrays and objects rendered as compact JSON
    pub fn rendered(&self, name: &str) -> ApiResult<String> {
        match self.get(name) {
            Some(value @ (Value::Array(_) | Value::Object(_))) => Ok(value.to_string()),
            _ => self.text(name),
        }
    }

    /// Optional text field with a default
    pub fn text_or(&self, name: &str, default: &str) -> ApiResult<String> {
        match self.get(name) {
            None => Ok(default.to_string()),
            Some(_) => self.text(name),
        }
    }

    /// Optional text field
    pub fn text_opt(&self, name: &str) -> ApiResult<Option<String>> {
        match self.get(name) {
            None => Ok(None),
            Some(_) => self.text(name).map(Some),
        }
    }

    /// Bit string of exactly `len` bits
    pub fn bits(&self, name: &str, len: usize) -> ApiResult<String> {
        let value = self.text(name)?;
        check_bits(name, &value, Some(len))?;
        Ok(value)
    }

    /// Integer field
    pub fn int(&self, name: &str) -> ApiResult<i64> {
        let value = self
            .get(name)
            .ok_or_else(|| ApiError::MissingParams(vec![name.to_string()]))?;
        parse_int(name, value)
    }

    /// Integer field within inclusive bounds
    pub fn int_in(&self, name: &str, range: RangeInclusive<i64>) -> ApiResult<i64> {
        let value = self.int(name)?;
        check_range(name, value, &range)?;
        Ok(value)
    }

    /// Optional integer within bounds; the default is not range-checked
    pub fn int_in_or(&self, name: &str, range: RangeInclusive<i64>, default: i64) -> ApiResult<i64> {
        match self.get(name) {
            None => Ok(default),
            Some(_) => self.int_in(name, range),
        }
    }

    /// Optional integer, no bounds
    pub fn int_opt(&self, name: &str) -> ApiResult<Option<i64>> {
        match self.get(name) {
            None => Ok(None),
            Some(value) => parse_int(name, value).map(Some),
        }
    }

    /// Floating-point field
    pub fn float(&self, name: &str) -> ApiResult<f64> {
        let value = self
            .get(name)
            .ok_or_else(|| ApiError::MissingParams(vec![name.to_string()]))?;
        parse_float(name, value)
    }

    /// Float field within inclusive bounds
    pub fn float_in(&self, name: &str, range: RangeInclusive<f64>) -> ApiResult<f64> {
        let value = self.float(name)?;
        check_range(name, value, &range)?;
        Ok(value)
    }

    /// Optional float within bounds
    pub fn float_in_or(&self, name: &str, range: RangeInclusive<f64>, default: f64) -> ApiResult<f64> {
        match self.get(name) {
            None => Ok(default),
            Some(_) => self.float_in(name, range),
        }
    }

    /// Non-empty array of strings
    pub fn string_list(&self, name: &str) -> ApiResult<Vec<String>> {
        match self.get(name) {
            None => Err(ApiError::MissingParams(vec![name.to_string()])),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(ApiError::invalid(
                        format!("{name}[{i}]"),
                        format!("expected string, got {}", json_kind(other)),
                    )),
                })
                .collect(),
            Some(other) => Err(ApiError::invalid(
                name,
                format!("expected array, got {}", json_kind(other)),
            )),
        }
    }
}

/// Check a bit string against `^[01]+$` and an optional exact length
pub fn check_bits(field: &str, value: &str, len: Option<usize>) -> ApiResult<()> {
    if value.is_empty() || !value.bytes().all(|b| b == b'0' || b == b'1') {
        return Err(ApiError::invalid(field, BIT_STRING_ERROR));
    }
    if let Some(len) = len {
        if value.len() != len {
            return Err(ApiError::invalid(field, format!("长度必须为{len}比特")));
        }
    }
    Ok(())
}

fn check_range<T>(field: &str, value: T, range: &RangeInclusive<T>) -> ApiResult<()>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ApiError::range(field, *range.start(), *range.end(), value))
    }
}

fn parse_int(name: &str, value: &Value) -> ApiResult<i64> {
    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ApiError::invalid(name, format!("必须为整数, got {value}")))
}

fn parse_float(name: &str, value: &Value) -> ApiResult<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|f| f.is_finite())
        .ok_or_else(|| ApiError::invalid(name, format!("必须为数值, got {value}")))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// Tests
// =============================================================================
