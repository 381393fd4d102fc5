//! Declarative request validation.
//!
//! Each resource declares a `&[FieldRule]` table. Create payloads go through
//! [`parse`], partial updates through [`patch`] and list query strings
//! through [`filters`]. Validation is all-or-nothing: every field is checked,
//! every failure is reported, and nothing reaches the store on error.

mod payload;

pub use payload::{parse_id, OptionalPayload, Payload};

use chrono::{DateTime, NaiveDate};
use serde::de::DeserializeOwned;
use serde_json::{Number, Value};
use std::collections::HashMap;
use uuid::Uuid;

use crate::database::Row;
use crate::error::{ApiError, FieldErrors};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    /// Trimmed string with a maximum length in characters
    Text { max: usize },
    Email,
    Enum(&'static [&'static str]),
    Uuid,
    /// Calendar date, `YYYY-MM-DD`
    Date,
    /// RFC 3339 timestamp (a bare date is accepted as midnight UTC)
    DateTime,
    Number {
        min: Option<f64>,
        min_exclusive: bool,
        max: Option<f64>,
    },
    Integer { min: i64, max: i64 },
    Bool,
    /// JSON array or object stored verbatim
    Json,
    UuidList,
    /// `#rgb` or `#rrggbb`
    Color,
    Slug,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldRule {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldRule {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }

    pub const fn required(self) -> Self {
        Self { required: true, ..self }
    }

    pub const fn text(name: &'static str, max: usize) -> Self {
        Self::new(name, FieldKind::Text { max })
    }

    pub const fn email(name: &'static str) -> Self {
        Self::new(name, FieldKind::Email)
    }

    pub const fn one_of(name: &'static str, values: &'static [&'static str]) -> Self {
        Self::new(name, FieldKind::Enum(values))
    }

    pub const fn uuid(name: &'static str) -> Self {
        Self::new(name, FieldKind::Uuid)
    }

    pub const fn date(name: &'static str) -> Self {
        Self::new(name, FieldKind::Date)
    }

    pub const fn datetime(name: &'static str) -> Self {
        Self::new(name, FieldKind::DateTime)
    }

    /// Non-negative number with an optional upper bound
    pub const fn amount(name: &'static str, max: Option<f64>) -> Self {
        Self::new(
            name,
            FieldKind::Number {
                min: Some(0.0),
                min_exclusive: false,
                max,
            },
        )
    }

    /// Strictly positive number, `0 < value <= max`
    pub const fn positive(name: &'static str, max: f64) -> Self {
        Self::new(
            name,
            FieldKind::Number {
                min: Some(0.0),
                min_exclusive: true,
                max: Some(max),
            },
        )
    }

    pub const fn integer(name: &'static str, min: i64, max: i64) -> Self {
        Self::new(name, FieldKind::Integer { min, max })
    }

    pub const fn boolean(name: &'static str) -> Self {
        Self::new(name, FieldKind::Bool)
    }

    pub const fn json(name: &'static str) -> Self {
        Self::new(name, FieldKind::Json)
    }

    pub const fn uuid_list(name: &'static str) -> Self {
        Self::new(name, FieldKind::UuidList)
    }

    pub const fn color(name: &'static str) -> Self {
        Self::new(name, FieldKind::Color)
    }

    pub const fn slug(name: &'static str) -> Self {
        Self::new(name, FieldKind::Slug)
    }

    /// Human label for messages: `estimated_hours` -> `Estimated hours`,
    /// `project_id` -> `Project`
    pub fn label(&self) -> String {
        let base = self.name.strip_suffix("_id").unwrap_or(self.name);
        let spaced = base.replace('_', " ");
        let mut chars = spaced.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => String::new(),
        }
    }

    /// Check one present value. `Ok(Value::Null)` means "clear this column".
    pub fn check(&self, value: &Value) -> Result<Value, String> {
        let label = self.label();
        let required_msg = || format!("{} is required", label);

        if value.is_null() {
            return if self.required { Err(required_msg()) } else { Ok(Value::Null) };
        }
        if let Value::String(s) = value {
            if s.trim().is_empty() && !matches!(self.kind, FieldKind::Json) {
                return if self.required { Err(required_msg()) } else { Ok(Value::Null) };
            }
        }

        match self.kind {
            FieldKind::Text { max } => {
                let s = value.as_str().ok_or_else(|| format!("{} must be text", label))?.trim();
                if s.chars().count() > max {
                    return Err(format!("{} must be at most {} characters", label, max));
                }
                Ok(Value::String(s.to_string()))
            }
            FieldKind::Email => {
                let s = value
                    .as_str()
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| is_email(s))
                    .ok_or_else(|| format!("{} must be a valid email address", label))?;
                Ok(Value::String(s))
            }
            FieldKind::Enum(values) => match value.as_str() {
                Some(s) if values.contains(&s) => Ok(Value::String(s.to_string())),
                _ => Err(format!("{} must be one of: {}", label, values.join(", "))),
            },
            FieldKind::Uuid => value
                .as_str()
                .and_then(|s| Uuid::parse_str(s.trim()).ok())
                .map(|id| Value::String(id.to_string()))
                .ok_or_else(|| format!("{} must be a valid UUID", label)),
            FieldKind::Date => value
                .as_str()
                .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
                .map(|d| Value::String(d.to_string()))
                .ok_or_else(|| format!("{} must be a date (YYYY-MM-DD)", label)),
            FieldKind::DateTime => {
                let s = value.as_str().map(str::trim).unwrap_or_default();
                if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
                    Ok(Value::String(ts.to_rfc3339()))
                } else if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                    Ok(Value::String(format!("{}T00:00:00+00:00", d)))
                } else {
                    Err(format!("{} must be a date or timestamp", label))
                }
            }
            FieldKind::Number { min, min_exclusive, max } => {
                let n = as_number(value).ok_or_else(|| format!("{} must be a number", label))?;
                if let Some(min) = min {
                    if min_exclusive && n <= min {
                        return Err(format!("{} must be greater than {}", label, min));
                    }
                    if !min_exclusive && n < min {
                        return Err(format!("{} must be at least {}", label, min));
                    }
                }
                if let Some(max) = max {
                    if n > max {
                        return Err(format!("{} cannot exceed {}", label, max));
                    }
                }
                Number::from_f64(n)
                    .map(Value::Number)
                    .ok_or_else(|| format!("{} must be a number", label))
            }
            FieldKind::Integer { min, max } => {
                let n = as_number(value)
                    .filter(|n| n.fract() == 0.0)
                    .ok_or_else(|| format!("{} must be a whole number", label))? as i64;
                if n < min {
                    return Err(format!("{} must be at least {}", label, min));
                }
                if n > max {
                    return Err(format!("{} cannot exceed {}", label, max));
                }
                Ok(Value::from(n))
            }
            FieldKind::Bool => match value {
                Value::Bool(b) => Ok(Value::Bool(*b)),
                Value::String(s) if s == "true" || s == "false" => Ok(Value::Bool(s == "true")),
                _ => Err(format!("{} must be true or false", label)),
            },
            FieldKind::Json => match value {
                Value::Array(_) | Value::Object(_) => Ok(value.clone()),
                _ => Err(format!("{} must be a list or an object", label)),
            },
            FieldKind::UuidList => {
                let items = value.as_array().ok_or_else(|| format!("{} must be a list of UUIDs", label))?;
                let mut ids = Vec::with_capacity(items.len());
                for item in items {
                    let id = item
                        .as_str()
                        .and_then(|s| Uuid::parse_str(s.trim()).ok())
                        .ok_or_else(|| format!("{} must be a list of UUIDs", label))?;
                    let id = Value::String(id.to_string());
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
                Ok(Value::Array(ids))
            }
            FieldKind::Color => match value.as_str().map(str::trim) {
                Some(s) if is_hex_color(s) => Ok(Value::String(s.to_lowercase())),
                _ => Err(format!("{} must be a hex color like #3b82f6", label)),
            },
            FieldKind::Slug => match value.as_str().map(str::trim) {
                Some(s) if is_slug(s) => Ok(Value::String(s.to_string())),
                _ => Err(format!(
                    "{} may only contain lowercase letters, digits and hyphens",
                    label
                )),
            },
        }
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

pub fn is_email(s: &str) -> bool {
    if s.len() > 254 || s.chars().any(char::is_whitespace) {
        return false;
    }
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

fn is_hex_color(s: &str) -> bool {
    match s.strip_prefix('#') {
        Some(hex) => (hex.len() == 3 || hex.len() == 6) && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

pub fn is_slug(s: &str) -> bool {
    (2..=50).contains(&s.len())
        && !s.starts_with('-')
        && !s.ends_with('-')
        && !s.contains("--")
        && s.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Lowercase-kebab slug derived from a display name
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let trimmed = slug.trim_end_matches('-');
    trimmed.chars().take(50).collect::<String>().trim_end_matches('-').to_string()
}

fn failure(errors: FieldErrors) -> ApiError {
    let summary = errors.values().cloned().collect::<Vec<_>>().join("; ");
    ApiError::validation_error(format!("Validation failed: {}", summary), Some(errors))
}

fn as_object(body: &Value) -> Result<&Row, ApiError> {
    body.as_object()
        .ok_or_else(|| ApiError::invalid_json("Request body must be a JSON object"))
}

/// Validate a create payload. Unknown keys are dropped; missing required
/// fields are reported alongside every other failure.
pub fn validate(body: &Value, rules: &[FieldRule]) -> Result<Row, ApiError> {
    let object = as_object(body)?;
    let mut clean = Row::new();
    let mut errors = FieldErrors::new();

    for rule in rules {
        match object.get(rule.name) {
            Some(value) => match rule.check(value) {
                Ok(Value::Null) => {}
                Ok(v) => {
                    clean.insert(rule.name.to_string(), v);
                }
                Err(msg) => {
                    errors.insert(rule.name.to_string(), msg);
                }
            },
            None if rule.required => {
                errors.insert(rule.name.to_string(), format!("{} is required", rule.label()));
            }
            None => {}
        }
    }

    if errors.is_empty() {
        Ok(clean)
    } else {
        Err(failure(errors))
    }
}

/// Validate a create payload into its typed form
pub fn parse<T: DeserializeOwned>(body: &Value, rules: &[FieldRule]) -> Result<T, ApiError> {
    let clean = validate(body, rules)?;
    serde_json::from_value(Value::Object(clean)).map_err(|e| {
        tracing::warn!("Validated payload did not match its type: {}", e);
        ApiError::validation_error("Validation failed", None)
    })
}

/// Validate a partial update. Present keys are checked against their rule,
/// `null` clears optional columns, and required columns cannot be cleared.
pub fn patch(body: &Value, rules: &[FieldRule]) -> Result<Row, ApiError> {
    let object = as_object(body)?;
    let mut clean = Row::new();
    let mut errors = FieldErrors::new();

    for rule in rules {
        if let Some(value) = object.get(rule.name) {
            match rule.check(value) {
                Ok(v) => {
                    clean.insert(rule.name.to_string(), v);
                }
                Err(msg) => {
                    errors.insert(rule.name.to_string(), msg);
                }
            }
        }
    }

    if !errors.is_empty() {
        return Err(failure(errors));
    }
    if clean.is_empty() {
        return Err(ApiError::bad_request("No updatable fields provided"));
    }
    Ok(clean)
}

/// Parse list filters from query parameters. Empty parameters are ignored.
pub fn filters(
    params: &HashMap<String, String>,
    rules: &[FieldRule],
) -> Result<Vec<(&'static str, Value)>, ApiError> {
    let mut out = Vec::new();
    let mut errors = FieldErrors::new();

    for rule in rules {
        let Some(raw) = params.get(rule.name).map(|s| s.trim()).filter(|s| !s.is_empty()) else {
            continue;
        };
        match rule.check(&Value::String(raw.to_string())) {
            Ok(Value::Null) => {}
            Ok(v) => out.push((rule.name, v)),
            Err(msg) => {
                errors.insert(rule.name.to_string(), msg);
            }
        }
    }

    if errors.is_empty() {
        Ok(out)
    } else {
        Err(failure(errors))
    }
}

/// Deserialize an optional patch field from a sanitized row
pub fn field<T: DeserializeOwned>(row: &Row, name: &str) -> Option<T> {
    row.get(name).and_then(|v| serde_json::from_value(v.clone()).ok())
}
