//! Request validation from rule tables.

use crate::config::{RuleSet, ValidationRule};
use crate::error::AppError;
use regex::Regex;
use serde_json::{Map, Value};

pub struct RequestValidator;

impl RequestValidator {
    /// Validate body against per-field rules. All required fields must be present.
    pub fn validate(body: &Map<String, Value>, rules: &RuleSet) -> Result<(), AppError> {
        for (field, rule) in sorted(rules) {
            let val = body.get(field);
            if rule.required == Some(true) && (val.is_none() || val == Some(&Value::Null)) {
                return Err(AppError::Validation(format!("{} is required", field)));
            }
            if let Some(v) = val {
                validate_field(field, v, rule)?;
            }
        }
        Ok(())
    }

    /// Validate only the fields present in body (for PATCH). Required is not enforced for
    /// missing fields, but a required or non-null field may not be set to null.
    pub fn validate_partial(body: &Map<String, Value>, rules: &RuleSet) -> Result<(), AppError> {
        for (field, rule) in sorted(rules) {
            let Some(v) = body.get(field) else { continue };
            if v.is_null() && (rule.required == Some(true) || rule.nullable == Some(false)) {
                return Err(AppError::Validation(format!("{} may not be null", field)));
            }
            validate_field(field, v, rule)?;
        }
        Ok(())
    }
}

/// Rules in field-name order so the first reported error is stable.
fn sorted(rules: &RuleSet) -> Vec<(&String, &ValidationRule)> {
    let mut v: Vec<_> = rules.iter().collect();
    v.sort_by(|a, b| a.0.cmp(b.0));
    v
}

/// Numeric view of a value; decimal strings such as `"19.99"` count as numbers.
fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn validate_field(field: &str, v: &Value, rule: &ValidationRule) -> Result<(), AppError> {
    if v.is_null() {
        return Ok(());
    }
    if let Some(format) = &rule.format {
        validate_format(field, v, format)?;
    }
    if let Some(s) = v.as_str() {
        let len = s.chars().count();
        if let Some(max) = rule.max_length {
            if len > max as usize {
                return Err(AppError::Validation(format!(
                    "{} must be at most {} characters",
                    field, max
                )));
            }
        }
        if let Some(min) = rule.min_length {
            if len < min as usize {
                return Err(AppError::Validation(format!(
                    "{} must be at least {} characters",
                    field, min
                )));
            }
        }
        if let Some(ref pattern) = rule.pattern {
            let re = Regex::new(pattern).map_err(|_| AppError::Validation(format!("invalid pattern for {}", field)))?;
            if !re.is_match(s) {
                return Err(AppError::Validation(format!("{} does not match required pattern", field)));
            }
        }
    }
    if let Some(ref allowed) = rule.allowed {
        if !allowed.iter().any(|a| value_eq(v, a)) {
            return Err(AppError::Validation(format!(
                "{} must be one of: {}",
                field,
                allowed
                    .iter()
                    .map(|a| a.as_str().map(str::to_string).unwrap_or_else(|| a.to_string()))
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }
    }
    if rule.minimum.is_some() || rule.maximum.is_some() {
        let n = as_number(v).ok_or_else(|| AppError::Validation(format!("{} must be a number", field)))?;
        if let Some(min) = rule.minimum {
            if n < min {
                return Err(AppError::Validation(format!("{} must be at least {}", field, min)));
            }
        }
        if let Some(max) = rule.maximum {
            if n > max {
                return Err(AppError::Validation(format!("{} must be at most {}", field, max)));
            }
        }
    }
    Ok(())
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(s), Value::String(t)) => s == t,
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

fn validate_format(field: &str, v: &Value, format: &str) -> Result<(), AppError> {
    match format.to_lowercase().as_str() {
        "email" => {
            let Some(s) = v.as_str() else {
                return Err(AppError::Validation(format!("{} must be a valid email", field)));
            };
            let mut parts = s.splitn(2, '@');
            let local = parts.next().unwrap_or("");
            let domain = parts.next().unwrap_or("");
            if local.is_empty() || !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') || s.contains(char::is_whitespace) {
                return Err(AppError::Validation(format!("{} must be a valid email", field)));
            }
        }
        "uuid" => {
            let valid = v.as_str().map(|s| uuid::Uuid::parse_str(s).is_ok()).unwrap_or(false);
            if !valid {
                return Err(AppError::Validation(format!("{} must be a valid UUID", field)));
            }
        }
        _ => {}
    }
    Ok(())
}
