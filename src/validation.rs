//! Request validation
//!
//! Each request type lists its fields with the rules that apply to them;
//! [`check`] evaluates the list and collects every failure, so a client sees
//! all problems in one response.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::error::AppError;

lazy_static! {
    static ref EMAIL_PATTERN: Regex =
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles");
    static ref PHONE_PATTERN: Regex =
        Regex::new(r"^\+[1-9]?[0-9]{6,11}$").expect("phone pattern compiles");
}

/// One failed field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// A constraint on a single field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Present and not blank; lists must be non-empty
    Required,
    /// Character count within `min..=max`
    Length { min: usize, max: usize },
    /// Character count of at least `min`
    MinLength(usize),
    /// Exactly one of the listed values
    OneOf(&'static [&'static str]),
    /// Looks like an email address
    Email,
    /// `+` followed by 7 to 12 digits
    Phone,
    /// Absolute URL
    Url,
    /// Every list element is non-blank
    EachNonBlank,
}

/// Value under validation
#[derive(Debug, Clone, Copy)]
pub enum FieldValue<'a> {
    Text(Option<&'a str>),
    List(&'a [String]),
}

impl<'a> From<&'a str> for FieldValue<'a> {
    fn from(value: &'a str) -> Self {
        FieldValue::Text(Some(value))
    }
}

impl<'a> From<&'a String> for FieldValue<'a> {
    fn from(value: &'a String) -> Self {
        FieldValue::Text(Some(value.as_str()))
    }
}

impl<'a> From<&'a Option<String>> for FieldValue<'a> {
    fn from(value: &'a Option<String>) -> Self {
        FieldValue::Text(value.as_deref())
    }
}

impl<'a> From<&'a Vec<String>> for FieldValue<'a> {
    fn from(value: &'a Vec<String>) -> Self {
        FieldValue::List(value.as_slice())
    }
}

/// A field with its rules
#[derive(Debug, Clone)]
pub struct FieldRules<'a> {
    pub field: &'static str,
    pub value: FieldValue<'a>,
    pub rules: Vec<Rule>,
}

impl<'a> FieldRules<'a> {
    pub fn new(field: &'static str, value: impl Into<FieldValue<'a>>, rules: &[Rule]) -> Self {
        Self {
            field,
            value: value.into(),
            rules: rules.to_vec(),
        }
    }
}

/// Implemented by every request body
pub trait Validate {
    fn field_rules(&self) -> Vec<FieldRules<'_>>;

    fn validate(&self) -> Result<(), AppError> {
        check(&self.field_rules())
    }
}

/// Evaluate all rules; stop at the first failure per field
pub fn check(fields: &[FieldRules<'_>]) -> Result<(), AppError> {
    let errors: Vec<FieldError> = fields
        .iter()
        .filter_map(|field| {
            field
                .rules
                .iter()
                .find_map(|rule| evaluate(*rule, field.value))
                .map(|message| FieldError {
                    field: field.field.to_string(),
                    message,
                })
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

/// `Some(message)` when `value` breaks `rule`
fn evaluate(rule: Rule, value: FieldValue<'_>) -> Option<String> {
    match (rule, value) {
        (Rule::Required, FieldValue::Text(text)) => text
            .filter(|text| !text.trim().is_empty())
            .is_none()
            .then(|| "is required".to_string()),
        (Rule::Required, FieldValue::List(items)) => {
            items.is_empty().then(|| "is required".to_string())
        }
        // Absent optional values pass every other rule
        (_, FieldValue::Text(None)) => None,
        (Rule::Length { min, max }, FieldValue::Text(Some(text))) => {
            let len = text.chars().count();
            (len < min || len > max).then(|| format!("must be between {min} and {max} characters"))
        }
        (Rule::MinLength(min), FieldValue::Text(Some(text))) => (text.chars().count() < min)
            .then(|| format!("must be at least {min} characters")),
        (Rule::OneOf(allowed), FieldValue::Text(Some(text))) => (!allowed.contains(&text))
            .then(|| format!("must be one of: {}", allowed.join(", "))),
        (Rule::Email, FieldValue::Text(Some(text))) => (!EMAIL_PATTERN.is_match(text))
            .then(|| "must be a valid email address".to_string()),
        (Rule::Phone, FieldValue::Text(Some(text))) => (!PHONE_PATTERN.is_match(text))
            .then(|| "must be a phone number starting with +".to_string()),
        (Rule::Url, FieldValue::Text(Some(text))) => url::Url::parse(text)
            .is_err()
            .then(|| "must be a valid URL".to_string()),
        (Rule::EachNonBlank, FieldValue::List(items)) => items
            .iter()
            .any(|item| item.trim().is_empty())
            .then(|| "must not contain empty values".to_string()),
        // Text rules on lists and list rules on text do not apply
        _ => None,
    }
}
