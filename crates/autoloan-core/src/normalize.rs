//! Error normalization.
//!
//! Turns validator output and PostgreSQL constraint failures into the stable,
//! user-facing messages the API promises. Only the first failing field is ever
//! reported, and "first" follows the declared field order of the payload type
//! rather than hash-map iteration order.

use anyhow::anyhow;
use sqlx::error::ErrorKind;
use validator::{Validate, ValidationErrors};

use crate::errors::AppError;

/// Declared field order of a validated payload.
///
/// Names are the Rust field names, since that is what `validator` reports.
pub trait FieldOrder {
    const FIELD_ORDER: &'static [&'static str];

    /// Strips surrounding whitespace from free-text fields. Runs before validation.
    fn trim_fields(&mut self) {}
}

/// Trims an optional text field in place.
pub fn trim_field(value: &mut Option<String>) {
    if let Some(text) = value {
        let trimmed = text.trim();
        if trimmed.len() != text.len() {
            *text = trimmed.to_string();
        }
    }
}

/// Tables whose unique constraints follow the `{table}_{field}_key` naming scheme.
const KNOWN_TABLES: &[&str] = &["loan_applications", "loans", "users"];

/// Returns the message of the first failing field, walking `order` first and
/// falling back to alphabetical order for fields missing from it.
pub fn first_validation_message(errors: &ValidationErrors, order: &[&str]) -> Option<String> {
    let field_errors = errors.field_errors();

    let mut fields: Vec<_> = field_errors.iter().collect();
    fields.sort_by_key(|(field, _)| {
        let name: &str = field;
        (
            order.iter().position(|o| *o == name).unwrap_or(usize::MAX),
            name.to_string(),
        )
    });

    fields.into_iter().find_map(|(field, errs)| {
        let name: &str = field;
        errs.first().map(|error| {
            error
                .message
                .as_ref()
                .map(|msg| msg.to_string())
                .unwrap_or_else(|| format!("{} is invalid", name))
        })
    })
}

/// Validates `value` and reports the first violation as a 400.
pub fn validate_in_order<T>(value: &T) -> Result<(), AppError>
where
    T: Validate + FieldOrder,
{
    value.validate().map_err(|errors| {
        let message = first_validation_message(&errors, T::FIELD_ORDER)
            .unwrap_or_else(|| "Invalid request body".to_string());
        AppError::bad_request(anyhow!(message))
    })
}

/// Extracts the column name from a `{table}_{field}_key` constraint name.
pub fn unique_field_from_constraint(constraint: &str) -> String {
    let without_suffix = constraint.strip_suffix("_key").unwrap_or(constraint);

    KNOWN_TABLES
        .iter()
        .find_map(|table| {
            without_suffix
                .strip_prefix(table)
                .and_then(|rest| rest.strip_prefix('_'))
        })
        .or_else(|| without_suffix.rsplit('_').next())
        .unwrap_or(without_suffix)
        .to_string()
}

pub fn duplicate_key_message(field: &str) -> String {
    match field {
        "email" => "Email is already registered".to_string(),
        "username" | "user_name" | "userName" => "Username is already taken".to_string(),
        "mobile" => "Mobile number is already registered".to_string(),
        other => format!("{} already exists", other),
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::not_found(anyhow!("Record not found")),
            sqlx::Error::Database(db_err) => match db_err.kind() {
                ErrorKind::UniqueViolation => {
                    let field = db_err
                        .constraint()
                        .map(unique_field_from_constraint)
                        .unwrap_or_else(|| "record".to_string());
                    AppError::conflict(anyhow!(duplicate_key_message(&field)))
                }
                ErrorKind::CheckViolation => AppError::bad_request(anyhow!(
                    "Value violates constraint {}",
                    db_err.constraint().unwrap_or("check")
                )),
                ErrorKind::ForeignKeyViolation => {
                    AppError::bad_request(anyhow!("Referenced record does not exist"))
                }
                _ => AppError::internal(err),
            },
            _ => AppError::internal(err),
        }
    }
}
