//! Loan applications and their status lifecycle.
//!
//! ```text
//! Pending(0) ──► Approved(1)
//!     │             ▲   │
//!     ▼             │   ▼
//!          Rejected(2)
//! ```
//!
//! An application starts Pending. An admin may approve or reject it and may
//! later flip the decision, but nothing ever returns to Pending.

use std::borrow::Cow;
use std::fmt;
use std::sync::LazyLock;

use anyhow::anyhow;
use autoloan_core::{AppError, FieldOrder, trim_field, validate_in_order};
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

static FILE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\w,/.\s-]+\.[A-Za-z]{2,4}$").expect("valid file name regex")
});

pub const ADDRESS_MIN_CHARS: usize = 10;
pub const ADDRESS_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub enum LoanStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Loan status must be 0, 1 or 2, got {0}")]
pub struct InvalidStatus(pub i16);

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Cannot change loan status from {from} to {to}")]
pub struct InvalidTransition {
    pub from: LoanStatus,
    pub to: LoanStatus,
}

impl From<InvalidTransition> for AppError {
    fn from(err: InvalidTransition) -> Self {
        AppError::bad_request(anyhow!(err.to_string()))
    }
}

impl From<InvalidStatus> for AppError {
    fn from(err: InvalidStatus) -> Self {
        AppError::bad_request(anyhow!(err.to_string()))
    }
}

impl LoanStatus {
    pub fn code(self) -> i16 {
        match self {
            LoanStatus::Pending => 0,
            LoanStatus::Approved => 1,
            LoanStatus::Rejected => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LoanStatus::Pending => "pending",
            LoanStatus::Approved => "approved",
            LoanStatus::Rejected => "rejected",
        }
    }

    pub fn can_transition_to(self, next: LoanStatus) -> bool {
        matches!(
            (self, next),
            (LoanStatus::Pending, LoanStatus::Approved)
                | (LoanStatus::Pending, LoanStatus::Rejected)
                | (LoanStatus::Approved, LoanStatus::Rejected)
                | (LoanStatus::Rejected, LoanStatus::Approved)
        )
    }

    pub fn transition(self, next: LoanStatus) -> Result<LoanStatus, InvalidTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoanStatus::Pending => f.write_str("Pending"),
            LoanStatus::Approved => f.write_str("Approved"),
            LoanStatus::Rejected => f.write_str("Rejected"),
        }
    }
}

impl TryFrom<i16> for LoanStatus {
    type Error = InvalidStatus;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(LoanStatus::Pending),
            1 => Ok(LoanStatus::Approved),
            2 => Ok(LoanStatus::Rejected),
            other => Err(InvalidStatus(other)),
        }
    }
}

impl From<LoanStatus> for i16 {
    fn from(status: LoanStatus) -> Self {
        status.code()
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoanApplication {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub loan_type: String,
    pub submission_date: DateTime<Utc>,
    pub income: f64,
    pub model: NaiveDate,
    pub purchase_price: f64,
    #[sqlx(try_from = "i16")]
    #[schema(value_type = i16, example = 0)]
    pub loan_status: LoanStatus,
    pub address: String,
    pub file: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn validate_address(address: &str) -> Result<(), ValidationError> {
    let chars = address.chars().count();
    if chars < ADDRESS_MIN_CHARS {
        return Err(ValidationError::new("address")
            .with_message(Cow::Borrowed("Address must be at least 10 characters long")));
    }
    if chars > ADDRESS_MAX_CHARS {
        return Err(ValidationError::new("address")
            .with_message(Cow::Borrowed("Address must be at most 200 characters long")));
    }
    Ok(())
}

/// Applicant-supplied fields of an application, before validation.
///
/// Built from multipart text fields on submission, or from a stored
/// application merged with a patch on resubmission.
#[derive(Debug, Clone, Default, Validate)]
pub struct LoanApplicationForm {
    #[validate(
        required(message = "Loan type is required"),
        length(min = 1, message = "Loan type is required")
    )]
    pub loan_type: Option<String>,

    #[validate(
        required(message = "Income is required"),
        range(min = 1000.0, message = "Income must be at least 1000")
    )]
    pub income: Option<f64>,

    #[validate(required(message = "Model date is required"))]
    pub model: Option<NaiveDate>,

    #[validate(
        required(message = "Purchase price is required"),
        range(min = 1000.0, message = "Purchase price must be at least 1000")
    )]
    pub purchase_price: Option<f64>,

    #[validate(
        required(message = "Address is required"),
        custom(function = "validate_address")
    )]
    pub address: Option<String>,

    #[validate(
        required(message = "File path or name is required"),
        regex(path = *FILE_PATTERN, message = "Invalid file format")
    )]
    pub file: Option<String>,
}

impl FieldOrder for LoanApplicationForm {
    const FIELD_ORDER: &'static [&'static str] = &[
        "loan_type",
        "income",
        "model",
        "purchase_price",
        "address",
        "file",
    ];

    fn trim_fields(&mut self) {
        trim_field(&mut self.loan_type);
        trim_field(&mut self.address);
    }
}

/// Validated application fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationFields {
    pub loan_type: String,
    pub income: f64,
    pub model: NaiveDate,
    pub purchase_price: f64,
    pub address: String,
    pub file: String,
}

impl LoanApplicationForm {
    pub fn from_existing(application: &LoanApplication) -> Self {
        Self {
            loan_type: Some(application.loan_type.clone()),
            income: Some(application.income),
            model: Some(application.model),
            purchase_price: Some(application.purchase_price),
            address: Some(application.address.clone()),
            file: Some(application.file.clone()),
        }
    }

    /// Overlays the fields present in `patch`.
    pub fn apply(mut self, patch: LoanApplicationPatch) -> Self {
        if let Some(loan_type) = patch.loan_type {
            self.loan_type = Some(loan_type);
        }
        if let Some(income) = patch.income {
            self.income = Some(income);
        }
        if let Some(model) = patch.model {
            self.model = Some(model);
        }
        if let Some(purchase_price) = patch.purchase_price {
            self.purchase_price = Some(purchase_price);
        }
        if let Some(address) = patch.address {
            self.address = Some(address);
        }
        self
    }

    /// Trims, validates and reports the first violation in field order.
    pub fn into_fields(mut self) -> Result<ApplicationFields, AppError> {
        self.trim_fields();
        validate_in_order(&self)?;

        let (
            Some(loan_type),
            Some(income),
            Some(model),
            Some(purchase_price),
            Some(address),
            Some(file),
        ) = (
            self.loan_type,
            self.income,
            self.model,
            self.purchase_price,
            self.address,
            self.file,
        )
        else {
            return Err(AppError::bad_request(anyhow!("Loan application is incomplete")));
        };

        Ok(ApplicationFields {
            loan_type,
            income,
            model,
            purchase_price,
            address,
            file,
        })
    }
}

/// Changes to an existing application.
///
/// Applicants may touch the descriptive fields; only admins may send `loanStatus`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoanApplicationPatch {
    pub loan_type: Option<String>,
    pub income: Option<f64>,
    pub model: Option<NaiveDate>,
    pub purchase_price: Option<f64>,
    pub address: Option<String>,
    #[schema(minimum = 0, maximum = 2)]
    pub loan_status: Option<i16>,
}

impl LoanApplicationPatch {
    pub fn has_field_changes(&self) -> bool {
        self.loan_type.is_some()
            || self.income.is_some()
            || self.model.is_some()
            || self.purchase_price.is_some()
            || self.address.is_some()
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateDto {
    #[validate(
        required(message = "Loan status is required"),
        range(min = 0, max = 2, message = "Loan status must be 0, 1 or 2")
    )]
    #[schema(minimum = 0, maximum = 2)]
    pub loan_status: Option<i16>,
}

impl FieldOrder for StatusUpdateDto {
    const FIELD_ORDER: &'static [&'static str] = &["loan_status"];
}

/// Compare-and-set status change: applied only if the stored status is still `from`.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct TransitionDto {
    #[validate(
        required(message = "Current status is required"),
        range(min = 0, max = 2, message = "Loan status must be 0, 1 or 2")
    )]
    pub from: Option<i16>,

    #[validate(
        required(message = "Target status is required"),
        range(min = 0, max = 2, message = "Loan status must be 0, 1 or 2")
    )]
    pub to: Option<i16>,
}

impl FieldOrder for TransitionDto {
    const FIELD_ORDER: &'static [&'static str] = &["from", "to"];
}

/// Parses a monetary form field, e.g. `income`.
pub fn parse_amount(label: &str, raw: &str) -> Result<f64, AppError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| AppError::bad_request(anyhow!("{} must be a number", label)))
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp.
pub fn parse_model_date(raw: &str) -> Result<NaiveDate, AppError> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.date_naive())
        })
        .ok_or_else(|| AppError::bad_request(anyhow!("Model date must be a valid date")))
}
