//! Loan products offered by the lender.

use std::borrow::Cow;

use autoloan_core::{FieldOrder, trim_field};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    pub id: Uuid,
    pub loan_type: String,
    pub description: String,
    pub interest_rate: f64,
    pub maximum_amount: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn validate_interest_rate(rate: f64) -> Result<(), ValidationError> {
    if rate < 0.0 {
        return Err(ValidationError::new("interest_rate")
            .with_message(Cow::Borrowed("Interest rate must be a positive number")));
    }
    if rate > 100.0 {
        return Err(ValidationError::new("interest_rate")
            .with_message(Cow::Borrowed("Interest rate cannot exceed 100%")));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLoanDto {
    #[validate(
        required(message = "Loan type is required"),
        length(min = 1, message = "Loan type is required")
    )]
    pub loan_type: Option<String>,

    #[validate(
        required(message = "Description is required"),
        length(min = 1, message = "Description is required")
    )]
    pub description: Option<String>,

    #[validate(
        required(message = "Interest rate is required"),
        custom(function = "validate_interest_rate")
    )]
    pub interest_rate: Option<f64>,

    #[validate(
        required(message = "Maximum amount is required"),
        range(min = 1000.0, message = "Maximum amount should be at least 1000")
    )]
    pub maximum_amount: Option<f64>,
}

impl FieldOrder for CreateLoanDto {
    const FIELD_ORDER: &'static [&'static str] =
        &["loan_type", "description", "interest_rate", "maximum_amount"];

    fn trim_fields(&mut self) {
        trim_field(&mut self.loan_type);
        trim_field(&mut self.description);
    }
}

/// Partial update. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLoanDto {
    #[validate(length(min = 1, message = "Loan type is required"))]
    pub loan_type: Option<String>,

    #[validate(length(min = 1, message = "Description is required"))]
    pub description: Option<String>,

    #[validate(custom(function = "validate_interest_rate"))]
    pub interest_rate: Option<f64>,

    #[validate(range(min = 1000.0, message = "Maximum amount should be at least 1000"))]
    pub maximum_amount: Option<f64>,
}

impl FieldOrder for UpdateLoanDto {
    const FIELD_ORDER: &'static [&'static str] = CreateLoanDto::FIELD_ORDER;

    fn trim_fields(&mut self) {
        trim_field(&mut self.loan_type);
        trim_field(&mut self.description);
    }
}
