use anyhow::anyhow;
use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use serde::de::DeserializeOwned;
use validator::Validate;

use autoloan_core::{AppError, FieldOrder, validate_in_order};

/// Maps a JSON body rejection to a single client-facing message.
pub fn json_rejection_message(rejection: &JsonRejection) -> String {
    if matches!(rejection, JsonRejection::MissingJsonContentType(_)) {
        return "Missing 'Content-Type: application/json' header".to_string();
    }

    let body = rejection.body_text();

    if let Some(field) = body
        .split("missing field `")
        .nth(1)
        .and_then(|s| s.split('`').next())
    {
        return format!("{} is required", field);
    }

    if body.contains("invalid type") || body.contains("invalid value") {
        return "Invalid field type in request".to_string();
    }

    "Invalid request body".to_string()
}

/// JSON body that has passed validation. Rejects with the first violated
/// field's message, in the payload's declared field order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + FieldOrder,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(mut value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::bad_request(anyhow!(json_rejection_message(&rejection))))?;

        value.trim_fields();
        validate_in_order(&value)?;

        Ok(ValidatedJson(value))
    }
}
