//! # Request Extraction & Validation
//!
//! Handlers take `Result<Json<T>, JsonRejection>` so that malformed bodies
//! come back as structured [`AppError`] responses instead of Axum's plain-text
//! rejections. Request DTOs implement [`Validate`] for the checks serde cannot
//! express.

use axum::extract::rejection::JsonRejection;
use axum::Json;

use evote_core::ValidationError;

use crate::error::AppError;

/// Business-rule validation for request DTOs.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// Unwrap a JSON body, mapping deserialization failures to [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Unwrap a JSON body and run its [`Validate`] impl.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// Adapter so `Validate` impls can use the core text validators with `?`.
pub(crate) fn check(result: Result<(), ValidationError>) -> Result<(), String> {
    result.map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Named {
        name: String,
    }

    impl Validate for Named {
        fn validate(&self) -> Result<(), String> {
            check(evote_core::validate_text("name", &self.name, 8))
        }
    }

    #[test]
    fn valid_body_passes() {
        let body = Ok(Json(Named { name: "ok".into() }));
        assert_eq!(extract_validated_json(body).unwrap().name, "ok");
    }

    #[test]
    fn failed_validation_is_422_validation() {
        let body = Ok(Json(Named { name: "   ".into() }));
        let err = extract_validated_json(body).unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m.contains("name")));
    }
}
