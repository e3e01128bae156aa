//! Application error type.
//!
//! Every service returns `Result<T, AppError>`. An `AppError` pairs an HTTP
//! status with an [`anyhow::Error`]; the status is chosen by the constructor:
//!
//! | Constructor | Status |
//! |-------------|--------|
//! | [`AppError::bad_request`] | 400 (validation) |
//! | [`AppError::unauthorized`] | 401 (authentication) |
//! | [`AppError::forbidden`] | 403 (permission) |
//! | [`AppError::not_found`] | 404 |
//! | [`AppError::conflict`] | 409 |
//! | [`AppError::unprocessable`] | 422 (field validation) |
//! | [`AppError::too_many_requests`] | 429 |
//! | [`AppError::internal`] | 500 |
//! | [`AppError::service_unavailable`] | 503 |
//!
//! Responses are JSON: `{"error": "<message>"}`. Field validation failures
//! additionally carry a `details` map of field name to messages. The message
//! of a 500 is logged and replaced with a generic text.

use anyhow::Error;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value, json};
use validator::ValidationErrors;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub error: Error,
}

impl AppError {
    pub fn new<E>(status: StatusCode, err: E) -> Self
    where
        E: Into<Error>,
    {
        Self {
            status,
            error: err.into(),
        }
    }

    pub fn internal<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err)
    }

    pub fn not_found<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::NOT_FOUND, err)
    }

    pub fn unprocessable<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, err)
    }

    pub fn bad_request<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::BAD_REQUEST, err)
    }

    pub fn conflict<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::CONFLICT, err)
    }

    pub fn too_many_requests<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::TOO_MANY_REQUESTS, err)
    }

    pub fn service_unavailable<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, err)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, anyhow::anyhow!(message.into()))
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, anyhow::anyhow!(message.into()))
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::internal(anyhow::anyhow!(message.into()))
    }

    /// The message a client sees for this error.
    pub fn message(&self) -> String {
        if self.status == StatusCode::INTERNAL_SERVER_ERROR {
            "Internal server error".to_string()
        } else {
            self.error.to_string()
        }
    }
}

fn validation_details(errors: &ValidationErrors) -> Value {
    let mut details = Map::new();
    for (field, field_errors) in errors.field_errors() {
        let messages: Vec<Value> = field_errors
            .iter()
            .map(|e| match &e.message {
                Some(msg) => Value::String(msg.to_string()),
                None => Value::String(format!("{} is invalid ({})", field, e.code)),
            })
            .collect();
        details.insert(field.to_string(), Value::Array(messages));
    }
    Value::Object(details)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.error, "Request failed");
        }

        let body = match self.error.downcast_ref::<ValidationErrors>() {
            Some(errors) => json!({
                "error": "Validation failed",
                "details": validation_details(errors),
            }),
            None => json!({ "error": self.message() }),
        };

        (self.status, Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<Error>,
{
    fn from(err: E) -> Self {
        let error = err.into();
        if error.is::<ValidationErrors>() {
            return AppError::unprocessable(error);
        }
        AppError::internal(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 3, message = "name is too short"))]
        name: String,
    }

    #[test]
    fn validation_errors_become_unprocessable() {
        let sample = Sample {
            name: "ab".to_string(),
        };
        let err: AppError = sample.validate().unwrap_err().into();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn other_errors_become_internal() {
        let err: AppError = std::io::Error::other("disk gone").into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "Internal server error");
    }

    #[test]
    fn client_errors_keep_their_message() {
        let err = AppError::forbidden("You don't have access to this course");
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert_eq!(err.message(), "You don't have access to this course");

        let err = AppError::conflict(anyhow::anyhow!("Course code already exists"));
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[test]
    fn validation_details_list_each_field() {
        let sample = Sample {
            name: String::new(),
        };
        let errors = sample.validate().unwrap_err();
        let details = validation_details(&errors);
        assert_eq!(details["name"][0], "name is too short");
    }
}
