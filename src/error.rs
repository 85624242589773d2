use std::io::Cursor;

use rocket::http::{ContentType, Status};
use rocket::request::Request;
use rocket::response::{self, Responder, Response};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// One field-level problem, as surfaced in 400 bodies.
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: String,
    pub error: String,
}

impl FieldError {
    pub fn new(field: &str, error: &str) -> Self {
        Self {
            field: field.to_string(),
            error: error.to_string(),
        }
    }
}

/// API-level failures with an explicit status-code mapping.
///
/// Uniqueness conflicts deliberately map to 400 with a field-level error,
/// matching the wire behavior of the original serializer validation.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("validation failed")]
    Validation(Vec<FieldError>),

    #[error("conflict on field `{}`", .0.field)]
    Conflict(FieldError),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn invalid(field: &str, error: &str) -> Self {
        ApiError::Validation(vec![FieldError::new(field, error)])
    }

    pub fn status(&self) -> Status {
        match self {
            ApiError::NotFound(_) => Status::NotFound,
            ApiError::Validation(_) | ApiError::Conflict(_) => Status::BadRequest,
            ApiError::Unauthorized(_) => Status::Unauthorized,
            ApiError::Internal(_) => Status::InternalServerError,
        }
    }

    fn body(&self) -> serde_json::Value {
        match self {
            ApiError::NotFound(what) => json!({ "error": format!("{what} not found") }),
            ApiError::Validation(errors) => json!({ "errors": errors }),
            ApiError::Conflict(error) => json!({ "errors": [error] }),
            ApiError::Unauthorized(reason) => json!({ "error": reason }),
            // Keep the original API's opaque message; the real cause stays in the log.
            ApiError::Internal(_) => json!({ "error": "something went wrong" }),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(field) => ApiError::Conflict(FieldError::new(
                field,
                "a record with this value already exists",
            )),
            StoreError::Backend(e) => ApiError::Internal(e),
        }
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, _req: &'r Request<'_>) -> response::Result<'static> {
        if let ApiError::Internal(ref e) = self {
            tracing::error!(error = %e, "request failed");
        }
        let body = self.body().to_string();
        Response::build()
            .status(self.status())
            .header(ContentType::JSON)
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_map_as_documented() {
        assert_eq!(ApiError::NotFound("Book").status(), Status::NotFound);
        assert_eq!(ApiError::invalid("rating", "out of range").status(), Status::BadRequest);
        assert_eq!(
            ApiError::Conflict(FieldError::new("isbn_number", "dup")).status(),
            Status::BadRequest
        );
        assert_eq!(ApiError::Unauthorized("no token".into()).status(), Status::Unauthorized);
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status(),
            Status::InternalServerError
        );
    }

    #[test]
    fn duplicate_store_error_becomes_field_conflict() {
        let api: ApiError = StoreError::Duplicate("isbn_number").into();
        match api {
            ApiError::Conflict(f) => assert_eq!(f.field, "isbn_number"),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn internal_body_stays_opaque() {
        let body = ApiError::Internal(anyhow::anyhow!("db exploded")).body();
        assert_eq!(body["error"], "something went wrong");
    }
}
