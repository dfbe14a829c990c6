//! API error responses.
//!
//! Every failure is rendered as `{"success": false, "error": ..., "details": ...}`.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::attestation::AttestationError;
use crate::store::StoreError;

/// An error returned from a handler.
#[derive(Debug)]
pub enum ApiError {
    BadRequest { error: String, details: Vec<String> },
    NotFound(String),
    Unavailable(String),
    Internal {
        error: String,
        details: String,
        transaction_id: Option<String>,
    },
}

impl ApiError {
    pub fn bad_request(error: impl Into<String>) -> Self {
        ApiError::BadRequest {
            error: error.into(),
            details: Vec::new(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AttestationError> for ApiError {
    fn from(e: AttestationError) -> Self {
        match e {
            AttestationError::Validation(details) => ApiError::BadRequest {
                error: "Validation failed".to_string(),
                details,
            },
            AttestationError::SignatureInvalid => ApiError::bad_request("Invalid signature"),
            AttestationError::KeyFormat(detail) => ApiError::BadRequest {
                error: "Invalid public key format".to_string(),
                details: vec![detail],
            },
            AttestationError::NotFound(_) => ApiError::NotFound("Record not found".to_string()),
            AttestationError::Persistence {
                transaction_id,
                message,
            } => ApiError::Internal {
                error: "Failed to persist harvest record".to_string(),
                details: message,
                transaction_id,
            },
            AttestationError::Crypto(e) => ApiError::Internal {
                error: "Failed to generate keys".to_string(),
                details: e.to_string(),
                transaction_id: None,
            },
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Internal {
            error: "Failed to fetch harvest records".to_string(),
            details: e.to_string(),
            transaction_id: None,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::BadRequest {
            error: "Invalid request body".to_string(),
            details: vec![e.body_text()],
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        ApiError::BadRequest {
            error: "Invalid query parameters".to_string(),
            details: vec![e.body_text()],
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::BadRequest { error, details } => {
                json!({ "success": false, "error": error, "details": details })
            }
            ApiError::NotFound(error) | ApiError::Unavailable(error) => {
                json!({ "success": false, "error": error })
            }
            ApiError::Internal {
                error,
                details,
                transaction_id,
            } => {
                tracing::error!(error = %error, details = %details, "Request failed");
                let mut body = json!({ "success": false, "error": error, "details": details });
                if let Some(tx) = transaction_id {
                    body["transactionHash"] = json!(tx);
                }
                body
            }
        };
        (status, Json(body)).into_response()
    }
}
