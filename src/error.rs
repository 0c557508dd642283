use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use uuid::Uuid;

use crate::backend::ClientError;
use crate::session::clear_token_cookie;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorObject,
}

#[derive(Debug, Serialize)]
pub struct ErrorObject {
    pub code: String,
    pub message: String,
    /// "inline" for user-correctable problems shown next to the form,
    /// "banner" for everything the user cannot fix by editing input.
    pub display: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reauthenticate: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<Uuid>,
}

#[derive(Debug)]
pub enum ApiError {
    Validation(&'static str, String),
    Auth(&'static str, String),
    Forbidden(&'static str, String),
    NotFound(&'static str, String),
    Conflict(&'static str, String),
    Transport(Uuid, String),
    Internal(String),
}

impl ApiError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ApiError::Validation("VALIDATION_ERROR", message.into())
    }

    pub fn session_expired() -> Self {
        ApiError::Auth("SESSION_EXPIRED", "Session expired, please sign in again".into())
    }

    pub fn not_signed_in() -> Self {
        ApiError::Auth("NOT_SIGNED_IN", "Please sign in to continue".into())
    }

    pub fn in_flight() -> Self {
        ApiError::Conflict(
            "REQUEST_IN_FLIGHT",
            "This action is already being processed".into(),
        )
    }

    pub fn code(&self) -> &str {
        match self {
            ApiError::Validation(code, _)
            | ApiError::Auth(code, _)
            | ApiError::Forbidden(code, _)
            | ApiError::NotFound(code, _)
            | ApiError::Conflict(code, _) => code,
            ApiError::Transport(..) => "BACKEND_UNAVAILABLE",
            ApiError::Internal(_) => "INTERNAL",
        }
    }

    fn body(&self, message: &str) -> Json<ErrorResponse> {
        let display = match self {
            ApiError::Validation(..) => "inline",
            _ => "banner",
        };
        let reauthenticate = matches!(self, ApiError::Auth(..)).then_some(true);
        let reference = match self {
            ApiError::Transport(reference, _) => Some(*reference),
            _ => None,
        };

        Json(ErrorResponse {
            error: ErrorObject {
                code: self.code().to_string(),
                message: message.to_string(),
                display,
                reauthenticate,
                reference,
            },
        })
    }
}

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Rejected { message, .. } => ApiError::Validation("REJECTED", message),
            ClientError::Unauthorized { .. } => ApiError::session_expired(),
            ClientError::Forbidden { message } => ApiError::Forbidden("FORBIDDEN", message),
            ClientError::NotFound { path } => {
                ApiError::NotFound("NOT_FOUND", format!("{path} not found"))
            }
            ClientError::Decode(e) => ApiError::Internal(format!("unexpected backend payload: {e}")),
            other => {
                let reference = Uuid::new_v4();
                tracing::error!(%reference, error = %other, "backend call failed");
                ApiError::Transport(
                    reference,
                    "The service is temporarily unavailable, please try again".into(),
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Validation(_, msg) => {
                (StatusCode::BAD_REQUEST, self.body(msg)).into_response()
            }
            ApiError::Auth(_, msg) => (
                StatusCode::UNAUTHORIZED,
                [(header::SET_COOKIE, clear_token_cookie())],
                self.body(msg),
            )
                .into_response(),
            ApiError::Forbidden(_, msg) => (StatusCode::FORBIDDEN, self.body(msg)).into_response(),
            ApiError::NotFound(_, msg) => (StatusCode::NOT_FOUND, self.body(msg)).into_response(),
            ApiError::Conflict(_, msg) => (StatusCode::CONFLICT, self.body(msg)).into_response(),
            ApiError::Transport(_, msg) => (StatusCode::BAD_GATEWAY, self.body(msg)).into_response(),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    self.body("Something went wrong"),
                )
                    .into_response()
            }
        }
    }
}
