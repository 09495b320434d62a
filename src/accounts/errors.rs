use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use super::{dto::MsgResponse, repo_types::ValidationError};

const SERVER_ERROR: &str = "Server error";

#[derive(Debug, Error)]
pub enum SignupError {
    #[error("Please enter all fields.")]
    MissingFields,
    #[error("Password must be at least 8 characters long.")]
    PasswordTooShort,
    #[error("Please enter a valid email address.")]
    InvalidEmail,
    #[error("A user with this email already exists.")]
    EmailTaken,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("internal error")]
    Internal,
}

impl IntoResponse for SignupError {
    fn into_response(self) -> Response {
        match self {
            SignupError::Internal => {
                (StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR).into_response()
            }
            other => (
                StatusCode::BAD_REQUEST,
                Json(MsgResponse::new(other.to_string())),
            )
                .into_response(),
        }
    }
}

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("Verification token missing.")]
    MissingToken,
    #[error("Invalid or expired verification token.")]
    InvalidToken,
    #[error("internal error")]
    Internal,
}

impl IntoResponse for VerifyError {
    fn into_response(self) -> Response {
        match self {
            VerifyError::Internal => {
                (StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR).into_response()
            }
            other => (StatusCode::BAD_REQUEST, other.to_string()).into_response(),
        }
    }
}
