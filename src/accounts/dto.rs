use serde::{Deserialize, Serialize};

/// Sign-up body. Fields are optional so a missing one gets our own 400 message.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub token: Option<String>,
}

/// `{ "msg": ... }` body used by the sign-up endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct MsgResponse {
    pub msg: String,
}

impl MsgResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

/// Status reported to the thank-you page after a verification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyStatus {
    Success,
    AlreadyVerified,
}

impl VerifyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            VerifyStatus::Success => "success",
            VerifyStatus::AlreadyVerified => "already_verified",
        }
    }
}
