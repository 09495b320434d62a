use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    accounts::{
        dto::{MsgResponse, SignupRequest, VerifyQuery, VerifyStatus},
        errors::{SignupError, VerifyError},
        repo::{StoreError, UserStore},
        repo_types::{User, UserError, MIN_PASSWORD_LEN},
        services::{generate_verification_token, is_valid_email, normalize_email},
    },
    config::AppConfig,
    mail::{self, verification_email, OutgoingMail},
    state::AppState,
};

const SIGNUP_OK: &str = "Registration successful! Please check your email to verify your account.";

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/verify-email", get(verify_email))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MsgResponse>), SignupError> {
    // Unreadable bodies count as missing fields.
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => {
            warn!(reason = %rejection.body_text(), "unreadable signup body");
            return Err(SignupError::MissingFields);
        }
    };
    let present = |v: Option<String>| v.filter(|s| !s.is_empty());
    let (Some(full_name), Some(email), Some(password)) = (
        present(payload.full_name),
        present(payload.email),
        present(payload.password),
    ) else {
        warn!("signup with missing fields");
        return Err(SignupError::MissingFields);
    };

    if password.chars().count() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(SignupError::PasswordTooShort);
    }

    let email = normalize_email(&email);
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(SignupError::InvalidEmail);
    }

    // Fast path only; the unique constraint on insert is what actually decides.
    match state.users.find_by_email(&email).await {
        Ok(Some(_)) => {
            warn!(email = %email, "email already registered");
            return Err(SignupError::EmailTaken);
        }
        Ok(None) => {}
        Err(e) => {
            error!(error = %e, "find_by_email failed");
            return Err(SignupError::Internal);
        }
    }

    let token = generate_verification_token();
    let user = User::new(&full_name, &email, &password, token.clone()).map_err(|e| match e {
        UserError::Validation(v) => {
            warn!(reason = %v, "user rejected by validation");
            SignupError::Validation(v)
        }
        UserError::Hash(e) => {
            error!(error = %e, "password hashing failed");
            SignupError::Internal
        }
    })?;

    match state.users.insert(&user).await {
        Ok(()) => {}
        Err(StoreError::Conflict(field)) => {
            warn!(email = %user.email, ?field, "duplicate key on insert");
            return Err(SignupError::EmailTaken);
        }
        Err(StoreError::Database(e)) => {
            error!(error = %e, "insert user failed");
            return Err(SignupError::Internal);
        }
    }

    let link = state.config.verification_link(&token);
    let (subject, html) = verification_email(&user.full_name, &link);
    mail::dispatch(
        state.mailer.clone(),
        OutgoingMail {
            from: state.config.mail.username.clone(),
            to: user.email.clone(),
            subject,
            html,
        },
    );

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(MsgResponse::new(SIGNUP_OK))))
}

#[instrument(skip(state, query))]
pub async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> Result<Response, VerifyError> {
    let Some(token) = query.token.filter(|t| !t.is_empty()) else {
        warn!("verification without token");
        return Err(VerifyError::MissingToken);
    };

    let mut user = match state.users.find_by_token(&token).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!("unknown verification token");
            return Err(VerifyError::InvalidToken);
        }
        Err(e) => {
            error!(error = %e, "find_by_token failed");
            return Err(VerifyError::Internal);
        }
    };

    if user.is_verified {
        info!(user_id = %user.id, "email already verified");
        return Ok(redirect(&state.config, VerifyStatus::AlreadyVerified));
    }

    user.mark_verified();
    if let Err(e) = state.users.save(&user).await {
        error!(error = %e, user_id = %user.id, "save verified user failed");
        return Err(VerifyError::Internal);
    }

    info!(user_id = %user.id, email = %user.email, "email verified");
    Ok(redirect(&state.config, VerifyStatus::Success))
}

fn redirect(config: &AppConfig, status: VerifyStatus) -> Response {
    (
        StatusCode::FOUND,
        [(header::LOCATION, config.verified_page(status.as_str()))],
    )
        .into_response()
}
