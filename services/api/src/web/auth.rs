//! services/api/src/web/auth.rs
//!
//! Account endpoints: registration, login, current account, password change,
//! and account deletion.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};
use study_helper_core::domain::{Account, UsageWindow};
use study_helper_core::ports::PortError;
use utoipa::ToSchema;

use crate::web::error::WebError;
use crate::web::protocol::{AccountPayload, MessageResponse};
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdatePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct DeleteAccountRequest {
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    /// Bearer token for subsequent requests. Valid for 30 days; not
    /// revocable before expiry.
    pub token: String,
    pub account: AccountPayload,
}

#[derive(Serialize, ToSchema)]
pub struct MeResponse {
    pub success: bool,
    pub account: AccountPayload,
}

//=========================================================================================
// Password Hashing and Validation Helpers
//=========================================================================================

static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\S+@\S+\.\S+$").expect("valid email pattern"));

const MIN_PASSWORD_CHARS: usize = 6;

/// Hashes a plaintext password with a freshly generated salt.
pub(crate) fn hash_password(plain: &str) -> Result<String, WebError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| WebError::Internal(format!("Failed to hash password: {}", e)))
}

/// Constant-time check of a candidate password against a stored hash.
/// The plaintext is never logged and never returned.
pub(crate) fn verify_password(stored_hash: &str, candidate: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(candidate.as_bytes(), &parsed)
        .is_ok()
}

fn validate_registration(email: &str, password: &str) -> Result<(), WebError> {
    if email.is_empty() || password.is_empty() {
        return Err(WebError::Validation(
            "Please provide email and password".to_string(),
        ));
    }
    if !EMAIL_SHAPE.is_match(email) {
        return Err(WebError::Validation(
            "Please provide a valid email".to_string(),
        ));
    }
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(WebError::Validation(
            "Password must be at least 6 characters".to_string(),
        ));
    }
    Ok(())
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /register - Create a new account
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created successfully", body = AuthResponse),
        (status = 400, description = "Invalid email or password, or email already taken"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, WebError> {
    let email = req.email.trim().to_lowercase();
    validate_registration(&email, &req.password)?;

    let password_hash = hash_password(&req.password)?;
    let usage = UsageWindow::with_limit(Utc::now(), state.config.default_daily_limit);

    let account = state
        .db
        .create_account(&email, &password_hash, &usage)
        .await
        .map_err(|e| match e {
            PortError::Duplicate(_) => {
                WebError::Duplicate("User already exists with this email".to_string())
            }
            other => other.into(),
        })?;

    let token = state
        .tokens
        .issue(account.id)
        .map_err(|e| WebError::Internal(e.to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            message: "User registered successfully".to_string(),
            token,
            account: AccountPayload::from_account(&account),
        }),
    ))
}

/// POST /login - Login with an existing account
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, WebError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(WebError::Validation(
            "Please provide email and password".to_string(),
        ));
    }

    // Unknown email and wrong password produce the same message, so a caller
    // cannot probe which addresses are registered.
    let creds = state
        .db
        .get_account_by_email(&req.email)
        .await?
        .ok_or_else(|| WebError::Unauthenticated("Invalid email or password".to_string()))?;

    if !verify_password(&creds.password_hash, &req.password) {
        return Err(WebError::Unauthenticated(
            "Invalid email or password".to_string(),
        ));
    }

    let account = state
        .db
        .get_account_by_id(creds.id)
        .await?
        .ok_or_else(|| WebError::Internal(format!("Account {} vanished after login", creds.id)))?;

    let token = state
        .tokens
        .issue(account.id)
        .map_err(|e| WebError::Internal(e.to_string()))?;

    Ok(Json(AuthResponse {
        success: true,
        message: "Login successful".to_string(),
        token,
        account: AccountPayload::from_account(&account),
    }))
}

/// GET /me - The authenticated account
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "The current account", body = MeResponse),
        (status = 401, description = "Missing, invalid, or expired token")
    )
)]
pub async fn me_handler(Extension(account): Extension<Account>) -> Json<MeResponse> {
    Json(MeResponse {
        success: true,
        account: AccountPayload::from_account(&account),
    })
}

/// PUT /password - Change the account password
#[utoipa::path(
    put,
    path = "/password",
    request_body = UpdatePasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = MessageResponse),
        (status = 401, description = "Current password is incorrect")
    )
)]
pub async fn update_password_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
    Json(req): Json<UpdatePasswordRequest>,
) -> Result<impl IntoResponse, WebError> {
    if req.current_password.is_empty() || req.new_password.is_empty() {
        return Err(WebError::Validation(
            "Please provide current and new password".to_string(),
        ));
    }
    if req.new_password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(WebError::Validation(
            "New password must be at least 6 characters".to_string(),
        ));
    }

    let creds = state
        .db
        .get_credentials_by_id(account.id)
        .await?
        .ok_or_else(|| WebError::Unauthenticated("Account no longer exists".to_string()))?;

    if !verify_password(&creds.password_hash, &req.current_password) {
        return Err(WebError::Unauthenticated(
            "Current password is incorrect".to_string(),
        ));
    }

    // Rehash with a fresh salt.
    let new_hash = hash_password(&req.new_password)?;
    state.db.update_password(account.id, &new_hash).await?;

    Ok(Json(MessageResponse::new("Password updated successfully")))
}

/// DELETE /account - Delete the account after re-verifying the password
#[utoipa::path(
    delete,
    path = "/account",
    request_body = DeleteAccountRequest,
    responses(
        (status = 200, description = "Account deleted", body = MessageResponse),
        (status = 401, description = "Password is incorrect")
    )
)]
pub async fn delete_account_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
    Json(req): Json<DeleteAccountRequest>,
) -> Result<impl IntoResponse, WebError> {
    if req.password.is_empty() {
        return Err(WebError::Validation(
            "Please provide your password to confirm deletion".to_string(),
        ));
    }

    let creds = state
        .db
        .get_credentials_by_id(account.id)
        .await?
        .ok_or_else(|| WebError::Unauthenticated("Account no longer exists".to_string()))?;

    if !verify_password(&creds.password_hash, &req.password) {
        return Err(WebError::Unauthenticated("Password is incorrect".to_string()));
    }

    state.db.delete_account(account.id).await?;

    Ok(Json(MessageResponse::new("Account deleted successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trips_through_hash_and_verify() {
        let hash = hash_password("hunter22").unwrap();

        assert!(verify_password(&hash, "hunter22"));
        assert!(!verify_password(&hash, "hunter2"));
        assert!(!verify_password(&hash, ""));
    }

    #[test]
    fn rehashing_uses_a_fresh_salt() {
        let first = hash_password("hunter22").unwrap();
        let second = hash_password("hunter22").unwrap();

        assert_ne!(first, second);
        assert!(verify_password(&first, "hunter22"));
        assert!(verify_password(&second, "hunter22"));
    }

    #[test]
    fn garbage_stored_hash_never_verifies() {
        assert!(!verify_password("not-a-phc-string", "hunter22"));
    }

    #[test]
    fn registration_validation_accepts_reasonable_input() {
        assert!(validate_registration("user@example.com", "hunter22").is_ok());
        assert!(validate_registration("a@b.co", "123456").is_ok());
    }

    #[test]
    fn registration_validation_rejects_bad_shapes() {
        // Missing pieces.
        assert!(validate_registration("", "hunter22").is_err());
        assert!(validate_registration("user@example.com", "").is_err());
        // Not an email shape.
        assert!(validate_registration("not-an-email", "hunter22").is_err());
        assert!(validate_registration("user@nodot", "hunter22").is_err());
        assert!(validate_registration("user with@spaces.com", "hunter22").is_err());
        // Five characters is one short.
        assert!(validate_registration("user@example.com", "abcde").is_err());
    }
}
