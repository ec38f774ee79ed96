use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::WithRejection;
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{error, info};

use stash_db::Repository;
use stash_types::api::{Claims, LoginRequest, LoginResponse, MessageResponse, RegisterRequest};
use stash_types::models::UserId;

use crate::enrich::Enricher;
use crate::error::ApiError;
use crate::blocking;

/// Access tokens expire one hour after issue.
pub const TOKEN_TTL_SECS: i64 = 60 * 60;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub repo: Arc<dyn Repository>,
    pub jwt_secret: String,
    pub enricher: Enricher,
}

impl AppStateInner {
    pub fn new(repo: Arc<dyn Repository>, jwt_secret: impl Into<String>, enricher: Enricher) -> AppState {
        Arc::new(Self {
            repo,
            jwt_secret: jwt_secret.into(),
            enricher,
        })
    }
}

pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<RegisterRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation("Email and password are required.".into()));
    }

    // Check if email is taken before paying for the hash
    let repo = state.repo.clone();
    let email = req.email.clone();
    if blocking(move || repo.find_user_by_email(&email)).await?.is_some() {
        return Err(ApiError::Conflict("User with this email already exists.".into()));
    }

    // Hash password with Argon2id
    let password = req.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::internal()
        })??;

    let repo = state.repo.clone();
    let email = req.email;
    let user = blocking(move || repo.create_user(&email, &password_hash)).await?;
    info!(user_id = user.id, "Registered user {}", user.email);

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("User registered successfully.")),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation("Email and password are required.".into()));
    }

    let repo = state.repo.clone();
    let email = req.email;
    let user = blocking(move || repo.find_user_by_email(&email))
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    // Verify password
    let password = req.password;
    let stored_hash = user.password_hash.clone();
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::internal()
        })?;
    if !matches {
        return Err(ApiError::InvalidCredentials);
    }

    let access_token = create_token(
        &state.jwt_secret,
        user.id,
        &user.email,
        chrono::Duration::seconds(TOKEN_TTL_SECS),
    )
    .map_err(|e| {
        error!("Failed to sign token: {}", e);
        ApiError::internal()
    })?;

    Ok(Json(LoginResponse { access_token }))
}

fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Password hashing failed: {}", e);
            ApiError::internal()
        })
}

/// A stored hash that fails to parse counts as a mismatch.
fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .and_then(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed))
        .is_ok()
}

/// Sign an HS256 token carrying the user's id and email.
pub fn create_token(
    secret: &str,
    user_id: UserId,
    email: &str,
    ttl: chrono::Duration,
) -> jsonwebtoken::errors::Result<String> {
    let now = chrono::Utc::now();
    let claims = Claims {
        id: user_id,
        email: email.to_string(),
        iat: now.timestamp().max(0) as usize,
        exp: (now + ttl).timestamp().max(0) as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}
