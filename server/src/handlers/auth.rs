use axum::extract::State;
use axum::http::{header::LOCATION, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::{AuthError, AuthUser, CurrentUser, OAuthProvider, Session};
use crate::models::User;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::{Json, Path};
use crate::utils::response::{created, empty_success, success};

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
struct SessionPayload {
    session: Option<Session>,
    user: AuthUser,
    profile: User,
}

fn require_credentials(email: &str, password: &str) -> Result<(), AppError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(AppError::ValidationError(
            "Email and password are required".to_string(),
        ));
    }
    Ok(())
}

/// A refused sign-up is a problem with the submitted details, not with the
/// caller's credentials.
fn sign_up_error(err: AuthError) -> AppError {
    match err {
        AuthError::Rejected(msg) => AppError::ValidationError(msg),
        other => other.into(),
    }
}

async fn sync_profile(state: &AppState, user: &AuthUser) -> Result<User, AppError> {
    Ok(state.store.upsert_profile(&user.profile()).await?)
}

pub async fn sign_up(
    State(state): State<AppState>,
    Json(body): Json<SignUpRequest>,
) -> Result<Response, AppError> {
    require_credentials(&body.email, &body.password)?;

    let signed_up = state
        .auth
        .sign_up(body.email.trim(), &body.password, body.display_name.trim())
        .await
        .map_err(sign_up_error)?;

    let mut profile = signed_up.user.profile();
    if profile.display_name.is_none() && !body.display_name.trim().is_empty() {
        profile.display_name = Some(body.display_name.trim().to_string());
    }
    let profile = state.store.upsert_profile(&profile).await?;
    info!(user_id = %profile.id, "User signed up");

    let message = if signed_up.session.is_some() {
        "Account created"
    } else {
        "Check your email to confirm your account"
    };
    Ok(created(
        SessionPayload {
            session: signed_up.session,
            user: signed_up.user,
            profile,
        },
        message,
    ))
}

pub async fn sign_in(
    State(state): State<AppState>,
    Json(body): Json<SignInRequest>,
) -> Result<Response, AppError> {
    require_credentials(&body.email, &body.password)?;

    let session = state
        .auth
        .sign_in_with_password(body.email.trim(), &body.password)
        .await?;
    let profile = sync_profile(&state, &session.user).await?;
    info!(user_id = %profile.id, "User signed in");

    Ok(success(
        SessionPayload {
            user: session.user.clone(),
            session: Some(session),
            profile,
        },
        "Signed in",
    ))
}

/// Starts an OAuth sign-in by redirecting to the provider.
pub async fn oauth_redirect(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> Result<Response, AppError> {
    let provider: OAuthProvider = provider.parse()?;
    let url = state.auth.authorize_url(provider)?;
    Ok((StatusCode::FOUND, [(LOCATION, url)]).into_response())
}

pub async fn session(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Response, AppError> {
    let profile = sync_profile(&state, &user.auth_user).await?;
    Ok(success(
        SessionPayload {
            session: None,
            user: user.auth_user,
            profile,
        },
        "Session is valid",
    ))
}

pub async fn sign_out(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Response, AppError> {
    state.auth.sign_out(&user.access_token).await?;
    info!(user_id = %user.id, "User signed out");
    Ok(empty_success("Signed out"))
}
