//! Auth gateway. Accounts, passwords, OAuth and sessions belong to the hosted
//! auth provider; this module only relays to it and resolves bearer tokens
//! into the calling user.

use std::str::FromStr;

use async_trait::async_trait;
use axum::extract::{FromRequestParts, Query};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::models::NewProfile;
use crate::state::AppState;
use crate::utils::error::AppError;

pub mod gotrue;

pub use gotrue::GoTrueClient;

#[derive(Debug, Error)]
pub enum AuthError {
    /// The provider answered and said no; the message is the provider's own.
    #[error("{0}")]
    Rejected(String),

    #[error("auth provider unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::Unavailable(err.to_string())
    }
}

/// A user as the auth provider describes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Value,
}

impl AuthUser {
    fn metadata_str(&self, key: &str) -> Option<String> {
        self.user_metadata
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    /// Profile row seeded from the provider's metadata. Password sign-ups
    /// carry `full_name`; OAuth providers usually send `name` and a picture.
    pub fn profile(&self) -> NewProfile {
        NewProfile {
            id: self.id,
            email: self.email.as_deref().map(crate::models::user::normalize_email),
            display_name: self
                .metadata_str("full_name")
                .or_else(|| self.metadata_str("name")),
            avatar_url: self
                .metadata_str("avatar_url")
                .or_else(|| self.metadata_str("picture")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_token: String,
    pub user: AuthUser,
}

/// Sign-up returns a session right away when the provider auto-confirms
/// emails, otherwise just the pending user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignUp {
    pub user: AuthUser,
    pub session: Option<Session>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
    Apple,
}

impl OAuthProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Apple => "apple",
        }
    }
}

impl FromStr for OAuthProvider {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(OAuthProvider::Google),
            "apple" => Ok(OAuthProvider::Apple),
            other => Err(AppError::ValidationError(format!(
                "Unsupported sign-in provider '{other}'"
            ))),
        }
    }
}

#[async_trait]
pub trait AuthProvider: Send + Sync + 'static {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<SignUp, AuthError>;

    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> Result<Session, AuthError>;

    /// Where to send the browser to start an OAuth sign-in.
    fn authorize_url(&self, provider: OAuthProvider) -> Result<String, AuthError>;

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;
}

/// The caller, resolved from `Authorization: Bearer <token>`. An
/// `access_token` query parameter is accepted for clients that cannot set
/// headers, such as `EventSource`.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub access_token: String,
    pub auth_user: AuthUser,
}

#[derive(Deserialize)]
struct TokenQuery {
    access_token: Option<String>,
}

pub fn bearer_token(parts: &Parts) -> Option<String> {
    let from_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string);

    from_header.or_else(|| {
        Query::<TokenQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(q)| q.access_token)
            .filter(|token| !token.is_empty())
    })
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::AuthError("Missing bearer token".to_string()))?;
        let auth_user = state.auth.get_user(&token).await?;

        Ok(CurrentUser {
            id: auth_user.id,
            email: auth_user.email.clone(),
            access_token: token,
            auth_user,
        })
    }
}
