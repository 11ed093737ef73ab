use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{AuthError, AuthProvider, AuthUser, OAuthProvider, Session, SignUp};
use crate::config::AuthConfig;

/// Client for a GoTrue-compatible auth API (`{url}/auth/v1/...`).
#[derive(Clone)]
pub struct GoTrueClient {
    http: Client,
    base: Url,
    anon_key: String,
    redirect_url: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(Session),
    User(AuthUser),
}

impl GoTrueClient {
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        // Endpoints are joined relative to the base, which needs a trailing slash.
        let mut raw = config.url.clone();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base = Url::parse(&raw)
            .map_err(|e| AuthError::Unavailable(format!("invalid auth url: {e}")))?;
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            http,
            base,
            anon_key: config.anon_key.clone(),
            redirect_url: config.redirect_url.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AuthError> {
        self.base
            .join(&format!("auth/v1/{path}"))
            .map_err(|e| AuthError::Unavailable(format!("invalid auth endpoint: {e}")))
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("apikey", &self.anon_key)
    }

    /// Pulls the provider's message out of an error body. GoTrue has used
    /// several field names for it across versions.
    async fn rejection(response: Response) -> AuthError {
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        let message = ["error_description", "msg", "message", "error"]
            .iter()
            .find_map(|key| body.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| format!("auth provider returned {status}"));
        debug!(%status, message = %message, "Auth provider rejected request");
        AuthError::Rejected(message)
    }
}

#[async_trait]
impl AuthProvider for GoTrueClient {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<SignUp, AuthError> {
        let mut url = self.endpoint("signup")?;
        url.query_pairs_mut()
            .append_pair("redirect_to", &self.redirect_url);

        let response = self
            .request(self.http.post(url))
            .json(&json!({
                "email": email,
                "password": password,
                "data": { "full_name": display_name },
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        Ok(match response.json::<SignUpResponse>().await? {
            SignUpResponse::Session(session) => SignUp {
                user: session.user.clone(),
                session: Some(session),
            },
            SignUpResponse::User(user) => SignUp {
                user,
                session: None,
            },
        })
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let mut url = self.endpoint("token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");

        let response = self
            .request(self.http.post(url))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }
        Ok(response.json::<Session>().await?)
    }

    fn authorize_url(&self, provider: OAuthProvider) -> Result<String, AuthError> {
        let mut url = self.endpoint("authorize")?;
        url.query_pairs_mut()
            .append_pair("provider", provider.as_str())
            .append_pair("redirect_to", &self.redirect_url);
        Ok(url.into())
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        let response = self
            .request(self.http.get(self.endpoint("user")?))
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }
        Ok(response.json::<AuthUser>().await?)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .request(self.http.post(self.endpoint("logout")?))
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }
        Ok(())
    }
}
