//! Supabase auth client and the session context passed to remote calls.
//!
//! Every store and storage operation takes an [`AuthSession`] explicitly;
//! nothing in this crate reads the signed-in user from global state.

use std::fmt;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::ProjectCredentials;
use crate::util::{normalize_base_url, status_error, unix_timestamp_now};
use crate::{Error, Result};

const EXPIRY_SKEW_SECONDS: i64 = 60;
const AUTH_PATH: &str = "/auth/v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

/// Authenticated identity used to stamp ownership and authorize requests.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp, seconds.
    pub expires_at: i64,
    pub user: AuthUser,
}

impl AuthSession {
    /// Expired, or about to expire within a minute.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= unix_timestamp_now() + EXPIRY_SKEW_SECONDS
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user.id
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

/// Where a client keeps the signed-in session between runs.
pub trait SessionPersistence: Send + Sync {
    fn load(&self) -> Result<Option<AuthSession>>;
    fn save(&self, session: &AuthSession) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Grants accepted by the `/token` endpoint.
enum Grant<'a> {
    Password { email: &'a str, password: &'a str },
    Refresh { refresh_token: &'a str },
}

impl Grant<'_> {
    const fn grant_type(&self) -> &'static str {
        match self {
            Self::Password { .. } => "password",
            Self::Refresh { .. } => "refresh_token",
        }
    }

    fn body(&self) -> serde_json::Value {
        match self {
            Self::Password { email, password } => {
                serde_json::json!({ "email": email, "password": password })
            }
            Self::Refresh { refresh_token } => {
                serde_json::json!({ "refresh_token": refresh_token })
            }
        }
    }
}

/// Password sign-in against Supabase GoTrue, with the session persisted
/// through `P` after every successful grant.
pub struct SupabaseAuthClient<P> {
    project_url: String,
    endpoint: String,
    anon_key: String,
    http: Client,
    persistence: P,
}

impl<P: SessionPersistence> SupabaseAuthClient<P> {
    pub fn new(project: &ProjectCredentials, persistence: P) -> Result<Self> {
        let anon_key = project.anon_key.trim();
        if anon_key.is_empty() {
            return Err(Error::Configuration(
                "Supabase anon key must not be empty".to_string(),
            ));
        }
        let project_url = normalize_base_url(&project.url, "Supabase URL")?;

        Ok(Self {
            endpoint: auth_endpoint(&project_url),
            project_url,
            anon_key: anon_key.to_string(),
            http: Client::builder().build()?,
            persistence,
        })
    }

    pub fn project_url(&self) -> &str {
        &self.project_url
    }

    pub const fn persistence(&self) -> &P {
        &self.persistence
    }

    /// Load the persisted session, refreshing it when it has expired.
    ///
    /// A session that cannot be refreshed is cleared and `None` returned.
    pub async fn restore_session(&self) -> Result<Option<AuthSession>> {
        let Some(stored) = self.persistence.load()? else {
            return Ok(None);
        };
        if !stored.is_expired() {
            return Ok(Some(stored));
        }

        match self.refresh_session(&stored.refresh_token).await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(error) => {
                tracing::warn!(user_id = %stored.user.id, error = %error, "Stored session could not be refreshed");
                self.persistence.clear()?;
                Ok(None)
            }
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(Error::Validation(
                "Email and password are required".to_string(),
            ));
        }

        let session = self.grant(Grant::Password { email, password }).await?;
        tracing::info!(user_id = %session.user.id, "Signed in");
        Ok(session)
    }

    pub async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession> {
        if refresh_token.trim().is_empty() {
            return Err(Error::Validation(
                "Refresh token must not be empty".to_string(),
            ));
        }
        self.grant(Grant::Refresh { refresh_token }).await
    }

    /// Revoke the access token, then forget the stored session.
    ///
    /// A token the server no longer accepts counts as signed out.
    pub async fn sign_out(&self, access_token: &str) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/logout", self.endpoint))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if !(status.is_success() || status == StatusCode::UNAUTHORIZED) {
            let body = response.text().await.unwrap_or_default();
            return Err(auth_error(status, &body));
        }

        self.persistence.clear()?;
        tracing::info!("Signed out");
        Ok(())
    }

    async fn grant(&self, grant: Grant<'_>) -> Result<AuthSession> {
        tracing::debug!(grant_type = grant.grant_type(), "Requesting auth token");
        let response = self
            .http
            .post(format!("{}/token", self.endpoint))
            .query(&[("grant_type", grant.grant_type())])
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .json(&grant.body())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(auth_error(status, &body));
        }

        let session = response.json::<TokenResponse>().await?.into_session()?;
        self.persistence.save(&session)?;
        Ok(session)
    }
}

fn auth_endpoint(project_url: &str) -> String {
    if project_url.ends_with(AUTH_PATH) {
        project_url.to_string()
    } else {
        format!("{project_url}{AUTH_PATH}")
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self) -> Result<AuthSession> {
        let expires_at = self
            .expires_at
            .or_else(|| {
                self.expires_in
                    .map(|seconds| unix_timestamp_now().saturating_add(seconds))
            })
            .ok_or_else(|| Error::Transport("Auth response has no session expiry".to_string()))?;

        Ok(AuthSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        })
    }
}

/// GoTrue reports failures under several different keys.
#[derive(Debug, Default, Deserialize)]
struct AuthErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

fn auth_error(status: StatusCode, body: &str) -> Error {
    let message = serde_json::from_str::<AuthErrorBody>(body)
        .ok()
        .and_then(|payload| {
            payload
                .error_description
                .or(payload.msg)
                .or(payload.message)
                .or(payload.error)
        })
        .unwrap_or_else(|| body.to_string());
    status_error(status, "auth", &message)
}
