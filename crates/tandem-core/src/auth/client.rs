//! GoTrue client for the hosted auth service.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Response, StatusCode};
use serde_json::json;

use super::wire::{describe_error, GrantResponse};
use super::{
    AuthBackend, AuthError, AuthResult, AuthSession, Credentials, SessionPersistence,
    SignUpOutcome,
};
use crate::config::ClientConfig;

/// GoTrue client for the hosted backend's auth service.
#[derive(Clone)]
pub struct SupabaseAuthClient<S: SessionPersistence> {
    auth_url: String,
    anon_key: String,
    http: Client,
    sessions: S,
}

impl<S: SessionPersistence> SupabaseAuthClient<S> {
    pub fn new(config: &ClientConfig, sessions: S) -> AuthResult<Self> {
        let anon_key = config.supabase_anon_key.trim();
        if anon_key.is_empty() {
            return Err(AuthError::Config("the anon key is empty".to_string()));
        }
        Ok(Self {
            auth_url: config.auth_url(),
            anon_key: anon_key.to_string(),
            http: Client::builder().build()?,
            sessions,
        })
    }

    /// Exchange a refresh token for a new session and persist it.
    pub async fn refresh_session(&self, refresh_token: &str) -> AuthResult<AuthSession> {
        if refresh_token.trim().is_empty() {
            return Err(AuthError::Config("the refresh token is empty".to_string()));
        }
        let response = self
            .token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await?;
        self.keep(response, "refresh")
    }

    async fn token_grant(
        &self,
        grant_type: &str,
        body: serde_json::Value,
    ) -> AuthResult<GrantResponse> {
        tracing::debug!("Requesting {} token grant", grant_type);
        let response = self
            .http
            .post(format!("{}/token", self.auth_url))
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .json(&body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn decode(response: Response) -> AuthResult<GrantResponse> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        let body = response.text().await.unwrap_or_default();
        Err(AuthError::Rejected(describe_error(status, &body)))
    }

    /// Persist the session carried by a grant response that must have one.
    fn keep(&self, response: GrantResponse, action: &str) -> AuthResult<AuthSession> {
        let session = response.into_session(Utc::now())?.ok_or_else(|| {
            AuthError::Rejected(format!("The {action} response carried no session"))
        })?;
        self.sessions.save(&session)?;
        Ok(session)
    }
}

#[async_trait]
impl<S: SessionPersistence> AuthBackend for SupabaseAuthClient<S> {
    async fn restore_session(&self) -> AuthResult<Option<AuthSession>> {
        let Some(stored) = self.sessions.load()? else {
            return Ok(None);
        };
        if !stored.is_expired() {
            return Ok(Some(stored));
        }
        match self.refresh_session(&stored.refresh_token).await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(error) => {
                tracing::warn!("Dropping persisted session, refresh failed: {}", error);
                self.sessions.clear()?;
                Ok(None)
            }
        }
    }

    async fn sign_in(&self, credentials: &Credentials) -> AuthResult<AuthSession> {
        let body = json!({
            "email": credentials.email(),
            "password": credentials.password(),
        });
        let response = self.token_grant("password", body).await?;
        self.keep(response, "sign-in")
    }

    async fn sign_up(&self, credentials: &Credentials) -> AuthResult<SignUpOutcome> {
        let response = self
            .http
            .post(format!("{}/signup", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .json(&json!({
                "email": credentials.email(),
                "password": credentials.password(),
            }))
            .send()
            .await?;
        let Some(session) = Self::decode(response).await?.into_session(Utc::now())? else {
            return Ok(SignUpOutcome::ConfirmationRequired);
        };
        self.sessions.save(&session)?;
        Ok(SignUpOutcome::SignedIn(session))
    }

    async fn refresh(&self, session: &AuthSession) -> AuthResult<AuthSession> {
        self.refresh_session(&session.refresh_token).await
    }

    /// An already revoked token (401) counts as signed out.
    async fn sign_out(&self, session: &AuthSession) -> AuthResult<()> {
        let response = self
            .http
            .post(format!("{}/logout", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() && status != StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Rejected(describe_error(status, &body)));
        }
        self.sessions.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemorySessionStore;

    #[test]
    fn client_uses_auth_endpoint() {
        let config = ClientConfig::new("https://demo.supabase.co/", "anon").unwrap();
        let client = SupabaseAuthClient::new(&config, MemorySessionStore::default()).unwrap();
        assert_eq!(client.auth_url, "https://demo.supabase.co/auth/v1");
    }

    #[tokio::test]
    async fn restore_without_stored_session_is_none() {
        let config = ClientConfig::new("https://demo.supabase.co", "anon").unwrap();
        let client = SupabaseAuthClient::new(&config, MemorySessionStore::default()).unwrap();
        assert!(client.restore_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn blank_refresh_token_fails_before_any_request() {
        let config = ClientConfig::new("https://demo.supabase.co", "anon").unwrap();
        let client = SupabaseAuthClient::new(&config, MemorySessionStore::default()).unwrap();
        assert!(matches!(
            client.refresh_session("  ").await,
            Err(AuthError::Config(_))
        ));
    }
}
