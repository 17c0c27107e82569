//! Authentication against the hosted backend.
//!
//! The session layer only depends on [`AuthBackend`]; [`SupabaseAuthClient`]
//! is the production implementation and keeps the session it obtains in a
//! [`SessionPersistence`] store.

mod client;
mod wire;

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use client::SupabaseAuthClient;
pub(crate) use wire::describe_error;

/// Sessions this close to expiry are refreshed before use.
const EXPIRY_MARGIN_SECONDS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: AuthUser,
}

impl AuthSession {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECONDS)
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("user", &self.user)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// E-mail and password, checked for presence before any request.
#[derive(Clone)]
pub struct Credentials {
    email: String,
    password: String,
}

impl Credentials {
    pub fn new(email: &str, password: &str) -> AuthResult<Self> {
        let email = email.trim();
        if email.is_empty() {
            return Err(AuthError::MissingCredential("email"));
        }
        if password.trim().is_empty() {
            return Err(AuthError::MissingCredential("password"));
        }
        Ok(Self {
            email: email.to_string(),
            password: password.to_string(),
        })
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// A sign-up either signs the user in directly or waits for e-mail
/// confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    SignedIn(AuthSession),
    ConfirmationRequired,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Auth is not configured: {0}")]
    Config(String),
    #[error("Please enter your {0}")]
    MissingCredential(&'static str),
    #[error("Could not reach the auth service: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unexpected auth response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("{0}")]
    Rejected(String),
    #[error("Could not store the session: {0}")]
    Persistence(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Where a signed-in session is kept between starts.
pub trait SessionPersistence: Clone + Send + Sync + 'static {
    fn load(&self) -> AuthResult<Option<AuthSession>>;
    fn save(&self, session: &AuthSession) -> AuthResult<()>;
    fn clear(&self) -> AuthResult<()>;
}

/// Keeps the session for the lifetime of the process only.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    slot: Arc<Mutex<Option<AuthSession>>>,
}

impl MemorySessionStore {
    fn with_slot<R>(&self, f: impl FnOnce(&mut Option<AuthSession>) -> R) -> R {
        f(&mut self.slot.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl SessionPersistence for MemorySessionStore {
    fn load(&self) -> AuthResult<Option<AuthSession>> {
        Ok(self.with_slot(|slot| slot.clone()))
    }

    fn save(&self, session: &AuthSession) -> AuthResult<()> {
        self.with_slot(|slot| *slot = Some(session.clone()));
        Ok(())
    }

    fn clear(&self) -> AuthResult<()> {
        self.with_slot(Option::take);
        Ok(())
    }
}

/// Operations the session lifecycle needs from an auth provider.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// The persisted session, refreshed if it is about to expire.
    async fn restore_session(&self) -> AuthResult<Option<AuthSession>>;
    async fn sign_in(&self, credentials: &Credentials) -> AuthResult<AuthSession>;
    async fn sign_up(&self, credentials: &Credentials) -> AuthResult<SignUpOutcome>;
    /// Exchange the session's refresh token for a new session.
    async fn refresh(&self, session: &AuthSession) -> AuthResult<AuthSession>;
    async fn sign_out(&self, session: &AuthSession) -> AuthResult<()>;
}
