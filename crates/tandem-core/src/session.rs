//! Process-wide session state.
//!
//! A [`Session`] is created once at startup, started with [`Session::start`],
//! and torn down by [`Session::sign_out`]. It is passed explicitly to whoever
//! needs it; the gateway only sees a [`SessionHandle`] to read the current
//! access token and user id.

use std::sync::{Arc, PoisonError, RwLock};

use crate::auth::{AuthBackend, AuthResult, AuthSession, AuthUser, Credentials, SignUpOutcome};

/// Which top-level screen the routing guard lets through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    SignIn,
    App,
}

/// Cheap, cloneable read access to the current session.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    current: Arc<RwLock<Option<AuthSession>>>,
}

impl SessionHandle {
    #[must_use]
    pub fn current(&self) -> Option<AuthSession> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|session| session.access_token.clone())
    }

    #[must_use]
    pub fn user_id(&self) -> Option<String> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|session| session.user.id.clone())
    }

    /// Replace the current session. Exposed for hosts that restore a session
    /// through other means and for tests.
    pub fn set(&self, session: Option<AuthSession>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = session;
    }
}

pub struct Session<A: AuthBackend> {
    auth: A,
    handle: SessionHandle,
}

impl<A: AuthBackend> Session<A> {
    pub fn new(auth: A) -> Self {
        Self {
            auth,
            handle: SessionHandle::default(),
        }
    }

    #[must_use]
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Restore a persisted session, if any. Call once at startup.
    pub async fn start(&self) -> AuthResult<Route> {
        let restored = self.auth.restore_session().await?;
        if restored.is_some() {
            tracing::info!("Restored persisted session");
        } else {
            tracing::debug!("No persisted session to restore");
        }
        self.handle.set(restored);
        Ok(self.route())
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthUser> {
        let credentials = Credentials::new(email, password)?;
        let session = self.auth.sign_in(&credentials).await?;
        let user = session.user.clone();
        self.handle.set(Some(session));
        tracing::info!("Signed in as {}", user.id);
        Ok(user)
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> AuthResult<SignUpOutcome> {
        let credentials = Credentials::new(email, password)?;
        let outcome = self.auth.sign_up(&credentials).await?;
        if let SignUpOutcome::SignedIn(session) = &outcome {
            self.handle.set(Some(session.clone()));
        }
        Ok(outcome)
    }

    /// Refresh the current session when it is about to expire.
    ///
    /// Call before talking to the gateway. A failed refresh clears the
    /// session so the routing guard falls back to sign-in.
    pub async fn ensure_fresh(&self) -> AuthResult<Route> {
        let Some(current) = self.handle.current() else {
            return Ok(Route::SignIn);
        };
        if !current.is_expired() {
            return Ok(Route::App);
        }
        match self.auth.refresh(&current).await {
            Ok(refreshed) => {
                tracing::debug!("Refreshed session for {}", refreshed.user.id);
                self.handle.set(Some(refreshed));
                Ok(Route::App)
            }
            Err(error) => {
                tracing::warn!("Session refresh failed, signing out locally: {}", error);
                self.handle.set(None);
                Err(error)
            }
        }
    }

    /// Sign out remotely and always clear local state, even when the remote
    /// call fails.
    pub async fn sign_out(&self) -> AuthResult<()> {
        let Some(session) = self.handle.current() else {
            return Ok(());
        };
        let result = self.auth.sign_out(&session).await;
        self.handle.set(None);
        if let Err(error) = &result {
            tracing::warn!("Remote sign-out failed, local session cleared anyway: {}", error);
        } else {
            tracing::info!("Signed out");
        }
        result
    }

    #[must_use]
    pub fn current_user(&self) -> Option<AuthUser> {
        self.handle.current().map(|session| session.user)
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.handle.current().is_some()
    }

    #[must_use]
    pub fn route(&self) -> Route {
        if self.is_signed_in() {
            Route::App
        } else {
            Route::SignIn
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{Duration, Utc};

    use super::*;
    use crate::auth::AuthError;

    #[derive(Default)]
    struct FakeAuth {
        persisted: Option<AuthSession>,
        fail_sign_out: bool,
        fail_refresh: bool,
    }

    fn session_for(user: &str) -> AuthSession {
        AuthSession {
            access_token: format!("token-{user}"),
            refresh_token: "refresh".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
            user: AuthUser {
                id: user.to_string(),
                email: None,
            },
        }
    }

    fn expired_session_for(user: &str) -> AuthSession {
        AuthSession {
            expires_at: Utc::now() - Duration::minutes(5),
            ..session_for(user)
        }
    }

    #[async_trait]
    impl AuthBackend for FakeAuth {
        async fn restore_session(&self) -> AuthResult<Option<AuthSession>> {
            Ok(self.persisted.clone())
        }

        async fn sign_in(&self, credentials: &Credentials) -> AuthResult<AuthSession> {
            Ok(session_for(credentials.email()))
        }

        async fn sign_up(&self, _credentials: &Credentials) -> AuthResult<SignUpOutcome> {
            Ok(SignUpOutcome::ConfirmationRequired)
        }

        async fn refresh(&self, session: &AuthSession) -> AuthResult<AuthSession> {
            if self.fail_refresh {
                return Err(AuthError::Rejected("Invalid Refresh Token".to_string()));
            }
            Ok(AuthSession {
                access_token: format!("{}-renewed", session.access_token),
                ..session_for(&session.user.id)
            })
        }

        async fn sign_out(&self, _session: &AuthSession) -> AuthResult<()> {
            if self.fail_sign_out {
                Err(AuthError::Rejected("offline".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn start_without_persisted_session_routes_to_sign_in() {
        let session = Session::new(FakeAuth::default());
        assert_eq!(session.start().await.unwrap(), Route::SignIn);
        assert!(session.handle().access_token().is_none());
    }

    #[tokio::test]
    async fn start_restores_and_exposes_token() {
        let session = Session::new(FakeAuth {
            persisted: Some(session_for("alice")),
            ..FakeAuth::default()
        });
        assert_eq!(session.start().await.unwrap(), Route::App);
        assert_eq!(
            session.handle().access_token().as_deref(),
            Some("token-alice")
        );
        assert_eq!(session.handle().user_id().as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn sign_in_then_sign_out_toggles_route() {
        let session = Session::new(FakeAuth::default());
        session.sign_in("bob", "pw").await.unwrap();
        assert_eq!(session.route(), Route::App);
        session.sign_out().await.unwrap();
        assert_eq!(session.route(), Route::SignIn);
    }

    #[tokio::test]
    async fn failed_remote_sign_out_still_clears_local_state() {
        let session = Session::new(FakeAuth {
            persisted: Some(session_for("carol")),
            fail_sign_out: true,
            ..FakeAuth::default()
        });
        session.start().await.unwrap();
        assert!(session.sign_out().await.is_err());
        assert!(!session.is_signed_in());
    }

    #[tokio::test]
    async fn sign_up_requiring_confirmation_stays_signed_out() {
        let session = Session::new(FakeAuth::default());
        let outcome = session.sign_up("dave", "pw").await.unwrap();
        assert_eq!(outcome, SignUpOutcome::ConfirmationRequired);
        assert_eq!(session.route(), Route::SignIn);
    }

    #[tokio::test]
    async fn blank_credentials_never_reach_backend() {
        let session = Session::new(FakeAuth::default());
        let error = session.sign_in(" ", "pw").await.unwrap_err();
        assert!(matches!(error, AuthError::MissingCredential("email")));
        assert!(!session.is_signed_in());
    }

    #[tokio::test]
    async fn expired_session_is_refreshed_before_use() {
        let session = Session::new(FakeAuth::default());
        session.handle().set(Some(expired_session_for("erin")));

        assert_eq!(session.ensure_fresh().await.unwrap(), Route::App);
        let current = session.handle().current().unwrap();
        assert_eq!(current.access_token, "token-erin-renewed");
        assert!(!current.is_expired());
    }

    #[tokio::test]
    async fn fresh_session_is_left_alone() {
        let session = Session::new(FakeAuth {
            fail_refresh: true,
            ..FakeAuth::default()
        });
        session.handle().set(Some(session_for("frank")));
        assert_eq!(session.ensure_fresh().await.unwrap(), Route::App);
        assert_eq!(
            session.handle().access_token().as_deref(),
            Some("token-frank")
        );
    }

    #[tokio::test]
    async fn failed_refresh_routes_back_to_sign_in() {
        let session = Session::new(FakeAuth {
            fail_refresh: true,
            ..FakeAuth::default()
        });
        session.handle().set(Some(expired_session_for("gina")));

        assert!(session.ensure_fresh().await.is_err());
        assert_eq!(session.route(), Route::SignIn);
        assert_eq!(session.ensure_fresh().await.unwrap(), Route::SignIn);
    }
}
