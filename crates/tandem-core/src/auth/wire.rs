//! Auth API payloads.

use chrono::{DateTime, Duration, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use super::{AuthError, AuthResult, AuthSession, AuthUser};
use crate::util::compact_text;

/// Token fields as they appear either at the top level of a grant response
/// or nested under `session` (sign-up).
#[derive(Debug, Default, Deserialize)]
pub(super) struct TokenFields {
    access_token: Option<String>,
    refresh_token: Option<String>,
    /// Unix seconds
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: Option<AuthUser>,
}

impl TokenFields {
    fn or(self, other: Self) -> Self {
        Self {
            access_token: self.access_token.or(other.access_token),
            refresh_token: self.refresh_token.or(other.refresh_token),
            expires_at: self.expires_at.or(other.expires_at),
            expires_in: self.expires_in.or(other.expires_in),
            user: self.user.or(other.user),
        }
    }

    fn expiry(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match (self.expires_at, self.expires_in) {
            (Some(at), _) => DateTime::from_timestamp(at, 0),
            (None, Some(seconds)) => now.checked_add_signed(Duration::seconds(seconds)),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct GrantResponse {
    #[serde(flatten)]
    top: TokenFields,
    #[serde(default)]
    session: Option<TokenFields>,
}

impl GrantResponse {
    /// `Ok(None)` when the response only carries a user, which is how a
    /// sign-up awaiting e-mail confirmation answers.
    pub(super) fn into_session(self, now: DateTime<Utc>) -> AuthResult<Option<AuthSession>> {
        let fields = self.top.or(self.session.unwrap_or_default());
        let expires_at = fields.expiry(now);
        match (fields.access_token, fields.refresh_token, expires_at, fields.user) {
            (Some(access_token), Some(refresh_token), Some(expires_at), Some(user)) => {
                Ok(Some(AuthSession {
                    access_token,
                    refresh_token,
                    expires_at,
                    user,
                }))
            }
            (None, None, None, Some(_)) => Ok(None),
            _ => Err(AuthError::Rejected(
                "The auth service returned an incomplete session".to_string(),
            )),
        }
    }
}

/// Display text for an error body from any backend service.
///
/// Auth, PostgREST and Storage disagree on the field name, so the first of
/// `message`, `msg`, `error_description` and `error` wins.
pub(crate) fn describe_error(status: StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|payload| {
            ["message", "msg", "error_description", "error"]
                .iter()
                .find_map(|key| payload.get(key).and_then(Value::as_str).map(str::trim))
                .filter(|text| !text.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| compact_text(body));

    if detail.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{detail} ({})", status.as_u16())
    }
}
