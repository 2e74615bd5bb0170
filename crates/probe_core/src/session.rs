//! Session lifecycle against the auth surface.

use crate::envelope;
use crate::error::{AuthError, TransportError};
use crate::recorder::{Expect, Recorded, RequestRecorder};
use crate::transport::ApiRequest;
use crate::types::Session;
use serde_json::{json, Value};
use tracing::{debug, info};

/// Owns the tokens of one scenario run.
///
/// Each run gets its own manager; managers are never shared between runs.
pub struct SessionManager<'a> {
    recorder: RequestRecorder<'a>,
    session: Option<Session>,
}

impl<'a> SessionManager<'a> {
    pub fn new(recorder: RequestRecorder<'a>) -> Self {
        Self {
            recorder,
            session: None,
        }
    }

    /// Current session, if authenticated.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// Access token for request builders; `None` means "send no header".
    pub fn bearer(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.access_token.as_str())
    }

    /// Authorization header, omitted entirely when no access token is held.
    pub fn auth_header(&self) -> Option<(&'static str, String)> {
        self.bearer()
            .map(|token| ("Authorization", format!("Bearer {}", token)))
    }

    /// Register a new account and adopt the returned tokens.
    pub fn register(
        &mut self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Session, AuthError> {
        let request = ApiRequest::post("/auth/register").json(json!({
            "email": email,
            "password": password,
            "name": name,
        }));
        let rec = self
            .recorder
            .execute(&request, &Expect::created().or(200));
        if !rec.passed() {
            return Err(classify(&rec, |status| match status {
                409 => Some(AuthError::DuplicateEmail),
                _ => None,
            }));
        }

        let session = parse_session(&rec, email)?;
        info!(email, user_id = ?session.user_id, "registered");
        self.session = Some(session.clone());
        Ok(session)
    }

    /// Log in and adopt the returned tokens. A failed login leaves any
    /// existing session untouched.
    pub fn login(&mut self, email: &str, password: &str) -> Result<Session, AuthError> {
        let request = ApiRequest::post("/auth/login").json(json!({
            "email": email,
            "password": password,
        }));
        let rec = self.recorder.execute(&request, &Expect::ok());
        if !rec.passed() {
            return Err(classify(&rec, |status| match status {
                401 => Some(AuthError::InvalidCredentials),
                _ => None,
            }));
        }

        let session = parse_session(&rec, email)?;
        info!(email, "logged in");
        self.session = Some(session.clone());
        Ok(session)
    }

    /// Rotate both tokens using the held refresh token.
    ///
    /// The swap is all-or-nothing: on any failure the previous session is kept
    /// exactly as it was.
    pub fn refresh(&mut self) -> Result<Session, AuthError> {
        let current = self.session.as_ref().ok_or(AuthError::MissingRefreshToken)?;
        if current.refresh_token.is_empty() {
            return Err(AuthError::MissingRefreshToken);
        }

        let mut rotated = self.exchange_refresh_token(&current.refresh_token)?;
        if rotated.user_id.is_none() {
            rotated.user_id = current.user_id.clone();
        }
        rotated.email = current.email.clone();

        debug!("tokens rotated");
        self.session = Some(rotated.clone());
        Ok(rotated)
    }

    /// Exchange an arbitrary refresh token without touching local state.
    ///
    /// Used to prove that a rotated-out token is rejected.
    pub fn exchange_refresh_token(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let request =
            ApiRequest::post("/auth/refresh").json(json!({ "refresh_token": refresh_token }));
        let rec = self.recorder.execute(&request, &Expect::ok());
        if !rec.passed() {
            return Err(classify(&rec, |status| match status {
                401 | 403 => Some(AuthError::InvalidRefreshToken),
                _ => None,
            }));
        }
        let email = self
            .session
            .as_ref()
            .map(|s| s.email.clone())
            .unwrap_or_default();
        parse_session(&rec, &email)
    }

    /// Change the account password. Tokens stay as they are.
    pub fn change_password(&self, current: &str, new: &str) -> Result<(), AuthError> {
        let request = ApiRequest::put("/users/me/password")
            .auth(self.bearer())
            .json(json!({
                "current_password": current,
                "new_password": new,
            }));
        let rec = self.recorder.execute(&request, &Expect::ok().or(204));
        if rec.passed() {
            Ok(())
        } else {
            Err(classify(&rec, |status| match status {
                401 => Some(AuthError::InvalidCredentials),
                _ => None,
            }))
        }
    }

    /// Invalidate the held refresh token server-side.
    ///
    /// Local state is cleared whatever the server answers, so calling this
    /// twice is harmless.
    pub fn logout(&mut self) -> Result<(), AuthError> {
        let Some(session) = self.session.take() else {
            debug!("logout without a session; nothing to invalidate");
            return Ok(());
        };
        let request = ApiRequest::post("/auth/logout")
            .auth(Some(&session.access_token))
            .json(json!({ "refresh_token": session.refresh_token }));
        let rec = self.recorder.execute(&request, &Expect::ok().or(204));
        if rec.passed() {
            Ok(())
        } else {
            Err(classify(&rec, |_| None))
        }
    }

    /// Invalidate every refresh token of the account. Local state is cleared
    /// regardless of the outcome.
    pub fn logout_all(&mut self) -> Result<(), AuthError> {
        let token = self.session.take().map(|s| s.access_token);
        let request = ApiRequest::post("/auth/logout-all").auth(token.as_deref());
        let rec = self.recorder.execute(&request, &Expect::ok().or(204));
        if rec.passed() {
            Ok(())
        } else {
            Err(classify(&rec, |status| match status {
                401 => Some(AuthError::InvalidCredentials),
                _ => None,
            }))
        }
    }

    /// Drop local tokens without contacting the server.
    pub fn clear(&mut self) {
        self.session = None;
    }
}

fn classify(rec: &Recorded, specific: impl Fn(u16) -> Option<AuthError>) -> AuthError {
    let Some(status) = rec.actual_status else {
        let message = rec
            .failure
            .as_ref()
            .map(|f| f.message.clone())
            .unwrap_or_default();
        return AuthError::Transport(TransportError::Other(message));
    };
    if let Some(err) = specific(status) {
        return err;
    }
    match status {
        400 | 422 => AuthError::Validation {
            status,
            message: rec
                .json()
                .and_then(envelope::error_message)
                .unwrap_or_else(|| "invalid request".to_string()),
        },
        _ => AuthError::Unexpected { status },
    }
}

fn token_field(payload: &Value, key: &str) -> Option<String> {
    envelope::str_field(payload, key)
        .or_else(|| payload.get("tokens").and_then(|t| envelope::str_field(t, key)))
}

fn parse_session(rec: &Recorded, email: &str) -> Result<Session, AuthError> {
    let payload = rec
        .payload()
        .ok_or(AuthError::MalformedTokens("JSON body"))?;
    let access_token =
        token_field(payload, "access_token").ok_or(AuthError::MalformedTokens("access_token"))?;
    let refresh_token =
        token_field(payload, "refresh_token").ok_or(AuthError::MalformedTokens("refresh_token"))?;
    let user_id = envelope::str_field(payload, "user_id").or_else(|| {
        payload
            .get("user")
            .and_then(|user| envelope::str_field(user, "id"))
    });

    Ok(Session {
        access_token,
        refresh_token,
        user_id,
        email: email.to_string(),
    })
}
