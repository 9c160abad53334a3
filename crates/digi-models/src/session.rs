//! Authenticated session state.
//!
//! Identity operations and token verification produce [`AuthEvent`]s; a
//! single reducer ([`SessionState::apply`]) folds them into the session the
//! lifecycle controller is handed.

use serde::{Deserialize, Serialize};

/// The signed-in applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    /// Identity provider user ID
    pub uid: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
}

/// Change notifications from the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "user", rename_all = "snake_case")]
pub enum AuthEvent {
    /// Session restored from a bearer token (or absent)
    InitialSession(Option<SessionUser>),
    SignedIn(SessionUser),
    /// Profile or credentials changed for the signed-in user
    UserUpdated(SessionUser),
    SignedOut,
}

/// Current session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "status", content = "user", rename_all = "snake_case")]
pub enum SessionState {
    /// No event received yet
    #[default]
    Loading,
    Anonymous,
    Authenticated(SessionUser),
}

impl SessionState {
    /// Fold one event into the session.
    ///
    /// An update only lands on an authenticated session; it cannot sign
    /// anyone in.
    pub fn apply(self, event: AuthEvent) -> Self {
        match (self, event) {
            (_, AuthEvent::InitialSession(Some(user)) | AuthEvent::SignedIn(user)) => {
                Self::Authenticated(user)
            }
            (_, AuthEvent::InitialSession(None) | AuthEvent::SignedOut) => Self::Anonymous,
            (Self::Authenticated(_), AuthEvent::UserUpdated(user)) => Self::Authenticated(user),
            (state, AuthEvent::UserUpdated(_)) => state,
        }
    }

    /// Fold a sequence of events, starting from `Loading`.
    pub fn replay(events: impl IntoIterator<Item = AuthEvent>) -> Self {
        events.into_iter().fold(Self::default(), Self::apply)
    }

    /// The applicant allowed to use the form, if any.
    pub fn user(&self) -> Option<&SessionUser> {
        match self {
            Self::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }
}
