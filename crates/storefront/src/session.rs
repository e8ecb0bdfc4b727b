//! Signed-in identity shared by the gateway and the stores.
//!
//! The session is filled by whatever signs the user in (the auth provider's
//! callback, or the CLI's `--user`/`--token` flags) and read by everything
//! else. The only internal writer is the gateway's token refresh, which renews
//! tokens on success and clears the session when the refresh is refused.

use std::sync::{Arc, PoisonError, RwLock};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use shopfront_core::{Email, UserId};

/// Public profile of the signed-in user; safe to persist and display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(rename = "_id")]
    pub id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<Email>,
}

/// A signed-in user with the credentials issued by the auth provider.
///
/// Implements `Debug` manually to redact tokens.
#[derive(Clone)]
pub struct SessionUser {
    pub profile: Profile,
    access_token: SecretString,
    refresh_token: Option<SecretString>,
}

impl std::fmt::Debug for SessionUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionUser")
            .field("profile", &self.profile)
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl SessionUser {
    /// Create a session user from a profile and its tokens.
    #[must_use]
    pub fn new(
        profile: Profile,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
    ) -> Self {
        Self {
            profile,
            access_token: SecretString::from(access_token.into()),
            refresh_token: refresh_token.map(SecretString::from),
        }
    }

    /// Session user known only by id.
    #[must_use]
    pub fn with_id(
        id: impl Into<UserId>,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
    ) -> Self {
        Self::new(
            Profile {
                id: id.into(),
                name: None,
                email: None,
            },
            access_token,
            refresh_token,
        )
    }

    /// The user's id.
    #[must_use]
    pub const fn id(&self) -> &UserId {
        &self.profile.id
    }
}

/// Shared, cheaply cloneable handle on the current identity.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    user: RwLock<Option<SessionUser>>,
    identity: watch::Sender<Option<UserId>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id())
            .finish()
    }
}

impl Session {
    /// Create a signed-out session.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SessionInner {
                user: RwLock::new(None),
                identity: watch::Sender::new(None),
            }),
        }
    }

    /// Install a signed-in user, replacing any previous one.
    pub fn sign_in(&self, user: SessionUser) {
        let id = user.id().clone();
        *self.inner.user.write().unwrap_or_else(PoisonError::into_inner) = Some(user);
        self.inner.identity.send_replace(Some(id));
    }

    /// Forget the signed-in user. Returns the user that was signed in, if any.
    pub fn sign_out(&self) -> Option<SessionUser> {
        let previous = self
            .inner
            .user
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            self.inner.identity.send_replace(None);
        }
        previous
    }

    /// Whether a user is signed in.
    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.read(|user| user.is_some())
    }

    /// Id of the signed-in user.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.read(|user| user.map(|u| u.id().clone()))
    }

    /// Profile of the signed-in user.
    #[must_use]
    pub fn profile(&self) -> Option<Profile> {
        self.read(|user| user.map(|u| u.profile.clone()))
    }

    /// Current bearer access token.
    #[must_use]
    pub fn access_token(&self) -> Option<SecretString> {
        self.read(|user| user.map(|u| u.access_token.clone()))
    }

    /// Current refresh token.
    #[must_use]
    pub fn refresh_token(&self) -> Option<SecretString> {
        self.read(|user| user.and_then(|u| u.refresh_token.clone()))
    }

    /// Replace the tokens of the signed-in user after a refresh.
    ///
    /// A `None` refresh token keeps the existing one. Does nothing when
    /// signed out, so a refresh that lands after sign-out cannot revive the
    /// session.
    pub fn update_tokens(&self, access_token: SecretString, refresh_token: Option<SecretString>) {
        let mut guard = self.inner.user.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(user) = guard.as_mut() {
            user.access_token = access_token;
            if refresh_token.is_some() {
                user.refresh_token = refresh_token;
            }
        }
    }

    /// Whether `token` is still the current access token.
    #[must_use]
    pub fn is_current_token(&self, token: &SecretString) -> bool {
        self.read(|user| {
            user.is_some_and(|u| u.access_token.expose_secret() == token.expose_secret())
        })
    }

    /// Watch identity changes (sign-in, sign-out, forced expiry).
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<UserId>> {
        self.inner.identity.subscribe()
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.inner.identity.receiver_count()
    }

    fn read<R>(&self, f: impl FnOnce(Option<&SessionUser>) -> R) -> R {
        let guard = self.inner.user.read().unwrap_or_else(PoisonError::into_inner);
        f(guard.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_in_and_out() {
        let session = Session::new();
        assert!(!session.is_signed_in());
        assert!(session.access_token().is_none());

        session.sign_in(SessionUser::with_id("u1", "access", Some("refresh".into())));
        assert_eq!(session.user_id(), Some(UserId::new("u1")));
        assert_eq!(
            session.refresh_token().map(|t| t.expose_secret().to_string()),
            Some("refresh".to_string())
        );

        assert!(session.sign_out().is_some());
        assert!(session.sign_out().is_none());
        assert!(session.user_id().is_none());
    }

    #[test]
    fn test_update_tokens_keeps_refresh_token_when_absent() {
        let session = Session::new();
        session.sign_in(SessionUser::with_id("u1", "old", Some("r1".into())));

        session.update_tokens(SecretString::from("new"), None);
        assert!(session.is_current_token(&SecretString::from("new")));
        assert!(!session.is_current_token(&SecretString::from("old")));
        assert_eq!(
            session.refresh_token().map(|t| t.expose_secret().to_string()),
            Some("r1".to_string())
        );
    }

    #[test]
    fn test_update_tokens_after_sign_out_is_ignored() {
        let session = Session::new();
        session.update_tokens(SecretString::from("new"), None);
        assert!(!session.is_signed_in());
    }

    #[test]
    fn test_identity_watch() {
        let session = Session::new();
        let rx = session.subscribe();
        session.sign_in(SessionUser::with_id("u7", "t", None));
        assert_eq!(*rx.borrow(), Some(UserId::new("u7")));
        session.sign_out();
        assert_eq!(*rx.borrow(), None);
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let user = SessionUser::with_id("u1", "super_secret_access", Some("super_secret_refresh".into()));
        let output = format!("{user:?}");
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("super_secret"));
    }
}
