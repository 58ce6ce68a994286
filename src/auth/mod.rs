//! Authentication: identity provider, session reconciliation, and the
//! Google sign-in flows.
//!
//! ARCHITECTURE
//! ============
//! `provider` owns who is signed in with Google. `controller` reconciles that
//! with the session cookie and the user's profile into one runtime state.
//! `flow` is what the login page drives: sign in or register, with the
//! provider signed back out whenever the profile step refuses.

pub mod controller;
pub mod flow;
pub mod google;
pub mod provider;

pub use controller::{AuthController, AuthRuntimeState};
pub use google::{DevVerifier, GoogleVerifier, TokenVerifier};
pub use provider::{Identity, IdentityProvider, ProviderError, ProviderRegistry, ProviderSession};

use crate::services::profile::ProfileError;
use crate::store::StoreError;

/// Which tab of the sign-in page started the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Register,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("user is already registered")]
    AlreadyRegistered,
    #[error("user is not registered")]
    NotRegistered,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl From<ProfileError> for AuthError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::Validation(msg) => Self::Validation(msg),
            ProfileError::AlreadyRegistered => Self::AlreadyRegistered,
            ProfileError::NotRegistered => Self::NotRegistered,
            ProfileError::Store(e) => Self::Store(e),
        }
    }
}

impl AuthError {
    /// Text shown on the sign-in page.
    #[must_use]
    pub fn user_message(&self, mode: AuthMode) -> &'static str {
        match (self, mode) {
            (Self::AlreadyRegistered, _) => "このGoogleアカウントは既に登録されています。ログインタブをお使いください。",
            (Self::NotRegistered, _) => "このGoogleアカウントは登録されていません。新規登録タブをお使いください。",
            (_, AuthMode::Register) => "新規登録に失敗しました。もう一度お試しください。",
            (_, AuthMode::Login) => "ログインに失敗しました。もう一度お試しください。",
        }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
