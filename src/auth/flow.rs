//! Google sign-in flows driven by the login page's two tabs.
//!
//! A provider sign-in that the profile step refuses is rolled back: the
//! provider session is signed out before the error reaches the caller, so a
//! browser never ends up signed in with Google but without a profile.

use tracing::{info, warn};

use super::provider::{Identity, IdentityProvider};
use super::{AuthError, AuthMode};
use crate::services::profile::ProfileGate;
use crate::services::session::SessionCache;

pub struct AuthFlow<'a> {
    provider: &'a dyn IdentityProvider,
    gate: &'a ProfileGate,
}

impl<'a> AuthFlow<'a> {
    #[must_use]
    pub fn new(provider: &'a dyn IdentityProvider, gate: &'a ProfileGate) -> Self {
        Self { provider, gate }
    }

    /// Sign in an already registered account.
    ///
    /// # Errors
    ///
    /// `Provider` when the sign-in itself fails, `NotRegistered` when there is
    /// no profile, `Validation`/`Store` from the profile step.
    pub async fn sign_in_with_google(&self, credential: &str) -> Result<Identity, AuthError> {
        self.run(credential, AuthMode::Login).await
    }

    /// Sign in and create the profile for a new account.
    ///
    /// # Errors
    ///
    /// As `sign_in_with_google`, with `AlreadyRegistered` in place of
    /// `NotRegistered`.
    pub async fn register_with_google(&self, credential: &str) -> Result<Identity, AuthError> {
        self.run(credential, AuthMode::Register).await
    }

    /// Sign out of the provider and drop the cached session.
    ///
    /// # Errors
    ///
    /// Returns `Provider` if the provider refuses; the cookie is cleared
    /// regardless.
    pub async fn sign_out(&self, cache: &SessionCache) -> Result<(), AuthError> {
        cache.clear();
        self.provider.sign_out().await?;
        Ok(())
    }

    async fn run(&self, credential: &str, mode: AuthMode) -> Result<Identity, AuthError> {
        let identity = self.provider.sign_in_interactive(credential).await?;

        let outcome = match mode {
            AuthMode::Login => self.gate.login_existing(&identity).await,
            AuthMode::Register => self.gate.register_new(&identity).await,
        };
        if let Err(e) = outcome {
            warn!(uid = %identity.uid, ?mode, error = %e, "profile step failed; signing out");
            if let Err(sign_out) = self.provider.sign_out().await {
                warn!(uid = %identity.uid, error = %sign_out, "provider sign-out failed");
            }
            return Err(e.into());
        }

        info!(uid = %identity.uid, ?mode, "google sign-in complete");
        Ok(identity)
    }
}

#[cfg(test)]
#[path = "flow_test.rs"]
mod tests;
