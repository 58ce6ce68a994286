//! Google ID-token verification.
//!
//! The browser completes the Google popup and posts the resulting ID token;
//! the verifier turns it into an `Identity`. `GoogleVerifier` asks Google's
//! `tokeninfo` endpoint. `DevVerifier` accepts a bare email address so the
//! server can run locally without Google credentials.

use std::time::Duration;

use serde::Deserialize;

use super::provider::{Identity, ProviderError};

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
const REQUEST_TIMEOUT_SECS: u64 = 10;
const CONNECT_TIMEOUT_SECS: u64 = 5;

#[async_trait::async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<Identity, ProviderError>;
}

// =============================================================================
// GOOGLE
// =============================================================================

/// Claims returned by `tokeninfo`. Booleans arrive as strings.
#[derive(Debug, Deserialize)]
pub struct TokenInfo {
    pub aud: String,
    pub sub: String,
    pub email: Option<String>,
    pub email_verified: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

pub struct GoogleVerifier {
    http: reqwest::Client,
    client_id: String,
    tokeninfo_url: String,
}

impl GoogleVerifier {
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(client_id: String) -> Result<Self, ProviderError> {
        Self::with_endpoint(client_id, TOKENINFO_URL.to_owned())
    }

    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn with_endpoint(client_id: String, tokeninfo_url: String) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
        Ok(Self { http, client_id, tokeninfo_url })
    }
}

#[async_trait::async_trait]
impl TokenVerifier for GoogleVerifier {
    async fn verify(&self, credential: &str) -> Result<Identity, ProviderError> {
        let response = self
            .http
            .get(&self.tokeninfo_url)
            .query(&[("id_token", credential)])
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
        if !status.is_success() {
            return Err(ProviderError::InvalidCredential(format!("{status}: {body}")));
        }

        let info: TokenInfo = serde_json::from_str(&body)
            .map_err(|_| ProviderError::InvalidCredential(format!("unexpected tokeninfo response: {body}")))?;
        identity_from_token_info(&self.client_id, info)
    }
}

/// Check the audience and map verified claims onto an `Identity`.
/// Unverified email addresses are dropped.
pub fn identity_from_token_info(client_id: &str, info: TokenInfo) -> Result<Identity, ProviderError> {
    if info.aud != client_id {
        return Err(ProviderError::UnauthorizedDomain(info.aud));
    }
    let verified = info.email_verified.as_deref() == Some("true");
    Ok(Identity {
        uid: info.sub,
        email: info.email.filter(|_| verified),
        display_name: info.name,
        photo_url: info.picture,
    })
}

// =============================================================================
// DEVELOPMENT
// =============================================================================

/// Accepts an email address as the credential. Local development only.
pub struct DevVerifier;

#[async_trait::async_trait]
impl TokenVerifier for DevVerifier {
    async fn verify(&self, credential: &str) -> Result<Identity, ProviderError> {
        let email = normalize_email(credential)
            .ok_or_else(|| ProviderError::InvalidCredential("expected an email address".into()))?;
        Ok(Identity {
            uid: format!("dev-{}", email.replace(['@', '.'], "-")),
            display_name: Some(name_from_email(&email)),
            email: Some(email),
            photo_url: None,
        })
    }
}

#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    let parts = normalized.split('@').collect::<Vec<_>>();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return None;
    }
    Some(normalized)
}

/// Local part of an email address, or `"user"` when there is none.
#[must_use]
pub fn name_from_email(email: &str) -> String {
    email
        .split('@')
        .next()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or("user")
        .to_owned()
}

#[cfg(test)]
#[path = "google_test.rs"]
mod tests;
