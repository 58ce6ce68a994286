//! Identity provider seam and the per-browser provider sessions.
//!
//! ARCHITECTURE
//! ============
//! The provider owns who is signed in. Consumers never ask it directly; they
//! `subscribe()` and receive the current identity immediately, then again on
//! every sign-in or sign-out. Dropping the receiver is the unsubscribe.
//!
//! Each browser gets its own `ProviderSession`, found again on later requests
//! through an opaque token cookie. This mirrors the hosted provider keeping
//! its own persisted sign-in next to (and independent of) the app's cached
//! session cookie.

use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};
use time::Duration;
use tokio::sync::{RwLock, watch};
use tracing::debug;

use super::google::TokenVerifier;
use crate::clock::Clock;

/// Authenticated principal as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("sign-in was cancelled before completing")]
    PopupClosed,
    #[error("unauthorized auth domain: {0}")]
    UnauthorizedDomain(String),
    #[error("invalid credential: {0}")]
    InvalidCredential(String),
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Stream of identity changes. The current value is available right away.
    fn subscribe(&self) -> watch::Receiver<Option<Identity>>;

    /// Run the interactive sign-in with a credential obtained by the client.
    async fn sign_in_interactive(&self, credential: &str) -> Result<Identity, ProviderError>;

    async fn sign_out(&self) -> Result<(), ProviderError>;
}

// =============================================================================
// PROVIDER SESSION
// =============================================================================

/// One browser's sign-in with the identity provider.
pub struct ProviderSession {
    verifier: Arc<dyn TokenVerifier>,
    identity: watch::Sender<Option<Identity>>,
}

impl ProviderSession {
    #[must_use]
    pub fn new(verifier: Arc<dyn TokenVerifier>) -> Self {
        let (identity, _) = watch::channel(None);
        Self { verifier, identity }
    }

    /// Identity signed in right now, if any.
    #[must_use]
    pub fn current(&self) -> Option<Identity> {
        self.identity.borrow().clone()
    }
}

#[async_trait::async_trait]
impl IdentityProvider for ProviderSession {
    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.identity.subscribe()
    }

    async fn sign_in_interactive(&self, credential: &str) -> Result<Identity, ProviderError> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(ProviderError::PopupClosed);
        }
        let identity = self.verifier.verify(credential).await?;
        self.identity.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.identity.send_replace(None);
        Ok(())
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate a cryptographically random 32-byte hex token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

/// Lifetime of an unused provider session, matching its browser cookie.
pub const PROVIDER_SESSION_DAYS: i64 = 30;

struct Entry {
    session: Arc<ProviderSession>,
    /// Last time a browser presented the token, Unix epoch milliseconds.
    last_seen: i64,
}

/// Provider sessions keyed by browser token.
///
/// Entries nobody has presented for longer than the idle limit are swept
/// whenever a new session is opened; their cookie has lapsed by then.
#[derive(Clone)]
pub struct ProviderRegistry {
    verifier: Arc<dyn TokenVerifier>,
    clock: Arc<dyn Clock>,
    idle_limit: Duration,
    sessions: Arc<RwLock<HashMap<String, Entry>>>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new(verifier: Arc<dyn TokenVerifier>, clock: Arc<dyn Clock>, idle_limit: Duration) -> Self {
        Self { verifier, clock, idle_limit, sessions: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Look up the session a browser token points at, marking it as seen.
    pub async fn lookup(&self, token: &str) -> Option<Arc<ProviderSession>> {
        let now = self.clock.now_millis();
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(token)?;
        if self.is_idle(entry, now) {
            sessions.remove(token);
            return None;
        }
        entry.last_seen = now;
        Some(Arc::clone(&entry.session))
    }

    /// A signed-out session that is not registered under any token. Used for
    /// browsers that never signed in, so anonymous traffic leaves no state.
    #[must_use]
    pub fn detached(&self) -> Arc<ProviderSession> {
        Arc::new(ProviderSession::new(Arc::clone(&self.verifier)))
    }

    /// Register a fresh session and return its token.
    pub async fn open(&self) -> (String, Arc<ProviderSession>) {
        self.evict_idle().await;
        let token = generate_token();
        let session = self.detached();
        let entry = Entry { session: Arc::clone(&session), last_seen: self.clock.now_millis() };
        self.sessions.write().await.insert(token.clone(), entry);
        (token, session)
    }

    /// Forget a session. Unknown tokens are ignored.
    pub async fn close(&self, token: &str) {
        self.sessions.write().await.remove(token);
    }

    /// Drop sessions idle past the limit. Returns how many were removed.
    pub async fn evict_idle(&self) -> usize {
        let now = self.clock.now_millis();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| !self.is_idle(entry, now));
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(evicted, "evicted idle provider sessions");
        }
        evicted
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    fn is_idle(&self, entry: &Entry, now: i64) -> bool {
        let limit = i64::try_from(self.idle_limit.whole_milliseconds()).unwrap_or(i64::MAX);
        now.saturating_sub(entry.last_seen) > limit
    }
}

#[cfg(test)]
#[path = "provider_test.rs"]
mod tests;
