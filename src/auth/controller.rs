//! Auth session controller: reconciles the session cookie, the identity
//! provider, and the profile store into one observable runtime state.
//!
//! ARCHITECTURE
//! ============
//! Two sources race at startup. The cookie answers synchronously ("was
//! someone here recently?"); the provider answers asynchronously ("who is
//! signed in now?"). The controller serializes them into a small state
//! machine:
//!
//! - Initializing: `loading` is set; only `session_expired` and the cookie
//!   may change.
//! - SignedIn: a notification carried an identity. The cookie is refreshed
//!   and the profile fetched before loading ends.
//! - SignedOut: a notification carried none. Cookie and profile are cleared.
//!
//! Every notification replaces identity and profile together. The provider
//! is the single authority on identity.
//!
//! DESIGN
//! ======
//! Each notification bumps a generation counter. Work started for an older
//! generation is dropped: a notification's own profile fetch is cancelled
//! outright when a newer one arrives, and `refresh_profile` compares the
//! generation and uid it was issued for before publishing.
//!
//! The subscription runs on a spawned task that is aborted on drop or
//! `shutdown()`, after which the published state never changes again.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::provider::{Identity, IdentityProvider};
use crate::services::profile::{ProfileGate, UserProfile};
use crate::services::session::SessionCache;

/// Snapshot published to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRuntimeState {
    pub identity: Option<Identity>,
    pub profile: Option<UserProfile>,
    pub loading: bool,
    pub session_expired: bool,
}

impl Default for AuthRuntimeState {
    fn default() -> Self {
        Self { identity: None, profile: None, loading: true, session_expired: false }
    }
}

struct Inner {
    state: watch::Sender<AuthRuntimeState>,
    cache: SessionCache,
    gate: ProfileGate,
    generation: AtomicU64,
}

pub struct AuthController {
    inner: Arc<Inner>,
    task: JoinHandle<()>,
}

impl AuthController {
    /// Run the initializing step against the cookie, then subscribe to the
    /// provider. Must be called inside a Tokio runtime.
    #[must_use]
    pub fn start(cache: SessionCache, provider: &dyn IdentityProvider, gate: ProfileGate) -> Self {
        let mut initial = AuthRuntimeState::default();
        let had_record = cache.peek();
        if !cache.is_valid() {
            if had_record {
                debug!("cached session present but no longer valid");
                initial.session_expired = true;
            }
            cache.clear();
        }

        let (state, _) = watch::channel(initial);
        let inner = Arc::new(Inner { state, cache, gate, generation: AtomicU64::new(0) });

        let notifications = provider.subscribe();
        let task = tokio::spawn(Arc::clone(&inner).run(notifications));
        Self { inner, task }
    }

    /// Observe state changes. The receiver closes once the controller is gone.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthRuntimeState> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> AuthRuntimeState {
        self.inner.state.borrow().clone()
    }

    /// Wait for the first provider notification to be fully applied.
    pub async fn resolved(&self) -> AuthRuntimeState {
        let mut rx = self.subscribe();
        match rx.wait_for(|s| !s.loading).await {
            Ok(state) => (*state).clone(),
            Err(_) => self.snapshot(),
        }
    }

    /// Re-read the profile of whoever is signed in now. A no-op when signed
    /// out. Failures are logged and the previous profile is kept.
    pub async fn refresh_profile(&self) {
        let issued_at = self.inner.generation.load(Ordering::SeqCst);
        let Some(uid) = self.inner.state.borrow().identity.as_ref().map(|i| i.uid.clone()) else {
            return;
        };

        let profile = match self.inner.gate.get_profile(&uid).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(%uid, error = %e, "profile refresh failed");
                return;
            }
        };

        if self.inner.generation.load(Ordering::SeqCst) != issued_at {
            debug!(%uid, "discarding profile refresh from superseded sign-in");
            return;
        }
        self.inner.state.send_if_modified(|s| {
            if s.identity.as_ref().is_some_and(|i| i.uid == uid) {
                s.profile = profile;
                true
            } else {
                false
            }
        });
    }

    /// Stop reacting to provider notifications.
    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Drop for AuthController {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl Inner {
    async fn run(self: Arc<Self>, mut notifications: watch::Receiver<Option<Identity>>) {
        loop {
            let identity = notifications.borrow_and_update().clone();
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

            tokio::select! {
                () = self.apply(generation, identity) => {}
                Ok(()) = notifications.changed() => {
                    debug!(generation, "notification superseded before it was applied");
                    continue;
                }
            }

            if notifications.changed().await.is_err() {
                return;
            }
        }
    }

    async fn apply(&self, generation: u64, identity: Option<Identity>) {
        let Some(identity) = identity else {
            self.cache.clear();
            self.state.send_modify(|s| {
                s.identity = None;
                s.profile = None;
                s.loading = false;
            });
            return;
        };

        self.cache.save(&identity);
        let profile = match self.gate.get_profile(&identity.uid).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(uid = %identity.uid, error = %e, "profile fetch failed");
                None
            }
        };

        if self.generation.load(Ordering::SeqCst) != generation {
            return;
        }
        self.state.send_modify(|s| {
            s.identity = Some(identity);
            s.profile = profile;
            s.loading = false;
            s.session_expired = false;
        });
    }
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;
