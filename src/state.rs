//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It is the explicitly constructed context every request-scoped piece is
//! built from: the document store, the registry of provider sessions, the
//! clock, and the route guard. Nothing lives in module-level globals.

use std::sync::Arc;

use crate::auth::provider::PROVIDER_SESSION_DAYS;
use crate::auth::{ProviderRegistry, TokenVerifier};
use crate::clock::Clock;
use crate::config::AppConfig;
use crate::guard::RouteGuard;
use crate::services::profile::ProfileGate;
use crate::services::session::SessionConfig;
use crate::store::DocumentStore;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DocumentStore>,
    pub providers: ProviderRegistry,
    pub clock: Arc<dyn Clock>,
    pub guard: RouteGuard,
}

impl AppState {
    #[must_use]
    pub fn new(
        config: AppConfig,
        store: Arc<dyn DocumentStore>,
        verifier: Arc<dyn TokenVerifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let guard = RouteGuard::new(config.public_paths.clone());
        let providers = ProviderRegistry::new(
            verifier,
            Arc::clone(&clock),
            time::Duration::days(PROVIDER_SESSION_DAYS),
        );
        Self { config: Arc::new(config), store, providers, clock, guard }
    }

    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            ttl: self.config.session_ttl,
            warning: self.config.session_warning,
            secure: self.config.cookie_secure,
        }
    }

    #[must_use]
    pub fn profiles(&self) -> ProfileGate {
        ProfileGate::new(Arc::clone(&self.store), Arc::clone(&self.clock))
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
