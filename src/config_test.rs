use super::*;
use std::collections::HashMap;

fn config(pairs: &[(&str, &str)]) -> AppConfig {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
    AppConfig::from_lookup(|key| map.get(key).cloned())
}

// =============================================================================
// defaults
// =============================================================================

#[test]
fn defaults_when_nothing_set() {
    let cfg = config(&[]);
    assert_eq!(cfg.port, 3000);
    assert!(!cfg.production);
    assert!(cfg.database_url.is_none());
    assert!(!cfg.cookie_secure);
    assert_eq!(cfg.session_ttl, Duration::minutes(30));
    assert_eq!(cfg.session_warning, Duration::minutes(5));
    assert!(cfg.google_client_id.is_none());
    assert_eq!(cfg.public_paths, vec!["/login".to_owned()]);
    assert_eq!(cfg.web_dir, "web");
}

#[test]
fn default_impl_matches_empty_lookup() {
    assert_eq!(AppConfig::default(), config(&[]));
}

// =============================================================================
// cookie security
// =============================================================================

#[test]
fn production_env_makes_cookies_secure() {
    assert!(config(&[("APP_ENV", "production")]).cookie_secure);
    assert!(config(&[("APP_ENV", " Production ")]).cookie_secure);
    assert!(!config(&[("APP_ENV", "development")]).cookie_secure);
}

#[test]
fn cookie_secure_override_wins() {
    assert!(!config(&[("APP_ENV", "production"), ("COOKIE_SECURE", "false")]).cookie_secure);
    assert!(config(&[("COOKIE_SECURE", "yes")]).cookie_secure);
}

#[test]
fn cookie_secure_invalid_falls_back_to_env() {
    assert!(config(&[("APP_ENV", "production"), ("COOKIE_SECURE", "maybe")]).cookie_secure);
}

// =============================================================================
// validation
// =============================================================================

#[test]
fn production_requires_google_client_id() {
    let cfg = config(&[("APP_ENV", "production")]);
    assert!(cfg.production);
    assert_eq!(cfg.validate(), Err(ConfigError::MissingGoogleClientId));
}

#[test]
fn production_with_client_id_is_valid() {
    let cfg = config(&[("APP_ENV", "production"), ("GOOGLE_CLIENT_ID", "abc.apps.googleusercontent.com")]);
    assert_eq!(cfg.validate(), Ok(()));
}

#[test]
fn development_without_client_id_is_valid() {
    assert_eq!(config(&[]).validate(), Ok(()));
    assert_eq!(config(&[("APP_ENV", "development")]).validate(), Ok(()));
}

// =============================================================================
// parsing
// =============================================================================

#[test]
fn parse_bool_variants() {
    for raw in ["1", "true", "YES", " on "] {
        assert_eq!(parse_bool(raw), Some(true), "expected true for {raw:?}");
    }
    for raw in ["0", "false", "No", "off"] {
        assert_eq!(parse_bool(raw), Some(false), "expected false for {raw:?}");
    }
    assert_eq!(parse_bool(""), None);
    assert_eq!(parse_bool("maybe"), None);
}

#[test]
fn session_ttl_parsed_and_clamped() {
    assert_eq!(config(&[("SESSION_TTL_MINUTES", "180")]).session_ttl, Duration::hours(3));
    assert_eq!(config(&[("SESSION_TTL_MINUTES", "0")]).session_ttl, Duration::minutes(1));
    assert_eq!(config(&[("SESSION_TTL_MINUTES", "soon")]).session_ttl, Duration::minutes(30));
}

#[test]
fn invalid_port_uses_default() {
    assert_eq!(config(&[("PORT", "http")]).port, 3000);
    assert_eq!(config(&[("PORT", "8080")]).port, 8080);
}

#[test]
fn blank_optional_values_are_none() {
    let cfg = config(&[("DATABASE_URL", "  "), ("GOOGLE_CLIENT_ID", "")]);
    assert!(cfg.database_url.is_none());
    assert!(cfg.google_client_id.is_none());
}

#[test]
fn public_paths_split_and_filtered() {
    let cfg = config(&[("PUBLIC_PATHS", "/login, /about,relative,")]);
    assert_eq!(cfg.public_paths, vec!["/login".to_owned(), "/about".to_owned()]);
}
