//! Application configuration parsed from environment variables.
//!
//! Parsing goes through a lookup closure so tests can feed a map instead of
//! mutating the process environment.

use time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 30;
pub const DEFAULT_SESSION_WARNING_MINUTES: i64 = 5;
pub const DEFAULT_PUBLIC_PATHS: &str = "/login";
pub const DEFAULT_WEB_DIR: &str = "web";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    /// `APP_ENV=production`.
    pub production: bool,
    /// Postgres URL. `None` runs on the in-memory store.
    pub database_url: Option<String>,
    /// Whether cookies carry the `Secure` attribute.
    pub cookie_secure: bool,
    pub session_ttl: Duration,
    /// Remaining-time threshold under which the session counts as expiring soon.
    pub session_warning: Duration,
    /// Google OAuth client id. `None` accepts development credentials.
    pub google_client_id: Option<String>,
    /// Pages reachable without a session.
    pub public_paths: Vec<String>,
    /// Directory of static page assets served behind the route guard.
    pub web_dir: String,
}

impl AppConfig {
    /// Build config from the process environment (after loading `.env`).
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `DATABASE_URL`: in-memory store when absent
    /// - `APP_ENV`: `production` turns on secure cookies
    /// - `COOKIE_SECURE`: explicit override of the above
    /// - `SESSION_TTL_MINUTES`: default 30
    /// - `SESSION_WARNING_MINUTES`: default 5
    /// - `GOOGLE_CLIENT_ID`: development credentials when absent; required
    ///   in production
    /// - `PUBLIC_PATHS`: comma-separated, default `/login`
    /// - `WEB_DIR`: default `web`
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let production = lookup("APP_ENV").is_some_and(|v| v.trim().eq_ignore_ascii_case("production"));
        let cookie_secure = lookup("COOKIE_SECURE")
            .as_deref()
            .and_then(parse_bool)
            .unwrap_or(production);

        let ttl_minutes = parse_or(lookup("SESSION_TTL_MINUTES"), DEFAULT_SESSION_TTL_MINUTES).max(1);
        let warning_minutes = parse_or(lookup("SESSION_WARNING_MINUTES"), DEFAULT_SESSION_WARNING_MINUTES).max(0);

        Self {
            port: parse_or(lookup("PORT"), DEFAULT_PORT),
            production,
            database_url: lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()),
            cookie_secure,
            session_ttl: Duration::minutes(ttl_minutes),
            session_warning: Duration::minutes(warning_minutes),
            google_client_id: lookup("GOOGLE_CLIENT_ID").filter(|v| !v.trim().is_empty()),
            public_paths: parse_paths(lookup("PUBLIC_PATHS").as_deref().unwrap_or(DEFAULT_PUBLIC_PATHS)),
            web_dir: lookup("WEB_DIR").unwrap_or_else(|| DEFAULT_WEB_DIR.to_owned()),
        }
    }
}

impl AppConfig {
    /// Check settings that cannot be defaulted safely.
    ///
    /// # Errors
    ///
    /// `MissingGoogleClientId` in production without `GOOGLE_CLIENT_ID`:
    /// the development verifier would accept any email address.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.production && self.google_client_id.is_none() {
            return Err(ConfigError::MissingGoogleClientId);
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("GOOGLE_CLIENT_ID is required when APP_ENV=production")]
    MissingGoogleClientId,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.trim().parse::<T>().ok()).unwrap_or(default)
}

fn parse_paths(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| p.starts_with('/'))
        .map(str::to_owned)
        .collect()
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    parse_or(std::env::var(key).ok(), default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
