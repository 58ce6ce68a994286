//! Profile gate: the application's own user records, keyed by provider uid.
//!
//! DESIGN
//! ======
//! Registration and login are separate entry points. `register_new` refuses
//! an identity that already has a profile and `login_existing` refuses one
//! that does not, so the sign-in page can steer people to the right tab
//! instead of silently creating accounts.
//!
//! The existence check before create is advisory. The store's conditional
//! create is what guarantees one profile per uid when two registrations race.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use time::OffsetDateTime;
use tracing::info;

use crate::auth::Identity;
use crate::clock::Clock;
use crate::store::{DocumentStore, FieldValue, Fields, StoreError};

pub const USERS_COLLECTION: &str = "users";

pub const MIN_YEAR: i32 = 2000;
pub const MAX_YEAR: i32 = 2050;

/// Application-owned user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    pub gmail: String,
    pub name: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_examiner: bool,
    #[serde(default)]
    pub is_graduated: bool,
    pub year: i32,
    #[serde(rename = "photoURL", default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_login_at: OffsetDateTime,
}

/// Editable profile fields. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gmail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_examiner: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_graduated: Option<bool>,
}

impl ProfileUpdate {
    /// Trim the name and check bounds.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank name or a year outside 2000..=2050.
    pub fn normalized(mut self) -> Result<Self, ProfileError> {
        if let Some(name) = self.name.take() {
            let name = name.trim();
            if name.is_empty() {
                return Err(ProfileError::Validation("name must not be empty".into()));
            }
            self.name = Some(name.to_owned());
        }
        if let Some(year) = self.year {
            if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
                return Err(ProfileError::Validation(format!("year must be between {MIN_YEAR} and {MAX_YEAR}")));
            }
        }
        Ok(self)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("{0}")]
    Validation(String),
    #[error("user is already registered")]
    AlreadyRegistered,
    #[error("user is not registered")]
    NotRegistered,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct ProfileGate {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

impl ProfileGate {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// # Errors
    ///
    /// Surfaces store failures.
    pub async fn check_exists(&self, uid: &str) -> Result<bool, ProfileError> {
        Ok(self.store.get_document(USERS_COLLECTION, uid).await?.is_some())
    }

    /// Create the profile for a first-time identity.
    ///
    /// # Errors
    ///
    /// `Validation` without an email, `AlreadyRegistered` when a profile
    /// exists (including one created concurrently), `Store` otherwise.
    pub async fn register_new(&self, identity: &Identity) -> Result<(), ProfileError> {
        let email = require_email(identity)?;
        if self.check_exists(&identity.uid).await? {
            return Err(ProfileError::AlreadyRegistered);
        }

        let mut fields = Fields::new();
        fields.insert("gmail".into(), json!(email).into());
        fields.insert("name".into(), json!(default_name(identity)).into());
        fields.insert("isAdmin".into(), json!(false).into());
        fields.insert("isExaminer".into(), json!(false).into());
        fields.insert("isGraduated".into(), json!(false).into());
        fields.insert("year".into(), json!(self.clock.now().year()).into());
        if let Some(photo) = &identity.photo_url {
            fields.insert("photoURL".into(), json!(photo).into());
        }
        for stamp in ["createdAt", "updatedAt", "lastLoginAt"] {
            fields.insert(stamp.into(), FieldValue::ServerTimestamp);
        }

        match self.store.create_document(USERS_COLLECTION, &identity.uid, fields).await {
            Ok(()) => {}
            Err(StoreError::AlreadyExists { .. }) => return Err(ProfileError::AlreadyRegistered),
            Err(e) => return Err(e.into()),
        }
        info!(uid = %identity.uid, %email, "registered new user");
        Ok(())
    }

    /// Record a login for an identity that already has a profile.
    ///
    /// # Errors
    ///
    /// `Validation` without an email, `NotRegistered` (with no write) when
    /// there is no profile, `Store` otherwise.
    pub async fn login_existing(&self, identity: &Identity) -> Result<(), ProfileError> {
        let email = require_email(identity)?;
        if !self.check_exists(&identity.uid).await? {
            return Err(ProfileError::NotRegistered);
        }

        let mut fields = Fields::new();
        fields.insert("lastLoginAt".into(), FieldValue::ServerTimestamp);
        fields.insert("updatedAt".into(), FieldValue::ServerTimestamp);
        match self.store.patch_document(USERS_COLLECTION, &identity.uid, fields).await {
            Ok(()) => {}
            Err(StoreError::NotFound { .. }) => return Err(ProfileError::NotRegistered),
            Err(e) => return Err(e.into()),
        }
        info!(uid = %identity.uid, %email, "recorded login");
        Ok(())
    }

    /// # Errors
    ///
    /// Surfaces store failures and undecodable documents.
    pub async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>, ProfileError> {
        let Some(mut doc) = self.store.get_document(USERS_COLLECTION, uid).await? else {
            return Ok(None);
        };
        doc.insert("uid".into(), Value::String(uid.to_owned()));
        let profile = serde_json::from_value(Value::Object(doc)).map_err(StoreError::from)?;
        Ok(Some(profile))
    }

    /// Apply an edit and bump `updatedAt`. `uid` and `createdAt` are never
    /// written.
    ///
    /// # Errors
    ///
    /// `Validation` for out-of-range values, `Store` (including `NotFound`)
    /// otherwise.
    pub async fn update_profile(&self, uid: &str, update: ProfileUpdate) -> Result<(), ProfileError> {
        let update = update.normalized()?;
        let mut fields = Fields::new();
        if let Value::Object(map) = serde_json::to_value(&update).map_err(StoreError::from)? {
            for (key, value) in map {
                fields.insert(key, value.into());
            }
        }
        fields.insert("updatedAt".into(), FieldValue::ServerTimestamp);
        self.store.patch_document(USERS_COLLECTION, uid, fields).await?;
        info!(%uid, "profile updated");
        Ok(())
    }
}

fn require_email(identity: &Identity) -> Result<&str, ProfileError> {
    identity
        .email
        .as_deref()
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| ProfileError::Validation("could not read the account's email address".into()))
}

/// Display name, else the email's local part, else a placeholder.
fn default_name(identity: &Identity) -> String {
    identity
        .display_name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .or_else(|| {
            identity
                .email
                .as_deref()
                .and_then(|e| e.split('@').next())
                .filter(|local| !local.is_empty())
        })
        .unwrap_or("Unknown User")
        .to_owned()
}

#[cfg(test)]
#[path = "profile_test.rs"]
mod tests;
