//! User preferences (e.g. GUI dashboard settings) keyed by domain and user name

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

#[cfg(feature = "database")]
pub mod sqlite;

#[cfg(feature = "database")]
pub use sqlite::SqlitePreferenceStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserPreferenceDomain {
    Dashboard,
    NwDashboard,
}

impl UserPreferenceDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserPreferenceDomain::Dashboard => "DASHBOARD",
            UserPreferenceDomain::NwDashboard => "NW_DASHBOARD",
        }
    }
}

impl fmt::Display for UserPreferenceDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserPreferenceDomain {
    type Err = PreferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DASHBOARD" => Ok(UserPreferenceDomain::Dashboard),
            "NW_DASHBOARD" => Ok(UserPreferenceDomain::NwDashboard),
            _ => Err(PreferenceError::UnknownDomain(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreference {
    pub user_name: String,
    pub domain: UserPreferenceDomain,
    pub preferences: Value,
}

#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("unknown preference domain: {0}")]
    UnknownDomain(String),
    #[error("preferences must be a JSON object")]
    NotAnObject,
    #[error("stored preferences are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[cfg(feature = "database")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[cfg(feature = "database")]
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Stored preferences, or an empty object when the user has none yet
    async fn get_preferences(
        &self,
        domain: UserPreferenceDomain,
        user_name: &str,
    ) -> Result<UserPreference, PreferenceError>;

    /// Create or replace the preferences of one user in one domain
    async fn update_preferences(
        &self,
        domain: UserPreferenceDomain,
        user_name: &str,
        preferences: Value,
    ) -> Result<(), PreferenceError>;
}

pub(crate) fn ensure_object(preferences: &Value) -> Result<(), PreferenceError> {
    if preferences.is_object() {
        Ok(())
    } else {
        Err(PreferenceError::NotAnObject)
    }
}

pub(crate) fn empty_preference(domain: UserPreferenceDomain, user_name: &str) -> UserPreference {
    UserPreference {
        user_name: user_name.to_string(),
        domain,
        preferences: json!({}),
    }
}

/// Process-local store, used when the `database` feature is off
#[derive(Debug, Clone, Default)]
pub struct InMemoryPreferenceStore {
    entries: Arc<RwLock<HashMap<(UserPreferenceDomain, String), Value>>>,
}

impl InMemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferenceStore for InMemoryPreferenceStore {
    async fn get_preferences(
        &self,
        domain: UserPreferenceDomain,
        user_name: &str,
    ) -> Result<UserPreference, PreferenceError> {
        let entries = self.entries.read().await;
        Ok(match entries.get(&(domain, user_name.to_string())) {
            Some(preferences) => UserPreference {
                user_name: user_name.to_string(),
                domain,
                preferences: preferences.clone(),
            },
            None => empty_preference(domain, user_name),
        })
    }

    async fn update_preferences(
        &self,
        domain: UserPreferenceDomain,
        user_name: &str,
        preferences: Value,
    ) -> Result<(), PreferenceError> {
        ensure_object(&preferences)?;
        self.entries
            .write()
            .await
            .insert((domain, user_name.to_string()), preferences);
        Ok(())
    }
}
