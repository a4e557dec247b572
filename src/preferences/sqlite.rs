use async_trait::async_trait;
use serde_json::Value;
use sqlx::{migrate::MigrateDatabase, Row, SqlitePool};
use tracing::info;

use super::{
    empty_preference, ensure_object, PreferenceError, PreferenceStore, UserPreference,
    UserPreferenceDomain,
};

/// Preference store persisted in SQLite
pub struct SqlitePreferenceStore {
    pool: SqlitePool,
}

impl SqlitePreferenceStore {
    /// Open (and create if needed) the database, optionally running migrations
    pub async fn connect(database_url: &str, auto_migrate: bool) -> Result<Self, PreferenceError> {
        if !sqlx::Sqlite::database_exists(database_url).await? {
            info!("Creating database at {}", database_url);
            sqlx::Sqlite::create_database(database_url).await?;
        }

        let pool = SqlitePool::connect(database_url).await?;

        if auto_migrate {
            info!("Running database migrations...");
            sqlx::migrate!("./migrations").run(&pool).await?;
            info!("Database migrations completed");
        }

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close database connections gracefully
    pub async fn shutdown(&self) {
        info!("Shutting down database connections...");
        self.pool.close().await;
        info!("Database connections closed");
    }
}

#[async_trait]
impl PreferenceStore for SqlitePreferenceStore {
    async fn get_preferences(
        &self,
        domain: UserPreferenceDomain,
        user_name: &str,
    ) -> Result<UserPreference, PreferenceError> {
        let row = sqlx::query(
            r#"
            SELECT preferences
            FROM user_preference
            WHERE domain = ?1 AND user_name = ?2
            "#,
        )
        .bind(domain.as_str())
        .bind(user_name)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let raw: String = row.get("preferences");
                Ok(UserPreference {
                    user_name: user_name.to_string(),
                    domain,
                    preferences: serde_json::from_str::<Value>(&raw)?,
                })
            }
            None => Ok(empty_preference(domain, user_name)),
        }
    }

    async fn update_preferences(
        &self,
        domain: UserPreferenceDomain,
        user_name: &str,
        preferences: Value,
    ) -> Result<(), PreferenceError> {
        ensure_object(&preferences)?;

        sqlx::query(
            r#"
            INSERT INTO user_preference (domain, user_name, preferences, updated_at)
            VALUES (?1, ?2, ?3, datetime('now'))
            ON CONFLICT (domain, user_name)
            DO UPDATE SET preferences = excluded.preferences, updated_at = excluded.updated_at
            "#,
        )
        .bind(domain.as_str())
        .bind(user_name)
        .bind(preferences.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
