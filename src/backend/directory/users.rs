/**
 * User Directory
 *
 * Read access to users owned by the account system, plus the one write the
 * chat core performs: recording a push identifier on an existing user.
 */

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::backend::error::{BackendError, BackendResult};
use crate::backend::notifications::provider::PushProviderKind;
use crate::shared::messaging::SenderProfile;

/// A device address on one push channel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PushIdentifier {
    pub provider: PushProviderKind,
    pub identifier: String,
}

impl PushIdentifier {
    pub fn new(provider: PushProviderKind, identifier: impl Into<String>) -> Self {
        Self {
            provider,
            identifier: identifier.into(),
        }
    }
}

/// A user as seen by the chat core
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub avatar_url: String,
    pub push_identifiers: Vec<PushIdentifier>,
}

impl UserRecord {
    pub fn profile(&self) -> SenderProfile {
        SenderProfile {
            id: self.id,
            username: self.username.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }

    /// Identifiers registered for one provider
    pub fn identifiers_for(&self, provider: PushProviderKind) -> impl Iterator<Item = &str> {
        self.push_identifiers
            .iter()
            .filter(move |id| id.provider == provider)
            .map(|id| id.identifier.as_str())
    }
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Users with the given IDs; unknown IDs are skipped
    async fn find_by_ids(&self, ids: &[Uuid]) -> BackendResult<Vec<UserRecord>>;

    /// Record a push identifier. Returns `false` when it was already known.
    async fn register_push_identifier(&self, user_id: Uuid, identifier: PushIdentifier) -> BackendResult<bool>;

    async fn find_by_id(&self, id: Uuid) -> BackendResult<Option<UserRecord>> {
        Ok(self.find_by_ids(&[id]).await?.into_iter().next())
    }
}

/// `UserDirectory` over the `users` and `push_identifiers` tables
#[derive(Clone)]
pub struct SqlUserDirectory {
    pool: SqlitePool,
}

impl SqlUserDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for SqlUserDirectory {
    async fn find_by_ids(&self, ids: &[Uuid]) -> BackendResult<Vec<UserRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut users_query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT id, username, avatar_url FROM users WHERE id IN (");
        let mut separated = users_query.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");
        let user_rows = users_query.build().fetch_all(&self.pool).await?;

        let mut ident_query: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT user_id, provider, identifier FROM push_identifiers WHERE user_id IN (",
        );
        let mut separated = ident_query.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY rowid");
        let ident_rows = ident_query.build().fetch_all(&self.pool).await?;

        let mut identifiers: HashMap<Uuid, Vec<PushIdentifier>> = HashMap::new();
        for row in ident_rows {
            let provider: String = row.try_get("provider")?;
            let Ok(provider) = provider.parse::<PushProviderKind>() else {
                tracing::warn!("[Notifications] Ignoring identifier with unknown provider '{}'", provider);
                continue;
            };
            identifiers
                .entry(row.try_get("user_id")?)
                .or_default()
                .push(PushIdentifier::new(provider, row.try_get::<String, _>("identifier")?));
        }

        user_rows
            .iter()
            .map(|row| -> BackendResult<UserRecord> {
                let id: Uuid = row.try_get("id")?;
                Ok(UserRecord {
                    id,
                    username: row.try_get("username")?,
                    avatar_url: row.try_get("avatar_url")?,
                    push_identifiers: identifiers.remove(&id).unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn register_push_identifier(&self, user_id: Uuid, identifier: PushIdentifier) -> BackendResult<bool> {
        let value = identifier.identifier.trim();
        if value.is_empty() {
            return Err(BackendError::validation("Push identifier is required"));
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            return Err(BackendError::not_found("User not found"));
        }

        let added = sqlx::query(
            "INSERT OR IGNORE INTO push_identifiers (user_id, provider, identifier) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(identifier.provider.as_str())
        .bind(value)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if added == 1 {
            tracing::info!("[Notifications] Registered {} identifier for user {}", identifier.provider, user_id);
        }
        Ok(added == 1)
    }
}
