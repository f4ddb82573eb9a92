/**
 * Project Directory
 *
 * Read-only view of projects: name, owner and members. Used to authorize
 * access to a project's chat room.
 */

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::backend::error::BackendResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRecord {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub member_ids: Vec<Uuid>,
}

impl ProjectRecord {
    /// Owner or member
    pub fn has_access(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id || self.member_ids.contains(&user_id)
    }
}

#[async_trait]
pub trait ProjectDirectory: Send + Sync {
    async fn find_project(&self, project_id: Uuid) -> BackendResult<Option<ProjectRecord>>;
}

/// `ProjectDirectory` over the `projects` and `project_members` tables
#[derive(Clone)]
pub struct SqlProjectDirectory {
    pool: SqlitePool,
}

impl SqlProjectDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectDirectory for SqlProjectDirectory {
    async fn find_project(&self, project_id: Uuid) -> BackendResult<Option<ProjectRecord>> {
        let Some(row) = sqlx::query("SELECT id, name, owner_id FROM projects WHERE id = ?")
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let member_ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT user_id FROM project_members WHERE project_id = ? ORDER BY rowid")
                .bind(project_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(Some(ProjectRecord {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            owner_id: row.try_get("owner_id")?,
            member_ids,
        }))
    }
}
