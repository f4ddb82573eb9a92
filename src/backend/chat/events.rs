/**
 * Project Membership Mirroring
 *
 * The project side of the system publishes `ProjectEvent`s on an mpsc
 * channel. A listener task applies them to the room store so that every
 * project has exactly one room whose members follow the project's members.
 *
 * A user added to a project also gets a push ("Added to project: <name>")
 * once the store has been updated. The push runs in its own task and its
 * failures are only logged.
 */

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::backend::chat::db;
use crate::backend::directory::{ProjectDirectory, UserDirectory};
use crate::backend::error::BackendResult;
use crate::backend::notifications::{NotificationService, PushPayload};

/// Body author used when the adding user is unknown
const FALLBACK_ADDER: &str = "Project update";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProjectEvent {
    Created {
        project_id: Uuid,
        owner_id: Uuid,
        name: String,
    },
    MemberAdded {
        project_id: Uuid,
        user_id: Uuid,
        /// Who added the member, shown in the push body
        #[serde(default)]
        added_by: Option<Uuid>,
    },
    MemberRemoved {
        project_id: Uuid,
        user_id: Uuid,
    },
    Renamed {
        project_id: Uuid,
        name: String,
    },
}

impl ProjectEvent {
    pub fn project_id(&self) -> Uuid {
        match self {
            Self::Created { project_id, .. }
            | Self::MemberAdded { project_id, .. }
            | Self::MemberRemoved { project_id, .. }
            | Self::Renamed { project_id, .. } => *project_id,
        }
    }
}

/// Apply one event to the room store.
///
/// Membership events for a project without a room are ignored: the room is
/// created by `Created` or lazily on first access.
pub async fn apply_project_event(pool: &SqlitePool, event: &ProjectEvent) -> BackendResult<()> {
    match event {
        ProjectEvent::Created {
            project_id,
            owner_id,
            name,
        } => {
            let room = db::get_or_create_project_room(pool, *project_id, *owner_id, name).await?;
            tracing::info!("[Chat] Project {} has room {}", project_id, room.id);
        }
        ProjectEvent::MemberAdded { project_id, user_id, .. } => {
            match db::get_room_by_project(pool, *project_id).await? {
                Some(room) => {
                    db::add_member(pool, room.id, *user_id).await?;
                }
                None => tracing::debug!("[Chat] No room yet for project {}", project_id),
            }
        }
        ProjectEvent::MemberRemoved { project_id, user_id } => {
            if let Some(room) = db::get_room_by_project(pool, *project_id).await? {
                db::remove_member(pool, room.id, *user_id).await?;
            }
        }
        ProjectEvent::Renamed { project_id, name } => {
            db::rename_project_room(pool, *project_id, name).await?;
        }
    }
    Ok(())
}

/// Push sent to a user added to a project
pub fn member_added_payload(project_id: Uuid, project_name: &str, adder_name: &str) -> PushPayload {
    PushPayload::new(
        format!("Added to project: {}", project_name),
        format!("You were added by {}", adder_name),
    )
    .with_data("type", "project")
    .with_data("projectId", project_id.to_string())
}

/// Sends the pushes that accompany project events
#[derive(Clone)]
pub struct ProjectNotifier {
    projects: Arc<dyn ProjectDirectory>,
    users: Arc<dyn UserDirectory>,
    notifications: NotificationService,
}

impl ProjectNotifier {
    pub fn new(
        projects: Arc<dyn ProjectDirectory>,
        users: Arc<dyn UserDirectory>,
        notifications: NotificationService,
    ) -> Self {
        Self {
            projects,
            users,
            notifications,
        }
    }

    /// Notify `user_id` that they joined the project
    pub async fn member_added(&self, project_id: Uuid, user_id: Uuid, added_by: Option<Uuid>) -> BackendResult<()> {
        let Some(project) = self.projects.find_project(project_id).await? else {
            tracing::debug!("[Notifications] Unknown project {}, no invite push", project_id);
            return Ok(());
        };

        let adder_name = match added_by {
            Some(adder) => self.users.find_by_id(adder).await?.map(|user| user.username),
            None => None,
        };
        let payload = member_added_payload(
            project.id,
            &project.name,
            adder_name.as_deref().unwrap_or(FALLBACK_ADDER),
        );

        let report = self.notifications.notify(&[user_id], None, &payload).await;
        tracing::debug!(
            "[Notifications] Project invite push for {}: {} delivered, {} failed",
            user_id,
            report.success_count(),
            report.failure_count()
        );
        Ok(())
    }

    fn spawn_for(&self, event: &ProjectEvent) {
        let ProjectEvent::MemberAdded {
            project_id,
            user_id,
            added_by,
        } = *event
        else {
            return;
        };

        let notifier = self.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.member_added(project_id, user_id, added_by).await {
                tracing::warn!("[Notifications] Project invite push for {} failed: {}", user_id, e);
            }
        });
    }
}

/// Consume project events until every sender is dropped.
///
/// A failing event is logged and skipped.
pub fn spawn_project_listener(
    pool: SqlitePool,
    notifier: ProjectNotifier,
    mut events: mpsc::Receiver<ProjectEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match apply_project_event(&pool, &event).await {
                Ok(()) => notifier.spawn_for(&event),
                Err(e) => tracing::warn!(
                    "[Chat] Failed to apply event for project {}: {}",
                    event.project_id(),
                    e
                ),
            }
        }
        tracing::debug!("[Chat] Project event channel closed");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sqlx::sqlite::SqlitePoolOptions;

    use crate::backend::directory::{SqlProjectDirectory, SqlUserDirectory};

    async fn pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!().run(&pool).await.unwrap();
        pool
    }

    fn notifier(pool: &SqlitePool) -> ProjectNotifier {
        let users: Arc<dyn UserDirectory> = Arc::new(SqlUserDirectory::new(pool.clone()));
        ProjectNotifier::new(
            Arc::new(SqlProjectDirectory::new(pool.clone())),
            users.clone(),
            NotificationService::new(users, Vec::new()),
        )
    }

    #[test]
    fn test_member_added_payload() {
        let project_id = Uuid::new_v4();
        let payload = member_added_payload(project_id, "Apollo", "alice");
        assert_eq!(payload.title, "Added to project: Apollo");
        assert_eq!(payload.body, "You were added by alice");
        assert_eq!(payload.data.get("type").map(String::as_str), Some("project"));
        assert_eq!(payload.data.get("projectId"), Some(&project_id.to_string()));
    }

    #[test]
    fn test_member_added_parses_without_adder() {
        let json = format!(
            r#"{{"type":"member_added","project_id":"{}","user_id":"{}"}}"#,
            Uuid::nil(),
            Uuid::nil()
        );
        let event: ProjectEvent = serde_json::from_str(&json).unwrap();
        assert!(matches!(event, ProjectEvent::MemberAdded { added_by: None, .. }));
    }

    #[tokio::test]
    async fn test_events_mirror_project_membership() {
        let pool = pool().await;
        let (project_id, owner, member) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        let events = [
            ProjectEvent::Created {
                project_id,
                owner_id: owner,
                name: "Apollo".into(),
            },
            ProjectEvent::MemberAdded {
                project_id,
                user_id: member,
                added_by: Some(owner),
            },
            ProjectEvent::Renamed {
                project_id,
                name: "Artemis".into(),
            },
        ];
        for event in &events {
            apply_project_event(&pool, event).await.unwrap();
        }

        let room = db::get_room_by_project(&pool, project_id).await.unwrap().unwrap();
        assert_eq!(room.name, "Artemis");
        assert!(room.is_member(owner));
        assert!(room.is_member(member));

        apply_project_event(&pool, &ProjectEvent::MemberRemoved { project_id, user_id: member })
            .await
            .unwrap();
        let room = db::get_room(&pool, room.id).await.unwrap().unwrap();
        assert_eq!(room.member_ids, vec![owner]);
    }

    #[tokio::test]
    async fn test_member_added_without_room_is_ignored() {
        let pool = pool().await;
        let event = ProjectEvent::MemberAdded {
            project_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            added_by: None,
        };
        apply_project_event(&pool, &event).await.unwrap();
    }

    #[tokio::test]
    async fn test_listener_drains_channel() {
        let pool = pool().await;
        let (tx, rx) = mpsc::channel(8);
        let handle = spawn_project_listener(pool.clone(), notifier(&pool), rx);

        let project_id = Uuid::new_v4();
        tx.send(ProjectEvent::Created {
            project_id,
            owner_id: Uuid::new_v4(),
            name: "Gemini".into(),
        })
        .await
        .unwrap();
        drop(tx);
        handle.await.unwrap();

        assert!(db::get_room_by_project(&pool, project_id).await.unwrap().is_some());
    }
}
