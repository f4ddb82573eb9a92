//! Project room tests: one room per project, kept in step with project events

mod common;

use std::sync::Arc;

use futures_util::future::join_all;
use pretty_assertions::assert_eq;
use sentinel_chat::backend::chat::{db, spawn_project_listener, ProjectEvent, ProjectNotifier};
use sentinel_chat::backend::directory::{SqlProjectDirectory, SqlUserDirectory, UserDirectory};
use sentinel_chat::backend::notifications::{NotificationService, PushProviderKind};
use sentinel_chat::shared::messaging::ChatRoom;
use sqlx::SqlitePool;
use tokio::sync::mpsc;

use common::*;

fn silent_notifier(pool: &SqlitePool) -> ProjectNotifier {
    let users: Arc<dyn UserDirectory> = Arc::new(SqlUserDirectory::new(pool.clone()));
    ProjectNotifier::new(
        Arc::new(SqlProjectDirectory::new(pool.clone())),
        users.clone(),
        NotificationService::new(users, Vec::new()),
    )
}

#[tokio::test]
async fn test_concurrent_get_or_create_yields_one_room() {
    let pool = test_pool().await;
    let owner = seed_user(&pool, "owner").await;
    let project = seed_project(&pool, "Apollo", owner, &[]).await;

    let attempts = (0..8).map(|_| db::get_or_create_project_room(&pool, project, owner, "Apollo"));
    let rooms: Vec<ChatRoom> = join_all(attempts)
        .await
        .into_iter()
        .collect::<Result<_, _>>()
        .unwrap();

    assert!(rooms.iter().all(|room| room.id == rooms[0].id));
    assert_eq!(rooms[0].member_ids, vec![owner]);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chat_rooms WHERE project_id = ?")
        .bind(project)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_creators_on_separate_connections_share_one_room() {
    let dir = tempfile::tempdir().unwrap();
    let pool = file_pool(&dir, 8).await;
    let owner = seed_user(&pool, "owner").await;
    let project = seed_project(&pool, "Apollo", owner, &[]).await;

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let pool = pool.clone();
            tokio::spawn(async move { db::get_or_create_project_room(&pool, project, owner, "Apollo").await })
        })
        .collect();

    let mut room_ids = Vec::new();
    for task in tasks {
        room_ids.push(task.await.unwrap().unwrap().id);
    }
    assert!(room_ids.iter().all(|id| *id == room_ids[0]));

    let (rooms, members): (i64, i64) = sqlx::query_as(
        "SELECT (SELECT COUNT(*) FROM chat_rooms WHERE project_id = ?), \
                (SELECT COUNT(*) FROM room_members WHERE room_id = ?)",
    )
    .bind(project)
    .bind(room_ids[0])
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(rooms, 1);
    assert_eq!(members, 1);
}

#[tokio::test]
async fn test_concurrent_first_access_over_http() {
    let pool = test_pool().await;
    let owner = seed_user(&pool, "owner").await;
    let member = seed_user(&pool, "member").await;
    let project = seed_project(&pool, "Gemini", owner, &[member]).await;
    let (app_state, _events) = test_state(pool, Vec::new());
    let server = test_server(app_state);
    let path = format!("/api/chat/project/{}/room", project);

    let requests = [owner, member, owner, member].map(|user| {
        let request = server.get(&path).authorization_bearer(token_for(user));
        async move { request.await.json::<ChatRoom>() }
    });
    let rooms = join_all(requests).await;

    assert!(rooms.iter().all(|room| room.id == rooms[0].id));
}

#[tokio::test]
async fn test_listener_mirrors_project_events() {
    let pool = test_pool().await;
    let owner = seed_user(&pool, "owner").await;
    let member = seed_user(&pool, "member").await;
    let project = seed_project(&pool, "Apollo", owner, &[]).await;

    let (tx, rx) = mpsc::channel(16);
    let listener = spawn_project_listener(pool.clone(), silent_notifier(&pool), rx);

    // Membership change before the room exists is ignored
    tx.send(ProjectEvent::MemberAdded {
        project_id: project,
        user_id: member,
        added_by: Some(owner),
    })
    .await
    .unwrap();
    tx.send(ProjectEvent::Created {
        project_id: project,
        owner_id: owner,
        name: "Apollo".to_string(),
    })
    .await
    .unwrap();
    tx.send(ProjectEvent::MemberAdded {
        project_id: project,
        user_id: member,
        added_by: Some(owner),
    })
    .await
    .unwrap();
    tx.send(ProjectEvent::Renamed {
        project_id: project,
        name: "Apollo 11".to_string(),
    })
    .await
    .unwrap();
    drop(tx);
    listener.await.unwrap();

    let room = db::get_room_by_project(&pool, project).await.unwrap().unwrap();
    assert_eq!(room.name, "Apollo 11");
    assert_eq!(room.member_ids, vec![owner, member]);
}

#[tokio::test]
async fn test_listener_survives_failing_event() {
    let pool = test_pool().await;
    let owner = seed_user(&pool, "owner").await;
    let project = seed_project(&pool, "Apollo", owner, &[]).await;

    let (tx, rx) = mpsc::channel(16);
    let listener = spawn_project_listener(pool.clone(), silent_notifier(&pool), rx);

    tx.send(ProjectEvent::Created {
        project_id: project,
        owner_id: owner,
        name: "Apollo".to_string(),
    })
    .await
    .unwrap();
    // Blank names are rejected by the store
    tx.send(ProjectEvent::Renamed {
        project_id: project,
        name: "   ".to_string(),
    })
    .await
    .unwrap();
    tx.send(ProjectEvent::MemberRemoved {
        project_id: project,
        user_id: owner,
    })
    .await
    .unwrap();
    drop(tx);
    listener.await.unwrap();

    let room = db::get_room_by_project(&pool, project).await.unwrap().unwrap();
    assert_eq!(room.name, "Apollo");
    assert!(room.member_ids.is_empty());
}

#[tokio::test]
async fn test_added_member_is_notified() {
    let pool = test_pool().await;
    let owner = seed_user(&pool, "owner").await;
    let member = seed_user(&pool, "member").await;
    seed_identifier(&pool, owner, PushProviderKind::Fcm, "owner-phone").await;
    seed_identifier(&pool, member, PushProviderKind::Fcm, "member-phone").await;
    let project = seed_project(&pool, "Apollo", owner, &[member]).await;

    let fcm = RecordingProvider::new(PushProviderKind::Fcm);
    let (app_state, rx) = test_state(pool.clone(), vec![fcm.clone()]);
    let listener = spawn_project_listener(pool.clone(), app_state.project_notifier(), rx);

    let events = app_state.project_events.clone();
    events
        .send(ProjectEvent::Created {
            project_id: project,
            owner_id: owner,
            name: "Apollo".to_string(),
        })
        .await
        .unwrap();
    events
        .send(ProjectEvent::MemberAdded {
            project_id: project,
            user_id: member,
            added_by: Some(owner),
        })
        .await
        .unwrap();

    assert!(eventually(|| !fcm.sent_identifiers().is_empty()).await);
    assert_eq!(fcm.sent_identifiers(), vec!["member-phone".to_string()]);
    let payload = &fcm.payloads()[0];
    assert_eq!(payload.title, "Added to project: Apollo");
    assert_eq!(payload.body, "You were added by owner");
    assert_eq!(payload.data.get("type").map(String::as_str), Some("project"));
    assert_eq!(payload.data.get("projectId"), Some(&project.to_string()));

    let room = db::get_room_by_project(&pool, project).await.unwrap().unwrap();
    assert!(room.is_member(member));

    drop(events);
    drop(app_state);
    listener.await.unwrap();
}
