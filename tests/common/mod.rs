//! Common test utilities and helpers
//!
//! - In-memory SQLite pools with migrations applied
//! - Seeding of directory rows (users, push identifiers, projects)
//! - Token minting and a ready-to-use `AppState`
//! - A recording `PushProvider`

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum_test::TestServer;
use sentinel_chat::backend::auth::sessions::{create_token, TOKEN_TTL_SECS};
use sentinel_chat::backend::chat::ProjectEvent;
use sentinel_chat::backend::error::{BackendError, BackendResult};
use sentinel_chat::backend::notifications::{BatchResult, PushPayload, PushProvider, PushProviderKind};
use sentinel_chat::backend::routes::create_router;
use sentinel_chat::backend::server::AppState;
use sentinel_chat::shared::ServerConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tokio::sync::mpsc;
use uuid::Uuid;

pub const SECRET: &str = "test-secret";

/// Single-connection in-memory database, so every query sees the same data
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open test database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

/// File-backed database in `dir` with several connections, for tests that
/// need statements from different connections to interleave
pub async fn file_pool(dir: &tempfile::TempDir, max_connections: u32) -> SqlitePool {
    let options = SqliteConnectOptions::new()
        .filename(dir.path().join("sentinel-test.db"))
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(10));
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .expect("Failed to open file database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

pub async fn seed_user(pool: &SqlitePool, username: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, username, avatar_url) VALUES (?, ?, ?)")
        .bind(id)
        .bind(username)
        .bind(format!("https://avatars.test/{}.png", username))
        .execute(pool)
        .await
        .expect("Failed to seed user");
    id
}

pub async fn seed_identifier(pool: &SqlitePool, user_id: Uuid, provider: PushProviderKind, identifier: &str) {
    sqlx::query("INSERT INTO push_identifiers (user_id, provider, identifier) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(provider.as_str())
        .bind(identifier)
        .execute(pool)
        .await
        .expect("Failed to seed push identifier");
}

pub async fn seed_project(pool: &SqlitePool, name: &str, owner_id: Uuid, members: &[Uuid]) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO projects (id, name, owner_id) VALUES (?, ?, ?)")
        .bind(id)
        .bind(name)
        .bind(owner_id)
        .execute(pool)
        .await
        .expect("Failed to seed project");
    for member in members {
        sqlx::query("INSERT INTO project_members (project_id, user_id) VALUES (?, ?)")
            .bind(id)
            .bind(member)
            .execute(pool)
            .await
            .expect("Failed to seed project member");
    }
    id
}

pub fn token_for(user_id: Uuid) -> String {
    create_token(SECRET, user_id, TOKEN_TTL_SECS).expect("Failed to create test token")
}

pub fn bearer(user_id: Uuid) -> String {
    format!("Bearer {}", token_for(user_id))
}

pub fn test_config() -> ServerConfig {
    ServerConfig::builder()
        .database_url("sqlite::memory:")
        .jwt_secret(SECRET)
        .broadcast_capacity(32)
        .build()
        .expect("Failed to build test config")
}

pub fn test_state(pool: SqlitePool, providers: Vec<Arc<dyn PushProvider>>) -> (AppState, mpsc::Receiver<ProjectEvent>) {
    AppState::new(test_config(), pool, providers)
}

pub fn test_server(app_state: AppState) -> TestServer {
    TestServer::new(create_router(app_state)).expect("Failed to start test server")
}

/// Push provider that records every batch it is asked to send
pub struct RecordingProvider {
    kind: PushProviderKind,
    fail: bool,
    pub sent: Mutex<Vec<(Vec<String>, PushPayload)>>,
}

impl RecordingProvider {
    pub fn new(kind: PushProviderKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            fail: false,
            sent: Mutex::new(Vec::new()),
        })
    }

    /// A provider that is always unavailable
    pub fn failing(kind: PushProviderKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            fail: true,
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn sent_identifiers(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .flat_map(|(ids, _)| ids.clone())
            .collect()
    }

    pub fn payloads(&self) -> Vec<PushPayload> {
        self.sent.lock().unwrap().iter().map(|(_, p)| p.clone()).collect()
    }
}

#[async_trait]
impl PushProvider for RecordingProvider {
    fn kind(&self) -> PushProviderKind {
        self.kind
    }

    async fn send_batch(&self, identifiers: &[String], payload: &PushPayload) -> BackendResult<BatchResult> {
        self.sent
            .lock()
            .unwrap()
            .push((identifiers.to_vec(), payload.clone()));
        if self.fail {
            return Err(BackendError::provider(self.kind.as_str(), "unreachable"));
        }
        Ok(BatchResult {
            success_count: identifiers.len(),
            ..BatchResult::default()
        })
    }
}

/// Wait until `check` passes, for work finished by background tasks
pub async fn eventually<F: Fn() -> bool>(check: F) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    false
}
