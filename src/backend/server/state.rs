/**
 * Application State Management
 *
 * `AppState` is the central state container shared by every handler and the
 * WebSocket gateway. Everything in it is cheap to clone (`Arc`s, pools and
 * channel handles).
 *
 * # State Extraction
 *
 * The `FromRef` implementations let handlers extract just the part they
 * need, e.g. `State(chat): State<ChatService>`.
 *
 * # Example
 *
 * ```rust
 * use axum::extract::State;
 * use sentinel_chat::backend::chat::ChatService;
 *
 * async fn handler(State(chat): State<ChatService>) {
 *     let _pool = chat.pool();
 * }
 * ```
 */

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::SqlitePool;
use tokio::sync::mpsc;

use crate::backend::auth::{IdentityVerifier, JwtIdentityVerifier};
use crate::backend::chat::{ChatService, ProjectEvent, ProjectNotifier};
use crate::backend::directory::{ProjectDirectory, SqlProjectDirectory, SqlUserDirectory, UserDirectory};
use crate::backend::notifications::{NotificationService, PushProvider};
use crate::backend::realtime::{PresenceTracker, RoomHub};
use crate::shared::ServerConfig;

/// Buffer of the project event channel
pub const PROJECT_EVENT_BUFFER: usize = 64;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub pool: SqlitePool,
    /// Per-room broadcast channels
    pub hub: RoomHub,
    /// Connection counts per user
    pub presence: PresenceTracker,
    /// Token verification for HTTP and WebSocket callers
    pub identity: Arc<dyn IdentityVerifier>,
    pub users: Arc<dyn UserDirectory>,
    pub projects: Arc<dyn ProjectDirectory>,
    pub notifications: NotificationService,
    pub chat: ChatService,
    /// Publishes project changes to the room store listener
    pub project_events: mpsc::Sender<ProjectEvent>,
}

impl AppState {
    /// State over the SQL directories and JWT identity verification.
    ///
    /// Returns the receiving end of the project event channel, to be handed
    /// to `spawn_project_listener`.
    pub fn new(
        config: ServerConfig,
        pool: SqlitePool,
        providers: Vec<Arc<dyn PushProvider>>,
    ) -> (Self, mpsc::Receiver<ProjectEvent>) {
        let users: Arc<dyn UserDirectory> = Arc::new(SqlUserDirectory::new(pool.clone()));
        let projects: Arc<dyn ProjectDirectory> = Arc::new(SqlProjectDirectory::new(pool.clone()));
        let identity: Arc<dyn IdentityVerifier> =
            Arc::new(JwtIdentityVerifier::new(config.jwt_secret.clone(), users.clone()));
        Self::with_services(config, pool, users, projects, identity, providers)
    }

    /// State over caller-supplied collaborators
    pub fn with_services(
        config: ServerConfig,
        pool: SqlitePool,
        users: Arc<dyn UserDirectory>,
        projects: Arc<dyn ProjectDirectory>,
        identity: Arc<dyn IdentityVerifier>,
        providers: Vec<Arc<dyn PushProvider>>,
    ) -> (Self, mpsc::Receiver<ProjectEvent>) {
        let hub = RoomHub::new(config.broadcast_capacity);
        let presence = PresenceTracker::new(config.broadcast_capacity);
        let notifications = NotificationService::new(users.clone(), providers);
        let chat = ChatService::new(
            pool.clone(),
            hub.clone(),
            users.clone(),
            projects.clone(),
            notifications.clone(),
        );
        let (project_events, project_events_rx) = mpsc::channel(PROJECT_EVENT_BUFFER);

        let app_state = Self {
            config: Arc::new(config),
            pool,
            hub,
            presence,
            identity,
            users,
            projects,
            notifications,
            chat,
            project_events,
        };
        (app_state, project_events_rx)
    }

    /// Pushes for project events, over this state's directories
    pub fn project_notifier(&self) -> ProjectNotifier {
        ProjectNotifier::new(self.projects.clone(), self.users.clone(), self.notifications.clone())
    }
}

impl FromRef<AppState> for ChatService {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.chat.clone()
    }
}

impl FromRef<AppState> for NotificationService {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.notifications.clone()
    }
}

impl FromRef<AppState> for Arc<dyn UserDirectory> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.users.clone()
    }
}

impl FromRef<AppState> for RoomHub {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.hub.clone()
    }
}

impl FromRef<AppState> for PresenceTracker {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.presence.clone()
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.pool.clone()
    }
}
