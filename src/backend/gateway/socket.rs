/**
 * WebSocket Endpoint
 *
 * `GET /ws` upgrades to a WebSocket and drives one `GatewaySession`.
 *
 * # Connection States
 *
 * ```text
 * CONNECTING -> AUTHENTICATING -> AUTHENTICATED -> DISCONNECTED
 *                              \-> REJECTED
 * ```
 *
 * The identity token comes from the `token` query parameter or, failing
 * that, from a first `{"type":"auth","token":...}` frame that must arrive
 * within the configured auth timeout. Any other first frame, a timeout or a
 * failed verification sends `{"type":"rejected"}` and closes the socket.
 */

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use serde::Deserialize;

use crate::backend::auth::Identity;
use crate::backend::gateway::session::GatewaySession;
use crate::backend::server::state::AppState;
use crate::shared::{ClientEvent, ServerEvent};

#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    pub token: Option<String>,
}

/// Handle `GET /ws`
pub async fn handle_ws_upgrade(
    ws: WebSocketUpgrade,
    State(app_state): State<AppState>,
    Query(params): Query<ConnectParams>,
) -> Response {
    ws.on_upgrade(move |socket| run_connection(socket, app_state, params.token))
}

async fn run_connection(mut socket: WebSocket, app_state: AppState, token: Option<String>) {
    let identity = match authenticate(&mut socket, &app_state, token).await {
        Ok(identity) => identity,
        Err(reason) => {
            tracing::info!("[Gateway] Rejected connection: {}", reason);
            let _ = send_frame(&mut socket, &ServerEvent::rejected(reason)).await;
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    let mut session = GatewaySession::new(identity, app_state.hub.clone(), &app_state.presence);
    let user_id = session.identity().user_id;
    if send_frame(&mut socket, &ServerEvent::Authenticated { user_id }).await.is_err() {
        return;
    }
    tracing::info!("[Gateway] User {} connected ({})", user_id, session.connection_id());

    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let reply = match ClientEvent::parse(text.as_str()) {
                        Ok(event) => session.handle(event),
                        Err(e) => Some(ServerEvent::error(format!("Invalid frame: {}", e))),
                    };
                    if let Some(reply) = reply {
                        if send_frame(&mut socket, &reply).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!("[Gateway] Socket error for user {}: {}", user_id, e);
                    break;
                }
            },
            outgoing = session.next_event() => match outgoing {
                Some(frame) => {
                    if send_frame(&mut socket, &frame).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
        }
    }

    drop(session);
    tracing::info!("[Gateway] User {} disconnected", user_id);
}

/// Resolve the connection's identity, or the reason for rejecting it
async fn authenticate(socket: &mut WebSocket, app_state: &AppState, token: Option<String>) -> Result<Identity, String> {
    let token = match token.filter(|t| !t.is_empty()) {
        Some(token) => token,
        None => tokio::time::timeout(app_state.config.ws_auth_timeout, first_auth_frame(socket))
            .await
            .map_err(|_| "Authentication timed out".to_string())??,
    };

    app_state
        .identity
        .verify(&token)
        .await
        .map_err(|e| e.message())
}

/// Wait for the first data frame, which must be `auth`
async fn first_auth_frame(socket: &mut WebSocket) -> Result<String, String> {
    loop {
        match socket.recv().await {
            Some(Ok(Message::Text(text))) => {
                return match ClientEvent::parse(text.as_str()) {
                    Ok(ClientEvent::Auth { token }) => Ok(token),
                    _ => Err("Authentication required".to_string()),
                };
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            Some(Ok(_)) => return Err("Authentication required".to_string()),
            Some(Err(_)) | None => return Err("Connection closed".to_string()),
        }
    }
}

async fn send_frame(socket: &mut WebSocket, event: &ServerEvent) -> Result<(), axum::Error> {
    match event.to_json() {
        Ok(json) => socket.send(Message::Text(json.into())).await,
        Err(e) => {
            tracing::error!("[Gateway] Failed to serialize frame: {}", e);
            Ok(())
        }
    }
}
