//! Connection Gateway
//!
//! Persistent WebSocket connections: authentication, room subscriptions,
//! typing relay and presence.
//!
//! - **`session`** - `GatewaySession`, the per-connection state
//! - **`socket`** - the `GET /ws` upgrade handler and socket loop

pub mod session;
pub mod socket;

pub use session::GatewaySession;
pub use socket::handle_ws_upgrade;
