/// CollabForge Realtime Service
///
/// Room-scoped, authenticated websocket fan-out for project collaboration
///
/// Features:
/// - JWT handshake authentication sharing the REST layer's signing scheme
/// - Implicit project rooms with idempotent join/leave
/// - Best-effort broadcast of chat, typing, contribution, and project
///   lifecycle events
/// - Durable chat history consumed through the REST bridge
pub mod auth;
pub mod config;
pub mod error;
pub mod history;
pub mod protocol;
pub mod rooms;
pub mod router;
pub mod server;
pub mod session;
pub mod websocket;

pub use auth::{Claims, Identity, TokenVerifier};
pub use config::RealtimeConfig;
pub use error::{AuthError, RealtimeError};
pub use history::{
    InMemoryMessageStore, MessagePage, MessageStore, Pagination, RestMessageStore, StoredMessage,
};
pub use protocol::{ClientEvent, ServerEvent};
pub use rooms::{BroadcastError, OutboundFrame, RoomId, RoomRegistry};
pub use router::{EventRouter, RouterAction};
pub use server::{start_server, ServerState};
pub use session::{Session, SessionId, SessionState};
pub use websocket::CollabWebSocket;

/// Initialize tracing for the realtime service
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "collabforge_realtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_exports() {
        let _registry = RoomRegistry::new();
        let _verifier = TokenVerifier::new("secret");
        let _store = InMemoryMessageStore::new();
        let _room = RoomId::for_project("1");
    }
}
