/// WebSocket session actor for project collaboration
///
/// One actor per authenticated connection. Inbound text frames are parsed
/// into tagged client events and routed; malformed frames are dropped
/// without a reply. Teardown removes the session from every room before
/// the connection table entry is deleted.
use crate::auth::Identity;
use crate::protocol::ClientEvent;
use crate::rooms::{OutboundFrame, RoomRegistry};
use crate::router::{EventRouter, RouterAction};
use crate::session::Session;
use actix::{Actor, ActorContext, AsyncContext, Handler, StreamHandler};
use actix_web_actors::ws;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// WebSocket connection heartbeat interval (30 seconds)
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Client timeout (60 seconds - 2 missed heartbeats)
const CLIENT_TIMEOUT: Duration = Duration::from_secs(60);

/// WebSocket session actor
pub struct CollabWebSocket {
    /// Per-connection session state
    session: Session,

    /// Shared room membership table, injected by the server
    registry: Arc<RoomRegistry>,

    /// Last heartbeat timestamp
    hb: Instant,
}

impl CollabWebSocket {
    /// Create a session actor for a connection that passed the handshake
    pub fn new(identity: Identity, registry: Arc<RoomRegistry>) -> Self {
        Self {
            session: Session::new(identity),
            registry,
            hb: Instant::now(),
        }
    }

    /// Start heartbeat process
    fn start_heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                tracing::warn!(
                    "WebSocket client {} heartbeat timeout, disconnecting",
                    act.session.id()
                );
                ctx.stop();
                return;
            }

            ctx.ping(b"");
        });
    }

    /// Route one parsed client event and apply the resulting action
    fn handle_client_event(&mut self, event: ClientEvent) {
        if self.session.is_closed() {
            return;
        }

        let action = EventRouter::route(self.session.id(), self.session.identity(), event);

        match action {
            RouterAction::Join(room) => {
                if self.session.note_join(room.clone()) {
                    self.registry.join(self.session.id(), room);
                }
            }
            RouterAction::Leave(room) => {
                self.session.note_leave(&room);
                self.registry.leave(self.session.id(), &room);
            }
            RouterAction::Broadcast {
                room,
                event,
                exclude,
            } => match self.registry.broadcast(&room, &event, exclude) {
                Ok(count) => {
                    tracing::debug!(
                        "Session {} broadcast to {} members of {}",
                        self.session.id(),
                        count,
                        room
                    );
                }
                Err(e) => {
                    tracing::error!("Broadcast from {} failed: {}", self.session.id(), e);
                }
            },
        }
    }
}

impl Actor for CollabWebSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.registry.register(
            self.session.id(),
            self.session.identity().clone(),
            ctx.address().recipient(),
        );
        self.session.authenticate();
        self.start_heartbeat(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        // Membership must be fully gone before the connection entry is
        // deleted; a session stuck in one room but not another is an
        // invariant violation.
        self.registry.remove_session_from_all_rooms(self.session.id());
        self.registry.unregister(self.session.id());
        self.session.close();
    }
}

/// Handler for frames pushed by the room registry
impl Handler<OutboundFrame> for CollabWebSocket {
    type Result = ();

    fn handle(&mut self, msg: OutboundFrame, ctx: &mut Self::Context) -> Self::Result {
        ctx.text(msg.0);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for CollabWebSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                // Fire-and-forget protocol: malformed events are dropped,
                // never answered
                match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(event) => self.handle_client_event(event),
                    Err(e) => {
                        tracing::debug!(
                            "Dropping malformed event from {}: {}",
                            self.session.id(),
                            e
                        );
                    }
                }
            }
            Ok(ws::Message::Binary(_)) => {
                tracing::warn!("Binary WebSocket messages not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::info!("WebSocket close received: {:?}", reason);
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) => {
                tracing::warn!("WebSocket continuation frames not supported");
            }
            Ok(ws::Message::Nop) => {}
            Err(e) => {
                tracing::error!("WebSocket protocol error: {}", e);
                ctx.stop();
            }
        }
    }
}
