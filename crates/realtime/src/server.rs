/// Actix-web server for the realtime collaboration service
///
/// Endpoints:
/// - GET /health - Health check
/// - GET /stats - Registry counters
/// - WebSocket /ws - Authenticated realtime connection
use crate::auth::TokenVerifier;
use crate::config::RealtimeConfig;
use crate::error::AuthError;
use crate::history::RestMessageStore;
use crate::rooms::RoomRegistry;
use crate::websocket::CollabWebSocket;
use actix_web::{get, http::header, web, App, HttpRequest, HttpResponse, HttpServer, Responder};
use actix_web_actors::ws;
use std::collections::HashMap;
use std::sync::Arc;

/// Server state shared across handlers
pub struct ServerState {
    /// Room membership table, one per process
    pub registry: Arc<RoomRegistry>,

    /// Verifier for the handshake credential
    pub verifier: Arc<TokenVerifier>,

    /// Bridge to the durable chat log owned by the platform API
    pub message_store: Arc<RestMessageStore>,
}

impl ServerState {
    pub fn new(config: &RealtimeConfig) -> Self {
        Self {
            registry: Arc::new(RoomRegistry::new()),
            verifier: Arc::new(TokenVerifier::new(&config.jwt_secret)),
            message_store: Arc::new(RestMessageStore::new(&config.api_base_url)),
        }
    }
}

/// Pull the bearer credential off the upgrade request.
///
/// Clients pass it either as a `token` query parameter (the handshake
/// auth field) or as an `Authorization: Bearer ...` header.
fn extract_token(req: &HttpRequest) -> Result<String, AuthError> {
    if let Ok(query) = web::Query::<HashMap<String, String>>::from_query(req.query_string()) {
        if let Some(token) = query.get("token").filter(|t| !t.is_empty()) {
            return Ok(token.clone());
        }
    }

    if let Some(value) = req.headers().get(header::AUTHORIZATION) {
        let header_str = value.to_str().map_err(|_| AuthError::InvalidToken)?;
        return TokenVerifier::extract_bearer_token(header_str).map(|t| t.to_string());
    }

    Err(AuthError::NoToken)
}

/// Health check endpoint
#[get("/health")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "collabforge-realtime",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Registry counters endpoint
#[get("/stats")]
async fn stats(state: web::Data<ServerState>) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "connections": state.registry.connection_count(),
        "rooms": state.registry.room_count(),
        "events_delivered": state.registry.events_delivered(),
    }))
}

/// WebSocket connection endpoint.
///
/// The handshake is refused with the authentication reason before any
/// session is created; a session exists only for verified identities.
#[get("/ws")]
async fn websocket(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<ServerState>,
) -> Result<HttpResponse, actix_web::Error> {
    let token = extract_token(&req)?;
    let identity = state.verifier.verify(&token)?;

    let session = CollabWebSocket::new(identity, state.registry.clone());
    ws::start(session, &req, stream)
}

/// Start the realtime server
pub async fn start_server(config: RealtimeConfig) -> std::io::Result<()> {
    tracing::info!(
        "Starting CollabForge Realtime Service on {}:{}",
        config.host,
        config.port
    );

    let state = web::Data::new(ServerState::new(&config));

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .service(health_check)
            .service(stats)
            .service(websocket)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
