/// CollabForge Realtime Service - Main Entry Point
use collabforge_realtime::{init_tracing, start_server, RealtimeConfig};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = RealtimeConfig::from_env()
        .expect("Failed to load realtime configuration");
    config
        .validate()
        .expect("Invalid realtime configuration");

    start_server(config).await
}
