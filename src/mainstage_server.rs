// src/mainstage_server.rs
// Entry point for the mainstage hub server.

use mainstage::config::ServerConfig;
use mainstage::logging::{log_error, log_info};
use mainstage::server;

#[tokio::main]
async fn main() {
    let config = ServerConfig::load_or_default();
    let (server_handle, _shutdown_signal, _game) = server::start_server(config);

    log_info("Hub running. Stop with Ctrl+C.");

    if let Err(e) = server_handle.await {
        log_error(&format!("Server task failed: {e:?}"));
    }
}
