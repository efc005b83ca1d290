use tracing::info;

use chatroom::{Config, Relay, WebServer};

#[tokio::main]
async fn main() {
    // Load configuration
    let mut config = match Config::load("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };
    if let Err(e) = config.apply_env_overrides().and_then(|()| config.validate()) {
        eprintln!("Invalid configuration: {e}");
        std::process::exit(1);
    }

    // Initialize logging
    if let Err(e) = chatroom::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        chatroom::logging::init_console_only(&config.logging.level);
    }

    info!("chatroom relay starting");

    let relay = Relay::new(&config.relay);
    let server = match WebServer::new(&config.server, relay) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    };

    info!("Server configured on {}", server.addr());
    if let Err(e) = server.run().await {
        tracing::error!("Server stopped: {e}");
        std::process::exit(1);
    }
}
