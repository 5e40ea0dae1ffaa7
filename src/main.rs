use std::net::TcpListener;
use std::sync::Arc;

use homi_auth::configuration::get_configuration;
use homi_auth::startup::run;
use homi_auth::store::UserStore;
use homi_auth::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    let store = Arc::new(UserStore::new());

    let address = format!("127.0.0.1:{}", configuration.port);
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let server = run(listener, store, configuration.auth)?;
    server.await
}
