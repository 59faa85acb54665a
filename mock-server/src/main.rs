use mock_server::ServerConfig;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "9001".to_string());
    let defaults = ServerConfig::default();
    let config = ServerConfig {
        api_key: std::env::var("ETHERPAD_APIKEY").unwrap_or(defaults.api_key),
        current_version: std::env::var("ETHERPAD_VERSION").unwrap_or(defaults.current_version),
    };

    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, version = %config.current_version, "mock pad API listening");
    mock_server::run_with(listener, config).await
}
