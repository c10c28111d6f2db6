use std::sync::Arc;

use parasara_chat::api::{ChatBackend, HttpBackend};
use parasara_chat::channels::CliFrontend;
use parasara_chat::config::ClientConfig;
use parasara_chat::conversation::ConversationController;
use parasara_chat::session::Credentials;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they don't interleave with chat output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::from_env()?;
    let credentials = Credentials::from_env();

    eprintln!("🔮 Parasara Chat v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Backend: {}", config.api_base_url);
    eprintln!(
        "   Auth: {}",
        if credentials.is_authenticated() {
            "bearer token"
        } else {
            "anonymous"
        }
    );
    eprintln!("   Type a message and press Enter. /help for commands, /quit to exit.\n");

    let backend: Arc<dyn ChatBackend> = Arc::new(HttpBackend::new(&config)?);
    let controller =
        ConversationController::new(Arc::clone(&backend), credentials.clone(), config.delays);

    CliFrontend::new(controller, backend, credentials).run().await;

    tracing::info!("Goodbye");
    Ok(())
}
