//! Startup helpers for the chat client.

use std::process::ExitCode;

use crate::chat::{
    AuthToken, ChatController, ChatResult, ClientConfig, EventBus, HttpChatHistory,
    InboundListener, SocketChannel,
};
use crate::console;

/// Controller wired to the REST backend and the WebSocket channel.
pub type LiveController = ChatController<HttpChatHistory, SocketChannel>;

/// Run the console client (used by the `enterprisegpt` binary).
///
/// # Returns
/// `ExitCode::SUCCESS` when the user quits, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    init_tracing();

    tracing::info!("Starting EnterpriseGPT client v{}", env!("CARGO_PKG_VERSION"));

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            return ExitCode::from(1);
        }
    };
    tracing::info!(api = %config.api.base_url, socket = %config.socket.url, "endpoints configured");

    let token = match AuthToken::from_env() {
        Ok(token) => token,
        Err(e) => {
            tracing::error!("Cannot authenticate: {e}");
            return ExitCode::from(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(console::run(config, token)) {
        tracing::error!("Client error: {e:#}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

/// Install the global `tracing` subscriber, filtered by `RUST_LOG`
/// (default `info`). Logs go to stderr so they do not interleave with the
/// transcript.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // A subscriber may already be installed by an embedding application.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Connect the event channel and build a controller around it.
///
/// Must be called from within a Tokio runtime; the socket task is spawned
/// on it.
///
/// # Errors
/// Returns an error if the configuration is invalid or the HTTP client
/// cannot be built.
pub fn connect(
    config: &ClientConfig,
    token: AuthToken,
) -> ChatResult<(LiveController, InboundListener)> {
    config.validate()?;

    let history = HttpChatHistory::new(&config.api, token.clone())?;
    let bus = EventBus::new();
    let listener = InboundListener::attach(&bus);
    let socket = SocketChannel::spawn(config.socket.clone(), token, bus);

    Ok((ChatController::new(history, socket, config), listener))
}
