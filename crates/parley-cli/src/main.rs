//! Parley terminal client binary.
//!
//! # Usage
//!
//! ```bash
//! # Demo mode against the in-process loopback server
//! parley --name Alice
//!
//! # Real server
//! parley --url ws://localhost:8080 --guest
//! ```

use std::{error::Error, io};

use clap::Parser;
use parley_cli::{TerminalPresenter, forward_input, prompt_name};
use parley_client::{
    Connector, LoopbackConnector, Runtime, SessionConfig, SystemEnv, websocket::WsConnector,
};
use parley_core::{BackoffConfig, guest_identity};
use parley_proto::DecodeMode;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Parley chat client
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(about = "Terminal client for Parley chat rooms")]
#[command(version)]
struct Args {
    /// WebSocket server URL
    ///
    /// If not provided, runs against an in-process demo server.
    #[arg(short, long)]
    url: Option<String>,

    /// Display name
    #[arg(short, long, conflicts_with = "guest")]
    name: Option<String>,

    /// Join with a generated `Guest-<n>` name
    #[arg(short, long)]
    guest: bool,

    /// Give up after this many consecutive failed reconnects
    #[arg(long)]
    max_reconnect_attempts: Option<u32>,

    /// Drop envelopes of unknown kinds with a warning instead of silently
    #[arg(long)]
    strict: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

impl Args {
    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            backoff: BackoffConfig {
                max_attempts: self.max_reconnect_attempts,
                ..BackoffConfig::default()
            },
            decode_mode: if self.strict { DecodeMode::Strict } else { DecodeMode::Permissive },
            ..SessionConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    let env = SystemEnv::new();
    let name = match (args.guest, args.name.clone()) {
        (true, _) => guest_identity(&env),
        (false, Some(name)) => name,
        (false, None) => prompt_name(&mut io::stdin().lock(), &mut io::stdout())?
            .unwrap_or_else(|| guest_identity(&env)),
    };

    let config = args.session_config();
    match args.url {
        Some(url) => {
            tracing::info!(%url, "connecting");
            chat(env, WsConnector::new(url), config, &name).await
        },
        None => {
            tracing::info!("no server given, using loopback demo server");
            chat(env, LoopbackConnector::new(config.palette_size), config, &name).await
        },
    }
}

async fn chat<C: Connector>(
    env: SystemEnv,
    connector: C,
    config: SessionConfig,
    name: &str,
) -> Result<(), Box<dyn Error>> {
    let presenter = TerminalPresenter::new(io::stdout());
    let (runtime, handle) = Runtime::new(env, connector, presenter, config);

    // Blocking stdin reads stay off the async runtime; the thread is left
    // behind when the session ends.
    std::thread::spawn(move || {
        if let Err(e) = forward_input(io::stdin().lock(), &handle) {
            tracing::debug!(error = %e, "input forwarding stopped");
        }
    });

    runtime.run(name).await?;
    Ok(())
}
