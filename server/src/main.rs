use clap::Parser;
use env_logger::Env;
use log::{error, info};
use server::config::{ServerConfig, TransportMode};
use server::context::ServerContext;
use server::liveness::spawn_liveness_monitor;
use server::network::udp::UdpTransport;
use server::network::ws::WsTransport;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// UDP port for the text protocol
    #[clap(short, long, default_value_t = shared::DEFAULT_UDP_PORT)]
    udp_port: u16,
    /// TCP port for the WebSocket JSON protocol
    #[clap(short, long, default_value_t = shared::DEFAULT_WS_PORT)]
    ws_port: u16,
    /// Transports to start
    #[clap(short, long, value_enum, default_value = "both")]
    transport: TransportMode,
    /// Seconds of silence before a UDP participant is evicted
    #[clap(long, default_value = "10")]
    udp_timeout_secs: u64,
    /// Seconds of silence before a WebSocket participant is evicted
    #[clap(long, default_value = "30")]
    ws_timeout_secs: u64,
    /// Seconds between liveness checks
    #[clap(long, default_value = "5")]
    check_interval_secs: u64,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            udp_port: args.udp_port,
            ws_port: args.ws_port,
            transport: args.transport,
            udp_timeout: Duration::from_secs(args.udp_timeout_secs),
            ws_timeout: Duration::from_secs(args.ws_timeout_secs),
            check_interval: Duration::from_secs(args.check_interval_secs),
        }
    }
}

/// Parses arguments, binds the enabled transports and runs until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = ServerConfig::from(Args::parse());
    config.validate()?;

    let context = Arc::new(ServerContext::new(config.policy()));

    // Bind everything before spawning anything: a port in use is fatal
    let udp = if config.transport.udp_enabled() {
        Some(UdpTransport::bind(&config.udp_addr(), Arc::clone(&context)).await?)
    } else {
        None
    };
    let ws = if config.transport.ws_enabled() {
        Some(WsTransport::bind(&config.ws_addr(), Arc::clone(&context)).await?)
    } else {
        None
    };

    let monitor = spawn_liveness_monitor(Arc::clone(&context));
    let udp_handle = udp.map(|transport| tokio::spawn(transport.run()));
    let ws_handle = ws.map(|transport| tokio::spawn(transport.run()));

    info!(
        "Card duel server running ({:?}), timeouts udp={:?} ws={:?}, check every {:?}",
        config.transport, config.udp_timeout, config.ws_timeout, config.check_interval
    );

    // Handle shutdown gracefully
    tokio::select! {
        result = join_optional(udp_handle) => {
            if let Err(e) = result {
                error!("UDP transport task panicked: {}", e);
            }
        }
        result = join_optional(ws_handle) => {
            if let Err(e) = result {
                error!("WebSocket transport task panicked: {}", e);
            }
        }
        result = monitor => {
            if let Err(e) = result {
                error!("Liveness monitor panicked: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}

/// Awaits a transport task, or never resolves when the transport is disabled.
async fn join_optional(handle: Option<JoinHandle<()>>) -> Result<(), tokio::task::JoinError> {
    match handle {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}
