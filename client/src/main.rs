use clap::Parser;
use env_logger::Env;
use log::info;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server UDP address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:7777")]
    server: String,

    /// Card id to connect with on startup
    #[arg(short = 'c', long)]
    card: Option<String>,

    /// Seconds between heartbeats while connected
    #[arg(long, default_value = "3")]
    heartbeat_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    if args.heartbeat_secs == 0 {
        return Err("heartbeat interval must be greater than zero".into());
    }

    info!("Starting client, server at {}", args.server);

    let mut client = client::network::Client::new(&args.server).await?;
    client
        .run(args.card, Duration::from_secs(args.heartbeat_secs))
        .await?;

    Ok(())
}
