use clap::Parser;
use log::{error, info};
use server::network::Relay;
use server::status;
use std::net::SocketAddr;

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// IP address to bind to
    #[clap(short = 'H', long, default_value = "0.0.0.0")]
    host: String,
    /// Relay port clients connect to
    #[clap(short, long, default_value = "42660")]
    port: u16,
    /// Maximum number of concurrent clients
    #[clap(short, long, default_value = "16")]
    max_clients: usize,
    /// Optional port for the plain HTTP status page
    #[clap(long)]
    status_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let address = format!("{}:{}", args.host, args.port);
    let relay = Relay::new(&address, args.max_clients).await?;

    if let Some(port) = args.status_port {
        let addr: SocketAddr = format!("{}:{}", args.host, port).parse()?;
        let (_, status_page) = status::serve(addr)?;
        tokio::spawn(status_page);
    }

    tokio::select! {
        result = relay.run() => {
            if let Err(e) = result {
                error!("Relay stopped: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
