use clap::Parser;
use client::input::{parse_coordinate, HELP};
use client::runtime::Client;
use log::info;
use rand::Rng;
use shared::{Peer, Position, DEFAULT_RELAY_PORT, PEER_ID_RANGE};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Relay WebSocket URL (defaults to ws://127.0.0.1 on the relay port)
    #[arg(short = 's', long)]
    server: Option<String>,

    /// Fixed player id; a random one is drawn when omitted
    #[arg(long)]
    id: Option<u32>,

    /// Initial position
    #[arg(short = 'x', long, default_value = "0", allow_hyphen_values = true, value_parser = parse_coordinate)]
    x: f32,

    #[arg(short = 'y', long, default_value = "0", allow_hyphen_values = true, value_parser = parse_coordinate)]
    y: f32,

    #[arg(short = 'z', long, default_value = "0", allow_hyphen_values = true, value_parser = parse_coordinate)]
    z: f32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let server = args
        .server
        .unwrap_or_else(|| format!("ws://127.0.0.1:{}", DEFAULT_RELAY_PORT));
    let id = args
        .id
        .unwrap_or_else(|| rand::thread_rng().gen_range(0..PEER_ID_RANGE));
    let me = Peer::new(id, Position::new(args.x, args.y, args.z));

    info!("Starting client...");
    info!("Connecting to: {}", server);
    info!("Playing as {}", id);
    info!("{}", HELP);

    let client = Client::new(&server, me);
    client.run().await?;

    Ok(())
}
