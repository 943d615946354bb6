use clap::Parser;
use client::input::{is_valid_name, InputManager};
use client::network::Client;
use log::info;
use shared::DEFAULT_PORT;
use tokio::io::{stdin, BufReader};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server host name or address
    #[arg(default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Name to register under; asked for when absent
    #[arg(short = 'n', long)]
    name: Option<String>,

    /// Play random moves and decline every draw
    #[arg(short = 'a', long)]
    auto: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let address = format!("{}:{}", args.host, args.port);

    let mut input = InputManager::new(BufReader::new(stdin()), args.auto);
    let name = match args.name {
        Some(name) if is_valid_name(&name) => name,
        Some(name) => return Err(format!("invalid name {:?}", name).into()),
        None => input.ask_name().await?,
    };

    info!("Starting client as {:?}", name);
    let client = Client::connect(&address, &name, input).await?;

    match client.run().await? {
        Some(outcome) => info!("Game finished: {:?}", outcome),
        None => info!("Game ended without a result"),
    }

    Ok(())
}
