use clap::Parser;
use log::{error, info, warn};
use server::network::{Server, ServerConfig};
use shared::DEFAULT_PORT;
use std::time::Duration;

/// Networked tic-tac-toe server
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Port to listen on
    #[clap(default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Address to bind to
    #[clap(short = 'H', long, default_value = "0.0.0.0")]
    host: String,
    /// Seconds to wait for a client's next message before giving up on it
    #[clap(short = 't', long, default_value = "10")]
    read_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let config = ServerConfig {
        host: args.host,
        port: args.port,
        read_timeout: Duration::from_secs(args.read_timeout),
    };

    let server = Server::bind(config).await?;
    let shutdown = server.shutdown_handle();
    let mut server_task = tokio::spawn(server.run());

    tokio::select! {
        result = &mut server_task => {
            if let Err(e) = result? {
                error!("Server stopped unexpectedly: {}", e);
                return Err(e.into());
            }
            return Ok(());
        }
        _ = shutdown_signal() => {
            info!("Received shutdown signal, shutting down gracefully...");
        }
    }

    shutdown.trigger();
    server_task.await??;
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(terminate) => terminate,
        Err(e) => {
            warn!("Cannot listen for SIGTERM: {}", e);
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
