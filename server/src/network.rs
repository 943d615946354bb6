//! Dispatcher: accepts connections, registers players and starts games

use crate::game::{GameResult, GameSession, REASON_LOST, REASON_SHUTDOWN};
use crate::registry::{GameId, Joined, Player, SessionRegistry, SharedRegistry};
use crate::utils::{wait_for_shutdown, ShutdownHandle};
use log::{debug, error, info, warn};
use shared::{Connection, Message, MessageKind, ProtocolError, DEFAULT_PORT, MAX_NAME_LENGTH};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle, JoinSet};

pub const REASON_NOT_PLAY: &str = "invalid message";
pub const REASON_BAD_NAME: &str = "name is invalid";
pub const REASON_NAME_TAKEN: &str = "name is in use";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Longest wait for any single message from a client
    pub read_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            read_timeout: Duration::from_secs(10),
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Listening game server. Registration runs on the accept loop, one client
/// at a time; each paired game runs on its own task.
pub struct Server {
    listener: TcpListener,
    registry: SharedRegistry,
    config: ServerConfig,
    shutdown: ShutdownHandle,
    shutdown_rx: watch::Receiver<bool>,
    games: JoinSet<GameResult>,
}

impl Server {
    pub async fn bind(config: ServerConfig) -> io::Result<Self> {
        let listener = TcpListener::bind(config.address()).await?;
        info!("Server listening on {}", listener.local_addr()?);

        let (shutdown, shutdown_rx) = ShutdownHandle::new();
        Ok(Self {
            listener,
            registry: SessionRegistry::shared(),
            config,
            shutdown,
            shutdown_rx,
            games: JoinSet::new(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn registry(&self) -> SharedRegistry {
        SharedRegistry::clone(&self.registry)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Accepts clients until shutdown is triggered, then tells waiting
    /// players the server is going away and waits for running games to
    /// wind down.
    pub async fn run(mut self) -> io::Result<()> {
        let mut shutdown = self.shutdown_rx.clone();

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        info!("New connection from {}", addr);
                        self.admit(stream).await;
                    }
                    Err(e) => error!("Failed to accept connection: {}", e),
                },
                Some(finished) = self.games.join_next(), if !self.games.is_empty() => {
                    log_finished(finished);
                }
                _ = wait_for_shutdown(&mut shutdown) => break,
            }
        }

        info!("Shutting down");
        let waiting = self.registry.lock().await.take_waiting();
        for player in waiting {
            debug!("Telling waiting player {:?} about the shutdown", player.name);
            refuse(player.connection, REASON_SHUTDOWN).await;
        }

        while let Some(finished) = self.games.join_next().await {
            log_finished(finished);
        }
        info!("Server stopped");
        Ok(())
    }

    /// Spawns [`Server::run`] and returns a handle that can stop it.
    pub fn start(self) -> io::Result<ServerHandle> {
        let addr = self.local_addr()?;
        let registry = self.registry();
        let shutdown = self.shutdown_handle();
        let task = tokio::spawn(self.run());
        Ok(ServerHandle {
            addr,
            registry,
            shutdown,
            task,
        })
    }

    async fn admit(&mut self, stream: TcpStream) {
        let connection = match Connection::new(stream) {
            Ok(connection) => connection,
            Err(e) => {
                warn!("Dropping connection without a peer address: {}", e);
                return;
            }
        };

        let Some(player) = self.register(connection).await else {
            return;
        };

        let joined = self.registry.lock().await.join_or_create(player);
        if let Joined::Ready(id) = joined {
            self.start_game(id).await;
        }
    }

    /// Registration handshake: a `PLAY` with a free name is answered with
    /// `WAIT`. Anything else is answered with `INVL` and the socket closed.
    async fn register(&self, mut connection: Connection) -> Option<Player> {
        let peer = connection.peer_addr();
        let mut shutdown = self.shutdown_rx.clone();

        let received = tokio::select! {
            result = connection.receive_within(self.config.read_timeout) => result,
            _ = wait_for_shutdown(&mut shutdown) => Err(ProtocolError::Cancelled),
        };
        let message = match received {
            Ok(message) => message,
            Err(ProtocolError::Cancelled) => {
                info!("Registration from {} cancelled by shutdown", peer);
                refuse(connection, REASON_SHUTDOWN).await;
                return None;
            }
            Err(e) => {
                warn!("Registration from {} failed: {}", peer, e);
                refuse(connection, REASON_LOST).await;
                return None;
            }
        };

        if message.kind != MessageKind::Play {
            warn!("Expected PLAY from {}, got {}", peer, message.kind);
            refuse(connection, REASON_NOT_PLAY).await;
            return None;
        }

        let name = message.field3();
        if name.is_empty() || name.len() > MAX_NAME_LENGTH {
            warn!("Refusing name of {} bytes from {}", name.len(), peer);
            refuse(connection, REASON_BAD_NAME).await;
            return None;
        }
        if self.registry.lock().await.name_in_use(name) {
            info!("Name {:?} requested by {} is already in use", name, peer);
            refuse(connection, REASON_NAME_TAKEN).await;
            return None;
        }

        if let Err(e) = connection.send(&Message::wait(), None).await {
            warn!("Could not confirm registration of {}: {}", peer, e);
            connection.close().await;
            return None;
        }

        info!("{} registered as {:?}", peer, name);
        Some(Player::new(name, connection))
    }

    /// Probes both players of a freshly paired game. If both are still there
    /// the game starts; otherwise the registry is repaired.
    async fn start_game(&mut self, id: GameId) {
        let Some((x, o)) = self.registry.lock().await.claim_players(id) else {
            return;
        };

        let x_alive = x.connection.is_connected().await;
        let o_alive = o.connection.is_connected().await;

        match (x_alive, o_alive) {
            (true, true) => {
                let session = GameSession::new(
                    id,
                    x,
                    o,
                    self.registry(),
                    self.config.read_timeout,
                    self.shutdown_rx.clone(),
                );
                self.games.spawn(session.run());
            }
            (false, true) => {
                self.registry.lock().await.demote_to_x(id, o);
                x.connection.close().await;
            }
            (true, false) => {
                self.registry.lock().await.reopen(id, x);
                o.connection.close().await;
            }
            (false, false) => {
                debug!("Both players of game {} left before it started", id);
                self.registry.lock().await.scrap(id);
                x.connection.close().await;
                o.connection.close().await;
            }
        }
    }
}

async fn refuse(mut connection: Connection, reason: &str) {
    if let Err(e) = connection.send(&Message::invalid(reason), None).await {
        debug!("Notice {:?} to {} not delivered: {}", reason, connection.peer_addr(), e);
    }
    connection.close().await;
}

fn log_finished(finished: Result<GameResult, JoinError>) {
    match finished {
        Ok(result) => debug!("Game task ended with {:?}", result),
        Err(e) => error!("Game task failed: {}", e),
    }
}

/// A server running on a background task
pub struct ServerHandle {
    pub addr: SocketAddr,
    pub registry: SharedRegistry,
    shutdown: ShutdownHandle,
    task: JoinHandle<io::Result<()>>,
}

impl ServerHandle {
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Triggers shutdown and waits for the server task to finish.
    pub async fn stop(self) -> io::Result<()> {
        self.shutdown.trigger();
        self.task
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::FrameReader;
    use tokio::io::AsyncWriteExt;

    async fn test_server() -> ServerHandle {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            read_timeout: Duration::from_secs(5),
        };
        Server::bind(config).await.unwrap().start().unwrap()
    }

    async fn exchange(addr: SocketAddr, frame: &str) -> Message {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(frame.as_bytes()).await.unwrap();
        FrameReader::new().receive(&mut stream).await.unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.address(), "0.0.0.0:15000");
        assert_eq!(config.read_timeout, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_play_is_answered_with_wait() {
        let server = test_server().await;
        let reply = exchange(server.addr, "PLAY|6|alice|").await;
        assert_eq!(reply.kind, MessageKind::Wait);
        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_first_message_must_be_play() {
        let server = test_server().await;
        let reply = exchange(server.addr, "RSGN|0|").await;
        assert_eq!(reply.kind, MessageKind::Invalid);
        assert_eq!(reply.field3(), REASON_NOT_PLAY);
        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_name_refused() {
        let server = test_server().await;
        let reply = exchange(server.addr, "PLAY|1||").await;
        assert_eq!(reply.field3(), REASON_BAD_NAME);
        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_registration_refused() {
        let server = test_server().await;
        let reply = exchange(server.addr, "PLAY|x|alice|").await;
        assert_eq!(reply.field3(), REASON_LOST);
        assert!(server.registry.lock().await.is_empty());
        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_with_waiting_player() {
        let server = test_server().await;
        let mut stream = TcpStream::connect(server.addr).await.unwrap();
        stream.write_all(b"PLAY|6|alice|").await.unwrap();
        let mut reader = FrameReader::new();
        assert_eq!(
            reader.receive(&mut stream).await.unwrap().kind,
            MessageKind::Wait
        );

        let registry = server.registry.clone();
        server.stop().await.unwrap();

        let notice = reader.receive(&mut stream).await.unwrap();
        assert_eq!(notice.field3(), REASON_SHUTDOWN);
        assert!(registry.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_stop_does_not_wait_for_silent_registrant() {
        let server = test_server().await;
        let mut stream = TcpStream::connect(server.addr).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let started = std::time::Instant::now();
        server.stop().await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));

        let notice = FrameReader::new().receive(&mut stream).await.unwrap();
        assert_eq!(notice.kind, MessageKind::Invalid);
        assert_eq!(notice.field3(), REASON_SHUTDOWN);
    }
}
