//! # Tic-Tac-Toe Game Server Library
//!
//! This library provides the authoritative server for networked tic-tac-toe.
//! Clients connect over TCP, register under a unique name, are paired into
//! games first come first served, and play to a verdict while the server
//! validates every move.
//!
//! ## Core Responsibilities
//!
//! ### Registration
//! A new connection must open with `PLAY|<len>|<name>|`. The name must be
//! non-empty, at most 128 bytes, and not used by any player in a waiting or
//! running game. Accepted clients receive `WAIT|0|`; refused ones receive an
//! `INVL` with the reason and are disconnected.
//!
//! ### Matchmaking
//! Registered players are seated as O in the newest game that has an open
//! seat, or open a new game as X. Both players are probed before the game
//! starts, and a player who left in the meantime is removed without
//! disturbing the one still waiting.
//!
//! ### Authoritative Play
//! The server owns the board. It reads only from the side to move, refuses
//! illegal input with `INVL` and lets the same side try again, broadcasts
//! each accepted move with a board snapshot, and decides wins, full-grid
//! ties, resignations and agreed draws.
//!
//! ## Architecture Design
//!
//! ### Dispatcher Plus One Task Per Game
//! A single accept loop performs registration inline and owns matchmaking.
//! Each started game runs on its own tokio task that exclusively owns both
//! connections, so per-game reads and writes never contend.
//!
//! ### Shared Registry
//! Games live in one registry behind an async mutex. The lock is held only
//! for bookkeeping; sockets are never read or written while holding it.
//!
//! ### Failure Handling
//! Framing errors, disconnects and read timeouts end the affected game:
//! both players receive `INVL|37|malformed message or connection lost|`
//! where possible, the game is removed from the registry, and both sockets
//! are closed. Other games are unaffected.
//!
//! ### Graceful Shutdown
//! A watch channel carries the shutdown flag. The accept loop stops taking
//! clients, waiting players are told the server is going away, and running
//! games abort their pending read and notify both sides.
//!
//! ## Module Organization
//!
//! ### Registry Module (`registry`)
//! Waiting and running games, name uniqueness, pairing and scrapping.
//!
//! ### Game Module (`game`)
//! The per-game turn loop, draw negotiation and verdicts.
//!
//! ### Network Module (`network`)
//! Listener, registration handshake, game start and shutdown coordination.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind(ServerConfig::default()).await?;
//!     let shutdown = server.shutdown_handle();
//!
//!     tokio::spawn(async move {
//!         let _ = tokio::signal::ctrl_c().await;
//!         shutdown.trigger();
//!     });
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod game;
pub mod network;
pub mod registry;
pub mod utils;
