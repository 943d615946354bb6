//! # Tic-Tac-Toe Terminal Client
//!
//! Connects to the game server, registers a name and plays one game, either
//! interactively on stdin or with random moves (`--auto`).
//!
//! The server is authoritative: the client never applies a move locally. It
//! keeps a copy of the board taken from each `MOVD` snapshot and works out
//! whose turn it is from the role of the last mover.
//!
//! ## Module Organization
//!
//! - `game`: client view of the game and what to do after each message
//! - `input`: command parsing and the interactive or automatic move source
//! - `network`: the session loop over one server connection
//! - `rendering`: text board and status lines
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::input::InputManager;
//! use client::network::Client;
//! use tokio::io::{stdin, BufReader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let input = InputManager::new(BufReader::new(stdin()), true);
//!     let client = Client::connect("127.0.0.1:15000", "carol", input).await?;
//!     let outcome = client.run().await?;
//!     println!("{:?}", outcome);
//!     Ok(())
//! }
//! ```

pub mod game;
pub mod input;
pub mod network;
pub mod rendering;
