//! Matchmaking: the set of games waiting for a second player or in progress
//!
//! This module handles pairing of registered clients into games, including:
//! - First-fit matching of a new client into an open game
//! - Name uniqueness across every waiting and running game
//! - Recovery when a waiting player turns out to have disconnected
//! - Removal ("scrapping") of finished or abandoned games
//!
//! The registry is shared by the dispatcher and every running game through
//! a single async mutex (see [`SharedRegistry`]). Each operation is one short
//! critical section; no socket I/O ever happens while the lock is held.

use log::info;
use shared::Connection;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

pub type GameId = u64;

pub type SharedRegistry = Arc<Mutex<SessionRegistry>>;

/// A registered client: the name it asked for and its connection
#[derive(Debug)]
pub struct Player {
    pub name: String,
    pub connection: Connection,
}

impl Player {
    pub fn new(name: impl Into<String>, connection: Connection) -> Self {
        Self {
            name: name.into(),
            connection,
        }
    }
}

/// An occupied seat. The connection is absent while a game engine owns it.
#[derive(Debug)]
struct Seat {
    name: String,
    connection: Option<Connection>,
}

impl From<Player> for Seat {
    fn from(player: Player) -> Self {
        Seat {
            name: player.name,
            connection: Some(player.connection),
        }
    }
}

#[derive(Debug)]
enum Slot {
    Open,
    Filled(Seat),
}

/// Lifecycle of a game as the registry sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    /// X is seated and O is open
    Waiting,
    /// Both seats are filled; the dispatcher has not started the game yet
    Ready,
    /// A game engine owns both connections
    InProgress,
}

/// Result of [`SessionRegistry::join_or_create`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Joined {
    Waiting(GameId),
    Ready(GameId),
}

impl Joined {
    pub fn id(self) -> GameId {
        match self {
            Joined::Waiting(id) | Joined::Ready(id) => id,
        }
    }
}

#[derive(Debug)]
struct GameRecord {
    x: Seat,
    o: Slot,
}

impl GameRecord {
    fn status(&self) -> GameStatus {
        match &self.o {
            Slot::Open => GameStatus::Waiting,
            Slot::Filled(o) if o.connection.is_some() && self.x.connection.is_some() => {
                GameStatus::Ready
            }
            Slot::Filled(_) => GameStatus::InProgress,
        }
    }

    fn names(&self) -> (&str, &str) {
        let o = match &self.o {
            Slot::Filled(seat) => seat.name.as_str(),
            Slot::Open => "",
        };
        (&self.x.name, o)
    }
}

/// Every game that has not been scrapped, keyed by creation order
#[derive(Debug)]
pub struct SessionRegistry {
    games: BTreeMap<GameId, GameRecord>,
    next_game_id: GameId,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            games: BTreeMap::new(),
            next_game_id: 1,
        }
    }

    /// A new empty registry behind the shared lock
    pub fn shared() -> SharedRegistry {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    pub fn status(&self, id: GameId) -> Option<GameStatus> {
        self.games.get(&id).map(GameRecord::status)
    }

    /// X and O names of a game; O is empty while the seat is open
    pub fn names(&self, id: GameId) -> Option<(String, String)> {
        self.games
            .get(&id)
            .map(|g| g.names())
            .map(|(x, o)| (x.to_string(), o.to_string()))
    }

    /// Seats `player` as O in the newest game with an open O seat, or opens
    /// a new game with `player` as X.
    ///
    /// Matching is first-fit over games from newest to oldest; a game that
    /// has waited longer gets no priority.
    pub fn join_or_create(&mut self, player: Player) -> Joined {
        let open = self
            .games
            .iter_mut()
            .rev()
            .find(|(_, game)| matches!(game.o, Slot::Open) && game.x.connection.is_some());

        if let Some((&id, game)) = open {
            info!("{} joins {} in game {}", player.name, game.x.name, id);
            game.o = Slot::Filled(player.into());
            return Joined::Ready(id);
        }

        let id = self.next_game_id;
        self.next_game_id += 1;

        info!("{} opens game {} and waits for an opponent", player.name, id);
        self.games.insert(
            id,
            GameRecord {
                x: player.into(),
                o: Slot::Open,
            },
        );
        Joined::Waiting(id)
    }

    /// Case-sensitive lookup over both seats of every game
    pub fn name_in_use(&self, name: &str) -> bool {
        self.games.values().any(|game| {
            let (x, o) = game.names();
            x == name || o == name
        })
    }

    /// Hands both players of a ready game to the caller. The names stay
    /// registered until the game is scrapped.
    pub fn claim_players(&mut self, id: GameId) -> Option<(Player, Player)> {
        let game = self.games.get_mut(&id)?;
        if game.status() != GameStatus::Ready {
            return None;
        }

        let Slot::Filled(o) = &mut game.o else {
            return None;
        };
        let x_conn = game.x.connection.take()?;
        let o_conn = o.connection.take()?;

        Some((
            Player::new(game.x.name.clone(), x_conn),
            Player::new(o.name.clone(), o_conn),
        ))
    }

    /// X disconnected before the game could start: the former O becomes X
    /// and the game goes back to waiting.
    pub fn demote_to_x(&mut self, id: GameId, survivor: Player) -> bool {
        let Some(game) = self.games.get_mut(&id) else {
            return false;
        };
        info!(
            "Game {}: {} left before the start, {} now waits as X",
            id, game.x.name, survivor.name
        );
        game.x = survivor.into();
        game.o = Slot::Open;
        true
    }

    /// O disconnected before the game could start: X keeps waiting.
    pub fn reopen(&mut self, id: GameId, x: Player) -> bool {
        let Some(game) = self.games.get_mut(&id) else {
            return false;
        };
        info!("Game {}: opponent left before the start, {} keeps waiting", id, x.name);
        game.x = x.into();
        game.o = Slot::Open;
        true
    }

    /// Removes a game. Connections still held by the registry are dropped,
    /// which closes them. Returns false if the game was already gone.
    pub fn scrap(&mut self, id: GameId) -> bool {
        match self.games.remove(&id) {
            Some(game) => {
                let (x, o) = game.names();
                info!("Scrapped game {} between {:?} and {:?}", id, x, o);
                true
            }
            None => false,
        }
    }

    /// Removes every game that has not started and returns its players.
    pub fn take_waiting(&mut self) -> Vec<Player> {
        let waiting: Vec<GameId> = self
            .games
            .iter()
            .filter(|(_, game)| game.status() != GameStatus::InProgress)
            .map(|(&id, _)| id)
            .collect();

        let mut players = Vec::new();
        for id in waiting {
            if let Some(game) = self.games.remove(&id) {
                let o = match game.o {
                    Slot::Filled(seat) => Some(seat),
                    Slot::Open => None,
                };
                for seat in std::iter::once(game.x).chain(o) {
                    if let Some(connection) = seat.connection {
                        players.push(Player::new(seat.name, connection));
                    }
                }
            }
        }
        players
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::{TcpListener, TcpStream};

    /// Server-side connection plus the client socket keeping it open
    async fn connection() -> (Connection, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap())
            .await
            .unwrap();
        let (server, _) = listener.accept().await.unwrap();
        (Connection::new(server).unwrap(), client)
    }

    async fn player(name: &str) -> (Player, TcpStream) {
        let (conn, client) = connection().await;
        (Player::new(name, conn), client)
    }

    #[tokio::test]
    async fn test_first_player_waits() {
        let mut registry = SessionRegistry::new();
        let (alice, _a) = player("alice").await;

        let joined = registry.join_or_create(alice);
        assert!(matches!(joined, Joined::Waiting(_)));
        assert_eq!(registry.status(joined.id()), Some(GameStatus::Waiting));
        assert_eq!(
            registry.names(joined.id()),
            Some(("alice".to_string(), String::new()))
        );
    }

    #[tokio::test]
    async fn test_second_player_fills_open_game() {
        let mut registry = SessionRegistry::new();
        let (alice, _a) = player("alice").await;
        let (bob, _b) = player("bob").await;

        let first = registry.join_or_create(alice);
        let second = registry.join_or_create(bob);

        assert_eq!(second, Joined::Ready(first.id()));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.status(first.id()), Some(GameStatus::Ready));
    }

    #[tokio::test]
    async fn test_third_player_opens_new_game() {
        let mut registry = SessionRegistry::new();
        let (alice, _a) = player("alice").await;
        let (bob, _b) = player("bob").await;
        let (carol, _c) = player("carol").await;

        registry.join_or_create(alice);
        registry.join_or_create(bob);
        let third = registry.join_or_create(carol);

        assert!(matches!(third, Joined::Waiting(_)));
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_name_in_use_checks_both_seats() {
        let mut registry = SessionRegistry::new();
        let (alice, _a) = player("alice").await;
        let (bob, _b) = player("bob").await;
        registry.join_or_create(alice);
        registry.join_or_create(bob);

        assert!(registry.name_in_use("alice"));
        assert!(registry.name_in_use("bob"));
        assert!(!registry.name_in_use("Alice"));
        assert!(!registry.name_in_use("carol"));
    }

    #[tokio::test]
    async fn test_claimed_game_keeps_names_registered() {
        let mut registry = SessionRegistry::new();
        let (alice, _a) = player("alice").await;
        let (bob, _b) = player("bob").await;
        registry.join_or_create(alice);
        let id = registry.join_or_create(bob).id();

        let (x, o) = registry.claim_players(id).unwrap();
        assert_eq!(x.name, "alice");
        assert_eq!(o.name, "bob");
        assert_eq!(registry.status(id), Some(GameStatus::InProgress));
        assert!(registry.name_in_use("alice"));

        // A game in progress is never matched again
        assert!(registry.claim_players(id).is_none());
        let (carol, _c) = player("carol").await;
        assert_ne!(registry.join_or_create(carol).id(), id);
    }

    #[tokio::test]
    async fn test_claim_waiting_game_fails() {
        let mut registry = SessionRegistry::new();
        let (alice, _a) = player("alice").await;
        let id = registry.join_or_create(alice).id();

        assert!(registry.claim_players(id).is_none());
        assert_eq!(registry.status(id), Some(GameStatus::Waiting));
    }

    #[tokio::test]
    async fn test_demote_to_x() {
        let mut registry = SessionRegistry::new();
        let (alice, _a) = player("alice").await;
        let (bob, _b) = player("bob").await;
        registry.join_or_create(alice);
        let id = registry.join_or_create(bob).id();

        let (_x, o) = registry.claim_players(id).unwrap();
        assert!(registry.demote_to_x(id, o));

        assert_eq!(registry.status(id), Some(GameStatus::Waiting));
        assert_eq!(registry.names(id), Some(("bob".to_string(), String::new())));
        assert!(!registry.name_in_use("alice"));
    }

    #[tokio::test]
    async fn test_reopen_keeps_x() {
        let mut registry = SessionRegistry::new();
        let (alice, _a) = player("alice").await;
        let (bob, _b) = player("bob").await;
        registry.join_or_create(alice);
        let id = registry.join_or_create(bob).id();

        let (x, _o) = registry.claim_players(id).unwrap();
        assert!(registry.reopen(id, x));

        assert_eq!(registry.status(id), Some(GameStatus::Waiting));
        assert!(!registry.name_in_use("bob"));
    }

    #[tokio::test]
    async fn test_matching_prefers_newest_open_game() {
        let mut registry = SessionRegistry::new();
        let (alice, _a) = player("alice").await;
        let (bob, _b) = player("bob").await;
        let (carol, _c) = player("carol").await;
        let (dave, _d) = player("dave").await;

        registry.join_or_create(alice);
        let older = registry.join_or_create(bob).id();
        let newer = registry.join_or_create(carol).id();

        // The older game loses its O before starting, so two games wait
        let (x, _o) = registry.claim_players(older).unwrap();
        registry.reopen(older, x);

        assert_eq!(registry.join_or_create(dave), Joined::Ready(newer));
        assert_eq!(registry.status(older), Some(GameStatus::Waiting));
    }

    #[tokio::test]
    async fn test_scrap_is_idempotent() {
        let mut registry = SessionRegistry::new();
        let (alice, _a) = player("alice").await;
        let id = registry.join_or_create(alice).id();

        assert!(registry.scrap(id));
        assert!(!registry.scrap(id));
        assert!(registry.is_empty());
        assert!(!registry.name_in_use("alice"));
    }

    #[tokio::test]
    async fn test_take_waiting_leaves_running_games() {
        let mut registry = SessionRegistry::new();
        let (alice, _a) = player("alice").await;
        let (bob, _b) = player("bob").await;
        let (carol, _c) = player("carol").await;
        registry.join_or_create(alice);
        let running = registry.join_or_create(bob).id();
        registry.join_or_create(carol);
        let _held = registry.claim_players(running).unwrap();

        let waiting = registry.take_waiting();
        assert_eq!(waiting.len(), 1);
        assert_eq!(waiting[0].name, "carol");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.status(running), Some(GameStatus::InProgress));
    }
}
