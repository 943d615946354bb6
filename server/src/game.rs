//! Game engine: runs one paired game from the opening message to the verdict
//!
//! A session owns both players' connections for its whole life. Turns
//! alternate starting with X; only the side to move is ever read from. Any
//! application-level mistake (wrong role, occupied cell, wrong message for
//! the moment) is answered with `INVL` and the same side moves again. A
//! framing error, timeout or disconnect ends the game for both sides.

use crate::registry::{GameId, Player, SharedRegistry};
use crate::utils::wait_for_shutdown;
use log::{debug, info, warn};
use shared::{Board, DrawAction, Message, MessageKind, Outcome, Position, ProtocolError, Role};
use std::time::Duration;
use tokio::sync::watch;

pub const REASON_LOST: &str = "malformed message or connection lost";
pub const REASON_INVALID_MOVE: &str = "invalid move";
pub const REASON_INVALID_ROLE: &str = "invalid role";
pub const REASON_INVALID_FIELD: &str = "invalid field";
pub const REASON_INVALID_COMMAND: &str = "invalid command";
pub const REASON_SHUTDOWN: &str = "server shutting down";

/// How a game ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameResult {
    Won(Role),
    Tied,
    Resigned(Role),
    DrawAgreed,
    /// Ended without a verdict; carries the reason sent to the players, if any
    Aborted(String),
}

/// What the current turn led to
#[derive(Debug)]
enum Turn {
    /// Same side moves again
    Retry,
    /// Turn passes to the opponent
    Advance,
    Over(GameResult),
}

/// Failures that end the game
#[derive(Debug)]
enum Fatal {
    /// Reading from a player failed; both sides are told before closing
    Receive(ProtocolError),
    /// Writing to a player failed; only the other side is told
    Send(Role, ProtocolError),
}

pub struct GameSession {
    id: GameId,
    x: Player,
    o: Player,
    board: Board,
    turn: Role,
    registry: SharedRegistry,
    read_timeout: Duration,
    shutdown: watch::Receiver<bool>,
}

impl GameSession {
    pub fn new(
        id: GameId,
        x: Player,
        o: Player,
        registry: SharedRegistry,
        read_timeout: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            id,
            x,
            o,
            board: Board::new(),
            turn: Role::X,
            registry,
            read_timeout,
            shutdown,
        }
    }

    pub fn id(&self) -> GameId {
        self.id
    }

    /// Plays the game to the end, then scraps it from the registry and
    /// closes both connections.
    pub async fn run(mut self) -> GameResult {
        info!(
            "Game {} started: {} (X) vs {} (O)",
            self.id, self.x.name, self.o.name
        );

        let result = match self.play().await {
            Ok(result) => result,
            Err(Fatal::Receive(err)) => {
                let reason = match err {
                    ProtocolError::Cancelled => REASON_SHUTDOWN,
                    _ => REASON_LOST,
                };
                warn!("Game {}: {}", self.id, err);
                self.notify_both(&Message::invalid(reason)).await;
                GameResult::Aborted(reason.to_string())
            }
            Err(Fatal::Send(role, err)) => {
                warn!("Game {}: send to {} failed: {}", self.id, role, err);
                self.notify(role.opponent(), &Message::invalid(REASON_LOST))
                    .await;
                GameResult::Aborted(REASON_LOST.to_string())
            }
        };

        info!("Game {} finished: {:?}", self.id, result);
        self.finish().await;
        result
    }

    async fn play(&mut self) -> Result<GameResult, Fatal> {
        let x_begin = Message::begin(Role::X, &self.o.name);
        let o_begin = Message::begin(Role::O, &self.x.name);
        self.send(Role::X, &x_begin, false).await?;
        self.send(Role::O, &o_begin, false).await?;

        loop {
            match self.take_turn().await? {
                Turn::Retry => {}
                Turn::Advance => self.turn = self.turn.opponent(),
                Turn::Over(result) => return Ok(result),
            }
        }
    }

    async fn take_turn(&mut self) -> Result<Turn, Fatal> {
        let mover = self.turn;
        let message = self.receive(mover).await?;

        if !message.kind.is_client_kind() {
            debug!(
                "Game {}: {} sent server-only {}",
                self.id,
                self.name(mover),
                message.kind
            );
            return self.reject(mover, REASON_INVALID_COMMAND).await;
        }

        match message.kind {
            MessageKind::Move => self.handle_move(mover, &message).await,
            MessageKind::Resign => self.handle_resign(mover).await,
            MessageKind::Draw => match message.draw_action() {
                Some(DrawAction::Suggest) => self.negotiate_draw(mover).await,
                _ => self.reject(mover, REASON_INVALID_FIELD).await,
            },
            _ => self.reject(mover, REASON_INVALID_COMMAND).await,
        }
    }

    async fn handle_move(&mut self, mover: Role, message: &Message) -> Result<Turn, Fatal> {
        if message.role() != Some(mover) {
            return self.reject(mover, REASON_INVALID_ROLE).await;
        }
        let Some(position) = Position::from_field(message.field4()) else {
            return self.reject(mover, REASON_INVALID_MOVE).await;
        };
        if let Err(e) = self.board.place(position, mover) {
            debug!("Game {}: {} at {} refused: {:?}", self.id, mover, position, e);
            return self.reject(mover, REASON_INVALID_MOVE).await;
        }

        let done = Message::move_done(mover, &position.to_string());
        self.send(mover, &done, true).await?;
        self.send(mover.opponent(), &done, true).await?;

        if self.board.has_won(mover) {
            let line = format!("{} has completed a line and won.", self.name(mover));
            self.send_verdict(
                mover,
                Message::over(Outcome::Win, "you have won."),
                Message::over(Outcome::Loss, &line),
            )
            .await;
            return Ok(Turn::Over(GameResult::Won(mover)));
        }

        if self.board.is_full() {
            let full = Message::over(Outcome::Draw, "the grid is full.");
            self.send_verdict(mover, full.clone(), full).await;
            return Ok(Turn::Over(GameResult::Tied));
        }

        Ok(Turn::Advance)
    }

    async fn handle_resign(&mut self, mover: Role) -> Result<Turn, Fatal> {
        let resigned = format!("{} has resigned.", self.name(mover));
        self.send_verdict(
            mover,
            Message::over(Outcome::Loss, "you have resigned."),
            Message::over(Outcome::Win, &resigned),
        )
        .await;
        Ok(Turn::Over(GameResult::Resigned(mover)))
    }

    /// Relays a draw suggestion to the watcher and waits for an answer. The
    /// suggestion is repeated until the watcher answers with accept or reject.
    async fn negotiate_draw(&mut self, mover: Role) -> Result<Turn, Fatal> {
        let watcher = mover.opponent();
        let suggest = Message::draw(DrawAction::Suggest);

        let answer = loop {
            self.send(watcher, &suggest, false).await?;
            let reply = self.receive(watcher).await?;
            match (reply.kind, reply.draw_action()) {
                (MessageKind::Draw, Some(action @ (DrawAction::Accept | DrawAction::Reject))) => {
                    break action
                }
                _ => debug!(
                    "Game {}: {} answered a draw offer with {}, asking again",
                    self.id,
                    self.name(watcher),
                    reply.kind
                ),
            }
        };

        if answer == DrawAction::Accept {
            let agreed = Message::over(Outcome::Draw, "both players agreed to a draw");
            self.send_verdict(mover, agreed.clone(), agreed).await;
            return Ok(Turn::Over(GameResult::DrawAgreed));
        }

        info!("Game {}: {} declined the draw", self.id, self.name(watcher));
        self.send(mover, &Message::draw(DrawAction::Reject), false)
            .await?;
        Ok(Turn::Retry)
    }

    async fn reject(&mut self, role: Role, reason: &str) -> Result<Turn, Fatal> {
        debug!("Game {}: rejecting {}: {}", self.id, self.name(role), reason);
        self.send(role, &Message::invalid(reason), false).await?;
        Ok(Turn::Retry)
    }

    fn name(&self, role: Role) -> &str {
        match role {
            Role::X => &self.x.name,
            Role::O => &self.o.name,
        }
    }

    async fn send(&mut self, role: Role, message: &Message, with_board: bool) -> Result<(), Fatal> {
        let board = with_board.then_some(&self.board);
        let player = match role {
            Role::X => &mut self.x,
            Role::O => &mut self.o,
        };
        player
            .connection
            .send(message, board)
            .await
            .map_err(|e| Fatal::Send(role, e))
    }

    /// Reads the next message from `role`, racing the read timeout and the
    /// server shutdown.
    async fn receive(&mut self, role: Role) -> Result<Message, Fatal> {
        let limit = self.read_timeout;
        let player = match role {
            Role::X => &mut self.x,
            Role::O => &mut self.o,
        };

        if !player.connection.has_pending_message() && !player.connection.is_connected().await {
            return Err(Fatal::Receive(ProtocolError::ConnectionLost));
        }

        tokio::select! {
            result = player.connection.receive_within(limit) => result.map_err(Fatal::Receive),
            _ = wait_for_shutdown(&mut self.shutdown) => Err(Fatal::Receive(ProtocolError::Cancelled)),
        }
    }

    /// Final messages: failures are logged only, the game ends either way.
    async fn send_verdict(&mut self, mover: Role, to_mover: Message, to_watcher: Message) {
        for (role, message) in [(mover, to_mover), (mover.opponent(), to_watcher)] {
            if let Err(Fatal::Send(_, e) | Fatal::Receive(e)) = self.send(role, &message, false).await {
                debug!("Game {}: verdict to {} not delivered: {}", self.id, role, e);
            }
        }
    }

    async fn notify(&mut self, role: Role, message: &Message) {
        if let Err(Fatal::Send(_, e) | Fatal::Receive(e)) = self.send(role, message, false).await {
            debug!("Game {}: notice to {} not delivered: {}", self.id, role, e);
        }
    }

    async fn notify_both(&mut self, message: &Message) {
        for role in [Role::X, Role::O] {
            self.notify(role, message).await;
        }
    }

    async fn finish(self) {
        let GameSession {
            id, x, o, registry, ..
        } = self;
        registry.lock().await.scrap(id);
        x.connection.close().await;
        o.connection.close().await;
    }
}
