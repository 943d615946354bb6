//! Client-side view of a game, driven entirely by server messages

use log::{debug, info};
use shared::{Board, DrawAction, Message, MessageKind, Outcome, ProtocolError, Role};
use thiserror::Error;

/// Reasons after which the server still expects the same side to move
const RETRYABLE: [&str; 4] = [
    "invalid move",
    "invalid role",
    "invalid field",
    "invalid command",
];

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("server refused us: {0}")]
    Refused(String),
    #[error("unexpected {0} message from server")]
    Unexpected(MessageKind),
    #[error("input closed")]
    InputClosed,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Registering,
    Waiting,
    Playing,
    Finished(Outcome),
}

/// What the client should do after a server message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Keep listening
    Listen,
    /// Our move: send `MOVE`, `RSGN` or `DRAW|S`
    Play,
    /// The opponent proposed a draw: send `DRAW|A` or `DRAW|R`
    AnswerDraw,
    /// The game is over
    Done,
}

#[derive(Debug, Clone)]
pub struct ClientGameState {
    pub name: String,
    pub role: Option<Role>,
    pub opponent: Option<String>,
    pub board: Board,
    pub turn: Role,
    pub phase: Phase,
}

impl ClientGameState {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            role: None,
            opponent: None,
            board: Board::new(),
            turn: Role::X,
            phase: Phase::Registering,
        }
    }

    pub fn is_my_turn(&self) -> bool {
        self.phase == Phase::Playing && self.role == Some(self.turn)
    }

    fn next_action(&self) -> Action {
        if self.is_my_turn() {
            Action::Play
        } else {
            Action::Listen
        }
    }

    pub fn handle(&mut self, message: &Message) -> Result<Action, ClientError> {
        match message.kind {
            MessageKind::Wait => {
                self.phase = Phase::Waiting;
                Ok(Action::Listen)
            }
            MessageKind::Begin => {
                self.role = message.role();
                self.opponent = Some(message.field4().to_string());
                self.board = Board::new();
                self.turn = Role::X;
                self.phase = Phase::Playing;
                info!(
                    "Playing {} against {}",
                    message.field3(),
                    message.field4()
                );
                Ok(self.next_action())
            }
            MessageKind::MoveDone => {
                if let Some(board) = message.board.as_deref().and_then(Board::from_wire) {
                    self.board = board;
                }
                let mover = message.role().ok_or(ClientError::Unexpected(message.kind))?;
                self.turn = mover.opponent();

                // A verdict follows a winning or final move
                if self.board.winner().is_some() || self.board.is_full() {
                    return Ok(Action::Listen);
                }
                Ok(self.next_action())
            }
            MessageKind::Draw => match message.draw_action() {
                Some(DrawAction::Suggest) => Ok(Action::AnswerDraw),
                Some(DrawAction::Reject) => {
                    info!("{} rejected the draw", self.opponent_name());
                    Ok(self.next_action())
                }
                _ => Err(ClientError::Unexpected(message.kind)),
            },
            MessageKind::Invalid => {
                let reason = message.field3();
                if self.phase == Phase::Registering {
                    return Err(ClientError::Refused(reason.to_string()));
                }
                if self.is_my_turn() && RETRYABLE.contains(&reason) {
                    debug!("Move refused: {}", reason);
                    return Ok(Action::Play);
                }
                Ok(Action::Done)
            }
            MessageKind::Over => {
                let outcome = message
                    .outcome()
                    .ok_or(ClientError::Unexpected(message.kind))?;
                self.phase = Phase::Finished(outcome);
                Ok(Action::Done)
            }
            kind => Err(ClientError::Unexpected(kind)),
        }
    }

    pub fn opponent_name(&self) -> &str {
        self.opponent.as_deref().unwrap_or("opponent")
    }
}
