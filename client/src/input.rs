//! Player input: parsing typed commands and choosing automatic moves

use crate::game::{ClientError, ClientGameState};
use rand::seq::SliceRandom;
use rand::Rng;
use shared::{Cell, DrawAction, Message, Position, Role, MAX_NAME_LENGTH, SEPARATOR};
use std::fmt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Move(Position),
    Resign,
    Draw,
    Accept,
    Reject,
}

impl Command {
    /// Protocol message for this command, sent as `role`
    pub fn to_message(self, role: Role) -> Message {
        match self {
            Command::Move(pos) => Message::make_move(role, &pos.to_string()),
            Command::Resign => Message::resign(),
            Command::Draw => Message::draw(DrawAction::Suggest),
            Command::Accept => Message::draw(DrawAction::Accept),
            Command::Reject => Message::draw(DrawAction::Reject),
        }
    }

    fn is_draw_answer(self) -> bool {
        matches!(self, Command::Accept | Command::Reject)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError(String);

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot understand {:?}; type row,col (e.g. 2,3), resign, draw, accept or reject",
            self.0
        )
    }
}

/// Parses one line of user input. Cells are `row,col`, 1-based; spaces
/// around the numbers are ignored.
pub fn parse_command(line: &str) -> Result<Command, ParseError> {
    let trimmed = line.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "resign" | "r" => return Ok(Command::Resign),
        "draw" | "d" => return Ok(Command::Draw),
        "accept" | "a" | "yes" | "y" => return Ok(Command::Accept),
        "reject" | "n" | "no" => return Ok(Command::Reject),
        _ => {}
    }

    let error = || ParseError(trimmed.to_string());
    let (row, col) = trimmed.split_once(',').ok_or_else(error)?;
    let row: usize = row.trim().parse().map_err(|_| error())?;
    let col: usize = col.trim().parse().map_err(|_| error())?;

    let position = Position::new(row, col);
    if !position.is_on_board() {
        return Err(error());
    }
    Ok(Command::Move(position))
}

pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.len() <= MAX_NAME_LENGTH && !name.bytes().any(|b| b == SEPARATOR)
}

/// Source of the player's decisions: a line reader, or random play
pub struct InputManager<R> {
    lines: Lines<R>,
    auto: bool,
}

impl<R: AsyncBufRead + Unpin> InputManager<R> {
    pub fn new(reader: R, auto: bool) -> Self {
        Self {
            lines: reader.lines(),
            auto,
        }
    }

    pub fn is_auto(&self) -> bool {
        self.auto
    }

    /// Asks for a registration name. Automatic play makes one up.
    pub async fn ask_name(&mut self) -> Result<String, ClientError> {
        if self.auto {
            return Ok(format!("auto{}", rand::thread_rng().gen_range(1000..10000)));
        }

        loop {
            println!("Your name:");
            let line = self.read_line().await?;
            let name = line.trim();
            if is_valid_name(name) {
                return Ok(name.to_string());
            }
            println!(
                "Names must be 1 to {} bytes long and may not contain '|'",
                MAX_NAME_LENGTH
            );
        }
    }

    /// Our turn: a move, a resignation or a draw proposal
    pub async fn next_move(&mut self, state: &ClientGameState) -> Result<Command, ClientError> {
        if self.auto {
            let empty = state.board.empty_positions();
            return Ok(empty
                .choose(&mut rand::thread_rng())
                .map(|&pos| Command::Move(pos))
                .unwrap_or(Command::Resign));
        }

        loop {
            println!("Your move ({}): row,col | resign | draw", state.name);
            match parse_command(&self.read_line().await?) {
                Ok(command) if command.is_draw_answer() => {
                    println!("There is no draw proposal to answer");
                }
                Ok(Command::Move(pos)) if state.board.get(pos) != Some(Cell::Empty) => {
                    println!("{} is already taken", pos);
                }
                Ok(command) => return Ok(command),
                Err(e) => println!("{}", e),
            }
        }
    }

    /// The opponent proposed a draw. Automatic play always declines.
    pub async fn answer_draw(&mut self, state: &ClientGameState) -> Result<Command, ClientError> {
        if self.auto {
            return Ok(Command::Reject);
        }

        loop {
            println!("{} proposes a draw: accept | reject", state.opponent_name());
            match parse_command(&self.read_line().await?) {
                Ok(command) if command.is_draw_answer() => return Ok(command),
                Ok(_) => println!("Answer the draw proposal first"),
                Err(e) => println!("{}", e),
            }
        }
    }

    async fn read_line(&mut self) -> Result<String, ClientError> {
        self.lines
            .next_line()
            .await?
            .ok_or(ClientError::InputClosed)
    }
}
