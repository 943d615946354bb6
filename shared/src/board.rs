//! 3x3 board, move legality and win/tie detection

use crate::message::Role;
use std::fmt;

pub const BOARD_SIZE: usize = 3;

/// Length of the flattened wire form
pub const BOARD_CELLS: usize = BOARD_SIZE * BOARD_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Taken(Role),
}

impl Cell {
    pub fn as_char(self) -> char {
        match self {
            Cell::Empty => '.',
            Cell::Taken(role) => role.as_char(),
        }
    }

    fn from_char(c: char) -> Option<Cell> {
        match c {
            '.' => Some(Cell::Empty),
            'X' => Some(Cell::Taken(Role::X)),
            'O' => Some(Cell::Taken(Role::O)),
            _ => None,
        }
    }
}

/// A cell address, 1-based as it appears on the wire (`row,col`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Decodes a `digit,digit` field. Range is not checked here.
    pub fn from_field(field: &str) -> Option<Position> {
        match field.as_bytes() {
            [r, b',', c] if r.is_ascii_digit() && c.is_ascii_digit() => Some(Position {
                row: (r - b'0') as usize,
                col: (c - b'0') as usize,
            }),
            _ => None,
        }
    }

    pub fn is_on_board(&self) -> bool {
        (1..=BOARD_SIZE).contains(&self.row) && (1..=BOARD_SIZE).contains(&self.col)
    }

    fn index(&self) -> usize {
        (self.row - 1) * BOARD_SIZE + (self.col - 1)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.row, self.col)
    }
}

/// Why a placement was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceError {
    OutOfRange,
    Occupied,
}

/// Row-major grid of cells
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Board {
    cells: [Cell; BOARD_CELLS],
}

// Every winning line as cell indices
const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, pos: Position) -> Option<Cell> {
        pos.is_on_board().then(|| self.cells[pos.index()])
    }

    /// Places `role` at `pos`, leaving the board untouched on failure.
    pub fn place(&mut self, pos: Position, role: Role) -> Result<(), PlaceError> {
        if !pos.is_on_board() {
            return Err(PlaceError::OutOfRange);
        }
        let cell = &mut self.cells[pos.index()];
        if *cell != Cell::Empty {
            return Err(PlaceError::Occupied);
        }
        *cell = Cell::Taken(role);
        Ok(())
    }

    pub fn has_won(&self, role: Role) -> bool {
        LINES
            .iter()
            .any(|line| line.iter().all(|&i| self.cells[i] == Cell::Taken(role)))
    }

    pub fn winner(&self) -> Option<Role> {
        [Role::X, Role::O].into_iter().find(|&r| self.has_won(r))
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|c| *c != Cell::Empty)
    }

    pub fn empty_positions(&self) -> Vec<Position> {
        (0..BOARD_CELLS)
            .filter(|&i| self.cells[i] == Cell::Empty)
            .map(|i| Position::new(i / BOARD_SIZE + 1, i % BOARD_SIZE + 1))
            .collect()
    }

    /// Flattened 9-character form used on the wire
    pub fn to_wire(&self) -> String {
        self.cells.iter().map(|c| c.as_char()).collect()
    }

    pub fn from_wire(s: &str) -> Option<Board> {
        if s.chars().count() != BOARD_CELLS {
            return None;
        }
        let mut board = Board::new();
        for (i, c) in s.chars().enumerate() {
            board.cells[i] = Cell::from_char(c)?;
        }
        Some(board)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(BOARD_SIZE)
    }
}
