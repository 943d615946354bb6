//! Wire protocol shared by the game server and the terminal client.
//!
//! Messages are `|`-delimited ASCII frames of the form `TYPE|LEN|F3|F4|`,
//! where `TYPE` is a four-letter token, `LEN` the decimal byte count of
//! everything after the length field, and the number of trailing fields is
//! fixed per message kind.
//!
//! - [`message`]: typed messages and the enumerations carried in fields
//! - [`board`]: the 3x3 grid, move legality, win and tie detection
//! - [`frame`]: the incremental frame reader
//! - [`codec`]: the encoder
//! - [`connection`]: a TCP socket paired with its frame reader

pub mod board;
pub mod codec;
pub mod connection;
pub mod error;
pub mod frame;
pub mod message;

pub use board::{Board, Cell, PlaceError, Position};
pub use codec::{encode, write_frame};
pub use connection::Connection;
pub use error::{FrameError, ProtocolError};
pub use frame::{parse_frame, FrameBuffer, FrameReader};
pub use message::{DrawAction, Message, MessageKind, Outcome, Role};

pub const SEPARATOR: u8 = b'|';

/// Largest value the length field may carry
pub const MAX_FIELD_LENGTH: usize = 256;

/// Smallest possible frame, `TYPE|0|`
pub const MIN_FRAME_LENGTH: usize = 7;

/// Fixed amount added to the length field when a board snapshot is appended
pub const BOARD_LENGTH_INFLATION: usize = 10;

/// Per-connection read buffer size
pub const BUFFER_CAPACITY: usize = 1028;

pub const MAX_NAME_LENGTH: usize = 128;

pub const DEFAULT_PORT: u16 = 15000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_frame_constant() {
        assert_eq!(encode(&Message::resign(), None).len(), MIN_FRAME_LENGTH);
    }

    #[test]
    fn test_largest_frame_fits_buffer() {
        let largest = 4 + 1 + 3 + 1 + MAX_FIELD_LENGTH;
        assert!(largest < BUFFER_CAPACITY);
    }

    #[test]
    fn test_inflation_matches_board_framing() {
        // Snapshot plus its terminator, for the 3x3 board
        assert_eq!(board::BOARD_CELLS + 1, BOARD_LENGTH_INFLATION);
    }
}
