//! Error types for framing and connection-level protocol operations

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Structural problems found while framing bytes into a message.
///
/// Any of these is fatal for the connection it was read from: the stream
/// can no longer be trusted to be aligned on frame boundaries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("unknown message type {0:?}")]
    UnknownType(String),
    #[error("expected '|' at offset {0}")]
    MissingSeparator(usize),
    #[error("length field {0:?} is not a decimal number")]
    BadLength(String),
    #[error("length {0} exceeds the maximum of {max}", max = crate::MAX_FIELD_LENGTH)]
    LengthOutOfRange(usize),
    #[error("declared length {declared} does not match the {actual} bytes of fields")]
    LengthMismatch { declared: usize, actual: usize },
    #[error("{declared} bytes arrived after the length field without a field terminator")]
    LengthExceeded { declared: usize },
    #[error("invalid {kind} field {field:?}")]
    InvalidField { kind: &'static str, field: String },
    #[error("field is not valid UTF-8")]
    NotUtf8,
    #[error("frame does not fit in the {0} byte connection buffer")]
    BufferOverflow(usize),
}

/// Failures of a send or receive on a live connection.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] FrameError),
    #[error("connection lost")]
    ConnectionLost,
    #[error("no message within {:.1}s", .0.as_secs_f32())]
    Timeout(Duration),
    #[error("cancelled by shutdown")]
    Cancelled,
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl ProtocolError {
    /// True when the peer can no longer be written to either.
    pub fn is_disconnect(&self) -> bool {
        match self {
            ProtocolError::ConnectionLost => true,
            ProtocolError::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::BrokenPipe
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_error_messages() {
        assert_eq!(
            FrameError::UnknownType("ABCD".to_string()).to_string(),
            "unknown message type \"ABCD\""
        );
        assert_eq!(
            FrameError::LengthOutOfRange(300).to_string(),
            "length 300 exceeds the maximum of 256"
        );
    }

    #[test]
    fn test_malformed_converts_from_frame_error() {
        let err: ProtocolError = FrameError::MissingSeparator(4).into();
        assert!(matches!(
            err,
            ProtocolError::Malformed(FrameError::MissingSeparator(4))
        ));
        assert!(!err.is_disconnect());
    }

    #[test]
    fn test_disconnect_classification() {
        assert!(ProtocolError::ConnectionLost.is_disconnect());
        assert!(ProtocolError::Io(io::Error::from(io::ErrorKind::BrokenPipe)).is_disconnect());
        assert!(!ProtocolError::Timeout(Duration::from_secs(10)).is_disconnect());
        assert!(!ProtocolError::Cancelled.is_disconnect());
    }
}
