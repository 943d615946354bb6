//! Incremental framing of `TYPE|LEN|FIELD|...|` messages from a byte stream
//!
//! Bytes arrive in arbitrary fragments. Every call to [`parse_frame`] starts
//! again at offset 0 of the unconsumed input and either returns one complete
//! message, reports that more bytes are needed, or rejects the input. Prefix
//! bytes are cheap to re-scan because a frame can never exceed
//! `4 + 1 + 3 + 1 + MAX_FIELD_LENGTH` bytes.

use crate::board::{Board, Position};
use crate::error::{FrameError, ProtocolError};
use crate::message::{DrawAction, Message, MessageKind, Outcome, Role};
use crate::{BUFFER_CAPACITY, MAX_FIELD_LENGTH, SEPARATOR};
use log::debug;
use tokio::io::{AsyncRead, AsyncReadExt};

const TYPE_LEN: usize = 4;
const MAX_LENGTH_DIGITS: usize = 3;
const READ_CHUNK: usize = 512;

/// Capacity-bounded byte buffer holding unconsumed input for one connection.
///
/// Bytes `[0, len)` are always valid, unconsumed input; consuming a frame
/// shifts whatever follows it to the front.
#[derive(Debug)]
pub struct FrameBuffer {
    bytes: Vec<u8>,
    capacity: usize,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::with_capacity(BUFFER_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn remaining_capacity(&self) -> usize {
        self.capacity - self.bytes.len()
    }

    pub fn append(&mut self, data: &[u8]) -> Result<(), FrameError> {
        if data.len() > self.remaining_capacity() {
            return Err(FrameError::BufferOverflow(self.capacity));
        }
        self.bytes.extend_from_slice(data);
        Ok(())
    }

    /// Position of the next `delim` at or after `from`
    pub fn find(&self, delim: u8, from: usize) -> Option<usize> {
        find_from(&self.bytes, delim, from)
    }

    /// Drops the first `n` bytes and keeps the remainder at the front.
    pub fn consume(&mut self, n: usize) {
        let n = n.min(self.bytes.len());
        self.bytes.drain(..n);
    }

    /// Reads whatever the source has ready, up to the remaining capacity.
    /// Returns 0 at end of stream.
    pub async fn read_from<R>(&mut self, reader: &mut R) -> Result<usize, ProtocolError>
    where
        R: AsyncRead + Unpin,
    {
        let room = self.remaining_capacity().min(READ_CHUNK);
        if room == 0 {
            return Err(FrameError::BufferOverflow(self.capacity).into());
        }

        let mut chunk = [0u8; READ_CHUNK];
        let n = reader.read(&mut chunk[..room]).await?;
        self.bytes.extend_from_slice(&chunk[..n]);
        Ok(n)
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

fn find_from(bytes: &[u8], delim: u8, from: usize) -> Option<usize> {
    bytes
        .get(from..)?
        .iter()
        .position(|&b| b == delim)
        .map(|i| i + from)
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Decodes a complete length field. Only plain decimal digits are accepted.
fn parse_length(digits: &[u8]) -> Result<usize, FrameError> {
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(FrameError::BadLength(lossy(digits)));
    }
    if digits.len() > MAX_LENGTH_DIGITS {
        let value = lossy(digits).parse().unwrap_or(usize::MAX);
        return Err(FrameError::LengthOutOfRange(value));
    }

    let value: usize = lossy(digits)
        .parse()
        .map_err(|_| FrameError::BadLength(lossy(digits)))?;
    if value > MAX_FIELD_LENGTH {
        return Err(FrameError::LengthOutOfRange(value));
    }
    Ok(value)
}

/// Validates the content of field `index` of a `kind` message.
fn check_field(kind: MessageKind, index: usize, raw: &[u8]) -> Result<String, FrameError> {
    let field = String::from_utf8(raw.to_vec()).map_err(|_| FrameError::NotUtf8)?;

    let valid = match (kind, index) {
        (MessageKind::Draw, 0) => DrawAction::from_field(&field).is_some(),
        (MessageKind::Move | MessageKind::MoveDone | MessageKind::Begin, 0) => {
            Role::from_field(&field).is_some()
        }
        (MessageKind::Move | MessageKind::MoveDone, 1) => Position::from_field(&field).is_some(),
        (MessageKind::MoveDone, 2) => Board::from_wire(&field).is_some(),
        (MessageKind::Over, 0) => Outcome::from_field(&field).is_some(),
        _ => true,
    };

    if valid {
        Ok(field)
    } else {
        Err(FrameError::InvalidField {
            kind: kind.token(),
            field,
        })
    }
}

/// Attempts to frame one message at the start of `buf`.
///
/// Returns `Ok(Some((message, consumed)))` for a complete frame,
/// `Ok(None)` when `buf` is a valid but incomplete prefix, and an error as
/// soon as the bytes seen so far cannot start a valid frame.
pub fn parse_frame(buf: &[u8]) -> Result<Option<(Message, usize)>, FrameError> {
    if let Some(i) = buf.iter().take(TYPE_LEN).position(|&b| b == SEPARATOR) {
        return Err(FrameError::UnknownType(lossy(&buf[..i])));
    }
    if buf.len() < TYPE_LEN {
        return Ok(None);
    }

    let kind = MessageKind::from_token(&buf[..TYPE_LEN])
        .ok_or_else(|| FrameError::UnknownType(lossy(&buf[..TYPE_LEN])))?;

    match buf.get(TYPE_LEN) {
        None => return Ok(None),
        Some(&SEPARATOR) => {}
        Some(_) => return Err(FrameError::MissingSeparator(TYPE_LEN)),
    }

    let length_start = TYPE_LEN + 1;
    let length_end = match find_from(buf, SEPARATOR, length_start) {
        Some(end) => end,
        None => {
            // Digits may still be arriving; anything else can never become valid
            let digits = &buf[length_start..];
            if digits.len() > MAX_LENGTH_DIGITS || !digits.iter().all(u8::is_ascii_digit) {
                parse_length(digits)?;
            }
            return Ok(None);
        }
    };

    let declared = parse_length(&buf[length_start..length_end])?;
    if let Some(fixed) = kind.fixed_length() {
        if declared != fixed {
            return Err(FrameError::LengthMismatch {
                declared,
                actual: fixed,
            });
        }
    }

    let body_start = length_end + 1;
    let mut fields = Vec::with_capacity(kind.field_count());
    let mut cursor = body_start;

    for index in 0..kind.field_count() {
        let end = match find_from(buf, SEPARATOR, cursor) {
            Some(end) => end,
            None if buf.len() - body_start >= declared => {
                return Err(FrameError::LengthExceeded { declared });
            }
            None => return Ok(None),
        };
        fields.push(check_field(kind, index, &buf[cursor..end])?);
        cursor = end + 1;
    }

    let actual = cursor - body_start;
    if actual != declared {
        return Err(FrameError::LengthMismatch { declared, actual });
    }

    let mut fields = fields.into_iter();
    let message = Message {
        kind,
        length: declared,
        field3: fields.next(),
        field4: fields.next(),
        board: fields.next(),
    };
    Ok(Some((message, cursor)))
}

/// Per-connection reader that yields one validated message at a time.
#[derive(Debug, Default)]
pub struct FrameReader {
    buffer: FrameBuffer,
}

impl FrameReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    /// Adds raw bytes as if they had been read from the stream.
    pub fn feed(&mut self, data: &[u8]) -> Result<(), FrameError> {
        self.buffer.append(data)
    }

    /// True when a complete message is already buffered
    pub fn has_message(&self) -> bool {
        matches!(parse_frame(self.buffer.as_bytes()), Ok(Some(_)))
    }

    /// Takes the next complete message out of the buffer, if there is one.
    /// `Ok(None)` means more data is needed.
    pub fn try_next(&mut self) -> Result<Option<Message>, FrameError> {
        match parse_frame(self.buffer.as_bytes())? {
            Some((message, consumed)) => {
                self.buffer.consume(consumed);
                Ok(Some(message))
            }
            None => Ok(None),
        }
    }

    /// Reads from `reader` until one full message is framed.
    ///
    /// A message already sitting in the buffer is returned without reading.
    /// End of stream before a complete frame is a lost connection.
    pub async fn receive<R>(&mut self, reader: &mut R) -> Result<Message, ProtocolError>
    where
        R: AsyncRead + Unpin,
    {
        loop {
            if let Some(message) = self.try_next()? {
                debug!("framed {} ({} bytes left over)", message.kind, self.buffer.len());
                return Ok(message);
            }

            if self.buffer.read_from(reader).await? == 0 {
                return Err(ProtocolError::ConnectionLost);
            }
        }
    }
}
