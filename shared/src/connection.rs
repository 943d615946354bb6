//! A framed TCP connection: socket, read buffer and liveness probe

use crate::board::Board;
use crate::codec::write_frame;
use crate::error::ProtocolError;
use crate::frame::FrameReader;
use crate::message::Message;
use log::debug;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// One peer's socket together with its unconsumed input.
///
/// The read buffer travels with the socket, so bytes that arrived ahead of
/// the message being handled are not lost when the connection changes
/// owner.
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    reader: FrameReader,
    peer: SocketAddr,
}

impl Connection {
    pub fn new(stream: TcpStream) -> io::Result<Self> {
        let peer = stream.peer_addr()?;
        Ok(Self {
            stream,
            reader: FrameReader::new(),
            peer,
        })
    }

    pub async fn connect(addr: &str) -> io::Result<Self> {
        Self::new(TcpStream::connect(addr).await?)
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Blocks until one complete message has been framed.
    pub async fn receive(&mut self) -> Result<Message, ProtocolError> {
        let message = self.reader.receive(&mut self.stream).await?;
        debug!("[recv {}] {:?}", self.peer, message);
        Ok(message)
    }

    /// Like [`Connection::receive`], giving up after `limit`.
    pub async fn receive_within(&mut self, limit: Duration) -> Result<Message, ProtocolError> {
        match timeout(limit, self.receive()).await {
            Ok(result) => result,
            Err(_) => Err(ProtocolError::Timeout(limit)),
        }
    }

    /// True when the next [`Connection::receive`] can be answered from
    /// bytes already read, even if the peer has since closed.
    pub fn has_pending_message(&self) -> bool {
        self.reader.has_message()
    }

    /// Zero-wait probe. True while the peer is connected, including when it
    /// simply has nothing to say; false once it has closed its side.
    pub async fn is_connected(&self) -> bool {
        let mut byte = [0u8; 1];
        match timeout(Duration::ZERO, self.stream.peek(&mut byte)).await {
            Err(_) => true,
            Ok(Ok(0)) => false,
            Ok(Ok(_)) => true,
            Ok(Err(e)) => e.kind() == io::ErrorKind::WouldBlock,
        }
    }

    /// Probes the peer, then writes the whole encoded message.
    pub async fn send(&mut self, message: &Message, board: Option<&Board>) -> Result<(), ProtocolError> {
        if !self.is_connected().await {
            return Err(ProtocolError::ConnectionLost);
        }
        write_frame(&mut self.stream, message, board).await?;
        debug!("[send {}] {:?}", self.peer, message.kind);
        Ok(())
    }

    /// Closes the write side; the socket itself is released on drop.
    pub async fn close(mut self) {
        let _ = self.stream.shutdown().await;
    }
}
