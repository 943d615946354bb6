//! Wire encoding of outgoing messages

use crate::board::Board;
use crate::error::ProtocolError;
use crate::message::Message;
use crate::BOARD_LENGTH_INFLATION;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Builds the wire form of `message`, optionally followed by a board snapshot.
///
/// The snapshot is only appended to two-field messages, and the length field
/// is then inflated by a fixed [`BOARD_LENGTH_INFLATION`] rather than being
/// recomputed from the snapshot. Peers depend on that exact value.
pub fn encode(message: &Message, board: Option<&Board>) -> String {
    let token = message.kind.token();

    match (&message.field3, &message.field4, board) {
        (Some(f3), Some(f4), Some(board)) => format!(
            "{}|{}|{}|{}|{}|",
            token,
            message.length + BOARD_LENGTH_INFLATION,
            f3,
            f4,
            board.to_wire()
        ),
        (Some(f3), Some(f4), None) => format!("{}|{}|{}|{}|", token, message.length, f3, f4),
        (Some(f3), None, _) => format!("{}|{}|{}|", token, message.length, f3),
        _ => format!("{}|{}|", token, message.length),
    }
}

/// Encodes and writes one message, retrying partial writes until all bytes
/// are out.
pub async fn write_frame<W>(
    writer: &mut W,
    message: &Message,
    board: Option<&Board>,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode(message, board);
    writer.write_all(frame.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Position;
    use crate::frame::parse_frame;
    use crate::message::{DrawAction, MessageKind, Outcome, Role};

    fn decode(frame: &str) -> Message {
        let (message, consumed) = parse_frame(frame.as_bytes()).unwrap().unwrap();
        assert_eq!(consumed, frame.len());
        message
    }

    #[test]
    fn test_encode_without_fields() {
        assert_eq!(encode(&Message::wait(), None), "WAIT|0|");
        assert_eq!(encode(&Message::resign(), None), "RSGN|0|");
    }

    #[test]
    fn test_encode_one_field() {
        assert_eq!(encode(&Message::play("carol"), None), "PLAY|6|carol|");
        assert_eq!(
            encode(&Message::draw(DrawAction::Suggest), None),
            "DRAW|2|S|"
        );
        assert_eq!(
            encode(&Message::invalid("invalid move"), None),
            "INVL|13|invalid move|"
        );
    }

    #[test]
    fn test_encode_two_fields() {
        assert_eq!(
            encode(&Message::begin(Role::X, "carol"), None),
            "BEGN|8|X|carol|"
        );
        assert_eq!(
            encode(&Message::make_move(Role::X, "1,1"), None),
            "MOVE|6|X|1,1|"
        );
        assert_eq!(
            encode(&Message::over(Outcome::Draw, "the grid is full."), None),
            "OVER|20|D|the grid is full.|"
        );
    }

    #[test]
    fn test_encode_board_inflates_length() {
        let mut board = Board::new();
        board.place(Position::new(1, 1), Role::X).unwrap();

        assert_eq!(
            encode(&Message::move_done(Role::X, "1,1"), Some(&board)),
            "MOVD|16|X|1,1|X........|"
        );
    }

    #[test]
    fn test_board_ignored_for_single_field_messages() {
        let board = Board::new();
        assert_eq!(
            encode(&Message::invalid("invalid role"), Some(&board)),
            "INVL|13|invalid role|"
        );
    }

    #[test]
    fn test_round_trip_every_kind() {
        let messages = vec![
            Message::play("dave"),
            Message::wait(),
            Message::begin(Role::O, "dave"),
            Message::make_move(Role::O, "3,3"),
            Message::resign(),
            Message::draw(DrawAction::Accept),
            Message::over(Outcome::Win, "you have won."),
            Message::invalid("invalid command"),
        ];

        for message in messages {
            assert_eq!(decode(&encode(&message, None)), message);
        }
    }

    #[test]
    fn test_round_trip_board_variant() {
        let board = Board::from_wire("XO.......").unwrap();
        let sent = Message::move_done(Role::O, "1,2");

        let received = decode(&encode(&sent, Some(&board)));
        assert_eq!(received.kind, MessageKind::MoveDone);
        assert_eq!(received.length, sent.length + BOARD_LENGTH_INFLATION);
        assert_eq!(received.field3, sent.field3);
        assert_eq!(received.field4, sent.field4);
        assert_eq!(received.board, Some(board.to_wire()));
    }

    #[tokio::test]
    async fn test_write_frame() {
        let mut out: Vec<u8> = Vec::new();
        write_frame(&mut out, &Message::draw(DrawAction::Reject), None)
            .await
            .unwrap();
        write_frame(&mut out, &Message::wait(), None).await.unwrap();
        assert_eq!(out, b"DRAW|2|R|WAIT|0|");
    }
}
