//! In-memory protocol messages and the small enumerations carried in their fields

use std::fmt;

/// The closed set of message kinds understood on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Play,
    Wait,
    Begin,
    Move,
    MoveDone,
    Resign,
    Draw,
    Over,
    Invalid,
}

impl MessageKind {
    pub const ALL: [MessageKind; 9] = [
        MessageKind::Play,
        MessageKind::Wait,
        MessageKind::Begin,
        MessageKind::Move,
        MessageKind::MoveDone,
        MessageKind::Resign,
        MessageKind::Draw,
        MessageKind::Over,
        MessageKind::Invalid,
    ];

    /// Four-letter wire token
    pub fn token(self) -> &'static str {
        match self {
            MessageKind::Play => "PLAY",
            MessageKind::Wait => "WAIT",
            MessageKind::Begin => "BEGN",
            MessageKind::Move => "MOVE",
            MessageKind::MoveDone => "MOVD",
            MessageKind::Resign => "RSGN",
            MessageKind::Draw => "DRAW",
            MessageKind::Over => "OVER",
            MessageKind::Invalid => "INVL",
        }
    }

    pub fn from_token(token: &[u8]) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.token().as_bytes() == token)
    }

    /// Number of `|`-terminated fields following the length field
    pub fn field_count(self) -> usize {
        match self {
            MessageKind::Wait | MessageKind::Resign => 0,
            MessageKind::Play | MessageKind::Draw | MessageKind::Invalid => 1,
            MessageKind::Begin | MessageKind::Move | MessageKind::Over => 2,
            MessageKind::MoveDone => 3,
        }
    }

    /// Length value this kind must always declare, if it is fixed
    pub fn fixed_length(self) -> Option<usize> {
        match self {
            MessageKind::Wait | MessageKind::Resign => Some(0),
            MessageKind::Draw => Some(2),
            MessageKind::Move => Some(6),
            MessageKind::MoveDone => Some(6 + crate::BOARD_LENGTH_INFLATION),
            MessageKind::Play | MessageKind::Begin | MessageKind::Over | MessageKind::Invalid => {
                None
            }
        }
    }

    /// True for the kinds a client is allowed to send
    pub fn is_client_kind(self) -> bool {
        matches!(
            self,
            MessageKind::Play | MessageKind::Move | MessageKind::Resign | MessageKind::Draw
        )
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// The mark a player places on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    X,
    O,
}

impl Role {
    pub fn opponent(self) -> Role {
        match self {
            Role::X => Role::O,
            Role::O => Role::X,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Role::X => 'X',
            Role::O => 'O',
        }
    }

    pub fn from_field(field: &str) -> Option<Role> {
        match field {
            "X" => Some(Role::X),
            "O" => Some(Role::O),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// The three purposes of a `DRAW` message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawAction {
    Suggest,
    Accept,
    Reject,
}

impl DrawAction {
    pub fn as_field(self) -> &'static str {
        match self {
            DrawAction::Suggest => "S",
            DrawAction::Accept => "A",
            DrawAction::Reject => "R",
        }
    }

    pub fn from_field(field: &str) -> Option<DrawAction> {
        match field {
            "S" => Some(DrawAction::Suggest),
            "A" => Some(DrawAction::Accept),
            "R" => Some(DrawAction::Reject),
            _ => None,
        }
    }
}

/// Result letter carried by `OVER`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Loss,
    Draw,
}

impl Outcome {
    pub fn as_field(self) -> &'static str {
        match self {
            Outcome::Win => "W",
            Outcome::Loss => "L",
            Outcome::Draw => "D",
        }
    }

    pub fn from_field(field: &str) -> Option<Outcome> {
        match field {
            "W" => Some(Outcome::Win),
            "L" => Some(Outcome::Loss),
            "D" => Some(Outcome::Draw),
            _ => None,
        }
    }
}

/// One protocol message.
///
/// `length` is the value written in the second wire field. Constructors set
/// it from the fields they are given; the codec inflates it when a board
/// snapshot is appended. A decoded `MOVD` carries its snapshot in `board`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub length: usize,
    pub field3: Option<String>,
    pub field4: Option<String>,
    pub board: Option<String>,
}

impl Message {
    fn with_fields(kind: MessageKind, field3: Option<String>, field4: Option<String>) -> Self {
        let length = match (&field3, &field4) {
            (Some(f3), Some(f4)) => f3.len() + f4.len() + 2,
            (Some(f3), None) => f3.len() + 1,
            _ => 0,
        };

        Self {
            kind,
            length,
            field3,
            field4,
            board: None,
        }
    }

    pub fn play(name: &str) -> Self {
        Self::with_fields(MessageKind::Play, Some(name.to_string()), None)
    }

    pub fn wait() -> Self {
        Self::with_fields(MessageKind::Wait, None, None)
    }

    pub fn begin(role: Role, opponent: &str) -> Self {
        Self::with_fields(
            MessageKind::Begin,
            Some(role.to_string()),
            Some(opponent.to_string()),
        )
    }

    pub fn make_move(role: Role, position: &str) -> Self {
        Self::with_fields(
            MessageKind::Move,
            Some(role.to_string()),
            Some(position.to_string()),
        )
    }

    /// `MOVD` announcing an accepted move; send it with the board snapshot.
    pub fn move_done(role: Role, position: &str) -> Self {
        Self::with_fields(
            MessageKind::MoveDone,
            Some(role.to_string()),
            Some(position.to_string()),
        )
    }

    pub fn resign() -> Self {
        Self::with_fields(MessageKind::Resign, None, None)
    }

    pub fn draw(action: DrawAction) -> Self {
        Self::with_fields(
            MessageKind::Draw,
            Some(action.as_field().to_string()),
            None,
        )
    }

    pub fn over(outcome: Outcome, reason: &str) -> Self {
        Self::with_fields(
            MessageKind::Over,
            Some(outcome.as_field().to_string()),
            Some(reason.to_string()),
        )
    }

    pub fn invalid(reason: &str) -> Self {
        Self::with_fields(MessageKind::Invalid, Some(reason.to_string()), None)
    }

    pub fn field3(&self) -> &str {
        self.field3.as_deref().unwrap_or("")
    }

    pub fn field4(&self) -> &str {
        self.field4.as_deref().unwrap_or("")
    }

    pub fn role(&self) -> Option<Role> {
        match self.kind {
            MessageKind::Begin | MessageKind::Move | MessageKind::MoveDone => {
                Role::from_field(self.field3())
            }
            _ => None,
        }
    }

    pub fn draw_action(&self) -> Option<DrawAction> {
        match self.kind {
            MessageKind::Draw => DrawAction::from_field(self.field3()),
            _ => None,
        }
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self.kind {
            MessageKind::Over => Outcome::from_field(self.field3()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_lookup() {
        for kind in MessageKind::ALL {
            assert_eq!(kind.token().len(), 4);
            assert_eq!(MessageKind::from_token(kind.token().as_bytes()), Some(kind));
        }
        assert_eq!(MessageKind::from_token(b"NOPE"), None);
        assert_eq!(MessageKind::from_token(b"play"), None);
        assert_eq!(MessageKind::from_token(b"PLA"), None);
    }

    #[test]
    fn test_constructor_lengths() {
        assert_eq!(Message::play("carol").length, 6);
        assert_eq!(Message::wait().length, 0);
        assert_eq!(Message::begin(Role::X, "carol").length, 8);
        assert_eq!(Message::make_move(Role::X, "1,1").length, 6);
        assert_eq!(Message::move_done(Role::O, "2,2").length, 6);
        assert_eq!(Message::resign().length, 0);
        assert_eq!(Message::draw(DrawAction::Suggest).length, 2);
        assert_eq!(Message::over(Outcome::Draw, "the grid is full.").length, 20);
        assert_eq!(Message::invalid("invalid move").length, 13);
    }

    #[test]
    fn test_fixed_lengths_match_constructors() {
        assert_eq!(
            MessageKind::Move.fixed_length(),
            Some(Message::make_move(Role::X, "3,3").length)
        );
        assert_eq!(
            MessageKind::Draw.fixed_length(),
            Some(Message::draw(DrawAction::Reject).length)
        );
        assert_eq!(MessageKind::MoveDone.fixed_length(), Some(16));
    }

    #[test]
    fn test_field_accessors() {
        let msg = Message::make_move(Role::O, "2,3");
        assert_eq!(msg.role(), Some(Role::O));
        assert_eq!(msg.field4(), "2,3");
        assert_eq!(msg.draw_action(), None);

        let msg = Message::draw(DrawAction::Accept);
        assert_eq!(msg.draw_action(), Some(DrawAction::Accept));
        assert_eq!(msg.role(), None);

        let msg = Message::over(Outcome::Loss, "you have resigned.");
        assert_eq!(msg.outcome(), Some(Outcome::Loss));
    }

    #[test]
    fn test_client_kinds() {
        let client: Vec<_> = MessageKind::ALL
            .into_iter()
            .filter(|k| k.is_client_kind())
            .collect();
        assert_eq!(
            client,
            vec![
                MessageKind::Play,
                MessageKind::Move,
                MessageKind::Resign,
                MessageKind::Draw
            ]
        );
    }

    #[test]
    fn test_role_opponent() {
        assert_eq!(Role::X.opponent(), Role::O);
        assert_eq!(Role::O.opponent(), Role::X);
        assert_eq!(Role::from_field("x"), None);
    }
}
