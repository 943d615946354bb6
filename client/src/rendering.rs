use shared::{Board, Message, MessageKind, Outcome, Role};

/// Text rendering for the terminal
pub struct Renderer {
    role: Option<Role>,
}

impl Renderer {
    pub fn new() -> Self {
        Self { role: None }
    }

    pub fn set_role(&mut self, role: Option<Role>) {
        self.role = role;
    }

    pub fn render_board(&self, board: &Board) {
        println!("{}", draw_board(board));
    }

    /// Prints a line about `message`, if it is worth telling the user about
    pub fn render_message(&self, message: &Message) {
        if let Some(line) = describe(message, self.role) {
            println!("{}", line);
        }
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

/// The grid with row and column numbers, as typed by the player
pub fn draw_board(board: &Board) -> String {
    let mut out = String::from("    1   2   3\n");
    for (i, row) in board.rows().enumerate() {
        if i > 0 {
            out.push_str("   ---+---+---\n");
        }
        let cells: Vec<String> = row
            .iter()
            .map(|cell| match cell.as_char() {
                '.' => " ".to_string(),
                c => c.to_string(),
            })
            .collect();
        out.push_str(&format!("{}   {}\n", i + 1, cells.join(" | ")));
    }
    out
}

pub fn describe(message: &Message, me: Option<Role>) -> Option<String> {
    match message.kind {
        MessageKind::Wait => Some("Registered, waiting for an opponent...".to_string()),
        MessageKind::Begin => Some(format!(
            "Game on! You play {} against {}",
            message.field3(),
            message.field4()
        )),
        MessageKind::MoveDone => {
            let who = if message.role() == me { "You" } else { "Opponent" };
            Some(format!("{} played {}", who, message.field4()))
        }
        MessageKind::Invalid => Some(format!("Server: {}", message.field3())),
        MessageKind::Over => {
            let verdict = match message.outcome() {
                Some(Outcome::Win) => "You win",
                Some(Outcome::Loss) => "You lose",
                Some(Outcome::Draw) | None => "Draw",
            };
            Some(format!("{}: {}", verdict, message.field4()))
        }
        _ => None,
    }
}
