use crate::game::{Action, ClientError, ClientGameState, Phase};
use crate::input::{Command, InputManager};
use crate::rendering::Renderer;
use log::{debug, info, warn};
use shared::{Connection, Message, MessageKind, Outcome};
use tokio::io::AsyncBufRead;

/// One player's session with the game server
pub struct Client<R> {
    connection: Connection,
    state: ClientGameState,
    input: InputManager<R>,
    renderer: Renderer,
}

impl<R: AsyncBufRead + Unpin> Client<R> {
    pub async fn connect(
        server_addr: &str,
        name: &str,
        input: InputManager<R>,
    ) -> Result<Self, ClientError> {
        info!("Connecting to {}...", server_addr);
        let connection = Connection::connect(server_addr).await?;
        Ok(Self::with_connection(connection, name, input))
    }

    pub fn with_connection(connection: Connection, name: &str, input: InputManager<R>) -> Self {
        Self {
            connection,
            state: ClientGameState::new(name),
            input,
            renderer: Renderer::new(),
        }
    }

    pub fn state(&self) -> &ClientGameState {
        &self.state
    }

    /// Registers, plays one game and returns its outcome. `None` means the
    /// game ended without a verdict, e.g. because the opponent disconnected.
    pub async fn run(mut self) -> Result<Option<Outcome>, ClientError> {
        let play = Message::play(&self.state.name);
        self.connection.send(&play, None).await?;

        loop {
            let message = self.connection.receive().await?;
            self.renderer.render_message(&message);

            let action = self.state.handle(&message)?;
            match message.kind {
                MessageKind::Begin => self.renderer.set_role(self.state.role),
                MessageKind::MoveDone => self.renderer.render_board(&self.state.board),
                _ => {}
            }

            match action {
                Action::Listen => {}
                Action::Play => {
                    let command = self.input.next_move(&self.state).await?;
                    self.send_command(command).await?;
                }
                Action::AnswerDraw => {
                    let command = self.input.answer_draw(&self.state).await?;
                    self.send_command(command).await?;
                }
                Action::Done => break,
            }
        }

        self.connection.close().await;
        match self.state.phase {
            Phase::Finished(outcome) => Ok(Some(outcome)),
            _ => {
                warn!("Game ended without a verdict");
                Ok(None)
            }
        }
    }

    async fn send_command(&mut self, command: Command) -> Result<(), ClientError> {
        let role = self
            .state
            .role
            .ok_or(ClientError::Unexpected(MessageKind::Begin))?;
        debug!("Sending {:?}", command);
        self.connection
            .send(&command.to_message(role), None)
            .await?;
        Ok(())
    }
}
