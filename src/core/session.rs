//! Client session - drives the controller with real I/O
//!
//! ClientSession owns the SessionController and the ReconnectionManager and
//! wires them to the I/O traits: it drains transport events, feeds every
//! input through the controller, then applies the resulting effects to the
//! sender, the render sink, the token store and the game-data source.
//! Platform-independent and tested with mocks.

use std::collections::VecDeque;

use tracing::{debug, info, warn};

use crate::core::controller::{Command, Effect, Input, SessionController, SessionSnapshot};
use crate::core::io_traits::{
    CommandSender, ConnectionStatus, GameDataError, GameDataSource, RenderSink, ServerConnection,
    ServerEvent, TokenStore,
};
use crate::core::reconnect::ReconnectionManager;
use crate::core::render::RenderInstruction;
use crate::core::types::{RoundCounts, Screen};

// =============================================================================
// SESSION EVENTS
// =============================================================================

/// Events emitted by ClientSession for logging and the outer loop
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Connection status changed
    ConnectionChanged(ConnectionStatus),
    /// Reconnect requests were sent after a (re)connect
    ReconnectAttempted(usize),
    /// The controller moved to another screen
    ScreenChanged(Screen),
    /// A message could not be sent because the transport is down
    SendDropped(&'static str),
    /// Transport-level failure
    TransportError(String),
}

// =============================================================================
// CLIENT SESSION
// =============================================================================

pub struct ClientSession<T: TokenStore> {
    controller: SessionController,
    reconnect: ReconnectionManager<T>,
    status: ConnectionStatus,
}

impl<T: TokenStore> ClientSession<T> {
    pub fn new(controller: SessionController, store: T) -> Self {
        Self {
            controller,
            reconnect: ReconnectionManager::new(store),
            status: ConnectionStatus::Disconnected,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.controller.snapshot()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn token_store(&self) -> &T {
        self.reconnect.store()
    }

    /// Drain pending transport events.
    ///
    /// Call on every loop iteration; returns what happened for logging.
    pub fn update<S, R, D>(&mut self, server: &mut S, render: &mut R, data: &D) -> Vec<SessionEvent>
    where
        S: ServerConnection,
        R: RenderSink,
        D: GameDataSource,
    {
        let mut events = Vec::new();

        while let Some(event) = server.poll_event() {
            match event {
                ServerEvent::StatusChanged(status) => {
                    self.on_status(status, server, render, &mut events);
                }
                ServerEvent::Message(msg) => {
                    self.dispatch(Input::Server(msg), server, render, data, &mut events);
                }
                ServerEvent::Error(err) => {
                    warn!(error = %err, "[SESSION] Transport error");
                    render.render(&RenderInstruction::PersistentError(err.clone()));
                    events.push(SessionEvent::TransportError(err));
                }
            }
        }

        events
    }

    /// Advance local countdowns by one second
    pub fn tick<S, R, D>(&mut self, server: &mut S, render: &mut R, data: &D) -> Vec<SessionEvent>
    where
        S: CommandSender,
        R: RenderSink,
        D: GameDataSource,
    {
        let mut events = Vec::new();
        self.dispatch(Input::Tick, server, render, data, &mut events);
        events
    }

    /// Apply a local user command
    pub fn command<S, R, D>(
        &mut self,
        command: Command,
        server: &mut S,
        render: &mut R,
        data: &D,
    ) -> Vec<SessionEvent>
    where
        S: CommandSender,
        R: RenderSink,
        D: GameDataSource,
    {
        let mut events = Vec::new();
        self.dispatch(Input::Command(command), server, render, data, &mut events);
        events
    }

    /// Feed back the outcome of a game-data request
    pub fn game_data<S, R, D>(
        &mut self,
        result: Result<RoundCounts, GameDataError>,
        server: &mut S,
        render: &mut R,
        data: &D,
    ) -> Vec<SessionEvent>
    where
        S: CommandSender,
        R: RenderSink,
        D: GameDataSource,
    {
        let input = match result {
            Ok(counts) => {
                info!(total = counts.total(), "[SESSION] Game data fetched");
                Input::GameDataLoaded(counts)
            }
            Err(e) => Input::GameDataFailed(e.to_string()),
        };
        let mut events = Vec::new();
        self.dispatch(input, server, render, data, &mut events);
        events
    }

    fn on_status<S, R>(
        &mut self,
        status: ConnectionStatus,
        server: &mut S,
        render: &mut R,
        events: &mut Vec<SessionEvent>,
    ) where
        S: CommandSender,
        R: RenderSink,
    {
        self.status = status;
        render.render(&RenderInstruction::Connection(status));
        events.push(SessionEvent::ConnectionChanged(status));

        if status == ConnectionStatus::Connected {
            let requests = self.reconnect.on_connected();
            if !requests.is_empty() {
                let count = requests.len();
                for request in requests {
                    server.send(request);
                }
                events.push(SessionEvent::ReconnectAttempted(count));
            }
        }
    }

    fn dispatch<S, R, D>(
        &mut self,
        input: Input,
        server: &mut S,
        render: &mut R,
        data: &D,
        events: &mut Vec<SessionEvent>,
    ) where
        S: CommandSender,
        R: RenderSink,
        D: GameDataSource,
    {
        let mut queue: VecDeque<Effect> = self.controller.handle(input).into();

        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::Send(msg) => {
                    if server.is_connected() {
                        debug!(kind = msg.kind(), "[SESSION] Sending");
                        server.send(msg);
                    } else {
                        warn!(kind = msg.kind(), "[SESSION] Not connected, message dropped");
                        render.render(&RenderInstruction::PersistentError(
                            "Not connected to the game server".to_string(),
                        ));
                        events.push(SessionEvent::SendDropped(msg.kind()));
                    }
                }
                Effect::Render(instruction) => {
                    if let RenderInstruction::ShowScreen(screen) = &instruction {
                        events.push(SessionEvent::ScreenChanged(*screen));
                    }
                    render.render(&instruction);
                }
                Effect::PersistHostToken(token) => {
                    if let Err(e) = self.reconnect.remember_host(&token) {
                        warn!(error = %e, "[SESSION] Failed to persist host token");
                    }
                }
                Effect::PersistPlayerCredentials(creds) => {
                    if let Err(e) = self.reconnect.remember_player(&creds) {
                        warn!(error = %e, "[SESSION] Failed to persist player credentials");
                    }
                }
                Effect::ForgetHostToken => {
                    if let Err(e) = self.reconnect.forget_host() {
                        warn!(error = %e, "[SESSION] Failed to remove host token");
                    }
                }
                Effect::ForgetPlayerCredentials => {
                    if let Err(e) = self.reconnect.forget_player() {
                        warn!(error = %e, "[SESSION] Failed to remove player credentials");
                    }
                }
                Effect::FetchGameData => {
                    debug!("[SESSION] Requesting game data");
                    data.request_round_counts();
                }
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io_traits::mocks::{
        MemoryTokenStore, MockGameData, MockServerConnection, RecordingRenderSink,
    };
    use crate::core::protocol::{ClientMessage, Phase, QuestionPayload, ServerMessage};
    use crate::core::types::Role;

    struct Harness {
        session: ClientSession<MemoryTokenStore>,
        server: MockServerConnection,
        render: RecordingRenderSink,
        data: MockGameData,
    }

    impl Harness {
        fn new(store: MemoryTokenStore) -> Self {
            Self {
                session: ClientSession::new(SessionController::with_seed(3), store),
                server: MockServerConnection::new(),
                render: RecordingRenderSink::new(),
                data: MockGameData::new(),
            }
        }

        fn deliver(&mut self, msg: ServerMessage) -> Vec<SessionEvent> {
            self.server.queue_message(msg);
            self.update()
        }

        fn update(&mut self) -> Vec<SessionEvent> {
            self.session
                .update(&mut self.server, &mut self.render, &self.data)
        }

        fn tick(&mut self, n: u32) -> Vec<SessionEvent> {
            (0..n)
                .flat_map(|_| {
                    self.session
                        .tick(&mut self.server, &mut self.render, &self.data)
                })
                .collect()
        }

        fn command(&mut self, cmd: Command) -> Vec<SessionEvent> {
            self.session
                .command(cmd, &mut self.server, &mut self.render, &self.data)
        }

        fn game_data(&mut self, result: Result<RoundCounts, GameDataError>) -> Vec<SessionEvent> {
            self.session
                .game_data(result, &mut self.server, &mut self.render, &self.data)
        }
    }

    fn player_question(number: u32) -> ServerMessage {
        ServerMessage::PlayerQuestion(QuestionPayload {
            question_number: number,
            total_questions: 3,
            message: None,
            options: vec!["ann".to_string(), "bob".to_string()],
            phase: Phase::Authentic,
            player_count: None,
        })
    }

    // -------------------------------------------------------------------------
    // Reconnection
    // -------------------------------------------------------------------------

    #[test]
    fn test_connect_without_tokens_sends_nothing() {
        let mut h = Harness::new(MemoryTokenStore::new());
        h.server
            .queue_event(ServerEvent::StatusChanged(ConnectionStatus::Connected));
        let events = h.update();
        assert_eq!(
            events,
            vec![SessionEvent::ConnectionChanged(ConnectionStatus::Connected)]
        );
        assert_eq!(h.server.sent_count(), 0);
        assert_eq!(h.session.status(), ConnectionStatus::Connected);
    }

    #[test]
    fn test_connect_with_host_token_reconnects_host() {
        let mut h = Harness::new(MemoryTokenStore::with(&[("host_token", "h1")]));
        h.server
            .queue_event(ServerEvent::StatusChanged(ConnectionStatus::Connected));
        let events = h.update();
        assert!(events.contains(&SessionEvent::ReconnectAttempted(1)));
        assert_eq!(h.server.sent_kinds(), vec!["host_reconnect"]);
    }

    #[test]
    fn test_every_reconnect_presents_tokens_again() {
        let mut h = Harness::new(MemoryTokenStore::with(&[
            ("player_token", "t1"),
            ("player_name", "Ann"),
            ("game_code", "AB12"),
        ]));
        for status in [
            ConnectionStatus::Connected,
            ConnectionStatus::Reconnecting,
            ConnectionStatus::Connected,
        ] {
            h.server.queue_event(ServerEvent::StatusChanged(status));
        }
        h.update();
        assert_eq!(h.server.count_of("player_reconnect"), 2);
    }

    // -------------------------------------------------------------------------
    // End-to-end flows
    // -------------------------------------------------------------------------

    #[test]
    fn test_create_flow_persists_host_token_and_loads_game_data() {
        let mut h = Harness::new(MemoryTokenStore::new());
        h.command(Command::CreateGame);
        assert_eq!(
            h.server.last_sent(),
            Some(ClientMessage::CreateGame {
                player_name: "Host".to_string()
            })
        );

        let events = h.deliver(ServerMessage::GameCreated {
            game_code: "AB12".to_string(),
            player_name: "Host".to_string(),
            host_token: Some("h1".to_string()),
        });

        assert!(events.contains(&SessionEvent::ScreenChanged(Screen::Lobby(Role::Host))));
        assert_eq!(
            h.session.token_store().get("host_token").as_deref(),
            Some("h1")
        );
        assert_eq!(h.data.request_count(), 1);
        assert_eq!(h.session.snapshot().session.total_rounds, 0);

        h.game_data(Ok(RoundCounts::new(3, 3)));
        assert_eq!(h.session.snapshot().session.total_rounds, 6);
    }

    #[test]
    fn test_game_data_request_does_not_wait_for_answer() {
        let mut h = Harness::new(MemoryTokenStore::new());
        h.deliver(ServerMessage::JoinedGame {
            player_name: "Ann".to_string(),
            game_code: "AB12".to_string(),
            player_token: None,
            players: vec!["Ann".to_string()],
        });
        h.deliver(ServerMessage::GameStarted { total_rounds: None });
        assert_eq!(h.data.request_count(), 1);

        // Countdown keeps running while the request is outstanding
        h.tick(7);
        assert_eq!(h.server.count_of("request_first_question"), 1);
        h.deliver(player_question(1));
        assert_eq!(h.session.snapshot().screen, Screen::Question);

        h.game_data(Ok(RoundCounts::new(4, 2)));
        let snapshot = h.session.snapshot();
        assert_eq!(snapshot.session.total_rounds, 6);
        assert_eq!(snapshot.question.map(|q| q.total_rounds), Some(6));
    }

    #[test]
    fn test_join_flow_persists_player_credentials() {
        let mut h = Harness::new(MemoryTokenStore::new());
        h.command(Command::JoinGame {
            game_code: "ab12".to_string(),
            player_name: "Ann".to_string(),
        });
        h.deliver(ServerMessage::JoinedGame {
            player_name: "Ann".to_string(),
            game_code: "AB12".to_string(),
            player_token: Some("t1".to_string()),
            players: vec!["Ann".to_string()],
        });

        let store = h.session.token_store();
        assert_eq!(store.get("player_token").as_deref(), Some("t1"));
        assert_eq!(store.get("player_name").as_deref(), Some("Ann"));
        assert_eq!(store.get("game_code").as_deref(), Some("AB12"));
        assert_eq!(h.session.snapshot().screen, Screen::Lobby(Role::Player));
    }

    #[test]
    fn test_leave_game_removes_credentials() {
        let mut h = Harness::new(MemoryTokenStore::new());
        h.deliver(ServerMessage::JoinedGame {
            player_name: "Ann".to_string(),
            game_code: "AB12".to_string(),
            player_token: Some("t1".to_string()),
            players: vec![],
        });
        h.command(Command::LeaveGame);
        assert!(h.session.token_store().values.is_empty());
        assert_eq!(h.session.snapshot().screen, Screen::Home);
    }

    #[test]
    fn test_game_data_failure_renders_error() {
        let mut h = Harness::new(MemoryTokenStore::new());
        h.deliver(ServerMessage::GameCreated {
            game_code: "AB12".to_string(),
            player_name: "Host".to_string(),
            host_token: None,
        });
        h.game_data(Err(GameDataError::Unavailable(
            "No game data available".to_string(),
        )));
        assert!(h.render.contains(|r| matches!(
            r,
            RenderInstruction::PersistentError(m) if m.contains("No game data")
        )));
        assert_eq!(h.session.snapshot().session.total_rounds, 0);
    }

    #[test]
    fn test_tutorial_then_auto_submit() {
        let mut h = Harness::new(MemoryTokenStore::new());
        h.deliver(ServerMessage::JoinedGame {
            player_name: "Ann".to_string(),
            game_code: "AB12".to_string(),
            player_token: None,
            players: vec!["Ann".to_string()],
        });
        h.deliver(ServerMessage::GameStarted { total_rounds: None });
        h.tick(2);
        h.deliver(player_question(1));
        h.tick(5);
        assert_eq!(h.server.count_of("request_first_question"), 0);
        assert_eq!(h.session.snapshot().screen, Screen::Question);

        h.tick(15);
        assert_eq!(h.server.count_of("submit_answer"), 1);
    }

    #[test]
    fn test_send_while_disconnected_is_dropped() {
        let mut h = Harness::new(MemoryTokenStore::new());
        h.server.set_connected(false);
        let events = h.command(Command::CreateGame);
        assert_eq!(events, vec![SessionEvent::SendDropped("create_game")]);
        assert_eq!(h.server.sent_count(), 0);
        assert!(matches!(
            h.render.last(),
            Some(RenderInstruction::PersistentError(_))
        ));
    }

    #[test]
    fn test_transport_error_is_reported() {
        let mut h = Harness::new(MemoryTokenStore::new());
        h.server
            .queue_event(ServerEvent::Error("connection reset".to_string()));
        let events = h.update();
        assert_eq!(
            events,
            vec![SessionEvent::TransportError("connection reset".to_string())]
        );
    }

    #[test]
    fn test_token_write_failure_does_not_break_session() {
        let mut h = Harness::new(MemoryTokenStore::failing());
        h.deliver(ServerMessage::GameCreated {
            game_code: "AB12".to_string(),
            player_name: "Host".to_string(),
            host_token: Some("h1".to_string()),
        });
        assert_eq!(h.session.snapshot().screen, Screen::Lobby(Role::Host));
    }

    #[test]
    fn test_messages_processed_in_delivery_order() {
        let mut h = Harness::new(MemoryTokenStore::new());
        h.server.queue_message(ServerMessage::JoinedGame {
            player_name: "Ann".to_string(),
            game_code: "AB12".to_string(),
            player_token: None,
            players: vec!["Ann".to_string()],
        });
        h.server.queue_message(player_question(1));
        h.server.queue_message(ServerMessage::RedirectHomepage);
        let events = h.update();
        assert_eq!(
            events,
            vec![
                SessionEvent::ScreenChanged(Screen::Lobby(Role::Player)),
                SessionEvent::ScreenChanged(Screen::Question),
                SessionEvent::ScreenChanged(Screen::Home),
            ]
        );
    }
}
