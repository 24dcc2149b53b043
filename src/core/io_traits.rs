//! I/O traits for client session operations
//!
//! These traits abstract the transport, the UI surface, token persistence
//! and the game-data endpoint, enabling tests of the whole session on any
//! platform with mock implementations.

use crate::core::protocol::{ClientMessage, ServerMessage};
use crate::core::render::RenderInstruction;

// =============================================================================
// CONNECTION STATUS
// =============================================================================

/// Connection status for server communication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Not connected to server
    Disconnected,
    /// Attempting to connect
    Connecting,
    /// Connected (reported again after every reconnect)
    Connected,
    /// Connection lost, attempting to reconnect
    Reconnecting,
    /// Connection error occurred
    Error,
}

/// Events received from the transport
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// Connection status changed
    StatusChanged(ConnectionStatus),
    /// Game message from the server
    Message(ServerMessage),
    /// Transport-level failure description
    Error(String),
}

// =============================================================================
// ERRORS
// =============================================================================

/// Failure persisting reconnection tokens
#[derive(Debug, thiserror::Error)]
pub enum TokenStoreError {
    #[error("failed to write token file: {0}")]
    Write(#[from] std::io::Error),
    #[error("failed to encode tokens: {0}")]
    Encode(String),
}

/// Failure fetching game metadata
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GameDataError {
    /// The server answered but has no processed chat data
    #[error("game data not available: {0}")]
    Unavailable(String),
    /// The request itself failed
    #[error("failed to fetch game data: {0}")]
    Request(String),
}

// =============================================================================
// I/O TRAITS
// =============================================================================

/// Trait for sending commands to the server
pub trait CommandSender {
    /// Check if the sender is connected
    fn is_connected(&self) -> bool;

    /// Get current connection status
    fn status(&self) -> ConnectionStatus;

    /// Queue a message for the server
    fn send(&self, message: ClientMessage);
}

/// Trait for receiving events from the server
pub trait ServerEventReceiver {
    /// Poll for the next server event (non-blocking)
    fn poll_event(&mut self) -> Option<ServerEvent>;
}

/// Combined trait for full server communication
pub trait ServerConnection: CommandSender + ServerEventReceiver {}
impl<T: CommandSender + ServerEventReceiver> ServerConnection for T {}

/// Surface the session pushes UI instructions to
pub trait RenderSink {
    fn render(&mut self, instruction: &RenderInstruction);
}

/// Persistent string storage for reconnection tokens, keyed by name
pub trait TokenStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), TokenStoreError>;
    fn remove(&mut self, key: &str) -> Result<(), TokenStoreError>;
}

/// Source of the aggregate game metadata (per-phase round counts).
///
/// `request_round_counts` only starts the fetch and must return at once;
/// the outcome is handed back through `ClientSession::game_data`.
pub trait GameDataSource {
    fn request_round_counts(&self);
}

// =============================================================================
// MOCK IMPLEMENTATIONS FOR TESTING
// =============================================================================


// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::mocks::*;
    use super::*;

    #[test]
    fn test_mock_server_connected_by_default() {
        let server = MockServerConnection::new();
        assert!(server.is_connected());
        assert_eq!(server.status(), ConnectionStatus::Connected);
    }

    #[test]
    fn test_mock_server_disconnected() {
        let server = MockServerConnection::disconnected();
        assert!(!server.is_connected());
        assert_eq!(server.status(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn test_mock_server_records_sent_messages() {
        let server = MockServerConnection::new();
        server.send(ClientMessage::StartGame);
        server.send(ClientMessage::PlayerReady);
        assert_eq!(server.sent_count(), 2);
        assert_eq!(server.sent_kinds(), vec!["start_game", "player_ready"]);
        assert_eq!(server.count_of("player_ready"), 1);
        assert_eq!(server.last_sent(), Some(ClientMessage::PlayerReady));
    }

    #[test]
    fn test_mock_server_queued_events_in_order() {
        let mut server = MockServerConnection::new();
        server.queue_event(ServerEvent::StatusChanged(ConnectionStatus::Connected));
        server.queue_message(ServerMessage::AllPlayersReady);
        server.queue_event(ServerEvent::Error("boom".to_string()));

        assert!(matches!(
            server.poll_event(),
            Some(ServerEvent::StatusChanged(ConnectionStatus::Connected))
        ));
        assert!(matches!(
            server.poll_event(),
            Some(ServerEvent::Message(ServerMessage::AllPlayersReady))
        ));
        assert!(matches!(server.poll_event(), Some(ServerEvent::Error(_))));
        assert!(server.poll_event().is_none());
    }

    #[test]
    fn test_memory_token_store_roundtrip() {
        let mut store = MemoryTokenStore::new();
        assert!(store.get("host_token").is_none());
        store.set("host_token", "h1").unwrap();
        assert_eq!(store.get("host_token").as_deref(), Some("h1"));
        store.remove("host_token").unwrap();
        assert!(store.get("host_token").is_none());
    }

    #[test]
    fn test_failing_token_store() {
        let mut store = MemoryTokenStore::failing();
        assert!(store.set("host_token", "h1").is_err());
    }

    #[test]
    fn test_mock_game_data_counts_requests() {
        let data = MockGameData::new();
        data.request_round_counts();
        data.request_round_counts();
        assert_eq!(data.request_count(), 2);
    }

    #[test]
    fn test_game_data_error_display() {
        let err = GameDataError::Unavailable("No game data available".to_string());
        assert_eq!(
            err.to_string(),
            "game data not available: No game data available"
        );
    }
}
