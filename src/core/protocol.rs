//! WebSocket protocol types
//!
//! This module contains the JSON message types exchanged between the client
//! and the game server. Every frame is an object tagged by `"type"` with the
//! payload fields inline. These types are platform-independent and can be
//! tested without a live connection.

use serde::{Deserialize, Serialize};

// =============================================================================
// DATA TYPES
// =============================================================================

/// Which half of the game a round belongs to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Real historical messages
    #[default]
    #[serde(rename = "real")]
    Authentic,
    /// Model-generated messages
    #[serde(rename = "generated")]
    Synthetic,
}

/// Which variant of the round results the server rendered for this client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    Host,
    Player,
}

/// One row of the leaderboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub name: String,
    pub score: i64,
}

/// How one player did on the last round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerResult {
    pub player_name: String,
    /// `None` when the player never answered
    #[serde(default)]
    pub answer: Option<String>,
    pub correct: bool,
    #[serde(default)]
    pub points_earned: i64,
    #[serde(default)]
    pub total_score: Option<i64>,
}

/// Payload of `host_question` and `player_question`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionPayload {
    /// 1-based index within the current phase
    pub question_number: u32,
    /// Number of questions in the current phase
    pub total_questions: u32,
    /// Message text (host only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub options: Vec<String>,
    #[serde(default)]
    pub phase: Phase,
    /// How many players are answering (host only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_count: Option<u32>,
}

/// Payload of `question_results`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsPayload {
    pub correct_answer: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub results: Vec<PlayerResult>,
    #[serde(default)]
    pub leaderboard: Vec<LeaderboardEntry>,
    #[serde(default)]
    pub distinctiveness_score: Option<f64>,
    /// Similarity between generated and real messages, in percent
    #[serde(default)]
    pub bert_similarity: Option<f64>,
    #[serde(default)]
    pub explanation: Option<String>,
    pub view: ViewKind,
    /// 1-based rank of the receiving player (player view only)
    #[serde(default)]
    pub standing: Option<u32>,
    #[serde(default)]
    pub phase: Phase,
}

// =============================================================================
// CLIENT MESSAGES (client → server)
// =============================================================================

/// Messages sent to the server
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    CreateGame {
        player_name: String,
    },
    JoinGame {
        game_code: String,
        player_name: String,
    },
    StartGame,
    SubmitAnswer {
        answer: String,
    },
    PlayerReady,
    NextRound,
    RequestFirstQuestion,
    HostReconnect {
        host_token: String,
    },
    PlayerReconnect {
        player_token: String,
        player_name: String,
        game_code: String,
    },
}

impl ClientMessage {
    /// Wire name of the message, safe to log
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::CreateGame { .. } => "create_game",
            ClientMessage::JoinGame { .. } => "join_game",
            ClientMessage::StartGame => "start_game",
            ClientMessage::SubmitAnswer { .. } => "submit_answer",
            ClientMessage::PlayerReady => "player_ready",
            ClientMessage::NextRound => "next_round",
            ClientMessage::RequestFirstQuestion => "request_first_question",
            ClientMessage::HostReconnect { .. } => "host_reconnect",
            ClientMessage::PlayerReconnect { .. } => "player_reconnect",
        }
    }
}

// Reconnect tokens must never end up in logs
impl std::fmt::Debug for ClientMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientMessage::CreateGame { player_name } => f
                .debug_struct("CreateGame")
                .field("player_name", player_name)
                .finish(),
            ClientMessage::JoinGame {
                game_code,
                player_name,
            } => f
                .debug_struct("JoinGame")
                .field("game_code", game_code)
                .field("player_name", player_name)
                .finish(),
            ClientMessage::SubmitAnswer { answer } => f
                .debug_struct("SubmitAnswer")
                .field("answer", answer)
                .finish(),
            ClientMessage::HostReconnect { .. } => f
                .debug_struct("HostReconnect")
                .field("host_token", &"<redacted>")
                .finish(),
            ClientMessage::PlayerReconnect {
                player_name,
                game_code,
                ..
            } => f
                .debug_struct("PlayerReconnect")
                .field("player_token", &"<redacted>")
                .field("player_name", player_name)
                .field("game_code", game_code)
                .finish(),
            other => f.write_str(other.kind()),
        }
    }
}

// =============================================================================
// SERVER MESSAGES (server → client)
// =============================================================================

/// Messages received from the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Acknowledges `create_game`
    GameCreated {
        game_code: String,
        player_name: String,
        #[serde(default)]
        host_token: Option<String>,
    },
    /// Acknowledges `join_game` (and `player_reconnect`)
    JoinedGame {
        player_name: String,
        game_code: String,
        #[serde(default)]
        player_token: Option<String>,
        #[serde(default)]
        players: Vec<String>,
    },
    /// Full roster after someone joined
    PlayerJoined { players: Vec<String> },
    /// Full roster after someone left
    PlayerLeft {
        players: Vec<String>,
        #[serde(default)]
        players_count: Option<usize>,
    },
    GameStarted {
        #[serde(default)]
        total_rounds: Option<u32>,
    },
    /// Server-side question timer could not be scheduled
    TimerFailed,
    HostQuestion(QuestionPayload),
    PlayerQuestion(QuestionPayload),
    QuestionResults(ResultsPayload),
    GameFinished {
        leaderboard: Vec<LeaderboardEntry>,
        #[serde(default)]
        winner: Option<String>,
        #[serde(default)]
        total_questions: Option<u32>,
    },
    /// Every player pressed ready (sent to the host only)
    AllPlayersReady,
    PhaseTransition {
        #[serde(default)]
        message: Option<String>,
    },
    Error { message: String },
    /// Fatal: the session is gone, return to the home screen
    RedirectHomepage,
    HostReconnected {
        game_code: String,
        #[serde(default)]
        game_state: Option<String>,
    },
}

impl ServerMessage {
    /// Wire name of the message, safe to log
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::GameCreated { .. } => "game_created",
            ServerMessage::JoinedGame { .. } => "joined_game",
            ServerMessage::PlayerJoined { .. } => "player_joined",
            ServerMessage::PlayerLeft { .. } => "player_left",
            ServerMessage::GameStarted { .. } => "game_started",
            ServerMessage::TimerFailed => "timer_failed",
            ServerMessage::HostQuestion(_) => "host_question",
            ServerMessage::PlayerQuestion(_) => "player_question",
            ServerMessage::QuestionResults(_) => "question_results",
            ServerMessage::GameFinished { .. } => "game_finished",
            ServerMessage::AllPlayersReady => "all_players_ready",
            ServerMessage::PhaseTransition { .. } => "phase_transition",
            ServerMessage::Error { .. } => "error",
            ServerMessage::RedirectHomepage => "redirect_homepage",
            ServerMessage::HostReconnected { .. } => "host_reconnected",
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
