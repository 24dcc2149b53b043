//! Render instructions
//!
//! The controller never draws anything itself. It describes what the UI
//! should show as a list of instructions; a `RenderSink` turns them into
//! pixels, terminal lines or test recordings.

use std::time::Duration;

use crate::core::io_traits::ConnectionStatus;
use crate::core::protocol::{LeaderboardEntry, PlayerResult};
use crate::core::round_timer::TimerUrgency;
use crate::core::types::{RoundQuestion, RoundResult, Screen};

/// Label of the ready control on the player's results screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyLabel {
    NextRound,
    /// The next server push will be the final leaderboard
    FinalResults,
}

impl ReadyLabel {
    pub fn text(&self) -> &'static str {
        match self {
            ReadyLabel::NextRound => "Ready for next round",
            ReadyLabel::FinalResults => "Ready for final results",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderInstruction {
    /// Switch to a screen
    ShowScreen(Screen),
    /// Lobby roster, with the host's start control state
    Roster {
        room_code: String,
        players: Vec<String>,
        start_enabled: bool,
    },
    /// Tutorial countdown value
    Countdown { seconds: u32 },
    /// A freshly installed question
    Question(RoundQuestion),
    TimerTick {
        seconds_remaining: u32,
        urgency: TimerUrgency,
    },
    /// Answer choices are disabled, with the submitted answer highlighted
    ChoicesLocked { selected: String },
    RoundResults {
        result: RoundResult,
        /// The local player's own row (player view)
        own_result: Option<PlayerResult>,
        /// `None` on the host view
        ready: Option<ReadyLabel>,
    },
    /// Ready control disabled after it was pressed
    ReadyLocked,
    PhaseTransition { message: String },
    FinalResults {
        leaderboard: Vec<LeaderboardEntry>,
        winner: Option<String>,
    },
    /// Transport status indicator
    Connection(ConnectionStatus),
    /// Informational line
    Notice(String),
    /// Inline error that disappears on its own
    TransientError {
        message: String,
        dismiss_after: Duration,
    },
    /// Inline error that stays until the next successful action
    PersistentError(String),
    /// Unrecoverable session error; the UI returns home right after
    Fatal(String),
}
