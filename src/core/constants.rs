//! Game constants - countdowns, thresholds, validation limits
//!
//! All tuning values shared between the session controller and the I/O shell.

use std::time::Duration;

// =============================================================================
// COUNTDOWNS
// =============================================================================

/// Ticks (seconds) of the introductory countdown shown after `game_started`
pub const TUTORIAL_COUNTDOWN_TICKS: u32 = 7;

/// Seconds a player has to answer a question before the auto-submit fires
pub const QUESTION_DURATION_SECS: u32 = 15;

/// Remaining seconds at or below which the round timer turns to warning
pub const TIMER_WARNING_SECS: u32 = 10;

/// Remaining seconds at or below which the round timer turns critical
pub const TIMER_CRITICAL_SECS: u32 = 5;

/// Interval between two ticks of any local countdown
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

// =============================================================================
// MESSAGES
// =============================================================================

/// How long transient inline errors stay on screen
pub const TRANSIENT_ERROR_DURATION: Duration = Duration::from_secs(5);

/// Display name the host announces when creating a game
pub const HOST_PLAYER_NAME: &str = "Host";

/// Minimum length of a room code typed by a joining player
pub const MIN_ROOM_CODE_LEN: usize = 4;

/// Fallback text for a `phase_transition` without a message
pub const DEFAULT_PHASE_TRANSITION_MESSAGE: &str = "Starting next phase!";

/// Text shown when the server forces the client back to the home screen
pub const REDIRECT_HOME_MESSAGE: &str = "The game session has ended";

// =============================================================================
// PIPELINE
// =============================================================================

/// Interval between two `/pipeline-status` polls
pub const PIPELINE_POLL_INTERVAL: Duration = Duration::from_secs(1);
