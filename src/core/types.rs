//! Session data types
//!
//! The owned state of one game session as seen from this client. Only the
//! session controller mutates these; everything else receives snapshots.

use std::collections::BTreeMap;

use crate::core::protocol::{
    LeaderboardEntry, Phase, PlayerResult, QuestionPayload, ResultsPayload, ViewKind,
};

/// Which side of the game this client is playing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Role {
    /// Created the game, sees message text, drives round advancement
    Host,
    /// Joined the game, answers questions
    #[default]
    Player,
}

/// Screen the controller is currently on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Screen {
    #[default]
    Home,
    Lobby(Role),
    TutorialCountdown,
    Question,
    RoundResults,
    PhaseTransition,
    FinalResults,
}

/// Per-phase round counts from `/game-data`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundCounts {
    pub authentic: u32,
    pub synthetic: u32,
}

impl RoundCounts {
    pub fn new(authentic: u32, synthetic: u32) -> Self {
        Self {
            authentic,
            synthetic,
        }
    }

    pub fn total(&self) -> u32 {
        self.authentic + self.synthetic
    }
}

/// The single live game session of this client
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub role: Role,
    pub room_code: String,
    pub local_player_name: String,
    /// Player names in join order
    pub players: Vec<String>,
    pub scores: BTreeMap<String, i64>,
    pub phase: Phase,
    /// Overall number of the round on display, 0 before the first question
    pub current_round_index: u32,
    /// Sum of both phases' round counts
    pub total_rounds: u32,
    /// Round counts once `/game-data` was fetched; fixes `total_rounds`
    pub round_counts: Option<RoundCounts>,
    pub selected_answer: Option<String>,
}

impl Session {
    /// Whether a create/join acknowledgment established this session
    pub fn is_active(&self) -> bool {
        !self.room_code.is_empty()
    }

    pub fn is_host(&self) -> bool {
        self.role == Role::Host
    }

    /// Seed a zero score for every player that has none yet
    pub fn seed_scores(&mut self) {
        for name in &self.players {
            self.scores.entry(name.clone()).or_insert(0);
        }
    }

    /// Overwrite known scores with the server's leaderboard
    pub fn apply_leaderboard(&mut self, leaderboard: &[LeaderboardEntry]) {
        for entry in leaderboard {
            self.scores.insert(entry.name.clone(), entry.score);
        }
    }

    /// Replace the scoreboard wholesale with the server's leaderboard
    pub fn replace_scores(&mut self, leaderboard: &[LeaderboardEntry]) {
        self.scores = leaderboard
            .iter()
            .map(|e| (e.name.clone(), e.score))
            .collect();
    }
}

/// The question currently awaiting an answer
#[derive(Debug, Clone, PartialEq)]
pub struct RoundQuestion {
    /// 1-based, continuous across both phases
    pub round_number: u32,
    /// Overall round count, 0 when not yet known
    pub total_rounds: u32,
    /// 1-based index within the phase, as sent by the server
    pub question_number: u32,
    /// Question count of the phase, as sent by the server
    pub total_questions: u32,
    pub phase: Phase,
    /// Only the host sees the message before answering
    pub message_text: Option<String>,
    pub options: Vec<String>,
}

impl RoundQuestion {
    pub fn from_payload(
        payload: QuestionPayload,
        round_number: u32,
        total_rounds: u32,
        role: Role,
    ) -> Self {
        Self {
            round_number,
            total_rounds,
            question_number: payload.question_number,
            total_questions: payload.total_questions,
            phase: payload.phase,
            message_text: if role == Role::Host {
                payload.message
            } else {
                None
            },
            options: payload.options,
        }
    }

    pub fn offers(&self, answer: &str) -> bool {
        self.options.iter().any(|o| o == answer)
    }
}

/// Outcome of one round as pushed by the server
#[derive(Debug, Clone, PartialEq)]
pub struct RoundResult {
    pub correct_answer: String,
    pub message: Option<String>,
    pub per_player: Vec<PlayerResult>,
    /// Sorted by score, descending
    pub leaderboard: Vec<LeaderboardEntry>,
    pub phase: Phase,
    pub distinctiveness_score: Option<f64>,
    pub similarity_score: Option<f64>,
    pub view: ViewKind,
    pub standing: Option<u32>,
}

impl From<ResultsPayload> for RoundResult {
    fn from(payload: ResultsPayload) -> Self {
        let mut leaderboard = payload.leaderboard;
        sort_leaderboard(&mut leaderboard);
        Self {
            correct_answer: payload.correct_answer,
            message: payload.message,
            per_player: payload.results,
            leaderboard,
            phase: payload.phase,
            distinctiveness_score: payload.distinctiveness_score,
            similarity_score: payload.bert_similarity,
            view: payload.view,
            standing: payload.standing,
        }
    }
}

impl RoundResult {
    /// The result row of the given player, if they took part
    pub fn result_for(&self, player_name: &str) -> Option<&PlayerResult> {
        self.per_player.iter().find(|r| r.player_name == player_name)
    }
}

/// Stable sort by score, highest first
pub fn sort_leaderboard(leaderboard: &mut [LeaderboardEntry]) {
    leaderboard.sort_by(|a, b| b.score.cmp(&a.score));
}

/// Drop repeated options, keeping the first occurrence of each
pub fn dedup_options(options: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(options.len());
    for option in options {
        if !seen.contains(&option) {
            seen.push(option);
        }
    }
    seen
}
