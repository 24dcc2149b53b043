//! Tutorial buffer - holds an early question during the intro countdown
//!
//! The server may push the first question while the client is still showing
//! the countdown. A single slot keeps the latest such question (last write
//! wins) and hands it back exactly once when the countdown finishes.

use tracing::debug;

use crate::core::protocol::QuestionPayload;

/// What a single countdown tick produced
#[derive(Debug, Clone, PartialEq)]
pub enum CountdownTick {
    /// No countdown running
    Inactive,
    /// Still counting, with the seconds left
    Counting(u32),
    /// Countdown reached zero, with the buffered question if one arrived
    Finished(Option<QuestionPayload>),
}

#[derive(Debug, Default)]
pub struct TutorialBuffer {
    /// `Some` while the countdown is active
    remaining: Option<u32>,
    pending: Option<QuestionPayload>,
}

impl TutorialBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a countdown of `ticks` seconds, discarding any stale question
    pub fn begin(&mut self, ticks: u32) {
        self.remaining = Some(ticks);
        self.pending = None;
    }

    pub fn is_active(&self) -> bool {
        self.remaining.is_some()
    }

    pub fn remaining(&self) -> Option<u32> {
        self.remaining
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Offer a freshly delivered question.
    ///
    /// While the countdown runs the question is kept (replacing an earlier
    /// one) and `None` is returned. Otherwise the question is handed back for
    /// immediate installation.
    pub fn offer(&mut self, question: QuestionPayload) -> Option<QuestionPayload> {
        if !self.is_active() {
            return Some(question);
        }
        if self.pending.is_some() {
            debug!("[TUTORIAL] Replacing buffered question");
        }
        self.pending = Some(question);
        None
    }

    /// Advance the countdown by one second
    pub fn tick(&mut self) -> CountdownTick {
        let Some(remaining) = self.remaining else {
            return CountdownTick::Inactive;
        };

        let remaining = remaining.saturating_sub(1);
        if remaining == 0 {
            self.remaining = None;
            return CountdownTick::Finished(self.pending.take());
        }

        self.remaining = Some(remaining);
        CountdownTick::Counting(remaining)
    }

    /// Stop the countdown and drop anything buffered
    pub fn clear(&mut self) {
        self.remaining = None;
        self.pending = None;
    }
}
