//! Chat-processing pipeline types
//!
//! After an upload the server runs a background job; the client polls its
//! status until it stops. Only the terminal outcome matters to the game.

use serde::{Deserialize, Serialize};

/// Chat export format selected at upload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    #[default]
    #[serde(rename = "dc")]
    Discord,
    #[serde(rename = "wp")]
    WhatsApp,
}

impl Platform {
    /// Form value expected by `/upload`
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Discord => "dc",
            Platform::WhatsApp => "wp",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dc" | "discord" => Some(Platform::Discord),
            "wp" | "whatsapp" => Some(Platform::WhatsApp),
            _ => None,
        }
    }
}

/// Body of `GET /pipeline-status`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineStatus {
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Progress value reported once processing has finished
pub const PIPELINE_DONE_PROGRESS: f64 = 100.0;

/// What one status poll means for the poller
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Still running or not started yet, keep polling
    Continue,
    /// Job stopped at full progress without error; game data is ready
    Completed,
    Failed(String),
}

impl PipelineStatus {
    pub fn outcome(&self) -> PollOutcome {
        if let Some(error) = self.error.as_ref().filter(|e| !e.is_empty()) {
            PollOutcome::Failed(error.clone())
        } else if !self.running && self.progress >= PIPELINE_DONE_PROGRESS {
            PollOutcome::Completed
        } else {
            PollOutcome::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_deserialize() {
        let json = r#"{"progress": 40, "message": "Cleaning messages", "running": true}"#;
        let status: PipelineStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.progress, 40.0);
        assert_eq!(status.message, "Cleaning messages");
        assert_eq!(status.outcome(), PollOutcome::Continue);
    }

    #[test]
    fn test_error_wins_over_running() {
        let status = PipelineStatus {
            running: true,
            error: Some("Bad export".to_string()),
            ..Default::default()
        };
        assert_eq!(status.outcome(), PollOutcome::Failed("Bad export".to_string()));
    }

    #[test]
    fn test_stopped_without_error_is_complete() {
        let json = r#"{"progress": 100, "message": "Done", "running": false, "error": null}"#;
        let status: PipelineStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.outcome(), PollOutcome::Completed);
    }

    #[test]
    fn test_freshly_reset_status_keeps_polling() {
        // Right after an upload the server reports an idle job at zero
        let json = r#"{"progress": 0, "message": "", "running": false, "error": null}"#;
        let status: PipelineStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.outcome(), PollOutcome::Continue);
    }

    #[test]
    fn test_running_at_full_progress_is_not_complete() {
        let status = PipelineStatus {
            progress: 100.0,
            running: true,
            ..Default::default()
        };
        assert_eq!(status.outcome(), PollOutcome::Continue);
    }

    #[test]
    fn test_platform_wire_names() {
        assert_eq!(serde_json::to_string(&Platform::WhatsApp).unwrap(), r#""wp""#);
        assert_eq!(Platform::parse("Discord"), Some(Platform::Discord));
        assert_eq!(Platform::parse("wp"), Some(Platform::WhatsApp));
        assert_eq!(Platform::parse("telegram"), None);
        assert_eq!(Platform::default().as_str(), "dc");
    }
}
