//! HTTP client for the game server's REST endpoints
//!
//! `/upload` and `/pipeline-status` drive chat processing before a game;
//! `/game-data` yields the per-phase round counts once a session exists.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::{multipart, Client};
use serde::Deserialize;
use tracing::{debug, info};

use crate::core::io_traits::GameDataError;
use crate::core::pipeline::{PipelineStatus, Platform};
use crate::core::types::RoundCounts;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("could not read {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no files selected")]
    NoFiles,
    /// The server answered with an `error` field
    #[error("{0}")]
    Server(String),
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    error: Option<String>,
}

/// Body of `GET /game-data`; only the round lists' lengths matter here
#[derive(Debug, Deserialize)]
struct GameDataResponse {
    #[serde(default)]
    game_rounds_1: Vec<serde_json::Value>,
    #[serde(default)]
    game_rounds_2: Vec<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

impl GameDataResponse {
    fn into_counts(self) -> Result<RoundCounts, GameDataError> {
        if let Some(error) = self.error.filter(|e| !e.is_empty()) {
            return Err(GameDataError::Unavailable(error));
        }
        Ok(RoundCounts::new(
            self.game_rounds_1.len() as u32,
            self.game_rounds_2.len() as u32,
        ))
    }
}

#[derive(Clone)]
pub struct HttpClient {
    base_url: String,
    client: Client,
}

impl HttpClient {
    pub fn new(base_url: &str) -> Result<Self, HttpError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Upload chat exports for processing
    pub fn upload(&self, files: &[PathBuf], platform: Platform) -> Result<(), HttpError> {
        if files.is_empty() {
            return Err(HttpError::NoFiles);
        }

        let mut form = multipart::Form::new().text("platform", platform.as_str());
        for path in files {
            form = form.part("files", file_part(path)?);
        }

        info!(count = files.len(), platform = platform.as_str(), "[HTTP] Uploading chat files");
        let response: UploadResponse = self
            .client
            .post(self.url("/upload"))
            .multipart(form)
            .send()?
            .json()?;

        match response.error.filter(|e| !e.is_empty()) {
            Some(error) => Err(HttpError::Server(error)),
            None => Ok(()),
        }
    }

    pub fn pipeline_status(&self) -> Result<PipelineStatus, HttpError> {
        let status: PipelineStatus = self
            .client
            .get(self.url("/pipeline-status"))
            .send()?
            .json()?;
        debug!(
            progress = status.progress,
            running = status.running,
            "[HTTP] Pipeline status"
        );
        Ok(status)
    }

    fn game_data(&self) -> Result<GameDataResponse, HttpError> {
        Ok(self.client.get(self.url("/game-data")).send()?.json()?)
    }

    /// Blocking; call from a worker thread
    pub fn fetch_round_counts(&self) -> Result<RoundCounts, GameDataError> {
        self.game_data()
            .map_err(|e| GameDataError::Request(e.to_string()))?
            .into_counts()
    }
}

fn file_part(path: &Path) -> Result<multipart::Part, HttpError> {
    let bytes = std::fs::read(path).map_err(|source| HttpError::File {
        path: path.to_path_buf(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "chat".to_string());
    Ok(multipart::Part::bytes(bytes).file_name(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_data_counts_rounds_per_phase() {
        let json = r#"{
            "game_rounds_1": [{"message": "a"}, {"message": "b"}, {"message": "c"}],
            "game_rounds_2": [{"message": "d"}, {"message": "e"}]
        }"#;
        let response: GameDataResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.into_counts(), Ok(RoundCounts::new(3, 2)));
    }

    #[test]
    fn test_game_data_error_field() {
        let json = r#"{"error": "No game data available"}"#;
        let response: GameDataResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            response.into_counts(),
            Err(GameDataError::Unavailable(
                "No game data available".to_string()
            ))
        );
    }

    #[test]
    fn test_url_joining() {
        let client = HttpClient::new("http://localhost:5000/").unwrap();
        assert_eq!(client.url("/game-data"), "http://localhost:5000/game-data");
        assert_eq!(
            client.url("pipeline-status"),
            "http://localhost:5000/pipeline-status"
        );
    }

    #[test]
    fn test_upload_requires_files() {
        let client = HttpClient::new("http://localhost:5000").unwrap();
        assert!(matches!(
            client.upload(&[], Platform::Discord),
            Err(HttpError::NoFiles)
        ));
    }

    #[test]
    fn test_missing_file_reported_before_request() {
        let client = HttpClient::new("http://localhost:5000").unwrap();
        let result = client.upload(&[PathBuf::from("/nonexistent/chat.json")], Platform::Discord);
        assert!(matches!(result, Err(HttpError::File { .. })));
    }
}
