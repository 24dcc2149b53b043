//! Background HTTP work
//!
//! Requests that may take seconds (`/game-data`, `/upload`) run on short-lived
//! worker threads and report back over channels the main loop selects on, so
//! the one-second tick keeps flowing while they are in flight.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use tracing::debug;

use super::http::{HttpClient, HttpError};
use crate::core::io_traits::{GameDataError, GameDataSource};
use crate::core::pipeline::Platform;
use crate::core::types::RoundCounts;

pub type GameDataResult = Result<RoundCounts, GameDataError>;

type FetchFn = dyn Fn() -> GameDataResult + Send + Sync;

// =============================================================================
// GAME DATA
// =============================================================================

/// Runs each game-data request on its own thread
pub struct GameDataFetcher {
    fetch: Arc<FetchFn>,
    tx: Sender<GameDataResult>,
    rx: Receiver<GameDataResult>,
}

impl GameDataFetcher {
    pub fn new<F>(fetch: F) -> Self
    where
        F: Fn() -> GameDataResult + Send + Sync + 'static,
    {
        let (tx, rx) = unbounded();
        Self {
            fetch: Arc::new(fetch),
            tx,
            rx,
        }
    }

    pub fn for_http(http: HttpClient) -> Self {
        Self::new(move || http.fetch_round_counts())
    }

    /// Completed requests, in completion order
    pub fn results(&self) -> &Receiver<GameDataResult> {
        &self.rx
    }
}

impl GameDataSource for GameDataFetcher {
    fn request_round_counts(&self) {
        let fetch = Arc::clone(&self.fetch);
        let tx = self.tx.clone();
        thread::spawn(move || {
            let result = fetch();
            if tx.send(result).is_err() {
                debug!("[HTTP] Game data arrived after shutdown");
            }
        });
    }
}

// =============================================================================
// UPLOAD
// =============================================================================

/// Upload chat files on a worker thread; the receiver yields exactly one result
pub fn spawn_upload(
    http: HttpClient,
    files: Vec<PathBuf>,
    platform: Platform,
) -> Receiver<Result<(), HttpError>> {
    let (tx, rx) = bounded(1);
    thread::spawn(move || {
        let _ = tx.send(http.upload(&files, platform));
    });
    rx
}
