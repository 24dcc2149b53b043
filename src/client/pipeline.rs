//! Pipeline monitor - polls chat processing until it stops
//!
//! Runs on its own thread and forwards updates over a channel. Exactly one
//! terminal update (`Completed` or `Failed`) is sent unless the monitor is
//! cancelled first.

use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::http::HttpClient;
use crate::core::pipeline::{PipelineStatus, PollOutcome};

const CANCEL_CHECK_INTERVAL: Duration = Duration::from_millis(50);

/// Anything that can report the pipeline status
pub trait PipelineStatusSource {
    fn fetch_status(&self) -> Result<PipelineStatus, String>;
}

impl PipelineStatusSource for HttpClient {
    fn fetch_status(&self) -> Result<PipelineStatus, String> {
        self.pipeline_status().map_err(|e| e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineUpdate {
    Progress { progress: f64, message: String },
    Completed,
    Failed(String),
}

impl PipelineUpdate {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PipelineUpdate::Progress { .. })
    }
}

pub struct PipelineMonitor {
    rx: Receiver<PipelineUpdate>,
    cancel_flag: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl PipelineMonitor {
    pub fn spawn<S>(source: S, interval: Duration) -> Self
    where
        S: PipelineStatusSource + Send + 'static,
    {
        let (tx, rx) = bounded::<PipelineUpdate>(64);
        let cancel_flag = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel_flag);

        let handle = thread::spawn(move || poll_loop(source, interval, tx, flag));

        Self {
            rx,
            cancel_flag,
            thread_handle: Some(handle),
        }
    }

    pub fn updates(&self) -> &Receiver<PipelineUpdate> {
        &self.rx
    }

    /// Stop polling without a terminal update
    pub fn cancel(&mut self) {
        self.cancel_flag.store(true, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PipelineMonitor {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn poll_loop<S: PipelineStatusSource>(
    source: S,
    interval: Duration,
    tx: Sender<PipelineUpdate>,
    cancel_flag: Arc<AtomicBool>,
) {
    info!("[PIPELINE] Monitoring chat processing");

    loop {
        if cancel_flag.load(Ordering::SeqCst) {
            debug!("[PIPELINE] Monitor cancelled");
            return;
        }

        let update = match source.fetch_status() {
            Ok(status) => match status.outcome() {
                PollOutcome::Continue => PipelineUpdate::Progress {
                    progress: status.progress,
                    message: status.message,
                },
                PollOutcome::Completed => PipelineUpdate::Completed,
                PollOutcome::Failed(error) => PipelineUpdate::Failed(error),
            },
            Err(e) => PipelineUpdate::Failed(format!("Status check failed: {}", e)),
        };

        let terminal = update.is_terminal();
        match &update {
            PipelineUpdate::Completed => info!("[PIPELINE] Processing complete"),
            PipelineUpdate::Failed(error) => warn!(error = %error, "[PIPELINE] Processing failed"),
            PipelineUpdate::Progress { .. } => {}
        }
        if tx.send(update).is_err() || terminal {
            return;
        }

        let deadline = Instant::now() + interval;
        while Instant::now() < deadline {
            if cancel_flag.load(Ordering::SeqCst) {
                debug!("[PIPELINE] Monitor cancelled");
                return;
            }
            thread::sleep(CANCEL_CHECK_INTERVAL.min(interval));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Replays a fixed list of responses, repeating the last one
    struct ScriptedSource {
        responses: Mutex<Vec<Result<PipelineStatus, String>>>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<PipelineStatus, String>>) -> Self {
            Self {
                responses: Mutex::new(responses),
            }
        }
    }

    impl PipelineStatusSource for ScriptedSource {
        fn fetch_status(&self) -> Result<PipelineStatus, String> {
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                responses.remove(0)
            } else {
                responses[0].clone()
            }
        }
    }

    fn running(progress: f64) -> Result<PipelineStatus, String> {
        Ok(PipelineStatus {
            progress,
            message: "Processing".to_string(),
            running: true,
            error: None,
        })
    }

    fn collect(monitor: &PipelineMonitor) -> Vec<PipelineUpdate> {
        let mut updates = Vec::new();
        while let Ok(update) = monitor.updates().recv_timeout(Duration::from_secs(5)) {
            let terminal = update.is_terminal();
            updates.push(update);
            if terminal {
                break;
            }
        }
        updates
    }

    #[test]
    fn test_progress_then_single_completion() {
        let source = ScriptedSource::new(vec![
            running(10.0),
            running(60.0),
            Ok(PipelineStatus {
                progress: 100.0,
                running: false,
                ..Default::default()
            }),
        ]);
        let monitor = PipelineMonitor::spawn(source, Duration::from_millis(1));
        let updates = collect(&monitor);
        assert_eq!(updates.len(), 3);
        assert_eq!(updates[2], PipelineUpdate::Completed);
        // Nothing after the terminal update
        assert!(monitor
            .updates()
            .recv_timeout(Duration::from_millis(50))
            .is_err());
    }

    #[test]
    fn test_idle_status_before_worker_starts_is_not_completion() {
        let source = ScriptedSource::new(vec![
            Ok(PipelineStatus::default()),
            running(30.0),
            Ok(PipelineStatus {
                progress: 100.0,
                running: false,
                ..Default::default()
            }),
        ]);
        let monitor = PipelineMonitor::spawn(source, Duration::from_millis(1));
        let updates = collect(&monitor);
        assert_eq!(updates.len(), 3);
        assert!(matches!(
            updates[0],
            PipelineUpdate::Progress { progress, .. } if progress == 0.0
        ));
        assert_eq!(updates[2], PipelineUpdate::Completed);
    }

    #[test]
    fn test_server_error_fails() {
        let source = ScriptedSource::new(vec![Ok(PipelineStatus {
            running: true,
            error: Some("Unsupported export".to_string()),
            ..Default::default()
        })]);
        let monitor = PipelineMonitor::spawn(source, Duration::from_millis(1));
        assert_eq!(
            collect(&monitor),
            vec![PipelineUpdate::Failed("Unsupported export".to_string())]
        );
    }

    #[test]
    fn test_request_failure_stops_polling() {
        let source = ScriptedSource::new(vec![Err("connection refused".to_string())]);
        let monitor = PipelineMonitor::spawn(source, Duration::from_millis(1));
        let updates = collect(&monitor);
        assert_eq!(updates.len(), 1);
        assert!(matches!(
            &updates[0],
            PipelineUpdate::Failed(m) if m.contains("connection refused")
        ));
    }

    #[test]
    fn test_cancel_stops_without_terminal_update() {
        let source = ScriptedSource::new(vec![running(5.0)]);
        let mut monitor = PipelineMonitor::spawn(source, Duration::from_secs(10));
        monitor.cancel();
        let updates: Vec<_> = monitor.updates().try_iter().collect();
        assert!(updates.iter().all(|u| !u.is_terminal()));
    }
}
