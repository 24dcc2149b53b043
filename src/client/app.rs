//! Game client - main loop wiring the session to real I/O
//!
//! Owns the WebSocket client, the HTTP client, the terminal and the
//! background workers, and multiplexes stdin, the one-second tick, game-data
//! results, upload results and pipeline updates with
//! `crossbeam_channel::select!`. Nothing on this thread waits on the network.

use std::io::{BufRead, Stdout};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, never, select, tick, Receiver};
use tracing::{debug, info, warn};

use super::background::{spawn_upload, GameDataFetcher};
use super::config::Config;
use super::http::{HttpClient, HttpError};
use super::pipeline::{PipelineMonitor, PipelineUpdate};
use super::terminal::{parse_line, TerminalRenderSink, UserAction, HELP_TEXT};
use super::token_store::FileTokenStore;
use super::websocket::GameWebSocketClient;
use crate::core::constants::{PIPELINE_POLL_INTERVAL, TICK_INTERVAL};
use crate::core::controller::{Command, SessionController};
use crate::core::io_traits::RenderSink;
use crate::core::pipeline::Platform;
use crate::core::render::RenderInstruction;
use crate::core::session::{ClientSession, SessionEvent};

/// How long the loop waits for input before draining the socket again
const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("could not create HTTP client: {0}")]
    Http(#[from] HttpError),
}

pub struct GameClient {
    config: Config,
    session: ClientSession<FileTokenStore>,
    ws: GameWebSocketClient,
    http: HttpClient,
    game_data: GameDataFetcher,
    terminal: TerminalRenderSink<Stdout>,
    upload: Option<Receiver<Result<(), HttpError>>>,
    pipeline: Option<PipelineMonitor>,
}

impl GameClient {
    pub fn new(config: Config) -> Result<Self, AppError> {
        let store = FileTokenStore::open(config.token_file_path());
        let http = HttpClient::new(config.server.http_base())?;
        let ws = GameWebSocketClient::new(config.server.clone());

        Ok(Self {
            session: ClientSession::new(SessionController::new(), store),
            ws,
            game_data: GameDataFetcher::for_http(http.clone()),
            http,
            terminal: TerminalRenderSink::new(std::io::stdout()),
            upload: None,
            pipeline: None,
            config,
        })
    }

    /// Run until the user quits or stdin closes
    pub fn run(&mut self) {
        info!(url = %self.config.server.ws_url(), "[APP] Starting");
        self.terminal.render(&RenderInstruction::ShowScreen(
            self.session.snapshot().screen,
        ));
        self.ws.connect();

        let input = spawn_stdin_reader();
        let ticker = tick(TICK_INTERVAL);
        let game_data_rx = self.game_data.results().clone();

        loop {
            let events = self
                .session
                .update(&mut self.ws, &mut self.terminal, &self.game_data);
            log_events(&events);

            let upload_rx = self.upload.clone().unwrap_or_else(never);
            let pipeline_rx = self
                .pipeline
                .as_ref()
                .map(|m| m.updates().clone())
                .unwrap_or_else(never);

            select! {
                recv(input) -> line => match line {
                    Ok(line) => {
                        if !self.on_line(&line) {
                            break;
                        }
                    }
                    Err(_) => {
                        info!("[APP] Input closed");
                        break;
                    }
                },
                recv(ticker) -> _ => {
                    let events = self
                        .session
                        .tick(&mut self.ws, &mut self.terminal, &self.game_data);
                    log_events(&events);
                }
                recv(game_data_rx) -> result => {
                    if let Ok(result) = result {
                        let events = self.session.game_data(
                            result,
                            &mut self.ws,
                            &mut self.terminal,
                            &self.game_data,
                        );
                        log_events(&events);
                    }
                }
                recv(upload_rx) -> result => {
                    self.upload = None;
                    if let Ok(result) = result {
                        self.on_uploaded(result);
                    }
                }
                recv(pipeline_rx) -> update => {
                    if let Ok(update) = update {
                        self.on_pipeline(update);
                    }
                }
                default(POLL_INTERVAL) => {}
            }
        }

        if let Some(mut monitor) = self.pipeline.take() {
            monitor.cancel();
        }
        self.ws.disconnect();
        info!("[APP] Stopped");
    }

    /// Handle one typed line. Returns false to quit.
    fn on_line(&mut self, line: &str) -> bool {
        let action = match parse_line(line) {
            Ok(Some(action)) => action,
            Ok(None) => return true,
            Err(e) => {
                self.terminal.line(&format!("! {}", e));
                return true;
            }
        };

        match action {
            UserAction::Session(command) => self.command(command),
            UserAction::Answer(choice) => {
                let snapshot = self.session.snapshot();
                match snapshot.question.as_ref().and_then(|q| choice.resolve(q)) {
                    Some(answer) => self.command(Command::SelectAnswer(answer)),
                    None => self.terminal.line("! No such option"),
                }
            }
            UserAction::Upload { files, platform } => {
                let platform = platform.unwrap_or(self.config.upload.platform);
                self.upload(files, platform);
            }
            UserAction::Help => self.terminal.line(HELP_TEXT),
            UserAction::Quit => return false,
        }
        true
    }

    fn command(&mut self, command: Command) {
        let events = self
            .session
            .command(command, &mut self.ws, &mut self.terminal, &self.game_data);
        log_events(&events);
    }

    fn upload(&mut self, files: Vec<PathBuf>, platform: Platform) {
        if self.upload.is_some() || self.pipeline.is_some() {
            self.terminal.line("! Processing already in progress");
            return;
        }

        self.terminal.line("Uploading...");
        self.upload = Some(spawn_upload(self.http.clone(), files, platform));
    }

    fn on_uploaded(&mut self, result: Result<(), HttpError>) {
        match result {
            Ok(()) => {
                self.terminal.line("Upload complete, processing chat...");
                self.pipeline = Some(PipelineMonitor::spawn(
                    self.http.clone(),
                    PIPELINE_POLL_INTERVAL,
                ));
            }
            Err(e) => {
                warn!(error = %e, "[APP] Upload failed");
                self.terminal.render(&RenderInstruction::PersistentError(format!(
                    "Upload failed: {}",
                    e
                )));
            }
        }
    }

    fn on_pipeline(&mut self, update: PipelineUpdate) {
        match update {
            PipelineUpdate::Progress { progress, message } => {
                self.terminal
                    .line(&format!("  {:>3.0}%  {}", progress, message));
            }
            PipelineUpdate::Completed => {
                self.pipeline = None;
                self.terminal
                    .line("Chat processed. Type `create` to host a game.");
            }
            PipelineUpdate::Failed(error) => {
                self.pipeline = None;
                self.terminal.render(&RenderInstruction::PersistentError(format!(
                    "Processing failed: {}",
                    error
                )));
            }
        }
    }
}

fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = bounded::<String>(16);
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn log_events(events: &[SessionEvent]) {
    for event in events {
        debug!(?event, "[APP] Session event");
    }
}
