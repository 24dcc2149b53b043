//! Line-oriented terminal front end
//!
//! Renders instructions as plain text lines and parses typed input into
//! user actions.

use std::io::Write;
use std::path::PathBuf;

use tracing::warn;

use crate::core::controller::Command;
use crate::core::io_traits::{ConnectionStatus, RenderSink};
use crate::core::pipeline::Platform;
use crate::core::protocol::ViewKind;
use crate::core::render::RenderInstruction;
use crate::core::round_timer::TimerUrgency;
use crate::core::types::{Role, RoundQuestion, Screen};

// =============================================================================
// INPUT
// =============================================================================

/// How the user picked an answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerChoice {
    /// 1-based position in the option list
    Index(usize),
    Text(String),
}

impl AnswerChoice {
    /// Resolve against the displayed options
    pub fn resolve(&self, question: &RoundQuestion) -> Option<String> {
        match self {
            AnswerChoice::Index(n) => n
                .checked_sub(1)
                .and_then(|i| question.options.get(i))
                .cloned(),
            AnswerChoice::Text(text) => question
                .options
                .iter()
                .find(|o| o.eq_ignore_ascii_case(text))
                .cloned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    Session(Command),
    Answer(AnswerChoice),
    Upload {
        files: Vec<PathBuf>,
        platform: Option<Platform>,
    },
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("unknown command `{0}`, type `help`")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("unknown platform `{0}`, expected dc or wp")]
    Platform(String),
}

pub const HELP_TEXT: &str = "\
commands:
  create                      host a new game
  join <code> <name>          join a game
  start                       start the game (host)
  answer <n|name>             answer the current question
  ready                       ready for the next round
  again                       play again (host)
  cancel                      cancel the hosted game
  leave                       leave the game
  home                        back to the home screen
  upload [dc|wp] <file>...    upload chat exports for processing
  quit";

pub fn parse_line(line: &str) -> Result<Option<UserAction>, InputError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();

    let action = match head.to_ascii_lowercase().as_str() {
        "create" | "host" => UserAction::Session(Command::CreateGame),
        "join" => {
            let [code, name @ ..] = rest.as_slice() else {
                return Err(InputError::Usage("join <code> <name>"));
            };
            UserAction::Session(Command::JoinGame {
                game_code: code.to_string(),
                player_name: name.join(" "),
            })
        }
        "start" => UserAction::Session(Command::StartGame),
        "answer" | "a" => {
            if rest.is_empty() {
                return Err(InputError::Usage("answer <n|name>"));
            }
            let text = rest.join(" ");
            match text.parse::<usize>() {
                Ok(n) => UserAction::Answer(AnswerChoice::Index(n)),
                Err(_) => UserAction::Answer(AnswerChoice::Text(text)),
            }
        }
        "ready" | "r" => UserAction::Session(Command::Ready),
        "again" => UserAction::Session(Command::PlayAgain),
        "cancel" => UserAction::Session(Command::CancelGame),
        "leave" => UserAction::Session(Command::LeaveGame),
        "home" => UserAction::Session(Command::ReturnHome),
        "upload" => parse_upload(&rest)?,
        "help" | "?" => UserAction::Help,
        "quit" | "exit" => UserAction::Quit,
        other => return Err(InputError::Unknown(other.to_string())),
    };
    Ok(Some(action))
}

fn parse_upload(args: &[&str]) -> Result<UserAction, InputError> {
    let (platform, files) = match args {
        [] => return Err(InputError::Usage("upload [dc|wp] <file>...")),
        [first, files @ ..] if first.len() == 2 && !files.is_empty() => {
            let platform =
                Platform::parse(first).ok_or_else(|| InputError::Platform(first.to_string()))?;
            (Some(platform), files)
        }
        files => (None, files),
    };
    Ok(UserAction::Upload {
        files: files.iter().map(PathBuf::from).collect(),
        platform,
    })
}

// =============================================================================
// OUTPUT
// =============================================================================

pub struct TerminalRenderSink<W: Write> {
    out: W,
}

impl<W: Write> TerminalRenderSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Print a line that does not come from the session
    pub fn line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{}", text).and_then(|_| self.out.flush()) {
            warn!(error = %e, "[TERM] Write failed");
        }
    }
}

fn screen_title(screen: Screen) -> &'static str {
    match screen {
        Screen::Home => "== TalkTagger ==  (create | join <code> <name> | upload <file>)",
        Screen::Lobby(Role::Host) => "== Lobby (host) ==",
        Screen::Lobby(Role::Player) => "== Lobby ==  waiting for the host to start",
        Screen::TutorialCountdown => "== Get ready! Guess who wrote each message ==",
        Screen::Question => "== Question ==",
        Screen::RoundResults => "== Round results ==",
        Screen::PhaseTransition => "== Next phase ==",
        Screen::FinalResults => "== Final results ==",
    }
}

fn format_instruction(instruction: &RenderInstruction) -> Option<String> {
    let text = match instruction {
        RenderInstruction::ShowScreen(screen) => screen_title(*screen).to_string(),
        RenderInstruction::Roster {
            room_code,
            players,
            start_enabled,
        } => {
            let mut text = format!(
                "Game code: {}\nPlayers ({}): {}",
                room_code,
                players.len(),
                players.join(", ")
            );
            if *start_enabled {
                text.push_str("\nType `start` to begin");
            }
            text
        }
        RenderInstruction::Countdown { seconds } => format!("Starting in {}...", seconds),
        RenderInstruction::Question(q) => {
            let mut text = if q.total_rounds > 0 {
                format!("Round {}/{}", q.round_number, q.total_rounds)
            } else {
                format!("Round {}", q.round_number)
            };
            if let Some(message) = &q.message_text {
                text.push_str(&format!("\n  \"{}\"", message));
            }
            text.push_str("\nWho wrote it?");
            for (i, option) in q.options.iter().enumerate() {
                text.push_str(&format!("\n  {}. {}", i + 1, option));
            }
            text
        }
        RenderInstruction::TimerTick {
            seconds_remaining,
            urgency,
        } => match urgency {
            // Only announce the interesting moments on a line-based terminal
            TimerUrgency::Normal if *seconds_remaining % 5 != 0 => return None,
            TimerUrgency::Normal => format!("  {}s", seconds_remaining),
            TimerUrgency::Warning if *seconds_remaining != 10 => return None,
            TimerUrgency::Warning => format!("  {}s left", seconds_remaining),
            TimerUrgency::Critical => format!("  {}s!", seconds_remaining),
        },
        RenderInstruction::ChoicesLocked { selected } => format!("You answered: {}", selected),
        RenderInstruction::RoundResults {
            result,
            own_result,
            ready,
        } => {
            let mut text = format!("Answer: {}", result.correct_answer);
            if let Some(message) = &result.message {
                text.push_str(&format!("\n  \"{}\"", message));
            }
            if let Some(own) = own_result {
                text.push_str(if own.correct { "\nCorrect!" } else { "\nWrong." });
                text.push_str(&format!(" +{} points", own.points_earned));
            }
            if result.view == ViewKind::Host {
                for row in &result.per_player {
                    let answer = row.answer.as_deref().unwrap_or("-");
                    text.push_str(&format!(
                        "\n  {}: {} (+{})",
                        row.player_name, answer, row.points_earned
                    ));
                }
            }
            if let Some(score) = result.similarity_score {
                text.push_str(&format!("\nSimilarity to real messages: {:.1}%", score));
            }
            if let Some(score) = result.distinctiveness_score {
                text.push_str(&format!("\nDistinctiveness: {:.2}", score));
            }
            for (i, entry) in result.leaderboard.iter().enumerate() {
                text.push_str(&format!("\n  {}. {} {}", i + 1, entry.name, entry.score));
            }
            if let Some(label) = ready {
                text.push_str(&format!("\nType `ready`: {}", label.text()));
            }
            text
        }
        RenderInstruction::ReadyLocked => "Waiting for the other players...".to_string(),
        RenderInstruction::PhaseTransition { message } => message.clone(),
        RenderInstruction::FinalResults {
            leaderboard,
            winner,
        } => {
            let mut text = String::new();
            if let Some(winner) = winner {
                text.push_str(&format!("Winner: {}", winner));
            }
            for (i, entry) in leaderboard.iter().enumerate() {
                text.push_str(&format!("\n  {}. {} {}", i + 1, entry.name, entry.score));
            }
            text
        }
        RenderInstruction::Connection(status) => match status {
            ConnectionStatus::Connected => "[connected]".to_string(),
            ConnectionStatus::Connecting => return None,
            ConnectionStatus::Reconnecting => "[connection lost, reconnecting]".to_string(),
            ConnectionStatus::Disconnected => "[disconnected]".to_string(),
            ConnectionStatus::Error => "[connection error]".to_string(),
        },
        RenderInstruction::Notice(text) => text.clone(),
        RenderInstruction::TransientError { message, .. } => format!("! {}", message),
        RenderInstruction::PersistentError(message) => format!("!! {}", message),
        RenderInstruction::Fatal(message) => format!("!!! {}", message),
    };
    Some(text)
}

impl<W: Write> RenderSink for TerminalRenderSink<W> {
    fn render(&mut self, instruction: &RenderInstruction) {
        if let Some(text) = format_instruction(instruction) {
            self.line(&text);
        }
    }
}
