//! Session controller - the client-side game state machine
//!
//! Every transition goes through [`SessionController::handle`]: one input in,
//! a list of effects out. Inputs are server messages, local user commands,
//! one-second ticks and the outcome of the game-data fetch. The controller
//! never performs I/O; `ClientSession` applies the effects.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::core::constants::{
    DEFAULT_PHASE_TRANSITION_MESSAGE, HOST_PLAYER_NAME, QUESTION_DURATION_SECS,
    REDIRECT_HOME_MESSAGE, TRANSIENT_ERROR_DURATION, TUTORIAL_COUNTDOWN_TICKS,
};
use crate::core::protocol::{
    ClientMessage, LeaderboardEntry, Phase, QuestionPayload, ResultsPayload, ServerMessage,
    ViewKind,
};
use crate::core::reconnect::PlayerCredentials;
use crate::core::render::{ReadyLabel, RenderInstruction};
use crate::core::round_timer::{RoundTimer, TimerState, TimerTick, TimerUrgency};
use crate::core::tutorial_buffer::{CountdownTick, TutorialBuffer};
use crate::core::types::{
    dedup_options, sort_leaderboard, Role, RoundCounts, RoundQuestion, RoundResult, Screen,
    Session,
};
use crate::core::validation::{validate_join, ValidationError};

// =============================================================================
// INPUTS & EFFECTS
// =============================================================================

/// Actions initiated by the local user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CreateGame,
    JoinGame {
        game_code: String,
        player_name: String,
    },
    StartGame,
    SelectAnswer(String),
    Ready,
    PlayAgain,
    CancelGame,
    LeaveGame,
    ReturnHome,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Server(ServerMessage),
    Command(Command),
    /// One second elapsed
    Tick,
    GameDataLoaded(RoundCounts),
    GameDataFailed(String),
}

#[derive(Clone, PartialEq)]
pub enum Effect {
    Send(ClientMessage),
    Render(RenderInstruction),
    PersistHostToken(String),
    PersistPlayerCredentials(PlayerCredentials),
    ForgetHostToken,
    ForgetPlayerCredentials,
    /// Fetch the per-phase round counts and feed them back as an input
    FetchGameData,
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Effect::Send(msg) => f.debug_tuple("Send").field(msg).finish(),
            Effect::Render(ins) => f.debug_tuple("Render").field(ins).finish(),
            Effect::PersistHostToken(_) => f.write_str("PersistHostToken(<redacted>)"),
            Effect::PersistPlayerCredentials(creds) => f
                .debug_tuple("PersistPlayerCredentials")
                .field(creds)
                .finish(),
            Effect::ForgetHostToken => f.write_str("ForgetHostToken"),
            Effect::ForgetPlayerCredentials => f.write_str("ForgetPlayerCredentials"),
            Effect::FetchGameData => f.write_str("FetchGameData"),
        }
    }
}

/// Read-only view of the controller handed to collaborators
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub screen: Screen,
    pub session: Session,
    pub question: Option<RoundQuestion>,
    pub timer: TimerState,
    pub countdown_remaining: Option<u32>,
    pub start_enabled: bool,
    pub ready_available: bool,
}

// =============================================================================
// SESSION CONTROLLER
// =============================================================================

pub struct SessionController {
    session: Session,
    screen: Screen,
    question: Option<RoundQuestion>,
    /// Host's start control
    start_enabled: bool,
    /// Player's ready control on the results screen
    ready_available: bool,
    /// Authentic-phase question count observed from payloads
    observed_authentic_total: Option<u32>,
    timer: RoundTimer,
    tutorial: TutorialBuffer,
    rng: StdRng,
}

impl SessionController {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Deterministic auto-submit choice
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            session: Session::default(),
            screen: Screen::Home,
            question: None,
            start_enabled: false,
            ready_available: false,
            observed_authentic_total: None,
            timer: RoundTimer::new(),
            tutorial: TutorialBuffer::new(),
            rng,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn question(&self) -> Option<&RoundQuestion> {
        self.question.as_ref()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            screen: self.screen,
            session: self.session.clone(),
            question: self.question.clone(),
            timer: self.timer.state(),
            countdown_remaining: self.tutorial.remaining(),
            start_enabled: self.start_enabled,
            ready_available: self.ready_available,
        }
    }

    /// Process one input and return the effects to apply, in order
    pub fn handle(&mut self, input: Input) -> Vec<Effect> {
        let mut effects = Vec::new();
        match input {
            Input::Server(msg) => self.on_server_message(msg, &mut effects),
            Input::Command(cmd) => self.on_command(cmd, &mut effects),
            Input::Tick => self.on_tick(&mut effects),
            Input::GameDataLoaded(counts) => self.on_game_data(counts),
            Input::GameDataFailed(reason) => {
                warn!(reason = %reason, "[SESSION] Game data unavailable");
                effects.push(Effect::Render(RenderInstruction::PersistentError(format!(
                    "Could not load game data: {reason}"
                ))));
            }
        }
        effects
    }

    // -------------------------------------------------------------------------
    // Server messages
    // -------------------------------------------------------------------------

    fn on_server_message(&mut self, msg: ServerMessage, effects: &mut Vec<Effect>) {
        debug!(kind = msg.kind(), "[SESSION] Server message");
        match msg {
            ServerMessage::GameCreated {
                game_code,
                player_name,
                host_token,
            } => self.on_game_created(game_code, player_name, host_token, effects),
            ServerMessage::JoinedGame {
                player_name,
                game_code,
                player_token,
                players,
            } => self.on_joined_game(player_name, game_code, player_token, players, effects),
            ServerMessage::PlayerJoined { players } => {
                let count = players.len();
                self.on_roster(players, count, effects);
            }
            ServerMessage::PlayerLeft {
                players,
                players_count,
            } => {
                let count = players_count.unwrap_or(players.len());
                self.on_roster(players, count, effects);
            }
            ServerMessage::GameStarted { total_rounds } => {
                self.on_game_started(total_rounds, effects)
            }
            ServerMessage::TimerFailed => {
                if self.require_session("timer_failed") {
                    warn!("[SESSION] Server timer failed, requesting first question");
                    effects.push(Effect::Send(ClientMessage::RequestFirstQuestion));
                }
            }
            ServerMessage::HostQuestion(payload) | ServerMessage::PlayerQuestion(payload) => {
                self.on_question(payload, effects)
            }
            ServerMessage::QuestionResults(payload) => self.on_results(payload, effects),
            ServerMessage::GameFinished {
                leaderboard,
                winner,
                ..
            } => self.on_game_finished(leaderboard, winner, effects),
            ServerMessage::AllPlayersReady => {
                if self.require_session("all_players_ready") && self.session.is_host() {
                    info!("[SESSION] All players ready, advancing round");
                    effects.push(Effect::Send(ClientMessage::NextRound));
                } else {
                    debug!("[SESSION] Ignoring all_players_ready outside a hosted game");
                }
            }
            ServerMessage::PhaseTransition { message } => {
                if !self.require_session("phase_transition") {
                    return;
                }
                self.timer.cancel();
                self.ready_available = false;
                let message = message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_PHASE_TRANSITION_MESSAGE.to_string());
                info!(message = %message, "[SESSION] Phase transition");
                self.show(Screen::PhaseTransition, effects);
                effects.push(Effect::Render(RenderInstruction::PhaseTransition {
                    message,
                }));
            }
            ServerMessage::Error { message } => {
                warn!(message = %message, "[SESSION] Server error");
                effects.push(Effect::Render(RenderInstruction::TransientError {
                    message,
                    dismiss_after: TRANSIENT_ERROR_DURATION,
                }));
            }
            ServerMessage::RedirectHomepage => {
                warn!("[SESSION] Server ended the session, returning home");
                effects.push(Effect::Render(RenderInstruction::Fatal(
                    REDIRECT_HOME_MESSAGE.to_string(),
                )));
                self.go_home(effects);
            }
            ServerMessage::HostReconnected {
                game_code,
                game_state,
            } => self.on_host_reconnected(game_code, game_state, effects),
        }
    }

    fn on_game_created(
        &mut self,
        game_code: String,
        player_name: String,
        host_token: Option<String>,
        effects: &mut Vec<Effect>,
    ) {
        info!(game_code = %game_code, "[SESSION] Game created");
        self.reset();
        self.session.role = Role::Host;
        self.session.room_code = game_code;
        self.session.local_player_name = player_name;

        if let Some(token) = host_token.filter(|t| !t.is_empty()) {
            effects.push(Effect::PersistHostToken(token));
        }
        effects.push(Effect::FetchGameData);
        self.show(Screen::Lobby(Role::Host), effects);
        self.push_roster(effects);
    }

    fn on_joined_game(
        &mut self,
        player_name: String,
        game_code: String,
        player_token: Option<String>,
        players: Vec<String>,
        effects: &mut Vec<Effect>,
    ) {
        info!(game_code = %game_code, player = %player_name, "[SESSION] Joined game");
        self.reset();
        self.session.role = Role::Player;
        self.session.players = if players.is_empty() {
            vec![player_name.clone()]
        } else {
            players
        };
        self.session.seed_scores();

        if let Some(token) = player_token.filter(|t| !t.is_empty()) {
            effects.push(Effect::PersistPlayerCredentials(PlayerCredentials {
                player_token: token,
                player_name: player_name.clone(),
                game_code: game_code.clone(),
            }));
        }
        self.session.room_code = game_code;
        self.session.local_player_name = player_name;

        effects.push(Effect::FetchGameData);
        self.show(Screen::Lobby(Role::Player), effects);
        self.push_roster(effects);
    }

    fn on_roster(&mut self, players: Vec<String>, count: usize, effects: &mut Vec<Effect>) {
        if !self.require_session("roster update") {
            return;
        }
        if !self.session.is_host() {
            debug!("[SESSION] Ignoring roster update as player");
            return;
        }

        self.session.players = players;
        self.session.seed_scores();
        self.start_enabled = count >= 1;
        debug!(
            count,
            start_enabled = self.start_enabled,
            "[SESSION] Roster updated"
        );

        if matches!(self.screen, Screen::Lobby(_)) {
            self.push_roster(effects);
        }
    }

    fn on_game_started(&mut self, total_rounds: Option<u32>, effects: &mut Vec<Effect>) {
        if !self.require_session("game_started") {
            return;
        }

        if self.session.round_counts.is_none() {
            if let Some(total) = total_rounds {
                self.session.total_rounds = total;
            }
        }

        // A new game: round numbering starts over, scores carry the server's values
        self.session.current_round_index = 0;
        self.question = None;
        self.start_enabled = false;
        self.ready_available = false;
        self.timer.cancel();
        self.tutorial.begin(TUTORIAL_COUNTDOWN_TICKS);

        info!(
            total_rounds = self.session.total_rounds,
            "[SESSION] Game started, showing tutorial"
        );
        self.show(Screen::TutorialCountdown, effects);
        effects.push(Effect::Render(RenderInstruction::Countdown {
            seconds: TUTORIAL_COUNTDOWN_TICKS,
        }));
    }

    fn on_question(&mut self, mut payload: QuestionPayload, effects: &mut Vec<Effect>) {
        if !self.require_session("question") {
            return;
        }

        let offered = payload.options.len();
        payload.options = dedup_options(payload.options);
        if payload.options.is_empty() {
            warn!(
                question_number = payload.question_number,
                "[SESSION] Dropping question without options"
            );
            return;
        }
        if payload.options.len() != offered {
            warn!(
                offered,
                distinct = payload.options.len(),
                "[SESSION] Removed duplicate options"
            );
        }

        match self.tutorial.offer(payload) {
            None => debug!("[SESSION] Question buffered during tutorial"),
            Some(payload) => self.install_question(payload, effects),
        }
    }

    fn on_results(&mut self, payload: ResultsPayload, effects: &mut Vec<Effect>) {
        if !self.require_session("question_results") {
            return;
        }

        self.timer.cancel();
        self.tutorial.clear();
        self.question = None;

        self.session.phase = payload.phase;
        self.session.apply_leaderboard(&payload.leaderboard);

        let result = RoundResult::from(payload);
        let player_view = result.view == ViewKind::Player && !self.session.is_host();
        let own_result = if player_view {
            result.result_for(&self.session.local_player_name).cloned()
        } else {
            None
        };

        let ready = if player_view {
            Some(self.ready_label(&result))
        } else {
            None
        };
        self.ready_available = ready.is_some();

        info!(
            round = self.session.current_round_index,
            correct_answer = %result.correct_answer,
            "[SESSION] Round results"
        );
        self.show(Screen::RoundResults, effects);
        effects.push(Effect::Render(RenderInstruction::RoundResults {
            result,
            own_result,
            ready,
        }));
    }

    fn on_game_finished(
        &mut self,
        mut leaderboard: Vec<LeaderboardEntry>,
        winner: Option<String>,
        effects: &mut Vec<Effect>,
    ) {
        if !self.require_session("game_finished") {
            return;
        }

        self.timer.cancel();
        self.tutorial.clear();
        self.question = None;
        self.ready_available = false;

        sort_leaderboard(&mut leaderboard);
        self.session.replace_scores(&leaderboard);

        info!(winner = ?winner, "[SESSION] Game finished");
        self.show(Screen::FinalResults, effects);
        effects.push(Effect::Render(RenderInstruction::FinalResults {
            leaderboard,
            winner,
        }));
    }

    fn on_host_reconnected(
        &mut self,
        game_code: String,
        game_state: Option<String>,
        effects: &mut Vec<Effect>,
    ) {
        info!(game_code = %game_code, state = ?game_state, "[SESSION] Host reconnected");

        if !self.session.is_active() {
            self.reset();
            self.session.role = Role::Host;
            self.session.room_code = game_code.clone();
            self.session.local_player_name = HOST_PLAYER_NAME.to_string();
            effects.push(Effect::FetchGameData);

            if game_state.as_deref().map_or(true, |s| s == "waiting") {
                self.show(Screen::Lobby(Role::Host), effects);
                self.push_roster(effects);
            }
        }

        effects.push(Effect::Render(RenderInstruction::Notice(format!(
            "Reconnected to game {game_code}"
        ))));
    }

    fn on_game_data(&mut self, counts: RoundCounts) {
        if !self.require_session("game data") {
            return;
        }
        if self.session.round_counts.is_some() {
            debug!("[SESSION] Round counts already known, ignoring");
            return;
        }

        info!(
            authentic = counts.authentic,
            synthetic = counts.synthetic,
            "[SESSION] Round counts loaded"
        );
        self.session.round_counts = Some(counts);
        self.session.total_rounds = counts.total();
        if let Some(question) = self.question.as_mut() {
            question.total_rounds = counts.total();
        }
    }

    // -------------------------------------------------------------------------
    // Local commands
    // -------------------------------------------------------------------------

    fn on_command(&mut self, cmd: Command, effects: &mut Vec<Effect>) {
        match cmd {
            Command::CreateGame => {
                if self.session.is_active() {
                    self.reject(ValidationError::AlreadyInGame, effects);
                    return;
                }
                effects.push(Effect::Send(ClientMessage::CreateGame {
                    player_name: HOST_PLAYER_NAME.to_string(),
                }));
            }
            Command::JoinGame {
                game_code,
                player_name,
            } => {
                if self.session.is_active() {
                    self.reject(ValidationError::AlreadyInGame, effects);
                    return;
                }
                match validate_join(&game_code, &player_name) {
                    Ok(request) => effects.push(Effect::Send(ClientMessage::JoinGame {
                        game_code: request.game_code,
                        player_name: request.player_name,
                    })),
                    Err(e) => self.reject(e, effects),
                }
            }
            Command::StartGame => {
                if self.screen == Screen::Lobby(Role::Host) && self.start_enabled {
                    effects.push(Effect::Send(ClientMessage::StartGame));
                } else {
                    debug!("[SESSION] Start not available");
                }
            }
            Command::SelectAnswer(answer) => self.select_answer(answer, effects),
            Command::Ready => {
                if self.screen == Screen::RoundResults && self.ready_available {
                    self.ready_available = false;
                    effects.push(Effect::Send(ClientMessage::PlayerReady));
                    effects.push(Effect::Render(RenderInstruction::ReadyLocked));
                } else {
                    debug!("[SESSION] Ready not available");
                }
            }
            Command::PlayAgain => {
                if self.screen != Screen::FinalResults || !self.session.is_host() {
                    debug!("[SESSION] Play again not available");
                    return;
                }
                for score in self.session.scores.values_mut() {
                    *score = 0;
                }
                self.session.seed_scores();
                self.session.current_round_index = 0;
                info!("[SESSION] Starting a new game with the same players");
                effects.push(Effect::Send(ClientMessage::StartGame));
            }
            Command::CancelGame => {
                if !self.session.is_host() {
                    debug!("[SESSION] Only the host can cancel a game");
                    return;
                }
                info!("[SESSION] Host cancelled the game");
                effects.push(Effect::ForgetHostToken);
                self.go_home(effects);
            }
            Command::LeaveGame => {
                if !self.session.is_active() || self.session.is_host() {
                    debug!("[SESSION] No player session to leave");
                    return;
                }
                info!("[SESSION] Player left the game");
                effects.push(Effect::ForgetPlayerCredentials);
                self.go_home(effects);
            }
            Command::ReturnHome => self.go_home(effects),
        }
    }

    fn select_answer(&mut self, answer: String, effects: &mut Vec<Effect>) {
        if self.screen != Screen::Question || self.session.is_host() {
            debug!("[SESSION] Answer ignored outside a player question");
            return;
        }
        if self.session.selected_answer.is_some() {
            debug!("[SESSION] Answer already submitted");
            return;
        }
        let Some(question) = self.question.as_ref() else {
            debug!("[SESSION] No question to answer");
            return;
        };
        if !question.offers(&answer) {
            debug!(answer = %answer, "[SESSION] Answer is not one of the options");
            return;
        }

        self.submit(answer, effects);
    }

    fn submit(&mut self, answer: String, effects: &mut Vec<Effect>) {
        self.session.selected_answer = Some(answer.clone());
        effects.push(Effect::Render(RenderInstruction::ChoicesLocked {
            selected: answer.clone(),
        }));
        effects.push(Effect::Send(ClientMessage::SubmitAnswer { answer }));
    }

    // -------------------------------------------------------------------------
    // Ticks
    // -------------------------------------------------------------------------

    fn on_tick(&mut self, effects: &mut Vec<Effect>) {
        // Round timer first so a question installed by the tutorial below
        // keeps its full duration
        match self.timer.tick() {
            TimerTick::Idle => {}
            TimerTick::Running {
                seconds_remaining,
                urgency,
            } => effects.push(Effect::Render(RenderInstruction::TimerTick {
                seconds_remaining,
                urgency,
            })),
            TimerTick::Expired => self.on_timer_expired(effects),
        }

        match self.tutorial.tick() {
            CountdownTick::Inactive => {}
            CountdownTick::Counting(seconds) => {
                effects.push(Effect::Render(RenderInstruction::Countdown { seconds }));
            }
            CountdownTick::Finished(Some(payload)) => {
                debug!("[TUTORIAL] Countdown over, installing buffered question");
                self.install_question(payload, effects);
            }
            CountdownTick::Finished(None) => {
                debug!("[TUTORIAL] Countdown over, nothing buffered");
                if !self.session.is_host() && self.session.current_round_index == 0 {
                    effects.push(Effect::Send(ClientMessage::RequestFirstQuestion));
                }
                self.show(Screen::Question, effects);
            }
        }
    }

    fn on_timer_expired(&mut self, effects: &mut Vec<Effect>) {
        effects.push(Effect::Render(RenderInstruction::TimerTick {
            seconds_remaining: 0,
            urgency: TimerUrgency::Critical,
        }));

        if self.session.is_host() || self.session.selected_answer.is_some() {
            return;
        }
        let Some(question) = self.question.as_ref() else {
            return;
        };

        let index = self.rng.random_range(0..question.options.len());
        let answer = question.options[index].clone();
        info!(answer = %answer, "[TIMER] Time's up, submitting a random answer");
        self.submit(answer, effects);
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn install_question(&mut self, payload: QuestionPayload, effects: &mut Vec<Effect>) {
        if payload.phase == Phase::Authentic {
            self.observed_authentic_total = Some(payload.total_questions);
        }

        let authentic_rounds = self
            .session
            .round_counts
            .map(|c| c.authentic)
            .or(self.observed_authentic_total);
        let derived = match payload.phase {
            Phase::Authentic => Some(payload.question_number),
            Phase::Synthetic => authentic_rounds.map(|a| a + payload.question_number),
        };
        let next = derived.unwrap_or(self.session.current_round_index + 1);
        self.session.current_round_index = self.session.current_round_index.max(next);

        self.session.phase = payload.phase;
        self.session.selected_answer = None;
        self.ready_available = false;

        let question = RoundQuestion::from_payload(
            payload,
            self.session.current_round_index,
            self.session.total_rounds,
            self.session.role,
        );
        info!(
            round = question.round_number,
            total = question.total_rounds,
            phase = ?question.phase,
            "[SESSION] Question installed"
        );
        self.question = Some(question.clone());

        let initial = self.timer.start(QUESTION_DURATION_SECS);
        self.show(Screen::Question, effects);
        effects.push(Effect::Render(RenderInstruction::Question(question)));
        if let TimerTick::Running {
            seconds_remaining,
            urgency,
        } = initial
        {
            effects.push(Effect::Render(RenderInstruction::TimerTick {
                seconds_remaining,
                urgency,
            }));
        }
    }

    fn ready_label(&self, result: &RoundResult) -> ReadyLabel {
        let last_round = self.session.total_rounds > 0
            && self.session.current_round_index == self.session.total_rounds;
        if result.phase == Phase::Synthetic && !result.leaderboard.is_empty() && last_round {
            ReadyLabel::FinalResults
        } else {
            ReadyLabel::NextRound
        }
    }

    fn require_session(&self, what: &str) -> bool {
        if self.session.is_active() {
            true
        } else {
            debug!(what, "[SESSION] Ignoring message without an active session");
            false
        }
    }

    fn reject(&self, error: ValidationError, effects: &mut Vec<Effect>) {
        debug!(error = %error, "[SESSION] Rejected local input");
        effects.push(Effect::Render(RenderInstruction::TransientError {
            message: error.to_string(),
            dismiss_after: TRANSIENT_ERROR_DURATION,
        }));
    }

    fn show(&mut self, screen: Screen, effects: &mut Vec<Effect>) {
        self.screen = screen;
        effects.push(Effect::Render(RenderInstruction::ShowScreen(screen)));
    }

    fn push_roster(&self, effects: &mut Vec<Effect>) {
        effects.push(Effect::Render(RenderInstruction::Roster {
            room_code: self.session.room_code.clone(),
            players: self.session.players.clone(),
            start_enabled: self.start_enabled,
        }));
    }

    fn go_home(&mut self, effects: &mut Vec<Effect>) {
        self.reset();
        self.show(Screen::Home, effects);
    }

    fn reset(&mut self) {
        self.session = Session::default();
        self.screen = Screen::Home;
        self.question = None;
        self.start_enabled = false;
        self.ready_available = false;
        self.observed_authentic_total = None;
        self.timer.cancel();
        self.tutorial.clear();
    }
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TESTS
// =============================================================================
