//! Turn orchestration
//!
//! Architecture:
//! - `Engine` owns the run: it resets the game, starts every agent in
//!   parallel, then drives a fixed-rate frame loop
//! - each frame polls input capabilities, applies control commands, and
//!   starts a turn if the single turn permit is free
//! - `TurnRunner` performs one turn cycle; the permit is released only once
//!   the simulation has applied that turn
//!
//! Cancellation scopes nest run → turn → agent. A simulation error cancels
//! the run scope and ends the run with that error.

pub mod control;
pub mod player;
pub mod turn;

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::agent::{Agent, AgentFactory, ChatStream};
use crate::core::config::GameConfig;
use crate::core::error::{ArenaError, Result};
use crate::core::types::{PlayerId, Turn};
use crate::simulation::game::SnakeGame;
use crate::simulation::snake::Score;
use crate::simulation::state::PlayerInfo;

pub use control::{ControlCommand, EngineHandle, EngineState, SharedGame};
pub use player::PlayerSlot;
pub use turn::{TurnReport, TurnRunner};

/// Frame rate of the control loop
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_micros(16_667);

/// How long agents get to shut down before they are forced
pub const STOP_GRACE: Duration = Duration::from_secs(2);

/// Tracing target for agent chat
pub const CHAT_TARGET: &str = "snake_arena::chat";

/// Final standings of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub seed: u64,
    pub turns: Turn,
    pub players: Vec<PlayerSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub name: String,
    pub agent: &'static str,
    pub alive: bool,
    pub score: Score,
}

/// What woke the frame loop
enum Frame {
    Cancelled,
    Command(ControlCommand),
    TurnDone(std::result::Result<Result<TurnReport>, tokio::task::JoinError>),
    Tick,
}

pub struct Engine {
    game: SharedGame,
    players: Arc<Vec<PlayerSlot>>,
    chat: Vec<(String, ChatStream)>,
    turn_duration: Duration,
    frame_interval: Duration,
    seed: u64,
    state_tx: watch::Sender<EngineState>,
    commands_tx: mpsc::UnboundedSender<ControlCommand>,
    commands_rx: mpsc::UnboundedReceiver<ControlCommand>,
    run_scope: CancellationToken,
}

impl Engine {
    /// Build every configured player's agent and wire up a game
    pub fn new(config: &GameConfig, factory: &AgentFactory) -> Result<Self> {
        let agents = config
            .players
            .iter()
            .map(|player| factory.build(&player.agent))
            .collect::<Result<Vec<_>>>()?;
        Self::with_agents(config, agents)
    }

    /// Use ready-made agents, one per configured player, in order
    pub fn with_agents(config: &GameConfig, agents: Vec<Box<dyn Agent>>) -> Result<Self> {
        config.validate()?;
        if agents.len() != config.players.len() {
            return Err(ArenaError::Config(format!(
                "{} players configured but {} agents supplied",
                config.players.len(),
                agents.len()
            )));
        }

        let turn_duration = config.turn_duration();
        let mut slots = Vec::with_capacity(agents.len());
        let mut chat = Vec::new();
        for (index, (spec, mut agent)) in config.players.iter().zip(agents).enumerate() {
            let id = PlayerId::new(index as u32);
            let info = PlayerInfo::from_spec(id, spec, turn_duration);
            // A silent player's stream is dropped unread
            if let Some(stream) = agent.chat() {
                if !info.silent {
                    chat.push((info.name.clone(), stream));
                }
            }
            slots.push(PlayerSlot::new(info, agent));
        }

        let infos = slots.iter().map(|slot| slot.info.clone()).collect();
        let game = SnakeGame::new(config.board(), infos);
        let seed = config.seed.unwrap_or_else(rand::random);

        let (state_tx, _) = watch::channel(EngineState::Idle);
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        Ok(Self {
            game: Arc::new(Mutex::new(game)),
            players: Arc::new(slots),
            chat,
            turn_duration,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            seed,
            state_tx,
            commands_tx,
            commands_rx,
            run_scope: CancellationToken::new(),
        })
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn handle(&self) -> EngineHandle {
        EngineHandle::new(
            self.commands_tx.clone(),
            self.state_tx.subscribe(),
            Arc::clone(&self.game),
            self.run_scope.clone(),
        )
    }

    /// Play the game to the end, a stop request, or a fatal error
    pub async fn run(mut self) -> Result<RunSummary> {
        tracing::info!(seed = self.seed, players = self.players.len(), "starting run");

        {
            let mut game = self.game.lock().await;
            game.reset(self.seed);
            for slot in self.players.iter() {
                slot.agent.lock().await.seed_rng(game.player_rng(slot.id()));
            }
        }

        self.start_agents().await;
        for (name, stream) in std::mem::take(&mut self.chat) {
            tokio::spawn(forward_chat(name, stream, self.run_scope.clone()));
        }

        let result = if self.run_scope.is_cancelled() {
            Ok(())
        } else {
            self.set_state(EngineState::Running);
            self.frame_loop().await
        };

        self.stop_agents().await;
        self.run_scope.cancel();
        self.set_state(EngineState::Terminated);

        result?;
        let summary = self.summary().await;
        tracing::info!(turns = summary.turns, "run finished");
        Ok(summary)
    }

    async fn frame_loop(&mut self) -> Result<()> {
        let permit = Arc::new(Semaphore::new(1));
        let runner = Arc::new(TurnRunner::new(
            Arc::clone(&self.game),
            Arc::clone(&self.players),
            self.turn_duration,
        ));
        let pollers: Vec<_> = self.players.iter().filter_map(|s| s.poller.clone()).collect();

        let mut ticker = tokio::time::interval(self.frame_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut state = EngineState::Running;
        let mut in_flight: Option<JoinHandle<Result<TurnReport>>> = None;
        let mut game_over = self.game.lock().await.is_game_over();

        let result = loop {
            if game_over {
                tracing::info!("game over");
                break Ok(());
            }

            let frame = tokio::select! {
                biased;
                _ = self.run_scope.cancelled() => Frame::Cancelled,
                command = self.commands_rx.recv() => match command {
                    Some(command) => Frame::Command(command),
                    None => Frame::Cancelled,
                },
                joined = async {
                    match in_flight.as_mut() {
                        Some(turn) => turn.await,
                        None => std::future::pending().await,
                    }
                }, if in_flight.is_some() => Frame::TurnDone(joined),
                _ = ticker.tick() => Frame::Tick,
            };

            match frame {
                Frame::Cancelled => break Ok(()),
                Frame::Command(command) => {
                    let next = state.apply(command);
                    if next != state {
                        tracing::debug!(?command, from = ?state, to = ?next, "control");
                        state = next;
                        self.set_state(state);
                    }
                    if state == EngineState::Terminated {
                        self.run_scope.cancel();
                        break Ok(());
                    }
                }
                Frame::TurnDone(joined) => {
                    in_flight = None;
                    let report = match joined {
                        Ok(Ok(report)) => report,
                        Ok(Err(e)) => break Err(e),
                        Err(e) => break Err(ArenaError::Simulation(format!("turn task failed: {e}"))),
                    };
                    for death in &report.outcome.deaths {
                        tracing::info!(turn = report.outcome.turn, player = %death.player, cause = ?death.cause, "snake died");
                    }
                    if state == EngineState::SteppingOneTurn {
                        state = EngineState::Paused;
                        self.set_state(state);
                    }
                    game_over = self.game.lock().await.is_game_over();
                }
                Frame::Tick => {
                    for poller in &pollers {
                        poller.poll_input();
                    }
                    // The finished turn must be observed before the next starts
                    if !state.admits_turn() || in_flight.is_some() {
                        continue;
                    }
                    let Ok(permit) = Arc::clone(&permit).try_acquire_owned() else {
                        continue;
                    };
                    let runner = Arc::clone(&runner);
                    let scope = self.run_scope.clone();
                    in_flight = Some(tokio::spawn(async move {
                        let report = runner.run(&scope).await;
                        drop(permit);
                        report
                    }));
                }
            }
        };

        if let Err(e) = &result {
            tracing::error!(error = %e, "simulation failed, terminating run");
            self.run_scope.cancel();
        }
        // A cancelled turn still finishes quickly; let it settle
        if let Some(turn) = in_flight.take() {
            if let Ok(Err(e)) = turn.await {
                tracing::debug!(error = %e, "in-flight turn ended with an error during shutdown");
            }
        }

        result
    }

    /// Start every agent in parallel; failures sit out the game
    async fn start_agents(&self) {
        let mut starting = JoinSet::new();
        for (index, slot) in self.players.iter().enumerate() {
            let agent = Arc::clone(&slot.agent);
            let scope = self.run_scope.child_token();
            starting.spawn(async move { (index, agent.lock().await.start(scope).await) });
        }

        let mut started = vec![false; self.players.len()];
        while let Some(joined) = starting.join_next().await {
            match joined {
                Ok((index, Ok(()))) => started[index] = true,
                Ok((index, Err(e))) => {
                    let slot = &self.players[index];
                    let error = ArenaError::Startup {
                        player: slot.id(),
                        reason: e.to_string(),
                    };
                    tracing::warn!(player = %slot.info.name, %error, "agent will sit out the game");
                }
                Err(e) => tracing::warn!(error = %e, "agent start task failed"),
            }
        }

        for (slot, ok) in self.players.iter().zip(started) {
            if !ok {
                slot.mark_errored();
            }
        }
    }

    async fn stop_agents(&self) {
        let grace = CancellationToken::new();
        let timer = {
            let grace = grace.clone();
            tokio::spawn(async move {
                tokio::time::sleep(STOP_GRACE).await;
                grace.cancel();
            })
        };

        let mut stopping = JoinSet::new();
        for slot in self.players.iter() {
            let agent = Arc::clone(&slot.agent);
            let name = slot.info.name.clone();
            let scope = grace.clone();
            stopping.spawn(async move {
                if let Err(e) = agent.lock().await.stop(scope).await {
                    tracing::warn!(player = %name, error = %e, "agent did not stop cleanly");
                }
            });
        }
        while stopping.join_next().await.is_some() {}
        timer.abort();
    }

    async fn summary(&self) -> RunSummary {
        let game = self.game.lock().await;
        let players = self
            .players
            .iter()
            .map(|slot| {
                let snake = game.world().snake(slot.id());
                PlayerSummary {
                    id: slot.id(),
                    name: slot.info.name.clone(),
                    agent: slot.kind,
                    alive: snake.is_some_and(|s| s.is_alive()),
                    score: snake.map(|s| s.score()).unwrap_or_default(),
                }
            })
            .collect();
        RunSummary {
            seed: self.seed,
            turns: game.turn(),
            players,
        }
    }

    fn set_state(&self, state: EngineState) {
        self.state_tx.send_replace(state);
    }
}

/// Log an agent's chat until it hangs up or the run ends
async fn forward_chat(name: String, mut stream: ChatStream, scope: CancellationToken) {
    loop {
        tokio::select! {
            _ = scope.cancelled() => break,
            message = stream.recv() => match message {
                Some(message) => tracing::info!(target: CHAT_TARGET, player = %name, "{message}"),
                None => break,
            },
        }
    }
}
