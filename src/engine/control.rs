//! Run-state machine and the handle used to steer a running engine

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio_util::sync::CancellationToken;

use crate::simulation::game::SnakeGame;

/// Shared read/write access to the simulation
pub type SharedGame = Arc<Mutex<SnakeGame>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngineState {
    /// Agents are still starting
    Idle,
    Running,
    Paused,
    /// Paused, but allowed to start exactly one more turn
    SteppingOneTurn,
    Terminated,
}

impl EngineState {
    /// Whether a new turn may begin in this state
    pub fn admits_turn(&self) -> bool {
        matches!(self, EngineState::Running | EngineState::SteppingOneTurn)
    }

    /// State after a control command; commands that make no sense are ignored
    pub fn apply(self, command: ControlCommand) -> EngineState {
        use EngineState::*;
        match (self, command) {
            (Terminated, _) => Terminated,
            (_, ControlCommand::Stop) => Terminated,
            (Idle, _) => Idle,
            (Running, ControlCommand::Pause | ControlCommand::TogglePause) => Paused,
            (Paused, ControlCommand::Resume | ControlCommand::TogglePause) => Running,
            (Running | Paused, ControlCommand::Step) => SteppingOneTurn,
            (SteppingOneTurn, ControlCommand::Resume | ControlCommand::TogglePause) => Running,
            (SteppingOneTurn, ControlCommand::Pause) => Paused,
            (state, _) => state,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Pause,
    Resume,
    TogglePause,
    /// Play exactly one more turn, then pause
    Step,
    Stop,
}

/// Cloneable remote control for an engine
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::UnboundedSender<ControlCommand>,
    state: watch::Receiver<EngineState>,
    game: SharedGame,
    run_scope: CancellationToken,
}

impl EngineHandle {
    pub(crate) fn new(
        commands: mpsc::UnboundedSender<ControlCommand>,
        state: watch::Receiver<EngineState>,
        game: SharedGame,
        run_scope: CancellationToken,
    ) -> Self {
        Self {
            commands,
            state,
            game,
            run_scope,
        }
    }

    pub fn pause(&self) {
        self.send(ControlCommand::Pause);
    }

    pub fn resume(&self) {
        self.send(ControlCommand::Resume);
    }

    pub fn toggle_pause(&self) {
        self.send(ControlCommand::TogglePause);
    }

    pub fn step(&self) {
        self.send(ControlCommand::Step);
    }

    /// Terminate the run; in-flight agents are cancelled
    pub fn stop(&self) {
        self.send(ControlCommand::Stop);
        self.run_scope.cancel();
    }

    pub fn state(&self) -> EngineState {
        *self.state.borrow()
    }

    /// Watch state transitions
    pub fn subscribe(&self) -> watch::Receiver<EngineState> {
        self.state.clone()
    }

    /// Read access for renderers and observers
    pub fn game(&self) -> SharedGame {
        Arc::clone(&self.game)
    }

    fn send(&self, command: ControlCommand) {
        if self.commands.send(command).is_err() {
            tracing::debug!(?command, "engine is gone, dropping control command");
        }
    }
}
