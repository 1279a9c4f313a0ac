//! Decision providers
//!
//! Architecture: one async trait, many implementations
//! - `Agent` is the contract the engine drives every turn
//! - optional capabilities (chat, input polling) are exposed through
//!   methods returning `Option`, queried once when a player is registered
//! - `AgentFactory` turns a configured `AgentKind` into a boxed agent

pub mod builtin;
pub mod external;
pub mod human;
pub mod pathfinding;
pub mod protocol;
pub mod random;

use async_trait::async_trait;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::core::config::AgentKind;
use crate::core::error::{ArenaError, Result};
use crate::simulation::state::PlayerState;
use crate::spatial::Direction;

pub use builtin::BuiltinAgent;
pub use external::ExternalAgent;
pub use human::{HumanAgent, InputSource, ScriptedInput, TerminalInput};
pub use random::RandomAgent;

/// Lazy, unbounded stream of chat lines from an agent
pub type ChatStream = mpsc::UnboundedReceiver<String>;

/// Eventually yields the agent's move for one turn
#[derive(Debug)]
pub struct ReplyHandle {
    rx: oneshot::Receiver<Direction>,
}

/// The agent's half of a `ReplyHandle`
#[derive(Debug)]
pub struct ReplySender {
    tx: oneshot::Sender<Direction>,
}

impl ReplyHandle {
    pub fn channel() -> (ReplySender, ReplyHandle) {
        let (tx, rx) = oneshot::channel();
        (ReplySender { tx }, ReplyHandle { rx })
    }

    /// A handle that has already resolved
    pub fn ready(direction: Direction) -> Self {
        let (tx, handle) = Self::channel();
        tx.send(direction);
        handle
    }

    /// Wait for the reply; `None` if the agent dropped its sender
    pub async fn recv(&mut self) -> Option<Direction> {
        (&mut self.rx).await.ok()
    }

    /// Take a reply that has already arrived, without waiting
    pub fn try_recv(&mut self) -> Option<Direction> {
        self.rx.try_recv().ok()
    }
}

impl ReplySender {
    /// Deliver the move; false if nobody is listening any more
    pub fn send(self, direction: Direction) -> bool {
        self.tx.send(direction).is_ok()
    }
}

/// Samples raw input once per engine frame
pub trait InputPoller: Send + Sync {
    fn poll_input(&self);
}

/// Contract every decision provider implements
#[async_trait]
pub trait Agent: Send {
    /// Short label for logs
    fn kind(&self) -> &'static str;

    /// Prepare the agent; called once before the first turn
    async fn start(&mut self, _scope: CancellationToken) -> Result<()> {
        Ok(())
    }

    /// Hand the agent this turn's state
    ///
    /// May block while sending. The returned handle resolves whenever the
    /// agent replies; the engine, not the agent, enforces deadlines. `scope`
    /// is cancelled once the engine stops waiting.
    async fn decide(&mut self, state: PlayerState, scope: CancellationToken) -> Result<ReplyHandle>;

    /// Shut down; `scope` is cancelled when the grace period runs out
    async fn stop(&mut self, _scope: CancellationToken) -> Result<()> {
        Ok(())
    }

    /// Receive this player's deterministic random stream
    fn seed_rng(&mut self, _rng: ChaCha8Rng) {}

    /// Chat capability; yields the stream at most once
    fn chat(&mut self) -> Option<ChatStream> {
        None
    }

    /// Input polling capability
    fn input_poller(&self) -> Option<Arc<dyn InputPoller>> {
        None
    }
}

/// Builds agents from configuration
#[derive(Default, Clone)]
pub struct AgentFactory {
    keyboard: Option<Arc<TerminalInput>>,
}

impl AgentFactory {
    /// Factory without keyboard access; human players are rejected
    pub fn headless() -> Self {
        Self { keyboard: None }
    }

    pub fn with_keyboard(keyboard: Arc<TerminalInput>) -> Self {
        Self {
            keyboard: Some(keyboard),
        }
    }

    pub fn build(&self, kind: &AgentKind) -> Result<Box<dyn Agent>> {
        let agent: Box<dyn Agent> = match kind {
            AgentKind::Random => Box::new(RandomAgent::new()),
            AgentKind::Builtin { difficulty } => Box::new(BuiltinAgent::new(*difficulty)),
            AgentKind::Custom { executable, args } => {
                Box::new(ExternalAgent::new(executable.clone(), args.clone()))
            }
            AgentKind::Human { keys } => {
                let keyboard = self.keyboard.as_ref().ok_or_else(|| {
                    ArenaError::Config("human players need an interactive terminal".into())
                })?;
                Box::new(HumanAgent::from_bindings(keys, keyboard.subscribe())?)
            }
        };
        Ok(agent)
    }
}
