//! A registered player: its facts plus the agent behind it

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::agent::{Agent, InputPoller};
use crate::core::types::PlayerId;
use crate::simulation::state::PlayerInfo;

/// Agent shared between the engine and per-turn tasks
pub type SharedAgent = Arc<Mutex<Box<dyn Agent>>>;

pub struct PlayerSlot {
    pub info: PlayerInfo,
    pub agent: SharedAgent,
    /// Agent label for logs and summaries
    pub kind: &'static str,
    /// Input capability, captured once at registration
    pub poller: Option<Arc<dyn InputPoller>>,
    errored: AtomicBool,
}

impl PlayerSlot {
    pub fn new(info: PlayerInfo, agent: Box<dyn Agent>) -> Self {
        let poller = agent.input_poller();
        Self {
            info,
            kind: agent.kind(),
            agent: Arc::new(Mutex::new(agent)),
            poller,
            errored: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> PlayerId {
        self.info.id
    }

    /// Agents that failed to start are never asked for a move
    pub fn is_errored(&self) -> bool {
        self.errored.load(Ordering::SeqCst)
    }

    pub fn mark_errored(&self) {
        self.errored.store(true, Ordering::SeqCst);
    }
}
