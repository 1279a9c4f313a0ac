//! Keyboard-driven players
//!
//! The engine samples input once per frame through `InputPoller`. A key
//! only counts while a decision is outstanding, so presses between turns
//! are dropped.

use async_trait::async_trait;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::agent::{Agent, InputPoller, ReplyHandle};
use crate::core::error::{ArenaError, Result};
use crate::simulation::state::PlayerState;
use crate::spatial::Direction;

/// How often a pending decision checks for a key
const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Keys remembered for subscribers that poll less often than others
const KEY_LOG_CAPACITY: usize = 64;

/// Source of key presses, by lowercase key name
pub trait InputSource: Send + Sync {
    /// Keys pressed since the previous call
    fn pressed_keys(&self) -> Vec<String>;
}

impl<T: InputSource + ?Sized> InputSource for Arc<T> {
    fn pressed_keys(&self) -> Vec<String> {
        (**self).pressed_keys()
    }
}

/// Shared terminal keyboard
///
/// Crossterm has a single event queue, so every human player subscribes to
/// one hub and sees every key press.
#[derive(Debug, Default)]
pub struct TerminalInput {
    log: Mutex<KeyLog>,
}

#[derive(Debug, Default)]
struct KeyLog {
    next_seq: u64,
    recent: VecDeque<(u64, String)>,
}

impl KeyLog {
    fn push(&mut self, key: String) {
        self.recent.push_back((self.next_seq, key));
        self.next_seq += 1;
        while self.recent.len() > KEY_LOG_CAPACITY {
            self.recent.pop_front();
        }
    }
}

impl TerminalInput {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn subscribe(self: &Arc<Self>) -> Box<dyn InputSource> {
        let cursor = self.log.lock().map(|log| log.next_seq).unwrap_or(0);
        Box::new(TerminalSubscriber {
            hub: Arc::clone(self),
            cursor: AtomicU64::new(cursor),
        })
    }

    /// Move queued terminal key presses into the log without blocking
    fn drain_events(log: &mut KeyLog) {
        while let Ok(true) = event::poll(Duration::ZERO) {
            match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    if let Some(name) = key_name(key.code) {
                        log.push(name);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "failed to read terminal input");
                    break;
                }
            }
        }
    }
}

struct TerminalSubscriber {
    hub: Arc<TerminalInput>,
    cursor: AtomicU64,
}

impl InputSource for TerminalSubscriber {
    fn pressed_keys(&self) -> Vec<String> {
        let Ok(mut log) = self.hub.log.lock() else {
            return Vec::new();
        };
        TerminalInput::drain_events(&mut log);

        let cursor = self.cursor.load(Ordering::Relaxed);
        let keys = log
            .recent
            .iter()
            .filter(|(seq, _)| *seq >= cursor)
            .map(|(_, key)| key.clone())
            .collect();
        self.cursor.store(log.next_seq, Ordering::Relaxed);
        keys
    }
}

/// Name used in key bindings for a terminal key
pub fn key_name(code: KeyCode) -> Option<String> {
    let name = match code {
        KeyCode::Char(' ') => "space".into(),
        KeyCode::Char(c) => c.to_lowercase().to_string(),
        KeyCode::Up => "up".into(),
        KeyCode::Down => "down".into(),
        KeyCode::Left => "left".into(),
        KeyCode::Right => "right".into(),
        KeyCode::Enter => "enter".into(),
        KeyCode::Esc => "esc".into(),
        KeyCode::Tab => "tab".into(),
        KeyCode::Backspace => "backspace".into(),
        KeyCode::F(n) => format!("f{n}"),
        _ => return None,
    };
    Some(name)
}

/// Keys fed by hand; used for tests and scripted play
#[derive(Debug, Default)]
pub struct ScriptedInput {
    keys: Mutex<VecDeque<String>>,
}

impl ScriptedInput {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn press(&self, key: &str) {
        if let Ok(mut keys) = self.keys.lock() {
            keys.push_back(key.to_lowercase());
        }
    }
}

impl InputSource for ScriptedInput {
    fn pressed_keys(&self) -> Vec<String> {
        self.keys
            .lock()
            .map(|mut keys| keys.drain(..).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Default)]
struct KeyState {
    /// A decision is waiting for input
    armed: bool,
    latest: Option<Direction>,
}

struct KeyPoller {
    source: Box<dyn InputSource>,
    bindings: Vec<(String, Direction)>,
    state: Arc<Mutex<KeyState>>,
}

impl InputPoller for KeyPoller {
    fn poll_input(&self) {
        for key in self.source.pressed_keys() {
            let Some((_, direction)) = self.bindings.iter().find(|(bound, _)| *bound == key) else {
                continue;
            };
            if let Ok(mut state) = self.state.lock() {
                if state.armed {
                    state.latest = Some(*direction);
                }
            }
        }
    }
}

pub struct HumanAgent {
    poller: Arc<KeyPoller>,
}

impl HumanAgent {
    /// `keys` maps direction names to key names, as in the config file
    pub fn from_bindings(keys: &BTreeMap<String, String>, source: Box<dyn InputSource>) -> Result<Self> {
        let mut bindings = Vec::with_capacity(keys.len());
        for (direction, key) in keys {
            let parsed = Direction::parse(direction);
            if parsed.is_none() {
                return Err(ArenaError::Config(format!("unknown direction '{direction}' in key bindings")));
            }
            bindings.push((key.to_lowercase(), parsed));
        }

        Ok(Self {
            poller: Arc::new(KeyPoller {
                source,
                bindings,
                state: Arc::new(Mutex::new(KeyState::default())),
            }),
        })
    }
}

#[async_trait]
impl Agent for HumanAgent {
    fn kind(&self) -> &'static str {
        "human"
    }

    async fn decide(&mut self, _state: PlayerState, scope: CancellationToken) -> Result<ReplyHandle> {
        let state = Arc::clone(&self.poller.state);
        if let Ok(mut keys) = state.lock() {
            keys.armed = true;
            keys.latest = None;
        }

        let (sender, handle) = ReplyHandle::channel();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(INPUT_POLL_INTERVAL);
            let pressed = loop {
                tokio::select! {
                    _ = scope.cancelled() => break None,
                    _ = ticker.tick() => {
                        let taken = state.lock().ok().and_then(|mut keys| keys.latest.take());
                        if taken.is_some() {
                            break taken;
                        }
                    }
                }
            };

            if let Ok(mut keys) = state.lock() {
                keys.armed = false;
            }
            if let Some(direction) = pressed {
                sender.send(direction);
            }
        });

        Ok(handle)
    }

    fn input_poller(&self) -> Option<Arc<dyn InputPoller>> {
        Some(self.poller.clone())
    }
}
