//! Agents running as child processes
//!
//! The process reads turns on stdin and answers on stdout, one line per
//! turn. Anything it writes to stderr becomes chat.

use async_trait::async_trait;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::agent::protocol::{encode_init, encode_turn, parse_reply};
use crate::agent::{Agent, ChatStream, ReplyHandle, ReplySender};
use crate::core::error::{ArenaError, Result};
use crate::simulation::state::PlayerState;

/// Bookkeeping for the replies the process still owes
#[derive(Debug, Default)]
struct ReplySlot {
    /// Bumped for every turn sent
    turn: u64,
    /// Waiting receiver for `turn`
    sender: Option<ReplySender>,
    /// The state for `turn` was written in full
    written: bool,
    /// Replies to abandoned turns still to come; skipped when they arrive
    owed: u32,
}

impl ReplySlot {
    /// The receiver for the line just read, if it belongs to the current turn
    fn claim(&mut self) -> Option<ReplySender> {
        if self.owed > 0 {
            self.owed -= 1;
            return None;
        }
        self.sender.take()
    }
}

type PendingReply = Arc<Mutex<ReplySlot>>;

pub struct ExternalAgent {
    executable: String,
    args: Vec<String>,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    pending: PendingReply,
    exited: Arc<AtomicBool>,
    chat_tx: mpsc::UnboundedSender<String>,
    chat_rx: Option<ChatStream>,
    initialized: bool,
    tasks: Vec<JoinHandle<()>>,
}

impl ExternalAgent {
    pub fn new(executable: String, args: Vec<String>) -> Self {
        let (chat_tx, chat_rx) = mpsc::unbounded_channel();
        Self {
            executable,
            args,
            child: None,
            stdin: None,
            pending: Arc::new(Mutex::new(ReplySlot::default())),
            exited: Arc::new(AtomicBool::new(false)),
            chat_tx,
            chat_rx: Some(chat_rx),
            initialized: false,
            tasks: Vec::new(),
        }
    }

    fn clear_pending(&self) {
        if let Ok(mut slot) = self.pending.lock() {
            slot.sender = None;
            slot.written = false;
            slot.owed = 0;
        }
    }
}

#[async_trait]
impl Agent for ExternalAgent {
    fn kind(&self) -> &'static str {
        "external"
    }

    async fn start(&mut self, scope: CancellationToken) -> Result<()> {
        self.initialized = false;
        self.exited.store(false, Ordering::SeqCst);

        let mut child = Command::new(&self.executable)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let missing = |stream: &str| ArenaError::Decision(format!("agent {stream} was not captured"));
        let stdout = child.stdout.take().ok_or_else(|| missing("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| missing("stderr"))?;
        self.stdin = Some(child.stdin.take().ok_or_else(|| missing("stdin"))?);

        tracing::debug!(executable = %self.executable, pid = ?child.id(), "agent process started");

        self.tasks.push(tokio::spawn(read_replies(
            stdout,
            self.pending.clone(),
            self.exited.clone(),
            scope.clone(),
        )));
        self.tasks
            .push(tokio::spawn(forward_stderr(stderr, self.chat_tx.clone(), scope)));
        self.child = Some(child);

        Ok(())
    }

    async fn decide(&mut self, state: PlayerState, scope: CancellationToken) -> Result<ReplyHandle> {
        if self.exited.load(Ordering::SeqCst) {
            return Err(ArenaError::Decision("agent process has exited".into()));
        }
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(ArenaError::Decision("agent process is not running".into()));
        };

        let mut message = String::new();
        if !self.initialized {
            message.push_str(&encode_init(&state));
        }
        message.push_str(&encode_turn(&state));

        // Installed before writing so an instant reply has somewhere to go
        let (sender, handle) = ReplyHandle::channel();
        let turn = match self.pending.lock() {
            Ok(mut slot) => {
                slot.turn += 1;
                slot.sender = Some(sender);
                slot.written = false;
                slot.turn
            }
            Err(_) => return Err(ArenaError::Decision("reply bookkeeping is poisoned".into())),
        };
        tokio::spawn(abandon_on_cancel(self.pending.clone(), turn, scope.clone()));
        if self.exited.load(Ordering::SeqCst) {
            return Err(ArenaError::Decision("agent process has exited".into()));
        }

        let write = async {
            stdin.write_all(message.as_bytes()).await?;
            stdin.flush().await
        };
        tokio::select! {
            result = write => {
                result.map_err(|e| ArenaError::Decision(format!("failed to write turn to agent: {e}")))?;
            }
            _ = scope.cancelled() => return Err(ArenaError::Timeout),
        }

        if let Ok(mut slot) = self.pending.lock() {
            if slot.turn == turn {
                slot.written = true;
            }
        }
        self.initialized = true;
        Ok(handle)
    }

    async fn stop(&mut self, scope: CancellationToken) -> Result<()> {
        // Closing stdin asks the process to exit
        drop(self.stdin.take());

        let result = match self.child.take() {
            Some(mut child) => {
                let exited = tokio::select! {
                    status = child.wait() => Some(status),
                    _ = scope.cancelled() => None,
                };
                match exited {
                    Some(status) => status.map(|status| {
                        tracing::debug!(executable = %self.executable, %status, "agent process exited");
                    }),
                    None => {
                        tracing::warn!(executable = %self.executable, "agent process did not exit in time, killing");
                        child.kill().await
                    }
                }
            }
            None => Ok(()),
        };

        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.clear_pending();

        result.map_err(ArenaError::from)
    }

    fn chat(&mut self) -> Option<ChatStream> {
        self.chat_rx.take()
    }
}

/// Hand each stdout line to whichever turn is waiting
async fn read_replies(
    stdout: ChildStdout,
    pending: PendingReply,
    exited: Arc<AtomicBool>,
    scope: CancellationToken,
) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        let line = tokio::select! {
            _ = scope.cancelled() => break,
            line = lines.next_line() => line,
        };
        match line {
            Ok(Some(line)) => {
                let sender = pending.lock().ok().and_then(|mut slot| slot.claim());
                match sender {
                    Some(sender) => {
                        sender.send(parse_reply(&line));
                    }
                    None => tracing::debug!(%line, "discarding reply nobody is waiting for"),
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read from agent");
                break;
            }
        }
    }

    exited.store(true, Ordering::SeqCst);
    // Dropping the sender wakes a turn still waiting on us
    if let Ok(mut slot) = pending.lock() {
        slot.sender.take();
    }
}

/// Once a turn is given up on, its reply is late whenever it comes
async fn abandon_on_cancel(pending: PendingReply, turn: u64, scope: CancellationToken) {
    scope.cancelled().await;
    let Ok(mut slot) = pending.lock() else {
        return;
    };
    if slot.turn != turn {
        return;
    }
    // A state that never fully arrived will not be answered
    if slot.sender.take().is_some() && slot.written {
        slot.owed += 1;
    }
}

async fn forward_stderr(stderr: ChildStderr, chat: mpsc::UnboundedSender<String>, scope: CancellationToken) {
    let mut lines = BufReader::new(stderr).lines();
    loop {
        let line = tokio::select! {
            _ = scope.cancelled() => break,
            line = lines.next_line() => line,
        };
        match line {
            // Keep draining even when nobody listens
            Ok(Some(line)) => {
                let _ = chat.send(line);
            }
            Ok(None) | Err(_) => break,
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::core::config::{BoardConfig, FoodConfig};
    use crate::core::types::PlayerId;
    use crate::simulation::snake::Snake;
    use crate::spatial::{Direction, GridPoint};
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn state() -> PlayerState {
        let mut snakes = BTreeMap::new();
        snakes.insert(
            PlayerId(0),
            Snake::with_body(vec![GridPoint::new(1, 1)], 3, Direction::North),
        );
        PlayerState {
            id: PlayerId(0),
            turn: 0,
            board: BoardConfig {
                width: 5,
                height: 5,
                max_turns: 10,
                respawn_time: 1,
                initial_length: 3,
                food: FoodConfig::default(),
            },
            players: Vec::new(),
            snakes,
            food: BTreeMap::new(),
        }
    }

    fn shell(script: &str) -> ExternalAgent {
        ExternalAgent::new("sh".into(), vec!["-c".into(), script.into()])
    }

    #[tokio::test]
    async fn test_reply_and_chat() {
        let scope = CancellationToken::new();
        let mut agent = shell("echo hello >&2; while read line; do echo east; done");
        let mut chat = agent.chat().unwrap();
        agent.start(scope.clone()).await.unwrap();

        let mut handle = agent.decide(state(), scope.child_token()).await.unwrap();
        let reply = tokio::time::timeout(Duration::from_secs(5), handle.recv()).await.unwrap();
        assert_eq!(reply, Some(Direction::East));

        let said = tokio::time::timeout(Duration::from_secs(5), chat.recv()).await.unwrap();
        assert_eq!(said.as_deref(), Some("hello"));

        agent.stop(CancellationToken::new()).await.unwrap();
    }

    #[tokio::test]
    async fn test_exited_process_fails_decide() {
        let scope = CancellationToken::new();
        let mut agent = shell("exit 0");
        agent.start(scope.clone()).await.unwrap();

        // The reader notices EOF and drops any pending reply
        let mut handle = match agent.decide(state(), scope.child_token()).await {
            Ok(handle) => handle,
            Err(e) => {
                assert!(e.is_transient());
                return;
            }
        };
        let reply = tokio::time::timeout(Duration::from_secs(5), handle.recv()).await.unwrap();
        assert_eq!(reply, None);
        agent.stop(CancellationToken::new()).await.unwrap();
    }

    #[tokio::test]
    async fn test_late_reply_is_not_used_for_next_turn() {
        use crate::engine::turn::await_reply;

        let run = CancellationToken::new();
        let mut agent = shell("sleep 0.3; echo north; sleep 0.2; echo east");
        agent.start(run.clone()).await.unwrap();

        let first = run.child_token();
        let mut handle = agent.decide(state(), first.clone()).await.unwrap();
        let reply = await_reply(&mut handle, Some(Duration::from_millis(100)), &first).await;
        assert!(matches!(reply, Err(ArenaError::Timeout)));
        first.cancel();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let second = run.child_token();
        let mut handle = agent.decide(state(), second.clone()).await.unwrap();
        let reply = await_reply(&mut handle, Some(Duration::from_secs(2)), &second).await;
        assert_eq!(reply.unwrap(), Direction::East);

        agent.stop(CancellationToken::new()).await.unwrap();
    }

    #[test]
    fn test_owed_lines_are_skipped() {
        let (sender, _handle) = ReplyHandle::channel();
        let mut slot = ReplySlot {
            turn: 2,
            sender: Some(sender),
            written: true,
            owed: 1,
        };
        assert!(slot.claim().is_none());
        assert_eq!(slot.owed, 0);
        assert!(slot.claim().is_some());
        assert!(slot.claim().is_none());
    }

    #[tokio::test]
    async fn test_missing_executable_fails_to_start() {
        let mut agent = ExternalAgent::new("/nonexistent/snake-bot".into(), Vec::new());
        assert!(agent.start(CancellationToken::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_stop_kills_stubborn_process() {
        let mut agent = shell("trap '' TERM; while true; do sleep 1; done");
        agent.start(CancellationToken::new()).await.unwrap();

        let grace = CancellationToken::new();
        grace.cancel();
        assert!(agent.stop(grace).await.is_ok());
    }
}
