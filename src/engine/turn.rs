//! One turn cycle: fan out, wait, collect, apply
//!
//! Every eligible player gets its own task that snapshots the world, asks
//! the agent, and races the reply against the player's deadline. A floor
//! task keeps the cycle from finishing before the nominal turn duration.
//! Once every task has finished the collected moves are applied in one go.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::agent::ReplyHandle;
use crate::core::error::{ArenaError, Result};
use crate::core::types::PlayerId;
use crate::engine::control::SharedGame;
use crate::engine::player::{PlayerSlot, SharedAgent};
use crate::simulation::game::TurnOutcome;
use crate::simulation::state::PlayerState;
use crate::spatial::Direction;

/// What one turn cycle produced
#[derive(Debug, Clone)]
pub struct TurnReport {
    pub outcome: TurnOutcome,
    /// Moves handed to the simulation
    pub actions: BTreeMap<PlayerId, Direction>,
    /// Players asked for a move that did not deliver one
    pub missed: Vec<PlayerId>,
    pub elapsed: Duration,
}

struct PlayerReply {
    player: PlayerId,
    result: Result<Direction>,
}

/// Runs turn cycles against a shared game
pub struct TurnRunner {
    game: SharedGame,
    players: Arc<Vec<PlayerSlot>>,
    turn_duration: Duration,
}

impl TurnRunner {
    pub fn new(game: SharedGame, players: Arc<Vec<PlayerSlot>>, turn_duration: Duration) -> Self {
        Self {
            game,
            players,
            turn_duration,
        }
    }

    /// Run one full cycle inside `run_scope`
    ///
    /// Agent failures only cost that player its move. An error from the
    /// simulation itself is returned and ends the run.
    pub async fn run(&self, run_scope: &CancellationToken) -> Result<TurnReport> {
        let started = Instant::now();
        let turn_scope = run_scope.child_token();

        let mut replies = JoinSet::new();
        for slot in self.players.iter().filter(|s| !s.is_errored()) {
            replies.spawn(collect_reply(
                slot.id(),
                slot.info.deadline,
                Arc::clone(&slot.agent),
                Arc::clone(&self.game),
                turn_scope.child_token(),
            ));
        }
        let floor = tokio::spawn(turn_floor(self.turn_duration, turn_scope.clone()));

        let mut actions = BTreeMap::new();
        let mut missed = Vec::new();
        while let Some(joined) = replies.join_next().await {
            match joined {
                Ok(Some(PlayerReply { player, result: Ok(direction) })) => {
                    actions.insert(player, direction);
                }
                Ok(Some(PlayerReply { player, result: Err(e) })) => {
                    if matches!(e, ArenaError::Timeout) {
                        tracing::debug!(%player, "no reply before the deadline");
                    } else {
                        tracing::warn!(%player, error = %e, "agent failed to decide");
                    }
                    missed.push(player);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "decision task failed"),
            }
        }
        if let Err(e) = floor.await {
            tracing::warn!(error = %e, "turn floor task failed");
        }
        turn_scope.cancel();

        let outcome = {
            let mut game = self.game.lock().await;
            game.apply_turn(&actions)?
        };

        let elapsed = started.elapsed();
        tracing::debug!(
            turn = outcome.turn,
            moves = actions.len(),
            missed = missed.len(),
            deaths = outcome.deaths.len(),
            ?elapsed,
            "turn applied"
        );

        Ok(TurnReport {
            outcome,
            actions,
            missed,
            elapsed,
        })
    }
}

/// Ask one agent for its move; `None` if the player sits this turn out
async fn collect_reply(
    player: PlayerId,
    deadline: Option<Duration>,
    agent: SharedAgent,
    game: SharedGame,
    scope: CancellationToken,
) -> Option<PlayerReply> {
    let state = {
        let game = game.lock().await;
        if !game.should_receive_turn_state(player) {
            return None;
        }
        game.snapshot(player)
    };

    // The deadline covers handing over the state as well as the reply
    let asked = Instant::now();
    let result = match state {
        Ok(state) => match send_state(&agent, state, deadline, &scope).await {
            Ok(mut handle) => {
                let remaining = deadline.map(|limit| limit.saturating_sub(asked.elapsed()));
                await_reply(&mut handle, remaining, &scope).await
            }
            Err(e) => Err(e),
        },
        Err(e) => Err(e),
    };

    // Whatever the agent is still doing for this turn is no longer wanted
    scope.cancel();
    Some(PlayerReply { player, result })
}

/// Give the agent its state, within the deadline if there is one
async fn send_state(
    agent: &SharedAgent,
    state: PlayerState,
    deadline: Option<Duration>,
    scope: &CancellationToken,
) -> Result<ReplyHandle> {
    let decide = async { agent.lock().await.decide(state, scope.clone()).await };
    match deadline {
        Some(limit) => tokio::time::timeout(limit, decide)
            .await
            .unwrap_or(Err(ArenaError::Timeout)),
        None => decide.await,
    }
}

/// Race a reply against the deadline
///
/// A reply that is already there when the deadline fires still counts.
pub async fn await_reply(
    handle: &mut ReplyHandle,
    deadline: Option<Duration>,
    scope: &CancellationToken,
) -> Result<Direction> {
    let received = match deadline {
        Some(limit) => {
            tokio::select! {
                biased;
                reply = handle.recv() => Some(reply),
                _ = tokio::time::sleep(limit) => None,
                _ = scope.cancelled() => None,
            }
        }
        None => {
            tokio::select! {
                biased;
                reply = handle.recv() => Some(reply),
                _ = scope.cancelled() => None,
            }
        }
    };

    match received {
        Some(Some(direction)) => Ok(direction),
        Some(None) => Err(ArenaError::Decision("agent dropped its reply".into())),
        None => handle.try_recv().ok_or(ArenaError::Timeout),
    }
}

async fn turn_floor(duration: Duration, scope: CancellationToken) {
    if duration.is_zero() {
        return;
    }
    tokio::select! {
        _ = tokio::time::sleep(duration) => {}
        _ = scope.cancelled() => {}
    }
}
