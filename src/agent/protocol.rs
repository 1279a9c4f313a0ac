//! Line protocol spoken with external agent processes
//!
//! Session init, sent once before the first turn:
//!
//! ```text
//! <width> <height>
//! <food lifetime> <food value>
//! <number of players> <your id>
//! <max turns> <timeout ms, -1 for none>
//! ```
//!
//! Every turn:
//!
//! ```text
//! <food count>
//! <lifetime> <x> <y>                  (one line per item)
//! <id> <kills> <deaths> <len> <x y>*  (one line per snake)
//! ```
//!
//! Coordinates use a bottom-left origin. The reply is one line holding a
//! direction token.

use std::fmt::Write;

use crate::simulation::state::PlayerState;
use crate::spatial::Direction;

/// Header describing the session
pub fn encode_init(state: &PlayerState) -> String {
    let board = &state.board;
    let timeout_ms = state
        .info()
        .and_then(|info| info.deadline)
        .map_or(-1, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX));

    format!(
        "{} {}\n{} {}\n{} {}\n{} {}\n",
        board.width,
        board.height,
        board.food.lifetime,
        board.food.value,
        state.players.len(),
        state.id,
        board.max_turns,
        timeout_ms
    )
}

/// Food and snakes for one turn
pub fn encode_turn(state: &PlayerState) -> String {
    let height = state.board.height;
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(out, "{}", state.food.len());
    for (point, lifetime) in &state.food {
        let p = point.flip_y(height);
        let _ = writeln!(out, "{} {} {}", lifetime, p.x, p.y);
    }

    for (id, snake) in &state.snakes {
        let score = snake.score();
        let _ = write!(out, "{} {} {} {}", id, score.kills, score.deaths, snake.len());
        for cell in snake.body() {
            let p = cell.flip_y(height);
            let _ = write!(out, " {} {}", p.x, p.y);
        }
        out.push('\n');
    }

    out
}

/// Interpret a reply line
pub fn parse_reply(line: &str) -> Direction {
    Direction::parse(line)
}
