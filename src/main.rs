//! Snake Arena - Entry Point
//!
//! Loads a game config, runs one game to completion and prints the final
//! standings.

use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

use snake_arena::agent::{AgentFactory, InputSource, TerminalInput};
use snake_arena::core::config::{AgentKind, GameConfig};
use snake_arena::core::error::Result;
use snake_arena::engine::{Engine, EngineHandle, EngineState, RunSummary};

/// How often the keyboard is checked for pause and step keys
const CONTROL_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Snake Arena - turn-based multi-agent snake
#[derive(Parser, Debug)]
#[command(name = "snake-arena")]
#[command(about = "Run a snake game between built-in, external and human agents")]
struct Args {
    /// Path to a TOML game config
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Override the number of turns to play
    #[arg(long)]
    max_turns: Option<u32>,

    /// Override the game pace; 0 runs as fast as agents reply
    #[arg(long)]
    turns_per_second: Option<f64>,

    /// Never touch the terminal; human players are rejected
    #[arg(long)]
    headless: bool,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("snake_arena=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&args);
    let rt = Runtime::new()?;
    let summary = rt.block_on(play(config, args.headless))?;

    match args.format.as_str() {
        "text" => print_text(&summary),
        _ => println!("{}", serde_json::to_string_pretty(&summary)?),
    }

    Ok(())
}

/// Config from file, falling back to defaults, with flag overrides applied
fn load_config(args: &Args) -> GameConfig {
    let mut config = match &args.config {
        Some(path) => GameConfig::load(path).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "could not load config, using defaults");
            GameConfig::default()
        }),
        None => GameConfig::default(),
    };

    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(max_turns) = args.max_turns {
        config.max_turns = max_turns;
    }
    if let Some(tps) = args.turns_per_second {
        config.turns_per_second = tps;
    }
    config
}

async fn play(config: GameConfig, headless: bool) -> Result<RunSummary> {
    let has_humans = config
        .players
        .iter()
        .any(|p| matches!(p.agent, AgentKind::Human { .. }));
    let keyboard = (has_humans && !headless && std::io::stdin().is_terminal()).then(TerminalInput::new);

    let factory = match &keyboard {
        Some(keyboard) => AgentFactory::with_keyboard(Arc::clone(keyboard)),
        None => AgentFactory::headless(),
    };
    let engine = Engine::new(&config, &factory)?;
    let handle = engine.handle();

    let _raw_mode = match &keyboard {
        Some(keyboard) => {
            let guard = RawMode::enable()?;
            tokio::spawn(keyboard_controls(keyboard.subscribe(), handle.clone()));
            Some(guard)
        }
        None => None,
    };

    {
        let handle = handle.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupted, stopping");
                handle.stop();
            }
        });
    }

    engine.run().await
}

/// Space pauses, enter steps, escape or q quits
async fn keyboard_controls(keys: Box<dyn InputSource>, handle: EngineHandle) {
    let mut ticker = tokio::time::interval(CONTROL_POLL_INTERVAL);
    while handle.state() != EngineState::Terminated {
        ticker.tick().await;
        for key in keys.pressed_keys() {
            match key.as_str() {
                "space" => handle.toggle_pause(),
                "enter" => handle.step(),
                "esc" | "q" => handle.stop(),
                _ => {}
            }
        }
    }
}

/// Raw terminal mode for the lifetime of the guard
struct RawMode;

impl RawMode {
    fn enable() -> Result<Self> {
        crossterm::terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if let Err(e) = crossterm::terminal::disable_raw_mode() {
            tracing::warn!(error = %e, "failed to restore terminal mode");
        }
    }
}

fn print_text(summary: &RunSummary) {
    println!("=== Game Over after {} turns (seed {}) ===", summary.turns, summary.seed);
    println!(
        "{:<16} {:<9} {:>5} {:>6} {:>8} {:>7} {:>4}",
        "player", "agent", "kills", "deaths", "suicides", "length", "max"
    );
    for player in &summary.players {
        let score = &player.score;
        println!(
            "{:<16} {:<9} {:>5} {:>6} {:>8} {:>7} {:>4}",
            player.name,
            player.agent,
            score.kills,
            score.deaths,
            score.suicides,
            score.current_length,
            score.max_length
        );
    }
}
