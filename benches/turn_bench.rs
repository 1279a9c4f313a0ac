use ahash::AHashSet;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::collections::BTreeMap;
use std::time::Duration;

use snake_arena::agent::pathfinding::find_path;
use snake_arena::agent::{Agent, BuiltinAgent};
use snake_arena::core::config::{BoardConfig, Difficulty, FoodConfig};
use snake_arena::core::types::PlayerId;
use snake_arena::simulation::{PlayerInfo, SnakeGame};
use snake_arena::spatial::{Bounds, GridPoint};

const PLAYERS: u32 = 8;

fn game() -> SnakeGame {
    let board = BoardConfig {
        width: 64,
        height: 64,
        max_turns: u32::MAX,
        respawn_time: 5,
        initial_length: 8,
        food: FoodConfig {
            count: 16,
            lifetime: 100,
            value: 5,
        },
    };
    let players = (0..PLAYERS)
        .map(|i| PlayerInfo {
            id: PlayerId(i),
            name: format!("bot{i}"),
            silent: true,
            wait_for: true,
            deadline: None,
        })
        .collect();
    let mut game = SnakeGame::new(board, players);
    game.reset(0xBEEF);
    game
}

fn bench_apply_turn(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_turn");
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("hard_bots_64x64", |b| {
        b.iter_batched(
            || {
                let game = game();
                let agents: Vec<BuiltinAgent> = (0..PLAYERS)
                    .map(|i| {
                        let mut agent = BuiltinAgent::new(Difficulty::Hard);
                        agent.seed_rng(game.player_rng(PlayerId(i)));
                        agent
                    })
                    .collect();
                (game, agents)
            },
            |(mut game, mut agents)| {
                for _ in 0..32 {
                    let mut actions = BTreeMap::new();
                    for (i, agent) in agents.iter_mut().enumerate() {
                        let id = PlayerId(i as u32);
                        if let Ok(state) = game.snapshot(id) {
                            actions.insert(id, agent.choose_move(&state));
                        }
                    }
                    black_box(game.apply_turn(&actions).ok());
                }
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

fn bench_pathfinding(c: &mut Criterion) {
    let bounds = Bounds::new(64, 64);
    // A comb of walls with alternating gaps forces long detours
    let mut walls = AHashSet::new();
    for x in (4..60).step_by(4) {
        let gap = if (x / 4) % 2 == 0 { 0 } else { 63 };
        for y in 0..64 {
            if y != gap {
                walls.insert(GridPoint::new(x, y));
            }
        }
    }

    c.bench_function("find_path_comb_64x64", |b| {
        b.iter(|| {
            find_path(
                black_box(bounds),
                &walls,
                GridPoint::new(0, 32),
                GridPoint::new(63, 32),
            )
        })
    });
}

criterion_group!(benches, bench_apply_turn, bench_pathfinding);
criterion_main!(benches);
