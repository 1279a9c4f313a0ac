//! End-to-end scenarios for the simulation state machine

use std::collections::BTreeMap;
use std::time::Duration;

use snake_arena::core::config::{BoardConfig, FoodConfig};
use snake_arena::core::types::PlayerId;
use snake_arena::simulation::*;
use snake_arena::spatial::{Direction, GridPoint};

fn board(width: i32, height: i32, food: FoodConfig) -> BoardConfig {
    BoardConfig {
        width,
        height,
        max_turns: 100,
        respawn_time: 10,
        initial_length: 5,
        food,
    }
}

fn no_food() -> FoodConfig {
    FoodConfig {
        count: 0,
        lifetime: 0,
        value: 5,
    }
}

fn players(n: u32) -> Vec<PlayerInfo> {
    (0..n)
        .map(|i| PlayerInfo {
            id: PlayerId(i),
            name: format!("player{i}"),
            silent: true,
            wait_for: false,
            deadline: Some(Duration::from_millis(100)),
        })
        .collect()
}

/// A reset game with the random placement cleared away
fn empty_game(board: BoardConfig, n: u32) -> SnakeGame {
    let mut game = SnakeGame::new(board, players(n));
    game.reset(11);
    game.world_mut().food.clear();
    game
}

fn place(game: &mut SnakeGame, id: u32, cells: &[(i32, i32)], target: u32, direction: Direction) {
    let body = cells.iter().map(|&(x, y)| GridPoint::new(x, y)).collect();
    game.world_mut()
        .snakes
        .insert(PlayerId(id), Snake::with_body(body, target, direction));
}

fn moves(list: &[(u32, Direction)]) -> BTreeMap<PlayerId, Direction> {
    list.iter().map(|&(id, d)| (PlayerId(id), d)).collect()
}

#[test]
fn test_eating_fresh_food_grows_target_length() {
    let food = FoodConfig {
        count: 1,
        lifetime: 0,
        value: 5,
    };
    let mut game = empty_game(board(32, 32, food), 1);
    place(&mut game, 0, &[(10, 10)], 5, Direction::East);
    game.world_mut().insert_food(GridPoint::new(11, 10), 0);

    let outcome = game.apply_turn(&moves(&[(0, Direction::East)])).unwrap();

    let snake = game.world().snake(PlayerId(0)).unwrap();
    assert_eq!(snake.head(), Some(GridPoint::new(11, 10)));
    assert_eq!(snake.target_length(), 10);
    assert!(!game.world().food.contains_key(&GridPoint::new(11, 10)));
    assert_eq!(
        outcome.meals,
        vec![Meal {
            player: PlayerId(0),
            point: GridPoint::new(11, 10),
            value: 5
        }]
    );
    // The eaten item is replaced somewhere else
    assert_eq!(game.world().food.len(), 1);
}

#[test]
fn test_reversal_continues_straight() {
    let mut game = empty_game(board(32, 32, no_food()), 1);
    place(&mut game, 0, &[(5, 5), (5, 6)], 2, Direction::North);

    game.apply_turn(&moves(&[(0, Direction::South)])).unwrap();

    let snake = game.world().snake(PlayerId(0)).unwrap();
    assert_eq!(snake.head(), Some(GridPoint::new(5, 4)));
    assert_eq!(snake.direction(), Direction::North);
}

#[test]
fn test_missing_action_keeps_heading() {
    let mut game = empty_game(board(32, 32, no_food()), 1);
    place(&mut game, 0, &[(5, 5), (4, 5)], 2, Direction::East);

    game.apply_turn(&BTreeMap::new()).unwrap();

    let snake = game.world().snake(PlayerId(0)).unwrap();
    assert_eq!(snake.head(), Some(GridPoint::new(6, 5)));
    assert_eq!(snake.direction(), Direction::East);
}

#[test]
fn test_head_on_collision_kills_both() {
    let mut game = empty_game(board(32, 32, no_food()), 2);
    place(&mut game, 0, &[(4, 5), (3, 5)], 2, Direction::East);
    place(&mut game, 1, &[(6, 5), (7, 5)], 2, Direction::West);

    let outcome = game.apply_turn(&moves(&[(0, Direction::East), (1, Direction::West)])).unwrap();

    assert_eq!(
        outcome.deaths,
        vec![
            Death {
                player: PlayerId(0),
                cause: DeathCause::Collision { with: PlayerId(1) }
            },
            Death {
                player: PlayerId(1),
                cause: DeathCause::Collision { with: PlayerId(0) }
            },
        ]
    );
    for id in [PlayerId(0), PlayerId(1)] {
        let score = game.world().snake(id).unwrap().score();
        assert_eq!((score.kills, score.deaths, score.suicides), (1, 1, 0));
    }
}

#[test]
fn test_dying_snake_still_blocks_others() {
    let mut game = empty_game(board(32, 32, no_food()), 2);
    // Player 0 runs into the wall while player 1 runs into player 0's tail
    place(&mut game, 0, &[(0, 3), (0, 4), (0, 5)], 3, Direction::North);
    place(&mut game, 1, &[(1, 4), (2, 4)], 2, Direction::West);

    let outcome = game
        .apply_turn(&moves(&[(0, Direction::West), (1, Direction::West)]))
        .unwrap();

    let causes: BTreeMap<PlayerId, DeathCause> =
        outcome.deaths.iter().map(|d| (d.player, d.cause)).collect();
    assert_eq!(causes[&PlayerId(0)], DeathCause::Wall);
    assert_eq!(causes[&PlayerId(1)], DeathCause::Collision { with: PlayerId(0) });
    assert_eq!(game.world().snake(PlayerId(0)).unwrap().score().kills, 1);
}

#[test]
fn test_running_into_own_body_is_a_suicide() {
    let mut game = empty_game(board(32, 32, no_food()), 1);
    // Curled so that turning south lands on the body
    place(
        &mut game,
        0,
        &[(5, 5), (6, 5), (6, 6), (5, 6), (4, 6)],
        5,
        Direction::West,
    );

    let outcome = game.apply_turn(&moves(&[(0, Direction::South)])).unwrap();

    assert_eq!(
        outcome.deaths,
        vec![Death {
            player: PlayerId(0),
            cause: DeathCause::Suicide
        }]
    );
    let score = game.world().snake(PlayerId(0)).unwrap().score();
    assert_eq!((score.deaths, score.suicides), (1, 1));
}

#[test]
fn test_food_tie_goes_to_lower_id() {
    let food = FoodConfig {
        count: 0,
        lifetime: 0,
        value: 3,
    };
    let mut game = empty_game(board(32, 32, food), 2);
    place(&mut game, 0, &[(4, 5)], 1, Direction::East);
    place(&mut game, 1, &[(6, 5)], 1, Direction::West);
    game.world_mut().insert_food(GridPoint::new(5, 5), 0);

    let outcome = game.apply_turn(&moves(&[(0, Direction::East), (1, Direction::West)])).unwrap();

    assert_eq!(outcome.meals.len(), 1);
    assert_eq!(outcome.meals[0].player, PlayerId(0));
    assert!(game.world().food.is_empty());
}

#[test]
fn test_food_rots_and_disappears() {
    let food = FoodConfig {
        count: 0,
        lifetime: 10,
        value: 5,
    };
    let mut game = empty_game(board(32, 32, food), 1);
    place(&mut game, 0, &[(20, 20)], 1, Direction::East);
    game.world_mut().insert_food(GridPoint::new(2, 2), 1);
    game.world_mut().insert_food(GridPoint::new(3, 3), 6);

    game.apply_turn(&BTreeMap::new()).unwrap();

    let food = &game.world().food;
    assert!(!food.contains_key(&GridPoint::new(2, 2)));
    assert_eq!(food.get(&GridPoint::new(3, 3)), Some(&5));
}

#[test]
fn test_rotten_food_starves_a_short_snake() {
    let food = FoodConfig {
        count: 0,
        lifetime: 10,
        value: 5,
    };
    let mut game = empty_game(board(32, 32, food), 1);
    place(&mut game, 0, &[(4, 4)], 2, Direction::East);
    // One turn left: worth -4
    game.world_mut().insert_food(GridPoint::new(5, 4), 1);

    let outcome = game.apply_turn(&moves(&[(0, Direction::East)])).unwrap();

    assert_eq!(outcome.meals[0].value, -4);
    assert_eq!(
        outcome.deaths,
        vec![Death {
            player: PlayerId(0),
            cause: DeathCause::Starved
        }]
    );
}

#[test]
fn test_dead_snake_waits_out_respawn_time() {
    let mut config = board(32, 32, no_food());
    config.respawn_time = 3;
    let mut game = SnakeGame::new(config, players(1));
    game.reset(4);
    let start = game.world().snake(PlayerId(0)).unwrap().head().unwrap();

    // Steer into the nearest wall; a fresh snake with no heading goes north
    let mut turns_alive = 0;
    while game.should_receive_turn_state(PlayerId(0)) {
        game.apply_turn(&BTreeMap::new()).unwrap();
        turns_alive += 1;
    }
    assert_eq!(turns_alive, start.y + 1);

    // Counter started at 3 on spawn and ticks once per dead turn
    let mut waited = 0;
    while !game.should_receive_turn_state(PlayerId(0)) {
        game.apply_turn(&BTreeMap::new()).unwrap();
        waited += 1;
        assert!(waited <= 5, "snake never respawned");
    }
    let snake = game.world().snake(PlayerId(0)).unwrap();
    assert_eq!(snake.len(), 1);
    assert_eq!(snake.score().deaths, 1);
}

#[test]
fn test_full_board_keeps_snakes_waiting() {
    let mut game = SnakeGame::new(board(1, 1, no_food()), players(2));
    game.reset(9);

    let alive = [PlayerId(0), PlayerId(1)]
        .iter()
        .filter(|id| game.should_receive_turn_state(**id))
        .count();
    assert_eq!(alive, 1);

    for _ in 0..20 {
        game.apply_turn(&BTreeMap::new()).unwrap();
        let live = game.world().living().count();
        assert!(live <= 1);
    }
}

#[test]
fn test_same_seed_same_game() {
    let food = FoodConfig {
        count: 3,
        lifetime: 20,
        value: 4,
    };
    let play = || {
        let mut game = SnakeGame::new(board(12, 12, food), players(3));
        game.reset(2024);
        let turns = [Direction::East, Direction::South, Direction::West, Direction::North];
        for turn in 0..40 {
            let direction = turns[(turn / 3) % 4];
            let actions = (0..3).map(|i| (PlayerId(i), direction)).collect();
            game.apply_turn(&actions).unwrap();
        }
        (game.world().snakes.clone(), game.world().food.clone())
    };

    assert_eq!(play(), play());
}
