//! Concurrent catch attempts on the same encounter.

mod common;

use common::Fixture;
use oakoak::{
    CaptureOutcome, CatchStore, EncounterGame, GameConfig, InMemoryCatalog, InMemoryCatchStore,
    InMemoryConfigStore, ManualClock, SpawnOutcome,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Barrier};

fn game(fixture: &Fixture) -> (Arc<InMemoryCatchStore>, Arc<EncounterGame>) {
    let config = GameConfig::for_testing();
    let catalog = InMemoryCatalog::load(&fixture.catalog, &fixture.sprites, 8).unwrap();
    let channels = Arc::new(InMemoryConfigStore::new(config.channel_defaults()).unwrap());
    let catches = Arc::new(InMemoryCatchStore::new());
    let game = EncounterGame::new(
        config,
        Arc::new(catalog),
        channels,
        catches.clone(),
        fixture.compositor(),
        Arc::new(ManualClock::new()),
    )
    .unwrap();
    (catches, Arc::new(game))
}

fn spawn_name(game: &EncounterGame, channel: i64, seed: u64) -> String {
    let mut rng = StdRng::seed_from_u64(seed);
    match game.on_message(channel, &mut rng).unwrap() {
        SpawnOutcome::Spawned(encounter) => encounter.name().to_string(),
        other => panic!("expected a spawn, got {:?}", other),
    }
}

#[test]
fn test_threads_race_for_one_encounter() {
    let fixture = Fixture::new();
    let (catches, game) = game(&fixture);
    let name = spawn_name(&game, -1, 21);

    let contenders = 64;
    let barrier = Arc::new(Barrier::new(contenders));
    let handles: Vec<_> = (0..contenders)
        .map(|user| {
            let game = Arc::clone(&game);
            let barrier = Arc::clone(&barrier);
            let guess = if user % 2 == 0 {
                name.to_uppercase()
            } else {
                format!(" {} ", name.to_lowercase())
            };
            std::thread::spawn(move || {
                barrier.wait();
                game.attempt_capture(-1, user as i64, &guess).unwrap()
            })
        })
        .collect();

    let outcomes: Vec<CaptureOutcome> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();
    let winners: Vec<i64> = outcomes
        .iter()
        .filter_map(|outcome| match outcome {
            CaptureOutcome::Caught { record, .. } => Some(record.user_id),
            _ => None,
        })
        .collect();

    assert_eq!(winners.len(), 1);
    assert_eq!(
        outcomes
            .iter()
            .filter(|outcome| **outcome == CaptureOutcome::NothingHere)
            .count(),
        contenders - 1
    );
    assert_eq!(catches.total(), 1);
    assert_eq!(catches.list_caught(winners[0], -1).unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_tasks_race_for_one_encounter() {
    let fixture = Fixture::new();
    let (catches, game) = game(&fixture);
    let name = spawn_name(&game, -2, 34);

    let contenders = 50;
    let barrier = Arc::new(tokio::sync::Barrier::new(contenders));
    let tasks: Vec<_> = (0..contenders)
        .map(|user| {
            let game = Arc::clone(&game);
            let barrier = Arc::clone(&barrier);
            let name = name.clone();
            tokio::spawn(async move {
                barrier.wait().await;
                game.attempt_capture(-2, user as i64, &name).unwrap()
            })
        })
        .collect();

    let mut winners = 0;
    for task in tasks {
        if matches!(task.await.unwrap(), CaptureOutcome::Caught { .. }) {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
    assert_eq!(catches.total(), 1);
}

#[test]
fn test_channels_do_not_block_each_other() {
    let fixture = Fixture::new();
    let (catches, game) = game(&fixture);

    let handles: Vec<_> = (0..16)
        .map(|channel| {
            let game = Arc::clone(&game);
            std::thread::spawn(move || {
                let name = spawn_name(&game, channel, channel as u64);
                game.attempt_capture(channel, 1, &name).unwrap()
            })
        })
        .collect();

    for handle in handles {
        assert!(matches!(
            handle.join().unwrap(),
            CaptureOutcome::Caught { .. }
        ));
    }
    assert_eq!(catches.total(), 16);
}
