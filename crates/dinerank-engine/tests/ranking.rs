use dinerank_core::{CoreError, RestaurantId, RestaurantInput, Score, rank_order};
use dinerank_engine::{RankingEngine, SearchQuery};
use std::cmp::Ordering;
use std::sync::Arc;
use std::thread;

fn restaurant(name: &str, score: Option<f64>) -> RestaurantInput {
    let input = RestaurantInput::new(name, "1 Market St", "+1-555-0199");
    match score {
        Some(score) => input.with_score(score),
        None => input,
    }
}

fn seeded() -> RankingEngine {
    let engine = RankingEngine::new();
    for (name, score) in [
        ("The Golden Spoon", 4.8),
        ("Sushi Sensation", 4.9),
        ("Cafe Cozy", 4.8),
        ("Pizza Palace", 4.5),
    ] {
        engine.create_or_update(restaurant(name, Some(score))).unwrap();
    }
    engine
}

#[test]
fn top_three_of_sample_set() {
    let engine = seeded();
    let top = engine.top_k(3, false).unwrap();
    assert_eq!(
        top.names(),
        vec!["Sushi Sensation", "Cafe Cozy", "The Golden Spoon"]
    );
}

#[test]
fn stats_of_sample_set() {
    let stats = seeded().stats();
    assert_eq!(stats.count, 4);
    assert_eq!(stats.average, Some(4.75));
    assert_eq!(stats.min.map(Score::as_f64), Some(4.5));
    assert_eq!(stats.max.map(Score::as_f64), Some(4.9));
}

#[test]
fn zero_k_is_rejected() {
    let err = seeded().top_k(0, false).unwrap_err();
    assert!(matches!(err, CoreError::InvalidArgument(_)));
    assert!(err.is_client_error());
}

#[test]
fn deactivated_restaurant_leaves_active_ranking() {
    let engine = seeded();
    let sushi = engine.top_k(1, false).unwrap().into_inner().remove(0);
    engine.deactivate(sushi.id).unwrap();

    let top = engine.top_k(1, true).unwrap();
    assert_eq!(top.names(), vec!["Cafe Cozy"]);
    assert!(!engine.get(sushi.id).unwrap().active);
    assert_eq!(engine.stats().active_count, 3);
}

#[test]
fn random_population_stays_rank_ordered() {
    let mut rng = fastrand::Rng::with_seed(7);
    let engine = RankingEngine::new();
    let names = ["Alpha", "Bravo", "Charlie", "Delta", "echo", "Foxtrot"];

    for _ in 0..300 {
        let name = names[rng.usize(..names.len())];
        let score = (rng.u16(0..=50) as f64) / 10.0;
        let rated = rng.u8(..10) > 0;
        engine
            .create_or_update(restaurant(name, rated.then_some(score)))
            .unwrap();
    }
    // update a random subset
    for _ in 0..100 {
        let id = RestaurantId(rng.u64(1..=300));
        let score = (rng.u16(0..=500) as f64) / 100.0;
        engine
            .create_or_update(restaurant("Golf", Some(score)).with_id(id))
            .unwrap();
    }

    let full = engine.top_k(1_000, false).unwrap();
    assert!(full.is_rank_ordered());
    assert_eq!(full.len(), engine.stats().rated_count);

    let records = full.into_inner();
    for pair in records.windows(2) {
        assert_eq!(rank_order(&pair[0], &pair[1]), Ordering::Less);
    }

    let prefix = engine.top_k(10, false).unwrap().into_inner();
    assert_eq!(prefix.as_slice(), &records[..10]);

    let filtered = engine
        .search(SearchQuery::new(1_000).with_min_score(Score::from_f64(3.0).unwrap()))
        .unwrap();
    assert!(filtered.iter().all(|r| r.score.as_f64() >= 3.0));
    assert_eq!(
        filtered.len(),
        records.iter().filter(|r| r.score.as_f64() >= 3.0).count()
    );
}

#[test]
fn concurrent_writers_and_readers_see_consistent_views() {
    let engine = Arc::new(RankingEngine::new());

    let writers: Vec<_> = (0..4)
        .map(|w| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..50u16 {
                    let score = f64::from((w * 50 + i) % 501) / 100.0;
                    engine
                        .create_or_update(restaurant(&format!("w{w}-{i}"), Some(score)))
                        .unwrap();
                }
            })
        })
        .collect();

    let readers: Vec<_> = (0..2)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for _ in 0..50 {
                    let view = engine.top_k(25, false).unwrap();
                    assert!(view.is_rank_ordered());
                    let stats = engine.stats();
                    assert!(stats.rated_count <= stats.count);
                }
            })
        })
        .collect();

    for handle in writers.into_iter().chain(readers) {
        handle.join().unwrap();
    }

    assert_eq!(engine.len(), 200);
    assert_eq!(engine.stats().rated_count, 200);
    assert!(engine.top_k(200, false).unwrap().is_rank_ordered());
}
