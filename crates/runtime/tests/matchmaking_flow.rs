//! Arena queue behavior: band matching, claim-first semantics, cancellation,
//! and the shadow fallback.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use rbc_core::stats::{AggregateInput, ItemKind, ItemSpec, keys};
use rbc_runtime::{CombatantProfile, Engine, EngineConfig, EngineError, StaticProfiles};

fn fighter_profile(char_id: i64, name: &str, rating: f64) -> CombatantProfile {
    CombatantProfile {
        char_id,
        name: name.into(),
        ai: false,
        stat_input: AggregateInput {
            base: [(keys::HP_MAX.to_string(), 100.0)].into(),
            equipment: vec![ItemSpec {
                name: "arena blade".into(),
                kind: ItemKind::Weapon { base_power: 8.0, damage_spread: 0.25 },
                bonuses: BTreeMap::new(),
            }],
            ..Default::default()
        },
        abilities: vec!["power_strike".into()],
        belt: vec![],
        rating,
    }
}

fn arena_engine(matchmaking_timeout: Duration) -> Engine {
    let profiles = StaticProfiles::new();
    profiles.insert(fighter_profile(10, "Ada", 1000.0));
    profiles.insert(fighter_profile(20, "Brom", 1030.0));
    profiles.insert(fighter_profile(30, "Cass", 5000.0));
    Engine::builder()
        .config(EngineConfig { matchmaking_timeout, seed: Some(9), ..Default::default() })
        .profiles(Arc::new(profiles))
        .build()
}

#[tokio::test]
async fn close_ratings_match_within_band() {
    let engine = arena_engine(Duration::from_secs(3600));
    engine.join_queue("arena_1v1", 10).await.unwrap();
    engine.join_queue("arena_1v1", 20).await.unwrap();

    // 5% band around 1000 covers 1030.
    let session = engine.check_and_match("arena_1v1", 10, 1).await.unwrap().unwrap();

    let dash = engine.get_dashboard_snapshot(&session, 10).await.unwrap();
    assert_eq!(dash.enemies.len(), 1);
    assert_eq!(dash.enemies[0].char_id, 20);

    // Both requests were consumed by the match.
    let err = engine.check_and_match("arena_1v1", 20, 1).await.unwrap_err();
    assert!(matches!(err, EngineError::NoMatchRequest(20)));
}

#[tokio::test]
async fn distant_rating_stays_unmatched_until_widened() {
    let engine = arena_engine(Duration::from_secs(3600));
    engine.join_queue("arena_1v1", 10).await.unwrap();
    engine.join_queue("arena_1v1", 30).await.unwrap();

    // 5000 is far outside every band (cap is ±30%).
    for attempt in 1..=10 {
        let matched = engine.check_and_match("arena_1v1", 10, attempt).await.unwrap();
        assert!(matched.is_none(), "attempt {attempt} should not match");
    }
}

#[tokio::test]
async fn cancel_removes_request_and_rating_entry() {
    let engine = arena_engine(Duration::from_secs(3600));
    engine.join_queue("arena_1v1", 10).await.unwrap();
    engine.cancel_queue("arena_1v1", 10).await.unwrap();

    let err = engine.check_and_match("arena_1v1", 10, 1).await.unwrap_err();
    assert!(matches!(err, EngineError::NoMatchRequest(10)));

    // A cancelled character can no longer be claimed by others.
    engine.join_queue("arena_1v1", 20).await.unwrap();
    let matched = engine.check_and_match("arena_1v1", 20, 6).await.unwrap();
    assert!(matched.is_none());
}

#[tokio::test]
async fn lonely_queue_falls_back_to_shadow() {
    let engine = arena_engine(Duration::ZERO);
    engine.join_queue("arena_1v1", 10).await.unwrap();

    // Queue is otherwise empty; the elapsed wait (0 s) already meets the
    // zero timeout, so the fallback fires.
    let session = engine.check_and_match("arena_1v1", 10, 1).await.unwrap().unwrap();

    let dash = engine.get_dashboard_snapshot(&session, 10).await.unwrap();
    assert_eq!(dash.enemies.len(), 1);
    let shadow = &dash.enemies[0];
    assert_eq!(shadow.hp_current, 150, "configured shadow HP");
    assert_eq!(shadow.energy_current, 50, "configured shadow energy");
    assert!(shadow.name.contains("Shadow"));

    // The caller is out of the queue and the session is live for them.
    assert_eq!(dash.status, rbc_runtime::SessionStatus::Active);
    let err = engine.check_and_match("arena_1v1", 10, 2).await.unwrap_err();
    assert!(matches!(err, EngineError::NoMatchRequest(10)));
}
