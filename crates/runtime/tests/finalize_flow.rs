//! Finalization: durable write-backs, retention, idempotence, recovery.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;

use rbc_core::stats::{AggregateInput, ItemKind, ItemSpec, keys};
use rbc_core::Zone;
use rbc_runtime::{
    AnalyticsEvent, CombatantProfile, CycleOutcome, Engine, EngineConfig, MoveData,
};

fn profile(char_id: i64, name: &str, input: AggregateInput) -> CombatantProfile {
    CombatantProfile {
        char_id,
        name: name.into(),
        ai: false,
        stat_input: input,
        abilities: vec![],
        belt: vec![],
        rating: 1000.0,
    }
}

fn heavy_hitter() -> AggregateInput {
    AggregateInput {
        base: [(keys::HP_MAX.to_string(), 100.0), (keys::ENERGY_MAX.to_string(), 30.0)].into(),
        equipment: vec![ItemSpec {
            name: "greatblade".into(),
            kind: ItemKind::Weapon { base_power: 200.0, damage_spread: 0.0 },
            bonuses: BTreeMap::new(),
        }],
        ..Default::default()
    }
}

fn frail() -> AggregateInput {
    AggregateInput {
        base: [(keys::HP_MAX.to_string(), 50.0)].into(),
        ..Default::default()
    }
}

async fn lethal_session(engine: &Engine) -> String {
    let now = Utc::now().timestamp();
    let mut meta = engine.lifecycle().create_session("pve", "duel", now).await.unwrap();
    engine
        .lifecycle()
        .add_participant(&mut meta, &profile(1, "Ada", heavy_hitter()), "blue")
        .await
        .unwrap();
    engine
        .lifecycle()
        .add_participant(&mut meta, &profile(2, "Brom", frail()), "red")
        .await
        .unwrap();
    engine.lifecycle().init_battle_state(&meta.session_id).await.unwrap();
    meta.session_id
}

async fn register_mutual(engine: &Engine, session: &str) {
    engine
        .register_move(
            session,
            1,
            2,
            MoveData {
                attack_zones: vec![Zone::Legs],
                block_zones: vec![Zone::Head, Zone::Chest],
                ability_key: None,
            },
        )
        .await
        .unwrap();
    engine
        .register_move(
            session,
            2,
            1,
            MoveData {
                attack_zones: vec![Zone::Legs],
                block_zones: vec![Zone::Head, Zone::Chest],
                ability_key: None,
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn lethal_exchange_finalizes_and_persists() {
    let engine = Engine::builder()
        .config(EngineConfig { seed: Some(5), ..Default::default() })
        .build();
    let session = lethal_session(&engine).await;
    let mut analytics = engine.subscribe_analytics();

    register_mutual(&engine, &session).await;
    let mut supervisor = engine.manual_supervisor(&session, 11);
    let now = Utc::now().timestamp();
    assert_eq!(supervisor.run_cycle(now).await.unwrap(), CycleOutcome::Finished);

    // Winner recorded, active flipped, loser at zero.
    let meta = engine.repo().meta(&session).await.unwrap().unwrap();
    assert!(!meta.active);
    assert_eq!(meta.winner.as_deref(), Some("blue"));
    assert!(meta.end_time.is_some());

    let ada = engine.repo().participant(&session, 1).await.unwrap().unwrap();
    let brom = engine.repo().participant(&session, 2).await.unwrap().unwrap();
    assert_eq!(brom.state.hp_current, 0);
    assert!(!ada.is_dead());

    // Durable write-backs: account meters and buffered skill XP.
    let account = engine.repo().account_fields(1).await.unwrap();
    assert_eq!(account.get("hp_current"), Some(&ada.state.hp_current.to_string()));
    assert_eq!(account.get("energy_current"), Some(&ada.state.energy_current.to_string()));
    assert!(!account.contains_key("combat_session_id"));

    let sword_xp = engine.repo().skill_xp(1, "sword").await.unwrap();
    assert_eq!(sword_xp, ada.state.xp_buffer["sword"] as u64);
    assert!(sword_xp > 0);

    // Intent and exchange keys are gone eagerly.
    assert!(engine.repo().intents_of(&session, 1).await.unwrap().is_empty());
    assert_eq!(engine.repo().exchange_queue_len(&session, 1).await.unwrap(), 0);
    assert_eq!(engine.repo().exchange_queue_len(&session, 2).await.unwrap(), 0);

    // The analytics report went out once.
    let AnalyticsEvent::SessionFinished(report) = analytics.try_recv().unwrap();
    assert_eq!(report.session_id, session);
    assert_eq!(report.winner.as_deref(), Some("blue"));
    assert_eq!(report.participants.len(), 2);

    // A later cycle sees the inactive session and exits immediately.
    assert_eq!(supervisor.run_cycle(now + 1).await.unwrap(), CycleOutcome::Finished);
}

#[tokio::test]
async fn finalize_is_idempotent() {
    let engine = Engine::builder()
        .config(EngineConfig { seed: Some(5), ..Default::default() })
        .build();
    let session = lethal_session(&engine).await;

    register_mutual(&engine, &session).await;
    let mut supervisor = engine.manual_supervisor(&session, 11);
    let now = Utc::now().timestamp();
    supervisor.run_cycle(now).await.unwrap();

    let xp_before = engine.repo().skill_xp(1, "sword").await.unwrap();
    let account_before = engine.repo().account_fields(1).await.unwrap();

    // Second finalize: no-op, nothing double-credited.
    engine.lifecycle().finalize(&session, Some("red"), now + 5).await.unwrap();

    assert_eq!(engine.repo().skill_xp(1, "sword").await.unwrap(), xp_before);
    assert_eq!(engine.repo().account_fields(1).await.unwrap(), account_before);
    let meta = engine.repo().meta(&session).await.unwrap().unwrap();
    assert_eq!(meta.winner.as_deref(), Some("blue"), "winner is immutable after finalize");
}

#[tokio::test]
async fn history_keys_expire_after_ttl() {
    let engine = Engine::builder()
        .config(EngineConfig {
            seed: Some(5),
            history_ttl: Duration::from_millis(30),
            ..Default::default()
        })
        .build();
    let session = lethal_session(&engine).await;

    register_mutual(&engine, &session).await;
    let mut supervisor = engine.manual_supervisor(&session, 11);
    supervisor.run_cycle(Utc::now().timestamp()).await.unwrap();

    assert!(engine.repo().meta(&session).await.unwrap().is_some());
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(engine.repo().meta(&session).await.unwrap().is_none());
    assert!(engine.repo().participants(&session).await.unwrap().is_empty());
    assert_eq!(engine.get_logs(&session, 10).await.unwrap().len(), 0);
}

#[tokio::test]
async fn recovery_scan_finds_only_active_sessions() {
    let engine = Engine::builder()
        .config(EngineConfig { seed: Some(5), ..Default::default() })
        .build();

    let live = lethal_session(&engine).await;
    let finished = lethal_session(&engine).await;
    engine
        .lifecycle()
        .finalize(&finished, Some("blue"), Utc::now().timestamp())
        .await
        .unwrap();

    let recovered = engine.recover().await.unwrap();
    assert!(recovered.contains(&live));
    assert!(!recovered.contains(&finished));
    engine.shutdown();
}
