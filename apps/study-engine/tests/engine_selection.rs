//! Next-card selection through the engine.

mod common;

use chrono::Duration;
use std::collections::HashSet;
use study_engine::{CardRef, CardState, CardType, EngineConfig, Rating};

use common::{card, sections_vec, TestContext, PROJECT};

/// Learning card due beats Review card due.
#[tokio::test]
async fn test_learning_tier_first() {
    let ctx = TestContext::new().await;
    ctx.load(&["s1"], 2).await;

    ctx.engine
        .review(PROJECT, card("s1-0", "s1"), Rating::Easy, 0)
        .await
        .unwrap();
    ctx.advance(Duration::days(20));
    ctx.engine
        .review(PROJECT, card("s1-1", "s1"), Rating::Good, 0)
        .await
        .unwrap();
    ctx.advance(Duration::minutes(30));

    let sections = sections_vec(&["s1"]);
    let next = ctx.engine.pick_next(PROJECT, &sections, 10, None).await.unwrap();
    assert_eq!(next.as_deref(), Some("s1-1"));

    // Graduate the learning card; the overdue review card is next.
    ctx.engine
        .review(PROJECT, card("s1-1", "s1"), Rating::Good, 0)
        .await
        .unwrap();
    let next = ctx.engine.pick_next(PROJECT, &sections, 10, None).await.unwrap();
    assert_eq!(next.as_deref(), Some("s1-0"));
}

/// Hidden cards are never returned.
#[tokio::test]
async fn test_never_picks_suspended_or_buried() {
    let ctx = TestContext::new().await;
    ctx.load(&["s1"], 3).await;
    ctx.engine.suspend("s1-0").await.unwrap();
    ctx.engine.bury("s1-1").await.unwrap();

    let sections = sections_vec(&["s1"]);
    for _ in 0..10 {
        let next = ctx.engine.pick_next(PROJECT, &sections, 100, None).await.unwrap();
        assert_eq!(next.as_deref(), Some("s1-2"));
    }
}

#[tokio::test]
async fn test_nothing_to_review() {
    let ctx = TestContext::new().await;
    ctx.load(&["s1"], 1).await;

    assert_eq!(ctx.engine.pick_next(PROJECT, &[], 10, None).await.unwrap(), None);

    ctx.engine.suspend("s1-0").await.unwrap();
    let sections = sections_vec(&["s1"]);
    assert_eq!(
        ctx.engine.pick_next(PROJECT, &sections, 10, None).await.unwrap(),
        None
    );
}

/// Past the daily cap, the weakest-card fallback takes over.
#[tokio::test]
async fn test_new_card_cap() {
    let ctx = TestContext::new().await;
    ctx.load(&["s1"], 5).await;
    let sections = sections_vec(&["s1"]);

    let mut introduced = Vec::new();
    for _ in 0..2 {
        let id = ctx
            .engine
            .pick_next(PROJECT, &sections, 2, None)
            .await
            .unwrap()
            .unwrap();
        let picked = ctx.engine.get_card(&id).await.unwrap().unwrap();
        assert_eq!(picked.state, CardState::New);
        ctx.engine.review(PROJECT, card(&id, "s1"), Rating::Good, 0).await.unwrap();
        introduced.push(id);
    }
    let distinct: HashSet<&String> = introduced.iter().collect();
    assert_eq!(distinct.len(), 2);

    // Quota spent. The untouched cards all sit at stability 0, so the
    // fallback lands on the lowest remaining id every time rather than
    // drawing a New card at random.
    let lowest_untouched = (0..5)
        .map(|n| format!("s1-{n}"))
        .find(|id| !introduced.contains(id))
        .unwrap();
    for _ in 0..20 {
        let next = ctx.engine.pick_next(PROJECT, &sections, 2, None).await.unwrap();
        assert_eq!(next.as_deref(), Some(lowest_untouched.as_str()));
    }
}

#[tokio::test]
async fn test_zero_cap_still_returns_a_card() {
    let ctx = TestContext::new().await;
    ctx.load(&["s1"], 3).await;

    let sections = sections_vec(&["s1"]);
    let next = ctx.engine.pick_next(PROJECT, &sections, 0, None).await.unwrap();
    assert_eq!(next.as_deref(), Some("s1-0"));
}

/// Nothing due and no New quota left: lowest stability wins.
#[tokio::test]
async fn test_weakest_fallback() {
    let ctx = TestContext::new().await;
    ctx.engine.review(PROJECT, card("hard", "s1"), Rating::Hard, 0).await.unwrap();
    ctx.engine.review(PROJECT, card("easy", "s1"), Rating::Easy, 0).await.unwrap();
    ctx.engine.review(PROJECT, card("hard", "s1"), Rating::Good, 0).await.unwrap();

    let sections = sections_vec(&["s1"]);
    let next = ctx.engine.pick_next(PROJECT, &sections, 10, None).await.unwrap();
    assert_eq!(next.as_deref(), Some("hard"));
}

#[tokio::test]
async fn test_card_type_filter() {
    let ctx = TestContext::new().await;
    let sections = sections_vec(&["s1"]);
    let cards = vec![
        card("q1", "s1"),
        CardRef {
            card_id: "f1".to_string(),
            section_id: "s1".to_string(),
            card_type: CardType::Flashcard,
        },
    ];
    ctx.engine.load_project(PROJECT, &sections, cards).await.unwrap();

    let next = ctx
        .engine
        .pick_next(PROJECT, &sections, 10, Some(CardType::Flashcard))
        .await
        .unwrap();
    assert_eq!(next.as_deref(), Some("f1"));
}

/// Other sections and projects stay out of the working set.
#[tokio::test]
async fn test_selection_is_scoped() {
    let ctx = TestContext::new().await;
    ctx.load(&["s1", "s2"], 1).await;
    ctx.engine
        .load_project("other", &sections_vec(&["s1"]), vec![card("elsewhere", "s1")])
        .await
        .unwrap();

    let next = ctx
        .engine
        .pick_next(PROJECT, &sections_vec(&["s2"]), 10, None)
        .await
        .unwrap();
    assert_eq!(next.as_deref(), Some("s2-0"));
}

/// A buried card comes back on the next study day.
#[tokio::test]
async fn test_day_rollover_unburies() {
    let ctx = TestContext::new().await;
    ctx.load(&["s1"], 1).await;
    ctx.engine.bury("s1-0").await.unwrap();

    let sections = sections_vec(&["s1"]);
    assert_eq!(ctx.engine.pick_next(PROJECT, &sections, 10, None).await.unwrap(), None);

    ctx.advance(Duration::days(1));
    assert_eq!(
        ctx.engine.pick_next(PROJECT, &sections, 10, None).await.unwrap().as_deref(),
        Some("s1-0")
    );
    assert!(!ctx.engine.get_card("s1-0").await.unwrap().unwrap().buried);
}

/// The study day starts at the configured reset hour, not at midnight.
#[tokio::test]
async fn test_rollover_waits_for_reset_hour() {
    let config = EngineConfig {
        daily_reset_hour: 4,
        ..EngineConfig::default()
    };
    let ctx = TestContext::with_config(config).await;
    ctx.load(&["s1"], 1).await;
    ctx.engine.bury("s1-0").await.unwrap();

    // 09:00 -> 03:00 next calendar day: same study day.
    ctx.advance(Duration::hours(18));
    assert!(ctx.engine.get_card("s1-0").await.unwrap().unwrap().buried);

    ctx.advance(Duration::hours(1));
    assert!(!ctx.engine.get_card("s1-0").await.unwrap().unwrap().buried);
}

/// Unbury-all clears buried cards without waiting for the day to turn.
#[tokio::test]
async fn test_unbury_all() {
    let ctx = TestContext::new().await;
    ctx.load(&["s1"], 2).await;
    ctx.engine.bury("s1-0").await.unwrap();
    ctx.engine.bury("s1-1").await.unwrap();

    assert_eq!(ctx.engine.unbury_all(PROJECT).await.unwrap(), 2);
    assert!(!ctx.engine.get_card("s1-1").await.unwrap().unwrap().buried);
}
