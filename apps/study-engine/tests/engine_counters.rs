//! Scores, section reset, activity window and retention through the engine.

mod common;

use chrono::Duration;
use pretty_assertions::assert_eq;
use study_engine::{DueCounts, EngineConfig, EngineError, Rating};

use common::{card, sections_vec, TestContext, PROJECT};

#[tokio::test]
async fn test_score_monotonic() {
    let ctx = TestContext::new().await;
    ctx.load(&["s1"], 1).await;

    let mut attempted = 0;
    for correct in [true, true, false, true, false, false] {
        let score = ctx.engine.update_score(PROJECT, "s1", correct).await.unwrap();
        assert!(score.attempted > attempted);
        assert!(score.correct <= score.attempted);
        attempted = score.attempted;
    }

    let scores = ctx.engine.scores(PROJECT).await.unwrap();
    assert_eq!(scores.len(), 1);
    assert_eq!((scores[0].correct, scores[0].attempted), (3, 6));
}

#[tokio::test]
async fn test_load_project_creates_zero_scores() {
    let ctx = TestContext::new().await;
    ctx.load(&["s1", "s2"], 2).await;

    let scores = ctx.engine.scores(PROJECT).await.unwrap();
    let sections: Vec<&str> = scores.iter().map(|s| s.section_id.as_str()).collect();
    assert_eq!(sections, vec!["s1", "s2"]);
    assert!(scores.iter().all(|s| s.attempted == 0));
}

/// Loading the same project twice leaves reviewed cards untouched.
#[tokio::test]
async fn test_load_project_is_idempotent() {
    let ctx = TestContext::new().await;
    ctx.load(&["s1"], 2).await;
    ctx.engine.review(PROJECT, card("s1-0", "s1"), Rating::Good, 0).await.unwrap();

    let created = ctx
        .engine
        .load_project(
            PROJECT,
            &sections_vec(&["s1"]),
            vec![card("s1-0", "s1"), card("s1-1", "s1"), card("s1-2", "s1")],
        )
        .await
        .unwrap();
    assert_eq!(created, 1);
    assert_eq!(ctx.engine.get_card("s1-0").await.unwrap().unwrap().reps, 1);
}

#[tokio::test]
async fn test_reset_section() {
    let ctx = TestContext::new().await;
    ctx.load(&["s1", "s2"], 2).await;
    ctx.engine.review(PROJECT, card("s1-0", "s1"), Rating::Good, 0).await.unwrap();
    ctx.engine.update_score(PROJECT, "s1", true).await.unwrap();

    assert_eq!(ctx.engine.reset_section(PROJECT, "s1").await.unwrap(), 2);

    assert_eq!(
        ctx.engine.count_due(PROJECT, &sections_vec(&["s1"])).await.unwrap(),
        DueCounts::default()
    );
    assert!(ctx.engine.get_card("s1-0").await.unwrap().is_none());
    assert_eq!(
        ctx.engine.count_due(PROJECT, &sections_vec(&["s2"])).await.unwrap().total,
        2
    );

    let s1 = ctx
        .engine
        .scores(PROJECT)
        .await
        .unwrap()
        .into_iter()
        .find(|s| s.section_id == "s1")
        .unwrap();
    assert_eq!((s1.correct, s1.attempted), (0, 0));

    // The pending undo belonged to the deleted section.
    assert_eq!(ctx.engine.undo().await.unwrap(), None);
}

#[tokio::test]
async fn test_count_due_excludes_hidden_cards() {
    let ctx = TestContext::new().await;
    ctx.load(&["s1"], 4).await;
    ctx.engine.suspend("s1-0").await.unwrap();
    ctx.engine.bury("s1-1").await.unwrap();
    ctx.engine.review(PROJECT, card("s1-2", "s1"), Rating::Again, 0).await.unwrap();
    ctx.advance(Duration::minutes(1));

    let counts = ctx.engine.count_due(PROJECT, &sections_vec(&["s1"])).await.unwrap();
    assert_eq!(counts, DueCounts { due: 1, new_count: 1, total: 2 });
}

#[tokio::test]
async fn test_activity_window_is_capped() {
    let config = EngineConfig {
        activity_cap: 5,
        ..EngineConfig::default()
    };
    let ctx = TestContext::with_config(config).await;

    for n in 0..8 {
        let rating = if n == 7 { Rating::Again } else { Rating::Good };
        ctx.engine.add_activity(PROJECT, Some("s1"), rating).await.unwrap();
        ctx.advance(Duration::seconds(1));
    }

    let events = ctx.engine.activity(PROJECT, 100).await.unwrap();
    assert_eq!(events.len(), 5);
    assert_eq!(events[0].rating, Rating::Again);
    assert!(!events[0].correct);
    assert!(events.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
}

#[tokio::test]
async fn test_activity_score() {
    let ctx = TestContext::new().await;
    ctx.engine.add_activity(PROJECT, Some("s1"), Rating::Easy).await.unwrap();
    ctx.engine.add_activity(PROJECT, Some("s2"), Rating::Good).await.unwrap();
    ctx.engine.add_activity(PROJECT, None, Rating::Again).await.unwrap();

    let total = ctx.engine.activity_score(PROJECT, None).await.unwrap();
    assert!((total - 5.0).abs() < 1e-9);
    let s1 = ctx.engine.activity_score(PROJECT, Some("s1")).await.unwrap();
    assert!((s1 - 4.0).abs() < 1e-9);

    ctx.advance(Duration::days(2));
    let faded = ctx.engine.activity_score(PROJECT, Some("s1")).await.unwrap();
    assert!((faded - 2.8).abs() < 1e-9);

    assert_eq!(ctx.engine.clear_activity(PROJECT).await.unwrap(), 3);
    assert_eq!(ctx.engine.activity_score(PROJECT, None).await.unwrap(), 0.0);
}

#[tokio::test]
async fn test_retention_per_project() {
    let ctx = TestContext::new().await;
    assert_eq!(ctx.engine.retention(PROJECT).await.unwrap(), 0.9);

    ctx.engine.set_retention(PROJECT, 0.8).await.unwrap();
    assert_eq!(ctx.engine.retention(PROJECT).await.unwrap(), 0.8);
    assert_eq!(ctx.engine.retention("other").await.unwrap(), 0.9);

    assert!(matches!(
        ctx.engine.set_retention(PROJECT, 0.0).await,
        Err(EngineError::InvalidInput(_))
    ));
}

/// Lower retention stretches the projected review interval.
#[tokio::test]
async fn test_retention_changes_intervals() {
    let ctx = TestContext::new().await;
    ctx.load(&["s1"], 1).await;
    let easy_default = ctx.engine.preview("s1-0").await.unwrap()[3].interval_days;

    ctx.engine.set_retention(PROJECT, 0.8).await.unwrap();
    let easy_relaxed = ctx.engine.preview("s1-0").await.unwrap()[3].interval_days;

    assert!(easy_relaxed > easy_default);
}
