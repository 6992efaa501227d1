//! Shared helpers for engine integration tests.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use study_engine::{CardRef, CardType, Engine, EngineConfig, ManualClock};

pub const PROJECT: &str = "biology";

/// Engine over an in-memory database with a hand-driven clock.
pub struct TestContext {
    pub engine: Engine,
    pub clock: ManualClock,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_config(EngineConfig::default()).await
    }

    pub async fn with_config(config: EngineConfig) -> Self {
        let clock = ManualClock::new(start());
        let engine = Engine::open_in_memory(config, clock.clone()).await.unwrap();
        Self { engine, clock }
    }

    /// Load `count` cards into each section, ids `<section>-<n>`.
    pub async fn load(&self, sections: &[&str], count: usize) -> Vec<CardRef> {
        let section_ids = sections_vec(sections);
        let cards: Vec<CardRef> = sections
            .iter()
            .flat_map(|section| (0..count).map(move |n| card(&format!("{section}-{n}"), section)))
            .collect();
        self.engine
            .load_project(PROJECT, &section_ids, cards.clone())
            .await
            .unwrap();
        cards
    }

    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }
}

/// 09:00 UTC, well clear of a midnight day boundary.
pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap()
}

pub fn card(card_id: &str, section_id: &str) -> CardRef {
    CardRef {
        card_id: card_id.to_string(),
        section_id: section_id.to_string(),
        card_type: CardType::Mcq,
    }
}

pub fn sections_vec(sections: &[&str]) -> Vec<String> {
    sections.iter().map(|s| s.to_string()).collect()
}
