//! Next-card selection tiers.

use crate::db::{CardRepository, CardScope, DbError};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use srs_core::CardState;

/// Which tier produced a pick, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Learning or Relearning card past due.
    Learning,
    /// Review card past due.
    Review,
    /// Never-reviewed card, subject to the daily quota.
    New,
    /// Lowest-stability eligible card when nothing else qualifies.
    Weakest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pick {
    pub card_id: String,
    pub tier: Tier,
}

/// First non-empty tier wins. `allow_new` is false once the day's New quota
/// is spent. Returns None only when the scope has no eligible card at all.
pub fn select<R, G>(
    repo: &R,
    scope: &CardScope<'_>,
    allow_new: bool,
    rng: &mut G,
    now: DateTime<Utc>,
) -> Result<Option<Pick>, DbError>
where
    R: CardRepository,
    G: Rng + ?Sized,
{
    if scope.is_empty() {
        return Ok(None);
    }

    let learning = [CardState::Learning, CardState::Relearning];
    if let Some(card_id) = repo.earliest_due(scope, &learning, now)? {
        return Ok(Some(Pick { card_id, tier: Tier::Learning }));
    }

    if let Some(card_id) = repo.earliest_due(scope, &[CardState::Review], now)? {
        return Ok(Some(Pick { card_id, tier: Tier::Review }));
    }

    if allow_new {
        let candidates = repo.new_card_ids(scope)?;
        if let Some(card_id) = candidates.choose(rng) {
            return Ok(Some(Pick {
                card_id: card_id.clone(),
                tier: Tier::New,
            }));
        }
    }

    Ok(repo.weakest_card(scope)?.map(|card_id| Pick {
        card_id,
        tier: Tier::Weakest,
    }))
}
