//! Persistence contract shared by guest and account sessions.
//!
//! The ledger and registry only ever talk to [`Backend`]; which store sits behind it is
//! decided once, when the session is opened.

mod guest;
mod records;

pub use guest::{GuestBackend, GuestData};
pub use records::{AccountBackend, RecordStore};

use crate::errors::StoreError;
use crate::models::{CompletionEvent, LeaderboardEntry, Profile, Stat, Tally};
use async_trait::async_trait;

#[async_trait]
pub trait Backend: Send + Sync {
    async fn fetch_profile(&self) -> Result<Option<Profile>, StoreError>;

    /// Stats ordered by `order_index`.
    async fn fetch_stats(&self) -> Result<Vec<Stat>, StoreError>;

    async fn fetch_events(&self) -> Result<Vec<CompletionEvent>, StoreError>;

    /// Appends the event and bumps the stat's points and the profile XP as one unit.
    ///
    /// Returns [`StoreError::Duplicate`] without touching anything when an event for the
    /// same stat and day already exists.
    async fn insert_event(&self, event: &CompletionEvent) -> Result<Tally, StoreError>;

    async fn insert_stat(&self, stat: &Stat) -> Result<(), StoreError>;

    /// Stores the starting stats and the onboarded profile in a single write.
    async fn complete_onboarding(
        &self,
        stats: &[Stat],
        profile: &Profile,
    ) -> Result<(), StoreError>;

    /// Replaces the stat's metadata; the stored point total is kept.
    async fn update_stat(&self, stat: &Stat) -> Result<(), StoreError>;

    async fn delete_stat(&self, id: &str) -> Result<(), StoreError>;

    /// Inserts or replaces the profile; the stored XP is kept.
    async fn update_profile(&self, profile: &Profile) -> Result<(), StoreError>;

    /// Deletes every event and zeroes all point totals and XP.
    async fn reset_progress(&self) -> Result<(), StoreError>;

    async fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, StoreError>;
}

pub(crate) fn apply_stat_metadata(target: &mut Stat, source: &Stat) {
    target.name = source.name.clone();
    target.emoji = source.emoji.clone();
    target.color = source.color;
    target.description = source.description.clone();
    target.order_index = source.order_index;
}

pub(crate) fn apply_profile_fields(target: &mut Profile, source: &Profile) {
    target.character_name = source.character_name.clone();
    target.avatar = source.avatar.clone();
    target.onboarding_completed = source.onboarding_completed;
    target.mirror = source.mirror.clone();
}
