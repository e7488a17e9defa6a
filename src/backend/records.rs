use super::{Backend, apply_profile_fields, apply_stat_metadata};
use crate::day::DayKey;
use crate::errors::StoreError;
use crate::leaderboard::rank;
use crate::models::{CompletionEvent, Feedback, LeaderboardEntry, Profile, Stat, Tally};
use crate::storage::{load_json, persist_json};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StatRow {
    user_id: String,
    #[serde(flatten)]
    stat: Stat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EventRow {
    user_id: String,
    #[serde(flatten)]
    event: CompletionEvent,
}

type EventKey = (String, String, DayKey);

fn event_key(user_id: &str, event: &CompletionEvent) -> EventKey {
    (user_id.to_string(), event.stat_id.clone(), event.day)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Tables {
    #[serde(default)]
    profiles: BTreeMap<String, Profile>,
    #[serde(default)]
    stats: Vec<StatRow>,
    #[serde(default)]
    events: Vec<EventRow>,
    #[serde(default)]
    feedback: Vec<Feedback>,
}

struct Records {
    tables: Tables,
    /// Unique index over (user, stat, day).
    completed: HashSet<EventKey>,
}

impl Records {
    fn new(tables: Tables) -> Self {
        let completed = tables
            .events
            .iter()
            .map(|row| event_key(&row.user_id, &row.event))
            .collect();
        Self { tables, completed }
    }
}

/// Shared record store behind every account session.
pub struct RecordStore {
    path: PathBuf,
    records: Mutex<Records>,
}

impl RecordStore {
    pub async fn open(path: PathBuf) -> Self {
        let tables: Tables = load_json(&path).await;
        info!(
            profiles = tables.profiles.len(),
            events = tables.events.len(),
            "record store loaded"
        );
        Self {
            path,
            records: Mutex::new(Records::new(tables)),
        }
    }

    /// Applies `change` in place, then writes the tables out.
    ///
    /// `change` must validate before it touches anything. A failed write reloads the
    /// last copy that reached disk.
    async fn mutate<T>(
        &self,
        change: impl FnOnce(&mut Records) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut records = self.records.lock().await;
        let output = change(&mut *records)?;
        if let Err(err) = persist_json(&self.path, &records.tables).await {
            error!(error = %err, "record write failed, reloading from disk");
            *records = Records::new(load_json(&self.path).await);
            return Err(err);
        }
        Ok(output)
    }

    pub async fn submit_feedback(&self, feedback: Feedback) -> Result<(), StoreError> {
        self.mutate(|records| {
            records.tables.feedback.push(feedback);
            Ok(())
        })
        .await
    }

    pub async fn rank(&self, limit: usize) -> Vec<LeaderboardEntry> {
        let records = self.records.lock().await;
        rank(
            records
                .tables
                .profiles
                .iter()
                .map(|(user_id, profile)| (user_id.as_str(), profile)),
            limit,
        )
    }
}

/// One account's view onto the [`RecordStore`].
#[derive(Clone)]
pub struct AccountBackend {
    user_id: String,
    store: Arc<RecordStore>,
}

impl AccountBackend {
    pub fn new(user_id: impl Into<String>, store: Arc<RecordStore>) -> Self {
        Self {
            user_id: user_id.into(),
            store,
        }
    }

    /// Appends `stats` and, when given, the profile fields, as one write.
    async fn append_stats(
        &self,
        stats: &[Stat],
        profile: Option<&Profile>,
    ) -> Result<(), StoreError> {
        self.store
            .mutate(|records| {
                let tables = &mut records.tables;
                let taken = stats.iter().any(|stat| {
                    tables
                        .stats
                        .iter()
                        .any(|row| row.user_id == self.user_id && row.stat.id == stat.id)
                });
                if taken {
                    return Err(StoreError::Duplicate);
                }
                tables.stats.extend(stats.iter().map(|stat| StatRow {
                    user_id: self.user_id.clone(),
                    stat: stat.clone(),
                }));
                if let Some(profile) = profile {
                    let stored = tables.profiles.entry(self.user_id.clone()).or_default();
                    apply_profile_fields(stored, profile);
                }
                Ok(())
            })
            .await
    }
}

#[async_trait]
impl Backend for AccountBackend {
    async fn fetch_profile(&self) -> Result<Option<Profile>, StoreError> {
        let records = self.store.records.lock().await;
        Ok(records.tables.profiles.get(&self.user_id).cloned())
    }

    async fn fetch_stats(&self) -> Result<Vec<Stat>, StoreError> {
        let records = self.store.records.lock().await;
        let mut stats: Vec<Stat> = records
            .tables
            .stats
            .iter()
            .filter(|row| row.user_id == self.user_id)
            .map(|row| row.stat.clone())
            .collect();
        stats.sort_by_key(|stat| stat.order_index);
        Ok(stats)
    }

    async fn fetch_events(&self) -> Result<Vec<CompletionEvent>, StoreError> {
        let records = self.store.records.lock().await;
        Ok(records
            .tables
            .events
            .iter()
            .filter(|row| row.user_id == self.user_id)
            .map(|row| row.event.clone())
            .collect())
    }

    async fn insert_event(&self, event: &CompletionEvent) -> Result<Tally, StoreError> {
        self.store
            .mutate(|records| {
                let key = event_key(&self.user_id, event);
                if records.completed.contains(&key) {
                    return Err(StoreError::Duplicate);
                }
                let tables = &mut records.tables;
                let row = tables
                    .stats
                    .iter_mut()
                    .find(|row| row.user_id == self.user_id && row.stat.id == event.stat_id)
                    .ok_or_else(|| StoreError::NotFound(event.stat_id.clone()))?;
                row.stat.total_points = row.stat.total_points.saturating_add(1);
                let stat_points = row.stat.total_points;

                let profile = tables.profiles.entry(self.user_id.clone()).or_default();
                profile.total_xp = profile.total_xp.saturating_add(1);
                let total_xp = profile.total_xp;

                tables.events.push(EventRow {
                    user_id: self.user_id.clone(),
                    event: event.clone(),
                });
                records.completed.insert(key);
                Ok(Tally {
                    stat_points,
                    total_xp,
                })
            })
            .await
    }

    async fn insert_stat(&self, stat: &Stat) -> Result<(), StoreError> {
        self.append_stats(std::slice::from_ref(stat), None).await
    }

    async fn complete_onboarding(
        &self,
        stats: &[Stat],
        profile: &Profile,
    ) -> Result<(), StoreError> {
        self.append_stats(stats, Some(profile)).await
    }

    async fn update_stat(&self, stat: &Stat) -> Result<(), StoreError> {
        self.store
            .mutate(|records| {
                let row = records
                    .tables
                    .stats
                    .iter_mut()
                    .find(|row| row.user_id == self.user_id && row.stat.id == stat.id)
                    .ok_or_else(|| StoreError::NotFound(stat.id.clone()))?;
                apply_stat_metadata(&mut row.stat, stat);
                Ok(())
            })
            .await
    }

    async fn delete_stat(&self, id: &str) -> Result<(), StoreError> {
        self.store
            .mutate(|records| {
                let tables = &mut records.tables;
                let before = tables.stats.len();
                tables
                    .stats
                    .retain(|row| !(row.user_id == self.user_id && row.stat.id == id));
                if tables.stats.len() == before {
                    return Err(StoreError::NotFound(id.to_string()));
                }
                Ok(())
            })
            .await
    }

    async fn update_profile(&self, profile: &Profile) -> Result<(), StoreError> {
        self.store
            .mutate(|records| {
                let stored = records
                    .tables
                    .profiles
                    .entry(self.user_id.clone())
                    .or_default();
                apply_profile_fields(stored, profile);
                Ok(())
            })
            .await
    }

    async fn reset_progress(&self) -> Result<(), StoreError> {
        self.store
            .mutate(|records| {
                records.completed.retain(|(user_id, _, _)| *user_id != self.user_id);
                let tables = &mut records.tables;
                tables.events.retain(|row| row.user_id != self.user_id);
                for row in tables.stats.iter_mut().filter(|row| row.user_id == self.user_id) {
                    row.stat.total_points = 0;
                }
                if let Some(profile) = tables.profiles.get_mut(&self.user_id) {
                    profile.total_xp = 0;
                }
                Ok(())
            })
            .await
    }

    async fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, StoreError> {
        Ok(self.store.rank(limit).await)
    }
}
