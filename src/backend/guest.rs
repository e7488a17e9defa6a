use super::{Backend, apply_profile_fields, apply_stat_metadata};
use crate::errors::StoreError;
use crate::models::{CompletionEvent, LeaderboardEntry, MirrorConfig, Profile, Stat, Tally};
use crate::storage::{load_json, persist_json, remove_json};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::Mutex;

/// The whole guest save, kept as a single document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestData {
    pub character_name: String,
    pub avatar: String,
    #[serde(default)]
    pub total_xp: u64,
    #[serde(default)]
    pub onboarding_completed: bool,
    #[serde(default)]
    pub mirror: Option<MirrorConfig>,
    #[serde(default)]
    pub stats: Vec<Stat>,
    #[serde(default)]
    pub habit_logs: Vec<CompletionEvent>,
}

impl Default for GuestData {
    fn default() -> Self {
        let profile = Profile::default();
        Self {
            character_name: profile.character_name,
            avatar: profile.avatar,
            total_xp: 0,
            onboarding_completed: false,
            mirror: None,
            stats: Vec::new(),
            habit_logs: Vec::new(),
        }
    }
}

impl GuestData {
    fn profile(&self) -> Profile {
        Profile {
            character_name: self.character_name.clone(),
            avatar: self.avatar.clone(),
            total_xp: self.total_xp,
            onboarding_completed: self.onboarding_completed,
            mirror: self.mirror.clone(),
        }
    }
}

pub struct GuestBackend {
    path: PathBuf,
    data: Mutex<GuestData>,
}

impl GuestBackend {
    pub async fn open(path: PathBuf) -> Self {
        let data = load_json(&path).await;
        Self {
            path,
            data: Mutex::new(data),
        }
    }

    /// Deletes the guest save; the session it belonged to ends with it.
    pub async fn discard(&self) -> Result<(), StoreError> {
        let mut data = self.data.lock().await;
        *data = GuestData::default();
        remove_json(&self.path).await
    }

    async fn commit(&self, data: &GuestData) -> Result<(), StoreError> {
        persist_json(&self.path, data).await
    }
}

#[async_trait]
impl Backend for GuestBackend {
    async fn fetch_profile(&self) -> Result<Option<Profile>, StoreError> {
        Ok(Some(self.data.lock().await.profile()))
    }

    async fn fetch_stats(&self) -> Result<Vec<Stat>, StoreError> {
        let mut stats = self.data.lock().await.stats.clone();
        stats.sort_by_key(|stat| stat.order_index);
        Ok(stats)
    }

    async fn fetch_events(&self) -> Result<Vec<CompletionEvent>, StoreError> {
        Ok(self.data.lock().await.habit_logs.clone())
    }

    async fn insert_event(&self, event: &CompletionEvent) -> Result<Tally, StoreError> {
        let mut data = self.data.lock().await;
        if data
            .habit_logs
            .iter()
            .any(|log| log.stat_id == event.stat_id && log.day == event.day)
        {
            return Err(StoreError::Duplicate);
        }

        let mut next = data.clone();
        let stat = next
            .stats
            .iter_mut()
            .find(|stat| stat.id == event.stat_id)
            .ok_or_else(|| StoreError::NotFound(event.stat_id.clone()))?;
        stat.total_points = stat.total_points.saturating_add(1);
        let stat_points = stat.total_points;
        next.total_xp = next.total_xp.saturating_add(1);
        next.habit_logs.push(event.clone());

        self.commit(&next).await?;
        let tally = Tally {
            stat_points,
            total_xp: next.total_xp,
        };
        *data = next;
        Ok(tally)
    }

    async fn insert_stat(&self, stat: &Stat) -> Result<(), StoreError> {
        let mut data = self.data.lock().await;
        if data.stats.iter().any(|existing| existing.id == stat.id) {
            return Err(StoreError::Duplicate);
        }
        let mut next = data.clone();
        next.stats.push(stat.clone());
        self.commit(&next).await?;
        *data = next;
        Ok(())
    }

    async fn complete_onboarding(
        &self,
        stats: &[Stat],
        profile: &Profile,
    ) -> Result<(), StoreError> {
        let mut data = self.data.lock().await;
        if stats
            .iter()
            .any(|stat| data.stats.iter().any(|existing| existing.id == stat.id))
        {
            return Err(StoreError::Duplicate);
        }
        let mut next = data.clone();
        next.stats.extend_from_slice(stats);
        next.character_name = profile.character_name.clone();
        next.avatar = profile.avatar.clone();
        next.onboarding_completed = profile.onboarding_completed;
        next.mirror = profile.mirror.clone();
        self.commit(&next).await?;
        *data = next;
        Ok(())
    }

    async fn update_stat(&self, stat: &Stat) -> Result<(), StoreError> {
        let mut data = self.data.lock().await;
        let mut next = data.clone();
        let target = next
            .stats
            .iter_mut()
            .find(|existing| existing.id == stat.id)
            .ok_or_else(|| StoreError::NotFound(stat.id.clone()))?;
        apply_stat_metadata(target, stat);
        self.commit(&next).await?;
        *data = next;
        Ok(())
    }

    async fn delete_stat(&self, id: &str) -> Result<(), StoreError> {
        let mut data = self.data.lock().await;
        if !data.stats.iter().any(|stat| stat.id == id) {
            return Err(StoreError::NotFound(id.to_string()));
        }
        let mut next = data.clone();
        next.stats.retain(|stat| stat.id != id);
        self.commit(&next).await?;
        *data = next;
        Ok(())
    }

    async fn update_profile(&self, profile: &Profile) -> Result<(), StoreError> {
        let mut data = self.data.lock().await;
        let mut current = data.profile();
        apply_profile_fields(&mut current, profile);
        let mut next = data.clone();
        next.character_name = current.character_name;
        next.avatar = current.avatar;
        next.onboarding_completed = current.onboarding_completed;
        next.mirror = current.mirror;
        self.commit(&next).await?;
        *data = next;
        Ok(())
    }

    async fn reset_progress(&self) -> Result<(), StoreError> {
        let mut data = self.data.lock().await;
        let mut next = data.clone();
        next.habit_logs.clear();
        next.total_xp = 0;
        for stat in &mut next.stats {
            stat.total_points = 0;
        }
        self.commit(&next).await?;
        *data = next;
        Ok(())
    }

    async fn leaderboard(&self, _limit: usize) -> Result<Vec<LeaderboardEntry>, StoreError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StatColor;
    use crate::storage::scratch_dir;

    fn stat(id: &str, order_index: u32) -> Stat {
        Stat {
            id: id.to_string(),
            name: format!("Stat {id}"),
            emoji: "⭐".to_string(),
            color: StatColor::Primary,
            description: None,
            order_index,
            total_points: 0,
        }
    }

    fn event(stat_id: &str, day: &str) -> CompletionEvent {
        CompletionEvent {
            stat_id: stat_id.to_string(),
            day: day.parse().unwrap(),
            name_snapshot: None,
            description_snapshot: None,
        }
    }

    #[tokio::test]
    async fn guest_rejects_second_event_for_same_day() {
        let path = scratch_dir("guest").join("save.json");
        let backend = GuestBackend::open(path.clone()).await;
        backend.insert_stat(&stat("a", 0)).await.unwrap();

        let tally = backend.insert_event(&event("a", "2026-02-01")).await.unwrap();
        assert_eq!(tally, Tally { stat_points: 1, total_xp: 1 });
        assert!(matches!(
            backend.insert_event(&event("a", "2026-02-01")).await,
            Err(StoreError::Duplicate)
        ));

        let reopened = GuestBackend::open(path).await;
        assert_eq!(reopened.fetch_events().await.unwrap().len(), 1);
        let profile = reopened.fetch_profile().await.unwrap().unwrap();
        assert_eq!(profile.total_xp, 1);
    }

    #[tokio::test]
    async fn guest_profile_update_keeps_xp() {
        let backend = GuestBackend::open(scratch_dir("guest").join("save.json")).await;
        backend.insert_stat(&stat("a", 0)).await.unwrap();
        backend.insert_event(&event("a", "2026-02-01")).await.unwrap();

        let profile = Profile {
            character_name: "Nova".to_string(),
            total_xp: 999,
            ..Profile::default()
        };
        backend.update_profile(&profile).await.unwrap();

        let stored = backend.fetch_profile().await.unwrap().unwrap();
        assert_eq!(stored.character_name, "Nova");
        assert_eq!(stored.total_xp, 1);
    }

    #[tokio::test]
    async fn guest_onboarding_lands_in_one_write() {
        let path = scratch_dir("guest").join("save.json");
        let backend = GuestBackend::open(path.clone()).await;
        let profile = Profile {
            character_name: "Nova".to_string(),
            onboarding_completed: true,
            ..Profile::default()
        };
        backend
            .complete_onboarding(&[stat("a", 0), stat("b", 1), stat("c", 2)], &profile)
            .await
            .unwrap();

        let reopened = GuestBackend::open(path).await;
        assert_eq!(reopened.fetch_stats().await.unwrap().len(), 3);
        assert!(reopened.fetch_profile().await.unwrap().unwrap().onboarding_completed);
    }

    #[tokio::test]
    async fn guest_reset_and_discard() {
        let path = scratch_dir("guest").join("save.json");
        let backend = GuestBackend::open(path.clone()).await;
        backend.insert_stat(&stat("a", 0)).await.unwrap();
        backend.insert_event(&event("a", "2026-02-01")).await.unwrap();

        backend.reset_progress().await.unwrap();
        assert!(backend.fetch_events().await.unwrap().is_empty());
        assert_eq!(backend.fetch_stats().await.unwrap()[0].total_points, 0);

        backend.discard().await.unwrap();
        assert!(!path.exists());
        assert!(backend.leaderboard(10).await.unwrap().is_empty());
    }
}
