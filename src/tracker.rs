use crate::backend::Backend;
use crate::day::DayKey;
use crate::errors::QuestError;
use crate::history::{self, DayCount, HistoryResponse};
use crate::leaderboard::MAX_LIMIT;
use crate::mirror::MirrorSink;
use crate::models::{CompletionEvent, Dashboard, LeaderboardEntry, Profile, Stat, StatCard};
use crate::progression::Progress;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory copy of one session's data, kept in step with every committed mutation.
#[derive(Debug, Clone)]
pub(crate) struct View {
    pub(crate) profile: Profile,
    pub(crate) stats: Vec<Stat>,
    pub(crate) events: Vec<CompletionEvent>,
}

impl View {
    pub(crate) fn completed_on(&self, stat_id: &str, day: DayKey) -> bool {
        self.events
            .iter()
            .any(|event| event.stat_id == stat_id && event.day == day)
    }

    pub(crate) fn stat(&self, stat_id: &str) -> Result<&Stat, QuestError> {
        self.stats
            .iter()
            .find(|stat| stat.id == stat_id)
            .ok_or_else(|| QuestError::StatNotFound(stat_id.to_string()))
    }
}

/// Session-scoped entry point to the ledger, registry and derived views.
///
/// The backend stays the source of truth: `open` loads from it, and every change is
/// written there before the view is touched.
pub struct Tracker {
    pub(crate) backend: Arc<dyn Backend>,
    pub(crate) mirror: Arc<dyn MirrorSink>,
    pub(crate) view: Mutex<View>,
}

impl Tracker {
    pub async fn open(
        backend: Arc<dyn Backend>,
        mirror: Arc<dyn MirrorSink>,
    ) -> Result<Self, QuestError> {
        let profile = match backend.fetch_profile().await? {
            Some(profile) => profile,
            None => {
                let profile = Profile::default();
                backend.update_profile(&profile).await?;
                profile
            }
        };
        let stats = backend.fetch_stats().await?;
        let events = backend.fetch_events().await?;
        debug!(
            stats = stats.len(),
            events = events.len(),
            "session data loaded"
        );

        Ok(Self {
            backend,
            mirror,
            view: Mutex::new(View {
                profile,
                stats,
                events,
            }),
        })
    }

    pub async fn profile(&self) -> Profile {
        self.view.lock().await.profile.clone()
    }

    pub async fn stats(&self) -> Vec<Stat> {
        self.view.lock().await.stats.clone()
    }

    pub async fn events(&self) -> Vec<CompletionEvent> {
        self.view.lock().await.events.clone()
    }

    pub async fn progress(&self) -> Progress {
        Progress::from_points(self.view.lock().await.profile.total_xp)
    }

    pub async fn dashboard_on(&self, today: DayKey) -> Dashboard {
        let view = self.view.lock().await;
        Dashboard {
            today,
            character_name: view.profile.character_name.clone(),
            avatar: view.profile.avatar.clone(),
            onboarding_completed: view.profile.onboarding_completed,
            mirror_connected: view.profile.mirror.is_some(),
            progress: Progress::from_points(view.profile.total_xp),
            stats: view
                .stats
                .iter()
                .map(|stat| StatCard {
                    can_complete: !view.completed_on(&stat.id, today),
                    stat: stat.clone(),
                })
                .collect(),
        }
    }

    pub async fn current_streak_on(&self, today: DayKey) -> u32 {
        history::current_streak_at(today, &self.view.lock().await.events)
    }

    pub async fn heatmap(&self, start: DayKey, end: DayKey) -> Result<Vec<DayCount>, QuestError> {
        if start > end {
            return Err(QuestError::Invalid(format!(
                "range start {start} is after end {end}"
            )));
        }
        if (end.date() - start.date()).num_days() > history::MAX_HEATMAP_DAYS {
            return Err(QuestError::Invalid("range may span at most two years".into()));
        }
        Ok(history::heatmap(&self.view.lock().await.events, start, end))
    }

    pub async fn history_on(&self, today: DayKey, timeline_limit: usize) -> HistoryResponse {
        let view = self.view.lock().await;
        history::build_history_at(today, &view.events, &view.stats, timeline_limit)
    }

    /// Top profiles by XP. Guest sessions always see an empty board.
    pub async fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, QuestError> {
        Ok(self.backend.leaderboard(limit.min(MAX_LIMIT)).await?)
    }
}
