//! Completion logging: at most one completion per stat and day, each worth one point.

use crate::day::DayKey;
use crate::errors::{QuestError, StoreError};
use crate::mirror::{MirrorEntry, spawn_append};
use crate::models::{CompletionEvent, CompletionOutcome};
use crate::progression::{Progress, level, leveled_up};
use crate::tracker::Tracker;
use std::sync::Arc;
use tracing::info;

impl Tracker {
    pub async fn can_complete_on(&self, stat_id: &str, today: DayKey) -> bool {
        !self.view.lock().await.completed_on(stat_id, today)
    }

    /// Records the completion for `today`.
    ///
    /// The backend insert is the guard against duplicates; the cached check only
    /// short-circuits the common repeat click.
    pub async fn complete_on(
        &self,
        stat_id: &str,
        today: DayKey,
    ) -> Result<CompletionOutcome, QuestError> {
        let mut view = self.view.lock().await;
        if view.completed_on(stat_id, today) {
            return Err(QuestError::AlreadyCompletedToday(stat_id.to_string()));
        }

        let stat = view.stat(stat_id)?;
        let event = CompletionEvent {
            stat_id: stat.id.clone(),
            day: today,
            name_snapshot: Some(stat.name.clone()),
            description_snapshot: stat.description.clone(),
        };
        let habit = stat.name.clone();

        let tally = match self.backend.insert_event(&event).await {
            Ok(tally) => tally,
            Err(StoreError::Duplicate) => {
                return Err(QuestError::AlreadyCompletedToday(stat_id.to_string()));
            }
            Err(err) => return Err(err.into()),
        };

        let old_total = view.profile.total_xp;
        view.profile.total_xp = tally.total_xp;
        if let Some(stat) = view.stats.iter_mut().find(|stat| stat.id == stat_id) {
            stat.total_points = tally.stat_points;
        }
        view.events.push(event);

        let new_level = level(tally.total_xp);
        let leveled_up = leveled_up(old_total, tally.total_xp);
        if leveled_up {
            info!(stat_id, level = new_level, "level up");
        } else {
            info!(stat_id, day = %today, xp = tally.total_xp, "completion recorded");
        }

        if let Some(config) = view.profile.mirror.clone() {
            spawn_append(Arc::clone(&self.mirror), config, MirrorEntry::now(habit));
        }

        Ok(CompletionOutcome {
            stat_id: stat_id.to_string(),
            day: today,
            stat_points: tally.stat_points,
            leveled_up,
            new_level,
            progress: Progress::from_points(tally.total_xp),
        })
    }

    /// Deletes every completion and zeroes points and XP. Stats and character stay.
    pub async fn reset_progress(&self) -> Result<(), QuestError> {
        let mut view = self.view.lock().await;
        self.backend.reset_progress().await?;
        view.events.clear();
        view.profile.total_xp = 0;
        for stat in &mut view.stats {
            stat.total_points = 0;
        }
        info!("progress reset");
        Ok(())
    }
}
