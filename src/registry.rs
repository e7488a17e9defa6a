//! The user's set of stats and the character they belong to.

use crate::errors::QuestError;
use crate::models::{MirrorConfig, Stat, StatDraft, StatPatch};
use crate::tracker::Tracker;
use tracing::info;
use uuid::Uuid;

pub const MIN_STATS: usize = 3;
pub const MAX_STATS: usize = 6;
pub const MAX_CHARACTER_NAME: usize = 20;

fn validate_name(name: &str) -> Result<String, QuestError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(QuestError::Invalid("stat name must not be empty".into()));
    }
    Ok(name.to_string())
}

fn validate_character(name: &str, avatar: &str) -> Result<(String, String), QuestError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(QuestError::Invalid("character name must not be empty".into()));
    }
    if name.chars().count() > MAX_CHARACTER_NAME {
        return Err(QuestError::Invalid(format!(
            "character name is limited to {MAX_CHARACTER_NAME} characters"
        )));
    }
    let avatar = avatar.trim();
    if avatar.is_empty() {
        return Err(QuestError::Invalid("avatar must not be empty".into()));
    }
    Ok((name.to_string(), avatar.to_string()))
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn new_stat(draft: StatDraft, order_index: u32) -> Result<Stat, QuestError> {
    Ok(Stat {
        id: Uuid::new_v4().to_string(),
        name: validate_name(&draft.name)?,
        emoji: draft.emoji,
        color: draft.color,
        description: normalize_description(draft.description),
        order_index,
        total_points: 0,
    })
}

fn next_order_index(stats: &[Stat]) -> u32 {
    stats
        .iter()
        .map(|stat| stat.order_index + 1)
        .max()
        .unwrap_or(0)
}

impl Tracker {
    /// Creates the character and its starting stats in one step.
    ///
    /// Stats added before onboarding are kept and count towards the bounds.
    pub async fn onboard(
        &self,
        character_name: String,
        avatar: String,
        drafts: Vec<StatDraft>,
    ) -> Result<(), QuestError> {
        let mut view = self.view.lock().await;
        if view.profile.onboarding_completed {
            return Err(QuestError::AlreadyOnboarded);
        }
        let total = view.stats.len() + drafts.len();
        if total < MIN_STATS {
            return Err(QuestError::MinStatsRequired(MIN_STATS));
        }
        if total > MAX_STATS {
            return Err(QuestError::MaxStatsExceeded(MAX_STATS));
        }
        let (character_name, avatar) = validate_character(&character_name, &avatar)?;
        let first_index = next_order_index(&view.stats);
        let stats = drafts
            .into_iter()
            .zip(first_index..)
            .map(|(draft, order_index)| new_stat(draft, order_index))
            .collect::<Result<Vec<_>, _>>()?;

        let mut profile = view.profile.clone();
        profile.character_name = character_name;
        profile.avatar = avatar;
        profile.onboarding_completed = true;
        self.backend.complete_onboarding(&stats, &profile).await?;
        view.stats.extend(stats);
        view.profile = profile;

        info!(stats = view.stats.len(), "onboarding completed");
        Ok(())
    }

    pub async fn update_character(&self, character_name: &str, avatar: &str) -> Result<(), QuestError> {
        let (character_name, avatar) = validate_character(character_name, avatar)?;
        let mut view = self.view.lock().await;
        let mut profile = view.profile.clone();
        profile.character_name = character_name;
        profile.avatar = avatar;
        self.backend.update_profile(&profile).await?;
        view.profile = profile;
        Ok(())
    }

    pub async fn set_mirror(&self, config: MirrorConfig) -> Result<(), QuestError> {
        if [&config.token, &config.owner, &config.repo]
            .iter()
            .any(|field| field.trim().is_empty())
        {
            return Err(QuestError::Invalid("token, owner and repo are required".into()));
        }
        self.replace_mirror(Some(config)).await
    }

    pub async fn clear_mirror(&self) -> Result<(), QuestError> {
        self.replace_mirror(None).await
    }

    async fn replace_mirror(&self, config: Option<MirrorConfig>) -> Result<(), QuestError> {
        let mut view = self.view.lock().await;
        let mut profile = view.profile.clone();
        profile.mirror = config;
        self.backend.update_profile(&profile).await?;
        view.profile = profile;
        Ok(())
    }

    pub async fn add_stat(&self, draft: StatDraft) -> Result<Stat, QuestError> {
        let mut view = self.view.lock().await;
        if view.stats.len() >= MAX_STATS {
            return Err(QuestError::MaxStatsExceeded(MAX_STATS));
        }
        let stat = new_stat(draft, next_order_index(&view.stats))?;

        self.backend.insert_stat(&stat).await?;
        view.stats.push(stat.clone());
        info!(stat_id = %stat.id, name = %stat.name, "stat added");
        Ok(stat)
    }

    /// Removes the stat. Its past completions stay in the log.
    pub async fn remove_stat(&self, stat_id: &str) -> Result<(), QuestError> {
        let mut view = self.view.lock().await;
        view.stat(stat_id)?;
        if view.stats.len() <= MIN_STATS {
            return Err(QuestError::MinStatsRequired(MIN_STATS));
        }

        self.backend.delete_stat(stat_id).await?;
        view.stats.retain(|stat| stat.id != stat_id);
        info!(stat_id, "stat removed");
        Ok(())
    }

    /// Edits display fields only; points and logged snapshots are untouched.
    pub async fn update_stat(&self, stat_id: &str, patch: StatPatch) -> Result<Stat, QuestError> {
        let mut view = self.view.lock().await;
        let mut stat = view.stat(stat_id)?.clone();
        if let Some(name) = patch.name {
            stat.name = validate_name(&name)?;
        }
        if let Some(emoji) = patch.emoji {
            stat.emoji = emoji;
        }
        if let Some(color) = patch.color {
            stat.color = color;
        }
        if patch.description.is_some() {
            stat.description = normalize_description(patch.description);
        }

        self.backend.update_stat(&stat).await?;
        if let Some(slot) = view.stats.iter_mut().find(|existing| existing.id == stat_id) {
            *slot = stat.clone();
        }
        Ok(stat)
    }
}
