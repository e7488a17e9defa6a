use crate::day::DayKey;
use crate::progression::Progress;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StatColor {
    Strength,
    Intelligence,
    Endurance,
    #[default]
    Primary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stat {
    pub id: String,
    pub name: String,
    pub emoji: String,
    pub color: StatColor,
    #[serde(default)]
    pub description: Option<String>,
    pub order_index: u32,
    #[serde(default)]
    pub total_points: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub stat_id: String,
    pub day: DayKey,
    #[serde(default)]
    pub name_snapshot: Option<String>,
    #[serde(default)]
    pub description_snapshot: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorConfig {
    pub token: String,
    pub owner: String,
    pub repo: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub character_name: String,
    pub avatar: String,
    #[serde(default)]
    pub total_xp: u64,
    #[serde(default)]
    pub onboarding_completed: bool,
    #[serde(default)]
    pub mirror: Option<MirrorConfig>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            character_name: "Hero".to_string(),
            avatar: "🧑‍🚀".to_string(),
            total_xp: 0,
            onboarding_completed: false,
            mirror: None,
        }
    }
}

/// Counters returned by a backend after it committed a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub stat_points: u64,
    pub total_xp: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatDraft {
    pub name: String,
    #[serde(default = "default_emoji")]
    pub emoji: String,
    #[serde(default)]
    pub color: StatColor,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_emoji() -> String {
    "⭐".to_string()
}

impl StatDraft {
    /// Starting set offered to a new character.
    pub fn defaults() -> Vec<StatDraft> {
        [
            ("Strength", "💪", StatColor::Strength, "Exercise or workout"),
            ("Intelligence", "📚", StatColor::Intelligence, "Read or learn something new"),
            ("Endurance", "🧘", StatColor::Endurance, "Meditate or practice mindfulness"),
        ]
        .into_iter()
        .map(|(name, emoji, color, description)| StatDraft {
            name: name.to_string(),
            emoji: emoji.to_string(),
            color,
            description: Some(description.to_string()),
        })
        .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatPatch {
    pub name: Option<String>,
    pub emoji: Option<String>,
    pub color: Option<StatColor>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OnboardingRequest {
    pub character_name: String,
    pub avatar: String,
    #[serde(default)]
    pub stats: Vec<StatDraft>,
}

#[derive(Debug, Deserialize)]
pub struct CharacterRequest {
    pub character_name: String,
    pub avatar: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GuestSessionResponse {
    pub guest_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionOutcome {
    pub stat_id: String,
    pub day: DayKey,
    pub stat_points: u64,
    pub leveled_up: bool,
    pub new_level: u64,
    pub progress: Progress,
}

#[derive(Debug, Serialize)]
pub struct StatCard {
    #[serde(flatten)]
    pub stat: Stat,
    pub can_complete: bool,
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub today: DayKey,
    pub character_name: String,
    pub avatar: String,
    pub onboarding_completed: bool,
    pub mirror_connected: bool,
    pub progress: Progress,
    pub stats: Vec<StatCard>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub character_name: String,
    pub avatar: String,
    pub total_xp: u64,
    pub level: u64,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackCategory {
    #[default]
    Feature,
    Bug,
    Content,
    Other,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    #[serde(default)]
    pub category: FeedbackCategory,
    pub message: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// A stored improvement request. Guests submit without a user id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub category: FeedbackCategory,
    pub message: String,
    pub email: Option<String>,
    pub user_id: Option<String>,
    pub submitted_at: DateTime<Utc>,
}
