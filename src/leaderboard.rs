use crate::models::{LeaderboardEntry, Profile};
use crate::progression::{level, title_for_level};

pub const DEFAULT_LIMIT: usize = 20;
pub const MAX_LIMIT: usize = 100;

/// Orders profiles by XP, highest first; ties fall back to the user id.
pub fn rank<'a>(
    profiles: impl IntoIterator<Item = (&'a str, &'a Profile)>,
    limit: usize,
) -> Vec<LeaderboardEntry> {
    let mut rows: Vec<(&str, &Profile)> = profiles.into_iter().collect();
    rows.sort_by(|(left_id, left), (right_id, right)| {
        right
            .total_xp
            .cmp(&left.total_xp)
            .then_with(|| left_id.cmp(right_id))
    });

    rows.into_iter()
        .take(limit)
        .map(|(user_id, profile)| {
            let level = level(profile.total_xp);
            LeaderboardEntry {
                user_id: user_id.to_string(),
                character_name: profile.character_name.clone(),
                avatar: profile.avatar.clone(),
                total_xp: profile.total_xp,
                level,
                title: title_for_level(level).to_string(),
            }
        })
        .collect()
}
