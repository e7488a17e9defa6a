use serde::Serialize;

pub const POINTS_PER_LEVEL: u64 = 10;

pub fn level(total_points: u64) -> u64 {
    total_points / POINTS_PER_LEVEL + 1
}

pub fn progress_percent(total_points: u64) -> f64 {
    (total_points % POINTS_PER_LEVEL) as f64 / POINTS_PER_LEVEL as f64 * 100.0
}

/// Points still needed for the next level. A fresh level reports a full 10, never 0.
pub fn points_to_next_level(total_points: u64) -> u64 {
    POINTS_PER_LEVEL - total_points % POINTS_PER_LEVEL
}

pub fn leveled_up(old_total: u64, new_total: u64) -> bool {
    level(new_total) > level(old_total)
}

pub fn title_for_level(level: u64) -> &'static str {
    match level {
        0..=2 => "New Traveler",
        3..=4 => "Apprentice",
        5..=9 => "Adventurer",
        10..=19 => "Veteran",
        20..=49 => "Champion",
        _ => "Legend",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progress {
    pub total_xp: u64,
    pub level: u64,
    pub progress_percent: f64,
    pub points_to_next_level: u64,
    pub title: &'static str,
}

impl Progress {
    pub fn from_points(total_points: u64) -> Self {
        let level = level(total_points);
        Self {
            total_xp: total_points,
            level,
            progress_percent: progress_percent(total_points),
            points_to_next_level: points_to_next_level(total_points),
            title: title_for_level(level),
        }
    }
}
