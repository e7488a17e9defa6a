use crate::day::DayKey;
use crate::models::{CompletionEvent, Stat, StatColor};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

pub const STREAK_HORIZON_DAYS: i64 = 365;
pub const CALENDAR_WEEKS: i64 = 12;
pub const TIMELINE_DAYS: usize = 14;
/// Longest range a heatmap request may span.
pub const MAX_HEATMAP_DAYS: i64 = 730;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayCount {
    pub day: DayKey,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEntry {
    pub stat_id: String,
    pub name: Option<String>,
    pub emoji: Option<String>,
    pub color: Option<StatColor>,
    pub description: Option<String>,
    /// The stat was deleted; the entry shows the snapshot taken when it was logged.
    pub archived: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineDay {
    pub day: DayKey,
    pub entries: Vec<TimelineEntry>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub today: DayKey,
    pub current_streak: u32,
    pub total_completions: usize,
    pub calendar: Vec<Vec<DayCount>>,
    pub timeline: Vec<TimelineDay>,
}

pub fn build_history_at(
    today: DayKey,
    events: &[CompletionEvent],
    stats: &[Stat],
    timeline_limit: usize,
) -> HistoryResponse {
    HistoryResponse {
        today,
        current_streak: current_streak_at(today, events),
        total_completions: events.len(),
        calendar: calendar_at(today, events, CALENDAR_WEEKS),
        timeline: timeline(events, stats, timeline_limit),
    }
}

/// Consecutive active days ending today. An empty today does not end a live streak;
/// counting then starts from yesterday.
pub fn current_streak_at(today: DayKey, events: &[CompletionEvent]) -> u32 {
    let active: HashSet<DayKey> = events.iter().map(|event| event.day).collect();
    let mut streak = 0;
    for offset in 0..STREAK_HORIZON_DAYS {
        if active.contains(&today.days_ago(offset)) {
            streak += 1;
        } else if offset > 0 {
            break;
        }
    }
    streak
}

/// Completion counts for every day in `start..=end`, zero-filled.
pub fn heatmap(events: &[CompletionEvent], start: DayKey, end: DayKey) -> Vec<DayCount> {
    let counts = counts_by_day(events);
    let mut days = Vec::new();
    let mut cursor = Some(start);
    while let Some(day) = cursor.filter(|day| *day <= end) {
        days.push(DayCount {
            day,
            count: counts.get(&day).copied().unwrap_or(0),
        });
        cursor = day.next();
    }
    days
}

/// `weeks` rows of seven days each, oldest first, the last row ending today.
pub fn calendar_at(today: DayKey, events: &[CompletionEvent], weeks: i64) -> Vec<Vec<DayCount>> {
    if weeks <= 0 {
        return Vec::new();
    }
    let start = today.days_ago(weeks * 7 - 1);
    heatmap(events, start, today)
        .chunks(7)
        .map(|week| week.to_vec())
        .collect()
}

/// Most recent active days first, capped at `limit` days.
pub fn timeline(events: &[CompletionEvent], stats: &[Stat], limit: usize) -> Vec<TimelineDay> {
    let mut grouped: BTreeMap<DayKey, Vec<&CompletionEvent>> = BTreeMap::new();
    for event in events {
        grouped.entry(event.day).or_default().push(event);
    }

    grouped
        .into_iter()
        .rev()
        .take(limit)
        .map(|(day, events)| TimelineDay {
            day,
            entries: events
                .into_iter()
                .map(|event| resolve_entry(event, stats))
                .collect(),
        })
        .collect()
}

fn resolve_entry(event: &CompletionEvent, stats: &[Stat]) -> TimelineEntry {
    match stats.iter().find(|stat| stat.id == event.stat_id) {
        Some(stat) => TimelineEntry {
            stat_id: stat.id.clone(),
            name: Some(stat.name.clone()),
            emoji: Some(stat.emoji.clone()),
            color: Some(stat.color),
            description: stat.description.clone(),
            archived: false,
        },
        None => TimelineEntry {
            stat_id: event.stat_id.clone(),
            name: event.name_snapshot.clone(),
            emoji: None,
            color: None,
            description: event.description_snapshot.clone(),
            archived: true,
        },
    }
}

fn counts_by_day(events: &[CompletionEvent]) -> BTreeMap<DayKey, u32> {
    let mut counts = BTreeMap::new();
    for event in events {
        *counts.entry(event.day).or_insert(0) += 1;
    }
    counts
}
