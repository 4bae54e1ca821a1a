use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use chrono::Datelike;

use crate::library::VideoSummary;

/// Month buckets of one scan, each bucket's IDs in scan order
pub type MonthIndex = HashMap<MonthKey, Vec<String>>;

/// Best-effort byte sizes keyed by video ID. Absence means the size is
/// unknown, never that it is zero.
pub type SizeIndex = HashMap<String, u64>;

/// Calendar month a video belongs to, derived from its creation date in UTC.
/// Videos without a creation date fall into `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonthKey {
    Unknown,
    YearMonth { year: i32, month: u32 },
}

impl MonthKey {
    pub fn of(video: &VideoSummary) -> Self {
        match video.created_at {
            Some(at) => MonthKey::YearMonth {
                year: at.year(),
                month: at.month(),
            },
            None => MonthKey::Unknown,
        }
    }

    pub fn id(&self) -> String {
        match self {
            MonthKey::Unknown => "unknown".to_string(),
            MonthKey::YearMonth { year, month } => format!("{year:04}-{month:02}"),
        }
    }

    pub fn display_text(&self) -> String {
        match self {
            MonthKey::Unknown => "Unknown".to_string(),
            MonthKey::YearMonth { year, month } => format!("{year:04}-{month:02}"),
        }
    }

    /// Most recent month first. `Unknown` sorts after every known month no
    /// matter which argument it appears as, so this is deliberately not a
    /// total order and `MonthKey` does not implement `Ord`.
    pub fn cmp_recent_first(a: &MonthKey, b: &MonthKey) -> Ordering {
        match (a, b) {
            (MonthKey::Unknown, MonthKey::Unknown) => Ordering::Equal,
            (MonthKey::Unknown, _) => Ordering::Greater,
            (_, MonthKey::Unknown) => Ordering::Less,
            (
                MonthKey::YearMonth { year: ya, month: ma },
                MonthKey::YearMonth { year: yb, month: mb },
            ) => yb.cmp(ya).then(mb.cmp(ma)),
        }
    }

    /// Oldest month first, with `Unknown` still after every known month
    pub fn cmp_oldest_first(a: &MonthKey, b: &MonthKey) -> Ordering {
        match (a, b) {
            (MonthKey::Unknown, MonthKey::Unknown) => Ordering::Equal,
            (MonthKey::Unknown, _) => Ordering::Greater,
            (_, MonthKey::Unknown) => Ordering::Less,
            (
                MonthKey::YearMonth { year: ya, month: ma },
                MonthKey::YearMonth { year: yb, month: mb },
            ) => ya.cmp(yb).then(ma.cmp(mb)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthSummary {
    pub key: MonthKey,
    pub count: usize,
}

/// Known months of one calendar year, newest month first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthYearGroup {
    pub year: i32,
    pub months: Vec<MonthSummary>,
}

impl MonthYearGroup {
    pub fn total_count(&self) -> usize {
        self.months.iter().map(|m| m.count).sum()
    }
}

/// Bucket videos by month, keeping each bucket in input order
pub fn build_month_index(videos: &[VideoSummary]) -> MonthIndex {
    let mut index = MonthIndex::new();
    for video in videos {
        index
            .entry(MonthKey::of(video))
            .or_default()
            .push(video.id.clone());
    }
    index
}

/// Per-month counts, most recent month first and `Unknown` last
pub fn month_summaries(videos: &[VideoSummary]) -> Vec<MonthSummary> {
    let index = build_month_index(videos);
    let mut summaries: Vec<MonthSummary> = index
        .into_iter()
        .map(|(key, ids)| MonthSummary {
            key,
            count: ids.len(),
        })
        .collect();
    summaries.sort_by(|a, b| MonthKey::cmp_recent_first(&a.key, &b.key));
    summaries
}

/// Known months grouped by year (newest year first), with the `Unknown`
/// bucket split off so callers can render it separately
pub fn year_groups(videos: &[VideoSummary]) -> (Vec<MonthYearGroup>, Option<MonthSummary>) {
    let summaries = month_summaries(videos);
    let mut groups: Vec<MonthYearGroup> = Vec::new();
    let mut unknown = None;

    for summary in summaries {
        match summary.key {
            MonthKey::Unknown => unknown = Some(summary),
            MonthKey::YearMonth { year, .. } => {
                match groups.last_mut() {
                    Some(group) if group.year == year => group.months.push(summary),
                    _ => groups.push(MonthYearGroup {
                        year,
                        months: vec![summary],
                    }),
                }
            }
        }
    }

    (groups, unknown)
}

/// Every video falling in one of the given months, in the order the videos
/// were listed. An empty month list selects nothing.
pub fn asset_ids_for_months(videos: &[VideoSummary], months: &[MonthKey]) -> Vec<String> {
    if months.is_empty() {
        return Vec::new();
    }
    let wanted: HashSet<&MonthKey> = months.iter().collect();
    videos
        .iter()
        .filter(|v| wanted.contains(&MonthKey::of(v)))
        .map(|v| v.id.clone())
        .collect()
}

/// The `n` largest videos among those with a known size. Videos absent from
/// `sizes` never qualify, however large they might actually be. Ties break
/// newest-first with unknown dates last, then by ID.
pub fn top_n_asset_ids_by_size(
    videos: &[VideoSummary],
    sizes: &SizeIndex,
    n: usize,
) -> Vec<String> {
    let mut sized: Vec<(&VideoSummary, u64)> = videos
        .iter()
        .filter_map(|v| sizes.get(&v.id).map(|&bytes| (v, bytes)))
        .collect();

    sized.sort_by(|(a, sa), (b, sb)| {
        sb.cmp(sa)
            .then_with(|| match (b.created_at, a.created_at) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Greater,
                (None, Some(_)) => Ordering::Less,
                (None, None) => Ordering::Equal,
            })
            .then_with(|| a.id.cmp(&b.id))
    });

    sized.into_iter().take(n).map(|(v, _)| v.id.clone()).collect()
}
