use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A reply captured from the tracked account's conversation threads,
/// normalized from the platform's raw tweet shape. Produced by a pure
/// mapping step in the feed adapter; the platform type is never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyRecord {
    pub tweet_id: String,
    pub author_id: String,
    pub author_handle: String,
    pub content: String,
    pub like_count: i64,
    pub retweet_count: i64,
    pub reply_count: i64,
}

/// A top-level post on the tracked account's timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountPost {
    pub tweet_id: String,
    pub impressions: i64,
}

/// A user who liked a tracked reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Liker {
    pub user_id: String,
    pub handle: String,
}

/// Leaderboard time window. The cutoff is inclusive: a row first seen
/// exactly at `now - window` is in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "24h")]
    Day,
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
    #[default]
    #[serde(rename = "all")]
    All,
}

impl TimeRange {
    /// Earliest `first_seen_at` admitted by this window, or `None` for no filter.
    pub fn cutoff(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            TimeRange::Day => Some(now - Duration::hours(24)),
            TimeRange::Week => Some(now - Duration::days(7)),
            TimeRange::Month => Some(now - Duration::days(30)),
            TimeRange::All => None,
        }
    }
}

/// Parameters for a leaderboard read.
#[derive(Debug, Clone)]
pub struct LeaderboardQuery {
    pub limit: i64,
    pub search: Option<String>,
    pub time_range: TimeRange,
}

impl Default for LeaderboardQuery {
    fn default() -> Self {
        Self {
            limit: 50,
            search: None,
            time_range: TimeRange::All,
        }
    }
}

/// One ranked leaderboard row. Computed per query, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub handle: String,
    pub comments: i64,
    pub likes: i64,
    pub points: i64,
}

/// Leaderboard score: two points per comment, one per like.
/// A fixed design constant, preserved for parity with the original tracker.
pub fn points(comments: i64, likes: i64) -> i64 {
    likes + comments * 2
}

/// Aggregate engagement stats for the dashboard.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementStats {
    pub impressions: i64,
    pub total_comments: i64,
    pub total_contributors: i64,
}
