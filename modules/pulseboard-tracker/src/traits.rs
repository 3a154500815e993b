// Trait abstractions for the tracker's two external collaborators.
//
// SocialFeed is the social-platform client (account timeline, replies, likers).
// EngagementStore is persistence for suggestion replies, engagement events,
//   and the singleton tracker state. All aggregate reads flow through it too.
//
// These enable deterministic testing with MockFeed and MemoryStore:
// no network, no database, no Docker.

use anyhow::Result;
use async_trait::async_trait;

use pulseboard_common::{
    AccountPost, LeaderboardEntry, LeaderboardQuery, Liker, ReplyRecord,
};

use crate::store::Suggestion;

#[async_trait]
pub trait SocialFeed: Send + Sync {
    /// Most recent top-level posts from the tracked account, newest first.
    /// Excludes reposts and replies authored by the account itself.
    async fn account_posts(&self, limit: u32) -> Result<Vec<AccountPost>>;

    /// Replies in a post's conversation thread, excluding the account's own.
    async fn replies(&self, tweet_id: &str, limit: u32) -> Result<Vec<ReplyRecord>>;

    /// Users who liked a post.
    async fn likers(&self, tweet_id: &str) -> Result<Vec<Liker>>;
}

/// Whether an upsert created a new row or refreshed an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

#[async_trait]
pub trait EngagementStore: Send + Sync {
    /// Atomically insert the reply or, if its external id is already known,
    /// overwrite the three engagement counters and bump `updated_at`.
    /// `first_seen_at`, `content`, and `author_handle` are never touched on update.
    async fn upsert_reply(&self, reply: &ReplyRecord) -> Result<UpsertOutcome>;

    /// External ids of every reply currently in the store.
    async fn reply_ids(&self) -> Result<Vec<String>>;

    /// Record a "like" engagement event. Returns false if this (reply, user)
    /// pair was already recorded; duplicates are absorbed, never an error.
    async fn record_like(&self, reply_tweet_id: &str, liker: &Liker) -> Result<bool>;

    /// Ranked leaderboard over the current store state.
    async fn leaderboard(&self, query: &LeaderboardQuery) -> Result<Vec<LeaderboardEntry>>;

    /// (total replies, distinct contributor handles).
    async fn comment_counts(&self) -> Result<(i64, i64)>;

    /// All suggestions ordered by like count descending (categorizer input).
    async fn top_suggestions(&self) -> Result<Vec<Suggestion>>;

    /// Assign a poll category to a reply.
    async fn set_category(&self, tweet_id: &str, category: &str) -> Result<()>;

    /// The tracked post id gating the poll cycle; `None` means untracked.
    async fn tracked_tweet_id(&self) -> Result<Option<String>>;

    async fn set_tracked_tweet_id(&self, tweet_id: &str) -> Result<()>;

    /// Stamp the shared last-refresh timestamp.
    async fn mark_refreshed(&self) -> Result<()>;
}
