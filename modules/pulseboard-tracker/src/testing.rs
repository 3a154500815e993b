// Test doubles for the tracker's trait boundaries.
//
// Two mocks matching the two seams:
// - MockFeed (SocialFeed): HashMap-registered posts/replies/likers with
//   per-key failure injection and a call counter for scheduler tests.
// - MemoryStore (EngagementStore): stateful in-memory store whose upsert
//   and like semantics mirror the SQL, with leaderboard reads going through
//   `ranking::rank_suggestions`.
//
// Plus fixture constructors for replies and suggestion rows.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use pulseboard_common::{
    AccountPost, LeaderboardEntry, LeaderboardQuery, Liker, ReplyRecord,
};

use crate::ranking;
use crate::store::Suggestion;
use crate::traits::{EngagementStore, SocialFeed, UpsertOutcome};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn make_reply(tweet_id: &str, handle: &str, likes: i64) -> ReplyRecord {
    ReplyRecord {
        tweet_id: tweet_id.to_string(),
        author_id: format!("u-{handle}"),
        author_handle: handle.to_string(),
        content: format!("reply {tweet_id}"),
        like_count: likes,
        retweet_count: 0,
        reply_count: 0,
    }
}

pub fn make_suggestion(
    tweet_id: &str,
    handle: &str,
    likes: i64,
    first_seen_at: DateTime<Utc>,
) -> Suggestion {
    Suggestion {
        id: 0,
        tweet_id: tweet_id.to_string(),
        author_id: format!("u-{handle}"),
        author_handle: handle.to_string(),
        content: format!("suggestion {tweet_id}"),
        like_count: likes,
        retweet_count: 0,
        reply_count: 0,
        category: None,
        first_seen_at,
        updated_at: first_seen_at,
    }
}

// ---------------------------------------------------------------------------
// MockFeed
// ---------------------------------------------------------------------------

/// Builder-style social feed. Returns `Err` for unregistered reply/liker
/// lookups so a test can't silently pass on a typo'd id.
#[derive(Default)]
pub struct MockFeed {
    posts: Vec<AccountPost>,
    replies: HashMap<String, Vec<ReplyRecord>>,
    failing_replies: HashSet<String>,
    likers: HashMap<String, Vec<Liker>>,
    failing_likers: HashSet<String>,
    posts_fail: bool,
    post_calls: AtomicU32,
}

impl MockFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_post(mut self, tweet_id: &str, impressions: i64) -> Self {
        self.posts.push(AccountPost {
            tweet_id: tweet_id.to_string(),
            impressions,
        });
        self
    }

    pub fn with_replies(mut self, post_id: &str, replies: Vec<ReplyRecord>) -> Self {
        self.replies.insert(post_id.to_string(), replies);
        self
    }

    pub fn fail_replies(mut self, post_id: &str) -> Self {
        self.failing_replies.insert(post_id.to_string());
        self
    }

    pub fn with_likers(mut self, reply_id: &str, likers: Vec<Liker>) -> Self {
        self.likers.insert(reply_id.to_string(), likers);
        self
    }

    pub fn fail_likers(mut self, reply_id: &str) -> Self {
        self.failing_likers.insert(reply_id.to_string());
        self
    }

    /// Make the account-post listing itself fail (the fatal path).
    pub fn fail_posts(mut self) -> Self {
        self.posts_fail = true;
        self
    }

    /// How many times the account timeline was listed. One refresh cycle
    /// makes exactly one listing call, so this counts cycles.
    pub fn post_calls(&self) -> u32 {
        self.post_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SocialFeed for MockFeed {
    async fn account_posts(&self, limit: u32) -> Result<Vec<AccountPost>> {
        self.post_calls.fetch_add(1, Ordering::SeqCst);
        if self.posts_fail {
            bail!("MockFeed: account listing failure");
        }
        Ok(self.posts.iter().take(limit as usize).cloned().collect())
    }

    async fn replies(&self, tweet_id: &str, limit: u32) -> Result<Vec<ReplyRecord>> {
        if self.failing_replies.contains(tweet_id) {
            bail!("MockFeed: reply fetch failure for {tweet_id}");
        }
        self.replies
            .get(tweet_id)
            .map(|r| r.iter().take(limit as usize).cloned().collect())
            .ok_or_else(|| anyhow::anyhow!("MockFeed: no replies registered for {tweet_id}"))
    }

    async fn likers(&self, tweet_id: &str) -> Result<Vec<Liker>> {
        if self.failing_likers.contains(tweet_id) {
            bail!("MockFeed: likers fetch failure for {tweet_id}");
        }
        self.likers
            .get(tweet_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("MockFeed: no likers registered for {tweet_id}"))
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory engagement store mirroring the Postgres semantics: upsert by
/// external id preserving first-capture fields, set-backed like dedup, and
/// the singleton tracker state.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<Suggestion>>,
    likes: Mutex<HashSet<(String, String, String)>>,
    tracked: Mutex<Option<String>>,
    last_refresh: Mutex<Option<DateTime<Utc>>>,
    next_id: AtomicI64,
}

impl MemoryStore {
    pub fn rows(&self) -> Vec<Suggestion> {
        self.rows.lock().unwrap().clone()
    }

    pub fn like_events(&self) -> usize {
        self.likes.lock().unwrap().len()
    }

    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        *self.last_refresh.lock().unwrap()
    }

    pub fn set_tracked(&self, tweet_id: &str) {
        *self.tracked.lock().unwrap() = Some(tweet_id.to_string());
    }

    /// Backdate a row for time-window tests.
    pub fn set_first_seen(&self, tweet_id: &str, at: DateTime<Utc>) {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|r| r.tweet_id == tweet_id) {
            row.first_seen_at = at;
        }
    }
}

#[async_trait]
impl EngagementStore for MemoryStore {
    async fn upsert_reply(&self, reply: &ReplyRecord) -> Result<UpsertOutcome> {
        let mut rows = self.rows.lock().unwrap();
        let now = Utc::now();

        match rows.iter_mut().find(|r| r.tweet_id == reply.tweet_id) {
            Some(row) => {
                row.like_count = reply.like_count;
                row.retweet_count = reply.retweet_count;
                row.reply_count = reply.reply_count;
                row.updated_at = now;
                Ok(UpsertOutcome::Updated)
            }
            None => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                rows.push(Suggestion {
                    id,
                    tweet_id: reply.tweet_id.clone(),
                    author_id: reply.author_id.clone(),
                    author_handle: reply.author_handle.clone(),
                    content: reply.content.clone(),
                    like_count: reply.like_count,
                    retweet_count: reply.retweet_count,
                    reply_count: reply.reply_count,
                    category: None,
                    first_seen_at: now,
                    updated_at: now,
                });
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    async fn reply_ids(&self) -> Result<Vec<String>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.tweet_id.clone())
            .collect())
    }

    async fn record_like(&self, reply_tweet_id: &str, liker: &Liker) -> Result<bool> {
        Ok(self.likes.lock().unwrap().insert((
            reply_tweet_id.to_string(),
            liker.user_id.clone(),
            "like".to_string(),
        )))
    }

    async fn leaderboard(&self, query: &LeaderboardQuery) -> Result<Vec<LeaderboardEntry>> {
        let rows = self.rows.lock().unwrap();
        Ok(ranking::rank_suggestions(&rows, query, Utc::now()))
    }

    async fn comment_counts(&self) -> Result<(i64, i64)> {
        let rows = self.rows.lock().unwrap();
        let contributors: HashSet<&str> =
            rows.iter().map(|r| r.author_handle.as_str()).collect();
        Ok((rows.len() as i64, contributors.len() as i64))
    }

    async fn top_suggestions(&self) -> Result<Vec<Suggestion>> {
        let mut rows = self.rows.lock().unwrap().clone();
        rows.sort_by(|a, b| b.like_count.cmp(&a.like_count).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn set_category(&self, tweet_id: &str, category: &str) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|r| r.tweet_id == tweet_id) {
            row.category = Some(category.to_string());
            row.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn tracked_tweet_id(&self) -> Result<Option<String>> {
        Ok(self.tracked.lock().unwrap().clone())
    }

    async fn set_tracked_tweet_id(&self, tweet_id: &str) -> Result<()> {
        *self.tracked.lock().unwrap() = Some(tweet_id.to_string());
        Ok(())
    }

    async fn mark_refreshed(&self) -> Result<()> {
        *self.last_refresh.lock().unwrap() = Some(Utc::now());
        Ok(())
    }
}
