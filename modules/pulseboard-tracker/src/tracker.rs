use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use pulseboard_common::{EngagementStats, LeaderboardEntry, LeaderboardQuery, ReplyRecord};

use crate::traits::{EngagementStore, SocialFeed, UpsertOutcome};

/// Max reply fetches in flight during a refresh cycle. Fetches run
/// concurrently; store writes are applied sequentially afterwards.
const REPLY_FETCH_CONCURRENCY: usize = 4;

/// Stats from one refresh cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RefreshStats {
    pub posts_fetched: u32,
    pub posts_failed: u32,
    /// Replies not previously in the store, i.e. the cycle's creation count.
    pub new_replies: u32,
    pub updated_replies: u32,
}

impl fmt::Display for RefreshStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} new, {} updated across {} posts ({} failed)",
            self.new_replies, self.updated_replies, self.posts_fetched, self.posts_failed
        )
    }
}

/// Reconciles the tracked account's reply threads into the engagement store
/// and serves the aggregate reads over it.
pub struct SuggestionTracker {
    feed: Arc<dyn SocialFeed>,
    store: Arc<dyn EngagementStore>,
    refresh_post_count: u32,
    reply_page_size: u32,
}

impl SuggestionTracker {
    pub fn new(
        feed: Arc<dyn SocialFeed>,
        store: Arc<dyn EngagementStore>,
        refresh_post_count: u32,
        reply_page_size: u32,
    ) -> Self {
        Self {
            feed,
            store,
            refresh_post_count,
            reply_page_size,
        }
    }

    /// Run one reconciliation cycle.
    ///
    /// Listing the account's posts is the one fatal fetch: without it no
    /// progress is possible. A per-post reply fetch failure is logged,
    /// counted, and skipped. Store failures propagate; a cycle that cannot
    /// write is a failed cycle, retried on the next tick.
    pub async fn refresh(&self) -> Result<RefreshStats> {
        let posts = self
            .feed
            .account_posts(self.refresh_post_count)
            .await
            .context("Failed to list account posts")?;

        if posts.is_empty() {
            info!("No posts found");
            return Ok(RefreshStats::default());
        }

        info!(posts = posts.len(), "Fetching replies for each post");

        let ids: Vec<String> = posts.iter().map(|post| post.tweet_id.clone()).collect();
        let fetched: Vec<(String, Result<Vec<ReplyRecord>>)> =
            stream::iter(ids.into_iter().map(|id| async move {
                let result = self.feed.replies(&id, self.reply_page_size).await;
                (id, result)
            }))
            .buffered(REPLY_FETCH_CONCURRENCY)
            .collect()
            .await;

        let mut stats = RefreshStats {
            posts_fetched: posts.len() as u32,
            ..Default::default()
        };

        for (post_id, result) in fetched {
            let replies = match result {
                Ok(replies) => replies,
                Err(e) => {
                    warn!(tweet_id = %post_id, error = %e, "Failed to fetch replies, skipping post");
                    stats.posts_failed += 1;
                    continue;
                }
            };

            for reply in replies {
                match self.store.upsert_reply(&reply).await? {
                    UpsertOutcome::Inserted => stats.new_replies += 1,
                    UpsertOutcome::Updated => stats.updated_replies += 1,
                }
            }
        }

        self.store.mark_refreshed().await?;
        info!(%stats, "Refresh complete");

        Ok(stats)
    }

    /// Secondary pass: record a like event per observed liker of every known
    /// reply. The store's unique constraint absorbs repeat observations; a
    /// likers fetch failure skips that reply and continues.
    pub async fn track_engagement(&self) -> Result<()> {
        let ids = self.store.reply_ids().await?;
        info!(replies = ids.len(), "Tracking engagement");

        for id in ids {
            let likers = match self.feed.likers(&id).await {
                Ok(likers) => likers,
                Err(e) => {
                    warn!(tweet_id = %id, error = %e, "Failed to fetch likers, skipping");
                    continue;
                }
            };

            for liker in likers {
                self.store.record_like(&id, &liker).await?;
            }
        }

        Ok(())
    }

    pub async fn leaderboard(&self, query: &LeaderboardQuery) -> Result<Vec<LeaderboardEntry>> {
        self.store.leaderboard(query).await
    }

    /// Dashboard stats. Impressions come from a live timeline fetch and
    /// degrade to zero on failure; the store counts are always real.
    pub async fn stats(&self) -> Result<EngagementStats> {
        let (total_comments, total_contributors) = self.store.comment_counts().await?;

        let impressions = match self.feed.account_posts(self.refresh_post_count).await {
            Ok(posts) => posts.iter().map(|p| p.impressions).sum(),
            Err(e) => {
                warn!(error = %e, "Failed to fetch impressions");
                0
            }
        };

        Ok(EngagementStats {
            impressions,
            total_comments,
            total_contributors,
        })
    }

    pub async fn tracked_tweet_id(&self) -> Result<Option<String>> {
        self.store.tracked_tweet_id().await
    }

    pub async fn set_tracked_tweet_id(&self, tweet_id: &str) -> Result<()> {
        self.store.set_tracked_tweet_id(tweet_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulseboard_common::Liker;

    use crate::testing::{make_reply, MemoryStore, MockFeed};

    fn tracker(feed: Arc<MockFeed>, store: Arc<MemoryStore>) -> SuggestionTracker {
        SuggestionTracker::new(feed, store, 50, 100)
    }

    #[tokio::test]
    async fn refresh_counts_only_new_rows() {
        let store = Arc::new(MemoryStore::default());
        let feed = Arc::new(
            MockFeed::new()
                .with_post("p1", 0)
                .with_replies("p1", vec![make_reply("r1", "bob", 5), make_reply("r2", "carol", 3)]),
        );

        let stats = tracker(feed.clone(), store.clone()).refresh().await.unwrap();
        assert_eq!(stats.new_replies, 2);
        assert_eq!(stats.updated_replies, 0);
        assert_eq!(store.rows().len(), 2);
    }

    #[tokio::test]
    async fn second_refresh_updates_without_creating() {
        let store = Arc::new(MemoryStore::default());
        let feed = Arc::new(
            MockFeed::new()
                .with_post("p1", 0)
                .with_replies("p1", vec![make_reply("r1", "bob", 5)]),
        );
        let t = tracker(feed.clone(), store.clone());

        t.refresh().await.unwrap();
        let first_seen = store.rows()[0].first_seen_at;

        // Upstream likes moved; same external id.
        let feed2 = Arc::new(
            MockFeed::new()
                .with_post("p1", 0)
                .with_replies("p1", vec![make_reply("r1", "bob", 9)]),
        );
        let stats = tracker(feed2, store.clone()).refresh().await.unwrap();

        assert_eq!(stats.new_replies, 0);
        assert_eq!(stats.updated_replies, 1);
        let rows = store.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].like_count, 9);
        assert_eq!(rows[0].first_seen_at, first_seen);
    }

    #[tokio::test]
    async fn duplicate_external_ids_collapse_to_one_row() {
        let store = Arc::new(MemoryStore::default());
        let feed = Arc::new(
            MockFeed::new()
                .with_post("p1", 0)
                .with_replies("p1", vec![make_reply("r1", "bob", 5), make_reply("r1", "bob", 5)]),
        );

        let stats = tracker(feed, store.clone()).refresh().await.unwrap();
        assert_eq!(store.rows().len(), 1);
        assert_eq!(stats.new_replies, 1);
        assert_eq!(stats.updated_replies, 1);
    }

    #[tokio::test]
    async fn per_post_failure_does_not_abort_cycle() {
        let store = Arc::new(MemoryStore::default());
        let feed = Arc::new(
            MockFeed::new()
                .with_post("p1", 0)
                .with_post("p2", 0)
                .with_post("p3", 0)
                .with_replies("p1", vec![make_reply("r1", "bob", 1)])
                .fail_replies("p2")
                .with_replies("p3", vec![make_reply("r3", "carol", 1)]),
        );

        let stats = tracker(feed, store.clone()).refresh().await.unwrap();
        assert_eq!(stats.posts_failed, 1);
        assert_eq!(stats.new_replies, 2);
        assert_eq!(store.rows().len(), 2);
    }

    #[tokio::test]
    async fn zero_posts_is_a_silent_noop() {
        let store = Arc::new(MemoryStore::default());
        let feed = Arc::new(MockFeed::new());

        let stats = tracker(feed, store.clone()).refresh().await.unwrap();
        assert_eq!(stats, RefreshStats::default());
        // No cycle ran, so no refresh stamp either.
        assert!(store.last_refresh().is_none());
    }

    #[tokio::test]
    async fn post_listing_failure_is_fatal() {
        let store = Arc::new(MemoryStore::default());
        let feed = Arc::new(MockFeed::new().fail_posts());

        assert!(tracker(feed, store).refresh().await.is_err());
    }

    #[tokio::test]
    async fn refresh_stamps_shared_state() {
        let store = Arc::new(MemoryStore::default());
        let feed = Arc::new(
            MockFeed::new()
                .with_post("p1", 0)
                .with_replies("p1", vec![make_reply("r1", "bob", 1)]),
        );

        tracker(feed, store.clone()).refresh().await.unwrap();
        assert!(store.last_refresh().is_some());
    }

    #[tokio::test]
    async fn end_to_end_two_posts_three_replies() {
        let store = Arc::new(MemoryStore::default());
        let feed = Arc::new(
            MockFeed::new()
                .with_post("a", 0)
                .with_post("b", 0)
                .with_replies("a", vec![make_reply("r1", "bob", 5), make_reply("r2", "carol", 3)])
                .with_replies("b", vec![make_reply("r3", "bob", 2)]),
        );
        let t = tracker(feed, store.clone());

        let stats = t.refresh().await.unwrap();
        assert_eq!(stats.new_replies, 3);
        assert_eq!(store.rows().len(), 3);

        let entries = t.leaderboard(&LeaderboardQuery::default()).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].handle, "bob");
        assert_eq!(entries[0].comments, 2);
        assert_eq!(entries[0].likes, 7);
        assert_eq!(entries[0].points, 11);
        assert_eq!(entries[1].handle, "carol");
        assert_eq!(entries[1].points, 5);
    }

    #[tokio::test]
    async fn track_engagement_is_idempotent() {
        let store = Arc::new(MemoryStore::default());
        let feed = Arc::new(
            MockFeed::new()
                .with_post("p1", 0)
                .with_replies("p1", vec![make_reply("r1", "bob", 1)])
                .with_likers(
                    "r1",
                    vec![
                        Liker { user_id: "u1".into(), handle: "dana".into() },
                        Liker { user_id: "u2".into(), handle: "eli".into() },
                    ],
                ),
        );
        let t = tracker(feed, store.clone());

        t.refresh().await.unwrap();
        t.track_engagement().await.unwrap();
        t.track_engagement().await.unwrap();

        assert_eq!(store.like_events(), 2);
    }

    #[tokio::test]
    async fn likers_failure_skips_that_reply() {
        let store = Arc::new(MemoryStore::default());
        let feed = Arc::new(
            MockFeed::new()
                .with_post("p1", 0)
                .with_replies(
                    "p1",
                    vec![make_reply("r1", "bob", 1), make_reply("r2", "carol", 1)],
                )
                .fail_likers("r1")
                .with_likers("r2", vec![Liker { user_id: "u1".into(), handle: "dana".into() }]),
        );
        let t = tracker(feed, store.clone());

        t.refresh().await.unwrap();
        t.track_engagement().await.unwrap();

        assert_eq!(store.like_events(), 1);
    }

    #[tokio::test]
    async fn stats_sum_impressions_and_degrade_on_failure() {
        let store = Arc::new(MemoryStore::default());
        let feed = Arc::new(
            MockFeed::new()
                .with_post("p1", 1000)
                .with_post("p2", 500)
                .with_replies("p1", vec![make_reply("r1", "bob", 1)])
                .with_replies("p2", vec![make_reply("r2", "carol", 1)]),
        );
        let t = tracker(feed, store.clone());
        t.refresh().await.unwrap();

        let stats = t.stats().await.unwrap();
        assert_eq!(stats.impressions, 1500);
        assert_eq!(stats.total_comments, 2);
        assert_eq!(stats.total_contributors, 2);

        // Same store, but the timeline fetch now fails.
        let broken = Arc::new(MockFeed::new().fail_posts());
        let stats = tracker(broken, store).stats().await.unwrap();
        assert_eq!(stats.impressions, 0);
        assert_eq!(stats.total_comments, 2);
    }
}
