// Postgres persistence for suggestion replies and engagement events.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, QueryBuilder};

use pulseboard_common::{points, LeaderboardEntry, LeaderboardQuery, Liker, ReplyRecord};

use crate::error::Result;
use crate::traits::UpsertOutcome;

pub struct PgEngagementStore {
    pool: PgPool,
}

/// A row from the suggestion_comments table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Suggestion {
    pub id: i64,
    pub tweet_id: String,
    pub author_id: String,
    pub author_handle: String,
    pub content: String,
    pub like_count: i64,
    pub retweet_count: i64,
    pub reply_count: i64,
    pub category: Option<String>,
    pub first_seen_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PgEngagementStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| crate::error::TrackerError::Database(e.into()))?;
        Ok(())
    }

    /// Single-statement upsert keyed on the external id. On conflict the
    /// three counters are overwritten and `updated_at` bumped; content,
    /// author, and `first_seen_at` keep their first-capture values.
    /// `xmax = 0` holds only for rows created by this statement, which is
    /// how insert is told apart from update without a second query.
    pub async fn upsert_reply(&self, reply: &ReplyRecord) -> Result<UpsertOutcome> {
        let inserted = sqlx::query_scalar::<_, bool>(
            r#"
            INSERT INTO suggestion_comments
                (tweet_id, author_id, author_handle, content,
                 like_count, retweet_count, reply_count)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (tweet_id) DO UPDATE
                SET like_count = EXCLUDED.like_count,
                    retweet_count = EXCLUDED.retweet_count,
                    reply_count = EXCLUDED.reply_count,
                    updated_at = NOW()
            RETURNING (xmax = 0)
            "#,
        )
        .bind(&reply.tweet_id)
        .bind(&reply.author_id)
        .bind(&reply.author_handle)
        .bind(&reply.content)
        .bind(reply.like_count)
        .bind(reply.retweet_count)
        .bind(reply.reply_count)
        .fetch_one(&self.pool)
        .await?;

        Ok(if inserted {
            UpsertOutcome::Inserted
        } else {
            UpsertOutcome::Updated
        })
    }

    /// External ids of all known replies.
    pub async fn reply_ids(&self) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT tweet_id FROM suggestion_comments ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Record a like event. The composite unique constraint absorbs repeats;
    /// returns whether a new event row was written.
    pub async fn record_like(&self, reply_tweet_id: &str, liker: &Liker) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO suggestion_engagement
                (suggestion_tweet_id, user_id, user_handle, engagement_type)
            VALUES ($1, $2, $3, 'like')
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(reply_tweet_id)
        .bind(&liker.user_id)
        .bind(&liker.handle)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Ranked leaderboard: group by handle, score, order, limit.
    /// Mirrors `ranking::rank_suggestions`; the time cutoff is inclusive.
    pub async fn leaderboard(&self, query: &LeaderboardQuery) -> Result<Vec<LeaderboardEntry>> {
        let mut qb = QueryBuilder::new(
            "SELECT author_handle, COUNT(*) AS comments, \
             COALESCE(SUM(like_count), 0) AS likes \
             FROM suggestion_comments WHERE 1=1 ",
        );

        if let Some(cutoff) = query.time_range.cutoff(Utc::now()) {
            qb.push("AND first_seen_at >= ");
            qb.push_bind(cutoff);
            qb.push(" ");
        }
        if let Some(search) = &query.search {
            qb.push("AND author_handle ILIKE ");
            qb.push_bind(format!("%{search}%"));
            qb.push(" ");
        }

        qb.push(
            "GROUP BY author_handle \
             ORDER BY COALESCE(SUM(like_count), 0) + COUNT(*) * 2 DESC \
             LIMIT ",
        );
        qb.push_bind(query.limit);

        let rows: Vec<(String, i64, i64)> =
            qb.build_query_as().fetch_all(&self.pool).await?;

        Ok(rows
            .into_iter()
            .enumerate()
            .map(|(i, (handle, comments, likes))| LeaderboardEntry {
                rank: i + 1,
                handle,
                comments,
                likes,
                points: points(comments, likes),
            })
            .collect())
    }

    /// (total replies, distinct contributor handles).
    pub async fn comment_counts(&self) -> Result<(i64, i64)> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM suggestion_comments")
            .fetch_one(&self.pool)
            .await?;

        let contributors = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(DISTINCT author_handle) FROM suggestion_comments",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok((total, contributors))
    }

    /// All suggestions, most liked first. Categorizer input.
    pub async fn top_suggestions(&self) -> Result<Vec<Suggestion>> {
        let rows = sqlx::query_as::<_, Suggestion>(
            "SELECT * FROM suggestion_comments ORDER BY like_count DESC, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn set_category(&self, tweet_id: &str, category: &str) -> Result<()> {
        sqlx::query(
            "UPDATE suggestion_comments SET category = $1, updated_at = NOW() WHERE tweet_id = $2",
        )
        .bind(category)
        .bind(tweet_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn tracked_tweet_id(&self) -> Result<Option<String>> {
        let id = sqlx::query_scalar::<_, Option<String>>(
            "SELECT tracked_tweet_id FROM tracker_state WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(id.flatten())
    }

    pub async fn set_tracked_tweet_id(&self, tweet_id: &str) -> Result<()> {
        sqlx::query(
            "UPDATE tracker_state SET tracked_tweet_id = $1, updated_at = NOW() WHERE id = 1",
        )
        .bind(tweet_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn mark_refreshed(&self) -> Result<()> {
        sqlx::query(
            "UPDATE tracker_state SET last_refresh_at = NOW(), updated_at = NOW() WHERE id = 1",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Last completed refresh cycle, if any.
    pub async fn last_refresh_at(&self) -> Result<Option<DateTime<Utc>>> {
        let at = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
            "SELECT last_refresh_at FROM tracker_state WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(at.flatten())
    }
}

#[async_trait::async_trait]
impl crate::traits::EngagementStore for PgEngagementStore {
    async fn upsert_reply(&self, reply: &ReplyRecord) -> anyhow::Result<UpsertOutcome> {
        Ok(PgEngagementStore::upsert_reply(self, reply).await?)
    }

    async fn reply_ids(&self) -> anyhow::Result<Vec<String>> {
        Ok(PgEngagementStore::reply_ids(self).await?)
    }

    async fn record_like(&self, reply_tweet_id: &str, liker: &Liker) -> anyhow::Result<bool> {
        Ok(PgEngagementStore::record_like(self, reply_tweet_id, liker).await?)
    }

    async fn leaderboard(
        &self,
        query: &LeaderboardQuery,
    ) -> anyhow::Result<Vec<LeaderboardEntry>> {
        Ok(PgEngagementStore::leaderboard(self, query).await?)
    }

    async fn comment_counts(&self) -> anyhow::Result<(i64, i64)> {
        Ok(PgEngagementStore::comment_counts(self).await?)
    }

    async fn top_suggestions(&self) -> anyhow::Result<Vec<Suggestion>> {
        Ok(PgEngagementStore::top_suggestions(self).await?)
    }

    async fn set_category(&self, tweet_id: &str, category: &str) -> anyhow::Result<()> {
        Ok(PgEngagementStore::set_category(self, tweet_id, category).await?)
    }

    async fn tracked_tweet_id(&self) -> anyhow::Result<Option<String>> {
        Ok(PgEngagementStore::tracked_tweet_id(self).await?)
    }

    async fn set_tracked_tweet_id(&self, tweet_id: &str) -> anyhow::Result<()> {
        Ok(PgEngagementStore::set_tracked_tweet_id(self, tweet_id).await?)
    }

    async fn mark_refreshed(&self) -> anyhow::Result<()> {
        Ok(PgEngagementStore::mark_refreshed(self).await?)
    }
}
