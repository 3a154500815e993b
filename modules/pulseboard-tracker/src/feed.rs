// Social-platform adapter: SocialFeed over the Apify tweet-scraper actors.

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use apify_client::{ApifyClient, Tweet, TweetLiker};
use pulseboard_common::{AccountPost, Liker, ReplyRecord};

use crate::traits::SocialFeed;

/// Fallback handle for replies whose author the platform did not resolve.
const UNKNOWN_HANDLE: &str = "unknown";

/// Page size for the likers actor. Likers are deduped by the store's unique
/// constraint, so over-fetching is harmless.
const LIKERS_PAGE_SIZE: u32 = 1000;

pub struct ApifySocialFeed {
    client: ApifyClient,
    account_handle: String,
}

impl ApifySocialFeed {
    pub fn new(client: ApifyClient, account_handle: String) -> Self {
        Self {
            client,
            account_handle,
        }
    }

    fn is_own_reply(&self, tweet: &Tweet) -> bool {
        tweet
            .author_handle()
            .is_some_and(|h| h.eq_ignore_ascii_case(&self.account_handle))
    }
}

/// Map a raw tweet into an enriched reply record. Pure: drops items without
/// an external id, falls back to the "unknown" handle when the author was
/// not resolved, and defaults missing counters to zero.
pub fn reply_record(tweet: &Tweet) -> Option<ReplyRecord> {
    let tweet_id = tweet.id.clone()?;
    let author = tweet.author.as_ref();

    Some(ReplyRecord {
        tweet_id,
        author_id: author
            .and_then(|a| a.id.clone())
            .unwrap_or_default(),
        author_handle: author
            .and_then(|a| a.user_name.clone())
            .unwrap_or_else(|| UNKNOWN_HANDLE.to_string()),
        content: tweet.content().unwrap_or_default().to_string(),
        like_count: tweet.like_count.unwrap_or(0),
        retweet_count: tweet.retweet_count.unwrap_or(0),
        reply_count: tweet.reply_count.unwrap_or(0),
    })
}

/// Map a raw timeline tweet into an account post.
fn account_post(tweet: &Tweet) -> Option<AccountPost> {
    Some(AccountPost {
        tweet_id: tweet.id.clone()?,
        impressions: tweet.view_count.unwrap_or(0),
    })
}

#[async_trait]
impl SocialFeed for ApifySocialFeed {
    async fn account_posts(&self, limit: u32) -> Result<Vec<AccountPost>> {
        let tweets = self
            .client
            .scrape_user_tweets(&self.account_handle, limit)
            .await?;

        let posts: Vec<AccountPost> = tweets
            .iter()
            .filter(|t| !t.is_retweet && !t.is_reply)
            .filter_map(account_post)
            .collect();

        debug!(
            fetched = tweets.len(),
            top_level = posts.len(),
            "Filtered account timeline"
        );
        Ok(posts)
    }

    async fn replies(&self, tweet_id: &str, limit: u32) -> Result<Vec<ReplyRecord>> {
        let tweets = self.client.scrape_replies(tweet_id, limit).await?;

        Ok(tweets
            .iter()
            .filter(|t| !self.is_own_reply(t))
            .filter_map(reply_record)
            .collect())
    }

    async fn likers(&self, tweet_id: &str) -> Result<Vec<Liker>> {
        let likers = self.client.scrape_tweet_likers(tweet_id, LIKERS_PAGE_SIZE).await?;

        Ok(likers.iter().filter_map(liker).collect())
    }
}

fn liker(raw: &TweetLiker) -> Option<Liker> {
    Some(Liker {
        user_id: raw.user_id.clone()?,
        handle: raw
            .user_name
            .clone()
            .unwrap_or_else(|| UNKNOWN_HANDLE.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use apify_client::TweetAuthor;

    fn tweet(id: Option<&str>, handle: Option<&str>, likes: Option<i64>) -> Tweet {
        Tweet {
            id: id.map(str::to_string),
            author: handle.map(|h| TweetAuthor {
                id: Some(format!("u-{h}")),
                user_name: Some(h.to_string()),
                name: None,
            }),
            like_count: likes,
            ..Tweet::default()
        }
    }

    #[test]
    fn reply_record_drops_idless_tweets() {
        assert!(reply_record(&tweet(None, Some("bob"), Some(1))).is_none());
    }

    #[test]
    fn reply_record_falls_back_to_unknown_handle() {
        let record = reply_record(&tweet(Some("1"), None, None)).unwrap();
        assert_eq!(record.author_handle, "unknown");
        assert_eq!(record.like_count, 0);
    }

    #[test]
    fn reply_record_prefers_full_text() {
        let mut t = tweet(Some("1"), Some("bob"), Some(3));
        t.text = Some("short".to_string());
        t.full_text = Some("the whole thing".to_string());

        let record = reply_record(&t).unwrap();
        assert_eq!(record.content, "the whole thing");
        assert_eq!(record.like_count, 3);
    }

    #[test]
    fn account_post_carries_view_count() {
        let mut t = tweet(Some("9"), Some("acct"), None);
        t.view_count = Some(1234);

        let post = account_post(&t).unwrap();
        assert_eq!(post.tweet_id, "9");
        assert_eq!(post.impressions, 1234);
    }
}
