use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wrapper for Apify API responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// Apify actor run metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct RunData {
    pub id: String,
    pub status: String,
    #[serde(rename = "defaultDatasetId")]
    pub default_dataset_id: String,
    #[serde(rename = "startedAt")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "finishedAt")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Input for the apidojo/tweet-scraper actor (account timeline mode).
#[derive(Debug, Clone, Serialize)]
pub struct TweetScraperInput {
    #[serde(rename = "twitterHandles")]
    pub twitter_handles: Vec<String>,
    #[serde(rename = "maxItems")]
    pub max_items: u32,
}

/// Input for the apidojo/tweet-scraper actor (conversation mode).
/// Returns the replies posted under the given conversation ids.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationScraperInput {
    #[serde(rename = "conversationIds")]
    pub conversation_ids: Vec<String>,
    #[serde(rename = "maxItems")]
    pub max_items: u32,
}

/// Input for the tweet-likers actor.
#[derive(Debug, Clone, Serialize)]
pub struct TweetLikersInput {
    #[serde(rename = "tweetIds")]
    pub tweet_ids: Vec<String>,
    #[serde(rename = "maxItems")]
    pub max_items: u32,
}

/// Author info nested inside a Tweet.
#[derive(Debug, Clone, Deserialize)]
pub struct TweetAuthor {
    pub id: Option<String>,
    #[serde(rename = "userName")]
    pub user_name: Option<String>,
    pub name: Option<String>,
}

/// A single tweet from the Apify dataset.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Tweet {
    pub id: Option<String>,
    pub text: Option<String>,
    #[serde(rename = "fullText")]
    pub full_text: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: Option<String>,
    #[serde(rename = "conversationId")]
    pub conversation_id: Option<String>,
    #[serde(rename = "inReplyToId")]
    pub in_reply_to_id: Option<String>,
    pub author: Option<TweetAuthor>,
    #[serde(rename = "likeCount")]
    pub like_count: Option<i64>,
    #[serde(rename = "retweetCount")]
    pub retweet_count: Option<i64>,
    #[serde(rename = "replyCount")]
    pub reply_count: Option<i64>,
    #[serde(rename = "viewCount")]
    pub view_count: Option<i64>,
    #[serde(rename = "isReply")]
    pub is_reply: bool,
    #[serde(rename = "isRetweet")]
    pub is_retweet: bool,
}

impl Tweet {
    /// Returns whichever text field is populated, preferring `full_text`.
    pub fn content(&self) -> Option<&str> {
        self.full_text.as_deref().or(self.text.as_deref())
    }

    /// The author's handle, if the dataset item carried one.
    pub fn author_handle(&self) -> Option<&str> {
        self.author.as_ref().and_then(|a| a.user_name.as_deref())
    }
}

/// A user who liked a tweet, from the likers actor dataset.
#[derive(Debug, Clone, Deserialize)]
pub struct TweetLiker {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    #[serde(rename = "userName")]
    pub user_name: Option<String>,
    pub name: Option<String>,
}
