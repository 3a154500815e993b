pub mod error;
pub mod types;

pub use error::{ApifyError, Result};
pub use types::{
    ConversationScraperInput, RunData, Tweet, TweetAuthor, TweetLiker, TweetLikersInput,
    TweetScraperInput,
};

use serde::de::DeserializeOwned;
use serde::Serialize;
use types::ApiResponse;

const BASE_URL: &str = "https://api.apify.com/v2";

/// Actor ID for apidojo/tweet-scraper.
const TWEET_SCRAPER: &str = "61RPP7dywgiy0JPD0";

/// Actor ID for kaitoeasyapi/tweet-likers-scraper.
const TWEET_LIKERS_SCRAPER: &str = "fgRKSTPWuqL9AYygc";

pub struct ApifyClient {
    client: reqwest::Client,
    token: String,
}

impl ApifyClient {
    pub fn new(token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
        }
    }

    /// Start an actor run. Returns immediately with run metadata.
    async fn start_run<I: Serialize>(&self, actor_id: &str, input: &I) -> Result<RunData> {
        let url = format!("{}/acts/{}/runs", BASE_URL, actor_id);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(input)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApifyError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let api_resp: ApiResponse<RunData> = resp.json().await?;
        Ok(api_resp.data)
    }

    /// Poll until a run completes. Uses `waitForFinish=60` for efficient long-polling.
    pub async fn wait_for_run(&self, run_id: &str) -> Result<RunData> {
        loop {
            let url = format!("{}/actor-runs/{}?waitForFinish=60", BASE_URL, run_id);
            let resp = self
                .client
                .get(&url)
                .bearer_auth(&self.token)
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(ApifyError::Api {
                    status: status.as_u16(),
                    message: body,
                });
            }

            let api_resp: ApiResponse<RunData> = resp.json().await?;
            match api_resp.data.status.as_str() {
                "SUCCEEDED" => return Ok(api_resp.data),
                "FAILED" | "ABORTED" | "TIMED-OUT" => {
                    return Err(ApifyError::RunFailed(api_resp.data.status));
                }
                _ => {
                    tracing::debug!(run_id, status = %api_resp.data.status, "Run still in progress");
                    continue;
                }
            }
        }
    }

    /// Fetch dataset items from a completed run.
    pub async fn get_dataset_items<T: DeserializeOwned>(&self, dataset_id: &str) -> Result<Vec<T>> {
        let url = format!("{}/datasets/{}/items?format=json", BASE_URL, dataset_id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApifyError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let items: Vec<T> = resp.json().await?;
        Ok(items)
    }

    /// Run an actor end-to-end: start run, poll, fetch results.
    async fn run_actor<I: Serialize, T: DeserializeOwned>(
        &self,
        actor_id: &str,
        input: &I,
    ) -> Result<Vec<T>> {
        let run = self.start_run(actor_id, input).await?;
        tracing::info!(run_id = %run.id, "Apify run started, polling for completion");

        let completed = self.wait_for_run(&run.id).await?;
        tracing::info!(
            run_id = %completed.id,
            dataset_id = %completed.default_dataset_id,
            "Run completed, fetching results"
        );

        self.get_dataset_items(&completed.default_dataset_id).await
    }

    /// Scrape an account's timeline end-to-end.
    pub async fn scrape_user_tweets(&self, handle: &str, limit: u32) -> Result<Vec<Tweet>> {
        tracing::info!(handle, limit, "Starting X/Twitter timeline scrape");

        let input = TweetScraperInput {
            twitter_handles: vec![handle.to_string()],
            max_items: limit,
        };

        let tweets: Vec<Tweet> = self.run_actor(TWEET_SCRAPER, &input).await?;
        tracing::info!(count = tweets.len(), "Fetched tweets");

        Ok(tweets)
    }

    /// Scrape the replies in a tweet's conversation thread end-to-end.
    pub async fn scrape_replies(&self, tweet_id: &str, limit: u32) -> Result<Vec<Tweet>> {
        tracing::info!(tweet_id, limit, "Starting X/Twitter conversation scrape");

        let input = ConversationScraperInput {
            conversation_ids: vec![tweet_id.to_string()],
            max_items: limit,
        };

        let replies: Vec<Tweet> = self.run_actor(TWEET_SCRAPER, &input).await?;
        tracing::info!(count = replies.len(), "Fetched replies");

        Ok(replies)
    }

    /// Scrape the users who liked a tweet end-to-end.
    pub async fn scrape_tweet_likers(&self, tweet_id: &str, limit: u32) -> Result<Vec<TweetLiker>> {
        tracing::info!(tweet_id, limit, "Starting X/Twitter likers scrape");

        let input = TweetLikersInput {
            tweet_ids: vec![tweet_id.to_string()],
            max_items: limit,
        };

        let likers: Vec<TweetLiker> = self.run_actor(TWEET_LIKERS_SCRAPER, &input).await?;
        tracing::info!(count = likers.len(), "Fetched likers");

        Ok(likers)
    }
}
