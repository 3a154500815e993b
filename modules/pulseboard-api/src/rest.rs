use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use tracing::warn;

use pulseboard_common::{LeaderboardQuery, TimeRange};

use crate::AppState;

const TWEET_URL_BASE: &str = "https://x.com/i/status";

/// Upper bound on the leaderboard page size.
const MAX_LIMIT: i64 = 200;

// --- Query structs ---

#[derive(Deserialize)]
pub struct LeaderboardParams {
    limit: Option<i64>,
    search: Option<String>,
    #[serde(rename = "timeRange")]
    time_range: Option<TimeRange>,
}

#[derive(Deserialize)]
pub struct TrackRequest {
    tweet_id: String,
}

// --- Helpers ---

/// Generic 500 body. Internal detail stays in the server log.
fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"error": "Internal server error"})),
    )
        .into_response()
}

/// External post ids are numeric snowflakes; anything else is rejected.
fn is_valid_tweet_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= 32 && id.bytes().all(|b| b.is_ascii_digit())
}

// --- Handlers ---

pub async fn api_leaderboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LeaderboardParams>,
) -> Response {
    let query = LeaderboardQuery {
        limit: params.limit.unwrap_or(50).clamp(1, MAX_LIMIT),
        search: params.search.filter(|s| !s.is_empty()),
        time_range: params.time_range.unwrap_or_default(),
    };

    let leaderboard = match state.tracker.leaderboard(&query).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, "Failed to load leaderboard");
            return internal_error();
        }
    };

    let stats = match state.tracker.stats().await {
        Ok(stats) => stats,
        Err(e) => {
            warn!(error = %e, "Failed to load stats");
            return internal_error();
        }
    };

    let tweet_url = match state.tracker.tracked_tweet_id().await {
        Ok(id) => id.map(|id| format!("{TWEET_URL_BASE}/{id}")),
        Err(e) => {
            warn!(error = %e, "Failed to read tracked post id");
            return internal_error();
        }
    };

    Json(serde_json::json!({
        "leaderboard": leaderboard,
        "stats": stats,
        "tweetUrl": tweet_url,
    }))
    .into_response()
}

pub async fn api_stats(State(state): State<Arc<AppState>>) -> Response {
    match state.tracker.stats().await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to load stats");
            internal_error()
        }
    }
}

pub async fn api_track(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TrackRequest>,
) -> Response {
    let tweet_id = body.tweet_id.trim();
    if !is_valid_tweet_id(tweet_id) {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "Invalid tweet id"})),
        )
            .into_response();
    }

    match state.tracker.set_tracked_tweet_id(tweet_id).await {
        Ok(()) => Json(serde_json::json!({"ok": true})).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to set tracked post id");
            internal_error()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tweet_id_must_be_a_bare_snowflake() {
        assert!(is_valid_tweet_id("1234567890"));
        assert!(!is_valid_tweet_id(""));
        assert!(!is_valid_tweet_id("abc123"));
        assert!(!is_valid_tweet_id("123 456"));
        assert!(!is_valid_tweet_id(&"9".repeat(33)));
    }
}
