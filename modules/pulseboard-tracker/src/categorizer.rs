// LLM categorization: groups the stored suggestions into poll categories
// via an OpenRouter chat completion. Runs out-of-band, never inside the
// poll cycle.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, TrackerError};
use crate::store::Suggestion;
use crate::traits::EngagementStore;

const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1";
const CATEGORIZER_MODEL: &str = "openai/gpt-4o-mini";

/// X polls cap option labels at 25 characters; leave room for the ellipsis.
const POLL_OPTION_MAX_CHARS: usize = 22;

/// A group of suggestions proposed as one poll option.
#[derive(Debug, Clone)]
pub struct PollCategory {
    pub name: String,
    pub description: String,
    /// External ids of the member suggestions.
    pub suggestions: Vec<String>,
    pub total_likes: i64,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCategories {
    categories: Vec<RawCategory>,
}

#[derive(Debug, Deserialize)]
struct RawCategory {
    name: String,
    description: String,
    #[serde(rename = "suggestionNumbers")]
    suggestion_numbers: Vec<usize>,
}

pub struct SuggestionCategorizer {
    api_key: String,
    http: reqwest::Client,
}

impl SuggestionCategorizer {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Categorize every stored suggestion and persist the assignments.
    pub async fn categorize(&self, store: &dyn EngagementStore) -> Result<Vec<PollCategory>> {
        let suggestions = store.top_suggestions().await?;
        if suggestions.is_empty() {
            return Err(TrackerError::NoSuggestions);
        }

        info!(suggestions = suggestions.len(), "Requesting categorization");

        let prompt = build_prompt(&suggestions);
        let content = self.chat(&prompt).await?;
        let categories = parse_categories(&content, &suggestions)?;

        for category in &categories {
            for tweet_id in &category.suggestions {
                store.set_category(tweet_id, &category.name).await?;
            }
        }

        info!(categories = categories.len(), "Categorization complete");
        Ok(categories)
    }

    async fn chat(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: CATEGORIZER_MODEL.to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: 1000,
            temperature: 0.3,
        };

        let url = format!("{}/chat/completions", OPENROUTER_API_URL);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TrackerError::CategorizerApi {
                status: status.as_u16(),
                message,
            });
        }

        let chat: ChatResponse = response.json().await?;
        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| TrackerError::CategorizerParse("empty response".to_string()))
    }
}

/// Numbered suggestion list plus grouping instructions. The model must
/// answer with JSON only.
fn build_prompt(suggestions: &[Suggestion]) -> String {
    let suggestion_list = suggestions
        .iter()
        .enumerate()
        .map(|(i, s)| {
            format!(
                "{}. @{} ({} likes): \"{}\"",
                i + 1,
                s.author_handle,
                s.like_count,
                s.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are analyzing community suggestions for what to build next.

Here are all the suggestions:
{suggestion_list}

Analyze these suggestions and group them into exactly 4 categories for a poll. Each category should:
1. Have a short name (1-3 words)
2. Have a brief description (1 sentence)
3. Include the suggestion numbers that fit this category

Some suggestions may be spam, jokes, or off-topic - exclude those from all categories.

Respond with ONLY valid JSON in this exact format:
{{
  "categories": [
    {{
      "name": "Category Name",
      "description": "Brief description of this category",
      "suggestionNumbers": [1, 3, 5]
    }}
  ]
}}"#
    )
}

/// Extract the first JSON object from the model's reply and resolve the
/// 1-based suggestion numbers back to rows, dropping out-of-range ones.
fn parse_categories(content: &str, suggestions: &[Suggestion]) -> Result<Vec<PollCategory>> {
    let json_object = Regex::new(r"\{[\s\S]*\}")
        .expect("hardcoded regex")
        .find(content)
        .ok_or_else(|| TrackerError::CategorizerParse("no JSON object in response".to_string()))?;

    let raw: RawCategories = serde_json::from_str(json_object.as_str())
        .map_err(|e| TrackerError::CategorizerParse(e.to_string()))?;

    Ok(raw
        .categories
        .into_iter()
        .map(|cat| {
            let members: Vec<&Suggestion> = cat
                .suggestion_numbers
                .iter()
                .filter(|&&n| n >= 1 && n <= suggestions.len())
                .map(|&n| &suggestions[n - 1])
                .collect();

            PollCategory {
                name: cat.name,
                description: cat.description,
                suggestions: members.iter().map(|s| s.tweet_id.clone()).collect(),
                total_likes: members.iter().map(|s| s.like_count).sum(),
            }
        })
        .collect())
}

/// Poll option labels: category names truncated to the platform limit.
pub fn format_poll_options(categories: &[PollCategory]) -> Vec<String> {
    categories
        .iter()
        .map(|cat| {
            if cat.name.chars().count() > POLL_OPTION_MAX_CHARS {
                let truncated: String = cat.name.chars().take(POLL_OPTION_MAX_CHARS).collect();
                format!("{truncated}...")
            } else {
                cat.name.clone()
            }
        })
        .collect()
}
