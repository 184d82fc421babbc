use crate::config::Config;
use crate::errors::AppError;
use crate::models::{LatestPost, ScrapeProfile, NOT_PUBLICLY_AVAILABLE};
use chrono::DateTime;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Instagram only returns the first page of the timeline.
const MAX_SCRAPED_POSTS: usize = 12;

fn build_client(timeout_secs: u64, name: &str) -> Result<Client, AppError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AppError::InternalError(format!("Failed to create {} client: {}", name, e)))
}

/// Reads the error body of a failed upstream call for logging.
async fn upstream_failure(source: &str, response: reqwest::Response) -> AppError {
    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    tracing::error!("{} returned error {}: {}", source, status, error_text);
    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            AppError::RateLimited(format!("{} returned status {}", source, status))
        }
        _ => AppError::ExternalApiError(format!(
            "{} returned status {}: {}",
            source, status, error_text
        )),
    }
}

// ============ Gemini ============

/// Google Gemini `generateContent` client.
#[derive(Clone)]
pub struct GeminiService {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiService {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        Ok(Self {
            client: build_client(config.llm_timeout_secs, "Gemini")?,
            base_url: config.gemini_base_url.clone(),
            model: config.gemini_model.clone(),
            api_key: config.gemini_api_key.clone(),
        })
    }

    /// Sends one prompt and returns the concatenated text parts of the first
    /// candidate (empty when the model produced none).
    pub async fn generate_text(&self, prompt: &str) -> Result<String, AppError> {
        #[derive(Deserialize)]
        struct GenerateResponse {
            #[serde(default)]
            candidates: Vec<Candidate>,
        }
        #[derive(Deserialize)]
        struct Candidate {
            content: Option<Content>,
        }
        #[derive(Deserialize)]
        struct Content {
            #[serde(default)]
            parts: Vec<Part>,
        }
        #[derive(Deserialize)]
        struct Part {
            text: Option<String>,
        }

        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Unavailable("GEMINI_API_KEY is not configured".to_string()))?;

        // Build URL with proper parameter encoding
        let url = reqwest::Url::parse_with_params(
            &format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ),
            &[("key", api_key)],
        )
        .map_err(|e| AppError::ExternalApiError(format!("Failed to build URL: {}", e)))?;

        tracing::info!("Requesting Gemini profile completion (model {})", self.model);
        // Redact key from logs to prevent credential exposure
        tracing::debug!(
            "Gemini URL: {}/v1beta/models/{}:generateContent?key=[REDACTED]",
            self.base_url,
            self.model
        );

        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": 0 }
        });

        let response = self.client.post(url).json(&body).send().await?;

        if !response.status().is_success() {
            return Err(upstream_failure("Gemini", response).await);
        }

        let result: GenerateResponse = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse Gemini response: {}", e))
        })?;

        let text = result
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        Ok(text)
    }
}

// ============ OpenAI ============

/// OpenAI chat completions client.
#[derive(Clone)]
pub struct OpenAiService {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiService {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        Ok(Self {
            client: build_client(config.llm_timeout_secs, "OpenAI")?,
            base_url: config.openai_base_url.clone(),
            model: config.openai_model.clone(),
            api_key: config.openai_api_key.clone(),
        })
    }

    /// Sends one user message at temperature 0 and returns the first
    /// choice's content (empty when absent).
    pub async fn complete(&self, prompt: &str) -> Result<String, AppError> {
        #[derive(Deserialize)]
        struct CompletionResponse {
            #[serde(default)]
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: Option<ResponseMessage>,
        }
        #[derive(Deserialize)]
        struct ResponseMessage {
            content: Option<String>,
        }

        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Unavailable("OPENAI_API_KEY is not configured".to_string()))?;

        let url = format!("{}/v1/chat/completions", self.base_url);
        tracing::info!("Requesting OpenAI profile completion (model {})", self.model);

        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": 0
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(upstream_failure("OpenAI", response).await);
        }

        let result: CompletionResponse = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse OpenAI response: {}", e))
        })?;

        Ok(result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default())
    }
}

// ============ Instagram ============

/// Why a profile scrape failed. The HTTP proxy maps each kind to its own
/// status; the aggregator treats them all as "no contribution".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeError {
    NotFound,
    RateLimited,
    Upstream(u16),
    Timeout,
    Transport(String),
    Parse(String),
}

impl fmt::Display for ScrapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrapeError::NotFound => write!(f, "user not found"),
            ScrapeError::RateLimited => write!(f, "rate limited by Instagram"),
            ScrapeError::Upstream(status) => {
                write!(f, "Instagram API request failed with status {}", status)
            }
            ScrapeError::Timeout => write!(f, "Instagram request timed out"),
            ScrapeError::Transport(e) => write!(f, "Instagram request failed: {}", e),
            ScrapeError::Parse(e) => write!(f, "failed to parse Instagram response: {}", e),
        }
    }
}

impl std::error::Error for ScrapeError {}

impl From<ScrapeError> for AppError {
    fn from(err: ScrapeError) -> Self {
        match err {
            ScrapeError::NotFound => AppError::NotFound("User not found".to_string()),
            ScrapeError::RateLimited => {
                AppError::RateLimited("Rate limited by Instagram".to_string())
            }
            ScrapeError::Timeout => AppError::Timeout(err.to_string()),
            ScrapeError::Upstream(_) | ScrapeError::Transport(_) | ScrapeError::Parse(_) => {
                AppError::ExternalApiError(err.to_string())
            }
        }
    }
}

/// Client for Instagram's unauthenticated web profile endpoint.
#[derive(Clone)]
pub struct InstagramService {
    client: Client,
    base_url: String,
    app_id: String,
}

impl InstagramService {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        Ok(Self {
            client: build_client(config.scrape_timeout_secs, "Instagram")?,
            base_url: config.instagram_base_url.clone(),
            app_id: config.instagram_app_id.clone(),
        })
    }

    /// Fetch counts, media and bio for an already-normalized username.
    ///
    /// Single attempt: no retry on 429 or transport errors.
    pub async fn fetch_profile(&self, username: &str) -> Result<ScrapeProfile, ScrapeError> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/api/v1/users/web_profile_info/", self.base_url),
            &[("username", username)],
        )
        .map_err(|e| ScrapeError::Transport(format!("Failed to build URL: {}", e)))?;

        tracing::info!("Fetching Instagram profile for: {}", username);

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(ACCEPT, "application/json, text/javascript, */*; q=0.01")
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .header(REFERER, format!("https://www.instagram.com/{}/", username))
            .header("X-IG-App-ID", &self.app_id)
            .header("X-Requested-With", "XMLHttpRequest")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ScrapeError::Timeout
                } else {
                    ScrapeError::Transport(e.to_string())
                }
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(ScrapeError::NotFound),
            StatusCode::TOO_MANY_REQUESTS => return Err(ScrapeError::RateLimited),
            status if !status.is_success() => return Err(ScrapeError::Upstream(status.as_u16())),
            _ => {}
        }

        let body: Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ScrapeError::Timeout
            } else {
                ScrapeError::Parse(e.to_string())
            }
        })?;

        let user = body
            .pointer("/data/user")
            .filter(|u| u.is_object())
            .ok_or(ScrapeError::NotFound)?;

        let profile = parse_scrape_profile(user, username);
        tracing::info!(
            "Instagram profile fetched: {} ({} followers, {} posts)",
            profile.username,
            profile.followers,
            profile.posts
        );
        Ok(profile)
    }
}

/// Converts the `data.user` object of a web profile response.
pub fn parse_scrape_profile(user: &Value, requested_username: &str) -> ScrapeProfile {
    let non_empty = |pointer: &str| {
        user.pointer(pointer)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    let count = |pointer: &str| user.pointer(pointer).and_then(Value::as_u64).unwrap_or(0);

    let latest_posts = user
        .pointer("/edge_owner_to_timeline_media/edges")
        .and_then(Value::as_array)
        .map(|edges| {
            edges
                .iter()
                .filter_map(|edge| edge.get("node"))
                .take(MAX_SCRAPED_POSTS)
                .map(parse_timeline_post)
                .collect()
        })
        .unwrap_or_default();

    ScrapeProfile {
        username: non_empty("/username").unwrap_or_else(|| requested_username.to_string()),
        full_name: non_empty("/full_name"),
        bio: non_empty("/biography"),
        followers: count("/edge_followed_by/count"),
        following: count("/edge_follow/count"),
        posts: count("/edge_owner_to_timeline_media/count"),
        profile_pic: non_empty("/profile_pic_url_hd").or_else(|| non_empty("/profile_pic_url")),
        is_private: user
            .get("is_private")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        is_verified: user
            .get("is_verified")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        latest_posts,
    }
}

fn parse_timeline_post(node: &Value) -> LatestPost {
    let likes = node
        .pointer("/edge_liked_by/count")
        .or_else(|| node.pointer("/edge_media_preview_like/count"))
        .and_then(Value::as_u64);
    let comments = node
        .pointer("/edge_media_to_comment/count")
        .and_then(Value::as_u64);
    let views = node.get("video_view_count").and_then(Value::as_u64);

    let posted_at = node
        .get("taken_at_timestamp")
        .and_then(Value::as_i64)
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| NOT_PUBLICLY_AVAILABLE.to_string());

    LatestPost {
        caption: node
            .pointer("/edge_media_to_caption/edges/0/node/text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| NOT_PUBLICLY_AVAILABLE.to_string()),
        likes,
        comments,
        views,
        engagement: LatestPost::engagement_summary(likes, comments, views),
        posted_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scrape_profile_full() {
        let user = json!({
            "username": "brandco",
            "full_name": "Brand Co",
            "biography": "We make things.",
            "edge_followed_by": {"count": 50000},
            "edge_follow": {"count": 12},
            "profile_pic_url": "https://x/small.jpg",
            "profile_pic_url_hd": "https://x/y.jpg",
            "is_verified": true,
            "edge_owner_to_timeline_media": {
                "count": 340,
                "edges": [{
                    "node": {
                        "edge_media_to_caption": {"edges": [{"node": {"text": "Launch day"}}]},
                        "edge_liked_by": {"count": 120},
                        "edge_media_to_comment": {"count": 4},
                        "taken_at_timestamp": 1700000000
                    }
                }]
            }
        });

        let profile = parse_scrape_profile(&user, "brandco");

        assert_eq!(profile.followers, 50000);
        assert_eq!(profile.following, 12);
        assert_eq!(profile.posts, 340);
        assert_eq!(profile.profile_pic.as_deref(), Some("https://x/y.jpg"));
        assert_eq!(profile.full_name.as_deref(), Some("Brand Co"));
        assert!(profile.is_verified);
        assert!(!profile.is_private);

        let post = &profile.latest_posts[0];
        assert_eq!(post.caption, "Launch day");
        assert_eq!(post.likes, Some(120));
        assert_eq!(post.views, None);
        assert_eq!(post.engagement, "120 Likes, 4 Comments");
        assert!(post.posted_at.starts_with("2023-11-14T22:13:20"));
    }

    #[test]
    fn test_parse_scrape_profile_sparse() {
        let user = json!({"full_name": "", "profile_pic_url": ""});
        let profile = parse_scrape_profile(&user, "someone");

        assert_eq!(profile.username, "someone");
        assert_eq!(profile.full_name, None);
        assert_eq!(profile.profile_pic, None);
        assert_eq!(profile.followers, 0);
        assert!(profile.latest_posts.is_empty());
    }

    #[test]
    fn test_post_without_timestamp_has_sentinel_date() {
        let user = json!({
            "edge_owner_to_timeline_media": {
                "count": 1,
                "edges": [{ "node": { "edge_liked_by": {"count": 7} } }]
            }
        });

        let profile = parse_scrape_profile(&user, "someone");
        let post = &profile.latest_posts[0];

        assert_eq!(post.posted_at, NOT_PUBLICLY_AVAILABLE);
        assert_eq!(post.caption, NOT_PUBLICLY_AVAILABLE);
        assert_eq!(post.engagement, "7 Likes");
    }

    #[test]
    fn test_scrape_error_maps_to_app_error() {
        assert!(matches!(
            AppError::from(ScrapeError::NotFound),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from(ScrapeError::RateLimited),
            AppError::RateLimited(_)
        ));
        assert!(matches!(
            AppError::from(ScrapeError::Timeout),
            AppError::Timeout(_)
        ));
        assert!(matches!(
            AppError::from(ScrapeError::Upstream(500)),
            AppError::ExternalApiError(_)
        ));
    }
}
