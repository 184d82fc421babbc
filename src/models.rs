use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Placeholder for any field that no source could confirm.
pub const NOT_PUBLICLY_AVAILABLE: &str = "Not Publicly Available";

/// Returns true when a value carries no information (blank or the sentinel).
pub fn is_unavailable(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case(NOT_PUBLICLY_AVAILABLE)
}

fn sentinel() -> String {
    NOT_PUBLICLY_AVAILABLE.to_string()
}

// ============ Merged Profile ============

/// The canonical KYC profile assembled from every source.
///
/// Every string field is either populated or [`NOT_PUBLICLY_AVAILABLE`].
/// Counts are strings so abbreviated forms like "1.2K" survive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    /// Identity key: the normalized handle.
    pub id: String,
    pub instagram_username: String,
    pub instagram_handle: String,
    pub full_name: String,
    pub date_of_birth: String,
    pub age: Option<u32>,
    pub profile_picture_url: String,
    pub profession: String,
    pub education: String,
    pub interests: Vec<String>,
    pub family_info: String,
    pub country: String,
    pub location: String,
    pub business_name: String,
    pub business_type: String,
    pub business_website: String,
    pub business_overview: String,
    pub business_account_id: String,
    pub instagram_followers: String,
    pub instagram_following: String,
    pub instagram_posts_count: String,
    pub engagement_ratio: String,
    pub post_frequency: String,
    pub content_type: String,
    pub content_quality: ContentQuality,
    pub latest_posts: Vec<LatestPost>,
    pub other_social_media: Vec<SocialAccount>,
    pub awards: String,
    pub media_coverage: MediaCoverage,
    pub income_or_net_worth: String,
    pub intro: String,
    pub enriched_sources: Vec<String>,
    /// 0-100, as reported by the generative sources.
    pub confidence_score: u8,
    pub last_fetched: DateTime<Utc>,
}

impl ProfileRecord {
    /// The seed record: every field set to the sentinel (or empty/zero for
    /// lists and numbers).
    pub fn unavailable(id: impl Into<String>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            instagram_username: sentinel(),
            instagram_handle: sentinel(),
            full_name: sentinel(),
            date_of_birth: sentinel(),
            age: None,
            profile_picture_url: sentinel(),
            profession: sentinel(),
            education: sentinel(),
            interests: Vec::new(),
            family_info: sentinel(),
            country: sentinel(),
            location: sentinel(),
            business_name: sentinel(),
            business_type: sentinel(),
            business_website: sentinel(),
            business_overview: sentinel(),
            business_account_id: sentinel(),
            instagram_followers: sentinel(),
            instagram_following: sentinel(),
            instagram_posts_count: sentinel(),
            engagement_ratio: sentinel(),
            post_frequency: sentinel(),
            content_type: sentinel(),
            content_quality: ContentQuality::default(),
            latest_posts: Vec::new(),
            other_social_media: Vec::new(),
            awards: sentinel(),
            media_coverage: MediaCoverage::default(),
            income_or_net_worth: sentinel(),
            intro: sentinel(),
            enriched_sources: Vec::new(),
            confidence_score: 0,
            last_fetched: fetched_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentQuality {
    pub rating: String,
    pub notes: String,
}

impl Default for ContentQuality {
    fn default() -> Self {
        Self {
            rating: sentinel(),
            notes: sentinel(),
        }
    }
}

/// A recent post with nullable engagement numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestPost {
    pub caption: String,
    pub likes: Option<u64>,
    pub comments: Option<u64>,
    pub views: Option<u64>,
    /// Human readable summary, e.g. "120 Likes, 4 Comments".
    pub engagement: String,
    pub posted_at: String,
}

impl LatestPost {
    /// Formats "X Likes, Y Comments, Z Views", skipping unknown numbers.
    pub fn engagement_summary(
        likes: Option<u64>,
        comments: Option<u64>,
        views: Option<u64>,
    ) -> String {
        let parts: Vec<String> = [(likes, "Likes"), (comments, "Comments"), (views, "Views")]
            .into_iter()
            .filter_map(|(count, label)| count.map(|c| format!("{} {}", c, label)))
            .collect();

        if parts.is_empty() {
            sentinel()
        } else {
            parts.join(", ")
        }
    }

    /// Lenient conversion from a model-produced post object.
    ///
    /// A placeholder post (no caption and no engagement) is dropped.
    fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let likes = count_field(obj, "likes");
        let comments = count_field(obj, "comments");
        let views = count_field(obj, "views");
        let caption = text_field(obj, "caption").filter(|c| !is_unavailable(c));
        let engagement = text_field(obj, "engagement")
            .filter(|e| !is_unavailable(e))
            .unwrap_or_else(|| Self::engagement_summary(likes, comments, views));

        if caption.is_none() && is_unavailable(&engagement) {
            return None;
        }

        Some(Self {
            caption: caption.unwrap_or_else(sentinel),
            likes,
            comments,
            views,
            engagement,
            posted_at: text_field(obj, "postedAt").unwrap_or_else(sentinel),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialAccount {
    pub platform: String,
    pub handle: String,
    pub followers: String,
    pub url: String,
}

impl SocialAccount {
    fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let platform = text_field(obj, "platform").filter(|p| !is_unavailable(p))?;
        Some(Self {
            platform,
            handle: text_field(obj, "handle").unwrap_or_else(sentinel),
            followers: text_field(obj, "followers").unwrap_or_else(sentinel),
            url: text_field(obj, "url").unwrap_or_else(sentinel),
        })
    }
}

/// Models answer with either a paragraph or a list of outlets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MediaCoverage {
    Text(String),
    Items(Vec<String>),
}

impl Default for MediaCoverage {
    fn default() -> Self {
        MediaCoverage::Text(sentinel())
    }
}

impl MediaCoverage {
    pub fn is_unavailable(&self) -> bool {
        match self {
            MediaCoverage::Text(text) => is_unavailable(text),
            MediaCoverage::Items(items) => items.iter().all(|i| is_unavailable(i)),
        }
    }
}

// ============ Source Contributions ============

/// Fields a generative source contributed, before merging.
///
/// Built field by field from loosely typed JSON: a wrongly typed field is
/// dropped on its own instead of invalidating the whole contribution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialProfile {
    pub instagram_username: Option<String>,
    pub instagram_handle: Option<String>,
    pub full_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub age: Option<u32>,
    pub profile_picture_url: Option<String>,
    pub profession: Option<String>,
    pub education: Option<String>,
    pub interests: Option<Vec<String>>,
    pub family_info: Option<String>,
    pub country: Option<String>,
    pub location: Option<String>,
    pub business_name: Option<String>,
    pub business_type: Option<String>,
    pub business_website: Option<String>,
    pub business_overview: Option<String>,
    pub business_account_id: Option<String>,
    pub instagram_followers: Option<String>,
    pub instagram_following: Option<String>,
    pub instagram_posts_count: Option<String>,
    pub engagement_ratio: Option<String>,
    pub post_frequency: Option<String>,
    pub content_type: Option<String>,
    pub content_quality_rating: Option<String>,
    pub content_quality_notes: Option<String>,
    pub latest_posts: Option<Vec<LatestPost>>,
    pub other_social_media: Option<Vec<SocialAccount>>,
    pub awards: Option<String>,
    pub media_coverage: Option<MediaCoverage>,
    pub income_or_net_worth: Option<String>,
    pub intro: Option<String>,
    pub enriched_sources: Option<Vec<String>>,
    pub confidence_score: Option<u8>,
}

impl PartialProfile {
    /// Builds a contribution from a JSON value. Anything but an object yields
    /// an empty contribution.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        let content_quality = obj.get("contentQuality").and_then(Value::as_object);

        Self {
            instagram_username: text_field(obj, "instagramUsername"),
            instagram_handle: text_field(obj, "instagramHandle"),
            full_name: text_field(obj, "fullName"),
            date_of_birth: text_field(obj, "dateOfBirth"),
            age: count_field(obj, "age").and_then(|a| u32::try_from(a).ok()),
            profile_picture_url: text_field(obj, "profilePictureUrl"),
            profession: text_field(obj, "profession"),
            education: text_field(obj, "education"),
            interests: string_list(obj, "interests"),
            family_info: text_field(obj, "familyInfo"),
            country: text_field(obj, "country"),
            location: text_field(obj, "location"),
            business_name: text_field(obj, "businessName"),
            business_type: text_field(obj, "businessType"),
            business_website: text_field(obj, "businessWebsite"),
            business_overview: text_field(obj, "businessOverview"),
            business_account_id: text_field(obj, "businessAccountId"),
            instagram_followers: text_field(obj, "instagramFollowers"),
            instagram_following: text_field(obj, "instagramFollowing"),
            instagram_posts_count: text_field(obj, "instagramPostsCount"),
            engagement_ratio: text_field(obj, "engagementRatio"),
            post_frequency: text_field(obj, "postFrequency"),
            content_type: text_field(obj, "contentType"),
            content_quality_rating: content_quality.and_then(|cq| text_field(cq, "rating")),
            content_quality_notes: content_quality.and_then(|cq| text_field(cq, "notes")),
            latest_posts: obj
                .get("latestPosts")
                .and_then(Value::as_array)
                .map(|posts| posts.iter().filter_map(LatestPost::from_value).collect()),
            other_social_media: obj
                .get("otherSocialMedia")
                .and_then(Value::as_array)
                .map(|accounts| {
                    accounts
                        .iter()
                        .filter_map(SocialAccount::from_value)
                        .collect()
                }),
            awards: text_field(obj, "awards"),
            media_coverage: media_coverage_field(obj),
            income_or_net_worth: text_field(obj, "incomeOrNetWorth"),
            intro: text_field(obj, "intro"),
            enriched_sources: string_list(obj, "enrichedSources"),
            confidence_score: confidence_field(obj),
        }
    }
}

/// Typed result of the profile scrape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeProfile {
    pub username: String,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub followers: u64,
    pub following: u64,
    pub posts: u64,
    pub profile_pic: Option<String>,
    pub is_private: bool,
    pub is_verified: bool,
    pub latest_posts: Vec<LatestPost>,
}

// ============ Lenient Field Extraction ============

/// String fields; numbers and booleans are stringified, blanks dropped.
fn text_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Non-negative integers, accepting "1,234" style strings.
fn count_field(obj: &Map<String, Value>, key: &str) -> Option<u64> {
    match obj.get(key)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

fn confidence_field(obj: &Map<String, Value>) -> Option<u8> {
    let raw = match obj.get("confidenceScore")? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').parse().ok()?,
        _ => return None,
    };
    if !raw.is_finite() {
        return None;
    }
    Some(raw.clamp(0.0, 100.0).round() as u8)
}

fn string_list(obj: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    match obj.get(key)? {
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty() && !is_unavailable(s))
                .map(str::to_string)
                .collect(),
        ),
        Value::String(s) if !s.trim().is_empty() && !is_unavailable(s) => {
            Some(vec![s.trim().to_string()])
        }
        _ => None,
    }
}

fn media_coverage_field(obj: &Map<String, Value>) -> Option<MediaCoverage> {
    match obj.get("mediaCoverage")? {
        Value::String(s) if !s.trim().is_empty() => Some(MediaCoverage::Text(s.trim().to_string())),
        Value::Array(_) => string_list(obj, "mediaCoverage").map(MediaCoverage::Items),
        _ => None,
    }
}

// ============ API Request/Response Models ============

#[derive(Debug, Clone, Deserialize)]
pub struct LookupRequest {
    pub handle: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UsernameQuery {
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveQuery {
    pub limit: Option<i64>,
}
