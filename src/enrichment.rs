/// Profile aggregation for a social-media handle.
///
/// The workflow for one lookup:
/// 1. Normalize the handle into its identity key (rejects bad input early)
/// 2. Fan out to Gemini, OpenAI and the Instagram scrape concurrently
/// 3. Wait for all three to settle; a failed source contributes nothing
/// 4. Merge: sentinel seed <- Gemini <- OpenAI <- scrape (counts/media win)
/// 5. Stamp the identity key and fetch time
use crate::config::Config;
use crate::errors::AppError;
use crate::model_output::parse_partial_profile;
use crate::models::{
    is_unavailable, MediaCoverage, PartialProfile, ProfileRecord, ScrapeProfile,
};
use crate::prompts::kyc_profile_prompt;
use crate::services::{GeminiService, InstagramService, OpenAiService};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

pub const SOURCE_GEMINI: &str = "gemini";
pub const SOURCE_OPENAI: &str = "openai";
pub const SOURCE_INSTAGRAM: &str = "instagram";

fn handle_regex() -> &'static Regex {
    static HANDLE_RE: OnceLock<Regex> = OnceLock::new();
    HANDLE_RE.get_or_init(|| {
        Regex::new(r"^[a-z0-9._]{1,30}$").expect("handle pattern is a valid regex")
    })
}

/// Checks an already-normalized handle against the allowed character set.
pub fn is_valid_handle(handle: &str) -> bool {
    handle_regex().is_match(handle)
}

/// Normalize a bare username, `@username` or profile URL into the identity
/// key used for lookups and history.
///
/// For URLs the first path segment is the username, so
/// `https://instagram.com/jane.doe/reels` resolves to `jane.doe`.
pub fn normalize_handle(raw: &str) -> Result<String, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest("Handle is required".to_string()));
    }

    let candidate = if looks_like_url(trimmed) {
        first_path_segment(trimmed)?
    } else {
        trimmed.to_string()
    };

    let handle = candidate
        .strip_prefix('@')
        .unwrap_or(&candidate)
        .trim()
        .to_lowercase();

    if !is_valid_handle(&handle) {
        tracing::warn!("❌ Invalid handle rejected: {}", raw);
        return Err(AppError::BadRequest(format!(
            "Invalid handle '{}': use letters, digits, '.' or '_' (max 30)",
            raw.trim()
        )));
    }

    Ok(handle)
}

fn looks_like_url(input: &str) -> bool {
    input.contains("://") || (input.contains('/') && !input.starts_with('@'))
}

fn first_path_segment(input: &str) -> Result<String, AppError> {
    let with_scheme = if input.contains("://") {
        input.to_string()
    } else {
        format!("https://{}", input)
    };

    let url = url::Url::parse(&with_scheme)
        .map_err(|e| AppError::BadRequest(format!("Invalid profile URL '{}': {}", input, e)))?;

    url.path_segments()
        .and_then(|mut segments| segments.find(|s| !s.is_empty()))
        .map(str::to_string)
        .ok_or_else(|| AppError::BadRequest(format!("Profile URL '{}' has no username", input)))
}

/// Fans out to the three sources and merges what comes back.
#[derive(Clone)]
pub struct ProfileAggregator {
    gemini: GeminiService,
    openai: OpenAiService,
    instagram: InstagramService,
}

impl ProfileAggregator {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        Ok(Self {
            gemini: GeminiService::new(config)?,
            openai: OpenAiService::new(config)?,
            instagram: InstagramService::new(config)?,
        })
    }

    /// Build a fresh profile for a handle.
    ///
    /// Only an invalid handle is an error. Upstream failures are logged and
    /// treated as empty contributions, so even a total outage yields a fully
    /// populated (all-sentinel) record.
    pub async fn fetch_client_profile(&self, raw_handle: &str) -> Result<ProfileRecord, AppError> {
        let handle = normalize_handle(raw_handle)?;
        let prompt = kyc_profile_prompt(&handle);

        tracing::info!("🔍 Aggregating profile for @{}", handle);

        let (gemini, openai, scrape) = tokio::join!(
            self.gemini_contribution(&prompt),
            self.openai_contribution(&prompt),
            self.scrape_contribution(&handle),
        );

        let record = merge_profiles(&handle, gemini, openai, scrape, Utc::now());

        tracing::info!(
            "✓ Profile for @{} assembled from {:?}",
            handle,
            record.enriched_sources
        );
        Ok(record)
    }

    async fn gemini_contribution(&self, prompt: &str) -> Option<PartialProfile> {
        match self.gemini.generate_text(prompt).await {
            Ok(text) => Some(parse_partial_profile(SOURCE_GEMINI, &text)),
            Err(e) => {
                tracing::warn!("Gemini fetch failed: {}", e);
                None
            }
        }
    }

    async fn openai_contribution(&self, prompt: &str) -> Option<PartialProfile> {
        match self.openai.complete(prompt).await {
            Ok(text) => Some(parse_partial_profile(SOURCE_OPENAI, &text)),
            Err(e) => {
                tracing::warn!("OpenAI fetch failed: {}", e);
                None
            }
        }
    }

    async fn scrape_contribution(&self, handle: &str) -> Option<ScrapeProfile> {
        match self.instagram.fetch_profile(handle).await {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::warn!("Instagram fetch failed for @{}: {}", handle, e);
                None
            }
        }
    }
}

/// Merge source contributions in fixed priority.
///
/// Generative sources only overlay informative values (non-blank, not the
/// sentinel), Gemini first and OpenAI second. The scrape overlays last and
/// its counts, profile picture, display name and bio always win. A source
/// counts as contributing only when it wrote at least one field.
pub fn merge_profiles(
    id: &str,
    gemini: Option<PartialProfile>,
    openai: Option<PartialProfile>,
    scrape: Option<ScrapeProfile>,
    fetched_at: DateTime<Utc>,
) -> ProfileRecord {
    let mut record = ProfileRecord::unavailable(id, fetched_at);
    let mut contributors: Vec<&str> = Vec::new();

    for (source, partial) in [(SOURCE_GEMINI, gemini), (SOURCE_OPENAI, openai)] {
        if let Some(partial) = partial {
            if overlay_generative(&mut record, partial) {
                contributors.push(source);
            }
        }
    }

    if let Some(scrape) = scrape {
        overlay_scrape(&mut record, scrape);
        contributors.push(SOURCE_INSTAGRAM);
    }

    for source in contributors {
        if !record.enriched_sources.iter().any(|s| s == source) {
            record.enriched_sources.push(source.to_string());
        }
    }

    record.id = id.to_string();
    record.last_fetched = fetched_at;
    record
}

/// Returns true if the field was written.
fn set_text(target: &mut String, value: Option<String>) -> bool {
    match value.filter(|v| !is_unavailable(v)) {
        Some(value) => {
            *target = value;
            true
        }
        None => false,
    }
}

/// Placeholder entries are already dropped while parsing, so an empty list
/// here means the source had nothing to say.
fn set_list<T>(target: &mut Vec<T>, value: Option<Vec<T>>) -> bool {
    match value.filter(|v| !v.is_empty()) {
        Some(value) => {
            *target = value;
            true
        }
        None => false,
    }
}

/// Overlays informative fields; returns true if any field was written.
fn overlay_generative(record: &mut ProfileRecord, partial: PartialProfile) -> bool {
    // Exhaustive on purpose: a new field must be merged or explicitly ignored.
    let PartialProfile {
        instagram_username,
        instagram_handle,
        full_name,
        date_of_birth,
        age,
        profile_picture_url,
        profession,
        education,
        interests,
        family_info,
        country,
        location,
        business_name,
        business_type,
        business_website,
        business_overview,
        business_account_id,
        instagram_followers,
        instagram_following,
        instagram_posts_count,
        engagement_ratio,
        post_frequency,
        content_type,
        content_quality_rating,
        content_quality_notes,
        latest_posts,
        other_social_media,
        awards,
        media_coverage,
        income_or_net_worth,
        intro,
        enriched_sources,
        confidence_score,
    } = partial;

    let mut wrote = false;

    wrote |= set_text(&mut record.instagram_username, instagram_username);
    wrote |= set_text(&mut record.instagram_handle, instagram_handle);
    wrote |= set_text(&mut record.full_name, full_name);
    wrote |= set_text(&mut record.date_of_birth, date_of_birth);
    if age.is_some() {
        record.age = age;
        wrote = true;
    }
    wrote |= set_text(&mut record.profile_picture_url, profile_picture_url);
    wrote |= set_text(&mut record.profession, profession);
    wrote |= set_text(&mut record.education, education);
    wrote |= set_list(&mut record.interests, interests);
    wrote |= set_text(&mut record.family_info, family_info);
    wrote |= set_text(&mut record.country, country);
    wrote |= set_text(&mut record.location, location);
    wrote |= set_text(&mut record.business_name, business_name);
    wrote |= set_text(&mut record.business_type, business_type);
    wrote |= set_text(&mut record.business_website, business_website);
    wrote |= set_text(&mut record.business_overview, business_overview);
    wrote |= set_text(&mut record.business_account_id, business_account_id);
    wrote |= set_text(&mut record.instagram_followers, instagram_followers);
    wrote |= set_text(&mut record.instagram_following, instagram_following);
    wrote |= set_text(&mut record.instagram_posts_count, instagram_posts_count);
    wrote |= set_text(&mut record.engagement_ratio, engagement_ratio);
    wrote |= set_text(&mut record.post_frequency, post_frequency);
    wrote |= set_text(&mut record.content_type, content_type);
    wrote |= set_text(&mut record.content_quality.rating, content_quality_rating);
    wrote |= set_text(&mut record.content_quality.notes, content_quality_notes);
    wrote |= set_list(&mut record.latest_posts, latest_posts);
    wrote |= set_list(&mut record.other_social_media, other_social_media);
    wrote |= set_text(&mut record.awards, awards);
    if let Some(coverage) = media_coverage.filter(|c| !c.is_unavailable()) {
        record.media_coverage = match coverage {
            MediaCoverage::Items(items) => {
                MediaCoverage::Items(items.into_iter().filter(|i| !is_unavailable(i)).collect())
            }
            text => text,
        };
        wrote = true;
    }
    wrote |= set_text(&mut record.income_or_net_worth, income_or_net_worth);
    wrote |= set_text(&mut record.intro, intro);
    wrote |= set_list(&mut record.enriched_sources, enriched_sources);
    if let Some(score) = confidence_score {
        record.confidence_score = score.min(100);
        wrote = true;
    }

    wrote
}

fn overlay_scrape(record: &mut ProfileRecord, scrape: ScrapeProfile) {
    let ScrapeProfile {
        username: _,
        full_name,
        bio,
        followers,
        following,
        posts,
        profile_pic,
        is_private: _,
        is_verified: _,
        latest_posts,
    } = scrape;

    record.instagram_followers = followers.to_string();
    record.instagram_following = following.to_string();
    record.instagram_posts_count = posts.to_string();
    if let Some(pic) = profile_pic {
        record.profile_picture_url = pic;
    }
    if let Some(name) = full_name {
        record.full_name = name;
    }
    if let Some(bio) = bio {
        record.intro = bio;
    }
    set_list(&mut record.latest_posts, Some(latest_posts));
}
