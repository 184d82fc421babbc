use crate::models::{is_unavailable, MediaCoverage, ProfileRecord, NOT_PUBLICLY_AVAILABLE};
use chrono::{Datelike, NaiveDate, Utc};
use std::fmt::Write;

const DOB_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%B %d, %Y", "%d %B %Y"];

/// Shows a date of birth with the age, e.g. `1990-05-01 (Age: 35)`.
///
/// Without a reported age the age is the difference in calendar years.
/// Dates that do not parse are returned unchanged.
pub fn format_dob_with_age(dob: &str, age: Option<u32>, today: NaiveDate) -> String {
    if is_unavailable(dob) {
        return NOT_PUBLICLY_AVAILABLE.to_string();
    }

    let Some(birth) = DOB_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(dob.trim(), fmt).ok())
    else {
        return dob.to_string();
    };

    let age = age.unwrap_or_else(|| (today.year() - birth.year()).max(0) as u32);
    format!("{} (Age: {})", dob, age)
}

fn or_sentinel(value: &str) -> &str {
    if is_unavailable(value) {
        NOT_PUBLICLY_AVAILABLE
    } else {
        value
    }
}

fn list_or_sentinel(values: &[String]) -> String {
    if values.is_empty() {
        NOT_PUBLICLY_AVAILABLE.to_string()
    } else {
        values.join(", ")
    }
}

/// Renders a merged profile as a sectioned plain-text report.
pub fn format_profile_report(record: &ProfileRecord) -> String {
    let mut out = String::new();
    let today = Utc::now().date_naive();

    // Writing into a String cannot fail.
    let _ = writeln!(out, "KYC PROFILE REPORT: @{}", record.id);
    let _ = writeln!(out, "Generated: {}", record.last_fetched.to_rfc3339());

    out.push_str("\n👤 PERSONAL\n");
    let _ = writeln!(out, "Full Name: {}", or_sentinel(&record.full_name));
    let _ = writeln!(
        out,
        "Date of Birth: {}",
        format_dob_with_age(&record.date_of_birth, record.age, today)
    );
    let _ = writeln!(out, "Profession: {}", or_sentinel(&record.profession));
    let _ = writeln!(out, "Education: {}", or_sentinel(&record.education));
    let _ = writeln!(out, "Location: {}", or_sentinel(&record.location));
    let _ = writeln!(out, "Country: {}", or_sentinel(&record.country));
    let _ = writeln!(out, "Family: {}", or_sentinel(&record.family_info));
    let _ = writeln!(out, "Interests: {}", list_or_sentinel(&record.interests));
    let _ = writeln!(
        out,
        "Income / Net Worth: {}",
        or_sentinel(&record.income_or_net_worth)
    );

    out.push_str("\n💼 BUSINESS\n");
    let _ = writeln!(out, "Name: {}", or_sentinel(&record.business_name));
    let _ = writeln!(out, "Type: {}", or_sentinel(&record.business_type));
    let _ = writeln!(out, "Website: {}", or_sentinel(&record.business_website));
    let _ = writeln!(out, "Overview: {}", or_sentinel(&record.business_overview));
    let _ = writeln!(out, "Account ID: {}", or_sentinel(&record.business_account_id));

    out.push_str("\n📊 INSTAGRAM\n");
    let _ = writeln!(out, "Followers: {}", or_sentinel(&record.instagram_followers));
    let _ = writeln!(out, "Following: {}", or_sentinel(&record.instagram_following));
    let _ = writeln!(out, "Posts: {}", or_sentinel(&record.instagram_posts_count));
    let _ = writeln!(out, "Engagement Ratio: {}", or_sentinel(&record.engagement_ratio));
    let _ = writeln!(out, "Post Frequency: {}", or_sentinel(&record.post_frequency));
    let _ = writeln!(out, "Intro: {}", or_sentinel(&record.intro));

    out.push_str("\n📣 CONTENT\n");
    let _ = writeln!(out, "Type: {}", or_sentinel(&record.content_type));
    let _ = writeln!(
        out,
        "Quality: {} ({})",
        or_sentinel(&record.content_quality.rating),
        or_sentinel(&record.content_quality.notes)
    );

    out.push_str("\n📰 LATEST POSTS\n");
    if record.latest_posts.is_empty() {
        let _ = writeln!(out, "{}", NOT_PUBLICLY_AVAILABLE);
    }
    for (i, post) in record.latest_posts.iter().enumerate() {
        let posted = if is_unavailable(&post.posted_at) {
            "unknown date"
        } else {
            post.posted_at.as_str()
        };
        let _ = writeln!(
            out,
            "{}. {} [{}] ({})",
            i + 1,
            post.caption,
            posted,
            post.engagement
        );
    }

    out.push_str("\n🌐 OTHER SOCIAL MEDIA\n");
    if record.other_social_media.is_empty() {
        let _ = writeln!(out, "{}", NOT_PUBLICLY_AVAILABLE);
    }
    for account in &record.other_social_media {
        let _ = writeln!(
            out,
            "- {}: {} ({} followers) {}",
            account.platform, account.handle, account.followers, account.url
        );
    }

    out.push_str("\n🏆 RECOGNITION\n");
    let _ = writeln!(out, "Awards: {}", or_sentinel(&record.awards));
    let coverage = match &record.media_coverage {
        MediaCoverage::Text(text) => or_sentinel(text).to_string(),
        MediaCoverage::Items(items) => list_or_sentinel(items),
    };
    let _ = writeln!(out, "Media Coverage: {}", coverage);

    out.push_str("\nℹ️ SOURCES\n");
    let _ = writeln!(out, "Sources: {}", list_or_sentinel(&record.enriched_sources));
    let _ = writeln!(out, "Confidence Score: {}/100", record.confidence_score);

    out
}
