/// JSON schema description embedded in every generative prompt.
pub const PROFILE_SCHEMA: &str = r#"{
  "instagramUsername": string,
  "instagramHandle": string,
  "fullName": string,
  "dateOfBirth": string | "Not Publicly Available",
  "age": number | null,
  "profilePictureUrl": string | "Not Publicly Available",
  "profession": string | "Not Publicly Available",
  "education": string | "Not Publicly Available",
  "interests": [string] | [],
  "familyInfo": string | "Not Publicly Available",
  "country": string | "Not Publicly Available",
  "location": string | "Not Publicly Available",
  "businessName": string | "Not Publicly Available",
  "businessType": string | "Not Publicly Available",
  "businessWebsite": string | "Not Publicly Available",
  "businessOverview": string | "Not Publicly Available",
  "businessAccountId": string | "Not Publicly Available",
  "engagementRatio": string | "Not Publicly Available",
  "postFrequency": string | "Not Publicly Available",
  "contentType": string | "Not Publicly Available",
  "contentQuality": { "rating": string, "notes": string },
  "latestPosts": [
    { "caption": string, "likes": number | null, "comments": number | null, "views": number | null, "engagement": string, "postedAt": string }
  ],
  "otherSocialMedia": [
    { "platform": string, "handle": string, "followers": string, "url": string }
  ],
  "awards": string | "Not Publicly Available",
  "mediaCoverage": string | [string] | "Not Publicly Available",
  "incomeOrNetWorth": string | "Not Publicly Available",
  "intro": string,
  "enrichedSources": [string],
  "confidenceScore": number (0-100)
}"#;

/// Builds the KYC analyst prompt for one normalized handle.
pub fn kyc_profile_prompt(handle: &str) -> String {
    format!(
        r#"You are an expert KYC analyst. Build a verified profile of this Instagram user.

STRICT RULES:
- Never guess or invent.
- If data cannot be confirmed from trusted, publicly available sources, set "Not Publicly Available".
- Followers, Following, and Posts are EXCLUDED (handled separately).
- Respond with one JSON object ONLY. No explanations, no markdown, no text outside the JSON.

Instagram Handle: "{handle}"

Required Schema (fill every field):
{schema}
"#,
        handle = handle,
        schema = PROFILE_SCHEMA
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_handle_and_schema() {
        let prompt = kyc_profile_prompt("brandco");
        assert!(prompt.contains(r#"Instagram Handle: "brandco""#));
        assert!(prompt.contains("\"confidenceScore\""));
        assert!(prompt.contains("Not Publicly Available"));
    }
}
