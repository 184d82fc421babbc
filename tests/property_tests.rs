/// Property-based tests using proptest
/// Tests invariants that should hold for all handles and all model output
use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use rust_kyc_api::enrichment::{is_valid_handle, merge_profiles, normalize_handle};
use rust_kyc_api::model_output::{extract_json_object, parse_partial_profile};
use rust_kyc_api::models::{PartialProfile, ScrapeProfile, NOT_PUBLICLY_AVAILABLE};

// Property: Handle normalization should never panic
proptest! {
    #[test]
    fn normalization_never_panics(raw in "\\PC*") {
        let _ = normalize_handle(&raw);
    }

    #[test]
    fn normalized_handles_are_always_valid(raw in "\\PC*") {
        if let Ok(handle) = normalize_handle(&raw) {
            prop_assert!(is_valid_handle(&handle));
        }
    }

    #[test]
    fn valid_handles_are_fixed_points(handle in "[a-z0-9._]{1,30}") {
        prop_assert_eq!(normalize_handle(&handle).unwrap(), handle);
    }
}

// Property: Every accepted shape of the same account maps to one identity key
proptest! {
    #[test]
    fn input_shapes_collide_to_one_key(handle in "[a-z0-9_][a-z0-9._]{0,29}") {
        // Bare dot segments are path navigation in URLs, not usernames
        prop_assume!(handle != "." && handle != "..");

        let at_form = format!("@{}", handle.to_uppercase());
        let url_form = format!("https://www.instagram.com/{}/", handle);
        let schemeless = format!("instagram.com/{}?igsh=abc", handle);

        prop_assert_eq!(normalize_handle(&at_form).unwrap(), handle.clone());
        prop_assert_eq!(normalize_handle(&url_form).unwrap(), handle.clone());
        prop_assert_eq!(normalize_handle(&schemeless).unwrap(), handle);
    }

    #[test]
    fn overlong_handles_are_rejected(handle in "[a-z]{31,60}") {
        prop_assert!(normalize_handle(&handle).is_err());
    }
}

// Property: Model output parsing is total
proptest! {
    #[test]
    fn parsing_never_panics(text in "\\PC*") {
        let _ = extract_json_object(&text);
        let _ = parse_partial_profile("test", &text);
    }

    #[test]
    fn object_is_found_inside_prose(
        prefix in "[a-zA-Z ,.:\n]{0,40}",
        suffix in "[a-zA-Z ,.:\n]{0,40}",
        name in "[a-zA-Z][a-zA-Z ]{0,19}"
    ) {
        let text = format!("{}{{\"fullName\": \"{}\"}}{}", prefix, name, suffix);
        let partial = parse_partial_profile("test", &text);
        prop_assert_eq!(partial.full_name, Some(name.trim().to_string()));
    }
}

// Property: Scrape counts always win over generative guesses
proptest! {
    #[test]
    fn scrape_counts_always_win(
        followers in any::<u64>(),
        following in any::<u64>(),
        guess in "\\PC{0,12}"
    ) {
        let generative = PartialProfile {
            instagram_followers: Some(guess.clone()),
            instagram_following: Some(guess),
            ..Default::default()
        };
        let scrape = ScrapeProfile {
            username: "brandco".to_string(),
            full_name: None,
            bio: None,
            followers,
            following,
            posts: 0,
            profile_pic: None,
            is_private: false,
            is_verified: false,
            latest_posts: vec![],
        };
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let record = merge_profiles("brandco", Some(generative), None, Some(scrape), at);

        prop_assert_eq!(record.instagram_followers, followers.to_string());
        prop_assert_eq!(record.instagram_following, following.to_string());
        prop_assert_eq!(record.instagram_posts_count, "0");
        prop_assert_eq!(record.profile_picture_url, NOT_PUBLICLY_AVAILABLE);
    }
}
