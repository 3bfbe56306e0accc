//! Utility functions shared across opsdesk crates

use chrono::NaiveDate;

/// Generate a unique record identifier
#[must_use]
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Round `value` to `places` decimal digits, half away from zero
#[must_use]
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10_f64.powi(i32::try_from(places).unwrap_or(i32::MAX));
    (value * factor).round() / factor
}

/// Case-insensitive substring test; `needle` must already be lowercase
#[must_use]
pub fn contains_folded(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// Normalize a free-text search term: trimmed and lowercased, `None` when blank
#[must_use]
pub fn normalize_search(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Suggested download name, e.g. `activity-logs-2024-03-15.csv`
#[must_use]
pub fn export_filename(prefix: &str, date: NaiveDate, extension: &str) -> String {
    format!("{prefix}-{}.{extension}", date.format("%Y-%m-%d"))
}

/// Validate a feature flag key: lowercase ASCII, digits, `_`, `-` or `.`
#[must_use]
pub fn validate_flag_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= 64
        && key.chars().all(|c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-' || c == '.'
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_generate_id_unique() {
        let a = generate_id();
        let b = generate_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.675_49, 2), 1.68);
        assert_eq!(round_to(420.0 / 25_000.0 * 100.0, 2), 1.68);
        assert_eq!(round_to(2.5, 0), 3.0);
        assert_eq!(round_to(-1.005, 1), -1.0);
    }

    #[test]
    fn test_contains_folded() {
        assert!(contains_folded("Password Change", "password"));
        assert!(contains_folded("ADA@EXAMPLE.COM", "ada@"));
        assert!(!contains_folded("login", "logout"));
    }

    #[test]
    fn test_normalize_search() {
        assert_eq!(normalize_search("  Login "), Some("login".to_string()));
        assert_eq!(normalize_search("   "), None);
        assert_eq!(normalize_search(""), None);
    }

    #[test]
    fn test_export_filename() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(
            export_filename("activity-logs", date, "csv"),
            "activity-logs-2024-03-05.csv"
        );
    }

    #[test]
    fn test_validate_flag_key() {
        assert!(validate_flag_key("beta.calendar"));
        assert!(validate_flag_key("new_billing-v2"));
        assert!(!validate_flag_key(""));
        assert!(!validate_flag_key("Has Spaces"));
        assert!(!validate_flag_key(&"a".repeat(65)));
    }

    proptest! {
        #[test]
        fn test_round_to_is_idempotent(value in -1.0e6f64..1.0e6f64, places in 0u32..6) {
            let once = round_to(value, places);
            prop_assert!((round_to(once, places) - once).abs() < 1e-9);
        }

        #[test]
        fn test_normalized_search_is_lowercase(raw in "\\PC{0,40}") {
            if let Some(term) = normalize_search(&raw) {
                prop_assert_eq!(term.clone(), term.to_lowercase());
                prop_assert!(!term.trim().is_empty());
            }
        }
    }
}
