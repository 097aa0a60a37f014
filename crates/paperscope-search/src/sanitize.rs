//! Query sanitization.
//!
//! Validates and normalizes raw input before any network activity.
//! Bracketed field qualifiers like `epilepsy[tiab]` or `Smith[Author]`
//! are preserved — the corpora rely on them.

use lazy_static::lazy_static;
use regex::Regex;

use paperscope_common::error::SearchError;

/// Default maximum query length in characters.
pub const DEFAULT_MAX_QUERY_LEN: usize = 200;

lazy_static! {
    /// Characters a query may consist of: alphanumerics, whitespace,
    /// basic punctuation, and square brackets for field tags.
    static ref SAFE_CHARS: Regex =
        Regex::new(r#"^[a-zA-Z0-9\s\-,.'"():?!\[\]]+$"#).expect("static regex");

    /// Known injection signatures. Any hit rejects the query outright.
    static ref DANGEROUS_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i);\s*(DROP|DELETE|INSERT|UPDATE|SELECT)").expect("static regex"),
        Regex::new(r"&&|\|\|").expect("static regex"),
        Regex::new(r"(?i)<script").expect("static regex"),
        Regex::new(r"(?i)javascript:").expect("static regex"),
        Regex::new(r"\$\(").expect("static regex"),
        Regex::new(r"`").expect("static regex"),
    ];
}

/// Validate and normalize a raw query. Pure: no I/O, no shared state.
/// Idempotent: `sanitize(sanitize(q)) == sanitize(q)` for any accepted q.
pub fn sanitize(raw: &str, max_len: usize) -> Result<String, SearchError> {
    let query = raw.trim();

    if query.is_empty() {
        return Err(SearchError::Validation("query is empty".to_string()));
    }
    if query.chars().count() > max_len {
        return Err(SearchError::Validation(format!(
            "query too long: {} characters (max {max_len})",
            query.chars().count()
        )));
    }

    if !SAFE_CHARS.is_match(query) {
        return Err(SearchError::Validation(
            "query contains disallowed characters".to_string(),
        ));
    }

    for pattern in DANGEROUS_PATTERNS.iter() {
        if pattern.is_match(query) {
            return Err(SearchError::Validation(
                "query matches an injection signature".to_string(),
            ));
        }
    }

    Ok(query.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(q: &str) -> String {
        sanitize(q, DEFAULT_MAX_QUERY_LEN).unwrap()
    }

    #[test]
    fn test_valid_query_passes() {
        assert_eq!(ok("seizure prediction from sEEG"), "seizure prediction from sEEG");
    }

    #[test]
    fn test_trims_whitespace() {
        assert_eq!(ok("  phase amplitude coupling \n"), "phase amplitude coupling");
    }

    #[test]
    fn test_idempotent() {
        let queries = [
            "normal query about epilepsy",
            "  padded query  ",
            "Smith[Author] AND epilepsy[tiab]",
            "what is a Koopman operator?",
        ];
        for q in queries {
            let once = ok(q);
            let twice = sanitize(&once, DEFAULT_MAX_QUERY_LEN).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_field_tags_preserved() {
        assert_eq!(ok("epilepsy[tiab] AND thalamus[tiab]"), "epilepsy[tiab] AND thalamus[tiab]");
    }

    #[test]
    fn test_empty_rejected() {
        assert!(matches!(
            sanitize("   ", DEFAULT_MAX_QUERY_LEN),
            Err(SearchError::Validation(_))
        ));
    }

    #[test]
    fn test_too_long_rejected() {
        let long = "a".repeat(DEFAULT_MAX_QUERY_LEN + 1);
        assert!(matches!(
            sanitize(&long, DEFAULT_MAX_QUERY_LEN),
            Err(SearchError::Validation(_))
        ));
        // Exactly at the limit is fine
        let at_limit = "a".repeat(DEFAULT_MAX_QUERY_LEN);
        assert!(sanitize(&at_limit, DEFAULT_MAX_QUERY_LEN).is_ok());
    }

    #[test]
    fn test_injection_attempts_rejected() {
        let attacks = [
            "query; DROP TABLE users",
            "query && rm -rf /",
            "query<script>alert(1)</script>",
            "javascript:alert(1)",
            "query $(whoami)",
            "query `id`",
        ];
        for attack in attacks {
            assert!(
                sanitize(attack, DEFAULT_MAX_QUERY_LEN).is_err(),
                "accepted: {attack}"
            );
        }
    }

    #[test]
    fn test_disallowed_characters_rejected() {
        assert!(sanitize("query % { }", DEFAULT_MAX_QUERY_LEN).is_err());
        assert!(sanitize("query | grep", DEFAULT_MAX_QUERY_LEN).is_err());
    }
}
