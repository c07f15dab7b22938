//! Helpers for sanitizing data before it enters tracing span attributes.
//!
//! Traces are safe to share for debugging: these functions keep investor
//! e-mail addresses and full storage keys out of spans and log lines.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Masks the local part of an e-mail address, keeping its first character
/// and the domain.
///
/// - `jane.doe@fund.test` → `j***@fund.test`
/// - `x@fund.test` → `*@fund.test`
/// - `not-an-email` → `***`
pub fn redact_email(email: &str) -> String {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
            let mut chars = local.chars();
            match (chars.next(), chars.next()) {
                (Some(first), Some(_)) => format!("{}***@{}", first, domain),
                _ => format!("*@{}", domain),
            }
        }
        _ => "***".to_string(),
    }
}

/// Returns only the final segment of an object-store key.
///
/// Keys embed subscription and investor identifiers in their directories;
/// the file name alone is enough to follow a document through a trace.
pub fn redact_key(key: &str) -> String {
    key.rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Returns a short deterministic hash of a key for correlation without
/// exposing the key itself.
pub fn hash_key(key: &str) -> String {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Shortens an upstream response body for inclusion in errors and logs.
pub fn truncate_body(body: &str, max_chars: usize) -> String {
    let body = body.trim();
    match body.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &body[..cut]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_email_keeps_domain() {
        assert_eq!(redact_email("jane.doe@fund.test"), "j***@fund.test");
        assert_eq!(redact_email("  ops@arranger.test "), "o***@arranger.test");
    }

    #[test]
    fn test_redact_email_single_char_local_part() {
        assert_eq!(redact_email("x@fund.test"), "*@fund.test");
    }

    #[test]
    fn test_redact_email_malformed() {
        assert_eq!(redact_email("not-an-email"), "***");
        assert_eq!(redact_email("@fund.test"), "***");
        assert_eq!(redact_email("jane@"), "***");
        assert_eq!(redact_email(""), "***");
    }

    #[test]
    fn test_redact_key_returns_file_name() {
        assert_eq!(
            redact_key("subscriptions/sub-1/inv-9/converted/pack.pdf"),
            "pack.pdf"
        );
        assert_eq!(redact_key("pack.docx"), "pack.docx");
        assert_eq!(redact_key("dir/"), "dir");
        assert_eq!(redact_key(""), "<unknown>");
    }

    #[test]
    fn test_truncate_body() {
        assert_eq!(truncate_body("  short  ", 10), "short");
        assert_eq!(truncate_body("abcdefghij", 4), "abcd…");
        assert_eq!(truncate_body("ééééé", 2), "éé…");
    }

    #[test]
    fn test_hash_key_deterministic() {
        let h1 = hash_key("a/b/pack.pdf");
        assert_eq!(h1, hash_key("a/b/pack.pdf"));
        assert_eq!(h1.len(), 16);
        assert_ne!(h1, hash_key("a/c/pack.pdf"));
    }
}
