//! Shared utility functions used across multiple modules.

use reqwest::StatusCode;

use crate::Error;

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Check if a string starts with `http://` or `https://`.
pub fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Truncate text to at most 180 characters for error messages.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(180).collect()
}

/// Current Unix timestamp in seconds.
pub fn unix_timestamp_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Normalize a base URL: trimmed, scheme checked, no trailing slash.
pub fn normalize_base_url(raw: &str, field: &str) -> Result<String, Error> {
    let base = raw.trim().trim_end_matches('/').to_string();
    if base.is_empty() {
        return Err(Error::Configuration(format!("{field} must not be empty")));
    }
    if !is_http_url(&base) {
        return Err(Error::Configuration(format!(
            "{field} must include http:// or https://"
        )));
    }
    Ok(base)
}

/// Map a non-success HTTP response from a remote service onto an error kind.
pub fn status_error(status: StatusCode, target: &str, body: &str) -> Error {
    let detail = if body.trim().is_empty() {
        format!("{target} (HTTP {})", status.as_u16())
    } else {
        format!("{target} (HTTP {}): {}", status.as_u16(), compact_text(body))
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::AccessDenied(detail),
        StatusCode::NOT_FOUND | StatusCode::NOT_ACCEPTABLE => Error::NotFound(detail),
        StatusCode::CONFLICT => Error::Conflict(detail),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Error::Validation(detail),
        _ => Error::Transport(detail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn normalize_text_option_rejects_empty() {
        assert_eq!(normalize_text_option(None), None);
        assert_eq!(normalize_text_option(Some("   ".to_string())), None);
    }

    #[test]
    fn normalize_text_option_trims_value() {
        assert_eq!(
            normalize_text_option(Some(" https://example.com ".to_string())),
            Some("https://example.com".to_string())
        );
    }

    #[test]
    fn is_http_url_accepts_valid_schemes() {
        assert!(is_http_url("http://localhost"));
        assert!(is_http_url("https://example.com"));
        assert!(!is_http_url("ftp://example.com"));
        assert!(!is_http_url("example.com"));
    }

    #[test]
    fn normalize_base_url_trims_trailing_slash() {
        assert_eq!(
            normalize_base_url("https://demo.supabase.co/", "url").unwrap(),
            "https://demo.supabase.co"
        );
        assert!(normalize_base_url("demo.supabase.co", "url").is_err());
        assert!(normalize_base_url("  ", "url").is_err());
    }

    #[test]
    fn status_error_maps_kinds() {
        let kind = |status| status_error(status, "notes", "").kind();
        assert_eq!(kind(StatusCode::FORBIDDEN), ErrorKind::AccessDenied);
        assert_eq!(kind(StatusCode::UNAUTHORIZED), ErrorKind::AccessDenied);
        assert_eq!(kind(StatusCode::NOT_FOUND), ErrorKind::NotFound);
        assert_eq!(kind(StatusCode::NOT_ACCEPTABLE), ErrorKind::NotFound);
        assert_eq!(kind(StatusCode::CONFLICT), ErrorKind::Conflict);
        assert_eq!(kind(StatusCode::BAD_REQUEST), ErrorKind::Validation);
        assert_eq!(kind(StatusCode::BAD_GATEWAY), ErrorKind::Transport);
    }
}
