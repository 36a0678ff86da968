//! URL validation and normalization utilities.

use log::warn;

/// Maximum URL length (2048 characters). This matches common browser and
/// server limits.
const MAX_URL_LENGTH: usize = 2048;

/// Validates and normalizes a URL.
///
/// Adds an `https://` prefix if missing, then validates that the URL is
/// syntactically valid and uses an http/https scheme. Logs a warning and
/// returns `None` if the URL is invalid, too long, or uses an unsupported
/// scheme.
pub fn validate_and_normalize_url(url: &str) -> Option<String> {
    if url.len() > MAX_URL_LENGTH {
        warn!(
            "Skipping URL exceeding maximum length ({} > {}): {}...",
            url.len(),
            MAX_URL_LENGTH,
            &url[..50.min(url.len())]
        );
        return None;
    }

    let normalized = if !url.starts_with("http://") && !url.starts_with("https://") {
        format!("https://{url}")
    } else {
        url.to_string()
    };

    if normalized.len() > MAX_URL_LENGTH {
        warn!(
            "Skipping normalized URL exceeding maximum length ({} > {})",
            normalized.len(),
            MAX_URL_LENGTH,
        );
        return None;
    }

    match url::Url::parse(&normalized) {
        Ok(parsed) => match parsed.scheme() {
            "http" | "https" => Some(normalized),
            _ => {
                warn!("Skipping unsupported scheme for URL: {url}");
                None
            }
        },
        Err(_) => {
            warn!("Skipping invalid URL: {url}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::validate_and_normalize_url;

    #[test]
    fn test_adds_https_prefix() {
        assert_eq!(
            validate_and_normalize_url("cityofexample.gov/bids"),
            Some("https://cityofexample.gov/bids".to_string())
        );
    }

    #[test]
    fn test_preserves_existing_scheme() {
        assert_eq!(
            validate_and_normalize_url("http://example.gov"),
            Some("http://example.gov".to_string())
        );
        assert_eq!(
            validate_and_normalize_url("https://example.gov"),
            Some("https://example.gov".to_string())
        );
    }

    #[test]
    fn test_rejects_invalid_url() {
        assert_eq!(validate_and_normalize_url("not a valid url!!!"), None);
        assert_eq!(validate_and_normalize_url(""), None);
    }

    #[test]
    fn test_rejects_too_long_url() {
        let long_url = format!("https://example.gov/{}", "a".repeat(2100));
        assert_eq!(validate_and_normalize_url(&long_url), None);
    }
}
