use url::Url;

use crate::error::ShortenError;

/// Syntactic check of a long URL. Never dereferences it.
///
/// Surrounding whitespace is trimmed; the trimmed string is what gets stored.
/// Only absolute `http`/`https` URLs with a host are accepted.
pub fn validate_long_url(input: &str) -> Result<&str, ShortenError> {
    let url = input.trim();
    if url.is_empty() {
        return Err(ShortenError::InvalidLongUrl("URL must not be empty".into()));
    }

    let parsed = Url::parse(url).map_err(|e| ShortenError::InvalidLongUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ShortenError::InvalidLongUrl(format!(
                "unsupported scheme {other:?}, expected http or https"
            )))
        }
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(ShortenError::InvalidLongUrl("URL has no host".into()));
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https() {
        assert_eq!(
            validate_long_url("https://example.com/a").unwrap(),
            "https://example.com/a"
        );
        assert!(validate_long_url("http://localhost:8080/x?y=1#z").is_ok());
        assert!(validate_long_url("HTTPS://EXAMPLE.COM").is_ok());
    }

    #[test]
    fn trims_whitespace() {
        assert_eq!(
            validate_long_url("  https://example.com/a \n").unwrap(),
            "https://example.com/a"
        );
    }

    #[test]
    fn rejects_malformed_input() {
        for bad in [
            "",
            "   ",
            "not a url",
            "example.com",
            "/relative/path",
            "javascript:alert(1)",
            "ftp://example.com/file",
            "mailto:someone@example.com",
            "http://",
        ] {
            assert!(
                matches!(validate_long_url(bad), Err(ShortenError::InvalidLongUrl(_))),
                "{bad:?} should be rejected"
            );
        }
    }
}
