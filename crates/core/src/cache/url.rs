//! URL normalization for stable cache keys.

use url::Url;

/// Error type for URL normalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Normalize a URL string so equivalent requests hash identically.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Lowercase the scheme and host
/// 3. Drop the port when it is the scheme's default
/// 4. Remove fragment (#...)
/// 5. Sort query parameters by key (repeated keys keep their relative order)
pub fn normalize(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    if let Some(host) = parsed.host_str() {
        let lower = host.to_lowercase();
        if lower != host {
            parsed
                .set_host(Some(&lower))
                .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
        }
    }

    // The url crate already elides default ports for special schemes.
    if parsed.port().is_some() && parsed.port() == default_port(parsed.scheme()) {
        parsed
            .set_port(None)
            .map_err(|_| UrlError::InvalidUrl(format!("cannot drop port of {trimmed}")))?;
    }

    parsed.set_fragment(None);

    if parsed.query().is_some() {
        let mut pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
        if pairs.is_empty() {
            parsed.set_query(None);
        } else {
            pairs.sort_by(|a, b| a.0.cmp(&b.0));
            parsed.query_pairs_mut().clear().extend_pairs(&pairs);
        }
    }

    Ok(parsed)
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" | "ws" => Some(80),
        "https" | "wss" => Some(443),
        "ftp" => Some(21),
        _ => None,
    }
}
