use crate::UrlError;
use url::Url;

/// Strips a single trailing slash from a URL string
///
/// This is the only normalization applied before visited-registry lookups;
/// `https://a.example/` and `https://a.example` refer to the same page.
///
/// # Examples
///
/// ```
/// use webstack_census::url::strip_trailing_slash;
///
/// assert_eq!(strip_trailing_slash("https://a.example/"), "https://a.example");
/// assert_eq!(strip_trailing_slash("https://a.example/x//"), "https://a.example/x/");
/// assert_eq!(strip_trailing_slash("https://a.example"), "https://a.example");
/// ```
pub fn strip_trailing_slash(url: &str) -> &str {
    url.strip_suffix('/').unwrap_or(url)
}

/// Parses a candidate hyperlink and checks it is worth visiting
///
/// Accepts absolute `http`/`https` URLs with a host. Everything else
/// (`javascript:`, `mailto:`, relative paths, data URIs) is rejected.
///
/// # Examples
///
/// ```
/// use webstack_census::url::parse_crawlable;
///
/// assert!(parse_crawlable("https://a.example/x").is_ok());
/// assert!(parse_crawlable("mailto:someone@a.example").is_err());
/// assert!(parse_crawlable("/relative").is_err());
/// ```
pub fn parse_crawlable(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    Ok(url)
}
