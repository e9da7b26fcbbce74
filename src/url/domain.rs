use url::Url;

/// Second-level labels that act as public suffixes under a country-code TLD
/// (e.g. `co.uk`, `com.au`).
const SECOND_LEVEL_SUFFIXES: &[&str] = &[
    "ac", "co", "com", "edu", "gov", "net", "org", "ne", "or", "go", "gob", "nic",
];

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host, it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use webstack_census::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Reduces a host name to its registrable domain
///
/// The registrable domain is the last two labels of the host, or the last
/// three when the second-to-last label is a common second-level suffix under
/// a two-letter country code (`example.co.uk`). IP addresses and single-label
/// hosts are returned unchanged. A leading `www.` never matters because only
/// the trailing labels are kept.
///
/// # Examples
///
/// ```
/// use webstack_census::url::registrable_domain;
///
/// assert_eq!(registrable_domain("blog.example.com"), "example.com");
/// assert_eq!(registrable_domain("www.example.co.uk"), "example.co.uk");
/// assert_eq!(registrable_domain("a.example"), "a.example");
/// assert_eq!(registrable_domain("127.0.0.1"), "127.0.0.1");
/// ```
pub fn registrable_domain(host: &str) -> String {
    let host = host.trim_end_matches('.').to_lowercase();

    if host.parse::<std::net::IpAddr>().is_ok() || host.starts_with('[') {
        return host;
    }

    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() <= 2 {
        return labels.join(".");
    }

    let tld = labels[labels.len() - 1];
    let second = labels[labels.len() - 2];
    let keep = if tld.len() == 2 && SECOND_LEVEL_SUFFIXES.contains(&second) {
        3
    } else {
        2
    };

    labels[labels.len() - keep..].join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_simple_domain() {
        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_with_port() {
        let url = Url::parse("https://example.com:8080/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_mixed_case() {
        let url = Url::parse("https://Example.COM/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_registrable_strips_subdomains() {
        assert_eq!(registrable_domain("example.com"), "example.com");
        assert_eq!(registrable_domain("www.example.com"), "example.com");
        assert_eq!(registrable_domain("api.v2.example.com"), "example.com");
    }

    #[test]
    fn test_registrable_country_code_suffix() {
        assert_eq!(registrable_domain("example.co.uk"), "example.co.uk");
        assert_eq!(registrable_domain("shop.example.com.au"), "example.com.au");
        // Three-letter TLDs never take a second-level suffix
        assert_eq!(registrable_domain("co.example.com"), "example.com");
    }

    #[test]
    fn test_registrable_unusual_hosts() {
        assert_eq!(registrable_domain("localhost"), "localhost");
        assert_eq!(registrable_domain("127.0.0.1"), "127.0.0.1");
        assert_eq!(registrable_domain("example.com."), "example.com");
        assert_eq!(registrable_domain("EXAMPLE.com"), "example.com");
    }
}
