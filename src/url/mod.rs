//! URL handling module for Webstack-Census
//!
//! This module provides registrable-domain extraction, internal/external link
//! classification and the trailing-slash normalization used by the visited
//! registry.

mod domain;
mod normalize;

// Re-export main functions
pub use domain::{extract_domain, registrable_domain};
pub use normalize::{parse_crawlable, strip_trailing_slash};

use url::Url;

/// Where a hyperlink points relative to the page it was found on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkScope {
    /// Same registrable domain as the originating page
    Internal,
    /// Different registrable domain
    External,
}

impl LinkScope {
    /// Returns true if a link with this scope passes the follow flags
    ///
    /// When both flags are set, or both are cleared, no domain filtering is
    /// applied and every link passes.
    pub fn is_followed(&self, follow_internal: bool, follow_external: bool) -> bool {
        if follow_internal == follow_external {
            return true;
        }
        match self {
            Self::Internal => follow_internal,
            Self::External => follow_external,
        }
    }
}

/// Classifies a link as internal or external to its originating page
///
/// Both URLs are reduced to their registrable domain before comparison.
/// Returns `None` when either URL cannot be parsed or has no host.
///
/// # Examples
///
/// ```
/// use webstack_census::url::{classify_link, LinkScope};
///
/// assert_eq!(
///     classify_link("https://a.example", "https://a.example/x"),
///     Some(LinkScope::Internal)
/// );
/// assert_eq!(
///     classify_link("https://a.example", "https://other.example/y"),
///     Some(LinkScope::External)
/// );
/// assert_eq!(
///     classify_link("https://www.example.com", "https://blog.example.com"),
///     Some(LinkScope::Internal)
/// );
/// ```
pub fn classify_link(origin: &str, link: &str) -> Option<LinkScope> {
    let origin_domain = host_domain(origin)?;
    let link_domain = host_domain(link)?;

    if origin_domain == link_domain {
        Some(LinkScope::Internal)
    } else {
        Some(LinkScope::External)
    }
}

fn host_domain(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    extract_domain(&parsed).map(|host| registrable_domain(&host))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_internal() {
        assert_eq!(
            classify_link("https://a.example/", "https://a.example/deep/page"),
            Some(LinkScope::Internal)
        );
    }

    #[test]
    fn test_classify_subdomain_is_internal() {
        assert_eq!(
            classify_link("https://shop.example.co.uk", "https://example.co.uk/about"),
            Some(LinkScope::Internal)
        );
    }

    #[test]
    fn test_classify_external() {
        assert_eq!(
            classify_link("https://a.example", "https://b.example"),
            Some(LinkScope::External)
        );
    }

    #[test]
    fn test_classify_unparseable() {
        assert_eq!(classify_link("https://a.example", "/relative"), None);
        assert_eq!(classify_link("seed", "https://a.example"), None);
    }

    #[test]
    fn test_follow_flags() {
        use LinkScope::*;

        // Only internal
        assert!(Internal.is_followed(true, false));
        assert!(!External.is_followed(true, false));

        // Only external
        assert!(!Internal.is_followed(false, true));
        assert!(External.is_followed(false, true));

        // Both set or both cleared: no filtering
        assert!(Internal.is_followed(true, true));
        assert!(External.is_followed(true, true));
        assert!(Internal.is_followed(false, false));
        assert!(External.is_followed(false, false));
    }
}
