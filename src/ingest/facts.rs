//! Typed per-page facts
//!
//! The extractor produces [`ExtractedFacts`]; the coordinator wraps them in a
//! [`PageFacts`] bundle together with the page identity and its hyperlinks.
//! A bundle must pass [`PageFacts::validate`] to become a [`SiteBundle`]
//! before anything is written.

use thiserror::Error;

/// A detected library or framework
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Technology {
    pub name: String,
    pub category: String,
    pub version: String,
    /// Detection confidence, 0-100
    pub confidence: u32,
    /// Where the technology was observed (script source or vendor site)
    pub url: String,
}

/// An anchor found on a page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HyperlinkFact {
    pub url: String,
    pub inner_text: String,
}

/// Ad-tracking markers found on a page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdTrackingFacts {
    pub used: bool,
    /// Snapshot of the cookies set for the page
    pub cookies: Option<String>,
    /// `;`-separated sources of suspected tracking pixels
    pub tracking_pixel: Option<String>,
    /// `;`-separated links carrying UTM parameters
    pub utm_links: Option<String>,
    /// `;`-separated tag-manager tags and `gtag` config ids
    ///
    /// Only feeds `used`; the `ad_tracking` table has no column for it.
    pub tag_manager: Option<String>,
}

/// What an embedded module is used for
///
/// Closed set mirrored by the CHECK constraint on `embedded_module.use_case`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum UseCase {
    None,
    Game,
    Compression,
    CryptographicUtility,
    OtherApplication,
    ImageProcessing,
    #[default]
    Unknown,
}

impl UseCase {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Game => "Game",
            Self::Compression => "Compression",
            Self::CryptographicUtility => "Cryptographic Utility",
            Self::OtherApplication => "Other Application",
            Self::ImageProcessing => "Image Processing",
            Self::Unknown => "Unknown",
        }
    }

    /// Maps a free-form tag onto the closed set; anything unrecognized is
    /// [`UseCase::Unknown`]
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "none" => Self::None,
            "game" => Self::Game,
            "compression" => Self::Compression,
            "cryptographic utility" | "crypto-utility" | "crypto" => Self::CryptographicUtility,
            "other application" | "other-application" => Self::OtherApplication,
            "image processing" | "image-processing" => Self::ImageProcessing,
            _ => Self::Unknown,
        }
    }
}

/// One embedded binary module discovered from a page's scripts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleFile {
    /// Name under which the module was stored locally
    pub local_name: String,
    /// File name of the module at its source
    pub source_file_name: String,
    /// Script that referenced the module
    pub source_script_name: String,
    pub file_size: Option<u64>,
    pub imports: Vec<String>,
    pub exports: Vec<String>,
    pub tables: Vec<String>,
    pub memory: Vec<String>,
    pub num_global: Option<u32>,
    pub num_func: Option<u32>,
    pub num_type: Option<u32>,
    /// Function symbols the referencing script calls into
    pub functions: Vec<String>,
}

/// Embedded module findings for one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbeddedModules {
    pub used: bool,
    pub use_case: UseCase,
    pub files: Vec<ModuleFile>,
}

/// Everything the fact extractor reports about one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFacts {
    pub languages: Vec<String>,
    pub libraries: Vec<Technology>,
    pub frameworks: Vec<Technology>,
    pub ad_tracking: AdTrackingFacts,
    pub embedded_modules: EmbeddedModules,
}

/// A page's fact bundle as assembled during a visit
///
/// The four collections stay `None` until the step that produces them has
/// run. A bundle with any of them missing is rejected as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageFacts {
    pub name: String,
    pub url: String,
    /// Url of the page this one was reached from, or `"seed"`
    pub root: String,
    pub languages: Option<Vec<String>>,
    pub libraries: Option<Vec<Technology>>,
    pub frameworks: Option<Vec<Technology>>,
    pub hyperlinks: Option<Vec<HyperlinkFact>>,
    pub ad_tracking: AdTrackingFacts,
    pub embedded_modules: EmbeddedModules,
}

/// Why a bundle was not ingested
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("page name is empty")]
    MissingName,

    #[error("page url is empty")]
    MissingUrl,

    #[error("no {0} were collected")]
    MissingCollection(&'static str),
}

/// A validated bundle; every field is present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteBundle {
    pub name: String,
    pub url: String,
    pub root: String,
    pub languages: Vec<String>,
    pub libraries: Vec<Technology>,
    pub frameworks: Vec<Technology>,
    pub hyperlinks: Vec<HyperlinkFact>,
    pub ad_tracking: AdTrackingFacts,
    pub embedded_modules: EmbeddedModules,
}

impl PageFacts {
    /// Starts an empty bundle for a page
    pub fn new(name: impl Into<String>, url: impl Into<String>, root: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            root: root.into(),
            ..Default::default()
        }
    }

    /// Fills in everything the extractor reported
    pub fn with_extracted(mut self, facts: ExtractedFacts) -> Self {
        self.languages = Some(facts.languages);
        self.libraries = Some(facts.libraries);
        self.frameworks = Some(facts.frameworks);
        self.ad_tracking = facts.ad_tracking;
        self.embedded_modules = facts.embedded_modules;
        self
    }

    pub fn with_hyperlinks(mut self, hyperlinks: Vec<HyperlinkFact>) -> Self {
        self.hyperlinks = Some(hyperlinks);
        self
    }

    /// Checks the bundle is complete
    pub fn validate(self) -> Result<SiteBundle, Rejection> {
        if self.name.trim().is_empty() {
            return Err(Rejection::MissingName);
        }
        if self.url.trim().is_empty() {
            return Err(Rejection::MissingUrl);
        }

        Ok(SiteBundle {
            languages: self
                .languages
                .ok_or(Rejection::MissingCollection("languages"))?,
            libraries: self
                .libraries
                .ok_or(Rejection::MissingCollection("libraries"))?,
            frameworks: self
                .frameworks
                .ok_or(Rejection::MissingCollection("frameworks"))?,
            hyperlinks: self
                .hyperlinks
                .ok_or(Rejection::MissingCollection("hyperlinks"))?,
            name: self.name,
            url: self.url,
            root: self.root,
            ad_tracking: self.ad_tracking,
            embedded_modules: self.embedded_modules,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> PageFacts {
        PageFacts::new("a.example", "https://a.example", "seed")
            .with_extracted(ExtractedFacts::default())
            .with_hyperlinks(vec![])
    }

    #[test]
    fn test_complete_bundle_validates() {
        let bundle = complete().validate().unwrap();
        assert_eq!(bundle.name, "a.example");
        assert_eq!(bundle.root, "seed");
    }

    #[test]
    fn test_missing_hyperlinks_rejected() {
        let facts = PageFacts::new("a.example", "https://a.example", "seed")
            .with_extracted(ExtractedFacts::default());
        assert_eq!(
            facts.validate().unwrap_err(),
            Rejection::MissingCollection("hyperlinks")
        );
    }

    #[test]
    fn test_missing_extraction_rejected() {
        let facts =
            PageFacts::new("a.example", "https://a.example", "seed").with_hyperlinks(vec![]);
        assert_eq!(
            facts.validate().unwrap_err(),
            Rejection::MissingCollection("languages")
        );
    }

    #[test]
    fn test_missing_identity_rejected() {
        let mut facts = complete();
        facts.name = String::new();
        assert_eq!(facts.validate().unwrap_err(), Rejection::MissingName);

        let mut facts = complete();
        facts.url = "  ".to_string();
        assert_eq!(facts.validate().unwrap_err(), Rejection::MissingUrl);
    }

    #[test]
    fn test_use_case_from_tag() {
        assert_eq!(UseCase::from_tag("Game"), UseCase::Game);
        assert_eq!(UseCase::from_tag("cryptographic utility"), UseCase::CryptographicUtility);
        assert_eq!(UseCase::from_tag("Image Processing"), UseCase::ImageProcessing);
        assert_eq!(UseCase::from_tag("None"), UseCase::None);
        assert_eq!(UseCase::from_tag("mining"), UseCase::Unknown);
        assert_eq!(UseCase::default().to_db_string(), "Unknown");
    }
}
