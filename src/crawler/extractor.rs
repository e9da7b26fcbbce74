//! Fact extraction from loaded pages
//!
//! This module handles parsing HTML content to extract:
//! - Hyperlinks to follow (from `<a>` tags and canonical links)
//! - Script languages and script-sourced libraries
//! - Frameworks announced by `<meta name="generator">`
//! - Ad-tracking markers (cookies, tracking pixels, UTM links, tag managers)
//! - Embedded binary modules referenced from the page

use crate::crawler::fetcher::PageHandle;
use crate::ingest::{
    AdTrackingFacts, EmbeddedModules, ExtractedFacts, HyperlinkFact, ModuleFile, Technology,
    UseCase,
};
use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use thiserror::Error;
use url::Url;

/// Errors that abort fact extraction for a page
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Empty document: {0}")]
    EmptyDocument(String),

    #[error("Invalid selector: {0}")]
    Selector(String),
}

/// Turns a loaded page into technology facts
#[async_trait]
pub trait FactExtractor: Send + Sync {
    async fn extract(&self, page: &PageHandle) -> Result<ExtractedFacts, ExtractError>;
}

/// Heuristic [`FactExtractor`] working on the page markup alone
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlExtractor;

#[async_trait]
impl FactExtractor for HtmlExtractor {
    async fn extract(&self, page: &PageHandle) -> Result<ExtractedFacts, ExtractError> {
        if page.body.trim().is_empty() {
            return Err(ExtractError::EmptyDocument(page.url.clone()));
        }

        let document = Html::parse_document(&page.body);
        let base = &page.final_url;

        let scripts = collect_scripts(&document, base)?;

        Ok(ExtractedFacts {
            languages: scripts.languages,
            libraries: scripts.libraries,
            frameworks: extract_frameworks(&document, base)?,
            ad_tracking: extract_ad_tracking(&document, &page.body, base, &page.cookies)?,
            embedded_modules: extract_embedded_modules(&page.body, base),
        })
    }
}

const LIBRARY_CATEGORY: &str = "JavaScript libraries";
const FRAMEWORK_CATEGORY: &str = "CMS";

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($regex).expect("pattern is a valid literal regex"));
    };
}

// Hidden or one-pixel declarations inside an inline `style`
regex!(
    PIXEL_STYLE_REGEX,
    r"(?i)(?:^|;)\s*(?:width|height|display|visibility)\s*:\s*(?:hidden|collapse|none|0|0px|1|1px)\s*(?:;|$)"
);
regex!(IMAGE_FILE_REGEX, r"(?i)\.(?:jpe?g|gif|png|tiff|bmp|svg|webp)(?:[?#]|$)");
regex!(UTM_REGEX, r"[?&]utm_[A-Za-z0-9_]+=");
regex!(TAG_MANAGER_REGEX, r"(?i)<[^<>]*googletagmanager[^<>]*>");
regex!(GTAG_CONFIG_REGEX, r#"gtag\(\s*['"]config['"]\s*,\s*['"]([^'"]+)['"]"#);
regex!(WASM_FILE_REGEX, r#"["']([A-Za-z0-9_-]+\.wasm)["']"#);
regex!(WEBASSEMBLY_CALL_REGEX, r"WebAssembly\.[A-Za-z_][A-Za-z0-9_]*");

fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|_| ExtractError::Selector(css.to_string()))
}

/// Extracts every followable hyperlink with its anchor text
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs and fragment-only links
/// - Anything that is not http(s) once resolved
///
/// Duplicate (url, text) pairs are reported once, in document order.
pub fn extract_hyperlinks(html: &str, base_url: &Url) -> Vec<HyperlinkFact> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(url) = element.value().attr("href").and_then(|h| resolve_link(h, base_url))
            {
                let link = HyperlinkFact {
                    url,
                    inner_text: anchor_text(&element),
                };
                if seen.insert(link.clone()) {
                    links.push(link);
                }
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(url) = element.value().attr("href").and_then(|h| resolve_link(h, base_url))
            {
                let link = HyperlinkFact {
                    url,
                    inner_text: String::new(),
                };
                if seen.insert(link.clone()) {
                    links.push(link);
                }
            }
        }
    }

    links
}

fn anchor_text(element: &ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    match absolute_url.scheme() {
        "http" | "https" => Some(absolute_url.to_string()),
        _ => None,
    }
}

struct ScriptFacts {
    languages: Vec<String>,
    libraries: Vec<Technology>,
}

fn collect_scripts(document: &Html, base_url: &Url) -> Result<ScriptFacts, ExtractError> {
    let script_selector = selector("script")?;

    let mut languages: Vec<String> = Vec::new();
    let mut libraries: Vec<Technology> = Vec::new();

    for script in document.select(&script_selector) {
        let language = match script.value().attr("type") {
            Some(script_type) => language_for_type(script_type),
            None => Some("JavaScript".to_string()),
        };
        if let Some(language) = language {
            if !languages.contains(&language) {
                languages.push(language);
            }
        }

        let Some(src) = script.value().attr("src") else {
            continue;
        };
        let Some(source) = resolve_link(src, base_url) else {
            continue;
        };
        if let Some(library) = library_from_source(&source) {
            let duplicate = libraries
                .iter()
                .any(|l| l.name == library.name && l.version == library.version);
            if !duplicate {
                libraries.push(library);
            }
        }
    }

    Ok(ScriptFacts {
        languages,
        libraries,
    })
}

/// Maps a script `type` attribute onto a language name
///
/// `text/javascript` and `module` are JavaScript; any other media subtype is
/// reported capitalized, with the JSON, PHP and TypeScript spellings fixed up.
fn language_for_type(script_type: &str) -> Option<String> {
    let script_type = script_type.trim().to_lowercase();
    if script_type.is_empty() || script_type == "module" {
        return Some("JavaScript".to_string());
    }

    let (_, subtype) = script_type.split_once('/')?;
    let subtype = subtype.split(';').next().unwrap_or("").trim();
    let subtype = subtype.strip_prefix("x-").unwrap_or(subtype);

    let language = match subtype {
        "" => return None,
        s if s.contains("json") => "JSON".to_string(),
        "javascript" | "ecmascript" | "jsx" | "babel" => "JavaScript".to_string(),
        "php" => "PHP".to_string(),
        "typescript" => "TypeScript".to_string(),
        other => capitalize(other),
    };

    Some(language)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Derives a library from a script source url
///
/// `https://cdn.example/js/jquery-ui.min.js?v=1.13` becomes "Jquery Ui" at
/// version "1.13".
fn library_from_source(source: &str) -> Option<Technology> {
    let url = Url::parse(source).ok()?;
    let file_name = url.path_segments()?.filter(|s| !s.is_empty()).last()?;

    let stem = file_name
        .strip_suffix(".js")
        .unwrap_or(file_name)
        .trim_end_matches(".min");

    let name = stem
        .split(|c: char| c == '.' || c == '-' || c == '_')
        .filter(|word| !word.is_empty() && *word != "min" && *word != "js")
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ");

    if name.is_empty() {
        return None;
    }

    let version = url
        .query_pairs()
        .find(|(key, _)| matches!(key.as_ref(), "v" | "ver" | "version"))
        .map(|(_, value)| value.trim_start_matches('v').to_string())
        .unwrap_or_default();

    Some(Technology {
        name,
        category: LIBRARY_CATEGORY.to_string(),
        version,
        confidence: 100,
        url: source.to_string(),
    })
}

/// Reads `<meta name="generator" content="WordPress 6.4">` style tags
fn extract_frameworks(document: &Html, base_url: &Url) -> Result<Vec<Technology>, ExtractError> {
    let generator_selector = selector("meta[name='generator'][content]")?;
    let mut frameworks: Vec<Technology> = Vec::new();

    for element in document.select(&generator_selector) {
        let content = element.value().attr("content").unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }

        let (name, version) = match content.rsplit_once(' ') {
            Some((name, version)) if version.starts_with(|c: char| c.is_ascii_digit()) => {
                (name.trim(), version)
            }
            _ => (content, ""),
        };

        let framework = Technology {
            name: name.to_string(),
            category: FRAMEWORK_CATEGORY.to_string(),
            version: version.to_string(),
            confidence: 100,
            url: base_url.to_string(),
        };
        if !frameworks.contains(&framework) {
            frameworks.push(framework);
        }
    }

    Ok(frameworks)
}

const PIXEL_ATTRIBUTES: &[&str] = &["width", "height", "display", "visibility"];
const PIXEL_VALUES: &[&str] = &["hidden", "collapse", "none", "0", "0px", "1", "1px"];

fn extract_ad_tracking(
    document: &Html,
    body: &str,
    base_url: &Url,
    cookies: &[String],
) -> Result<AdTrackingFacts, ExtractError> {
    let img_selector = selector("img[src]")?;
    let a_selector = selector("a[href]")?;

    let mut pixels: Vec<String> = Vec::new();
    for img in document.select(&img_selector) {
        if !is_hidden_image(&img) {
            continue;
        }
        let Some(src) = img.value().attr("src").and_then(|s| resolve_link(s, base_url)) else {
            continue;
        };
        if !IMAGE_FILE_REGEX.is_match(&src) && !pixels.contains(&src) {
            pixels.push(src);
        }
    }

    let mut utm_links: Vec<String> = Vec::new();
    for anchor in document.select(&a_selector) {
        let Some(href) = anchor.value().attr("href").and_then(|h| resolve_link(h, base_url))
        else {
            continue;
        };
        if UTM_REGEX.is_match(&href) && !utm_links.contains(&href) {
            utm_links.push(href);
        }
    }

    let joined = |items: Vec<String>, sep: &str| (!items.is_empty()).then(|| items.join(sep));

    let facts = AdTrackingFacts {
        cookies: joined(cookies.to_vec(), "; "),
        tracking_pixel: joined(pixels, ";"),
        utm_links: joined(utm_links, ";"),
        tag_manager: joined(tag_manager_markers(body), ";"),
        used: false,
    };

    Ok(AdTrackingFacts {
        used: facts.cookies.is_some()
            || facts.tracking_pixel.is_some()
            || facts.utm_links.is_some()
            || facts.tag_manager.is_some(),
        ..facts
    })
}

/// An image hidden or shrunk to at most one pixel, via attributes or inline style
fn is_hidden_image(img: &ElementRef) -> bool {
    let element = img.value();

    let by_attribute = PIXEL_ATTRIBUTES.iter().any(|key| {
        element
            .attr(key)
            .map(|v| PIXEL_VALUES.contains(&v.trim()))
            .unwrap_or(false)
    });

    by_attribute
        || element
            .attr("style")
            .map(|style| PIXEL_STYLE_REGEX.is_match(style))
            .unwrap_or(false)
}

/// Google Tag Manager tags and `gtag('config', ...)` measurement ids
fn tag_manager_markers(body: &str) -> Vec<String> {
    let mut markers: Vec<String> = Vec::new();

    let tags = TAG_MANAGER_REGEX.find_iter(body).map(|m| m.as_str().to_string());
    let configs = GTAG_CONFIG_REGEX
        .captures_iter(body)
        .filter_map(|caps| caps.get(1))
        .map(|id| format!("gtag:{}", id.as_str()));

    for marker in tags.chain(configs) {
        if !markers.contains(&marker) {
            markers.push(marker);
        }
    }

    markers
}

/// Finds quoted `name.wasm` references and `WebAssembly.*` calls in the page
///
/// Each module file is reported with every `WebAssembly` function the page
/// calls. Nothing is downloaded, so the binary details stay unknown.
fn extract_embedded_modules(body: &str, base_url: &Url) -> EmbeddedModules {
    let mut names: Vec<&str> = Vec::new();
    for name in WASM_FILE_REGEX
        .captures_iter(body)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
    {
        if !names.contains(&name) {
            names.push(name);
        }
    }

    if names.is_empty() {
        return EmbeddedModules::default();
    }

    let mut functions: Vec<String> = Vec::new();
    for call in WEBASSEMBLY_CALL_REGEX.find_iter(body) {
        let call = call.as_str().to_string();
        if !functions.contains(&call) {
            functions.push(call);
        }
    }

    let files = names
        .into_iter()
        .map(|name| ModuleFile {
            local_name: name.to_string(),
            source_file_name: base_url
                .join(name)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| name.to_string()),
            source_script_name: base_url.to_string(),
            functions: functions.clone(),
            ..Default::default()
        })
        .collect();

    EmbeddedModules {
        used: true,
        use_case: UseCase::Unknown,
        files,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.com/games/").unwrap()
    }

    fn page(body: &str) -> PageHandle {
        PageHandle {
            url: base_url().to_string(),
            final_url: base_url(),
            body: body.to_string(),
            cookies: vec![],
        }
    }

    #[test]
    fn test_extract_absolute_link() {
        let html = r#"<a href="https://other.com/page">Other</a>"#;
        let links = extract_hyperlinks(html, &base_url());
        assert_eq!(
            links,
            vec![HyperlinkFact {
                url: "https://other.com/page".to_string(),
                inner_text: "Other".to_string(),
            }]
        );
    }

    #[test]
    fn test_extract_relative_link() {
        let html = r#"<a href="/about">About</a>"#;
        let links = extract_hyperlinks(html, &base_url());
        assert_eq!(links[0].url, "https://example.com/about");
    }

    #[test]
    fn test_anchor_text_whitespace_collapsed() {
        let html = "<a href=\"/a\">\n  Read <b>more</b>\n</a>";
        let links = extract_hyperlinks(html, &base_url());
        assert_eq!(links[0].inner_text, "Read more");
    }

    #[test]
    fn test_skip_special_links() {
        let html = r##"
            <a href="javascript:void(0)">JS</a>
            <a href="mailto:a@example.com">Mail</a>
            <a href="tel:+123">Call</a>
            <a href="data:text/plain,hi">Data</a>
            <a href="#top">Top</a>
            <a href="/file.zip" download>Zip</a>
            <a href="ftp://example.com/f">FTP</a>
        "##;
        assert!(extract_hyperlinks(html, &base_url()).is_empty());
    }

    #[test]
    fn test_duplicate_links_reported_once() {
        let html = r#"<a href="/a">A</a><a href="/a">A</a><a href="/a">Again</a>"#;
        assert_eq!(extract_hyperlinks(html, &base_url()).len(), 2);
    }

    #[test]
    fn test_extract_canonical_link() {
        let html = r#"<link rel="canonical" href="https://example.com/canonical">"#;
        let links = extract_hyperlinks(html, &base_url());
        assert_eq!(links[0].url, "https://example.com/canonical");
        assert_eq!(links[0].inner_text, "");
    }

    #[test]
    fn test_language_for_type() {
        assert_eq!(language_for_type("text/javascript").as_deref(), Some("JavaScript"));
        assert_eq!(language_for_type("module").as_deref(), Some("JavaScript"));
        assert_eq!(language_for_type("application/ld+json").as_deref(), Some("JSON"));
        assert_eq!(language_for_type("text/x-php").as_deref(), Some("PHP"));
        assert_eq!(language_for_type("text/typescript").as_deref(), Some("TypeScript"));
        assert_eq!(language_for_type("text/template").as_deref(), Some("Template"));
        assert_eq!(language_for_type("anonymous"), None);
    }

    #[test]
    fn test_library_from_source() {
        let lib = library_from_source("https://cdn.example.com/js/jquery-ui.min.js?v=1.13").unwrap();
        assert_eq!(lib.name, "Jquery Ui");
        assert_eq!(lib.version, "1.13");
        assert_eq!(lib.category, "JavaScript libraries");
        assert_eq!(lib.confidence, 100);

        let lib = library_from_source("https://cdn.example.com/react.production.js").unwrap();
        assert_eq!(lib.name, "React Production");
        assert_eq!(lib.version, "");
    }

    #[tokio::test]
    async fn test_extract_scripts_and_generator() {
        let html = r#"
            <html><head>
                <meta name="generator" content="WordPress 6.4.2">
                <script src="/js/jquery.js?ver=3.7.1"></script>
                <script type="application/json">{"a": 1}</script>
            </head><body><script>console.log(1)</script></body></html>
        "#;

        let facts = HtmlExtractor.extract(&page(html)).await.unwrap();

        assert_eq!(facts.languages, vec!["JavaScript".to_string(), "JSON".to_string()]);
        assert_eq!(facts.libraries.len(), 1);
        assert_eq!(facts.libraries[0].name, "Jquery");
        assert_eq!(facts.libraries[0].version, "3.7.1");
        assert_eq!(facts.frameworks.len(), 1);
        assert_eq!(facts.frameworks[0].name, "WordPress");
        assert_eq!(facts.frameworks[0].version, "6.4.2");
    }

    #[tokio::test]
    async fn test_extract_ad_tracking() {
        let html = r#"
            <img src="https://track.example/p?id=7" width="1" height="1">
            <img src="https://cdn.example/spacer.gif" style="display: none">
            <img src="https://cdn.example/logo.png">
            <a href="https://shop.example/?utm_source=news">Shop</a>
        "#;
        let mut page = page(html);
        page.cookies = vec!["id=1".to_string()];

        let facts = HtmlExtractor.extract(&page).await.unwrap();

        assert!(facts.ad_tracking.used);
        assert_eq!(facts.ad_tracking.cookies.as_deref(), Some("id=1"));
        assert_eq!(
            facts.ad_tracking.tracking_pixel.as_deref(),
            Some("https://track.example/p?id=7")
        );
        assert_eq!(
            facts.ad_tracking.utm_links.as_deref(),
            Some("https://shop.example/?utm_source=news")
        );
    }

    #[tokio::test]
    async fn test_tag_manager_alone_marks_tracking_used() {
        let html = r#"
            <script async src="https://www.googletagmanager.com/gtag/js?id=G-1"></script>
            <script>
                gtag('js', new Date());
                gtag('config', 'G-1');
            </script>
        "#;

        let facts = HtmlExtractor.extract(&page(html)).await.unwrap();
        let tracking = facts.ad_tracking;

        assert!(tracking.used);
        assert_eq!(tracking.cookies, None);
        assert_eq!(tracking.tracking_pixel, None);
        assert_eq!(tracking.utm_links, None);
        let markers = tracking.tag_manager.unwrap();
        assert!(markers.contains("googletagmanager.com/gtag/js?id=G-1"));
        assert!(markers.ends_with("gtag:G-1"));
    }

    #[test]
    fn test_hidden_image_style_declarations() {
        let html = r#"
            <img id="a" src="/x" style="border: 0; visibility : hidden">
            <img id="b" src="/x" style="WIDTH:1PX">
            <img id="c" src="/x" style="max-width: 1px">
            <img id="d" src="/x" style="width: 10px">
        "#;
        let document = Html::parse_fragment(html);
        let img_selector = Selector::parse("img").unwrap();
        let hidden: Vec<bool> = document
            .select(&img_selector)
            .map(|img| is_hidden_image(&img))
            .collect();
        assert_eq!(hidden, vec![true, true, false, false]);
    }

    #[test]
    fn test_utm_and_image_patterns() {
        assert!(UTM_REGEX.is_match("https://shop.example/?utm_source=news"));
        assert!(UTM_REGEX.is_match("https://shop.example/?a=1&utm_medium=mail"));
        assert!(!UTM_REGEX.is_match("https://shop.example/utm_source"));
        assert!(IMAGE_FILE_REGEX.is_match("https://cdn.example/spacer.GIF?v=2"));
        assert!(!IMAGE_FILE_REGEX.is_match("https://track.example/p.gif.php?id=1"));
    }

    #[tokio::test]
    async fn test_no_ad_tracking() {
        let facts = HtmlExtractor.extract(&page("<p>plain</p>")).await.unwrap();
        assert_eq!(facts.ad_tracking, AdTrackingFacts::default());
    }

    #[tokio::test]
    async fn test_extract_embedded_modules() {
        let html = r#"
            <script>
                fetch("engine.wasm").then(r => WebAssembly.instantiateStreaming(r));
                const m = new WebAssembly.Memory({initial: 1});
                const skip = "notes.wasm.txt";
                const again = 'engine.wasm';
            </script>
        "#;

        let facts = HtmlExtractor.extract(&page(html)).await.unwrap();
        let modules = facts.embedded_modules;

        assert!(modules.used);
        assert_eq!(modules.use_case, UseCase::Unknown);
        assert_eq!(modules.files.len(), 1);
        assert_eq!(modules.files[0].local_name, "engine.wasm");
        assert_eq!(
            modules.files[0].source_file_name,
            "https://example.com/games/engine.wasm"
        );
        assert_eq!(
            modules.files[0].functions,
            vec![
                "WebAssembly.instantiateStreaming".to_string(),
                "WebAssembly.Memory".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_document_is_error() {
        let err = HtmlExtractor.extract(&page("   ")).await.unwrap_err();
        assert!(matches!(err, ExtractError::EmptyDocument(_)));
    }
}
