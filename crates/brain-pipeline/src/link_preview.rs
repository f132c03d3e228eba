//! Open Graph scraping for shared links.
//!
//! Fetching never fails from the caller's point of view: any network, status
//! or parse problem degrades to a preview built from the URL alone.

use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::{redirect, Client};
use tracing::{debug, error, warn};
use url::Url;

use brain_core::{Error, LinkPreview, OpenGraphData, Result};

/// User agent sent with every preview request.
pub const PREVIEW_USER_AGENT: &str = "Mozilla/5.0 (compatible; SecondBrainBot/1.0)";

/// Accept header sent with every preview request.
pub const PREVIEW_ACCEPT: &str = "text/html,application/xhtml+xml";

/// Whole-request timeout in seconds.
pub const DEFAULT_PREVIEW_TIMEOUT_SECS: u64 = 10;

const MAX_REDIRECTS: usize = 10;

const META_PROPERTIES: [&str; 5] = ["title", "description", "image", "site_name", "type"];

/// Three patterns per property, tried in order: `og:` property then content,
/// content then `og:` property, plain `name=` then content.
static META_PATTERNS: Lazy<Vec<(&'static str, [Regex; 3])>> = Lazy::new(|| {
    META_PROPERTIES
        .iter()
        .map(|prop| {
            let p = regex::escape(prop);
            let compile = |pattern: String| Regex::new(&pattern).expect("valid meta regex");
            (
                *prop,
                [
                    compile(format!(
                        r#"(?i)<meta[^>]*property=["']og:{p}["'][^>]*content=["']([^"']+)["']"#
                    )),
                    compile(format!(
                        r#"(?i)<meta[^>]*content=["']([^"']+)["'][^>]*property=["']og:{p}["']"#
                    )),
                    compile(format!(
                        r#"(?i)<meta[^>]*name=["']{p}["'][^>]*content=["']([^"']+)["']"#
                    )),
                ],
            )
        })
        .collect()
});

static TITLE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<title[^>]*>([^<]+)</title>").expect("valid title regex"));

static ENTITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"&[^;]+;").expect("valid entity regex"));

/// Content of the first matching meta tag for `property`.
pub fn extract_meta_content(html: &str, property: &str) -> Option<String> {
    let (_, patterns) = META_PATTERNS.iter().find(|(p, _)| *p == property)?;
    patterns
        .iter()
        .find_map(|re| re.captures(html))
        .map(|caps| caps[1].to_string())
}

/// Page title: `og:title` (or `name=title`), else the `<title>` element.
pub fn extract_title(html: &str) -> Option<String> {
    extract_meta_content(html, "title").or_else(|| {
        TITLE_TAG
            .captures(html)
            .map(|caps| caps[1].trim().to_string())
    })
}

/// Decode the handful of entities pages commonly put in titles.
///
/// Unknown entities are left as they are.
pub fn decode_html_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            match &caps[0] {
                "&amp;" => "&",
                "&lt;" => "<",
                "&gt;" => ">",
                "&quot;" => "\"",
                "&#39;" => "'",
                "&nbsp;" => " ",
                other => other,
            }
            .to_string()
        })
        .into_owned()
}

/// Scrape Open Graph fields from an HTML document fetched from `url`.
pub fn parse_open_graph(url: &str, html: &str) -> OpenGraphData {
    let image = extract_meta_content(html, "image").map(|image| absolutize(url, image));

    OpenGraphData {
        url: url.to_string(),
        title: extract_title(html).map(|t| decode_html_entities(&t)),
        description: extract_meta_content(html, "description").map(|d| decode_html_entities(&d)),
        image,
        site_name: extract_meta_content(html, "site_name"),
        og_type: extract_meta_content(html, "type"),
    }
}

/// Resolve a relative image reference against the page origin.
fn absolutize(page_url: &str, image: String) -> String {
    if image.starts_with("http") {
        return image;
    }
    Url::parse(page_url)
        .and_then(|page| {
            let origin = page.origin().ascii_serialization();
            Url::parse(&origin)?.join(&image)
        })
        .map(|resolved| resolved.to_string())
        .unwrap_or(image)
}

/// Hostname of `url`, or the URL itself when it cannot be parsed.
fn hostname_or_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}

/// Build the stored preview from scraped data.
///
/// Without data the title is the hostname and the description the full URL.
pub fn to_preview(og: Option<OpenGraphData>, url: &str) -> LinkPreview {
    match og {
        None => LinkPreview {
            title: hostname_or_url(url),
            description: url.to_string(),
            image: None,
            site_name: None,
        },
        Some(og) => LinkPreview {
            title: og
                .title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| hostname_or_url(url)),
            description: og.description.unwrap_or_default(),
            image: og.image,
            site_name: og.site_name,
        },
    }
}

/// HTTP fetcher for link previews.
#[derive(Clone)]
pub struct LinkPreviewFetcher {
    client: Client,
}

impl LinkPreviewFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_PREVIEW_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| Error::Request(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Fetch and scrape `url`. `None` on any failure.
    pub async fn fetch_open_graph(&self, url: &str) -> Option<OpenGraphData> {
        let start = Instant::now();
        match self.try_fetch(url).await {
            Ok(data) => {
                debug!(
                    subsystem = "pipeline",
                    component = "link_preview",
                    op = "fetch",
                    url = %url,
                    found = data.is_some(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Link preview fetched"
                );
                data
            }
            Err(e) => {
                error!(
                    subsystem = "pipeline",
                    component = "link_preview",
                    op = "fetch",
                    url = %url,
                    error = %e,
                    "Error fetching Open Graph data"
                );
                None
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> Result<Option<OpenGraphData>> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, PREVIEW_USER_AGENT)
            .header(ACCEPT, PREVIEW_ACCEPT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                subsystem = "pipeline",
                component = "link_preview",
                op = "fetch",
                url = %url,
                status = status.as_u16(),
                "Link preview request was not successful"
            );
            return Ok(None);
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if !content_type.contains("text/html") {
            let top_level = content_type.split('/').next().unwrap_or_default();
            return Ok(Some(OpenGraphData {
                url: url.to_string(),
                og_type: Some(top_level.to_string()),
                ..Default::default()
            }));
        }

        let html = response.text().await?;
        Ok(Some(parse_open_graph(url, &html)))
    }

    /// Fetch a preview for `url`, falling back to one built from the URL.
    pub async fn fetch_link_preview(&self, url: &str) -> LinkPreview {
        to_preview(self.fetch_open_graph(url).await, url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head>
        <title>  Fallback Title  </title>
        <meta property="og:title" content="Tom &amp; Jerry &#39;s">
        <meta content="A &quot;great&quot; read &copy;" property="og:description">
        <meta property="og:image" content="/img/cover.png">
        <meta property="og:site_name" content="Example Site">
        <meta name="type" content="article">
        </head><body></body></html>"#;

    #[test]
    fn test_parse_open_graph_full_page() {
        let og = parse_open_graph("https://example.com/posts/1?x=y", PAGE);
        assert_eq!(og.title.as_deref(), Some("Tom & Jerry 's"));
        assert_eq!(og.description.as_deref(), Some("A \"great\" read &copy;"));
        assert_eq!(og.image.as_deref(), Some("https://example.com/img/cover.png"));
        assert_eq!(og.site_name.as_deref(), Some("Example Site"));
        assert_eq!(og.og_type.as_deref(), Some("article"));
    }

    #[test]
    fn test_title_falls_back_to_title_tag() {
        let html = "<HTML><TITLE lang=\"th\">  บทความ  </TITLE></HTML>";
        assert_eq!(extract_title(html).as_deref(), Some("บทความ"));
    }

    #[test]
    fn test_meta_name_fallback_and_case_insensitive() {
        let html = r#"<META NAME="description" CONTENT="plain description">"#;
        assert_eq!(
            extract_meta_content(html, "description").as_deref(),
            Some("plain description")
        );
        assert_eq!(extract_meta_content(html, "image"), None);
    }

    #[test]
    fn test_absolute_image_untouched() {
        let html = r#"<meta property="og:image" content="https://cdn.example.com/a.jpg">"#;
        let og = parse_open_graph("https://example.com/page", html);
        assert_eq!(og.image.as_deref(), Some("https://cdn.example.com/a.jpg"));
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_html_entities("a&nbsp;b &lt;c&gt;"), "a b <c>");
        assert_eq!(decode_html_entities("&unknown; stays"), "&unknown; stays");
        assert_eq!(decode_html_entities("no entities"), "no entities");
    }

    #[test]
    fn test_to_preview_without_data() {
        let preview = to_preview(None, "https://www.example.com/a/b");
        assert_eq!(preview.title, "www.example.com");
        assert_eq!(preview.description, "https://www.example.com/a/b");
        assert!(preview.image.is_none());
        assert!(preview.site_name.is_none());
    }

    #[test]
    fn test_to_preview_with_partial_data() {
        let og = OpenGraphData {
            url: "https://example.com/x".to_string(),
            image: Some("https://example.com/i.png".to_string()),
            ..Default::default()
        };
        let preview = to_preview(Some(og), "https://example.com/x");
        assert_eq!(preview.title, "example.com");
        assert_eq!(preview.description, "");
        assert_eq!(preview.image.as_deref(), Some("https://example.com/i.png"));
    }

    #[test]
    fn test_to_preview_unparseable_url_uses_raw_url() {
        let preview = to_preview(None, "not a url");
        assert_eq!(preview.title, "not a url");
    }
}
