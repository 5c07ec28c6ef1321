//! Links and heading anchors found in page bodies.

use std::sync::LazyLock;

use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, TagEnd};
use regex::Regex;
use rustc_hash::FxHashSet;

use crate::core::ContentKind;
use crate::utils::slug::anchorize;

/// `href="..."` / `src='...'` in raw HTML
static HTML_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\b(?:href|src)\s*=\s*["']([^"']+)["']"#).unwrap());

/// `id="..."` in raw HTML
static HTML_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\bid\s*=\s*["']([^"']+)["']"#).unwrap());

/// `{{< ref "path" >}}`, `{{% relref "path" %}}`
static REF_SHORTCODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\{\{[<%]\s*(?:rel)?ref\s+"([^"]+)"\s*[>%]\}\}"#).unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOrigin {
    Markdown,
    Image,
    Html,
    /// `ref`/`relref` shortcode; the target is a content path
    Ref,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub target: String,
    pub origin: LinkOrigin,
}

impl Link {
    fn new(target: impl Into<String>, origin: LinkOrigin) -> Self {
        Self {
            target: target.into(),
            origin,
        }
    }
}

/// Everything link checking needs from one page body.
#[derive(Debug, Clone, Default)]
pub struct BodyScan {
    pub links: Vec<Link>,
    /// Heading anchors and explicit element IDs
    pub anchors: FxHashSet<String>,
}

impl BodyScan {
    pub fn scan(body: &str, kind: ContentKind) -> Self {
        let mut scan = Self::default();
        match kind {
            ContentKind::Markdown => scan.scan_markdown(body),
            ContentKind::Html => scan.scan_html(body),
        }
        for caps in REF_SHORTCODE.captures_iter(body) {
            scan.links.push(Link::new(&caps[1], LinkOrigin::Ref));
        }
        scan
    }

    fn scan_markdown(&mut self, body: &str) {
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_HEADING_ATTRIBUTES;
        let mut heading: Option<String> = None;
        let mut seen: FxHashSet<String> = FxHashSet::default();

        for event in Parser::new_ext(body, options) {
            match event {
                Event::Start(Tag::Link { dest_url, .. }) => self.push_link(dest_url, LinkOrigin::Markdown),
                Event::Start(Tag::Image { dest_url, .. }) => self.push_link(dest_url, LinkOrigin::Image),
                Event::Start(Tag::Heading { id: Some(id), .. }) => {
                    self.anchors.insert(id.into_string());
                }
                Event::Start(Tag::Heading { id: None, .. }) => heading = Some(String::new()),
                Event::Text(text) | Event::Code(text) => {
                    if let Some(buf) = heading.as_mut() {
                        buf.push_str(&text);
                    }
                }
                Event::End(TagEnd::Heading(_)) => {
                    if let Some(text) = heading.take() {
                        self.push_heading_anchor(&text, &mut seen);
                    }
                }
                Event::Html(html) | Event::InlineHtml(html) => self.scan_html(&html),
                _ => {}
            }
        }
    }

    fn scan_html(&mut self, html: &str) {
        for caps in HTML_LINK.captures_iter(html) {
            self.links.push(Link::new(&caps[1], LinkOrigin::Html));
        }
        for caps in HTML_ID.captures_iter(html) {
            self.anchors.insert(caps[1].to_owned());
        }
    }

    fn push_link(&mut self, dest: CowStr<'_>, origin: LinkOrigin) {
        // Shortcode destinations are picked up by the ref scan
        if !dest.is_empty() && !dest.starts_with("{{") {
            self.links.push(Link::new(dest.into_string(), origin));
        }
    }

    /// Repeated headings get `-1`, `-2`, ... suffixes.
    fn push_heading_anchor(&mut self, text: &str, seen: &mut FxHashSet<String>) {
        let base = anchorize(text);
        if base.is_empty() {
            return;
        }
        let mut anchor = base.clone();
        let mut n = 0;
        while !seen.insert(anchor.clone()) {
            n += 1;
            anchor = format!("{base}-{n}");
        }
        self.anchors.insert(anchor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(scan: &BodyScan) -> Vec<&str> {
        scan.links.iter().map(|l| l.target.as_str()).collect()
    }

    #[test]
    fn test_markdown_links() {
        let body = "See [the post](/posts/hello/) and ![chart](nav.png).\n\n\
                    <a href=\"/about/\">about</a>\n\n\
                    [ref]({{< ref \"posts/spx.md\" >}})";
        let scan = BodyScan::scan(body, ContentKind::Markdown);
        assert_eq!(
            targets(&scan),
            ["/posts/hello/", "nav.png", "/about/", "posts/spx.md"]
        );
        assert_eq!(scan.links[1].origin, LinkOrigin::Image);
        assert_eq!(scan.links[3].origin, LinkOrigin::Ref);
    }

    #[test]
    fn test_heading_anchors() {
        let body = "# Results\n\n## Results\n\n## Step 2: NAV {#nav}\n\n## `top_k` choice\n";
        let scan = BodyScan::scan(body, ContentKind::Markdown);
        for anchor in ["results", "results-1", "nav", "top_k-choice"] {
            assert!(scan.anchors.contains(anchor), "missing {anchor}");
        }
    }

    #[test]
    fn test_html_body() {
        let body = "<h2 id='intro'>Intro</h2><img src=\"/img/a.png\"><a href='#intro'>x</a>";
        let scan = BodyScan::scan(body, ContentKind::Html);
        assert_eq!(targets(&scan), ["/img/a.png", "#intro"]);
        assert!(scan.anchors.contains("intro"));
    }

    #[test]
    fn test_code_spans_ignored() {
        let scan = BodyScan::scan("`[not](/a/)`\n\n```\n<a href=\"/b/\">\n```\n", ContentKind::Markdown);
        assert!(scan.links.is_empty());
    }
}
