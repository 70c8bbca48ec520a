//! HTML decoder and main-content extraction
//!
//! Extraction works in three passes over the parsed tree:
//! - Scan the direct children of `head` for the title, `meta` tags and
//!   `link` hrefs
//! - Segment `body` into sections at `header`, `footer`, `main` and
//!   `section` boundaries, collecting hyperlinks on the way
//! - Keep the main sections whose word count reaches the mean, and fall back
//!   to a section heading when the page has no title
//!
//! Whitespace in the extracted content is collapsed to single spaces.

use crate::decode::{DecodeResult, Decoder};
use crate::document::Document;
use crate::proto::Body;
use async_trait::async_trait;
use scraper::{ElementRef, Html, Node};
use std::mem;
use tokio::io::AsyncReadExt;

/// `text/html` and `application/xhtml+xml`
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlDecoder;

#[async_trait]
impl Decoder for HtmlDecoder {
    async fn decode(&self, document: &mut Document, body: &mut Body) -> DecodeResult<()> {
        let mut bytes = Vec::new();
        body.read_to_end(&mut bytes).await?;

        // The parsed tree is not Send, so parsing happens entirely in here
        extract(&String::from_utf8_lossy(&bytes), document);
        Ok(())
    }
}

/// Parses `html` and fills in the title, links, content and metadata of
/// `document`
///
/// Links are appended in document order: `head` links first, then body
/// hyperlinks. A title from `<title>` always wins over the heading fallback.
///
/// # Example
///
/// ```
/// use sumi_trawl::decode::extract;
/// use sumi_trawl::Document;
/// use url::Url;
///
/// let mut doc = Document::new(Url::parse("https://example.com/").unwrap());
/// extract("<title>Home</title><p>Hello <a href='/about'>there</a></p>", &mut doc);
/// assert_eq!(doc.title.as_deref(), Some("Home"));
/// assert_eq!(doc.links, vec!["/about"]);
/// assert_eq!(doc.content, "Hello there");
/// ```
pub fn extract(html: &str, document: &mut Document) {
    let tree = Html::parse_document(html);
    let (head, body) = head_and_body(tree.root_element());

    if let Some(head) = head {
        scan_head(head, document);
    }

    if let Some(body) = body {
        let sections = segment(body, &mut document.links);
        tracing::trace!("{} has {} sections", document.location, sections.len());
        select_main(&sections, document);
    }
}

/// Finds `head` and `body`, without descending into either
fn head_and_body(root: ElementRef<'_>) -> (Option<ElementRef<'_>>, Option<ElementRef<'_>>) {
    let mut head = None;
    let mut body = None;
    let mut stack = vec![root];

    while let Some(element) = stack.pop() {
        match element.value().name() {
            "head" if head.is_none() => head = Some(element),
            "body" if body.is_none() => body = Some(element),
            _ => {
                let children: Vec<_> = element.children().filter_map(ElementRef::wrap).collect();
                stack.extend(children.into_iter().rev());
            }
        }
        if head.is_some() && body.is_some() {
            break;
        }
    }

    (head, body)
}

fn scan_head(head: ElementRef<'_>, document: &mut Document) {
    for child in head.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "title" => {
                let title = child.text().collect::<String>().trim().to_string();
                document.title = Some(title).filter(|t| !t.is_empty());
            }
            "meta" => scan_meta(child, document),
            "link" => {
                // rel is ignored; stylesheets and alternates are followed too
                if let Some(href) = child.value().attr("href").filter(|h| !h.trim().is_empty()) {
                    document.links.push(href.to_string());
                }
            }
            _ => {}
        }
    }
}

fn scan_meta(meta: ElementRef<'_>, document: &mut Document) {
    let element = meta.value();
    let (Some(name), Some(content)) = (element.attr("name"), element.attr("content")) else {
        return;
    };
    if content.is_empty() {
        return;
    }

    match name.to_ascii_lowercase().as_str() {
        "author" => document.author = Some(content.to_string()),
        "description" => document.description = Some(content.to_string()),
        "robots" => {
            for directive in content.split(',').map(|d| d.trim().to_ascii_lowercase()) {
                match directive.as_str() {
                    "noindex" => document.no_index = true,
                    "nofollow" => document.no_follow = true,
                    "none" => {
                        document.no_index = true;
                        document.no_follow = true;
                    }
                    _ => {}
                }
            }
        }
        _ => {}
    }
}

/// A run of body text under one heading
#[derive(Debug, Clone, PartialEq)]
struct Section {
    /// Tag name of the element the section was scanned from
    tag: String,
    heading: String,
    content: String,
}

impl Section {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            heading: String::new(),
            content: String::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.heading.trim().is_empty() && self.content.trim().is_empty()
    }

    fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }

    fn is_header(&self) -> bool {
        self.tag == "header"
    }

    fn is_main(&self) -> bool {
        self.tag != "header" && self.tag != "footer"
    }
}

/// Splits the subtree under `root` into sections, in traversal order
fn segment(root: ElementRef<'_>, links: &mut Vec<String>) -> Vec<Section> {
    let mut scan = Segmenter {
        tag: root.value().name(),
        current: Section::new(root.value().name()),
        sections: Vec::new(),
        links,
    };
    scan.walk(root);
    scan.flush();
    scan.sections
}

struct Segmenter<'a> {
    tag: &'a str,
    current: Section,
    sections: Vec<Section>,
    links: &'a mut Vec<String>,
}

impl Segmenter<'_> {
    fn walk(&mut self, element: ElementRef<'_>) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => self.current.content.push_str(text),
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        self.visit(child);
                    }
                }
                _ => {}
            }
        }
    }

    fn visit(&mut self, element: ElementRef<'_>) {
        match element.value().name() {
            "header" | "footer" | "main" | "section" => {
                self.flush();
                let nested = segment(element, self.links);
                self.sections.extend(nested);
                return;
            }
            "script" | "style" => return,
            "h1" => {
                self.current.heading = element.text().collect::<String>().trim().to_string();
            }
            "a" => {
                // An empty href still points at this page; dedup absorbs it
                if let Some(href) = element.value().attr("href") {
                    self.links.push(href.to_string());
                }
            }
            _ => {}
        }
        self.walk(element);
    }

    /// Closes the current section, keeping it if it has anything in it
    fn flush(&mut self) {
        let section = mem::replace(&mut self.current, Section::new(self.tag));
        if !section.is_empty() {
            self.sections.push(section);
        }
    }
}

/// Picks the content sections and, if needed, the fallback title
fn select_main(sections: &[Section], document: &mut Document) {
    let main: Vec<&Section> = sections.iter().filter(|s| s.is_main()).collect();
    let mut candidates: Vec<&Section> = sections.iter().filter(|s| s.is_header()).collect();

    if !main.is_empty() {
        let total: usize = main.iter().map(|s| s.word_count()).sum();
        let threshold = total / main.len();
        let qualifying: Vec<&Section> = main
            .into_iter()
            .filter(|s| s.word_count() >= threshold)
            .collect();

        tracing::trace!(
            "{} of {} words kept in {} sections (threshold {})",
            qualifying.iter().map(|s| s.word_count()).sum::<usize>(),
            total,
            qualifying.len(),
            threshold
        );

        document.content = qualifying
            .iter()
            .flat_map(|s| s.content.split_whitespace())
            .collect::<Vec<_>>()
            .join(" ");
        candidates.extend(qualifying);
    }

    if document.title.is_none() {
        document.title = fallback_title(&candidates);
    }
}

/// Longest heading among those at least as long as the mean heading length
fn fallback_title(candidates: &[&Section]) -> Option<String> {
    let headings: Vec<&str> = candidates
        .iter()
        .map(|s| s.heading.as_str())
        .filter(|h| !h.is_empty())
        .collect();
    if headings.is_empty() {
        return None;
    }

    let lengths: Vec<usize> = headings.iter().map(|h| h.chars().count()).collect();
    let mean = lengths.iter().sum::<usize>() / headings.len();

    let mut best: Option<(usize, &str)> = None;
    for (heading, len) in headings.iter().zip(lengths) {
        if len >= mean && best.map_or(true, |(best_len, _)| len > best_len) {
            best = Some((len, *heading));
        }
    }
    best.map(|(_, heading)| heading.to_string())
}
