use crate::document::DocumentKind;
use crate::url::absolutize;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Content type reported by transports that carry no MIME metadata
pub const OCTET_STREAM: &str = "application/octet-stream";

/// A crawled resource and everything extracted from it
///
/// `links` holds values exactly as they were found, relative to `location`.
/// Use [`Document::abs_links`] to resolve them; the stored links are never
/// rewritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Absolute location of the resource
    pub location: Url,

    /// What the location turned out to be
    pub kind: DocumentKind,

    /// Normalized MIME type (lowercase, no parameters), empty if unknown
    pub content_type: String,

    /// When this document was created
    pub fetched_at: DateTime<Utc>,

    /// Size in bytes, if the transport reported one
    pub size: Option<u64>,

    /// Advisory response status for protocols that have one (HTTP)
    pub status: Option<u16>,

    /// Discovered links, in discovery order
    pub links: Vec<String>,

    pub title: Option<String>,
    pub version: Option<String>,
    pub album: Option<String>,
    pub artist: Option<String>,
    pub performer: Option<String>,
    pub copyright: Option<String>,
    pub license: Option<String>,
    pub organisation: Option<String>,
    pub genre: Option<String>,
    pub date: Option<String>,
    pub isrc: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,

    /// Extracted plain-text body
    pub content: String,

    /// Advisory: the resource asked not to be indexed
    pub no_index: bool,

    /// Advisory: the resource asked for its links not to be followed
    pub no_follow: bool,
}

impl Document {
    /// Creates an empty document for `location`, stamped with the current time
    pub fn new(location: Url) -> Self {
        Self {
            location,
            kind: DocumentKind::File,
            content_type: String::new(),
            fetched_at: Utc::now(),
            size: None,
            status: None,
            links: Vec::new(),
            title: None,
            version: None,
            album: None,
            artist: None,
            performer: None,
            copyright: None,
            license: None,
            organisation: None,
            genre: None,
            date: None,
            isrc: None,
            author: None,
            description: None,
            content: String::new(),
            no_index: false,
            no_follow: false,
        }
    }

    /// Resolves every link against `location`
    ///
    /// Links that cannot be resolved are skipped. Already-absolute links come
    /// back unchanged.
    pub fn abs_links(&self) -> Vec<String> {
        self.links
            .iter()
            .filter_map(|link| {
                let resolved = absolutize(&self.location, link);
                if resolved.is_none() {
                    tracing::debug!("Skipping unresolvable link {:?} on {}", link, self.location);
                }
                resolved
            })
            .collect()
    }

    /// Marks this document as a directory listing
    ///
    /// The location gets a trailing `/` so that entry names resolve inside the
    /// directory rather than next to it.
    pub fn mark_directory(&mut self) {
        self.kind = DocumentKind::Directory;
        self.size = None;
        if !self.location.path().ends_with('/') {
            let path = format!("{}/", self.location.path());
            self.location.set_path(&path);
        }
    }
}
