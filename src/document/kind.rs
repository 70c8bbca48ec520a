/// Resource kind definitions for crawled documents
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a crawled location turned out to be
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// A regular file or an HTTP resource
    #[default]
    File,

    /// A directory listing; its entries are the document's links
    Directory,

    /// A symbolic or hard link reported by the transport
    Link,

    /// Anything else that is not a regular file (sockets, devices, fifos)
    Special,
}

impl DocumentKind {
    /// Returns true if this kind can carry a byte stream
    pub fn has_body(&self) -> bool {
        matches!(self, Self::File)
    }

    /// Returns the lowercase name used in output records
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
            Self::Link => "link",
            Self::Special => "special",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_kind_is_file() {
        assert_eq!(DocumentKind::default(), DocumentKind::File);
    }

    #[test]
    fn test_only_files_have_bodies() {
        assert!(DocumentKind::File.has_body());
        assert!(!DocumentKind::Directory.has_body());
        assert!(!DocumentKind::Link.has_body());
        assert!(!DocumentKind::Special.has_body());
    }

    #[test]
    fn test_display() {
        assert_eq!(DocumentKind::Directory.to_string(), "directory");
        assert_eq!(
            serde_json::to_string(&DocumentKind::Special).unwrap(),
            "\"special\""
        );
    }
}
