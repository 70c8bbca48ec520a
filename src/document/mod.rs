//! Document module for crawled content
//!
//! A `Document` is created fresh for every fetch attempt. The protocol layer
//! fills in identity and transport metadata, decoders add content and
//! descriptive fields, and the crawler hands the finished record to the
//! output stream.
//!
//! # Components
//!
//! - `Document`: the crawled record itself
//! - `DocumentKind`: what kind of resource the location pointed at

mod kind;
mod record;

// Re-export main types
pub use kind::DocumentKind;
pub use record::{Document, OCTET_STREAM};
