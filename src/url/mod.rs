//! URL handling module for Sumi-Trawl
//!
//! This module provides link absolutization, session keys for pooled
//! connections, and extraction of credentials carried in a location.
//! Locations are never rewritten beyond resolving relative links.

mod host;
mod resolve;

// Re-export main functions
pub use host::{credentials, decoded_path, host_key, Credentials};
pub use resolve::absolutize;
