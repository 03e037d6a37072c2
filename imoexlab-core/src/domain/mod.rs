//! Domain types: date keys and raw artifacts.

pub mod artifact;
pub mod date_key;

pub use artifact::{ArtifactKind, MarketIndexArtifact, NewsArtifact, RawArtifact};
pub use date_key::{format_key, normalize_timestamp, parse_key, DateKey, DATE_KEY_FORMAT};
