//! Static feature extraction for Windows Portable Executable images.
//!
//! This crate turns an externally-parsed PE view ([`image::ParsedPeImage`])
//! into a fixed-schema feature vector: a dense map of numeric features and a
//! sparse map of string-list features, suitable for downstream triage and
//! classification pipelines.
//!
//! The engine is a pure, synchronous transformation. It does not parse raw
//! PE byte streams itself; parsing is supplied by a collaborator through the
//! [`image::ImageParser`] trait. Malformed inputs degrade gracefully: an
//! unusable image short-circuits at the structural gate, while any single
//! unobtainable feature resolves to its schema default instead of aborting
//! the rest of the extraction.

pub mod checksum;
pub mod config;
pub mod entropy;
pub mod error;
pub mod extract;
pub mod image;
pub mod logging;

pub use config::EngineConfig;
pub use error::{ExtractError, Result};
pub use extract::schema::{DenseValue, DENSE_SCHEMA, SPARSE_SCHEMA};
pub use extract::{FeatureEngine, FeatureReport};
pub use image::{ImageParser, ParseError, ParsedPeImage};
