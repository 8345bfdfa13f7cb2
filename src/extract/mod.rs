//! Feature extraction pipeline.
//!
//! Control flow: structural gate, then the dense and sparse extractors over
//! a shared normalized section table, then the default/warning pass that
//! guarantees schema completeness. One invocation consumes one parsed image
//! and returns one report; no state persists across calls.

pub mod dense;
pub mod gate;
pub mod schema;
pub mod sections;
pub mod sparse;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::ExtractError;
use crate::image::{ImageParser, ParsedPeImage};

use schema::{DenseValue, FeatureSink};
use sections::SectionNameTable;

/// Result envelope for one extraction.
///
/// On success `error` is `None` and both maps are schema-complete. On a
/// gate failure `error` carries the diagnostic and both maps are empty —
/// the one case where schema completeness is not guaranteed, since
/// extraction never ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub dense_features: BTreeMap<String, DenseValue>,
    pub sparse_features: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// The extraction engine: a pure, synchronous, stateless transformation.
///
/// Safe to share across threads; concurrent invocations are independent.
#[derive(Debug, Clone, Default)]
pub struct FeatureEngine {
    config: EngineConfig,
}

impl FeatureEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Parse `data` with the supplied collaborator parser and extract
    /// features, echoing `tags` unmodified on success.
    pub fn extract_bytes<P: ImageParser>(
        &self,
        parser: &P,
        data: &[u8],
        tags: Vec<String>,
    ) -> FeatureReport {
        match parser.parse(data) {
            Ok(image) => self.extract(image, tags),
            Err(err) => Self::failure(ExtractError::from(err)),
        }
    }

    /// Extract features from an already-parsed view.
    pub fn extract(&self, image: ParsedPeImage<'_>, tags: Vec<String>) -> FeatureReport {
        let span = tracing::debug_span!("extract", size = image.data.len());
        let _guard = span.enter();

        let image = match gate::check(image) {
            Ok(image) => image,
            Err(err) => return Self::failure(err),
        };

        // Normalize section names exactly once; both extractors share the
        // result so they can never diverge.
        let names = SectionNameTable::build(&image.sections);

        let mut sink = FeatureSink::new();
        dense::extract(&image, &names, &mut sink);
        sparse::extract(&image, &names, &mut sink);
        let (dense_features, sparse_features) = sink.finish(self.config.verbose);

        debug!(
            dense = dense_features.len(),
            sparse = sparse_features.len(),
            "extraction complete"
        );

        FeatureReport {
            error: None,
            dense_features,
            sparse_features,
            tags,
        }
    }

    fn failure(err: ExtractError) -> FeatureReport {
        FeatureReport {
            error: Some(err.to_string()),
            dense_features: BTreeMap::new(),
            sparse_features: BTreeMap::new(),
            tags: Vec::new(),
        }
    }
}
