//! Configuration for the feature extraction engine.

use serde::{Deserialize, Serialize};

/// Engine configuration.
///
/// The engine itself is stateless; the configuration only tunes
/// diagnostics, never which features are produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Emit a `debug` diagnostic for every declared feature that was not
    /// extracted and fell back to its schema default.
    pub verbose: bool,
}
