//! Structural gate: decide whether a parsed view is extractable at all.
//!
//! All-or-nothing by design: an image that fails here produces an error
//! result with empty feature maps, never a partial extraction. This is what
//! distinguishes "file unusable" from "file usable but some features
//! absent".

use tracing::warn;

use crate::error::ExtractError;
use crate::image::ParsedPeImage;

/// Minimum data-directory table length: the extractors index slots up to
/// the debug entry at index 6.
pub const MIN_DATA_DIRECTORIES: usize = 7;

/// Validate the parsed view, passing it through unchanged on success.
pub fn check(image: ParsedPeImage<'_>) -> Result<ParsedPeImage<'_>, ExtractError> {
    if image.pe_type.is_none() {
        warn!("structural gate: missing PE type classification");
        return Err(ExtractError::Rejected(
            "missing PE type classification".to_string(),
        ));
    }

    let Some(optional_header) = image.optional_header.as_ref() else {
        warn!("structural gate: missing optional header");
        return Err(ExtractError::Rejected("missing optional header".to_string()));
    };

    let directories = optional_header.data_directories.len();
    if directories < MIN_DATA_DIRECTORIES {
        warn!(directories, "structural gate: data directory table too short");
        return Err(ExtractError::Rejected(format!(
            "data directory table too short: {} entries, need {}",
            directories, MIN_DATA_DIRECTORIES
        )));
    }

    Ok(image)
}
