//! Sparse (string-list) feature extraction.
//!
//! Symbol lists are case-folded and deduplicated through a `BTreeSet`, so
//! output order is deterministic (lexicographic) across invocations.

use std::collections::BTreeSet;

use tracing::warn;

use crate::image::{ExportDirectoryView, ImportModule, ImportSymbol, ParsedPeImage};

use super::schema::FeatureSink;
use super::sections::SectionNameTable;

/// Sentinel reported when the parser cannot supply an import hash.
pub const IMPHASH_UNSUPPORTED: &str = "unsupported: parser provides no import list";

/// Sentinel entry reported for a present-but-malformed export directory.
pub const EXPORTS_MALFORMED: &str = "malformed export directory";

pub(super) fn extract(image: &ParsedPeImage<'_>, names: &SectionNameTable, sink: &mut FeatureSink) {
    // One entry per section, duplicates intact: repeated names in a
    // malformed section table are themselves a signal.
    sink.put_list(
        "section_names",
        names.entries.iter().map(|entry| entry.name.clone()).collect(),
    );

    if let Some(modules) = image.imports.as_deref() {
        let mut symbols = BTreeSet::new();
        for module in modules {
            for symbol in &module.symbols {
                symbols.insert(format!("{}:{}", module.dll, describe_import(symbol)).to_lowercase());
            }
        }
        sink.put_list("imported_symbols", symbols.into_iter().collect());
    }

    match image.exports.as_ref() {
        Some(ExportDirectoryView::Symbols(exported)) => {
            let symbols: BTreeSet<String> = exported
                .iter()
                .map(|symbol| match symbol.name.as_deref() {
                    Some(name) => format!("name={}", name).to_lowercase(),
                    None => format!("ordinal={}", symbol.ordinal),
                })
                .collect();
            sink.put_list("ExportedSymbols", symbols.into_iter().collect());
        }
        Some(ExportDirectoryView::Malformed(reason)) => {
            // Malformed export data is common in the corpus; degrade to a
            // sentinel entry instead of failing the extraction.
            warn!(reason = %reason, "export directory malformed");
            sink.put_list("ExportedSymbols", vec![EXPORTS_MALFORMED.to_string()]);
        }
        None => {}
    }

    if !image.warnings.is_empty() {
        sink.put_list("pe_warning_strings", image.warnings.clone());
    }

    if image.capabilities.import_hash {
        let modules = image.imports.as_deref().unwrap_or(&[]);
        sink.put_list("imp_hash", vec![import_hash(modules)]);
    } else {
        sink.put_list("imp_hash", vec![IMPHASH_UNSUPPORTED.to_string()]);
    }
}

fn describe_import(symbol: &ImportSymbol) -> String {
    let mut info = match (symbol.name.as_deref(), symbol.ordinal) {
        (Some(name), _) => format!("name={}", name),
        (None, Some(ordinal)) => format!("ordinal={}", ordinal),
        (None, None) => "unknown".to_string(),
    };
    if let Some(address) = symbol.bound {
        info.push_str(&format!(" bound={}", address));
    }
    info
}

/// Import hash over the ordered module/symbol list: lowercased module name
/// with its extension stripped, `module.symbol` pairs joined by commas,
/// md5-digested. Ordinal-only imports contribute as `ord<N>`.
pub fn import_hash(modules: &[ImportModule]) -> String {
    let mut parts = Vec::new();

    for module in modules {
        let mut dll = module.dll.to_ascii_lowercase();
        for extension in [".dll", ".sys", ".ocx", ".drv"] {
            if let Some(stripped) = dll.strip_suffix(extension) {
                dll = stripped.to_string();
                break;
            }
        }

        for symbol in &module.symbols {
            let name = match (symbol.name.as_deref(), symbol.ordinal) {
                (Some(name), _) => name.to_ascii_lowercase(),
                (None, Some(ordinal)) => format!("ord{}", ordinal),
                (None, None) => continue,
            };
            parts.push(format!("{}.{}", dll, name));
        }
    }

    format!("{:032x}", md5::compute(parts.join(",").as_bytes()))
}
