//! Section name normalization and the standard-name table.
//!
//! Raw section names are normalized exactly once per section and the result
//! is shared by the dense and sparse extractors, so the two can never
//! disagree on a name.

use std::collections::HashSet;

use once_cell::sync::Lazy;

use crate::image::SectionView;

/// Canonical section names found in well-formed images, plus the synthetic
/// `/0`..`/199` names used by string-table overflow sections.
pub static STANDARD_SECTION_NAMES: Lazy<HashSet<String>> = Lazy::new(|| {
    let mut names: HashSet<String> = [
        ".text", ".bss", ".rdata", ".data", ".rsrc", ".edata", ".idata", ".pdata", ".debug",
        ".reloc", ".stab", ".stabstr", ".tls", ".crt", ".gnu_deb", ".eh_fram", ".exptbl",
        ".rodata",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    for i in 0..200 {
        names.insert(format!("/{}", i));
    }

    names
});

/// Normalize a raw, possibly null-padded section name: truncate at the
/// first NUL, drop non-ASCII bytes, lowercase.
pub fn normalize_name(raw: &[u8]) -> String {
    raw.iter()
        .take_while(|&&b| b != 0)
        .filter(|b| b.is_ascii())
        .map(|&b| (b as char).to_ascii_lowercase())
        .collect()
}

/// Strip dots from a normalized name to build per-section dense keys
/// (`.text` contributes to `sec_entropy_text` and friends).
pub fn dense_key_fragment(name: &str) -> String {
    name.chars().filter(|&c| c != '.').collect()
}

/// One normalized section name with its membership verdict.
#[derive(Debug, Clone)]
pub struct NormalizedSection {
    pub name: String,
    pub standard: bool,
}

/// Normalized names for every section, in section order.
#[derive(Debug, Clone, Default)]
pub struct SectionNameTable {
    pub entries: Vec<NormalizedSection>,
}

impl SectionNameTable {
    pub fn build(sections: &[SectionView]) -> Self {
        let entries = sections
            .iter()
            .map(|section| {
                let name = normalize_name(&section.raw_name);
                let standard = STANDARD_SECTION_NAMES.contains(&name);
                NormalizedSection { name, standard }
            })
            .collect();
        Self { entries }
    }

    /// True iff every section carries a standard name. Vacuously true for
    /// images with no sections.
    pub fn all_standard(&self) -> bool {
        self.entries.iter().all(|entry| entry.standard)
    }
}
