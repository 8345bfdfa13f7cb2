//! Fixed feature schemas, value types, and the default/warning policy.
//!
//! Extraction follows a two-phase pipeline: extractors write whatever they
//! can into a [`FeatureSink`], then [`FeatureSink::finish`] reconciles the
//! result against the declared schemas in a single pass, filling every
//! still-absent key with its type default. The key sets of the returned maps
//! therefore always equal the schemas exactly.

use std::collections::{BTreeMap, HashSet};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// The closed list of dense (numeric) feature keys.
pub const DENSE_SCHEMA: [&str; 52] = [
    "check_sum",
    "generated_check_sum",
    "compile_date",
    "debug_size",
    "export_size",
    "iat_rva",
    "major_version",
    "minor_version",
    "number_of_bound_import_symbols",
    "number_of_bound_imports",
    "number_of_export_symbols",
    "number_of_import_symbols",
    "number_of_imports",
    "number_of_rva_and_sizes",
    "number_of_sections",
    "pe_warnings",
    "std_section_names",
    "total_size_pe",
    "virtual_address",
    "virtual_size",
    "virtual_size_2",
    "datadir_IMAGE_DIRECTORY_ENTRY_BASERELOC_size",
    "datadir_IMAGE_DIRECTORY_ENTRY_RESOURCE_size",
    "datadir_IMAGE_DIRECTORY_ENTRY_IAT_size",
    "datadir_IMAGE_DIRECTORY_ENTRY_IMPORT_size",
    "pe_char",
    "pe_dll",
    "pe_driver",
    "pe_exe",
    "pe_i386",
    "pe_majorlink",
    "pe_minorlink",
    "sec_entropy_data",
    "sec_entropy_rdata",
    "sec_entropy_reloc",
    "sec_entropy_text",
    "sec_entropy_rsrc",
    "sec_rawptr_rsrc",
    "sec_rawsize_rsrc",
    "sec_vasize_rsrc",
    "sec_raw_execsize",
    "sec_rawptr_data",
    "sec_rawptr_text",
    "sec_rawsize_data",
    "sec_rawsize_text",
    "sec_va_execsize",
    "sec_vasize_data",
    "sec_vasize_text",
    "size_code",
    "size_image",
    "size_initdata",
    "size_uninit",
];

/// The closed list of sparse (string-list) feature keys.
///
/// The `ExportedSymbols` casing is part of the wire contract.
pub const SPARSE_SCHEMA: [&str; 5] = [
    "ExportedSymbols",
    "imp_hash",
    "imported_symbols",
    "pe_warning_strings",
    "section_names",
];

static DENSE_KEYS: Lazy<HashSet<&'static str>> = Lazy::new(|| DENSE_SCHEMA.iter().copied().collect());
static SPARSE_KEYS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| SPARSE_SCHEMA.iter().copied().collect());

/// A dense feature value: integer or float, default `0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DenseValue {
    Int(u64),
    Float(f64),
}

impl DenseValue {
    /// Numeric default for any feature not produced during extraction.
    pub const DEFAULT: DenseValue = DenseValue::Int(0);
}

impl Default for DenseValue {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Accumulator for extracted features.
///
/// Writes for keys outside the declared schemas are dropped: the schema is
/// closed, and standard sections without declared per-section keys (for
/// example `.bss`) must not widen the output.
#[derive(Debug, Default)]
pub struct FeatureSink {
    dense: BTreeMap<String, DenseValue>,
    sparse: BTreeMap<String, Vec<String>>,
}

impl FeatureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_int(&mut self, key: &str, value: u64) {
        self.put_dense(key, DenseValue::Int(value));
    }

    pub fn put_float(&mut self, key: &str, value: f64) {
        self.put_dense(key, DenseValue::Float(value));
    }

    fn put_dense(&mut self, key: &str, value: DenseValue) {
        if DENSE_KEYS.contains(key) {
            self.dense.insert(key.to_string(), value);
        } else {
            trace!(feature = key, "dropping undeclared dense feature");
        }
    }

    pub fn put_list(&mut self, key: &str, values: Vec<String>) {
        if SPARSE_KEYS.contains(key) {
            self.sparse.insert(key.to_string(), values);
        } else {
            trace!(feature = key, "dropping undeclared sparse feature");
        }
    }

    /// The default/warning pass: fill every declared key that extraction did
    /// not produce. Runs unconditionally; a fully-populated sink makes this
    /// a no-op.
    pub fn finish(
        self,
        verbose: bool,
    ) -> (BTreeMap<String, DenseValue>, BTreeMap<String, Vec<String>>) {
        let Self {
            mut dense,
            mut sparse,
        } = self;

        for &key in DENSE_SCHEMA.iter() {
            if !dense.contains_key(key) {
                if verbose {
                    debug!(feature = key, "feature not extracted, defaulting to 0");
                }
                dense.insert(key.to_string(), DenseValue::DEFAULT);
            }
        }

        for &key in SPARSE_SCHEMA.iter() {
            if !sparse.contains_key(key) {
                if verbose {
                    debug!(feature = key, "feature not extracted, defaulting to []");
                }
                sparse.insert(key.to_string(), Vec::new());
            }
        }

        (dense, sparse)
    }
}
