//! Dense (numeric) feature extraction.
//!
//! Every computation here is best-effort: a missing directory or section
//! leaves its features unset, and the default pass in `schema` turns the
//! gaps into zeros afterwards.

use crate::checksum::generate_checksum;
use crate::entropy::entropy_range;
use crate::image::{
    ExportDirectoryView, Machine, ParsedPeImage, IMAGE_DIRECTORY_ENTRY_BASERELOC,
    IMAGE_DIRECTORY_ENTRY_DEBUG, IMAGE_DIRECTORY_ENTRY_EXPORT, IMAGE_DIRECTORY_ENTRY_IAT,
    IMAGE_DIRECTORY_ENTRY_IMPORT, IMAGE_DIRECTORY_ENTRY_RESOURCE,
};

use super::schema::FeatureSink;
use super::sections::{dense_key_fragment, SectionNameTable};

/// Declared data-directory size features. Slots beyond the materialized
/// table (the IAT slot in particular) are simply skipped.
const DATADIR_FEATURES: [(usize, &str); 4] = [
    (
        IMAGE_DIRECTORY_ENTRY_IMPORT,
        "datadir_IMAGE_DIRECTORY_ENTRY_IMPORT_size",
    ),
    (
        IMAGE_DIRECTORY_ENTRY_RESOURCE,
        "datadir_IMAGE_DIRECTORY_ENTRY_RESOURCE_size",
    ),
    (
        IMAGE_DIRECTORY_ENTRY_BASERELOC,
        "datadir_IMAGE_DIRECTORY_ENTRY_BASERELOC_size",
    ),
    (
        IMAGE_DIRECTORY_ENTRY_IAT,
        "datadir_IMAGE_DIRECTORY_ENTRY_IAT_size",
    ),
];

pub(super) fn extract(image: &ParsedPeImage<'_>, names: &SectionNameTable, sink: &mut FeatureSink) {
    let Some(optional_header) = image.optional_header.as_ref() else {
        return;
    };

    // Must precede any per-section metric that depends on normalization.
    sink.put_int("std_section_names", names.all_standard() as u64);

    if let Some(dir) = optional_header
        .data_directories
        .get(IMAGE_DIRECTORY_ENTRY_DEBUG)
    {
        sink.put_int("debug_size", dir.size as u64);
    }
    if let Some(dir) = optional_header
        .data_directories
        .get(IMAGE_DIRECTORY_ENTRY_IMPORT)
    {
        sink.put_int("iat_rva", dir.virtual_address as u64);
    }
    if let Some(dir) = optional_header
        .data_directories
        .get(IMAGE_DIRECTORY_ENTRY_EXPORT)
    {
        sink.put_int("export_size", dir.size as u64);
    }

    for (index, key) in DATADIR_FEATURES {
        if let Some(dir) = optional_header.data_directories.get(index) {
            sink.put_int(key, dir.size as u64);
        }
    }

    sink.put_int("major_version", optional_header.major_image_version as u64);
    sink.put_int("minor_version", optional_header.minor_image_version as u64);
    sink.put_int("check_sum", optional_header.checksum as u64);

    // A checksum mismatch is a legitimate feature; an unsupported structure
    // degrades to 0 rather than failing.
    let generated = image
        .checksum_offset
        .map(|offset| generate_checksum(image.data, offset))
        .unwrap_or(0);
    sink.put_int("generated_check_sum", generated as u64);

    if let Some(first) = image.sections.first() {
        sink.put_int("virtual_address", first.virtual_address as u64);
        sink.put_int("virtual_size", first.virtual_size as u64);
    }
    if let Some(second) = image.sections.get(1) {
        sink.put_int("virtual_size_2", second.virtual_size as u64);
    }

    sink.put_int(
        "number_of_sections",
        image.file_header.number_of_sections as u64,
    );
    sink.put_int("compile_date", image.file_header.time_date_stamp as u64);
    sink.put_int(
        "number_of_rva_and_sizes",
        optional_header.number_of_rva_and_sizes as u64,
    );
    sink.put_int("total_size_pe", image.data.len() as u64);

    if let Some(modules) = image.imports.as_deref() {
        sink.put_int("number_of_imports", modules.len() as u64);
        let symbols: usize = modules.iter().map(|module| module.symbols.len()).sum();
        sink.put_int("number_of_import_symbols", symbols as u64);
    }

    if let Some(modules) = image.bound_imports.as_deref() {
        sink.put_int("number_of_bound_imports", modules.len() as u64);
        let symbols: usize = modules.iter().map(|module| module.entries.len()).sum();
        sink.put_int("number_of_bound_import_symbols", symbols as u64);
    }

    // A malformed export directory leaves this at default; the sparse
    // extractor reports the sentinel entry.
    if let Some(ExportDirectoryView::Symbols(symbols)) = image.exports.as_ref() {
        sink.put_int("number_of_export_symbols", symbols.len() as u64);
    }

    sink.put_int("size_image", optional_header.size_of_image as u64);
    sink.put_int("size_code", optional_header.size_of_code as u64);
    sink.put_int(
        "size_initdata",
        optional_header.size_of_initialized_data as u64,
    );
    sink.put_int(
        "size_uninit",
        optional_header.size_of_uninitialized_data as u64,
    );
    sink.put_int("pe_majorlink", optional_header.major_linker_version as u64);
    sink.put_int("pe_minorlink", optional_header.minor_linker_version as u64);

    // Classification predicates reproduced verbatim, not normalized.
    sink.put_int("pe_driver", image.roles.is_driver as u64);
    sink.put_int("pe_exe", image.roles.is_exe as u64);
    sink.put_int("pe_dll", image.roles.is_dll as u64);
    sink.put_int(
        "pe_i386",
        (image.file_header.machine == Machine::I386) as u64,
    );
    sink.put_int("pe_char", image.file_header.characteristics as u64);

    let mut raw_execsize: u64 = 0;
    let mut va_execsize: u64 = 0;

    for (section, normalized) in image.sections.iter().zip(names.entries.iter()) {
        // One contribution per section, regardless of how many flags match.
        if section.is_executable()
            || section.contains_code()
            || section.is_writable()
            || section.is_readable()
        {
            raw_execsize += section.size_of_raw_data as u64;
            va_execsize += section.virtual_size as u64;
        }

        // Per-section metrics are gated on the standard-name table;
        // non-standard names only feed std_section_names and the
        // aggregates above.
        if normalized.standard {
            let fragment = dense_key_fragment(&normalized.name);
            sink.put_float(
                &format!("sec_entropy_{}", fragment),
                entropy_range(image.data, section.data.clone()),
            );
            sink.put_int(
                &format!("sec_rawptr_{}", fragment),
                section.pointer_to_raw_data as u64,
            );
            sink.put_int(
                &format!("sec_rawsize_{}", fragment),
                section.size_of_raw_data as u64,
            );
            sink.put_int(
                &format!("sec_vasize_{}", fragment),
                section.virtual_size as u64,
            );
        }
    }

    sink.put_int("sec_va_execsize", va_execsize);
    sink.put_int("sec_raw_execsize", raw_execsize);

    sink.put_int("pe_warnings", (!image.warnings.is_empty()) as u64);
}
