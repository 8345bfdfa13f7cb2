//! End-to-end tests for the feature extraction engine, driven by hand-built
//! parsed views and a stub collaborator parser.

use std::collections::BTreeSet;

use pe_features::extract::sparse::{EXPORTS_MALFORMED, IMPHASH_UNSUPPORTED};
use pe_features::image::{
    BoundImportModule, DataDirectory, ExportDirectoryView, ExportSymbol, FileHeaderView,
    ImageParser, ImageRoles, ImportModule, ImportSymbol, Machine, OptionalHeaderView, ParseError,
    ParsedPeImage, PeType, SectionView, IMAGE_SCN_CNT_CODE, IMAGE_SCN_MEM_EXECUTE,
    IMAGE_SCN_MEM_READ, IMAGE_SCN_MEM_WRITE,
};
use pe_features::{DenseValue, EngineConfig, FeatureEngine, FeatureReport, DENSE_SCHEMA, SPARSE_SCHEMA};

/// Deterministic pseudo-random image buffer.
fn buffer(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 131 + 7) as u8).collect()
}

fn section(name: &[u8], va: u32, vsize: u32, ptr: u32, rawsize: u32, flags: u32) -> SectionView {
    SectionView {
        raw_name: name.to_vec(),
        virtual_size: vsize,
        virtual_address: va,
        size_of_raw_data: rawsize,
        pointer_to_raw_data: ptr,
        characteristics: flags,
        data: ptr as usize..(ptr + rawsize) as usize,
    }
}

/// A well-formed 32-bit executable view: `.text` + `.data`, one import
/// module, a small export table.
fn well_formed(data: &[u8]) -> ParsedPeImage<'_> {
    ParsedPeImage {
        data,
        pe_type: Some(PeType::Pe32),
        file_header: FileHeaderView {
            machine: Machine::I386,
            number_of_sections: 2,
            time_date_stamp: 0x4a5b_6c7d,
            characteristics: 0x0102,
        },
        optional_header: Some(OptionalHeaderView {
            checksum: 0xdead,
            major_linker_version: 9,
            minor_linker_version: 0,
            major_image_version: 6,
            minor_image_version: 1,
            size_of_code: 0x200,
            size_of_initialized_data: 0x200,
            size_of_uninitialized_data: 0,
            size_of_image: 0x3000,
            number_of_rva_and_sizes: 16,
            data_directories: {
                let mut dirs = vec![DataDirectory::default(); 16];
                dirs[1] = DataDirectory {
                    virtual_address: 0x2100,
                    size: 0x80,
                };
                dirs[6] = DataDirectory {
                    virtual_address: 0x2400,
                    size: 0x1c,
                };
                dirs
            },
        }),
        sections: vec![
            section(
                b".text\0\0\0",
                0x1000,
                0x1f0,
                0x200,
                0x200,
                IMAGE_SCN_MEM_EXECUTE | IMAGE_SCN_CNT_CODE | IMAGE_SCN_MEM_READ,
            ),
            section(
                b".data\0\0\0",
                0x2000,
                0x180,
                0x400,
                0x200,
                IMAGE_SCN_MEM_READ | IMAGE_SCN_MEM_WRITE,
            ),
        ],
        imports: Some(vec![ImportModule {
            dll: "KERNEL32.dll".to_string(),
            symbols: vec![
                ImportSymbol {
                    name: Some("CreateFileA".to_string()),
                    ordinal: None,
                    bound: None,
                },
                ImportSymbol {
                    name: None,
                    ordinal: Some(42),
                    bound: Some(0x7700_0000),
                },
            ],
        }]),
        bound_imports: None,
        exports: Some(ExportDirectoryView::Symbols(vec![
            ExportSymbol {
                name: Some("DllMain".to_string()),
                ordinal: 1,
            },
            ExportSymbol {
                name: None,
                ordinal: 2,
            },
        ])),
        warnings: Vec::new(),
        roles: ImageRoles {
            is_exe: true,
            is_dll: false,
            is_driver: false,
        },
        checksum_offset: Some(0xd8),
        capabilities: Default::default(),
    }
}

/// Stub collaborator parser: accepts anything starting with `MZ`, rejects
/// everything else the way a real PE parser would.
struct StubParser;

impl ImageParser for StubParser {
    fn parse<'data>(&self, data: &'data [u8]) -> Result<ParsedPeImage<'data>, ParseError> {
        if data.len() < 2 || &data[..2] != b"MZ" {
            return Err(ParseError("missing MZ signature".to_string()));
        }
        Ok(well_formed(data))
    }
}

fn int(report: &FeatureReport, key: &str) -> u64 {
    match report.dense_features[key] {
        DenseValue::Int(value) => value,
        DenseValue::Float(value) => panic!("{} is a float: {}", key, value),
    }
}

#[test]
fn dense_and_sparse_key_sets_equal_the_schemas() {
    let data = buffer(0x600);
    let report = FeatureEngine::default().extract(well_formed(&data), vec![]);

    let dense_keys: BTreeSet<&str> = report.dense_features.keys().map(String::as_str).collect();
    let expected: BTreeSet<&str> = DENSE_SCHEMA.iter().copied().collect();
    assert_eq!(dense_keys, expected);

    let sparse_keys: BTreeSet<&str> = report.sparse_features.keys().map(String::as_str).collect();
    let expected: BTreeSet<&str> = SPARSE_SCHEMA.iter().copied().collect();
    assert_eq!(sparse_keys, expected);
}

#[test]
fn non_pe_bytes_fail_the_gate_with_empty_maps() {
    let engine = FeatureEngine::default();
    let report = engine.extract_bytes(&StubParser, b"just some random bytes", vec![]);

    assert!(!report.error.as_deref().unwrap_or("").is_empty());
    assert!(report.dense_features.is_empty());
    assert!(report.sparse_features.is_empty());
}

#[test]
fn short_data_directory_table_fails_the_gate() {
    let data = buffer(0x600);
    let mut image = well_formed(&data);
    image
        .optional_header
        .as_mut()
        .unwrap()
        .data_directories
        .truncate(5);

    let report = FeatureEngine::default().extract(image, vec![]);
    assert!(report.error.is_some());
    assert!(report.dense_features.is_empty());
}

#[test]
fn total_size_pe_is_the_exact_buffer_length() {
    for len in [0x40usize, 0x600, 0x1234] {
        let data = buffer(len);
        let report = FeatureEngine::default().extract(well_formed(&data), vec![]);
        assert_eq!(int(&report, "total_size_pe"), len as u64);
    }
}

#[test]
fn pe_i386_follows_the_machine_field() {
    let data = buffer(0x600);
    let engine = FeatureEngine::default();

    let report = engine.extract(well_formed(&data), vec![]);
    assert_eq!(int(&report, "pe_i386"), 1);

    for machine in [Machine::X86_64, Machine::Arm64, Machine::Unknown] {
        let mut image = well_formed(&data);
        image.file_header.machine = machine;
        let report = engine.extract(image, vec![]);
        assert_eq!(int(&report, "pe_i386"), 0);
    }
}

#[test]
fn well_formed_scenario_features() {
    let data = buffer(0x600);
    let report = FeatureEngine::default().extract(well_formed(&data), vec![]);

    assert_eq!(int(&report, "number_of_sections"), 2);
    assert_eq!(int(&report, "pe_i386"), 1);
    assert_eq!(int(&report, "std_section_names"), 1);
    assert_eq!(int(&report, "number_of_imports"), 1);
    assert_eq!(int(&report, "number_of_import_symbols"), 2);
    assert_eq!(int(&report, "pe_exe"), 1);
    assert_eq!(int(&report, "pe_dll"), 0);
    assert_eq!(int(&report, "iat_rva"), 0x2100);
    assert_eq!(int(&report, "debug_size"), 0x1c);
    assert_eq!(int(&report, "check_sum"), 0xdead);
    assert_ne!(int(&report, "generated_check_sum"), 0);
    assert_eq!(int(&report, "virtual_address"), 0x1000);
    assert_eq!(int(&report, "virtual_size"), 0x1f0);
    assert_eq!(int(&report, "virtual_size_2"), 0x180);
    // Both sections carry read flags: each contributes once.
    assert_eq!(int(&report, "sec_raw_execsize"), 0x400);
    assert_eq!(int(&report, "sec_va_execsize"), 0x1f0 + 0x180);

    let imported = &report.sparse_features["imported_symbols"];
    assert!(!imported.is_empty());
    assert!(imported.contains(&"kernel32.dll:name=createfilea".to_string()));
    assert!(imported.contains(&"kernel32.dll:ordinal=42 bound=1996488704".to_string()));

    let exported = &report.sparse_features["ExportedSymbols"];
    assert!(exported.contains(&"name=dllmain".to_string()));
    assert!(exported.contains(&"ordinal=2".to_string()));

    assert_eq!(
        report.sparse_features["section_names"],
        vec![".text".to_string(), ".data".to_string()]
    );
    assert_eq!(report.sparse_features["imp_hash"].len(), 1);
    assert_eq!(report.sparse_features["imp_hash"][0].len(), 32);
}

#[test]
fn zero_sections_yield_zeroed_section_features() {
    let data = buffer(0x200);
    let mut image = well_formed(&data);
    image.sections.clear();
    image.file_header.number_of_sections = 0;

    let report = FeatureEngine::default().extract(image, vec![]);
    assert_eq!(int(&report, "number_of_sections"), 0);
    assert_eq!(int(&report, "sec_va_execsize"), 0);
    assert_eq!(int(&report, "sec_raw_execsize"), 0);
    assert_eq!(int(&report, "virtual_address"), 0);
    assert_eq!(int(&report, "sec_rawptr_text"), 0);
    // Vacuously standard
    assert_eq!(int(&report, "std_section_names"), 1);
    assert!(report.sparse_features["section_names"].is_empty());
}

#[test]
fn non_standard_section_name_flips_std_and_stays_out_of_dense_keys() {
    let data = buffer(0x600);
    let mut image = well_formed(&data);
    image.sections.push(section(
        b".upx0\0\0\0",
        0x3000,
        0x100,
        0x0,
        0x0,
        IMAGE_SCN_MEM_EXECUTE,
    ));
    image.file_header.number_of_sections = 3;

    let report = FeatureEngine::default().extract(image, vec![]);
    assert_eq!(int(&report, "std_section_names"), 0);
    assert!(!report.dense_features.contains_key("sec_entropy_upx0"));
    // The non-standard section still appears in the sparse name list and
    // still feeds the executable aggregate.
    assert_eq!(
        report.sparse_features["section_names"].last().unwrap(),
        ".upx0"
    );
}

#[test]
fn extraction_is_idempotent() {
    let data = buffer(0x600);
    let engine = FeatureEngine::default();
    let first = engine.extract(well_formed(&data), vec!["t".to_string()]);
    let second = engine.extract(well_formed(&data), vec!["t".to_string()]);
    assert_eq!(first, second);
}

#[test]
fn malformed_export_directory_degrades_to_sentinel() {
    let data = buffer(0x600);
    let mut image = well_formed(&data);
    image.exports = Some(ExportDirectoryView::Malformed(
        "name table outside image".to_string(),
    ));

    let report = FeatureEngine::default().extract(image, vec![]);
    assert!(report.error.is_none());
    assert_eq!(
        report.sparse_features["ExportedSymbols"],
        vec![EXPORTS_MALFORMED.to_string()]
    );
    assert_eq!(int(&report, "number_of_export_symbols"), 0);
}

#[test]
fn bound_import_counts() {
    let data = buffer(0x600);
    let mut image = well_formed(&data);
    image.bound_imports = Some(vec![
        BoundImportModule {
            name: "ntdll.dll".to_string(),
            entries: vec!["fwd1".to_string(), "fwd2".to_string()],
        },
        BoundImportModule {
            name: "kernel32.dll".to_string(),
            entries: vec![],
        },
    ]);

    let report = FeatureEngine::default().extract(image, vec![]);
    assert_eq!(int(&report, "number_of_bound_imports"), 2);
    assert_eq!(int(&report, "number_of_bound_import_symbols"), 2);
}

#[test]
fn missing_import_hash_capability_reports_sentinel() {
    let data = buffer(0x600);
    let mut image = well_formed(&data);
    image.capabilities.import_hash = false;

    let report = FeatureEngine::default().extract(image, vec![]);
    assert_eq!(
        report.sparse_features["imp_hash"],
        vec![IMPHASH_UNSUPPORTED.to_string()]
    );
}

#[test]
fn parser_warnings_surface_in_both_maps() {
    let data = buffer(0x600);
    let mut image = well_formed(&data);
    image.warnings = vec!["SizeOfRawData is larger than file".to_string()];

    let report = FeatureEngine::new(EngineConfig { verbose: true }).extract(image, vec![]);
    assert_eq!(int(&report, "pe_warnings"), 1);
    assert_eq!(
        report.sparse_features["pe_warning_strings"],
        vec!["SizeOfRawData is larger than file".to_string()]
    );
}

#[test]
fn tags_pass_through_unmodified_on_success_only() {
    let data = buffer(0x600);
    let engine = FeatureEngine::default();
    let tags = vec!["malware".to_string(), "triage:batch7".to_string()];

    let report = engine.extract(well_formed(&data), tags.clone());
    assert_eq!(report.tags, tags);

    let report = engine.extract_bytes(&StubParser, b"nope", tags);
    assert!(report.tags.is_empty());
}

#[test]
fn report_envelope_serializes_like_the_wire_contract() {
    let data = buffer(0x600);
    let engine = FeatureEngine::default();

    let success = engine.extract(well_formed(&data), vec!["t1".to_string()]);
    let json = serde_json::to_value(&success).unwrap();
    assert!(json.get("error").is_none());
    assert!(json["dense_features"].is_object());
    assert!(json["sparse_features"].is_object());
    assert_eq!(json["tags"][0], "t1");

    let failure = engine.extract_bytes(&StubParser, b"nope", vec![]);
    let json = serde_json::to_value(&failure).unwrap();
    assert!(json["error"].as_str().unwrap().contains("parse failure"));
    assert_eq!(json["dense_features"], serde_json::json!({}));
    assert!(json.get("tags").is_none());

    // Round-trip
    let back: FeatureReport = serde_json::from_value(json).unwrap();
    assert_eq!(back, failure);
}
