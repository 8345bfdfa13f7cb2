//! Structured, read-only view of an externally-parsed PE image.
//!
//! The engine never decodes raw PE byte streams. A collaborator implementing
//! [`ImageParser`] materializes a [`ParsedPeImage`] exposing exactly the
//! attributes extraction needs: header fields, the data-directory table, the
//! section list with entropy-computable byte ranges, and the optional
//! import/bound-import/export tables. Nothing here assumes any particular
//! parser's internal representation.

use std::ops::Range;

use thiserror::Error;

// Data directory indices read by the extractors
pub const IMAGE_DIRECTORY_ENTRY_EXPORT: usize = 0;
pub const IMAGE_DIRECTORY_ENTRY_IMPORT: usize = 1;
pub const IMAGE_DIRECTORY_ENTRY_RESOURCE: usize = 2;
pub const IMAGE_DIRECTORY_ENTRY_BASERELOC: usize = 5;
pub const IMAGE_DIRECTORY_ENTRY_DEBUG: usize = 6;
pub const IMAGE_DIRECTORY_ENTRY_IAT: usize = 12;

// Section characteristics
pub const IMAGE_SCN_CNT_CODE: u32 = 0x0000_0020;
pub const IMAGE_SCN_MEM_EXECUTE: u32 = 0x2000_0000;
pub const IMAGE_SCN_MEM_READ: u32 = 0x4000_0000;
pub const IMAGE_SCN_MEM_WRITE: u32 = 0x8000_0000;

/// Failure reported by the external parser for a byte buffer it could not
/// turn into a structured view.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ParseError(pub String);

/// Capability interface for the external PE structure parser.
pub trait ImageParser {
    fn parse<'data>(&self, data: &'data [u8]) -> Result<ParsedPeImage<'data>, ParseError>;
}

/// Machine types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Machine {
    #[default]
    Unknown,
    I386,   // 0x014c
    X86_64, // 0x8664
    Arm,    // 0x01c0
    Arm64,  // 0xaa64
    ArmNT,  // 0x01c4
    IA64,   // 0x0200
    Other(u16),
}

impl From<u16> for Machine {
    fn from(value: u16) -> Self {
        match value {
            0x014c => Self::I386,
            0x8664 => Self::X86_64,
            0x01c0 => Self::Arm,
            0xaa64 => Self::Arm64,
            0x01c4 => Self::ArmNT,
            0x0200 => Self::IA64,
            0 => Self::Unknown,
            other => Self::Other(other),
        }
    }
}

/// Overall image classification from the optional header magic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeType {
    Pe32,
    Pe32Plus,
}

/// Data directory entry
#[derive(Debug, Clone, Copy, Default)]
pub struct DataDirectory {
    pub virtual_address: u32,
    pub size: u32,
}

/// File (COFF) header fields consumed by extraction.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileHeaderView {
    pub machine: Machine,
    pub number_of_sections: u16,
    pub time_date_stamp: u32,
    pub characteristics: u16,
}

/// Optional header fields consumed by extraction.
#[derive(Debug, Clone, Default)]
pub struct OptionalHeaderView {
    pub checksum: u32,
    pub major_linker_version: u8,
    pub minor_linker_version: u8,
    pub major_image_version: u16,
    pub minor_image_version: u16,
    pub size_of_code: u32,
    pub size_of_initialized_data: u32,
    pub size_of_uninitialized_data: u32,
    pub size_of_image: u32,
    pub number_of_rva_and_sizes: u32,
    pub data_directories: Vec<DataDirectory>,
}

/// One section of the image.
///
/// `data` is the section's raw byte range within the image buffer, clamped
/// by the parser to the buffer; entropy is computed over it.
#[derive(Debug, Clone)]
pub struct SectionView {
    pub raw_name: Vec<u8>,
    pub virtual_size: u32,
    pub virtual_address: u32,
    pub size_of_raw_data: u32,
    pub pointer_to_raw_data: u32,
    pub characteristics: u32,
    pub data: Range<usize>,
}

impl SectionView {
    pub fn is_executable(&self) -> bool {
        (self.characteristics & IMAGE_SCN_MEM_EXECUTE) != 0
    }

    pub fn contains_code(&self) -> bool {
        (self.characteristics & IMAGE_SCN_CNT_CODE) != 0
    }

    pub fn is_readable(&self) -> bool {
        (self.characteristics & IMAGE_SCN_MEM_READ) != 0
    }

    pub fn is_writable(&self) -> bool {
        (self.characteristics & IMAGE_SCN_MEM_WRITE) != 0
    }
}

/// Import table entry: ordinal-vs-named, optionally bound to an address.
#[derive(Debug, Clone, Default)]
pub struct ImportSymbol {
    pub name: Option<String>,
    pub ordinal: Option<u16>,
    pub bound: Option<u64>,
}

/// One module of the import table.
#[derive(Debug, Clone)]
pub struct ImportModule {
    pub dll: String,
    pub symbols: Vec<ImportSymbol>,
}

/// One module of the bound-import table.
#[derive(Debug, Clone)]
pub struct BoundImportModule {
    pub name: String,
    pub entries: Vec<String>,
}

/// Export table entry.
#[derive(Debug, Clone, Default)]
pub struct ExportSymbol {
    pub name: Option<String>,
    pub ordinal: u32,
}

/// Export directory as reported by the parser.
///
/// Malformed export directories are common in the wild; the parser reports
/// them as `Malformed` so extraction can degrade instead of failing.
#[derive(Debug, Clone)]
pub enum ExportDirectoryView {
    Symbols(Vec<ExportSymbol>),
    Malformed(String),
}

/// Classification predicates, reproduced verbatim from the parser.
///
/// Not guaranteed mutually exclusive in source data.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageRoles {
    pub is_exe: bool,
    pub is_dll: bool,
    pub is_driver: bool,
}

/// Optional capabilities of the supplying parser.
#[derive(Debug, Clone, Copy)]
pub struct ParserCapabilities {
    /// Whether the parser materializes an import list usable for imphash.
    pub import_hash: bool,
}

impl Default for ParserCapabilities {
    fn default() -> Self {
        Self { import_hash: true }
    }
}

/// Structured view of one parsed PE image.
#[derive(Debug, Clone, Default)]
pub struct ParsedPeImage<'data> {
    /// The full underlying image buffer.
    pub data: &'data [u8],
    /// Overall type classification; `None` fails the structural gate.
    pub pe_type: Option<PeType>,
    pub file_header: FileHeaderView,
    /// `None` fails the structural gate.
    pub optional_header: Option<OptionalHeaderView>,
    /// Sections in table order.
    pub sections: Vec<SectionView>,
    /// Import directory, if present in the image.
    pub imports: Option<Vec<ImportModule>>,
    /// Bound-import directory, if present in the image.
    pub bound_imports: Option<Vec<BoundImportModule>>,
    /// Export directory, if present in the image.
    pub exports: Option<ExportDirectoryView>,
    /// Non-fatal structural warnings collected while parsing.
    pub warnings: Vec<String>,
    pub roles: ImageRoles,
    /// File offset of the stored checksum dword; `None` when the parser
    /// cannot locate it, which leaves `generated_check_sum` at default.
    pub checksum_offset: Option<usize>,
    pub capabilities: ParserCapabilities,
}
