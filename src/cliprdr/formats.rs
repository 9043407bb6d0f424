//! Clipboard formats and the short-name FormatList encoding.
//!
//! Each short-form entry is exactly 36 bytes:
//!
//! ```text
//! ┌──────────────┬──────────────────────────────────────────────┐
//! │ formatId:u32 │ formatName: 32 bytes UTF-16LE, zero padded   │
//! └──────────────┴──────────────────────────────────────────────┘
//! ```
//!
//! An all-zero name slot means the format has no name (standard numeric
//! formats such as [`CF_TEXT`]).

use bytes::{Buf, BufMut, BytesMut};

use crate::cliprdr::error::{CliprdrError, Result};

// =============================================================================
// Windows Clipboard Format IDs
// =============================================================================

/// Standard Windows clipboard format: ANSI text
pub const CF_TEXT: u32 = 1;

/// Standard Windows clipboard format: OEM text
pub const CF_OEMTEXT: u32 = 7;

/// Standard Windows clipboard format: Device-independent bitmap
pub const CF_DIB: u32 = 8;

/// Standard Windows clipboard format: Unicode text (UTF-16LE)
pub const CF_UNICODETEXT: u32 = 13;

/// Standard Windows clipboard format: File drop list
pub const CF_HDROP: u32 = 15;

/// Registered format: HTML (registered format name: "HTML Format")
pub const CF_HTML: u32 = 0xD010;

/// Registered name of the HTML clipboard format
pub const HTML_FORMAT_NAME: &str = "HTML Format";

/// Size of one short-name FormatList entry
pub const SHORT_FORMAT_ENTRY_SIZE: usize = 36;

/// Size of the fixed-width name slot in a short-name entry
pub const SHORT_FORMAT_NAME_SIZE: usize = 32;

const PDU_NAME: &str = "FormatList";

// =============================================================================
// Format entries
// =============================================================================

/// A clipboard format with ID and optional name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FormatEntry {
    id: u32,
    name: Option<String>,
}

impl FormatEntry {
    /// Create a format with ID only
    pub fn new(id: u32) -> Self {
        Self { id, name: None }
    }

    /// Create a format with ID and name
    ///
    /// An empty name is the same as no name.
    pub fn with_name(id: u32, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id,
            name: (!name.is_empty()).then_some(name),
        }
    }

    /// Format for ANSI text
    pub fn text() -> Self {
        Self::new(CF_TEXT)
    }

    /// Format for Unicode text
    pub fn unicode_text() -> Self {
        Self::new(CF_UNICODETEXT)
    }

    /// Format for HTML
    pub fn html() -> Self {
        Self::with_name(CF_HTML, HTML_FORMAT_NAME)
    }

    /// Format ID
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Format name, `None` for unnamed formats
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn encode_short(&self, dst: &mut BytesMut) -> Result<()> {
        let mut slot = [0u8; SHORT_FORMAT_NAME_SIZE];

        if let Some(name) = &self.name {
            if name.contains('\0') {
                return Err(CliprdrError::malformed(
                    PDU_NAME,
                    format!("format {:#x} name contains NUL", self.id),
                ));
            }

            let units: Vec<u16> = name.encode_utf16().collect();
            if units.len() * 2 > SHORT_FORMAT_NAME_SIZE {
                return Err(CliprdrError::malformed(
                    PDU_NAME,
                    format!(
                        "format {:#x} name {:?} does not fit the {}-byte name slot",
                        self.id, name, SHORT_FORMAT_NAME_SIZE
                    ),
                ));
            }

            for (i, unit) in units.iter().enumerate() {
                slot[i * 2..i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
            }
        }

        dst.put_u32_le(self.id);
        dst.put_slice(&slot);
        Ok(())
    }

    fn decode_short(src: &mut &[u8]) -> Self {
        let id = src.get_u32_le();

        let mut units = Vec::with_capacity(SHORT_FORMAT_NAME_SIZE / 2);
        for _ in 0..SHORT_FORMAT_NAME_SIZE / 2 {
            units.push(src.get_u16_le());
        }

        // The slot is NUL terminated; whatever follows the terminator is padding.
        let end = units.iter().position(|&u| u == 0).unwrap_or(units.len());
        let name = String::from_utf16_lossy(&units[..end]);

        Self::with_name(id, name)
    }
}

// =============================================================================
// Format list
// =============================================================================

/// Ordered list of formats offered by one side
///
/// Order is the owner's priority order. Duplicates are kept.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormatList {
    entries: Vec<FormatEntry>,
}

impl FormatList {
    /// Create a format list from entries
    pub fn new(entries: Vec<FormatEntry>) -> Self {
        Self { entries }
    }

    /// Entries in priority order
    pub fn entries(&self) -> &[FormatEntry] {
        &self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no formats are offered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the entries
    pub fn iter(&self) -> std::slice::Iter<'_, FormatEntry> {
        self.entries.iter()
    }

    /// Format IDs in order
    pub fn ids(&self) -> Vec<u32> {
        self.entries.iter().map(FormatEntry::id).collect()
    }

    /// Encoded body length in the short-name form
    pub fn encoded_len(&self) -> usize {
        self.entries.len() * SHORT_FORMAT_ENTRY_SIZE
    }

    pub(crate) fn encode_body(&self, dst: &mut BytesMut) -> Result<()> {
        dst.reserve(self.encoded_len());
        for entry in &self.entries {
            entry.encode_short(dst)?;
        }
        Ok(())
    }

    pub(crate) fn decode_body(mut src: &[u8]) -> Result<Self> {
        if src.len() % SHORT_FORMAT_ENTRY_SIZE != 0 {
            return Err(CliprdrError::malformed(
                PDU_NAME,
                format!(
                    "body length {} is not a multiple of {}",
                    src.len(),
                    SHORT_FORMAT_ENTRY_SIZE
                ),
            ));
        }

        let mut entries = Vec::with_capacity(src.len() / SHORT_FORMAT_ENTRY_SIZE);
        while src.has_remaining() {
            entries.push(FormatEntry::decode_short(&mut src));
        }

        Ok(Self { entries })
    }
}

impl From<Vec<FormatEntry>> for FormatList {
    fn from(entries: Vec<FormatEntry>) -> Self {
        Self::new(entries)
    }
}

impl FromIterator<FormatEntry> for FormatList {
    fn from_iter<I: IntoIterator<Item = FormatEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a FormatList {
    type Item = &'a FormatEntry;
    type IntoIter = std::slice::Iter<'a, FormatEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
