//! Decoder for the `@tags` pseudo-tag response.

use crate::codec::TypeCode16;

const MAX_TAG_NAME_LEN: usize = 32;

/// `instance_id(4) | symbol_type(2) | element_length(2) | array_dims[3](3x4) | string_len(2)`
const RECORD_HEADER_LEN: usize = 4 + 2 + 2 + 3 * 4 + 2;

/// One admitted record from the `@tags` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagEntry {
    pub instance_id: u32,
    pub type_code: TypeCode16,
    pub element_length: u16,
    pub array_dims: [u32; 3],
    pub name: String,
}

impl TagEntry {
    /// Product of non-zero dimensions named by [`TypeCode16::tag_dimensions`]
    /// (1 if the tag has no array dimensions).
    #[must_use]
    pub fn element_count(&self) -> u32 {
        let n_dims = self.type_code.tag_dimensions() as usize;
        let mut count: u32 = 1;
        for &dim in self.array_dims.iter().take(n_dims) {
            if dim != 0 {
                count = count.saturating_mul(dim);
            }
        }
        count
    }

    /// `element_count * element_length`, the tag's total value size in bytes.
    #[must_use]
    pub fn total_value_bytes(&self) -> u32 {
        self.element_count() * u32::from(self.element_length)
    }

    /// Whether this record's name is a `@`-prefixed pseudo-tag rather than a
    /// controller tag the caller is likely to care about.
    #[must_use]
    pub fn is_system_pseudo_tag(&self) -> bool {
        self.name.starts_with('@')
    }
}

/// The surviving records from an `@tags` response, plus whether parsing
/// stopped early because the buffer was truncated mid-record.
#[derive(Debug, Clone, Default)]
pub struct TagListing {
    pub entries: Vec<TagEntry>,
    pub truncated: bool,
}

/// Parses a `@tags` response into admitted tag-entry records.
///
/// Records are consumed sequentially until the buffer is exhausted. A record
/// whose name fails [`is_valid_tag_name`] is skipped without allocating; a
/// record whose declared length runs past the end of the buffer stops
/// parsing and sets [`TagListing::truncated`].
#[must_use]
pub fn parse_tag_listing(buf: &[u8]) -> TagListing {
    let mut listing = TagListing::default();
    let mut offset = 0usize;

    while offset < buf.len() {
        match parse_record(&buf[offset..]) {
            Some((consumed, entry)) => {
                offset += consumed;
                if let Some(entry) = entry {
                    listing.entries.push(entry);
                }
            }
            None => {
                listing.truncated = true;
                break;
            }
        }
    }

    listing
}

fn parse_record(buf: &[u8]) -> Option<(usize, Option<TagEntry>)> {
    if buf.len() < RECORD_HEADER_LEN {
        return None;
    }

    let instance_id = u32::from_le_bytes(buf[0..4].try_into().unwrap());
    let symbol_type = u16::from_le_bytes(buf[4..6].try_into().unwrap());
    let element_length = u16::from_le_bytes(buf[6..8].try_into().unwrap());

    let mut array_dims = [0u32; 3];
    for (i, dim) in array_dims.iter_mut().enumerate() {
        let start = 8 + i * 4;
        *dim = u32::from_le_bytes(buf[start..start + 4].try_into().unwrap());
    }

    let string_len = u16::from_le_bytes(buf[20..22].try_into().unwrap()) as usize;
    let record_len = RECORD_HEADER_LEN + string_len;
    if buf.len() < record_len {
        return None;
    }

    let name_bytes = &buf[RECORD_HEADER_LEN..record_len];

    let entry = is_valid_tag_name(name_bytes).then(|| TagEntry {
        instance_id,
        type_code: TypeCode16::new(symbol_type),
        element_length,
        array_dims,
        name: String::from_utf8_lossy(name_bytes).into_owned(),
    });

    Some((record_len, entry))
}

/// The authoritative tag-name filter: length in `[1, 32]`, first character
/// a letter or `@`, every character alphanumeric, underscore, `@`, or `/`.
#[must_use]
pub fn is_valid_tag_name(name: &[u8]) -> bool {
    if name.is_empty() || name.len() > MAX_TAG_NAME_LEN {
        return false;
    }

    let first = name[0];
    if !(first.is_ascii_alphabetic() || first == b'@') {
        return false;
    }

    name.iter()
        .all(|&b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'@' | b'/'))
}
