//! Decoder for `@udt/<id>` responses.

use crate::codec::TypeCode16;
use crate::error::WireError;

/// `udt_id(2) | member_desc_words(4) | total_size(4) | n_fields(2) | handle(2)`
const HEADER_LEN: usize = 2 + 4 + 4 + 2 + 2;
/// `metadata(2) | type_code(2) | offset(4)`
const FIELD_DESC_LEN: usize = 2 + 2 + 4;

/// One field of a UDT definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdtField {
    pub type_code: TypeCode16,
    pub offset: u32,
    /// Always 1 unless [`TypeCode16::is_array_field`] held for this field.
    pub array_count: u16,
    /// `-1` unless this field is a bit field (see [`TypeCode16::is_bit_field`]).
    pub bit_number: i32,
    pub name: String,
}

impl UdtField {
    #[must_use]
    pub fn is_bit(&self) -> bool {
        self.bit_number >= 0
    }
}

/// A parsed UDT definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdtEntry {
    pub udt_id: u16,
    pub total_size: u32,
    pub fields: Vec<UdtField>,
    pub name: String,
}

/// Parses an `@udt/<id>` response into a [`UdtEntry`].
///
/// Never reads past `buf`: a header or field table that claims more bytes
/// than `buf` holds is reported as [`WireError::BufferTooShort`]. If the
/// field-name strings run out before every field has a name, the remaining
/// fields are given empty names rather than erroring.
pub fn parse_udt_entry(buf: &[u8]) -> Result<UdtEntry, WireError> {
    if buf.len() < HEADER_LEN {
        return Err(WireError::BufferTooShort);
    }

    let udt_id = u16::from_le_bytes(buf[0..2].try_into().unwrap());
    let total_size = u32::from_le_bytes(buf[6..10].try_into().unwrap());
    let n_fields = u16::from_le_bytes(buf[10..12].try_into().unwrap()) as usize;

    let mut offset = HEADER_LEN;
    let mut raw_fields = Vec::with_capacity(n_fields);
    for _ in 0..n_fields {
        if buf.len() < offset + FIELD_DESC_LEN {
            return Err(WireError::BufferTooShort);
        }
        let metadata = u16::from_le_bytes(buf[offset..offset + 2].try_into().unwrap());
        let type_code = TypeCode16::new(u16::from_le_bytes(
            buf[offset + 2..offset + 4].try_into().unwrap(),
        ));
        let field_offset = u32::from_le_bytes(buf[offset + 4..offset + 8].try_into().unwrap());
        raw_fields.push((metadata, type_code, field_offset));
        offset += FIELD_DESC_LEN;
    }

    let name_start = offset;
    let name_nul = find_nul(buf, name_start).ok_or(WireError::BufferTooShort)?;
    let raw_name = &buf[name_start..name_nul];
    // Name ends at the first `;`; anything after it up to the NUL is opaque.
    let semicolon = raw_name.iter().position(|&b| b == b';').unwrap_or(raw_name.len());
    let name = String::from_utf8_lossy(&raw_name[..semicolon]).into_owned();

    let mut cursor = name_nul + 1;
    let mut fields = Vec::with_capacity(n_fields);
    for (metadata, type_code, field_offset) in raw_fields {
        let (array_count, bit_number) = if type_code.is_array_field() {
            (metadata, -1)
        } else if type_code.is_bit_field() {
            (1, i32::from(metadata))
        } else {
            (1, -1)
        };

        let field_name = match find_nul(buf, cursor) {
            Some(nul) => {
                let s = String::from_utf8_lossy(&buf[cursor..nul]).into_owned();
                cursor = nul + 1;
                s
            }
            None => String::new(),
        };

        fields.push(UdtField {
            type_code,
            offset: field_offset,
            array_count,
            bit_number,
            name: field_name,
        });
    }

    Ok(UdtEntry {
        udt_id,
        total_size,
        fields,
        name,
    })
}

fn find_nul(buf: &[u8], start: usize) -> Option<usize> {
    let slice = buf.get(start..)?;
    slice.iter().position(|&b| b == 0).map(|p| start + p)
}
