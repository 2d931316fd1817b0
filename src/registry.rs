//! The type registry: a catalogue of fixed types, string types, and
//! discovered UDTs indexed by [`TypeId32`], plus the append-only name arena
//! that backs every name view the registry and tag memory hand out.

use std::collections::HashMap;

use num_enum::TryFromPrimitive;

use crate::codec::TypeId32;
use crate::wire::UdtEntry as WireUdtEntry;

/// A `(start, len)` slice into a [`NameArena`], analogous to the `Offset`
/// the tag memory model uses for byte buffers. Using a range rather than a
/// pointer sidesteps the self-referential-struct
/// problem the source's raw `char*` views have, while keeping the same
/// "stable view into an owned buffer" semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameRef {
    start: u32,
    len: u32,
}

impl NameRef {
    const EMPTY: NameRef = NameRef { start: 0, len: 0 };
}

/// An append-only byte buffer; every name handed out by the registry or
/// the tag memory model is a [`NameRef`] into one of these.
#[derive(Debug, Default)]
pub struct NameArena {
    bytes: Vec<u8>,
}

impl NameArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, s: &str) -> NameRef {
        let start = self.bytes.len() as u32;
        self.bytes.extend_from_slice(s.as_bytes());
        NameRef {
            start,
            len: s.len() as u32,
        }
    }

    #[must_use]
    pub fn get(&self, r: NameRef) -> &str {
        let start = r.start as usize;
        let end = start + r.len as usize;
        self.bytes
            .get(start..end)
            .and_then(|b| std::str::from_utf8(b).ok())
            .unwrap_or("")
    }
}

/// The controller's built-in atomic/string type codes, `[0xC1, 0xDE]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum FixedCode {
    Bool = 0xC1,
    Sint = 0xC2,
    Int = 0xC3,
    Dint = 0xC4,
    Lint = 0xC5,
    Usint = 0xC6,
    Uint = 0xC7,
    Udint = 0xC8,
    Ulint = 0xC9,
    Real = 0xCA,
    Lreal = 0xCB,
    SynchronousTime = 0xCC,
    Date = 0xCD,
    Time = 0xCE,
    DateTime = 0xCF,
    CharString = 0xD0,
    String8 = 0xD1,
    String16 = 0xD2,
    String32 = 0xD3,
    String64 = 0xD4,
    WideString = 0xD5,
    HighResDuration = 0xD6,
    MedResDuration = 0xD7,
    LowResDuration = 0xD8,
    NByteString = 0xD9,
    CountedCharString = 0xDA,
    DurationMs = 0xDB,
    CipPath = 0xDC,
    EngineeringUnits = 0xDD,
    InternationalString = 0xDE,
}

pub const NUMERIC_CODES: [FixedCode; 11] = [
    FixedCode::Bool,
    FixedCode::Sint,
    FixedCode::Int,
    FixedCode::Dint,
    FixedCode::Lint,
    FixedCode::Usint,
    FixedCode::Uint,
    FixedCode::Udint,
    FixedCode::Ulint,
    FixedCode::Real,
    FixedCode::Lreal,
];

pub const STRING_CODES: [FixedCode; 9] = [
    FixedCode::CharString,
    FixedCode::String8,
    FixedCode::String16,
    FixedCode::String32,
    FixedCode::String64,
    FixedCode::WideString,
    FixedCode::NByteString,
    FixedCode::CountedCharString,
    FixedCode::InternationalString,
];

pub const OTHER_CODES: [FixedCode; 10] = [
    FixedCode::SynchronousTime,
    FixedCode::Date,
    FixedCode::Time,
    FixedCode::DateTime,
    FixedCode::HighResDuration,
    FixedCode::MedResDuration,
    FixedCode::LowResDuration,
    FixedCode::DurationMs,
    FixedCode::CipPath,
    FixedCode::EngineeringUnits,
];

const MAX_TYPE_BYTES: u32 = 16;

fn fixed_name(code: FixedCode) -> &'static str {
    use FixedCode::*;
    match code {
        Bool => "BOOL",
        Sint => "SINT",
        Int => "INT",
        Dint => "DINT",
        Lint => "LINT",
        Usint => "USINT",
        Uint => "UINT",
        Udint => "UDINT",
        Ulint => "ULINT",
        Real => "REAL",
        Lreal => "LREAL",
        SynchronousTime => "SYNC_TIME",
        Date => "DATE",
        Time => "TIME",
        DateTime => "DATE_AND_TIME",
        CharString => "STRING",
        String8 => "STRING_8",
        String16 => "STRING_16",
        String32 => "STRING_32",
        String64 => "STRING_64",
        WideString => "WIDE_STRING",
        HighResDuration => "HIGH_RES_DURATION",
        MedResDuration => "MED_RES_DURATION",
        LowResDuration => "LOW_RES_DURATION",
        NByteString => "N_BYTE_STRING",
        CountedCharString => "COUNTED_CHAR_STRING",
        DurationMs => "DURATION_MS",
        CipPath => "CIP_PATH",
        EngineeringUnits => "ENGINEERING_UNITS",
        InternationalString => "INTERNATIONAL_STRING",
    }
}

fn fixed_description(code: FixedCode) -> &'static str {
    use FixedCode::*;
    match code {
        Bool => "Boolean value",
        Sint => "Signed 8-bit integer value",
        Int => "Signed 16-bit integer value",
        Dint => "Signed 32-bit integer value",
        Lint => "Signed 64-bit integer value",
        Usint => "Unsigned 8-bit integer value",
        Uint => "Unsigned 16-bit integer value",
        Udint => "Unsigned 32-bit integer value",
        Ulint => "Unsigned 64-bit integer value",
        Real => "32-bit floating point value, IEEE format",
        Lreal => "64-bit floating point value, IEEE format",
        SynchronousTime => "Synchronous time value",
        Date => "Date value",
        Time => "Time of day value",
        DateTime => "Date and time of day value",
        CharString => "Character string, 1 byte per character",
        String8 => "8-bit bit string",
        String16 => "16-bit bit string",
        String32 => "32-bit bit string",
        String64 => "64-bit bit string",
        WideString => "Wide char character string, 2 bytes per character",
        HighResDuration => "High resolution duration value",
        MedResDuration => "Medium resolution duration value",
        LowResDuration => "Low resolution duration value",
        NByteString => "N-byte per char character string",
        CountedCharString => "Counted character string with 1 byte per character and 1 byte length indicator",
        DurationMs => "Duration in milliseconds",
        CipPath => "CIP path segment(s)",
        EngineeringUnits => "Engineering units",
        InternationalString => "International character string",
    }
}

fn fixed_size(code: FixedCode) -> u32 {
    use FixedCode::*;
    match code {
        Bool | Sint | Usint => 1,
        Int | Uint => 2,
        Dint | Udint | Real => 4,
        Lint | Ulint | Lreal => 8,
        _ => MAX_TYPE_BYTES,
    }
}

/// Classification of a type-id for display/dispatch purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagType {
    Bool,
    Sint,
    Int,
    Dint,
    Lint,
    Usint,
    Uint,
    Udint,
    Ulint,
    Real,
    Lreal,
    String,
    Udt,
    Misc,
}

/// Pure function over the id-space; does not require a registry.
#[must_use]
pub fn tag_type_kind(type_id: TypeId32) -> TagType {
    if type_id.is_udt() {
        return TagType::Udt;
    }

    let Some(code) = type_id.fixed_code().and_then(|c| FixedCode::try_from(c).ok()) else {
        return TagType::Misc;
    };

    if STRING_CODES.contains(&code) {
        return TagType::String;
    }

    let numeric_offset = NUMERIC_CODES.iter().position(|&c| c == code);
    match numeric_offset {
        Some(0) => TagType::Bool,
        Some(1) => TagType::Sint,
        Some(2) => TagType::Int,
        Some(3) => TagType::Dint,
        Some(4) => TagType::Lint,
        Some(5) => TagType::Usint,
        Some(6) => TagType::Uint,
        Some(7) => TagType::Udint,
        Some(8) => TagType::Ulint,
        Some(9) => TagType::Real,
        Some(10) => TagType::Lreal,
        _ => TagType::Misc,
    }
}

/// A registered fixed or string type.
#[derive(Debug, Clone)]
pub struct FixedTypeEntry {
    pub type_id: TypeId32,
    pub name: &'static str,
    pub description: &'static str,
    pub size: u32,
}

/// A field of a registered UDT, after the field-level type name has been
/// resolved (initially empty).
#[derive(Debug, Clone)]
pub struct UdtFieldEntry {
    pub type_id: TypeId32,
    pub offset: u32,
    pub array_count: u16,
    pub bit_number: i32,
    field_name: NameRef,
    data_type_name: NameRef,
}

impl UdtFieldEntry {
    #[must_use]
    pub fn is_bit(&self) -> bool {
        self.bit_number >= 0
    }
}

/// A registered UDT.
#[derive(Debug, Clone)]
pub struct UdtTypeEntry {
    pub type_id: TypeId32,
    pub size: u32,
    name: NameRef,
    pub fields: Vec<UdtFieldEntry>,
}

/// The catalogue of fixed types, string types, and discovered UDTs.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    fixed_order: Vec<TypeId32>,
    fixed: HashMap<TypeId32, FixedTypeEntry>,
    udt_order: Vec<TypeId32>,
    udts: HashMap<TypeId32, UdtTypeEntry>,
    arena: NameArena,
}

/// A borrowed view of one [`FixedTypeEntry`], mirroring the source's
/// `plcscan::DataType`.
#[derive(Debug, Clone, Copy)]
pub struct DataTypeView<'a> {
    entry: &'a FixedTypeEntry,
}

impl<'a> DataTypeView<'a> {
    #[must_use]
    pub fn type_id(&self) -> TypeId32 {
        self.entry.type_id
    }

    #[must_use]
    pub fn name(&self) -> &'a str {
        self.entry.name
    }

    #[must_use]
    pub fn description(&self) -> &'a str {
        self.entry.description
    }

    #[must_use]
    pub fn size(&self) -> u32 {
        self.entry.size
    }
}

/// A borrowed view of one [`UdtFieldEntry`], resolved against its owning
/// registry's name arena (mirrors `plcscan::UdtFieldType`).
#[derive(Debug, Clone, Copy)]
pub struct UdtFieldView<'a> {
    registry: &'a TypeRegistry,
    field: &'a UdtFieldEntry,
}

impl<'a> UdtFieldView<'a> {
    #[must_use]
    pub fn type_id(&self) -> TypeId32 {
        self.field.type_id
    }

    #[must_use]
    pub fn offset(&self) -> u32 {
        self.field.offset
    }

    #[must_use]
    pub fn array_count(&self) -> u16 {
        self.field.array_count
    }

    #[must_use]
    pub fn bit_number(&self) -> i32 {
        self.field.bit_number
    }

    #[must_use]
    pub fn is_bit(&self) -> bool {
        self.field.is_bit()
    }

    #[must_use]
    pub fn name(&self) -> &'a str {
        self.registry.field_name(self.field)
    }

    #[must_use]
    pub fn data_type_name(&self) -> &'a str {
        self.registry.field_data_type_name(self.field)
    }
}

/// A borrowed view of one [`UdtTypeEntry`] and its fields (mirrors
/// `plcscan::UdtType`).
#[derive(Debug, Clone, Copy)]
pub struct UdtTypeView<'a> {
    registry: &'a TypeRegistry,
    entry: &'a UdtTypeEntry,
}

impl<'a> UdtTypeView<'a> {
    #[must_use]
    pub fn type_id(&self) -> TypeId32 {
        self.entry.type_id
    }

    #[must_use]
    pub fn name(&self) -> &'a str {
        self.registry.arena.get(self.entry.name)
    }

    #[must_use]
    pub fn size(&self) -> u32 {
        self.entry.size
    }

    #[must_use]
    pub fn fields(&self) -> impl Iterator<Item = UdtFieldView<'a>> {
        let registry = self.registry;
        self.entry.fields.iter().map(move |field| UdtFieldView { registry, field })
    }
}

const UDT_PLACEHOLDER: &str = "UDT";

impl TypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Populates the registry with every fixed and string type (called once
    /// from [`crate::init`]).
    pub fn populate_fixed_types(&mut self) {
        for &code in NUMERIC_CODES.iter().chain(STRING_CODES.iter()).chain(OTHER_CODES.iter()) {
            self.add_fixed(code);
        }
    }

    /// Idempotent insertion of a fixed or string type.
    pub fn add_fixed(&mut self, code: FixedCode) {
        let type_id = TypeId32::from_fixed_code(code as u8);
        if self.fixed.contains_key(&type_id) {
            return;
        }
        self.fixed.insert(
            type_id,
            FixedTypeEntry {
                type_id,
                name: fixed_name(code),
                description: fixed_description(code),
                size: fixed_size(code),
            },
        );
        self.fixed_order.push(type_id);
    }

    /// Idempotent insertion of a UDT by id; the first insertion wins.
    pub fn add_udt(&mut self, entry: &WireUdtEntry) -> TypeId32 {
        let type_id = TypeId32::from_udt_id(entry.udt_id);
        if self.udts.contains_key(&type_id) {
            return type_id;
        }

        let name = self.arena.push(&entry.name);
        let fields = entry
            .fields
            .iter()
            .map(|f| UdtFieldEntry {
                type_id: f.type_code.data_type_id(),
                offset: f.offset,
                array_count: f.array_count,
                bit_number: f.bit_number,
                field_name: self.arena.push(&f.name),
                data_type_name: NameRef::EMPTY,
            })
            .collect();

        self.udts.insert(
            type_id,
            UdtTypeEntry {
                type_id,
                size: entry.total_size,
                name,
                fields,
            },
        );
        self.udt_order.push(type_id);
        type_id
    }

    /// The canonical name for `type_id`; unrecognized UDT ids resolve to the
    /// `"UDT"` placeholder so display paths never crash.
    #[must_use]
    pub fn lookup_name(&self, type_id: TypeId32) -> &str {
        if let Some(entry) = self.fixed.get(&type_id) {
            return entry.name;
        }
        if let Some(udt) = self.udts.get(&type_id) {
            return self.arena.get(udt.name);
        }
        UDT_PLACEHOLDER
    }

    #[must_use]
    pub fn fixed_types(&self) -> impl Iterator<Item = &FixedTypeEntry> {
        self.fixed_order.iter().map(move |id| &self.fixed[id])
    }

    #[must_use]
    pub fn udt_types(&self) -> impl Iterator<Item = &UdtTypeEntry> {
        self.udt_order.iter().map(move |id| &self.udts[id])
    }

    /// Borrowed, name-resolved views of every registered fixed/string type,
    /// in insertion order.
    #[must_use]
    pub fn data_type_views(&self) -> impl Iterator<Item = DataTypeView<'_>> {
        self.fixed_types().map(|entry| DataTypeView { entry })
    }

    /// Borrowed, name-resolved views of every registered UDT, in discovery
    /// order.
    #[must_use]
    pub fn udt_type_views(&self) -> impl Iterator<Item = UdtTypeView<'_>> {
        self.udt_order.iter().map(move |id| UdtTypeView {
            registry: self,
            entry: &self.udts[id],
        })
    }

    #[must_use]
    pub fn udt_name(&self, udt: &UdtTypeEntry) -> &str {
        self.arena.get(udt.name)
    }

    #[must_use]
    pub fn field_name(&self, field: &UdtFieldEntry) -> &str {
        self.arena.get(field.field_name)
    }

    #[must_use]
    pub fn field_data_type_name(&self, field: &UdtFieldEntry) -> &str {
        self.arena.get(field.data_type_name)
    }

    #[must_use]
    pub fn contains_udt(&self, type_id: TypeId32) -> bool {
        self.udts.contains_key(&type_id)
    }

    /// Walks every registered UDT field and resolves its `data_type_name`
    /// from the (by-now fully populated) registry.
    /// Two-phase: resolve immutably first, then apply, since a single pass
    /// cannot borrow `self` both to look up names and to write them.
    pub fn resolve_field_type_names(&mut self) {
        let mut resolved: Vec<(TypeId32, usize, String)> = Vec::new();
        for &udt_id in &self.udt_order {
            let udt = &self.udts[&udt_id];
            for (i, f) in udt.fields.iter().enumerate() {
                resolved.push((udt_id, i, self.lookup_name(f.type_id).to_string()));
            }
        }

        for (udt_id, field_idx, name) in resolved {
            let name_ref = self.arena.push(&name);
            self.udts.get_mut(&udt_id).unwrap().fields[field_idx].data_type_name = name_ref;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::UdtField as WireUdtField;

    #[test]
    fn add_fixed_is_idempotent() {
        let mut reg = TypeRegistry::new();
        reg.add_fixed(FixedCode::Bool);
        reg.add_fixed(FixedCode::Bool);
        assert_eq!(reg.fixed_types().count(), 1);
    }

    #[test]
    fn add_udt_first_insertion_wins() {
        let mut reg = TypeRegistry::new();
        let first = WireUdtEntry {
            udt_id: 1,
            total_size: 4,
            fields: vec![],
            name: "First".to_string(),
        };
        let second = WireUdtEntry {
            udt_id: 1,
            total_size: 999,
            fields: vec![],
            name: "Second".to_string(),
        };
        reg.add_udt(&first);
        reg.add_udt(&second);
        assert_eq!(reg.udt_types().count(), 1);
        let udt = reg.udt_types().next().unwrap();
        assert_eq!(reg.udt_name(udt), "First");
        assert_eq!(udt.size, 4);
    }

    #[test]
    fn lookup_name_falls_back_to_udt_placeholder() {
        let reg = TypeRegistry::new();
        assert_eq!(reg.lookup_name(TypeId32::from_udt_id(42)), "UDT");
    }

    #[test]
    fn resolve_field_type_names_backfills_after_discovery() {
        let mut reg = TypeRegistry::new();
        reg.populate_fixed_types();
        reg.add_udt(&WireUdtEntry {
            udt_id: 1,
            total_size: 8,
            fields: vec![
                WireUdtField {
                    type_code: crate::codec::TypeCode16::new(0x00CA),
                    offset: 0,
                    array_count: 1,
                    bit_number: -1,
                    name: "Flow".to_string(),
                },
                WireUdtField {
                    type_code: crate::codec::TypeCode16::new(0x00C1),
                    offset: 4,
                    array_count: 1,
                    bit_number: 0,
                    name: "Running".to_string(),
                },
            ],
            name: "PumpUdt".to_string(),
        });

        reg.resolve_field_type_names();

        let udt = reg.udt_types().next().unwrap();
        assert_eq!(reg.field_data_type_name(&udt.fields[0]), "REAL");
        assert_eq!(reg.field_data_type_name(&udt.fields[1]), "BOOL");
    }

    #[test]
    fn tag_type_kind_classifies_udt_string_numeric_and_misc() {
        assert_eq!(tag_type_kind(TypeId32::from_udt_id(1)), TagType::Udt);
        assert_eq!(tag_type_kind(TypeId32::from_fixed_code(0xC1)), TagType::Bool);
        assert_eq!(tag_type_kind(TypeId32::from_fixed_code(0xCB)), TagType::Lreal);
        assert_eq!(tag_type_kind(TypeId32::from_fixed_code(0xD0)), TagType::String);
        assert_eq!(tag_type_kind(TypeId32::from_fixed_code(0xCC)), TagType::Misc);
        assert_eq!(tag_type_kind(TypeId32::UNKNOWN), TagType::Misc);
    }
}
