//! Bit-packed wire type codes and the 32-bit type-id space derived from them.
//!
//! The controller reports every tag's and every UDT field's type as a 16-bit
//! code. [`TypeCode16`] wraps that code with named
//! accessors instead of inline bit-twiddling. [`TypeId32`] is the library's
//! own flat identifier space: it unifies fixed (atomic) types, UDTs, and the
//! two sentinel ids into 32 bits so that a single `HashMap` can serve as the
//! type registry (see [`crate::registry`]).

bitflags::bitflags! {
    /// The single-bit flags packed into a 16-bit wire type code.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Flags: u16 {
        const IS_STRUCT      = 0x8000;
        const IS_SYSTEM       = 0x1000;
        const FIELD_IS_ARRAY = 0x2000;
    }
}

const TAG_DIM_MASK: u16 = 0x6000;
const UDT_ID_MASK: u16 = 0x0FFF;
const FIXED_CODE_MASK: u16 = 0x00FF;
const FIXED_CODE_MIN: u8 = 0xC1;
const FIXED_CODE_MAX: u8 = 0xDE;

/// `BOOL`'s fixed code; a field is a bit field when its low byte equals this,
/// per `original_source/src/plcscan/plcscan.cpp::id16::is_bit_field`.
const BOOL_FIXED_CODE: u8 = 0xC1;

/// A controller-reported 16-bit type code, as it appears in a tag-listing
/// entry or a UDT field descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeCode16(u16);

impl TypeCode16 {
    #[must_use]
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    fn flags(self) -> Flags {
        Flags::from_bits_truncate(self.0)
    }

    #[must_use]
    pub fn is_struct(self) -> bool {
        self.flags().contains(Flags::IS_STRUCT)
    }

    #[must_use]
    pub fn is_system(self) -> bool {
        self.flags().contains(Flags::IS_SYSTEM)
    }

    /// Whether bit 13 is set. Interpreted as "this UDT field is an array"
    /// when decoding a field descriptor; the same bit participates in
    /// [`Self::tag_dimensions`] when decoding a top-level tag entry.
    #[must_use]
    pub fn is_array_field(self) -> bool {
        self.flags().contains(Flags::FIELD_IS_ARRAY)
    }

    /// A field is a bit field when it is not an array field and its fixed
    /// code is `BOOL` (0xC1). See `original_source`'s `id16::is_bit_field`.
    #[must_use]
    pub fn is_bit_field(self) -> bool {
        !self.is_array_field() && self.fixed_code() == BOOL_FIXED_CODE
    }

    /// Number of array dimensions (0..=3) for a top-level tag entry.
    #[must_use]
    pub fn tag_dimensions(self) -> u8 {
        ((self.0 & TAG_DIM_MASK) >> 13) as u8
    }

    /// The UDT id packed into bits 0-11, valid only when [`Self::is_struct`].
    /// Returns 0 when the code does not describe a struct.
    #[must_use]
    pub fn udt_id(self) -> u16 {
        if self.is_struct() {
            self.0 & UDT_ID_MASK
        } else {
            0
        }
    }

    /// The fixed type code packed into bits 0-7, regardless of validity.
    /// Callers should check [`Self::is_struct`]/[`Self::is_system`] first;
    /// use [`Self::data_type_id`] for the validated mapping.
    #[must_use]
    pub fn fixed_code(self) -> u8 {
        (self.0 & FIXED_CODE_MASK) as u8
    }

    /// Maps this wire code into the library's 32-bit type-id space: the
    /// system bit dominates the struct bit; a struct with udt id 0 and a
    /// fixed code outside `[0xC1, 0xDE]` both map to [`TypeId32::UNKNOWN`].
    #[must_use]
    pub fn data_type_id(self) -> TypeId32 {
        if self.is_system() {
            return TypeId32::UNKNOWN;
        }

        if self.is_struct() {
            let id = self.udt_id();
            return if id == 0 {
                TypeId32::UNKNOWN
            } else {
                TypeId32::from_udt_id(id)
            };
        }

        let fixed = self.fixed_code();
        if (FIXED_CODE_MIN..=FIXED_CODE_MAX).contains(&fixed) {
            TypeId32::from_fixed_code(fixed)
        } else {
            TypeId32::UNKNOWN
        }
    }
}

const UDT_ID_BITS_MASK: u32 = 0x000F_FF00;
const FIXED_ID_BITS_MASK: u32 = 0x0000_00FF;
const SENTINEL_BITS_MASK: u32 = 0xFFF0_0000;

/// The library's flat 32-bit type identifier, unifying fixed types, UDTs,
/// and the `UNKNOWN`/`SYSTEM` sentinels in disjoint bit ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId32(u32);

impl TypeId32 {
    /// The controller reported a system or otherwise unresolvable type.
    pub const UNKNOWN: TypeId32 = TypeId32(0x0010_0000);
    /// Reserved for future use; never produced by [`TypeCode16::data_type_id`].
    pub const SYSTEM: TypeId32 = TypeId32(0x0020_0000);

    #[must_use]
    pub const fn from_fixed_code(code: u8) -> Self {
        TypeId32(code as u32)
    }

    /// Shifts the 12-bit controller UDT id left by 8 so it can never
    /// collide with a fixed code.
    #[must_use]
    pub const fn from_udt_id(udt_id: u16) -> Self {
        TypeId32(((udt_id & 0x0FFF) as u32) << 8)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn is_fixed(self) -> bool {
        let fixed = self.0 & FIXED_ID_BITS_MASK;
        fixed != 0 && self.0 & UDT_ID_BITS_MASK == 0 && self.0 & SENTINEL_BITS_MASK == 0
    }

    #[must_use]
    pub fn is_udt(self) -> bool {
        self.0 & UDT_ID_BITS_MASK != 0
            && self.0 & SENTINEL_BITS_MASK == 0
            && self.0 & FIXED_ID_BITS_MASK == 0
    }

    #[must_use]
    pub fn is_sentinel(self) -> bool {
        self == Self::UNKNOWN || self == Self::SYSTEM
    }

    /// The controller's 12-bit UDT id, if this id is a UDT id.
    #[must_use]
    pub fn udt_id(self) -> Option<u16> {
        self.is_udt().then(|| ((self.0 & UDT_ID_BITS_MASK) >> 8) as u16)
    }

    /// The controller's 8-bit fixed type code, if this id is a fixed id.
    #[must_use]
    pub fn fixed_code(self) -> Option<u8> {
        self.is_fixed().then_some((self.0 & FIXED_ID_BITS_MASK) as u8)
    }
}
