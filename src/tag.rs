//! The public [`TagRecord`] and the borrowed [`TagView`] exposed to callers.
//!
//! The source represents `tag_name`/`data_type_name`/`bytes` as raw-pointer
//! `MemoryView`s living directly on `plcscan::Tag`. Rust's aliasing rules
//! make that shape awkward (a `Tag` holding `&str`/`&[u8]` borrowed from its
//! own owning [`crate::TagData`] is self-referential). Instead `TagRecord`
//! stores arena/buffer-relative coordinates (a [`NameRef`], an [`Offset`]),
//! and [`TagView`] borrows `TagData`'s arena and memory to resolve them on
//! demand — the same "stable view into an owned buffer" contract, expressed
//! without unsafe code.
//!
//! `TagRecord` itself holds nothing the scan worker mutates: connection
//! handles and per-cycle scan health live in
//! [`crate::memory::TagMemory::connections`] instead, so the scan loop can
//! hand the worker thread a `&mut` into that table while the main thread
//! still holds `&[TagRecord]` to build the caller's snapshot (see
//! `memory.rs`'s module doc).

use crate::codec::TypeId32;
use crate::memory::{Offset, TagConnState, TagMemory};
use crate::registry::{NameArena, NameRef};

/// Per-tag connection/scan health as exposed to callers, grounded on the
/// source's `TagConnection::scan_ok`/`is_connected()` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TagStatus {
    /// Whether [`crate::transport::TransportAdapter::connect_tag`] succeeded
    /// for this tag.
    pub connected: bool,
    /// Whether the most recent scan cycle refreshed this tag's bytes. A
    /// `false` here means the public bytes are still those from the last
    /// cycle that succeeded.
    pub last_scan_ok: bool,
}

impl From<TagConnState> for TagStatus {
    fn from(conn: TagConnState) -> Self {
        Self {
            connected: conn.is_connected(),
            last_scan_ok: conn.last_scan_ok,
        }
    }
}

/// One tag discovered during enumeration. Immutable once enumeration
/// finishes; see the module doc for why
/// connection state lives elsewhere.
#[derive(Debug)]
pub struct TagRecord {
    pub instance_id: u32,
    pub type_id: TypeId32,
    pub array_count: u32,
    pub element_length: u16,
    pub offset: Offset,
    pub(crate) name: NameRef,
    pub(crate) data_type_name: NameRef,
}

impl TagRecord {
    #[must_use]
    pub fn total_value_bytes(&self) -> u32 {
        self.array_count * u32::from(self.element_length)
    }
}

/// A borrowed, read-only view of one [`TagRecord`] resolved against its
/// owning [`crate::TagData`]'s name arena and tag memory. Valid for as long
/// as the borrow of `TagData` that produced it.
#[derive(Debug, Clone, Copy)]
pub struct TagView<'a> {
    record: &'a TagRecord,
    arena: &'a NameArena,
    memory: &'a TagMemory,
}

impl<'a> TagView<'a> {
    pub(crate) fn new(record: &'a TagRecord, arena: &'a NameArena, memory: &'a TagMemory) -> Self {
        Self { record, arena, memory }
    }

    #[must_use]
    pub fn type_id(&self) -> TypeId32 {
        self.record.type_id
    }

    #[must_use]
    pub fn array_count(&self) -> u32 {
        self.record.array_count
    }

    #[must_use]
    pub fn tag_name(&self) -> &'a str {
        self.arena.get(self.record.name)
    }

    /// Empty until UDT discovery completes and the enumeration driver's
    /// backfill pass has run for tags.
    #[must_use]
    pub fn data_type_name(&self) -> &'a str {
        self.arena.get(self.record.data_type_name)
    }

    /// `bytes.length == array_count * element_size(type_id)`.
    #[must_use]
    pub fn bytes(&self) -> &'a [u8] {
        self.memory.public_view(self.record.offset)
    }
}
