//! The tag memory model: a double-buffered scan region, a parallel
//! public region, and the per-tag offset table that lets one thread refresh
//! values while another reads a stable snapshot.
//!
//! Grounded on `original_source/src/util/memory_buffer.hpp`'s
//! `ParallelBuffer<T>` (two heap allocations plus a `read_id` bit) and
//! `plcscan.cpp`'s `TagMemory`/`create_tags`/`add_tag`. The source names a
//! tag's slice with a raw-pointer `MemoryOffset`; this crate uses a
//! `(begin, len)` range instead, which is `Copy`, bounds-checkable, and
//! carries no lifetime, so it can be stored on a [`crate::tag::TagRecord`]
//! without borrowing the buffers it indexes into.
//!
//! [`TagMemory::connections`] mirrors the source's own
//! `TagMemory::connections: std::vector<TagConnection>` — per-tag handle
//! and scan-health bookkeeping lives here, separate from the immutable
//! [`crate::tag::TagRecord`] list, because the scan worker needs to mutate
//! it concurrently with the main thread publishing a snapshot. Keeping it
//! off `TagRecord` is what lets [`TagMemory::cycle_parts`] hand out a
//! `&mut` into connections and a `&mut` into the write half without ever
//! aliasing the `&[TagRecord]` the caller's callback reads from.

use crate::registry::{NameArena, NameRef};
use crate::transport::TagHandle;

/// A tag's slice within the scan halves and the public region: the same
/// `(begin, length)` pair names that tag's range in all three buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offset {
    pub begin: u32,
    pub len: u32,
}

impl Offset {
    #[must_use]
    pub fn range(self) -> std::ops::Range<usize> {
        let begin = self.begin as usize;
        begin..begin + self.len as usize
    }
}

/// Per-tag connection handle and scan health, updated only by the scan
/// worker.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagConnState {
    pub handle: Option<TagHandle>,
    pub last_scan_ok: bool,
}

impl TagConnState {
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.handle.is_some()
    }
}

/// The scan double-buffer, the public snapshot region, and per-tag
/// connection state. The three byte buffers are the same length, sized
/// once during enumeration and never resized afterward.
#[derive(Debug)]
pub struct TagMemory {
    scan: [Vec<u8>; 2],
    read_id: usize,
    public: Vec<u8>,
    /// Backs every tag name and every tag's resolved `data_type_name` as a
    /// view into it. Separate from [`crate::registry::TypeRegistry`]'s own
    /// arena, mirroring the source's `TagMemory::name_data` versus
    /// `DataTypeMemory::type_name_data` split.
    names: NameArena,
    connections: Vec<TagConnState>,
}

impl TagMemory {
    /// Allocates and zero-fills both scan halves and the public region at
    /// `total_value_bytes` each, and one [`TagConnState`] per tag.
    #[must_use]
    pub fn new(total_value_bytes: u32, tag_count: usize) -> Self {
        let len = total_value_bytes as usize;
        Self {
            scan: [vec![0u8; len], vec![0u8; len]],
            read_id: 0,
            public: vec![0u8; len],
            names: NameArena::new(),
            connections: vec![TagConnState::default(); tag_count],
        }
    }

    pub fn push_name(&mut self, s: &str) -> NameRef {
        self.names.push(s)
    }

    #[must_use]
    pub fn name_arena(&self) -> &NameArena {
        &self.names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.public.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.public.is_empty()
    }

    #[must_use]
    pub fn connections(&self) -> &[TagConnState] {
        &self.connections
    }

    pub fn connections_mut(&mut self) -> &mut [TagConnState] {
        &mut self.connections
    }

    /// The slice of the write half at `offset`. Used outside a scan cycle
    /// only (e.g. tests); [`Self::cycle_parts`] is the entry point the scan
    /// loop itself uses.
    pub fn write_view(&mut self, offset: Offset) -> &mut [u8] {
        let write_id = 1 - self.read_id;
        &mut self.scan[write_id][offset.range()]
    }

    /// The half selected by `read_id`: the values from the most recently
    /// completed cycle.
    #[must_use]
    pub fn read_view(&self, offset: Offset) -> &[u8] {
        &self.scan[self.read_id][offset.range()]
    }

    /// The public region's slice at `offset`; every exposed `Tag::bytes`
    /// view points here.
    #[must_use]
    pub fn public_view(&self, offset: Offset) -> &[u8] {
        &self.public[offset.range()]
    }

    /// Splits the memory model into the four independent pieces a scan
    /// cycle touches: the worker thread
    /// gets exclusive access to `write_half` and `connections`; the main
    /// thread keeps `read_half` (shared) and `public` (exclusive) to copy
    /// the snapshot forward. Because each piece borrows a distinct field
    /// of `self`, the borrow checker accepts all four simultaneously even
    /// though they are handed to two different threads.
    pub fn cycle_parts(&mut self) -> CycleParts<'_> {
        let write_id = 1 - self.read_id;
        let (first, second) = self.scan.split_at_mut(1);
        let (write_half, read_half): (&mut [u8], &[u8]) = if write_id == 0 {
            (first[0].as_mut_slice(), second[0].as_slice())
        } else {
            (second[0].as_mut_slice(), first[0].as_slice())
        };

        CycleParts {
            write_half,
            read_half,
            public: self.public.as_mut_slice(),
            connections: self.connections.as_mut_slice(),
        }
    }

    /// Toggles `read_id`. The sole synchronization point of the scan cycle;
    /// callers must only flip after the cycle's worker has joined and the
    /// public-region copy has completed.
    pub fn flip(&mut self) {
        self.read_id = 1 - self.read_id;
    }
}

/// The four pieces of a [`TagMemory`] a single scan cycle needs, split so
/// the worker and main threads each hold disjoint borrows.
pub struct CycleParts<'a> {
    pub write_half: &'a mut [u8],
    pub read_half: &'a [u8],
    pub public: &'a mut [u8],
    pub connections: &'a mut [TagConnState],
}

/// Hands out disjoint, in-order [`Offset`]s while sizing the scan/public
/// buffers for `total_value_bytes`, advancing a shared cursor as each tag
/// is allocated in turn.
#[derive(Debug, Default)]
pub struct OffsetCursor {
    next: u32,
}

impl OffsetCursor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the cursor by `len` bytes and returns the offset it was
    /// sitting at. Every offset returned lies within `[0, total)` as long
    /// as the total used to size the buffers equals the sum of every `len`
    /// passed here.
    pub fn push(&mut self, len: u32) -> Offset {
        let begin = self.next;
        self.next += len;
        Offset { begin, len }
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_are_disjoint_and_cover_the_buffer() {
        let mut cursor = OffsetCursor::new();
        let a = cursor.push(4);
        let b = cursor.push(10);
        let c = cursor.push(2);
        assert_eq!(a.range(), 0..4);
        assert_eq!(b.range(), 4..14);
        assert_eq!(c.range(), 14..16);
        assert_eq!(cursor.total(), 16);
    }

    #[test]
    fn write_view_and_read_view_address_opposite_halves() {
        let mut mem = TagMemory::new(8, 0);
        let offset = Offset { begin: 0, len: 4 };

        mem.write_view(offset).copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(mem.read_view(offset), &[0, 0, 0, 0]);

        mem.flip();
        assert_eq!(mem.read_view(offset), &[1, 2, 3, 4]);
    }

    #[test]
    fn cycle_parts_write_half_is_disjoint_from_read_half() {
        let mut mem = TagMemory::new(4, 1);
        let offset = Offset { begin: 0, len: 4 };
        {
            let parts = mem.cycle_parts();
            parts.write_half[offset.range()].copy_from_slice(&[9, 9, 9, 9]);
            assert_eq!(&parts.read_half[offset.range()], &[0, 0, 0, 0]);
            parts.public.copy_from_slice(parts.read_half);
        }
        assert_eq!(mem.public_view(offset), &[0, 0, 0, 0]);

        mem.flip();
        assert_eq!(mem.read_view(offset), &[9, 9, 9, 9]);
    }

    #[test]
    fn zero_filled_on_construction() {
        let mem = TagMemory::new(6, 2);
        assert_eq!(mem.public_view(Offset { begin: 0, len: 6 }), &[0u8; 6]);
        assert_eq!(mem.connections().len(), 2);
        assert!(!mem.connections()[0].is_connected());
    }
}
