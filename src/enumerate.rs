//! The enumeration driver: drives the wire decoders and the type registry
//! to populate tag memory before scanning begins.
//!
//! Grounded on `original_source/src/plcscan/plcscan.cpp`'s
//! `enumerate_tags`/`create_tags`/`connect_tags`. The UDT worklist here is
//! an explicit `VecDeque`, matching the source's own `std::vector<u16>
//! udt_ids` that is appended to while being iterated by index — this crate
//! just makes the "append while draining" shape an explicit loop instead of
//! growing a vector under an index cursor.

use std::collections::{HashSet, VecDeque};

use tracing::{debug, warn};

use crate::codec::TypeId32;
use crate::config::ConnectOptions;
use crate::error::ConnectError;
use crate::memory::{OffsetCursor, TagMemory};
use crate::registry::TypeRegistry;
use crate::tag::TagRecord;
use crate::transport::{Transport, TransportAdapter};
use crate::wire::{self, TagEntry};

/// Everything [`crate::connect`] needs to populate a freshly [`crate::init`]'d
/// `TagData` before per-tag connections are opened (opening those
/// connections is left to [`crate::connect`] itself, since it needs the
/// transport adapter and the memory's connection table at the same time).
pub struct Enumeration {
    pub tags: Vec<TagRecord>,
    pub memory: TagMemory,
}

/// Reads `@tags`, sizes and populates tag memory, transitively discovers
/// every UDT referenced (directly or through nested fields), and backfills
/// every `data_type_name`.
pub fn enumerate(
    transport: &dyn Transport,
    adapter: &TransportAdapter,
    registry: &mut TypeRegistry,
    options: &ConnectOptions,
) -> Result<Enumeration, ConnectError> {
    let tags_buf = adapter
        .scan_to_buffer(transport, "@tags")
        .map_err(ConnectError::TagsUnreadable)?;

    let listing = wire::parse_tag_listing(&tags_buf);
    if listing.truncated {
        warn!(entries = listing.entries.len(), "@tags response was truncated mid-record");
    }

    let admitted: Vec<TagEntry> = listing
        .entries
        .into_iter()
        .filter(|e| options.include_system_tags || !e.is_system_pseudo_tag())
        .collect();
    debug!(count = admitted.len(), "admitted tag entries");

    let (mut tags, mut memory) = allocate_tags(&admitted)?;

    discover_udts(transport, adapter, registry, &admitted);

    registry.resolve_field_type_names();

    for tag in &mut tags {
        let name = registry.lookup_name(tag.type_id).to_string();
        tag.data_type_name = memory.push_name(&name);
    }

    Ok(Enumeration { tags, memory })
}

/// Sizes and allocates tag memory for the admitted list, then populates one
/// [`TagRecord`] per entry in order (source's `create_tags`/`add_tag`).
fn allocate_tags(entries: &[TagEntry]) -> Result<(Vec<TagRecord>, TagMemory), ConnectError> {
    let mut total: u32 = 0;
    for e in entries {
        total = total
            .checked_add(e.total_value_bytes())
            .ok_or(ConnectError::AllocationFailed)?;
    }

    let mut memory = TagMemory::new(total, entries.len());
    let mut cursor = OffsetCursor::new();
    let mut tags = Vec::with_capacity(entries.len());

    for entry in entries {
        let offset = cursor.push(entry.total_value_bytes());
        let name = memory.push_name(&entry.name);

        tags.push(TagRecord {
            instance_id: entry.instance_id,
            type_id: entry.type_code.data_type_id(),
            array_count: entry.element_count(),
            element_length: entry.element_length,
            offset,
            name,
            // Placeholder until the registry-wide backfill pass below runs;
            // every tag's `data_type_name` starts empty.
            data_type_name: name,
        });
    }

    debug_assert_eq!(cursor.total(), total);

    Ok((tags, memory))
}

/// Worklist-driven transitive UDT discovery. Never recurses: a UDT field
/// referencing an id not yet seen is appended to the same worklist the
/// top-level tags seeded.
fn discover_udts(
    transport: &dyn Transport,
    adapter: &TransportAdapter,
    registry: &mut TypeRegistry,
    admitted: &[TagEntry],
) {
    let mut worklist: VecDeque<u16> = VecDeque::new();
    let mut queued: HashSet<u16> = HashSet::new();

    let mut enqueue = |id: u16, worklist: &mut VecDeque<u16>, queued: &mut HashSet<u16>| {
        if id != 0 && queued.insert(id) {
            worklist.push_back(id);
        }
    };

    for entry in admitted {
        if entry.type_code.is_struct() {
            enqueue(entry.type_code.udt_id(), &mut worklist, &mut queued);
        }
    }

    while let Some(udt_id) = worklist.pop_front() {
        if registry.contains_udt(TypeId32::from_udt_id(udt_id)) {
            continue;
        }

        let buf = match adapter.scan_to_buffer(transport, &format!("@udt/{udt_id}")) {
            Ok(buf) => buf,
            Err(e) => {
                warn!(udt_id, error = %e, "could not read @udt/<n>; tags of this type keep the UDT placeholder");
                continue;
            }
        };

        let entry = match wire::parse_udt_entry(&buf) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(udt_id, error = %e, "could not parse @udt/<n> response");
                continue;
            }
        };

        for field in &entry.fields {
            if field.type_code.is_struct() {
                enqueue(field.type_code.udt_id(), &mut worklist, &mut queued);
            }
        }

        registry.add_udt(&entry);
    }
}
