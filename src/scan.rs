//! The scan loop and its concurrency contract.
//!
//! Grounded on `original_source/src/plcscan/plcscan.cpp`'s `scan`/`scan_tags`/
//! `copy_tags`: one worker thread per cycle performs the per-handle reads in
//! two passes (`plc_tag_read` for every connected tag, then
//! `plc_tag_get_raw_bytes` for every tag that read cleanly) while the main
//! thread copies the previous cycle's read half into the public region and
//! runs the caller's callback, then joins the worker and flips. This crate
//! expresses the "thread pair per cycle" as a single [`std::thread::scope`]
//! spawn instead of a raw `std::thread::spawn` + `join`, so the worker's
//! borrows of `write_half`/`connections` are checked against the main
//! thread's borrows of `read_half`/`public` at compile time.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::ScanOptions;
use crate::memory::{CycleParts, TagConnState};
use crate::registry::TypeRegistry;
use crate::tag::{TagRecord, TagStatus};
use crate::transport::{Transport, TransportAdapter};

/// The read-only state a scan callback is given each cycle. Deliberately
/// narrower than `&TagData`: at the point the callback runs, `TagData`'s
/// memory is still split between this cycle's worker thread (`write_half`,
/// `connections`) and the main thread (`read_half`, `public`), so handing
/// out a borrow of the whole `TagData` would either alias the worker's
/// mutable slices or force the callback to wait for `join` — defeating the
/// concurrency this crate relies on. Everything reachable from here is
/// either immutable for the cycle's duration (`registry`, `tags`) or
/// exclusively owned by the main thread right now (`public`, `status`).
pub struct ScanSnapshot<'a> {
    pub registry: &'a TypeRegistry,
    pub tags: &'a [TagRecord],
    pub public: &'a [u8],
    pub status: &'a [TagStatus],
}

/// Runs one scan cycle: reads every connected tag into the write half
/// (concurrently copying the previous cycle's read half into `public` and
/// invoking `callback`), then returns once the worker has joined. Does not
/// flip or sleep; the caller does that (see [`crate::scan`]).
pub fn run_cycle<F: FnMut(ScanSnapshot<'_>)>(
    transport: &dyn Transport,
    adapter: &TransportAdapter,
    registry: &TypeRegistry,
    tags: &[TagRecord],
    parts: CycleParts<'_>,
    prev_status: &[TagStatus],
    mut callback: F,
) {
    let CycleParts { write_half, read_half, public, connections } = parts;

    std::thread::scope(|scope| {
        scope.spawn(|| scan_connected_tags(transport, adapter, tags, write_half, connections));

        public.copy_from_slice(read_half);
        callback(ScanSnapshot { registry, tags, public, status: prev_status });
    });
}

/// The worker's two passes over every tag's connection: `read()` for every
/// connected tag, then `get_raw_bytes` for every tag whose read succeeded.
/// A tag whose read or fetch fails is left with `last_scan_ok = false` and
/// keeps its previous bytes in `write_half` untouched — the next cycle
/// starts the same pass over again.
fn scan_connected_tags(
    transport: &dyn Transport,
    adapter: &TransportAdapter,
    tags: &[TagRecord],
    write_half: &mut [u8],
    connections: &mut [TagConnState],
) {
    for conn in connections.iter_mut() {
        conn.last_scan_ok = match conn.handle {
            Some(handle) => transport.read(handle, adapter.request_timeout_ms).is_ok(),
            None => false,
        };
    }

    for (tag, conn) in tags.iter().zip(connections.iter_mut()) {
        let Some(handle) = conn.handle else { continue };
        if !conn.last_scan_ok {
            continue;
        }

        let dst = &mut write_half[tag.offset.range()];
        conn.last_scan_ok = transport.get_raw_bytes(handle, 0, dst).is_ok();
    }
}

/// Sleeps so the cycle that started at `cycle_start` totals `target_period`,
/// or returns immediately if the cycle already ran over.
pub fn pace_cycle(cycle_start: Instant, options: &ScanOptions) {
    let elapsed = cycle_start.elapsed();
    if let Some(remaining) = options.target_period.checked_sub(elapsed) {
        if remaining > Duration::ZERO {
            std::thread::sleep(remaining);
        }
    } else {
        debug!(?elapsed, target = ?options.target_period, "scan cycle exceeded target period");
    }
}
