//! Tag discovery, UDT resolution, and periodic scanning for ControlLogix-
//! class Allen-Bradley PLCs over EtherNet/IP.
//!
//! This crate is the core of a client library: given an injected
//! [`Transport`] (the EtherNet/IP wire protocol itself is out of scope — see
//! the module docs on [`transport`]), it discovers which tags and
//! user-defined types (UDTs) a controller exposes, opens a per-tag read
//! connection, and runs a fixed-period scan loop that republishes a
//! consistent snapshot of every tag's bytes between cycles.
//!
//! The call sequence an embedding application follows is [`init`] →
//! [`connect`] → repeated [`scan`] → [`shutdown`].

pub mod codec;
pub mod config;
mod enumerate;
pub mod error;
pub mod memory;
mod scan;
pub mod registry;
pub mod tag;
pub mod transport;
pub mod wire;

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info};

use crate::config::{ConnectOptions, ScanOptions};
use crate::enumerate::Enumeration;
use crate::error::ConnectError;
use crate::memory::TagMemory;
use crate::registry::{DataTypeView, TypeRegistry, UdtTypeView};
use crate::scan::ScanSnapshot;
use crate::tag::{TagStatus, TagView};
use crate::transport::{Transport, TransportAdapter};

pub use crate::codec::TypeId32;
pub use crate::registry::tag_type_kind as get_tag_type;
pub use crate::registry::TagType;
pub use crate::scan::ScanSnapshot as Snapshot;
pub use crate::tag::TagView as Tag;
pub use crate::transport::TagHandle;

/// The library's owned state: the type registry, every discovered tag and
/// its memory, and (once [`connect`] succeeds) the transport and attribute
/// adapter used to keep scanning it.
///
/// Every borrow handed out by [`TagData::tags`], [`TagData::data_types`],
/// and [`TagData::udt_types`] is valid for as long as the borrow of
/// `TagData` that produced it — callers must not retain them past
/// [`shutdown`].
pub struct TagData {
    registry: TypeRegistry,
    tags: Vec<tag::TagRecord>,
    memory: TagMemory,
    transport: Option<Arc<dyn Transport>>,
    adapter: Option<TransportAdapter>,
    status: Vec<TagStatus>,
    /// `true` once [`init`] has populated the type registry.
    pub is_init: bool,
    /// `true` once [`connect`] has completed enumeration successfully.
    pub is_connected: bool,
}

impl TagData {
    /// Borrowed views of every tag discovered during [`connect`], in
    /// enumeration order.
    pub fn tags(&self) -> impl Iterator<Item = TagView<'_>> {
        let arena = self.memory.name_arena();
        let memory = &self.memory;
        self.tags.iter().map(move |record| TagView::new(record, arena, memory))
    }

    /// Per-tag connection/scan health from the most recently completed scan
    /// cycle, in the same order as [`TagData::tags`].
    #[must_use]
    pub fn tag_status(&self) -> &[TagStatus] {
        &self.status
    }

    /// Every fixed/string type in the registry, in insertion order.
    pub fn data_types(&self) -> impl Iterator<Item = DataTypeView<'_>> {
        self.registry.data_type_views()
    }

    /// Every UDT discovered during enumeration, in discovery order.
    pub fn udt_types(&self) -> impl Iterator<Item = UdtTypeView<'_>> {
        self.registry.udt_type_views()
    }
}

/// Allocates the type registry and populates it with every fixed/string
/// type. `TagData::is_init` is always `true` on return: unlike the
/// source's fixed-size C allocator, this crate's registry and buffers
/// grow through the global Rust allocator, whose failure mode is an abort
/// rather than a recoverable error (see `DESIGN.md`'s note on `init`'s
/// allocation-failure case).
#[must_use]
pub fn init() -> TagData {
    let mut registry = TypeRegistry::new();
    registry.populate_fixed_types();
    info!(fixed_types = registry.fixed_types().count(), "plcscan core initialized");

    TagData {
        registry,
        tags: Vec::new(),
        memory: TagMemory::new(0, 0),
        transport: None,
        adapter: None,
        status: Vec::new(),
        is_init: true,
        is_connected: false,
    }
}

/// Performs enumeration against `gateway`/`path` using `transport`: reads
/// `@tags`, sizes tag memory, transitively discovers every referenced
/// UDT, resolves every `data_type_name`, and opens a per-tag connection.
///
/// Returns [`ConnectError::NotInitialized`] if `data` was never
/// successfully [`init`]'d, [`ConnectError::TagsUnreadable`] if the
/// controller's `@tags` pseudo-tag could not be read, or
/// [`ConnectError::AllocationFailed`] if the admitted tag list's total
/// value size overflows a `u32`. A specific `@udt/<n>` failing to resolve
/// or a specific tag failing to connect is absorbed into registry/tag
/// state rather than failing `connect` as a whole — `connect` only fails
/// on the two conditions above.
pub fn connect(
    data: &mut TagData,
    transport: Arc<dyn Transport>,
    gateway: &str,
    path: &str,
    options: ConnectOptions,
) -> Result<(), ConnectError> {
    if !data.is_init {
        error!("connect called before a successful init");
        return Err(ConnectError::NotInitialized);
    }

    let mut adapter = TransportAdapter::new(gateway, path);
    adapter.connect_timeout_ms = options.connect_timeout_ms;
    adapter.request_timeout_ms = options.request_timeout_ms;

    let Enumeration { tags, mut memory } =
        enumerate::enumerate(transport.as_ref(), &adapter, &mut data.registry, &options).inspect_err(|e| {
            error!(error = %e, "connect failed during enumeration");
        })?;

    let names: Vec<String> = tags
        .iter()
        .map(|t| memory.name_arena().get(t.name).to_string())
        .collect();

    for ((tag, name), conn) in tags.iter().zip(names.iter()).zip(memory.connections_mut()) {
        let elem_size = u32::from(tag.element_length);
        match adapter.connect_tag(transport.as_ref(), name, elem_size, tag.array_count) {
            Ok(handle) => conn.handle = Some(handle),
            Err(e) => {
                tracing::warn!(tag = %name, error = %e, "tag connection failed; tag stays unconnected");
            }
        }
    }

    data.status = memory.connections().iter().copied().map(TagStatus::from).collect();
    data.tags = tags;
    data.memory = memory;
    data.transport = Some(transport);
    data.adapter = Some(adapter);
    data.is_connected = true;

    info!(tags = data.tags.len(), udts = data.registry.udt_types().count(), "connected");
    Ok(())
}

/// Runs the scan loop until `predicate` returns `false`. Each cycle reads
/// every connected tag's value into the write half, copies the previous
/// cycle's read half into the public region concurrently, invokes
/// `callback` with a [`Snapshot`] of that public region once the copy is
/// done, joins the cycle's worker, flips the read/write halves, and sleeps
/// to pace the cycle to `options.target_period`. A no-op if `data` was
/// never successfully [`connect`]'d.
pub fn scan<F, P>(data: &mut TagData, options: &ScanOptions, mut callback: F, mut predicate: P)
where
    F: FnMut(Snapshot<'_>),
    P: FnMut() -> bool,
{
    let (Some(transport), Some(adapter)) = (data.transport.clone(), data.adapter.clone()) else {
        return;
    };

    while predicate() {
        let cycle_start = Instant::now();
        let prev_status: Vec<TagStatus> =
            data.memory.connections().iter().copied().map(TagStatus::from).collect();

        {
            let registry = &data.registry;
            let tags = &data.tags;
            let parts = data.memory.cycle_parts();
            scan::run_cycle(transport.as_ref(), &adapter, registry, tags, parts, &prev_status, &mut callback);
        }

        data.status = data.memory.connections().iter().copied().map(TagStatus::from).collect();
        data.memory.flip();
        scan::pace_cycle(cycle_start, options);
    }
}

/// Releases every resource `data` owns and asks the transport to shut
/// down. Consuming `data` by value means the registry, tag memory, and
/// connection table are dropped here rather than needing an explicit free
/// function; `TagData`'s views cannot outlive this call because they
/// borrow from it.
pub fn shutdown(data: TagData) {
    if let Some(transport) = &data.transport {
        transport.shutdown();
    }
    info!("plcscan core shut down");
}
