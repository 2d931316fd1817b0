//! The transport adapter: builds EtherNet/IP attribute strings and moves
//! bytes to/from the injected [`Transport`] implementation. This module
//! never interprets the bytes it moves — decoding lives in [`crate::wire`].
//!
//! The underlying EtherNet/IP transport library itself (`libplctag` in
//! `original_source/`) is out of scope: this crate only depends on the four
//! operations it actually calls, expressed as the [`Transport`] trait so a
//! real transport can be plugged in by the embedding application and a fake
//! one by tests.

use crate::error::TransportError;

/// An opaque transport-library connection handle.
pub type TagHandle = i32;

/// The contract this crate needs from an EtherNet/IP transport library:
/// `create`/`read`/`get_size`/`get_raw_bytes`/`shutdown`.
pub trait Transport: Send + Sync {
    /// Opens a connection described by an attribute string and returns a
    /// handle.
    fn create(&self, attr_string: &str, timeout_ms: u32) -> Result<TagHandle, TransportError>;

    /// Requests a fresh read of `handle`'s value from the controller.
    fn read(&self, handle: TagHandle, timeout_ms: u32) -> Result<(), TransportError>;

    /// The byte size of `handle`'s last-read value.
    fn get_size(&self, handle: TagHandle) -> Result<u32, TransportError>;

    /// Copies `dst.len()` bytes starting at `offset` out of `handle`'s
    /// last-read value.
    fn get_raw_bytes(&self, handle: TagHandle, offset: u32, dst: &mut [u8]) -> Result<(), TransportError>;

    /// Releases every resource the transport library holds.
    fn shutdown(&self);
}

const DEFAULT_TIMEOUT_MS: u32 = 100;

/// Builds attribute strings for a specific controller and owns the
/// per-operation timeouts (mirrors `ConnectOptions`'s timeout fields).
#[derive(Debug, Clone)]
pub struct TransportAdapter {
    gateway: String,
    path: String,
    pub connect_timeout_ms: u32,
    pub request_timeout_ms: u32,
}

impl TransportAdapter {
    #[must_use]
    pub fn new(gateway: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            gateway: gateway.into(),
            path: path.into(),
            connect_timeout_ms: DEFAULT_TIMEOUT_MS,
            request_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// `protocol=ab-eip&plc=controllogix&gateway=<ip>&path=<path>&name=<tag>&elem_size=<n>&elem_count=<m>`.
    ///
    /// The source rewrites one fixed-capacity scratch buffer per call to
    /// avoid a heap allocation; this only runs once per tag at connect time
    /// (never inside the per-cycle scan loop), so a plain owned `String` is
    /// the idiomatic trade here (see `DESIGN.md`).
    #[must_use]
    pub fn attr_string(&self, tag_name: &str, elem_size: u32, elem_count: u32) -> String {
        format!(
            "protocol=ab-eip&plc=controllogix&gateway={}&path={}&name={}&elem_size={}&elem_count={}",
            self.gateway, self.path, tag_name, elem_size, elem_count
        )
    }

    /// Opens a per-tag connection and returns its handle.
    pub fn connect_tag(
        &self,
        transport: &dyn Transport,
        tag_name: &str,
        elem_size: u32,
        elem_count: u32,
    ) -> Result<TagHandle, TransportError> {
        let attr = self.attr_string(tag_name, elem_size, elem_count);
        transport.create(&attr, self.connect_timeout_ms)
    }

    /// Creates a one-off connection to `tag_name` (used for `@tags` and
    /// `@udt/<n>`), reads it, and returns a freshly allocated buffer sized
    /// to the reported value.
    pub fn scan_to_buffer(&self, transport: &dyn Transport, tag_name: &str) -> Result<Vec<u8>, TransportError> {
        let attr = self.attr_string(tag_name, 1, 1);
        let handle = transport.create(&attr, self.connect_timeout_ms)?;
        transport.read(handle, self.request_timeout_ms)?;
        let size = transport.get_size(handle)?;
        let mut buf = vec![0u8; size as usize];
        transport.get_raw_bytes(handle, 0, &mut buf)?;
        Ok(buf)
    }
}
