//! Error types surfaced by the core.
//!
//! Only [`ConnectError`] ever propagates out of a public entry point: init
//! failure and enumeration failure are the only two outcomes that abort the
//! caller's `connect`. `WireError` and `TransportError` are building blocks
//! used internally (and returned from unit-testable parsing functions);
//! per-UDT and per-tag failures are absorbed into status fields rather than
//! returned at all.

use std::{error, fmt};

/// A malformed `@udt/<n>` payload. The tag-listing parser never returns
/// this: a truncated `@tags` record is reported through
/// [`crate::wire::TagListing::truncated`] instead, since parsing there
/// keeps every record collected so far rather than failing outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// A UDT header or field table claims more bytes than were supplied.
    BufferTooShort,
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BufferTooShort => "buffer shorter than the declared header/field table",
        })
    }
}

impl error::Error for WireError {}

/// An error reported by the injected [`crate::transport::Transport`].
///
/// The real transport's error space is out of scope here; this only keeps
/// enough information for logging and for `TagStatus` to record a failure.
#[derive(Debug, Clone)]
pub struct TransportError(pub String);

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transport error: {}", self.0)
    }
}

impl error::Error for TransportError {}

impl From<&str> for TransportError {
    fn from(msg: &str) -> Self {
        TransportError(msg.to_string())
    }
}

/// The two fatal outcomes of [`crate::connect`]: failed initialization
/// and failed enumeration.
#[derive(Debug, Clone)]
pub enum ConnectError {
    /// `init` was never called, or failed, before `connect`.
    NotInitialized,
    /// The `@tags` pseudo-tag could not be read or parsed.
    TagsUnreadable(TransportError),
    /// A scan/name-arena buffer could not be allocated.
    AllocationFailed,
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized => f.write_str("connect called before a successful init"),
            Self::TagsUnreadable(e) => write!(f, "could not read @tags: {e}"),
            Self::AllocationFailed => f.write_str("failed to allocate tag memory"),
        }
    }
}

impl error::Error for ConnectError {}
