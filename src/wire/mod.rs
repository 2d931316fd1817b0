//! Binary decoders for the controller's tag-listing and UDT-definition
//! replies.

pub mod tag_listing;
pub mod udt_def;

pub use tag_listing::{TagEntry, TagListing, parse_tag_listing};
pub use udt_def::{UdtEntry, UdtField, parse_udt_entry};
