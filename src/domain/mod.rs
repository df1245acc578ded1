//! Domain models for frame collection.
//!
//! These types are independent of capture backends and file formats.

mod frame;
mod metadata;

pub use frame::Frame;
pub use metadata::{format_mac, FrameMetadata, L4Class, NON_IP_NOTE};
