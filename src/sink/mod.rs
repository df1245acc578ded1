//! Frame sink module.
//!
//! Routes each captured frame into the active output pair.

mod packet_sink;

pub use packet_sink::PacketSink;
