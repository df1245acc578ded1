//! Frame header parsing module.
//!
//! Extracts just enough of the Ethernet, IP and transport headers to
//! classify a frame for its metadata record.

mod metadata_parser;

pub use metadata_parser::MetadataParser;
