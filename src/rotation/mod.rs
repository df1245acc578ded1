//! Time-based rotation of output pairs and retention of old ones.

mod retention;
mod rotator;

pub use retention::{list_pair_files, RetentionEnforcer, RetentionOutcome};
pub use rotator::FileRotator;
