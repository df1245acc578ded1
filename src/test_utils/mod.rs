//! Test utilities for `rotocap`
//!
//! Provides synthetic frame generation and a scripted capture source so the
//! session can be exercised without a live interface.

pub mod frame_generator;
pub mod scripted_source;

pub use frame_generator::*;
pub use scripted_source::*;
