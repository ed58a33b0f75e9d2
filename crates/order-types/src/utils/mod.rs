//! Utility functions for timestamps and display formatting.

pub mod formatting;
pub mod helpers;

pub use formatting::truncate_id;
pub use helpers::current_timestamp;
