//! Common types module for the order lifecycle system.
//!
//! This module defines the core data types shared by every crate in the
//! workspace: identifiers, the order entity model and its status enum, the
//! inbound request DTOs, the logical storage collections, and the helpers used
//! to validate per-implementation TOML configuration.

/// Inbound request types accepted by the lifecycle engine.
pub mod api;
/// Document identifiers.
pub mod id;
/// Order, cart, track and history entities.
pub mod order;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Logical collections and the document trait for storage.
pub mod storage;
/// Utility functions for timestamps and display formatting.
pub mod utils;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

// Re-export all types for convenient access
pub use api::*;
pub use id::*;
pub use order::*;
pub use registry::*;
pub use storage::*;
pub use utils::{current_timestamp, truncate_id};
pub use validation::*;
