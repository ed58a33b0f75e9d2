//! Order lifecycle engine for the order service.
//!
//! This crate ties the storage port and the inventory client together into
//! the lifecycle operations: placing orders, managing carts, moving orders
//! through their statuses, cancelling, and archiving completed orders. It
//! also provides the builder that assembles an engine from configuration.

pub mod builder;
pub mod engine;
pub mod state;

pub use builder::{default_factories, BuilderError, OrderEngineBuilder, OrderFactories};
pub use engine::{OrderEngine, OrderError};
