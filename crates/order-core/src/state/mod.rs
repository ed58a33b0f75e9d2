//! Per-collection state for the order lifecycle.
//!
//! Each store owns the reads and writes of one logical collection. The order
//! state machine additionally guards status changes with the transition table.

pub mod cart;
pub mod history;
pub mod order;
pub mod track;

pub use cart::CartStore;
pub use history::HistoryArchive;
pub use order::{OrderStateError, OrderStateMachine, StatusChange};
pub use track::TrackLog;
