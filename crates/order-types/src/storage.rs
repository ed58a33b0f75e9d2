//! Storage-related types for the order system.

use serde::{de::DeserializeOwned, Serialize};
use std::str::FromStr;

use crate::{CartEntry, HistoryRecord, ObjectId, Order, TrackEntry};

/// Logical collections kept by every storage backend.
///
/// This enum provides type safety for storage operations by replacing
/// string literals with strongly typed variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
	/// Active orders.
	Orders,
	/// Cart membership of orders in CART status.
	CartEntries,
	/// Append-only status track.
	StatusTrack,
	/// Archived snapshots of completed orders.
	HistoryRecords,
}

impl Collection {
	/// Returns the default collection name.
	pub fn as_str(&self) -> &'static str {
		match self {
			Collection::Orders => "orders",
			Collection::CartEntries => "order_carts",
			Collection::StatusTrack => "order_track",
			Collection::HistoryRecords => "order_history",
		}
	}

	/// Returns an iterator over all collections.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Orders,
			Self::CartEntries,
			Self::StatusTrack,
			Self::HistoryRecords,
		]
		.into_iter()
	}
}

impl FromStr for Collection {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::all().find(|c| c.as_str() == s).ok_or(())
	}
}

impl From<Collection> for &'static str {
	fn from(collection: Collection) -> Self {
		collection.as_str()
	}
}

/// Field names used in filters and partial updates.
pub mod fields {
	pub const ID: &str = "id";
	pub const ORDER_ID: &str = "order_id";
	pub const USER_ID: &str = "user_id";
	pub const STATUS: &str = "order_status";
	pub const QUANTITY: &str = "quantity";
	pub const TOTAL_PRICE: &str = "total_price";
	pub const UPDATED_AT: &str = "updated_at";
	/// Id of the order embedded in a history record.
	pub const HISTORY_ORDER_ID: &str = "order.id";
}

/// An entity that lives in one of the storage collections.
pub trait Document: Serialize + DeserializeOwned + Send + Sync {
	/// Collection this document type is stored in.
	const COLLECTION: Collection;

	/// The document's identifier.
	fn id(&self) -> ObjectId;
}

impl Document for Order {
	const COLLECTION: Collection = Collection::Orders;

	fn id(&self) -> ObjectId {
		self.id
	}
}

impl Document for CartEntry {
	const COLLECTION: Collection = Collection::CartEntries;

	fn id(&self) -> ObjectId {
		self.id
	}
}

impl Document for TrackEntry {
	const COLLECTION: Collection = Collection::StatusTrack;

	fn id(&self) -> ObjectId {
		self.id
	}
}

impl Document for HistoryRecord {
	const COLLECTION: Collection = Collection::HistoryRecords;

	fn id(&self) -> ObjectId {
		self.id
	}
}
