//! Append-only log of order status changes.

use order_storage::{Filter, StorageError, StorageService};
use order_types::{fields, ObjectId, OrderStatus, TrackEntry};
use std::sync::Arc;

/// Reads and writes the status track collection.
///
/// Entries are only ever appended or purged as a whole when their order is
/// archived.
#[derive(Clone)]
pub struct TrackLog {
	storage: Arc<StorageService>,
}

impl TrackLog {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	/// Records that the order reached `status`.
	pub async fn append(
		&self,
		order_id: ObjectId,
		status: OrderStatus,
	) -> Result<TrackEntry, StorageError> {
		let entry = TrackEntry::new(order_id, status);
		self.storage.insert(&entry).await?;
		Ok(entry)
	}

	/// Entries of one order, oldest first.
	///
	/// Timestamps have second resolution, so ties fall back to the id, whose
	/// bytes are its creation time, a per-process value and an increasing counter.
	pub async fn for_order(&self, order_id: ObjectId) -> Result<Vec<TrackEntry>, StorageError> {
		let filter = Filter::new().eq(fields::ORDER_ID, order_id);
		let mut entries = self.storage.find::<TrackEntry>(&filter).await?;
		entries.sort_by_key(|e| (e.created_at, e.id));
		Ok(entries)
	}

	/// Deletes every entry of the order.
	pub async fn purge(&self, order_id: ObjectId) -> Result<usize, StorageError> {
		let filter = Filter::new().eq(fields::ORDER_ID, order_id);
		self.storage.delete_where::<TrackEntry>(&filter).await
	}
}
