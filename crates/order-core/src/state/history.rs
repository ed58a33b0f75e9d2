//! Archive of completed orders.

use order_storage::{Filter, StorageError, StorageService};
use order_types::{fields, truncate_id, HistoryRecord, ObjectId};
use std::sync::Arc;

/// Reads and writes the history record collection.
#[derive(Clone)]
pub struct HistoryArchive {
	storage: Arc<StorageService>,
}

impl HistoryArchive {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	pub async fn store(&self, record: &HistoryRecord) -> Result<(), StorageError> {
		self.storage.insert(record).await.map(|_| ())
	}

	/// The record archiving the given order, if any.
	///
	/// An order is archived once. Should more than one record exist, the
	/// oldest is returned and the extra records are logged.
	pub async fn for_order(&self, order_id: ObjectId) -> Result<Option<HistoryRecord>, StorageError> {
		let filter = Filter::new().eq(fields::HISTORY_ORDER_ID, order_id);
		let records = self.storage.find::<HistoryRecord>(&filter).await?;
		if records.len() > 1 {
			tracing::warn!(
				order_id = %truncate_id(&order_id.to_hex()),
				records = records.len(),
				"Order archived more than once"
			);
		}
		Ok(records.into_iter().min_by_key(|r| r.id))
	}
}
