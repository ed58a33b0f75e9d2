//! Cart entries pairing CART orders with their owner.

use order_storage::{Filter, StorageError, StorageService};
use order_types::{fields, CartEntry, ObjectId, OrderStatus};
use std::sync::Arc;

/// Reads and writes the cart entry collection.
#[derive(Clone)]
pub struct CartStore {
	storage: Arc<StorageService>,
}

impl CartStore {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	pub async fn add(&self, entry: &CartEntry) -> Result<(), StorageError> {
		self.storage.insert(entry).await.map(|_| ())
	}

	/// Whether an entry already pairs the order with the user.
	pub async fn contains(&self, order_id: ObjectId, user_id: ObjectId) -> Result<bool, StorageError> {
		let filter = Filter::new()
			.eq(fields::ORDER_ID, order_id)
			.eq(fields::USER_ID, user_id);
		self.storage.exists::<CartEntry>(&filter).await
	}

	/// Entries of a user whose order is still in the cart, ordered by id.
	pub async fn for_user(&self, user_id: ObjectId) -> Result<Vec<CartEntry>, StorageError> {
		let filter = Filter::new()
			.eq(fields::USER_ID, user_id)
			.eq(fields::STATUS, OrderStatus::Cart);
		let mut entries = self.storage.find::<CartEntry>(&filter).await?;
		entries.sort_by_key(|e| e.id);
		Ok(entries)
	}

	/// Removes every entry for the order and returns how many there were.
	pub async fn remove_for_order(&self, order_id: ObjectId) -> Result<usize, StorageError> {
		let filter = Filter::new().eq(fields::ORDER_ID, order_id);
		self.storage.delete_where::<CartEntry>(&filter).await
	}
}
