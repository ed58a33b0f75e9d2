//! Order lifecycle engine.
//!
//! The engine is the only writer of orders, cart entries, track entries and
//! history records. Every operation is a fixed sequence of storage calls with
//! no transaction spanning collections: when a later step fails, the earlier
//! steps stay committed and the error reaches the caller unchanged. The
//! lifecycle operations live in [`lifecycle`]; read-only queries are here.

pub mod lifecycle;

use crate::state::{CartStore, HistoryArchive, OrderStateError, OrderStateMachine, TrackLog};
use order_inventory::{InventoryError, InventoryService};
use order_storage::{StorageError, StorageService};
use order_types::{
	parse_id, truncate_id, CartEntry, HistoryRecord, InputError, ObjectId, Order, OrderStatus,
	TrackEntry,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

/// Errors returned by lifecycle operations.
#[derive(Debug, Error)]
pub enum OrderError {
	/// Caller input was malformed. Nothing was written.
	#[error("Validation error: {0}")]
	Validation(#[from] InputError),
	/// The requested status change is not in the transition table. Nothing was written.
	#[error("Invalid status transition from {from} to {to}")]
	InvalidTransition { from: OrderStatus, to: OrderStatus },
	/// The operation only applies to orders in the cart. Nothing was written.
	#[error("Order {order_id} is {status}, not in the cart")]
	NotInCart {
		order_id: ObjectId,
		status: OrderStatus,
	},
	/// The order is already paired with the user's cart.
	#[error("Order {order_id} is already in the cart of user {user_id}")]
	DuplicateCartEntry {
		order_id: ObjectId,
		user_id: ObjectId,
	},
	/// The referenced entity does not exist.
	#[error("{entity} {id} not found")]
	NotFound { entity: &'static str, id: ObjectId },
	/// A storage call failed. Steps before it remain committed.
	#[error("Storage error: {0}")]
	Storage(StorageError),
	/// The inventory call failed. Storage changes before it remain committed.
	#[error("Inventory adjustment failed: {0}")]
	RemoteService(#[from] InventoryError),
	/// The order reached COMPLETED but could not be moved to the history archive.
	#[error("Order {order_id} is COMPLETED but archival failed: {source}")]
	Archival {
		order_id: ObjectId,
		#[source]
		source: Box<OrderError>,
	},
}

impl OrderError {
	/// Whether the error was raised before any side effect because the
	/// request itself was unacceptable.
	pub fn is_validation(&self) -> bool {
		matches!(
			self,
			OrderError::Validation(_)
				| OrderError::InvalidTransition { .. }
				| OrderError::NotInCart { .. }
				| OrderError::DuplicateCartEntry { .. }
		)
	}

	/// Maps a storage failure, turning a missing document into `NotFound`.
	fn storage(entity: &'static str, id: ObjectId) -> impl FnOnce(StorageError) -> OrderError {
		move |e| match e {
			StorageError::NotFound => OrderError::NotFound { entity, id },
			other => OrderError::Storage(other),
		}
	}
}

impl From<OrderStateError> for OrderError {
	fn from(err: OrderStateError) -> Self {
		match err {
			OrderStateError::Storage(e) => OrderError::Storage(e),
			OrderStateError::InvalidTransition { from, to } => {
				OrderError::InvalidTransition { from, to }
			},
		}
	}
}

/// Orchestrates order lifecycle operations over storage and inventory.
#[derive(Clone)]
pub struct OrderEngine {
	/// Active orders and their status transitions.
	pub(crate) orders: OrderStateMachine,
	/// Cart entries of CART orders.
	pub(crate) carts: CartStore,
	/// Status change log of active orders.
	pub(crate) track: TrackLog,
	/// Snapshots of completed orders.
	pub(crate) history: HistoryArchive,
	/// Client of the external stock service.
	pub(crate) inventory: Arc<InventoryService>,
}

impl OrderEngine {
	/// Creates an engine over the given storage and inventory services.
	pub fn new(storage: Arc<StorageService>, inventory: Arc<InventoryService>) -> Self {
		Self {
			orders: OrderStateMachine::new(storage.clone()),
			carts: CartStore::new(storage.clone()),
			track: TrackLog::new(storage.clone()),
			history: HistoryArchive::new(storage),
			inventory,
		}
	}

	/// Returns an active order.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn get_order(&self, order_id: &str) -> Result<Order, OrderError> {
		let id = parse_id("order_id", order_id)?;
		self.orders
			.get_order(id)
			.await
			.map_err(OrderError::storage("Order", id))
	}

	/// Returns the status track of an active order, oldest first.
	///
	/// An order without status changes, or one that was archived, has an empty
	/// track.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn order_track(&self, order_id: &str) -> Result<Vec<TrackEntry>, OrderError> {
		let id = parse_id("order_id", order_id)?;
		self.track.for_order(id).await.map_err(OrderError::Storage)
	}

	/// Returns the cart entries of a user.
	#[instrument(skip_all, fields(user_id = %truncate_id(user_id)))]
	pub async fn user_cart_items(&self, user_id: &str) -> Result<Vec<CartEntry>, OrderError> {
		let id = parse_id("user_id", user_id)?;
		self.carts.for_user(id).await.map_err(OrderError::Storage)
	}

	/// Fails when the order is already in the user's cart.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn check_duplicate_cart_entry(
		&self,
		order_id: &str,
		user_id: &str,
	) -> Result<(), OrderError> {
		let order_id = parse_id("order_id", order_id)?;
		let user_id = parse_id("user_id", user_id)?;
		if self
			.carts
			.contains(order_id, user_id)
			.await
			.map_err(OrderError::Storage)?
		{
			return Err(OrderError::DuplicateCartEntry { order_id, user_id });
		}
		Ok(())
	}

	/// Returns the history record of a completed order.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn order_history(&self, order_id: &str) -> Result<HistoryRecord, OrderError> {
		let id = parse_id("order_id", order_id)?;
		self.history
			.for_order(id)
			.await
			.map_err(OrderError::Storage)?
			.ok_or(OrderError::NotFound {
				entity: "History record",
				id,
			})
	}
}
