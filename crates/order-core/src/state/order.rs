//! Order state machine implementation.
//!
//! Orders enter the lifecycle as CART or PLACED and move forward through
//! DISPATCHED to COMPLETED, or to CANCELLED from PLACED or DISPATCHED.
//! COMPLETED and CANCELLED are terminal.

use once_cell::sync::Lazy;
use order_storage::{Fields, Filter, StorageError, StorageService};
use order_types::{current_timestamp, fields, truncate_id, ObjectId, Order, OrderStatus};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during order state management.
#[derive(Debug, Error)]
pub enum OrderStateError {
	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),
	#[error("Invalid state transition from {from} to {to}")]
	InvalidTransition { from: OrderStatus, to: OrderStatus },
}

/// Static transition table - each state maps to allowed next states
static TRANSITIONS: Lazy<HashMap<OrderStatus, HashSet<OrderStatus>>> = Lazy::new(|| {
	let mut m = HashMap::new();
	m.insert(OrderStatus::Cart, HashSet::from([OrderStatus::Placed]));
	m.insert(
		OrderStatus::Placed,
		HashSet::from([OrderStatus::Dispatched, OrderStatus::Cancelled]),
	);
	m.insert(
		OrderStatus::Dispatched,
		HashSet::from([OrderStatus::Completed, OrderStatus::Cancelled]),
	);
	m.insert(OrderStatus::Completed, HashSet::new()); // terminal
	m.insert(OrderStatus::Cancelled, HashSet::new()); // terminal
	m
});

/// Outcome of a successful status change.
#[derive(Debug, Clone)]
pub struct StatusChange {
	/// Status the order held before the change.
	pub from: OrderStatus,
	/// The order as persisted after the change.
	pub order: Order,
}

/// Manages order state transitions and persistence
#[derive(Clone)]
pub struct OrderStateMachine {
	storage: Arc<StorageService>,
}

impl OrderStateMachine {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	/// Checks if a state transition is valid
	pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
		TRANSITIONS
			.get(&from)
			.is_some_and(|allowed| allowed.contains(&to))
	}

	/// Gets an order by ID
	pub async fn get_order(&self, order_id: ObjectId) -> Result<Order, StorageError> {
		self.storage.find_by_id(order_id).await
	}

	/// Stores a new order
	pub async fn store_order(&self, order: &Order) -> Result<(), StorageError> {
		self.storage.insert(order).await.map(|_| ())
	}

	/// Removes an order from the active collection
	pub async fn delete_order(&self, order_id: ObjectId) -> Result<(), StorageError> {
		self.storage.delete_by_id::<Order>(order_id).await
	}

	/// Removes the order only while it still has `status`.
	///
	/// Returns whether an order was deleted.
	pub async fn delete_order_in_status(
		&self,
		order_id: ObjectId,
		status: OrderStatus,
	) -> Result<bool, StorageError> {
		let filter = Filter::new()
			.eq(fields::ID, order_id)
			.eq(fields::STATUS, status);
		Ok(self.storage.delete_where::<Order>(&filter).await? > 0)
	}

	/// Transitions an order to a new status with validation.
	///
	/// The guard runs against the stored status before anything is written,
	/// so a rejected transition leaves the order untouched. The write only
	/// applies while the order still has the status the guard saw; when
	/// another caller changed it first, the order is read again and checked
	/// against its new status.
	pub async fn transition_order_status(
		&self,
		order_id: ObjectId,
		new_status: OrderStatus,
	) -> Result<StatusChange, OrderStateError> {
		let mut order = self.get_order(order_id).await?;

		loop {
			let from = order.status;
			if !Self::is_valid_transition(from, new_status) {
				return Err(OrderStateError::InvalidTransition {
					from,
					to: new_status,
				});
			}

			let updated_at = current_timestamp();
			let mut update = Fields::new();
			update.insert(fields::STATUS.into(), new_status.into());
			update.insert(fields::UPDATED_AT.into(), Value::from(updated_at));
			let guard = Filter::new().eq(fields::STATUS, from);

			match self
				.storage
				.update_fields_where::<Order>(order_id, &guard, update)
				.await
			{
				Ok(()) => {
					order.status = new_status;
					order.updated_at = updated_at;
					return Ok(StatusChange { from, order });
				},
				Err(StorageError::NotFound) => {
					let current = self.get_order(order_id).await?;
					// Statuses only move forward, so an unchanged status here
					// means the order was replaced under the same id.
					if current.status == from {
						return Err(StorageError::NotFound.into());
					}
					tracing::debug!(
						order_id = %truncate_id(&order_id.to_hex()),
						expected = %from,
						found = %current.status,
						"Order status changed concurrently"
					);
					order = current;
				},
				Err(e) => return Err(e.into()),
			}
		}
	}

	/// Changes the quantity of an order and recomputes its total price.
	///
	/// Applies only while the order still has the status it was read with;
	/// otherwise fails with [`StorageError::NotFound`].
	pub async fn update_quantity(
		&self,
		mut order: Order,
		quantity: u32,
	) -> Result<Order, StorageError> {
		order.set_quantity(quantity);

		let total_price = serde_json::to_value(order.total_price)
			.map_err(|e| StorageError::Serialization(e.to_string()))?;
		let mut update = Fields::new();
		update.insert(fields::QUANTITY.into(), Value::from(order.quantity));
		update.insert(fields::TOTAL_PRICE.into(), total_price);
		update.insert(fields::UPDATED_AT.into(), Value::from(order.updated_at));
		let guard = Filter::new().eq(fields::STATUS, order.status);
		self.storage
			.update_fields_where::<Order>(order.id, &guard, update)
			.await?;

		Ok(order)
	}
}
