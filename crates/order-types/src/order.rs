//! Order lifecycle entities.
//!
//! This module defines the four kinds of documents the lifecycle engine writes:
//! the active [`Order`], the [`CartEntry`] that scopes a cart order to a user,
//! the append-only [`TrackEntry`] log of status changes, and the
//! [`HistoryRecord`] snapshot written when an order completes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::{current_timestamp, InvalidObjectId, ObjectId};

/// Largest quantity a single order may carry.
pub const MAX_ORDER_QUANTITY: u32 = 10;

/// Errors raised while validating caller input or building entities.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InputError {
	/// A required field was empty.
	#[error("Missing required field: {0}")]
	MissingField(&'static str),
	/// A field that must hold an object id did not.
	#[error("Invalid {field}: {source}")]
	InvalidId {
		field: &'static str,
		#[source]
		source: InvalidObjectId,
	},
	/// The quantity is outside `1..=MAX_ORDER_QUANTITY`.
	#[error("Quantity must be between 1 and {max}, got {quantity}", max = MAX_ORDER_QUANTITY)]
	QuantityOutOfRange { quantity: i64 },
	/// The unit price is zero or negative.
	#[error("Price must be positive, got {0}")]
	NonPositivePrice(Decimal),
	/// The status string is not one of the defined states.
	#[error("Invalid status '{0}'")]
	UnknownStatus(String),
}

/// Parses a required object id field.
pub fn parse_id(field: &'static str, value: &str) -> Result<ObjectId, InputError> {
	let value = value.trim();
	if value.is_empty() {
		return Err(InputError::MissingField(field));
	}
	ObjectId::parse(value).map_err(|source| InputError::InvalidId { field, source })
}

/// Checks a requested quantity against the per-order bound.
pub fn validate_quantity(quantity: i64) -> Result<u32, InputError> {
	if quantity < 1 || quantity > i64::from(MAX_ORDER_QUANTITY) {
		return Err(InputError::QuantityOutOfRange { quantity });
	}
	Ok(quantity as u32)
}

/// Status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
	/// Staged in a user's cart.
	Cart,
	/// Purchased; stock has been decreased.
	Placed,
	/// Handed over for delivery.
	Dispatched,
	/// Delivered. Triggers archival into history.
	Completed,
	/// Cancelled. Triggers the inventory reversal.
	Cancelled,
}

impl OrderStatus {
	/// Returns the wire representation of the status.
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderStatus::Cart => "CART",
			OrderStatus::Placed => "PLACED",
			OrderStatus::Dispatched => "DISPATCHED",
			OrderStatus::Completed => "COMPLETED",
			OrderStatus::Cancelled => "CANCELLED",
		}
	}

	/// Returns an iterator over all statuses.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Cart,
			Self::Placed,
			Self::Dispatched,
			Self::Completed,
			Self::Cancelled,
		]
		.into_iter()
	}

	/// Whether no further transition is possible from this status.
	pub fn is_terminal(&self) -> bool {
		matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for OrderStatus {
	type Err = InputError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::all()
			.find(|status| status.as_str() == s)
			.ok_or_else(|| InputError::UnknownStatus(s.to_string()))
	}
}

impl From<OrderStatus> for serde_json::Value {
	fn from(status: OrderStatus) -> Self {
		serde_json::Value::String(status.as_str().to_string())
	}
}

/// Validated order attributes, produced from a [`crate::CreateOrder`] request.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSpec {
	pub product_id: ObjectId,
	pub selling_id: ObjectId,
	pub user_id: ObjectId,
	pub category: String,
	pub quantity: u32,
	pub price: Decimal,
}

/// An active purchase order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
	/// Unique identifier, assigned at construction.
	pub id: ObjectId,
	/// Product being purchased.
	#[serde(rename = "prod_id")]
	pub product_id: ObjectId,
	/// Selling listing the product was bought from.
	#[serde(rename = "prod_selling_id")]
	pub selling_id: ObjectId,
	/// Number of units, `1..=MAX_ORDER_QUANTITY`.
	pub quantity: u32,
	/// Unit price.
	pub price: Decimal,
	/// Always `price * quantity`.
	pub total_price: Decimal,
	/// Product category.
	pub category: String,
	/// Owning user.
	pub user_id: ObjectId,
	/// Current lifecycle status.
	#[serde(rename = "order_status")]
	pub status: OrderStatus,
	/// Timestamp when this order was created.
	pub created_at: u64,
	/// Timestamp when this order was last updated.
	pub updated_at: u64,
}

impl Order {
	/// Builds a new order in the given initial status with a fresh id.
	pub fn new(spec: &OrderSpec, status: OrderStatus) -> Self {
		let now = current_timestamp();
		Self {
			id: ObjectId::new(),
			product_id: spec.product_id,
			selling_id: spec.selling_id,
			quantity: spec.quantity,
			price: spec.price,
			total_price: spec.price * Decimal::from(spec.quantity),
			category: spec.category.clone(),
			user_id: spec.user_id,
			status,
			created_at: now,
			updated_at: now,
		}
	}

	/// Changes the quantity and recomputes the total price.
	pub fn set_quantity(&mut self, quantity: u32) {
		self.quantity = quantity;
		self.total_price = self.price * Decimal::from(quantity);
		self.updated_at = current_timestamp();
	}
}

/// Scopes an order in CART status to its user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartEntry {
	pub id: ObjectId,
	pub order_id: ObjectId,
	pub user_id: ObjectId,
	/// Mirror of the order status at the time the entry was written.
	#[serde(rename = "order_status")]
	pub status: OrderStatus,
	pub created_at: u64,
	pub updated_at: u64,
}

impl CartEntry {
	/// Builds the cart entry pairing `order` with its owner.
	pub fn for_order(order: &Order) -> Self {
		let now = current_timestamp();
		Self {
			id: ObjectId::new(),
			order_id: order.id,
			user_id: order.user_id,
			status: order.status,
			created_at: now,
			updated_at: now,
		}
	}
}

/// One status transition of an order. Never mutated after insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackEntry {
	pub id: ObjectId,
	pub order_id: ObjectId,
	#[serde(rename = "order_status")]
	pub status: OrderStatus,
	pub created_at: u64,
	pub updated_at: u64,
}

impl TrackEntry {
	pub fn new(order_id: ObjectId, status: OrderStatus) -> Self {
		let now = current_timestamp();
		Self {
			id: ObjectId::new(),
			order_id,
			status,
			created_at: now,
			updated_at: now,
		}
	}
}

/// Archived snapshot of a completed order and its full track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
	pub id: ObjectId,
	pub order: Order,
	#[serde(rename = "order_track")]
	pub track: Vec<TrackEntry>,
	pub created_at: u64,
	pub updated_at: u64,
}

impl HistoryRecord {
	pub fn new(order: Order, track: Vec<TrackEntry>) -> Self {
		let now = current_timestamp();
		Self {
			id: ObjectId::new(),
			order,
			track,
			created_at: now,
			updated_at: now,
		}
	}
}
