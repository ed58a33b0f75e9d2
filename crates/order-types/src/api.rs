//! Inbound request types.
//!
//! These mirror the request bodies accepted by the HTTP layer that fronts the
//! lifecycle engine. Every field is required; identifiers arrive as strings and
//! are only turned into [`ObjectId`]s by the `validate` methods.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{parse_id, validate_quantity, InputError, ObjectId, OrderSpec, OrderStatus};

/// Request to place an order or add one to the cart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateOrder {
	#[serde(rename = "prod_id")]
	pub product_id: String,
	pub category: String,
	#[serde(rename = "prod_selling_id")]
	pub selling_id: String,
	pub quantity: i64,
	pub price: Decimal,
	pub user_id: String,
}

impl CreateOrder {
	/// Validates every field and returns the parsed order attributes.
	///
	/// Checks run in a fixed order (quantity, product, selling listing, user,
	/// category, price) so the first reported problem is stable.
	pub fn validate(&self) -> Result<OrderSpec, InputError> {
		let quantity = validate_quantity(self.quantity)?;
		let product_id = parse_id("prod_id", &self.product_id)?;
		let selling_id = parse_id("prod_selling_id", &self.selling_id)?;
		let user_id = parse_id("user_id", &self.user_id)?;

		let category = self.category.trim();
		if category.is_empty() {
			return Err(InputError::MissingField("category"));
		}
		if self.price <= Decimal::ZERO {
			return Err(InputError::NonPositivePrice(self.price));
		}

		Ok(OrderSpec {
			product_id,
			selling_id,
			user_id,
			category: category.to_string(),
			quantity,
			price: self.price,
		})
	}
}

/// Request to move an order to a new status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateStatus {
	pub order_id: String,
	#[serde(rename = "order_status")]
	pub status: String,
}

impl UpdateStatus {
	/// Parses the order id and checks the status is one of the defined states.
	pub fn validate(&self) -> Result<(ObjectId, OrderStatus), InputError> {
		let order_id = parse_id("order_id", &self.order_id)?;
		if self.status.trim().is_empty() {
			return Err(InputError::MissingField("order_status"));
		}
		let status = self.status.parse()?;
		Ok((order_id, status))
	}
}
