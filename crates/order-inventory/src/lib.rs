//! Inventory adjustment module for the order lifecycle system.
//!
//! Stock is owned by an external product service. Placing an order decreases
//! the stock of its product and cancelling a placed order increases it again.
//! This module defines the client contract for that call and the backends
//! that fulfil it.

use async_trait::async_trait;
use order_types::{truncate_id, ConfigSchema, ImplementationRegistry, ObjectId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod http;
	pub mod memory;
}

/// Errors that can occur during inventory adjustment.
#[derive(Debug, Error)]
pub enum InventoryError {
	/// The request never produced a response.
	#[error("Network error: {0}")]
	Network(String),
	/// The product service answered with a non-success status.
	#[error("Inventory service rejected adjustment with status {status}: {body}")]
	Rejected { status: u16, body: String },
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Direction of a stock adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustDirection {
	Increase,
	Decrease,
}

impl AdjustDirection {
	/// Tag sent to the product service.
	pub fn as_str(&self) -> &'static str {
		match self {
			AdjustDirection::Increase => "increase",
			AdjustDirection::Decrease => "decrease",
		}
	}
}

impl fmt::Display for AdjustDirection {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// One request to move the stock of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjustment {
	pub product_id: ObjectId,
	pub direction: AdjustDirection,
	pub quantity: u32,
}

/// Trait defining the interface for inventory backends.
///
/// An adjustment either succeeds or fails as a whole; callers treat any error
/// as "stock unchanged".
#[async_trait]
pub trait InventoryInterface: Send + Sync {
	/// Returns the configuration schema for this inventory implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Applies one stock adjustment.
	async fn adjust(&self, adjustment: &StockAdjustment) -> Result<(), InventoryError>;
}

/// Type alias for inventory factory functions.
pub type InventoryFactory = fn(&toml::Value) -> Result<Box<dyn InventoryInterface>, InventoryError>;

/// Registry trait for inventory implementations.
pub trait InventoryRegistry: ImplementationRegistry<Factory = InventoryFactory> {}

/// Get all registered inventory implementations.
///
/// Returns a vector of (name, factory) tuples for all available inventory implementations.
pub fn get_all_implementations() -> Vec<(&'static str, InventoryFactory)> {
	use implementations::{http, memory};

	vec![
		(http::Registry::NAME, http::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// Service that forwards stock adjustments to the configured backend.
pub struct InventoryService {
	backend: Box<dyn InventoryInterface>,
}

impl InventoryService {
	pub fn new(backend: Box<dyn InventoryInterface>) -> Self {
		Self { backend }
	}

	/// Applies an adjustment, logging the outcome.
	pub async fn adjust(&self, adjustment: StockAdjustment) -> Result<(), InventoryError> {
		let product = truncate_id(&adjustment.product_id.to_hex());
		match self.backend.adjust(&adjustment).await {
			Ok(()) => {
				tracing::debug!(
					product_id = %product,
					direction = %adjustment.direction,
					quantity = adjustment.quantity,
					"Stock adjusted"
				);
				Ok(())
			},
			Err(e) => {
				tracing::warn!(
					product_id = %product,
					direction = %adjustment.direction,
					quantity = adjustment.quantity,
					error = %e,
					"Stock adjustment failed"
				);
				Err(e)
			},
		}
	}

	pub async fn increase(&self, product_id: ObjectId, quantity: u32) -> Result<(), InventoryError> {
		self.adjust(StockAdjustment {
			product_id,
			direction: AdjustDirection::Increase,
			quantity,
		})
		.await
	}

	pub async fn decrease(&self, product_id: ObjectId, quantity: u32) -> Result<(), InventoryError> {
		self.adjust(StockAdjustment {
			product_id,
			direction: AdjustDirection::Decrease,
			quantity,
		})
		.await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use implementations::memory::MemoryInventory;

	#[tokio::test]
	async fn test_service_routes_direction() {
		let inventory = MemoryInventory::new();
		let service = InventoryService::new(Box::new(inventory.clone()));
		let product = ObjectId::new();

		service.decrease(product, 3).await.unwrap();
		service.increase(product, 1).await.unwrap();

		assert_eq!(inventory.net_delta(product).await, -2);
		let log = inventory.adjustments().await;
		assert_eq!(log.len(), 2);
		assert_eq!(log[0].direction, AdjustDirection::Decrease);
		assert_eq!(log[1].direction, AdjustDirection::Increase);
	}

	#[test]
	fn test_registry_names() {
		let names: Vec<_> = get_all_implementations().into_iter().map(|(n, _)| n).collect();
		assert_eq!(names, vec!["http", "memory"]);
	}

	#[test]
	fn test_direction_tags() {
		assert_eq!(AdjustDirection::Increase.as_str(), "increase");
		assert_eq!(AdjustDirection::Decrease.to_string(), "decrease");
	}
}
