//! In-memory inventory backend.
//!
//! Records every adjustment and keeps a net stock delta per product instead of
//! calling a product service. Useful for development and tests.

use crate::{
	AdjustDirection, InventoryError, InventoryFactory, InventoryInterface, InventoryRegistry,
	StockAdjustment,
};
use async_trait::async_trait;
use order_types::{ConfigSchema, ImplementationRegistry, ObjectId, Schema, SchemaError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Ledger {
	deltas: HashMap<ObjectId, i64>,
	log: Vec<StockAdjustment>,
}

/// In-memory inventory implementation. Clones share the same ledger.
#[derive(Clone, Default)]
pub struct MemoryInventory {
	ledger: Arc<RwLock<Ledger>>,
}

impl MemoryInventory {
	pub fn new() -> Self {
		Self::default()
	}

	/// Net change applied to a product's stock so far.
	pub async fn net_delta(&self, product_id: ObjectId) -> i64 {
		self.ledger
			.read()
			.await
			.deltas
			.get(&product_id)
			.copied()
			.unwrap_or(0)
	}

	/// Every adjustment applied, oldest first.
	pub async fn adjustments(&self) -> Vec<StockAdjustment> {
		self.ledger.read().await.log.clone()
	}
}

#[async_trait]
impl InventoryInterface for MemoryInventory {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryInventorySchema)
	}

	async fn adjust(&self, adjustment: &StockAdjustment) -> Result<(), InventoryError> {
		let amount = i64::from(adjustment.quantity);
		let mut ledger = self.ledger.write().await;
		let delta = ledger.deltas.entry(adjustment.product_id).or_default();
		match adjustment.direction {
			AdjustDirection::Increase => *delta += amount,
			AdjustDirection::Decrease => *delta -= amount,
		}
		ledger.log.push(*adjustment);
		Ok(())
	}
}

/// Configuration schema for MemoryInventory.
pub struct MemoryInventorySchema;

impl ConfigSchema for MemoryInventorySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), SchemaError> {
		// Memory inventory has no configuration
		Schema::new(vec![], vec![]).validate(config)
	}
}

/// Factory function to create a memory inventory backend from configuration.
pub fn create_inventory(
	config: &toml::Value,
) -> Result<Box<dyn InventoryInterface>, InventoryError> {
	MemoryInventorySchema
		.validate(config)
		.map_err(|e| InventoryError::Configuration(e.to_string()))?;
	Ok(Box::new(MemoryInventory::new()))
}

/// Registry for the memory inventory implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = InventoryFactory;

	fn factory() -> Self::Factory {
		create_inventory
	}
}

impl InventoryRegistry for Registry {}
