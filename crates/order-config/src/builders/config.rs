//! Configuration builder for creating test and development configurations.
//!
//! This module provides utilities for constructing Config instances with
//! sensible defaults, particularly useful for testing scenarios.

use crate::{Config, InventoryConfig, ServiceConfig, StorageConfig};
use std::collections::HashMap;

/// Builder for creating `Config` instances with a fluent API.
///
/// Defaults to in-memory storage and inventory, both with empty
/// implementation tables.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	service_id: String,
	storage_primary: String,
	storage_implementations: HashMap<String, toml::Value>,
	operation_timeout_seconds: u64,
	inventory_primary: String,
	inventory_implementations: HashMap<String, toml::Value>,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

fn empty_table() -> toml::Value {
	toml::Value::Table(toml::map::Map::new())
}

impl ConfigBuilder {
	/// Creates a new `ConfigBuilder` with default values suitable for testing.
	pub fn new() -> Self {
		Self {
			service_id: "test-order-service".to_string(),
			storage_primary: "memory".to_string(),
			storage_implementations: HashMap::from([("memory".to_string(), empty_table())]),
			operation_timeout_seconds: 5,
			inventory_primary: "memory".to_string(),
			inventory_implementations: HashMap::from([("memory".to_string(), empty_table())]),
		}
	}

	/// Sets the service ID.
	pub fn service_id(mut self, id: impl Into<String>) -> Self {
		self.service_id = id.into();
		self
	}

	/// Selects the primary storage implementation and sets its configuration.
	pub fn storage(mut self, primary: impl Into<String>, config: toml::Value) -> Self {
		let primary = primary.into();
		self.storage_implementations.insert(primary.clone(), config);
		self.storage_primary = primary;
		self
	}

	/// Sets the per-operation storage timeout in seconds.
	pub fn operation_timeout_seconds(mut self, seconds: u64) -> Self {
		self.operation_timeout_seconds = seconds;
		self
	}

	/// Selects the primary inventory implementation and sets its configuration.
	pub fn inventory(mut self, primary: impl Into<String>, config: toml::Value) -> Self {
		let primary = primary.into();
		self.inventory_implementations.insert(primary.clone(), config);
		self.inventory_primary = primary;
		self
	}

	/// Builds the `Config` with the configured values.
	pub fn build(self) -> Config {
		Config {
			service: ServiceConfig {
				id: self.service_id,
			},
			storage: StorageConfig {
				primary: self.storage_primary,
				implementations: self.storage_implementations,
				operation_timeout_seconds: self.operation_timeout_seconds,
			},
			inventory: InventoryConfig {
				primary: self.inventory_primary,
				implementations: self.inventory_implementations,
			},
		}
	}
}
