//! Builder pattern for constructing order engines.
//!
//! Composes an [`OrderEngine`] from configuration and named factory functions
//! for the storage and inventory backends.

use crate::engine::OrderEngine;
use order_config::Config;
use order_inventory::{InventoryError, InventoryFactory, InventoryInterface, InventoryService};
use order_storage::{StorageError, StorageFactory, StorageInterface, StorageService};
use order_types::ConfigSchema;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during order engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Container for the factory functions needed to build an OrderEngine.
///
/// Each factory takes the TOML table of one implementation and returns the
/// backend. Factories are looked up by the implementation name used in the
/// configuration.
pub struct OrderFactories<SF, IF> {
	pub storage_factories: HashMap<String, SF>,
	pub inventory_factories: HashMap<String, IF>,
}

/// Factories for every storage and inventory backend shipped with the workspace.
pub fn default_factories() -> OrderFactories<StorageFactory, InventoryFactory> {
	OrderFactories {
		storage_factories: order_storage::get_all_implementations()
			.into_iter()
			.map(|(name, factory)| (name.to_string(), factory))
			.collect(),
		inventory_factories: order_inventory::get_all_implementations()
			.into_iter()
			.map(|(name, factory)| (name.to_string(), factory))
			.collect(),
	}
}

/// Instantiates every configured implementation that has a factory, checks
/// its table against the implementation's own schema and returns the primary.
fn load_primary<F, T, E, S>(
	component: &'static str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
	factories: &HashMap<String, F>,
	schema_of: S,
) -> Result<T, BuilderError>
where
	F: Fn(&toml::Value) -> Result<T, E>,
	E: Display,
	S: Fn(&T) -> Box<dyn ConfigSchema>,
{
	let mut loaded = HashMap::new();
	for (name, config) in implementations {
		let Some(factory) = factories.get(name) else {
			tracing::warn!(component = component, implementation = %name, "No factory registered, skipping");
			continue;
		};
		let implementation = factory(config).map_err(|e| {
			tracing::error!(
				component = component,
				implementation = %name,
				error = %e,
				"Failed to create implementation"
			);
			BuilderError::Config(format!(
				"Failed to create {} implementation '{}': {}",
				component, name, e
			))
		})?;
		schema_of(&implementation).validate(config).map_err(|e| {
			tracing::error!(
				component = component,
				implementation = %name,
				error = %e,
				"Invalid configuration for implementation"
			);
			BuilderError::Config(format!(
				"Invalid configuration for {} implementation '{}': {}",
				component, name, e
			))
		})?;

		let is_primary = primary == name;
		tracing::info!(component = component, implementation = %name, enabled = %is_primary, "Loaded");
		loaded.insert(name.clone(), implementation);
	}

	if loaded.is_empty() {
		return Err(BuilderError::MissingComponent(format!(
			"no valid {} implementations available",
			component
		)));
	}

	loaded.remove(primary).ok_or_else(|| {
		BuilderError::Config(format!(
			"Primary {} '{}' failed to load or has invalid configuration",
			component, primary
		))
	})
}

/// Builder for constructing an OrderEngine with pluggable implementations.
pub struct OrderEngineBuilder {
	config: Config,
}

impl OrderEngineBuilder {
	/// Creates a new OrderEngineBuilder with the given configuration.
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the OrderEngine using factories for each component type.
	pub fn build<SF, IF>(self, factories: OrderFactories<SF, IF>) -> Result<OrderEngine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
		IF: Fn(&toml::Value) -> Result<Box<dyn InventoryInterface>, InventoryError>,
	{
		self.config
			.validate()
			.map_err(|e| BuilderError::Config(e.to_string()))?;

		let storage_backend = load_primary(
			"storage",
			&self.config.storage.primary,
			&self.config.storage.implementations,
			&factories.storage_factories,
			|backend: &Box<dyn StorageInterface>| backend.config_schema(),
		)?;
		let timeout = Duration::from_secs(self.config.storage.operation_timeout_seconds);
		let storage = Arc::new(StorageService::with_timeout(storage_backend, timeout));

		let inventory_backend = load_primary(
			"inventory",
			&self.config.inventory.primary,
			&self.config.inventory.implementations,
			&factories.inventory_factories,
			|backend: &Box<dyn InventoryInterface>| backend.config_schema(),
		)?;
		let inventory = Arc::new(InventoryService::new(inventory_backend));

		tracing::info!(
			service_id = %self.config.service.id,
			storage = %self.config.storage.primary,
			inventory = %self.config.inventory.primary,
			"Order engine ready"
		);
		Ok(OrderEngine::new(storage, inventory))
	}
}
