//! In-memory storage backend implementation.
//!
//! This module provides a memory-based implementation of the StorageInterface
//! trait, useful for testing and development where persistence is not required.
//! All state sits behind one read-write lock, so concurrent handlers never
//! observe a half-applied write.

use crate::{Fields, Filter, StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use order_types::{Collection, ConfigSchema, ImplementationRegistry, Schema, SchemaError};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Documents of one collection keyed by id. Iteration order is id order,
/// which for generated ids is creation order.
type CollectionStore = BTreeMap<String, Value>;

/// In-memory storage implementation. Clones share the same store.
#[derive(Clone)]
pub struct MemoryStorage {
	/// The in-memory store protected by a read-write lock.
	store: Arc<RwLock<HashMap<Collection, CollectionStore>>>,
}

impl MemoryStorage {
	/// Creates a new MemoryStorage instance.
	pub fn new() -> Self {
		Self {
			store: Arc::new(RwLock::new(HashMap::new())),
		}
	}
}

impl Default for MemoryStorage {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl StorageInterface for MemoryStorage {
	async fn insert(
		&self,
		collection: Collection,
		id: &str,
		document: Value,
	) -> Result<(), StorageError> {
		let mut store = self.store.write().await;
		let documents = store.entry(collection).or_default();
		if documents.contains_key(id) {
			return Err(StorageError::Duplicate(id.to_string()));
		}
		documents.insert(id.to_string(), document);
		Ok(())
	}

	async fn find_by_id(&self, collection: Collection, id: &str) -> Result<Value, StorageError> {
		let store = self.store.read().await;
		store
			.get(&collection)
			.and_then(|documents| documents.get(id))
			.cloned()
			.ok_or(StorageError::NotFound)
	}

	async fn find(
		&self,
		collection: Collection,
		filter: &Filter,
	) -> Result<Vec<Value>, StorageError> {
		let store = self.store.read().await;
		Ok(store
			.get(&collection)
			.map(|documents| {
				documents
					.values()
					.filter(|doc| filter.matches(doc))
					.cloned()
					.collect()
			})
			.unwrap_or_default())
	}

	async fn update_fields_where(
		&self,
		collection: Collection,
		id: &str,
		guard: &Filter,
		fields: &Fields,
	) -> Result<(), StorageError> {
		let mut store = self.store.write().await;
		let document = store
			.get_mut(&collection)
			.and_then(|documents| documents.get_mut(id))
			.filter(|doc| guard.matches(doc))
			.ok_or(StorageError::NotFound)?;
		let object = document
			.as_object_mut()
			.ok_or_else(|| StorageError::Backend(format!("document {} is not an object", id)))?;
		for (key, value) in fields {
			object.insert(key.clone(), value.clone());
		}
		Ok(())
	}

	async fn delete_by_id(&self, collection: Collection, id: &str) -> Result<(), StorageError> {
		let mut store = self.store.write().await;
		store
			.get_mut(&collection)
			.and_then(|documents| documents.remove(id))
			.map(|_| ())
			.ok_or(StorageError::NotFound)
	}

	async fn delete_where(
		&self,
		collection: Collection,
		filter: &Filter,
	) -> Result<usize, StorageError> {
		let mut store = self.store.write().await;
		let Some(documents) = store.get_mut(&collection) else {
			return Ok(0);
		};
		let before = documents.len();
		documents.retain(|_, doc| !filter.matches(doc));
		Ok(before - documents.len())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryStorageSchema)
	}
}

/// Configuration schema for MemoryStorage.
pub struct MemoryStorageSchema;

impl ConfigSchema for MemoryStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), SchemaError> {
		// Memory storage has no configuration
		Schema::new(vec![], vec![]).validate(config)
	}
}

/// Factory function to create a memory storage backend from configuration.
///
/// Configuration parameters:
/// - None required for memory storage
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	MemoryStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;
	Ok(Box::new(MemoryStorage::new()))
}

/// Registry for the memory storage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[tokio::test]
	async fn test_basic_operations() {
		let storage = MemoryStorage::new();

		storage
			.insert(Collection::Orders, "a", json!({"id": "a", "quantity": 1}))
			.await
			.unwrap();

		let doc = storage.find_by_id(Collection::Orders, "a").await.unwrap();
		assert_eq!(doc["quantity"], 1);

		// Collections are independent
		assert!(matches!(
			storage.find_by_id(Collection::CartEntries, "a").await,
			Err(StorageError::NotFound)
		));

		storage.delete_by_id(Collection::Orders, "a").await.unwrap();
		assert!(matches!(
			storage.find_by_id(Collection::Orders, "a").await,
			Err(StorageError::NotFound)
		));
	}

	#[tokio::test]
	async fn test_missing_documents_signal_not_found() {
		let storage = MemoryStorage::new();
		let mut fields = Fields::new();
		fields.insert("quantity".into(), json!(2));

		assert!(matches!(
			storage
				.update_fields_where(Collection::Orders, "nope", &Filter::new(), &fields)
				.await,
			Err(StorageError::NotFound)
		));
		assert!(matches!(
			storage.delete_by_id(Collection::Orders, "nope").await,
			Err(StorageError::NotFound)
		));
		assert_eq!(
			storage
				.delete_where(Collection::Orders, &Filter::new())
				.await
				.unwrap(),
			0
		);
	}

	#[tokio::test]
	async fn test_duplicate_insert_rejected() {
		let storage = MemoryStorage::new();
		storage
			.insert(Collection::StatusTrack, "t", json!({"id": "t"}))
			.await
			.unwrap();
		assert!(matches!(
			storage
				.insert(Collection::StatusTrack, "t", json!({"id": "t"}))
				.await,
			Err(StorageError::Duplicate(_))
		));
	}

	#[tokio::test]
	async fn test_factory_rejects_non_table_config() {
		assert!(create_storage(&toml::Value::Integer(1)).is_err());
		assert!(create_storage(&toml::Value::Table(toml::map::Map::new())).is_ok());
	}
}
