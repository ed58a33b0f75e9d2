//! Storage module for the order lifecycle system.
//!
//! This module provides the storage port the lifecycle engine is written
//! against: four logical collections, each supporting insert, lookup by id,
//! lookup by filter, partial update and deletion. Backends implement the
//! untyped [`StorageInterface`] over JSON documents; the engine talks to the
//! typed [`StorageService`] wrapper, which also bounds every call with a
//! timeout.

use async_trait::async_trait;
use order_types::{Collection, ConfigSchema, Document, ImplementationRegistry, ObjectId};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

mod filter;

pub use filter::{Condition, Filter};

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
	pub mod mongo;
}

/// Fields of a partial update, applied with `$set` semantics.
pub type Fields = serde_json::Map<String, Value>;

/// Ceiling applied to each storage call unless configured otherwise.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// No document matched the id.
	#[error("Not found")]
	NotFound,
	/// A document with the same id already exists.
	#[error("Duplicate id: {0}")]
	Duplicate(String),
	/// The partial update was rejected before reaching the backend.
	#[error("Invalid update: {0}")]
	InvalidUpdate(String),
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// The backend did not answer within the operation timeout.
	#[error("Storage operation '{operation}' on {collection} timed out after {timeout:?}")]
	Timeout {
		operation: &'static str,
		collection: &'static str,
		timeout: Duration,
	},
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the low-level interface for storage backends.
///
/// Every backend must give the same observable results for the same sequence
/// of calls. In particular, lookups, updates and single deletes of a missing
/// id return [`StorageError::NotFound`] rather than an empty value.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Stores a new document under `id`.
	async fn insert(
		&self,
		collection: Collection,
		id: &str,
		document: Value,
	) -> Result<(), StorageError>;

	/// Retrieves the document with the given id.
	async fn find_by_id(&self, collection: Collection, id: &str) -> Result<Value, StorageError>;

	/// Retrieves every document matching the filter.
	async fn find(&self, collection: Collection, filter: &Filter)
		-> Result<Vec<Value>, StorageError>;

	/// Overwrites the given top-level fields of one document if it also
	/// matches `guard`.
	///
	/// The guard check and the write happen as one step, so of two callers
	/// guarding on the same field value only the first one succeeds. Returns
	/// [`StorageError::NotFound`] when no document with the id matches the
	/// guard. An empty guard makes the update unconditional.
	async fn update_fields_where(
		&self,
		collection: Collection,
		id: &str,
		guard: &Filter,
		fields: &Fields,
	) -> Result<(), StorageError>;

	/// Deletes the document with the given id.
	async fn delete_by_id(&self, collection: Collection, id: &str) -> Result<(), StorageError>;

	/// Deletes every document matching the filter and returns how many were removed.
	async fn delete_where(
		&self,
		collection: Collection,
		filter: &Filter,
	) -> Result<usize, StorageError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Type alias for storage factory functions.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

/// Registry trait for storage implementations.
pub trait StorageRegistry: ImplementationRegistry<Factory = StorageFactory> {}

/// Get all registered storage implementations.
///
/// Returns a vector of (name, factory) tuples for all available storage implementations.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory, mongo};

	vec![
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
		(mongo::Registry::NAME, mongo::Registry::factory()),
	]
}

/// High-level storage service that provides typed operations.
///
/// Wraps a backend, converts documents to and from JSON, and applies the
/// per-operation timeout. No call spans more than one backend operation, so
/// there is no atomicity across collections.
pub struct StorageService {
	/// The underlying storage backend implementation.
	backend: Box<dyn StorageInterface>,
	/// Ceiling for each backend call.
	timeout: Duration,
}

impl StorageService {
	/// Creates a new StorageService with the default operation timeout.
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self::with_timeout(backend, DEFAULT_OPERATION_TIMEOUT)
	}

	pub fn with_timeout(backend: Box<dyn StorageInterface>, timeout: Duration) -> Self {
		Self { backend, timeout }
	}

	pub fn timeout(&self) -> Duration {
		self.timeout
	}

	async fn bounded<T, F>(
		&self,
		operation: &'static str,
		collection: Collection,
		call: F,
	) -> Result<T, StorageError>
	where
		F: Future<Output = Result<T, StorageError>>,
	{
		match tokio::time::timeout(self.timeout, call).await {
			Ok(result) => result,
			Err(_) => {
				tracing::warn!(
					operation,
					collection = collection.as_str(),
					"Storage operation timed out"
				);
				Err(StorageError::Timeout {
					operation,
					collection: collection.as_str(),
					timeout: self.timeout,
				})
			},
		}
	}

	/// Inserts a document and returns its id.
	///
	/// Documents carry their id from construction; the backend never assigns one.
	pub async fn insert<T: Document>(&self, document: &T) -> Result<ObjectId, StorageError> {
		let id = document.id();
		let value =
			serde_json::to_value(document).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.bounded(
			"insert",
			T::COLLECTION,
			self.backend.insert(T::COLLECTION, &id.to_hex(), value),
		)
		.await?;
		Ok(id)
	}

	/// Retrieves a document by id, or [`StorageError::NotFound`].
	pub async fn find_by_id<T: Document>(&self, id: ObjectId) -> Result<T, StorageError> {
		let value = self
			.bounded(
				"find_by_id",
				T::COLLECTION,
				self.backend.find_by_id(T::COLLECTION, &id.to_hex()),
			)
			.await?;
		serde_json::from_value(value).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Retrieves every document matching the filter.
	pub async fn find<T: Document>(&self, filter: &Filter) -> Result<Vec<T>, StorageError> {
		let values = self
			.bounded(
				"find",
				T::COLLECTION,
				self.backend.find(T::COLLECTION, filter),
			)
			.await?;
		values
			.into_iter()
			.map(|v| serde_json::from_value(v).map_err(|e| StorageError::Serialization(e.to_string())))
			.collect()
	}

	/// Overwrites the given fields of one document.
	///
	/// Fails with [`StorageError::NotFound`] when no document has the id; a
	/// missing document is never treated as a successful no-op.
	pub async fn update_fields<T: Document>(
		&self,
		id: ObjectId,
		fields: Fields,
	) -> Result<(), StorageError> {
		self.update_fields_where::<T>(id, &Filter::new(), fields).await
	}

	/// Overwrites the given fields of one document only while it matches
	/// `guard`, e.g. while its status is still the one the caller read.
	///
	/// Fails with [`StorageError::NotFound`] when the document is missing or
	/// no longer matches the guard.
	pub async fn update_fields_where<T: Document>(
		&self,
		id: ObjectId,
		guard: &Filter,
		fields: Fields,
	) -> Result<(), StorageError> {
		if fields.is_empty() {
			return Err(StorageError::InvalidUpdate("no fields to update".into()));
		}
		if fields.contains_key(order_types::fields::ID) {
			return Err(StorageError::InvalidUpdate("id is immutable".into()));
		}
		self.bounded(
			"update_fields",
			T::COLLECTION,
			self.backend
				.update_fields_where(T::COLLECTION, &id.to_hex(), guard, &fields),
		)
		.await
	}

	/// Deletes one document, or fails with [`StorageError::NotFound`].
	pub async fn delete_by_id<T: Document>(&self, id: ObjectId) -> Result<(), StorageError> {
		self.bounded(
			"delete_by_id",
			T::COLLECTION,
			self.backend.delete_by_id(T::COLLECTION, &id.to_hex()),
		)
		.await
	}

	/// Deletes every listed document. Missing ids are skipped silently.
	pub async fn delete_by_ids<T: Document>(&self, ids: &[ObjectId]) -> Result<usize, StorageError> {
		if ids.is_empty() {
			return Ok(0);
		}
		let filter = Filter::new().any_of(order_types::fields::ID, ids.iter().copied());
		self.delete_where::<T>(&filter).await
	}

	/// Deletes every document matching the filter.
	pub async fn delete_where<T: Document>(&self, filter: &Filter) -> Result<usize, StorageError> {
		self.bounded(
			"delete_where",
			T::COLLECTION,
			self.backend.delete_where(T::COLLECTION, filter),
		)
		.await
	}

	/// Whether any document matches the filter.
	pub async fn exists<T: Document>(&self, filter: &Filter) -> Result<bool, StorageError> {
		Ok(!self.find::<T>(filter).await?.is_empty())
	}
}
