//! File-based storage backend implementation.
//!
//! Each collection is a directory under the configured base path and each
//! document is one JSON file named after its id. Writes go through a temp file
//! and a rename so a crash never leaves a half-written document behind.

use crate::{Fields, Filter, StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use order_types::{
	Collection, ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, SchemaError,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

const EXTENSION: &str = "json";

/// File-based storage implementation.
///
/// Read-modify-write sequences (update, delete by filter) are serialized by a
/// process-wide lock; reads go straight to the filesystem.
pub struct FileStorage {
	/// Base directory path for storing collections.
	base_path: PathBuf,
	write_lock: Mutex<()>,
}

impl FileStorage {
	/// Creates a new FileStorage instance rooted at `base_path`.
	pub fn new(base_path: PathBuf) -> Self {
		Self {
			base_path,
			write_lock: Mutex::new(()),
		}
	}

	fn collection_dir(&self, collection: Collection) -> PathBuf {
		self.base_path.join(collection.as_str())
	}

	/// Converts a document id to a filesystem-safe file path.
	fn document_path(&self, collection: Collection, id: &str) -> PathBuf {
		let safe_id = id.replace(['/', '\\', ':', '.'], "_");
		self.collection_dir(collection)
			.join(format!("{}.{}", safe_id, EXTENSION))
	}

	async fn read_document(path: &Path) -> Result<Value, StorageError> {
		let data = match fs::read(path).await {
			Ok(data) => data,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				return Err(StorageError::NotFound)
			},
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		};
		serde_json::from_slice(&data).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	async fn write_document(path: &Path, document: &Value) -> Result<(), StorageError> {
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| StorageError::Backend(e.to_string()))?;
		}

		let bytes =
			serde_json::to_vec(document).map_err(|e| StorageError::Serialization(e.to_string()))?;

		// Write atomically by writing to temp file then renaming
		let temp_path = path.with_extension("tmp");
		fs::write(&temp_path, bytes)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		fs::rename(&temp_path, path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))
	}

	/// Loads every document of a collection, ordered by file name.
	async fn scan(&self, collection: Collection) -> Result<Vec<(PathBuf, Value)>, StorageError> {
		let dir = self.collection_dir(collection);
		let mut entries = match fs::read_dir(&dir).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		};

		let mut paths = Vec::new();
		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?
		{
			let path = entry.path();
			if path.extension() == Some(std::ffi::OsStr::new(EXTENSION)) {
				paths.push(path);
			}
		}
		paths.sort();

		let mut documents = Vec::with_capacity(paths.len());
		for path in paths {
			match Self::read_document(&path).await {
				Ok(doc) => documents.push((path, doc)),
				// Removed between listing and reading
				Err(StorageError::NotFound) => continue,
				Err(e) => return Err(e),
			}
		}
		Ok(documents)
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn insert(
		&self,
		collection: Collection,
		id: &str,
		document: Value,
	) -> Result<(), StorageError> {
		let path = self.document_path(collection, id);
		let _guard = self.write_lock.lock().await;
		if fs::try_exists(&path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?
		{
			return Err(StorageError::Duplicate(id.to_string()));
		}
		Self::write_document(&path, &document).await
	}

	async fn find_by_id(&self, collection: Collection, id: &str) -> Result<Value, StorageError> {
		Self::read_document(&self.document_path(collection, id)).await
	}

	async fn find(
		&self,
		collection: Collection,
		filter: &Filter,
	) -> Result<Vec<Value>, StorageError> {
		Ok(self
			.scan(collection)
			.await?
			.into_iter()
			.map(|(_, doc)| doc)
			.filter(|doc| filter.matches(doc))
			.collect())
	}

	async fn update_fields_where(
		&self,
		collection: Collection,
		id: &str,
		guard: &Filter,
		fields: &Fields,
	) -> Result<(), StorageError> {
		let path = self.document_path(collection, id);
		let _lock = self.write_lock.lock().await;
		let mut document = Self::read_document(&path).await?;
		if !guard.matches(&document) {
			return Err(StorageError::NotFound);
		}
		let object = document
			.as_object_mut()
			.ok_or_else(|| StorageError::Backend(format!("document {} is not an object", id)))?;
		for (key, value) in fields {
			object.insert(key.clone(), value.clone());
		}
		Self::write_document(&path, &document).await
	}

	async fn delete_by_id(&self, collection: Collection, id: &str) -> Result<(), StorageError> {
		let path = self.document_path(collection, id);
		let _guard = self.write_lock.lock().await;
		match fs::remove_file(&path).await {
			Ok(_) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn delete_where(
		&self,
		collection: Collection,
		filter: &Filter,
	) -> Result<usize, StorageError> {
		let _guard = self.write_lock.lock().await;
		let mut removed = 0;
		for (path, doc) in self.scan(collection).await? {
			if !filter.matches(&doc) {
				continue;
			}
			match fs::remove_file(&path).await {
				Ok(_) => removed += 1,
				Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
				Err(e) => {
					tracing::warn!("Failed to remove document {:?}: {}", path, e);
					return Err(StorageError::Backend(e.to_string()));
				},
			}
		}
		Ok(removed)
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStorageSchema)
	}
}

/// Configuration schema for FileStorage.
pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), SchemaError> {
		let schema = Schema::new(
			vec![],
			vec![Field::new("storage_path", FieldType::String).with_validator(|v| {
				match v.as_str() {
					Some(path) if !path.trim().is_empty() => Ok(()),
					_ => Err("storage_path cannot be empty".to_string()),
				}
			})],
		);
		schema.validate(config)
	}
}

/// Factory function to create a file storage backend from configuration.
///
/// Configuration parameters:
/// - `storage_path`: Base directory for file storage (default: "./data/orders")
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	FileStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or("./data/orders");

	Ok(Box::new(FileStorage::new(PathBuf::from(storage_path))))
}

/// Registry for the file storage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}
