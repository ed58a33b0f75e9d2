//! MongoDB storage backend implementation.
//!
//! This is the persistent document-store adapter. Documents keep their field
//! names; only the `id` field is stored as Mongo's `_id`. The client connects
//! lazily on first use so the factory can stay synchronous.

use crate::{
	Condition, Fields, Filter, StorageError, StorageFactory, StorageInterface, StorageRegistry,
};
use async_trait::async_trait;
use bson::{doc, Bson, Document};
use futures::TryStreamExt;
use ::mongodb::error::{ErrorKind, WriteFailure};
use order_types::{
	fields, Collection, ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, SchemaError,
};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::OnceCell;

const MONGO_ID: &str = "_id";

/// Connection settings for the document store.
#[derive(Debug, Clone)]
pub struct MongoSettings {
	pub uri: String,
	pub database: String,
	/// Collection names, overriding the defaults from [`Collection::as_str`].
	pub collections: HashMap<Collection, String>,
}

/// MongoDB-backed storage implementation.
pub struct MongoStorage {
	settings: MongoSettings,
	client: OnceCell<::mongodb::Client>,
}

impl MongoStorage {
	pub fn new(settings: MongoSettings) -> Self {
		Self {
			settings,
			client: OnceCell::new(),
		}
	}

	fn collection_name(&self, collection: Collection) -> &str {
		self.settings
			.collections
			.get(&collection)
			.map(String::as_str)
			.unwrap_or_else(|| collection.as_str())
	}

	async fn collection(
		&self,
		collection: Collection,
	) -> Result<::mongodb::Collection<Document>, StorageError> {
		let client = self
			.client
			.get_or_try_init(|| async {
				tracing::info!(database = %self.settings.database, "Connecting to MongoDB");
				::mongodb::Client::with_uri_str(&self.settings.uri)
					.await
					.map_err(|e| StorageError::Backend(e.to_string()))
			})
			.await?;
		Ok(client
			.database(&self.settings.database)
			.collection::<Document>(self.collection_name(collection)))
	}
}

/// Maps a document field name to its stored name.
fn stored_field(field: &str) -> &str {
	if field == fields::ID {
		MONGO_ID
	} else {
		field
	}
}

fn to_bson(value: Value) -> Result<Bson, StorageError> {
	bson::to_bson(&value).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Converts a JSON document into a BSON document, moving `id` to `_id`.
fn to_document(value: Value) -> Result<Document, StorageError> {
	match to_bson(value)? {
		Bson::Document(mut document) => {
			if let Some(id) = document.remove(fields::ID) {
				document.insert(MONGO_ID, id);
			}
			Ok(document)
		},
		other => Err(StorageError::Serialization(format!(
			"expected a document, got {:?}",
			other.element_type()
		))),
	}
}

/// Converts a stored BSON document back into JSON, moving `_id` to `id`.
fn from_document(mut document: Document) -> Value {
	if let Some(id) = document.remove(MONGO_ID) {
		document.insert(fields::ID, id);
	}
	Bson::Document(document).into_relaxed_extjson()
}

fn filter_document(filter: &Filter) -> Result<Document, StorageError> {
	let mut query = Document::new();
	for condition in filter.conditions() {
		let field = stored_field(condition.field()).to_string();
		match condition {
			Condition::Eq { value, .. } => {
				query.insert(field, to_bson(value.clone())?);
			},
			Condition::In { values, .. } => {
				let values = values
					.iter()
					.cloned()
					.map(to_bson)
					.collect::<Result<Vec<_>, _>>()?;
				query.insert(field, doc! { "$in": values });
			},
		}
	}
	Ok(query)
}

/// Selects the document with `id` only while it also matches `guard`.
fn guarded_query(id: &str, guard: &Filter) -> Result<Document, StorageError> {
	let mut query = filter_document(guard)?;
	query.insert(MONGO_ID, id);
	Ok(query)
}

/// Server error code for a unique index violation.
const DUPLICATE_KEY: i32 = 11000;

fn write_error_code(error: &::mongodb::error::Error) -> Option<i32> {
	match error.kind.as_ref() {
		ErrorKind::Write(WriteFailure::WriteError(write_error)) => Some(write_error.code),
		_ => None,
	}
}

/// Maps a failed insert to the error the other backends report for it.
fn insert_error(code: Option<i32>, id: &str, message: String) -> StorageError {
	match code {
		Some(DUPLICATE_KEY) => StorageError::Duplicate(id.to_string()),
		_ => StorageError::Backend(message),
	}
}

#[async_trait]
impl StorageInterface for MongoStorage {
	async fn insert(
		&self,
		collection: Collection,
		id: &str,
		document: Value,
	) -> Result<(), StorageError> {
		let document = to_document(document)?;
		self.collection(collection)
			.await?
			.insert_one(document, None)
			.await
			.map_err(|e| {
				tracing::warn!(collection = collection.as_str(), id, error = %e, "Insert failed");
				insert_error(write_error_code(&e), id, e.to_string())
			})?;
		Ok(())
	}

	async fn find_by_id(&self, collection: Collection, id: &str) -> Result<Value, StorageError> {
		self.collection(collection)
			.await?
			.find_one(doc! { "_id": id }, None)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?
			.map(from_document)
			.ok_or(StorageError::NotFound)
	}

	async fn find(
		&self,
		collection: Collection,
		filter: &Filter,
	) -> Result<Vec<Value>, StorageError> {
		let cursor = self
			.collection(collection)
			.await?
			.find(filter_document(filter)?, None)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		let documents: Vec<Document> = cursor
			.try_collect()
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		Ok(documents.into_iter().map(from_document).collect())
	}

	async fn update_fields_where(
		&self,
		collection: Collection,
		id: &str,
		guard: &Filter,
		fields: &Fields,
	) -> Result<(), StorageError> {
		let update = to_document(Value::Object(fields.clone()))?;
		let query = guarded_query(id, guard)?;
		let result = self
			.collection(collection)
			.await?
			.update_one(query, doc! { "$set": update }, None)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		if result.matched_count == 0 {
			return Err(StorageError::NotFound);
		}
		Ok(())
	}

	async fn delete_by_id(&self, collection: Collection, id: &str) -> Result<(), StorageError> {
		let result = self
			.collection(collection)
			.await?
			.delete_one(doc! { "_id": id }, None)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		if result.deleted_count == 0 {
			return Err(StorageError::NotFound);
		}
		Ok(())
	}

	async fn delete_where(
		&self,
		collection: Collection,
		filter: &Filter,
	) -> Result<usize, StorageError> {
		let result = self
			.collection(collection)
			.await?
			.delete_many(filter_document(filter)?, None)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		Ok(result.deleted_count as usize)
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MongoStorageSchema)
	}
}

/// Configuration key holding the name of a collection.
fn collection_key(collection: Collection) -> String {
	format!("{}_collection", collection.as_str())
}

/// Configuration schema for MongoStorage.
pub struct MongoStorageSchema;

impl ConfigSchema for MongoStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), SchemaError> {
		let non_empty = |v: &toml::Value| match v.as_str() {
			Some(s) if !s.trim().is_empty() => Ok(()),
			_ => Err("cannot be empty".to_string()),
		};

		let required = vec![
			Field::new("uri", FieldType::String).with_validator(|v| match v.as_str() {
				Some(s) if s.starts_with("mongodb://") || s.starts_with("mongodb+srv://") => Ok(()),
				_ => Err("must start with mongodb:// or mongodb+srv://".to_string()),
			}),
			Field::new("database", FieldType::String).with_validator(non_empty),
		];
		let optional = Collection::all()
			.map(|c| Field::new(collection_key(c), FieldType::String).with_validator(non_empty))
			.collect();

		Schema::new(required, optional).validate(config)
	}
}

/// Factory function to create a MongoDB storage backend from configuration.
///
/// Configuration parameters:
/// - `uri`: connection string (required)
/// - `database`: database name (required)
/// - `orders_collection`, `order_carts_collection`, `order_track_collection`,
///   `order_history_collection`: collection name overrides
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	MongoStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let get = |key: &str| config.get(key).and_then(|v| v.as_str()).map(str::to_string);
	let uri = get("uri").ok_or_else(|| StorageError::Configuration("uri is required".into()))?;
	let database =
		get("database").ok_or_else(|| StorageError::Configuration("database is required".into()))?;
	let collections = Collection::all()
		.filter_map(|c| get(&collection_key(c)).map(|name| (c, name)))
		.collect();

	Ok(Box::new(MongoStorage::new(MongoSettings {
		uri,
		database,
		collections,
	})))
}

/// Registry for the MongoDB storage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "mongodb";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}
