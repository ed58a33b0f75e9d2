//! Shared fixtures for the engine integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use order_core::OrderEngine;
use order_inventory::implementations::memory::MemoryInventory;
use order_inventory::{InventoryError, InventoryInterface, InventoryService, StockAdjustment};
use order_storage::implementations::file::FileStorage;
use order_storage::implementations::memory::MemoryStorage;
use order_storage::{Fields, Filter, StorageError, StorageInterface, StorageService};
use order_types::{
	CartEntry, Collection, ConfigSchema, CreateOrder, HistoryRecord, ObjectId, Order, TrackEntry,
};
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// An engine plus handles to observe what it wrote.
pub struct Harness {
	pub name: &'static str,
	pub engine: OrderEngine,
	pub inventory: MemoryInventory,
	/// Second view onto the same documents the engine writes.
	pub storage: StorageService,
	_dir: Option<TempDir>,
}

impl Harness {
	pub fn memory() -> Self {
		let backend = MemoryStorage::new();
		Self::assemble("memory", Box::new(backend.clone()), Box::new(backend), None)
	}

	pub fn file() -> Self {
		let dir = TempDir::new().unwrap();
		let path = dir.path().to_path_buf();
		Self::assemble(
			"file",
			Box::new(FileStorage::new(path.clone())),
			Box::new(FileStorage::new(path)),
			Some(dir),
		)
	}

	/// One harness per backend that must behave identically.
	pub fn all() -> Vec<Self> {
		vec![Self::memory(), Self::file()]
	}

	/// Engine over an arbitrary backend, observed through `view`.
	pub fn with_backend(
		backend: Box<dyn StorageInterface>,
		view: Box<dyn StorageInterface>,
		inventory: Box<dyn InventoryInterface>,
	) -> Self {
		let engine = OrderEngine::new(
			Arc::new(StorageService::new(backend)),
			Arc::new(InventoryService::new(inventory)),
		);
		Self {
			name: "custom",
			engine,
			inventory: MemoryInventory::new(),
			storage: StorageService::new(view),
			_dir: None,
		}
	}

	fn assemble(
		name: &'static str,
		backend: Box<dyn StorageInterface>,
		view: Box<dyn StorageInterface>,
		dir: Option<TempDir>,
	) -> Self {
		let inventory = MemoryInventory::new();
		let engine = OrderEngine::new(
			Arc::new(StorageService::new(backend)),
			Arc::new(InventoryService::new(Box::new(inventory.clone()))),
		);
		Self {
			name,
			engine,
			inventory,
			storage: StorageService::new(view),
			_dir: dir,
		}
	}

	pub async fn orders(&self) -> Vec<Order> {
		self.storage.find(&Filter::new()).await.unwrap()
	}

	pub async fn carts(&self) -> Vec<CartEntry> {
		self.storage.find(&Filter::new()).await.unwrap()
	}

	pub async fn track(&self) -> Vec<TrackEntry> {
		self.storage.find(&Filter::new()).await.unwrap()
	}

	pub async fn history(&self) -> Vec<HistoryRecord> {
		self.storage.find(&Filter::new()).await.unwrap()
	}

	/// Total number of documents across all collections.
	pub async fn document_count(&self) -> usize {
		self.orders().await.len()
			+ self.carts().await.len()
			+ self.track().await.len()
			+ self.history().await.len()
	}
}

pub fn create_order(quantity: i64) -> CreateOrder {
	CreateOrder {
		product_id: "64b7f0c2a1b2c3d4e5f60718".into(),
		category: "electronics".into(),
		selling_id: "64b7f0c2a1b2c3d4e5f60719".into(),
		quantity,
		price: Decimal::new(1999, 2),
		user_id: "64b7f0c2a1b2c3d4e5f6071a".into(),
	}
}

pub fn product_id() -> ObjectId {
	ObjectId::parse("64b7f0c2a1b2c3d4e5f60718").unwrap()
}

/// Storage operations a [`FaultyStorage`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
	Insert,
	FindById,
	Find,
	Update,
	DeleteById,
	DeleteWhere,
}

/// Memory storage that fails selected operations on selected collections.
#[derive(Clone, Default)]
pub struct FaultyStorage {
	inner: MemoryStorage,
	faults: Arc<Mutex<HashSet<(Op, Collection)>>>,
	delay: Option<Duration>,
}

impl FaultyStorage {
	pub fn new() -> Self {
		Self::default()
	}

	/// Every call sleeps this long before reaching the store.
	pub fn with_delay(delay: Duration) -> Self {
		Self {
			delay: Some(delay),
			..Self::default()
		}
	}

	pub fn fail(&self, op: Op, collection: Collection) {
		self.faults.lock().unwrap().insert((op, collection));
	}

	pub fn heal(&self) {
		self.faults.lock().unwrap().clear();
	}

	/// Unfaulted view of the stored documents.
	pub fn view(&self) -> MemoryStorage {
		self.inner.clone()
	}

	async fn check(&self, op: Op, collection: Collection) -> Result<(), StorageError> {
		if let Some(delay) = self.delay {
			tokio::time::sleep(delay).await;
		}
		if self.faults.lock().unwrap().contains(&(op, collection)) {
			return Err(StorageError::Backend(format!(
				"injected {:?} failure on {}",
				op,
				collection.as_str()
			)));
		}
		Ok(())
	}
}

#[async_trait]
impl StorageInterface for FaultyStorage {
	async fn insert(
		&self,
		collection: Collection,
		id: &str,
		document: Value,
	) -> Result<(), StorageError> {
		self.check(Op::Insert, collection).await?;
		self.inner.insert(collection, id, document).await
	}

	async fn find_by_id(&self, collection: Collection, id: &str) -> Result<Value, StorageError> {
		self.check(Op::FindById, collection).await?;
		self.inner.find_by_id(collection, id).await
	}

	async fn find(
		&self,
		collection: Collection,
		filter: &Filter,
	) -> Result<Vec<Value>, StorageError> {
		self.check(Op::Find, collection).await?;
		self.inner.find(collection, filter).await
	}

	async fn update_fields_where(
		&self,
		collection: Collection,
		id: &str,
		guard: &Filter,
		fields: &Fields,
	) -> Result<(), StorageError> {
		self.check(Op::Update, collection).await?;
		self.inner
			.update_fields_where(collection, id, guard, fields)
			.await
	}

	async fn delete_by_id(&self, collection: Collection, id: &str) -> Result<(), StorageError> {
		self.check(Op::DeleteById, collection).await?;
		self.inner.delete_by_id(collection, id).await
	}

	async fn delete_where(
		&self,
		collection: Collection,
		filter: &Filter,
	) -> Result<usize, StorageError> {
		self.check(Op::DeleteWhere, collection).await?;
		self.inner.delete_where(collection, filter).await
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		self.inner.config_schema()
	}
}

/// Inventory backend that rejects every adjustment.
pub struct RejectingInventory;

#[async_trait]
impl InventoryInterface for RejectingInventory {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		MemoryInventory::new().config_schema()
	}

	async fn adjust(&self, _adjustment: &StockAdjustment) -> Result<(), InventoryError> {
		Err(InventoryError::Rejected {
			status: 503,
			body: "stock service unavailable".into(),
		})
	}
}
