//! HTTP inventory backend.
//!
//! Calls the product service's stock endpoint with a `PUT` request whose
//! parameters travel in the query string:
//! `<endpoint>?tag=<increase|decrease>&number=<quantity>&product_id=<hex>`.

use crate::{
	InventoryError, InventoryFactory, InventoryInterface, InventoryRegistry, StockAdjustment,
};
use async_trait::async_trait;
use order_types::{ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, SchemaError};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

/// Inventory backend talking to the product service over HTTP.
pub struct HttpInventory {
	client: Client,
	endpoint: String,
}

impl HttpInventory {
	pub fn new(endpoint: String, timeout: Duration) -> Result<Self, InventoryError> {
		let client = Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| InventoryError::Configuration(format!("Failed to build client: {}", e)))?;
		Ok(Self { client, endpoint })
	}
}

#[async_trait]
impl InventoryInterface for HttpInventory {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(HttpInventorySchema)
	}

	async fn adjust(&self, adjustment: &StockAdjustment) -> Result<(), InventoryError> {
		let number = adjustment.quantity.to_string();
		let product_id = adjustment.product_id.to_hex();
		let response = self
			.client
			.put(&self.endpoint)
			.query(&[
				("tag", adjustment.direction.as_str()),
				("number", number.as_str()),
				("product_id", product_id.as_str()),
			])
			.header(CONTENT_TYPE, "application/json")
			.send()
			.await
			.map_err(|e| InventoryError::Network(e.to_string()))?;

		let status = response.status();
		if status.is_success() {
			return Ok(());
		}
		let body = response.text().await.unwrap_or_default();
		Err(InventoryError::Rejected {
			status: status.as_u16(),
			body,
		})
	}
}

/// Configuration schema for HttpInventory.
pub struct HttpInventorySchema;

impl ConfigSchema for HttpInventorySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), SchemaError> {
		let schema = Schema::new(
			vec![Field::new("endpoint", FieldType::String).with_validator(|v| {
				match v.as_str() {
					Some(s) if s.starts_with("http://") || s.starts_with("https://") => Ok(()),
					_ => Err("must be an http(s) URL".to_string()),
				}
			})],
			vec![Field::new(
				"timeout_seconds",
				FieldType::Integer {
					min: Some(1),
					max: Some(300),
				},
			)],
		);
		schema.validate(config)
	}
}

/// Factory function to create an HTTP inventory backend from configuration.
///
/// Configuration parameters:
/// - `endpoint`: URL of the product service stock endpoint (required)
/// - `timeout_seconds`: request timeout (optional, default: 10)
pub fn create_inventory(
	config: &toml::Value,
) -> Result<Box<dyn InventoryInterface>, InventoryError> {
	HttpInventorySchema
		.validate(config)
		.map_err(|e| InventoryError::Configuration(e.to_string()))?;

	let endpoint = config
		.get("endpoint")
		.and_then(|v| v.as_str())
		.ok_or_else(|| InventoryError::Configuration("endpoint is required".to_string()))?
		.to_string();
	let timeout = config
		.get("timeout_seconds")
		.and_then(|v| v.as_integer())
		.map(|t| t as u64)
		.unwrap_or(DEFAULT_TIMEOUT_SECONDS);

	Ok(Box::new(HttpInventory::new(
		endpoint,
		Duration::from_secs(timeout),
	)?))
}

/// Registry for the HTTP inventory implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "http";
	type Factory = InventoryFactory;

	fn factory() -> Self::Factory {
		create_inventory
	}
}

impl InventoryRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::AdjustDirection;
	use axum::extract::Query;
	use axum::http::{HeaderMap, StatusCode};
	use axum::routing::put;
	use axum::Router;
	use order_types::ObjectId;
	use std::collections::HashMap;
	use std::sync::{Arc, Mutex};

	type Seen = Arc<Mutex<Vec<(HashMap<String, String>, Option<String>)>>>;

	/// Starts a stub product service answering every PUT with `status`.
	async fn stub_server(status: StatusCode) -> (String, Seen) {
		let seen: Seen = Arc::default();
		let recorded = seen.clone();
		let app = Router::new().route(
			"/products/stock",
			put(
				move |Query(params): Query<HashMap<String, String>>, headers: HeaderMap| {
					let recorded = recorded.clone();
					async move {
						let content_type = headers
							.get("content-type")
							.and_then(|v| v.to_str().ok())
							.map(str::to_string);
						recorded.lock().unwrap().push((params, content_type));
						(status, "stub says no")
					}
				},
			),
		);
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			axum::serve(listener, app).await.unwrap();
		});
		(format!("http://{}/products/stock", addr), seen)
	}

	fn adjustment(direction: AdjustDirection) -> StockAdjustment {
		StockAdjustment {
			product_id: ObjectId::parse("64b7f0c2a1b2c3d4e5f60718").unwrap(),
			direction,
			quantity: 4,
		}
	}

	#[tokio::test]
	async fn test_adjust_sends_query_parameters() {
		let (endpoint, seen) = stub_server(StatusCode::OK).await;
		let inventory = HttpInventory::new(endpoint, Duration::from_secs(5)).unwrap();

		inventory
			.adjust(&adjustment(AdjustDirection::Decrease))
			.await
			.unwrap();

		let seen = seen.lock().unwrap();
		assert_eq!(seen.len(), 1);
		let (params, content_type) = &seen[0];
		assert_eq!(params["tag"], "decrease");
		assert_eq!(params["number"], "4");
		assert_eq!(params["product_id"], "64b7f0c2a1b2c3d4e5f60718");
		assert_eq!(content_type.as_deref(), Some("application/json"));
	}

	#[tokio::test]
	async fn test_non_success_status_is_rejected() {
		let (endpoint, _) = stub_server(StatusCode::CONFLICT).await;
		let inventory = HttpInventory::new(endpoint, Duration::from_secs(5)).unwrap();

		let err = inventory
			.adjust(&adjustment(AdjustDirection::Increase))
			.await
			.unwrap_err();
		match err {
			InventoryError::Rejected { status, body } => {
				assert_eq!(status, 409);
				assert_eq!(body, "stub says no");
			},
			other => panic!("unexpected error: {other:?}"),
		}
	}

	#[tokio::test]
	async fn test_unreachable_service_is_network_error() {
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		drop(listener);

		let inventory =
			HttpInventory::new(format!("http://{}/stock", addr), Duration::from_secs(2)).unwrap();
		let err = inventory
			.adjust(&adjustment(AdjustDirection::Decrease))
			.await
			.unwrap_err();
		assert!(matches!(err, InventoryError::Network(_)));
	}

	#[test]
	fn test_factory_validates_config() {
		let config: toml::Value = toml::from_str("endpoint = \"http://localhost:8080/stock\"").unwrap();
		assert!(create_inventory(&config).is_ok());

		let config: toml::Value = toml::from_str("endpoint = \"localhost\"").unwrap();
		assert!(create_inventory(&config).is_err());

		let config: toml::Value =
			toml::from_str("endpoint = \"http://localhost\"\ntimeout_seconds = 0").unwrap();
		assert!(create_inventory(&config).is_err());
	}
}
