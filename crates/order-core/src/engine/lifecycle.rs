//! Lifecycle operations of the order engine.
//!
//! Step order inside each operation is fixed and documented on the method,
//! together with what stays committed when a later step fails.

use super::{OrderEngine, OrderError};
use order_storage::StorageError;
use order_types::{
	parse_id, truncate_id, validate_quantity, CartEntry, CreateOrder, HistoryRecord, ObjectId,
	Order, OrderStatus, UpdateStatus,
};
use tracing::instrument;

impl OrderEngine {
	/// Places an order directly, bypassing the cart.
	///
	/// The order is stored as PLACED before the stock decrease is requested.
	/// When the inventory call fails the order stays recorded and the error is
	/// returned as [`OrderError::RemoteService`].
	#[instrument(skip_all, fields(product_id = %truncate_id(&request.product_id)))]
	pub async fn place_single_order(&self, request: &CreateOrder) -> Result<Order, OrderError> {
		let spec = request.validate()?;
		let order = Order::new(&spec, OrderStatus::Placed);

		self.orders
			.store_order(&order)
			.await
			.map_err(OrderError::Storage)?;
		tracing::info!(
			order_id = %truncate_id(&order.id.to_hex()),
			quantity = order.quantity,
			total_price = %order.total_price,
			"Order placed"
		);

		self.inventory
			.decrease(order.product_id, order.quantity)
			.await?;
		Ok(order)
	}

	/// Adds a new order to the user's cart.
	///
	/// Stores the CART order first and its cart entry second. A failure on the
	/// second insert leaves an order without a cart entry.
	#[instrument(skip_all, fields(user_id = %truncate_id(&request.user_id)))]
	pub async fn add_to_cart(&self, request: &CreateOrder) -> Result<(Order, CartEntry), OrderError> {
		let spec = request.validate()?;
		let order = Order::new(&spec, OrderStatus::Cart);
		let entry = CartEntry::for_order(&order);

		self.orders
			.store_order(&order)
			.await
			.map_err(OrderError::Storage)?;
		self.carts.add(&entry).await.map_err(OrderError::Storage)?;

		tracing::info!(order_id = %truncate_id(&order.id.to_hex()), "Order added to cart");
		Ok((order, entry))
	}

	/// Removes an order from the cart and deletes it.
	///
	/// The cart entry goes first, so an interruption leaves an orphaned order
	/// rather than a cart entry pointing at nothing. Removing an order that is
	/// already gone succeeds and clears any leftover cart entry. Orders that
	/// have left the cart, including ones checked out while this call runs,
	/// are rejected with [`OrderError::NotInCart`] and not deleted.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn remove_item_from_cart(&self, order_id: &str) -> Result<(), OrderError> {
		let id = parse_id("order_id", order_id)?;

		match self.orders.get_order(id).await {
			Ok(order) if order.status != OrderStatus::Cart => {
				return Err(OrderError::NotInCart {
					order_id: id,
					status: order.status,
				});
			},
			Ok(_) | Err(StorageError::NotFound) => {},
			Err(e) => return Err(OrderError::Storage(e)),
		}

		let removed = self
			.carts
			.remove_for_order(id)
			.await
			.map_err(OrderError::Storage)?;

		// Only a CART order is deleted; a checkout racing this call wins or
		// loses as a whole.
		if self
			.orders
			.delete_order_in_status(id, OrderStatus::Cart)
			.await
			.map_err(OrderError::Storage)?
		{
			tracing::info!(cart_entries = removed, "Order removed from cart");
			return Ok(());
		}

		match self.orders.get_order(id).await {
			Ok(order) => Err(OrderError::NotInCart {
				order_id: id,
				status: order.status,
			}),
			Err(StorageError::NotFound) => {
				tracing::debug!(cart_entries = removed, "Order already absent");
				Ok(())
			},
			Err(e) => Err(OrderError::Storage(e)),
		}
	}

	/// Moves an order to a new status.
	pub async fn update_order_status(&self, request: &UpdateStatus) -> Result<Order, OrderError> {
		let (order_id, status) = request.validate()?;
		self.transition(order_id, status).await
	}

	/// Checks the transition, writes the new status and appends a track entry.
	///
	/// Chained effects run after the track entry:
	/// - CART to PLACED removes the cart entry and decreases stock.
	/// - COMPLETED moves the order and its track into the history archive. A
	///   failure there is [`OrderError::Archival`]; the status change itself
	///   is already committed.
	#[instrument(skip_all, fields(order_id = %truncate_id(&order_id.to_hex()), status = %status))]
	pub(crate) async fn transition(
		&self,
		order_id: ObjectId,
		status: OrderStatus,
	) -> Result<Order, OrderError> {
		let change = self
			.orders
			.transition_order_status(order_id, status)
			.await
			.map_err(|e| match OrderError::from(e) {
				OrderError::Storage(StorageError::NotFound) => OrderError::NotFound {
					entity: "Order",
					id: order_id,
				},
				other => other,
			})?;

		self.track
			.append(order_id, status)
			.await
			.map_err(OrderError::Storage)?;
		tracing::info!(from = %change.from, "Order status changed");

		match (change.from, status) {
			(OrderStatus::Cart, OrderStatus::Placed) => {
				self.carts
					.remove_for_order(order_id)
					.await
					.map_err(OrderError::Storage)?;
				self.inventory
					.decrease(change.order.product_id, change.order.quantity)
					.await?;
			},
			(_, OrderStatus::Completed) => {
				self.create_order_history(order_id)
					.await
					.map_err(|e| OrderError::Archival {
						order_id,
						source: Box::new(e),
					})?;
			},
			_ => {},
		}

		Ok(change.order)
	}

	/// Cancels a placed or dispatched order and returns its stock.
	///
	/// The order is read first to recover product and quantity. When the status
	/// change fails nothing else happens. When the stock increase fails the order
	/// stays CANCELLED and the error is returned as [`OrderError::RemoteService`].
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn cancel_order(&self, order_id: &str) -> Result<Order, OrderError> {
		let id = parse_id("order_id", order_id)?;
		let order = self
			.orders
			.get_order(id)
			.await
			.map_err(OrderError::storage("Order", id))?;

		let cancelled = self.transition(id, OrderStatus::Cancelled).await?;

		self.inventory
			.increase(order.product_id, order.quantity)
			.await?;
		tracing::info!(quantity = order.quantity, "Order cancelled and stock returned");
		Ok(cancelled)
	}

	/// Changes the quantity of an order still in the cart.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn update_cart_quantity(
		&self,
		order_id: &str,
		quantity: i64,
	) -> Result<Order, OrderError> {
		let id = parse_id("order_id", order_id)?;
		let quantity = validate_quantity(quantity)?;

		let order = self
			.orders
			.get_order(id)
			.await
			.map_err(OrderError::storage("Order", id))?;
		if order.status != OrderStatus::Cart {
			return Err(OrderError::NotInCart {
				order_id: id,
				status: order.status,
			});
		}

		let order = match self.orders.update_quantity(order, quantity).await {
			Ok(order) => order,
			// Checked out or removed since the read above.
			Err(StorageError::NotFound) => {
				return Err(match self.orders.get_order(id).await {
					Ok(current) => OrderError::NotInCart {
						order_id: id,
						status: current.status,
					},
					Err(e) => OrderError::storage("Order", id)(e),
				})
			},
			Err(e) => return Err(OrderError::Storage(e)),
		};
		tracing::info!(quantity, total_price = %order.total_price, "Cart quantity updated");
		Ok(order)
	}

	/// Moves a completed order and its track into the history archive.
	///
	/// Nothing is deleted unless both reads and the archive insert succeed.
	/// When a delete fails afterwards, the history record and the remains of
	/// the active order coexist until cleaned up.
	async fn create_order_history(&self, order_id: ObjectId) -> Result<HistoryRecord, OrderError> {
		let order = self
			.orders
			.get_order(order_id)
			.await
			.map_err(OrderError::storage("Order", order_id))?;
		let track = self
			.track
			.for_order(order_id)
			.await
			.map_err(OrderError::Storage)?;

		let record = HistoryRecord::new(order, track);
		self.history
			.store(&record)
			.await
			.map_err(OrderError::Storage)?;

		self.orders
			.delete_order(order_id)
			.await
			.map_err(OrderError::storage("Order", order_id))?;
		let purged = self
			.track
			.purge(order_id)
			.await
			.map_err(OrderError::Storage)?;

		tracing::info!(
			history_id = %truncate_id(&record.id.to_hex()),
			track_entries = purged,
			"Order archived"
		);
		Ok(record)
	}
}
