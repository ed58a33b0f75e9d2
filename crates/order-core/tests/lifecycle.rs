//! Lifecycle behaviour that must hold on every storage backend.

mod common;

use common::{create_order, product_id, Harness};
use order_core::OrderError;
use order_inventory::AdjustDirection;
use order_types::{InputError, ObjectId, OrderStatus, UpdateStatus};
use rust_decimal::Decimal;

fn status(order_id: ObjectId, status: &str) -> UpdateStatus {
	UpdateStatus {
		order_id: order_id.to_hex(),
		status: status.into(),
	}
}

#[tokio::test]
async fn test_place_single_order() {
	for h in Harness::all() {
		for quantity in 1..=10 {
			let order = h
				.engine
				.place_single_order(&create_order(quantity))
				.await
				.unwrap();
			assert_eq!(order.status, OrderStatus::Placed, "{}", h.name);
			assert_eq!(
				order.total_price,
				Decimal::new(1999, 2) * Decimal::from(quantity)
			);
			assert_eq!(h.engine.get_order(&order.id.to_hex()).await.unwrap(), order);
		}

		let orders = h.orders().await;
		assert_eq!(orders.len(), 10, "{}", h.name);
		assert!(orders.iter().all(|o| o.status == OrderStatus::Placed));
		assert!(h.carts().await.is_empty());

		let adjustments = h.inventory.adjustments().await;
		assert_eq!(adjustments.len(), 10);
		assert!(adjustments
			.iter()
			.all(|a| a.direction == AdjustDirection::Decrease && a.product_id == product_id()));
		assert_eq!(h.inventory.net_delta(product_id()).await, -55);
	}
}

#[tokio::test]
async fn test_out_of_range_quantity_writes_nothing() {
	for h in Harness::all() {
		for quantity in [0, 11, -3] {
			let err = h
				.engine
				.place_single_order(&create_order(quantity))
				.await
				.unwrap_err();
			assert!(matches!(
				err,
				OrderError::Validation(InputError::QuantityOutOfRange { .. })
			));
			let err = h.engine.add_to_cart(&create_order(quantity)).await.unwrap_err();
			assert!(err.is_validation());
		}

		assert_eq!(h.document_count().await, 0, "{}", h.name);
		assert!(h.inventory.adjustments().await.is_empty());
	}
}

#[tokio::test]
async fn test_malformed_ids_are_rejected() {
	for h in Harness::all() {
		let mut request = create_order(1);
		request.selling_id = "not-an-id".into();
		let err = h.engine.add_to_cart(&request).await.unwrap_err();
		assert!(matches!(
			err,
			OrderError::Validation(InputError::InvalidId {
				field: "prod_selling_id",
				..
			})
		));

		let mut request = create_order(1);
		request.user_id = String::new();
		let err = h.engine.place_single_order(&request).await.unwrap_err();
		assert!(matches!(
			err,
			OrderError::Validation(InputError::MissingField("user_id"))
		));

		assert!(h.engine.remove_item_from_cart("xyz").await.unwrap_err().is_validation());
		assert!(h.engine.cancel_order("").await.unwrap_err().is_validation());
		assert_eq!(h.document_count().await, 0);
	}
}

#[tokio::test]
async fn test_add_to_cart_pairs_order_and_entry() {
	for h in Harness::all() {
		let (order, entry) = h.engine.add_to_cart(&create_order(3)).await.unwrap();

		let orders = h.orders().await;
		let carts = h.carts().await;
		assert_eq!(orders, vec![order.clone()], "{}", h.name);
		assert_eq!(carts, vec![entry.clone()]);
		assert_eq!(order.status, OrderStatus::Cart);
		assert_eq!(entry.order_id, order.id);
		assert_eq!(entry.user_id, order.user_id);
		assert_eq!(entry.status, OrderStatus::Cart);
		assert!(h.inventory.adjustments().await.is_empty());

		let items = h
			.engine
			.user_cart_items(&order.user_id.to_hex())
			.await
			.unwrap();
		assert_eq!(items, vec![entry]);
		assert!(h
			.engine
			.user_cart_items(&ObjectId::new().to_hex())
			.await
			.unwrap()
			.is_empty());
	}
}

#[tokio::test]
async fn test_remove_item_from_cart() {
	for h in Harness::all() {
		let (order, _) = h.engine.add_to_cart(&create_order(2)).await.unwrap();
		let (kept, _) = h.engine.add_to_cart(&create_order(4)).await.unwrap();

		h.engine
			.remove_item_from_cart(&order.id.to_hex())
			.await
			.unwrap();

		assert_eq!(h.orders().await, vec![kept.clone()], "{}", h.name);
		let carts = h.carts().await;
		assert_eq!(carts.len(), 1);
		assert_eq!(carts[0].order_id, kept.id);

		// Absent orders are not an error.
		h.engine
			.remove_item_from_cart(&order.id.to_hex())
			.await
			.unwrap();
		h.engine
			.remove_item_from_cart(&ObjectId::new().to_hex())
			.await
			.unwrap();
		assert_eq!(h.orders().await.len(), 1);
	}
}

#[tokio::test]
async fn test_remove_rejects_orders_outside_cart() {
	for h in Harness::all() {
		let order = h
			.engine
			.place_single_order(&create_order(1))
			.await
			.unwrap();
		let err = h
			.engine
			.remove_item_from_cart(&order.id.to_hex())
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			OrderError::NotInCart {
				status: OrderStatus::Placed,
				..
			}
		));
		assert_eq!(h.orders().await.len(), 1, "{}", h.name);
	}
}

#[tokio::test]
async fn test_each_status_change_appends_one_track_entry() {
	for h in Harness::all() {
		let (order, _) = h.engine.add_to_cart(&create_order(2)).await.unwrap();
		let id = order.id.to_hex();
		assert!(h.engine.order_track(&id).await.unwrap().is_empty());

		let expected = [OrderStatus::Placed, OrderStatus::Dispatched];
		for (n, next) in expected.iter().enumerate() {
			let updated = h
				.engine
				.update_order_status(&status(order.id, next.as_str()))
				.await
				.unwrap();
			assert_eq!(updated.status, *next);

			let track = h.engine.order_track(&id).await.unwrap();
			assert_eq!(track.len(), n + 1, "{}", h.name);
			assert_eq!(track[n].status, *next);
			assert!(track.iter().all(|t| t.order_id == order.id));
		}

		let stored = h.engine.get_order(&id).await.unwrap();
		assert_eq!(stored.status, OrderStatus::Dispatched);
		assert_eq!(stored.total_price, order.total_price);
	}
}

#[tokio::test]
async fn test_checkout_removes_cart_entry_and_decreases_stock() {
	for h in Harness::all() {
		let (order, _) = h.engine.add_to_cart(&create_order(6)).await.unwrap();

		h.engine
			.update_order_status(&status(order.id, "PLACED"))
			.await
			.unwrap();

		assert!(h.carts().await.is_empty(), "{}", h.name);
		assert!(h
			.engine
			.user_cart_items(&order.user_id.to_hex())
			.await
			.unwrap()
			.is_empty());
		assert_eq!(h.inventory.net_delta(order.product_id).await, -6);
	}
}

#[tokio::test]
async fn test_completion_archives_order_and_track() {
	for h in Harness::all() {
		let order = h
			.engine
			.place_single_order(&create_order(3))
			.await
			.unwrap();
		let other = h
			.engine
			.place_single_order(&create_order(1))
			.await
			.unwrap();
		let id = order.id.to_hex();

		h.engine
			.update_order_status(&status(order.id, "DISPATCHED"))
			.await
			.unwrap();
		h.engine
			.update_order_status(&status(other.id, "DISPATCHED"))
			.await
			.unwrap();
		let before = h.engine.order_track(&id).await.unwrap();

		let completed = h
			.engine
			.update_order_status(&status(order.id, "COMPLETED"))
			.await
			.unwrap();
		assert_eq!(completed.status, OrderStatus::Completed);

		let record = h.engine.order_history(&id).await.unwrap();
		assert_eq!(record.order, completed, "{}", h.name);
		assert_eq!(record.track.len(), before.len() + 1);
		assert_eq!(record.track[..before.len()], before[..]);
		assert_eq!(
			record.track.last().map(|t| t.status),
			Some(OrderStatus::Completed)
		);

		assert!(matches!(
			h.engine.get_order(&id).await.unwrap_err(),
			OrderError::NotFound { entity: "Order", .. }
		));
		assert!(h.engine.order_track(&id).await.unwrap().is_empty());
		assert_eq!(h.history().await.len(), 1);

		// Other orders are untouched.
		assert_eq!(h.orders().await.len(), 1);
		assert_eq!(
			h.engine
				.order_track(&other.id.to_hex())
				.await
				.unwrap()
				.len(),
			1
		);
	}
}

#[tokio::test]
async fn test_cancel_returns_stock() {
	for h in Harness::all() {
		let order = h
			.engine
			.place_single_order(&create_order(7))
			.await
			.unwrap();
		let cancelled = h.engine.cancel_order(&order.id.to_hex()).await.unwrap();
		assert_eq!(cancelled.status, OrderStatus::Cancelled);

		let track = h.engine.order_track(&order.id.to_hex()).await.unwrap();
		assert_eq!(track.len(), 1, "{}", h.name);
		assert_eq!(track[0].status, OrderStatus::Cancelled);

		let adjustments = h.inventory.adjustments().await;
		assert_eq!(adjustments.len(), 2);
		assert_eq!(adjustments[1].direction, AdjustDirection::Increase);
		assert_eq!(adjustments[1].quantity, 7);
		assert_eq!(h.inventory.net_delta(order.product_id).await, 0);
	}
}

#[tokio::test]
async fn test_cancel_after_dispatch() {
	for h in Harness::all() {
		let order = h
			.engine
			.place_single_order(&create_order(2))
			.await
			.unwrap();
		h.engine
			.update_order_status(&status(order.id, "DISPATCHED"))
			.await
			.unwrap();
		h.engine.cancel_order(&order.id.to_hex()).await.unwrap();
		assert_eq!(h.inventory.net_delta(order.product_id).await, 0, "{}", h.name);
	}
}

#[tokio::test]
async fn test_illegal_transitions_are_rejected_without_writes() {
	for h in Harness::all() {
		let (cart_order, _) = h.engine.add_to_cart(&create_order(1)).await.unwrap();
		let placed = h
			.engine
			.place_single_order(&create_order(1))
			.await
			.unwrap();
		h.engine.cancel_order(&placed.id.to_hex()).await.unwrap();
		let documents = h.document_count().await;
		let adjustments = h.inventory.adjustments().await.len();

		for (id, target) in [
			(cart_order.id, "DISPATCHED"),
			(cart_order.id, "COMPLETED"),
			(cart_order.id, "CART"),
			(placed.id, "PLACED"),
			(placed.id, "DISPATCHED"),
		] {
			let err = h
				.engine
				.update_order_status(&status(id, target))
				.await
				.unwrap_err();
			assert!(
				matches!(err, OrderError::InvalidTransition { .. }),
				"{}: {target}: {err}",
				h.name
			);
		}

		// Cart orders are removed from the cart, not cancelled.
		let err = h
			.engine
			.cancel_order(&cart_order.id.to_hex())
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			OrderError::InvalidTransition {
				from: OrderStatus::Cart,
				to: OrderStatus::Cancelled
			}
		));

		assert_eq!(h.document_count().await, documents);
		assert_eq!(h.inventory.adjustments().await.len(), adjustments);
	}
}

#[tokio::test]
async fn test_unknown_status_is_validation_error() {
	for h in Harness::all() {
		let order = h
			.engine
			.place_single_order(&create_order(1))
			.await
			.unwrap();
		for bad in ["SHIPPED", "placed", ""] {
			let err = h
				.engine
				.update_order_status(&status(order.id, bad))
				.await
				.unwrap_err();
			assert!(err.is_validation(), "{bad}");
		}
		assert!(h.track().await.is_empty());
	}
}

#[tokio::test]
async fn test_missing_order_is_not_found() {
	for h in Harness::all() {
		let missing = ObjectId::new();
		let err = h
			.engine
			.update_order_status(&status(missing, "DISPATCHED"))
			.await
			.unwrap_err();
		assert!(matches!(err, OrderError::NotFound { id, .. } if id == missing));

		let err = h.engine.cancel_order(&missing.to_hex()).await.unwrap_err();
		assert!(matches!(err, OrderError::NotFound { .. }));
		assert!(matches!(
			h.engine.order_history(&missing.to_hex()).await.unwrap_err(),
			OrderError::NotFound {
				entity: "History record",
				..
			}
		));
		assert_eq!(h.document_count().await, 0);
		assert!(h.inventory.adjustments().await.is_empty());
	}
}

#[tokio::test]
async fn test_update_cart_quantity() {
	for h in Harness::all() {
		let (order, _) = h.engine.add_to_cart(&create_order(1)).await.unwrap();
		let id = order.id.to_hex();

		let updated = h.engine.update_cart_quantity(&id, 4).await.unwrap();
		assert_eq!(updated.quantity, 4);
		assert_eq!(updated.total_price, Decimal::new(7996, 2));
		assert_eq!(h.engine.get_order(&id).await.unwrap().quantity, 4);

		let err = h.engine.update_cart_quantity(&id, 11).await.unwrap_err();
		assert!(err.is_validation());

		h.engine
			.update_order_status(&status(order.id, "PLACED"))
			.await
			.unwrap();
		assert_eq!(h.inventory.net_delta(order.product_id).await, -4, "{}", h.name);

		let err = h.engine.update_cart_quantity(&id, 2).await.unwrap_err();
		assert!(matches!(err, OrderError::NotInCart { .. }));
	}
}

#[tokio::test]
async fn test_duplicate_cart_entry_check() {
	for h in Harness::all() {
		let (order, entry) = h.engine.add_to_cart(&create_order(1)).await.unwrap();
		let err = h
			.engine
			.check_duplicate_cart_entry(&order.id.to_hex(), &entry.user_id.to_hex())
			.await
			.unwrap_err();
		assert!(matches!(err, OrderError::DuplicateCartEntry { .. }), "{}", h.name);

		h.engine
			.check_duplicate_cart_entry(&order.id.to_hex(), &ObjectId::new().to_hex())
			.await
			.unwrap();
		h.engine
			.check_duplicate_cart_entry(&ObjectId::new().to_hex(), &entry.user_id.to_hex())
			.await
			.unwrap();
	}
}

#[tokio::test]
async fn test_concurrent_adds_all_persist() {
	for h in Harness::all() {
		let tasks: Vec<_> = (0..20)
			.map(|i| {
				let engine = h.engine.clone();
				tokio::spawn(async move { engine.add_to_cart(&create_order(i % 10 + 1)).await })
			})
			.collect();
		for task in tasks {
			task.await.unwrap().unwrap();
		}

		assert_eq!(h.orders().await.len(), 20, "{}", h.name);
		assert_eq!(h.carts().await.len(), 20);
	}
}
