//! Integration tests for table occupancy.

mod common;

use common::*;
use tavola_core::input::PayOrderInput;
use tavola_core::{CoreError, Money, OrderStatus, PaymentMethod, TableStatus};
use tavola_orders::OrderError;

#[tokio::test]
async fn test_reset_refuses_unpaid_orders() {
    let h = Harness::new().await;
    h.add_product("p-latte", "Latte", 30_000, 10).await;
    h.add_table("t-b2", "B2").await;

    let mut input = pos_order(vec![line("p-latte", 1)]);
    input.table_id = Some("t-b2".into());
    let created = h
        .engine
        .pipeline()
        .create_order(&cashier(), &input, None)
        .await
        .unwrap();

    let err = h.engine.tables().reset(&cashier(), "t-b2", false).await.unwrap_err();
    match err {
        OrderError::Domain(CoreError::TableHasUnpaidOrders { order_numbers, .. }) => {
            assert_eq!(order_numbers, vec![created.order.order_number.clone()]);
        }
        other => panic!("unexpected error {other:?}"),
    }

    h.engine
        .transitions()
        .pay(
            &cashier(),
            &created.order.id,
            &PayOrderInput {
                payment_method: PaymentMethod::Cash,
                amount: Money::from_units(50_000),
            },
        )
        .await
        .unwrap();

    let table = h.engine.tables().reset(&cashier(), "t-b2", false).await.unwrap();
    assert_eq!(table.status, TableStatus::Available);
    assert!(table.current_order_id.is_none());

    h.close().await;
}

#[tokio::test]
async fn test_freed_table_can_be_seated_again() {
    let h = Harness::new().await;
    h.add_product("p-latte", "Latte", 30_000, 10).await;
    h.add_table("t-a1", "A1").await;

    let mut input = pos_order(vec![line("p-latte", 1)]);
    input.table_id = Some("t-a1".into());
    let pipeline = h.engine.pipeline();

    let first = pipeline.create_order(&cashier(), &input, None).await.unwrap();
    h.engine.transitions().void(&manager(), &first.order.id).await.unwrap();

    let second = pipeline.create_order(&cashier(), &input, None).await.unwrap();
    let table = h.engine.tables().get(&cashier(), "t-a1").await.unwrap();
    assert_eq!(table.current_order_id.as_deref(), Some(second.order.id.as_str()));

    let order = h.engine.queries().get(&cashier(), &first.order.id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert_eq!(table.status, TableStatus::Occupied);

    h.close().await;
}

#[tokio::test]
async fn test_unknown_table_is_not_found() {
    let h = Harness::new().await;
    h.add_product("p-latte", "Latte", 30_000, 10).await;

    let mut input = pos_order(vec![line("p-latte", 1)]);
    input.table_id = Some("t-nowhere".into());
    let err = h
        .engine
        .pipeline()
        .create_order(&cashier(), &input, None)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(h.stock("p-latte").await, 10);

    h.close().await;
}
