mod common;

use std::{sync::Arc, time::Duration};

use common::{
    create_capped_promo, create_percentage_promo, create_product, create_user, line, money,
    order_request, product_stock, setup_state,
};
use delivery_orders::{
    domain::{OrderStatus, Role},
    dto::{
        cart::AddToCartRequest,
        orders::{CreateOrderRequest, OrderLineRequest},
    },
    error::AppError,
    routes::params::Pagination,
    services::{cart_service, order_service},
    state::AppState,
};
use uuid::Uuid;

// Customer fills the cart, places the order, and later price changes do not touch it.
#[tokio::test]
async fn order_snapshots_prices_reserves_stock_and_clears_cart() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let customer = create_user(&state, Role::Customer).await?;
    let biryani = create_product(&state, money(1250), 10).await?;
    let lassi = create_product(&state, money(350), 5).await?;

    cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id: biryani,
            quantity: Some(2),
        },
    )
    .await?;

    let resp = order_service::create_order(
        &state,
        &customer,
        CreateOrderRequest {
            items: vec![
                OrderLineRequest {
                    product_id: biryani,
                    quantity: 2,
                    price: Some(money(1250)),
                },
                OrderLineRequest {
                    product_id: lassi,
                    quantity: 1,
                    price: Some(money(350)),
                },
            ],
            total_price: Some(money(2850)),
            ..order_request(vec![])
        },
    )
    .await?;
    assert_eq!(resp.message, "Order created successfully");
    let created = resp.data.unwrap();
    assert_eq!(created.order.status, OrderStatus::Pending);
    assert_eq!(created.order.total_price, money(2850));
    assert_eq!(created.order.discount_amount, money(0));
    assert_eq!(created.order.payment_method, "cash_on_delivery");
    assert_eq!(created.items.len(), 2);

    assert_eq!(product_stock(&state, biryani).await?, 8);
    assert_eq!(product_stock(&state, lassi).await?, 4);

    let cart = cart_service::list_cart(&state, &customer, Pagination::default()).await?;
    assert!(cart.data.unwrap().items.is_empty());

    sqlx::query("UPDATE products SET price = 15.00 WHERE id = $1")
        .bind(biryani)
        .execute(&state.pool)
        .await?;
    let fetched = order_service::get_order(&state, &customer, created.order_id).await?;
    let fetched = fetched.data.unwrap();
    let biryani_line = fetched
        .items
        .iter()
        .find(|item| item.product_id == biryani)
        .unwrap();
    assert_eq!(biryani_line.price, money(1250));
    assert_eq!(fetched.order.total_price, money(2850));

    let (notifications,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND related_id = $2 AND type = 'order_status'",
    )
    .bind(customer.user_id)
    .bind(created.order_id)
    .fetch_one(&state.pool)
    .await?;
    assert_eq!(notifications, 1);

    Ok(())
}

#[tokio::test]
async fn malformed_orders_are_rejected_before_any_write() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let customer = create_user(&state, Role::Customer).await?;
    let product = create_product(&state, money(999), 3).await?;

    let err = order_service::create_order(&state, &customer, order_request(vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref m) if m == "Order must contain at least one item"));

    let err = order_service::create_order(
        &state,
        &customer,
        order_request(vec![line(product, 1), line(product, 2)]),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref m) if m.contains("appears more than once")));

    let err = order_service::create_order(&state, &customer, order_request(vec![line(product, 0)]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = order_service::create_order(
        &state,
        &customer,
        order_request(vec![line(Uuid::new_v4(), 1)]),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound("Product")));

    let err = order_service::create_order(
        &state,
        &customer,
        order_request(vec![OrderLineRequest {
            price: Some(money(899)),
            ..line(product, 1)
        }]),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref m) if m.contains("has changed")));

    assert_eq!(product_stock(&state, product).await?, 3);
    Ok(())
}

#[tokio::test]
async fn ordering_more_than_stock_fails_without_side_effects() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let customer = create_user(&state, Role::Customer).await?;
    let plenty = create_product(&state, money(500), 10).await?;
    let scarce = create_product(&state, money(275), 3).await?;

    let err = order_service::create_order(
        &state,
        &customer,
        order_request(vec![line(plenty, 2), line(scarce, 4)]),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(ref m) if m.starts_with("Insufficient stock")));

    // the first line's reservation rolled back with the rest
    assert_eq!(product_stock(&state, plenty).await?, 10);
    assert_eq!(product_stock(&state, scarce).await?, 3);

    let (orders,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE user_id = $1")
        .bind(customer.user_id)
        .fetch_one(&state.pool)
        .await?;
    assert_eq!(orders, 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn last_unit_goes_to_exactly_one_customer() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let product = create_product(&state, money(999), 1).await?;
    let first = create_user(&state, Role::Customer).await?;
    let second = create_user(&state, Role::Customer).await?;

    let (a, b) = tokio::join!(
        order_service::create_order(&state, &first, order_request(vec![line(product, 1)])),
        order_service::create_order(&state, &second, order_request(vec![line(product, 1)])),
    );

    let successes = [a.is_ok(), b.is_ok()].into_iter().filter(|ok| *ok).count();
    assert_eq!(successes, 1);
    let failure = a.err().or(b.err()).unwrap();
    assert!(matches!(failure, AppError::Conflict(_)));
    assert_eq!(product_stock(&state, product).await?, 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_orders_never_oversell() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let stock = 5;
    let product = create_product(&state, money(250), stock).await?;
    let state = Arc::new(state);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let state = state.clone();
        let customer = create_user(&state, Role::Customer).await?;
        handles.push(tokio::spawn(async move {
            order_service::create_order(&state, &customer, order_request(vec![line(product, 1)]))
                .await
        }));
    }

    let mut placed = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => placed += 1,
            Err(err) => assert!(matches!(err, AppError::Conflict(_)), "unexpected: {err}"),
        }
    }
    assert_eq!(placed, stock);
    assert_eq!(product_stock(&state, product).await?, 0);

    let (available,): (bool,) = sqlx::query_as("SELECT is_available FROM products WHERE id = $1")
        .bind(product)
        .fetch_one(&state.pool)
        .await?;
    assert!(!available);
    Ok(())
}

#[tokio::test]
async fn promo_applies_once_per_customer() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let customer = create_user(&state, Role::Customer).await?;
    let product = create_product(&state, money(5000), 20).await?;
    let promo = create_percentage_promo(&state, 10).await?;

    let resp = order_service::create_order(
        &state,
        &customer,
        CreateOrderRequest {
            promo_code_id: Some(promo),
            discount_amount: Some(money(2000)),
            total_price: Some(money(20000)),
            ..order_request(vec![line(product, 4)])
        },
    )
    .await?;
    let created = resp.data.unwrap();
    assert_eq!(created.discount_applied, money(2000));
    assert_eq!(created.order.total_price, money(18000));
    assert_eq!(created.order.promo_code_id, Some(promo));

    let (used_count,): (i32,) = sqlx::query_as("SELECT used_count FROM promo_codes WHERE id = $1")
        .bind(promo)
        .fetch_one(&state.pool)
        .await?;
    assert_eq!(used_count, 1);

    let err = order_service::create_order(
        &state,
        &customer,
        CreateOrderRequest {
            promo_code_id: Some(promo),
            ..order_request(vec![line(product, 4)])
        },
    )
    .await
    .unwrap_err();
    assert!(
        matches!(err, AppError::Conflict(ref m) if m == "You have already used this promo code")
    );
    assert_eq!(product_stock(&state, product).await?, 16);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_redemptions_by_one_customer_succeed_once() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let customer = create_user(&state, Role::Customer).await?;
    let product = create_product(&state, money(1000), 20).await?;
    let promo = create_percentage_promo(&state, 10).await?;
    let request = || CreateOrderRequest {
        promo_code_id: Some(promo),
        ..order_request(vec![line(product, 1)])
    };

    let (a, b) = tokio::join!(
        order_service::create_order(&state, &customer, request()),
        order_service::create_order(&state, &customer, request()),
    );
    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    let failure = a.err().or(b.err()).unwrap();
    assert!(matches!(failure, AppError::Conflict(_)));

    let (usages,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM promo_code_usage WHERE promo_code_id = $1")
            .bind(promo)
            .fetch_one(&state.pool)
            .await?;
    assert_eq!(usages, 1);
    assert_eq!(product_stock(&state, product).await?, 19);
    Ok(())
}

#[tokio::test]
async fn wrong_client_discount_rolls_back() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let customer = create_user(&state, Role::Customer).await?;
    let product = create_product(&state, money(10000), 5).await?;
    let promo = create_percentage_promo(&state, 10).await?;

    let err = order_service::create_order(
        &state,
        &customer,
        CreateOrderRequest {
            promo_code_id: Some(promo),
            discount_amount: Some(money(500)),
            ..order_request(vec![line(product, 2)])
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref m) if m.contains("expected 20")));

    assert_eq!(product_stock(&state, product).await?, 5);
    let (used_count,): (i32,) = sqlx::query_as("SELECT used_count FROM promo_codes WHERE id = $1")
        .bind(promo)
        .fetch_one(&state.pool)
        .await?;
    assert_eq!(used_count, 0);
    Ok(())
}

#[tokio::test]
async fn only_customers_place_orders_and_read_their_own() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let owner = create_user(&state, Role::Customer).await?;
    let stranger = create_user(&state, Role::Customer).await?;
    let admin = create_user(&state, Role::Admin).await?;
    let rider = create_user(&state, Role::Rider).await?;
    let product = create_product(&state, money(400), 5).await?;

    let err = order_service::create_order(&state, &rider, order_request(vec![line(product, 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(ref m) if m == "Access denied. Customer only."));

    let order_id = order_service::create_order(&state, &owner, order_request(vec![line(product, 1)]))
        .await?
        .data
        .unwrap()
        .order_id;

    let err = order_service::get_order(&state, &stranger, order_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    let err = order_service::get_order(&state, &rider, order_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert!(order_service::get_order(&state, &admin, order_id).await.is_ok());

    let err = order_service::list_all_orders(&state, &owner, Pagination::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(ref m) if m == "Access denied. Admin only."));

    let mine = order_service::list_my_orders(&state, &owner, Default::default()).await?;
    let mine = mine.data.unwrap().items;
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, order_id);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn usage_cap_admits_one_of_two_customers() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let product = create_product(&state, money(1000), 10).await?;
    let promo = create_capped_promo(&state, 10, Some(1)).await?;
    let first = create_user(&state, Role::Customer).await?;
    let second = create_user(&state, Role::Customer).await?;
    let request = || CreateOrderRequest {
        promo_code_id: Some(promo),
        ..order_request(vec![line(product, 1)])
    };

    let (a, b) = tokio::join!(
        order_service::create_order(&state, &first, request()),
        order_service::create_order(&state, &second, request()),
    );
    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    let failure = a.err().or(b.err()).unwrap();
    assert!(matches!(failure, AppError::Conflict(ref m) if m == "Promo code usage limit reached"));

    let (used_count,): (i32,) = sqlx::query_as("SELECT used_count FROM promo_codes WHERE id = $1")
        .bind(promo)
        .fetch_one(&state.pool)
        .await?;
    assert_eq!(used_count, 1);
    assert_eq!(product_stock(&state, product).await?, 9);

    let late = create_user(&state, Role::Customer).await?;
    let err = order_service::create_order(&state, &late, request())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(ref m) if m == "Promo code usage limit reached"));
    assert_eq!(product_stock(&state, product).await?, 9);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn slow_order_transaction_times_out_and_rolls_back() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let mut config = (*state.config).clone();
    config.order_tx_timeout = Duration::from_millis(300);
    let impatient = AppState::new(state.pool.clone(), config);

    let customer = create_user(&state, Role::Customer).await?;
    let product = create_product(&state, money(650), 5).await?;

    // hold the product row so the stock reservation blocks
    let mut lock = state.pool.begin().await?;
    sqlx::query("SELECT id FROM products WHERE id = $1 FOR UPDATE")
        .bind(product)
        .execute(&mut *lock)
        .await?;

    let err = order_service::create_order(
        &impatient,
        &customer,
        order_request(vec![line(product, 2)]),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Timeout));
    assert_eq!(err.status_code(), axum::http::StatusCode::SERVICE_UNAVAILABLE);

    lock.rollback().await?;

    let (orders,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE user_id = $1")
        .bind(customer.user_id)
        .fetch_one(&state.pool)
        .await?;
    assert_eq!(orders, 0);
    assert_eq!(product_stock(&state, product).await?, 5);

    // the retry goes through once the row is free
    order_service::create_order(&state, &customer, order_request(vec![line(product, 2)])).await?;
    assert_eq!(product_stock(&state, product).await?, 3);
    Ok(())
}
