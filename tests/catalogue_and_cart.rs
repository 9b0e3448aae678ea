mod common;

use common::{create_product, create_user, money, product_stock, setup_state};
use delivery_orders::{
    domain::Role,
    dto::{
        cart::{AddToCartRequest, UpdateCartQuantityRequest},
        products::{CreateProductRequest, InventoryAdjustRequest, LowStockQuery},
    },
    error::AppError,
    routes::params::Pagination,
    services::{cart_service, inventory_service, product_service},
};
use uuid::Uuid;

#[tokio::test]
async fn admin_manages_catalogue_and_stock() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let admin = create_user(&state, Role::Admin).await?;
    let customer = create_user(&state, Role::Customer).await?;
    let name = format!("Paneer Tikka {}", Uuid::new_v4());
    let request = || CreateProductRequest {
        name: name.clone(),
        description: Some("Charcoal grilled".into()),
        price: money(1100),
        stock: 2,
    };

    let err = product_service::create_product(&state, &customer, request())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let product = product_service::create_product(&state, &admin, request())
        .await?
        .data
        .unwrap();
    assert!(product.is_available);

    let err = product_service::create_product(&state, &admin, request())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let restocked = inventory_service::adjust_inventory(
        &state,
        &admin,
        product.id,
        InventoryAdjustRequest { delta: 3 },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(restocked.stock, 5);

    let err = inventory_service::adjust_inventory(
        &state,
        &admin,
        product.id,
        InventoryAdjustRequest { delta: -6 },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref m) if m == "stock cannot be negative"));
    assert_eq!(product_stock(&state, product.id).await?, 5);

    let drained = inventory_service::adjust_inventory(
        &state,
        &admin,
        product.id,
        InventoryAdjustRequest { delta: -5 },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(drained.stock, 0);
    assert!(!drained.is_available);

    let low = inventory_service::list_low_stock(
        &state,
        &admin,
        LowStockQuery {
            threshold: Some(0),
            ..Default::default()
        },
    )
    .await?;
    assert!(low.meta.unwrap().total.unwrap() >= 1);
    assert!(low.data.unwrap().items.iter().all(|p| p.stock <= 0));

    let err = inventory_service::adjust_inventory(
        &state,
        &admin,
        Uuid::new_v4(),
        InventoryAdjustRequest { delta: 1 },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound("Product")));
    Ok(())
}

#[tokio::test]
async fn cart_lines_accumulate_and_can_be_removed() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let customer = create_user(&state, Role::Customer).await?;
    let product = create_product(&state, money(350), 10).await?;
    let add = |quantity| AddToCartRequest {
        product_id: product,
        quantity,
    };

    cart_service::add_to_cart(&state, &customer, add(Some(2))).await?;
    let line = cart_service::add_to_cart(&state, &customer, add(None))
        .await?
        .data
        .unwrap();
    assert_eq!(line.quantity, 3);

    let updated = cart_service::set_quantity(
        &state,
        &customer,
        product,
        UpdateCartQuantityRequest { quantity: 5 },
    )
    .await?;
    assert_eq!(updated.data.unwrap().unwrap().quantity, 5);

    let cart = cart_service::list_cart(&state, &customer, Pagination::default())
        .await?
        .data
        .unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].product.id, product);

    let removed = cart_service::set_quantity(
        &state,
        &customer,
        product,
        UpdateCartQuantityRequest { quantity: 0 },
    )
    .await?;
    assert!(removed.data.unwrap().is_none());

    let err = cart_service::remove_from_cart(&state, &customer, product)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound("Cart item")));

    let err = cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id: Uuid::new_v4(),
            quantity: Some(1),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound("Product")));

    cart_service::add_to_cart(&state, &customer, add(Some(1))).await?;
    cart_service::clear_cart(&state, &customer).await?;
    let cart = cart_service::list_cart(&state, &customer, Pagination::default())
        .await?
        .data
        .unwrap();
    assert!(cart.items.is_empty());
    Ok(())
}
