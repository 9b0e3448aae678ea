use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    domain::{Action, Caller},
    dto::cart::{AddToCartRequest, CartItemDto, CartList, UpdateCartQuantityRequest},
    error::{AppError, AppResult},
    models::{CartItem, Product},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

#[derive(FromRow)]
struct CartWithProductRow {
    cart_id: Uuid,
    quantity: i32,
    product_id: Uuid,
    name: String,
    description: Option<String>,
    price: Decimal,
    stock: i32,
    is_available: bool,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct CartRow {
    id: Uuid,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    created_at: DateTime<Utc>,
}

impl From<CartRow> for CartItem {
    fn from(row: CartRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            user_id: row.user_id,
            quantity: row.quantity,
            created_at: row.created_at,
        }
    }
}

pub async fn list_cart(
    state: &AppState,
    caller: &Caller,
    pagination: Pagination,
) -> AppResult<ApiResponse<CartList>> {
    caller.authorize(Action::ManageCart)?;
    let (page, limit, offset) = pagination.normalize();
    let rows = sqlx::query_as::<_, CartWithProductRow>(
        r#"
        SELECT ci.id AS cart_id, ci.quantity,
               p.id AS product_id, p.name, p.description, p.price, p.stock,
               p.is_available, p.created_at
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        WHERE ci.user_id = $1
        ORDER BY ci.created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(caller.user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cart_items WHERE user_id = $1")
        .bind(caller.user_id)
        .fetch_one(&state.pool)
        .await?;

    let items = rows
        .into_iter()
        .map(|row| CartItemDto {
            id: row.cart_id,
            product: Product {
                id: row.product_id,
                name: row.name,
                description: row.description,
                price: row.price,
                stock: row.stock,
                is_available: row.is_available,
                created_at: row.created_at,
            },
            quantity: row.quantity,
        })
        .collect();

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success("Cart", CartList { items }, Some(meta)))
}

pub async fn add_to_cart(
    state: &AppState,
    caller: &Caller,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    caller.authorize(Action::ManageCart)?;
    let quantity = payload.quantity.unwrap_or(1);
    if quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let product_exist: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1")
        .bind(payload.product_id)
        .fetch_optional(&state.pool)
        .await?;
    if product_exist.is_none() {
        return Err(AppError::NotFound("Product"));
    }

    let row = sqlx::query_as::<_, CartRow>(
        r#"
        INSERT INTO cart_items (id, user_id, product_id, quantity)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id, product_id)
        DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity, updated_at = NOW()
        RETURNING id, user_id, product_id, quantity, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(caller.user_id)
    .bind(payload.product_id)
    .bind(quantity)
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::success("Added to cart", CartItem::from(row), Some(Meta::empty())))
}

/// Set the quantity of a cart line; zero or less removes the line.
pub async fn set_quantity(
    state: &AppState,
    caller: &Caller,
    product_id: Uuid,
    payload: UpdateCartQuantityRequest,
) -> AppResult<ApiResponse<Option<CartItem>>> {
    caller.authorize(Action::ManageCart)?;
    if payload.quantity <= 0 {
        delete_line(state, caller.user_id, product_id).await?;
        return Ok(ApiResponse::success("Removed from cart", None, Some(Meta::empty())));
    }

    let row = sqlx::query_as::<_, CartRow>(
        r#"
        UPDATE cart_items
        SET quantity = $3, updated_at = NOW()
        WHERE user_id = $1 AND product_id = $2
        RETURNING id, user_id, product_id, quantity, created_at
        "#,
    )
    .bind(caller.user_id)
    .bind(product_id)
    .bind(payload.quantity)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::NotFound("Cart item"))?;

    Ok(ApiResponse::success(
        "Cart updated",
        Some(CartItem::from(row)),
        Some(Meta::empty()),
    ))
}

pub async fn remove_from_cart(
    state: &AppState,
    caller: &Caller,
    product_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    caller.authorize(Action::ManageCart)?;
    delete_line(state, caller.user_id, product_id).await?;
    Ok(ApiResponse::success(
        "Removed from cart",
        serde_json::json!({ "product_id": product_id }),
        Some(Meta::empty()),
    ))
}

pub async fn clear_cart(
    state: &AppState,
    caller: &Caller,
) -> AppResult<ApiResponse<serde_json::Value>> {
    caller.authorize(Action::ManageCart)?;
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(caller.user_id)
        .execute(&state.pool)
        .await?;
    Ok(ApiResponse::success(
        "Cart cleared",
        serde_json::json!({ "removed": result.rows_affected() }),
        Some(Meta::empty()),
    ))
}

async fn delete_line(state: &AppState, user_id: Uuid, product_id: Uuid) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM cart_items WHERE product_id = $1 AND user_id = $2")
        .bind(product_id)
        .bind(user_id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Cart item"));
    }
    Ok(())
}
