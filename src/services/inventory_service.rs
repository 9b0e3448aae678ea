use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use sea_orm::sea_query::Expr;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    audit,
    domain::{Action, Caller},
    dto::products::{InventoryAdjustRequest, LowStockQuery, ProductList},
    entity::products::{Column as ProdCol, Entity as Products},
    error::{AppError, AppResult},
    models::Product,
    response::{ApiResponse, Meta},
    state::AppState,
};

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("Insufficient stock for product {0}")]
    InsufficientStock(Uuid),

    #[error("Product {0} not found")]
    ProductNotFound(Uuid),

    #[error(transparent)]
    Db(#[from] DbErr),
}

impl From<InventoryError> for AppError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::InsufficientStock(_) => AppError::Conflict(err.to_string()),
            InventoryError::ProductNotFound(_) => AppError::NotFound("Product"),
            InventoryError::Db(db) => AppError::OrmError(db),
        }
    }
}

// The check and the decrement are one conditional UPDATE; a concurrent
// reservation waits on the row lock and re-checks the committed stock.
pub async fn reserve<C>(conn: &C, product_id: Uuid, quantity: i32) -> Result<(), InventoryError>
where
    C: ConnectionTrait,
{
    apply_stock_delta(conn, product_id, -quantity).await
}

async fn apply_stock_delta<C>(conn: &C, product_id: Uuid, delta: i32) -> Result<(), InventoryError>
where
    C: ConnectionTrait,
{
    let result = Products::update_many()
        .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).add(delta))
        .col_expr(
            ProdCol::IsAvailable,
            Expr::expr(Expr::col(ProdCol::Stock).add(delta)).gt(0),
        )
        .filter(ProdCol::Id.eq(product_id))
        .filter(Expr::expr(Expr::col(ProdCol::Stock).add(delta)).gte(0))
        .exec(conn)
        .await?;

    if result.rows_affected == 1 {
        return Ok(());
    }

    let exists = Products::find_by_id(product_id).count(conn).await? > 0;
    if exists {
        Err(InventoryError::InsufficientStock(product_id))
    } else {
        Err(InventoryError::ProductNotFound(product_id))
    }
}

pub async fn list_low_stock(
    state: &AppState,
    caller: &Caller,
    query: LowStockQuery,
) -> AppResult<ApiResponse<ProductList>> {
    caller.authorize(Action::ManageInventory)?;
    let threshold = query.threshold.unwrap_or(5);
    let (page, limit, offset) = query.pagination().normalize();

    let finder = Products::find()
        .filter(ProdCol::Stock.lte(threshold))
        .order_by_asc(ProdCol::Stock)
        .order_by_desc(ProdCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Low stock", ProductList { items }, Some(meta)))
}

pub async fn adjust_inventory(
    state: &AppState,
    caller: &Caller,
    id: Uuid,
    payload: InventoryAdjustRequest,
) -> AppResult<ApiResponse<Product>> {
    caller.authorize(Action::ManageInventory)?;
    if payload.delta == 0 {
        return Err(AppError::BadRequest("delta must not be 0".into()));
    }

    apply_stock_delta(&state.orm, id, payload.delta)
        .await
        .map_err(|err| match err {
            InventoryError::InsufficientStock(_) => {
                AppError::BadRequest("stock cannot be negative".into())
            }
            other => other.into(),
        })?;

    let product = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Product"))?;

    tracing::info!(product_id = %id, delta = payload.delta, stock = product.stock, "inventory adjusted");
    audit::record(
        &state.pool,
        caller.user_id,
        "inventory_adjust",
        "products",
        serde_json::json!({ "product_id": id, "delta": payload.delta }),
    )
    .await;

    Ok(ApiResponse::success(
        "Inventory updated",
        Product::from(product),
        Some(Meta::empty()),
    ))
}
