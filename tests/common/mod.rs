#![allow(dead_code)]

use delivery_orders::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    domain::{Caller, Role},
    dto::orders::{CreateOrderRequest, OrderLineRequest},
    entity::{
        products::ActiveModel as ProductActive, promo_codes::ActiveModel as PromoActive,
        riders::ActiveModel as RiderActive, users::ActiveModel as UserActive,
    },
    state::AppState,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, Set};
use uuid::Uuid;

/// Connect to the test database, or `None` when none is configured.
pub async fn setup_state() -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run database tests.");
            return Ok(None);
        }
    };

    let pool = create_pool(&database_url, 20).await?;
    run_migrations(&pool).await?;
    Ok(Some(AppState::new(
        pool,
        AppConfig::with_database_url(database_url),
    )))
}

fn unique_suffix() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_string()
}

// Rows are keyed by fresh ids and names so tests can share one database.
pub async fn create_user(state: &AppState, role: Role) -> anyhow::Result<Caller> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        phone: Set(Some(format!("9{}", unique_suffix()))),
        email: Set(None),
        full_name: Set(Some(format!("Test {role}"))),
        password_hash: Set(None),
        role: Set(role.as_str().to_string()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(Caller::new(user.id, role))
}

pub async fn create_rider(state: &AppState) -> anyhow::Result<Caller> {
    let caller = create_user(state, Role::Rider).await?;
    RiderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(caller.user_id),
        is_available: Set(true),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(caller)
}

pub async fn create_product(state: &AppState, price: Decimal, stock: i32) -> anyhow::Result<Uuid> {
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(format!("Test Dish {}", unique_suffix())),
        description: Set(None),
        price: Set(price),
        stock: Set(stock),
        is_available: Set(stock > 0),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(product.id)
}

/// Percentage code with no minimum and no usage cap.
pub async fn create_percentage_promo(state: &AppState, percent: i64) -> anyhow::Result<Uuid> {
    create_capped_promo(state, percent, None).await
}

pub async fn create_capped_promo(
    state: &AppState,
    percent: i64,
    usage_limit: Option<i32>,
) -> anyhow::Result<Uuid> {
    let promo = PromoActive {
        id: Set(Uuid::new_v4()),
        code: Set(format!("T{}", unique_suffix()).to_uppercase()),
        discount_type: Set("percentage".into()),
        discount_value: Set(Decimal::from(percent)),
        min_order_amount: Set(Decimal::ZERO),
        max_discount: Set(None),
        usage_limit: Set(usage_limit),
        used_count: Set(0),
        is_active: Set(true),
        valid_from: Set(None),
        valid_until: Set(None),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(promo.id)
}

pub async fn product_stock(state: &AppState, product_id: Uuid) -> anyhow::Result<i32> {
    let (stock,): (i32,) = sqlx::query_as("SELECT stock FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_one(&state.pool)
        .await?;
    Ok(stock)
}

pub fn line(product_id: Uuid, quantity: i32) -> OrderLineRequest {
    OrderLineRequest {
        product_id,
        quantity,
        price: None,
    }
}

pub fn order_request(items: Vec<OrderLineRequest>) -> CreateOrderRequest {
    CreateOrderRequest {
        items,
        total_price: None,
        delivery_address: "12 Harbour Road".into(),
        promo_code_id: None,
        discount_amount: None,
    }
}

pub fn money(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}
