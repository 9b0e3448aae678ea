use delivery_orders::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    domain::Role,
    services::auth_service::hash_password,
};
use rust_decimal::Decimal;
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url, 2).await?;
    run_migrations(&pool).await?;

    let admin_id = ensure_user(&pool, "700000001", "Ops Admin", Some("admin123"), Role::Admin).await?;
    let rider_id = ensure_user(&pool, "700000002", "Demo Rider", Some("rider123"), Role::Rider).await?;
    ensure_rider_profile(&pool, rider_id).await?;
    let customer_id = ensure_user(&pool, "700000003", "Demo Customer", None, Role::Customer).await?;
    seed_products(&pool).await?;
    seed_promo_codes(&pool).await?;

    println!(
        "Seed completed. Admin ID: {admin_id}, Rider ID: {rider_id}, Customer ID: {customer_id}"
    );
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    phone: &str,
    full_name: &str,
    password: Option<&str>,
    role: Role,
) -> anyhow::Result<Uuid> {
    let password_hash = password.map(hash_password).transpose()?;

    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, phone, full_name, password_hash, role)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (phone) DO UPDATE
        SET role = EXCLUDED.role, password_hash = EXCLUDED.password_hash
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(phone)
    .bind(full_name)
    .bind(password_hash)
    .bind(role.as_str())
    .fetch_one(pool)
    .await?;

    println!("Ensured user {phone} (role={role})");
    Ok(user_id)
}

async fn ensure_rider_profile(pool: &sqlx::PgPool, user_id: Uuid) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO riders (id, user_id, is_available)
        VALUES ($1, $2, TRUE)
        ON CONFLICT (user_id) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}

async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let products = vec![
        ("Chicken Biryani", "Slow-cooked with basmati rice", Decimal::new(1250, 2), 40),
        ("Margherita Pizza", "Tomato, mozzarella, basil", Decimal::new(999, 2), 25),
        ("Mango Lassi", "Chilled yogurt drink", Decimal::new(350, 2), 60),
        ("Veg Samosa (2 pcs)", "Crispy pastry, spiced potato filling", Decimal::new(275, 2), 3),
    ];

    for (name, desc, price, stock) in products {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price, stock, is_available)
            VALUES ($1, $2, $3, $4, $5, $5 > 0)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(desc)
        .bind(price)
        .bind(stock)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}

async fn seed_promo_codes(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO promo_codes (id, code, discount_type, discount_value, min_order_amount)
        VALUES ($1, 'SAVE10', 'percentage', 10, 0)
        ON CONFLICT ((UPPER(code))) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .execute(pool)
    .await?;

    println!("Seeded promo code SAVE10");
    Ok(())
}
