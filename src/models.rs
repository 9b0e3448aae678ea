use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    domain::{
        OrderStatus, Role,
        promo::{DiscountType, PromoRule},
    },
    entity::{
        cart_items::Model as CartItemModel, order_items::Model as OrderItemModel,
        orders::Model as OrderModel, products::Model as ProductModel,
        promo_code_usage::Model as PromoUsageModel, promo_codes::Model as PromoCodeModel,
        riders::Model as RiderModel, users::Model as UserModel,
    },
    error::{AppError, AppResult},
};

pub const PAYMENT_METHOD_COD: &str = "cash_on_delivery";

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Rider {
    pub id: Uuid,
    pub user_id: Uuid,
    pub is_available: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_price: Decimal,
    pub delivery_address: String,
    pub status: OrderStatus,
    pub payment_method: String,
    pub rider_id: Option<Uuid>,
    pub promo_code_id: Option<Uuid>,
    pub discount_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PromoCode {
    pub id: Uuid,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub min_order_amount: Decimal,
    pub max_discount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub is_active: bool,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PromoCodeUsage {
    pub id: Uuid,
    pub promo_code_id: Uuid,
    pub user_id: Uuid,
    pub order_id: Uuid,
    pub discount_amount: Decimal,
    pub used_at: DateTime<Utc>,
}

fn corrupt(field: &str, value: &str) -> AppError {
    AppError::Internal(anyhow::anyhow!("stored {field} has unexpected value {value:?}"))
}

impl User {
    pub fn from_entity(model: UserModel) -> AppResult<Self> {
        let role = model
            .role
            .parse::<Role>()
            .map_err(|_| corrupt("users.role", &model.role))?;
        Ok(Self {
            id: model.id,
            phone: model.phone,
            email: model.email,
            full_name: model.full_name,
            role,
            created_at: model.created_at.with_timezone(&Utc),
        })
    }
}

impl From<RiderModel> for Rider {
    fn from(model: RiderModel) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            is_available: model.is_available,
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<ProductModel> for Product {
    fn from(model: ProductModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            price: model.price,
            stock: model.stock,
            is_available: model.is_available,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<CartItemModel> for CartItem {
    fn from(model: CartItemModel) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            user_id: model.user_id,
            quantity: model.quantity,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl Order {
    pub fn from_entity(model: OrderModel) -> AppResult<Self> {
        let status = model
            .status
            .parse::<OrderStatus>()
            .map_err(|_| corrupt("orders.status", &model.status))?;
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            total_price: model.total_price,
            delivery_address: model.delivery_address,
            status,
            payment_method: model.payment_method,
            rider_id: model.rider_id,
            promo_code_id: model.promo_code_id,
            discount_amount: model.discount_amount,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        })
    }

    pub fn from_entities(models: Vec<OrderModel>) -> AppResult<Vec<Self>> {
        models.into_iter().map(Self::from_entity).collect()
    }
}

impl From<OrderItemModel> for OrderItem {
    fn from(model: OrderItemModel) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            quantity: model.quantity,
            price: model.price,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl PromoCode {
    pub fn from_entity(model: PromoCodeModel) -> AppResult<Self> {
        let discount_type = model
            .discount_type
            .parse::<DiscountType>()
            .map_err(|_| corrupt("promo_codes.discount_type", &model.discount_type))?;
        Ok(Self {
            id: model.id,
            code: model.code,
            discount_type,
            discount_value: model.discount_value,
            min_order_amount: model.min_order_amount,
            max_discount: model.max_discount,
            usage_limit: model.usage_limit,
            used_count: model.used_count,
            is_active: model.is_active,
            valid_from: model.valid_from.map(|dt| dt.with_timezone(&Utc)),
            valid_until: model.valid_until.map(|dt| dt.with_timezone(&Utc)),
            created_at: model.created_at.with_timezone(&Utc),
        })
    }

    pub fn rule(&self) -> PromoRule {
        PromoRule {
            discount_type: self.discount_type,
            discount_value: self.discount_value,
            min_order_amount: self.min_order_amount,
            max_discount: self.max_discount,
            usage_limit: self.usage_limit,
            used_count: self.used_count,
            is_active: self.is_active,
            valid_from: self.valid_from,
            valid_until: self.valid_until,
        }
    }
}

impl From<PromoUsageModel> for PromoCodeUsage {
    fn from(model: PromoUsageModel) -> Self {
        Self {
            id: model.id,
            promo_code_id: model.promo_code_id,
            user_id: model.user_id,
            order_id: model.order_id,
            discount_amount: model.discount_amount,
            used_at: model.used_at.with_timezone(&Utc),
        }
    }
}
