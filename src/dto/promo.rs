use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    domain::promo::DiscountType,
    models::{PromoCode, PromoCodeUsage},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidatePromoRequest {
    pub code: String,
    pub cart_total: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PromoPreview {
    pub valid: bool,
    pub promo_code_id: Uuid,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub discount_amount: Decimal,
    pub original_amount: Decimal,
    pub final_amount: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePromoRequest {
    pub code: String,
    pub discount_type: String,
    pub discount_value: Decimal,
    pub min_order_amount: Option<Decimal>,
    pub max_discount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
}

/// Partial update; absent fields keep their stored value. For the nullable
/// columns an explicit `null` clears the stored value.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdatePromoRequest {
    pub code: Option<String>,
    pub discount_type: Option<String>,
    pub discount_value: Option<Decimal>,
    pub min_order_amount: Option<Decimal>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<f64>)]
    pub max_discount: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<i32>)]
    pub usage_limit: Option<Option<i32>>,
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub valid_from: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub valid_until: Option<Option<DateTime<Utc>>>,
}

// Present fields land in `Some`, so `null` becomes `Some(None)`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PromoList {
    pub items: Vec<PromoCode>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PromoStats {
    pub promo: PromoCode,
    pub usage_count: usize,
    pub total_discount_given: Decimal,
    pub usage_history: Vec<PromoCodeUsage>,
}
