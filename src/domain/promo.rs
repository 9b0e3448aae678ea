//! Promo-code eligibility and discount rules, independent of storage.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

impl DiscountType {
    pub fn as_str(self) -> &'static str {
        match self {
            DiscountType::Percentage => "percentage",
            DiscountType::Fixed => "fixed",
        }
    }
}

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiscountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(DiscountType::Percentage),
            "fixed" => Ok(DiscountType::Fixed),
            _ => Err("discount_type must be 'percentage' or 'fixed'".to_string()),
        }
    }
}

/// Why a code cannot be applied. Variants are listed in evaluation order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromoRejection {
    #[error("Invalid or expired promo code")]
    Invalid,

    #[error("Promo code has expired")]
    Expired,

    #[error("Promo code is not yet active")]
    NotYetActive,

    #[error("Minimum order amount is {0}")]
    BelowMinimum(Decimal),

    #[error("Promo code usage limit reached")]
    LimitReached,

    #[error("You have already used this promo code")]
    AlreadyUsed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromoRule {
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub min_order_amount: Decimal,
    pub max_discount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub is_active: bool,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
}

impl PromoRule {
    pub fn has_capacity(&self) -> bool {
        match self.usage_limit {
            Some(limit) => self.used_count < limit,
            None => true,
        }
    }

    pub fn check(
        &self,
        cart_total: Decimal,
        now: DateTime<Utc>,
        already_used: bool,
    ) -> Result<(), PromoRejection> {
        if !self.is_active {
            return Err(PromoRejection::Invalid);
        }
        if self.valid_until.is_some_and(|until| until < now) {
            return Err(PromoRejection::Expired);
        }
        if self.valid_from.is_some_and(|from| from > now) {
            return Err(PromoRejection::NotYetActive);
        }
        if cart_total < self.min_order_amount {
            return Err(PromoRejection::BelowMinimum(self.min_order_amount));
        }
        if !self.has_capacity() {
            return Err(PromoRejection::LimitReached);
        }
        if already_used {
            return Err(PromoRejection::AlreadyUsed);
        }
        Ok(())
    }

    /// Full-precision discount, never negative and never above the cart total.
    pub fn discount_for(&self, cart_total: Decimal) -> Decimal {
        let raw = match self.discount_type {
            DiscountType::Percentage => {
                let pct = cart_total * self.discount_value / Decimal::ONE_HUNDRED;
                match self.max_discount {
                    Some(cap) if pct > cap => cap,
                    _ => pct,
                }
            }
            DiscountType::Fixed => self.discount_value,
        };
        raw.min(cart_total).max(Decimal::ZERO)
    }
}
