use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
    ActiveValue::NotSet,
    sea_query::{Expr, Func},
};
use uuid::Uuid;

use crate::{
    audit,
    db::is_unique_violation,
    domain::{
        Action, Caller,
        money::round_money,
        promo::{DiscountType, PromoRejection},
    },
    dto::promo::{
        CreatePromoRequest, PromoList, PromoPreview, PromoStats, UpdatePromoRequest,
        ValidatePromoRequest,
    },
    entity::{
        promo_code_usage::{
            ActiveModel as UsageActive, Column as UsageCol, Entity as PromoCodeUsage,
        },
        promo_codes::{ActiveModel as PromoActive, Column as PromoCol, Entity as PromoCodes},
    },
    error::{AppError, AppResult},
    models::{PromoCode, PromoCodeUsage as PromoCodeUsageDto},
    response::{ApiResponse, Meta},
    state::AppState,
};

#[derive(Debug, Clone)]
pub struct AppliedPromo {
    pub promo: PromoCode,
    /// Full-precision discount; round only when presenting or persisting.
    pub discount: Decimal,
}

pub async fn find_by_code<C>(conn: &C, code: &str) -> AppResult<Option<PromoCode>>
where
    C: ConnectionTrait,
{
    PromoCodes::find()
        .filter(Expr::expr(Func::upper(Expr::col(PromoCol::Code))).eq(normalize_code(code)))
        .one(conn)
        .await?
        .map(PromoCode::from_entity)
        .transpose()
}

pub async fn find_by_id<C>(conn: &C, id: Uuid) -> AppResult<Option<PromoCode>>
where
    C: ConnectionTrait,
{
    PromoCodes::find_by_id(id)
        .one(conn)
        .await?
        .map(PromoCode::from_entity)
        .transpose()
}

pub async fn has_redeemed<C>(conn: &C, promo_code_id: Uuid, user_id: Uuid) -> AppResult<bool>
where
    C: ConnectionTrait,
{
    let count = PromoCodeUsage::find()
        .filter(UsageCol::PromoCodeId.eq(promo_code_id))
        .filter(UsageCol::UserId.eq(user_id))
        .count(conn)
        .await?;
    Ok(count > 0)
}

pub async fn evaluate<C>(
    conn: &C,
    promo: Option<PromoCode>,
    user_id: Uuid,
    cart_total: Decimal,
    now: DateTime<Utc>,
) -> AppResult<AppliedPromo>
where
    C: ConnectionTrait,
{
    let promo = promo.ok_or(PromoRejection::Invalid)?;
    let rule = promo.rule();
    // usage lookup only for otherwise eligible codes
    rule.check(cart_total, now, false)?;
    let already_used = has_redeemed(conn, promo.id, user_id).await?;
    rule.check(cart_total, now, already_used)?;

    let discount = rule.discount_for(cart_total);
    Ok(AppliedPromo { promo, discount })
}

/// Consume the user's single use of the code inside the order transaction.
///
/// `used_count` only moves while the cap has room; the unique
/// `(promo_code_id, user_id)` index rejects a racing second redemption.
pub async fn redeem<C>(
    conn: &C,
    applied: &AppliedPromo,
    user_id: Uuid,
    order_id: Uuid,
    discount_amount: Decimal,
) -> AppResult<()>
where
    C: ConnectionTrait,
{
    let result = PromoCodes::update_many()
        .col_expr(PromoCol::UsedCount, Expr::col(PromoCol::UsedCount).add(1))
        .filter(PromoCol::Id.eq(applied.promo.id))
        .filter(PromoCol::IsActive.eq(true))
        .filter(
            Condition::any()
                .add(PromoCol::UsageLimit.is_null())
                .add(Expr::col(PromoCol::UsedCount).lt(Expr::col(PromoCol::UsageLimit))),
        )
        .exec(conn)
        .await?;
    if result.rows_affected == 0 {
        return Err(PromoRejection::LimitReached.into());
    }

    let usage = UsageActive {
        id: Set(Uuid::new_v4()),
        promo_code_id: Set(applied.promo.id),
        user_id: Set(user_id),
        order_id: Set(order_id),
        discount_amount: Set(discount_amount),
        used_at: NotSet,
    };
    match usage.insert(conn).await {
        Ok(_) => Ok(()),
        Err(err) if is_unique_violation(&err) => Err(PromoRejection::AlreadyUsed.into()),
        Err(err) => Err(err.into()),
    }
}

pub async fn validate_promo(
    state: &AppState,
    caller: &Caller,
    payload: ValidatePromoRequest,
) -> AppResult<ApiResponse<PromoPreview>> {
    caller.authorize(Action::PreviewPromo)?;
    if payload.code.trim().is_empty() {
        return Err(AppError::BadRequest("Code and cart_total are required".into()));
    }
    if payload.cart_total < Decimal::ZERO {
        return Err(AppError::BadRequest("cart_total must not be negative".into()));
    }

    let promo = find_by_code(&state.orm, &payload.code).await?;
    let applied = evaluate(
        &state.orm,
        promo,
        caller.user_id,
        payload.cart_total,
        Utc::now(),
    )
    .await?;

    let final_amount = payload.cart_total - applied.discount;
    let preview = PromoPreview {
        valid: true,
        promo_code_id: applied.promo.id,
        code: applied.promo.code.clone(),
        discount_type: applied.promo.discount_type,
        discount_value: applied.promo.discount_value,
        discount_amount: round_money(applied.discount),
        original_amount: payload.cart_total,
        final_amount: round_money(final_amount),
    };
    Ok(ApiResponse::success("Promo code applied", preview, Some(Meta::empty())))
}

pub async fn create_promo(
    state: &AppState,
    caller: &Caller,
    payload: CreatePromoRequest,
) -> AppResult<ApiResponse<PromoCode>> {
    caller.authorize(Action::ManagePromos)?;
    let code = normalize_code(&payload.code);
    if code.is_empty() {
        return Err(AppError::BadRequest(
            "Code, discount_type, and discount_value are required".into(),
        ));
    }
    let discount_type = payload
        .discount_type
        .parse::<DiscountType>()
        .map_err(AppError::BadRequest)?;
    let min_order_amount = payload.min_order_amount.unwrap_or(Decimal::ZERO);
    check_terms(
        discount_type,
        payload.discount_value,
        min_order_amount,
        payload.max_discount,
        payload.usage_limit,
        0,
    )?;

    if find_by_code(&state.orm, &code).await?.is_some() {
        return Err(AppError::BadRequest("Promo code already exists".into()));
    }

    let inserted = PromoActive {
        id: Set(Uuid::new_v4()),
        code: Set(code),
        discount_type: Set(discount_type.as_str().to_string()),
        discount_value: Set(payload.discount_value),
        min_order_amount: Set(min_order_amount),
        max_discount: Set(payload.max_discount),
        usage_limit: Set(payload.usage_limit),
        used_count: Set(0),
        is_active: Set(true),
        valid_from: Set(payload.valid_from.map(Into::into)),
        valid_until: Set(payload.valid_until.map(Into::into)),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await
    .map_err(|err| {
        if is_unique_violation(&err) {
            AppError::BadRequest("Promo code already exists".into())
        } else {
            err.into()
        }
    })?;
    let promo = PromoCode::from_entity(inserted)?;

    audit::record(
        &state.pool,
        caller.user_id,
        "promo_create",
        "promo_codes",
        serde_json::json!({ "promo_code_id": promo.id, "code": promo.code }),
    )
    .await;

    Ok(ApiResponse::success("Promo code created", promo, Some(Meta::empty())))
}

pub async fn list_promos(state: &AppState, caller: &Caller) -> AppResult<ApiResponse<PromoList>> {
    caller.authorize(Action::ManagePromos)?;
    let items = PromoCodes::find()
        .order_by_desc(PromoCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(PromoCode::from_entity)
        .collect::<AppResult<Vec<_>>>()?;
    let len = items.len();
    Ok(ApiResponse::list("Promo codes", PromoList { items }, len))
}

pub async fn update_promo(
    state: &AppState,
    caller: &Caller,
    id: Uuid,
    payload: UpdatePromoRequest,
) -> AppResult<ApiResponse<PromoCode>> {
    caller.authorize(Action::ManagePromos)?;
    let existing = PromoCodes::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Promo code"))?;

    let discount_type = match payload.discount_type.as_deref() {
        Some(raw) => raw.parse::<DiscountType>().map_err(AppError::BadRequest)?,
        None => existing
            .discount_type
            .parse::<DiscountType>()
            .map_err(AppError::BadRequest)?,
    };
    let discount_value = payload.discount_value.unwrap_or(existing.discount_value);
    let min_order_amount = payload.min_order_amount.unwrap_or(existing.min_order_amount);
    let max_discount = payload.max_discount.unwrap_or(existing.max_discount);
    let usage_limit = payload.usage_limit.unwrap_or(existing.usage_limit);
    check_terms(
        discount_type,
        discount_value,
        min_order_amount,
        max_discount,
        usage_limit,
        existing.used_count,
    )?;

    let mut active: PromoActive = existing.into();
    if let Some(code) = payload.code.as_deref() {
        let code = normalize_code(code);
        if code.is_empty() {
            return Err(AppError::BadRequest("code must not be empty".into()));
        }
        active.code = Set(code);
    }
    active.discount_type = Set(discount_type.as_str().to_string());
    active.discount_value = Set(discount_value);
    active.min_order_amount = Set(min_order_amount);
    active.max_discount = Set(max_discount);
    active.usage_limit = Set(usage_limit);
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    if let Some(valid_from) = payload.valid_from {
        active.valid_from = Set(valid_from.map(Into::into));
    }
    if let Some(valid_until) = payload.valid_until {
        active.valid_until = Set(valid_until.map(Into::into));
    }

    let updated = active.update(&state.orm).await.map_err(|err| {
        if is_unique_violation(&err) {
            AppError::BadRequest("Promo code already exists".into())
        } else {
            err.into()
        }
    })?;
    let promo = PromoCode::from_entity(updated)?;

    audit::record(
        &state.pool,
        caller.user_id,
        "promo_update",
        "promo_codes",
        serde_json::json!({ "promo_code_id": promo.id }),
    )
    .await;

    Ok(ApiResponse::success("Promo code updated", promo, Some(Meta::empty())))
}

pub async fn deactivate_promo(
    state: &AppState,
    caller: &Caller,
    id: Uuid,
) -> AppResult<ApiResponse<PromoCode>> {
    caller.authorize(Action::ManagePromos)?;
    let existing = PromoCodes::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Promo code"))?;

    let mut active: PromoActive = existing.into();
    active.is_active = Set(false);
    let promo = PromoCode::from_entity(active.update(&state.orm).await?)?;

    audit::record(
        &state.pool,
        caller.user_id,
        "promo_deactivate",
        "promo_codes",
        serde_json::json!({ "promo_code_id": promo.id }),
    )
    .await;

    Ok(ApiResponse::success("Promo code deactivated", promo, Some(Meta::empty())))
}

pub async fn delete_promo(
    state: &AppState,
    caller: &Caller,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    caller.authorize(Action::ManagePromos)?;
    let redemptions = PromoCodeUsage::find()
        .filter(UsageCol::PromoCodeId.eq(id))
        .count(&state.orm)
        .await?;
    if redemptions > 0 {
        return Err(AppError::Conflict(
            "Promo code has been redeemed; deactivate it instead".into(),
        ));
    }

    let result = PromoCodes::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Promo code"));
    }

    audit::record(
        &state.pool,
        caller.user_id,
        "promo_delete",
        "promo_codes",
        serde_json::json!({ "promo_code_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Promo code deleted successfully",
        serde_json::json!({ "promo_code_id": id }),
        Some(Meta::empty()),
    ))
}

pub async fn promo_stats(
    state: &AppState,
    caller: &Caller,
    id: Uuid,
) -> AppResult<ApiResponse<PromoStats>> {
    caller.authorize(Action::ManagePromos)?;
    let promo = find_by_id(&state.orm, id)
        .await?
        .ok_or(AppError::NotFound("Promo code"))?;

    let usage_history: Vec<PromoCodeUsageDto> = PromoCodeUsage::find()
        .filter(UsageCol::PromoCodeId.eq(id))
        .order_by_desc(UsageCol::UsedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(PromoCodeUsageDto::from)
        .collect();
    let total_discount_given = usage_history
        .iter()
        .map(|usage| usage.discount_amount)
        .sum::<Decimal>();

    let stats = PromoStats {
        promo,
        usage_count: usage_history.len(),
        total_discount_given,
        usage_history,
    };
    Ok(ApiResponse::success("Promo code stats", stats, Some(Meta::empty())))
}

fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

fn check_terms(
    discount_type: DiscountType,
    discount_value: Decimal,
    min_order_amount: Decimal,
    max_discount: Option<Decimal>,
    usage_limit: Option<i32>,
    used_count: i32,
) -> AppResult<()> {
    if discount_value <= Decimal::ZERO {
        return Err(AppError::BadRequest("discount_value must be greater than 0".into()));
    }
    if discount_type == DiscountType::Percentage && discount_value > Decimal::ONE_HUNDRED {
        return Err(AppError::BadRequest(
            "percentage discount_value must not exceed 100".into(),
        ));
    }
    if min_order_amount < Decimal::ZERO {
        return Err(AppError::BadRequest("min_order_amount must not be negative".into()));
    }
    if max_discount.is_some_and(|cap| cap <= Decimal::ZERO) {
        return Err(AppError::BadRequest("max_discount must be greater than 0".into()));
    }
    match usage_limit {
        Some(limit) if limit <= 0 => Err(AppError::BadRequest(
            "usage_limit must be greater than 0".into(),
        )),
        Some(limit) if limit < used_count => Err(AppError::BadRequest(format!(
            "usage_limit cannot be below the {used_count} uses already recorded"
        ))),
        _ => Ok(()),
    }
}
