use std::collections::{HashMap, HashSet};

use chrono::{Datelike, Days, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, Set, TransactionTrait, ActiveValue::NotSet,
};
use uuid::Uuid;

use crate::{
    domain::{
        Action, Caller, OrderStatus,
        money::{amounts_match, round_money},
    },
    dto::orders::{CreateOrderRequest, CreateOrderResponse, OrderList, OrderLineRequest, OrderWithItems},
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems},
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    models::{Order, OrderItem, PAYMENT_METHOD_COD},
    response::{ApiResponse, Meta},
    routes::params::{DateRange, OrderFilterQuery, OrderListQuery, Pagination, SortOrder},
    services::{
        inventory_service,
        notification_service::{OrderStatusEvent, notify_status_change},
        promo_service::{self, AppliedPromo},
    },
    state::AppState,
};

pub async fn create_order(
    state: &AppState,
    caller: &Caller,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<CreateOrderResponse>> {
    caller.authorize(Action::CreateOrder)?;
    let lines = validate_request(&payload)?;

    let placed = tokio::time::timeout(
        state.config.order_tx_timeout,
        place_order(state, caller.user_id, &payload, lines),
    )
    .await
    .map_err(|_| {
        tracing::warn!(
            user_id = %caller.user_id,
            timeout_ms = state.config.order_tx_timeout.as_millis() as u64,
            "order transaction timed out"
        );
        AppError::Timeout
    })??;

    tracing::info!(
        order_id = %placed.order_id,
        user_id = %caller.user_id,
        total = %placed.order.total_price,
        discount = %placed.discount_applied,
        items = placed.items.len(),
        "order created"
    );

    notify_status_change(
        state,
        OrderStatusEvent {
            order_id: placed.order_id,
            user_id: caller.user_id,
            status: OrderStatus::Pending,
        },
    )
    .await;

    Ok(ApiResponse::success(
        "Order created successfully",
        placed,
        Some(Meta::empty()),
    ))
}

fn validate_request(payload: &CreateOrderRequest) -> AppResult<Vec<OrderLineRequest>> {
    if payload.items.is_empty() {
        return Err(AppError::BadRequest("Order must contain at least one item".into()));
    }
    if payload.delivery_address.trim().is_empty() {
        return Err(AppError::BadRequest("delivery_address is required".into()));
    }
    if payload
        .discount_amount
        .is_some_and(|discount| discount < Decimal::ZERO)
    {
        return Err(AppError::BadRequest("discount_amount must not be negative".into()));
    }

    let mut seen = HashSet::new();
    for line in &payload.items {
        if line.quantity <= 0 {
            return Err(AppError::BadRequest("quantity must be greater than 0".into()));
        }
        if !seen.insert(line.product_id) {
            return Err(AppError::BadRequest(format!(
                "Product {} appears more than once",
                line.product_id
            )));
        }
    }

    let mut lines = payload.items.clone();
    // fixed lock order across concurrent orders
    lines.sort_by_key(|line| line.product_id);
    Ok(lines)
}

async fn place_order(
    state: &AppState,
    user_id: Uuid,
    payload: &CreateOrderRequest,
    lines: Vec<OrderLineRequest>,
) -> AppResult<CreateOrderResponse> {
    let txn = state.orm.begin().await?;

    let prices = load_prices(&txn, &lines).await?;
    let mut subtotal = Decimal::ZERO;
    for line in &lines {
        let price = prices[&line.product_id];
        if line.price.is_some_and(|client| !amounts_match(client, price)) {
            return Err(AppError::BadRequest(format!(
                "Price of product {} has changed",
                line.product_id
            )));
        }
        subtotal += price * Decimal::from(line.quantity);
    }

    let applied = match payload.promo_code_id {
        Some(promo_code_id) => {
            let promo = promo_service::find_by_id(&txn, promo_code_id).await?;
            Some(promo_service::evaluate(&txn, promo, user_id, subtotal, Utc::now()).await?)
        }
        None => None,
    };
    let discount = applied
        .as_ref()
        .map(|applied| round_money(applied.discount))
        .unwrap_or(Decimal::ZERO);
    if let Some(client) = payload.discount_amount {
        if !amounts_match(client, discount) {
            return Err(AppError::BadRequest(format!(
                "discount_amount does not match the promo code (expected {discount})"
            )));
        }
    }

    let total_price = round_money(subtotal - discount);
    // clients send either the cart subtotal or the discounted total
    if let Some(client) = payload.total_price {
        if !amounts_match(client, subtotal) && !amounts_match(client, total_price) {
            return Err(AppError::BadRequest(format!(
                "total_price does not match the order items (expected {total_price})"
            )));
        }
    }

    let order_id = Uuid::new_v4();
    let order = OrderActive {
        id: Set(order_id),
        user_id: Set(user_id),
        total_price: Set(total_price),
        delivery_address: Set(payload.delivery_address.trim().to_string()),
        status: Set(OrderStatus::Pending.as_str().to_string()),
        payment_method: Set(PAYMENT_METHOD_COD.to_string()),
        rider_id: Set(None),
        promo_code_id: Set(applied.as_ref().map(|applied| applied.promo.id)),
        discount_amount: Set(discount),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut items = Vec::with_capacity(lines.len());
    for line in &lines {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            product_id: Set(line.product_id),
            quantity: Set(line.quantity),
            price: Set(prices[&line.product_id]),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
        inventory_service::reserve(&txn, line.product_id, line.quantity).await?;
        items.push(OrderItem::from(item));
    }

    if let Some(applied) = &applied {
        redeem(&txn, applied, user_id, order_id, discount).await?;
    }

    CartItems::delete_many()
        .filter(CartCol::UserId.eq(user_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    Ok(CreateOrderResponse {
        order_id,
        order: Order::from_entity(order)?,
        items,
        discount_applied: discount,
    })
}

async fn load_prices(
    txn: &DatabaseTransaction,
    lines: &[OrderLineRequest],
) -> AppResult<HashMap<Uuid, Decimal>> {
    let ids: Vec<Uuid> = lines.iter().map(|line| line.product_id).collect();
    let prices: HashMap<Uuid, Decimal> = Products::find()
        .filter(ProdCol::Id.is_in(ids))
        .all(txn)
        .await?
        .into_iter()
        .map(|product| (product.id, product.price))
        .collect();
    if lines.iter().any(|line| !prices.contains_key(&line.product_id)) {
        return Err(AppError::NotFound("Product"));
    }
    Ok(prices)
}

async fn redeem(
    txn: &DatabaseTransaction,
    applied: &AppliedPromo,
    user_id: Uuid,
    order_id: Uuid,
    discount: Decimal,
) -> AppResult<()> {
    promo_service::redeem(txn, applied, user_id, order_id, discount)
        .await
        .inspect_err(|err| {
            tracing::warn!(
                error = %err,
                promo_code_id = %applied.promo.id,
                %user_id,
                "promo redemption rejected"
            )
        })
}

pub async fn list_my_orders(
    state: &AppState,
    caller: &Caller,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    caller.authorize(Action::ListOwnOrders)?;
    let condition = Condition::all()
        .add(OrderCol::UserId.eq(caller.user_id))
        .add_option(status_condition(query.status.as_deref())?);
    paginate(
        state,
        Orders::find().filter(condition),
        query.sort_order,
        query.pagination(),
    )
    .await
}

pub async fn list_assigned_orders(
    state: &AppState,
    caller: &Caller,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    caller.authorize(Action::ListAssignedOrders)?;
    let condition = Condition::all()
        .add(OrderCol::RiderId.eq(caller.user_id))
        .add_option(status_condition(query.status.as_deref())?);
    paginate(
        state,
        Orders::find().filter(condition),
        query.sort_order,
        query.pagination(),
    )
    .await
}

pub async fn list_all_orders(
    state: &AppState,
    caller: &Caller,
    pagination: Pagination,
) -> AppResult<ApiResponse<OrderList>> {
    caller.authorize(Action::ListAllOrders)?;
    paginate(state, Orders::find(), None, pagination).await
}

pub async fn filter_orders(
    state: &AppState,
    caller: &Caller,
    query: OrderFilterQuery,
) -> AppResult<ApiResponse<OrderList>> {
    caller.authorize(Action::FilterOrders)?;
    let mut condition = Condition::all()
        .add_option(status_condition(query.status.as_deref())?)
        .add_option(query.customer_id.map(|id| OrderCol::UserId.eq(id)))
        .add_option(query.rider_id.map(|id| OrderCol::RiderId.eq(id)));

    if let Some(range) = query.date {
        let (start, end) = created_window(range, Utc::now().date_naive());
        condition = condition
            .add(OrderCol::CreatedAt.gte(start_of(start)))
            .add_option(end.map(|end| OrderCol::CreatedAt.lt(start_of(end))));
    }
    if let Some(from) = query.from {
        condition = condition.add(OrderCol::CreatedAt.gte(start_of(from)));
    }
    if let Some(to) = query.to {
        let next = to.checked_add_days(Days::new(1)).unwrap_or(to);
        condition = condition.add(OrderCol::CreatedAt.lt(start_of(next)));
    }

    paginate(
        state,
        Orders::find().filter(condition),
        None,
        query.pagination(),
    )
    .await
}

/// Day window `[start, end)` for a named range relative to `today`; an open
/// end means "until now".
pub fn created_window(range: DateRange, today: NaiveDate) -> (NaiveDate, Option<NaiveDate>) {
    let yesterday = today.checked_sub_days(Days::new(1)).unwrap_or(today);
    match range {
        DateRange::Today => (today, today.checked_add_days(Days::new(1))),
        DateRange::Yesterday => (yesterday, Some(today)),
        DateRange::Week => (
            today.checked_sub_days(Days::new(7)).unwrap_or(today),
            None,
        ),
        DateRange::Month => (
            NaiveDate::from_ymd_opt(today.year(), today.month(), 1).unwrap_or(today),
            None,
        ),
    }
}

fn start_of(day: NaiveDate) -> chrono::DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

fn status_condition(status: Option<&str>) -> AppResult<Option<sea_orm::sea_query::SimpleExpr>> {
    match status.filter(|s| !s.trim().is_empty()) {
        Some(raw) => {
            let status = raw.parse::<OrderStatus>()?;
            Ok(Some(OrderCol::Status.eq(status.as_str())))
        }
        None => Ok(None),
    }
}

async fn paginate(
    state: &AppState,
    finder: Select<Orders>,
    sort_order: Option<SortOrder>,
    pagination: Pagination,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = pagination.normalize();
    let finder = match sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;
    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Orders",
        OrderList {
            items: Order::from_entities(orders)?,
        },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    caller: &Caller,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    caller.authorize(Action::ReadOrder)?;
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Order"))?;
    if !caller.can_read_order(order.user_id, order.rider_id) {
        return Err(AppError::forbidden("Access denied"));
    }

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect();

    Ok(ApiResponse::success(
        "Order",
        OrderWithItems {
            order: Order::from_entity(order)?,
            items,
        },
        Some(Meta::empty()),
    ))
}
