use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, sea_query::Expr};
use uuid::Uuid;

use crate::{
    audit,
    domain::{Action, Caller, OrderStatus},
    dto::orders::{AssignRiderRequest, UpdateStatusRequest},
    entity::{
        orders::{Column as OrderCol, Entity as Orders, Model as OrderModel},
        riders::{Column as RiderCol, Entity as Riders},
    },
    error::{AppError, AppResult},
    models::Order,
    response::{ApiResponse, Meta},
    services::notification_service::{OrderStatusEvent, notify_status_change},
    state::AppState,
};

const NOT_ASSIGNED: &str = "Order not assigned to this rider";

#[derive(Debug, Clone, Copy)]
enum RiderChange {
    Keep,
    Set(Uuid),
    Clear,
}

/// One guarded write: `UPDATE orders SET status = next ... WHERE id = $1
/// AND status IN (predecessors of next) [AND rider_id = $rider]`.
#[derive(Debug, Clone, Copy)]
struct Transition {
    next: OrderStatus,
    assigned_rider: Option<Uuid>,
    rider: RiderChange,
}

impl Transition {
    fn to(next: OrderStatus) -> Self {
        Self {
            next,
            assigned_rider: None,
            rider: RiderChange::Keep,
        }
    }

    fn by_rider(next: OrderStatus, rider_id: Uuid) -> Self {
        Self {
            assigned_rider: Some(rider_id),
            ..Self::to(next)
        }
    }

    fn with_rider(mut self, rider: RiderChange) -> Self {
        self.rider = rider;
        self
    }
}

async fn apply(state: &AppState, order_id: Uuid, transition: Transition) -> AppResult<Order> {
    let mut update = Orders::update_many()
        .col_expr(OrderCol::Status, Expr::value(transition.next.as_str()))
        .col_expr(OrderCol::UpdatedAt, Expr::value(Utc::now()))
        .filter(OrderCol::Id.eq(order_id))
        .filter(OrderCol::Status.is_in(transition.next.predecessor_values()));
    if let Some(rider_id) = transition.assigned_rider {
        update = update.filter(OrderCol::RiderId.eq(rider_id));
    }
    update = match transition.rider {
        RiderChange::Keep => update,
        RiderChange::Set(rider_id) => update.col_expr(OrderCol::RiderId, Expr::value(rider_id)),
        RiderChange::Clear => {
            update.col_expr(OrderCol::RiderId, Expr::value(Option::<Uuid>::None))
        }
    };

    let updated = update.exec_with_returning(&state.orm).await?;
    let Some(model) = updated.into_iter().next() else {
        return Err(explain_rejection(state, order_id, transition).await);
    };

    let order = Order::from_entity(model)?;
    tracing::info!(
        order_id = %order.id,
        status = %order.status,
        rider_id = ?order.rider_id,
        "order status changed"
    );
    notify_status_change(
        state,
        OrderStatusEvent {
            order_id: order.id,
            user_id: order.user_id,
            status: order.status,
        },
    )
    .await;
    Ok(order)
}

async fn explain_rejection(state: &AppState, order_id: Uuid, transition: Transition) -> AppError {
    let order: OrderModel = match Orders::find_by_id(order_id).one(&state.orm).await {
        Ok(Some(order)) => order,
        Ok(None) => return AppError::NotFound("Order"),
        Err(err) => return err.into(),
    };
    if let Some(rider_id) = transition.assigned_rider {
        if order.rider_id != Some(rider_id) {
            return AppError::forbidden(NOT_ASSIGNED);
        }
    }
    let current = match Order::from_entity(order) {
        Ok(order) => order.status,
        Err(err) => return err,
    };
    match current.check_transition(transition.next) {
        Err(err) => err.into(),
        // status moved between the write and the re-read
        Ok(()) => AppError::Conflict("Order was modified concurrently, please retry".into()),
    }
}

pub async fn assign_rider(
    state: &AppState,
    caller: &Caller,
    order_id: Uuid,
    payload: AssignRiderRequest,
) -> AppResult<ApiResponse<Order>> {
    caller.authorize(Action::AssignRider)?;
    let on_roster = Riders::find()
        .filter(RiderCol::UserId.eq(payload.rider_id))
        .count(&state.orm)
        .await?
        > 0;
    if !on_roster {
        return Err(AppError::NotFound("Rider"));
    }

    let order = apply(
        state,
        order_id,
        Transition::to(OrderStatus::Assigned).with_rider(RiderChange::Set(payload.rider_id)),
    )
    .await?;
    Ok(ApiResponse::success("Rider assigned", order, Some(Meta::empty())))
}

pub async fn start_order(
    state: &AppState,
    caller: &Caller,
    order_id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    caller.authorize(Action::StartOrder)?;
    let order = apply(
        state,
        order_id,
        Transition::by_rider(OrderStatus::RiderStarted, caller.user_id),
    )
    .await?;
    Ok(ApiResponse::success("Rider started", order, Some(Meta::empty())))
}

pub async fn pickup_order(
    state: &AppState,
    caller: &Caller,
    order_id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    caller.authorize(Action::PickupOrder)?;
    let order = apply(
        state,
        order_id,
        Transition::by_rider(OrderStatus::PickedUp, caller.user_id),
    )
    .await?;
    Ok(ApiResponse::success("Order picked up", order, Some(Meta::empty())))
}

pub async fn deliver_order(
    state: &AppState,
    caller: &Caller,
    order_id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    caller.authorize(Action::DeliverOrder)?;
    let order = apply(
        state,
        order_id,
        Transition::by_rider(OrderStatus::Delivered, caller.user_id),
    )
    .await?;
    Ok(ApiResponse::success("Order delivered", order, Some(Meta::empty())))
}

pub async fn cancel_order(
    state: &AppState,
    caller: &Caller,
    order_id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    caller.authorize(Action::CancelOrder)?;
    let order = apply(
        state,
        order_id,
        Transition::to(OrderStatus::Cancelled).with_rider(RiderChange::Clear),
    )
    .await?;

    audit::record(
        &state.pool,
        caller.user_id,
        "order_cancel",
        "orders",
        serde_json::json!({ "order_id": order.id }),
    )
    .await;

    Ok(ApiResponse::success("Order cancelled", order, Some(Meta::empty())))
}

pub async fn refund_order(
    state: &AppState,
    caller: &Caller,
    order_id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    caller.authorize(Action::RefundOrder)?;
    let order = apply(state, order_id, Transition::to(OrderStatus::Refunded)).await?;

    audit::record(
        &state.pool,
        caller.user_id,
        "order_refund",
        "orders",
        serde_json::json!({ "order_id": order.id, "amount": order.total_price }),
    )
    .await;

    Ok(ApiResponse::success("Order refunded", order, Some(Meta::empty())))
}

/// Admin override: writes any known status regardless of the transition table.
pub async fn force_set_status(
    state: &AppState,
    caller: &Caller,
    order_id: Uuid,
    payload: UpdateStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    caller.authorize(Action::ForceSetStatus)?;
    let status = payload.status.parse::<OrderStatus>()?;

    let previous = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Order"))?;

    let updated = Orders::update_many()
        .col_expr(OrderCol::Status, Expr::value(status.as_str()))
        .col_expr(OrderCol::UpdatedAt, Expr::value(Utc::now()))
        .filter(OrderCol::Id.eq(order_id))
        .exec_with_returning(&state.orm)
        .await?;
    let model = updated
        .into_iter()
        .next()
        .ok_or(AppError::NotFound("Order"))?;
    let order = Order::from_entity(model)?;

    let reopened = previous
        .status
        .parse::<OrderStatus>()
        .is_ok_and(|from| from.is_terminal() && !status.is_terminal());
    if reopened {
        tracing::warn!(
            order_id = %order.id,
            from = %previous.status,
            to = %order.status,
            "override reopens a closed order"
        );
    }
    tracing::info!(
        order_id = %order.id,
        from = %previous.status,
        to = %order.status,
        admin_id = %caller.user_id,
        "order status overridden"
    );
    audit::record(
        &state.pool,
        caller.user_id,
        "order_status_override",
        "orders",
        serde_json::json!({
            "order_id": order.id,
            "old_status": previous.status,
            "new_status": order.status,
            "reopened": reopened,
        }),
    )
    .await;
    notify_status_change(
        state,
        OrderStatusEvent {
            order_id: order.id,
            user_id: order.user_id,
            status: order.status,
        },
    )
    .await;

    Ok(ApiResponse::success("Order status overridden", order, Some(Meta::empty())))
}

/// Generic rider status write kept for older app builds; routed through the
/// validated rider transitions.
pub async fn update_status(
    state: &AppState,
    caller: &Caller,
    order_id: Uuid,
    payload: UpdateStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    match payload.status.parse::<OrderStatus>()? {
        OrderStatus::RiderStarted => start_order(state, caller, order_id).await,
        OrderStatus::PickedUp => pickup_order(state, caller, order_id).await,
        OrderStatus::Delivered => deliver_order(state, caller, order_id).await,
        other => Err(AppError::BadRequest(format!(
            "Riders cannot set status {other}; use rider_started, picked_up or delivered"
        ))),
    }
}
