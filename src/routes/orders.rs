use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::orders::{
        AssignRiderRequest, CreateOrderRequest, CreateOrderResponse, OrderList, OrderWithItems,
        UpdateStatusRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::Order,
    response::ApiResponse,
    routes::params::{OrderFilterQuery, OrderListQuery, Pagination},
    services::{order_service, order_status_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_order))
        .route("/my", get(list_my_orders))
        .route("/rider/my", get(list_rider_orders))
        .route("/admin/all", get(list_all_orders))
        .route("/admin/filter", get(filter_orders))
        .route("/{id}", get(get_order))
        .route("/assign/{id}", put(assign_rider))
        .route("/status/{id}", put(update_status))
        .route("/rider/start/{id}", put(start_order))
        .route("/rider/picked/{id}", put(pickup_order))
        .route("/rider/delivered/{id}", put(deliver_order))
        .route("/admin/cancel/{id}", put(cancel_order))
        .route("/admin/refund/{id}", put(refund_order))
        .route("/admin/status/{id}", put(force_set_status))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order placed", body = ApiResponse<CreateOrderResponse>),
        (status = 400, description = "Invalid items, stale prices, promo or stock conflict"),
        (status = 403, description = "Customers only"),
        (status = 404, description = "Product or promo code not found"),
        (status = 503, description = "Order transaction timed out, retry"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CreateOrderResponse>>)> {
    let resp = order_service::create_order(&state, &caller, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/orders/my",
    params(OrderListQuery),
    responses(
        (status = 200, description = "Caller's orders, newest first", body = ApiResponse<OrderList>),
        (status = 403, description = "Customers only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_my_orders(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_my_orders(&state, &caller, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/rider/my",
    params(OrderListQuery),
    responses(
        (status = 200, description = "Orders assigned to the calling rider", body = ApiResponse<OrderList>),
        (status = 403, description = "Riders only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Rider"
)]
pub async fn list_rider_orders(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_assigned_orders(&state, &caller, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/admin/all",
    params(Pagination),
    responses(
        (status = 200, description = "Every order, newest first", body = ApiResponse<OrderList>),
        (status = 403, description = "Admins only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_orders(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_all_orders(&state, &caller, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/admin/filter",
    params(OrderFilterQuery),
    responses(
        (status = 200, description = "Filtered orders", body = ApiResponse<OrderList>),
        (status = 400, description = "Unknown status"),
        (status = 403, description = "Admins only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn filter_orders(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Query(query): Query<OrderFilterQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::filter_orders(&state, &caller, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order with items", body = ApiResponse<OrderWithItems>),
        (status = 403, description = "Access denied"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = order_service::get_order(&state, &caller, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/orders/assign/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = AssignRiderRequest,
    responses(
        (status = 200, description = "Rider assigned", body = ApiResponse<Order>),
        (status = 400, description = "Order cannot be assigned in its current status"),
        (status = 403, description = "Admins only"),
        (status = 404, description = "Order or rider not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn assign_rider(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignRiderRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = order_status_service::assign_rider(&state, &caller, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/orders/status/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated through the matching rider transition", body = ApiResponse<Order>),
        (status = 400, description = "Unknown or illegal status"),
        (status = 403, description = "Not the assigned rider"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Rider"
)]
pub async fn update_status(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = order_status_service::update_status(&state, &caller, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/orders/rider/start/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Rider started", body = ApiResponse<Order>),
        (status = 400, description = "Order is not assigned"),
        (status = 403, description = "Order not assigned to this rider"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Rider"
)]
pub async fn start_order(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = order_status_service::start_order(&state, &caller, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/orders/rider/picked/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order picked up", body = ApiResponse<Order>),
        (status = 400, description = "Rider has not started"),
        (status = 403, description = "Order not assigned to this rider"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Rider"
)]
pub async fn pickup_order(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = order_status_service::pickup_order(&state, &caller, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/orders/rider/delivered/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order delivered", body = ApiResponse<Order>),
        (status = 400, description = "Order has not been picked up"),
        (status = 403, description = "Order not assigned to this rider"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Rider"
)]
pub async fn deliver_order(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = order_status_service::deliver_order(&state, &caller, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/orders/admin/cancel/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order cancelled, rider cleared", body = ApiResponse<Order>),
        (status = 400, description = "Order already finished"),
        (status = 403, description = "Admins only"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = order_status_service::cancel_order(&state, &caller, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/orders/admin/refund/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order refunded", body = ApiResponse<Order>),
        (status = 403, description = "Admins only"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn refund_order(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = order_status_service::refund_order(&state, &caller, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/orders/admin/status/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status overridden (audited)", body = ApiResponse<Order>),
        (status = 400, description = "Unknown status"),
        (status = 403, description = "Admins only"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn force_set_status(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = order_status_service::force_set_status(&state, &caller, id, payload).await?;
    Ok(Json(resp))
}
