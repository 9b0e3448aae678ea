use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
};

use crate::{
    dto::riders::{AvailabilityRequest, RegisterRiderRequest, RiderList, RiderProfile},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Rider,
    response::ApiResponse,
    services::rider_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register_rider))
        .route("/availability", put(set_availability))
        .route("/available", get(list_available))
}

#[utoipa::path(
    post,
    path = "/api/riders/register",
    request_body = RegisterRiderRequest,
    responses(
        (status = 201, description = "Rider account and roster entry created", body = ApiResponse<RiderProfile>),
        (status = 400, description = "Missing fields or phone already registered")
    ),
    tag = "Rider"
)]
pub async fn register_rider(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRiderRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<RiderProfile>>)> {
    let resp = rider_service::register_rider(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/riders/availability",
    request_body = AvailabilityRequest,
    responses(
        (status = 200, description = "Availability updated", body = ApiResponse<Rider>),
        (status = 403, description = "Riders only"),
        (status = 404, description = "Rider profile not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Rider"
)]
pub async fn set_availability(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(payload): Json<AvailabilityRequest>,
) -> AppResult<Json<ApiResponse<Rider>>> {
    let resp = rider_service::set_availability(&state, &caller, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/riders/available",
    responses(
        (status = 200, description = "Riders accepting assignments", body = ApiResponse<RiderList>),
        (status = 403, description = "Admins only")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_available(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> AppResult<Json<ApiResponse<RiderList>>> {
    let resp = rider_service::list_available(&state, &caller).await?;
    Ok(Json(resp))
}
