use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::promo::{
        CreatePromoRequest, PromoList, PromoPreview, PromoStats, UpdatePromoRequest,
        ValidatePromoRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::PromoCode,
    response::ApiResponse,
    services::promo_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/validate", post(validate_promo))
        .route("/", get(list_promos).post(create_promo))
        .route("/{id}", put(update_promo).delete(delete_promo))
        .route("/{id}/deactivate", put(deactivate_promo))
        .route("/{id}/stats", get(promo_stats))
}

#[utoipa::path(
    post,
    path = "/api/promo-codes/validate",
    request_body = ValidatePromoRequest,
    responses(
        (status = 200, description = "Discount preview", body = ApiResponse<PromoPreview>),
        (status = 400, description = "Expired, not yet active, below minimum, used up or already used"),
        (status = 404, description = "Invalid or expired promo code"),
    ),
    security(("bearer_auth" = [])),
    tag = "Promo Codes"
)]
pub async fn validate_promo(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(payload): Json<ValidatePromoRequest>,
) -> AppResult<Json<ApiResponse<PromoPreview>>> {
    let resp = promo_service::validate_promo(&state, &caller, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/promo-codes",
    responses(
        (status = 200, description = "All promo codes", body = ApiResponse<PromoList>),
        (status = 403, description = "Admins only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Promo Codes"
)]
pub async fn list_promos(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> AppResult<Json<ApiResponse<PromoList>>> {
    let resp = promo_service::list_promos(&state, &caller).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/promo-codes",
    request_body = CreatePromoRequest,
    responses(
        (status = 201, description = "Promo code created", body = ApiResponse<PromoCode>),
        (status = 400, description = "Invalid terms or duplicate code"),
        (status = 403, description = "Admins only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Promo Codes"
)]
pub async fn create_promo(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(payload): Json<CreatePromoRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<PromoCode>>)> {
    let resp = promo_service::create_promo(&state, &caller, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/promo-codes/{id}",
    params(("id" = Uuid, Path, description = "Promo code ID")),
    request_body = UpdatePromoRequest,
    responses(
        (status = 200, description = "Promo code updated", body = ApiResponse<PromoCode>),
        (status = 400, description = "Invalid terms"),
        (status = 403, description = "Admins only"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Promo Codes"
)]
pub async fn update_promo(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePromoRequest>,
) -> AppResult<Json<ApiResponse<PromoCode>>> {
    let resp = promo_service::update_promo(&state, &caller, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/promo-codes/{id}/deactivate",
    params(("id" = Uuid, Path, description = "Promo code ID")),
    responses(
        (status = 200, description = "Promo code deactivated", body = ApiResponse<PromoCode>),
        (status = 403, description = "Admins only"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Promo Codes"
)]
pub async fn deactivate_promo(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PromoCode>>> {
    let resp = promo_service::deactivate_promo(&state, &caller, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/promo-codes/{id}",
    params(("id" = Uuid, Path, description = "Promo code ID")),
    responses(
        (status = 200, description = "Promo code deleted"),
        (status = 400, description = "Already redeemed; deactivate instead"),
        (status = 403, description = "Admins only"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Promo Codes"
)]
pub async fn delete_promo(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = promo_service::delete_promo(&state, &caller, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/promo-codes/{id}/stats",
    params(("id" = Uuid, Path, description = "Promo code ID")),
    responses(
        (status = 200, description = "Usage statistics", body = ApiResponse<PromoStats>),
        (status = 403, description = "Admins only"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Promo Codes"
)]
pub async fn promo_stats(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PromoStats>>> {
    let resp = promo_service::promo_stats(&state, &caller, id).await?;
    Ok(Json(resp))
}
