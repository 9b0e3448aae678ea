use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::auth::{LoginRequest, LoginResponse, OtpSent, SendOtpRequest, VerifyOtpRequest},
    error::AppResult,
    response::ApiResponse,
    services::auth_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/otp/send", post(send_otp))
        .route("/otp/verify", post(verify_otp))
        .route("/login", post(login))
}

#[utoipa::path(
    post,
    path = "/api/auth/otp/send",
    request_body = SendOtpRequest,
    responses(
        (status = 200, description = "Login code issued", body = ApiResponse<OtpSent>),
        (status = 400, description = "Phone number is required")
    ),
    tag = "Auth"
)]
pub async fn send_otp(
    State(state): State<AppState>,
    Json(payload): Json<SendOtpRequest>,
) -> AppResult<Json<ApiResponse<OtpSent>>> {
    let resp = auth_service::send_otp(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/otp/verify",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Token and user; new phones get a customer account", body = ApiResponse<LoginResponse>),
        (status = 400, description = "Missing, expired or wrong code")
    ),
    tag = "Auth"
)]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(payload): Json<VerifyOtpRequest>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    let resp = auth_service::verify_otp(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Staff login", body = ApiResponse<LoginResponse>),
        (status = 400, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    let resp = auth_service::login(&state, payload).await?;
    Ok(Json(resp))
}
