use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use password_hash::rand_core::OsRng;
use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    db::is_unique_violation,
    domain::{Caller, Role},
    dto::auth::{Claims, LoginRequest, LoginResponse, OtpSent, SendOtpRequest, VerifyOtpRequest},
    entity::users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    error::{AppError, AppResult},
    models::User,
    response::{ApiResponse, Meta},
    services::otp_store::normalize_phone,
    state::AppState,
};

pub async fn send_otp(
    state: &AppState,
    payload: SendOtpRequest,
) -> AppResult<ApiResponse<OtpSent>> {
    let (phone, code) = state.otp.issue(&payload.phone).await?;
    // no SMS gateway is wired in; the code is only visible in debug logs
    tracing::debug!(%phone, %code, "otp issued");

    Ok(ApiResponse::success(
        "OTP sent",
        OtpSent {
            phone,
            expires_in_secs: state.otp.ttl().as_secs(),
        },
        Some(Meta::empty()),
    ))
}

/// Verify a login code; first-time phones get a customer account.
pub async fn verify_otp(
    state: &AppState,
    payload: VerifyOtpRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    if payload.otp.trim().is_empty() {
        return Err(AppError::BadRequest("Phone and OTP are required".into()));
    }
    let phone = state.otp.verify(&payload.phone, &payload.otp).await?;

    let existing = Users::find()
        .filter(UserCol::Phone.eq(phone.as_str()))
        .one(&state.orm)
        .await?;
    let model = match existing {
        Some(model) => model,
        None => {
            let inserted = UserActive {
                id: Set(Uuid::new_v4()),
                phone: Set(Some(phone.clone())),
                email: Set(None),
                full_name: Set(None),
                password_hash: Set(None),
                role: Set(Role::Customer.as_str().to_string()),
                created_at: NotSet,
            }
            .insert(&state.orm)
            .await;
            match inserted {
                Ok(model) => {
                    tracing::info!(user_id = %model.id, "customer account created");
                    model
                }
                // a concurrent verify for the same phone created it first
                Err(err) if is_unique_violation(&err) => Users::find()
                    .filter(UserCol::Phone.eq(phone.as_str()))
                    .one(&state.orm)
                    .await?
                    .ok_or(AppError::NotFound("User"))?,
                Err(err) => return Err(err.into()),
            }
        }
    };

    let user = User::from_entity(model)?;
    let token = issue_token(&state.config, user.id, user.role)?;
    Ok(ApiResponse::success(
        "Logged in",
        LoginResponse { token, user },
        Some(Meta::empty()),
    ))
}

pub async fn login(state: &AppState, payload: LoginRequest) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest { phone, password } = payload;
    let invalid = || AppError::BadRequest("Invalid phone or password".into());
    let phone = normalize_phone(&phone).ok_or_else(invalid)?;

    let model = Users::find()
        .filter(UserCol::Phone.eq(phone.as_str()))
        .one(&state.orm)
        .await?
        .ok_or_else(invalid)?;
    let stored = model.password_hash.as_deref().ok_or_else(invalid)?;
    if !verify_password(&password, stored)? {
        return Err(invalid());
    }

    let user = User::from_entity(model)?;
    let token = issue_token(&state.config, user.id, user.role)?;
    tracing::info!(user_id = %user.id, role = %user.role, "staff login");

    Ok(ApiResponse::success(
        "Logged in",
        LoginResponse { token, user },
        Some(Meta::empty()),
    ))
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

fn verify_password(password: &str, stored: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(stored)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn issue_token(config: &AppConfig, user_id: Uuid, role: Role) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(config.jwt_ttl_hours))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        role: role.as_str().to_string(),
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn decode_token(config: &AppConfig, token: &str) -> AppResult<Caller> {
    let unauthorized = || AppError::Unauthorized("Invalid or expired token".into());
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| unauthorized())?;

    let user_id = Uuid::parse_str(&decoded.claims.sub).map_err(|_| unauthorized())?;
    let role = decoded.claims.role.parse::<Role>().map_err(|_| unauthorized())?;
    Ok(Caller::new(user_id, role))
}
