use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    db::is_unique_violation,
    domain::{Action, Caller, Role},
    dto::riders::{AvailabilityRequest, RegisterRiderRequest, RiderList, RiderProfile},
    entity::{
        riders::{ActiveModel as RiderActive, Column as RiderCol, Entity as Riders},
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    models::{Rider, User},
    response::{ApiResponse, Meta},
    services::{auth_service::hash_password, otp_store::normalize_phone},
    state::AppState,
};

pub async fn register_rider(
    state: &AppState,
    payload: RegisterRiderRequest,
) -> AppResult<ApiResponse<RiderProfile>> {
    let phone = normalize_phone(&payload.phone)
        .ok_or_else(|| AppError::BadRequest("phone is required".into()))?;
    if payload.full_name.trim().is_empty() {
        return Err(AppError::BadRequest("full_name is required".into()));
    }
    if payload.password.len() < 6 {
        return Err(AppError::BadRequest(
            "password must be at least 6 characters".into(),
        ));
    }

    let taken = Users::find()
        .filter(UserCol::Phone.eq(phone.as_str()))
        .one(&state.orm)
        .await?
        .is_some();
    if taken {
        return Err(AppError::BadRequest("Phone number already registered".into()));
    }

    let password_hash = hash_password(&payload.password)?;
    let already_registered = || AppError::BadRequest("Phone number already registered".into());

    let txn = state.orm.begin().await?;
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        phone: Set(Some(phone)),
        email: Set(payload.email.filter(|e| !e.trim().is_empty())),
        full_name: Set(Some(payload.full_name.trim().to_string())),
        password_hash: Set(Some(password_hash)),
        role: Set(Role::Rider.as_str().to_string()),
        created_at: NotSet,
    }
    .insert(&txn)
    .await
    .map_err(|err| {
        if is_unique_violation(&err) {
            already_registered()
        } else {
            err.into()
        }
    })?;
    let rider = RiderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.id),
        is_available: Set(true),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    tracing::info!(user_id = %user.id, "rider registered");
    Ok(ApiResponse::success(
        "Rider registered successfully",
        RiderProfile {
            user: User::from_entity(user)?,
            rider: Rider::from(rider),
        },
        Some(Meta::empty()),
    ))
}

pub async fn set_availability(
    state: &AppState,
    caller: &Caller,
    payload: AvailabilityRequest,
) -> AppResult<ApiResponse<Rider>> {
    caller.authorize(Action::SetAvailability)?;
    let existing = Riders::find()
        .filter(RiderCol::UserId.eq(caller.user_id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Rider"))?;

    let mut active: RiderActive = existing.into();
    active.is_available = Set(payload.is_available);
    active.updated_at = Set(Utc::now().into());
    let rider = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Availability updated",
        Rider::from(rider),
        Some(Meta::empty()),
    ))
}

pub async fn list_available(
    state: &AppState,
    caller: &Caller,
) -> AppResult<ApiResponse<RiderList>> {
    caller.authorize(Action::ListRiders)?;
    let items: Vec<Rider> = Riders::find()
        .filter(RiderCol::IsAvailable.eq(true))
        .order_by_asc(RiderCol::UpdatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Rider::from)
        .collect();
    let len = items.len();
    Ok(ApiResponse::list("Available riders", RiderList { items }, len))
}
