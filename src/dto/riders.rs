use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Rider, User};

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRiderRequest {
    pub full_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RiderProfile {
    pub user: User,
    pub rider: Rider,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AvailabilityRequest {
    pub is_available: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RiderList {
    pub items: Vec<Rider>,
}
