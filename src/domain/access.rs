use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Rider,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Rider => "rider",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Role::Customer),
            "rider" => Ok(Role::Rider),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateOrder,
    ListOwnOrders,
    ReadOrder,
    ListAllOrders,
    FilterOrders,
    AssignRider,
    ListAssignedOrders,
    StartOrder,
    PickupOrder,
    DeliverOrder,
    CancelOrder,
    RefundOrder,
    ForceSetStatus,
    PreviewPromo,
    ManagePromos,
    ManageInventory,
    ManageCart,
    SetAvailability,
    ListRiders,
}

impl Action {
    pub fn allowed_roles(self) -> &'static [Role] {
        use Action::*;
        match self {
            CreateOrder | ListOwnOrders | PreviewPromo | ManageCart => &[Role::Customer],
            ReadOrder => &[Role::Customer, Role::Rider, Role::Admin],
            ListAssignedOrders | StartOrder | PickupOrder | DeliverOrder | SetAvailability => {
                &[Role::Rider]
            }
            ListAllOrders | FilterOrders | AssignRider | CancelOrder | RefundOrder
            | ForceSetStatus | ManagePromos | ManageInventory | ListRiders => &[Role::Admin],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Access denied. {required} only.")]
pub struct AccessDenied {
    pub required: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub role: Role,
}

impl Caller {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn authorize(&self, action: Action) -> Result<(), AccessDenied> {
        let allowed = action.allowed_roles();
        if allowed.contains(&self.role) {
            return Ok(());
        }
        let required = allowed
            .iter()
            .map(|r| capitalize(r.as_str()))
            .collect::<Vec<_>>()
            .join("/");
        Err(AccessDenied { required })
    }

    /// Customers read their own orders, riders the ones assigned to them, admins anything.
    pub fn can_read_order(&self, owner_id: Uuid, rider_id: Option<Uuid>) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Customer => owner_id == self.user_id,
            Role::Rider => rider_id == Some(self.user_id),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
