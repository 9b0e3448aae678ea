use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, DatabaseConnection, Set};
use uuid::Uuid;

use crate::{
    domain::OrderStatus,
    entity::notifications::ActiveModel as NotificationActive,
    state::AppState,
};

pub const ORDER_STATUS_KIND: &str = "order_status";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderStatusEvent {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub title: &'static str,
    pub body: String,
}

pub fn status_message(order_id: Uuid, status: OrderStatus) -> StatusMessage {
    let (title, body) = match status {
        OrderStatus::Pending => (
            "Order Placed",
            format!("Your order #{order_id} has been placed successfully!"),
        ),
        OrderStatus::Assigned => (
            "Rider Assigned",
            format!("A rider has been assigned to your order #{order_id}"),
        ),
        OrderStatus::RiderStarted => (
            "Rider on the Way",
            format!("The rider is on the way to pick up your order #{order_id}"),
        ),
        OrderStatus::PickedUp => (
            "Order Picked Up",
            format!("Your order #{order_id} has been picked up and is on the way!"),
        ),
        OrderStatus::Delivered => (
            "Order Delivered",
            format!("Your order #{order_id} has been delivered. Enjoy!"),
        ),
        OrderStatus::Cancelled => (
            "Order Cancelled",
            format!("Your order #{order_id} has been cancelled"),
        ),
        OrderStatus::Refunded => (
            "Order Refunded",
            format!("Your order #{order_id} has been refunded"),
        ),
    };
    StatusMessage { title, body }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn order_status_changed(&self, event: &OrderStatusEvent) -> anyhow::Result<()>;
}

pub struct DbNotifier {
    orm: DatabaseConnection,
}

impl DbNotifier {
    pub fn new(orm: DatabaseConnection) -> Self {
        Self { orm }
    }
}

#[async_trait]
impl Notifier for DbNotifier {
    async fn order_status_changed(&self, event: &OrderStatusEvent) -> anyhow::Result<()> {
        let message = status_message(event.order_id, event.status);
        NotificationActive {
            id: Set(Uuid::new_v4()),
            user_id: Set(event.user_id),
            title: Set(message.title.to_string()),
            body: Set(message.body),
            kind: Set(ORDER_STATUS_KIND.to_string()),
            related_id: Set(Some(event.order_id)),
            is_read: Set(false),
            created_at: NotSet,
        }
        .insert(&self.orm)
        .await?;
        Ok(())
    }
}

/// Emits after the state change is durable; a failing notifier is logged, never surfaced.
pub async fn notify_status_change(state: &AppState, event: OrderStatusEvent) {
    match state.notifier.order_status_changed(&event).await {
        Ok(()) => tracing::debug!(
            order_id = %event.order_id,
            status = %event.status,
            "status notification stored"
        ),
        Err(err) => tracing::warn!(
            error = %err,
            order_id = %event.order_id,
            status = %event.status,
            "status notification failed"
        ),
    }
}
