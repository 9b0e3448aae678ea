pub mod auth_service;
pub mod cart_service;
pub mod inventory_service;
pub mod notification_service;
pub mod order_service;
pub mod order_status_service;
pub mod otp_store;
pub mod product_service;
pub mod promo_service;
pub mod rider_service;
