pub mod audit_logs;
pub mod cart_items;
pub mod notifications;
pub mod order_items;
pub mod orders;
pub mod products;
pub mod promo_code_usage;
pub mod promo_codes;
pub mod riders;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use cart_items::Entity as CartItems;
pub use notifications::Entity as Notifications;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use promo_code_usage::Entity as PromoCodeUsage;
pub use promo_codes::Entity as PromoCodes;
pub use riders::Entity as Riders;
pub use users::Entity as Users;
