use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    domain::{OrderStatus, Role, promo::DiscountType},
    dto::{
        auth::{LoginRequest, LoginResponse, OtpSent, SendOtpRequest, VerifyOtpRequest},
        cart::{AddToCartRequest, CartItemDto, CartList, UpdateCartQuantityRequest},
        orders::{
            AssignRiderRequest, CreateOrderRequest, CreateOrderResponse, OrderLineRequest,
            OrderList, OrderWithItems, UpdateStatusRequest,
        },
        products::{CreateProductRequest, InventoryAdjustRequest, ProductList},
        promo::{
            CreatePromoRequest, PromoList, PromoPreview, PromoStats, UpdatePromoRequest,
            ValidatePromoRequest,
        },
        riders::{AvailabilityRequest, RegisterRiderRequest, RiderList, RiderProfile},
    },
    models::{CartItem, Order, OrderItem, Product, PromoCode, PromoCodeUsage, Rider, User},
    response::{ApiResponse, Meta},
    routes::{
        admin, auth, cart, health, orders, params, products as product_routes, promo_codes,
        riders,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::send_otp,
        auth::verify_otp,
        auth::login,
        product_routes::list_products,
        product_routes::get_product,
        product_routes::create_product,
        cart::cart_list,
        cart::add_to_cart,
        cart::set_quantity,
        cart::remove_from_cart,
        cart::clear_cart,
        orders::create_order,
        orders::list_my_orders,
        orders::get_order,
        orders::list_rider_orders,
        orders::list_all_orders,
        orders::filter_orders,
        orders::assign_rider,
        orders::update_status,
        orders::start_order,
        orders::pickup_order,
        orders::deliver_order,
        orders::cancel_order,
        orders::refund_order,
        orders::force_set_status,
        promo_codes::validate_promo,
        promo_codes::list_promos,
        promo_codes::create_promo,
        promo_codes::update_promo,
        promo_codes::deactivate_promo,
        promo_codes::delete_promo,
        promo_codes::promo_stats,
        riders::register_rider,
        riders::set_availability,
        riders::list_available,
        admin::list_low_stock,
        admin::adjust_inventory
    ),
    components(
        schemas(
            User,
            Role,
            Rider,
            Product,
            CartItem,
            Order,
            OrderStatus,
            OrderItem,
            PromoCode,
            PromoCodeUsage,
            DiscountType,
            SendOtpRequest,
            VerifyOtpRequest,
            LoginRequest,
            LoginResponse,
            OtpSent,
            AddToCartRequest,
            UpdateCartQuantityRequest,
            CartItemDto,
            CartList,
            CreateOrderRequest,
            OrderLineRequest,
            CreateOrderResponse,
            OrderList,
            OrderWithItems,
            AssignRiderRequest,
            UpdateStatusRequest,
            CreateProductRequest,
            InventoryAdjustRequest,
            ProductList,
            ValidatePromoRequest,
            PromoPreview,
            CreatePromoRequest,
            UpdatePromoRequest,
            PromoList,
            PromoStats,
            RegisterRiderRequest,
            RiderProfile,
            AvailabilityRequest,
            RiderList,
            params::SortOrder,
            params::ProductSortBy,
            params::DateRange,
            Meta,
            ApiResponse<Order>,
            ApiResponse<OrderList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<CreateOrderResponse>,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<PromoPreview>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "OTP and staff login"),
        (name = "Products", description = "Product catalogue"),
        (name = "Cart", description = "Customer cart"),
        (name = "Orders", description = "Order placement and reads"),
        (name = "Rider", description = "Rider roster and delivery steps"),
        (name = "Promo Codes", description = "Promo validation and administration"),
        (name = "Admin", description = "Order administration and inventory"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
