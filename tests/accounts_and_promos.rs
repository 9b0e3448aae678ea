mod common;

use common::{create_product, create_user, line, money, order_request, setup_state};
use delivery_orders::{
    domain::{Role, promo::DiscountType},
    dto::{
        auth::{LoginRequest, SendOtpRequest, VerifyOtpRequest},
        orders::CreateOrderRequest,
        promo::{CreatePromoRequest, UpdatePromoRequest, ValidatePromoRequest},
        riders::{AvailabilityRequest, RegisterRiderRequest},
    },
    error::AppError,
    services::{auth_service, order_service, promo_service, rider_service},
};
use uuid::Uuid;

fn fresh_phone() -> String {
    format!("08{}", &Uuid::new_v4().simple().to_string()[..9])
}

fn fresh_code() -> String {
    format!("p{}", &Uuid::new_v4().simple().to_string()[..10])
}

fn promo_request(code: &str) -> CreatePromoRequest {
    CreatePromoRequest {
        code: code.to_string(),
        discount_type: "percentage".into(),
        discount_value: money(1000),
        min_order_amount: Some(money(5000)),
        max_discount: None,
        usage_limit: Some(100),
        valid_from: None,
        valid_until: None,
    }
}

#[tokio::test]
async fn otp_login_creates_a_customer_once() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let phone = fresh_phone();
    let normalized = phone.trim_start_matches('0').to_string();
    let sent = auth_service::send_otp(&state, SendOtpRequest { phone: phone.clone() }).await?;
    assert_eq!(sent.data.unwrap().phone, normalized);

    state.otp.insert(&normalized, "424242".into()).await;
    let err = auth_service::verify_otp(
        &state,
        VerifyOtpRequest {
            phone: phone.clone(),
            otp: "000000".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref m) if m == "Invalid OTP"));

    let first = auth_service::verify_otp(
        &state,
        VerifyOtpRequest {
            phone: phone.clone(),
            otp: "424242".into(),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(first.user.role, Role::Customer);
    let caller = auth_service::decode_token(&state.config, &first.token)?;
    assert_eq!(caller.user_id, first.user.id);

    state.otp.insert(&normalized, "131313".into()).await;
    let second = auth_service::verify_otp(
        &state,
        VerifyOtpRequest {
            phone,
            otp: "131313".into(),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(second.user.id, first.user.id);
    Ok(())
}

#[tokio::test]
async fn registered_rider_can_log_in_and_toggle_availability() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let phone = fresh_phone();
    let profile = rider_service::register_rider(
        &state,
        RegisterRiderRequest {
            full_name: "Asha Rider".into(),
            phone: phone.clone(),
            email: None,
            password: "rider123".into(),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(profile.user.role, Role::Rider);
    assert!(profile.rider.is_available);

    let err = rider_service::register_rider(
        &state,
        RegisterRiderRequest {
            full_name: "Someone Else".into(),
            phone: phone.clone(),
            email: None,
            password: "secret99".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref m) if m == "Phone number already registered"));

    let err = auth_service::login(
        &state,
        LoginRequest {
            phone: phone.clone(),
            password: "wrong-password".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref m) if m == "Invalid phone or password"));

    let login = auth_service::login(
        &state,
        LoginRequest {
            phone,
            password: "rider123".into(),
        },
    )
    .await?
    .data
    .unwrap();
    let rider = auth_service::decode_token(&state.config, &login.token)?;
    assert_eq!(rider.role, Role::Rider);

    let updated = rider_service::set_availability(
        &state,
        &rider,
        AvailabilityRequest {
            is_available: false,
        },
    )
    .await?
    .data
    .unwrap();
    assert!(!updated.is_available);

    let admin = create_user(&state, Role::Admin).await?;
    let available = rider_service::list_available(&state, &admin).await?.data.unwrap();
    assert!(available.items.iter().all(|r| r.user_id != rider.user_id));
    Ok(())
}

#[tokio::test]
async fn promo_administration_and_preview() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let admin = create_user(&state, Role::Admin).await?;
    let customer = create_user(&state, Role::Customer).await?;
    let code = fresh_code();

    let err = promo_service::create_promo(&state, &customer, promo_request(&code))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let promo = promo_service::create_promo(&state, &admin, promo_request(&code))
        .await?
        .data
        .unwrap();
    assert_eq!(promo.code, code.to_uppercase());
    assert_eq!(promo.discount_type, DiscountType::Percentage);

    let err = promo_service::create_promo(&state, &admin, promo_request(&code.to_uppercase()))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref m) if m == "Promo code already exists"));

    let err = promo_service::create_promo(
        &state,
        &admin,
        CreatePromoRequest {
            discount_value: money(15000),
            ..promo_request(&fresh_code())
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = promo_service::validate_promo(
        &state,
        &customer,
        ValidatePromoRequest {
            code: code.clone(),
            cart_total: money(4000),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref m) if m.starts_with("Minimum order amount is")));

    let preview = promo_service::validate_promo(
        &state,
        &customer,
        ValidatePromoRequest {
            code: code.clone(),
            cart_total: money(20000),
        },
    )
    .await?
    .data
    .unwrap();
    assert!(preview.valid);
    assert_eq!(preview.promo_code_id, promo.id);
    assert_eq!(preview.discount_amount, money(2000));
    assert_eq!(preview.final_amount, money(18000));

    let err = promo_service::validate_promo(
        &state,
        &customer,
        ValidatePromoRequest {
            code: fresh_code(),
            cart_total: money(20000),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InvalidPromo));
    assert_eq!(err.to_string(), "Invalid or expired promo code");

    let updated = promo_service::update_promo(
        &state,
        &admin,
        promo.id,
        UpdatePromoRequest {
            code: None,
            discount_type: None,
            discount_value: None,
            min_order_amount: Some(money(0)),
            max_discount: Some(Some(money(500))),
            usage_limit: None,
            is_active: None,
            valid_from: None,
            valid_until: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(updated.max_discount, Some(money(500)));

    let product = create_product(&state, money(10000), 5).await?;
    let placed = order_service::create_order(
        &state,
        &customer,
        CreateOrderRequest {
            promo_code_id: Some(promo.id),
            ..order_request(vec![line(product, 1)])
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(placed.discount_applied, money(500));

    let stats = promo_service::promo_stats(&state, &admin, promo.id)
        .await?
        .data
        .unwrap();
    assert_eq!(stats.usage_count, 1);
    assert_eq!(stats.total_discount_given, money(500));
    assert_eq!(stats.promo.used_count, 1);

    let err = promo_service::delete_promo(&state, &admin, promo.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let deactivated = promo_service::deactivate_promo(&state, &admin, promo.id)
        .await?
        .data
        .unwrap();
    assert!(!deactivated.is_active);

    let other = create_user(&state, Role::Customer).await?;
    let err = promo_service::validate_promo(
        &state,
        &other,
        ValidatePromoRequest {
            code,
            cart_total: money(20000),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InvalidPromo));

    let unused = promo_service::create_promo(&state, &admin, promo_request(&fresh_code()))
        .await?
        .data
        .unwrap();
    promo_service::delete_promo(&state, &admin, unused.id).await?;
    let err = promo_service::delete_promo(&state, &admin, unused.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound("Promo code")));
    Ok(())
}

#[tokio::test]
async fn promo_update_null_clears_caps_and_window() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let admin = create_user(&state, Role::Admin).await?;
    let promo = promo_service::create_promo(
        &state,
        &admin,
        CreatePromoRequest {
            max_discount: Some(money(500)),
            usage_limit: Some(5),
            valid_until: Some(chrono::Utc::now() + chrono::Duration::days(1)),
            ..promo_request(&fresh_code())
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(promo.usage_limit, Some(5));

    // absent fields keep their stored value
    let body: UpdatePromoRequest = serde_json::from_str(r#"{"discount_value": 15}"#)?;
    let kept = promo_service::update_promo(&state, &admin, promo.id, body)
        .await?
        .data
        .unwrap();
    assert_eq!(kept.max_discount, Some(money(500)));
    assert_eq!(kept.usage_limit, Some(5));
    assert!(kept.valid_until.is_some());

    let body: UpdatePromoRequest = serde_json::from_str(
        r#"{"max_discount": null, "usage_limit": null, "valid_until": null}"#,
    )?;
    let cleared = promo_service::update_promo(&state, &admin, promo.id, body)
        .await?
        .data
        .unwrap();
    assert_eq!(cleared.max_discount, None);
    assert_eq!(cleared.usage_limit, None);
    assert_eq!(cleared.valid_until, None);
    assert_eq!(cleared.min_order_amount, money(5000));
    Ok(())
}
