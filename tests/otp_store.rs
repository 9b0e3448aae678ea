use std::time::Duration;

use delivery_orders::services::otp_store::{OtpError, OtpStore, normalize_phone};

#[test]
fn phone_normalization_drops_leading_zero() {
    assert_eq!(normalize_phone(" 0712345678 ").as_deref(), Some("712345678"));
    assert_eq!(normalize_phone("712345678").as_deref(), Some("712345678"));
    assert_eq!(normalize_phone("   "), None);
    assert_eq!(normalize_phone("0"), None);
}

#[tokio::test]
async fn issued_code_verifies_once() {
    let store = OtpStore::new(Duration::from_secs(120));
    let (phone, code) = store.issue("0712345678").await.unwrap();
    assert_eq!(phone, "712345678");
    assert_eq!(code.len(), 6);
    assert!(code.chars().all(|c| c.is_ascii_digit()));

    assert_eq!(store.verify("0712345678", &code).await, Ok(phone.clone()));
    assert_eq!(store.verify(&phone, &code).await, Err(OtpError::NotFound));
}

#[tokio::test]
async fn wrong_code_keeps_the_entry() {
    let store = OtpStore::new(Duration::from_secs(120));
    store.insert("712345678", "123456".into()).await;

    assert_eq!(
        store.verify("712345678", "654321").await,
        Err(OtpError::Mismatch)
    );
    assert_eq!(
        store.verify("712345678", " 123456 ").await,
        Ok("712345678".into())
    );
}

#[tokio::test]
async fn reissuing_replaces_the_previous_code() {
    let store = OtpStore::new(Duration::from_secs(120));
    store.insert("712345678", "111111".into()).await;
    store.insert("712345678", "222222".into()).await;

    assert_eq!(
        store.verify("712345678", "111111").await,
        Err(OtpError::Mismatch)
    );
    assert!(store.verify("712345678", "222222").await.is_ok());
}

#[tokio::test]
async fn expired_codes_are_rejected_and_removed() {
    let store = OtpStore::new(Duration::from_millis(1));
    store.insert("712345678", "123456".into()).await;
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(
        store.verify("712345678", "123456").await,
        Err(OtpError::Expired)
    );
    assert_eq!(
        store.verify("712345678", "123456").await,
        Err(OtpError::NotFound)
    );
}

#[tokio::test]
async fn purge_drops_only_expired_entries() {
    let store = OtpStore::new(Duration::from_millis(1));
    store.insert("700000001", "123456".into()).await;
    store.insert("700000002", "123456".into()).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(store.purge_expired().await, 2);
    assert_eq!(store.purge_expired().await, 0);
}

#[tokio::test]
async fn blank_phone_is_rejected() {
    let store = OtpStore::new(Duration::from_secs(120));
    assert_eq!(store.issue("  ").await, Err(OtpError::MissingPhone));
}
