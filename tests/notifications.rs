use delivery_orders::{
    domain::OrderStatus,
    services::notification_service::status_message,
};
use uuid::Uuid;

#[test]
fn every_status_has_a_distinct_title() {
    let id = Uuid::new_v4();
    let titles: Vec<_> = OrderStatus::ALL
        .into_iter()
        .map(|status| status_message(id, status).title)
        .collect();
    assert_eq!(
        titles,
        vec![
            "Order Placed",
            "Rider Assigned",
            "Rider on the Way",
            "Order Picked Up",
            "Order Delivered",
            "Order Cancelled",
            "Order Refunded",
        ]
    );
}

#[test]
fn body_mentions_the_order() {
    let id = Uuid::new_v4();
    for status in OrderStatus::ALL {
        let message = status_message(id, status);
        assert!(message.body.contains(&id.to_string()), "{status}");
    }
}
