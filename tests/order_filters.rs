use chrono::NaiveDate;
use delivery_orders::{
    routes::params::{DateRange, MAX_PAGE, OrderListQuery, Pagination},
    services::order_service::created_window,
};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn today_covers_a_single_day() {
    let today = day(2025, 3, 14);
    assert_eq!(
        created_window(DateRange::Today, today),
        (today, Some(day(2025, 3, 15)))
    );
}

#[test]
fn yesterday_ends_where_today_starts() {
    let today = day(2025, 3, 1);
    assert_eq!(
        created_window(DateRange::Yesterday, today),
        (day(2025, 2, 28), Some(today))
    );
}

#[test]
fn week_is_the_last_seven_days() {
    assert_eq!(
        created_window(DateRange::Week, day(2025, 1, 3)),
        (day(2024, 12, 27), None)
    );
}

#[test]
fn month_starts_on_the_first() {
    assert_eq!(
        created_window(DateRange::Month, day(2025, 3, 14)),
        (day(2025, 3, 1), None)
    );
}

#[test]
fn pagination_defaults_and_bounds() {
    assert_eq!(Pagination::default().normalize(), (1, 20, 0));
    let paging = Pagination {
        page: Some(3),
        per_page: Some(500),
    };
    assert_eq!(paging.normalize(), (3, 100, 200));
    let paging = Pagination {
        page: Some(-4),
        per_page: Some(0),
    };
    assert_eq!(paging.normalize(), (1, 1, 0));
}

#[test]
fn huge_page_numbers_are_clamped() {
    let query = OrderListQuery {
        page: Some(i64::MAX),
        per_page: Some(100),
        ..Default::default()
    };
    let (page, per_page, offset) = query.pagination().normalize();
    assert_eq!(page, MAX_PAGE);
    assert_eq!(per_page, 100);
    assert_eq!(offset, (MAX_PAGE - 1) * 100);
}
