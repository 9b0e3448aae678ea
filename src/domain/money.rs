use rust_decimal::{Decimal, RoundingStrategy};

/// Round to cents the way the `NUMERIC(12, 2)` columns do.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Client figures are accepted when they are within one cent of the server's.
pub fn amounts_match(client: Decimal, server: Decimal) -> bool {
    (round_money(client) - round_money(server)).abs() <= Decimal::new(1, 2)
}
