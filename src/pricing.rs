//! Pure price arithmetic for carts and orders.
//!
//! All amounts are `BigDecimal` end to end; nothing here rounds. Rounding to
//! two decimal places happens once, at the response boundary, through
//! [`display_amount`].

use bigdecimal::{BigDecimal, RoundingMode};

/// Flat surcharge added to every order's subtotal, in currency units.
const SHIPPING_FEE: i64 = 2000;

pub fn shipping_fee() -> BigDecimal {
    BigDecimal::from(SHIPPING_FEE)
}

pub fn line_total(unit_price: &BigDecimal, quantity: i32) -> BigDecimal {
    unit_price * BigDecimal::from(quantity)
}

/// Subtotal over `(unit_price, quantity)` pairs of the selected lines.
pub fn order_subtotal<'a, I>(lines: I) -> BigDecimal
where
    I: IntoIterator<Item = (&'a BigDecimal, i32)>,
{
    lines
        .into_iter()
        .fold(BigDecimal::from(0), |acc, (price, qty)| {
            acc + line_total(price, qty)
        })
}

pub fn order_total(subtotal: &BigDecimal) -> BigDecimal {
    subtotal + shipping_fee()
}

/// Presentation-boundary formatting: round half-up to 2 decimal places.
pub fn display_amount(amount: &BigDecimal) -> String {
    amount.with_scale_round(2, RoundingMode::HalfUp).to_string()
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).expect("valid decimal")
    }

    #[test]
    fn line_total_multiplies_price_by_quantity() {
        assert_eq!(line_total(&dec("19.99"), 3), dec("59.97"));
    }

    #[test]
    fn subtotal_sums_selected_lines() {
        let p1 = dec("100");
        let p2 = dec("500");
        let subtotal = order_subtotal([(&p1, 2), (&p2, 1)]);
        assert_eq!(subtotal, dec("700"));
    }

    #[test]
    fn order_total_adds_fixed_shipping_fee() {
        assert_eq!(order_total(&dec("700")), dec("2700"));
    }

    #[test]
    fn subtotal_of_no_lines_is_zero() {
        assert_eq!(order_subtotal([]), BigDecimal::from(0));
    }

    #[test]
    fn no_drift_across_repeated_decimal_addition() {
        // 0.1 ten times is exactly 1 in decimal arithmetic.
        let tenth = dec("0.1");
        let total = order_subtotal((0..10).map(|_| (&tenth, 1)));
        assert_eq!(total, dec("1.0"));
    }

    #[test]
    fn display_rounds_half_up_to_two_places() {
        assert_eq!(display_amount(&dec("10.005")), "10.01");
        assert_eq!(display_amount(&dec("10")), "10.00");
        assert_eq!(display_amount(&dec("10.004")), "10.00");
    }
}
