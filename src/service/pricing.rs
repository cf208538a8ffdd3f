//! Money arithmetic for products, cart lines and orders. Amounts keep two decimal places.

use rust_decimal::{Decimal, RoundingStrategy};

/// Round half away from zero and fix the scale at 2, so `0` renders as `0.00`.
pub fn round_money(d: Decimal) -> Decimal {
    let mut r = d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    r.rescale(2);
    r
}

/// `unit_price * (1 + tax_rate)`.
pub fn price_with_tax(unit_price: Decimal, tax_rate: Decimal) -> Decimal {
    round_money(unit_price * (Decimal::ONE + tax_rate))
}

pub fn line_total(unit_price: Decimal, quantity: i32) -> Decimal {
    round_money(unit_price * Decimal::from(quantity))
}

pub fn sum_totals<I: IntoIterator<Item = Decimal>>(totals: I) -> Decimal {
    round_money(totals.into_iter().sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn ten_percent_tax() {
        assert_eq!(price_with_tax(d("10.00"), d("0.10")), d("11.00"));
        assert_eq!(price_with_tax(d("19.99"), d("0.10")), d("21.99"));
        assert_eq!(price_with_tax(d("0.05"), d("0.10")), d("0.06"));
    }

    #[test]
    fn line_and_cart_totals() {
        let a = line_total(d("4.50"), 3);
        let b = line_total(d("12.25"), 2);
        assert_eq!(a, d("13.50"));
        assert_eq!(sum_totals([a, b]), d("38.00"));
        assert_eq!(sum_totals(Vec::new()), Decimal::ZERO);
    }

    #[test]
    fn totals_render_with_two_places() {
        assert_eq!(sum_totals(Vec::new()).to_string(), "0.00");
        assert_eq!(line_total(d("3"), 2).to_string(), "6.00");
    }
}
