//! Amount computation. Pure functions over catalog prices so the
//! registration and checkout paths share one arithmetic.

use rust_decimal::Decimal;

use crate::domain::models::catalog::{AddOnItem, PromoCode};

/// One add-on line in a quote: unit price times quantity.
#[derive(Debug, Clone)]
pub struct AddOnLine {
    pub addon_id: i32,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

impl AddOnLine {
    /// Callers validate `quantity >= 1` before building a line.
    pub fn new(item: &AddOnItem, quantity: i32) -> Self {
        Self {
            addon_id: item.id,
            name: item.name.clone(),
            quantity,
            unit_price: item.price,
            line_total: item.price * Decimal::from(quantity),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Quote {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub addon_lines: Vec<AddOnLine>,
}

/// Amount due is the base catalog price plus the sum of add-on line totals.
pub fn amount_due(base_price: Decimal, addon_lines: &[AddOnLine]) -> Decimal {
    let addons: Decimal = addon_lines.iter().map(|line| line.line_total).sum();
    (base_price + addons).round_dp(2)
}

/// Build a full quote: subtotal, promo discount, and total. Tax is carried
/// at zero until a tax rule exists.
pub fn quote(
    base_price: Decimal,
    addon_lines: Vec<AddOnLine>,
    promo: Option<&PromoCode>,
) -> Quote {
    let subtotal = amount_due(base_price, &addon_lines);
    let discount = promo
        .map(|p| p.discount_for(subtotal))
        .unwrap_or(Decimal::ZERO);
    let tax = Decimal::ZERO;
    let total = (subtotal - discount + tax).round_dp(2);
    Quote {
        subtotal,
        discount,
        tax,
        total,
        addon_lines,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;

    use crate::domain::models::catalog::DiscountKind;

    use super::*;

    fn addon(id: i32, price: Decimal) -> AddOnItem {
        AddOnItem {
            id,
            name: format!("addon-{id}"),
            price,
            currency: "USD".to_string(),
            for_attendees: true,
            for_exhibitors: true,
            is_active: true,
        }
    }

    #[test]
    fn amount_due_is_base_plus_addons() {
        let lines = vec![
            AddOnLine::new(&addon(1, dec!(25.00)), 2),
            AddOnLine::new(&addon(2, dec!(10.50)), 1),
        ];
        assert_eq!(amount_due(dec!(150.00), &lines), dec!(210.50));
    }

    #[test]
    fn amount_due_without_addons_is_base() {
        assert_eq!(amount_due(dec!(300.00), &[]), dec!(300.00));
    }

    #[test]
    fn vip_ticket_with_ten_percent_promo_totals_270() {
        let now = Utc::now();
        let promo = PromoCode {
            code: "BEE10".to_string(),
            kind: DiscountKind::Percentage,
            value: dec!(10),
            max_discount: None,
            min_purchase: None,
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(1),
            max_uses: None,
            current_uses: 0,
            is_active: true,
        };
        let quote = quote(dec!(300.00), Vec::new(), Some(&promo));
        assert_eq!(quote.subtotal, dec!(300.00));
        assert_eq!(quote.discount, dec!(30.00));
        assert_eq!(quote.tax, Decimal::ZERO);
        assert_eq!(quote.total, dec!(270.00));
    }

    #[test]
    fn quote_without_promo_has_no_discount() {
        let quote = quote(dec!(120.00), Vec::new(), None);
        assert_eq!(quote.discount, Decimal::ZERO);
        assert_eq!(quote.total, dec!(120.00));
    }
}
