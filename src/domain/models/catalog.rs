use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::models::registration::{ExhibitorPackage, TicketType};

/// Catalog reference data. Prices are read at calculation time; nothing
/// freezes them between registration and checkout (known drift risk).
#[derive(Debug, Clone)]
pub struct TicketPrice {
    pub ticket_type: TicketType,
    pub name: String,
    pub price: Decimal,
    pub currency: String,
    pub early_bird_price: Option<Decimal>,
    pub early_bird_deadline: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl TicketPrice {
    /// Early-bird price applies until its deadline, the list price after.
    pub fn current_price(&self, now: DateTime<Utc>) -> Decimal {
        match (self.early_bird_price, self.early_bird_deadline) {
            (Some(price), Some(deadline)) if now < deadline => price,
            _ => self.price,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PackagePrice {
    pub package_type: ExhibitorPackage,
    pub name: String,
    pub price: Decimal,
    pub currency: String,
    pub included_passes: i32,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct AddOnItem {
    pub id: i32,
    pub name: String,
    pub price: Decimal,
    pub currency: String,
    pub for_attendees: bool,
    pub for_exhibitors: bool,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscountKind {
    Percentage,
    Fixed,
}

#[derive(Debug, Clone)]
pub struct PromoCode {
    pub code: String,
    pub kind: DiscountKind,
    pub value: Decimal,
    pub max_discount: Option<Decimal>,
    pub min_purchase: Option<Decimal>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub max_uses: Option<i32>,
    pub current_uses: i32,
    pub is_active: bool,
}

impl PromoCode {
    pub fn normalize(code: &str) -> String {
        code.trim().to_uppercase()
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }
        if now < self.valid_from || now > self.valid_until {
            return false;
        }
        match self.max_uses {
            Some(max) => self.current_uses < max,
            None => true,
        }
    }

    /// Discount for a purchase amount, quantized to cents. Percentage
    /// discounts honor the optional cap; fixed discounts never exceed the
    /// amount itself. Below the minimum purchase the discount is zero.
    pub fn discount_for(&self, amount: Decimal) -> Decimal {
        if let Some(min) = self.min_purchase {
            if amount < min {
                return Decimal::ZERO;
            }
        }
        match self.kind {
            DiscountKind::Percentage => {
                let mut discount = (amount * self.value / Decimal::ONE_HUNDRED).round_dp(2);
                if let Some(cap) = self.max_discount {
                    discount = discount.min(cap);
                }
                discount
            }
            DiscountKind::Fixed => self.value.min(amount),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rust_decimal_macros::dec;

    use super::*;

    fn promo(kind: DiscountKind, value: Decimal) -> PromoCode {
        let now = Utc::now();
        PromoCode {
            code: "BEE10".to_string(),
            kind,
            value,
            max_discount: None,
            min_purchase: None,
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(30),
            max_uses: None,
            current_uses: 0,
            is_active: true,
        }
    }

    #[test]
    fn ten_percent_of_300_is_30() {
        let promo = promo(DiscountKind::Percentage, dec!(10));
        assert_eq!(promo.discount_for(dec!(300.00)), dec!(30.00));
    }

    #[test]
    fn percentage_discount_respects_cap() {
        let mut promo = promo(DiscountKind::Percentage, dec!(50));
        promo.max_discount = Some(dec!(20.00));
        assert_eq!(promo.discount_for(dec!(300.00)), dec!(20.00));
    }

    #[test]
    fn fixed_discount_never_exceeds_amount() {
        let promo = promo(DiscountKind::Fixed, dec!(500.00));
        assert_eq!(promo.discount_for(dec!(120.00)), dec!(120.00));
    }

    #[test]
    fn discount_is_zero_below_minimum_purchase() {
        let mut promo = promo(DiscountKind::Percentage, dec!(10));
        promo.min_purchase = Some(dec!(200.00));
        assert_eq!(promo.discount_for(dec!(150.00)), Decimal::ZERO);
    }

    #[test]
    fn exhausted_code_is_invalid() {
        let mut promo = promo(DiscountKind::Percentage, dec!(10));
        promo.max_uses = Some(5);
        promo.current_uses = 5;
        assert!(!promo.is_valid_at(Utc::now()));
    }

    #[test]
    fn early_bird_price_applies_before_deadline() {
        let now = Utc::now();
        let ticket = TicketPrice {
            ticket_type: TicketType::Standard,
            name: "Standard".to_string(),
            price: dec!(150.00),
            currency: "USD".to_string(),
            early_bird_price: Some(dec!(100.00)),
            early_bird_deadline: Some(now + Duration::days(7)),
            is_active: true,
        };
        assert_eq!(ticket.current_price(now), dec!(100.00));
        assert_eq!(ticket.current_price(now + Duration::days(8)), dec!(150.00));
    }
}
