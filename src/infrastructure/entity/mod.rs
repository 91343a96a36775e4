pub mod addon_items;
pub mod addon_purchases;
pub mod package_prices;
pub mod payments;
pub mod promo_codes;
pub mod registrations;
pub mod ticket_prices;
