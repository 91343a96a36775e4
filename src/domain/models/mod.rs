pub mod catalog;
pub mod payment;
pub mod registration;
