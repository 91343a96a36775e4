pub mod catalog_repository;
pub mod dpo_gateway;
pub mod entity;
pub mod payment_repository;
pub mod registration_repository;
