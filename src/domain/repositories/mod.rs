pub mod catalog_repository;
pub mod payment_repository;
pub mod registration_repository;
