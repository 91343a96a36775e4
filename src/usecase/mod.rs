pub mod checkout_usecase;
pub mod register_usecase;
pub mod verify_payment_usecase;
