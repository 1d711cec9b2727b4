pub mod account_service;
pub mod transfer_service;

pub use account_service::AccountService;
pub use transfer_service::TransferService;
