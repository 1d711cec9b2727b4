pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod web;

// Re-export commonly used types
pub use application::{AccountService, TransferService};
pub use domain::{Account, AccountError, AccountSide, TransferOutcome};
pub use infrastructure::{Ledger, TransferEngine};
