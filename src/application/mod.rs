pub mod services;

pub use services::*;

pub use services::{AccountService, TransferService};
