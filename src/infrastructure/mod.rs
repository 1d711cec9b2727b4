pub mod ledger;
pub mod logging;
pub mod repository;
pub mod transfer_engine;

pub use ledger::Ledger;
pub use repository::{AccountStore, StoreError};
pub use transfer_engine::TransferEngine;
