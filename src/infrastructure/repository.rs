use crate::domain::Account;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Account {0} is no longer registered in the ledger")]
    Detached(String),
}

/// Persistence seam used by the transfer engine after every balance write.
///
/// The engine mutates balances under the account locks and then calls
/// `save` with the new value. A failed save makes the engine roll both
/// accounts back, so implementations must be side-effect free on error.
#[cfg_attr(test, mockall::automock)]
pub trait AccountStore: Send + Sync + 'static {
    fn save(&self, account: &Account) -> Result<(), StoreError>;
}
