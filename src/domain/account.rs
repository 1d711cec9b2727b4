use parking_lot::{Mutex, MutexGuard};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Point-in-time view of an account. Handed out to callers; never written back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub id: String,
    pub balance: Decimal,
}

impl Account {
    pub fn new(id: impl Into<String>, balance: Decimal) -> Self {
        Self {
            id: id.into(),
            balance,
        }
    }
}

/// Which end of a transfer an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AccountSide {
    Sender,
    Receiver,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum AccountError {
    #[error("Account id {0} already exists!")]
    DuplicateAccount(String),
    #[error("{side} Account Not Found")]
    NotFound { side: AccountSide },
    #[error("Sender Account low balance")]
    InsufficientBalance {
        available: Decimal,
        requested: Decimal,
    },
    #[error("Invalid amount: {0}")]
    InvalidAmount(Decimal),
    #[error("Sender and receiver account cannot be the same")]
    SameAccount,
}

impl AccountError {
    /// Stable machine-readable code for the request layer.
    pub fn code(&self) -> &'static str {
        match self {
            AccountError::DuplicateAccount(_) => "DUPLICATE_ACCOUNT",
            AccountError::NotFound { .. } => "ACCOUNT_NOT_FOUND",
            AccountError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            AccountError::InvalidAmount(_) => "INVALID_AMOUNT",
            AccountError::SameAccount => "SAME_ACCOUNT",
        }
    }
}

/// The canonical, lockable record for one account.
///
/// The ledger owns every `AccountCell` behind an `Arc`; services and the
/// transfer engine work on clones of that `Arc`, so all of them observe and
/// mutate the same balance. The balance mutex is the per-account lock: a
/// transfer holds the locks of both of its accounts for its whole mutation,
/// and plain reads take it briefly so they never see half of a transfer.
#[derive(Debug)]
pub struct AccountCell {
    id: String,
    balance: Mutex<Decimal>,
}

impl AccountCell {
    pub fn new(account: Account) -> Self {
        Self {
            id: account.id,
            balance: Mutex::new(account.balance),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Serialized balance read.
    pub fn balance(&self) -> Decimal {
        *self.balance.lock()
    }

    pub fn snapshot(&self) -> Account {
        Account::new(self.id.clone(), self.balance())
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Decimal> {
        self.balance.lock()
    }
}
