use std::sync::Arc;

use crate::domain::{Account, AccountError};
use crate::infrastructure::ledger::Ledger;
use rust_decimal::Decimal;
use tracing::{debug, info};

/// Account creation and lookup on top of the shared [`Ledger`].
#[derive(Debug, Clone)]
pub struct AccountService {
    ledger: Arc<Ledger>,
}

impl AccountService {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    /// Registers a new account. Fails with [`AccountError::DuplicateAccount`]
    /// if the id is already taken, leaving the existing account untouched.
    pub fn create_account(
        &self,
        account_id: impl Into<String>,
        initial_balance: Decimal,
    ) -> Result<Account, AccountError> {
        if initial_balance < Decimal::ZERO {
            return Err(AccountError::InvalidAmount(initial_balance));
        }

        let cell = self
            .ledger
            .create_account(Account::new(account_id, initial_balance))?;
        info!(account_id = %cell.id(), %initial_balance, "Account created");
        Ok(cell.snapshot())
    }

    pub fn get_account(&self, account_id: &str) -> Option<Account> {
        debug!(%account_id, "Retrieving account");
        self.ledger.get_account(account_id).map(|cell| cell.snapshot())
    }

    /// Balance read serialized with any transfer touching the account.
    pub fn current_balance(&self, account_id: &str) -> Option<Decimal> {
        self.ledger.get_account(account_id).map(|cell| cell.balance())
    }

    pub fn clear_accounts(&self) {
        self.ledger.clear();
    }
}
