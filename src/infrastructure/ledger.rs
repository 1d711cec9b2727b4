use crate::domain::{Account, AccountCell, AccountError};
use crate::infrastructure::repository::{AccountStore, StoreError};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// In-memory account store.
///
/// Keys are sharded by `DashMap`, so lookups and inserts on different ids do
/// not contend and none of them wait on a transfer: the map only hands out
/// `Arc<AccountCell>` references, and balances are guarded by the cells.
#[derive(Debug, Default)]
pub struct Ledger {
    accounts: DashMap<String, Arc<AccountCell>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `account` unless its id is taken. Concurrent creations of the
    /// same id race on the shard's entry lock; exactly one wins.
    pub fn create_account(&self, account: Account) -> Result<Arc<AccountCell>, AccountError> {
        match self.accounts.entry(account.id.clone()) {
            Entry::Occupied(_) => Err(AccountError::DuplicateAccount(account.id)),
            Entry::Vacant(slot) => {
                let cell = Arc::new(AccountCell::new(account));
                slot.insert(cell.clone());
                info!(account_id = %cell.id(), "Account registered");
                Ok(cell)
            }
        }
    }

    pub fn get_account(&self, id: &str) -> Option<Arc<AccountCell>> {
        self.accounts.get(id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Drops every account. Test isolation only.
    pub fn clear(&self) {
        self.accounts.clear();
        debug!("Ledger cleared");
    }
}

impl AccountStore for Ledger {
    // Balances already live in the cells; a save only has to confirm the
    // record is still the one the ledger serves for that id.
    fn save(&self, account: &Account) -> Result<(), StoreError> {
        if self.accounts.contains_key(&account.id) {
            Ok(())
        } else {
            Err(StoreError::Detached(account.id.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn test_create_and_get() {
        let ledger = Ledger::new();
        ledger
            .create_account(Account::new("Id-123", dec!(1000)))
            .unwrap();

        let cell = ledger.get_account("Id-123").unwrap();
        assert_eq!(cell.id(), "Id-123");
        assert_eq!(cell.balance(), dec!(1000));
        assert!(ledger.get_account("Id-999").is_none());
    }

    #[test]
    fn test_duplicate_keeps_first_account() {
        let ledger = Ledger::new();
        ledger
            .create_account(Account::new("Id-123", dec!(1000)))
            .unwrap();

        let err = ledger
            .create_account(Account::new("Id-123", dec!(5)))
            .unwrap_err();
        assert_eq!(err, AccountError::DuplicateAccount("Id-123".to_string()));
        assert_eq!(ledger.get_account("Id-123").unwrap().balance(), dec!(1000));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_concurrent_create_same_id_single_winner() {
        let ledger = Arc::new(Ledger::new());
        let threads = 16;
        let barrier = Arc::new(Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|i| {
                let ledger = ledger.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    ledger
                        .create_account(Account::new("shared", rust_decimal::Decimal::from(i)))
                        .is_ok()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_clear_empties_ledger() {
        let ledger = Ledger::new();
        ledger.create_account(Account::new("a", dec!(1))).unwrap();
        ledger.create_account(Account::new("b", dec!(2))).unwrap();
        assert_eq!(ledger.len(), 2);

        ledger.clear();
        assert!(ledger.is_empty());
        assert!(ledger.get_account("a").is_none());
    }

    #[test]
    fn test_save_fails_for_detached_account() {
        let ledger = Ledger::new();
        ledger.create_account(Account::new("a", dec!(1))).unwrap();

        assert!(ledger.save(&Account::new("a", dec!(7))).is_ok());
        ledger.clear();
        assert_eq!(
            ledger.save(&Account::new("a", dec!(7))),
            Err(StoreError::Detached("a".to_string()))
        );
    }
}
