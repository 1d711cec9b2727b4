use std::sync::Arc;

use crate::domain::{AccountError, AccountSide, TransferOutcome, TransferRequest};
use crate::infrastructure::ledger::Ledger;
use crate::infrastructure::transfer_engine::{EngineMetricsSnapshot, TransferEngine};
use rust_decimal::Decimal;
use tracing::{info, info_span, warn};
use uuid::Uuid;

/// Orchestrates a balance transfer: resolves both accounts, admits the
/// transfer against the sender's balance and hands the mutation to the
/// [`TransferEngine`].
///
/// The admission check runs inside the engine's pair lock, so two transfers
/// draining the same sender cannot both pass it on the same balance.
pub struct TransferService {
    ledger: Arc<Ledger>,
    engine: TransferEngine,
}

impl TransferService {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        let engine = TransferEngine::new(ledger.clone());
        Self::with_engine(ledger, engine)
    }

    pub fn with_engine(ledger: Arc<Ledger>, engine: TransferEngine) -> Self {
        Self { ledger, engine }
    }

    pub fn execute(&self, request: &TransferRequest) -> Result<TransferOutcome, AccountError> {
        self.execute_transfer(&request.from, &request.to, request.amount)
    }

    pub fn execute_transfer(
        &self,
        from_id: &str,
        to_id: &str,
        amount: Decimal,
    ) -> Result<TransferOutcome, AccountError> {
        let span = info_span!("transfer", transfer_id = %Uuid::new_v4(), from = from_id, to = to_id);
        let _enter = span.enter();

        if amount <= Decimal::ZERO {
            return Err(AccountError::InvalidAmount(amount));
        }

        let from = self.ledger.get_account(from_id).ok_or(AccountError::NotFound {
            side: AccountSide::Sender,
        })?;
        let to = self.ledger.get_account(to_id).ok_or(AccountError::NotFound {
            side: AccountSide::Receiver,
        })?;

        if from.id() == to.id() {
            return Err(AccountError::SameAccount);
        }

        let applied = self
            .engine
            .transfer_admitted(&from, &to, amount, |balance| admit(balance, amount))
            .map_err(|e| {
                warn!(error = %e, "Insufficient balance found in sender account");
                e
            })?;

        let outcome = TransferOutcome::from_engine(applied);
        info!(%amount, status = %outcome, "Balance transfer finished");
        Ok(outcome)
    }

    pub fn metrics(&self) -> EngineMetricsSnapshot {
        self.engine.metrics()
    }
}

/// A transfer is admitted only from a positive balance that covers `amount`.
fn admit(balance: Decimal, amount: Decimal) -> Result<(), AccountError> {
    if balance > Decimal::ZERO && balance >= amount {
        Ok(())
    } else {
        Err(AccountError::InsufficientBalance {
            available: balance,
            requested: amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Account;
    use crate::infrastructure::repository::{MockAccountStore, StoreError};
    use rust_decimal_macros::dec;
    use std::sync::Barrier;
    use std::thread;

    fn setup(accounts: &[(&str, Decimal)]) -> (Arc<Ledger>, TransferService) {
        let ledger = Arc::new(Ledger::new());
        for (id, balance) in accounts {
            ledger.create_account(Account::new(*id, *balance)).unwrap();
        }
        let service = TransferService::new(ledger.clone());
        (ledger, service)
    }

    fn balance(ledger: &Ledger, id: &str) -> Decimal {
        ledger.get_account(id).unwrap().balance()
    }

    #[test]
    fn test_successful_transfer() {
        let (ledger, service) = setup(&[("A", dec!(1000)), ("B", dec!(2000))]);

        let outcome = service.execute_transfer("A", "B", dec!(500)).unwrap();

        assert_eq!(outcome, TransferOutcome::Completed);
        assert_eq!(balance(&ledger, "A"), dec!(500));
        assert_eq!(balance(&ledger, "B"), dec!(2500));
    }

    #[test]
    fn test_insufficient_balance() {
        let (ledger, service) = setup(&[("A", dec!(1000)), ("B", dec!(2000))]);

        let result = service.execute_transfer("A", "B", dec!(1500));

        assert_eq!(
            result,
            Err(AccountError::InsufficientBalance {
                available: dec!(1000),
                requested: dec!(1500),
            })
        );
        assert_eq!(balance(&ledger, "A"), dec!(1000));
        assert_eq!(balance(&ledger, "B"), dec!(2000));
    }

    #[test]
    fn test_exact_balance_is_admitted() {
        let (ledger, service) = setup(&[("A", dec!(10.50)), ("B", dec!(0))]);

        assert!(service.execute_transfer("A", "B", dec!(10.5)).unwrap().is_success());
        assert_eq!(balance(&ledger, "A"), Decimal::ZERO);
        assert_eq!(balance(&ledger, "B"), dec!(10.5));
    }

    #[test]
    fn test_empty_sender_is_rejected() {
        let (_, service) = setup(&[("A", dec!(0)), ("B", dec!(0))]);

        let result = service.execute_transfer("A", "B", dec!(0.01));
        assert!(matches!(result, Err(AccountError::InsufficientBalance { .. })));
    }

    #[test]
    fn test_consecutive_transfers_until_low_balance() {
        let (ledger, service) = setup(&[("Id-123", dec!(1000)), ("Id-124", dec!(2000))]);

        assert!(service
            .execute_transfer("Id-123", "Id-124", dec!(500))
            .unwrap()
            .is_success());
        let second = service.execute_transfer("Id-123", "Id-124", dec!(600));

        assert_eq!(second.unwrap_err().to_string(), "Sender Account low balance");
        assert_eq!(balance(&ledger, "Id-123"), dec!(500));
        assert_eq!(balance(&ledger, "Id-124"), dec!(2500));
    }

    #[test]
    fn test_unknown_sender() {
        let (_, service) = setup(&[("B", dec!(2000))]);

        let result = service.execute_transfer("X", "B", dec!(1));
        assert_eq!(
            result,
            Err(AccountError::NotFound {
                side: AccountSide::Sender
            })
        );
    }

    #[test]
    fn test_unknown_receiver() {
        let (ledger, service) = setup(&[("A", dec!(2000))]);

        let result = service.execute_transfer("A", "Y", dec!(1));
        assert_eq!(
            result,
            Err(AccountError::NotFound {
                side: AccountSide::Receiver
            })
        );
        assert_eq!(balance(&ledger, "A"), dec!(2000));
    }

    #[test]
    fn test_same_account_rejected() {
        let (ledger, service) = setup(&[("A", dec!(100))]);

        assert_eq!(
            service.execute_transfer("A", "A", dec!(1)),
            Err(AccountError::SameAccount)
        );
        assert_eq!(balance(&ledger, "A"), dec!(100));
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        let (_, service) = setup(&[("A", dec!(100)), ("B", dec!(0))]);

        assert_eq!(
            service.execute_transfer("A", "B", dec!(-5)),
            Err(AccountError::InvalidAmount(dec!(-5)))
        );
        assert_eq!(
            service.execute_transfer("A", "B", Decimal::ZERO),
            Err(AccountError::InvalidAmount(Decimal::ZERO))
        );
    }

    #[test]
    fn test_store_failure_reports_failed_outcome() {
        let ledger = Arc::new(Ledger::new());
        ledger.create_account(Account::new("A", dec!(100))).unwrap();
        ledger.create_account(Account::new("B", dec!(100))).unwrap();

        let mut store = MockAccountStore::new();
        store
            .expect_save()
            .returning(|account| Err(StoreError::Detached(account.id.clone())));
        let service =
            TransferService::with_engine(ledger.clone(), TransferEngine::new(Arc::new(store)));

        let outcome = service.execute_transfer("A", "B", dec!(40)).unwrap();

        assert_eq!(outcome, TransferOutcome::Failed);
        assert_eq!(outcome.status(), "balance transfer process failed");
        assert_eq!(balance(&ledger, "A"), dec!(100));
        assert_eq!(balance(&ledger, "B"), dec!(100));
        assert_eq!(service.metrics().transfers_rolled_back, 1);
    }

    #[test]
    fn test_transfer_below_sender_precision_fails_cleanly() {
        let sender: Decimal = "1000.0000000000000000000000001".parse().unwrap();
        let (ledger, service) = setup(&[("A", sender), ("B", Decimal::new(1, 28))]);

        let outcome = service.execute_transfer("A", "B", Decimal::new(1, 28));

        assert_eq!(outcome, Ok(TransferOutcome::Failed));
        assert_eq!(balance(&ledger, "A"), sender);
        assert_eq!(balance(&ledger, "B"), Decimal::new(1, 28));
    }

    #[test]
    fn test_concurrent_transfers_from_one_sender() {
        let (ledger, service) = setup(&[
            ("Id-123", dec!(1000)),
            ("Id-124", dec!(2000)),
            ("Id-125", dec!(3000)),
        ]);
        let service = Arc::new(service);
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = ["Id-124", "Id-125"]
            .into_iter()
            .map(|to| {
                let service = service.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    service.execute_transfer("Id-123", to, dec!(500))
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), Ok(TransferOutcome::Completed));
        }
        assert_eq!(balance(&ledger, "Id-123"), Decimal::ZERO);
        assert_eq!(balance(&ledger, "Id-124"), dec!(2500));
        assert_eq!(balance(&ledger, "Id-125"), dec!(3500));
    }

    #[test]
    fn test_request_wrapper() {
        let (ledger, service) = setup(&[("A", dec!(5)), ("B", dec!(0))]);
        let request = TransferRequest::new("A", "B", dec!(5));

        assert_eq!(service.execute(&request), Ok(TransferOutcome::Completed));
        assert_eq!(balance(&ledger, "B"), dec!(5));
    }
}
