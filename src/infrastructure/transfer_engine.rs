use crate::domain::{Account, AccountCell};
use crate::infrastructure::repository::{AccountStore, StoreError};
use parking_lot::MutexGuard;
use rust_decimal::Decimal;
use serde::Serialize;
use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
enum MutationError {
    #[error("balance arithmetic overflowed for account {0}")]
    Overflow(String),
    #[error("balance of account {0} cannot hold the exact result")]
    Precision(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Default)]
pub struct EngineMetrics {
    pub transfers_applied: AtomicU64,
    pub transfers_rolled_back: AtomicU64,
    pub transfers_rejected: AtomicU64,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct EngineMetricsSnapshot {
    pub transfers_applied: u64,
    pub transfers_rolled_back: u64,
    pub transfers_rejected: u64,
}

/// Both balances of a transfer, held under their account locks.
///
/// Dropping a pair that was not committed restores the balances captured at
/// lock time and re-saves them, so every early return ends in the
/// pre-transfer state. An unwinding panic restores the balances without
/// touching the store. The guards are released when the pair goes out of
/// scope.
struct LockedPair<'a> {
    from: &'a AccountCell,
    to: &'a AccountCell,
    from_balance: MutexGuard<'a, Decimal>,
    to_balance: MutexGuard<'a, Decimal>,
    from_before: Decimal,
    to_before: Decimal,
    store: &'a dyn AccountStore,
    committed: bool,
}

impl<'a> LockedPair<'a> {
    /// Locks in ascending id order no matter which side is the sender, so
    /// `A -> B` and `B -> A` running together cannot each hold one lock and
    /// wait on the other.
    fn acquire(from: &'a AccountCell, to: &'a AccountCell, store: &'a dyn AccountStore) -> Self {
        let (from_balance, to_balance) = if from.id() < to.id() {
            let first = from.lock();
            let second = to.lock();
            (first, second)
        } else {
            let first = to.lock();
            let second = from.lock();
            (second, first)
        };
        let from_before = *from_balance;
        let to_before = *to_balance;

        Self {
            from,
            to,
            from_balance,
            to_balance,
            from_before,
            to_before,
            store,
            committed: false,
        }
    }

    fn sender_balance(&self) -> Decimal {
        *self.from_balance
    }

    fn apply(&mut self, amount: Decimal) -> Result<(), MutationError> {
        let before = *self.from_balance;
        let debited = before
            .checked_sub(amount)
            .ok_or_else(|| MutationError::Overflow(self.from.id().to_string()))?;
        if !moved_exactly(debited, before, amount) {
            return Err(MutationError::Precision(self.from.id().to_string()));
        }
        *self.from_balance = debited;
        self.store.save(&Account::new(self.from.id(), debited))?;

        let before = *self.to_balance;
        let credited = before
            .checked_add(amount)
            .ok_or_else(|| MutationError::Overflow(self.to.id().to_string()))?;
        if !moved_exactly(before, credited, amount) {
            return Err(MutationError::Precision(self.to.id().to_string()));
        }
        *self.to_balance = credited;
        self.store.save(&Account::new(self.to.id(), credited))?;

        Ok(())
    }

    fn balances_changed(&self) -> bool {
        *self.from_balance != self.from_before || *self.to_balance != self.to_before
    }

    fn commit(mut self) {
        self.committed = true;
    }

    fn roll_back(&mut self) {
        *self.from_balance = self.from_before;
        *self.to_balance = self.to_before;

        // A store that panicked once may panic again, and a second panic
        // while unwinding aborts the process.
        if std::thread::panicking() {
            return;
        }

        for account in [
            Account::new(self.from.id(), self.from_before),
            Account::new(self.to.id(), self.to_before),
        ] {
            if let Err(e) = self.store.save(&account) {
                error!(account_id = %account.id, error = %e, "Failed to persist rollback");
            }
        }
    }
}

/// `low + amount == high`, checked both ways.
///
/// `Decimal` rounds a sum or difference that needs more than 28 significant
/// digits instead of failing, which would debit one side by less than the
/// other side is credited.
fn moved_exactly(low: Decimal, high: Decimal, amount: Decimal) -> bool {
    high.checked_sub(low) == Some(amount) && low.checked_add(amount) == Some(high)
}

impl Drop for LockedPair<'_> {
    fn drop(&mut self) {
        if !self.committed && self.balances_changed() {
            warn!(
                from = %self.from.id(),
                to = %self.to.id(),
                "Initiating rollback"
            );
            self.roll_back();
        }
    }
}

/// Performs the locked debit/credit of a transfer.
///
/// The engine never checks sufficiency on its own; callers that need an
/// admission rule pass it to [`TransferEngine::transfer_admitted`], which runs
/// it inside the same critical section as the mutation.
pub struct TransferEngine {
    store: Arc<dyn AccountStore>,
    metrics: EngineMetrics,
}

impl TransferEngine {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self {
            store,
            metrics: EngineMetrics::default(),
        }
    }

    /// Moves `amount` from `from` to `to`. Returns `false` when the mutation
    /// could not be completed; both balances are then exactly what they were
    /// before the call.
    pub fn transfer(&self, from: &AccountCell, to: &AccountCell, amount: Decimal) -> bool {
        match self.transfer_admitted(from, to, amount, |_| Ok::<(), Infallible>(())) {
            Ok(applied) => applied,
            Err(never) => match never {},
        }
    }

    /// Like [`TransferEngine::transfer`], but calls `admit` with the sender's
    /// balance once both locks are held. An `Err` from `admit` is returned
    /// untouched and nothing is written.
    pub fn transfer_admitted<E, F>(
        &self,
        from: &AccountCell,
        to: &AccountCell,
        amount: Decimal,
        admit: F,
    ) -> Result<bool, E>
    where
        F: FnOnce(Decimal) -> Result<(), E>,
    {
        if from.id() == to.id() {
            // Locking the same cell twice would self-deadlock.
            warn!(account_id = %from.id(), "Refusing transfer onto the same account");
            return Ok(false);
        }

        let mut pair = LockedPair::acquire(from, to, self.store.as_ref());
        debug!(
            from = %from.id(),
            to = %to.id(),
            sender_balance = %pair.sender_balance(),
            "Pair locked"
        );

        if let Err(rejection) = admit(pair.sender_balance()) {
            self.metrics
                .transfers_rejected
                .fetch_add(1, Ordering::Relaxed);
            return Err(rejection);
        }

        match pair.apply(amount) {
            Ok(()) => {
                let sender_balance = *pair.from_balance;
                let receiver_balance = *pair.to_balance;
                info!(
                    from = %from.id(),
                    to = %to.id(),
                    %amount,
                    %sender_balance,
                    %receiver_balance,
                    "Balance transfer applied"
                );
                pair.commit();
                self.metrics
                    .transfers_applied
                    .fetch_add(1, Ordering::Relaxed);
                Ok(true)
            }
            Err(e) => {
                error!(from = %from.id(), to = %to.id(), %amount, error = %e, "Balance transfer failed");
                drop(pair);
                self.metrics
                    .transfers_rolled_back
                    .fetch_add(1, Ordering::Relaxed);
                Ok(false)
            }
        }
    }

    pub fn metrics(&self) -> EngineMetricsSnapshot {
        EngineMetricsSnapshot {
            transfers_applied: self.metrics.transfers_applied.load(Ordering::Relaxed),
            transfers_rolled_back: self.metrics.transfers_rolled_back.load(Ordering::Relaxed),
            transfers_rejected: self.metrics.transfers_rejected.load(Ordering::Relaxed),
        }
    }
}
