use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// A single request to move `amount` from one account to another.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransferRequest {
    pub from: String,
    pub to: String,
    pub amount: Decimal,
}

impl TransferRequest {
    pub fn new(from: impl Into<String>, to: impl Into<String>, amount: Decimal) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            amount,
        }
    }
}

/// Result of an admitted transfer. Business-rule rejections are reported as
/// `AccountError` instead; this only says whether the locked mutation stuck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TransferOutcome {
    #[strum(serialize = "balance transfer processed successfully")]
    Completed,
    #[strum(serialize = "balance transfer process failed")]
    Failed,
}

impl TransferOutcome {
    pub fn from_engine(applied: bool) -> Self {
        if applied {
            TransferOutcome::Completed
        } else {
            TransferOutcome::Failed
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TransferOutcome::Completed)
    }

    pub fn status(&self) -> String {
        self.to_string()
    }
}
