use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use validator::{Validate, ValidationError};

use crate::application::{AccountService, TransferService};
use crate::domain::{Account, AccountError, TransferRequest};
use crate::infrastructure::ledger::Ledger;

#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub transfers: Arc<TransferService>,
}

impl AppState {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self {
            accounts: AccountService::new(ledger.clone()),
            transfers: Arc::new(TransferService::new(ledger)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    #[validate(length(min = 1, message = "accountId must not be empty"))]
    pub account_id: String,
    #[validate(custom = "non_negative")]
    pub balance: Decimal,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BalanceTransferRequest {
    #[validate(length(min = 1, message = "accountFrom must not be empty"))]
    pub account_from: String,
    #[validate(length(min = 1, message = "accountTo must not be empty"))]
    pub account_to: String,
    #[validate(custom = "positive")]
    pub transfer_amount: Decimal,
}

impl From<BalanceTransferRequest> for TransferRequest {
    fn from(payload: BalanceTransferRequest) -> Self {
        TransferRequest::new(
            payload.account_from,
            payload.account_to,
            payload.transfer_amount,
        )
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub account_id: String,
    pub balance: Decimal,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            account_id: account.id,
            balance: account.balance,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct BalanceTransferResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub error: String,
}

fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        return Err(ValidationError::new("balance must not be negative"));
    }
    Ok(())
}

fn positive(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        return Err(ValidationError::new("Transfer Amount is invalid"));
    }
    Ok(())
}

/// HTTP status the request layer answers with for each domain error.
pub fn status_for(error: &AccountError) -> StatusCode {
    match error {
        AccountError::DuplicateAccount(_)
        | AccountError::InvalidAmount(_)
        | AccountError::SameAccount => StatusCode::BAD_REQUEST,
        AccountError::NotFound { .. } => StatusCode::NOT_FOUND,
        AccountError::InsufficientBalance { .. } => StatusCode::PRECONDITION_FAILED,
    }
}

fn error_response(status: StatusCode, code: &str, error: String) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            code: code.to_string(),
            error,
        }),
    )
}

fn bad_request(error: String) -> (StatusCode, Json<ErrorResponse>) {
    error_response(StatusCode::BAD_REQUEST, "INVALID_REQUEST", error)
}

pub async fn create_account(
    State(state): State<AppState>,
    payload: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let Json(payload) = payload.map_err(|e| bad_request(e.body_text()))?;
    payload.validate().map_err(|e| bad_request(e.to_string()))?;
    info!(account_id = %payload.account_id, "Creating account");

    let account = state
        .accounts
        .create_account(payload.account_id, payload.balance)
        .map_err(|e| error_response(status_for(&e), e.code(), e.to_string()))?;

    Ok((StatusCode::CREATED, Json(AccountResponse::from(account))))
}

pub async fn get_account(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<Json<AccountResponse>, (StatusCode, Json<ErrorResponse>)> {
    info!(%account_id, "Retrieving account");
    state
        .accounts
        .get_account(&account_id)
        .map(|account| Json(account.into()))
        .ok_or_else(|| {
            error_response(
                StatusCode::NOT_FOUND,
                "ACCOUNT_NOT_FOUND",
                format!("Account {account_id} not found"),
            )
        })
}

pub async fn balance_transfer(
    State(state): State<AppState>,
    payload: Result<Json<BalanceTransferRequest>, JsonRejection>,
) -> Result<Json<BalanceTransferResponse>, (StatusCode, Json<BalanceTransferResponse>)> {
    let invalid = |status: String| {
        (
            StatusCode::BAD_REQUEST,
            Json(BalanceTransferResponse { status }),
        )
    };
    let Json(payload) = payload.map_err(|e| invalid(e.body_text()))?;
    payload.validate().map_err(|e| invalid(e.to_string()))?;
    info!(
        from = %payload.account_from,
        to = %payload.account_to,
        amount = %payload.transfer_amount,
        "Balance transfer requested"
    );

    match state.transfers.execute(&TransferRequest::from(payload)) {
        Ok(outcome) => Ok(Json(BalanceTransferResponse {
            status: outcome.status(),
        })),
        Err(e) => {
            warn!(code = e.code(), error = %e, "Balance transfer rejected");
            Err((
                status_for(&e),
                Json(BalanceTransferResponse {
                    status: e.to_string(),
                }),
            ))
        }
    }
}

pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

pub async fn metrics(State(state): State<AppState>) -> Json<serde_json::Value> {
    let engine = state.transfers.metrics();
    Json(serde_json::json!({
        "accounts": state.accounts.ledger().len(),
        "transfers_applied": engine.transfers_applied,
        "transfers_rolled_back": engine.transfers_rolled_back,
        "transfers_rejected": engine.transfers_rejected,
    }))
}
