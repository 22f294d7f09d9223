use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

/// Which side of the ledger could not cover a debit.
#[derive(Display, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FundsAccount {
    Wallet,
    Escrow,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppError {
    Validation { description: String },
    WalletNotFound { user_id: String },
    EscrowNotFound { task_id: String },
    EscrowAlreadyFunded { task_id: String },
    InsufficientFunds { account: FundsAccount, owner_id: String },
    NotEnoughMoneyInEscrow { task_id: String, required: i64, available: i64 },
    NotCorrectAmountTransfer { task_id: String, remaining: i64 },
    DuplicateReference { user_id: String, reference: String },
    TransferAborted { source: String },
    SurrealDb { source: String },
}

pub type AppResult<T> = core::result::Result<T, AppError>;

impl std::error::Error for AppError {}

impl AppError {
    pub fn validation(description: impl Into<String>) -> Self {
        Self::Validation {
            description: description.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::WalletNotFound { .. } | AppError::EscrowNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            AppError::EscrowAlreadyFunded { .. } | AppError::DuplicateReference { .. } => {
                StatusCode::CONFLICT
            }
            AppError::InsufficientFunds { .. } | AppError::NotEnoughMoneyInEscrow { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::NotCorrectAmountTransfer { .. } | AppError::SurrealDb { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::TransferAborted { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Only infrastructure aborts are worth replaying; domain errors would fail the same way.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::TransferAborted { .. })
    }
}

const INTERNAL: &str = "Internal error";

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation { description } => write!(f, "{description}"),
            Self::WalletNotFound { user_id } => write!(f, "Wallet for user {user_id} not found"),
            Self::EscrowNotFound { task_id } => write!(f, "Escrow for task {task_id} not found"),
            Self::EscrowAlreadyFunded { task_id } => {
                write!(f, "Escrow for task {task_id} is already funded")
            }
            Self::InsufficientFunds {
                account: FundsAccount::Wallet,
                owner_id,
            } => write!(f, "Not enough balance in wallet of user {owner_id}"),
            Self::InsufficientFunds {
                account: FundsAccount::Escrow,
                owner_id,
            } => write!(f, "Not enough money in escrow of task {owner_id}"),
            Self::NotEnoughMoneyInEscrow {
                task_id,
                required,
                available,
            } => write!(
                f,
                "Not enough money in escrow of task {task_id}: required {required}, available {available}"
            ),
            Self::NotCorrectAmountTransfer { task_id, remaining } => write!(
                f,
                "Escrow of task {task_id} was not fully disbursed, {remaining} remains"
            ),
            Self::DuplicateReference { reference, .. } => {
                write!(f, "Reference {reference} was already applied")
            }
            Self::TransferAborted { .. } => write!(f, "Transfer aborted, try again later"),
            Self::SurrealDb { .. } => write!(f, "{INTERNAL}"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponseBody {
    error: String,
    req_id: String,
}

impl ErrorResponseBody {
    pub fn new(error: String, req_id: Option<String>) -> Self {
        ErrorResponseBody {
            error,
            req_id: req_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        }
    }

    pub fn get_err(&self) -> String {
        self.error.clone()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        if status_code.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }
        let body = ErrorResponseBody::new(self.to_string(), None);
        let mut response = (status_code, Json(body)).into_response();
        // keep the typed error around for response loggers
        response.extensions_mut().insert(self);
        response
    }
}

impl From<surrealdb::Error> for AppError {
    fn from(value: surrealdb::Error) -> Self {
        Self::SurrealDb {
            source: value.to_string(),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(value: validator::ValidationErrors) -> Self {
        Self::Validation {
            description: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_client_statuses() {
        let not_found = AppError::EscrowNotFound {
            task_id: "t1".to_string(),
        };
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);

        let funds = AppError::InsufficientFunds {
            account: FundsAccount::Wallet,
            owner_id: "u1".to_string(),
        };
        assert_eq!(funds.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(!funds.is_retryable());
        assert_eq!(
            AppError::validation("bad").status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn integrity_alarm_is_a_server_error() {
        let err = AppError::NotCorrectAmountTransfer {
            task_id: "t1".to_string(),
            remaining: 3,
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.is_retryable());
        assert_eq!(
            err.to_string(),
            "Escrow of task t1 was not fully disbursed, 3 remains"
        );
    }

    #[test]
    fn aborted_transfer_is_retryable() {
        let err = AppError::TransferAborted {
            source: "connection reset".to_string(),
        };
        assert!(err.is_retryable());
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.to_string(), "Transfer aborted, try again later");
    }

    #[test]
    fn insufficient_funds_names_the_ledger_side() {
        let err = AppError::InsufficientFunds {
            account: FundsAccount::Escrow,
            owner_id: "task-9".to_string(),
        };
        assert_eq!(err.to_string(), "Not enough money in escrow of task task-9");
    }

    #[tokio::test]
    async fn response_body_carries_display_message() {
        let response = AppError::WalletNotFound {
            user_id: "u7".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.extensions().get::<AppError>().is_some());

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: ErrorResponseBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.get_err(), "Wallet for user u7 not found");
    }
}
