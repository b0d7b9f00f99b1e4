use std::fmt;

use axum::{http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, PartialEq, Clone)]
pub struct CtxError {
    pub error: AppError,
    pub req_id: Uuid,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AppError {
    Generic { description: String },
    AuthenticationFail,
    AuthorizationFail { required: String },
    AuthFailNoJwtToken,
    AuthFailJwtInvalid { source: String },
    EntityFailIdNotFound { ident: String },
    Serde { source: String },
    SurrealDb { source: String },
    NegativeBalance,
    TaskAlreadyCompleted,
    ProductUnavailable,
    MinimumBalanceRequired,
    TaskLimitUpgrade,
    TaskLimitWithdraw,
    InsufficientFunds,
    DepositAlreadyProcessed,
    WithdrawalAlreadyProcessed,
}

/// CtxError carries the req_id to report to the client and implements IntoResponse.
pub type CtxResult<T> = core::result::Result<T, CtxError>;
/// For errors built before a request context (and its req_id) is attached.
pub type AppResult<T> = core::result::Result<T, AppError>;

impl std::error::Error for AppError {}

impl From<surrealdb::Error> for CtxError {
    fn from(value: surrealdb::Error) -> Self {
        CtxError {
            req_id: Uuid::new_v4(),
            error: value.into(),
        }
    }
}

impl From<AppError> for CtxError {
    fn from(value: AppError) -> Self {
        CtxError {
            req_id: Uuid::new_v4(),
            error: value,
        }
    }
}

const INTERNAL: &str = "Internal error";

// Messages are part of the API contract - client UIs branch on them.
impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generic { description } => write!(f, "{description}"),
            Self::AuthenticationFail => write!(f, "Invalid credentials"),
            Self::AuthorizationFail { .. } => write!(f, "Not authorized"),
            Self::AuthFailNoJwtToken => write!(f, "You are not logged in"),
            Self::AuthFailJwtInvalid { .. } => write!(f, "The provided token is not valid"),
            Self::EntityFailIdNotFound { ident } => write!(f, "{ident} not found"),
            Self::Serde { source } => write!(f, "Serde error - {source}"),
            Self::SurrealDb { .. } => write!(f, "{INTERNAL}"),
            Self::NegativeBalance => write!(f, "Cannot submit task with negative balance"),
            Self::TaskAlreadyCompleted => write!(f, "Product task already completed"),
            Self::ProductUnavailable => write!(f, "Product is not available"),
            Self::MinimumBalanceRequired => {
                write!(f, "Minimum balance of $50 required for first task")
            }
            Self::TaskLimitUpgrade => {
                write!(f, "Upgrade to premium to continue or withdraw first")
            }
            Self::TaskLimitWithdraw => write!(f, "Maximum tasks reached. Please withdraw first"),
            Self::InsufficientFunds => write!(f, "Insufficient balance for this task"),
            Self::DepositAlreadyProcessed => write!(f, "Deposit already processed"),
            Self::WithdrawalAlreadyProcessed => write!(f, "Withdrawal already processed"),
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

impl From<ErrorResponseBody> for String {
    fn from(value: ErrorResponseBody) -> Self {
        serde_json::to_string(&value).unwrap()
    }
}

// REST error response
impl IntoResponse for CtxError {
    fn into_response(self) -> axum::response::Response {
        tracing::debug!("->> {:<12} - into_response - {self:?}", "ERROR");
        let status_code = match self.error {
            AppError::EntityFailIdNotFound { .. } => StatusCode::NOT_FOUND,
            AppError::TaskAlreadyCompleted
            | AppError::DepositAlreadyProcessed
            | AppError::WithdrawalAlreadyProcessed => StatusCode::CONFLICT,
            AppError::AuthenticationFail
            | AppError::AuthFailNoJwtToken
            | AppError::AuthFailJwtInvalid { .. } => StatusCode::UNAUTHORIZED,
            AppError::AuthorizationFail { .. } => StatusCode::FORBIDDEN,
            AppError::Generic { .. }
            | AppError::Serde { .. }
            | AppError::SurrealDb { .. }
            | AppError::NegativeBalance
            | AppError::ProductUnavailable
            | AppError::MinimumBalanceRequired
            | AppError::TaskLimitUpgrade
            | AppError::TaskLimitWithdraw
            | AppError::InsufficientFunds => StatusCode::BAD_REQUEST,
        };
        let err = self.error.clone();
        let body: String =
            ErrorResponseBody::new(self.error.to_string(), Some(self.req_id.to_string())).into();
        let mut response = (status_code, body).into_response();
        // keep the real error available to request tracing
        response.extensions_mut().insert(err);
        response
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serde {
            source: value.to_string(),
        }
    }
}

impl From<surrealdb::Error> for AppError {
    fn from(value: surrealdb::Error) -> Self {
        Self::SurrealDb {
            source: value.to_string(),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        Self::AuthFailJwtInvalid {
            source: value.to_string(),
        }
    }
}

impl From<CtxError> for AppError {
    fn from(value: CtxError) -> Self {
        value.error
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(value: validator::ValidationErrors) -> Self {
        Self::Generic {
            description: value.to_string(),
        }
    }
}

impl From<validator::ValidationErrors> for CtxError {
    fn from(value: validator::ValidationErrors) -> Self {
        AppError::from(value).into()
    }
}
