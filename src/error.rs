use super::types::{LeaveType, Role, Stage};
use chrono::NaiveDate;
use sled::transaction::TransactionError;

pub type LeaveResult<T> = Result<T, LeaveError>;

#[derive(thiserror::Error, Debug)]
pub enum LeaveError {
    #[error("Invalid leave request: {0}")]
    Validation(String),
    #[error("End date {end} cannot be before start date {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
    #[error("Normal leave starting {start} needs advance notice, earliest start is {earliest}")]
    AdvanceNotice { start: NaiveDate, earliest: NaiveDate },
    #[error("Not enough {leave_type} leave remaining: requested {requested}, available {available}")]
    InsufficientBalance {
        leave_type: LeaveType,
        requested: u32,
        available: u32,
    },
    #[error("Restoring {days} days would overflow the {leave_type} balance of {balance}")]
    BalanceOverflow {
        leave_type: LeaveType,
        balance: u32,
        days: u32,
    },
    #[error("No leave defaults exist for role '{0}'")]
    UnknownRole(String),
    #[error("Leave defaults for role {0} were given more than once")]
    DuplicateRole(Role),
    #[error("Leave request {0} not found")]
    NotFound(String),
    #[error("User {0} not found")]
    UserNotFound(String),
    #[error("Cannot decide on your own leave request {request_id}")]
    SelfApproval { request_id: String },
    #[error("{approver} is not allowed to act on a request at stage {stage}")]
    StageConflict { stage: Stage, approver: Role },
    #[error("{role} is not allowed to {action}")]
    Forbidden { role: Role, action: &'static str },
    #[error("Failed to generate identifier: {0}")]
    Identifier(String),
    #[error("Storage failure: {0}")]
    Storage(#[from] sled::Error),
    #[error("Failed to encode record: {0}")]
    Encode(String),
    #[error("Failed to decode record: {0}")]
    Decode(#[from] minicbor::decode::Error),
}

/// Coarse classification of [`LeaveError`] for callers mapping errors to responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveErrorKind {
    Validation,
    AdvanceNotice,
    InsufficientBalance,
    UnknownRole,
    NotFound,
    SelfApproval,
    StageConflict,
    Forbidden,
    Internal,
}

impl LeaveError {
    pub fn kind(&self) -> LeaveErrorKind {
        match self {
            LeaveError::Validation(_) | LeaveError::InvalidRange { .. } => {
                LeaveErrorKind::Validation
            }
            LeaveError::AdvanceNotice { .. } => LeaveErrorKind::AdvanceNotice,
            LeaveError::InsufficientBalance { .. } => LeaveErrorKind::InsufficientBalance,
            LeaveError::UnknownRole(_) | LeaveError::DuplicateRole(_) => {
                LeaveErrorKind::UnknownRole
            }
            LeaveError::NotFound(_) | LeaveError::UserNotFound(_) => LeaveErrorKind::NotFound,
            LeaveError::SelfApproval { .. } => LeaveErrorKind::SelfApproval,
            LeaveError::StageConflict { .. } => LeaveErrorKind::StageConflict,
            LeaveError::Forbidden { .. } => LeaveErrorKind::Forbidden,
            LeaveError::BalanceOverflow { .. }
            | LeaveError::Identifier(_)
            | LeaveError::Storage(_)
            | LeaveError::Encode(_)
            | LeaveError::Decode(_) => LeaveErrorKind::Internal,
        }
    }

    /// Days missing to satisfy the request, only set for balance failures.
    pub fn shortfall(&self) -> Option<u32> {
        match self {
            LeaveError::InsufficientBalance {
                requested,
                available,
                ..
            } => Some(requested.saturating_sub(*available)),
            _ => None,
        }
    }
}

impl From<TransactionError<LeaveError>> for LeaveError {
    fn from(value: TransactionError<LeaveError>) -> Self {
        match value {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => LeaveError::Storage(e),
        }
    }
}
