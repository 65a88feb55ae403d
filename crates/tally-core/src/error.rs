use std::fmt;

use thiserror::Error;

use crate::account::AccountId;

/// Protocol-wide error types for the Tally accrual engine.
///
/// Every public operation either completes or fails with one of these and
/// leaves no partial state behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TallyError {
    /// An amount argument was zero where a positive amount is required.
    #[error("Amount must be greater than zero")]
    ZeroAmount,

    /// The account does not hold enough of the relevant balance.
    #[error("Insufficient balance: requested {requested} but only {available} available")]
    InsufficientBalance { requested: u64, available: u64 },

    /// Principal is still locked.
    #[error("Lock not expired: unlocks at {unlocks_at}, now {now}")]
    LockActive { unlocks_at: u64, now: u64 },

    /// The requested lock duration does not reach the shortest tier.
    #[error("Invalid lock duration: {0} seconds does not reach the shortest tier")]
    InvalidLockDuration(u64),

    #[error("Account already registered: {0}")]
    AlreadyRegistered(AccountId),

    #[error("Account not registered: {0}")]
    NotRegistered(AccountId),

    #[error("An account cannot refer itself")]
    SelfReferral,

    /// The task tag has already been awarded to this account.
    #[error("Task {tag} already completed by {account}")]
    TaskAlreadyCompleted { account: AccountId, tag: String },

    /// The caller lacks the role required for a privileged operation.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Position is not liquidatable: debt {debt} within max borrow {max_borrow}")]
    NotLiquidatable { debt: u64, max_borrow: u64 },

    /// The operation would leave a collateral position over its borrow limit.
    #[error("Position would be undercollateralized: debt {debt} exceeds max borrow {max_borrow}")]
    Undercollateralized { debt: u64, max_borrow: u64 },

    #[error("Nothing to claim")]
    NothingToClaim,

    /// An administrative parameter is out of range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Checked arithmetic failed. Never saturated silently.
    #[error("Arithmetic overflow in {0}")]
    Overflow(&'static str),

    /// An accounting identity does not hold (e.g. negative pending entitlement).
    #[error("Accounting invariant violated: {0}")]
    Invariant(String),

    /// The token collaborator refused a transfer, mint, or burn.
    #[error("Token transfer failed: {0}")]
    Transfer(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Coarse classification of a [`TallyError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller-visible precondition failure (bad input, wrong state, missing role).
    Precondition,
    /// Checked arithmetic failure; fatal for the operation.
    Arithmetic,
    /// An external collaborator (token ledger) reported failure.
    Collaborator,
    /// Broken internal invariant or plumbing failure.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Precondition => write!(f, "precondition"),
            ErrorKind::Arithmetic => write!(f, "arithmetic"),
            ErrorKind::Collaborator => write!(f, "collaborator"),
            ErrorKind::Internal => write!(f, "internal"),
        }
    }
}

impl TallyError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TallyError::ZeroAmount
            | TallyError::InsufficientBalance { .. }
            | TallyError::LockActive { .. }
            | TallyError::InvalidLockDuration(_)
            | TallyError::AlreadyRegistered(_)
            | TallyError::NotRegistered(_)
            | TallyError::SelfReferral
            | TallyError::TaskAlreadyCompleted { .. }
            | TallyError::Unauthorized(_)
            | TallyError::NotLiquidatable { .. }
            | TallyError::Undercollateralized { .. }
            | TallyError::NothingToClaim
            | TallyError::InvalidParameter(_)
            | TallyError::NotFound(_) => ErrorKind::Precondition,
            TallyError::Overflow(_) => ErrorKind::Arithmetic,
            TallyError::Transfer(_) => ErrorKind::Collaborator,
            TallyError::Invariant(_) => ErrorKind::Internal,
        }
    }
}
