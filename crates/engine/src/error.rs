//! Workflow error taxonomy.

use thiserror::Error;

use gavel_session::SessionError;
use gavel_types::{format_amount, Amount, AuctionStatus, TokenId};

use crate::gateway::{GatewayError, StorageError};

/// Local pre-submission check failures. None of these ever consumes a
/// transaction attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no auction found for token {0}")]
    AuctionNotFound(TokenId),

    #[error("auction is not accepting bids (status: {0})")]
    NotLive(AuctionStatus),

    #[error("bid of {} is below the minimum of {}", format_amount(*.offered), format_amount(*.minimum))]
    BidTooLow { minimum: Amount, offered: Amount },

    #[error("sellers cannot bid on their own auction")]
    OwnAuction,

    /// A competing bid arrived between rendering the view and submitting the
    /// cancellation.
    #[error("auction can no longer be cancelled: a bid has been placed")]
    BidArrived,

    #[error("only the seller may cancel an auction")]
    NotSeller,

    #[error("auction has already ended")]
    AlreadyEnded,

    #[error("nothing to finalize (status: {0})")]
    NothingToFinalize(AuctionStatus),

    #[error("duration {got}s outside allowed range [{min}s, {max}s]")]
    DurationOutOfRange { min: u64, max: u64, got: u64 },

    #[error("starting price must be positive")]
    ZeroStartingPrice,

    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

/// Errors that can end a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    /// No active wallet session; all ledger-write workflows are blocked.
    #[error("no active wallet session")]
    NotConnected,

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The wallet identity changed while the workflow was in flight; the
    /// workflow aborts and assumes no partial commit.
    #[error("wallet identity changed while the workflow was in flight")]
    SessionInvalidated,

    /// The signer declined. Informational; the intent is preserved and a
    /// retry needs no new validation pass.
    #[error("signature request rejected by user")]
    UserRejected,

    #[error("transaction reverted: {}", .reason.as_deref().unwrap_or("no reason given"))]
    TransactionReverted { reason: Option<String> },

    /// Metadata upload failed; blocks only metadata-dependent steps.
    #[error("metadata store unavailable: {0}")]
    StorageUnavailable(String),

    /// Unclassified gateway failure. Logged with full context and surfaced
    /// as a failure, never as success.
    #[error("ledger gateway error: {0}")]
    Gateway(String),
}

impl WorkflowError {
    /// Whether this failure may have consumed a transaction attempt on the
    /// ledger. Validation and session failures never do.
    pub fn consumed_attempt(&self) -> bool {
        matches!(
            self,
            WorkflowError::TransactionReverted { .. } | WorkflowError::Gateway(_)
        )
    }
}

impl From<GatewayError> for WorkflowError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::UserRejected => WorkflowError::UserRejected,
            GatewayError::Reverted { reason } => WorkflowError::TransactionReverted { reason },
            GatewayError::Transport(msg) => WorkflowError::Gateway(msg),
        }
    }
}

impl From<StorageError> for WorkflowError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Unavailable(msg) => WorkflowError::StorageUnavailable(msg),
        }
    }
}
