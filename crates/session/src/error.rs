//! Session error types.

use thiserror::Error;

use crate::wallet::WalletError;

/// Errors that can occur while establishing or restoring a wallet session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no wallet capability present in the host environment")]
    WalletUnavailable,

    #[error("wallet authorization rejected by user")]
    UserRejected,

    #[error("wallet is on chain {got}, required chain {required}")]
    WrongNetwork { required: u64, got: u64 },

    #[error("network switch failed: {0}")]
    NetworkSwitchFailed(String),

    #[error("wallet provider error: {0}")]
    Provider(String),
}

impl From<WalletError> for SessionError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::Rejected => SessionError::UserRejected,
            WalletError::Unavailable => SessionError::WalletUnavailable,
            WalletError::ChainUnknown => {
                SessionError::NetworkSwitchFailed("wallet does not know the chain".to_string())
            }
            WalletError::Other(msg) => SessionError::Provider(msg),
        }
    }
}
