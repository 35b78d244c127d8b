//! Wallet capability boundary.
//!
//! The wallet is an external, adversarial collaborator: it can switch
//! accounts or chains at any moment, and every answer it gives may be stale
//! by the time it is read. The session machine consumes it through this
//! trait and never trusts it beyond a single call.

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;

use gavel_types::{Address, Amount, NetworkDescriptor};

/// Errors surfaced by the wallet capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    /// The user declined the request in the wallet UI.
    #[error("request rejected by user")]
    Rejected,

    /// The wallet does not know the requested chain yet.
    #[error("chain not known to the wallet")]
    ChainUnknown,

    /// No wallet capability is present.
    #[error("wallet unavailable")]
    Unavailable,

    #[error("{0}")]
    Other(String),
}

/// Wallet-originated event, delivered to the session machine's inbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    /// The authorized account set changed. Empty means logged out.
    AccountsChanged(Vec<Address>),
    /// The wallet moved to a different chain.
    ChainChanged(u64),
}

/// The host wallet capability: account authorization, network control and
/// balance reads.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Whether a signing capability is present in the host environment.
    fn is_available(&self) -> bool;

    /// Prompt the wallet for authorization and return the authorized
    /// accounts. May be declined by the user.
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError>;

    /// Enumerate already-authorized accounts without prompting.
    async fn accounts(&self) -> Result<Vec<Address>, WalletError>;

    /// The wallet's current chain id.
    async fn chain_id(&self) -> Result<u64, WalletError>;

    /// Ask the wallet to move to the given chain.
    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError>;

    /// Register a chain the wallet does not know yet.
    async fn add_chain(&self, descriptor: &NetworkDescriptor) -> Result<(), WalletError>;

    /// Native-currency balance of the given account.
    async fn balance(&self, address: Address) -> Result<Amount, WalletError>;
}

/// A development wallet with a fixed account that approves every request.
///
/// Stands in for the browser wallet capability in the CLI and in tests;
/// signing itself happens behind the ledger gateway.
pub struct StaticWallet {
    accounts: Vec<Address>,
    balance: Amount,
    chain: Mutex<u64>,
    known_chains: Mutex<HashSet<u64>>,
}

impl StaticWallet {
    /// Create a wallet holding a single account on the given chain.
    pub fn new(account: Address, chain_id: u64, balance: Amount) -> Self {
        Self {
            accounts: vec![account],
            balance,
            chain: Mutex::new(chain_id),
            known_chains: Mutex::new(HashSet::from([chain_id])),
        }
    }

    /// Chain the wallet currently sits on.
    pub fn current_chain(&self) -> u64 {
        *self.chain.lock()
    }
}

#[async_trait]
impl WalletProvider for StaticWallet {
    fn is_available(&self) -> bool {
        true
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        Ok(self.accounts.clone())
    }

    async fn accounts(&self) -> Result<Vec<Address>, WalletError> {
        Ok(self.accounts.clone())
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        Ok(*self.chain.lock())
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError> {
        if !self.known_chains.lock().contains(&chain_id) {
            return Err(WalletError::ChainUnknown);
        }
        *self.chain.lock() = chain_id;
        Ok(())
    }

    async fn add_chain(&self, descriptor: &NetworkDescriptor) -> Result<(), WalletError> {
        self.known_chains.lock().insert(descriptor.chain_id);
        Ok(())
    }

    async fn balance(&self, _address: Address) -> Result<Amount, WalletError> {
        Ok(self.balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(chain_id: u64) -> NetworkDescriptor {
        NetworkDescriptor {
            chain_id,
            name: "Testnet".to_string(),
            currency_symbol: "TST".to_string(),
            currency_decimals: 18,
            rpc_url: "http://localhost:8545".to_string(),
            explorer_url: "http://localhost:4000".to_string(),
        }
    }

    #[tokio::test]
    async fn test_static_wallet_switch_requires_known_chain() {
        let wallet = StaticWallet::new(Address([1u8; 20]), 1, 0);

        assert_eq!(wallet.switch_chain(99).await, Err(WalletError::ChainUnknown));
        assert_eq!(wallet.current_chain(), 1);

        wallet.add_chain(&descriptor(99)).await.unwrap();
        wallet.switch_chain(99).await.unwrap();
        assert_eq!(wallet.current_chain(), 99);
    }
}
