//! The wallet session state machine.
//!
//! States: `Disconnected → Connecting → NetworkMismatch → Active`, with the
//! error paths returning to `Disconnected` and `Active` re-entrant on wallet
//! events. Any loss of the expected identity is treated as an explicit
//! logout, never as a degraded-but-active state.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{info, warn};

use gavel_types::{Address, Amount, NetworkDescriptor};

use crate::error::SessionError;
use crate::store::{PersistedSession, SessionStore};
use crate::wallet::{WalletError, WalletEvent, WalletProvider};

/// Connectivity state of the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    NetworkMismatch,
    Active,
}

/// Read-only view of the session, safe to hold across suspension points.
///
/// `epoch` increments on every identity transition; a workflow that observes
/// a different epoch after a suspension knows the identity it validated
/// against is gone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: ConnectionState,
    pub address: Option<Address>,
    pub chain_id: Option<u64>,
    pub balance: Option<Amount>,
    pub epoch: u64,
}

impl SessionSnapshot {
    pub fn is_active(&self) -> bool {
        self.state == ConnectionState::Active
    }
}

// Address and chain id are a single field so the snapshot can never expose a
// partially authenticated identity.
struct Inner {
    state: ConnectionState,
    identity: Option<(Address, u64)>,
    balance: Option<Amount>,
    epoch: u64,
}

/// Owns wallet connectivity and network identity. All mutation goes through
/// this machine; everyone else reads snapshots.
pub struct SessionManager {
    provider: Arc<dyn WalletProvider>,
    store: Arc<dyn SessionStore>,
    network: NetworkDescriptor,
    inner: Mutex<Inner>,
}

impl SessionManager {
    pub fn new(
        provider: Arc<dyn WalletProvider>,
        store: Arc<dyn SessionStore>,
        network: NetworkDescriptor,
    ) -> Self {
        Self {
            provider,
            store,
            network,
            inner: Mutex::new(Inner {
                state: ConnectionState::Disconnected,
                identity: None,
                balance: None,
                epoch: 0,
            }),
        }
    }

    /// The network this client requires.
    pub fn required_network(&self) -> &NetworkDescriptor {
        &self.network
    }

    /// Current session view.
    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock();
        SessionSnapshot {
            state: inner.state,
            address: inner.identity.map(|(addr, _)| addr),
            chain_id: inner.identity.map(|(_, chain)| chain),
            balance: inner.balance,
            epoch: inner.epoch,
        }
    }

    /// Connect to the wallet, switching it to the required network if needed.
    pub async fn connect(&self) -> Result<SessionSnapshot, SessionError> {
        if !self.provider.is_available() {
            return Err(SessionError::WalletUnavailable);
        }
        self.set_state(ConnectionState::Connecting);

        match self.connect_inner().await {
            Ok(snapshot) => Ok(snapshot),
            Err(err) => {
                warn!(%err, "wallet connection failed");
                self.teardown();
                Err(err)
            }
        }
    }

    async fn connect_inner(&self) -> Result<SessionSnapshot, SessionError> {
        let required = self.network.chain_id;

        let live = self.provider.chain_id().await?;
        if live != required {
            self.set_state(ConnectionState::NetworkMismatch);
            self.switch_network().await?;

            // Re-read rather than assume: the wallet may have lied or the
            // user may have switched elsewhere mid-request.
            let live = self.provider.chain_id().await?;
            if live != required {
                return Err(SessionError::WrongNetwork { required, got: live });
            }
        }

        let accounts = self.provider.request_accounts().await?;
        let address = accounts
            .first()
            .copied()
            .ok_or_else(|| SessionError::Provider("wallet returned no accounts".to_string()))?;

        // Best-effort: a failed balance read does not block authentication.
        let balance = self.provider.balance(address).await.ok();

        let snapshot = self.activate(address, required, balance);
        self.store.save(&PersistedSession {
            address,
            chain_id: required,
        });
        info!(address = %address, chain_id = required, "wallet session active");
        Ok(snapshot)
    }

    async fn switch_network(&self) -> Result<(), SessionError> {
        let required = self.network.chain_id;
        match self.provider.switch_chain(required).await {
            Ok(()) => Ok(()),
            Err(WalletError::ChainUnknown) => {
                info!(chain_id = required, "wallet does not know the required chain; registering it");
                self.provider
                    .add_chain(&self.network)
                    .await
                    .map_err(|err| SessionError::NetworkSwitchFailed(err.to_string()))?;
                self.provider
                    .switch_chain(required)
                    .await
                    .map_err(|err| SessionError::NetworkSwitchFailed(err.to_string()))
            }
            Err(err) => Err(SessionError::NetworkSwitchFailed(err.to_string())),
        }
    }

    /// Restore a prior session from the persisted hint, if any.
    ///
    /// The hint is never trusted: the live wallet must report the same first
    /// account and the same chain, otherwise the hint is cleared and the
    /// machine stays `Disconnected`.
    pub async fn restore(&self) -> SessionSnapshot {
        let Some(hint) = self.store.load() else {
            return self.snapshot();
        };
        if !self.provider.is_available() {
            return self.snapshot();
        }

        match self.probe_live_identity().await {
            Ok((live_account, live_chain))
                if live_account == Some(hint.address)
                    && live_chain == self.network.chain_id
                    && live_chain == hint.chain_id =>
            {
                let balance = self.provider.balance(hint.address).await.ok();
                let snapshot = self.activate(hint.address, hint.chain_id, balance);
                info!(address = %hint.address, "session restored");
                snapshot
            }
            Ok(_) => {
                info!("persisted session no longer matches the live wallet; clearing");
                self.store.clear();
                self.snapshot()
            }
            Err(err) => {
                warn!(%err, "session restore failed; clearing persisted state");
                self.store.clear();
                self.snapshot()
            }
        }
    }

    async fn probe_live_identity(&self) -> Result<(Option<Address>, u64), WalletError> {
        let accounts = self.provider.accounts().await?;
        let chain = self.provider.chain_id().await?;
        Ok((accounts.first().copied(), chain))
    }

    /// Local teardown. No ledger call; clears the persisted hint.
    pub fn disconnect(&self) {
        self.teardown();
    }

    /// Apply one wallet-originated event. Exactly one transition per event.
    pub async fn handle_event(&self, event: WalletEvent) {
        match event {
            WalletEvent::AccountsChanged(accounts) => match accounts.first().copied() {
                None => {
                    info!("wallet reports no accounts; disconnecting");
                    self.teardown();
                }
                Some(address) => self.account_switched(address).await,
            },
            WalletEvent::ChainChanged(chain_id) => {
                if chain_id != self.network.chain_id {
                    info!(chain_id, required = self.network.chain_id, "wallet left the required chain; disconnecting");
                    self.teardown();
                }
            }
        }
    }

    /// Drain an event inbox, applying each event in order.
    pub async fn pump_events(&self, mut inbox: mpsc::Receiver<WalletEvent>) {
        while let Some(event) = inbox.recv().await {
            self.handle_event(event).await;
        }
    }

    async fn account_switched(&self, address: Address) {
        let current = {
            let inner = self.inner.lock();
            if inner.state != ConnectionState::Active {
                return;
            }
            inner.identity.map(|(addr, _)| addr)
        };
        if current == Some(address) {
            return;
        }

        // Cheap path: same wallet, different account. Update identity and
        // balance without a full reconnect. The persisted hint is left as-is;
        // the next restore re-validates it against the live wallet.
        let balance = self.provider.balance(address).await.ok();
        let mut inner = self.inner.lock();
        if inner.state != ConnectionState::Active {
            return;
        }
        if let Some((_, chain)) = inner.identity {
            info!(address = %address, "wallet account switched");
            inner.identity = Some((address, chain));
            inner.balance = balance;
            inner.epoch += 1;
        }
    }

    fn activate(&self, address: Address, chain_id: u64, balance: Option<Amount>) -> SessionSnapshot {
        {
            let mut inner = self.inner.lock();
            inner.state = ConnectionState::Active;
            inner.identity = Some((address, chain_id));
            inner.balance = balance;
            inner.epoch += 1;
        }
        self.snapshot()
    }

    fn set_state(&self, state: ConnectionState) {
        self.inner.lock().state = state;
    }

    fn teardown(&self) {
        {
            let mut inner = self.inner.lock();
            inner.state = ConnectionState::Disconnected;
            inner.identity = None;
            inner.balance = None;
            inner.epoch += 1;
        }
        self.store.clear();
    }
}
