//! Wallet session state machine for the gavel marketplace client.
//!
//! This crate owns wallet connectivity and network identity: it is the single
//! source of truth for whether the client is currently allowed to read from
//! or write to the ledger, and as which identity. Wallet-originated events
//! (account switch, chain switch) are delivered as messages to the machine's
//! single inbox so that each event produces exactly one authoritative
//! transition.

pub mod error;
pub mod machine;
pub mod store;
pub mod wallet;

pub use error::SessionError;
pub use machine::{ConnectionState, SessionManager, SessionSnapshot};
pub use store::{FileSessionStore, MemorySessionStore, PersistedSession, SessionStore};
pub use wallet::{StaticWallet, WalletError, WalletEvent, WalletProvider};
