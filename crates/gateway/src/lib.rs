//! JSON-RPC implementations of the engine's external boundaries.
//!
//! The engine consumes the ledger and the metadata store as opaque trait
//! objects; this crate provides the HTTP shims that speak the marketplace
//! RPC protocol to a remote endpoint (the mock chain server locally, the
//! real gateway in deployment).

pub mod ledger;
pub mod storage;

pub use ledger::RpcLedgerGateway;
pub use storage::RpcMetadataStore;
