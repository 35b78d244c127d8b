//! Auction lifecycle engine for the gavel marketplace client.
//!
//! This crate provides:
//! - the pure auction valuation functions (status derivation, minimum bids,
//!   time formatting, expiry/ownership filters);
//! - the trait boundaries to the ledger gateway and the metadata store;
//! - the lifecycle coordinator that sequences multi-call workflows on top of
//!   the session machine, validating locally before any submission and
//!   reconciling after;
//! - the derived-state board the periodic refresh and the countdown both
//!   read from.

pub mod board;
pub mod coordinator;
pub mod error;
pub mod gateway;
pub mod valuation;

pub use board::{spawn_refresh_task, AuctionBoard, AuctionView, DEFAULT_REFRESH_INTERVAL};
pub use coordinator::{Coordinator, WorkflowState};
pub use error::{ValidationError, WorkflowError};
pub use gateway::{GatewayError, LedgerGateway, MetadataStore, StorageError};
