//! Trait boundaries to the external collaborators.
//!
//! The ledger gateway signs and submits transactions through the
//! intermediary wallet and answers read-only queries; the metadata store
//! accepts blobs and JSON documents and returns dereferenceable locators.
//! Both are consumed as opaque capabilities.

use async_trait::async_trait;
use thiserror::Error;

use gavel_types::{
    Address, Amount, Auction, AuctionTerms, FeeQuote, NftMetadata, PendingTx, Receipt, TokenId,
    TransactionRecord,
};

/// Failures at the gateway boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The signer declined the transaction.
    #[error("signature request rejected by user")]
    UserRejected,

    /// The ledger rejected the call after submission.
    #[error("transaction reverted: {}", .reason.as_deref().unwrap_or("no reason given"))]
    Reverted { reason: Option<String> },

    /// Transport-level failure (connection, encoding, timeout).
    #[error("gateway transport error: {0}")]
    Transport(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Typed request/response boundary to the remote ledger.
///
/// Reads never prompt the user; each write returns a pending-transaction
/// handle once the wallet has signed and submitted, and `await_receipt`
/// blocks until the ledger reports a terminal status.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    // ============ Reads ============

    /// The ledger's current timestamp.
    async fn block_time(&self) -> GatewayResult<u64>;

    /// Governance-adjustable marketplace terms.
    async fn auction_terms(&self) -> GatewayResult<AuctionTerms>;

    /// Current network fee terms, if the ledger can quote them.
    async fn fee_quote(&self) -> GatewayResult<Option<FeeQuote>>;

    /// Auction record for a token, if one exists.
    async fn get_auction(&self, token_id: TokenId) -> GatewayResult<Option<Auction>>;

    /// All auctions ever opened by `user`.
    async fn get_user_auctions(&self, user: Address) -> GatewayResult<Vec<Auction>>;

    /// All auctions currently marked active on the ledger.
    async fn get_all_active_auctions(&self) -> GatewayResult<Vec<Auction>>;

    /// Current owner of a token, if minted.
    async fn owner_of(&self, token_id: TokenId) -> GatewayResult<Option<Address>>;

    /// Metadata locator of a token, if minted.
    async fn token_uri(&self, token_id: TokenId) -> GatewayResult<Option<String>>;

    /// Append-only activity log for `user`.
    async fn get_user_transactions(&self, user: Address) -> GatewayResult<Vec<TransactionRecord>>;

    /// Address of the auction contract: the operator that must hold transfer
    /// approval before an auction can be created.
    async fn auction_operator(&self) -> GatewayResult<Address>;

    // ============ Writes ============

    /// Grant the operator transfer rights over one token.
    async fn approve(
        &self,
        from: Address,
        operator: Address,
        token_id: TokenId,
    ) -> GatewayResult<PendingTx>;

    /// Open an auction; `value` carries the creation fee.
    async fn create_auction(
        &self,
        from: Address,
        token_id: TokenId,
        starting_price: Amount,
        duration: u64,
        value: Amount,
    ) -> GatewayResult<PendingTx>;

    /// Place a bid; `value` carries the bid amount. An explicit fee quote is
    /// attached when available instead of wallet-default estimation.
    async fn place_bid(
        &self,
        from: Address,
        token_id: TokenId,
        value: Amount,
        fee: Option<FeeQuote>,
    ) -> GatewayResult<PendingTx>;

    /// Cancel an auction that has not received a bid.
    async fn cancel_auction(&self, from: Address, token_id: TokenId) -> GatewayResult<PendingTx>;

    /// Settle an ended auction; the ledger picks the unsold/sold branch.
    async fn finalize_expired_auction(
        &self,
        from: Address,
        token_id: TokenId,
    ) -> GatewayResult<PendingTx>;

    /// Mint a token carrying a metadata locator.
    async fn mint_with_metadata(
        &self,
        from: Address,
        to: Address,
        token_id: TokenId,
        metadata_uri: &str,
    ) -> GatewayResult<PendingTx>;

    /// Wait for the terminal receipt of a submitted transaction.
    async fn await_receipt(&self, pending: PendingTx) -> GatewayResult<Receipt>;
}

/// Failures at the metadata store boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("metadata store unavailable: {0}")]
    Unavailable(String),
}

/// Content-addressed metadata store.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Upload a binary blob, returning a dereferenceable locator.
    async fn put_blob(&self, bytes: Vec<u8>) -> Result<String, StorageError>;

    /// Upload a JSON metadata document, returning a dereferenceable locator.
    async fn put_json(&self, document: &NftMetadata) -> Result<String, StorageError>;
}
