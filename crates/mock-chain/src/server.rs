//! JSON-RPC server over the mock ledger.
//!
//! Serves the method set the RPC gateway consumes, so the full client stack
//! can run against a local process instead of a real network.

use std::net::SocketAddr;
use std::sync::Arc;

use jsonrpsee::core::async_trait;
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::ErrorObjectOwned;
use tracing::info;

use gavel_engine::gateway::{GatewayError, LedgerGateway, StorageError};
use gavel_types::rpc::{
    ApproveParams, CreateAuctionParams, MintParams, PlaceBidParams, TokenCallParams,
    EXECUTION_REVERTED_CODE, USER_REJECTED_CODE,
};
use gavel_types::{
    Address, Auction, AuctionTerms, FeeQuote, NftMetadata, PendingTx, Receipt, TokenId,
    TransactionRecord, TxHash,
};

use crate::MockLedger;

/// RPC API of the mock chain.
#[rpc(server)]
pub trait MarketApi {
    // ============ Chain ============

    /// Current ledger timestamp.
    #[method(name = "chain_blockTime")]
    async fn block_time(&self) -> Result<u64, ErrorObjectOwned>;

    /// Current network fee terms.
    #[method(name = "chain_feeQuote")]
    async fn fee_quote(&self) -> Result<Option<FeeQuote>, ErrorObjectOwned>;

    /// Terminal receipt of a submitted transaction.
    #[method(name = "chain_awaitReceipt")]
    async fn await_receipt(&self, tx_hash: TxHash) -> Result<Receipt, ErrorObjectOwned>;

    // ============ Marketplace ============

    /// Governance-adjustable marketplace terms.
    #[method(name = "market_terms")]
    async fn terms(&self) -> Result<AuctionTerms, ErrorObjectOwned>;

    /// Address of the auction contract.
    #[method(name = "market_operator")]
    async fn operator(&self) -> Result<Address, ErrorObjectOwned>;

    /// Auction record for a token.
    #[method(name = "market_getAuction")]
    async fn get_auction(&self, token_id: TokenId) -> Result<Option<Auction>, ErrorObjectOwned>;

    /// All auctions ever opened by a user.
    #[method(name = "market_getUserAuctions")]
    async fn get_user_auctions(&self, user: Address) -> Result<Vec<Auction>, ErrorObjectOwned>;

    /// All currently active auctions.
    #[method(name = "market_getAllActiveAuctions")]
    async fn get_all_active_auctions(&self) -> Result<Vec<Auction>, ErrorObjectOwned>;

    /// Open an auction.
    #[method(name = "market_createAuction")]
    async fn create_auction(&self, params: CreateAuctionParams)
        -> Result<PendingTx, ErrorObjectOwned>;

    /// Place a bid.
    #[method(name = "market_placeBid")]
    async fn place_bid(&self, params: PlaceBidParams) -> Result<PendingTx, ErrorObjectOwned>;

    /// Cancel an auction that has not received a bid.
    #[method(name = "market_cancelAuction")]
    async fn cancel_auction(&self, params: TokenCallParams) -> Result<PendingTx, ErrorObjectOwned>;

    /// Settle an ended auction.
    #[method(name = "market_finalizeAuction")]
    async fn finalize_auction(&self, params: TokenCallParams)
        -> Result<PendingTx, ErrorObjectOwned>;

    // ============ NFT ============

    /// Current owner of a token.
    #[method(name = "nft_ownerOf")]
    async fn owner_of(&self, token_id: TokenId) -> Result<Option<Address>, ErrorObjectOwned>;

    /// Metadata locator of a token.
    #[method(name = "nft_tokenUri")]
    async fn token_uri(&self, token_id: TokenId) -> Result<Option<String>, ErrorObjectOwned>;

    /// Grant transfer approval for one token.
    #[method(name = "nft_approve")]
    async fn approve(&self, params: ApproveParams) -> Result<PendingTx, ErrorObjectOwned>;

    /// Mint a token carrying a metadata locator.
    #[method(name = "nft_mint")]
    async fn mint(&self, params: MintParams) -> Result<PendingTx, ErrorObjectOwned>;

    // ============ Records & storage ============

    /// Activity log for a user.
    #[method(name = "records_getUserTransactions")]
    async fn get_user_transactions(
        &self,
        user: Address,
    ) -> Result<Vec<TransactionRecord>, ErrorObjectOwned>;

    /// Upload a binary blob (hex-encoded), returning its locator.
    #[method(name = "storage_putBlob")]
    async fn put_blob(&self, bytes_hex: String) -> Result<String, ErrorObjectOwned>;

    /// Upload a metadata document, returning its locator.
    #[method(name = "storage_putJson")]
    async fn put_json(&self, document: NftMetadata) -> Result<String, ErrorObjectOwned>;

    // ============ Admin (testing) ============

    /// Set the ledger timestamp.
    #[method(name = "admin_setTimestamp")]
    async fn set_timestamp(&self, timestamp: u64) -> Result<bool, ErrorObjectOwned>;

    /// Advance the ledger clock.
    #[method(name = "admin_advanceTime")]
    async fn advance_time(&self, seconds: u64) -> Result<u64, ErrorObjectOwned>;
}

/// Server implementation backed by the in-process mock ledger.
pub struct MarketServer {
    ledger: Arc<MockLedger>,
}

impl MarketServer {
    pub fn new(ledger: Arc<MockLedger>) -> Self {
        Self { ledger }
    }
}

fn rpc_error(err: GatewayError) -> ErrorObjectOwned {
    match err {
        GatewayError::UserRejected => ErrorObjectOwned::owned(
            USER_REJECTED_CODE,
            "user rejected the request".to_string(),
            None::<()>,
        ),
        GatewayError::Reverted { reason } => ErrorObjectOwned::owned(
            EXECUTION_REVERTED_CODE,
            format!(
                "execution reverted: {}",
                reason.unwrap_or_else(|| "no reason given".to_string())
            ),
            None::<()>,
        ),
        GatewayError::Transport(msg) => ErrorObjectOwned::owned(-32603, msg, None::<()>),
    }
}

fn storage_error(err: StorageError) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(-32010, err.to_string(), None::<()>)
}

#[async_trait]
impl MarketApiServer for MarketServer {
    async fn block_time(&self) -> Result<u64, ErrorObjectOwned> {
        LedgerGateway::block_time(&*self.ledger).await.map_err(rpc_error)
    }

    async fn fee_quote(&self) -> Result<Option<FeeQuote>, ErrorObjectOwned> {
        LedgerGateway::fee_quote(&*self.ledger).await.map_err(rpc_error)
    }

    async fn await_receipt(&self, tx_hash: TxHash) -> Result<Receipt, ErrorObjectOwned> {
        LedgerGateway::await_receipt(&*self.ledger, PendingTx(tx_hash))
            .await
            .map_err(rpc_error)
    }

    async fn terms(&self) -> Result<AuctionTerms, ErrorObjectOwned> {
        self.ledger.auction_terms().await.map_err(rpc_error)
    }

    async fn operator(&self) -> Result<Address, ErrorObjectOwned> {
        self.ledger.auction_operator().await.map_err(rpc_error)
    }

    async fn get_auction(&self, token_id: TokenId) -> Result<Option<Auction>, ErrorObjectOwned> {
        LedgerGateway::get_auction(&*self.ledger, token_id)
            .await
            .map_err(rpc_error)
    }

    async fn get_user_auctions(&self, user: Address) -> Result<Vec<Auction>, ErrorObjectOwned> {
        LedgerGateway::get_user_auctions(&*self.ledger, user)
            .await
            .map_err(rpc_error)
    }

    async fn get_all_active_auctions(&self) -> Result<Vec<Auction>, ErrorObjectOwned> {
        LedgerGateway::get_all_active_auctions(&*self.ledger)
            .await
            .map_err(rpc_error)
    }

    async fn create_auction(
        &self,
        params: CreateAuctionParams,
    ) -> Result<PendingTx, ErrorObjectOwned> {
        LedgerGateway::create_auction(
            &*self.ledger,
            params.from,
            params.token_id,
            params.starting_price,
            params.duration,
            params.value,
        )
        .await
        .map_err(rpc_error)
    }

    async fn place_bid(&self, params: PlaceBidParams) -> Result<PendingTx, ErrorObjectOwned> {
        LedgerGateway::place_bid(
            &*self.ledger,
            params.from,
            params.token_id,
            params.value,
            params.fee,
        )
        .await
        .map_err(rpc_error)
    }

    async fn cancel_auction(&self, params: TokenCallParams) -> Result<PendingTx, ErrorObjectOwned> {
        LedgerGateway::cancel_auction(&*self.ledger, params.from, params.token_id)
            .await
            .map_err(rpc_error)
    }

    async fn finalize_auction(
        &self,
        params: TokenCallParams,
    ) -> Result<PendingTx, ErrorObjectOwned> {
        LedgerGateway::finalize_expired_auction(&*self.ledger, params.from, params.token_id)
            .await
            .map_err(rpc_error)
    }

    async fn owner_of(&self, token_id: TokenId) -> Result<Option<Address>, ErrorObjectOwned> {
        LedgerGateway::owner_of(&*self.ledger, token_id)
            .await
            .map_err(rpc_error)
    }

    async fn token_uri(&self, token_id: TokenId) -> Result<Option<String>, ErrorObjectOwned> {
        LedgerGateway::token_uri(&*self.ledger, token_id)
            .await
            .map_err(rpc_error)
    }

    async fn approve(&self, params: ApproveParams) -> Result<PendingTx, ErrorObjectOwned> {
        LedgerGateway::approve(&*self.ledger, params.from, params.operator, params.token_id)
            .await
            .map_err(rpc_error)
    }

    async fn mint(&self, params: MintParams) -> Result<PendingTx, ErrorObjectOwned> {
        LedgerGateway::mint_with_metadata(
            &*self.ledger,
            params.from,
            params.to,
            params.token_id,
            &params.metadata_uri,
        )
        .await
        .map_err(rpc_error)
    }

    async fn get_user_transactions(
        &self,
        user: Address,
    ) -> Result<Vec<TransactionRecord>, ErrorObjectOwned> {
        LedgerGateway::get_user_transactions(&*self.ledger, user)
            .await
            .map_err(rpc_error)
    }

    async fn put_blob(&self, bytes_hex: String) -> Result<String, ErrorObjectOwned> {
        let bytes = hex::decode(bytes_hex)
            .map_err(|err| ErrorObjectOwned::owned(-32602, err.to_string(), None::<()>))?;
        self.ledger.store_blob(bytes).map_err(storage_error)
    }

    async fn put_json(&self, document: NftMetadata) -> Result<String, ErrorObjectOwned> {
        self.ledger.store_document(&document).map_err(storage_error)
    }

    async fn set_timestamp(&self, timestamp: u64) -> Result<bool, ErrorObjectOwned> {
        self.ledger.set_timestamp(timestamp);
        info!(timestamp, "ledger timestamp set");
        Ok(true)
    }

    async fn advance_time(&self, seconds: u64) -> Result<u64, ErrorObjectOwned> {
        Ok(self.ledger.advance_time(seconds))
    }
}

/// Bind and start the server; returns the bound address and the handle.
pub async fn serve(
    ledger: Arc<MockLedger>,
    addr: SocketAddr,
) -> anyhow::Result<(SocketAddr, ServerHandle)> {
    let server = Server::builder().build(addr).await?;
    let local_addr = server.local_addr()?;
    let handle = server.start(MarketServer::new(ledger).into_rpc());
    info!(%local_addr, "mock chain server running");
    Ok((local_addr, handle))
}
