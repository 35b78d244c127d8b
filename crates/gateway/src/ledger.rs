//! HTTP implementation of the ledger gateway boundary.

use async_trait::async_trait;
use jsonrpsee::core::client::{ClientT, Error as ClientError};
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;

use gavel_engine::gateway::{GatewayError, GatewayResult, LedgerGateway};
use gavel_types::rpc::{
    ApproveParams, CreateAuctionParams, MintParams, PlaceBidParams, TokenCallParams,
    EXECUTION_REVERTED_CODE, USER_REJECTED_CODE,
};
use gavel_types::{
    Address, Amount, Auction, AuctionTerms, FeeQuote, PendingTx, Receipt, TokenId,
    TransactionRecord,
};

/// Ledger gateway speaking the marketplace RPC protocol over HTTP.
pub struct RpcLedgerGateway {
    client: HttpClient,
}

impl RpcLedgerGateway {
    pub fn new(url: &str) -> GatewayResult<Self> {
        let client = HttpClientBuilder::default()
            .build(url)
            .map_err(|err| GatewayError::Transport(err.to_string()))?;
        Ok(Self { client })
    }
}

/// Map an RPC failure onto the gateway taxonomy. The signer's decline and
/// ledger reverts travel as call errors with well-known codes; everything
/// else is transport.
pub(crate) fn classify(err: ClientError) -> GatewayError {
    match err {
        ClientError::Call(object) => match object.code() {
            USER_REJECTED_CODE => GatewayError::UserRejected,
            EXECUTION_REVERTED_CODE => GatewayError::Reverted {
                reason: object
                    .message()
                    .strip_prefix("execution reverted: ")
                    .filter(|reason| *reason != "no reason given")
                    .map(str::to_string),
            },
            _ => GatewayError::Transport(object.to_string()),
        },
        other => GatewayError::Transport(other.to_string()),
    }
}

#[async_trait]
impl LedgerGateway for RpcLedgerGateway {
    async fn block_time(&self) -> GatewayResult<u64> {
        self.client
            .request("chain_blockTime", rpc_params![])
            .await
            .map_err(classify)
    }

    async fn auction_terms(&self) -> GatewayResult<AuctionTerms> {
        self.client
            .request("market_terms", rpc_params![])
            .await
            .map_err(classify)
    }

    async fn fee_quote(&self) -> GatewayResult<Option<FeeQuote>> {
        self.client
            .request("chain_feeQuote", rpc_params![])
            .await
            .map_err(classify)
    }

    async fn get_auction(&self, token_id: TokenId) -> GatewayResult<Option<Auction>> {
        self.client
            .request("market_getAuction", rpc_params![token_id])
            .await
            .map_err(classify)
    }

    async fn get_user_auctions(&self, user: Address) -> GatewayResult<Vec<Auction>> {
        self.client
            .request("market_getUserAuctions", rpc_params![user])
            .await
            .map_err(classify)
    }

    async fn get_all_active_auctions(&self) -> GatewayResult<Vec<Auction>> {
        self.client
            .request("market_getAllActiveAuctions", rpc_params![])
            .await
            .map_err(classify)
    }

    async fn owner_of(&self, token_id: TokenId) -> GatewayResult<Option<Address>> {
        self.client
            .request("nft_ownerOf", rpc_params![token_id])
            .await
            .map_err(classify)
    }

    async fn token_uri(&self, token_id: TokenId) -> GatewayResult<Option<String>> {
        self.client
            .request("nft_tokenUri", rpc_params![token_id])
            .await
            .map_err(classify)
    }

    async fn get_user_transactions(&self, user: Address) -> GatewayResult<Vec<TransactionRecord>> {
        self.client
            .request("records_getUserTransactions", rpc_params![user])
            .await
            .map_err(classify)
    }

    async fn auction_operator(&self) -> GatewayResult<Address> {
        self.client
            .request("market_operator", rpc_params![])
            .await
            .map_err(classify)
    }

    async fn approve(
        &self,
        from: Address,
        operator: Address,
        token_id: TokenId,
    ) -> GatewayResult<PendingTx> {
        let params = ApproveParams {
            from,
            operator,
            token_id,
        };
        self.client
            .request("nft_approve", rpc_params![params])
            .await
            .map_err(classify)
    }

    async fn create_auction(
        &self,
        from: Address,
        token_id: TokenId,
        starting_price: Amount,
        duration: u64,
        value: Amount,
    ) -> GatewayResult<PendingTx> {
        let params = CreateAuctionParams {
            from,
            token_id,
            starting_price,
            duration,
            value,
        };
        self.client
            .request("market_createAuction", rpc_params![params])
            .await
            .map_err(classify)
    }

    async fn place_bid(
        &self,
        from: Address,
        token_id: TokenId,
        value: Amount,
        fee: Option<FeeQuote>,
    ) -> GatewayResult<PendingTx> {
        let params = PlaceBidParams {
            from,
            token_id,
            value,
            fee,
        };
        self.client
            .request("market_placeBid", rpc_params![params])
            .await
            .map_err(classify)
    }

    async fn cancel_auction(&self, from: Address, token_id: TokenId) -> GatewayResult<PendingTx> {
        let params = TokenCallParams { from, token_id };
        self.client
            .request("market_cancelAuction", rpc_params![params])
            .await
            .map_err(classify)
    }

    async fn finalize_expired_auction(
        &self,
        from: Address,
        token_id: TokenId,
    ) -> GatewayResult<PendingTx> {
        let params = TokenCallParams { from, token_id };
        self.client
            .request("market_finalizeAuction", rpc_params![params])
            .await
            .map_err(classify)
    }

    async fn mint_with_metadata(
        &self,
        from: Address,
        to: Address,
        token_id: TokenId,
        metadata_uri: &str,
    ) -> GatewayResult<PendingTx> {
        let params = MintParams {
            from,
            to,
            token_id,
            metadata_uri: metadata_uri.to_string(),
        };
        self.client
            .request("nft_mint", rpc_params![params])
            .await
            .map_err(classify)
    }

    async fn await_receipt(&self, pending: PendingTx) -> GatewayResult<Receipt> {
        self.client
            .request("chain_awaitReceipt", rpc_params![pending.0])
            .await
            .map_err(classify)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use gavel_mock_chain::server::serve;
    use gavel_mock_chain::MockLedger;
    use gavel_types::WEI_PER_TOKEN;

    fn addr(byte: u8) -> Address {
        Address([byte; 20])
    }

    fn token() -> TokenId {
        TokenId([3u8; 32])
    }

    async fn gateway_over(ledger: Arc<MockLedger>) -> RpcLedgerGateway {
        let (local_addr, handle) = serve(ledger, "127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        // The handle keeps the server alive for the test's lifetime.
        std::mem::forget(handle);
        RpcLedgerGateway::new(&format!("http://{local_addr}")).unwrap()
    }

    #[tokio::test]
    async fn test_lifecycle_over_http() {
        let ledger = Arc::new(MockLedger::new());
        let gateway = gateway_over(ledger.clone()).await;
        let seller = addr(1);
        let bidder = addr(2);

        let terms = gateway.auction_terms().await.unwrap();
        let operator = gateway.auction_operator().await.unwrap();

        let pending = gateway
            .mint_with_metadata(seller, seller, token(), "mock://meta")
            .await
            .unwrap();
        assert!(gateway.await_receipt(pending).await.unwrap().success);
        assert_eq!(gateway.owner_of(token()).await.unwrap(), Some(seller));
        assert_eq!(
            gateway.token_uri(token()).await.unwrap().as_deref(),
            Some("mock://meta")
        );

        let pending = gateway.approve(seller, operator, token()).await.unwrap();
        assert!(gateway.await_receipt(pending).await.unwrap().success);

        let pending = gateway
            .create_auction(seller, token(), WEI_PER_TOKEN, 3_600, terms.creation_fee)
            .await
            .unwrap();
        assert!(gateway.await_receipt(pending).await.unwrap().success);
        assert_eq!(gateway.get_all_active_auctions().await.unwrap().len(), 1);

        let quote = gateway.fee_quote().await.unwrap();
        let pending = gateway
            .place_bid(bidder, token(), 2 * WEI_PER_TOKEN, quote)
            .await
            .unwrap();
        assert!(gateway.await_receipt(pending).await.unwrap().success);

        ledger.advance_time(3_600);
        let pending = gateway
            .finalize_expired_auction(seller, token())
            .await
            .unwrap();
        assert!(gateway.await_receipt(pending).await.unwrap().success);
        assert_eq!(gateway.owner_of(token()).await.unwrap(), Some(bidder));

        let records = gateway.get_user_transactions(bidder).await.unwrap();
        assert!(!records.is_empty());
    }

    #[tokio::test]
    async fn test_user_rejection_crosses_the_wire() {
        let ledger = Arc::new(MockLedger::new());
        let gateway = gateway_over(ledger.clone()).await;

        ledger.reject_next_signature();
        let err = gateway
            .mint_with_metadata(addr(1), addr(1), token(), "mock://m")
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::UserRejected);
    }

    #[tokio::test]
    async fn test_reads_round_trip_wei_scale_amounts() {
        let ledger = Arc::new(MockLedger::new());
        let seller = addr(1);
        {
            let mut state = ledger.state().write();
            let operator = state.operator();
            let fee = state.terms().creation_fee;
            state.mint_with_metadata(seller, seller, token(), "m".to_string());
            state.approve(seller, operator, token());
            state.create_auction(seller, token(), 7 * WEI_PER_TOKEN, 3_600, fee);
        }
        let gateway = gateway_over(ledger).await;

        let auction = gateway.get_auction(token()).await.unwrap().unwrap();
        assert_eq!(auction.starting_price, 7 * WEI_PER_TOKEN);
        assert_eq!(gateway.get_user_auctions(seller).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport() {
        // Nothing listens here.
        let gateway = RpcLedgerGateway::new("http://127.0.0.1:1").unwrap();
        let err = gateway.block_time().await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));
    }
}
