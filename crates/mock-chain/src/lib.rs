//! Mock ledger for local development and testing of the gavel client.
//!
//! The same in-memory contract emulation is exposed two ways: in-process as
//! [`MockLedger`], which implements the engine's gateway traits directly,
//! and over JSON-RPC through the `gavel-mock-chain` server binary, speaking
//! the method set the RPC gateway consumes.

pub mod ledger;
pub mod server;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use gavel_engine::gateway::{
    GatewayError, GatewayResult, LedgerGateway, MetadataStore, StorageError,
};
use gavel_types::{
    Address, Amount, Auction, AuctionTerms, FeeQuote, NftMetadata, PendingTx, Receipt, TokenId,
    TransactionRecord, WEI_PER_TOKEN,
};

pub use ledger::LedgerState;

/// In-process mock ledger plus a content-addressed metadata store.
pub struct MockLedger {
    state: RwLock<LedgerState>,
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    documents: Mutex<HashMap<String, NftMetadata>>,
    storage_online: AtomicBool,
    reject_next_signature: AtomicBool,
}

impl MockLedger {
    pub fn new() -> Self {
        let operator: Address = Address([0xAA; 20]);
        Self::with_terms(
            operator,
            AuctionTerms {
                creation_fee: WEI_PER_TOKEN / 10,
                bid_fee: 0,
                finalize_percentage: 250,
                min_auction_duration: 60,
                max_auction_duration: 604_800,
            },
        )
    }

    pub fn with_terms(operator: Address, terms: AuctionTerms) -> Self {
        Self {
            state: RwLock::new(LedgerState::new(operator, terms)),
            blobs: Mutex::new(HashMap::new()),
            documents: Mutex::new(HashMap::new()),
            storage_online: AtomicBool::new(true),
            reject_next_signature: AtomicBool::new(false),
        }
    }

    // ============ Test & admin controls ============

    pub fn set_timestamp(&self, timestamp: u64) {
        self.state.write().set_timestamp(timestamp);
    }

    pub fn advance_time(&self, seconds: u64) -> u64 {
        self.state.write().advance_time(seconds)
    }

    /// Make the next write revert, whatever it is.
    pub fn fail_next_write(&self, reason: impl Into<String>) {
        self.state.write().fail_next_write(reason);
    }

    /// Make the signer decline the next write.
    pub fn reject_next_signature(&self) {
        self.reject_next_signature.store(true, Ordering::SeqCst);
    }

    /// Take the metadata store offline (or back online).
    pub fn set_storage_online(&self, online: bool) {
        self.storage_online.store(online, Ordering::SeqCst);
    }

    /// Direct state access for server wiring and test setup.
    pub fn state(&self) -> &RwLock<LedgerState> {
        &self.state
    }

    fn check_signature(&self) -> GatewayResult<()> {
        if self.reject_next_signature.swap(false, Ordering::SeqCst) {
            return Err(GatewayError::UserRejected);
        }
        Ok(())
    }

    fn locator_for(bytes: &[u8]) -> String {
        use sha2::{Digest, Sha256};
        let digest = Sha256::digest(bytes);
        format!("mock://{}", hex::encode(&digest[..16]))
    }

    /// Store a blob directly (the server's storage endpoint).
    pub fn store_blob(&self, bytes: Vec<u8>) -> Result<String, StorageError> {
        if !self.storage_online.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("metadata store offline".to_string()));
        }
        let locator = Self::locator_for(&bytes);
        self.blobs.lock().insert(locator.clone(), bytes);
        Ok(locator)
    }

    /// Store a metadata document directly (the server's storage endpoint).
    pub fn store_document(&self, document: &NftMetadata) -> Result<String, StorageError> {
        if !self.storage_online.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("metadata store offline".to_string()));
        }
        let bytes = serde_json::to_vec(document)
            .map_err(|err| StorageError::Unavailable(err.to_string()))?;
        let locator = Self::locator_for(&bytes);
        self.documents.lock().insert(locator.clone(), document.clone());
        Ok(locator)
    }

    /// Fetch a stored document back (test helper).
    pub fn document(&self, locator: &str) -> Option<NftMetadata> {
        self.documents.lock().get(locator).cloned()
    }
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerGateway for MockLedger {
    async fn block_time(&self) -> GatewayResult<u64> {
        Ok(self.state.read().now())
    }

    async fn auction_terms(&self) -> GatewayResult<AuctionTerms> {
        Ok(self.state.read().terms())
    }

    async fn fee_quote(&self) -> GatewayResult<Option<FeeQuote>> {
        Ok(Some(self.state.read().fee_quote()))
    }

    async fn get_auction(&self, token_id: TokenId) -> GatewayResult<Option<Auction>> {
        Ok(self.state.read().get_auction(token_id))
    }

    async fn get_user_auctions(&self, user: Address) -> GatewayResult<Vec<Auction>> {
        Ok(self.state.read().get_user_auctions(user))
    }

    async fn get_all_active_auctions(&self) -> GatewayResult<Vec<Auction>> {
        Ok(self.state.read().get_all_active_auctions())
    }

    async fn owner_of(&self, token_id: TokenId) -> GatewayResult<Option<Address>> {
        Ok(self.state.read().owner_of(token_id))
    }

    async fn token_uri(&self, token_id: TokenId) -> GatewayResult<Option<String>> {
        Ok(self.state.read().token_uri(token_id))
    }

    async fn get_user_transactions(&self, user: Address) -> GatewayResult<Vec<TransactionRecord>> {
        Ok(self.state.read().get_user_transactions(user))
    }

    async fn auction_operator(&self) -> GatewayResult<Address> {
        Ok(self.state.read().operator())
    }

    async fn approve(
        &self,
        from: Address,
        operator: Address,
        token_id: TokenId,
    ) -> GatewayResult<PendingTx> {
        self.check_signature()?;
        Ok(self.state.write().approve(from, operator, token_id))
    }

    async fn create_auction(
        &self,
        from: Address,
        token_id: TokenId,
        starting_price: Amount,
        duration: u64,
        value: Amount,
    ) -> GatewayResult<PendingTx> {
        self.check_signature()?;
        Ok(self
            .state
            .write()
            .create_auction(from, token_id, starting_price, duration, value))
    }

    async fn place_bid(
        &self,
        from: Address,
        token_id: TokenId,
        value: Amount,
        fee: Option<FeeQuote>,
    ) -> GatewayResult<PendingTx> {
        self.check_signature()?;
        Ok(self.state.write().place_bid(from, token_id, value, fee))
    }

    async fn cancel_auction(&self, from: Address, token_id: TokenId) -> GatewayResult<PendingTx> {
        self.check_signature()?;
        Ok(self.state.write().cancel_auction(from, token_id))
    }

    async fn finalize_expired_auction(
        &self,
        from: Address,
        token_id: TokenId,
    ) -> GatewayResult<PendingTx> {
        self.check_signature()?;
        Ok(self.state.write().finalize_expired_auction(from, token_id))
    }

    async fn mint_with_metadata(
        &self,
        from: Address,
        to: Address,
        token_id: TokenId,
        metadata_uri: &str,
    ) -> GatewayResult<PendingTx> {
        self.check_signature()?;
        Ok(self
            .state
            .write()
            .mint_with_metadata(from, to, token_id, metadata_uri.to_string()))
    }

    async fn await_receipt(&self, pending: PendingTx) -> GatewayResult<Receipt> {
        self.state
            .read()
            .receipt(pending.0)
            .ok_or_else(|| GatewayError::Transport("unknown transaction".to_string()))
    }
}

#[async_trait]
impl MetadataStore for MockLedger {
    async fn put_blob(&self, bytes: Vec<u8>) -> Result<String, StorageError> {
        self.store_blob(bytes)
    }

    async fn put_json(&self, document: &NftMetadata) -> Result<String, StorageError> {
        self.store_document(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_gateway_round_trip() {
        let ledger = MockLedger::new();
        let seller = Address([1u8; 20]);
        let token = TokenId([2u8; 32]);

        let pending = ledger
            .mint_with_metadata(seller, seller, token, "mock://m")
            .await
            .unwrap();
        let receipt = ledger.await_receipt(pending).await.unwrap();
        assert!(receipt.success);
        assert_eq!(ledger.owner_of(token).await.unwrap(), Some(seller));
    }

    #[tokio::test]
    async fn test_signature_rejection_is_one_shot() {
        let ledger = MockLedger::new();
        let seller = Address([1u8; 20]);
        let token = TokenId([2u8; 32]);

        ledger.reject_next_signature();
        let err = ledger
            .mint_with_metadata(seller, seller, token, "mock://m")
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::UserRejected);

        // The next attempt goes through.
        ledger
            .mint_with_metadata(seller, seller, token, "mock://m")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_storage_can_go_offline() {
        let ledger = MockLedger::new();

        let locator = ledger.put_blob(vec![1, 2, 3]).await.unwrap();
        assert!(locator.starts_with("mock://"));

        ledger.set_storage_online(false);
        assert!(ledger.put_blob(vec![4]).await.is_err());
    }

    #[tokio::test]
    async fn test_identical_content_gets_identical_locator() {
        let ledger = MockLedger::new();
        let a = ledger.put_blob(vec![1, 2, 3]).await.unwrap();
        let b = ledger.put_blob(vec![1, 2, 3]).await.unwrap();
        assert_eq!(a, b);
    }
}
