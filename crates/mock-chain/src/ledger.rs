//! Contract emulation.
//!
//! In-memory state management for the NFT, auction and activity-record
//! contracts, without requiring a real blockchain. Every write executes a
//! rule set mirroring the deployed contracts and always produces a receipt;
//! rule violations become failed receipts carrying the revert reason, the
//! way the real ledger reports them.

use std::collections::HashMap;

use gavel_engine::valuation;
use gavel_types::{
    Address, Amount, Auction, AuctionTerms, FeeQuote, PendingTx, Receipt, TokenId,
    TransactionKind, TransactionRecord, TxHash,
};

/// Shared ledger state.
pub struct LedgerState {
    timestamp: u64,
    gas_price: Amount,
    terms: AuctionTerms,
    /// Address of the auction contract; must hold transfer approval before
    /// an auction can be created.
    operator: Address,
    next_tx: u64,
    owners: HashMap<TokenId, Address>,
    token_uris: HashMap<TokenId, String>,
    approvals: HashMap<TokenId, Address>,
    /// Latest auction per token.
    auctions: HashMap<TokenId, Auction>,
    records: Vec<TransactionRecord>,
    receipts: HashMap<TxHash, Receipt>,
    fail_next: Option<String>,
}

impl LedgerState {
    pub fn new(operator: Address, terms: AuctionTerms) -> Self {
        Self {
            timestamp: 0,
            gas_price: 1_000_000_000,
            terms,
            operator,
            next_tx: 0,
            owners: HashMap::new(),
            token_uris: HashMap::new(),
            approvals: HashMap::new(),
            auctions: HashMap::new(),
            records: Vec::new(),
            receipts: HashMap::new(),
            fail_next: None,
        }
    }

    // ============ Clock & admin ============

    pub fn now(&self) -> u64 {
        self.timestamp
    }

    pub fn set_timestamp(&mut self, timestamp: u64) {
        self.timestamp = timestamp;
    }

    pub fn advance_time(&mut self, seconds: u64) -> u64 {
        self.timestamp += seconds;
        self.timestamp
    }

    /// Make the next write revert with the given reason, whatever it is.
    pub fn fail_next_write(&mut self, reason: impl Into<String>) {
        self.fail_next = Some(reason.into());
    }

    // ============ Reads ============

    pub fn terms(&self) -> AuctionTerms {
        self.terms
    }

    pub fn operator(&self) -> Address {
        self.operator
    }

    pub fn fee_quote(&self) -> FeeQuote {
        FeeQuote {
            gas_price: self.gas_price,
        }
    }

    pub fn get_auction(&self, token_id: TokenId) -> Option<Auction> {
        self.auctions.get(&token_id).cloned()
    }

    pub fn get_user_auctions(&self, user: Address) -> Vec<Auction> {
        self.auctions
            .values()
            .filter(|a| a.seller == user)
            .cloned()
            .collect()
    }

    pub fn get_all_active_auctions(&self) -> Vec<Auction> {
        self.auctions.values().filter(|a| a.active).cloned().collect()
    }

    pub fn owner_of(&self, token_id: TokenId) -> Option<Address> {
        self.owners.get(&token_id).copied()
    }

    pub fn token_uri(&self, token_id: TokenId) -> Option<String> {
        self.token_uris.get(&token_id).cloned()
    }

    pub fn get_user_transactions(&self, user: Address) -> Vec<TransactionRecord> {
        self.records
            .iter()
            .filter(|r| r.from == user || r.to == user)
            .cloned()
            .collect()
    }

    pub fn receipt(&self, tx_hash: TxHash) -> Option<Receipt> {
        self.receipts.get(&tx_hash).cloned()
    }

    // ============ Writes ============

    pub fn mint_with_metadata(
        &mut self,
        from: Address,
        to: Address,
        token_id: TokenId,
        metadata_uri: String,
    ) -> PendingTx {
        self.execute(
            Some(TransactionKind::Mint),
            from,
            to,
            token_id,
            0,
            90_000,
            self.gas_price,
            |state| {
                if state.owners.contains_key(&token_id) {
                    return Err("token already minted".to_string());
                }
                state.owners.insert(token_id, to);
                state.token_uris.insert(token_id, metadata_uri);
                Ok(())
            },
        )
    }

    pub fn approve(&mut self, from: Address, operator: Address, token_id: TokenId) -> PendingTx {
        // Approvals are not part of the activity log.
        self.execute(None, from, operator, token_id, 0, 46_000, self.gas_price, |state| {
            if state.owners.get(&token_id) != Some(&from) {
                return Err("caller is not the token owner".to_string());
            }
            state.approvals.insert(token_id, operator);
            Ok(())
        })
    }

    pub fn create_auction(
        &mut self,
        from: Address,
        token_id: TokenId,
        starting_price: Amount,
        duration: u64,
        value: Amount,
    ) -> PendingTx {
        self.execute(
            Some(TransactionKind::CreateAuction),
            from,
            from,
            token_id,
            starting_price,
            120_000,
            self.gas_price,
            |state| {
                if state.owners.get(&token_id) != Some(&from) {
                    return Err("caller is not the token owner".to_string());
                }
                if state.approvals.get(&token_id) != Some(&state.operator) {
                    return Err("auction contract is not approved for this token".to_string());
                }
                if state.auctions.get(&token_id).map(|a| a.active).unwrap_or(false) {
                    return Err("auction already active for this token".to_string());
                }
                if starting_price == 0 {
                    return Err("starting price must be positive".to_string());
                }
                if duration < state.terms.min_auction_duration
                    || duration > state.terms.max_auction_duration
                {
                    return Err("duration outside allowed bounds".to_string());
                }
                if value < state.terms.creation_fee {
                    return Err("creation fee not paid".to_string());
                }
                let auction = Auction {
                    token_id,
                    seller: from,
                    starting_price,
                    highest_bid: 0,
                    highest_bidder: Address::ZERO,
                    start_time: state.timestamp,
                    duration,
                    active: true,
                };
                state.auctions.insert(token_id, auction);
                Ok(())
            },
        )
    }

    pub fn place_bid(
        &mut self,
        from: Address,
        token_id: TokenId,
        value: Amount,
        fee: Option<FeeQuote>,
    ) -> PendingTx {
        let gas_price = fee.map(|f| f.gas_price).unwrap_or(self.gas_price);
        let to = self
            .auctions
            .get(&token_id)
            .map(|a| a.seller)
            .unwrap_or(Address::ZERO);
        self.execute(
            Some(TransactionKind::Bid),
            from,
            to,
            token_id,
            value,
            85_000,
            gas_price,
            |state| {
                let now = state.timestamp;
                let auction = state
                    .auctions
                    .get_mut(&token_id)
                    .filter(|a| a.active)
                    .ok_or_else(|| "no active auction for this token".to_string())?;
                if now >= auction.end_time() {
                    return Err("auction has ended".to_string());
                }
                if auction.seller == from {
                    return Err("seller cannot bid".to_string());
                }
                if value < valuation::minimum_next_bid(auction) {
                    return Err("bid below minimum".to_string());
                }
                auction.highest_bid = value;
                auction.highest_bidder = from;
                Ok(())
            },
        )
    }

    pub fn cancel_auction(&mut self, from: Address, token_id: TokenId) -> PendingTx {
        self.execute(
            Some(TransactionKind::CancelAuction),
            from,
            from,
            token_id,
            0,
            40_000,
            self.gas_price,
            |state| {
                let now = state.timestamp;
                let auction = state
                    .auctions
                    .get_mut(&token_id)
                    .filter(|a| a.active)
                    .ok_or_else(|| "no active auction for this token".to_string())?;
                if auction.seller != from {
                    return Err("only the seller may cancel".to_string());
                }
                if now >= auction.end_time() {
                    return Err("auction has already ended".to_string());
                }
                if auction.highest_bid > 0 {
                    return Err("cannot cancel: a bid has been placed".to_string());
                }
                auction.active = false;
                state.approvals.remove(&token_id);
                Ok(())
            },
        )
    }

    /// Settle an ended auction: either return the asset to the seller (no
    /// bids) or transfer it to the highest bidder and pay out the seller
    /// minus the marketplace cut. One entry point for both branches.
    pub fn finalize_expired_auction(&mut self, from: Address, token_id: TokenId) -> PendingTx {
        let (to, value) = self
            .auctions
            .get(&token_id)
            .map(|a| {
                if a.highest_bid > 0 {
                    (a.highest_bidder, a.highest_bid)
                } else {
                    (a.seller, 0)
                }
            })
            .unwrap_or((Address::ZERO, 0));
        self.execute(
            Some(TransactionKind::EndAuction),
            from,
            to,
            token_id,
            value,
            110_000,
            self.gas_price,
            |state| {
                let now = state.timestamp;
                let timestamp = state.timestamp;
                let auction = state
                    .auctions
                    .get_mut(&token_id)
                    .filter(|a| a.active)
                    .ok_or_else(|| "no active auction for this token".to_string())?;
                if now < auction.end_time() {
                    return Err("auction has not ended yet".to_string());
                }
                auction.active = false;
                let seller = auction.seller;
                let highest_bid = auction.highest_bid;
                let highest_bidder = auction.highest_bidder;
                state.approvals.remove(&token_id);
                if highest_bid > 0 {
                    state.owners.insert(token_id, highest_bidder);
                    state.records.push(TransactionRecord {
                        timestamp,
                        kind: TransactionKind::Transfer,
                        token_id,
                        value: 0,
                        from: seller,
                        to: highest_bidder,
                        success: true,
                    });
                }
                Ok(())
            },
        )
    }

    // ============ Internals ============

    #[allow(clippy::too_many_arguments)]
    fn execute<F>(
        &mut self,
        kind: Option<TransactionKind>,
        from: Address,
        to: Address,
        token_id: TokenId,
        value: Amount,
        gas_used: u64,
        gas_price: Amount,
        rule: F,
    ) -> PendingTx
    where
        F: FnOnce(&mut Self) -> Result<(), String>,
    {
        let tx_hash = self.allocate_tx_hash();
        let outcome = match self.fail_next.take() {
            Some(reason) => Err(reason),
            None => rule(self),
        };
        let success = outcome.is_ok();
        if let Some(kind) = kind {
            self.records.push(TransactionRecord {
                timestamp: self.timestamp,
                kind,
                token_id,
                value,
                from,
                to,
                success,
            });
        }
        self.receipts.insert(
            tx_hash,
            Receipt {
                tx_hash,
                success,
                gas_used,
                effective_gas_price: gas_price,
                revert_reason: outcome.err(),
            },
        );
        PendingTx(tx_hash)
    }

    fn allocate_tx_hash(&mut self) -> TxHash {
        use sha2::{Digest, Sha256};
        self.next_tx += 1;
        let mut hasher = Sha256::new();
        hasher.update(b"GAVEL_MOCK_TX:");
        hasher.update(self.next_tx.to_le_bytes());
        TxHash(hasher.finalize().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gavel_types::WEI_PER_TOKEN;

    fn addr(byte: u8) -> Address {
        Address([byte; 20])
    }

    fn token() -> TokenId {
        TokenId([5u8; 32])
    }

    fn terms() -> AuctionTerms {
        AuctionTerms {
            creation_fee: WEI_PER_TOKEN / 10,
            bid_fee: 0,
            finalize_percentage: 250,
            min_auction_duration: 60,
            max_auction_duration: 604_800,
        }
    }

    fn ledger() -> LedgerState {
        LedgerState::new(addr(0xAA), terms())
    }

    fn receipt_of(state: &LedgerState, pending: PendingTx) -> Receipt {
        state.receipt(pending.0).unwrap()
    }

    /// Mint, approve and list one token for `seller`.
    fn listed(state: &mut LedgerState, seller: Address) {
        state.mint_with_metadata(seller, seller, token(), "mock://meta".to_string());
        state.approve(seller, state.operator(), token());
        let pending = state.create_auction(
            seller,
            token(),
            WEI_PER_TOKEN,
            3_600,
            terms().creation_fee,
        );
        assert!(receipt_of(state, pending).success);
    }

    #[test]
    fn test_mint_and_read_back() {
        let mut state = ledger();
        let pending = state.mint_with_metadata(addr(1), addr(1), token(), "mock://m".to_string());

        assert!(receipt_of(&state, pending).success);
        assert_eq!(state.owner_of(token()), Some(addr(1)));
        assert_eq!(state.token_uri(token()), Some("mock://m".to_string()));
    }

    #[test]
    fn test_double_mint_reverts() {
        let mut state = ledger();
        state.mint_with_metadata(addr(1), addr(1), token(), "a".to_string());
        let pending = state.mint_with_metadata(addr(2), addr(2), token(), "b".to_string());

        let receipt = receipt_of(&state, pending);
        assert!(!receipt.success);
        assert_eq!(receipt.revert_reason.as_deref(), Some("token already minted"));
        assert_eq!(state.owner_of(token()), Some(addr(1)));
    }

    #[test]
    fn test_create_requires_approval_and_fee() {
        let mut state = ledger();
        state.mint_with_metadata(addr(1), addr(1), token(), "m".to_string());

        let pending = state.create_auction(addr(1), token(), WEI_PER_TOKEN, 3_600, terms().creation_fee);
        let receipt = receipt_of(&state, pending);
        assert!(!receipt.success);
        assert!(receipt.revert_reason.unwrap().contains("not approved"));

        state.approve(addr(1), state.operator(), token());
        let pending = state.create_auction(addr(1), token(), WEI_PER_TOKEN, 3_600, 0);
        assert_eq!(
            receipt_of(&state, pending).revert_reason.as_deref(),
            Some("creation fee not paid")
        );

        let pending = state.create_auction(addr(1), token(), WEI_PER_TOKEN, 3_600, terms().creation_fee);
        assert!(receipt_of(&state, pending).success);
        assert_eq!(state.get_all_active_auctions().len(), 1);
    }

    #[test]
    fn test_create_enforces_duration_bounds() {
        let mut state = ledger();
        state.mint_with_metadata(addr(1), addr(1), token(), "m".to_string());
        state.approve(addr(1), state.operator(), token());

        let pending = state.create_auction(addr(1), token(), WEI_PER_TOKEN, 10, terms().creation_fee);
        assert!(!receipt_of(&state, pending).success);
    }

    #[test]
    fn test_bid_enforces_minimum_increment() {
        let mut state = ledger();
        listed(&mut state, addr(1));

        // First bid must reach the starting price.
        let pending = state.place_bid(addr(2), token(), WEI_PER_TOKEN - 1, None);
        assert_eq!(
            receipt_of(&state, pending).revert_reason.as_deref(),
            Some("bid below minimum")
        );

        let pending = state.place_bid(addr(2), token(), WEI_PER_TOKEN, None);
        assert!(receipt_of(&state, pending).success);

        // The next bid needs a 5% bump.
        let pending = state.place_bid(addr(3), token(), WEI_PER_TOKEN + 1, None);
        assert!(!receipt_of(&state, pending).success);

        let minimum = WEI_PER_TOKEN + WEI_PER_TOKEN / 20;
        let pending = state.place_bid(addr(3), token(), minimum, None);
        assert!(receipt_of(&state, pending).success);

        let auction = state.get_auction(token()).unwrap();
        assert_eq!(auction.highest_bid, minimum);
        assert_eq!(auction.highest_bidder, addr(3));
    }

    #[test]
    fn test_seller_cannot_bid() {
        let mut state = ledger();
        listed(&mut state, addr(1));

        let pending = state.place_bid(addr(1), token(), WEI_PER_TOKEN, None);
        assert_eq!(
            receipt_of(&state, pending).revert_reason.as_deref(),
            Some("seller cannot bid")
        );
    }

    #[test]
    fn test_bid_after_end_reverts() {
        let mut state = ledger();
        listed(&mut state, addr(1));
        state.advance_time(3_600);

        let pending = state.place_bid(addr(2), token(), WEI_PER_TOKEN, None);
        assert_eq!(
            receipt_of(&state, pending).revert_reason.as_deref(),
            Some("auction has ended")
        );
    }

    #[test]
    fn test_cancel_only_before_first_bid() {
        let mut state = ledger();
        listed(&mut state, addr(1));

        let pending = state.cancel_auction(addr(2), token());
        assert_eq!(
            receipt_of(&state, pending).revert_reason.as_deref(),
            Some("only the seller may cancel")
        );

        state.place_bid(addr(2), token(), WEI_PER_TOKEN, None);
        let pending = state.cancel_auction(addr(1), token());
        assert_eq!(
            receipt_of(&state, pending).revert_reason.as_deref(),
            Some("cannot cancel: a bid has been placed")
        );
    }

    #[test]
    fn test_cancel_deactivates_the_auction() {
        let mut state = ledger();
        listed(&mut state, addr(1));

        let pending = state.cancel_auction(addr(1), token());
        assert!(receipt_of(&state, pending).success);
        assert!(!state.get_auction(token()).unwrap().active);
        assert!(state.get_all_active_auctions().is_empty());
        assert_eq!(state.owner_of(token()), Some(addr(1)));
    }

    #[test]
    fn test_finalize_unsold_returns_asset_to_seller() {
        let mut state = ledger();
        listed(&mut state, addr(1));
        state.advance_time(3_600);

        let pending = state.finalize_expired_auction(addr(1), token());
        assert!(receipt_of(&state, pending).success);
        assert!(!state.get_auction(token()).unwrap().active);
        assert_eq!(state.owner_of(token()), Some(addr(1)));
    }

    #[test]
    fn test_finalize_sold_transfers_to_winner() {
        let mut state = ledger();
        listed(&mut state, addr(1));
        state.place_bid(addr(2), token(), 2 * WEI_PER_TOKEN, None);
        state.advance_time(3_600);

        let pending = state.finalize_expired_auction(addr(1), token());
        assert!(receipt_of(&state, pending).success);
        assert_eq!(state.owner_of(token()), Some(addr(2)));

        // The winner's side of the settlement shows up in their activity.
        let kinds: Vec<TransactionKind> = state
            .get_user_transactions(addr(2))
            .iter()
            .map(|r| r.kind)
            .collect();
        assert!(kinds.contains(&TransactionKind::Transfer));
        assert!(kinds.contains(&TransactionKind::EndAuction));
    }

    #[test]
    fn test_finalize_before_end_reverts() {
        let mut state = ledger();
        listed(&mut state, addr(1));

        let pending = state.finalize_expired_auction(addr(1), token());
        assert_eq!(
            receipt_of(&state, pending).revert_reason.as_deref(),
            Some("auction has not ended yet")
        );
    }

    #[test]
    fn test_records_carry_the_success_flag() {
        let mut state = ledger();
        listed(&mut state, addr(1));

        state.place_bid(addr(2), token(), 1, None); // below minimum
        state.place_bid(addr(2), token(), WEI_PER_TOKEN, None);

        let bids: Vec<bool> = state
            .get_user_transactions(addr(2))
            .iter()
            .filter(|r| r.kind == TransactionKind::Bid)
            .map(|r| r.success)
            .collect();
        assert_eq!(bids, vec![false, true]);
    }

    #[test]
    fn test_fee_quote_overrides_gas_price() {
        let mut state = ledger();
        listed(&mut state, addr(1));

        let pending = state.place_bid(
            addr(2),
            token(),
            WEI_PER_TOKEN,
            Some(FeeQuote { gas_price: 42 }),
        );
        assert_eq!(receipt_of(&state, pending).effective_gas_price, 42);
    }

    #[test]
    fn test_injected_failure_reverts_next_write() {
        let mut state = ledger();
        state.fail_next_write("out of gas");

        let pending = state.mint_with_metadata(addr(1), addr(1), token(), "m".to_string());
        let receipt = receipt_of(&state, pending);
        assert!(!receipt.success);
        assert_eq!(receipt.revert_reason.as_deref(), Some("out of gas"));
        assert_eq!(state.owner_of(token()), None);
    }
}
