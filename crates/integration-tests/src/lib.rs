//! End-to-end integration tests for the gavel marketplace client.
//!
//! These tests exercise the full client stack — session machine, valuation
//! engine, lifecycle coordinator — against the in-process mock ledger, and
//! once against the JSON-RPC server through the HTTP gateway:
//! 1. Mint an asset
//! 2. Approve and create an auction
//! 3. Bid, with local validation ahead of every submission
//! 4. Let the window close
//! 5. Finalize and verify settlement

use std::sync::Arc;

use gavel_engine::gateway::LedgerGateway;
use gavel_engine::valuation;
use gavel_engine::{Coordinator, ValidationError, WorkflowError};
use gavel_gateway::{RpcLedgerGateway, RpcMetadataStore};
use gavel_mock_chain::server::serve;
use gavel_mock_chain::MockLedger;
use gavel_session::{
    MemorySessionStore, SessionManager, StaticWallet, WalletEvent,
};
use gavel_types::{
    Address, AuctionStatus, BidIntent, NetworkDescriptor, TokenId, TransactionKind,
    WEI_PER_TOKEN,
};

const CHAIN: u64 = 50312;

fn addr(byte: u8) -> Address {
    Address([byte; 20])
}

fn network() -> NetworkDescriptor {
    NetworkDescriptor {
        chain_id: CHAIN,
        name: "Somnia Testnet".to_string(),
        currency_symbol: "STT".to_string(),
        currency_decimals: 18,
        rpc_url: "https://dream-rpc.somnia.network".to_string(),
        explorer_url: "https://shannon-explorer.somnia.network".to_string(),
    }
}

async fn session_for(account: Address) -> Arc<SessionManager> {
    let wallet = StaticWallet::new(account, CHAIN, 100 * WEI_PER_TOKEN);
    let session = Arc::new(SessionManager::new(
        Arc::new(wallet),
        Arc::new(MemorySessionStore::new()),
        network(),
    ));
    session.connect().await.unwrap();
    session
}

async fn coordinator_for(account: Address, ledger: &Arc<MockLedger>) -> Coordinator {
    Coordinator::new(session_for(account).await, ledger.clone(), ledger.clone())
}

/// Mint an asset and put it up for auction; returns the token id.
async fn listed(seller: &Coordinator, price: u128, duration: u64) -> TokenId {
    let (token_id, receipt) = seller
        .mint("Sunset", "A sunset over the bay", vec![0xFF, 0xD8, 0xFF])
        .await
        .unwrap();
    assert!(receipt.success);

    let receipt = seller.create_auction(token_id, price, duration).await.unwrap();
    assert!(receipt.success);
    token_id
}

#[tokio::test]
async fn test_full_auction_lifecycle() {
    let ledger = Arc::new(MockLedger::new());
    let seller = coordinator_for(addr(1), &ledger).await;
    let bidder = coordinator_for(addr(2), &ledger).await;

    // Mint and list at 1.0 for an hour.
    let token_id = listed(&seller, WEI_PER_TOKEN, 3_600).await;
    assert_eq!(ledger.owner_of(token_id).await.unwrap(), Some(addr(1)));

    let auction = ledger.get_auction(token_id).await.unwrap().unwrap();
    let now = ledger.block_time().await.unwrap();
    assert_eq!(valuation::derive_status(&auction, now), AuctionStatus::Live);
    assert_eq!(valuation::minimum_next_bid(&auction), WEI_PER_TOKEN);

    // A bid exactly at the minimum goes through.
    bidder
        .place_bid(BidIntent {
            token_id,
            amount: WEI_PER_TOKEN,
        })
        .await
        .unwrap();

    // The next bid must clear a 5% increment; anything below is rejected
    // locally, before a transaction is ever attempted.
    let minimum = WEI_PER_TOKEN + WEI_PER_TOKEN / 20;
    let err = bidder
        .place_bid(BidIntent {
            token_id,
            amount: minimum - 1,
        })
        .await
        .unwrap_err();
    assert_eq!(
        err,
        WorkflowError::Validation(ValidationError::BidTooLow {
            minimum,
            offered: minimum - 1,
        })
    );
    let bids: Vec<bool> = ledger
        .get_user_transactions(addr(2))
        .await
        .unwrap()
        .iter()
        .filter(|record| record.kind == TransactionKind::Bid)
        .map(|record| record.success)
        .collect();
    // Exactly one bid ever reached the ledger.
    assert_eq!(bids, vec![true]);

    // Close the window: the auction now awaits finalization and shows up in
    // the seller's queue, and only there.
    ledger.advance_time(3_600);
    let auction = ledger.get_auction(token_id).await.unwrap().unwrap();
    let now = ledger.block_time().await.unwrap();
    assert_eq!(
        valuation::derive_status(&auction, now),
        AuctionStatus::AwaitingFinalization
    );

    let queue = seller.finalization_queue().await.unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].token_id, token_id);
    assert!(bidder.finalization_queue().await.unwrap().is_empty());

    // Bidding after the end fails locally too.
    let err = bidder
        .place_bid(BidIntent {
            token_id,
            amount: 2 * WEI_PER_TOKEN,
        })
        .await
        .unwrap_err();
    assert_eq!(
        err,
        WorkflowError::Validation(ValidationError::NotLive(
            AuctionStatus::AwaitingFinalization
        ))
    );

    // Settlement hands the asset to the winner.
    let receipt = seller.finalize_auction(token_id).await.unwrap();
    assert!(receipt.success);
    assert_eq!(ledger.owner_of(token_id).await.unwrap(), Some(addr(2)));
    assert!(seller.finalization_queue().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unsold_auction_returns_to_seller() {
    let ledger = Arc::new(MockLedger::new());
    let seller = coordinator_for(addr(1), &ledger).await;

    let token_id = listed(&seller, WEI_PER_TOKEN, 3_600).await;
    ledger.advance_time(3_600);

    let auction = ledger.get_auction(token_id).await.unwrap().unwrap();
    let now = ledger.block_time().await.unwrap();
    assert_eq!(
        valuation::derive_status(&auction, now),
        AuctionStatus::EndedUnsold
    );

    // Same finalize entry point; the ledger picks the unsold branch.
    seller.finalize_auction(token_id).await.unwrap();
    assert_eq!(ledger.owner_of(token_id).await.unwrap(), Some(addr(1)));
    let auction = ledger.get_auction(token_id).await.unwrap().unwrap();
    assert!(!auction.active);
}

#[tokio::test]
async fn test_cancellation_latches_once_a_bid_arrives() {
    let ledger = Arc::new(MockLedger::new());
    let seller = coordinator_for(addr(1), &ledger).await;
    let bidder = coordinator_for(addr(2), &ledger).await;

    let token_id = listed(&seller, WEI_PER_TOKEN, 3_600).await;
    bidder
        .place_bid(BidIntent {
            token_id,
            amount: WEI_PER_TOKEN,
        })
        .await
        .unwrap();

    // The stale-read race surfaces as its own error, distinct from a plain
    // permission failure.
    let err = seller.cancel_auction(token_id).await.unwrap_err();
    assert_eq!(err, WorkflowError::Validation(ValidationError::BidArrived));

    let auction = ledger.get_auction(token_id).await.unwrap().unwrap();
    assert!(auction.active);
    assert_eq!(auction.highest_bid, WEI_PER_TOKEN);
}

#[tokio::test]
async fn test_cancel_before_any_bid_frees_the_token() {
    let ledger = Arc::new(MockLedger::new());
    let seller = coordinator_for(addr(1), &ledger).await;

    let token_id = listed(&seller, WEI_PER_TOKEN, 3_600).await;
    seller.cancel_auction(token_id).await.unwrap();

    let auction = ledger.get_auction(token_id).await.unwrap().unwrap();
    assert!(!auction.active);
    assert_eq!(ledger.owner_of(token_id).await.unwrap(), Some(addr(1)));
    assert!(ledger.get_all_active_auctions().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_identity_loss_blocks_every_workflow() {
    let ledger = Arc::new(MockLedger::new());
    let session = session_for(addr(1)).await;
    let coordinator = Coordinator::new(session.clone(), ledger.clone(), ledger.clone());

    let token_id = listed(&coordinator, WEI_PER_TOKEN, 3_600).await;

    // The wallet logs out underneath the client.
    session
        .handle_event(WalletEvent::AccountsChanged(vec![]))
        .await;

    let err = coordinator.cancel_auction(token_id).await.unwrap_err();
    assert_eq!(err, WorkflowError::NotConnected);
    assert!(ledger.get_auction(token_id).await.unwrap().unwrap().active);
}

#[tokio::test]
async fn test_board_views_track_the_ledger() {
    let ledger = Arc::new(MockLedger::new());
    let seller = coordinator_for(addr(1), &ledger).await;

    let token_id = listed(&seller, WEI_PER_TOKEN, 3_661).await;

    let views = seller.refresh_board().await.unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].auction.token_id, token_id);
    assert_eq!(views[0].status, AuctionStatus::Live);
    assert_eq!(views[0].minimum_next_bid, WEI_PER_TOKEN);
    assert_eq!(views[0].time_left, "1h 1m 1s");

    // The countdown path re-derives from the cache without a ledger read.
    let later = ledger.block_time().await.unwrap() + 3_661;
    let views = seller.board().views(later);
    assert_eq!(views[0].time_left, "Ended");
}

#[tokio::test]
async fn test_full_stack_over_json_rpc() {
    let ledger = Arc::new(MockLedger::new());
    let (local_addr, handle) = serve(ledger.clone(), "127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let url = format!("http://{local_addr}");

    let gateway = Arc::new(RpcLedgerGateway::new(&url).unwrap());
    let metadata = Arc::new(RpcMetadataStore::new(&url).unwrap());
    let seller = Coordinator::new(session_for(addr(1)).await, gateway.clone(), metadata.clone());
    let bidder = Coordinator::new(session_for(addr(2)).await, gateway, metadata);

    let token_id = listed(&seller, WEI_PER_TOKEN, 3_600).await;
    bidder
        .place_bid(BidIntent {
            token_id,
            amount: WEI_PER_TOKEN,
        })
        .await
        .unwrap();

    ledger.advance_time(3_600);
    seller.finalize_auction(token_id).await.unwrap();
    assert_eq!(ledger.owner_of(token_id).await.unwrap(), Some(addr(2)));

    handle.stop().unwrap();
    handle.stopped().await;
}
