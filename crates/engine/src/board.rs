//! Derived-state cache for the auction list.
//!
//! One cache, two independent consumers: a ledger refresh task that
//! re-reads the active-auction list on a fixed interval, and a purely
//! cosmetic countdown derivation that recomputes statuses and "time left"
//! strings from the cache without touching the ledger.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::warn;

use gavel_types::{Amount, Auction, AuctionStatus};

use crate::gateway::LedgerGateway;
use crate::valuation;

/// Interval for the ledger refresh task.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// One auction enriched with its derived fields, ready for display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuctionView {
    pub auction: Auction,
    pub status: AuctionStatus,
    pub minimum_next_bid: Amount,
    pub time_left: String,
}

/// Shared cache of the last fetched auction list.
///
/// Written only by refreshes; read by any number of display passes. A
/// refresh racing a workflow may briefly serve stale intermediate state;
/// the next refresh converges.
#[derive(Default)]
pub struct AuctionBoard {
    auctions: RwLock<Vec<Auction>>,
}

impl AuctionBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached list with a freshly fetched one.
    pub fn replace(&self, auctions: Vec<Auction>) {
        *self.auctions.write() = auctions;
    }

    /// The raw cached records.
    pub fn auctions(&self) -> Vec<Auction> {
        self.auctions.read().clone()
    }

    /// Derive display views from the cache at `now`. Pure over the cache
    /// contents; this is the countdown path and never reads the ledger.
    pub fn views(&self, now: u64) -> Vec<AuctionView> {
        self.auctions
            .read()
            .iter()
            .map(|auction| AuctionView {
                status: valuation::derive_status(auction, now),
                minimum_next_bid: valuation::minimum_next_bid(auction),
                time_left: valuation::format_time_left(valuation::time_left(auction, now)),
                auction: auction.clone(),
            })
            .collect()
    }
}

/// Spawn the periodic ledger refresh over the board.
///
/// Read failures are logged and skipped; the cache keeps serving the last
/// good list until the next successful tick.
pub fn spawn_refresh_task(
    board: Arc<AuctionBoard>,
    gateway: Arc<dyn LedgerGateway>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match gateway.get_all_active_auctions().await {
                Ok(auctions) => board.replace(auctions),
                Err(err) => warn!(%err, "auction list refresh failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gavel_types::{Address, TokenId};

    fn auction(start_time: u64, duration: u64, highest_bid: Amount) -> Auction {
        Auction {
            token_id: TokenId([1u8; 32]),
            seller: Address([1u8; 20]),
            starting_price: 100,
            highest_bid,
            highest_bidder: if highest_bid == 0 {
                Address::ZERO
            } else {
                Address([2u8; 20])
            },
            start_time,
            duration,
            active: true,
        }
    }

    #[test]
    fn test_views_derive_from_cache_only() {
        let board = AuctionBoard::new();
        board.replace(vec![auction(0, 3_661, 0)]);

        let views = board.views(0);
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].status, AuctionStatus::Live);
        assert_eq!(views[0].minimum_next_bid, 100);
        assert_eq!(views[0].time_left, "1h 1m 1s");

        // Same cache, later clock: only the derivation changes.
        let views = board.views(4_000);
        assert_eq!(views[0].status, AuctionStatus::EndedUnsold);
        assert_eq!(views[0].time_left, "Ended");
    }

    #[test]
    fn test_replace_swaps_the_whole_list() {
        let board = AuctionBoard::new();
        board.replace(vec![auction(0, 100, 0), auction(0, 200, 0)]);
        assert_eq!(board.auctions().len(), 2);

        board.replace(vec![auction(0, 300, 50)]);
        let auctions = board.auctions();
        assert_eq!(auctions.len(), 1);
        assert_eq!(auctions[0].highest_bid, 50);
    }
}
