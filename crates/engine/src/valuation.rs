//! Pure valuation functions over auction records.
//!
//! No I/O and no clocks: every function takes `now` explicitly and works on
//! integer quantities in the smallest currency unit.

use gavel_types::{Address, Amount, Auction, AuctionStatus};

/// Minimum bid increment over the current highest bid, in basis points.
pub const INCREMENT_BPS: u128 = 500;

/// Basis-point scale.
pub const BPS_SCALE: u128 = 10_000;

/// Derive the lifecycle status of an auction at `now`.
///
/// Total over the four statuses: exactly one applies to any input.
pub fn derive_status(auction: &Auction, now: u64) -> AuctionStatus {
    if !auction.active {
        AuctionStatus::Finalized
    } else if now < auction.end_time() {
        AuctionStatus::Live
    } else if auction.highest_bid == 0 {
        AuctionStatus::EndedUnsold
    } else {
        AuctionStatus::AwaitingFinalization
    }
}

/// The smallest acceptable next bid: the starting price while no bid exists,
/// otherwise the highest bid plus a 5% increment, rounded up.
pub fn minimum_next_bid(auction: &Auction) -> Amount {
    if auction.highest_bid == 0 {
        return auction.starting_price;
    }
    let increment = auction
        .highest_bid
        .saturating_mul(INCREMENT_BPS)
        .div_ceil(BPS_SCALE);
    auction.highest_bid.saturating_add(increment)
}

/// Signed seconds until the bidding window closes (negative once past).
pub fn time_left(auction: &Auction, now: u64) -> i64 {
    let end = auction.end_time();
    if end >= now {
        i64::try_from(end - now).unwrap_or(i64::MAX)
    } else {
        i64::try_from(now - end).map(|d| -d).unwrap_or(i64::MIN)
    }
}

/// Render a remaining duration as `"1d 2h 3m 4s"`, omitting zero components;
/// anything non-positive is `"Ended"`.
pub fn format_time_left(seconds: i64) -> String {
    if seconds <= 0 {
        return "Ended".to_string();
    }
    let total = seconds as u64;
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if seconds > 0 {
        parts.push(format!("{seconds}s"));
    }
    parts.join(" ")
}

/// Still-active auctions owned by `user` whose bidding window has closed:
/// the seller's finalization queue.
pub fn filter_expired_owned(auctions: &[Auction], user: Address, now: u64) -> Vec<Auction> {
    auctions
        .iter()
        .filter(|a| a.active && a.seller == user && a.end_time() <= now)
        .cloned()
        .collect()
}

/// Whether `user` may cancel the auction: not yet ended, no bid placed, and
/// the caller is the seller. Once any bid exists this is permanently false.
pub fn can_cancel(auction: &Auction, user: Address, now: u64) -> bool {
    auction.active && now < auction.end_time() && auction.highest_bid == 0 && auction.seller == user
}

#[cfg(test)]
mod tests {
    use super::*;
    use gavel_types::{TokenId, WEI_PER_TOKEN};

    fn addr(byte: u8) -> Address {
        Address([byte; 20])
    }

    fn auction() -> Auction {
        Auction {
            token_id: TokenId([1u8; 32]),
            seller: addr(1),
            starting_price: WEI_PER_TOKEN,
            highest_bid: 0,
            highest_bidder: Address::ZERO,
            start_time: 1_000,
            duration: 3_600,
            active: true,
        }
    }

    #[test]
    fn test_minimum_bid_is_starting_price_without_bids() {
        let a = auction();
        assert_eq!(minimum_next_bid(&a), a.starting_price);
    }

    #[test]
    fn test_minimum_bid_adds_five_percent() {
        let mut a = auction();
        a.highest_bid = WEI_PER_TOKEN;
        a.highest_bidder = addr(2);
        assert_eq!(minimum_next_bid(&a), WEI_PER_TOKEN + WEI_PER_TOKEN / 20);
    }

    #[test]
    fn test_minimum_bid_rounds_up() {
        let mut a = auction();
        // 5% of 3 wei is 0.15 wei; the increment must round up to 1.
        a.highest_bid = 3;
        assert_eq!(minimum_next_bid(&a), 4);

        a.highest_bid = 10_000;
        assert_eq!(minimum_next_bid(&a), 10_500);

        a.highest_bid = 10_001;
        // ceil(10_001 * 0.05) = 501
        assert_eq!(minimum_next_bid(&a), 10_502);
    }

    #[test]
    fn test_minimum_bid_is_monotone_in_highest_bid() {
        let mut a = auction();
        let mut previous = 0;
        for bid in [1u128, 2, 19, 20, 21, 999, 1_000, 1_001, WEI_PER_TOKEN] {
            a.highest_bid = bid;
            let minimum = minimum_next_bid(&a);
            assert!(minimum > bid);
            assert!(minimum >= previous, "non-monotone at highest_bid={bid}");
            previous = minimum;
        }
    }

    #[test]
    fn test_status_covers_every_case_exactly_once() {
        let mut a = auction();
        let end = a.end_time();

        assert_eq!(derive_status(&a, end - 1), AuctionStatus::Live);
        assert_eq!(derive_status(&a, end), AuctionStatus::EndedUnsold);

        a.highest_bid = 5;
        assert_eq!(derive_status(&a, end), AuctionStatus::AwaitingFinalization);
        assert_eq!(derive_status(&a, end - 1), AuctionStatus::Live);

        a.active = false;
        for now in [0, end - 1, end, end + 1] {
            assert_eq!(derive_status(&a, now), AuctionStatus::Finalized);
        }
    }

    #[test]
    fn test_inactive_never_accepts_bids_status() {
        let mut a = auction();
        a.active = false;
        assert_eq!(derive_status(&a, 0), AuctionStatus::Finalized);
    }

    #[test]
    fn test_format_time_left() {
        assert_eq!(format_time_left(0), "Ended");
        assert_eq!(format_time_left(-5), "Ended");
        assert_eq!(format_time_left(1), "1s");
        assert_eq!(format_time_left(60), "1m");
        assert_eq!(format_time_left(3_661), "1h 1m 1s");
        assert_eq!(format_time_left(3_600), "1h");
        assert_eq!(format_time_left(86_400), "1d");
        assert_eq!(format_time_left(90_000), "1d 1h");
        assert_eq!(format_time_left(90_061), "1d 1h 1m 1s");
    }

    #[test]
    fn test_time_left_signs() {
        let a = auction();
        let end = a.end_time();
        assert_eq!(time_left(&a, end - 10), 10);
        assert_eq!(time_left(&a, end), 0);
        assert_eq!(time_left(&a, end + 10), -10);
    }

    #[test]
    fn test_expired_owned_filter() {
        let owner = addr(1);
        let end = auction().end_time();

        let expired_owned = auction();
        let mut expired_foreign = auction();
        expired_foreign.seller = addr(2);
        let mut finalized = auction();
        finalized.active = false;
        let still_live = auction();

        let auctions = vec![
            expired_owned.clone(),
            expired_foreign,
            finalized,
            still_live,
        ];

        // At `end` only the first auction qualifies: the foreign one is
        // excluded despite being expired, the finalized one despite being
        // owned.
        let queue = filter_expired_owned(&auctions, owner, end);
        assert_eq!(queue, vec![expired_owned]);

        // Before the window closes nothing qualifies.
        assert!(filter_expired_owned(&auctions, owner, end - 1).is_empty());
    }

    #[test]
    fn test_can_cancel_latches_on_first_bid() {
        let mut a = auction();
        let now = a.start_time + 10;

        assert!(can_cancel(&a, addr(1), now));
        // Not the seller.
        assert!(!can_cancel(&a, addr(2), now));
        // Window closed.
        assert!(!can_cancel(&a, addr(1), a.end_time()));

        a.highest_bid = 1;
        a.highest_bidder = addr(3);
        assert!(!can_cancel(&a, addr(1), now));
        // Idempotent: same inputs, same answer.
        assert!(!can_cancel(&a, addr(1), now));
    }
}
