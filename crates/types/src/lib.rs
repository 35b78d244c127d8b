//! Core type definitions for the gavel auction marketplace client.
//!
//! This crate provides the shared data structures used across the client:
//! ledger identifiers, auction records, the transaction read model, and the
//! governance-adjustable auction terms. Everything here is plain data — no
//! I/O, no clocks.

pub mod rpc;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use thiserror::Error;

// =========================
// LEDGER IDENTIFIERS
// =========================

/// EVM-style account identifier (20 bytes).
///
/// Parsing accepts 0x-prefixed hex in any case; equality is over the raw
/// bytes, so every address comparison in the client is case-insensitive by
/// construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The all-zero address, used by the ledger for "no bidder yet".
    pub const ZERO: Address = Address([0u8; 20]);

    /// Elided form for display: `0x1234…abcd`.
    pub fn short(&self) -> String {
        let full = self.to_string();
        format!("{}…{}", &full[..6], &full[full.len() - 4..])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
        let bytes = hex::decode(digits).map_err(|_| ParseError::InvalidAddress)?;
        let bytes: [u8; 20] = bytes.try_into().map_err(|_| ParseError::InvalidAddress)?;
        Ok(Address(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// 256-bit asset identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(pub [u8; 32]);

impl TokenId {
    /// Derive a fresh token id from the minter and a millisecond timestamp.
    pub fn derive(minter: Address, timestamp_millis: u64) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(b"GAVEL_TOKEN_ID_V1:");
        hasher.update(minter.0);
        hasher.update(timestamp_millis.to_le_bytes());
        TokenId(hasher.finalize().into())
    }

    /// Elided form for display: `#123456…abcd`.
    pub fn short(&self) -> String {
        let digits = hex::encode(self.0);
        format!("#{}…{}", &digits[..6], &digits[digits.len() - 4..])
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for TokenId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
        let bytes = hex::decode(digits).map_err(|_| ParseError::InvalidTokenId)?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| ParseError::InvalidTokenId)?;
        Ok(TokenId(bytes))
    }
}

impl Serialize for TokenId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TokenId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Transaction hash (32 bytes, hex-encoded on the wire).
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHash(#[serde_as(as = "serde_with::hex::Hex")] pub [u8; 32]);

/// Errors from parsing ledger identifiers and amounts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid address: expected 20 bytes of hex")]
    InvalidAddress,

    #[error("invalid token id: expected 32 bytes of hex")]
    InvalidTokenId,

    #[error("invalid amount: expected a decimal with at most 18 fractional digits")]
    InvalidAmount,
}

// =========================
// MONETARY QUANTITIES
// =========================

/// Monetary quantity in the smallest currency unit (wei). All value
/// arithmetic in the client is integer arithmetic on this type.
pub type Amount = u128;

/// Smallest-unit scale of the native currency.
pub const WEI_PER_TOKEN: Amount = 1_000_000_000_000_000_000;

const MAX_DECIMALS: usize = 18;

/// Format a wei amount as a decimal token string, trimming trailing zeros.
pub fn format_amount(wei: Amount) -> String {
    let whole = wei / WEI_PER_TOKEN;
    let frac = wei % WEI_PER_TOKEN;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{frac:018}");
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

/// Parse a decimal token string (e.g. `"1.05"`) into wei.
pub fn parse_amount(s: &str) -> Result<Amount, ParseError> {
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(ParseError::InvalidAmount);
    }
    if frac.len() > MAX_DECIMALS || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(ParseError::InvalidAmount);
    }
    let whole: Amount = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| ParseError::InvalidAmount)?
    };
    let mut frac_wei: Amount = 0;
    if !frac.is_empty() {
        let digits: Amount = frac.parse().map_err(|_| ParseError::InvalidAmount)?;
        frac_wei = digits * 10u128.pow((MAX_DECIMALS - frac.len()) as u32);
    }
    whole
        .checked_mul(WEI_PER_TOKEN)
        .and_then(|w| w.checked_add(frac_wei))
        .ok_or(ParseError::InvalidAmount)
}

// =========================
// AUCTION RECORDS
// =========================

/// An auction record as stored on the ledger.
///
/// The ledger is the sole writer of these fields; the client only ever reads
/// them and requests transactions that may cause a new record to appear.
///
/// Monetary fields travel as decimal strings on the wire; JSON numbers do
/// not cover the full wei range.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auction {
    pub token_id: TokenId,
    pub seller: Address,
    #[serde_as(as = "DisplayFromStr")]
    pub starting_price: Amount,
    #[serde_as(as = "DisplayFromStr")]
    pub highest_bid: Amount,
    pub highest_bidder: Address,
    pub start_time: u64,
    pub duration: u64,
    pub active: bool,
}

impl Auction {
    /// End of the bidding window. Always recomputed, never stored.
    pub fn end_time(&self) -> u64 {
        self.start_time.saturating_add(self.duration)
    }
}

/// Derived lifecycle status of an auction. Exactly one applies at any
/// `(auction, now)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionStatus {
    /// Bidding window open.
    Live,
    /// Window closed with no bids; the asset awaits return to the seller.
    EndedUnsold,
    /// Window closed with a winning bid; settlement not yet executed.
    AwaitingFinalization,
    /// Terminal: settled or cancelled.
    Finalized,
}

impl fmt::Display for AuctionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AuctionStatus::Live => "live",
            AuctionStatus::EndedUnsold => "ended (no bids)",
            AuctionStatus::AwaitingFinalization => "ended, awaiting finalization",
            AuctionStatus::Finalized => "finalized",
        };
        f.write_str(label)
    }
}

/// Ephemeral bid intent, validated against a fresh auction snapshot
/// immediately before submission. Never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BidIntent {
    pub token_id: TokenId,
    pub amount: Amount,
}

/// Governance-adjustable marketplace terms, queried from the ledger at
/// workflow time rather than compiled in.
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionTerms {
    /// Flat fee attached as value to auction creation.
    #[serde_as(as = "DisplayFromStr")]
    pub creation_fee: Amount,
    /// Flat fee charged per bid.
    #[serde_as(as = "DisplayFromStr")]
    pub bid_fee: Amount,
    /// Seller-side settlement cut, in basis points.
    pub finalize_percentage: u64,
    /// Shortest allowed auction duration, seconds.
    pub min_auction_duration: u64,
    /// Longest allowed auction duration, seconds.
    pub max_auction_duration: u64,
}

// =========================
// TRANSACTIONS
// =========================

/// Handle for a submitted-but-unconfirmed transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTx(pub TxHash);

/// Current network fee terms, attached explicitly to writes when available.
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeQuote {
    #[serde_as(as = "DisplayFromStr")]
    pub gas_price: Amount,
}

/// The ledger's confirmation record for a submitted transaction.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub success: bool,
    pub gas_used: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub effective_gas_price: Amount,
    /// Ledger-provided reason string when the call reverted, if any.
    pub revert_reason: Option<String>,
}

impl Receipt {
    /// Total resource cost of the transaction in wei.
    pub fn gas_cost(&self) -> Amount {
        (self.gas_used as Amount).saturating_mul(self.effective_gas_price)
    }
}

/// Kind of a recorded marketplace transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    Mint,
    Bid,
    CreateAuction,
    EndAuction,
    CancelAuction,
    Transfer,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransactionKind::Mint => "minted",
            TransactionKind::Bid => "placed bid",
            TransactionKind::CreateAuction => "created auction",
            TransactionKind::EndAuction => "ended auction",
            TransactionKind::CancelAuction => "cancelled auction",
            TransactionKind::Transfer => "transferred",
        };
        f.write_str(label)
    }
}

/// One entry of the append-only, ledger-owned activity log. Display only.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub timestamp: u64,
    pub kind: TransactionKind,
    pub token_id: TokenId,
    #[serde_as(as = "DisplayFromStr")]
    pub value: Amount,
    pub from: Address,
    pub to: Address,
    pub success: bool,
}

// =========================
// NETWORK & METADATA
// =========================

/// Full descriptor of the required network, as handed to the wallet when it
/// does not know the chain yet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDescriptor {
    pub chain_id: u64,
    pub name: String,
    pub currency_symbol: String,
    pub currency_decimals: u8,
    pub rpc_url: String,
    pub explorer_url: String,
}

/// One attribute of an asset's metadata document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataAttribute {
    pub trait_type: String,
    pub value: String,
}

/// The JSON document shipped to the content-addressed metadata store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftMetadata {
    pub name: String,
    pub description: String,
    /// Locator of the uploaded image blob.
    pub image: String,
    #[serde(default)]
    pub attributes: Vec<MetadataAttribute>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_parse_case_insensitive() {
        let lower: Address = "0xabcdefabcdefabcdefabcdefabcdefabcdefabcd".parse().unwrap();
        let upper: Address = "0xABCDEFABCDEFABCDEFABCDEFABCDEFABCDEFABCD".parse().unwrap();
        assert_eq!(lower, upper);
        assert_eq!(lower.to_string(), "0xabcdefabcdefabcdefabcdefabcdefabcdefabcd");
    }

    #[test]
    fn test_address_parse_rejects_bad_input() {
        assert!("0x1234".parse::<Address>().is_err());
        assert!("not-hex".parse::<Address>().is_err());
    }

    #[test]
    fn test_address_short() {
        let addr: Address = "0xabcdefabcdefabcdefabcdefabcdefabcdefabcd".parse().unwrap();
        assert_eq!(addr.short(), "0xabcd…abcd");
    }

    #[test]
    fn test_token_id_derive_is_unique_per_input() {
        let minter: Address = "0x1111111111111111111111111111111111111111".parse().unwrap();
        let other: Address = "0x2222222222222222222222222222222222222222".parse().unwrap();

        let a = TokenId::derive(minter, 1000);
        let b = TokenId::derive(minter, 1001);
        let c = TokenId::derive(other, 1000);

        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn test_token_id_round_trip() {
        let id = TokenId([7u8; 32]);
        let parsed: TokenId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_amount_formatting() {
        assert_eq!(format_amount(0), "0");
        assert_eq!(format_amount(WEI_PER_TOKEN), "1");
        assert_eq!(format_amount(WEI_PER_TOKEN + WEI_PER_TOKEN / 20), "1.05");
        assert_eq!(format_amount(1), "0.000000000000000001");
    }

    #[test]
    fn test_amount_parsing() {
        assert_eq!(parse_amount("1").unwrap(), WEI_PER_TOKEN);
        assert_eq!(parse_amount("1.05").unwrap(), WEI_PER_TOKEN + WEI_PER_TOKEN / 20);
        assert_eq!(parse_amount("0.5").unwrap(), WEI_PER_TOKEN / 2);
        assert_eq!(parse_amount(".5").unwrap(), WEI_PER_TOKEN / 2);
        assert!(parse_amount("").is_err());
        assert!(parse_amount("1.0000000000000000001").is_err());
        assert!(parse_amount("abc").is_err());
    }

    #[test]
    fn test_amount_round_trip() {
        for s in ["0", "1", "1.05", "42.125", "0.000000000000000001"] {
            assert_eq!(format_amount(parse_amount(s).unwrap()), s);
        }
    }

    #[test]
    fn test_auction_end_time() {
        let auction = Auction {
            token_id: TokenId([1u8; 32]),
            seller: Address::ZERO,
            starting_price: 1,
            highest_bid: 0,
            highest_bidder: Address::ZERO,
            start_time: 1000,
            duration: 3600,
            active: true,
        };
        assert_eq!(auction.end_time(), 4600);
    }

    #[test]
    fn test_receipt_gas_cost() {
        let receipt = Receipt {
            tx_hash: TxHash([0u8; 32]),
            success: true,
            gas_used: 21_000,
            effective_gas_price: 2_000_000_000,
            revert_reason: None,
        };
        assert_eq!(receipt.gas_cost(), 42_000_000_000_000);
    }

    #[test]
    fn test_address_serde_round_trip() {
        let addr: Address = "0xABCDEFabcdefABCDEFabcdefABCDEFabcdefABCD".parse().unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0xabcdefabcdefabcdefabcdefabcdefabcdefabcd\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(addr, back);
    }
}
