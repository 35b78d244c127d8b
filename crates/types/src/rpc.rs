//! Wire shapes for the marketplace RPC protocol.
//!
//! Responses reuse the serde representations of the domain types directly;
//! only the write-call parameter bundles and the protocol error codes need
//! their own definitions. Shared by the HTTP gateway and the mock chain
//! server so the two cannot drift apart.

use serde::{Deserialize, Serialize};

use crate::{Address, Amount, FeeQuote, TokenId};

/// Error code for a declined signature request (EIP-1193 user rejection).
pub const USER_REJECTED_CODE: i32 = 4001;

/// Error code for a reverted execution.
pub const EXECUTION_REVERTED_CODE: i32 = -32000;

/// Parameters for minting a token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintParams {
    pub from: Address,
    pub to: Address,
    pub token_id: TokenId,
    pub metadata_uri: String,
}

/// Parameters for granting transfer approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproveParams {
    pub from: Address,
    pub operator: Address,
    pub token_id: TokenId,
}

/// Parameters for opening an auction. `value` carries the creation fee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAuctionParams {
    pub from: Address,
    pub token_id: TokenId,
    pub starting_price: Amount,
    pub duration: u64,
    pub value: Amount,
}

/// Parameters for placing a bid. `value` carries the bid amount.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceBidParams {
    pub from: Address,
    pub token_id: TokenId,
    pub value: Amount,
    pub fee: Option<FeeQuote>,
}

/// Parameters for the single-token calls (cancel, finalize).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenCallParams {
    pub from: Address,
    pub token_id: TokenId,
}
