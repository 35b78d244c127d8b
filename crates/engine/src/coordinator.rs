//! The lifecycle coordinator.
//!
//! Sequences the multi-call workflows (mint, approve-and-create, bid,
//! cancel, finalize) on top of the session machine and the valuation
//! functions. Every workflow validates locally before any ledger write and
//! awaits a terminal receipt before returning control; nothing is retried
//! silently.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use gavel_session::{ConnectionState, SessionManager};
use gavel_types::{
    format_amount, Address, Amount, Auction, AuctionStatus, BidIntent, NftMetadata, PendingTx,
    Receipt, TokenId, TransactionRecord,
};

use crate::board::{AuctionBoard, AuctionView};
use crate::error::{ValidationError, WorkflowError};
use crate::gateway::{LedgerGateway, MetadataStore};
use crate::valuation;

/// Observable stage of the workflow currently running on a coordinator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    Validating,
    AwaitingSignature,
    AwaitingConfirmation,
    Succeeded,
    Failed,
}

/// Sequences multi-step transaction workflows against the ledger.
///
/// Workflows are strictly sequential within one instance; concurrent display
/// refreshes read the shared board and may briefly see intermediate state.
pub struct Coordinator {
    session: Arc<SessionManager>,
    gateway: Arc<dyn LedgerGateway>,
    metadata: Arc<dyn MetadataStore>,
    board: Arc<AuctionBoard>,
    progress: watch::Sender<WorkflowState>,
}

impl Coordinator {
    pub fn new(
        session: Arc<SessionManager>,
        gateway: Arc<dyn LedgerGateway>,
        metadata: Arc<dyn MetadataStore>,
    ) -> Self {
        let (progress, _) = watch::channel(WorkflowState::Idle);
        Self {
            session,
            gateway,
            metadata,
            board: Arc::new(AuctionBoard::new()),
            progress,
        }
    }

    /// The derived-state cache shared with the refresh/countdown tasks.
    pub fn board(&self) -> Arc<AuctionBoard> {
        self.board.clone()
    }

    /// Subscribe to workflow stage transitions.
    pub fn progress(&self) -> watch::Receiver<WorkflowState> {
        self.progress.subscribe()
    }

    // ============ Workflows ============

    /// Mint a new asset: upload the image and metadata document, then submit
    /// the mint transaction.
    pub async fn mint(
        &self,
        name: &str,
        description: &str,
        image: Vec<u8>,
    ) -> Result<(TokenId, Receipt), WorkflowError> {
        let result = self.mint_inner(name, description, image).await;
        self.conclude("mint", &result).await;
        result
    }

    async fn mint_inner(
        &self,
        name: &str,
        description: &str,
        image: Vec<u8>,
    ) -> Result<(TokenId, Receipt), WorkflowError> {
        self.stage(WorkflowState::Validating);
        if name.trim().is_empty() {
            return Err(ValidationError::MissingField("name").into());
        }
        if description.trim().is_empty() {
            return Err(ValidationError::MissingField("description").into());
        }
        if image.is_empty() {
            return Err(ValidationError::MissingField("image").into());
        }
        let (minter, epoch) = self.require_active()?;

        // Storage failures block minting only; browsing is unaffected.
        let image_locator = self.metadata.put_blob(image).await?;
        let document = NftMetadata {
            name: name.to_string(),
            description: description.to_string(),
            image: image_locator,
            attributes: Vec::new(),
        };
        let metadata_uri = self.metadata.put_json(&document).await?;

        let token_id = TokenId::derive(minter, current_millis());
        self.ensure_identity(epoch)?;

        self.stage(WorkflowState::AwaitingSignature);
        let pending = self
            .gateway
            .mint_with_metadata(minter, minter, token_id, &metadata_uri)
            .await?;
        let receipt = self.confirm(pending).await?;
        Ok((token_id, receipt))
    }

    /// Open an auction for an owned token.
    ///
    /// Two sequential transactions: transfer approval for the auction
    /// contract, then the creation call carrying the creation fee. The pair
    /// is not atomic; a failure in between leaves the token approved but
    /// unlisted, and re-running the workflow recovers from there.
    pub async fn create_auction(
        &self,
        token_id: TokenId,
        starting_price: Amount,
        duration: u64,
    ) -> Result<Receipt, WorkflowError> {
        let result = self
            .create_auction_inner(token_id, starting_price, duration)
            .await;
        self.conclude("create-auction", &result).await;
        result
    }

    async fn create_auction_inner(
        &self,
        token_id: TokenId,
        starting_price: Amount,
        duration: u64,
    ) -> Result<Receipt, WorkflowError> {
        self.stage(WorkflowState::Validating);
        let (seller, epoch) = self.require_active()?;
        if starting_price == 0 {
            return Err(ValidationError::ZeroStartingPrice.into());
        }

        // Terms are governance-adjustable; always fetched, never compiled in.
        let terms = self.gateway.auction_terms().await?;
        if duration < terms.min_auction_duration || duration > terms.max_auction_duration {
            return Err(ValidationError::DurationOutOfRange {
                min: terms.min_auction_duration,
                max: terms.max_auction_duration,
                got: duration,
            }
            .into());
        }
        let operator = self.gateway.auction_operator().await?;
        self.ensure_identity(epoch)?;

        self.stage(WorkflowState::AwaitingSignature);
        let pending = self.gateway.approve(seller, operator, token_id).await?;
        self.confirm(pending).await?;

        self.ensure_identity(epoch)?;
        self.stage(WorkflowState::AwaitingSignature);
        let pending = self
            .gateway
            .create_auction(seller, token_id, starting_price, duration, terms.creation_fee)
            .await?;
        self.confirm(pending).await
    }

    /// Place a bid, rejecting anything below the minimum locally before a
    /// transaction attempt is spent.
    pub async fn place_bid(&self, intent: BidIntent) -> Result<Receipt, WorkflowError> {
        let result = self.place_bid_inner(intent).await;
        self.conclude("bid", &result).await;
        result
    }

    async fn place_bid_inner(&self, intent: BidIntent) -> Result<Receipt, WorkflowError> {
        self.stage(WorkflowState::Validating);
        let (bidder, epoch) = self.require_active()?;

        let auction = self.fetch_auction(intent.token_id).await?;
        let now = self.gateway.block_time().await?;
        let status = valuation::derive_status(&auction, now);
        if status != AuctionStatus::Live {
            return Err(ValidationError::NotLive(status).into());
        }
        if auction.seller == bidder {
            return Err(ValidationError::OwnAuction.into());
        }
        let minimum = valuation::minimum_next_bid(&auction);
        if intent.amount < minimum {
            return Err(ValidationError::BidTooLow {
                minimum,
                offered: intent.amount,
            }
            .into());
        }

        self.submit_bid(intent, bidder, epoch).await
    }

    /// Retry a bid after the signer declined it. The intent is unchanged, so
    /// no new validation pass runs; only authorization was withheld.
    pub async fn retry_bid(&self, intent: BidIntent) -> Result<Receipt, WorkflowError> {
        let result = async {
            let (bidder, epoch) = self.require_active()?;
            self.submit_bid(intent, bidder, epoch).await
        }
        .await;
        self.conclude("bid-retry", &result).await;
        result
    }

    async fn submit_bid(
        &self,
        intent: BidIntent,
        bidder: Address,
        epoch: u64,
    ) -> Result<Receipt, WorkflowError> {
        // Attach explicit fee terms when a quote is available instead of
        // falling back to wallet-default estimation.
        let fee = self.gateway.fee_quote().await?;
        self.ensure_identity(epoch)?;

        self.stage(WorkflowState::AwaitingSignature);
        let pending = self
            .gateway
            .place_bid(bidder, intent.token_id, intent.amount, fee)
            .await?;
        self.confirm(pending).await
    }

    /// Cancel an auction that has not received a bid.
    pub async fn cancel_auction(&self, token_id: TokenId) -> Result<Receipt, WorkflowError> {
        let result = self.cancel_auction_inner(token_id).await;
        self.conclude("cancel-auction", &result).await;
        result
    }

    async fn cancel_auction_inner(&self, token_id: TokenId) -> Result<Receipt, WorkflowError> {
        self.stage(WorkflowState::Validating);
        let (caller, epoch) = self.require_active()?;

        // Re-validate against a fresh read immediately before submission;
        // the record may have moved since the view was rendered.
        let auction = self.fetch_auction(token_id).await?;
        let now = self.gateway.block_time().await?;
        if auction.seller != caller {
            return Err(ValidationError::NotSeller.into());
        }
        if !auction.active || now >= auction.end_time() {
            return Err(ValidationError::AlreadyEnded.into());
        }
        if auction.highest_bid > 0 {
            return Err(ValidationError::BidArrived.into());
        }
        self.ensure_identity(epoch)?;

        self.stage(WorkflowState::AwaitingSignature);
        let pending = self.gateway.cancel_auction(caller, token_id).await?;
        self.confirm(pending).await
    }

    /// Finalize an ended auction. One entry point for both the unsold and
    /// the awaiting-settlement case; the ledger applies the correct branch.
    pub async fn finalize_auction(&self, token_id: TokenId) -> Result<Receipt, WorkflowError> {
        let result = self.finalize_auction_inner(token_id).await;
        self.conclude("finalize-auction", &result).await;
        result
    }

    async fn finalize_auction_inner(&self, token_id: TokenId) -> Result<Receipt, WorkflowError> {
        self.stage(WorkflowState::Validating);
        let (caller, epoch) = self.require_active()?;

        let auction = self.fetch_auction(token_id).await?;
        let now = self.gateway.block_time().await?;
        let status = valuation::derive_status(&auction, now);
        match status {
            AuctionStatus::EndedUnsold | AuctionStatus::AwaitingFinalization => {}
            other => return Err(ValidationError::NothingToFinalize(other).into()),
        }
        self.ensure_identity(epoch)?;

        self.stage(WorkflowState::AwaitingSignature);
        let pending = self.gateway.finalize_expired_auction(caller, token_id).await?;
        self.confirm(pending).await
    }

    // ============ Read models ============

    /// Re-read the active-auction list into the board and return the views.
    pub async fn refresh_board(&self) -> Result<Vec<AuctionView>, WorkflowError> {
        self.require_active()?;
        let auctions = self.gateway.get_all_active_auctions().await?;
        self.board.replace(auctions);
        let now = self.gateway.block_time().await?;
        Ok(self.board.views(now))
    }

    /// The caller's still-active auctions whose window has closed.
    pub async fn finalization_queue(&self) -> Result<Vec<Auction>, WorkflowError> {
        let (user, _) = self.require_active()?;
        let auctions = self.gateway.get_user_auctions(user).await?;
        let now = self.gateway.block_time().await?;
        Ok(valuation::filter_expired_owned(&auctions, user, now))
    }

    /// The caller's activity log, newest first.
    pub async fn activity(&self) -> Result<Vec<TransactionRecord>, WorkflowError> {
        let (user, _) = self.require_active()?;
        let mut records = self.gateway.get_user_transactions(user).await?;
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }

    // ============ Internals ============

    fn require_active(&self) -> Result<(Address, u64), WorkflowError> {
        let snapshot = self.session.snapshot();
        match (snapshot.state, snapshot.address) {
            (ConnectionState::Active, Some(address)) => Ok((address, snapshot.epoch)),
            _ => Err(WorkflowError::NotConnected),
        }
    }

    /// Fail fast if the wallet identity changed since `epoch` was observed.
    fn ensure_identity(&self, epoch: u64) -> Result<(), WorkflowError> {
        let snapshot = self.session.snapshot();
        if !snapshot.is_active() || snapshot.epoch != epoch {
            return Err(WorkflowError::SessionInvalidated);
        }
        Ok(())
    }

    async fn fetch_auction(&self, token_id: TokenId) -> Result<Auction, WorkflowError> {
        self.gateway
            .get_auction(token_id)
            .await?
            .ok_or_else(|| ValidationError::AuctionNotFound(token_id).into())
    }

    async fn confirm(&self, pending: PendingTx) -> Result<Receipt, WorkflowError> {
        self.stage(WorkflowState::AwaitingConfirmation);
        let receipt = self.gateway.await_receipt(pending).await?;
        if !receipt.success {
            return Err(WorkflowError::TransactionReverted {
                reason: receipt.revert_reason.clone(),
            });
        }
        info!(
            gas_used = receipt.gas_used,
            cost = %format_amount(receipt.gas_cost()),
            "transaction confirmed"
        );
        Ok(receipt)
    }

    async fn conclude<T>(&self, workflow: &str, result: &Result<T, WorkflowError>) {
        match result {
            Ok(_) => {
                self.stage(WorkflowState::Succeeded);
                // Reconcile the board with on-chain truth; best-effort.
                match self.gateway.get_all_active_auctions().await {
                    Ok(auctions) => self.board.replace(auctions),
                    Err(err) => debug!(%err, "post-workflow refresh failed"),
                }
            }
            Err(err) => {
                warn!(workflow, %err, "workflow failed");
                self.stage(WorkflowState::Failed);
            }
        }
    }

    fn stage(&self, state: WorkflowState) {
        debug!(?state, "workflow stage");
        let _ = self.progress.send(state);
    }
}

fn current_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
