//! Command-line client for the gavel auction marketplace.
//!
//! A thin presentation seam over the session machine and the lifecycle
//! coordinator: it collects user intent, renders state, and never computes
//! economics itself. A development wallet with a fixed account stands in
//! for the browser wallet capability; signing happens behind the gateway.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use gavel_engine::gateway::LedgerGateway;
use gavel_engine::{spawn_refresh_task, AuctionView, Coordinator, DEFAULT_REFRESH_INTERVAL};
use gavel_gateway::{RpcLedgerGateway, RpcMetadataStore};
use gavel_session::{
    ConnectionState, FileSessionStore, SessionManager, SessionSnapshot, SessionStore, StaticWallet,
};
use gavel_types::{
    format_amount, parse_amount, Address, Auction, BidIntent, NetworkDescriptor, Receipt, TokenId,
};

#[derive(Parser)]
#[command(name = "gavel")]
#[command(about = "CLI for the gavel NFT auction marketplace")]
struct Cli {
    /// Marketplace RPC endpoint
    #[arg(long, default_value = "http://127.0.0.1:9944")]
    rpc: String,

    /// File holding the persisted session hint
    #[arg(long, default_value = "gavel-session.json")]
    session_file: PathBuf,

    /// Account of the development wallet (hex address). Defaults to the
    /// persisted session's address when one exists.
    #[arg(long)]
    sender: Option<Address>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Authorize the wallet and open a session
    Connect,

    /// Restore the persisted session and print it
    Status,

    /// Tear the session down locally and clear the persisted hint
    Disconnect,

    /// Show the live auction board
    Auctions,

    /// Mint a new asset from an image file and a description
    Mint {
        #[arg(long)]
        name: String,

        #[arg(long)]
        description: String,

        /// Path of the image to upload
        #[arg(long)]
        image: PathBuf,
    },

    /// Put an owned token up for auction
    CreateAuction {
        /// Token id (hex)
        #[arg(long)]
        token: TokenId,

        /// Starting price in whole tokens (e.g. "1.5")
        #[arg(long)]
        price: String,

        /// Auction duration in seconds
        #[arg(long)]
        duration: u64,
    },

    /// Bid on a live auction
    Bid {
        /// Token id (hex)
        #[arg(long)]
        token: TokenId,

        /// Bid amount in whole tokens (e.g. "1.05")
        #[arg(long)]
        amount: String,

        /// Resubmit a previously declined bid without re-validating
        #[arg(long)]
        retry: bool,
    },

    /// Cancel an auction that has not received a bid
    Cancel {
        /// Token id (hex)
        #[arg(long)]
        token: TokenId,
    },

    /// Settle an ended auction
    Finalize {
        /// Token id (hex)
        #[arg(long)]
        token: TokenId,
    },

    /// List owned auctions waiting for finalization
    Expired,

    /// Show the account's activity log, newest first
    Activity,

    /// Watch the board with a live countdown
    Watch {
        /// Seconds between countdown redraws
        #[arg(long, default_value_t = 1)]
        tick: u64,
    },
}

/// The wired-up client stack for one invocation.
struct App {
    session: Arc<SessionManager>,
    coordinator: Coordinator,
    gateway: Arc<RpcLedgerGateway>,
}

/// Network the deployed contracts live on.
fn somnia_testnet() -> NetworkDescriptor {
    NetworkDescriptor {
        chain_id: 50312,
        name: "Somnia Testnet".to_string(),
        currency_symbol: "STT".to_string(),
        currency_decimals: 18,
        rpc_url: "https://dream-rpc.somnia.network".to_string(),
        explorer_url: "https://shannon-explorer.somnia.network".to_string(),
    }
}

fn build_app(cli: &Cli) -> Result<App> {
    let store = Arc::new(FileSessionStore::new(&cli.session_file));
    let sender = cli
        .sender
        .or_else(|| store.load().map(|hint| hint.address));
    let Some(sender) = sender else {
        bail!("no account: pass --sender or connect first");
    };

    let network = somnia_testnet();
    let wallet = Arc::new(StaticWallet::new(sender, network.chain_id, 0));
    let session = Arc::new(SessionManager::new(wallet, store, network));
    let gateway = Arc::new(RpcLedgerGateway::new(&cli.rpc)?);
    let metadata = Arc::new(RpcMetadataStore::new(&cli.rpc)?);
    let coordinator = Coordinator::new(session.clone(), gateway.clone(), metadata);

    Ok(App {
        session,
        coordinator,
        gateway,
    })
}

/// Restore the prior session if the hint still matches the wallet, else run
/// a fresh connect.
async fn ensure_session(app: &App) -> Result<SessionSnapshot> {
    let snapshot = app.session.restore().await;
    if snapshot.is_active() {
        return Ok(snapshot);
    }
    Ok(app.session.connect().await?)
}

fn print_snapshot(snapshot: &SessionSnapshot) {
    match snapshot.state {
        ConnectionState::Active => {
            println!("Connected");
            if let Some(address) = snapshot.address {
                println!("  Account: {address}");
            }
            if let Some(chain_id) = snapshot.chain_id {
                println!("  Chain:   {chain_id}");
            }
            match snapshot.balance {
                Some(balance) => println!("  Balance: {}", format_amount(balance)),
                None => println!("  Balance: unavailable"),
            }
        }
        _ => println!("Not connected"),
    }
}

fn print_views(views: &[AuctionView]) {
    if views.is_empty() {
        println!("No active auctions");
        return;
    }
    for view in views {
        println!(
            "{}  seller {}  {}  min bid {}  {}",
            view.auction.token_id.short(),
            view.auction.seller.short(),
            view.status,
            format_amount(view.minimum_next_bid),
            view.time_left,
        );
    }
}

fn print_queue(auctions: &[Auction]) {
    if auctions.is_empty() {
        println!("Nothing to finalize");
        return;
    }
    println!("Auctions waiting for finalization:");
    for auction in auctions {
        let outcome = if auction.highest_bid == 0 {
            "no bids".to_string()
        } else {
            format!(
                "sold to {} for {}",
                auction.highest_bidder.short(),
                format_amount(auction.highest_bid)
            )
        };
        println!("  {}  {}", auction.token_id.short(), outcome);
    }
}

fn print_receipt(receipt: &Receipt) {
    println!("Confirmed");
    println!("  Gas used: {}", receipt.gas_used);
    println!("  Cost:     {}", format_amount(receipt.gas_cost()));
}

async fn watch(app: &App, tick: u64) -> Result<()> {
    ensure_session(app).await?;
    let board = app.coordinator.board();
    let gateway: Arc<dyn LedgerGateway> = app.gateway.clone();
    let refresh = spawn_refresh_task(board.clone(), gateway, DEFAULT_REFRESH_INTERVAL);

    // The countdown derives from the cache and a locally advancing clock;
    // only the refresh task touches the ledger.
    let base_time = app.gateway.block_time().await?;
    let started = Instant::now();
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(tick.max(1)));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = base_time + started.elapsed().as_secs();
                println!("--- {}", now);
                print_views(&board.views(now));
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    refresh.abort();
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gavel_cli=info".parse()?)
                .add_directive("gavel_session=info".parse()?)
                .add_directive("gavel_engine=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let app = build_app(&cli)?;

    match cli.command {
        Commands::Connect => {
            let snapshot = app.session.connect().await?;
            print_snapshot(&snapshot);
        }

        Commands::Status => {
            let snapshot = app.session.restore().await;
            print_snapshot(&snapshot);
        }

        Commands::Disconnect => {
            app.session.disconnect();
            println!("Disconnected");
        }

        Commands::Auctions => {
            ensure_session(&app).await?;
            let views = app.coordinator.refresh_board().await?;
            print_views(&views);
        }

        Commands::Mint {
            name,
            description,
            image,
        } => {
            let bytes = std::fs::read(&image)
                .with_context(|| format!("failed to read {}", image.display()))?;
            ensure_session(&app).await?;
            let (token_id, receipt) = app.coordinator.mint(&name, &description, bytes).await?;
            println!("Minted {token_id}");
            print_receipt(&receipt);
        }

        Commands::CreateAuction {
            token,
            price,
            duration,
        } => {
            let starting_price = parse_amount(&price)?;
            ensure_session(&app).await?;
            let receipt = app
                .coordinator
                .create_auction(token, starting_price, duration)
                .await?;
            println!("Auction created for {}", token.short());
            print_receipt(&receipt);
        }

        Commands::Bid {
            token,
            amount,
            retry,
        } => {
            let intent = BidIntent {
                token_id: token,
                amount: parse_amount(&amount)?,
            };
            ensure_session(&app).await?;
            let receipt = if retry {
                app.coordinator.retry_bid(intent).await?
            } else {
                app.coordinator.place_bid(intent).await?
            };
            println!(
                "Bid of {} placed on {}",
                format_amount(intent.amount),
                token.short()
            );
            print_receipt(&receipt);
        }

        Commands::Cancel { token } => {
            ensure_session(&app).await?;
            let receipt = app.coordinator.cancel_auction(token).await?;
            println!("Auction cancelled for {}", token.short());
            print_receipt(&receipt);
        }

        Commands::Finalize { token } => {
            ensure_session(&app).await?;
            let receipt = app.coordinator.finalize_auction(token).await?;
            println!("Auction finalized for {}", token.short());
            print_receipt(&receipt);
        }

        Commands::Expired => {
            ensure_session(&app).await?;
            let queue = app.coordinator.finalization_queue().await?;
            print_queue(&queue);
        }

        Commands::Activity => {
            ensure_session(&app).await?;
            let records = app.coordinator.activity().await?;
            if records.is_empty() {
                println!("No activity yet");
            }
            for record in records {
                let status = if record.success { "ok" } else { "failed" };
                println!(
                    "[{}] {} {} {} ({})",
                    record.timestamp,
                    record.kind,
                    record.token_id.short(),
                    format_amount(record.value),
                    status,
                );
            }
        }

        Commands::Watch { tick } => {
            watch(&app, tick).await?;
        }
    }

    Ok(())
}
