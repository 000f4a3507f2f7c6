//! CLI commands and handlers
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::application::services::{ExchangeService, ServiceSnapshot, TxStatus};
use crate::application::simulation::{Simulation, SimulationConfig};
use crate::config::Config;
use crate::domain::host::Host;
use crate::domain::oracle::{encode_payload, PriceFeedMessage, PriceQuote};
use crate::domain::pool::{AdminCap, SwapDirection};
use crate::domain::token::FungibleToken;
use crate::infrastructure::hermes::HermesClient;
use crate::infrastructure::state_store::JsonStore;
use crate::shared::types::{Address, Amount, FeedId, TxContext};
use crate::shared::utils::format_amount;

#[derive(Parser)]
#[command(name = "oracle-swap")]
#[command(version, about = "Oracle-priced two-token swap pool with LP shares")]
pub struct Cli {
    /// Path to config file (optional)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// State file (overrides config)
    #[arg(long, global = true)]
    pub state: Option<PathBuf>,

    /// Hermes endpoint (overrides config)
    #[arg(long, global = true)]
    pub hermes_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Deploy tokens, oracle and pool into a fresh state file
    Init {
        /// Replace an existing state file
        #[arg(long)]
        force: bool,
    },

    /// Print a fresh wallet address
    NewWallet,

    /// Mint demo BASE, QUOTE and native coin to a wallet
    Faucet {
        #[arg(long)]
        to: Address,
        #[arg(long, default_value_t = 0)]
        base: Amount,
        #[arg(long, default_value_t = 0)]
        quote: Amount,
        #[arg(long, default_value_t = 0)]
        native: Amount,
    },

    /// Approve the pool to pull BASE and QUOTE
    Approve {
        #[arg(long)]
        from: Address,
        /// Defaults to unlimited
        #[arg(long)]
        amount: Option<Amount>,
    },

    /// Publish BASE and QUOTE prices to the oracle
    PublishPrice {
        #[arg(long)]
        from: Address,
        /// BASE price mantissa
        #[arg(long)]
        base_price: i64,
        /// QUOTE price mantissa
        #[arg(long)]
        quote_price: i64,
        #[arg(long, default_value_t = -8, allow_hyphen_values = true)]
        expo: i32,
        #[arg(long, default_value_t = 0)]
        conf: u64,
        /// Native value attached; defaults to the update fee
        #[arg(long)]
        value: Option<Amount>,
    },

    /// Swap against oracle prices
    Swap {
        #[arg(long)]
        from: Address,
        /// buy or sell (BASE side)
        direction: SwapDirection,
        /// BASE amount
        size: Amount,
        /// Relay live prices from Hermes
        #[arg(long)]
        hermes: bool,
        /// Native value attached for oracle fees
        #[arg(long)]
        value: Option<Amount>,
    },

    /// Deposit BASE and QUOTE for LP shares
    AddLiquidity {
        #[arg(long)]
        from: Address,
        base: Amount,
        quote: Amount,
    },

    /// Burn LP shares for a proportional payout
    RemoveLiquidity {
        #[arg(long)]
        from: Address,
        shares: Amount,
    },

    /// Transfer LP shares
    TransferLp {
        #[arg(long)]
        from: Address,
        #[arg(long)]
        to: Address,
        amount: Amount,
    },

    /// Show pool reserves and, optionally, a wallet's balances
    Balances {
        wallet: Option<Address>,
    },

    /// Drain both reserves to the caller (admin)
    WithdrawAll {
        #[arg(long)]
        from: Address,
        /// Admin capability printed by `init`
        #[arg(long)]
        cap: Option<String>,
    },

    /// Replace the pool's feeds and tokens (admin)
    Reinitialize {
        #[arg(long)]
        from: Address,
        #[arg(long)]
        cap: Option<String>,
        #[arg(long)]
        base_feed: Option<FeedId>,
        #[arg(long)]
        quote_feed: Option<FeedId>,
        #[arg(long)]
        base_token: Option<Address>,
        #[arg(long)]
        quote_token: Option<Address>,
    },

    /// Show recorded transactions
    History {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Run seeded random traffic against a throwaway pool
    Simulate {
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value_t = 500)]
        steps: usize,
        #[arg(long, default_value_t = 3)]
        providers: usize,
        #[arg(long, default_value_t = 5)]
        traders: usize,
        /// Write the JSON report here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn now() -> i64 {
    Utc::now().timestamp()
}

fn parse_cap(cap: Option<String>) -> Result<Option<AdminCap>> {
    cap.map(|text| text.parse::<AdminCap>().context("parse --cap"))
        .transpose()
}

pub struct CommandExecutor {
    config: Config,
    store: JsonStore<ServiceSnapshot>,
}

impl CommandExecutor {
    pub fn new(config: Config) -> Self {
        let store = JsonStore::new(config.state.path.clone());
        Self { config, store }
    }

    /// Execute the selected command
    pub async fn execute(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Init { force } => self.init(force),
            Commands::NewWallet => {
                println!("{}", Address::new_unique());
                Ok(())
            }
            Commands::Simulate {
                seed,
                steps,
                providers,
                traders,
                output,
            } => self.simulate(seed, steps, providers, traders, output),
            Commands::History { limit } => self.history(limit),
            Commands::Balances { wallet } => self.balances(wallet),
            command => self.transact(command).await,
        }
    }

    fn init(&self, force: bool) -> Result<()> {
        if self.store.exists() && !force {
            return Err(anyhow!(
                "{} already exists, pass --force to replace it",
                self.store.path().display()
            ));
        }
        let setup = self.config.pool_setup()?;
        let (host, cap) = Host::deploy(&setup);

        info!("🚀 Pool deployed");
        println!("pool:        {}", host.pool_address());
        println!("base token:  {} ({})", host.config().base_token, setup.base.symbol);
        println!("quote token: {} ({})", host.config().quote_token, setup.quote.symbol);
        println!("lp token:    {}", host.state().pool.lp_token().address());
        println!("oracle fee:  {} per update", setup.single_update_fee);
        println!("admin cap:   {}", cap);
        if setup.unsafe_demo_mode {
            warn!("⚠️ unsafe_demo_mode is on: admin operations need no capability");
        }

        self.store.save(&ServiceSnapshot {
            host,
            history: Vec::new(),
        })
    }

    fn load(&self) -> Result<ServiceSnapshot> {
        if !self.store.exists() {
            return Err(anyhow!(
                "{} not found, run `oracle-swap init` first",
                self.store.path().display()
            ));
        }
        self.store.load()
    }

    fn balances(&self, wallet: Option<Address>) -> Result<()> {
        let host = self.load()?.host;
        let tokens = &host.state().tokens;
        let config = host.config();
        let base = tokens.token(&config.base_token)?.info().clone();
        let quote = tokens.token(&config.quote_token)?.info().clone();
        let reserves = host.reserves()?;

        println!("📊 Pool {} ({:?})", host.pool_address(), host.status());
        println!("   {}: {}", base.symbol, format_amount(reserves.base, base.decimals));
        println!("   {}: {}", quote.symbol, format_amount(reserves.quote, quote.decimals));
        println!("   LP supply: {}", host.lp_total_supply());
        println!("   fee: {} bips", config.fee_rate_bips);

        if let Some(wallet) = wallet {
            let balances = host.balances(&wallet)?;
            println!("👛 {}", wallet);
            println!("   native: {}", balances.native);
            println!("   {}: {}", base.symbol, format_amount(balances.base, base.decimals));
            println!("   {}: {}", quote.symbol, format_amount(balances.quote, quote.decimals));
            println!("   LP: {} (position {})", balances.lp, balances.position);
        }
        Ok(())
    }

    fn history(&self, limit: usize) -> Result<()> {
        let history = self.load()?.history;
        let skip = history.len().saturating_sub(limit);
        for record in history.iter().skip(skip) {
            let status = match &record.status {
                TxStatus::Committed => "✅".to_string(),
                TxStatus::Reverted { reason } => format!("❌ {}", reason),
            };
            println!(
                "{} {} {:<16} {} {}",
                record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                record.id,
                record.operation,
                record.sender,
                status
            );
        }
        Ok(())
    }

    fn simulate(
        &self,
        seed: u64,
        steps: usize,
        providers: usize,
        traders: usize,
        output: Option<PathBuf>,
    ) -> Result<()> {
        let config = SimulationConfig {
            seed,
            steps,
            providers,
            traders,
            ..Default::default()
        };
        let report = Simulation::new(&self.config.pool_setup()?, config)?.run()?;
        let json = serde_json::to_string_pretty(&report)?;
        match output {
            Some(path) => {
                std::fs::write(&path, json).with_context(|| format!("write {}", path.display()))?;
                info!("📝 Report written to {}", path.display());
            }
            None => println!("{}", json),
        }
        Ok(())
    }

    /// Load the state, run one state-changing command and save the result,
    /// reverted or not, so the history keeps every attempt.
    async fn transact(&self, command: Commands) -> Result<()> {
        let service = ExchangeService::from_snapshot(self.load()?)
            .with_price_source(Arc::new(HermesClient::new(self.config.hermes.url.clone())));

        let outcome = self.dispatch(&service, command).await;
        self.store.save(&service.snapshot().await)?;
        outcome
    }

    async fn dispatch(&self, service: &ExchangeService, command: Commands) -> Result<()> {
        match command {
            Commands::Faucet {
                to,
                base,
                quote,
                native,
            } => {
                service.faucet(TxContext::new(to, now()), base, quote, native).await?;
                println!("💧 Minted {} BASE, {} QUOTE, {} native to {}", base, quote, native, to);
            }
            Commands::Approve { from, amount } => {
                let amount = amount.unwrap_or(Amount::MAX);
                service.approve_pool(TxContext::new(from, now()), amount).await?;
                println!("✅ Pool approved for {}", if amount == Amount::MAX { "unlimited".to_string() } else { amount.to_string() });
            }
            Commands::PublishPrice {
                from,
                base_price,
                quote_price,
                expo,
                conf,
                value,
            } => {
                let block_time = now();
                let (base_feed, quote_feed) = service.feeds().await;
                let updates: Vec<Vec<u8>> = [(base_feed, base_price), (quote_feed, quote_price)]
                    .into_iter()
                    .map(|(id, price)| {
                        encode_payload(&PriceFeedMessage {
                            id,
                            price: PriceQuote::new(price, conf, expo, block_time),
                        })
                    })
                    .collect();
                let value = match value {
                    Some(value) => value,
                    None => service.snapshot().await.host.update_fee(&updates),
                };
                let fee = service
                    .publish_prices(TxContext::new(from, block_time).with_value(value), updates)
                    .await?;
                println!("📡 Published 2 prices, paid {} in fees", fee);
            }
            Commands::Swap {
                from,
                direction,
                size,
                hermes,
                value,
            } => {
                let ctx = TxContext::new(from, now()).with_value(value.unwrap_or(0));
                let receipt = if hermes {
                    service.swap_with_live_prices(ctx, direction, size).await?
                } else {
                    service.swap(ctx, direction, size, Vec::new()).await?
                };
                println!(
                    "🔄 {} {} BASE for {} QUOTE (fee {} BASE, oracle fee {})",
                    direction, receipt.base_amount, receipt.quote_amount, receipt.quote.fee, receipt.oracle_fee
                );
            }
            Commands::AddLiquidity { from, base, quote } => {
                let receipt = service.add_liquidity(TxContext::new(from, now()), base, quote).await?;
                println!(
                    "💰 Deposited {} BASE + {} QUOTE for {} shares",
                    receipt.base, receipt.quote, receipt.shares
                );
            }
            Commands::RemoveLiquidity { from, shares } => {
                let receipt = service.remove_liquidity(TxContext::new(from, now()), shares).await?;
                println!(
                    "💸 Burned {} shares for {} BASE + {} QUOTE",
                    receipt.shares_burned, receipt.base, receipt.quote
                );
            }
            Commands::TransferLp { from, to, amount } => {
                service.transfer_lp(TxContext::new(from, now()), to, amount).await?;
                println!("📤 Sent {} LP shares to {}", amount, to);
                warn!("⚠️ LP shares without a recorded position cannot be redeemed by the receiver");
            }
            Commands::WithdrawAll { from, cap } => {
                let cap = parse_cap(cap)?;
                let drained = service.withdraw_all(TxContext::new(from, now()), cap.as_ref()).await?;
                println!("🏦 Withdrew {} BASE + {} QUOTE", drained.base, drained.quote);
            }
            Commands::Reinitialize {
                from,
                cap,
                base_feed,
                quote_feed,
                base_token,
                quote_token,
            } => {
                let cap = parse_cap(cap)?;
                let snapshot = service.snapshot().await;
                let current = snapshot.host.config();
                let feeds = (base_feed.unwrap_or(current.base_feed), quote_feed.unwrap_or(current.quote_feed));
                let tokens = (
                    base_token.unwrap_or(current.base_token),
                    quote_token.unwrap_or(current.quote_token),
                );
                service
                    .reinitialize(TxContext::new(from, now()), cap.as_ref(), feeds, tokens)
                    .await?;
                println!("🔧 Pool now trades {} / {} on feeds {} / {}", tokens.0, tokens.1, feeds.0, feeds.1);
            }
            Commands::Init { .. }
            | Commands::NewWallet
            | Commands::Balances { .. }
            | Commands::History { .. }
            | Commands::Simulate { .. } => return Err(anyhow!("command does not run as a transaction")),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor(dir: &tempfile::TempDir) -> CommandExecutor {
        let mut config = Config::default();
        config.state.path = dir.path().join("state.json");
        CommandExecutor::new(config)
    }

    #[test]
    fn test_cli_parses_swap() {
        let wallet = Address::new_unique();
        let cli = Cli::try_parse_from([
            "oracle-swap",
            "swap",
            "--from",
            &wallet.to_string(),
            "buy",
            "100",
            "--value",
            "2",
        ])
        .unwrap();
        match cli.command {
            Commands::Swap {
                from,
                direction,
                size,
                hermes,
                value,
            } => {
                assert_eq!(from, wallet);
                assert_eq!(direction, SwapDirection::BuyBase);
                assert_eq!(size, 100);
                assert!(!hermes);
                assert_eq!(value, Some(2));
            }
            _ => panic!("expected swap"),
        }
    }

    #[tokio::test]
    async fn test_session_through_the_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let executor = executor(&dir);
        let lp = Address::new_unique();

        executor.execute(Commands::Init { force: false }).await.unwrap();
        assert!(executor.execute(Commands::Init { force: false }).await.is_err());

        executor
            .execute(Commands::Faucet {
                to: lp,
                base: 1_000,
                quote: 2_000,
                native: 10,
            })
            .await
            .unwrap();
        executor
            .execute(Commands::Approve { from: lp, amount: None })
            .await
            .unwrap();
        executor
            .execute(Commands::AddLiquidity {
                from: lp,
                base: 1_000,
                quote: 2_000,
            })
            .await
            .unwrap();
        executor
            .execute(Commands::PublishPrice {
                from: lp,
                base_price: 200_000_000,
                quote_price: 100_000_000,
                expo: -8,
                conf: 0,
                value: None,
            })
            .await
            .unwrap();

        // No capability: refused, but still recorded
        assert!(executor
            .execute(Commands::WithdrawAll { from: lp, cap: None })
            .await
            .is_err());

        let snapshot = executor.load().unwrap();
        assert_eq!(snapshot.host.lp_total_supply(), 1_000);
        assert_eq!(snapshot.history.len(), 5);
        assert!(matches!(snapshot.history[4].status, TxStatus::Reverted { .. }));
        assert_eq!(snapshot.host.balances(&lp).unwrap().native, 8);
    }
}
