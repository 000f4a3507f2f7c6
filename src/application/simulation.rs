//! Seeded random traffic against a fresh pool.
//!
//! Providers deposit and withdraw, traders swap against a random-walk price,
//! and after every transaction the ledger invariants are re-checked:
//! LP supply equals recorded positions, reverted calls leave the host
//! untouched, and token supplies are conserved.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::host::{Host, PoolSetup};
use crate::domain::oracle::{encode_payload, PriceFeedMessage, PriceQuote};
use crate::domain::pool::{Reserves, SwapDirection};
use crate::domain::token::FungibleToken;
use crate::shared::errors::PoolError;
use crate::shared::types::{Address, Amount, TxContext};

const PRICE_EXPO: i32 = -8;

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("Reverted {operation} at step {step} changed host state")]
    RevertLeftState { operation: &'static str, step: usize },

    #[error("Token supply changed at step {step}: {before:?} -> {after:?}")]
    SupplyChanged {
        step: usize,
        before: (Amount, Amount),
        after: (Amount, Amount),
    },
}

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub seed: u64,
    pub steps: usize,
    pub providers: usize,
    pub traders: usize,
    /// Units of BASE and QUOTE minted to every account up front
    pub starting_balance: Amount,
    /// Opening BASE price in QUOTE, with 8 decimals
    pub base_price: i64,
    pub start_time: i64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            steps: 500,
            providers: 3,
            traders: 5,
            starting_balance: 1_000_000_000,
            base_price: 200_000_000,
            start_time: 1_700_000_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimulationReport {
    pub seed: u64,
    pub steps: usize,
    pub committed: usize,
    pub reverted: usize,
    pub swaps: usize,
    pub deposits: usize,
    pub withdrawals: usize,
    pub oracle_fees_paid: Amount,
    pub final_reserves: Reserves,
    pub lp_supply: Amount,
    pub final_base_price: i64,
}

pub struct Simulation {
    config: SimulationConfig,
    rng: StdRng,
    host: Host,
    providers: Vec<Address>,
    traders: Vec<Address>,
    now: i64,
    base_price: i64,
    report: SimulationReport,
}

impl Simulation {
    pub fn new(setup: &PoolSetup, config: SimulationConfig) -> Result<Self, PoolError> {
        let (mut host, _cap) = Host::deploy(setup);
        let providers: Vec<Address> = (0..config.providers).map(|_| Address::new_unique()).collect();
        let traders: Vec<Address> = (0..config.traders).map(|_| Address::new_unique()).collect();

        let pool = host.pool_address();
        let (base, quote) = (host.config().base_token, host.config().quote_token);
        for account in providers.iter().chain(&traders) {
            let ctx = TxContext::new(*account, config.start_time);
            for token in [base, quote] {
                host.faucet(&ctx, token, config.starting_balance)?;
                host.approve(&ctx, token, pool, Amount::MAX)?;
            }
            host.faucet_native(&ctx, config.starting_balance)?;
        }

        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            now: config.start_time,
            base_price: config.base_price,
            report: SimulationReport {
                seed: config.seed,
                ..Default::default()
            },
            config,
            host,
            providers,
            traders,
        })
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    fn token_supplies(&self) -> Result<(Amount, Amount), PoolError> {
        let tokens = &self.host.state().tokens;
        let config = self.host.config();
        Ok((
            tokens.token(&config.base_token)?.total_supply(),
            tokens.token(&config.quote_token)?.total_supply(),
        ))
    }

    /// Random walk of at most 1% per step, never below one unit
    fn step_price(&mut self) {
        let move_bips: i64 = self.rng.gen_range(-100..=100);
        let delta = self.base_price / 10_000 * move_bips;
        self.base_price = (self.base_price + delta).max(1);
    }

    fn price_updates(&self) -> Vec<Vec<u8>> {
        let config = self.host.config();
        [(config.base_feed, self.base_price), (config.quote_feed, 100_000_000)]
            .into_iter()
            .map(|(id, price)| {
                encode_payload(&PriceFeedMessage {
                    id,
                    price: PriceQuote::new(price, 0, PRICE_EXPO, self.now),
                })
            })
            .collect()
    }

    fn step(&mut self, step: usize) -> Result<(), SimulationError> {
        self.now += self.rng.gen_range(1..=30);
        self.step_price();

        let before = self.host.clone();
        let supplies = self.token_supplies()?;
        let roll: u8 = self.rng.gen_range(0..10);

        let (operation, outcome) = if roll < 6 || self.providers.is_empty() {
            ("swap", self.random_swap())
        } else if roll < 8 {
            ("add_liquidity", self.random_deposit())
        } else {
            ("remove_liquidity", self.random_withdrawal())
        };

        match outcome {
            Ok(()) => self.report.committed += 1,
            Err(err) => {
                debug!(operation, error = %err, "simulated transaction reverted");
                self.report.reverted += 1;
                if self.host != before {
                    return Err(SimulationError::RevertLeftState { operation, step });
                }
            }
        }

        self.host.check_invariants()?;
        let after = self.token_supplies()?;
        if after != supplies {
            return Err(SimulationError::SupplyChanged {
                step,
                before: supplies,
                after,
            });
        }
        Ok(())
    }

    fn pick(rng: &mut StdRng, accounts: &[Address]) -> Option<Address> {
        if accounts.is_empty() {
            return None;
        }
        Some(accounts[rng.gen_range(0..accounts.len())])
    }

    fn random_swap(&mut self) -> Result<(), PoolError> {
        let Some(trader) = Self::pick(&mut self.rng, &self.traders) else {
            return Ok(());
        };
        let reserves = self.host.reserves()?;
        let direction = if self.rng.gen_bool(0.5) {
            SwapDirection::BuyBase
        } else {
            SwapDirection::SellBase
        };
        // Mostly within reserves, sometimes deliberately too large
        let cap = reserves.base.max(1) / 4 + 1;
        let size = self.rng.gen_range(0..=cap);

        let updates = self.price_updates();
        let ctx = TxContext::new(trader, self.now).with_value(self.host.update_fee(&updates));
        let receipt = self.host.swap(&ctx, direction, size, &updates)?;
        self.report.swaps += 1;
        self.report.oracle_fees_paid += receipt.oracle_fee;
        Ok(())
    }

    fn random_deposit(&mut self) -> Result<(), PoolError> {
        let Some(provider) = Self::pick(&mut self.rng, &self.providers) else {
            return Ok(());
        };
        let limit = self.config.starting_balance / 10;
        let base = self.rng.gen_range(0..=limit);
        let quote = self.rng.gen_range(0..=limit);
        self.host.add_liquidity(&TxContext::new(provider, self.now), base, quote)?;
        self.report.deposits += 1;
        Ok(())
    }

    fn random_withdrawal(&mut self) -> Result<(), PoolError> {
        let Some(provider) = Self::pick(&mut self.rng, &self.providers) else {
            return Ok(());
        };
        let held = self.host.position_of(&provider).min(self.host.lp_balance(&provider));
        let shares = self.rng.gen_range(0..=held);
        self.host.remove_liquidity(&TxContext::new(provider, self.now), shares)?;
        self.report.withdrawals += 1;
        Ok(())
    }

    /// Run every step; the first invariant violation aborts the run
    pub fn run(mut self) -> Result<SimulationReport, SimulationError> {
        info!(
            "🎲 Simulating {} steps with seed {} ({} providers, {} traders)",
            self.config.steps,
            self.config.seed,
            self.providers.len(),
            self.traders.len()
        );
        for step in 0..self.config.steps {
            self.step(step)?;
        }

        self.report.steps = self.config.steps;
        self.report.final_reserves = self.host.reserves()?;
        self.report.lp_supply = self.host.lp_total_supply();
        self.report.final_base_price = self.base_price;
        info!(
            "✅ Simulation finished: {} committed, {} reverted",
            self.report.committed, self.report.reverted
        );
        Ok(self.report)
    }
}
