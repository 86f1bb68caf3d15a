//! Command line reader for dualSTAKE pools.
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use dualstake_domain::{Address, Environment};
use dualstake_execution::prelude::*;
use dualstake_protocols::rpc::algod::DEFAULT_ALGOD_URL;
use dualstake_protocols::rpc::{RpcConfig, RpcProvider};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

/// Decimal places of microALGO.
const ALGO_DECIMALS: u32 = 6;

#[derive(Parser)]
#[command(name = "dualstake")]
#[command(about = "Read dualSTAKE pools, prices and registry mappings", long_about = None)]
struct Cli {
    #[command(flatten)]
    connection: Connection,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Connection {
    /// algod base URL
    #[arg(long, env = "ALGOD_URL", default_value = DEFAULT_ALGOD_URL)]
    algod_url: String,

    /// algod API token
    #[arg(long, env = "ALGOD_TOKEN", default_value = "")]
    algod_token: String,

    /// Account used as simulation sender
    #[arg(long, env = "DS_SENDER", default_value = MAINNET_SIMULATION_SENDER)]
    sender: Address,

    /// Registry application id
    #[arg(long, env = "DS_REGISTRY_APP_ID", default_value_t = MAINNET_REGISTRY_APP_ID)]
    registry_app_id: u64,

    /// Price oracle application id
    #[arg(long, env = "DS_PRICE_ORACLE_APP_ID", default_value_t = MAINNET_PRICE_ORACLE_APP_ID)]
    price_oracle_app_id: u64,

    /// Liquidity pool application id
    #[arg(long, env = "DS_TINYMAN_APP_ID", default_value_t = 1_002_541_853)]
    tinyman_app_id: u64,

    /// Asset inbox router application id
    #[arg(long, env = "DS_ARC59_APP_ID", default_value_t = 2_449_590_623)]
    arc59_app_id: u64,

    /// DEV or PROD
    #[arg(long, env = "DS_NETWORK", default_value = "PROD")]
    network: Environment,
}

#[derive(Subcommand)]
enum Commands {
    /// Print pool listings
    Listings {
        /// Pools to read; every registered pool when omitted
        #[arg(long = "app-id")]
        app_ids: Vec<u64>,
    },
    /// Print the full state of one pool
    State {
        /// Pool application id
        #[arg(long)]
        app_id: u64,
    },
    /// Print price and TVL figures
    Prices {
        /// Pools to price; every registered pool when omitted
        #[arg(long = "app-id")]
        app_ids: Vec<u64>,
    },
    /// Print the registry's paired asset to pool mappings
    Contracts,
}

fn algo(micro: u64) -> Decimal {
    Decimal::from_i128_with_scale(i128::from(micro), ALGO_DECIMALS)
}

fn units(amount: u64, decimals: u8) -> Decimal {
    Decimal::from_i128_with_scale(i128::from(amount), u32::from(decimals))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let conn = cli.connection;

    let provider = RpcProvider::new(RpcConfig {
        url: conn.algod_url.clone(),
        token: conn.algod_token.clone(),
        ..Default::default()
    })
    .context("failed to build algod client")?;
    let environment = EnvironmentConfig {
        sender: conn.sender,
        registry_app_id: conn.registry_app_id,
        tinyman_app_id: conn.tinyman_app_id,
        arc59_router_app_id: conn.arc59_app_id,
        network: conn.network,
    };
    let ds = DualStake::with_price_oracle(
        Arc::new(provider),
        PriceOracleConfig {
            environment,
            price_oracle_app_id: conn.price_oracle_app_id,
        },
    );
    info!(url = %conn.algod_url, registry = conn.registry_app_id, "Connected");

    match cli.command {
        Commands::Listings { app_ids } => {
            let listings = if app_ids.is_empty() {
                ds.get_available_contract_listings().await
            } else {
                ds.get_contract_listings(&app_ids).await
            }
            .context("failed to read listings")?;

            println!(
                "{:<12} | {:<12} | {:>18} | {:>18} | {:>8} | {:>6}",
                "App", "Token", "ALGO", "Paired", "Rate", "Online"
            );
            println!("{}", "-".repeat(88));
            for listing in listings.values() {
                println!(
                    "{:<12} | {:<12} | {:>18} | {:>18} | {:>8} | {:>6}",
                    listing.app_id,
                    listing.lst_name,
                    algo(listing.algo_balance),
                    format!(
                        "{} {}",
                        units(listing.asa_balance, listing.asa_decimals),
                        listing.asa_unit_name
                    ),
                    listing.rate,
                    listing.is_online
                );
            }
        }
        Commands::State { app_id } => {
            let state = ds
                .pool_client(app_id)
                .get_state()
                .await
                .with_context(|| format!("failed to read state of {app_id}"))?;
            println!("Pool {} at round {}", state.app_id(), state.listing.round);
            println!("  Token:        {} ({})", state.listing.lst_name, state.lst_id());
            println!(
                "  Paired:       {} ({})",
                state.listing.asa_unit_name,
                state.asa_id()
            );
            println!("  Staked:       {} ALGO", algo(state.listing.staked));
            println!(
                "  Fees (bps):   platform {} / noderunner {}",
                state.platform_fee_bps, state.noderunner_fee_bps
            );
            println!(
                "  Accrued:      platform {} / noderunner {} ALGO",
                algo(state.platform_fees),
                algo(state.noderunner_fees)
            );
            println!("  Admin:        {}", state.admin_addr);
            println!("  Node runner:  {}", state.noderunner_addr);
            println!(
                "  Protests:     {} totalling {}",
                state.protest_count, state.protest_sum
            );
            if let Some(update) = &state.fee_update {
                println!(
                    "  Fee update:   platform {} / noderunner {} at {}",
                    update.next_platform_fee_bps,
                    update.next_noderunner_fee_bps,
                    update.applicable_timestamp
                );
            }
            if let Some(upgrade) = &state.contract_upgrade {
                println!(
                    "  Upgrade:      {} pages at {}",
                    upgrade.contract_page_hashes.len(),
                    upgrade.applicable_timestamp
                );
            }
        }
        Commands::Prices { app_ids } => {
            let prices = if app_ids.is_empty() {
                ds.get_available_prices_and_tvl().await
            } else {
                ds.get_prices_and_tvl(app_ids.into_iter().map(ListingSource::from))
                    .await
            }
            .context("failed to read prices")?;

            println!(
                "{:<12} | {:<12} | {:>14} | {:>18} | {:>18}",
                "App", "Token", "Unit price", "Paired TVL", "Total TVL"
            );
            println!("{}", "-".repeat(84));
            let mut total = Decimal::ZERO;
            for price in prices.values() {
                total += algo(price.quote.total_tvl_in_algo);
                println!(
                    "{:<12} | {:<12} | {:>14} | {:>18} | {:>18}",
                    price.app_id,
                    price.dualstake_name,
                    algo(price.quote.dualstake_unit_price_in_algo),
                    algo(price.quote.asa_tvl_in_algo),
                    algo(price.quote.total_tvl_in_algo)
                );
            }
            println!("Total TVL: {total} ALGO");
        }
        Commands::Contracts => {
            let mappings = ds
                .get_available_contracts()
                .await
                .context("failed to read registry")?;
            println!("{:<14} | {:<14} | {:<14}", "Paired asset", "Pool app", "Pool token");
            println!("{}", "-".repeat(48));
            for mapping in mappings {
                println!(
                    "{:<14} | {:<14} | {:<14}",
                    mapping.paired_asset_id, mapping.pool_app_id, mapping.pool_token_id
                );
            }
        }
    }

    Ok(())
}
