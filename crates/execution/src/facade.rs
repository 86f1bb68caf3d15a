//! Entry point composing the contract clients and the batch coordinator.

use crate::batch::BatchCoordinator;
use crate::config::{BatchConfig, EnvironmentConfig, PriceOracleConfig};
use crate::error::{ExecutionError, Result};
use dualstake_domain::{ContractListing, ContractMapping, PriceAndTvl};
use dualstake_protocols::DualStakeError;
use dualstake_protocols::dualstake::{
    ContractContext, MAX_LISTING_CHUNK, MAX_PRICE_CHUNK, PoolClient, PriceOracleClient,
    RegistryClient,
};
use dualstake_protocols::rpc::{LedgerTransport, RpcConfig, RpcProvider};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

/// A pool to price: a bare id whose listing still has to be read, or a
/// listing the caller already holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingSource {
    AppId(u64),
    Known(ContractListing),
}

impl ListingSource {
    #[must_use]
    pub fn app_id(&self) -> u64 {
        match self {
            ListingSource::AppId(id) => *id,
            ListingSource::Known(listing) => listing.app_id,
        }
    }
}

impl From<u64> for ListingSource {
    fn from(app_id: u64) -> Self {
        ListingSource::AppId(app_id)
    }
}

impl From<ContractListing> for ListingSource {
    fn from(listing: ContractListing) -> Self {
        ListingSource::Known(listing)
    }
}

/// Cross-contract reads over one deployment.
#[derive(Clone)]
pub struct DualStake {
    transport: Arc<dyn LedgerTransport>,
    config: EnvironmentConfig,
    price_oracle_app_id: Option<u64>,
    batch: BatchConfig,
}

impl std::fmt::Debug for DualStake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DualStake")
            .field("config", &self.config)
            .field("price_oracle_app_id", &self.price_oracle_app_id)
            .field("batch", &self.batch)
            .finish_non_exhaustive()
    }
}

impl DualStake {
    /// Creates a facade without a price oracle.
    #[must_use]
    pub fn new(transport: Arc<dyn LedgerTransport>, config: EnvironmentConfig) -> Self {
        Self {
            transport,
            config,
            price_oracle_app_id: None,
            batch: BatchConfig::default(),
        }
    }

    /// Creates a facade that can also read prices.
    #[must_use]
    pub fn with_price_oracle(
        transport: Arc<dyn LedgerTransport>,
        config: PriceOracleConfig,
    ) -> Self {
        Self {
            price_oracle_app_id: Some(config.price_oracle_app_id),
            ..Self::new(transport, config.environment)
        }
    }

    /// Creates a facade over an algod node.
    ///
    /// # Errors
    /// HTTP client construction failures.
    pub fn connect(rpc: RpcConfig, config: EnvironmentConfig) -> Result<Self> {
        let provider = RpcProvider::new(rpc)?;
        Ok(Self::new(Arc::new(provider), config))
    }

    /// Replaces the chunking and concurrency settings.
    #[must_use]
    pub fn with_batch_config(mut self, batch: BatchConfig) -> Self {
        self.batch = batch;
        self
    }

    #[must_use]
    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    fn context(&self, app_id: u64) -> ContractContext {
        ContractContext::new(self.transport.clone(), app_id, self.config.sender)
    }

    fn coordinator(&self) -> BatchCoordinator {
        BatchCoordinator::new(self.batch.concurrency)
    }

    #[must_use]
    pub fn registry_client(&self) -> RegistryClient {
        RegistryClient::new(self.context(self.config.registry_app_id))
    }

    #[must_use]
    pub fn pool_client(&self, app_id: u64) -> PoolClient {
        PoolClient::new(self.context(app_id), self.config.network_constants())
    }

    /// # Errors
    /// [`ExecutionError::PriceOracleNotConfigured`] for a facade built
    /// without one.
    pub fn price_oracle_client(&self) -> Result<PriceOracleClient> {
        let app_id = self
            .price_oracle_app_id
            .ok_or(ExecutionError::PriceOracleNotConfigured)?;
        Ok(PriceOracleClient::new(self.context(app_id)))
    }

    /// # Errors
    /// Transport failures.
    pub async fn get_available_contract_ids(&self) -> Result<Vec<u64>> {
        Ok(self.registry_client().get_available_contract_ids().await?)
    }

    /// # Errors
    /// Transport or decode failures.
    pub async fn get_available_contracts(&self) -> Result<Vec<ContractMapping>> {
        Ok(self.registry_client().get_available_contracts().await?)
    }

    /// Listings of every registered pool.
    ///
    /// # Errors
    /// Transport failures, or the first failing chunk.
    pub async fn get_available_contract_listings(
        &self,
    ) -> Result<BTreeMap<u64, ContractListing>> {
        let ids = self.get_available_contract_ids().await?;
        self.get_contract_listings(&ids).await
    }

    /// Listings of `app_ids`, read in chunks.
    ///
    /// Pools the registry returned nothing for are absent.
    ///
    /// # Errors
    /// The first failing chunk, with its identifiers.
    pub async fn get_contract_listings(
        &self,
        app_ids: &[u64],
    ) -> Result<BTreeMap<u64, ContractListing>> {
        let registry = self.registry_client();
        let registry = &registry;
        let chunk_size = self.batch.listing_chunk_size.min(MAX_LISTING_CHUNK);
        let listings = self
            .coordinator()
            .run(app_ids, chunk_size, |chunk| async move {
                let listings = registry.get_contract_listings(&chunk).await?;
                Ok::<_, DualStakeError>(listings.into_iter().map(|l| (l.app_id, l)).collect())
            })
            .await?;
        info!(requested = app_ids.len(), found = listings.len(), "Read listings");
        Ok(listings)
    }

    /// Price and TVL of every registered pool.
    ///
    /// # Errors
    /// A missing oracle, transport failures, or the first failing chunk.
    pub async fn get_available_prices_and_tvl(&self) -> Result<BTreeMap<u64, PriceAndTvl>> {
        let listings = self.get_available_contract_listings().await?;
        self.get_prices_and_tvl(listings.into_values().map(ListingSource::Known))
            .await
    }

    /// Price and TVL of the given pools.
    ///
    /// Listings passed in are used as is; only bare ids are read from the
    /// registry first. Pools without a listing are skipped.
    ///
    /// # Errors
    /// A missing oracle, or the first failing listing or price chunk.
    pub async fn get_prices_and_tvl(
        &self,
        sources: impl IntoIterator<Item = ListingSource>,
    ) -> Result<BTreeMap<u64, PriceAndTvl>> {
        let oracle = self.price_oracle_client()?;

        let mut order = Vec::new();
        let mut seen = HashSet::new();
        let mut known: HashMap<u64, ContractListing> = HashMap::new();
        for source in sources {
            let app_id = source.app_id();
            if seen.insert(app_id) {
                order.push(app_id);
            }
            if let ListingSource::Known(listing) = source {
                known.entry(app_id).or_insert(listing);
            }
        }

        let needed: Vec<u64> = order
            .iter()
            .copied()
            .filter(|id| !known.contains_key(id))
            .collect();
        if !needed.is_empty() {
            let fetched = self.get_contract_listings(&needed).await?;
            known.extend(fetched);
        }

        let ids: Vec<u64> = order
            .into_iter()
            .filter(|id| {
                let found = known.contains_key(id);
                if !found {
                    warn!(app_id = *id, "No listing, skipping price");
                }
                found
            })
            .collect();

        let oracle = &oracle;
        let known = &known;
        let chunk_size = self.batch.price_chunk_size.min(MAX_PRICE_CHUNK);
        let prices = self
            .coordinator()
            .run(&ids, chunk_size, |chunk| async move {
                let listings: Vec<ContractListing> = chunk
                    .iter()
                    .filter_map(|id| known.get(id).cloned())
                    .collect();
                let prices = oracle.get_prices_and_tvl(&listings).await?;
                Ok::<_, DualStakeError>(prices.into_iter().map(|p| (p.app_id, p)).collect())
            })
            .await?;
        info!(requested = ids.len(), found = prices.len(), "Read prices");
        Ok(prices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dualstake_domain::Address;
    use dualstake_protocols::codec::abi::{self, AbiType, AbiValue, RETURN_PREFIX};
    use dualstake_protocols::dualstake::mapper::{LISTING_LAYOUT, PRICE_AND_TVL_LAYOUT};
    use dualstake_protocols::dualstake::methods::{LOG_DUALSTAKE_LISTINGS, LOG_PRICES_AND_TVL};
    use dualstake_protocols::rpc::mock::MockLedger;
    use dualstake_protocols::rpc::{SimulateResponse, SimulatedTransaction};
    use dualstake_protocols::transaction::Transaction;

    const REGISTRY: u64 = 2_933_409_454;
    const ORACLE: u64 = 3_021_936_666;

    fn listing_line(app_id: u64) -> Vec<u8> {
        LISTING_LAYOUT
            .encode(&[
                AbiValue::Uint64(app_id * 100),
                AbiValue::Uint64(1),
                AbiValue::Uint64(2),
                AbiValue::Uint64(3),
                AbiValue::Uint64(app_id + 1),
                AbiValue::String(format!("ds{app_id}")),
                AbiValue::Uint64(app_id + 2),
                AbiValue::String("Paired".to_string()),
                AbiValue::String("PRD".to_string()),
                AbiValue::Uint64(6),
                AbiValue::Bool(false),
                AbiValue::Bool(true),
                AbiValue::Bool(true),
                AbiValue::Bool(false),
                AbiValue::Uint64(0),
            ])
            .unwrap()
    }

    fn price_line(app_id: u64) -> Vec<u8> {
        PRICE_AND_TVL_LAYOUT
            .encode(&[
                AbiValue::Uint64(app_id),
                AbiValue::Uint64(10),
                AbiValue::Uint64(20),
                AbiValue::Uint64(30),
            ])
            .unwrap()
    }

    fn requested_ids(txns: &[Transaction]) -> Vec<u64> {
        let call = txns[0].as_app_call().unwrap();
        match abi::decode(&AbiType::Uint64Array, &call.args[1], "ids").unwrap() {
            AbiValue::Uint64Array(ids) => ids,
            other => panic!("unexpected {other:?}"),
        }
    }

    /// Registry and oracle simulations answering for every requested id
    /// except those in `silent`.
    fn ledger(silent: &'static [u64]) -> Arc<MockLedger> {
        let listing_selector = abi::method_selector(LOG_DUALSTAKE_LISTINGS).to_vec();
        let price_selector = abi::method_selector(LOG_PRICES_AND_TVL).to_vec();
        Arc::new(MockLedger::new().with_simulate(move |txns, _| {
            let call = txns[0].as_app_call().unwrap();
            let ids = requested_ids(txns);
            let logs = if call.args[0] == listing_selector {
                assert_eq!(call.app_id, REGISTRY);
                ids.iter()
                    .filter(|id| !silent.contains(id))
                    .map(|id| listing_line(*id))
                    .collect()
            } else {
                assert_eq!(call.args[0], price_selector);
                assert_eq!(call.app_id, ORACLE);
                ids.iter().map(|id| price_line(*id)).collect()
            };
            Ok(SimulateResponse {
                last_round: 88,
                results: vec![SimulatedTransaction { logs }],
            })
        }))
    }

    fn facade(ledger: Arc<MockLedger>) -> DualStake {
        DualStake::with_price_oracle(
            ledger,
            PriceOracleConfig {
                environment: EnvironmentConfig::mainnet(Address::new([1u8; 32])),
                price_oracle_app_id: ORACLE,
            },
        )
    }

    #[tokio::test]
    async fn test_seventy_ids_take_three_simulations() {
        let ledger = ledger(&[]);
        let ids: Vec<u64> = (1..=70).collect();
        let listings = facade(ledger.clone())
            .get_contract_listings(&ids)
            .await
            .unwrap();
        assert_eq!(ledger.simulate_calls(), 3);
        let mut sizes: Vec<usize> = ledger
            .simulated()
            .iter()
            .map(|(txns, _)| requested_ids(txns).len())
            .collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![6, 32, 32]);
        assert_eq!(listings.keys().copied().collect::<Vec<_>>(), ids);
        assert_eq!(listings[&70].lst_name, "ds70");
        assert!(ledger.simulated().iter().all(|(_, r)| r.allow_more_logging));
    }

    #[tokio::test]
    async fn test_listing_chunk_size_is_capped() {
        let ledger = ledger(&[]);
        let ids: Vec<u64> = (1..=40).collect();
        let listings = facade(ledger.clone())
            .with_batch_config(BatchConfig {
                listing_chunk_size: 100,
                ..Default::default()
            })
            .get_contract_listings(&ids)
            .await
            .unwrap();
        assert_eq!(listings.len(), 40);
        assert_eq!(ledger.simulate_calls(), 2);
    }

    #[tokio::test]
    async fn test_known_listings_skip_the_registry() {
        let ledger = ledger(&[]);
        let ds = facade(ledger.clone());
        let known = ds.get_contract_listings(&[5]).await.unwrap();
        let before = ledger.simulate_calls();

        let prices = ds
            .get_prices_and_tvl(known.into_values().map(ListingSource::Known))
            .await
            .unwrap();
        assert_eq!(ledger.simulate_calls(), before + 1);
        assert_eq!(prices[&5].dualstake_name, "ds5");
        assert_eq!(prices[&5].paired_asa_id, 7);
    }

    #[tokio::test]
    async fn test_prices_skip_pools_without_listing() {
        let ledger = ledger(&[3]);
        let prices = facade(ledger)
            .get_prices_and_tvl([1u64, 2, 3].map(ListingSource::from))
            .await
            .unwrap();
        assert_eq!(prices.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(prices[&2].quote.dualstake_unit_price_in_algo, 2);
    }

    #[tokio::test]
    async fn test_prices_require_an_oracle() {
        let ds = DualStake::new(ledger(&[]), EnvironmentConfig::mainnet(Address::default()));
        assert!(matches!(
            ds.get_prices_and_tvl([ListingSource::AppId(1)]).await,
            Err(ExecutionError::PriceOracleNotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_failed_chunk_surfaces_batch_error() {
        let ledger = Arc::new(MockLedger::new());
        let err = facade(ledger).get_contract_listings(&[1, 2]).await.unwrap_err();
        match err {
            ExecutionError::Batch(batch) => {
                assert_eq!(batch.index, 0);
                assert_eq!(batch.ids, vec![1, 2]);
            }
            other => panic!("expected batch error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_single_read_uses_return_prefix() {
        let ledger = Arc::new(MockLedger::new().with_simulate(|_, _| {
            let mut line = RETURN_PREFIX.to_vec();
            line.extend_from_slice(&listing_line(9));
            Ok(SimulateResponse {
                last_round: 4,
                results: vec![SimulatedTransaction { logs: vec![line] }],
            })
        }));
        let listing = facade(ledger).pool_client(9).get_listing().await.unwrap();
        assert_eq!(listing.app_id, 9);
        assert_eq!(listing.round, 4);
        assert_eq!(listing.rate, 900);
    }
}
