//! Price oracle client.

use super::context::{ContractContext, ContractSchema};
use super::mapper::{build_price_and_tvl, decode_oracle_quote};
use super::methods;
use super::resolver::{ORACLE_FEE, PRICE_BUDGET_PER_APP, batch_budget};
use super::{ReadableContract, TransactionBuilder};
use crate::codec::abi::AbiValue;
use crate::error::{Result, ValidationError};
use crate::rpc::SimulateRequest;
use dualstake_domain::{ContractListing, PriceAndTvl};
use tracing::{debug, warn};

/// Most pools one `log_prices_and_tvl` simulation can cover.
pub const MAX_PRICE_CHUNK: usize = 42;

#[derive(Debug, Clone)]
pub struct PriceOracleClient {
    ctx: ContractContext,
}

impl PriceOracleClient {
    #[must_use]
    pub fn new(ctx: ContractContext) -> Self {
        Self { ctx }
    }

    /// Price and TVL of up to [`MAX_PRICE_CHUNK`] pools, in the order of
    /// `listings`.
    ///
    /// The oracle logs one row per pool; row `i` belongs to `listings[i]`.
    ///
    /// # Errors
    /// [`ValidationError::ChunkTooLarge`] before any network call, then
    /// transport or decode failures.
    pub async fn get_prices_and_tvl(
        &self,
        listings: &[ContractListing],
    ) -> Result<Vec<PriceAndTvl>> {
        if listings.len() > MAX_PRICE_CHUNK {
            return Err(ValidationError::ChunkTooLarge {
                operation: "get_prices_and_tvl",
                max: MAX_PRICE_CHUNK,
                found: listings.len(),
            }
            .into());
        }
        if listings.is_empty() {
            return Ok(Vec::new());
        }

        let app_ids: Vec<u64> = listings.iter().map(|l| l.app_id).collect();
        let call = self.ctx.method(
            methods::LOG_PRICES_AND_TVL,
            vec![AbiValue::Uint64Array(app_ids)],
        )?;
        let budget = batch_budget(PRICE_BUDGET_PER_APP, listings.len());
        let request = SimulateRequest::read_only(budget).with_more_logging();
        let response = self.ctx.simulate_call(call, ORACLE_FEE, request).await?;

        let logs = response.logs(0);
        if logs.len() != listings.len() {
            warn!(
                oracle = self.ctx.app_id,
                requested = listings.len(),
                logged = logs.len(),
                "Price row count does not match request"
            );
        }
        let mut prices = Vec::with_capacity(logs.len());
        for (listing, line) in listings.iter().zip(logs) {
            prices.push(build_price_and_tvl(listing, decode_oracle_quote(line)?));
        }
        debug!(oracle = self.ctx.app_id, count = prices.len(), "Read prices");
        Ok(prices)
    }
}

impl ReadableContract for PriceOracleClient {
    fn context(&self) -> &ContractContext {
        &self.ctx
    }
}

impl TransactionBuilder for PriceOracleClient {
    fn schema(&self) -> ContractSchema {
        ContractSchema::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::abi::{self, AbiType};
    use crate::dualstake::mapper::PRICE_AND_TVL_LAYOUT;
    use crate::dualstake::mapper::decode_listing;
    use crate::dualstake::mapper::tests::listing_bytes;
    use crate::error::DualStakeError;
    use crate::rpc::mock::MockLedger;
    use crate::rpc::{SimulateResponse, SimulatedTransaction};
    use dualstake_domain::Address;
    use std::sync::Arc;

    const ORACLE: u64 = 3_021_936_666;

    fn listing(app_id: u64) -> ContractListing {
        decode_listing(&listing_bytes(1), 10, app_id).unwrap()
    }

    fn quote_line(price: u64) -> Vec<u8> {
        PRICE_AND_TVL_LAYOUT
            .encode(&[
                AbiValue::Uint64(price),
                AbiValue::Uint64(price * 2),
                AbiValue::Uint64(price * 3),
                AbiValue::Uint64(price * 5),
            ])
            .unwrap()
    }

    fn oracle_ledger() -> Arc<MockLedger> {
        Arc::new(MockLedger::new().with_simulate(|txns, _| {
            let call = txns[0].as_app_call().unwrap();
            let ids = match abi::decode(&AbiType::Uint64Array, &call.args[1], "ids").unwrap() {
                AbiValue::Uint64Array(ids) => ids,
                other => panic!("unexpected {other:?}"),
            };
            Ok(SimulateResponse {
                last_round: 9,
                results: vec![SimulatedTransaction {
                    logs: ids.iter().map(|id| quote_line(*id)).collect(),
                }],
            })
        }))
    }

    #[tokio::test]
    async fn test_rows_join_listing_by_position() {
        let ledger = oracle_ledger();
        let client = PriceOracleClient::new(ContractContext::new(
            ledger.clone(),
            ORACLE,
            Address::new([1u8; 32]),
        ));
        let prices = client
            .get_prices_and_tvl(&[listing(100), listing(200)])
            .await
            .unwrap();
        assert_eq!(prices.len(), 2);
        assert_eq!(prices[1].app_id, 200);
        assert_eq!(prices[1].quote.dualstake_unit_price_in_algo, 200);
        assert_eq!(prices[1].quote.total_tvl_in_algo, 1_000);
        assert_eq!(prices[0].dualstake_name, "dsCOOP");

        let simulated = ledger.simulated();
        let (txns, request) = &simulated[0];
        assert_eq!(txns[0].fee, 1_000_000);
        assert_eq!(request.extra_opcode_budget, 2 * PRICE_BUDGET_PER_APP);
        assert!(request.allow_more_logging);
    }

    #[tokio::test]
    async fn test_oversized_chunk_is_rejected() {
        let client = PriceOracleClient::new(ContractContext::new(
            oracle_ledger(),
            ORACLE,
            Address::new([1u8; 32]),
        ));
        let listings: Vec<ContractListing> = (0..43).map(listing).collect();
        assert!(matches!(
            client.get_prices_and_tvl(&listings).await,
            Err(DualStakeError::Validation(ValidationError::ChunkTooLarge { max: 42, .. }))
        ));
    }
}
