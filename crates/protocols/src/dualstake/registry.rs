//! Registry contract client: pool discovery and batch listing reads.

use super::context::{ContractContext, ContractSchema};
use super::mapper::decode_listing;
use super::methods;
use super::params::{ContractAssignmentParams, VanityConfigureParams};
use super::pool::metadata_args;
use super::resolver::{
    self, ASSIGN_BOX_MBR, LISTING_BUDGET_PER_APP, RegistryBox, batch_budget, classify_registry_box,
    decode_mapping, mapping_box_name,
};
use super::{ReadableContract, TransactionBuilder};
use crate::codec::abi::AbiValue;
use crate::error::{DualStakeError, Result, ValidationError};
use crate::rpc::SimulateRequest;
use crate::transaction::{FeeSpec, Transaction};
use dualstake_domain::{ContractListing, ContractMapping};
use futures::future::try_join_all;
use rand::RngCore;
use tracing::{debug, info, warn};

/// Most pools one `log_dualstake_listings` simulation can cover.
pub const MAX_LISTING_CHUNK: usize = 32;

#[derive(Debug, Clone)]
pub struct RegistryClient {
    ctx: ContractContext,
}

impl RegistryClient {
    #[must_use]
    pub fn new(ctx: ContractContext) -> Self {
        Self { ctx }
    }

    /// Ids of every registered pool, ascending.
    ///
    /// # Errors
    /// Transport failures.
    pub async fn get_available_contract_ids(&self) -> Result<Vec<u64>> {
        let names = self
            .ctx
            .transport
            .application_box_names(self.ctx.app_id)
            .await?;
        let mut ids: Vec<u64> = names
            .iter()
            .filter_map(|name| match classify_registry_box(name) {
                RegistryBox::PoolId(id) => Some(id),
                _ => None,
            })
            .collect();
        ids.sort_unstable();
        debug!(registry = self.ctx.app_id, count = ids.len(), "Listed pool ids");
        Ok(ids)
    }

    /// Every paired asset to pool mapping, ordered by paired asset id.
    ///
    /// # Errors
    /// Transport failures, or a mapping value that is not 16 bytes.
    pub async fn get_available_contracts(&self) -> Result<Vec<ContractMapping>> {
        let names = self
            .ctx
            .transport
            .application_box_names(self.ctx.app_id)
            .await?;
        let mut paired: Vec<u64> = names
            .iter()
            .filter_map(|name| match classify_registry_box(name) {
                RegistryBox::Mapping { paired_asset_id } => Some(paired_asset_id),
                _ => None,
            })
            .collect();
        paired.sort_unstable();

        let transport = self.ctx.transport.as_ref();
        let app_id = self.ctx.app_id;
        try_join_all(paired.into_iter().map(|paired_asset_id| async move {
            let value = transport
                .application_box(app_id, &mapping_box_name(paired_asset_id))
                .await?;
            Ok::<_, DualStakeError>(decode_mapping(paired_asset_id, &value)?)
        }))
        .await
    }

    /// Listings of up to [`MAX_LISTING_CHUNK`] pools from one simulation.
    ///
    /// Each log line is one listing, in the order of `app_ids`. Pools the
    /// registry logged nothing for are missing from the result.
    ///
    /// # Errors
    /// [`ValidationError::ChunkTooLarge`] before any network call, then
    /// transport or decode failures.
    pub async fn get_contract_listings(&self, app_ids: &[u64]) -> Result<Vec<ContractListing>> {
        if app_ids.len() > MAX_LISTING_CHUNK {
            return Err(ValidationError::ChunkTooLarge {
                operation: "get_contract_listings",
                max: MAX_LISTING_CHUNK,
                found: app_ids.len(),
            }
            .into());
        }
        if app_ids.is_empty() {
            return Ok(Vec::new());
        }

        let call = self.ctx.method(
            methods::LOG_DUALSTAKE_LISTINGS,
            vec![AbiValue::Uint64Array(app_ids.to_vec())],
        )?;
        let request =
            SimulateRequest::read_only(batch_budget(LISTING_BUDGET_PER_APP, app_ids.len()))
                .with_more_logging();
        let response = self
            .ctx
            .simulate_call(call, FeeSpec::Suggested, request)
            .await?;

        let logs = response.logs(0);
        if logs.len() != app_ids.len() {
            warn!(
                registry = self.ctx.app_id,
                requested = app_ids.len(),
                logged = logs.len(),
                "Listing count does not match request"
            );
        }
        app_ids
            .iter()
            .zip(logs)
            .map(|(&app_id, line)| {
                decode_listing(line, response.last_round, app_id).map_err(DualStakeError::from)
            })
            .collect()
    }

    /// Box MBR payment to the registry, then the assignment call.
    ///
    /// # Errors
    /// Transport or encoding failures.
    pub async fn make_assign_contract_transactions(
        &self,
        params: ContractAssignmentParams,
    ) -> Result<Vec<Transaction>> {
        info!(asa_id = params.asa_id, app_id = params.app_id, "Building assignment");
        let (call, fee) = resolver::registry_assignment_resources(params.asa_id, params.app_id)
            .apply(self.ctx.method(methods::ASSIGN_CONTRACT, vec![])?);
        let sender = self.ctx.sender;
        let mut group = self.ctx.group().await?;
        group
            .payment(sender, self.ctx.app_address(), ASSIGN_BOX_MBR)
            .app_call(sender, call, fee);
        group.build()
    }

    /// # Errors
    /// Transport or encoding failures.
    pub async fn make_unassign_contract_transactions(
        &self,
        params: ContractAssignmentParams,
    ) -> Result<Vec<Transaction>> {
        let (call, fee) = resolver::registry_assignment_resources(params.asa_id, params.app_id)
            .apply(self.ctx.method(
                methods::UNASSIGN_CONTRACT,
                vec![AbiValue::Bytes(params.asa_id.to_be_bytes().to_vec())],
            )?);
        self.ctx.single_call(call, fee).await
    }

    /// Renames a pool token. The lease makes an identical resubmission
    /// within the validity window fail instead of applying twice.
    ///
    /// # Errors
    /// Transport or encoding failures.
    pub async fn make_vanity_configure_transactions(
        &self,
        params: VanityConfigureParams,
    ) -> Result<Vec<Transaction>> {
        let mut args = vec![AbiValue::Uint64(params.dualstake_app_id)];
        args.extend(metadata_args(params.metadata));
        let call = self
            .ctx
            .method(methods::VANITY_CONFIGURE, args)?
            .with_apps([params.dualstake_app_id]);

        let mut lease = [0u8; 32];
        rand::rng().fill_bytes(&mut lease);

        let mut group = self.ctx.group().await?;
        group
            .app_call(self.ctx.sender, call, FeeSpec::Suggested)
            .lease(lease);
        group.build()
    }
}

impl ReadableContract for RegistryClient {
    fn context(&self) -> &ContractContext {
        &self.ctx
    }
}

impl TransactionBuilder for RegistryClient {
    fn schema(&self) -> ContractSchema {
        ContractSchema::STANDARD
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dualstake::mapper::tests::listing_bytes;
    use crate::dualstake::params::TokenMetadataParams;
    use crate::dualstake::resolver::{POOL_ID_BOX_LENGTH, pool_id_box_name};
    use crate::rpc::mock::MockLedger;
    use crate::rpc::{SimulateResponse, SimulatedTransaction};
    use crate::transaction::TransactionKind;
    use dualstake_domain::Address;
    use std::sync::Arc;

    const REGISTRY: u64 = 2_933_409_454;

    fn registry(ledger: MockLedger) -> RegistryClient {
        RegistryClient::new(ContractContext::new(
            Arc::new(ledger),
            REGISTRY,
            Address::new([1u8; 32]),
        ))
    }

    fn mapping_value(lst_id: u64, app_id: u64) -> Vec<u8> {
        let mut value = lst_id.to_be_bytes().to_vec();
        value.extend_from_slice(&app_id.to_be_bytes());
        value
    }

    fn logging_ledger(logged: usize) -> MockLedger {
        MockLedger::new().with_simulate(move |_, request| {
            assert!(request.allow_more_logging);
            Ok(SimulateResponse {
                last_round: 55,
                results: vec![SimulatedTransaction {
                    logs: (0..logged).map(|i| listing_bytes(i as u64)).collect(),
                }],
            })
        })
    }

    #[tokio::test]
    async fn test_contract_ids_come_from_nine_byte_boxes() {
        let ledger = MockLedger::new()
            .with_box(REGISTRY, pool_id_box_name(300), vec![])
            .with_box(REGISTRY, pool_id_box_name(100), vec![])
            .with_box(REGISTRY, mapping_box_name(31), mapping_value(20, 100));
        assert_eq!(pool_id_box_name(1).len(), POOL_ID_BOX_LENGTH);
        let ids = registry(ledger).get_available_contract_ids().await.unwrap();
        assert_eq!(ids, vec![100, 300]);
    }

    #[tokio::test]
    async fn test_available_contracts_read_mapping_values() {
        let ledger = MockLedger::new()
            .with_box(REGISTRY, pool_id_box_name(100), vec![])
            .with_box(REGISTRY, mapping_box_name(41), mapping_value(22, 200))
            .with_box(REGISTRY, mapping_box_name(31), mapping_value(20, 100));
        let mappings = registry(ledger).get_available_contracts().await.unwrap();
        assert_eq!(
            mappings,
            vec![
                ContractMapping {
                    paired_asset_id: 31,
                    pool_app_id: 100,
                    pool_token_id: 20
                },
                ContractMapping {
                    paired_asset_id: 41,
                    pool_app_id: 200,
                    pool_token_id: 22
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_malformed_mapping_value_is_fatal() {
        let ledger = MockLedger::new().with_box(REGISTRY, mapping_box_name(31), vec![0; 15]);
        let err = registry(ledger).get_available_contracts().await.unwrap_err();
        assert!(matches!(err, DualStakeError::Decode(_)));
    }

    #[tokio::test]
    async fn test_listings_are_tagged_with_requested_ids() {
        let listings = registry(logging_ledger(3))
            .get_contract_listings(&[7, 8, 9])
            .await
            .unwrap();
        let ids: Vec<u64> = listings.iter().map(|l| l.app_id).collect();
        assert_eq!(ids, vec![7, 8, 9]);
        assert_eq!(listings[2].rate, 2);
        assert!(listings.iter().all(|l| l.round == 55));
    }

    #[tokio::test]
    async fn test_short_log_drops_trailing_ids() {
        let listings = registry(logging_ledger(2))
            .get_contract_listings(&[7, 8, 9])
            .await
            .unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[1].app_id, 8);
    }

    #[tokio::test]
    async fn test_oversized_chunk_is_rejected_before_simulating() {
        let ids: Vec<u64> = (0..33).collect();
        let ledger = Arc::new(logging_ledger(33));
        let client = RegistryClient::new(ContractContext::new(
            ledger.clone(),
            REGISTRY,
            Address::new([1u8; 32]),
        ));
        let err = client.get_contract_listings(&ids).await.unwrap_err();
        assert!(matches!(
            err,
            DualStakeError::Validation(ValidationError::ChunkTooLarge { found: 33, .. })
        ));
        assert_eq!(ledger.simulate_calls(), 0);
    }

    #[tokio::test]
    async fn test_assign_pays_box_mbr_first() {
        let txns = registry(MockLedger::new())
            .make_assign_contract_transactions(ContractAssignmentParams {
                asa_id: 31,
                app_id: 100,
            })
            .await
            .unwrap();
        match &txns[0].kind {
            TransactionKind::Payment { amount, receiver } => {
                assert_eq!(*amount, ASSIGN_BOX_MBR);
                assert_eq!(*receiver, Address::for_application(REGISTRY));
            }
            other => panic!("expected payment, got {other:?}"),
        }
        let call = txns[1].as_app_call().unwrap();
        assert_eq!(call.foreign_apps, vec![100]);
        assert_eq!(call.boxes.len(), 2);
    }

    #[tokio::test]
    async fn test_vanity_configure_is_leased() {
        let txns = registry(MockLedger::new())
            .make_vanity_configure_transactions(VanityConfigureParams {
                dualstake_app_id: 100,
                metadata: TokenMetadataParams {
                    lst_asa_name: "dsCOOP".to_string(),
                    lst_unit_name: "dsCOOP".to_string(),
                    lst_url: "https://example.org".to_string(),
                },
            })
            .await
            .unwrap();
        assert_eq!(txns.len(), 1);
        assert!(txns[0].lease.is_some());
        assert_eq!(txns[0].as_app_call().unwrap().args.len(), 5);
    }
}
