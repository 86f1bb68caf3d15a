//! Resource and reference resolution.
//!
//! Decides which accounts, apps, assets and boxes each contract call must
//! reference and which static fee it carries. Fees are protocol constants
//! sized for the call's worst-case inner transactions.

use crate::codec::uint::decode_u64;
use crate::error::{DecodeError, Result};
use crate::rpc::LedgerTransport;
use crate::transaction::{ApplicationCall, BoxReference, FeeSpec};
use dualstake_domain::{Address, ContractMapping, ContractState};
use tracing::debug;

/// Tag of a pool's per-user protest record box.
pub const PROTEST_BOX_TAG: u8 = b'p';
/// Tag of the router's per-user inbox box.
pub const ROUTER_BOX_TAG: u8 = b'r';
/// Tag of the registry's per-pool box.
pub const POOL_ID_BOX_TAG: u8 = b'a';

/// Registry box holding a pool id: tag then 8-byte app id.
pub const POOL_ID_BOX_LENGTH: usize = 9;
/// Registry box holding a mapping: 8-byte paired asset id.
pub const MAPPING_BOX_LENGTH: usize = 8;
/// Mapping box value: pool token id then pool app id.
pub const MAPPING_VALUE_LENGTH: usize = 16;

pub const MINT_FEE: FeeSpec = FeeSpec::units(2);
pub const REDEEM_FEE: FeeSpec = FeeSpec::units(3);
pub const UNPROTEST_FEE: FeeSpec = FeeSpec::units(2);
pub const ADMIN_UNPROTEST_FEE: FeeSpec = FeeSpec::units(2);
pub const KEYREG_OFFLINE_FEE: FeeSpec = FeeSpec::units(2);
pub const WITHDRAW_FEE: FeeSpec = FeeSpec::units(2);
/// Oracle batch reads fan out one inner call per pool.
pub const ORACLE_FEE: FeeSpec = FeeSpec::Static(1_000_000);

/// Payment covering the ledger's incentive eligibility fee.
pub const INCENTIVE_ELIGIBILITY_FEE: u64 = 2_000_000;
/// Escrow minimum balance funded before `configure`.
pub const CONFIGURE_MBR_DELAYED_OPTIN: u64 = 202_000;
pub const CONFIGURE_MBR: u64 = 303_000;
/// Registry box minimum balance for one assignment.
pub const ASSIGN_BOX_MBR: u64 = 12_100;

/// Extra opcode budget per pool in a batch listing read.
pub const LISTING_BUDGET_PER_APP: u64 = 5_313;
/// Extra opcode budget per pool in an oracle read.
pub const PRICE_BUDGET_PER_APP: u64 = 4_048;
pub const SINGLE_LISTING_BUDGET: u64 = 5_500;
pub const NEED_SWAP_BUDGET: u64 = 1_300;
/// Ceiling of the simulate endpoint's extra budget.
pub const MAX_EXTRA_BUDGET: u64 = 320_000;

/// Extra budget for a batch of `count` items at `per_item` each.
#[must_use]
pub fn batch_budget(per_item: u64, count: usize) -> u64 {
    per_item.saturating_mul(count as u64).min(MAX_EXTRA_BUDGET)
}

/// Dissolving to a holder costs two more inner transactions.
#[must_use]
pub fn dissolve_fee(user_holds_paired_asset: bool) -> FeeSpec {
    if user_holds_paired_asset {
        FeeSpec::units(3)
    } else {
        FeeSpec::units(1)
    }
}

/// Eligible escrows go online with a fee-free keyreg.
#[must_use]
pub fn keyreg_online_fee(incentive_eligible: bool) -> FeeSpec {
    if incentive_eligible {
        FeeSpec::units(2)
    } else {
        FeeSpec::units(1)
    }
}

/// Per-user box name: tag byte then public key.
#[must_use]
pub fn user_box_name(tag: u8, user: &Address) -> Vec<u8> {
    let mut name = Vec::with_capacity(33);
    name.push(tag);
    name.extend_from_slice(user.public_key());
    name
}

#[must_use]
pub fn protest_box_name(user: &Address) -> Vec<u8> {
    user_box_name(PROTEST_BOX_TAG, user)
}

#[must_use]
pub fn router_box_name(user: &Address) -> Vec<u8> {
    user_box_name(ROUTER_BOX_TAG, user)
}

#[must_use]
pub fn pool_id_box_name(app_id: u64) -> Vec<u8> {
    let mut name = Vec::with_capacity(POOL_ID_BOX_LENGTH);
    name.push(POOL_ID_BOX_TAG);
    name.extend_from_slice(&app_id.to_be_bytes());
    name
}

#[must_use]
pub fn mapping_box_name(paired_asset_id: u64) -> Vec<u8> {
    paired_asset_id.to_be_bytes().to_vec()
}

/// A registry box, told apart by name length alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryBox {
    PoolId(u64),
    Mapping { paired_asset_id: u64 },
    Unknown,
}

#[must_use]
pub fn classify_registry_box(name: &[u8]) -> RegistryBox {
    match name.len() {
        POOL_ID_BOX_LENGTH => decode_u64(name, 1, "pool id box")
            .map_or(RegistryBox::Unknown, RegistryBox::PoolId),
        MAPPING_BOX_LENGTH => decode_u64(name, 0, "mapping box").map_or(RegistryBox::Unknown, |id| {
            RegistryBox::Mapping {
                paired_asset_id: id,
            }
        }),
        _ => RegistryBox::Unknown,
    }
}

/// Decodes a mapping box value.
///
/// # Errors
/// [`DecodeError::Length`] unless the value is 16 bytes.
pub fn decode_mapping(
    paired_asset_id: u64,
    value: &[u8],
) -> std::result::Result<ContractMapping, DecodeError> {
    if value.len() != MAPPING_VALUE_LENGTH {
        return Err(DecodeError::Length {
            what: "mapping box",
            expected: MAPPING_VALUE_LENGTH,
            found: value.len(),
        });
    }
    Ok(ContractMapping {
        paired_asset_id,
        pool_token_id: decode_u64(value, 0, "mapping box")?,
        pool_app_id: decode_u64(value, 8, "mapping box")?,
    })
}

/// Whether `user` can currently hold `asset_id`.
///
/// # Errors
/// Transport failures.
pub async fn is_opted_in(
    transport: &dyn LedgerTransport,
    user: &Address,
    asset_id: u64,
) -> Result<bool> {
    Ok(transport.account_information(user).await?.holds(asset_id))
}

/// Looks up the router inbox account holding assets on `user`'s behalf.
///
/// Absent on any failure: a missing box, a transport error or a malformed
/// value all mean no extra account reference is needed.
pub async fn router_reference(
    transport: &dyn LedgerTransport,
    router_app_id: u64,
    user: &Address,
) -> Option<Address> {
    match transport
        .application_box(router_app_id, &router_box_name(user))
        .await
    {
        Ok(value) => match Address::from_slice(&value) {
            Ok(address) => Some(address),
            Err(e) => {
                debug!(user = %user, error = %e, "Router box is not an address");
                None
            }
        },
        Err(e) => {
            debug!(user = %user, router_app_id, error = %e, "No router box");
            None
        }
    }
}

/// References and fee of one contract call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallResources {
    pub apps: Vec<u64>,
    pub assets: Vec<u64>,
    pub accounts: Vec<Address>,
    pub boxes: Vec<BoxReference>,
    pub fee: FeeSpec,
}

impl Default for CallResources {
    fn default() -> Self {
        Self {
            apps: Vec::new(),
            assets: Vec::new(),
            accounts: Vec::new(),
            boxes: Vec::new(),
            fee: FeeSpec::Suggested,
        }
    }
}

impl CallResources {
    /// Attaches these references to `call`.
    #[must_use]
    pub fn apply(self, call: ApplicationCall) -> (ApplicationCall, FeeSpec) {
        let call = call
            .with_apps(self.apps)
            .with_assets(self.assets)
            .with_accounts(self.accounts)
            .with_boxes(self.boxes);
        (call, self.fee)
    }
}

/// Mint and redeem touch the liquidity pool and both assets.
#[must_use]
pub fn liquidity_resources(state: &ContractState, fee: FeeSpec) -> CallResources {
    CallResources {
        apps: vec![state.tinyman_app_id],
        assets: vec![state.asa_id(), state.lst_id()],
        accounts: vec![state.lp_id],
        fee,
        ..Default::default()
    }
}

#[must_use]
pub fn protest_resources(user: &Address) -> CallResources {
    CallResources {
        boxes: vec![BoxReference::own(protest_box_name(user))],
        ..Default::default()
    }
}

#[must_use]
pub fn unprotest_resources(lst_id: u64, user: &Address) -> CallResources {
    CallResources {
        assets: vec![lst_id],
        boxes: vec![BoxReference::own(protest_box_name(user))],
        fee: UNPROTEST_FEE,
        ..Default::default()
    }
}

/// Returning or dissolving stake on behalf of `user` may route through the
/// router's inbox for that user.
#[must_use]
pub fn on_behalf_resources(
    arc59_app_id: u64,
    asset_id: u64,
    user: &Address,
    router: Option<Address>,
    fee: FeeSpec,
) -> CallResources {
    let mut accounts = vec![*user];
    accounts.extend(router);
    CallResources {
        apps: vec![arc59_app_id],
        assets: vec![asset_id],
        accounts,
        boxes: vec![
            BoxReference::own(protest_box_name(user)),
            BoxReference::foreign(arc59_app_id, router_box_name(user)),
        ],
        fee,
    }
}

#[must_use]
pub fn registry_assignment_resources(paired_asset_id: u64, pool_app_id: u64) -> CallResources {
    CallResources {
        apps: vec![pool_app_id],
        boxes: vec![
            BoxReference::own(mapping_box_name(paired_asset_id)),
            BoxReference::own(pool_id_box_name(pool_app_id)),
        ],
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::mock::MockLedger;

    #[test]
    fn test_registry_boxes_are_classified_by_length() {
        let mut pool_box = vec![POOL_ID_BOX_TAG];
        pool_box.extend_from_slice(&2_933_409_454u64.to_be_bytes());
        assert_eq!(
            classify_registry_box(&pool_box),
            RegistryBox::PoolId(2_933_409_454)
        );
        assert_eq!(
            classify_registry_box(&31_566_704u64.to_be_bytes()),
            RegistryBox::Mapping {
                paired_asset_id: 31_566_704
            }
        );
        assert_eq!(classify_registry_box(&[1, 2, 3]), RegistryBox::Unknown);
    }

    #[test]
    fn test_eight_byte_box_is_never_a_pool_id() {
        let name = pool_id_box_name(5);
        assert!(matches!(
            classify_registry_box(&name[1..]),
            RegistryBox::Mapping { .. }
        ));
    }

    #[test]
    fn test_decode_mapping_value() {
        let mut value = 20u64.to_be_bytes().to_vec();
        value.extend_from_slice(&10u64.to_be_bytes());
        assert_eq!(
            decode_mapping(30, &value).unwrap(),
            ContractMapping {
                paired_asset_id: 30,
                pool_app_id: 10,
                pool_token_id: 20
            }
        );
        assert!(decode_mapping(30, &value[..15]).is_err());
    }

    #[test]
    fn test_user_box_names_are_tagged() {
        let user = Address::new([8u8; 32]);
        let protest = protest_box_name(&user);
        let router = router_box_name(&user);
        assert_eq!(protest.len(), 33);
        assert_eq!(protest[0], PROTEST_BOX_TAG);
        assert_eq!(router[0], ROUTER_BOX_TAG);
        assert_eq!(&protest[1..], &router[1..]);
    }

    #[test]
    fn test_fee_policy() {
        assert_eq!(dissolve_fee(true), FeeSpec::Static(3_000));
        assert_eq!(dissolve_fee(false), FeeSpec::Static(1_000));
        assert_eq!(keyreg_online_fee(true), FeeSpec::Static(2_000));
        assert_eq!(keyreg_online_fee(false), FeeSpec::Static(1_000));
        assert_eq!(batch_budget(LISTING_BUDGET_PER_APP, 32), 170_016);
        assert_eq!(batch_budget(LISTING_BUDGET_PER_APP, 1_000), MAX_EXTRA_BUDGET);
    }

    #[test]
    fn test_on_behalf_resources_reference_router() {
        let user = Address::new([1u8; 32]);
        let inbox = Address::new([2u8; 32]);
        let with = on_behalf_resources(99, 5, &user, Some(inbox), ADMIN_UNPROTEST_FEE);
        assert_eq!(with.accounts, vec![user, inbox]);
        assert_eq!(with.boxes[1].app_id, 99);
        let without = on_behalf_resources(99, 5, &user, None, ADMIN_UNPROTEST_FEE);
        assert_eq!(without.accounts, vec![user]);
    }

    #[tokio::test]
    async fn test_router_reference_found() {
        let user = Address::new([1u8; 32]);
        let inbox = Address::new([2u8; 32]);
        let ledger = MockLedger::new().with_box(
            99,
            router_box_name(&user),
            inbox.public_key().to_vec(),
        );
        assert_eq!(router_reference(&ledger, 99, &user).await, Some(inbox));
    }

    #[tokio::test]
    async fn test_router_reference_failures_are_absorbed() {
        let user = Address::new([1u8; 32]);
        let ledger = MockLedger::new().with_box(99, router_box_name(&user), vec![1, 2, 3]);
        assert_eq!(router_reference(&ledger, 99, &user).await, None);
        assert_eq!(router_reference(&ledger, 100, &user).await, None);
    }

    #[tokio::test]
    async fn test_opt_in_reflects_holdings() {
        let user = Address::new([1u8; 32]);
        let ledger = MockLedger::new().with_holding(user, 7, 0);
        assert!(is_opted_in(&ledger, &user, 7).await.unwrap());
        assert!(!is_opted_in(&ledger, &user, 8).await.unwrap());
    }
}
