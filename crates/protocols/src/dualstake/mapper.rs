//! Builds domain records from decoded tuples and raw global state.
//!
//! Every function here is pure: it reads its inputs and returns a new record.

use crate::codec::blob::{decode_contract_upgrade, decode_fee_update};
use crate::codec::layout::{DecodedRecord, Field, FieldKind, TupleLayout};
use crate::error::DecodeError;
use crate::rpc::GlobalState;
use dualstake_domain::{Address, ContractListing, ContractState, OracleQuote, PriceAndTvl};

/// Return tuple of `get_contract_listing`, also logged once per app by the
/// registry's batch listing call.
pub const LISTING_LAYOUT: TupleLayout = TupleLayout {
    name: "ContractListing",
    fields: &[
        Field::new("rate", FieldKind::Uint64),
        Field::new("algo_balance", FieldKind::Uint64),
        Field::new("asa_balance", FieldKind::Uint64),
        Field::new("staked", FieldKind::Uint64),
        Field::new("lst_id", FieldKind::Uint64),
        Field::new("lst_name", FieldKind::String),
        Field::new("asa_id", FieldKind::Uint64),
        Field::new("asa_name", FieldKind::String),
        Field::new("asa_unit_name", FieldKind::String),
        Field::new("asa_decimals", FieldKind::Uint64),
        Field::new("need_swap", FieldKind::Bool),
        Field::new("incentive_eligible", FieldKind::Bool),
        Field::new("is_online", FieldKind::Bool),
        Field::new("upgrading", FieldKind::Bool),
        Field::new("user_protesting_stake", FieldKind::Uint64),
    ],
};

/// One log line of the oracle's `log_prices_and_tvl`.
pub const PRICE_AND_TVL_LAYOUT: TupleLayout = TupleLayout {
    name: "PriceAndTvl",
    fields: &[
        Field::new("dualstake_unit_price_in_algo", FieldKind::Uint64),
        Field::new("algo_tvl_in_algo", FieldKind::Uint64),
        Field::new("asa_tvl_in_algo", FieldKind::Uint64),
        Field::new("total_tvl_in_algo", FieldKind::Uint64),
    ],
};

/// Maps a decoded listing tuple onto a [`ContractListing`].
///
/// # Errors
/// Type mismatches or an `asa_decimals` value above 255.
pub fn build_listing(
    record: &DecodedRecord<'_>,
    round: u64,
    app_id: u64,
) -> Result<ContractListing, DecodeError> {
    Ok(ContractListing {
        round,
        app_id,
        rate: record.uint("rate")?,
        algo_balance: record.uint("algo_balance")?,
        asa_balance: record.uint("asa_balance")?,
        staked: record.uint("staked")?,
        lst_id: record.uint("lst_id")?,
        lst_name: record.string("lst_name")?,
        asa_id: record.uint("asa_id")?,
        asa_name: record.string("asa_name")?,
        asa_unit_name: record.string("asa_unit_name")?,
        asa_decimals: record.uint_u8("asa_decimals")?,
        need_swap: record.boolean("need_swap")?,
        incentive_eligible: record.boolean("incentive_eligible")?,
        is_online: record.boolean("is_online")?,
        upgrading: record.boolean("upgrading")?,
        user_protesting_stake: record.uint("user_protesting_stake")?,
    })
}

/// Decodes raw listing bytes, from a return value or a batch log line.
///
/// # Errors
/// Any codec or mapping error.
pub fn decode_listing(
    bytes: &[u8],
    round: u64,
    app_id: u64,
) -> Result<ContractListing, DecodeError> {
    build_listing(&LISTING_LAYOUT.decode(bytes)?, round, app_id)
}

/// Decodes one oracle log line.
///
/// # Errors
/// Any codec error.
pub fn decode_oracle_quote(bytes: &[u8]) -> Result<OracleQuote, DecodeError> {
    let record = PRICE_AND_TVL_LAYOUT.decode(bytes)?;
    Ok(OracleQuote {
        dualstake_unit_price_in_algo: record.uint("dualstake_unit_price_in_algo")?,
        algo_tvl_in_algo: record.uint("algo_tvl_in_algo")?,
        asa_tvl_in_algo: record.uint("asa_tvl_in_algo")?,
        total_tvl_in_algo: record.uint("total_tvl_in_algo")?,
    })
}

/// Joins an oracle quote with the listing it belongs to.
#[must_use]
pub fn build_price_and_tvl(listing: &ContractListing, quote: OracleQuote) -> PriceAndTvl {
    PriceAndTvl {
        app_id: listing.app_id,
        dualstake_asa_id: listing.lst_id,
        dualstake_name: listing.lst_name.clone(),
        paired_asa_id: listing.asa_id,
        paired_asa_unit_name: listing.asa_unit_name.clone(),
        quote,
    }
}

fn state_address(state: &GlobalState, key: &'static str) -> Result<Address, DecodeError> {
    Ok(Address::from_slice(state.require_bytes(key)?)?)
}

fn state_string(state: &GlobalState, key: &'static str) -> Result<String, DecodeError> {
    String::from_utf8(state.require_bytes(key)?.to_vec())
        .map_err(|_| DecodeError::Utf8 { what: key })
}

/// Merges a listing with the pool's global state.
///
/// Global state is authoritative for `asa_id`, `lst_id` and `staked`. Every
/// key must be present.
///
/// # Errors
/// [`DecodeError::MissingKey`] for an absent key, or any value decode error.
pub fn build_contract_state(
    state: &GlobalState,
    listing: ContractListing,
) -> Result<ContractState, DecodeError> {
    let mut listing = listing;
    listing.asa_id = state.require_uint("asa_id")?;
    listing.lst_id = state.require_uint("lst_id")?;
    listing.staked = state.require_uint("staked")?;

    Ok(ContractState {
        version: state.require_uint("version")?,
        platform_fees: state.require_uint("platform_fees")?,
        noderunner_fees: state.require_uint("noderunner_fees")?,
        platform_fee_bps: state.require_uint("platform_fee_bps")?,
        noderunner_fee_bps: state.require_uint("noderunner_fee_bps")?,
        admin_addr: state_address(state, "admin_addr")?,
        fee_admin_addr: state_address(state, "fee_admin_addr")?,
        noderunner_addr: state_address(state, "noderunner_addr")?,
        lp_type: state_string(state, "lp_type")?,
        lp_id: state_address(state, "lp_id")?,
        delay_optin: state.require_uint("delay_optin")? != 0,
        fee_update: decode_fee_update(state.require_bytes("fee_update")?)?,
        contract_upgrade: decode_contract_upgrade(state.require_bytes("contract_upgrade")?)?,
        protest_count: state.require_uint("protest_count")?,
        protest_sum: state.require_uint("protest_sum")?,
        tinyman_app_id: state.require_uint("tm2_app_id")?,
        arc59_app_id: state.require_uint("arc59_app_id")?,
        max_balance: state.require_uint("max_balance")?,
        rate_precision: state.require_uint("rate_precision")?,
        upgrade_period: state.require_uint("upgrade_period")?,
        fee_update_period: state.require_uint("fee_update_period")?,
        fee_update_max_delta: state.require_uint("fee_update_max_delta")?,
        listing,
    })
}
