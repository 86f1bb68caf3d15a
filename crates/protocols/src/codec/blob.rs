//! Binary global-state blobs: queued fee updates and staged upgrades.
//!
//! Both blobs use the empty byte string for "nothing pending".

use super::uint::{decode_u64, decode_uint};
use crate::error::DecodeError;
use dualstake_domain::{ContractUpgradeState, FeeUpdateState, PageHash};
use dualstake_domain::value_objects::page_hash::PAGE_HASH_LENGTH;

/// Encoded size of a fee update.
pub const FEE_UPDATE_LENGTH: usize = 24;

/// Size of the upgrade timestamp prefix.
pub const UPGRADE_TIMESTAMP_LENGTH: usize = 4;

/// Decodes a fee update blob: timestamp, noderunner bps, platform bps.
///
/// # Errors
/// [`DecodeError::Length`] for any non-empty blob that is not 24 bytes.
pub fn decode_fee_update(bytes: &[u8]) -> Result<Option<FeeUpdateState>, DecodeError> {
    if bytes.is_empty() {
        return Ok(None);
    }
    if bytes.len() != FEE_UPDATE_LENGTH {
        return Err(DecodeError::Length {
            what: "fee_update",
            expected: FEE_UPDATE_LENGTH,
            found: bytes.len(),
        });
    }
    Ok(Some(FeeUpdateState {
        applicable_timestamp: decode_u64(bytes, 0, "fee_update")?,
        next_noderunner_fee_bps: decode_u64(bytes, 8, "fee_update")?,
        next_platform_fee_bps: decode_u64(bytes, 16, "fee_update")?,
    }))
}

#[must_use]
pub fn encode_fee_update(update: &FeeUpdateState) -> Vec<u8> {
    let mut out = Vec::with_capacity(FEE_UPDATE_LENGTH);
    out.extend_from_slice(&update.applicable_timestamp.to_be_bytes());
    out.extend_from_slice(&update.next_noderunner_fee_bps.to_be_bytes());
    out.extend_from_slice(&update.next_platform_fee_bps.to_be_bytes());
    out
}

/// Decodes a staged upgrade: a 4-byte timestamp then 32-byte page hashes.
///
/// # Errors
/// [`DecodeError::Truncated`] when the timestamp is incomplete,
/// [`DecodeError::Length`] when the hash area is not a multiple of 32 bytes.
pub fn decode_contract_upgrade(bytes: &[u8]) -> Result<Option<ContractUpgradeState>, DecodeError> {
    if bytes.is_empty() {
        return Ok(None);
    }
    let timestamp = decode_uint(bytes, 0, UPGRADE_TIMESTAMP_LENGTH, "contract_upgrade")?;
    let hashes = &bytes[UPGRADE_TIMESTAMP_LENGTH..];
    if hashes.len() % PAGE_HASH_LENGTH != 0 {
        return Err(DecodeError::Length {
            what: "contract_upgrade",
            expected: hashes.len().next_multiple_of(PAGE_HASH_LENGTH) + UPGRADE_TIMESTAMP_LENGTH,
            found: bytes.len(),
        });
    }
    let contract_page_hashes = hashes
        .chunks_exact(PAGE_HASH_LENGTH)
        .map(|chunk| {
            let mut hash = [0u8; PAGE_HASH_LENGTH];
            hash.copy_from_slice(chunk);
            PageHash(hash)
        })
        .collect();
    Ok(Some(ContractUpgradeState {
        // Four bytes always fit.
        applicable_timestamp: timestamp as u32,
        contract_page_hashes,
    }))
}

#[must_use]
pub fn encode_contract_upgrade(upgrade: &ContractUpgradeState) -> Vec<u8> {
    let mut out = Vec::with_capacity(
        UPGRADE_TIMESTAMP_LENGTH + upgrade.contract_page_hashes.len() * PAGE_HASH_LENGTH,
    );
    out.extend_from_slice(&upgrade.applicable_timestamp.to_be_bytes());
    for hash in &upgrade.contract_page_hashes {
        out.extend_from_slice(hash.as_bytes());
    }
    out
}
