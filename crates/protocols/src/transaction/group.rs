//! Atomic group id derivation and assignment.

use super::encoding::{MsgMap, MsgValue, hash_with_prefix, to_bytes};
use super::{MAX_GROUP_SIZE, Transaction};
use crate::error::{Result, ValidationError};

/// SHA-512/256 over `TG ‖ msgpack{txlist: [raw transaction ids]}`.
///
/// # Errors
/// Encoding failures of any member.
pub fn compute_group_id(txns: &[Transaction]) -> Result<[u8; 32]> {
    let mut ids = Vec::with_capacity(txns.len());
    for txn in txns {
        ids.push(MsgValue::Bin(txn.raw_id()?.to_vec()));
    }
    let mut map = MsgMap::new();
    map.array("txlist", ids);
    Ok(hash_with_prefix(b"TG", &to_bytes(&map)?))
}

/// Binds `txns` into one atomic group, in the given order.
///
/// # Errors
/// [`ValidationError::EmptyGroup`], [`ValidationError::GroupTooLarge`], or
/// [`ValidationError::AlreadyGrouped`] when any member already carries a
/// group id; grouping is never reapplied.
pub fn assign_group(mut txns: Vec<Transaction>) -> Result<Vec<Transaction>> {
    if txns.is_empty() {
        return Err(ValidationError::EmptyGroup.into());
    }
    if txns.len() > MAX_GROUP_SIZE {
        return Err(ValidationError::GroupTooLarge(txns.len()).into());
    }
    if let Some(index) = txns.iter().position(|t| t.group.is_some()) {
        return Err(ValidationError::AlreadyGrouped { index }.into());
    }

    let group = compute_group_id(&txns)?;
    for txn in &mut txns {
        txn.group = Some(group);
    }
    Ok(txns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DualStakeError;
    use crate::transaction::GroupBuilder;
    use crate::transaction::tests::params;
    use dualstake_domain::Address;

    fn ungrouped(count: u64) -> Vec<Transaction> {
        let sender = Address::new([3u8; 32]);
        let mut group = GroupBuilder::new(params());
        for amount in 1..=count {
            group.payment(sender, sender, amount);
        }
        group
            .build()
            .unwrap()
            .into_iter()
            .map(|mut t| {
                t.group = None;
                t
            })
            .collect()
    }

    #[test]
    fn test_all_members_share_group_id() {
        let txns = assign_group(ungrouped(3)).unwrap();
        let first = txns[0].group.unwrap();
        assert!(txns.iter().all(|t| t.group == Some(first)));
    }

    #[test]
    fn test_group_id_depends_on_order() {
        let txns = ungrouped(2);
        let mut swapped = txns.clone();
        swapped.swap(0, 1);
        assert_ne!(
            compute_group_id(&txns).unwrap(),
            compute_group_id(&swapped).unwrap()
        );
    }

    #[test]
    fn test_regrouping_is_rejected() {
        let txns = assign_group(ungrouped(2)).unwrap();
        let err = assign_group(txns).unwrap_err();
        assert!(matches!(
            err,
            DualStakeError::Validation(ValidationError::AlreadyGrouped { index: 0 })
        ));
    }

    #[test]
    fn test_group_size_limits() {
        assert!(matches!(
            assign_group(Vec::new()),
            Err(DualStakeError::Validation(ValidationError::EmptyGroup))
        ));
        assert!(matches!(
            assign_group(ungrouped(16)),
            Ok(txns) if txns.len() == 16
        ));
        let mut oversized = ungrouped(16);
        oversized.extend(ungrouped(1));
        assert!(matches!(
            assign_group(oversized),
            Err(DualStakeError::Validation(ValidationError::GroupTooLarge(17)))
        ));
    }
}
