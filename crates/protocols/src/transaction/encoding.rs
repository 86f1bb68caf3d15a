//! Canonical msgpack encoding.
//!
//! Map keys are written in sorted order and zero-valued fields are left out,
//! matching the bytes the ledger hashes for transaction and group ids.

use super::{ApplicationCall, StateSchema, Transaction, TransactionKind};
use crate::error::{EncodeError, Result};
use crate::rpc::SimulateRequest;
use rmp::encode;
use sha2::{Digest, Sha512_256};
use std::collections::BTreeMap;

/// A msgpack value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MsgValue {
    Uint(u64),
    Bool(bool),
    Str(String),
    Bin(Vec<u8>),
    Array(Vec<MsgValue>),
    Map(MsgMap),
}

/// Map with canonical key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MsgMap(BTreeMap<&'static str, MsgValue>);

impl MsgMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts unconditionally.
    pub fn put(&mut self, key: &'static str, value: MsgValue) -> &mut Self {
        self.0.insert(key, value);
        self
    }

    pub fn uint(&mut self, key: &'static str, value: u64) -> &mut Self {
        if value != 0 {
            self.put(key, MsgValue::Uint(value));
        }
        self
    }

    pub fn flag(&mut self, key: &'static str, value: bool) -> &mut Self {
        if value {
            self.put(key, MsgValue::Bool(true));
        }
        self
    }

    pub fn str(&mut self, key: &'static str, value: &str) -> &mut Self {
        if !value.is_empty() {
            self.put(key, MsgValue::Str(value.to_string()));
        }
        self
    }

    pub fn bin(&mut self, key: &'static str, value: &[u8]) -> &mut Self {
        if !value.is_empty() {
            self.put(key, MsgValue::Bin(value.to_vec()));
        }
        self
    }

    /// Inserts a 32-byte value unless it is all zeroes.
    pub fn bin32(&mut self, key: &'static str, value: &[u8; 32]) -> &mut Self {
        if value.iter().any(|b| *b != 0) {
            self.put(key, MsgValue::Bin(value.to_vec()));
        }
        self
    }

    pub fn array(&mut self, key: &'static str, items: Vec<MsgValue>) -> &mut Self {
        if !items.is_empty() {
            self.put(key, MsgValue::Array(items));
        }
        self
    }

    pub fn map(&mut self, key: &'static str, map: MsgMap) -> &mut Self {
        if !map.0.is_empty() {
            self.put(key, MsgValue::Map(map));
        }
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn write_value(out: &mut Vec<u8>, value: &MsgValue) -> std::result::Result<(), EncodeError> {
    match value {
        MsgValue::Uint(v) => {
            encode::write_uint(out, *v)?;
        }
        MsgValue::Bool(b) => encode::write_bool(out, *b)?,
        MsgValue::Str(s) => encode::write_str(out, s)?,
        MsgValue::Bin(b) => encode::write_bin(out, b)?,
        MsgValue::Array(items) => {
            encode::write_array_len(out, u32_len(items.len())?)?;
            for item in items {
                write_value(out, item)?;
            }
        }
        MsgValue::Map(map) => write_map(out, map)?,
    }
    Ok(())
}

fn write_map(out: &mut Vec<u8>, map: &MsgMap) -> std::result::Result<(), EncodeError> {
    encode::write_map_len(out, u32_len(map.0.len())?)?;
    for (key, value) in &map.0 {
        encode::write_str(out, key)?;
        write_value(out, value)?;
    }
    Ok(())
}

fn u32_len(len: usize) -> std::result::Result<u32, EncodeError> {
    u32::try_from(len).map_err(|_| EncodeError(format!("collection of {len} items")))
}

/// Serializes a map.
///
/// # Errors
/// Writer failures only.
pub fn to_bytes(map: &MsgMap) -> std::result::Result<Vec<u8>, EncodeError> {
    let mut out = Vec::new();
    write_map(&mut out, map)?;
    Ok(out)
}

/// SHA-512/256 over `prefix ‖ bytes`.
#[must_use]
pub fn hash_with_prefix(prefix: &[u8], bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha512_256::new();
    hasher.update(prefix);
    hasher.update(bytes);
    hasher.finalize().into()
}

fn schema_map(schema: StateSchema) -> MsgMap {
    let mut map = MsgMap::new();
    map.uint("nbs", schema.num_byte_slices)
        .uint("nui", schema.num_uints);
    map
}

fn app_call_fields(map: &mut MsgMap, call: &ApplicationCall) -> Result<()> {
    let mut boxes = Vec::with_capacity(call.boxes.len());
    for reference in &call.boxes {
        let mut entry = MsgMap::new();
        entry
            .uint("i", call.box_app_index(reference.app_id)?)
            .bin("n", &reference.name);
        boxes.push(MsgValue::Map(entry));
    }

    map.uint("apid", call.app_id)
        .uint("apan", call.on_complete.code())
        .array(
            "apaa",
            call.args.iter().cloned().map(MsgValue::Bin).collect(),
        )
        .array(
            "apat",
            call.accounts
                .iter()
                .map(|a| MsgValue::Bin(a.public_key().to_vec()))
                .collect(),
        )
        .array(
            "apfa",
            call.foreign_apps.iter().copied().map(MsgValue::Uint).collect(),
        )
        .array(
            "apas",
            call.foreign_assets
                .iter()
                .copied()
                .map(MsgValue::Uint)
                .collect(),
        )
        .array("apbx", boxes)
        .bin("apap", &call.approval_program)
        .bin("apsu", &call.clear_program)
        .map("apgs", schema_map(call.global_schema))
        .map("apls", schema_map(call.local_schema))
        .uint("apep", call.extra_pages);
    Ok(())
}

/// Canonical field map of a transaction.
///
/// # Errors
/// [`crate::error::ValidationError::UnknownBoxApp`] for unresolvable boxes.
pub fn transaction_map(txn: &Transaction) -> Result<MsgMap> {
    let mut map = MsgMap::new();
    map.uint("fee", txn.fee)
        .uint("fv", txn.first_valid)
        .str("gen", &txn.genesis_id)
        .bin32("gh", &txn.genesis_hash)
        .uint("lv", txn.last_valid)
        .bin("note", &txn.note)
        .bin32("snd", txn.sender.public_key())
        .str("type", txn.kind.type_tag());
    if let Some(group) = &txn.group {
        map.bin32("grp", group);
    }
    if let Some(lease) = &txn.lease {
        map.bin32("lx", lease);
    }

    match &txn.kind {
        TransactionKind::Payment { receiver, amount } => {
            map.uint("amt", *amount)
                .bin32("rcv", receiver.public_key());
        }
        TransactionKind::AssetTransfer {
            asset_id,
            receiver,
            amount,
        } => {
            map.uint("aamt", *amount)
                .bin32("arcv", receiver.public_key())
                .uint("xaid", *asset_id);
        }
        TransactionKind::ApplicationCall(call) => app_call_fields(&mut map, call)?,
    }
    Ok(map)
}

/// Canonical msgpack bytes of a transaction.
///
/// # Errors
/// See [`transaction_map`].
pub fn encode_transaction(txn: &Transaction) -> Result<Vec<u8>> {
    Ok(to_bytes(&transaction_map(txn)?)?)
}

/// Body of a simulate request: one group of unsigned transactions.
///
/// # Errors
/// See [`transaction_map`].
pub fn encode_simulate_request(txns: &[Transaction], request: &SimulateRequest) -> Result<Vec<u8>> {
    let mut signed = Vec::with_capacity(txns.len());
    for txn in txns {
        let mut wrapper = MsgMap::new();
        wrapper.put("txn", MsgValue::Map(transaction_map(txn)?));
        signed.push(MsgValue::Map(wrapper));
    }
    let mut group = MsgMap::new();
    group.array("txns", signed);

    let mut body = MsgMap::new();
    body.flag("allow-empty-signatures", request.allow_empty_signatures)
        .flag("allow-more-logging", request.allow_more_logging)
        .flag("allow-unnamed-resources", request.allow_unnamed_resources)
        .uint("extra-opcode-budget", request.extra_opcode_budget)
        .flag("fix-signers", request.fix_signers)
        .array("txn-groups", vec![MsgValue::Map(group)]);
    Ok(to_bytes(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::tests::params;
    use crate::transaction::{BoxReference, FeeSpec, GroupBuilder};
    use dualstake_domain::Address;

    #[test]
    fn test_keys_are_sorted_and_zero_fields_omitted() {
        let mut map = MsgMap::new();
        map.uint("b", 1).uint("a", 0).str("c", "").bin("d", &[1]);
        let bytes = to_bytes(&map).unwrap();
        // fixmap(2), "b", 1, "d", bin8 len 1
        assert_eq!(bytes, vec![0x82, 0xa1, b'b', 0x01, 0xa1, b'd', 0xc4, 0x01, 0x01]);
    }

    #[test]
    fn test_uint_uses_smallest_width() {
        let mut out = Vec::new();
        write_value(&mut out, &MsgValue::Uint(300)).unwrap();
        assert_eq!(out, vec![0xcd, 0x01, 0x2c]);
    }

    #[test]
    fn test_payment_field_layout() {
        let sender = Address::new([1u8; 32]);
        let mut group = GroupBuilder::new(params());
        group.payment(sender, Address::new([2u8; 32]), 5);
        let txn = group.build().unwrap().remove(0);
        let map = transaction_map(&txn).unwrap();
        let keys: Vec<&str> = map.0.keys().copied().collect();
        assert_eq!(
            keys,
            vec!["amt", "fee", "fv", "gen", "gh", "grp", "lv", "rcv", "snd", "type"]
        );
    }

    #[test]
    fn test_box_reference_translated_to_index() {
        let sender = Address::new([1u8; 32]);
        let call = crate::transaction::ApplicationCall::new(5)
            .with_apps([9])
            .with_boxes([BoxReference::foreign(77, vec![1, 2])]);
        let mut group = GroupBuilder::new(params());
        group.app_call(sender, call, FeeSpec::Suggested);
        let txn = group.build().unwrap().remove(0);
        let map = transaction_map(&txn).unwrap();
        let Some(MsgValue::Array(boxes)) = map.0.get("apbx") else {
            panic!("missing box array");
        };
        let MsgValue::Map(entry) = &boxes[0] else {
            panic!("box entry is not a map");
        };
        assert_eq!(entry.0.get("i"), Some(&MsgValue::Uint(2)));
    }

    #[test]
    fn test_transaction_id_is_base32() {
        let sender = Address::new([1u8; 32]);
        let mut group = GroupBuilder::new(params());
        group.payment(sender, sender, 1);
        let txn = group.build().unwrap().remove(0);
        let id = txn.id().unwrap();
        assert_eq!(id.len(), 52);
        assert!(id.chars().all(|c| c.is_ascii_uppercase() || ('2'..='7').contains(&c)));
    }
}
