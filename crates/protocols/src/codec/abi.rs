//! ARC-4 ABI encoding.
//!
//! Covers the types the dualSTAKE contracts exchange: `uint64`, `bool`,
//! `string`, `byte[]`, `byte[N]`, `address`, `uint64[]` and tuples of those.
//! Dynamic members of a tuple are stored after the head and referenced by a
//! 2-byte offset; consecutive `bool` members share a byte, first bool in the
//! most significant bit.
//!
//! Decoding is strict: every byte must be accounted for.

use crate::error::{DecodeError, ValidationError};
use dualstake_domain::Address;
use sha2::{Digest, Sha512_256};

/// Prefix of the log line carrying a method's return value.
pub const RETURN_PREFIX: [u8; 4] = [0x15, 0x1f, 0x7c, 0x75];

/// Length of a method selector.
pub const SELECTOR_LENGTH: usize = 4;

const BOOL_TRUE: u8 = 0x80;

/// An ABI type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiType {
    Uint64,
    Bool,
    String,
    Bytes,
    StaticBytes(usize),
    Address,
    Uint64Array,
    Tuple(Vec<AbiType>),
}

impl AbiType {
    /// Whether values of this type are stored in a tuple's tail.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        match self {
            AbiType::String | AbiType::Bytes | AbiType::Uint64Array => true,
            AbiType::Tuple(members) => members.iter().any(AbiType::is_dynamic),
            _ => false,
        }
    }

    /// Canonical type string used in method signatures.
    #[must_use]
    pub fn signature(&self) -> String {
        match self {
            AbiType::Uint64 => "uint64".to_string(),
            AbiType::Bool => "bool".to_string(),
            AbiType::String => "string".to_string(),
            AbiType::Bytes => "byte[]".to_string(),
            AbiType::StaticBytes(n) => format!("byte[{n}]"),
            AbiType::Address => "address".to_string(),
            AbiType::Uint64Array => "uint64[]".to_string(),
            AbiType::Tuple(members) => {
                let inner: Vec<String> = members.iter().map(AbiType::signature).collect();
                format!("({})", inner.join(","))
            }
        }
    }

    /// Encoded size of a static type outside of a tuple.
    fn static_size(&self) -> usize {
        match self {
            AbiType::Uint64 => 8,
            AbiType::Bool => 1,
            AbiType::StaticBytes(n) => *n,
            AbiType::Address => 32,
            AbiType::Tuple(members) => tuple_head_size(members),
            AbiType::String | AbiType::Bytes | AbiType::Uint64Array => 0,
        }
    }
}

/// A decoded or to-be-encoded ABI value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiValue {
    Uint64(u64),
    Bool(bool),
    String(String),
    Bytes(Vec<u8>),
    StaticBytes(Vec<u8>),
    Address(Address),
    Uint64Array(Vec<u64>),
    Tuple(Vec<AbiValue>),
}

impl AbiValue {
    /// Type of this value.
    #[must_use]
    pub fn abi_type(&self) -> AbiType {
        match self {
            AbiValue::Uint64(_) => AbiType::Uint64,
            AbiValue::Bool(_) => AbiType::Bool,
            AbiValue::String(_) => AbiType::String,
            AbiValue::Bytes(_) => AbiType::Bytes,
            AbiValue::StaticBytes(b) => AbiType::StaticBytes(b.len()),
            AbiValue::Address(_) => AbiType::Address,
            AbiValue::Uint64Array(_) => AbiType::Uint64Array,
            AbiValue::Tuple(members) => {
                AbiType::Tuple(members.iter().map(AbiValue::abi_type).collect())
            }
        }
    }
}

/// First four bytes of SHA-512/256 over a method signature.
#[must_use]
pub fn method_selector(signature: &str) -> [u8; SELECTOR_LENGTH] {
    let digest = Sha512_256::digest(signature.as_bytes());
    let mut selector = [0u8; SELECTOR_LENGTH];
    selector.copy_from_slice(&digest[..SELECTOR_LENGTH]);
    selector
}

/// Extracts the return value from a call's logs.
///
/// The value is the last log line, which must start with [`RETURN_PREFIX`].
///
/// # Errors
/// Returns [`DecodeError::MissingReturn`] when no such line exists.
pub fn return_value(logs: &[Vec<u8>]) -> Result<&[u8], DecodeError> {
    logs.last()
        .and_then(|line| line.strip_prefix(&RETURN_PREFIX[..]))
        .ok_or(DecodeError::MissingReturn)
}

fn length_prefix(what: &'static str, len: usize) -> Result<[u8; 2], ValidationError> {
    u16::try_from(len)
        .map(u16::to_be_bytes)
        .map_err(|_| ValidationError::TooLong { what, length: len })
}

/// Encodes a single value as it appears in an application argument.
///
/// # Errors
/// Returns [`ValidationError::TooLong`] when a dynamic value exceeds the
/// 2-byte length prefix.
pub fn encode(value: &AbiValue) -> Result<Vec<u8>, ValidationError> {
    match value {
        AbiValue::Uint64(v) => Ok(v.to_be_bytes().to_vec()),
        AbiValue::Bool(b) => Ok(vec![if *b { BOOL_TRUE } else { 0 }]),
        AbiValue::String(s) => encode_dynamic_bytes("string", s.as_bytes()),
        AbiValue::Bytes(b) => encode_dynamic_bytes("byte[]", b),
        AbiValue::StaticBytes(b) => Ok(b.clone()),
        AbiValue::Address(a) => Ok(a.public_key().to_vec()),
        AbiValue::Uint64Array(items) => {
            let mut out = Vec::with_capacity(2 + items.len() * 8);
            out.extend_from_slice(&length_prefix("uint64[]", items.len())?);
            for item in items {
                out.extend_from_slice(&item.to_be_bytes());
            }
            Ok(out)
        }
        AbiValue::Tuple(members) => encode_tuple(members),
    }
}

fn encode_dynamic_bytes(what: &'static str, bytes: &[u8]) -> Result<Vec<u8>, ValidationError> {
    let mut out = Vec::with_capacity(2 + bytes.len());
    out.extend_from_slice(&length_prefix(what, bytes.len())?);
    out.extend_from_slice(bytes);
    Ok(out)
}

/// Encodes a tuple.
///
/// # Errors
/// Returns [`ValidationError::TooLong`] when the encoding outgrows 2-byte offsets.
pub fn encode_tuple(members: &[AbiValue]) -> Result<Vec<u8>, ValidationError> {
    let mut heads: Vec<Vec<u8>> = Vec::with_capacity(members.len());
    let mut tails: Vec<Option<Vec<u8>>> = Vec::with_capacity(members.len());

    let mut i = 0;
    while i < members.len() {
        if let AbiValue::Bool(_) = members[i] {
            let mut byte = 0u8;
            let mut run = 0;
            while run < 8 && i + run < members.len() {
                match members[i + run] {
                    AbiValue::Bool(b) => {
                        if b {
                            byte |= BOOL_TRUE >> run;
                        }
                        run += 1;
                    }
                    _ => break,
                }
            }
            heads.push(vec![byte]);
            tails.push(None);
            i += run;
            continue;
        }

        let member = &members[i];
        if member.abi_type().is_dynamic() {
            heads.push(vec![0, 0]);
            tails.push(Some(encode(member)?));
        } else {
            heads.push(encode(member)?);
            tails.push(None);
        }
        i += 1;
    }

    let head_len: usize = heads.iter().map(Vec::len).sum();
    let mut offset = head_len;
    for (head, tail) in heads.iter_mut().zip(&tails) {
        if let Some(tail) = tail {
            head.copy_from_slice(&length_prefix("tuple", offset)?);
            offset += tail.len();
        }
    }

    let mut out = Vec::with_capacity(offset);
    for head in &heads {
        out.extend_from_slice(head);
    }
    for tail in tails.into_iter().flatten() {
        out.extend_from_slice(&tail);
    }
    Ok(out)
}

fn tuple_head_size(members: &[AbiType]) -> usize {
    let mut size = 0;
    let mut i = 0;
    while i < members.len() {
        if members[i] == AbiType::Bool {
            let run = bool_run(members, i);
            size += 1;
            i += run;
            continue;
        }
        size += if members[i].is_dynamic() {
            2
        } else {
            members[i].static_size()
        };
        i += 1;
    }
    size
}

fn bool_run(members: &[AbiType], start: usize) -> usize {
    members[start..]
        .iter()
        .take(8)
        .take_while(|t| **t == AbiType::Bool)
        .count()
}

fn take<'a>(
    bytes: &'a [u8],
    offset: usize,
    len: usize,
    what: &'static str,
) -> Result<&'a [u8], DecodeError> {
    bytes
        .get(offset..offset + len)
        .ok_or(DecodeError::Truncated {
            what,
            offset,
            needed: len,
            available: bytes.len().saturating_sub(offset),
        })
}

fn read_u16(bytes: &[u8], offset: usize, what: &'static str) -> Result<usize, DecodeError> {
    let raw = take(bytes, offset, 2, what)?;
    Ok(usize::from(u16::from_be_bytes([raw[0], raw[1]])))
}

/// Decodes a whole byte string as one value of type `ty`.
///
/// # Errors
/// Returns a [`DecodeError`] for short input, trailing bytes, bad offsets,
/// invalid bools or invalid UTF-8.
pub fn decode(ty: &AbiType, bytes: &[u8], what: &'static str) -> Result<AbiValue, DecodeError> {
    let exact = |expected: usize| -> Result<(), DecodeError> {
        if bytes.len() == expected {
            Ok(())
        } else {
            Err(DecodeError::Length {
                what,
                expected,
                found: bytes.len(),
            })
        }
    };

    match ty {
        AbiType::Uint64 => {
            exact(8)?;
            let mut raw = [0u8; 8];
            raw.copy_from_slice(bytes);
            Ok(AbiValue::Uint64(u64::from_be_bytes(raw)))
        }
        AbiType::Bool => {
            exact(1)?;
            match bytes[0] {
                BOOL_TRUE => Ok(AbiValue::Bool(true)),
                0 => Ok(AbiValue::Bool(false)),
                byte => Err(DecodeError::InvalidBool { what, byte }),
            }
        }
        AbiType::StaticBytes(n) => {
            exact(*n)?;
            Ok(AbiValue::StaticBytes(bytes.to_vec()))
        }
        AbiType::Address => {
            exact(32)?;
            Ok(AbiValue::Address(Address::from_slice(bytes)?))
        }
        AbiType::String | AbiType::Bytes => {
            let len = read_u16(bytes, 0, what)?;
            exact(2 + len)?;
            let body = bytes[2..].to_vec();
            if *ty == AbiType::String {
                String::from_utf8(body)
                    .map(AbiValue::String)
                    .map_err(|_| DecodeError::Utf8 { what })
            } else {
                Ok(AbiValue::Bytes(body))
            }
        }
        AbiType::Uint64Array => {
            let count = read_u16(bytes, 0, what)?;
            exact(2 + count * 8)?;
            let items = bytes[2..]
                .chunks_exact(8)
                .map(|c| {
                    let mut raw = [0u8; 8];
                    raw.copy_from_slice(c);
                    u64::from_be_bytes(raw)
                })
                .collect();
            Ok(AbiValue::Uint64Array(items))
        }
        AbiType::Tuple(members) => decode_tuple(members, bytes, what).map(AbiValue::Tuple),
    }
}

/// Decodes a tuple into its members, in declaration order.
///
/// # Errors
/// See [`decode`].
pub fn decode_tuple(
    members: &[AbiType],
    bytes: &[u8],
    what: &'static str,
) -> Result<Vec<AbiValue>, DecodeError> {
    let mut values: Vec<Option<AbiValue>> = vec![None; members.len()];
    let mut dynamic_slots: Vec<(usize, usize)> = Vec::new();
    let mut cursor = 0;

    let mut i = 0;
    while i < members.len() {
        let ty = &members[i];
        if *ty == AbiType::Bool {
            let run = bool_run(members, i);
            let byte = take(bytes, cursor, 1, what)?[0];
            for j in 0..run {
                values[i + j] = Some(AbiValue::Bool(byte & (BOOL_TRUE >> j) != 0));
            }
            cursor += 1;
            i += run;
            continue;
        }

        if ty.is_dynamic() {
            dynamic_slots.push((i, read_u16(bytes, cursor, what)?));
            cursor += 2;
        } else {
            let size = ty.static_size();
            let raw = take(bytes, cursor, size, what)?;
            values[i] = Some(decode(ty, raw, what)?);
            cursor += size;
        }
        i += 1;
    }

    if dynamic_slots.is_empty() {
        if bytes.len() != cursor {
            return Err(DecodeError::TrailingBytes {
                what,
                count: bytes.len().saturating_sub(cursor),
            });
        }
    } else {
        let mut expected_start = cursor;
        for (k, &(index, start)) in dynamic_slots.iter().enumerate() {
            let end = dynamic_slots
                .get(k + 1)
                .map_or(bytes.len(), |&(_, next)| next);
            if start != expected_start || end < start || end > bytes.len() {
                return Err(DecodeError::Offset { what, offset: start });
            }
            values[index] = Some(decode(&members[index], &bytes[start..end], what)?);
            expected_start = end;
        }
    }

    values
        .into_iter()
        .map(|v| v.ok_or(DecodeError::Offset { what, offset: cursor }))
        .collect()
}
