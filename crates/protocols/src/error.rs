//! Error taxonomy for the protocol clients.
//!
//! Decode and validation errors are fatal and never retried. Transport errors
//! fail the request they belong to. Best-effort lookups do not appear here:
//! they return `Option` and absorb their own failures.

use dualstake_domain::AddressError;
use thiserror::Error;

/// Malformed or unexpected binary input from the ledger.
///
/// Always indicates a layout mismatch between this client and the deployed
/// contract version.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("{what}: expected {expected} bytes, found {found}")]
    Length {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("{what}: need {needed} bytes at offset {offset}, only {available} available")]
    Truncated {
        what: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("{what}: dynamic offset {offset} is out of range")]
    Offset { what: &'static str, offset: usize },
    #[error("{what}: {count} unexpected trailing bytes")]
    TrailingBytes { what: &'static str, count: usize },
    #[error("{layout}: expected {expected} fields, decoded {found}")]
    Arity {
        layout: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("{layout}.{field}: expected a {expected} value")]
    FieldType {
        layout: &'static str,
        field: &'static str,
        expected: &'static str,
    },
    #[error("{layout} has no field `{field}`")]
    UnknownField {
        layout: &'static str,
        field: &'static str,
    },
    #[error("{what}: invalid bool byte {byte:#04x}")]
    InvalidBool { what: &'static str, byte: u8 },
    #[error("{what}: string is not valid UTF-8")]
    Utf8 { what: &'static str },
    #[error("simulated call logged no return value")]
    MissingReturn,
    #[error("global state key `{0}` is missing")]
    MissingKey(&'static str),
    #[error("global state key `{key}` holds {found}, expected {expected}")]
    StateType {
        key: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    #[error("{field}: value {value} does not fit in {target}")]
    OutOfRange {
        field: &'static str,
        value: u64,
        target: &'static str,
    },
    #[error("invalid address: {0}")]
    Address(#[from] AddressError),
}

/// A caller-supplied argument violates a structural precondition.
///
/// Raised before anything is sent to the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{argument} {index} was expected to have length {expected}, but found {found} instead")]
    FixedLength {
        argument: &'static str,
        index: usize,
        expected: usize,
        found: usize,
    },
    #[error("{what} is {length} bytes, longer than the 65535 byte ABI limit")]
    TooLong { what: &'static str, length: usize },
    #[error("{operation} accepts at most {max} app ids per call, got {found}")]
    ChunkTooLarge {
        operation: &'static str,
        max: usize,
        found: usize,
    },
    #[error("transaction {index} already carries a group id")]
    AlreadyGrouped { index: usize },
    #[error("cannot group an empty transaction list")]
    EmptyGroup,
    #[error("group of {0} transactions exceeds the ledger maximum of 16")]
    GroupTooLarge(usize),
    #[error("box reference targets app {0}, which is not in the foreign apps array")]
    UnknownBoxApp(u64),
}

/// The ledger node or its simulation endpoint failed.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("node returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed node response: {0}")]
    Malformed(String),
    #[error("simulation failed: {0}")]
    Simulation(String),
}

/// Msgpack encoding failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("msgpack encoding failed: {0}")]
pub struct EncodeError(pub String);

impl From<std::io::Error> for EncodeError {
    fn from(e: std::io::Error) -> Self {
        Self(e.to_string())
    }
}

impl From<rmp::encode::ValueWriteError> for EncodeError {
    fn from(e: rmp::encode::ValueWriteError) -> Self {
        Self(e.to_string())
    }
}

/// Umbrella error for every public protocol operation.
#[derive(Debug, Error)]
pub enum DualStakeError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

impl From<AddressError> for DualStakeError {
    fn from(e: AddressError) -> Self {
        Self::Decode(DecodeError::Address(e))
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, DualStakeError>;
