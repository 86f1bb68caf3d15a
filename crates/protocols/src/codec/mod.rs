//! Binary and ARC-4 ABI codec.

pub mod abi;
pub mod blob;
pub mod layout;
pub mod uint;

pub use abi::{AbiType, AbiValue, RETURN_PREFIX, method_selector, return_value};
pub use blob::{decode_contract_upgrade, decode_fee_update};
pub use layout::{DecodedRecord, Field, FieldKind, TupleLayout};
pub use uint::{decode_u64, decode_u64_exact, decode_uint};
