pub mod address;
pub mod page_hash;

pub use address::{Address, AddressError};
pub use page_hash::PageHash;
