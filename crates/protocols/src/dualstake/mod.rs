//! dualSTAKE contract clients.
//!
//! Each contract kind is a small value composed from a [`ContractContext`].
//! Shared behavior lives in two capability traits instead of a base type:
//! [`ReadableContract`] for state reads and [`TransactionBuilder`] for
//! producing grouped transactions.

pub mod context;
pub mod mapper;
pub mod methods;
pub mod oracle;
pub mod params;
pub mod pool;
pub mod registry;
pub mod resolver;

pub use context::{ContractContext, ContractSchema, replace_template_vars};
pub use oracle::{MAX_PRICE_CHUNK, PriceOracleClient};
pub use pool::{PoolAssets, PoolClient, pool_client};
pub use registry::{MAX_LISTING_CHUNK, RegistryClient};

use crate::error::Result;
use crate::rpc::GlobalState;
use crate::transaction::Transaction;
use async_trait::async_trait;
use dualstake_domain::Address;

/// A deployed contract whose state can be read.
#[async_trait]
pub trait ReadableContract: Send + Sync {
    fn context(&self) -> &ContractContext;

    fn app_id(&self) -> u64 {
        self.context().app_id
    }

    /// Escrow address of the application.
    fn app_address(&self) -> Address {
        self.context().app_address()
    }

    /// Raw global state.
    async fn global_state(&self) -> Result<GlobalState> {
        let ctx = self.context();
        ctx.transport.application_global_state(ctx.app_id).await
    }
}

/// A contract that can be deployed and driven with grouped transactions.
#[async_trait]
pub trait TransactionBuilder: ReadableContract {
    /// Storage allocated at creation.
    fn schema(&self) -> ContractSchema;

    /// Approval source as it should be compiled.
    fn prepare_approval(&self, source: &str) -> String {
        source.to_string()
    }

    /// Compiles both programs and builds the application create transaction.
    async fn make_create_transactions(
        &self,
        approval_source: &str,
        clear_source: &str,
    ) -> Result<Vec<Transaction>> {
        let approval = self.prepare_approval(approval_source);
        self.context()
            .create_transactions(&approval, clear_source, self.schema())
            .await
    }
}
