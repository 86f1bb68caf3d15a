//! Shared handle every contract client is composed from.

use crate::codec::abi::{AbiValue, return_value};
use crate::error::Result;
use crate::rpc::{LedgerTransport, SimulateRequest, SimulateResponse};
use crate::transaction::{
    ApplicationCall, FeeSpec, GroupBuilder, OnComplete, StateSchema, Transaction,
};
use dualstake_domain::{Address, NetworkConstants};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Storage a contract is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractSchema {
    pub global: StateSchema,
    pub local: StateSchema,
    pub extra_pages: u64,
}

impl ContractSchema {
    /// Pool and registry contracts.
    pub const STANDARD: Self = Self {
        global: StateSchema {
            num_uints: 40,
            num_byte_slices: 24,
        },
        local: StateSchema {
            num_uints: 0,
            num_byte_slices: 0,
        },
        extra_pages: 3,
    };

    /// Stateless contracts.
    pub const EMPTY: Self = Self {
        global: StateSchema {
            num_uints: 0,
            num_byte_slices: 0,
        },
        local: StateSchema {
            num_uints: 0,
            num_byte_slices: 0,
        },
        extra_pages: 0,
    };
}

/// Transport, application and acting account of a client.
#[derive(Clone)]
pub struct ContractContext {
    pub transport: Arc<dyn LedgerTransport>,
    pub app_id: u64,
    /// Account that signs built transactions and runs simulations.
    pub sender: Address,
}

impl fmt::Debug for ContractContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractContext")
            .field("app_id", &self.app_id)
            .field("sender", &self.sender)
            .finish_non_exhaustive()
    }
}

impl ContractContext {
    #[must_use]
    pub fn new(transport: Arc<dyn LedgerTransport>, app_id: u64, sender: Address) -> Self {
        Self {
            transport,
            app_id,
            sender,
        }
    }

    /// Escrow address of the application.
    #[must_use]
    pub fn app_address(&self) -> Address {
        Address::for_application(self.app_id)
    }

    /// A method call on this application.
    ///
    /// # Errors
    /// Arguments that overflow their length prefix.
    pub fn method(&self, signature: &str, args: Vec<AbiValue>) -> Result<ApplicationCall> {
        Ok(ApplicationCall::method(self.app_id, signature, args)?)
    }

    /// Starts a group from fresh node parameters.
    ///
    /// # Errors
    /// Transport failures.
    pub async fn group(&self) -> Result<GroupBuilder> {
        Ok(GroupBuilder::new(self.transport.suggested_params().await?))
    }

    /// Builds a one-call group ready to submit.
    ///
    /// # Errors
    /// Transport or encoding failures.
    pub async fn single_call(
        &self,
        call: ApplicationCall,
        fee: FeeSpec,
    ) -> Result<Vec<Transaction>> {
        let mut group = self.group().await?;
        group.app_call(self.sender, call, fee);
        group.build()
    }

    /// Simulates one call as a read.
    ///
    /// # Errors
    /// Transport failures, including a failed simulation.
    pub async fn simulate_call(
        &self,
        call: ApplicationCall,
        fee: FeeSpec,
        request: SimulateRequest,
    ) -> Result<SimulateResponse> {
        let txns = self.single_call(call, fee).await?;
        debug!(
            app_id = self.app_id,
            budget = request.extra_opcode_budget,
            "Simulating read"
        );
        self.transport.simulate(&txns, &request).await
    }

    /// Simulates one call and extracts its return value and the round.
    ///
    /// # Errors
    /// Transport failures, or [`crate::error::DecodeError::MissingReturn`].
    pub async fn call_return(
        &self,
        call: ApplicationCall,
        extra_opcode_budget: u64,
    ) -> Result<(Vec<u8>, u64)> {
        let response = self
            .simulate_call(
                call,
                FeeSpec::Suggested,
                SimulateRequest::read_only(extra_opcode_budget),
            )
            .await?;
        let value = return_value(response.logs(0))?.to_vec();
        Ok((value, response.last_round))
    }

    /// An application create transaction from TEAL sources.
    ///
    /// # Errors
    /// Compile, transport or encoding failures.
    pub async fn create_transactions(
        &self,
        approval_source: &str,
        clear_source: &str,
        schema: ContractSchema,
    ) -> Result<Vec<Transaction>> {
        let (approval, clear) = tokio::try_join!(
            self.transport.compile(approval_source),
            self.transport.compile(clear_source),
        )?;
        let mut call = ApplicationCall::new(0)
            .with_on_complete(OnComplete::NoOp)
            .with_programs(approval, clear);
        call.global_schema = schema.global;
        call.local_schema = schema.local;
        call.extra_pages = schema.extra_pages;
        self.single_call(call, FeeSpec::Suggested).await
    }
}

/// Substitutes `TMPL_<name>` placeholders with network constants.
#[must_use]
pub fn replace_template_vars(source: &str, constants: &NetworkConstants) -> String {
    let mut vars = constants.template_vars();
    // Longest names first so no name clobbers a longer one sharing its prefix.
    vars.sort_by_key(|(name, _)| std::cmp::Reverse(name.len()));
    vars.iter().fold(source.to_string(), |out, (name, value)| {
        out.replace(&format!("TMPL_{name}"), &value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::abi::RETURN_PREFIX;
    use crate::rpc::SimulatedTransaction;
    use crate::rpc::mock::MockLedger;

    #[test]
    fn test_replace_template_vars() {
        let source = "int TMPL_feeUpdatePeriod\nint TMPL_feeUpdateMaxDelta\nint TMPL_tm2AppId";
        let out = replace_template_vars(source, &NetworkConstants::PROD);
        assert_eq!(out, "int 604800\nint 250\nint 1002541853");
    }

    #[tokio::test]
    async fn test_call_return_reads_round_and_value() {
        let ledger = MockLedger::new().with_simulate(|_, request| {
            assert!(request.allow_unnamed_resources);
            let mut line = RETURN_PREFIX.to_vec();
            line.extend_from_slice(&42u64.to_be_bytes());
            Ok(SimulateResponse {
                last_round: 1_234,
                results: vec![SimulatedTransaction { logs: vec![line] }],
            })
        });
        let ctx = ContractContext::new(Arc::new(ledger), 10, Address::new([1u8; 32]));
        let call = ctx.method("get_rate()uint64", vec![]).unwrap();
        let (value, round) = ctx.call_return(call, 0).await.unwrap();
        assert_eq!(value, 42u64.to_be_bytes());
        assert_eq!(round, 1_234);
    }

    #[tokio::test]
    async fn test_create_transaction_carries_schema() {
        let ctx = ContractContext::new(Arc::new(MockLedger::new()), 10, Address::new([1u8; 32]));
        let txns = ctx
            .create_transactions("approval", "clear", ContractSchema::STANDARD)
            .await
            .unwrap();
        let call = txns[0].as_app_call().unwrap();
        assert_eq!(call.app_id, 0);
        assert_eq!(call.approval_program, b"approval");
        assert_eq!(call.global_schema.num_uints, 40);
        assert_eq!(call.extra_pages, 3);
    }
}
