//! Pool contract client.
//!
//! Reads simulate `get_contract_listing` and merge it with global state.
//! Builders emit steps in the order the contract validates them:
//! prerequisites first, then the call, then trailing payments.

use super::context::{ContractContext, ContractSchema, replace_template_vars};
use super::mapper::{build_contract_state, decode_listing};
use super::methods;
use super::params::{
    ConfigureParams, KeyregOnlineParams, MintParams, OnBehalfParams, ProtestParams,
    QueueUpdateFeesParams, QueueUpgradeParams, RedeemParams, TokenMetadataParams, UpgradeParams,
    WithdrawFeesParams,
};
use super::resolver::{
    self, ADMIN_UNPROTEST_FEE, CONFIGURE_MBR, CONFIGURE_MBR_DELAYED_OPTIN,
    INCENTIVE_ELIGIBILITY_FEE, KEYREG_OFFLINE_FEE, MINT_FEE, NEED_SWAP_BUDGET, REDEEM_FEE,
    SINGLE_LISTING_BUDGET, WITHDRAW_FEE,
};
use super::{ReadableContract, TransactionBuilder};
use crate::codec::abi::{self, AbiType, AbiValue};
use crate::codec::uint::decode_u64_exact;
use crate::error::{DecodeError, Result, ValidationError};
use crate::transaction::{ApplicationCall, FeeSpec, OnComplete, Transaction};
use dualstake_domain::value_objects::page_hash::PAGE_HASH_LENGTH;
use dualstake_domain::{Address, ContractListing, ContractState, NetworkConstants};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

const SELECTION_KEY_LENGTH: usize = 32;
const VOTING_KEY_LENGTH: usize = 32;
const STATE_PROOF_KEY_LENGTH: usize = 64;

/// Asset ids of a pool, fixed for the contract's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolAssets {
    /// Paired asset.
    pub asa_id: u64,
    /// Pool token.
    pub lst_id: u64,
}

/// Client of one dualSTAKE pool.
#[derive(Debug)]
pub struct PoolClient {
    ctx: ContractContext,
    network: NetworkConstants,
    assets: OnceLock<PoolAssets>,
}

impl PoolClient {
    #[must_use]
    pub fn new(ctx: ContractContext, network: NetworkConstants) -> Self {
        Self {
            ctx,
            network,
            assets: OnceLock::new(),
        }
    }

    /// Memoized asset ids, if a listing has been read.
    #[must_use]
    pub fn cached_assets(&self) -> Option<PoolAssets> {
        self.assets.get().copied()
    }

    /// Asset ids, reading the listing on first use.
    ///
    /// # Errors
    /// Failures of the listing read.
    pub async fn assets(&self) -> Result<PoolAssets> {
        if let Some(assets) = self.cached_assets() {
            return Ok(assets);
        }
        let listing = self.get_listing().await?;
        Ok(PoolAssets {
            asa_id: listing.asa_id,
            lst_id: listing.lst_id,
        })
    }

    fn remember(&self, listing: &ContractListing) {
        // Losing the race means another caller stored the same ids.
        let _ = self.assets.set(PoolAssets {
            asa_id: listing.asa_id,
            lst_id: listing.lst_id,
        });
    }

    /// Listing as seen by the sender, at the simulated round.
    ///
    /// # Errors
    /// Transport or decode failures.
    pub async fn get_listing(&self) -> Result<ContractListing> {
        let call = self.ctx.method(
            methods::GET_CONTRACT_LISTING,
            vec![AbiValue::Address(self.ctx.sender)],
        )?;
        let (value, round) = self.ctx.call_return(call, SINGLE_LISTING_BUDGET).await?;
        let listing = decode_listing(&value, round, self.ctx.app_id)?;
        self.remember(&listing);
        debug!(app_id = self.ctx.app_id, round, "Read listing");
        Ok(listing)
    }

    /// Current exchange rate.
    ///
    /// # Errors
    /// Transport or decode failures.
    pub async fn get_rate(&self) -> Result<u64> {
        let call = self.ctx.method(methods::GET_RATE, vec![])?;
        let (value, _) = self.ctx.call_return(call, 0).await?;
        Ok(decode_u64_exact(&value, "get_rate")?)
    }

    /// Whether accrued rewards are waiting to be swapped.
    ///
    /// # Errors
    /// Transport or decode failures.
    pub async fn get_need_swap(&self) -> Result<bool> {
        let call = self.ctx.method(methods::GET_NEED_SWAP, vec![])?;
        let (value, _) = self.ctx.call_return(call, NEED_SWAP_BUDGET).await?;
        match abi::decode(&AbiType::Bool, &value, "get_need_swap")? {
            AbiValue::Bool(b) => Ok(b),
            _ => Err(DecodeError::FieldType {
                layout: "get_need_swap",
                field: "return",
                expected: "bool",
            }
            .into()),
        }
    }

    /// Listing merged with every global-state field.
    ///
    /// # Errors
    /// Transport failures, or a missing or malformed state key.
    pub async fn get_state(&self) -> Result<ContractState> {
        let (global, listing) = tokio::try_join!(self.global_state(), self.get_listing())?;
        Ok(build_contract_state(&global, listing)?)
    }

    async fn sender_holds(&self, asset_id: u64) -> Result<bool> {
        resolver::is_opted_in(self.ctx.transport.as_ref(), &self.ctx.sender, asset_id).await
    }

    /// Opt-in (if needed), call, ALGO deposit, then the paired-asset deposit
    /// when the rate is nonzero.
    ///
    /// # Errors
    /// Transport, decode or encoding failures.
    pub async fn make_mint_transactions(&self, params: MintParams) -> Result<Vec<Transaction>> {
        let assets = self.assets().await?;
        let (mut group, opted_in, state) = tokio::try_join!(
            self.ctx.group(),
            self.sender_holds(assets.lst_id),
            self.get_state(),
        )?;
        info!(
            app_id = self.ctx.app_id,
            algo_amount = params.algo_amount,
            rate = state.rate(),
            "Building mint"
        );

        let sender = self.ctx.sender;
        let escrow = self.ctx.app_address();
        if !opted_in {
            group.opt_in(sender, assets.lst_id);
        }
        let (call, fee) = resolver::liquidity_resources(&state, MINT_FEE)
            .apply(self.ctx.method(methods::MINT, vec![])?);
        group
            .app_call(sender, call, fee)
            .payment(sender, escrow, params.algo_amount);
        if state.rate() > 0 {
            group.asset_transfer(
                sender,
                escrow,
                state.asa_id(),
                state.paired_amount_for(params.algo_amount),
            );
        }
        group.build()
    }

    /// Opt-in to the paired asset (if needed), pool-token deposit, then call.
    ///
    /// # Errors
    /// Transport, decode or encoding failures.
    pub async fn make_redeem_transactions(&self, params: RedeemParams) -> Result<Vec<Transaction>> {
        let assets = self.assets().await?;
        let (mut group, opted_in, state) = tokio::try_join!(
            self.ctx.group(),
            self.sender_holds(assets.asa_id),
            self.get_state(),
        )?;
        info!(app_id = self.ctx.app_id, amount = params.amount, "Building redeem");

        let sender = self.ctx.sender;
        if !opted_in {
            group.opt_in(sender, assets.asa_id);
        }
        group.asset_transfer(sender, self.ctx.app_address(), assets.lst_id, params.amount);
        let (call, fee) = resolver::liquidity_resources(&state, REDEEM_FEE)
            .apply(self.ctx.method(methods::REDEEM, vec![])?);
        group.app_call(sender, call, fee);
        group.build()
    }

    /// Swap accrued rewards through the liquidity pool.
    ///
    /// # Errors
    /// Transport, decode or encoding failures.
    pub async fn make_swap_transactions(&self) -> Result<Vec<Transaction>> {
        let state = self.get_state().await?;
        let (call, fee) = resolver::liquidity_resources(&state, FeeSpec::Suggested)
            .apply(self.ctx.method(methods::SWAP_OR_FAIL, vec![])?);
        self.ctx.single_call(call, fee).await
    }

    /// Pool-token deposit, then the protest call.
    ///
    /// # Errors
    /// Transport, decode or encoding failures.
    pub async fn make_protest_transactions(
        &self,
        params: ProtestParams,
    ) -> Result<Vec<Transaction>> {
        let assets = self.assets().await?;
        let mut group = self.ctx.group().await?;
        let sender = self.ctx.sender;
        group.asset_transfer(sender, self.ctx.app_address(), assets.lst_id, params.amount);
        let (call, fee) = resolver::protest_resources(&sender)
            .apply(self.ctx.method(methods::PROTEST_STAKE, vec![])?);
        group.app_call(sender, call, fee);
        group.build()
    }

    /// Opt-in to the pool token (if needed), then reclaim protested stake.
    ///
    /// # Errors
    /// Transport, decode or encoding failures.
    pub async fn make_undo_protest_transactions(&self) -> Result<Vec<Transaction>> {
        let assets = self.assets().await?;
        let (mut group, opted_in) =
            tokio::try_join!(self.ctx.group(), self.sender_holds(assets.lst_id))?;
        let sender = self.ctx.sender;
        if !opted_in {
            group.opt_in(sender, assets.lst_id);
        }
        let (call, fee) = resolver::unprotest_resources(assets.lst_id, &sender)
            .apply(self.ctx.method(methods::UNPROTEST_STAKE, vec![])?);
        group.app_call(sender, call, fee);
        group.build()
    }

    /// Return `user`'s protested stake, via the router when `user` cannot
    /// receive the pool token.
    ///
    /// # Errors
    /// Transport, decode or encoding failures.
    pub async fn make_admin_undo_protest_transactions(
        &self,
        params: OnBehalfParams,
    ) -> Result<Vec<Transaction>> {
        let assets = self.assets().await?;
        let transport = self.ctx.transport.as_ref();
        let (user_opted_in, state) = tokio::try_join!(
            resolver::is_opted_in(transport, &params.user, assets.lst_id),
            self.get_state(),
        )?;
        let router = if user_opted_in {
            None
        } else {
            resolver::router_reference(transport, state.arc59_app_id, &params.user).await
        };
        let (call, fee) = resolver::on_behalf_resources(
            state.arc59_app_id,
            assets.lst_id,
            &params.user,
            router,
            ADMIN_UNPROTEST_FEE,
        )
        .apply(self.ctx.method(
            methods::ADMIN_UNPROTEST_STAKE,
            vec![AbiValue::Address(params.user)],
        )?);
        self.ctx.single_call(call, fee).await
    }

    /// Pay out `user`'s protested stake in the underlying assets.
    ///
    /// # Errors
    /// Transport, decode or encoding failures.
    pub async fn make_dissolve_protest_transactions(
        &self,
        params: OnBehalfParams,
    ) -> Result<Vec<Transaction>> {
        let assets = self.assets().await?;
        let transport = self.ctx.transport.as_ref();
        let (user_opted_in, state) = tokio::try_join!(
            resolver::is_opted_in(transport, &params.user, assets.asa_id),
            self.get_state(),
        )?;
        let router = if user_opted_in {
            None
        } else {
            resolver::router_reference(transport, state.arc59_app_id, &params.user).await
        };
        let (call, fee) = resolver::on_behalf_resources(
            state.arc59_app_id,
            assets.asa_id,
            &params.user,
            router,
            resolver::dissolve_fee(user_opted_in),
        )
        .apply(self.ctx.method(
            methods::DISSOLVE_PROTESTING_STAKE,
            vec![AbiValue::Address(params.user)],
        )?);
        self.ctx.single_call(call, fee).await
    }

    /// Register participation keys. An escrow that is not yet incentive
    /// eligible pays the eligibility fee from a trailing deposit.
    ///
    /// # Errors
    /// [`ValidationError::FixedLength`] for a key of the wrong size, before
    /// any network call; otherwise transport or encoding failures.
    pub async fn make_keyreg_online_transactions(
        &self,
        params: KeyregOnlineParams,
    ) -> Result<Vec<Transaction>> {
        check_length("selection key", 0, &params.selection_key, SELECTION_KEY_LENGTH)?;
        check_length("voting key", 0, &params.voting_key, VOTING_KEY_LENGTH)?;
        check_length("state proof key", 0, &params.state_proof_key, STATE_PROOF_KEY_LENGTH)?;

        let escrow = self.ctx.app_address();
        let (mut group, escrow_info) = tokio::try_join!(
            self.ctx.group(),
            self.ctx.transport.account_information(&escrow),
        )?;
        let eligible = escrow_info.incentive_eligible;
        info!(app_id = self.ctx.app_id, eligible, "Building keyreg online");

        let call = self.ctx.method(
            methods::KEYREG_ONLINE,
            vec![
                AbiValue::StaticBytes(params.selection_key),
                AbiValue::StaticBytes(params.voting_key),
                AbiValue::StaticBytes(params.state_proof_key),
                AbiValue::Uint64(params.first_round),
                AbiValue::Uint64(params.last_round),
                AbiValue::Uint64(params.key_dilution),
                AbiValue::Uint64(if eligible { 0 } else { INCENTIVE_ELIGIBILITY_FEE }),
            ],
        )?;
        let sender = self.ctx.sender;
        group.app_call(sender, call, resolver::keyreg_online_fee(eligible));
        if !eligible {
            group.payment(sender, escrow, INCENTIVE_ELIGIBILITY_FEE);
        }
        group.build()
    }

    /// # Errors
    /// Transport or encoding failures.
    pub async fn make_keyreg_offline_transactions(&self) -> Result<Vec<Transaction>> {
        let call = self.ctx.method(methods::KEYREG_OFFLINE, vec![])?;
        self.ctx.single_call(call, KEYREG_OFFLINE_FEE).await
    }

    /// # Errors
    /// Transport, decode or encoding failures.
    pub async fn make_withdraw_noderunner_fees_transactions(
        &self,
        params: WithdrawFeesParams,
    ) -> Result<Vec<Transaction>> {
        let state = self.get_state().await?;
        let amount = params.amount.unwrap_or(state.noderunner_fees);
        let call = self
            .ctx
            .method(methods::WITHDRAW_NODE_RUNNER_FEES, vec![AbiValue::Uint64(amount)])?
            .with_accounts([state.noderunner_addr]);
        self.ctx.single_call(call, WITHDRAW_FEE).await
    }

    /// # Errors
    /// Transport, decode or encoding failures.
    pub async fn make_withdraw_platform_fees_transactions(
        &self,
        params: WithdrawFeesParams,
    ) -> Result<Vec<Transaction>> {
        let amount = match params.amount {
            Some(amount) => amount,
            None => self.get_state().await?.platform_fees,
        };
        let call = self
            .ctx
            .method(methods::WITHDRAW_PLATFORM_FEES, vec![AbiValue::Uint64(amount)])?;
        self.ctx.single_call(call, WITHDRAW_FEE).await
    }

    async fn address_call(&self, signature: &str, address: Address) -> Result<Vec<Transaction>> {
        let call = self.ctx.method(signature, vec![AbiValue::Address(address)])?;
        self.ctx.single_call(call, FeeSpec::Suggested).await
    }

    /// # Errors
    /// Transport or encoding failures.
    pub async fn make_change_noderunner_transactions(
        &self,
        noderunner: Address,
    ) -> Result<Vec<Transaction>> {
        self.address_call(methods::CHANGE_NODERUNNER, noderunner).await
    }

    /// # Errors
    /// Transport or encoding failures.
    pub async fn make_change_fee_admin_transactions(
        &self,
        fee_admin: Address,
    ) -> Result<Vec<Transaction>> {
        self.address_call(methods::CHANGE_FEEADDR, fee_admin).await
    }

    /// Two-phase admin handoff: the current admin nominates, the new admin
    /// accepts, in one atomic group.
    ///
    /// # Errors
    /// Transport or encoding failures.
    pub async fn make_change_admin_transactions(&self, admin: Address) -> Result<Vec<Transaction>> {
        let mut group = self.ctx.group().await?;
        group
            .app_call(
                self.ctx.sender,
                self.ctx
                    .method(methods::CHANGE_ADMIN_1, vec![AbiValue::Address(admin)])?,
                FeeSpec::Suggested,
            )
            .app_call(
                admin,
                self.ctx.method(methods::CHANGE_ADMIN_2, vec![])?,
                FeeSpec::Suggested,
            );
        group.build()
    }

    /// # Errors
    /// Transport or encoding failures.
    pub async fn make_update_max_balance_transactions(
        &self,
        new_max_balance: u64,
    ) -> Result<Vec<Transaction>> {
        let call = self.ctx.method(
            methods::UPDATE_MAX_BALANCE,
            vec![AbiValue::Uint64(new_max_balance)],
        )?;
        self.ctx.single_call(call, FeeSpec::Suggested).await
    }

    /// Escrow minimum-balance payment, then the configuration call with the
    /// environment's network constants.
    ///
    /// # Errors
    /// Transport or encoding failures.
    pub async fn make_configure_transactions(
        &self,
        params: ConfigureParams,
    ) -> Result<Vec<Transaction>> {
        let network =
            NetworkConstants::for_environment(params.env).with_overrides(&params.network_overrides);
        let mbr = if params.delay_optin {
            CONFIGURE_MBR_DELAYED_OPTIN
        } else {
            CONFIGURE_MBR
        };

        let call = self
            .ctx
            .method(
                methods::CONFIGURE,
                vec![
                    AbiValue::Uint64(params.asa_id),
                    AbiValue::Bool(params.delay_optin),
                    AbiValue::Bytes(params.lp_type.into_bytes()),
                    AbiValue::StaticBytes(params.lp_id.public_key().to_vec()),
                    AbiValue::Uint64(params.platform_fee_bps),
                    AbiValue::Uint64(params.noderunner_fee_bps),
                    AbiValue::Address(params.admin_addr),
                    AbiValue::Address(params.fee_admin_addr),
                    AbiValue::Address(params.noderunner_addr),
                    AbiValue::Uint64(network.max_balance),
                    AbiValue::Uint64(network.upgrade_period),
                    AbiValue::Uint64(network.fee_update_period),
                    AbiValue::Uint64(network.fee_update_max_delta),
                    AbiValue::Uint64(network.rate_precision),
                    AbiValue::Uint64(network.tm2_app_id),
                    AbiValue::Uint64(network.arc59_app_id),
                ],
            )?
            .with_assets([params.asa_id])
            .with_apps([network.tm2_app_id, network.arc59_app_id])
            .with_accounts([params.lp_id]);

        let sender = self.ctx.sender;
        let mut group = self.ctx.group().await?;
        group
            .payment(sender, self.ctx.app_address(), mbr)
            .app_call(sender, call, FeeSpec::Suggested);
        group.build()
    }

    /// Creates the pool token with its metadata.
    ///
    /// # Errors
    /// Transport or encoding failures.
    pub async fn make_configure2_transactions(
        &self,
        params: TokenMetadataParams,
    ) -> Result<Vec<Transaction>> {
        let call = self.ctx.method(methods::CONFIGURE2, metadata_args(params))?;
        self.ctx.single_call(call, FeeSpec::Suggested).await
    }

    /// # Errors
    /// Transport or encoding failures.
    pub async fn make_queue_update_fees_transactions(
        &self,
        params: QueueUpdateFeesParams,
    ) -> Result<Vec<Transaction>> {
        let call = self.ctx.method(
            methods::QUEUE_UPDATE_FEES,
            vec![
                AbiValue::Uint64(params.new_noderunner_fee_bps),
                AbiValue::Uint64(params.new_platform_fee_bps),
            ],
        )?;
        self.ctx.single_call(call, FeeSpec::Suggested).await
    }

    /// # Errors
    /// Transport or encoding failures.
    pub async fn make_reset_update_fees_transactions(&self) -> Result<Vec<Transaction>> {
        let call = self.ctx.method(methods::RESET_UPDATE_FEES, vec![])?;
        self.ctx.single_call(call, FeeSpec::Suggested).await
    }

    /// Stages an upgrade to programs with the given page hashes.
    ///
    /// # Errors
    /// [`ValidationError::FixedLength`] naming the first hash that is not
    /// 32 bytes, before any network call.
    pub async fn make_queue_upgrade_transactions(
        &self,
        params: QueueUpgradeParams,
    ) -> Result<Vec<Transaction>> {
        for (index, hash) in params.hashes.iter().enumerate() {
            check_length("Hash", index, hash, PAGE_HASH_LENGTH)?;
        }
        let call = self.ctx.method(
            methods::QUEUE_UPGRADE,
            vec![AbiValue::Bytes(params.hashes.concat())],
        )?;
        self.ctx.single_call(call, FeeSpec::Suggested).await
    }

    /// # Errors
    /// Transport or encoding failures.
    pub async fn make_reset_upgrade_transactions(&self) -> Result<Vec<Transaction>> {
        let call = self.ctx.method(methods::RESET_UPGRADE, vec![])?;
        self.ctx.single_call(call, FeeSpec::Suggested).await
    }

    /// Replaces the application programs.
    ///
    /// # Errors
    /// Transport or encoding failures.
    pub async fn make_upgrade_transactions(
        &self,
        params: UpgradeParams,
    ) -> Result<Vec<Transaction>> {
        let call = ApplicationCall::new(self.ctx.app_id)
            .with_on_complete(OnComplete::UpdateApplication)
            .with_programs(params.approval_program, params.clear_program);
        self.ctx.single_call(call, FeeSpec::Suggested).await
    }

    /// Deletes the application; both assets must be referenced.
    ///
    /// # Errors
    /// Transport, decode or encoding failures.
    pub async fn make_delete_transactions(&self) -> Result<Vec<Transaction>> {
        let assets = self.assets().await?;
        let call = ApplicationCall::new(self.ctx.app_id)
            .with_on_complete(OnComplete::DeleteApplication)
            .with_assets([assets.asa_id, assets.lst_id]);
        self.ctx.single_call(call, FeeSpec::Suggested).await
    }
}

pub(crate) fn metadata_args(params: TokenMetadataParams) -> Vec<AbiValue> {
    vec![
        AbiValue::Bytes(params.lst_asa_name.into_bytes()),
        AbiValue::Bytes(params.lst_unit_name.into_bytes()),
        AbiValue::Bytes(params.lst_url.into_bytes()),
    ]
}

fn check_length(
    argument: &'static str,
    index: usize,
    value: &[u8],
    expected: usize,
) -> std::result::Result<(), ValidationError> {
    if value.len() == expected {
        Ok(())
    } else {
        Err(ValidationError::FixedLength {
            argument,
            index,
            expected,
            found: value.len(),
        })
    }
}

impl ReadableContract for PoolClient {
    fn context(&self) -> &ContractContext {
        &self.ctx
    }
}

impl TransactionBuilder for PoolClient {
    fn schema(&self) -> ContractSchema {
        ContractSchema::STANDARD
    }

    fn prepare_approval(&self, source: &str) -> String {
        replace_template_vars(source, &self.network)
    }
}

/// Shares one transport between many pool clients.
#[must_use]
pub fn pool_client(
    transport: Arc<dyn crate::rpc::LedgerTransport>,
    app_id: u64,
    sender: Address,
    network: NetworkConstants,
) -> PoolClient {
    PoolClient::new(ContractContext::new(transport, app_id, sender), network)
}
