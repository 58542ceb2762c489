//! Datatoken (ERC-20 template) wrapper.
//!
//! Amounts cross the public API as display amounts ([`UD256`]) and are
//! converted to fixed point with [`crate::num`]; [`Datatoken::transfer_raw`]
//! is the one exception.

use std::time::{SystemTime, UNIX_EPOCH};

use alloy::{
    eips::BlockNumberOrTag,
    primitives::{Address, Bytes, TxHash, U256},
    rpc::types::Filter,
    sol_types::{SolCall, SolEvent},
};
use fastnum::UD256;
use tracing::{debug, instrument};

use crate::{
    abi::datatoken::ERC20Template,
    error::OceanError,
    nft::Nft,
    num::{from_fixed_point, to_fixed_point},
    permissions::{DatatokenRole, DatatokenRoles, NftRole, Requirement, require},
    tx::{ChainClient, PreparedCall, Receipt, TxPipeline},
};

/// Order lookup parameters for [`Datatoken::previous_valid_order`].
#[derive(Clone, Debug, PartialEq)]
pub struct OrderQuery {
    pub consumer: Address,
    pub amount: UD256,
    pub service_id: U256,
    /// Service validity in seconds, 0 for orders that never expire.
    ///
    /// Also bounds the scanned range to the last `timeout` blocks.
    pub timeout: u64,
}

#[derive(Clone, Debug)]
pub struct Datatoken<C> {
    address: Address,
    pipeline: TxPipeline<C>,
    start_block: u64,
}

impl<C: ChainClient + Clone> Datatoken<C> {
    pub fn new(address: Address, pipeline: TxPipeline<C>) -> Self {
        Self {
            address,
            pipeline,
            start_block: 0,
        }
    }

    /// First block scanned for past orders, usually the block the
    /// contracts were deployed at.
    pub fn with_start_block(mut self, block: u64) -> Self {
        self.start_block = block;
        self
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub async fn name(&self) -> Result<String, OceanError> {
        self.view(ERC20Template::nameCall {}).await
    }

    pub async fn symbol(&self) -> Result<String, OceanError> {
        self.view(ERC20Template::symbolCall {}).await
    }

    pub async fn decimals(&self) -> Result<u8, OceanError> {
        self.view(ERC20Template::decimalsCall {}).await
    }

    pub async fn cap(&self) -> Result<UD256, OceanError> {
        self.view(ERC20Template::capCall {})
            .await
            .map(from_fixed_point)
    }

    pub async fn total_supply(&self) -> Result<UD256, OceanError> {
        self.view(ERC20Template::totalSupplyCall {})
            .await
            .map(from_fixed_point)
    }

    pub async fn balance(&self, account: Address) -> Result<UD256, OceanError> {
        self.view(ERC20Template::balanceOfCall { account })
            .await
            .map(from_fixed_point)
    }

    pub async fn allowance(&self, owner: Address, spender: Address) -> Result<UD256, OceanError> {
        self.view(ERC20Template::allowanceCall { owner, spender })
            .await
            .map(from_fixed_point)
    }

    pub async fn fee_collector(&self) -> Result<Address, OceanError> {
        self.view(ERC20Template::getFeeCollectorCall {}).await
    }

    pub async fn permissions(&self, holder: Address) -> Result<DatatokenRoles, OceanError> {
        self.view(ERC20Template::getPermissionsCall { user: holder })
            .await
            .map(DatatokenRoles::from)
    }

    /// Data NFT the datatoken was created from.
    pub async fn nft_address(&self) -> Result<Address, OceanError> {
        self.view(ERC20Template::getERC721AddressCall {}).await
    }

    pub async fn satisfies(
        &self,
        caller: Address,
        requirement: Requirement,
    ) -> Result<bool, OceanError> {
        match requirement {
            Requirement::Datatoken(role) => Ok(self.permissions(caller).await?.has(role)),
            Requirement::CapAvailable(amount) => {
                let cap = self.view(ERC20Template::capCall {}).await?;
                let supply = self.view(ERC20Template::totalSupplyCall {}).await?;
                Ok(cap.saturating_sub(supply) >= amount)
            }
            Requirement::NftOwner | Requirement::Nft(_) => {
                let nft = Nft::new(self.nft_address().await?, self.pipeline.clone());
                nft.satisfies(caller, requirement).await
            }
        }
    }

    pub async fn ensure(
        &self,
        caller: Address,
        requirement: Requirement,
    ) -> Result<(), OceanError> {
        let satisfied = self.satisfies(caller, requirement).await?;
        require(satisfied, caller, self.address, requirement)
    }

    pub async fn approve(
        &self,
        caller: Address,
        spender: Address,
        amount: UD256,
    ) -> Result<Receipt, OceanError> {
        self.send(
            caller,
            ERC20Template::approveCall {
                spender,
                amount: to_fixed_point(amount)?,
            },
        )
        .await
    }

    /// Mints `amount` to `to`, failing client-side when the remaining cap
    /// is insufficient.
    #[instrument(skip_all, fields(datatoken = %self.address, %caller, %to, %amount))]
    pub async fn mint(
        &self,
        caller: Address,
        to: Address,
        amount: UD256,
    ) -> Result<Receipt, OceanError> {
        let value = to_fixed_point(amount)?;
        self.ensure(caller, Requirement::Datatoken(DatatokenRole::Minter))
            .await?;
        self.ensure(caller, Requirement::CapAvailable(value)).await?;
        self.send(caller, ERC20Template::mintCall { account: to, value })
            .await
    }

    pub async fn add_minter(
        &self,
        caller: Address,
        minter: Address,
    ) -> Result<Receipt, OceanError> {
        self.ensure(caller, Requirement::Nft(NftRole::DatatokenDeployer))
            .await?;
        self.send(caller, ERC20Template::addMinterCall { minter })
            .await
    }

    pub async fn remove_minter(
        &self,
        caller: Address,
        minter: Address,
    ) -> Result<Receipt, OceanError> {
        self.ensure(caller, Requirement::Nft(NftRole::DatatokenDeployer))
            .await?;
        self.send(caller, ERC20Template::removeMinterCall { minter })
            .await
    }

    /// Stores `value` on the parent data NFT under this datatoken's key.
    pub async fn set_data(&self, caller: Address, value: Bytes) -> Result<Receipt, OceanError> {
        self.ensure(caller, Requirement::Nft(NftRole::DatatokenDeployer))
            .await?;
        self.send(caller, ERC20Template::setDataCall { value })
            .await
    }

    pub async fn clean_permissions(&self, caller: Address) -> Result<Receipt, OceanError> {
        self.ensure(caller, Requirement::NftOwner).await?;
        self.send(caller, ERC20Template::cleanPermissionsCall {})
            .await
    }

    pub async fn set_fee_collector(
        &self,
        caller: Address,
        fee_collector: Address,
    ) -> Result<Receipt, OceanError> {
        self.ensure(caller, Requirement::Datatoken(DatatokenRole::FeeManager))
            .await?;
        self.send(
            caller,
            ERC20Template::setFeeCollectorCall {
                feeCollector: fee_collector,
            },
        )
        .await
    }

    pub async fn transfer(
        &self,
        caller: Address,
        to: Address,
        amount: UD256,
    ) -> Result<Receipt, OceanError> {
        self.transfer_raw(caller, to, to_fixed_point(amount)?).await
    }

    /// Transfers a fixed-point amount.
    pub async fn transfer_raw(
        &self,
        caller: Address,
        to: Address,
        amount: U256,
    ) -> Result<Receipt, OceanError> {
        self.send(caller, ERC20Template::transferCall { to, amount })
            .await
    }

    /// Transfers `amount` from `from` to `caller` using the caller's
    /// allowance.
    pub async fn transfer_from(
        &self,
        caller: Address,
        from: Address,
        amount: UD256,
    ) -> Result<Receipt, OceanError> {
        self.send(
            caller,
            ERC20Template::transferFromCall {
                from,
                to: caller,
                amount: to_fixed_point(amount)?,
            },
        )
        .await
    }

    /// Pays for access to service `service_id` on behalf of `consumer`.
    ///
    /// `mp_fee_address` receives the marketplace fee; [`Address::ZERO`]
    /// for none.
    #[instrument(skip_all, fields(datatoken = %self.address, %caller, %consumer))]
    pub async fn start_order(
        &self,
        caller: Address,
        consumer: Address,
        amount: UD256,
        service_id: U256,
        mp_fee_address: Address,
    ) -> Result<Receipt, OceanError> {
        self.send(
            caller,
            ERC20Template::startOrderCall {
                consumer,
                amount: to_fixed_point(amount)?,
                serviceId: service_id,
                mpFeeAddress: mp_fee_address,
            },
        )
        .await
    }

    /// Offers the minter role to `new_minter`, who accepts it with
    /// [`Self::approve_minter`].
    pub async fn propose_minter(
        &self,
        caller: Address,
        new_minter: Address,
    ) -> Result<Receipt, OceanError> {
        self.ensure(caller, Requirement::Datatoken(DatatokenRole::Minter))
            .await?;
        self.send(
            caller,
            ERC20Template::proposeMinterCall {
                newMinter: new_minter,
            },
        )
        .await
    }

    pub async fn approve_minter(&self, caller: Address) -> Result<Receipt, OceanError> {
        self.send(caller, ERC20Template::approveMinterCall {}).await
    }

    /// Transaction of an earlier order matching `query` that is still
    /// valid, if any.
    pub async fn previous_valid_order(
        &self,
        query: &OrderQuery,
    ) -> Result<Option<TxHash>, OceanError> {
        let from_block = match query.timeout {
            0 => self.start_block,
            timeout => {
                let head = self.pipeline.block_number().await?;
                head.saturating_sub(timeout).max(self.start_block)
            }
        };
        let filter = Filter::new()
            .address(self.address)
            .event_signature(ERC20Template::OrderStarted::SIGNATURE_HASH)
            .topic1(query.consumer.into_word())
            .from_block(from_block)
            .to_block(BlockNumberOrTag::Latest);
        let logs = self.pipeline.logs(filter).await?;
        debug!(count = logs.len(), from_block, "scanned past orders");

        let amount = to_fixed_point(query.amount)?;
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        for log in logs {
            let Ok(order) = ERC20Template::OrderStarted::decode_log(&log.inner) else {
                continue;
            };
            if order.consumer != query.consumer
                || order.amount != amount
                || order.serviceId != query.service_id
            {
                continue;
            }
            let expiry = order.timestamp.saturating_add(U256::from(query.timeout));
            if query.timeout == 0 || U256::from(now) < expiry {
                return Ok(log.transaction_hash);
            }
        }
        Ok(None)
    }

    async fn view<T: SolCall>(&self, call: T) -> Result<T::Return, OceanError> {
        self.pipeline.view(self.address, call).await
    }

    async fn send<T: SolCall>(&self, caller: Address, call: T) -> Result<Receipt, OceanError> {
        self.pipeline
            .submit(PreparedCall::new(self.address, caller, &call))
            .await
    }
}
