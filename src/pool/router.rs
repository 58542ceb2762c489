use alloy::primitives::Address;
use fastnum::UD256;
use tracing::{info, instrument};

use super::{LiquidityChange, Pool};
use crate::{
    abi::pool::FactoryRouter,
    error::OceanError,
    num::to_fixed_point,
    tx::{ChainClient, PreparedCall, TxPipeline},
    userdata::ensure_sorted,
};

/// Parameters of a new weighted pool.
#[derive(Clone, Debug, PartialEq)]
pub struct PoolParams {
    pub name: String,
    pub symbol: String,
    /// Strictly ascending by address.
    pub tokens: Vec<Address>,
    /// Normalized weights parallel to `tokens`, e.g. `0.5` and `0.5`.
    pub weights: Vec<UD256>,
    /// Liquidity provider fee per swap, e.g. `0.003`.
    pub swap_fee: UD256,
    /// Marketplace fee per swap.
    pub market_fee: UD256,
    pub owner: Address,
}

impl PoolParams {
    fn validate(&self) -> Result<(), OceanError> {
        if self.tokens.len() != self.weights.len() {
            return Err(OceanError::InvalidArgument(format!(
                "{} tokens but {} weights",
                self.tokens.len(),
                self.weights.len()
            )));
        }
        ensure_sorted(&self.tokens)
    }
}

/// Progress of [`Router::deploy_and_join`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoolCreateStep {
    CreatingPool,
    ApprovingTokens,
    AddInitialLiquidity,
}

/// Factory router deploying pools.
#[derive(Clone, Debug)]
pub struct Router<C> {
    address: Address,
    vault: Address,
    pipeline: TxPipeline<C>,
}

impl<C: ChainClient + Clone> Router<C> {
    pub fn new(address: Address, vault: Address, pipeline: TxPipeline<C>) -> Self {
        Self {
            address,
            vault,
            pipeline,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Handle to an existing pool behind this router's vault.
    pub fn pool(&self, address: Address) -> Pool<C> {
        Pool::new(address, self.vault, self.pipeline.clone())
    }

    /// Deploys a weighted pool and returns its address.
    ///
    /// Unsorted tokens or mismatched weights are rejected before anything
    /// is sent.
    #[instrument(skip_all, fields(router = %self.address, %caller, name = %params.name))]
    pub async fn deploy_pool(
        &self,
        caller: Address,
        params: &PoolParams,
    ) -> Result<Address, OceanError> {
        params.validate()?;
        let call = FactoryRouter::deployPoolCall {
            name: params.name.clone(),
            symbol: params.symbol.clone(),
            tokens: params.tokens.clone(),
            weights: params
                .weights
                .iter()
                .copied()
                .map(to_fixed_point)
                .collect::<Result<_, _>>()?,
            swapFeePercentage: to_fixed_point(params.swap_fee)?,
            swapMarketFee: to_fixed_point(params.market_fee)?,
            owner: params.owner,
        };
        let receipt = self
            .pipeline
            .submit(PreparedCall::new(self.address, caller, &call))
            .await?;
        let created = receipt.require_event::<FactoryRouter::NewPool>()?;
        info!(pool = %created.poolAddress, "pool deployed");
        Ok(created.poolAddress)
    }

    /// Deploys a pool from the legacy pool factory, controlled by
    /// `controller`.
    pub async fn create_pool_with_fork(
        &self,
        caller: Address,
        controller: Address,
    ) -> Result<Address, OceanError> {
        let call = FactoryRouter::createPoolWithForkCall { controller };
        let receipt = self
            .pipeline
            .submit(PreparedCall::new(self.address, caller, &call))
            .await?;
        Ok(receipt
            .require_event::<FactoryRouter::NewPoolFork>()?
            .poolAddress)
    }

    /// Deploys a pool, approves the vault for every token where needed and
    /// adds the initial liquidity, reporting each step to `on_step`.
    pub async fn deploy_and_join(
        &self,
        caller: Address,
        params: &PoolParams,
        amounts_in: &[UD256],
        mut on_step: impl FnMut(PoolCreateStep),
    ) -> Result<(Pool<C>, LiquidityChange), OceanError> {
        params.validate()?;
        if amounts_in.len() != params.tokens.len() {
            return Err(OceanError::InvalidArgument(format!(
                "{} tokens but {} amounts",
                params.tokens.len(),
                amounts_in.len()
            )));
        }

        on_step(PoolCreateStep::CreatingPool);
        let pool = self.pool(self.deploy_pool(caller, params).await?);

        for (token, amount) in params.tokens.iter().zip(amounts_in) {
            if pool.vault_allowance(caller, *token).await? < *amount {
                on_step(PoolCreateStep::ApprovingTokens);
                pool.approve_vault(caller, *token, *amount, true).await?;
            }
        }

        on_step(PoolCreateStep::AddInitialLiquidity);
        let change = pool.initial_join(caller, amounts_in).await?;
        Ok((pool, change))
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{U256, address};
    use fastnum::udec256;

    use super::*;
    use crate::{pool::BALANCER_VAULT, testing::MockChain};

    const ROUTER: Address = address!("0x0000000000000000000000000000000000000e01");
    const TOKEN_A: Address = address!("0x1000000000000000000000000000000000000000");
    const TOKEN_B: Address = address!("0x2000000000000000000000000000000000000000");
    const OWNER: Address = address!("0x0000000000000000000000000000000000000b01");

    fn params(tokens: Vec<Address>) -> PoolParams {
        PoolParams {
            name: "Pool".to_string(),
            symbol: "POOL".to_string(),
            tokens,
            weights: vec![udec256!(0.5), udec256!(0.5)],
            swap_fee: udec256!(0.003),
            market_fee: udec256!(0.001),
            owner: OWNER,
        }
    }

    #[tokio::test]
    async fn test_deploy_pool_rejects_unsorted_tokens() {
        let chain = MockChain::new();
        let router = Router::new(ROUTER, BALANCER_VAULT, TxPipeline::new(chain.clone()));

        let err = router
            .deploy_pool(OWNER, &params(vec![TOKEN_B, TOKEN_A]))
            .await
            .unwrap_err();
        assert!(matches!(err, OceanError::InvalidArgument(_)));
        assert!(chain.sent().is_empty());
    }

    #[tokio::test]
    async fn test_deploy_pool_converts_weights_and_fees() {
        let chain = MockChain::new();
        let router = Router::new(ROUTER, BALANCER_VAULT, TxPipeline::new(chain.clone()));

        // No NewPool event in the receipt
        let err = router
            .deploy_pool(OWNER, &params(vec![TOKEN_A, TOKEN_B]))
            .await
            .unwrap_err();
        assert!(matches!(err, OceanError::EventNotFound { .. }));

        let call = &chain.sent_calls::<FactoryRouter::deployPoolCall>()[0];
        let half = U256::from(500_000_000_000_000_000_u128);
        assert_eq!(call.weights, vec![half, half]);
        assert_eq!(call.swapFeePercentage, U256::from(3_000_000_000_000_000_u128));
        assert_eq!(call.swapMarketFee, U256::from(1_000_000_000_000_000_u128));
    }

    #[tokio::test]
    async fn test_deploy_and_join_checks_amounts_first() {
        let chain = MockChain::new();
        let router = Router::new(ROUTER, BALANCER_VAULT, TxPipeline::new(chain.clone()));
        let mut steps = Vec::new();

        let err = router
            .deploy_and_join(OWNER, &params(vec![TOKEN_A, TOKEN_B]), &[udec256!(1)], |step| {
                steps.push(step)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, OceanError::InvalidArgument(_)));
        assert!(steps.is_empty());
        assert!(chain.sent().is_empty());
    }
}
