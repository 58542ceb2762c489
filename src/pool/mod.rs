//! Weighted pools: deployment through the factory router, liquidity and
//! swaps through the vault.
//!
//! Pool tokens are kept by the vault in ascending address order. Amount
//! slices passed to [`Pool`] methods are parallel to that order, which is
//! also the order [`Pool::pool_tokens`] returns.

mod router;

pub use router::{PoolCreateStep, PoolParams, Router};

use alloy::primitives::{Address, B256, I256, U256};
use fastnum::{D256, UD256};
use tracing::{debug, info, instrument};

use crate::{
    abi::pool::{IERC20, Vault, WeightedPool},
    error::OceanError,
    num::{Converter, from_fixed_point, to_fixed_point},
    tx::{ChainClient, PreparedCall, Receipt, TxPipeline},
    userdata::{ExitKind, ExitRequest, JoinKind, JoinRequest},
};

/// Default vault address, identical on every supported network.
pub const BALANCER_VAULT: Address =
    alloy::primitives::address!("0xBA12222222228d8Ba445958a75a0704d566BF2C8");

/// Tokens and balances registered for a pool in the vault.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolTokens {
    pub tokens: Vec<Address>,
    /// Fixed point, parallel to `tokens`.
    pub balances: Vec<U256>,
    pub last_change_block: u64,
}

/// Outcome of a join or an exit.
#[derive(Clone, Debug)]
pub struct LiquidityChange {
    pub receipt: Receipt,
    /// Fixed-point balance deltas of the pool per token, positive on
    /// joins, from the vault's `PoolBalanceChanged` event.
    pub deltas: Option<Vec<I256>>,
}

impl From<Receipt> for LiquidityChange {
    fn from(receipt: Receipt) -> Self {
        let deltas = receipt
            .event::<Vault::PoolBalanceChanged>()
            .map(|event| event.deltas);
        Self { receipt, deltas }
    }
}

impl LiquidityChange {
    /// `deltas` as display amounts.
    pub fn display_deltas(&self) -> Option<Vec<D256>> {
        let converter = Converter::wei();
        self.deltas
            .as_ref()
            .map(|deltas| deltas.iter().map(|delta| converter.from_signed(*delta)).collect())
    }
}

/// Outcome of a single swap.
#[derive(Clone, Debug)]
pub struct SwapOutcome {
    pub receipt: Receipt,
    /// Fixed point.
    pub amount_in: U256,
    /// Fixed point.
    pub amount_out: U256,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
enum SwapKind {
    GivenIn = 0,
    GivenOut = 1,
}

#[derive(Clone, Debug)]
pub struct Pool<C> {
    address: Address,
    vault: Address,
    pipeline: TxPipeline<C>,
}

impl<C: ChainClient + Clone> Pool<C> {
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

    pub fn vault(&self) -> Address {
        self.vault
    }

    pub async fn pool_id(&self) -> Result<B256, OceanError> {
        self.pipeline
            .view(self.address, WeightedPool::getPoolIdCall {})
            .await
    }

    pub async fn pool_state(&self) -> Result<PoolTokens, OceanError> {
        let pool_id = self.pool_id().await?;
        let ret = self
            .pipeline
            .view(self.vault, Vault::getPoolTokensCall { poolId: pool_id })
            .await?;
        Ok(PoolTokens {
            tokens: ret.tokens,
            balances: ret.balances,
            last_change_block: ret.lastChangeBlock.saturating_to(),
        })
    }

    pub async fn pool_tokens(&self) -> Result<Vec<Address>, OceanError> {
        Ok(self.pool_state().await?.tokens)
    }

    /// Pool shares held by `account`.
    pub async fn lp_balance(&self, account: Address) -> Result<UD256, OceanError> {
        self.pipeline
            .view(self.address, WeightedPool::balanceOfCall { account })
            .await
            .map(from_fixed_point)
    }

    pub async fn token_balance(
        &self,
        token: Address,
        account: Address,
    ) -> Result<UD256, OceanError> {
        self.pipeline
            .view(token, IERC20::balanceOfCall { account })
            .await
            .map(from_fixed_point)
    }

    /// Amount of `token` the vault may pull from `account`.
    pub async fn vault_allowance(
        &self,
        account: Address,
        token: Address,
    ) -> Result<UD256, OceanError> {
        self.pipeline
            .view(
                token,
                IERC20::allowanceCall {
                    owner: account,
                    spender: self.vault,
                },
            )
            .await
            .map(from_fixed_point)
    }

    /// Lets the vault pull `amount` of `token` from `account`.
    ///
    /// Unless `force` is set, nothing is sent when the current allowance
    /// already covers `amount`, and `None` is returned.
    pub async fn approve_vault(
        &self,
        account: Address,
        token: Address,
        amount: UD256,
        force: bool,
    ) -> Result<Option<Receipt>, OceanError> {
        if !force && self.vault_allowance(account, token).await? >= amount {
            debug!(%token, %account, "vault allowance sufficient");
            return Ok(None);
        }
        let call = IERC20::approveCall {
            spender: self.vault,
            amount: to_fixed_point(amount)?,
        };
        self.pipeline
            .submit(PreparedCall::new(token, account, &call))
            .await
            .map(Some)
    }

    /// Adds the first liquidity of the pool.
    #[instrument(skip_all, fields(pool = %self.address, %account))]
    pub async fn initial_join(
        &self,
        account: Address,
        amounts_in: &[UD256],
    ) -> Result<LiquidityChange, OceanError> {
        let amounts_in = fixed_points(amounts_in)?;
        let kind = JoinKind::Init {
            amounts_in: amounts_in.clone(),
        };
        self.join_with(account, amounts_in, kind).await
    }

    /// Adds liquidity proportionally, receiving at least
    /// `min_shares_out` pool shares.
    pub async fn join(
        &self,
        account: Address,
        amounts_in: &[UD256],
        min_shares_out: UD256,
    ) -> Result<LiquidityChange, OceanError> {
        let amounts_in = fixed_points(amounts_in)?;
        let kind = JoinKind::ExactTokensIn {
            amounts_in: amounts_in.clone(),
            min_shares_out: to_fixed_point(min_shares_out)?,
        };
        self.join_with(account, amounts_in, kind).await
    }

    /// Adds liquidity with the token at `token_index` only; `max_amounts_in`
    /// bounds what the vault may pull per token.
    pub async fn single_join(
        &self,
        account: Address,
        max_amounts_in: &[UD256],
        min_shares_out: UD256,
        token_index: usize,
    ) -> Result<LiquidityChange, OceanError> {
        let kind = JoinKind::SingleToken {
            min_shares_out: to_fixed_point(min_shares_out)?,
            token_index,
        };
        self.join_with(account, fixed_points(max_amounts_in)?, kind)
            .await
    }

    /// Redeems exactly `shares_in` pool shares.
    pub async fn exit_exact_in(
        &self,
        account: Address,
        min_amounts_out: &[UD256],
        shares_in: UD256,
    ) -> Result<LiquidityChange, OceanError> {
        let kind = ExitKind::ExactSharesIn {
            shares_in: to_fixed_point(shares_in)?,
        };
        self.exit_with(account, account, fixed_points(min_amounts_out)?, kind)
            .await
    }

    /// Redeems exact token amounts, reverting when more than
    /// `max_shares_in` pool shares would be burned.
    pub async fn exit_exact_out(
        &self,
        account: Address,
        amounts_out: &[UD256],
        max_shares_in: UD256,
    ) -> Result<LiquidityChange, OceanError> {
        let amounts_out = fixed_points(amounts_out)?;
        let kind = ExitKind::ExactTokensOut {
            amounts_out: amounts_out.clone(),
            max_shares_in: to_fixed_point(max_shares_in)?,
        };
        self.exit_with(account, account, amounts_out, kind).await
    }

    /// Sends accrued marketplace fees to `collector`.
    pub async fn collect_market_fee(
        &self,
        account: Address,
        collector: Address,
    ) -> Result<LiquidityChange, OceanError> {
        self.collect_fee(account, collector, ExitKind::MarketFeeWithdrawal)
            .await
    }

    /// Sends accrued community fees to `collector`.
    pub async fn collect_community_fee(
        &self,
        account: Address,
        collector: Address,
    ) -> Result<LiquidityChange, OceanError> {
        self.collect_fee(account, collector, ExitKind::CommunityFeeWithdrawal)
            .await
    }

    pub async fn set_market_fee_collector(
        &self,
        account: Address,
        collector: Address,
    ) -> Result<Receipt, OceanError> {
        let call = WeightedPool::updateMarketCollectorCall {
            newCollector: collector,
        };
        self.pipeline
            .submit(PreparedCall::new(self.address, account, &call))
            .await
    }

    /// Swaps exactly `amount_in` of `token_in` for at least
    /// `min_amount_out` of `token_out`.
    pub async fn swap_exact_in(
        &self,
        account: Address,
        token_in: Address,
        token_out: Address,
        amount_in: UD256,
        min_amount_out: UD256,
        deadline: u64,
    ) -> Result<SwapOutcome, OceanError> {
        self.swap(
            account,
            SwapKind::GivenIn,
            token_in,
            token_out,
            to_fixed_point(amount_in)?,
            to_fixed_point(min_amount_out)?,
            deadline,
        )
        .await
    }

    /// Swaps at most `max_amount_in` of `token_in` for exactly
    /// `amount_out` of `token_out`.
    pub async fn swap_exact_out(
        &self,
        account: Address,
        token_in: Address,
        token_out: Address,
        amount_out: UD256,
        max_amount_in: UD256,
        deadline: u64,
    ) -> Result<SwapOutcome, OceanError> {
        self.swap(
            account,
            SwapKind::GivenOut,
            token_in,
            token_out,
            to_fixed_point(amount_out)?,
            to_fixed_point(max_amount_in)?,
            deadline,
        )
        .await
    }

    async fn join_with(
        &self,
        account: Address,
        max_amounts_in: Vec<U256>,
        kind: JoinKind,
    ) -> Result<LiquidityChange, OceanError> {
        let tokens = self.pool_tokens().await?;
        let request = JoinRequest::new(tokens, max_amounts_in, kind).into_vault()?;
        let call = Vault::joinPoolCall {
            poolId: self.pool_id().await?,
            sender: account,
            recipient: account,
            request,
        };
        let receipt = self
            .pipeline
            .submit(PreparedCall::new(self.vault, account, &call))
            .await?;
        info!(pool = %self.address, tx_hash = %receipt.tx_hash, "joined pool");
        Ok(receipt.into())
    }

    async fn exit_with(
        &self,
        account: Address,
        recipient: Address,
        min_amounts_out: Vec<U256>,
        kind: ExitKind,
    ) -> Result<LiquidityChange, OceanError> {
        let tokens = self.pool_tokens().await?;
        let request = ExitRequest::new(tokens, min_amounts_out, kind).into_vault()?;
        let call = Vault::exitPoolCall {
            poolId: self.pool_id().await?,
            sender: account,
            recipient,
            request,
        };
        let receipt = self
            .pipeline
            .submit(PreparedCall::new(self.vault, account, &call))
            .await?;
        info!(pool = %self.address, tx_hash = %receipt.tx_hash, "exited pool");
        Ok(receipt.into())
    }

    async fn collect_fee(
        &self,
        account: Address,
        collector: Address,
        kind: ExitKind,
    ) -> Result<LiquidityChange, OceanError> {
        let tokens = self.pool_tokens().await?.len();
        self.exit_with(account, collector, vec![U256::ZERO; tokens], kind)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn swap(
        &self,
        account: Address,
        kind: SwapKind,
        token_in: Address,
        token_out: Address,
        amount: U256,
        limit: U256,
        deadline: u64,
    ) -> Result<SwapOutcome, OceanError> {
        let call = Vault::swapCall {
            singleSwap: Vault::SingleSwap {
                poolId: self.pool_id().await?,
                kind: kind as u8,
                assetIn: token_in,
                assetOut: token_out,
                amount,
                userData: Default::default(),
            },
            funds: Vault::FundManagement {
                sender: account,
                fromInternalBalance: false,
                recipient: account,
                toInternalBalance: false,
            },
            limit,
            deadline: U256::from(deadline),
        };
        let receipt = self
            .pipeline
            .submit(PreparedCall::new(self.vault, account, &call))
            .await?;
        let swap = receipt.require_event::<Vault::Swap>()?;
        Ok(SwapOutcome {
            amount_in: swap.amountIn,
            amount_out: swap.amountOut,
            receipt,
        })
    }
}

fn fixed_points(amounts: &[UD256]) -> Result<Vec<U256>, OceanError> {
    amounts.iter().copied().map(to_fixed_point).collect()
}

#[cfg(test)]
mod tests {
    use alloy::{primitives::address, sol_types::SolValue};
    use fastnum::udec256;

    use super::*;
    use crate::testing::{MockChain, MockReceipt};

    const POOL: Address = address!("0x0000000000000000000000000000000000000d01");
    const TOKEN_A: Address = address!("0x1000000000000000000000000000000000000000");
    const TOKEN_B: Address = address!("0x2000000000000000000000000000000000000000");
    const LP: Address = address!("0x0000000000000000000000000000000000000b01");
    const COLLECTOR: Address = address!("0x0000000000000000000000000000000000000b09");
    const POOL_ID: B256 = B256::repeat_byte(0x77);

    fn setup() -> (MockChain, Pool<MockChain>) {
        let chain = MockChain::new();
        chain.on_view::<WeightedPool::getPoolIdCall, _>(POOL, |_| Ok(POOL_ID));
        chain.on_view::<Vault::getPoolTokensCall, _>(BALANCER_VAULT, |call| {
            assert_eq!(call.poolId, POOL_ID);
            Ok(Vault::getPoolTokensReturn {
                tokens: vec![TOKEN_A, TOKEN_B],
                balances: vec![U256::ZERO, U256::ZERO],
                lastChangeBlock: U256::ZERO,
            })
        });
        let pool = Pool::new(POOL, BALANCER_VAULT, TxPipeline::new(chain.clone()));
        (chain, pool)
    }

    #[tokio::test]
    async fn test_join_uses_exact_tokens_in_layout() {
        let (chain, pool) = setup();

        let change = pool
            .join(LP, &[udec256!(1), udec256!(2)], udec256!(0.5))
            .await
            .unwrap();
        assert!(change.deltas.is_none());

        let calls = chain.sent_calls::<Vault::joinPoolCall>();
        let call = &calls[0];
        assert_eq!(call.poolId, POOL_ID);
        assert_eq!((call.sender, call.recipient), (LP, LP));
        assert_eq!(call.request.assets, vec![TOKEN_A, TOKEN_B]);
        let (kind, amounts, min_out) =
            <(U256, Vec<U256>, U256)>::abi_decode_params(&call.request.userData).unwrap();
        assert_eq!(kind, U256::from(1));
        assert_eq!(amounts, call.request.maxAmountsIn);
        assert_eq!(min_out, U256::from(500_000_000_000_000_000_u128));
    }

    #[tokio::test]
    async fn test_join_rejects_amount_without_fixed_point_form() {
        let (chain, pool) = setup();
        let huge = crate::num::parse_amount("1e60").unwrap();

        let err = pool
            .join(LP, &[huge, udec256!(1)], udec256!(0))
            .await
            .unwrap_err();
        assert!(matches!(err, OceanError::InvalidAmount(_)));
        assert!(chain.sent().is_empty());
    }

    #[tokio::test]
    async fn test_exit_exact_in_keeps_min_amounts() {
        let (chain, pool) = setup();

        pool.exit_exact_in(LP, &[udec256!(0.1), udec256!(0)], udec256!(3))
            .await
            .unwrap();
        let call = &chain.sent_calls::<Vault::exitPoolCall>()[0];
        assert_eq!(
            call.request.minAmountsOut,
            vec![U256::from(100_000_000_000_000_000_u128), U256::ZERO]
        );
        assert!(!call.request.toInternalBalance);
    }

    #[tokio::test]
    async fn test_collect_market_fee_pays_collector() {
        let (chain, pool) = setup();

        pool.collect_market_fee(LP, COLLECTOR).await.unwrap();
        let call = &chain.sent_calls::<Vault::exitPoolCall>()[0];
        assert_eq!(call.sender, LP);
        assert_eq!(call.recipient, COLLECTOR);
        assert_eq!(call.request.minAmountsOut, vec![U256::ZERO, U256::ZERO]);
        assert_eq!(U256::from_be_slice(&call.request.userData), U256::from(4));
    }

    #[tokio::test]
    async fn test_approve_vault_skips_sufficient_allowance() {
        let (chain, pool) = setup();
        chain.on_view::<IERC20::allowanceCall, _>(TOKEN_A, |call| {
            assert_eq!(call.spender, BALANCER_VAULT);
            Ok(U256::from(10_000_000_000_000_000_000_u128))
        });

        let skipped = pool
            .approve_vault(LP, TOKEN_A, udec256!(10), false)
            .await
            .unwrap();
        assert!(skipped.is_none());
        assert!(chain.sent().is_empty());

        let forced = pool
            .approve_vault(LP, TOKEN_A, udec256!(10), true)
            .await
            .unwrap();
        assert!(forced.is_some());

        pool.approve_vault(LP, TOKEN_A, udec256!(11), false)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(chain.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_swap_exact_out_reports_amounts() {
        let (chain, pool) = setup();
        chain.on_send::<Vault::swapCall, _>(BALANCER_VAULT, |call, _| {
            assert_eq!(call.singleSwap.kind, 1);
            Ok(MockReceipt::success().with_event(
                BALANCER_VAULT,
                &Vault::Swap {
                    poolId: call.singleSwap.poolId,
                    tokenIn: call.singleSwap.assetIn,
                    tokenOut: call.singleSwap.assetOut,
                    amountIn: U256::from(7),
                    amountOut: call.singleSwap.amount,
                },
            ))
        });

        let outcome = pool
            .swap_exact_out(LP, TOKEN_A, TOKEN_B, udec256!(1), udec256!(2), 1_700_000_000)
            .await
            .unwrap();
        assert_eq!(outcome.amount_in, U256::from(7));
        assert_eq!(outcome.amount_out, U256::from(1_000_000_000_000_000_000_u128));
        let call = &chain.sent_calls::<Vault::swapCall>()[0];
        assert_eq!(call.limit, U256::from(2_000_000_000_000_000_000_u128));
        assert_eq!(call.funds.recipient, LP);
    }
}
