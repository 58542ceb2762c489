use std::sync::Arc;

use alloy::primitives::{Address, B256, I256, U256, address};
use dashmap::DashMap;
use fastnum::{dec256, udec256};
use ocean_sdk::{
    abi::pool::{FactoryRouter, IERC20, Vault, WeightedPool},
    error::OceanError,
    num::to_fixed_point,
    pool::{BALANCER_VAULT, PoolCreateStep, PoolParams, Router},
    testing::{MockChain, MockReceipt},
    tx::{DEFAULT_GAS_LIMIT, TxPipeline},
};

const ROUTER: Address = address!("0x0000000000000000000000000000000000000e01");
const POOL: Address = address!("0x0000000000000000000000000000000000000c01");
const OCEAN: Address = address!("0x1000000000000000000000000000000000000000");
const DATATOKEN: Address = address!("0x2000000000000000000000000000000000000000");
const ALICE: Address = address!("0x0000000000000000000000000000000000000b01");

/// Router, pool and vault backed by a shared balance table.
fn deployment() -> (MockChain, Arc<DashMap<Address, U256>>) {
    let chain = MockChain::new();
    let balances: Arc<DashMap<Address, U256>> = Default::default();
    let pool_id = B256::repeat_byte(0x77);

    chain.on_send::<FactoryRouter::deployPoolCall, _>(ROUTER, |_, _| {
        Ok(MockReceipt::success().with_event(
            ROUTER,
            &FactoryRouter::NewPool {
                poolAddress: POOL,
                isOcean: true,
            },
        ))
    });
    chain.on_view::<WeightedPool::getPoolIdCall, _>(POOL, move |_| Ok(pool_id));
    chain.on_view::<Vault::getPoolTokensCall, _>(BALANCER_VAULT, {
        let balances = balances.clone();
        move |_| {
            let tokens = vec![OCEAN, DATATOKEN];
            Ok(Vault::getPoolTokensReturn {
                balances: tokens
                    .iter()
                    .map(|token| balances.get(token).map(|b| *b).unwrap_or_default())
                    .collect(),
                tokens,
                lastChangeBlock: U256::ZERO,
            })
        }
    });
    for token in [OCEAN, DATATOKEN] {
        chain.on_view::<IERC20::allowanceCall, _>(token, |_| Ok(U256::ZERO));
    }
    chain.on_send::<Vault::joinPoolCall, _>(BALANCER_VAULT, {
        let balances = balances.clone();
        move |call, from| {
            let request = call.request;
            for (token, amount) in request.assets.iter().zip(&request.maxAmountsIn) {
                *balances.entry(*token).or_default() += *amount;
            }
            Ok(MockReceipt::success().with_event(
                BALANCER_VAULT,
                &Vault::PoolBalanceChanged {
                    poolId: call.poolId,
                    liquidityProvider: from,
                    tokens: request.assets,
                    deltas: request
                        .maxAmountsIn
                        .iter()
                        .map(|amount| I256::from_raw(*amount))
                        .collect(),
                    protocolFeeAmounts: vec![U256::ZERO; 2],
                },
            ))
        }
    });
    (chain, balances)
}

fn params() -> PoolParams {
    PoolParams {
        name: "OCEAN-DT pool".to_string(),
        symbol: "ODT".to_string(),
        tokens: vec![OCEAN, DATATOKEN],
        weights: vec![udec256!(0.5), udec256!(0.5)],
        swap_fee: udec256!(0.001),
        market_fee: udec256!(0.001),
        owner: ALICE,
    }
}

/// Deploys a pool, approves both tokens and adds initial liquidity.
#[tokio::test]
async fn test_create_pool_and_initial_join() {
    let (chain, balances) = deployment();
    let router = Router::new(ROUTER, BALANCER_VAULT, TxPipeline::new(chain.clone()));
    let mut steps = Vec::new();

    let (pool, change) = router
        .deploy_and_join(ALICE, &params(), &[udec256!(50), udec256!(100)], |step| {
            steps.push(step)
        })
        .await
        .unwrap();

    assert_eq!(pool.address(), POOL);
    assert_eq!(
        steps,
        vec![
            PoolCreateStep::CreatingPool,
            PoolCreateStep::ApprovingTokens,
            PoolCreateStep::ApprovingTokens,
            PoolCreateStep::AddInitialLiquidity,
        ]
    );
    assert_eq!(
        change.deltas,
        Some(vec![
            I256::from_raw(to_fixed_point(udec256!(50)).unwrap()),
            I256::from_raw(to_fixed_point(udec256!(100)).unwrap()),
        ])
    );
    assert_eq!(
        change.display_deltas(),
        Some(vec![dec256!(50), dec256!(100)])
    );

    let state = pool.pool_state().await.unwrap();
    assert_eq!(state.tokens, vec![OCEAN, DATATOKEN]);
    assert_eq!(*balances.get(&DATATOKEN).unwrap(), to_fixed_point(udec256!(100)).unwrap());

    // deploy, two approvals, join
    let sent = chain.sent();
    assert_eq!(sent.len(), 4);
    let approvals = chain.sent_calls::<IERC20::approveCall>();
    assert!(approvals.iter().all(|call| call.spender == BALANCER_VAULT));
    assert_eq!(approvals[0].amount, to_fixed_point(udec256!(50)).unwrap());
}

/// An exact-out exit the vault rejects surfaces as a failed transaction.
#[tokio::test]
async fn test_exit_exact_out_revert_propagates() {
    let (chain, _) = deployment();
    chain.on_send::<Vault::exitPoolCall, _>(BALANCER_VAULT, |_, _| Ok(MockChain::failed()));
    let router = Router::new(ROUTER, BALANCER_VAULT, TxPipeline::new(chain.clone()));
    let pool = router.pool(POOL);

    let err = pool
        .exit_exact_out(ALICE, &[udec256!(1000), udec256!(1)], udec256!(0.001))
        .await
        .unwrap_err();

    assert!(matches!(err, OceanError::TxFailed(_)));
    assert!(err.is_revert());
    let exits = chain.sent_calls::<Vault::exitPoolCall>();
    assert_eq!(exits.len(), 1);
    assert_eq!(exits[0].request.minAmountsOut[0], to_fixed_point(udec256!(1000)).unwrap());
}

/// Transactions still go out with the fallback limit when estimation fails.
#[tokio::test]
async fn test_gas_fallback_on_failed_estimate() {
    let (chain, _) = deployment();
    chain.set_gas_estimate(Err(OceanError::OutOfGas));
    let router = Router::new(ROUTER, BALANCER_VAULT, TxPipeline::new(chain.clone()));

    let pool = router.deploy_pool(ALICE, &params()).await.unwrap();

    assert_eq!(pool, POOL);
    assert_eq!(chain.estimates(), 1);
    assert_eq!(chain.sent()[0].gas, Some(DEFAULT_GAS_LIMIT + 1));
}
