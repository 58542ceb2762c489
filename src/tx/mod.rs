//! Transaction pipeline shared by all entity wrappers.
//!
//! Every state-changing operation goes through [`TxPipeline::submit`]:
//! gas is estimated with a fallback ([`GasPolicy::estimate`]), the limit
//! is padded with the configured [`GasHeadroom`], the price resolved per
//! [`GasPrice`], and the transaction is sent and awaited until included.
//! A failed receipt is reported as [`OceanError::TxFailed`], a rejected
//! submission with the classified node error.
//!
//! Node requests are paced by the pipeline's [`Throttle`].

mod client;
mod gas;
mod throttle;

pub use client::{ChainClient, ProviderClient, Receipt};
pub use gas::{DEFAULT_GAS_LIMIT, GasEstimate, GasHeadroom, GasPolicy, GasPrice};
pub use throttle::{PROVIDER_REQUESTS_PER_SECOND, Throttle, ThrottlePermit};

use alloy::{
    primitives::{Address, Bytes, U256},
    rpc::types::{Filter, Log, TransactionRequest},
    sol_types::SolCall,
};
use tracing::{info, instrument, warn};

use crate::error::OceanError;

/// Fully encoded contract call, ready for estimation or submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedCall {
    pub to: Address,
    pub from: Address,
    pub input: Bytes,
    pub value: U256,
    /// Function signature, for logs.
    pub label: &'static str,
}

impl PreparedCall {
    pub fn new<T: SolCall>(to: Address, from: Address, call: &T) -> Self {
        Self {
            to,
            from,
            input: call.abi_encode().into(),
            value: U256::ZERO,
            label: T::SIGNATURE,
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn request(&self) -> TransactionRequest {
        let mut tx = TransactionRequest::default()
            .from(self.from)
            .to(self.to)
            .input(self.input.clone().into());
        if !self.value.is_zero() {
            tx.value = Some(self.value);
        }
        tx
    }
}

/// Chain client plus the gas and throttling policies applied to it.
#[derive(Clone, Debug)]
pub struct TxPipeline<C> {
    client: C,
    gas: GasPolicy,
    throttle: Throttle,
}

impl<C: ChainClient> TxPipeline<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            gas: GasPolicy::default(),
            throttle: Throttle::default(),
        }
    }

    pub fn with_gas_policy(mut self, gas: GasPolicy) -> Self {
        self.gas = gas;
        self
    }

    pub fn with_throttle(mut self, throttle: Throttle) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn gas_policy(&self) -> &GasPolicy {
        &self.gas
    }

    /// Executes a read-only call and decodes its return value.
    pub async fn view<T: SolCall>(&self, to: Address, call: T) -> Result<T::Return, OceanError> {
        let tx = TransactionRequest::default()
            .to(to)
            .input(Bytes::from(call.abi_encode()).into());
        let output = {
            let _permit = self.throttle.acquire().await;
            self.client.call(tx).await?
        };
        Ok(T::abi_decode_returns(&output)?)
    }

    /// Gas estimate for `call`, never failing.
    pub async fn estimate(&self, call: &PreparedCall) -> GasEstimate {
        let _permit = self.throttle.acquire().await;
        self.gas.estimate(&self.client, &call.request()).await
    }

    #[instrument(skip_all, fields(call = call.label, to = %call.to, from = %call.from))]
    pub async fn submit(&self, call: PreparedCall) -> Result<Receipt, OceanError> {
        let estimate = self.estimate(&call).await;
        let gas_limit = self.gas.limit(estimate);
        let gas_price = match self.gas.price() {
            GasPrice::Fair { .. } => {
                let _permit = self.throttle.acquire().await;
                self.gas.resolve_price(&self.client).await
            }
            _ => self.gas.resolve_price(&self.client).await,
        };

        let mut tx = call.request();
        tx.gas = Some(gas_limit);
        tx.gas_price = gas_price;

        info!(gas_limit, fallback = estimate.is_fallback(), "submitting transaction");
        let receipt = {
            let _permit = self.throttle.acquire().await;
            self.client.send(tx).await
        }
        .inspect_err(|err| warn!(%err, "transaction rejected"))?;

        if !receipt.status {
            warn!(tx_hash = %receipt.tx_hash, "transaction reverted");
            return Err(OceanError::TxFailed(receipt.tx_hash));
        }
        info!(tx_hash = %receipt.tx_hash, gas_used = receipt.gas_used, "transaction confirmed");
        Ok(receipt)
    }

    pub async fn logs(&self, filter: Filter) -> Result<Vec<Log>, OceanError> {
        let _permit = self.throttle.acquire().await;
        self.client.logs(filter).await
    }

    pub async fn block_number(&self) -> Result<u64, OceanError> {
        let _permit = self.throttle.acquire().await;
        self.client.block_number().await
    }
}

#[cfg(test)]
mod tests {
    use alloy::{primitives::address, sol_types::SolCall};

    use super::*;
    use crate::{abi::pool::IERC20, testing::MockChain};

    const TOKEN: Address = address!("0x00000000000000000000000000000000000000aa");
    const OWNER: Address = address!("0x00000000000000000000000000000000000000bb");

    #[tokio::test]
    async fn test_view_decodes_return() {
        let chain = MockChain::new();
        chain.on_view::<IERC20::balanceOfCall, _>(TOKEN, |call| {
            assert_eq!(call.account, OWNER);
            Ok(U256::from(42))
        });
        let pipeline = TxPipeline::new(chain);

        let balance = pipeline
            .view(TOKEN, IERC20::balanceOfCall { account: OWNER })
            .await
            .unwrap();
        assert_eq!(balance, U256::from(42));
    }

    #[tokio::test]
    async fn test_submit_pads_estimate_and_sets_price() {
        let chain = MockChain::new();
        chain.set_gas_estimate(Ok(50_000));
        chain.set_gas_price(10);
        let pipeline = TxPipeline::new(chain.clone()).with_gas_policy(
            GasPolicy::default()
                .with_headroom(GasHeadroom::Percent(10))
                .with_price(GasPrice::Fair {
                    multiplier_percent: 200,
                }),
        );
        let call = PreparedCall::new(
            TOKEN,
            OWNER,
            &IERC20::approveCall {
                spender: OWNER,
                amount: U256::from(1),
            },
        );

        let receipt = pipeline.submit(call).await.unwrap();
        assert!(receipt.status);

        let sent = chain.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].gas, Some(55_000));
        assert_eq!(sent[0].gas_price, Some(20));
        assert_eq!(sent[0].from, Some(OWNER));
        assert_eq!(sent[0].selector(), Some(IERC20::approveCall::SELECTOR));
    }

    #[tokio::test]
    async fn test_submit_with_fallback_when_estimate_fails() {
        let chain = MockChain::new();
        chain.set_gas_estimate(Err(OceanError::OutOfGas));
        let pipeline = TxPipeline::new(chain.clone());
        let call = PreparedCall::new(
            TOKEN,
            OWNER,
            &IERC20::approveCall {
                spender: OWNER,
                amount: U256::from(1),
            },
        );

        pipeline.submit(call).await.unwrap();
        assert_eq!(chain.sent()[0].gas, Some(DEFAULT_GAS_LIMIT + 1));
    }

    #[tokio::test]
    async fn test_submit_reports_failed_receipt() {
        let chain = MockChain::new();
        chain.on_send::<IERC20::approveCall, _>(TOKEN, |_, _| Ok(MockChain::failed()));
        let pipeline = TxPipeline::new(chain);
        let call = PreparedCall::new(
            TOKEN,
            OWNER,
            &IERC20::approveCall {
                spender: OWNER,
                amount: U256::from(1),
            },
        );

        let err = pipeline.submit(call).await.unwrap_err();
        assert!(matches!(err, OceanError::TxFailed(_)));
        assert!(err.is_revert());
    }
}
