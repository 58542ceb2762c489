use alloy::rpc::types::TransactionRequest;
use tracing::debug;

use super::ChainClient;

/// Gas limit used when the node cannot estimate a call.
pub const DEFAULT_GAS_LIMIT: u64 = 1_000_000;

/// Margin added on top of an estimate to form the gas limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GasHeadroom {
    /// Fixed number of gas units.
    Absolute(u64),
    /// Percentage of the estimate, rounded up.
    Percent(u64),
}

impl Default for GasHeadroom {
    fn default() -> Self {
        Self::Absolute(1)
    }
}

impl GasHeadroom {
    pub fn apply(&self, estimate: u64) -> u64 {
        match *self {
            Self::Absolute(extra) => estimate.saturating_add(extra),
            Self::Percent(pct) => {
                let extra = (estimate as u128 * pct as u128).div_ceil(100);
                estimate.saturating_add(u64::try_from(extra).unwrap_or(u64::MAX))
            }
        }
    }
}

/// Gas price attached to submitted transactions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GasPrice {
    /// Left for the provider's fillers to decide.
    #[default]
    Node,
    /// Fixed price in wei.
    Fixed(u128),
    /// Current node price scaled by `multiplier_percent / 100`.
    Fair { multiplier_percent: u64 },
}

/// Result of [`GasPolicy::estimate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GasEstimate {
    Estimated(u64),
    Fallback(u64),
}

impl GasEstimate {
    pub fn units(&self) -> u64 {
        match *self {
            Self::Estimated(units) | Self::Fallback(units) => units,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

/// How gas limit and price of submitted transactions are chosen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GasPolicy {
    fallback_limit: u64,
    headroom: GasHeadroom,
    price: GasPrice,
}

impl Default for GasPolicy {
    fn default() -> Self {
        Self {
            fallback_limit: DEFAULT_GAS_LIMIT,
            headroom: GasHeadroom::default(),
            price: GasPrice::default(),
        }
    }
}

impl GasPolicy {
    pub fn with_fallback_limit(mut self, limit: u64) -> Self {
        self.fallback_limit = limit;
        self
    }

    pub fn with_headroom(mut self, headroom: GasHeadroom) -> Self {
        self.headroom = headroom;
        self
    }

    pub fn with_price(mut self, price: GasPrice) -> Self {
        self.price = price;
        self
    }

    pub fn fallback_limit(&self) -> u64 {
        self.fallback_limit
    }

    pub fn headroom(&self) -> GasHeadroom {
        self.headroom
    }

    pub fn price(&self) -> GasPrice {
        self.price
    }

    /// Asks the node for a gas estimate of `tx`.
    ///
    /// Never fails: any estimation error, including a simulated revert,
    /// yields [`GasEstimate::Fallback`] with the configured fallback limit.
    /// A call that would revert is left to fail at submission.
    pub async fn estimate<C: ChainClient + ?Sized>(
        &self,
        client: &C,
        tx: &TransactionRequest,
    ) -> GasEstimate {
        match client.estimate_gas(tx.clone()).await {
            Ok(units) => GasEstimate::Estimated(units),
            Err(err) => {
                debug!(
                    %err,
                    fallback = self.fallback_limit,
                    "gas estimation failed, using fallback limit"
                );
                GasEstimate::Fallback(self.fallback_limit)
            }
        }
    }

    /// Gas limit to submit with for a given estimate.
    pub fn limit(&self, estimate: GasEstimate) -> u64 {
        self.headroom.apply(estimate.units())
    }

    /// Resolves the gas price, `None` meaning the provider decides.
    ///
    /// A failing price query for [`GasPrice::Fair`] falls back to the
    /// provider as well.
    pub async fn resolve_price<C: ChainClient + ?Sized>(&self, client: &C) -> Option<u128> {
        match self.price {
            GasPrice::Node => None,
            GasPrice::Fixed(wei) => Some(wei),
            GasPrice::Fair { multiplier_percent } => match client.gas_price().await {
                Ok(node) => Some(node.saturating_mul(multiplier_percent as u128) / 100),
                Err(err) => {
                    debug!(%err, "gas price query failed, deferring to provider");
                    None
                }
            },
        }
    }
}
