use std::sync::Arc;

use alloy::{
    primitives::{Bytes, TxHash},
    providers::Provider,
    rpc::types::{Filter, Log, TransactionReceipt, TransactionRequest},
    sol_types::SolEvent,
};
use async_trait::async_trait;

use crate::error::OceanError;

/// Chain access required by the SDK.
///
/// [`ProviderClient`] implements it on top of any alloy [`Provider`];
/// [`crate::testing::MockChain`] implements it in memory.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// `eth_call` against the latest block.
    async fn call(&self, tx: TransactionRequest) -> Result<Bytes, OceanError>;

    async fn estimate_gas(&self, tx: TransactionRequest) -> Result<u64, OceanError>;

    async fn gas_price(&self) -> Result<u128, OceanError>;

    /// Submits the transaction and waits until it is included.
    async fn send(&self, tx: TransactionRequest) -> Result<Receipt, OceanError>;

    async fn logs(&self, filter: Filter) -> Result<Vec<Log>, OceanError>;

    async fn block_number(&self) -> Result<u64, OceanError>;
}

#[async_trait]
impl<T: ChainClient + ?Sized> ChainClient for Arc<T> {
    async fn call(&self, tx: TransactionRequest) -> Result<Bytes, OceanError> {
        (**self).call(tx).await
    }

    async fn estimate_gas(&self, tx: TransactionRequest) -> Result<u64, OceanError> {
        (**self).estimate_gas(tx).await
    }

    async fn gas_price(&self) -> Result<u128, OceanError> {
        (**self).gas_price().await
    }

    async fn send(&self, tx: TransactionRequest) -> Result<Receipt, OceanError> {
        (**self).send(tx).await
    }

    async fn logs(&self, filter: Filter) -> Result<Vec<Log>, OceanError> {
        (**self).logs(filter).await
    }

    async fn block_number(&self) -> Result<u64, OceanError> {
        (**self).block_number().await
    }
}

/// [`ChainClient`] backed by an alloy provider.
///
/// The provider is expected to carry a wallet filler for the sender
/// addresses used with state-changing operations.
#[derive(Clone, Debug)]
pub struct ProviderClient<P> {
    provider: P,
}

impl<P: Provider> ProviderClient<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

#[async_trait]
impl<P: Provider> ChainClient for ProviderClient<P> {
    async fn call(&self, tx: TransactionRequest) -> Result<Bytes, OceanError> {
        Ok(self.provider.call(tx).await?)
    }

    async fn estimate_gas(&self, tx: TransactionRequest) -> Result<u64, OceanError> {
        Ok(self.provider.estimate_gas(tx).await?)
    }

    async fn gas_price(&self) -> Result<u128, OceanError> {
        Ok(self.provider.get_gas_price().await?)
    }

    async fn send(&self, tx: TransactionRequest) -> Result<Receipt, OceanError> {
        let pending = self.provider.send_transaction(tx).await?;
        let receipt = pending.get_receipt().await?;
        Ok(receipt.into())
    }

    async fn logs(&self, filter: Filter) -> Result<Vec<Log>, OceanError> {
        Ok(self.provider.get_logs(&filter).await?)
    }

    async fn block_number(&self) -> Result<u64, OceanError> {
        Ok(self.provider.get_block_number().await?)
    }
}

/// Outcome of an included transaction.
#[derive(Clone, Debug)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    pub status: bool,
    pub logs: Vec<Log>,
}

impl Receipt {
    /// All logs decodable as `E`, in emission order.
    pub fn events<E: SolEvent>(&self) -> impl Iterator<Item = E> + '_ {
        self.logs
            .iter()
            .filter_map(|log| E::decode_log(&log.inner).ok().map(|decoded| decoded.data))
    }

    /// First log decodable as `E`.
    pub fn event<E: SolEvent>(&self) -> Option<E> {
        self.events::<E>().next()
    }

    /// Like [`Self::event`], but treats absence as an error: the
    /// transaction succeeded without producing the expected outcome.
    pub fn require_event<E: SolEvent>(&self) -> Result<E, OceanError> {
        self.event::<E>().ok_or(OceanError::EventNotFound {
            event: E::SIGNATURE,
            tx_hash: self.tx_hash,
        })
    }
}

impl From<TransactionReceipt> for Receipt {
    fn from(value: TransactionReceipt) -> Self {
        Self {
            tx_hash: value.transaction_hash,
            block_number: value.block_number,
            gas_used: value.gas_used,
            status: value.status(),
            logs: value.inner.logs().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy::{
        primitives::{Address, B256, LogData, U256},
        sol_types::SolEvent,
    };

    use super::*;
    use crate::abi::pool::FactoryRouter;

    fn new_pool_log(pool: Address) -> Log {
        let event = FactoryRouter::NewPool {
            poolAddress: pool,
            isOcean: true,
        };
        Log {
            inner: alloy::primitives::Log {
                address: Address::repeat_byte(0x11),
                data: event.encode_log_data(),
            },
            ..Default::default()
        }
    }

    fn receipt(logs: Vec<Log>) -> Receipt {
        Receipt {
            tx_hash: B256::repeat_byte(0xaa),
            block_number: Some(7),
            gas_used: 21_000,
            status: true,
            logs,
        }
    }

    #[test]
    fn test_event_skips_unrelated_logs() {
        let pool = Address::repeat_byte(0x42);
        let unrelated = Log {
            inner: alloy::primitives::Log {
                address: Address::repeat_byte(0x11),
                data: LogData::new_unchecked(
                    vec![B256::repeat_byte(0x01)],
                    U256::from(1).to_be_bytes_vec().into(),
                ),
            },
            ..Default::default()
        };
        let receipt = receipt(vec![unrelated, new_pool_log(pool)]);

        let event = receipt.event::<FactoryRouter::NewPool>().unwrap();
        assert_eq!(event.poolAddress, pool);
        assert_eq!(receipt.events::<FactoryRouter::NewPool>().count(), 1);
    }

    #[test]
    fn test_require_event_reports_missing_event() {
        let receipt = receipt(vec![]);
        let err = receipt
            .require_event::<FactoryRouter::NewPoolFork>()
            .unwrap_err();
        assert!(matches!(
            err,
            OceanError::EventNotFound { event, tx_hash }
                if event == FactoryRouter::NewPoolFork::SIGNATURE && tx_hash == receipt.tx_hash
        ));
    }
}
