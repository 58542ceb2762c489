//! In-memory testing environment.
//!
//! [`MockChain`] implements [`ChainClient`] without a node: view calls and
//! transactions are dispatched by target contract and function selector to
//! closures registered with [`MockChain::on_view`] and
//! [`MockChain::on_send`]. Handlers share state through whatever they
//! capture, typically a [`dashmap::DashMap`], which lets tests model
//! contract behaviour such as role tables or pool balances.
//!
//! Every submitted transaction is recorded and can be inspected with
//! [`MockChain::sent`].

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU64, AtomicUsize, Ordering},
};

use alloy::{
    primitives::{Address, B256, Bytes, U256},
    rpc::types::{Filter, Log, TransactionRequest},
    sol_types::{SolCall, SolEvent},
};
use async_trait::async_trait;
use dashmap::DashMap;

use crate::{
    error::OceanError,
    tx::{ChainClient, Receipt},
};

/// Gas reported by [`MockChain`] when no estimate was configured.
pub const MOCK_GAS_ESTIMATE: u64 = 100_000;

type Selector = [u8; 4];
type ViewHandler = Arc<dyn Fn(&[u8]) -> Result<Bytes, OceanError> + Send + Sync>;
type SendHandler = Arc<dyn Fn(&[u8], Address) -> Result<MockReceipt, OceanError> + Send + Sync>;

/// Outcome of a transaction produced by a [`MockChain::on_send`] handler.
#[derive(Clone, Debug, Default)]
pub struct MockReceipt {
    pub status: bool,
    pub logs: Vec<alloy::primitives::Log>,
}

impl MockReceipt {
    pub fn success() -> Self {
        Self {
            status: true,
            logs: Vec::new(),
        }
    }

    /// Appends `event` as emitted by `emitter`.
    pub fn with_event<E: SolEvent>(mut self, emitter: Address, event: &E) -> Self {
        self.logs.push(alloy::primitives::Log {
            address: emitter,
            data: event.encode_log_data(),
        });
        self
    }
}

/// Transaction captured by [`MockChain`].
#[derive(Clone, Debug)]
pub struct SentTx {
    pub to: Option<Address>,
    pub from: Option<Address>,
    pub gas: Option<u64>,
    pub gas_price: Option<u128>,
    pub value: Option<U256>,
    pub input: Bytes,
}

impl SentTx {
    pub fn selector(&self) -> Option<Selector> {
        self.input.get(..4).and_then(|s| s.try_into().ok())
    }

    /// Decodes the calldata as `T`, if it is a call to `T`.
    pub fn decode<T: SolCall>(&self) -> Option<T> {
        T::abi_decode(&self.input).ok()
    }
}

#[derive(Default)]
struct Inner {
    views: DashMap<(Address, Selector), ViewHandler>,
    sends: DashMap<(Address, Selector), SendHandler>,
    gas_estimate: Mutex<Option<Result<u64, OceanError>>>,
    gas_price: Mutex<u128>,
    block_number: AtomicU64,
    estimates: AtomicUsize,
    sent: Mutex<Vec<SentTx>>,
    logs: Mutex<Vec<Log>>,
}

/// In-memory [`ChainClient`], cheap to clone; clones share state.
#[derive(Clone, Default, derive_more::Debug)]
pub struct MockChain {
    #[debug(skip)]
    inner: Arc<Inner>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receipt of a mined transaction that reverted.
    pub fn failed() -> MockReceipt {
        MockReceipt {
            status: false,
            logs: Vec::new(),
        }
    }

    /// Answers view calls of `T` on `contract` with `handler`.
    pub fn on_view<T, F>(&self, contract: Address, handler: F)
    where
        T: SolCall,
        F: Fn(T) -> Result<T::Return, OceanError> + Send + Sync + 'static,
    {
        let handler: ViewHandler = Arc::new(move |data: &[u8]| {
            let call = T::abi_decode(data)?;
            let ret = handler(call)?;
            Ok(Bytes::from(T::abi_encode_returns(&ret)))
        });
        self.inner.views.insert((contract, T::SELECTOR), handler);
    }

    /// Executes transactions calling `T` on `contract` with `handler`,
    /// which receives the decoded call and the sender.
    ///
    /// Without a handler, transactions succeed without logs.
    pub fn on_send<T, F>(&self, contract: Address, handler: F)
    where
        T: SolCall,
        F: Fn(T, Address) -> Result<MockReceipt, OceanError> + Send + Sync + 'static,
    {
        let handler: SendHandler = Arc::new(move |data: &[u8], from: Address| {
            let call = T::abi_decode(data)?;
            handler(call, from)
        });
        self.inner.sends.insert((contract, T::SELECTOR), handler);
    }

    /// Overrides the gas estimate returned for every transaction.
    pub fn set_gas_estimate(&self, estimate: Result<u64, OceanError>) {
        if let Ok(mut slot) = self.inner.gas_estimate.lock() {
            *slot = Some(estimate);
        }
    }

    pub fn set_gas_price(&self, wei: u128) {
        if let Ok(mut price) = self.inner.gas_price.lock() {
            *price = wei;
        }
    }

    pub fn set_block_number(&self, number: u64) {
        self.inner.block_number.store(number, Ordering::SeqCst);
    }

    /// Makes `log` visible to [`ChainClient::logs`].
    pub fn push_log(&self, log: Log) {
        if let Ok(mut logs) = self.inner.logs.lock() {
            logs.push(log);
        }
    }

    /// Transactions submitted so far, oldest first.
    pub fn sent(&self) -> Vec<SentTx> {
        self.inner
            .sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    /// Submitted transactions calling `T`, decoded.
    pub fn sent_calls<T: SolCall>(&self) -> Vec<T> {
        self.sent().iter().filter_map(SentTx::decode::<T>).collect()
    }

    /// Number of gas estimations requested.
    pub fn estimates(&self) -> usize {
        self.inner.estimates.load(Ordering::SeqCst)
    }

    fn route(tx: &TransactionRequest) -> Result<(Address, Selector), OceanError> {
        let to = tx
            .to
            .and_then(|kind| kind.to().copied())
            .ok_or_else(|| OceanError::InvalidRequest("missing recipient".to_string()))?;
        let selector = tx
            .input
            .input()
            .and_then(|input| input.get(..4))
            .and_then(|s| Selector::try_from(s).ok())
            .ok_or_else(|| OceanError::InvalidRequest("missing selector".to_string()))?;
        Ok((to, selector))
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn call(&self, tx: TransactionRequest) -> Result<Bytes, OceanError> {
        let key = Self::route(&tx)?;
        let handler = self
            .inner
            .views
            .get(&key)
            .map(|h| h.value().clone())
            .ok_or_else(|| {
                OceanError::Fatal(format!(
                    "no view handler for {} on {}",
                    alloy::hex::encode(key.1),
                    key.0
                ))
            })?;
        handler(tx.input.input().map(|b| b.as_ref()).unwrap_or_default())
    }

    async fn estimate_gas(&self, _tx: TransactionRequest) -> Result<u64, OceanError> {
        self.inner.estimates.fetch_add(1, Ordering::SeqCst);
        match self.inner.gas_estimate.lock() {
            Ok(slot) => slot.clone().unwrap_or(Ok(MOCK_GAS_ESTIMATE)),
            Err(_) => Ok(MOCK_GAS_ESTIMATE),
        }
    }

    async fn gas_price(&self) -> Result<u128, OceanError> {
        Ok(self
            .inner
            .gas_price
            .lock()
            .map(|price| *price)
            .unwrap_or_default())
    }

    async fn send(&self, tx: TransactionRequest) -> Result<Receipt, OceanError> {
        let (to, selector) = Self::route(&tx)?;
        let from = tx.from.unwrap_or_default();
        let input = tx.input.input().cloned().unwrap_or_default();
        if let Ok(mut sent) = self.inner.sent.lock() {
            sent.push(SentTx {
                to: Some(to),
                from: tx.from,
                gas: tx.gas,
                gas_price: tx.gas_price,
                value: tx.value,
                input: input.clone(),
            });
        }

        let handler = self
            .inner
            .sends
            .get(&(to, selector))
            .map(|h| h.value().clone());
        let outcome = match handler {
            Some(handler) => handler(&input, from)?,
            None => MockReceipt::success(),
        };

        let block_number = self.inner.block_number.fetch_add(1, Ordering::SeqCst) + 1;
        let tx_hash = B256::left_padding_from(&block_number.to_be_bytes());
        let logs = outcome
            .logs
            .into_iter()
            .enumerate()
            .map(|(index, inner)| Log {
                inner,
                block_number: Some(block_number),
                transaction_hash: Some(tx_hash),
                log_index: Some(index as u64),
                ..Default::default()
            })
            .collect();

        Ok(Receipt {
            tx_hash,
            block_number: Some(block_number),
            gas_used: tx.gas.unwrap_or(MOCK_GAS_ESTIMATE).min(MOCK_GAS_ESTIMATE),
            status: outcome.status,
            logs,
        })
    }

    async fn logs(&self, filter: Filter) -> Result<Vec<Log>, OceanError> {
        let logs = self
            .inner
            .logs
            .lock()
            .map(|logs| logs.clone())
            .unwrap_or_default();
        Ok(logs
            .into_iter()
            .filter(|log| log_matches(&filter, log))
            .collect())
    }

    async fn block_number(&self) -> Result<u64, OceanError> {
        Ok(self.inner.block_number.load(Ordering::SeqCst))
    }
}

fn log_matches(filter: &Filter, log: &Log) -> bool {
    let topics = log.topics();
    let in_range = match (filter.get_from_block(), log.block_number) {
        (Some(from), Some(number)) => number >= from,
        _ => true,
    };
    in_range
        && filter.address.matches(&log.address())
        && filter.topics.iter().enumerate().all(|(i, set)| {
            set.is_empty() || topics.get(i).is_some_and(|topic| set.matches(topic))
        })
}
