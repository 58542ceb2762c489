//! Data NFT, datatoken and liquidity pool SDK.
//!
//! # Overview
//!
//! Typed wrappers over the data marketplace contracts: data NFTs
//! ([`nft::Nft`]), datatokens ([`datatoken::Datatoken`]), their factories
//! ([`factory`]), and weighted pools behind a Balancer-style vault
//! ([`pool`]).
//!
//! Every state-changing operation checks the caller's on-chain roles
//! first ([`permissions`]) and fails with
//! [`error::ProviderError::Unauthorized`] without sending anything when
//! they are missing. Calls then go through [`tx::TxPipeline`], which
//! estimates gas with a fallback, pads it, submits and waits for the
//! receipt. Display amounts ([`fastnum::UD256`]) are converted to 18
//! decimal fixed point by [`num`], pool join and exit payloads are
//! encoded by [`userdata`].
//!
//! [`Ocean`] bundles the wrappers of one [`config::Network`].
//!
//! [`metadata_cache`] is a thin client of the off-chain asset index.
//!
//! # Limitations/follow-ups
//!
//! * Only single swaps are supported, batch swaps are to follow.
//!
//! * Order history is scanned from logs on every query, there is no
//!   local index.
//!
//! # Testing
//!
//! [`testing::MockChain`] is an in-memory [`tx::ChainClient`] with
//! programmable contract responses. See `./tests` for end-to-end
//! scenarios.

pub mod abi;
pub mod config;
pub mod datatoken;
pub mod error;
pub mod factory;
pub mod metadata_cache;
pub mod nft;
pub mod num;
pub mod permissions;
pub mod pool;
pub mod testing;
pub mod tx;
pub mod userdata;

use alloy::primitives::Address;

use config::Network;
use datatoken::Datatoken;
use factory::{DatatokenFactory, NftFactory};
use metadata_cache::{MetadataCache, MetadataCacheError};
use nft::Nft;
use pool::{Pool, Router};
use tx::{ChainClient, TxPipeline};

/// Contract wrappers of one network sharing a pipeline.
#[derive(Clone, Debug)]
pub struct Ocean<C> {
    network: Network,
    pipeline: TxPipeline<C>,
}

impl<C: ChainClient + Clone> Ocean<C> {
    pub fn new(network: Network, pipeline: TxPipeline<C>) -> Self {
        Self { network, pipeline }
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn pipeline(&self) -> &TxPipeline<C> {
        &self.pipeline
    }

    pub fn nft_factory(&self) -> NftFactory<C> {
        NftFactory::new(self.network.nft_factory, self.pipeline.clone())
    }

    pub fn datatoken_factory(&self) -> DatatokenFactory<C> {
        DatatokenFactory::new(self.network.datatoken_factory, self.pipeline.clone())
    }

    pub fn router(&self) -> Router<C> {
        Router::new(self.network.router, self.network.vault, self.pipeline.clone())
    }

    pub fn nft(&self, address: Address) -> Nft<C> {
        Nft::new(address, self.pipeline.clone())
    }

    /// Order scans start at the network's start block.
    pub fn datatoken(&self, address: Address) -> Datatoken<C> {
        Datatoken::new(address, self.pipeline.clone()).with_start_block(self.network.start_block)
    }

    pub fn pool(&self, address: Address) -> Pool<C> {
        Pool::new(address, self.network.vault, self.pipeline.clone())
    }

    /// `None` when the network has no metadata cache configured.
    pub fn metadata_cache(&self) -> Option<Result<MetadataCache, MetadataCacheError>> {
        self.network
            .metadata_cache_uri
            .as_ref()
            .map(|uri| MetadataCache::new(uri.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{U256, address};

    use super::*;
    use crate::{abi::pool::IERC20, pool::BALANCER_VAULT, testing::MockChain};

    fn network() -> Network {
        Network {
            chain_id: 8996,
            name: "development".to_string(),
            nft_factory: address!("0x0000000000000000000000000000000000000f01"),
            datatoken_factory: address!("0x0000000000000000000000000000000000000f02"),
            router: address!("0x0000000000000000000000000000000000000e01"),
            vault: BALANCER_VAULT,
            ocean_token: None,
            metadata_cache_uri: None,
            start_block: 0,
        }
    }

    #[tokio::test]
    async fn test_wrappers_share_pipeline() {
        let chain = MockChain::new();
        let token = address!("0x0000000000000000000000000000000000000d01");
        let holder = address!("0x0000000000000000000000000000000000000b01");
        chain.on_view::<IERC20::balanceOfCall, _>(token, |_| {
            Ok(U256::from(10).pow(U256::from(18)))
        });
        let ocean = Ocean::new(network(), TxPipeline::new(chain));

        assert_eq!(ocean.router().address(), ocean.network().router);
        assert_eq!(ocean.nft_factory().address(), ocean.network().nft_factory);
        assert!(ocean.metadata_cache().is_none());

        let balance = ocean.pool(token).token_balance(token, holder).await.unwrap();
        assert_eq!(balance, fastnum::udec256!(1));
    }
}
