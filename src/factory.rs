//! Data NFT and datatoken factories.

use alloy::{
    primitives::{Address, B256, U256},
    sol_types::SolCall,
};
use tracing::instrument;

use crate::{
    abi::factory::{ERC20Factory, ERC721Factory, Template},
    error::OceanError,
    tx::{ChainClient, PreparedCall, Receipt, TxPipeline},
};

/// Data NFT template used when none is specified.
pub const DEFAULT_NFT_TEMPLATE: u64 = 1;

/// Parameters of a new data NFT.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NftParams {
    pub name: String,
    pub symbol: String,
    /// URI of the metadata cache indexing the NFT.
    pub metadata_cache_uri: String,
    pub flags: B256,
    pub template_index: u64,
}

impl NftParams {
    pub fn new(
        name: impl Into<String>,
        symbol: impl Into<String>,
        metadata_cache_uri: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            metadata_cache_uri: metadata_cache_uri.into(),
            flags: B256::ZERO,
            template_index: DEFAULT_NFT_TEMPLATE,
        }
    }
}

#[derive(Clone, Debug)]
pub struct NftFactory<C> {
    address: Address,
    pipeline: TxPipeline<C>,
}

impl<C: ChainClient + Clone> NftFactory<C> {
    pub fn new(address: Address, pipeline: TxPipeline<C>) -> Self {
        Self { address, pipeline }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Deploys a data NFT owned by `caller` and returns its address.
    #[instrument(skip_all, fields(factory = %self.address, %caller, name = %params.name))]
    pub async fn create_nft(
        &self,
        caller: Address,
        params: NftParams,
    ) -> Result<Address, OceanError> {
        let call = ERC721Factory::deployERC721ContractCall {
            name: params.name,
            symbol: params.symbol,
            metadataCacheUri: params.metadata_cache_uri,
            flags: params.flags,
            templateIndex: U256::from(params.template_index),
        };
        let receipt = self.send(caller, call).await?;
        let created = receipt.require_event::<ERC721Factory::TokenCreated>()?;
        Ok(created.newTokenAddress)
    }

    pub async fn current_nft_count(&self) -> Result<u64, OceanError> {
        self.view(ERC721Factory::getCurrentTokenCountCall {})
            .await
            .map(|count| count.saturating_to())
    }

    pub async fn current_template_count(&self) -> Result<u64, OceanError> {
        self.view(ERC721Factory::getCurrentTemplateCountCall {})
            .await
            .map(|count| count.saturating_to())
    }

    pub async fn token_template(&self, index: u64) -> Result<Template, OceanError> {
        self.view(ERC721Factory::getTokenTemplateCall {
            index: U256::from(index),
        })
        .await
    }

    pub async fn add_token_template(
        &self,
        caller: Address,
        template: Address,
    ) -> Result<Receipt, OceanError> {
        self.send(
            caller,
            ERC721Factory::addTokenTemplateCall {
                templateAddress: template,
            },
        )
        .await
    }

    pub async fn disable_token_template(
        &self,
        caller: Address,
        index: u64,
    ) -> Result<Receipt, OceanError> {
        self.send(
            caller,
            ERC721Factory::disableTokenTemplateCall {
                index: U256::from(index),
            },
        )
        .await
    }

    pub async fn reactivate_token_template(
        &self,
        caller: Address,
        index: u64,
    ) -> Result<Receipt, OceanError> {
        self.send(
            caller,
            ERC721Factory::reactivateTokenTemplateCall {
                index: U256::from(index),
            },
        )
        .await
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

/// Datatoken factory. Datatokens themselves are created through
/// [`crate::nft::Nft::create_datatoken`].
#[derive(Clone, Debug)]
pub struct DatatokenFactory<C> {
    address: Address,
    pipeline: TxPipeline<C>,
}

impl<C: ChainClient + Clone> DatatokenFactory<C> {
    pub fn new(address: Address, pipeline: TxPipeline<C>) -> Self {
        Self { address, pipeline }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub async fn current_token_count(&self) -> Result<u64, OceanError> {
        self.view(ERC20Factory::getCurrentTokenCountCall {})
            .await
            .map(|count| count.saturating_to())
    }

    pub async fn current_template_count(&self) -> Result<u64, OceanError> {
        self.view(ERC20Factory::getCurrentTemplateCountCall {})
            .await
            .map(|count| count.saturating_to())
    }

    pub async fn token_template(&self, index: u64) -> Result<Template, OceanError> {
        self.view(ERC20Factory::getTokenTemplateCall {
            index: U256::from(index),
        })
        .await
    }

    /// Data NFT factory allowed to create datatokens.
    pub async fn nft_factory(&self) -> Result<Address, OceanError> {
        self.view(ERC20Factory::erc721FactoryCall {}).await
    }

    pub async fn add_token_template(
        &self,
        caller: Address,
        template: Address,
    ) -> Result<Receipt, OceanError> {
        self.send(
            caller,
            ERC20Factory::addTokenTemplateCall {
                templateAddress: template,
            },
        )
        .await
    }

    pub async fn disable_token_template(
        &self,
        caller: Address,
        index: u64,
    ) -> Result<Receipt, OceanError> {
        self.send(
            caller,
            ERC20Factory::disableTokenTemplateCall {
                index: U256::from(index),
            },
        )
        .await
    }

    pub async fn reactivate_token_template(
        &self,
        caller: Address,
        index: u64,
    ) -> Result<Receipt, OceanError> {
        self.send(
            caller,
            ERC20Factory::reactivateTokenTemplateCall {
                index: U256::from(index),
            },
        )
        .await
    }

    pub async fn set_nft_factory(
        &self,
        caller: Address,
        nft_factory: Address,
    ) -> Result<Receipt, OceanError> {
        self.send(
            caller,
            ERC20Factory::setERC721FactoryCall {
                erc721Factory: nft_factory,
            },
        )
        .await
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
