//! Data NFT (ERC-721 template) wrapper.
//!
//! A data NFT holds a single token, [`DATA_NFT_TOKEN_ID`], whose owner
//! administers the NFT. Every state-changing method takes the sending
//! account as `caller`, checks the role it needs against fresh contract
//! state and only then submits through the [`TxPipeline`].

use alloy::primitives::{Address, B256, Bytes, U256};
use rand::Rng;
use tracing::instrument;

use crate::{
    abi::{factory::ERC721Factory, nft::ERC721Template},
    error::OceanError,
    permissions::{NftRole, NftRoles, Requirement, require},
    tx::{ChainClient, PreparedCall, Receipt, TxPipeline},
};

/// Token id of the single token a data NFT mints on creation.
pub const DATA_NFT_TOKEN_ID: U256 = U256::from_limbs([1, 0, 0, 0]);

/// Datatoken template used when none is specified.
pub const DEFAULT_DATATOKEN_TEMPLATE: u64 = 1;

/// Cap of generated datatokens, in whole tokens.
pub const DEFAULT_DATATOKEN_CAP: u64 = 1000;

const NAME_ADJECTIVES: &[&str] = &[
    "adamant", "brisk", "cosmic", "dapper", "endemic", "feral", "gentle", "humble", "lucid",
    "nimble", "radiant", "stellar", "tidal", "vivid",
];

const NAME_NOUNS: &[&str] = &[
    "badger", "coral", "dolphin", "krill", "lobster", "manatee", "marlin", "narwhal", "octopus",
    "pelican", "squid", "turtle", "urchin", "walrus",
];

/// Random datatoken name and symbol, e.g. `"Endemic Narwhal Token"` and
/// `"ENDNAR-45"`.
pub fn generate_datatoken_name<R: Rng>(rng: &mut R) -> (String, String) {
    let adjective = capitalize(NAME_ADJECTIVES[rng.gen_range(0..NAME_ADJECTIVES.len())]);
    let noun = capitalize(NAME_NOUNS[rng.gen_range(0..NAME_NOUNS.len())]);
    let index = rng.gen_range(0..100u8);
    let symbol = format!("{}{}-{index}", adjective[..3].to_uppercase(), noun[..3].to_uppercase());
    (format!("{adjective} {noun} Token"), symbol)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Parameters of a datatoken created from a data NFT.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatatokenParams {
    pub template_index: u64,
    pub name: String,
    pub symbol: String,
    pub minter: Address,
    pub payment_collector: Address,
    /// Marketplace receiving the consume fee.
    pub mp_fee_address: Address,
    pub fee_token: Address,
    /// Fixed point.
    pub cap: U256,
    /// Fixed point, in `fee_token`.
    pub fee_amount: U256,
}

impl DatatokenParams {
    /// Datatoken minted by and paying to `minter`, without marketplace fee.
    pub fn new(
        name: impl Into<String>,
        symbol: impl Into<String>,
        minter: Address,
        cap: U256,
    ) -> Self {
        Self {
            template_index: DEFAULT_DATATOKEN_TEMPLATE,
            name: name.into(),
            symbol: symbol.into(),
            minter,
            payment_collector: minter,
            mp_fee_address: Address::ZERO,
            fee_token: Address::ZERO,
            cap,
            fee_amount: U256::ZERO,
        }
    }

    /// Datatoken with a generated name and symbol and a cap of
    /// [`DEFAULT_DATATOKEN_CAP`] tokens.
    pub fn generated(minter: Address) -> Self {
        let (name, symbol) = generate_datatoken_name(&mut rand::thread_rng());
        let cap = U256::from(DEFAULT_DATATOKEN_CAP) * U256::from(10).pow(U256::from(18));
        Self::new(name, symbol, minter, cap)
    }

    fn into_call(self) -> ERC721Template::createERC20Call {
        ERC721Template::createERC20Call {
            templateIndex: U256::from(self.template_index),
            strings: vec![self.name, self.symbol],
            addresses: vec![
                self.minter,
                self.payment_collector,
                self.mp_fee_address,
                self.fee_token,
            ],
            uints: vec![self.cap, self.fee_amount],
            bytess: vec![],
        }
    }
}

/// Metadata record published on a data NFT.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetadataUpdate {
    pub state: u8,
    pub decryptor_url: String,
    pub decryptor_address: String,
    pub flags: Bytes,
    pub data: Bytes,
    pub hash: B256,
    pub proofs: Vec<ERC721Template::MetadataProof>,
}

/// Metadata currently stored on a data NFT.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NftMetadata {
    pub decryptor_url: String,
    pub decryptor_address: String,
    pub state: u8,
    pub has_metadata: bool,
}

#[derive(Clone, Debug)]
pub struct Nft<C> {
    address: Address,
    pipeline: TxPipeline<C>,
}

impl<C: ChainClient + Clone> Nft<C> {
    pub fn new(address: Address, pipeline: TxPipeline<C>) -> Self {
        Self { address, pipeline }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub async fn owner(&self) -> Result<Address, OceanError> {
        self.view(ERC721Template::ownerOfCall {
            tokenId: DATA_NFT_TOKEN_ID,
        })
        .await
    }

    pub async fn permissions(&self, holder: Address) -> Result<NftRoles, OceanError> {
        self.view(ERC721Template::getPermissionsCall { user: holder })
            .await
            .map(NftRoles::from)
    }

    pub async fn is_datatoken_deployer(&self, account: Address) -> Result<bool, OceanError> {
        self.view(ERC721Template::isERC20DeployerCall { account })
            .await
    }

    pub async fn name(&self) -> Result<String, OceanError> {
        self.view(ERC721Template::nameCall {}).await
    }

    pub async fn symbol(&self) -> Result<String, OceanError> {
        self.view(ERC721Template::symbolCall {}).await
    }

    pub async fn token_uri(&self, token_id: U256) -> Result<String, OceanError> {
        self.view(ERC721Template::tokenURICall { tokenId: token_id })
            .await
    }

    pub async fn metadata(&self) -> Result<NftMetadata, OceanError> {
        let ret = self.view(ERC721Template::getMetaDataCall {}).await?;
        Ok(NftMetadata {
            decryptor_url: ret._0,
            decryptor_address: ret._1,
            state: ret._2,
            has_metadata: ret._3,
        })
    }

    /// Value stored under `key` by [`Self::set_new_data`].
    pub async fn data(&self, key: B256) -> Result<Bytes, OceanError> {
        self.view(ERC721Template::getDataCall { key }).await
    }

    /// Whether `caller` currently satisfies `requirement` on this NFT.
    pub async fn satisfies(
        &self,
        caller: Address,
        requirement: Requirement,
    ) -> Result<bool, OceanError> {
        match requirement {
            Requirement::NftOwner => Ok(self.owner().await? == caller),
            Requirement::Nft(role) => Ok(self.permissions(caller).await?.has(role)),
            other => Err(OceanError::InvalidArgument(format!(
                "`{other}` does not apply to a data NFT"
            ))),
        }
    }

    /// Fails with [`OceanError::Unauthorized`] unless `caller` satisfies
    /// `requirement`.
    pub async fn ensure(
        &self,
        caller: Address,
        requirement: Requirement,
    ) -> Result<(), OceanError> {
        let satisfied = self.satisfies(caller, requirement).await?;
        require(satisfied, caller, self.address, requirement)
    }

    /// Creates a datatoken and returns its address.
    #[instrument(skip_all, fields(nft = %self.address, %caller, name = %params.name))]
    pub async fn create_datatoken(
        &self,
        caller: Address,
        params: DatatokenParams,
    ) -> Result<Address, OceanError> {
        self.ensure(caller, Requirement::Nft(NftRole::DatatokenDeployer))
            .await?;
        let receipt = self.send(caller, params.into_call()).await?;
        let created = receipt.require_event::<ERC721Factory::TokenCreated>()?;
        Ok(created.newTokenAddress)
    }

    /// Grants `role` to `holder`.
    ///
    /// The manager role is granted by the NFT owner, every other role by a
    /// manager.
    pub async fn grant_role(
        &self,
        caller: Address,
        holder: Address,
        role: NftRole,
    ) -> Result<Receipt, OceanError> {
        let requirement = match role {
            NftRole::Manager => Requirement::NftOwner,
            _ => Requirement::Nft(NftRole::Manager),
        };
        self.ensure(caller, requirement).await?;
        self.pipeline
            .submit(self.role_call(caller, holder, role, true))
            .await
    }

    /// Revokes `role` from `holder`.
    ///
    /// Managers are removed by the NFT owner. Other roles are removed by a
    /// manager, or by the holder itself.
    pub async fn revoke_role(
        &self,
        caller: Address,
        holder: Address,
        role: NftRole,
    ) -> Result<Receipt, OceanError> {
        let requirement = match role {
            NftRole::Manager => Requirement::NftOwner,
            _ if caller == holder => Requirement::Nft(role),
            _ => Requirement::Nft(NftRole::Manager),
        };
        self.ensure(caller, requirement).await?;
        self.pipeline
            .submit(self.role_call(caller, holder, role, false))
            .await
    }

    pub async fn add_manager(
        &self,
        caller: Address,
        manager: Address,
    ) -> Result<Receipt, OceanError> {
        self.grant_role(caller, manager, NftRole::Manager).await
    }

    pub async fn remove_manager(
        &self,
        caller: Address,
        manager: Address,
    ) -> Result<Receipt, OceanError> {
        self.revoke_role(caller, manager, NftRole::Manager).await
    }

    pub async fn add_datatoken_deployer(
        &self,
        caller: Address,
        deployer: Address,
    ) -> Result<Receipt, OceanError> {
        self.grant_role(caller, deployer, NftRole::DatatokenDeployer)
            .await
    }

    pub async fn remove_datatoken_deployer(
        &self,
        caller: Address,
        deployer: Address,
    ) -> Result<Receipt, OceanError> {
        self.revoke_role(caller, deployer, NftRole::DatatokenDeployer)
            .await
    }

    pub async fn add_metadata_updater(
        &self,
        caller: Address,
        updater: Address,
    ) -> Result<Receipt, OceanError> {
        self.grant_role(caller, updater, NftRole::MetadataUpdater)
            .await
    }

    pub async fn remove_metadata_updater(
        &self,
        caller: Address,
        updater: Address,
    ) -> Result<Receipt, OceanError> {
        self.revoke_role(caller, updater, NftRole::MetadataUpdater)
            .await
    }

    pub async fn add_store_updater(
        &self,
        caller: Address,
        updater: Address,
    ) -> Result<Receipt, OceanError> {
        self.grant_role(caller, updater, NftRole::StoreUpdater)
            .await
    }

    pub async fn remove_store_updater(
        &self,
        caller: Address,
        updater: Address,
    ) -> Result<Receipt, OceanError> {
        self.revoke_role(caller, updater, NftRole::StoreUpdater)
            .await
    }

    pub async fn add_v3_minter(
        &self,
        caller: Address,
        minter: Address,
    ) -> Result<Receipt, OceanError> {
        self.grant_role(caller, minter, NftRole::V3Minter).await
    }

    pub async fn remove_v3_minter(
        &self,
        caller: Address,
        minter: Address,
    ) -> Result<Receipt, OceanError> {
        self.revoke_role(caller, minter, NftRole::V3Minter).await
    }

    /// Revokes every role of every holder.
    pub async fn clean_permissions(&self, caller: Address) -> Result<Receipt, OceanError> {
        self.ensure(caller, Requirement::NftOwner).await?;
        self.send(caller, ERC721Template::cleanPermissionsCall {})
            .await
    }

    pub async fn transfer(
        &self,
        caller: Address,
        receiver: Address,
        token_id: U256,
    ) -> Result<Receipt, OceanError> {
        self.ensure(caller, Requirement::NftOwner).await?;
        self.send(
            caller,
            ERC721Template::transferFromCall {
                from: caller,
                to: receiver,
                tokenId: token_id,
            },
        )
        .await
    }

    /// Like [`Self::transfer`], reverting if `receiver` is a contract
    /// that does not accept ERC-721 tokens.
    pub async fn safe_transfer(
        &self,
        caller: Address,
        receiver: Address,
        token_id: U256,
    ) -> Result<Receipt, OceanError> {
        self.ensure(caller, Requirement::NftOwner).await?;
        self.send(
            caller,
            ERC721Template::safeTransferFromCall {
                from: caller,
                to: receiver,
                tokenId: token_id,
            },
        )
        .await
    }

    pub async fn set_metadata(
        &self,
        caller: Address,
        metadata: MetadataUpdate,
    ) -> Result<Receipt, OceanError> {
        self.ensure(caller, Requirement::Nft(NftRole::MetadataUpdater))
            .await?;
        self.send(
            caller,
            ERC721Template::setMetaDataCall {
                metaDataState: metadata.state,
                metaDataDecryptorUrl: metadata.decryptor_url,
                metaDataDecryptorAddress: metadata.decryptor_address,
                flags: metadata.flags,
                data: metadata.data,
                metaDataHash: metadata.hash,
                metadataProofs: metadata.proofs,
            },
        )
        .await
    }

    pub async fn set_metadata_state(
        &self,
        caller: Address,
        state: u8,
    ) -> Result<Receipt, OceanError> {
        self.ensure(caller, Requirement::Nft(NftRole::MetadataUpdater))
            .await?;
        self.send(
            caller,
            ERC721Template::setMetaDataStateCall {
                metaDataState: state,
            },
        )
        .await
    }

    /// Publishes metadata and updates the URI of [`DATA_NFT_TOKEN_ID`] in
    /// one transaction.
    pub async fn set_metadata_and_token_uri(
        &self,
        caller: Address,
        metadata: MetadataUpdate,
        token_uri: String,
    ) -> Result<Receipt, OceanError> {
        self.ensure(caller, Requirement::Nft(NftRole::MetadataUpdater))
            .await?;
        self.send(
            caller,
            ERC721Template::setMetaDataAndTokenURICall {
                metaDataAndTokenURI: ERC721Template::MetadataAndTokenUri {
                    metaDataState: metadata.state,
                    metaDataDecryptorUrl: metadata.decryptor_url,
                    metaDataDecryptorAddress: metadata.decryptor_address,
                    flags: metadata.flags,
                    data: metadata.data,
                    metaDataHash: metadata.hash,
                    tokenId: DATA_NFT_TOKEN_ID,
                    tokenURI: token_uri,
                    metadataProofs: metadata.proofs,
                },
            },
        )
        .await
    }

    pub async fn set_token_uri(
        &self,
        caller: Address,
        token_uri: String,
    ) -> Result<Receipt, OceanError> {
        self.ensure(caller, Requirement::Nft(NftRole::MetadataUpdater))
            .await?;
        self.send(
            caller,
            ERC721Template::setTokenURICall {
                tokenId: DATA_NFT_TOKEN_ID,
                tokenURI: token_uri,
            },
        )
        .await
    }

    /// Stores `value` under `key` in the NFT's key-value store.
    pub async fn set_new_data(
        &self,
        caller: Address,
        key: B256,
        value: Bytes,
    ) -> Result<Receipt, OceanError> {
        self.ensure(caller, Requirement::Nft(NftRole::StoreUpdater))
            .await?;
        self.send(caller, ERC721Template::setNewDataCall { key, value })
            .await
    }

    pub async fn set_data_v3(
        &self,
        caller: Address,
        datatoken: Address,
        value: Bytes,
        flags: String,
        data: Bytes,
    ) -> Result<Receipt, OceanError> {
        self.ensure(caller, Requirement::Nft(NftRole::V3Minter))
            .await?;
        self.send(
            caller,
            ERC721Template::setDataV3Call {
                datatoken,
                value,
                flags,
                data,
            },
        )
        .await
    }

    /// Wraps a legacy datatoken, handing its minting to `new_minter`.
    pub async fn wrap_v3_datatoken(
        &self,
        caller: Address,
        datatoken: Address,
        new_minter: Address,
    ) -> Result<Receipt, OceanError> {
        self.ensure(caller, Requirement::Nft(NftRole::V3Minter))
            .await?;
        self.send(
            caller,
            ERC721Template::wrapV3DTCall {
                datatoken,
                newMinter: new_minter,
            },
        )
        .await
    }

    pub async fn mint_v3_datatoken(
        &self,
        caller: Address,
        datatoken: Address,
        to: Address,
        value: U256,
    ) -> Result<Receipt, OceanError> {
        self.ensure(caller, Requirement::Nft(NftRole::V3Minter))
            .await?;
        self.send(
            caller,
            ERC721Template::mintV3DTCall {
                datatoken,
                to,
                value,
            },
        )
        .await
    }

    /// Executes an arbitrary call from the NFT contract, forwarding `value`
    /// wei with it.
    pub async fn execute_call(
        &self,
        caller: Address,
        operation: U256,
        to: Address,
        value: U256,
        data: Bytes,
    ) -> Result<Receipt, OceanError> {
        self.ensure(caller, Requirement::Nft(NftRole::Manager))
            .await?;
        let call = ERC721Template::executeCallCall {
            operation,
            to,
            value,
            data,
        };
        self.pipeline
            .submit(PreparedCall::new(self.address, caller, &call).with_value(value))
            .await
    }

    fn role_call(
        &self,
        caller: Address,
        holder: Address,
        role: NftRole,
        grant: bool,
    ) -> PreparedCall {
        use ERC721Template as T;

        let to = self.address;
        match (role, grant) {
            (NftRole::Manager, true) => {
                PreparedCall::new(to, caller, &T::addManagerCall { manager: holder })
            }
            (NftRole::Manager, false) => {
                PreparedCall::new(to, caller, &T::removeManagerCall { manager: holder })
            }
            (NftRole::DatatokenDeployer, true) => PreparedCall::new(
                to,
                caller,
                &T::addToCreateERC20ListCall {
                    allowedAddress: holder,
                },
            ),
            (NftRole::DatatokenDeployer, false) => PreparedCall::new(
                to,
                caller,
                &T::removeFromCreateERC20ListCall {
                    allowedAddress: holder,
                },
            ),
            (NftRole::MetadataUpdater, true) => PreparedCall::new(
                to,
                caller,
                &T::addToMetadataListCall {
                    allowedAddress: holder,
                },
            ),
            (NftRole::MetadataUpdater, false) => PreparedCall::new(
                to,
                caller,
                &T::removeFromMetadataListCall {
                    allowedAddress: holder,
                },
            ),
            (NftRole::StoreUpdater, true) => PreparedCall::new(
                to,
                caller,
                &T::addTo725StoreListCall {
                    allowedAddress: holder,
                },
            ),
            (NftRole::StoreUpdater, false) => PreparedCall::new(
                to,
                caller,
                &T::removeFrom725StoreListCall {
                    allowedAddress: holder,
                },
            ),
            (NftRole::V3Minter, true) => PreparedCall::new(
                to,
                caller,
                &T::addV3MinterCall {
                    allowedAddress: holder,
                },
            ),
            (NftRole::V3Minter, false) => PreparedCall::new(
                to,
                caller,
                &T::removeV3MinterCall {
                    allowedAddress: holder,
                },
            ),
        }
    }

    async fn view<T: alloy::sol_types::SolCall>(&self, call: T) -> Result<T::Return, OceanError> {
        self.pipeline.view(self.address, call).await
    }

    async fn send<T: alloy::sol_types::SolCall>(
        &self,
        caller: Address,
        call: T,
    ) -> Result<Receipt, OceanError> {
        self.pipeline
            .submit(PreparedCall::new(self.address, caller, &call))
            .await
    }
}
