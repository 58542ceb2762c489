//! Contract interfaces used by the SDK.
//!
//! Only the functions and events the SDK calls or decodes are declared;
//! the deployed contracts expose more.

/// Contracts release the interfaces below were taken from.
pub const CONTRACTS_REVISION: &str = "v4-balancer-v2";

#[allow(clippy::too_many_arguments)]
pub mod nft {
    alloy::sol! {
        /// Data NFT (ERC-721 template).
        #[derive(Debug)]
        interface ERC721Template {
            struct Roles {
                bool manager;
                bool deployERC20;
                bool updateMetadata;
                bool store;
                bool v3Minter;
            }

            #[derive(Default, PartialEq, Eq)]
            struct MetadataProof {
                address validatorAddress;
                uint8 v;
                bytes32 r;
                bytes32 s;
            }

            struct MetadataAndTokenUri {
                uint8 metaDataState;
                string metaDataDecryptorUrl;
                string metaDataDecryptorAddress;
                bytes flags;
                bytes data;
                bytes32 metaDataHash;
                uint256 tokenId;
                string tokenURI;
                MetadataProof[] metadataProofs;
            }

            function name() external view returns (string memory);
            function symbol() external view returns (string memory);
            function ownerOf(uint256 tokenId) external view returns (address);
            function tokenURI(uint256 tokenId) external view returns (string memory);
            function getPermissions(address user) external view returns (Roles memory);
            function isERC20Deployer(address account) external view returns (bool);
            function getMetaData() external view returns (string memory, string memory, uint8, bool);
            function getData(bytes32 key) external view returns (bytes memory);

            function createERC20(
                uint256 templateIndex,
                string[] calldata strings,
                address[] calldata addresses,
                uint256[] calldata uints,
                bytes[] calldata bytess
            ) external returns (address);

            function addManager(address manager) external;
            function removeManager(address manager) external;
            function addToCreateERC20List(address allowedAddress) external;
            function removeFromCreateERC20List(address allowedAddress) external;
            function addToMetadataList(address allowedAddress) external;
            function removeFromMetadataList(address allowedAddress) external;
            function addTo725StoreList(address allowedAddress) external;
            function removeFrom725StoreList(address allowedAddress) external;
            function addV3Minter(address allowedAddress) external;
            function removeV3Minter(address allowedAddress) external;
            function cleanPermissions() external;

            function transferFrom(address from, address to, uint256 tokenId) external;
            function safeTransferFrom(address from, address to, uint256 tokenId) external;

            function setMetaData(
                uint8 metaDataState,
                string calldata metaDataDecryptorUrl,
                string calldata metaDataDecryptorAddress,
                bytes calldata flags,
                bytes calldata data,
                bytes32 metaDataHash,
                MetadataProof[] memory metadataProofs
            ) external;
            function setMetaDataState(uint8 metaDataState) external;
            function setMetaDataAndTokenURI(MetadataAndTokenUri calldata metaDataAndTokenURI) external;
            function setTokenURI(uint256 tokenId, string memory tokenURI) external;

            function setNewData(bytes32 key, bytes calldata value) external;
            function setDataV3(address datatoken, bytes calldata value, string calldata flags, bytes calldata data) external;
            function wrapV3DT(address datatoken, address newMinter) external;
            function mintV3DT(address datatoken, address to, uint256 value) external;
            function executeCall(uint256 operation, address to, uint256 value, bytes calldata data) external payable;
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub mod datatoken {
    alloy::sol! {
        /// Datatoken (ERC-20 template).
        #[derive(Debug)]
        interface ERC20Template {
            struct RolesERC20 {
                bool minter;
                bool feeManager;
            }

            function name() external view returns (string memory);
            function symbol() external view returns (string memory);
            function decimals() external view returns (uint8);
            function totalSupply() external view returns (uint256);
            function cap() external view returns (uint256);
            function balanceOf(address account) external view returns (uint256);
            function allowance(address owner, address spender) external view returns (uint256);
            function getPermissions(address user) external view returns (RolesERC20 memory);
            function getERC721Address() external view returns (address);
            function getFeeCollector() external view returns (address);

            function approve(address spender, uint256 amount) external returns (bool);
            function transfer(address to, uint256 amount) external returns (bool);
            function transferFrom(address from, address to, uint256 amount) external returns (bool);
            function mint(address account, uint256 value) external;

            function addMinter(address minter) external;
            function removeMinter(address minter) external;
            function proposeMinter(address newMinter) external;
            function approveMinter() external;
            function setData(bytes calldata value) external;
            function cleanPermissions() external;
            function setFeeCollector(address feeCollector) external;

            function startOrder(address consumer, uint256 amount, uint256 serviceId, address mpFeeAddress) external;

            event OrderStarted(
                address indexed consumer,
                address indexed payer,
                uint256 amount,
                uint256 serviceId,
                uint256 timestamp,
                address indexed mrktFeeCollector,
                uint256 marketFee
            );
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub mod factory {
    alloy::sol! {
        /// Token template registered on a factory.
        #[derive(Debug, PartialEq, Eq)]
        struct Template {
            address templateAddress;
            bool isActive;
        }

        /// Data NFT factory.
        #[derive(Debug)]
        interface ERC721Factory {
            function deployERC721Contract(
                string memory name,
                string memory symbol,
                string memory metadataCacheUri,
                bytes32 flags,
                uint256 templateIndex
            ) external returns (address);
            function getCurrentTokenCount() external view returns (uint256);
            function getCurrentTemplateCount() external view returns (uint256);
            function getTokenTemplate(uint256 index) external view returns (Template memory);
            function addTokenTemplate(address templateAddress) external returns (uint256);
            function disableTokenTemplate(uint256 index) external;
            function reactivateTokenTemplate(uint256 index) external;

            event TokenCreated(address indexed newTokenAddress, address indexed templateAddress, string tokenName);
        }

        /// Datatoken factory.
        #[derive(Debug)]
        interface ERC20Factory {
            function getCurrentTokenCount() external view returns (uint256);
            function getCurrentTemplateCount() external view returns (uint256);
            function getTokenTemplate(uint256 index) external view returns (Template memory);
            function erc721Factory() external view returns (address);
            function addTokenTemplate(address templateAddress) external returns (uint256);
            function disableTokenTemplate(uint256 index) external;
            function reactivateTokenTemplate(uint256 index) external;
            function setERC721Factory(address erc721Factory) external;
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub mod pool {
    alloy::sol! {
        /// Pool factory router.
        #[derive(Debug)]
        interface FactoryRouter {
            function deployPool(
                string memory name,
                string memory symbol,
                address[] memory tokens,
                uint256[] memory weights,
                uint256 swapFeePercentage,
                uint256 swapMarketFee,
                address owner
            ) external returns (address);
            function createPoolWithFork(address controller) external returns (address);

            event NewPool(address indexed poolAddress, bool isOcean);
            event NewPoolFork(address indexed poolAddress, address indexed controller);
        }

        /// Weighted pool, also the pool share (LP) token.
        #[derive(Debug)]
        interface WeightedPool {
            function getPoolId() external view returns (bytes32);
            function balanceOf(address account) external view returns (uint256);
            function updateMarketCollector(address newCollector) external;
        }

        /// Pool vault holding all pool balances.
        #[derive(Debug)]
        interface Vault {
            struct JoinPoolRequest {
                address[] assets;
                uint256[] maxAmountsIn;
                bytes userData;
                bool fromInternalBalance;
            }

            struct ExitPoolRequest {
                address[] assets;
                uint256[] minAmountsOut;
                bytes userData;
                bool toInternalBalance;
            }

            struct SingleSwap {
                bytes32 poolId;
                uint8 kind;
                address assetIn;
                address assetOut;
                uint256 amount;
                bytes userData;
            }

            struct FundManagement {
                address sender;
                bool fromInternalBalance;
                address recipient;
                bool toInternalBalance;
            }

            function getPoolTokens(bytes32 poolId) external view returns (
                address[] memory tokens,
                uint256[] memory balances,
                uint256 lastChangeBlock
            );
            function joinPool(bytes32 poolId, address sender, address recipient, JoinPoolRequest memory request) external payable;
            function exitPool(bytes32 poolId, address sender, address recipient, ExitPoolRequest memory request) external;
            function swap(SingleSwap memory singleSwap, FundManagement memory funds, uint256 limit, uint256 deadline) external payable returns (uint256);

            event PoolBalanceChanged(
                bytes32 indexed poolId,
                address indexed liquidityProvider,
                address[] tokens,
                int256[] deltas,
                uint256[] protocolFeeAmounts
            );
            event Swap(
                bytes32 indexed poolId,
                address indexed tokenIn,
                address indexed tokenOut,
                uint256 amountIn,
                uint256 amountOut
            );
        }

        /// Minimal ERC-20 used for vault approvals.
        #[derive(Debug)]
        interface IERC20 {
            function balanceOf(address account) external view returns (uint256);
            function allowance(address owner, address spender) external view returns (uint256);
            function approve(address spender, uint256 amount) external returns (bool);
        }
    }
}
