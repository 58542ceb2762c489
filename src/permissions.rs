//! Role model of data NFTs and datatokens.
//!
//! Roles are always read fresh from the contracts, see
//! [`crate::nft::Nft::permissions`] and
//! [`crate::datatoken::Datatoken::permissions`]. A role can be revoked
//! between the check and the submission of the transaction that relies on
//! it, in which case the transaction itself reverts.

use std::fmt;

use alloy::primitives::{Address, U256};
use tracing::warn;

use crate::{
    abi::{datatoken::ERC20Template, nft::ERC721Template},
    error::OceanError,
};

/// Capability granted on a data NFT.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NftRole {
    Manager,
    DatatokenDeployer,
    MetadataUpdater,
    StoreUpdater,
    V3Minter,
}

/// Capability granted on a datatoken.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DatatokenRole {
    Minter,
    FeeManager,
}

/// Role set of a single holder on a data NFT.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NftRoles {
    pub manager: bool,
    pub datatoken_deployer: bool,
    pub metadata_updater: bool,
    pub store_updater: bool,
    pub v3_minter: bool,
}

impl NftRoles {
    pub fn has(&self, role: NftRole) -> bool {
        match role {
            NftRole::Manager => self.manager,
            NftRole::DatatokenDeployer => self.datatoken_deployer,
            NftRole::MetadataUpdater => self.metadata_updater,
            NftRole::StoreUpdater => self.store_updater,
            NftRole::V3Minter => self.v3_minter,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl From<ERC721Template::Roles> for NftRoles {
    fn from(value: ERC721Template::Roles) -> Self {
        Self {
            manager: value.manager,
            datatoken_deployer: value.deployERC20,
            metadata_updater: value.updateMetadata,
            store_updater: value.store,
            v3_minter: value.v3Minter,
        }
    }
}

/// Role set of a single holder on a datatoken.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DatatokenRoles {
    pub minter: bool,
    pub fee_manager: bool,
}

impl DatatokenRoles {
    pub fn has(&self, role: DatatokenRole) -> bool {
        match role {
            DatatokenRole::Minter => self.minter,
            DatatokenRole::FeeManager => self.fee_manager,
        }
    }
}

impl From<ERC20Template::RolesERC20> for DatatokenRoles {
    fn from(value: ERC20Template::RolesERC20) -> Self {
        Self {
            minter: value.minter,
            fee_manager: value.feeManager,
        }
    }
}

/// Precondition an operation declares before it is submitted.
///
/// Evaluated once per call; an unmet requirement aborts the operation with
/// [`crate::error::OceanError::Unauthorized`] before any gas is spent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Requirement {
    /// Caller owns the data NFT (token id 1).
    NftOwner,
    /// Caller holds the role on the data NFT.
    Nft(NftRole),
    /// Caller holds the role on the datatoken.
    Datatoken(DatatokenRole),
    /// Minting the amount keeps the datatoken supply within its cap.
    CapAvailable(U256),
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NftOwner => write!(f, "NFT owner"),
            Self::Nft(role) => write!(f, "NFT role {role:?}"),
            Self::Datatoken(role) => write!(f, "datatoken role {role:?}"),
            Self::CapAvailable(amount) => write!(f, "cap available for {amount}"),
        }
    }
}

/// Turns the outcome of a requirement check into a result.
pub(crate) fn require(
    satisfied: bool,
    caller: Address,
    contract: Address,
    requirement: Requirement,
) -> Result<(), OceanError> {
    if satisfied {
        return Ok(());
    }
    warn!(%caller, %contract, %requirement, "requirement not met, nothing submitted");
    Err(OceanError::Unauthorized {
        caller,
        contract,
        requirement,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nft_roles_from_contract_struct() {
        let roles = NftRoles::from(ERC721Template::Roles {
            manager: true,
            deployERC20: false,
            updateMetadata: true,
            store: false,
            v3Minter: false,
        });
        assert!(roles.has(NftRole::Manager));
        assert!(roles.has(NftRole::MetadataUpdater));
        assert!(!roles.has(NftRole::DatatokenDeployer));
        assert!(!roles.has(NftRole::StoreUpdater));
        assert!(!roles.is_empty());
        assert!(NftRoles::default().is_empty());
    }

    #[test]
    fn test_datatoken_roles_from_contract_struct() {
        let roles = DatatokenRoles::from(ERC20Template::RolesERC20 {
            minter: true,
            feeManager: false,
        });
        assert!(roles.has(DatatokenRole::Minter));
        assert!(!roles.has(DatatokenRole::FeeManager));
    }

    #[test]
    fn test_requirement_display() {
        assert_eq!(Requirement::NftOwner.to_string(), "NFT owner");
        assert_eq!(
            Requirement::Nft(NftRole::DatatokenDeployer).to_string(),
            "NFT role DatatokenDeployer"
        );
        assert_eq!(
            Requirement::CapAvailable(U256::from(5)).to_string(),
            "cap available for 5"
        );
    }

    #[test]
    fn test_require_reports_unmet_requirement() {
        let caller = Address::repeat_byte(1);
        let contract = Address::repeat_byte(2);
        assert!(require(true, caller, contract, Requirement::NftOwner).is_ok());

        let err = require(false, caller, contract, Requirement::NftOwner).unwrap_err();
        assert!(matches!(
            err,
            OceanError::Unauthorized { caller: c, contract: k, requirement: Requirement::NftOwner }
                if c == caller && k == contract
        ));
    }
}
