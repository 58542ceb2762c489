//! Configuration for the inspection tool.
//!
//! Connection details come from the environment (or a .env file),
//! the command to run from CLI arguments.

use alloy::primitives::Address;
use clap::{Parser, Subcommand, ValueEnum};
use ocean_sdk::{permissions::NftRole, pool::BALANCER_VAULT};

/// Environment configuration (connection details, credentials).
#[derive(Debug, serde::Deserialize)]
pub struct EnvConfig {
    /// RPC URL for the node
    pub node_rpc_url: String,

    /// Private key for signing transactions, only needed by write commands
    pub private_key: Option<String>,

    /// Optional cap on node requests per second
    pub rpc_requests_per_second: Option<u32>,
}

impl EnvConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }
}

#[derive(Debug, Parser)]
#[command(name = "ocean_inspect")]
#[command(about = "Inspect and manage data NFTs, datatokens and pools")]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Roles of a holder on a data NFT and optionally one of its datatokens
    Permissions {
        #[arg(long)]
        nft: Address,
        #[arg(long)]
        holder: Address,
        #[arg(long)]
        datatoken: Option<Address>,
    },

    /// Tokens and balances of a pool
    PoolTokens {
        #[arg(long)]
        pool: Address,
        #[arg(long, default_value_t = BALANCER_VAULT)]
        vault: Address,
    },

    /// Token balance of an account
    Balance {
        #[arg(long)]
        token: Address,
        #[arg(long)]
        account: Address,
    },

    /// Grant a data NFT role, signed with PRIVATE_KEY
    GrantRole {
        #[arg(long)]
        nft: Address,
        #[arg(long)]
        holder: Address,
        #[arg(long, value_enum)]
        role: RoleArg,
    },

    /// Revoke a data NFT role, signed with PRIVATE_KEY
    RevokeRole {
        #[arg(long)]
        nft: Address,
        #[arg(long)]
        holder: Address,
        #[arg(long, value_enum)]
        role: RoleArg,
    },
}

impl Command {
    pub fn needs_signer(&self) -> bool {
        matches!(self, Self::GrantRole { .. } | Self::RevokeRole { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    Manager,
    DatatokenDeployer,
    MetadataUpdater,
    StoreUpdater,
    V3Minter,
}

impl From<RoleArg> for NftRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Manager => Self::Manager,
            RoleArg::DatatokenDeployer => Self::DatatokenDeployer,
            RoleArg::MetadataUpdater => Self::MetadataUpdater,
            RoleArg::StoreUpdater => Self::StoreUpdater,
            RoleArg::V3Minter => Self::V3Minter,
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;

    use super::*;

    #[test]
    fn test_parse_grant_role() {
        let cli = CliConfig::try_parse_from([
            "ocean_inspect",
            "grant-role",
            "--nft",
            "0x0000000000000000000000000000000000000a01",
            "--holder",
            "0x0000000000000000000000000000000000000b01",
            "--role",
            "datatoken-deployer",
        ])
        .unwrap();

        assert!(cli.command.needs_signer());
        match cli.command {
            Command::GrantRole { nft, holder, role } => {
                assert_eq!(nft, address!("0x0000000000000000000000000000000000000a01"));
                assert_eq!(holder, address!("0x0000000000000000000000000000000000000b01"));
                assert_eq!(NftRole::from(role), NftRole::DatatokenDeployer);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_pool_tokens_defaults_vault() {
        let cli = CliConfig::try_parse_from([
            "ocean_inspect",
            "pool-tokens",
            "--pool",
            "0x0000000000000000000000000000000000000c01",
        ])
        .unwrap();

        assert!(!cli.command.needs_signer());
        assert!(matches!(
            cli.command,
            Command::PoolTokens { vault, .. } if vault == BALANCER_VAULT
        ));
    }

    #[test]
    fn test_rejects_invalid_address() {
        let args = [
            "ocean_inspect",
            "balance",
            "--token",
            "0x01",
            "--account",
            "0x02",
        ];
        assert!(CliConfig::try_parse_from(args).is_err());
    }
}
