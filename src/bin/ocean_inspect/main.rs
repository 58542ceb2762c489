//! Operator tool for data NFTs, datatokens and pools.
//!
//! Reads roles, balances and pool state, and grants or revokes data NFT
//! roles with the key from `PRIVATE_KEY`.

mod config;
mod error;

use std::process::exit;

use alloy::{
    network::EthereumWallet,
    primitives::Address,
    providers::{DynProvider, ProviderBuilder},
    rpc::client::RpcClient,
    signers::local::PrivateKeySigner,
};
use clap::Parser;
use ocean_sdk::{
    datatoken::Datatoken,
    nft::Nft,
    num::from_fixed_point,
    pool::Pool,
    tx::{ProviderClient, Throttle, TxPipeline},
};
use tracing::{error, info};
use url::Url;

use config::{CliConfig, Command, EnvConfig};
use error::{Error, Result};

type Pipeline = TxPipeline<ProviderClient<DynProvider>>;

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Warning: Failed to load .env file: {}", e);
    }

    let env_config = match EnvConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to parse environment configuration: {}", e);
            exit(1);
        }
    };

    let cli_config = CliConfig::parse();

    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = run(env_config, cli_config.command).await {
        error!(%e, "Command failed");
        exit(1);
    }
}

async fn run(env: EnvConfig, command: Command) -> Result<()> {
    let node_url = Url::parse(&env.node_rpc_url)?;
    let signer = match &env.private_key {
        Some(key) => Some(key.parse::<PrivateKeySigner>()?),
        None if command.needs_signer() => return Err(Error::MissingPrivateKey),
        None => None,
    };
    let caller = signer.as_ref().map(PrivateKeySigner::address);

    let rpc_client = RpcClient::new_http(node_url);
    let provider = match signer {
        Some(signer) => DynProvider::new(
            ProviderBuilder::new()
                .wallet(EthereumWallet::new(signer))
                .connect_client(rpc_client),
        ),
        None => DynProvider::new(ProviderBuilder::new().connect_client(rpc_client)),
    };
    let throttle = env
        .rpc_requests_per_second
        .map(Throttle::per_second)
        .unwrap_or_default();
    let pipeline = TxPipeline::new(ProviderClient::new(provider)).with_throttle(throttle);

    match command {
        Command::Permissions {
            nft,
            holder,
            datatoken,
        } => print_permissions(&pipeline, nft, holder, datatoken).await,
        Command::PoolTokens { pool, vault } => {
            let state = Pool::new(pool, vault, pipeline).pool_state().await?;
            println!("Pool {pool} (last change at block {})", state.last_change_block);
            for (token, balance) in state.tokens.iter().zip(&state.balances) {
                println!("  {token}: {}", from_fixed_point(*balance));
            }
            Ok(())
        }
        Command::Balance { token, account } => {
            let token = Datatoken::new(token, pipeline);
            let symbol = token.symbol().await?;
            println!("{} {symbol}", token.balance(account).await?);
            Ok(())
        }
        Command::GrantRole { nft, holder, role } => {
            let caller = caller.ok_or(Error::MissingPrivateKey)?;
            let receipt = Nft::new(nft, pipeline)
                .grant_role(caller, holder, role.into())
                .await?;
            info!(tx_hash = %receipt.tx_hash, ?role, %holder, "Role granted");
            Ok(())
        }
        Command::RevokeRole { nft, holder, role } => {
            let caller = caller.ok_or(Error::MissingPrivateKey)?;
            let receipt = Nft::new(nft, pipeline)
                .revoke_role(caller, holder, role.into())
                .await?;
            info!(tx_hash = %receipt.tx_hash, ?role, %holder, "Role revoked");
            Ok(())
        }
    }
}

async fn print_permissions(
    pipeline: &Pipeline,
    nft: Address,
    holder: Address,
    datatoken: Option<Address>,
) -> Result<()> {
    let nft = Nft::new(nft, pipeline.clone());
    let owner = nft.owner().await?;
    println!("NFT {} owned by {owner}", nft.address());
    println!("{holder}: {:?}", nft.permissions(holder).await?);

    if let Some(datatoken) = datatoken {
        let datatoken = Datatoken::new(datatoken, pipeline.clone());
        println!(
            "Datatoken {}: {:?}",
            datatoken.address(),
            datatoken.permissions(holder).await?
        );
    }
    Ok(())
}
