//! Error types for the inspection tool.

use ocean_sdk::error::OceanError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Environment configuration error: {0}")]
    EnvConfig(#[from] envy::Error),

    #[error("Alloy signer error: {0}")]
    AlloySigner(#[from] alloy::signers::local::LocalSignerError),

    #[error("SDK error: {0}")]
    Ocean(#[from] OceanError),

    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(#[from] url::ParseError),

    #[error("PRIVATE_KEY is required for this command")]
    MissingPrivateKey,
}

pub type Result<T> = std::result::Result<T, Error>;
