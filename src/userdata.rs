//! Vault `userData` encoding for pool joins and exits.
//!
//! The payload layout depends on the operation kind; the kind enums carry
//! exactly the arguments their layout needs, so a discriminant can never
//! be encoded with another kind's arguments:
//!
//! | Kind | Discriminant | Payload |
//! |---|---|---|
//! | [`JoinKind::Init`] | 0 | `(kind, amountsIn[])` |
//! | [`JoinKind::ExactTokensIn`] | 1 | `(kind, amountsIn[], minSharesOut)` |
//! | [`JoinKind::SingleToken`] | 2 | `(kind, minSharesOut, tokenIndex)` |
//! | [`ExitKind::ExactSharesIn`] | 1 | `(kind, sharesIn)` |
//! | [`ExitKind::ExactTokensOut`] | 2 | `(kind, amountsOut[], maxSharesIn)` |
//! | [`ExitKind::CommunityFeeWithdrawal`] | 3 | `(kind)` |
//! | [`ExitKind::MarketFeeWithdrawal`] | 4 | `(kind)` |
//!
//! All amounts are 18-decimal fixed point, see [`crate::num`].

use alloy::{
    primitives::{Address, Bytes, U256},
    sol_types::SolValue,
};
use itertools::Itertools;

use crate::{abi::pool::Vault, error::OceanError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JoinKind {
    /// First liquidity of a pool, sets the initial reserves.
    Init { amounts_in: Vec<U256> },
    /// Proportional join expecting at least `min_shares_out`.
    ExactTokensIn {
        amounts_in: Vec<U256>,
        min_shares_out: U256,
    },
    /// Join with a single token of the pool.
    SingleToken {
        min_shares_out: U256,
        token_index: usize,
    },
}

impl JoinKind {
    pub fn discriminant(&self) -> u8 {
        match self {
            Self::Init { .. } => 0,
            Self::ExactTokensIn { .. } => 1,
            Self::SingleToken { .. } => 2,
        }
    }

    pub fn encode(&self) -> Bytes {
        let kind = U256::from(self.discriminant());
        match self {
            Self::Init { amounts_in } => (kind, amounts_in.clone()).abi_encode_params(),
            Self::ExactTokensIn {
                amounts_in,
                min_shares_out,
            } => (kind, amounts_in.clone(), *min_shares_out).abi_encode_params(),
            Self::SingleToken {
                min_shares_out,
                token_index,
            } => (kind, *min_shares_out, U256::from(*token_index)).abi_encode_params(),
        }
        .into()
    }

    fn amounts(&self) -> Option<&[U256]> {
        match self {
            Self::Init { amounts_in } | Self::ExactTokensIn { amounts_in, .. } => Some(amounts_in),
            Self::SingleToken { .. } => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExitKind {
    /// Redeems exactly `shares_in` pool shares.
    ExactSharesIn { shares_in: U256 },
    /// Redeems exact token amounts, spending at most `max_shares_in`.
    ExactTokensOut {
        amounts_out: Vec<U256>,
        max_shares_in: U256,
    },
    CommunityFeeWithdrawal,
    MarketFeeWithdrawal,
}

impl ExitKind {
    pub fn discriminant(&self) -> u8 {
        match self {
            Self::ExactSharesIn { .. } => 1,
            Self::ExactTokensOut { .. } => 2,
            Self::CommunityFeeWithdrawal => 3,
            Self::MarketFeeWithdrawal => 4,
        }
    }

    pub fn encode(&self) -> Bytes {
        let kind = U256::from(self.discriminant());
        match self {
            Self::ExactSharesIn { shares_in } => (kind, *shares_in).abi_encode_params(),
            Self::ExactTokensOut {
                amounts_out,
                max_shares_in,
            } => (kind, amounts_out.clone(), *max_shares_in).abi_encode_params(),
            Self::CommunityFeeWithdrawal | Self::MarketFeeWithdrawal => kind.abi_encode(),
        }
        .into()
    }
}

/// Liquidity added to a pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinRequest {
    /// Pool tokens in the pool's order.
    pub assets: Vec<Address>,
    /// Upper bound per asset, parallel to `assets`.
    pub max_amounts_in: Vec<U256>,
    pub kind: JoinKind,
    pub from_internal_balance: bool,
}

impl JoinRequest {
    pub fn new(assets: Vec<Address>, max_amounts_in: Vec<U256>, kind: JoinKind) -> Self {
        Self {
            assets,
            max_amounts_in,
            kind,
            from_internal_balance: false,
        }
    }

    /// Checks array shapes and converts into the vault's request struct.
    pub fn into_vault(self) -> Result<Vault::JoinPoolRequest, OceanError> {
        ensure_parallel("max amounts in", &self.assets, &self.max_amounts_in)?;
        if let Some(amounts) = self.kind.amounts() {
            ensure_parallel("join amounts", &self.assets, amounts)?;
        }
        if let JoinKind::SingleToken { token_index, .. } = self.kind {
            if token_index >= self.assets.len() {
                return Err(OceanError::InvalidArgument(format!(
                    "token index {token_index} out of range for {} assets",
                    self.assets.len()
                )));
            }
        }
        Ok(Vault::JoinPoolRequest {
            userData: self.kind.encode(),
            assets: self.assets,
            maxAmountsIn: self.max_amounts_in,
            fromInternalBalance: self.from_internal_balance,
        })
    }
}

/// Liquidity removed from a pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExitRequest {
    /// Pool tokens in the pool's order.
    pub assets: Vec<Address>,
    /// Lower bound per asset, parallel to `assets`.
    pub min_amounts_out: Vec<U256>,
    pub kind: ExitKind,
    pub to_internal_balance: bool,
}

impl ExitRequest {
    pub fn new(assets: Vec<Address>, min_amounts_out: Vec<U256>, kind: ExitKind) -> Self {
        Self {
            assets,
            min_amounts_out,
            kind,
            to_internal_balance: false,
        }
    }

    pub fn into_vault(self) -> Result<Vault::ExitPoolRequest, OceanError> {
        ensure_parallel("min amounts out", &self.assets, &self.min_amounts_out)?;
        if let ExitKind::ExactTokensOut { amounts_out, .. } = &self.kind {
            ensure_parallel("exit amounts", &self.assets, amounts_out)?;
        }
        Ok(Vault::ExitPoolRequest {
            userData: self.kind.encode(),
            assets: self.assets,
            minAmountsOut: self.min_amounts_out,
            toInternalBalance: self.to_internal_balance,
        })
    }
}

/// Rejects token lists that are not strictly ascending by address, the
/// order pools keep their tokens in.
pub fn ensure_sorted(tokens: &[Address]) -> Result<(), OceanError> {
    match tokens.iter().tuple_windows().find(|(a, b)| a >= b) {
        Some((a, b)) => Err(OceanError::InvalidArgument(format!(
            "tokens must be sorted ascending by address, found {a} before {b}"
        ))),
        None => Ok(()),
    }
}

fn ensure_parallel<T>(what: &str, assets: &[Address], values: &[T]) -> Result<(), OceanError> {
    if assets.len() != values.len() {
        return Err(OceanError::InvalidArgument(format!(
            "{what}: expected {} values, got {}",
            assets.len(),
            values.len()
        )));
    }
    Ok(())
}
