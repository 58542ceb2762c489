use std::fmt::Display;

use alloy::{
    primitives::{Address, Bytes, TxHash},
    providers::PendingTransactionError,
    sol_types::{self, GenericContractError, SolInterface},
    transports,
};

use crate::permissions::Requirement;

pub type OceanError = ProviderError<GenericContractError>;

/// Revert payload, decoded with the error ABI `R` when it matches.
#[derive(Clone, Debug)]
pub enum RevertReason<R> {
    Known(R),
    Generic(String),
    Unknown,
}

/// Error returned while preparing, simulating or submitting
/// a call against the chain.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ProviderError<R> {
    #[error("fatal error: {0}")]
    Fatal(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unexpected empty RPC response")]
    NullResp,

    #[error("transaction ran out of gas")]
    OutOfGas,

    #[error("transaction reverted: {0:?}")]
    Reverted(Box<RevertReason<R>>),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("transaction timed out")]
    Timeout,

    #[error("transaction {0} was mined with failed status")]
    TxFailed(TxHash),

    #[error("{caller} does not satisfy `{requirement}` on {contract}")]
    Unauthorized {
        caller: Address,
        contract: Address,
        requirement: Requirement,
    },

    #[error("transaction {tx_hash} succeeded but emitted no {event} event")]
    EventNotFound {
        event: &'static str,
        tx_hash: TxHash,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}

impl<R> ProviderError<R> {
    /// True when the node or the mined receipt reported a revert.
    pub fn is_revert(&self) -> bool {
        matches!(self, Self::Reverted(_) | Self::TxFailed(_))
    }
}

impl<R: SolInterface> From<PendingTransactionError> for ProviderError<R> {
    fn from(value: PendingTransactionError) -> Self {
        match value {
            PendingTransactionError::FailedToRegister => Self::Fatal(value.to_string()),
            PendingTransactionError::TransportError(rpc_err) => Self::from(rpc_err),
            PendingTransactionError::Recv(_) => Self::Transport(value.to_string()),
            PendingTransactionError::TxWatcher(err) => match err {
                alloy::providers::WatchTxError::Timeout => Self::Timeout,
            },
        }
    }
}

impl<E: Display, R: SolInterface> From<transports::RpcError<E>> for ProviderError<R> {
    fn from(value: transports::RpcError<E>) -> Self {
        match value {
            transports::RpcError::ErrorResp(ref resp) => {
                // eth_estimateGas and eth_call report both out-of-gas and
                // execution reverts through error responses
                let msg = resp.message.to_ascii_lowercase();
                if (resp.code == -32603) && (msg.contains("gas") || msg.contains("oog")) {
                    Self::OutOfGas
                } else if (resp.code == -32600 || resp.code == -32601 || resp.code == -32602)
                    && (msg.contains("invalid") || msg.contains("not found"))
                {
                    Self::InvalidRequest(msg)
                } else if (resp.code == 3 || resp.code == -32000) && msg.contains("revert") {
                    Self::Reverted(Box::new(RevertReason::from(value)))
                } else {
                    Self::Transport(value.to_string())
                }
            }
            transports::RpcError::NullResp => Self::NullResp,
            _ => Self::Transport(value.to_string()),
        }
    }
}

impl<R: SolInterface> From<sol_types::Error> for ProviderError<R> {
    fn from(value: sol_types::Error) -> Self {
        Self::Fatal(value.to_string())
    }
}

impl<E: Display, R: SolInterface> From<transports::RpcError<E>> for RevertReason<R> {
    fn from(value: transports::RpcError<E>) -> Self {
        match value.as_error_resp() {
            Some(payload) => match payload.as_decoded_interface_error::<R>() {
                Some(known) => Self::Known(known),
                None => Self::Generic(value.to_string()),
            },
            None => Self::Generic(value.to_string()),
        }
    }
}

impl<R: SolInterface> From<Bytes> for RevertReason<R> {
    fn from(value: Bytes) -> Self {
        if value.is_empty() {
            return Self::Unknown;
        }
        match R::abi_decode(&value) {
            Ok(known) => Self::Known(known),
            Err(_) => Self::Generic(value.to_string()),
        }
    }
}

impl RevertReason<GenericContractError> {
    /// Human-readable revert message, when the contract provided one.
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Known(GenericContractError::Revert(revert)) => Some(revert.reason.clone()),
            Self::Known(GenericContractError::Panic(panic)) => Some(format!("{panic:?}")),
            Self::Known(GenericContractError::CustomError(never)) => match *never {},
            Self::Generic(msg) => Some(msg.clone()),
            Self::Unknown => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy::{
        rpc::json_rpc::ErrorPayload,
        sol_types::{Revert, SolError},
        transports::{RpcError, TransportErrorKind},
    };

    use super::*;

    fn error_resp(code: i64, message: &str, data: Option<Bytes>) -> RpcError<TransportErrorKind> {
        let data = data.map(|d| serde_json::value::to_raw_value(&d.to_string()).unwrap());
        RpcError::ErrorResp(ErrorPayload {
            code,
            message: message.to_string().into(),
            data,
        })
    }

    #[test]
    fn test_out_of_gas_classified() {
        let err = OceanError::from(error_resp(-32603, "out of gas", None));
        assert!(matches!(err, OceanError::OutOfGas));
    }

    #[test]
    fn test_revert_decoded_with_reason() {
        let data = Bytes::from(Revert {
            reason: "ERC20: cap exceeded".to_string(),
        }
        .abi_encode());
        let err = OceanError::from(error_resp(3, "execution reverted", Some(data)));
        let OceanError::Reverted(reason) = err else {
            panic!("expected revert, got {err:?}");
        };
        assert_eq!(reason.message().as_deref(), Some("ERC20: cap exceeded"));
    }

    #[test]
    fn test_unclassified_error_is_transport() {
        let err = OceanError::from(error_resp(-32005, "rate limited", None));
        assert!(matches!(err, OceanError::Transport(_)));
        assert!(!err.is_revert());
    }

    #[test]
    fn test_empty_revert_data_is_unknown() {
        let reason = RevertReason::<GenericContractError>::from(Bytes::new());
        assert!(matches!(reason, RevertReason::Unknown));
        assert_eq!(reason.message(), None);
    }
}
