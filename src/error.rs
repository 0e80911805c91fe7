//! Error taxonomy for the remote-facing layer
//!
//! Transport failures arrive as [`ChainError`] and are classified where they
//! are detected: leaderboard reads become [`ReadError`], score submissions
//! become [`SubmitFailure`]. Both carry a machine-readable code and a
//! guidance string so every surface renders the same advice.

use thiserror::Error;

/// Broad failure classes, used to decide retry affordances
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Contract unresolved or not deployed; fixed externally, never auto-retried
    Configuration,
    /// RPC timeout or network failure; manual retry, previous data kept
    Connectivity,
    /// Wallet missing, disconnected, on the wrong chain, or user rejection
    Wallet,
    /// Reverted transaction or malformed response
    Protocol,
}

/// Raw failure reported by a [`crate::chain::ChainClient`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("chain client is not ready")]
    NotReady,
    #[error("request timed out")]
    Timeout,
    #[error("rpc error: {0}")]
    Rpc(String),
    #[error("no wallet provider detected")]
    NoWallet,
    #[error("wallet has no connected account")]
    NoAccount,
    #[error("wallet is on chain {actual}, expected {expected}")]
    WrongNetwork { expected: u64, actual: u64 },
    #[error("user rejected the request")]
    UserRejected,
    #[error("transaction reverted")]
    Reverted,
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Classified leaderboard read failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    #[error("scoreboard address is not configured")]
    MissingAddress,
    #[error("no contract code at the scoreboard address")]
    NoCode,
    #[error("rpc request timed out")]
    RpcTimeout,
    #[error("rpc request failed: {0}")]
    RpcError(String),
    #[error("leaderboard response unreadable: {0}")]
    Unreadable(String),
}

impl ReadError {
    /// Classify a transport failure seen during a read
    pub fn from_chain(err: ChainError) -> Self {
        match err {
            ChainError::Timeout => ReadError::RpcTimeout,
            ChainError::Malformed(msg) => ReadError::Unreadable(msg),
            ChainError::Rpc(msg) => ReadError::RpcError(msg),
            other => ReadError::RpcError(other.to_string()),
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ReadError::MissingAddress => "missing_address",
            ReadError::NoCode => "no_code",
            ReadError::RpcTimeout => "rpc_timeout",
            ReadError::RpcError(_) => "rpc_error",
            ReadError::Unreadable(_) => "unreadable",
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            ReadError::MissingAddress | ReadError::NoCode => ErrorClass::Configuration,
            ReadError::RpcTimeout | ReadError::RpcError(_) => ErrorClass::Connectivity,
            ReadError::Unreadable(_) => ErrorClass::Protocol,
        }
    }

    /// User-facing advice
    pub fn guidance(&self) -> &'static str {
        match self.class() {
            ErrorClass::Configuration => {
                "Scoreboard contract is not deployed or the address is stale. Redeploy it and reload."
            }
            ErrorClass::Connectivity => "Could not reach the RPC node. Check that it is running.",
            _ => "Could not read the leaderboard. Try again shortly.",
        }
    }
}

/// Classified reason a score submission stopped short of `success`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitFailure {
    #[error("scoreboard address is not configured")]
    MissingAddress,
    #[error("ledger writes are disabled")]
    Disabled,
    #[error("no wallet provider detected")]
    NoWallet,
    #[error("wallet has no connected account")]
    NoAccount,
    #[error("wallet is on chain {actual}, expected {expected}")]
    WrongNetwork { expected: u64, actual: u64 },
    #[error("score must be positive")]
    ZeroScore,
    #[error("rpc request failed: {0}")]
    Rpc(String),
    #[error("transaction reverted")]
    Reverted,
    #[error("transaction confirmation timed out")]
    ConfirmationTimeout,
    #[error("submission failed: {0}")]
    Failed(String),
}

impl SubmitFailure {
    /// Classify a failure returned while requesting the signature
    pub fn from_signing(err: ChainError) -> Self {
        match err {
            ChainError::NoWallet => SubmitFailure::NoWallet,
            ChainError::NoAccount => SubmitFailure::NoAccount,
            ChainError::WrongNetwork { expected, actual } => {
                SubmitFailure::WrongNetwork { expected, actual }
            }
            ChainError::NotReady => SubmitFailure::Disabled,
            ChainError::Timeout => SubmitFailure::Rpc("request timed out".to_string()),
            ChainError::Rpc(msg) => SubmitFailure::Rpc(msg),
            ChainError::Reverted => SubmitFailure::Reverted,
            other => SubmitFailure::Failed(other.to_string()),
        }
    }

    /// Classify a failure returned while awaiting confirmation
    pub fn from_confirmation(err: ChainError) -> Self {
        match err {
            ChainError::Timeout => SubmitFailure::ConfirmationTimeout,
            ChainError::Reverted => SubmitFailure::Reverted,
            ChainError::Rpc(msg) => SubmitFailure::Rpc(msg),
            other => SubmitFailure::Failed(other.to_string()),
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            SubmitFailure::MissingAddress => "missing_address",
            SubmitFailure::Disabled => "disabled",
            SubmitFailure::NoWallet => "no_wallet",
            SubmitFailure::NoAccount => "no_account",
            SubmitFailure::WrongNetwork { .. } => "wrong_network",
            SubmitFailure::ZeroScore => "zero_score",
            SubmitFailure::Rpc(_) => "rpc_error",
            SubmitFailure::Reverted => "reverted",
            SubmitFailure::ConfirmationTimeout => "confirmation_timeout",
            SubmitFailure::Failed(_) => "failed",
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            SubmitFailure::MissingAddress | SubmitFailure::Disabled => ErrorClass::Configuration,
            SubmitFailure::NoWallet | SubmitFailure::NoAccount | SubmitFailure::WrongNetwork { .. } => {
                ErrorClass::Wallet
            }
            SubmitFailure::Rpc(_) | SubmitFailure::ConfirmationTimeout => ErrorClass::Connectivity,
            SubmitFailure::ZeroScore | SubmitFailure::Reverted | SubmitFailure::Failed(_) => {
                ErrorClass::Protocol
            }
        }
    }

    /// Wallet-side failures park the machine in `NeedsWallet` rather than `Error`
    pub fn needs_wallet(&self) -> bool {
        matches!(self, SubmitFailure::NoWallet | SubmitFailure::NoAccount)
    }

    /// User-facing advice
    pub fn guidance(&self) -> &'static str {
        match self {
            SubmitFailure::MissingAddress => {
                "Scoreboard contract is not deployed or the address is stale."
            }
            SubmitFailure::Disabled => "Scoreboard is not configured; scores cannot be submitted.",
            SubmitFailure::NoWallet => "No wallet detected. Install or enable one, then retry.",
            SubmitFailure::NoAccount => "Wallet is not connected. Connect it, then retry.",
            SubmitFailure::WrongNetwork { .. } => "Wrong network. Switch the wallet, then retry.",
            SubmitFailure::ZeroScore => "Score at least one point to submit.",
            SubmitFailure::Rpc(_) => "Could not reach the RPC node. Check it is running, then retry.",
            SubmitFailure::Reverted => "Transaction confirmation failed.",
            SubmitFailure::ConfirmationTimeout => "Transaction was not confirmed in time.",
            SubmitFailure::Failed(_) => "Submission failed. Try again shortly.",
        }
    }
}

/// Round lifecycle refusals
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("previous round's score is still being submitted")]
    SubmissionInFlight,
    #[error("wallet must be connected on the expected network to start")]
    WalletNotReady,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_error_codes() {
        assert_eq!(ReadError::from_chain(ChainError::Timeout).code(), "rpc_timeout");
        assert_eq!(
            ReadError::from_chain(ChainError::Malformed("abi".into())).code(),
            "unreadable"
        );
        assert_eq!(ReadError::from_chain(ChainError::NotReady).code(), "rpc_error");
        assert_eq!(ReadError::NoCode.class(), ErrorClass::Configuration);
    }

    #[test]
    fn test_submit_failure_routing() {
        assert!(SubmitFailure::from_signing(ChainError::NoAccount).needs_wallet());
        assert!(!SubmitFailure::from_signing(ChainError::Rpc("refused".into())).needs_wallet());
        assert_eq!(
            SubmitFailure::from_signing(ChainError::WrongNetwork {
                expected: 31337,
                actual: 1
            })
            .code(),
            "wrong_network"
        );
        assert_eq!(
            SubmitFailure::from_confirmation(ChainError::Timeout),
            SubmitFailure::ConfirmationTimeout
        );
    }
}
