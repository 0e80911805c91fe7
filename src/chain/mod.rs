//! Ledger access
//!
//! The scoreboard contract is reached through [`ChainClient`]. Clients are
//! pooled per RPC endpoint; only the submission flow ever writes.

pub mod config;
pub mod memory;

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::rc::Rc;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ChainError;
use crate::sim::RoundOutcome;

pub use config::{ChainTarget, PublishedConfig, RuntimeConfig};
pub use memory::MemoryLedger;

/// A 20-byte account or contract address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; 20]);

impl Address {
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid address: {0}")]
pub struct InvalidAddress(pub String);

impl FromStr for Address {
    type Err = InvalidAddress;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let hex = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| InvalidAddress(s.to_string()))?;
        if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(InvalidAddress(s.to_string()));
        }

        let mut bytes = [0u8; 20];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|_| InvalidAddress(s.to_string()))?;
        }
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Address {
    type Error = InvalidAddress;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// One score row as stored on the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub player: Address,
    pub score: u32,
    pub duration_secs: u32,
    pub speed_peak: u32,
    /// Block time, seconds since the Unix epoch
    pub timestamp: u64,
    /// Insertion order on the ledger
    pub sequence: u64,
}

/// Which projection a read asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeaderboardScope {
    Global,
    Player(Address),
}

/// Handle for a broadcast transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHandle(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx: TxHandle,
    pub block: u64,
}

/// What the wallet provider currently reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletState {
    NoWallet,
    NoAccount,
    Connected { account: Address, chain_id: u64 },
}

impl WalletState {
    pub fn account(&self) -> Option<Address> {
        match self {
            WalletState::Connected { account, .. } => Some(*account),
            _ => None,
        }
    }

    /// Connected on the expected network
    pub fn is_ready_for(&self, chain_id: u64) -> bool {
        matches!(self, WalletState::Connected { chain_id: id, .. } if *id == chain_id)
    }
}

/// Remote ledger operations.
///
/// Reads may be retried freely; `submit` broadcasts a transaction and must
/// not be retried without the player's consent.
pub trait ChainClient {
    /// The client finished initialising and can be used
    fn is_ready(&self) -> bool;

    fn wallet(&self) -> WalletState;

    fn has_code(&self, contract: Address) -> impl Future<Output = Result<bool, ChainError>>;

    fn read_leaderboard(
        &self,
        contract: Address,
        scope: LeaderboardScope,
    ) -> impl Future<Output = Result<Vec<LeaderboardEntry>, ChainError>>;

    /// Request a signature and broadcast `submitScore(score, duration, speedPeak)`
    fn submit(
        &self,
        contract: Address,
        outcome: &RoundOutcome,
    ) -> impl Future<Output = Result<TxHandle, ChainError>>;

    fn await_confirmation(&self, tx: &TxHandle)
    -> impl Future<Output = Result<Receipt, ChainError>>;
}

type ClientFactory<C> = Box<dyn Fn(&ChainTarget) -> Rc<C>>;

/// Chain clients cached by resolved RPC URL
pub struct ClientPool<C> {
    factory: ClientFactory<C>,
    clients: RefCell<HashMap<String, Rc<C>>>,
}

impl<C: 'static> ClientPool<C> {
    pub fn new(factory: impl Fn(&ChainTarget) -> C + 'static) -> Self {
        Self {
            factory: Box::new(move |target: &ChainTarget| Rc::new(factory(target))),
            clients: RefCell::new(HashMap::new()),
        }
    }

    /// Pool that hands the same client out for every endpoint
    pub fn shared(client: Rc<C>) -> Self {
        Self {
            factory: Box::new(move |_: &ChainTarget| Rc::clone(&client)),
            clients: RefCell::new(HashMap::new()),
        }
    }

    pub fn client(&self, target: &ChainTarget) -> Rc<C> {
        let mut clients = self.clients.borrow_mut();
        let client = clients.entry(target.rpc_url.clone()).or_insert_with(|| {
            log::debug!("Creating chain client for {}", target.rpc_url);
            (self.factory)(target)
        });
        Rc::clone(client)
    }

    /// Number of distinct endpoints seen
    pub fn len(&self) -> usize {
        self.clients.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.borrow().is_empty()
    }
}
