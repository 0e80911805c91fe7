//! Scoreboard target resolution
//!
//! Precedence: explicit override, then the JSON published next to the
//! deployed page (`/scoreboard.json`), then build-time environment.

use std::cell::RefCell;

use serde::Deserialize;

use super::Address;

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
/// Local development chain
pub const DEFAULT_CHAIN_ID: u64 = 31337;
/// Path the deploy script publishes the config to
pub const PUBLISHED_CONFIG_PATH: &str = "/scoreboard.json";

const BUILD_ADDRESS: Option<&str> = option_env!("SCOREBOARD_ADDRESS");
const BUILD_RPC_URL: Option<&str> = option_env!("SCOREBOARD_RPC_URL");

/// Contract address and endpoint a client should talk to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainTarget {
    pub contract: Address,
    pub rpc_url: String,
}

#[derive(Debug, Deserialize)]
struct RawPublished {
    address: Option<String>,
    #[serde(rename = "rpcUrl")]
    rpc_url: Option<String>,
}

/// Runtime-published config; invalid fields are dropped individually
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishedConfig {
    pub address: Option<Address>,
    pub rpc_url: Option<String>,
}

impl PublishedConfig {
    /// Parse the published JSON; `None` when nothing usable is present
    pub fn from_json(json: &str) -> Option<Self> {
        let raw: RawPublished = match serde_json::from_str(json) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Ignoring unreadable published config: {}", e);
                return None;
            }
        };
        let config = Self {
            address: raw.address.and_then(|a| parse_address(&a)),
            rpc_url: raw.rpc_url.and_then(non_empty),
        };
        if config.address.is_none() && config.rpc_url.is_none() {
            return None;
        }
        Some(config)
    }
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Valid and non-zero, or nothing
fn parse_address(s: &str) -> Option<Address> {
    s.parse::<Address>().ok().filter(|a| !a.is_zero())
}

#[derive(Debug)]
pub struct RuntimeConfig {
    override_address: Option<String>,
    override_rpc_url: Option<String>,
    published: RefCell<Option<PublishedConfig>>,
    build_address: Option<String>,
    build_rpc_url: Option<String>,
    expected_chain_id: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            override_address: None,
            override_rpc_url: None,
            published: RefCell::new(None),
            build_address: BUILD_ADDRESS.map(str::to_string),
            build_rpc_url: BUILD_RPC_URL.map(str::to_string),
            expected_chain_id: DEFAULT_CHAIN_ID,
        }
    }
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ignore build-time environment (tests, embedding)
    pub fn without_build_env(mut self) -> Self {
        self.build_address = None;
        self.build_rpc_url = None;
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.override_address = Some(address.into());
        self
    }

    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.override_rpc_url = Some(rpc_url.into());
        self
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.expected_chain_id = chain_id;
        self
    }

    /// Install (or clear) the config fetched at runtime
    pub fn set_published(&self, published: Option<PublishedConfig>) {
        if let Some(p) = &published {
            log::info!(
                "Runtime config published (address: {}, rpc: {})",
                p.address.is_some(),
                p.rpc_url.is_some()
            );
        }
        *self.published.borrow_mut() = published;
    }

    pub fn expected_chain_id(&self) -> u64 {
        self.expected_chain_id
    }

    pub fn contract_address(&self) -> Option<Address> {
        if let Some(addr) = &self.override_address {
            return parse_address(addr);
        }
        if let Some(addr) = self.published.borrow().as_ref().and_then(|p| p.address) {
            return Some(addr);
        }
        self.build_address.as_deref().and_then(parse_address)
    }

    pub fn rpc_url(&self) -> String {
        if let Some(url) = self.override_rpc_url.clone().and_then(non_empty) {
            return url;
        }
        if let Some(url) = self.published.borrow().as_ref().and_then(|p| p.rpc_url.clone()) {
            return url;
        }
        self.build_rpc_url
            .clone()
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_RPC_URL.to_string())
    }

    /// `None` while no valid contract address is known
    pub fn resolve(&self) -> Option<ChainTarget> {
        Some(ChainTarget {
            contract: self.contract_address()?,
            rpc_url: self.rpc_url(),
        })
    }
}
