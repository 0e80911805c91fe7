//! In-process scoreboard ledger
//!
//! Behaves like the deployed contract behind a wallet: writes need a
//! connected account, confirmation appends the row with a block timestamp
//! and sequence number. Faults and slow reads can be injected.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use super::{
    Address, ChainClient, LeaderboardEntry, LeaderboardScope, Receipt, TxHandle, WalletState,
};
use crate::error::ChainError;
use crate::sim::RoundOutcome;

/// Block time of the first confirmation
const GENESIS_TIMESTAMP: u64 = 1_700_000_000;

/// Arguments of one `submitScore` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmittedScore {
    pub player: Address,
    pub score: u32,
    pub duration_secs: u32,
    pub speed_peak: u32,
}

#[derive(Debug)]
struct LedgerState {
    ready: bool,
    chain_id: u64,
    wallet: WalletState,
    deployed: HashSet<Address>,
    entries: Vec<LeaderboardEntry>,
    next_sequence: u64,
    next_block: u64,
    now_secs: u64,
    pending: HashMap<TxHandle, SubmittedScore>,
    submissions: Vec<SubmittedScore>,
    reads: u32,
    read_delay: Option<Duration>,
    read_faults: VecDeque<ChainError>,
    submit_faults: VecDeque<ChainError>,
    confirm_faults: VecDeque<ChainError>,
}

#[derive(Debug)]
pub struct MemoryLedger {
    state: RefCell<LedgerState>,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new(super::config::DEFAULT_CHAIN_ID)
    }
}

impl MemoryLedger {
    pub fn new(chain_id: u64) -> Self {
        Self {
            state: RefCell::new(LedgerState {
                ready: true,
                chain_id,
                wallet: WalletState::NoWallet,
                deployed: HashSet::new(),
                entries: Vec::new(),
                next_sequence: 1,
                next_block: 1,
                now_secs: GENESIS_TIMESTAMP,
                pending: HashMap::new(),
                submissions: Vec::new(),
                reads: 0,
                read_delay: None,
                read_faults: VecDeque::new(),
                submit_faults: VecDeque::new(),
                confirm_faults: VecDeque::new(),
            }),
        }
    }

    pub fn deploy(&self, contract: Address) {
        self.state.borrow_mut().deployed.insert(contract);
    }

    pub fn set_ready(&self, ready: bool) {
        self.state.borrow_mut().ready = ready;
    }

    pub fn set_wallet(&self, wallet: WalletState) {
        self.state.borrow_mut().wallet = wallet;
    }

    /// Connect `account` on the ledger's own chain
    pub fn connect(&self, account: Address) {
        let mut state = self.state.borrow_mut();
        state.wallet = WalletState::Connected {
            account,
            chain_id: state.chain_id,
        };
    }

    /// Append a confirmed row directly, bypassing the wallet
    pub fn seed(&self, player: Address, score: u32, timestamp: u64) {
        let mut state = self.state.borrow_mut();
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.entries.push(LeaderboardEntry {
            player,
            score,
            duration_secs: score,
            speed_peak: 10,
            timestamp,
            sequence,
        });
    }

    /// Delay every read by `delay` (tokio time)
    pub fn stall_reads(&self, delay: Option<Duration>) {
        self.state.borrow_mut().read_delay = delay;
    }

    pub fn fail_next_read(&self, err: ChainError) {
        self.state.borrow_mut().read_faults.push_back(err);
    }

    pub fn fail_next_submit(&self, err: ChainError) {
        self.state.borrow_mut().submit_faults.push_back(err);
    }

    pub fn fail_next_confirmation(&self, err: ChainError) {
        self.state.borrow_mut().confirm_faults.push_back(err);
    }

    /// Leaderboard reads served (code checks excluded)
    pub fn read_count(&self) -> u32 {
        self.state.borrow().reads
    }

    /// Every broadcast `submitScore`, in order
    pub fn submissions(&self) -> Vec<SubmittedScore> {
        self.state.borrow().submissions.clone()
    }

    pub fn entries(&self) -> Vec<LeaderboardEntry> {
        self.state.borrow().entries.clone()
    }

    async fn latency(&self) {
        let delay = self.state.borrow().read_delay;
        match delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => tokio::task::yield_now().await,
        }
    }

    fn check_ready(&self) -> Result<(), ChainError> {
        if self.state.borrow().ready {
            Ok(())
        } else {
            Err(ChainError::NotReady)
        }
    }
}

impl ChainClient for MemoryLedger {
    fn is_ready(&self) -> bool {
        self.state.borrow().ready
    }

    fn wallet(&self) -> WalletState {
        self.state.borrow().wallet
    }

    async fn has_code(&self, contract: Address) -> Result<bool, ChainError> {
        self.check_ready()?;
        self.latency().await;
        Ok(self.state.borrow().deployed.contains(&contract))
    }

    async fn read_leaderboard(
        &self,
        contract: Address,
        scope: LeaderboardScope,
    ) -> Result<Vec<LeaderboardEntry>, ChainError> {
        self.check_ready()?;
        self.state.borrow_mut().reads += 1;
        self.latency().await;

        let mut state = self.state.borrow_mut();
        if let Some(err) = state.read_faults.pop_front() {
            return Err(err);
        }
        if !state.deployed.contains(&contract) {
            return Err(ChainError::Malformed("empty return data".to_string()));
        }
        let rows = state
            .entries
            .iter()
            .filter(|e| match scope {
                LeaderboardScope::Global => true,
                LeaderboardScope::Player(player) => e.player == player,
            })
            .cloned()
            .collect();
        Ok(rows)
    }

    async fn submit(
        &self,
        contract: Address,
        outcome: &RoundOutcome,
    ) -> Result<TxHandle, ChainError> {
        self.check_ready()?;
        let account = {
            let state = self.state.borrow();
            match state.wallet {
                WalletState::NoWallet => return Err(ChainError::NoWallet),
                WalletState::NoAccount => return Err(ChainError::NoAccount),
                WalletState::Connected { chain_id, .. } if chain_id != state.chain_id => {
                    return Err(ChainError::WrongNetwork {
                        expected: state.chain_id,
                        actual: chain_id,
                    });
                }
                WalletState::Connected { account, .. } => account,
            }
        };

        // Wallet prompt
        tokio::task::yield_now().await;

        let mut state = self.state.borrow_mut();
        if let Some(err) = state.submit_faults.pop_front() {
            return Err(err);
        }
        if !state.deployed.contains(&contract) {
            return Err(ChainError::Reverted);
        }

        let call = SubmittedScore {
            player: account,
            score: outcome.score,
            duration_secs: outcome.duration_secs,
            speed_peak: outcome.speed_peak,
        };
        let tx = TxHandle(format!("0x{:064x}", state.submissions.len() + 1));
        state.submissions.push(call);
        state.pending.insert(tx.clone(), call);
        log::debug!("Broadcast {} for score {}", tx.0, call.score);
        Ok(tx)
    }

    async fn await_confirmation(&self, tx: &TxHandle) -> Result<Receipt, ChainError> {
        tokio::task::yield_now().await;

        let mut state = self.state.borrow_mut();
        if let Some(err) = state.confirm_faults.pop_front() {
            state.pending.remove(tx);
            return Err(err);
        }
        let call = state
            .pending
            .remove(tx)
            .ok_or_else(|| ChainError::Rpc(format!("unknown transaction {}", tx.0)))?;

        let block = state.next_block;
        state.next_block += 1;
        let timestamp = state.now_secs;
        state.now_secs += 1;
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.entries.push(LeaderboardEntry {
            player: call.player,
            score: call.score,
            duration_secs: call.duration_secs,
            speed_peak: call.speed_peak,
            timestamp,
            sequence,
        });

        Ok(Receipt {
            tx: tx.clone(),
            block,
        })
    }
}
