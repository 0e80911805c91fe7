//! Score submission state machine
//!
//! One live record per finished round. The machine itself is synchronous;
//! [`Submitter`] drives it through the chain client and feeds results back
//! tagged with the [`Attempt`] they belong to, so results for a superseded
//! record or an earlier attempt are dropped.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::chain::{Address, ChainClient, ClientPool, Receipt, RuntimeConfig, TxHandle, WalletState};
use crate::error::{ChainError, SubmitFailure};
use crate::sim::RoundOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubmitStatus {
    /// Nothing to submit (no round yet, or a zero score)
    #[default]
    Idle,
    NeedsWallet,
    ReadyToSign,
    /// Waiting on the wallet signature
    Signing,
    /// Broadcast, waiting on confirmation
    Pending,
    Success,
    Rejected,
    Error,
}

impl SubmitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmitStatus::Idle => "idle",
            SubmitStatus::NeedsWallet => "needs-wallet",
            SubmitStatus::ReadyToSign => "ready-to-sign",
            SubmitStatus::Signing => "signing",
            SubmitStatus::Pending => "pending",
            SubmitStatus::Success => "success",
            SubmitStatus::Rejected => "rejected",
            SubmitStatus::Error => "error",
        }
    }

    /// Signing or pending; a new round can't start until this clears
    pub fn is_busy(&self) -> bool {
        matches!(self, SubmitStatus::Signing | SubmitStatus::Pending)
    }

    pub fn can_retry(&self) -> bool {
        matches!(
            self,
            SubmitStatus::Rejected | SubmitStatus::Error | SubmitStatus::NeedsWallet
        )
    }
}

/// Identity of one signing attempt for one record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Attempt {
    pub record: u64,
    pub number: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRecord {
    pub id: u64,
    pub attempt: u32,
    pub outcome: RoundOutcome,
    pub status: SubmitStatus,
    pub player: Option<Address>,
    pub tx: Option<TxHandle>,
    pub failure: Option<SubmitFailure>,
}

/// Everything checked before a signature is requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preconditions {
    pub contract: Option<Address>,
    pub client_ready: bool,
    pub wallet: WalletState,
    pub expected_chain_id: u64,
}

impl Preconditions {
    /// Checked in order; the first failure wins
    pub fn check(&self, score: u32) -> Result<(Address, Address), SubmitFailure> {
        let contract = self.contract.ok_or(SubmitFailure::MissingAddress)?;
        if !self.client_ready {
            return Err(SubmitFailure::Disabled);
        }
        let (account, chain_id) = match self.wallet {
            WalletState::NoWallet => return Err(SubmitFailure::NoWallet),
            WalletState::NoAccount => return Err(SubmitFailure::NoAccount),
            WalletState::Connected { account, chain_id } => (account, chain_id),
        };
        if chain_id != self.expected_chain_id {
            return Err(SubmitFailure::WrongNetwork {
                expected: self.expected_chain_id,
                actual: chain_id,
            });
        }
        if score == 0 {
            return Err(SubmitFailure::ZeroScore);
        }
        Ok((contract, account))
    }
}

/// Result of asking the machine to start signing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Go ahead: submit to this contract
    Continue(Address),
    /// A precondition failed; the record settled in this status
    Settled(SubmitStatus),
    /// The attempt no longer matches the live record
    Stale,
}

/// Emitted once per confirmed submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaderboardRefresh {
    pub player: Option<Address>,
}

#[derive(Debug, Default)]
pub struct ScoreSubmission {
    record: Option<SubmissionRecord>,
    next_id: u64,
}

impl ScoreSubmission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self) -> Option<&SubmissionRecord> {
        self.record.as_ref()
    }

    pub fn status(&self) -> SubmitStatus {
        self.record.as_ref().map_or(SubmitStatus::Idle, |r| r.status)
    }

    pub fn is_busy(&self) -> bool {
        self.status().is_busy()
    }

    pub fn failure(&self) -> Option<&SubmitFailure> {
        self.record.as_ref().and_then(|r| r.failure.as_ref())
    }

    /// Start a record for a finished round, superseding any previous one.
    ///
    /// Returns the first attempt, or `None` for a zero score (stays idle).
    pub fn open(&mut self, outcome: RoundOutcome) -> Option<Attempt> {
        if let Some(old) = &self.record {
            if old.status.is_busy() {
                log::warn!("Superseding in-flight submission {}", old.id);
            }
        }

        self.next_id += 1;
        let status = if outcome.score == 0 {
            SubmitStatus::Idle
        } else {
            SubmitStatus::ReadyToSign
        };
        self.record = Some(SubmissionRecord {
            id: self.next_id,
            attempt: 1,
            outcome,
            status,
            player: None,
            tx: None,
            failure: None,
        });
        log::info!(
            "Submission {} opened for round {} ({})",
            self.next_id,
            outcome.round.0,
            status.as_str()
        );

        (status == SubmitStatus::ReadyToSign).then_some(Attempt {
            record: self.next_id,
            number: 1,
        })
    }

    /// Drop the live record; late results for it are discarded
    pub fn abandon(&mut self) {
        if let Some(record) = self.record.take() {
            log::info!(
                "Submission {} abandoned in {}",
                record.id,
                record.status.as_str()
            );
        }
    }

    fn live(&mut self, attempt: Attempt, expected: SubmitStatus) -> Option<&mut SubmissionRecord> {
        match self.record.as_mut() {
            Some(r) if r.id == attempt.record && r.attempt == attempt.number => {
                if r.status == expected {
                    Some(r)
                } else {
                    log::debug!(
                        "Submission {} is {}, ignoring step for {}",
                        r.id,
                        r.status.as_str(),
                        expected.as_str()
                    );
                    None
                }
            }
            _ => {
                log::info!(
                    "Discarding stale result for submission {} attempt {}",
                    attempt.record,
                    attempt.number
                );
                None
            }
        }
    }

    /// The outcome an attempt is submitting
    pub fn outcome_for(&self, attempt: Attempt) -> Option<RoundOutcome> {
        self.record
            .as_ref()
            .filter(|r| r.id == attempt.record && r.attempt == attempt.number)
            .map(|r| r.outcome)
    }

    /// Check preconditions and move to `Signing`
    pub fn begin_signing(&mut self, attempt: Attempt, pre: &Preconditions) -> Advance {
        let Some(record) = self.live(attempt, SubmitStatus::ReadyToSign) else {
            return Advance::Stale;
        };

        match pre.check(record.outcome.score) {
            Ok((contract, account)) => {
                record.player = Some(account);
                transition(record, SubmitStatus::Signing);
                Advance::Continue(contract)
            }
            Err(failure) => {
                settle(record, failure);
                Advance::Settled(record.status)
            }
        }
    }

    /// Feed the signing result. Returns the handle to confirm, if any.
    pub fn on_signed(
        &mut self,
        attempt: Attempt,
        result: Result<TxHandle, ChainError>,
    ) -> Option<TxHandle> {
        let record = self.live(attempt, SubmitStatus::Signing)?;
        match result {
            Ok(tx) => {
                record.tx = Some(tx.clone());
                transition(record, SubmitStatus::Pending);
                Some(tx)
            }
            Err(ChainError::UserRejected) => {
                transition(record, SubmitStatus::Rejected);
                None
            }
            Err(err) => {
                settle(record, SubmitFailure::from_signing(err));
                None
            }
        }
    }

    /// Feed the confirmation result. Yields the refresh signal on success.
    pub fn on_confirmed(
        &mut self,
        attempt: Attempt,
        result: Result<Receipt, ChainError>,
    ) -> Option<LeaderboardRefresh> {
        let record = self.live(attempt, SubmitStatus::Pending)?;
        match result {
            Ok(receipt) => {
                log::info!("Submission {} confirmed in block {}", record.id, receipt.block);
                transition(record, SubmitStatus::Success);
                Some(LeaderboardRefresh {
                    player: record.player,
                })
            }
            Err(err) => {
                settle(record, SubmitFailure::from_confirmation(err));
                None
            }
        }
    }

    /// New attempt with the same outcome, from `Rejected`, `Error` or `NeedsWallet`
    pub fn retry(&mut self) -> Option<Attempt> {
        let record = self.record.as_mut()?;
        if !record.status.can_retry() {
            return None;
        }
        record.attempt += 1;
        record.tx = None;
        record.failure = None;
        transition(record, SubmitStatus::ReadyToSign);
        Some(Attempt {
            record: record.id,
            number: record.attempt,
        })
    }

    /// Status line for the game-over panel
    pub fn guidance(&self) -> &'static str {
        if let Some(failure) = self.failure() {
            return failure.guidance();
        }
        match self.record.as_ref() {
            None => "Scores are submitted automatically when a round ends.",
            Some(r) => match r.status {
                SubmitStatus::Idle => "A score of zero is not submitted.",
                SubmitStatus::NeedsWallet => "Connect a wallet to submit this score.",
                SubmitStatus::ReadyToSign => "Preparing submission...",
                SubmitStatus::Signing => "Waiting for the wallet signature...",
                SubmitStatus::Pending => "Waiting for confirmation...",
                SubmitStatus::Success => "Score recorded on chain.",
                SubmitStatus::Rejected => "Signature cancelled. Retry to submit again.",
                SubmitStatus::Error => "Submission failed. Try again shortly.",
            },
        }
    }
}

fn transition(record: &mut SubmissionRecord, to: SubmitStatus) {
    log::info!(
        "Submission {}: {} -> {}",
        record.id,
        record.status.as_str(),
        to.as_str()
    );
    record.status = to;
}

fn settle(record: &mut SubmissionRecord, failure: SubmitFailure) {
    let status = if failure.needs_wallet() {
        SubmitStatus::NeedsWallet
    } else {
        SubmitStatus::Error
    };
    log::warn!("Submission {} failed: {} ({})", record.id, failure, failure.code());
    record.failure = Some(failure);
    transition(record, status);
}

/// Drives attempts against the ledger
pub struct Submitter<C> {
    machine: Rc<RefCell<ScoreSubmission>>,
    pool: Rc<ClientPool<C>>,
    config: Rc<RuntimeConfig>,
}

impl<C: ChainClient + 'static> Submitter<C> {
    pub fn new(
        machine: Rc<RefCell<ScoreSubmission>>,
        pool: Rc<ClientPool<C>>,
        config: Rc<RuntimeConfig>,
    ) -> Self {
        Self {
            machine,
            pool,
            config,
        }
    }

    pub fn machine(&self) -> &Rc<RefCell<ScoreSubmission>> {
        &self.machine
    }

    /// Wallet state as the resolved client sees it
    pub fn wallet(&self) -> WalletState {
        match self.config.resolve() {
            Some(target) => self.pool.client(&target).wallet(),
            None => WalletState::NoWallet,
        }
    }

    /// Run one attempt to completion. The machine is only borrowed between
    /// suspension points.
    pub async fn run(&self, attempt: Attempt) -> Option<LeaderboardRefresh> {
        let target = self.config.resolve();
        let client = target.as_ref().map(|t| self.pool.client(t));
        let pre = Preconditions {
            contract: target.as_ref().map(|t| t.contract),
            client_ready: client.as_ref().is_some_and(|c| c.is_ready()),
            wallet: client
                .as_ref()
                .map_or(WalletState::NoWallet, |c| c.wallet()),
            expected_chain_id: self.config.expected_chain_id(),
        };

        let contract = match self.machine.borrow_mut().begin_signing(attempt, &pre) {
            Advance::Continue(contract) => contract,
            Advance::Settled(_) | Advance::Stale => return None,
        };
        let client = client?;
        let outcome = self.machine.borrow().outcome_for(attempt)?;

        let signed = client.submit(contract, &outcome).await;
        let tx = self.machine.borrow_mut().on_signed(attempt, signed)?;

        let confirmed = client.await_confirmation(&tx).await;
        self.machine.borrow_mut().on_confirmed(attempt, confirmed)
    }
}
