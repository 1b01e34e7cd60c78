//! Transaction intent tracking
//!
//! Every session step produces one intent that moves
//! built -> submitted -> confirmed/failed, or straight to construction error.

use std::fmt;
use std::time::Instant;
use tracing::{debug, warn};

use crate::chain::TxOutcome;

/// Action family a session step runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Swap,
    Stake,
    Nft,
}

impl ActionKind {
    /// Label shown in the status table
    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::Swap => "DEX trading",
            ActionKind::Stake => "liquid staking action",
            ActionKind::Nft => "NFT trading",
        }
    }
}

/// Transaction intent states
#[derive(Debug, Clone, PartialEq)]
pub enum TxIntentState {
    Built,
    Submitted { hash: String },
    Confirmed { hash: String },
    Failed { hash: String, vm_status: String },
    ConstructionError { reason: String },
}

/// Result label shown to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultLabel {
    Success,
    Failed,
    ConstructionError,
}

impl fmt::Display for ResultLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ResultLabel::Success => "TX was successful",
            ResultLabel::Failed => "TX failed",
            ResultLabel::ConstructionError => "Error when creating a TX",
        };
        f.write_str(text)
    }
}

/// One step's transaction attempt
#[derive(Debug, Clone)]
pub struct TxIntent {
    pub id: uuid::Uuid,
    pub wallet_index: usize,
    pub kind: ActionKind,
    pub state: TxIntentState,
    pub created_at: Instant,
}

impl TxIntent {
    pub fn new(wallet_index: usize, kind: ActionKind) -> Self {
        let intent = Self {
            id: uuid::Uuid::new_v4(),
            wallet_index,
            kind,
            state: TxIntentState::Built,
            created_at: Instant::now(),
        };
        debug!("Created {:?} intent {} for wallet {}", kind, intent.id, wallet_index);
        intent
    }

    /// Built -> Submitted
    pub fn submitted(&mut self, hash: String) {
        if self.state != TxIntentState::Built {
            warn!("Intent {} submitted from {:?}", self.id, self.state);
            return;
        }
        self.transition(TxIntentState::Submitted { hash });
    }

    /// Submitted -> Confirmed/Failed
    pub fn finalize(&mut self, outcome: TxOutcome) {
        let hash = match &self.state {
            TxIntentState::Submitted { hash } => hash.clone(),
            other => {
                warn!("Intent {} finalized from {:?}", self.id, other);
                return;
            }
        };
        let next = match outcome {
            TxOutcome::Success => TxIntentState::Confirmed { hash },
            TxOutcome::Failure { vm_status } => TxIntentState::Failed { hash, vm_status },
        };
        self.transition(next);
    }

    /// Confirmation could not be observed; counts as failed
    pub fn unconfirmed(&mut self, reason: String) {
        self.finalize(TxOutcome::Failure { vm_status: reason });
    }

    /// Built -> ConstructionError
    pub fn construction_error(&mut self, reason: String) {
        if self.state != TxIntentState::Built {
            warn!("Intent {} construction error from {:?}", self.id, self.state);
            return;
        }
        self.transition(TxIntentState::ConstructionError { reason });
    }

    fn transition(&mut self, state: TxIntentState) {
        debug!("Intent {} state: {:?} -> {:?}", self.id, self.state, state);
        self.state = state;
    }

    pub fn is_finalized(&self) -> bool {
        !matches!(
            self.state,
            TxIntentState::Built | TxIntentState::Submitted { .. }
        )
    }

    /// Only a confirmed success yields a hash callers may rely on
    pub fn usable_hash(&self) -> Option<&str> {
        match &self.state {
            TxIntentState::Confirmed { hash } => Some(hash),
            _ => None,
        }
    }

    /// Label for finalized intents
    pub fn label(&self) -> Option<ResultLabel> {
        match self.state {
            TxIntentState::Confirmed { .. } => Some(ResultLabel::Success),
            TxIntentState::Failed { .. } => Some(ResultLabel::Failed),
            TxIntentState::ConstructionError { .. } => Some(ResultLabel::ConstructionError),
            _ => None,
        }
    }
}
