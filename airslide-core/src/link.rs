//! Link lifecycle state machine.
//!
//! Models the suspend/sync/active lifecycle against the playfield peer:
//!
//! ```text
//!  Suspended ◄──────► Active          (toggle, advisory)
//!      ▲                 ▲
//!      └──── Syncing ────┘            (ack confirms the target;
//!                                      deadline expiry reverts)
//! ```
//!
//! Toggle and sync commands are advisory — observers learn the outcome
//! through their next poll of the published state, never synchronously.

use std::fmt;
use std::time::{Duration, Instant};

use crate::error::BridgeError;

/// Cadence at which external collaborators poll the link state.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long a sync request may wait for the peer's acknowledgement.
pub const SYNC_DEADLINE: Duration = Duration::from_millis(500);

// ── LinkState ────────────────────────────────────────────────────

/// The link lifecycle state. Discriminants are the wire/peer values.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    /// Idle; no frames flow. Initial state.
    #[default]
    Suspended = 0,
    /// Transport live; state frames flow every tick.
    Active = 1,
    /// Handshake/resync in progress; sync frames flow instead.
    Syncing = 2,
}

impl LinkState {
    pub fn is_active(self) -> bool {
        matches!(self, LinkState::Active)
    }

    pub fn is_suspended(self) -> bool {
        matches!(self, LinkState::Suspended)
    }

    pub fn is_syncing(self) -> bool {
        matches!(self, LinkState::Syncing)
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkState::Suspended => write!(f, "Suspended"),
            LinkState::Active => write!(f, "Active"),
            LinkState::Syncing => write!(f, "Syncing"),
        }
    }
}

impl TryFrom<u32> for LinkState {
    type Error = BridgeError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(LinkState::Suspended),
            1 => Ok(LinkState::Active),
            2 => Ok(LinkState::Syncing),
            _ => Err(BridgeError::UnknownVariant {
                type_name: "LinkState",
                value: value as u64,
            }),
        }
    }
}

// ── LinkSupervisor ───────────────────────────────────────────────

/// A pending sync request: the state we asked the peer to confirm and
/// the instant after which we give up waiting.
#[derive(Debug, Clone, Copy)]
struct PendingSync {
    target: LinkState,
    deadline: Instant,
}

/// Owns the link state and the pending-sync bookkeeping.
///
/// All mutation happens on the engine worker; observers see snapshots.
/// Time is injected so transitions are testable without sleeping.
#[derive(Debug, Default)]
pub struct LinkSupervisor {
    state: LinkState,
    pending: Option<PendingSync>,
}

impl LinkSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// The state a pending sync is waiting to confirm, if any.
    pub fn sync_target(&self) -> Option<LinkState> {
        self.pending.map(|p| p.target)
    }

    /// Flip Suspended ↔ Active. Ignored while a sync is in flight.
    pub fn toggle(&mut self) {
        match self.state {
            LinkState::Suspended => self.state = LinkState::Active,
            LinkState::Active => self.state = LinkState::Suspended,
            LinkState::Syncing => {}
        }
    }

    /// Request a forced resynchronization toward the opposite state.
    ///
    /// Ignored while already syncing. The supervisor stays whatever the
    /// next acknowledgement (or deadline) reports.
    pub fn begin_sync(&mut self, now: Instant) {
        if self.state.is_syncing() {
            return;
        }
        let target = if self.state.is_active() {
            LinkState::Suspended
        } else {
            LinkState::Active
        };
        self.pending = Some(PendingSync {
            target,
            deadline: now + SYNC_DEADLINE,
        });
        self.state = LinkState::Syncing;
    }

    /// Apply a peer acknowledgement. Only honoured while syncing and
    /// only when it confirms the requested target.
    pub fn on_ack(&mut self, confirmed: LinkState) {
        if !self.state.is_syncing() {
            return;
        }
        if let Some(pending) = self.pending {
            if confirmed == pending.target {
                self.state = confirmed;
                self.pending = None;
            }
        }
    }

    /// Expire an overdue sync: revert to the pre-sync state.
    pub fn poll_deadline(&mut self, now: Instant) {
        if !self.state.is_syncing() {
            return;
        }
        if let Some(pending) = self.pending {
            if now > pending.deadline {
                self.state = if pending.target.is_active() {
                    LinkState::Suspended
                } else {
                    LinkState::Active
                };
                self.pending = None;
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
