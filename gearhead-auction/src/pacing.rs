//! Turn pacing: delay settings and cancellable scheduling tickets.
//!
//! The engine never sleeps. Drivers wait out the delays themselves and use a
//! [`TurnPacer`] so that at most one scheduled turn per session is in flight.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Pause between a player action and the rival response.
    #[serde(default = "PacingConfig::default_rival_think_ms")]
    pub rival_think_ms: u64,
    /// Extra pause between individual rivals within one turn.
    #[serde(default = "PacingConfig::default_rival_stagger_ms")]
    pub rival_stagger_ms: u64,
    /// Pause between consecutive rival-only turns.
    #[serde(default = "PacingConfig::default_rival_only_turn_ms")]
    pub rival_only_turn_ms: u64,
}

impl PacingConfig {
    #[must_use]
    pub const fn default_rival_think_ms() -> u64 {
        constants::DEFAULT_RIVAL_THINK_MS
    }

    #[must_use]
    pub const fn default_rival_stagger_ms() -> u64 {
        constants::DEFAULT_RIVAL_STAGGER_MS
    }

    #[must_use]
    pub const fn default_rival_only_turn_ms() -> u64 {
        constants::DEFAULT_RIVAL_ONLY_TURN_MS
    }

    /// Zero-delay pacing for headless simulation.
    #[must_use]
    pub const fn instant() -> Self {
        Self {
            rival_think_ms: 0,
            rival_stagger_ms: 0,
            rival_only_turn_ms: 0,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), crate::config::AuctionConfigError> {
        const MAX_DELAY_MS: u64 = 10_000;
        for (field, value) in [
            ("pacing.rival_think_ms", self.rival_think_ms),
            ("pacing.rival_stagger_ms", self.rival_stagger_ms),
            ("pacing.rival_only_turn_ms", self.rival_only_turn_ms),
        ] {
            if value > MAX_DELAY_MS {
                return Err(crate::config::AuctionConfigError::RangeViolation {
                    field,
                    min: 0.0,
                    max: 10_000.0,
                    value: crate::numbers::i64_to_f64(i64::try_from(value).unwrap_or(i64::MAX)),
                });
            }
        }
        Ok(())
    }

    /// Delay before the given kind of scheduled turn.
    #[must_use]
    pub const fn delay_for(&self, kind: ScheduledTurn) -> u64 {
        match kind {
            ScheduledTurn::RivalResponse => self.rival_think_ms,
            ScheduledTurn::RivalStagger => self.rival_stagger_ms,
            ScheduledTurn::RivalOnly => self.rival_only_turn_ms,
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            rival_think_ms: Self::default_rival_think_ms(),
            rival_stagger_ms: Self::default_rival_stagger_ms(),
            rival_only_turn_ms: Self::default_rival_only_turn_ms(),
        }
    }
}

/// What a pending scheduled turn will do once its delay elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduledTurn {
    RivalResponse,
    RivalStagger,
    RivalOnly,
}

/// Handle for one scheduled turn; only the most recent ticket can be claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnTicket {
    generation: u64,
    pub kind: ScheduledTurn,
    pub delay_ms: u64,
}

impl TurnTicket {
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TicketError {
    #[error("ticket {ticket} was superseded by generation {current}")]
    Superseded { ticket: u64, current: u64 },
    #[error("ticket {0} was cancelled")]
    Cancelled(u64),
    #[error("ticket {0} was already claimed")]
    AlreadyClaimed(u64),
}

/// Generation counter guarding the single in-flight scheduled turn of a session.
#[derive(Debug, Clone, Default)]
pub struct TurnPacer {
    config: PacingConfig,
    generation: u64,
    pending: Option<u64>,
    cancelled: bool,
}

impl TurnPacer {
    #[must_use]
    pub const fn new(config: PacingConfig) -> Self {
        Self {
            config,
            generation: 0,
            pending: None,
            cancelled: false,
        }
    }

    /// Schedule a turn, superseding any ticket still pending.
    pub fn schedule(&mut self, kind: ScheduledTurn) -> TurnTicket {
        self.generation = self.generation.wrapping_add(1);
        self.pending = Some(self.generation);
        self.cancelled = false;
        TurnTicket {
            generation: self.generation,
            kind,
            delay_ms: self.config.delay_for(kind),
        }
    }

    /// Drop the pending turn, if any. Returns whether something was cancelled.
    pub fn cancel_pending(&mut self) -> bool {
        if self.pending.take().is_some() {
            self.cancelled = true;
            return true;
        }
        false
    }

    /// Consume a ticket whose delay has elapsed.
    ///
    /// # Errors
    ///
    /// Returns a `TicketError` when the ticket is stale, cancelled or already used.
    pub fn claim(&mut self, ticket: TurnTicket) -> Result<(), TicketError> {
        if ticket.generation != self.generation {
            return Err(TicketError::Superseded {
                ticket: ticket.generation,
                current: self.generation,
            });
        }
        match self.pending {
            Some(generation) if generation == ticket.generation => {
                self.pending = None;
                Ok(())
            }
            _ if self.cancelled => Err(TicketError::Cancelled(ticket.generation)),
            _ => Err(TicketError::AlreadyClaimed(ticket.generation)),
        }
    }

    #[must_use]
    pub const fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    #[must_use]
    pub const fn config(&self) -> &PacingConfig {
        &self.config
    }
}
