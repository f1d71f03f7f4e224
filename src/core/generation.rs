use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use tracing::debug;

use crate::error::{ViewerError, ViewerResult};

/// Proof that a logical action was started at a given generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionTicket<K> {
    pub action: K,
    pub generation: u64,
    pub epoch: u64,
}

/// Per-action generation counters guarding against stale responses.
///
/// Starting an action bumps its counter; a response may only apply its side
/// effects while the ticket it was started with is still the latest one.
/// Advancing the epoch invalidates every outstanding ticket at once.
#[derive(Debug, Clone)]
pub struct ActionGenerations<K> {
    counters: HashMap<K, u64>,
    epoch: u64,
}

impl<K> Default for ActionGenerations<K> {
    fn default() -> Self {
        Self {
            counters: HashMap::new(),
            epoch: 0,
        }
    }
}

impl<K> ActionGenerations<K>
where
    K: Clone + Eq + Hash + Debug,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, action: K) -> ActionTicket<K> {
        let counter = self.counters.entry(action.clone()).or_insert(0);
        *counter += 1;
        ActionTicket {
            action,
            generation: *counter,
            epoch: self.epoch,
        }
    }

    /// Marks every outstanding ticket stale, e.g. after a context switch.
    pub fn advance_epoch(&mut self) {
        self.epoch += 1;
    }

    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    #[must_use]
    pub fn current(&self, action: &K) -> u64 {
        self.counters.get(action).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn is_current(&self, ticket: &ActionTicket<K>) -> bool {
        ticket.epoch == self.epoch && self.current(&ticket.action) == ticket.generation
    }

    pub fn ensure_current(&self, ticket: &ActionTicket<K>) -> ViewerResult<()> {
        if self.is_current(ticket) {
            return Ok(());
        }
        debug!(
            action = ?ticket.action,
            generation = ticket.generation,
            latest = self.current(&ticket.action),
            ticket_epoch = ticket.epoch,
            epoch = self.epoch,
            "dropping superseded response"
        );
        Err(ViewerError::Superseded {
            action: format!("{:?}", ticket.action),
            generation: ticket.generation,
        })
    }
}
