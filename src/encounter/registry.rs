//! # Active Encounter Registry
//!
//! Holds at most one live [`WildEncounter`] per channel.
//!
//! Every channel owns its own lock-protected slot. The channel map is only
//! locked long enough to fetch or create a slot handle, so operations on
//! different channels never wait on each other. Expiry is lazy: an encounter
//! older than the timeout is discarded by the next operation that looks at
//! its slot.
//!
//! Slots are created on first use and stay in the map until
//! [`EncounterRegistry::prune_idle`] drops the empty ones.

use crate::{ChannelId, Clock, EncounterId, WildEncounter};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

type Slot = Arc<Mutex<Option<WildEncounter>>>;

/// Result of trying to place an encounter in a channel.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    /// The slot was empty and now holds the encounter
    Inserted,
    /// A live encounter already occupies the slot; the rejected one is
    /// handed back
    Occupied(WildEncounter),
}

/// Result of a conditional capture.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureAttempt {
    /// The caller won the encounter and the slot is now empty
    Captured(WildEncounter),
    /// An encounter is live but the condition rejected it
    Rejected,
    /// Nothing to capture, either never spawned, already caught or fled
    Empty,
}

/// Per-channel single-slot store of live encounters.
#[derive(Debug)]
pub struct EncounterRegistry {
    slots: RwLock<HashMap<ChannelId, Slot>>,
    timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl EncounterRegistry {
    /// Creates an empty registry whose encounters expire after `timeout`.
    pub fn new(timeout: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            timeout,
            clock,
        }
    }

    /// Encounter lifetime.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Places `encounter` in the channel if no live encounter is there.
    ///
    /// An expired occupant is discarded and replaced.
    pub fn try_insert(&self, channel: ChannelId, encounter: WildEncounter) -> InsertOutcome {
        let slot = self.slot(channel);
        let mut guard = lock(&slot);
        self.discard_expired(channel, &mut guard);

        if guard.is_some() {
            debug!("Channel {} already has a wild encounter", channel);
            return InsertOutcome::Occupied(encounter);
        }

        info!("{} released on channel {}", encounter.name(), channel);
        *guard = Some(encounter);
        InsertOutcome::Inserted
    }

    /// Puts a captured encounter back, for when its capture could not be
    /// completed.
    ///
    /// Keeps the original spawn time, so the encounter still flees on
    /// schedule. Fails with [`InsertOutcome::Occupied`] when another
    /// encounter took the channel in the meantime.
    pub fn restore(&self, channel: ChannelId, encounter: WildEncounter) -> InsertOutcome {
        let slot = self.slot(channel);
        let mut guard = lock(&slot);
        self.discard_expired(channel, &mut guard);

        if guard.is_some() {
            warn!(
                "Could not restore {} on channel {}: slot taken",
                encounter.name(),
                channel
            );
            return InsertOutcome::Occupied(encounter);
        }
        debug!("{} restored on channel {}", encounter.name(), channel);
        *guard = Some(encounter);
        InsertOutcome::Inserted
    }

    /// Takes the live encounter out of the channel, if any.
    pub fn try_capture(&self, channel: ChannelId) -> Option<WildEncounter> {
        match self.capture_if(channel, |_| true) {
            CaptureAttempt::Captured(encounter) => Some(encounter),
            CaptureAttempt::Rejected | CaptureAttempt::Empty => None,
        }
    }

    /// Takes the live encounter out of the channel when `accept` approves it.
    ///
    /// `accept` runs inside the channel's critical section, so the encounter
    /// it inspects is the one that gets removed. Of any number of concurrent
    /// callers, at most one observes [`CaptureAttempt::Captured`] per
    /// encounter.
    pub fn capture_if<F>(&self, channel: ChannelId, accept: F) -> CaptureAttempt
    where
        F: FnOnce(&WildEncounter) -> bool,
    {
        let slot = self.slot(channel);
        let mut guard = lock(&slot);
        self.discard_expired(channel, &mut guard);

        let accepted = match guard.as_ref() {
            None => return CaptureAttempt::Empty,
            Some(encounter) => accept(encounter),
        };
        if !accepted {
            return CaptureAttempt::Rejected;
        }

        match guard.take() {
            Some(encounter) => CaptureAttempt::Captured(encounter),
            None => CaptureAttempt::Empty,
        }
    }

    /// Takes the encounter out only if it is the one identified by `id`.
    pub fn capture_by_id(&self, channel: ChannelId, id: EncounterId) -> Option<WildEncounter> {
        match self.capture_if(channel, |encounter| encounter.id == id) {
            CaptureAttempt::Captured(encounter) => Some(encounter),
            CaptureAttempt::Rejected | CaptureAttempt::Empty => None,
        }
    }

    /// Removes and returns the channel's encounter if it has expired.
    ///
    /// This is how callers learn that a creature fled.
    pub fn take_expired(&self, channel: ChannelId) -> Option<WildEncounter> {
        let slot = self.existing_slot(channel)?;
        let mut guard = lock(&slot);
        self.discard_expired(channel, &mut guard)
    }

    /// Returns a copy of the live encounter without touching the slot.
    ///
    /// An expired encounter is reported as absent but left in place for the
    /// next mutating operation to discard.
    pub fn peek(&self, channel: ChannelId) -> Option<WildEncounter> {
        let slot = self.existing_slot(channel)?;
        let guard = lock(&slot);
        guard
            .as_ref()
            .filter(|encounter| !encounter.is_expired(self.clock.now(), self.timeout))
            .cloned()
    }

    /// Whether the channel holds a live encounter.
    pub fn is_occupied(&self, channel: ChannelId) -> bool {
        self.peek(channel).is_some()
    }

    /// Drops the slots of channels that hold nothing and that no caller is
    /// using. Returns how many slots were dropped.
    pub fn prune_idle(&self) -> usize {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        let before = slots.len();
        slots.retain(|_, slot| {
            Arc::strong_count(slot) > 1 || slot.try_lock().map_or(true, |guard| guard.is_some())
        });
        let pruned = before - slots.len();
        if pruned > 0 {
            debug!("Pruned {} idle channel slots", pruned);
        }
        pruned
    }

    /// Number of channels with a slot.
    pub fn channel_count(&self) -> usize {
        self.slots.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn discard_expired(
        &self,
        channel: ChannelId,
        guard: &mut MutexGuard<'_, Option<WildEncounter>>,
    ) -> Option<WildEncounter> {
        let now = self.clock.now();
        if guard
            .as_ref()
            .is_some_and(|encounter| encounter.is_expired(now, self.timeout))
        {
            let fled = guard.take();
            if let Some(encounter) = &fled {
                info!("{} fled from channel {}", encounter.name(), channel);
            }
            return fled;
        }
        None
    }

    fn existing_slot(&self, channel: ChannelId) -> Option<Slot> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.get(&channel).cloned()
    }

    fn slot(&self, channel: ChannelId) -> Slot {
        if let Some(slot) = self.existing_slot(channel) {
            return slot;
        }
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(channel).or_default())
    }
}

fn lock(slot: &Slot) -> MutexGuard<'_, Option<WildEncounter>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}
