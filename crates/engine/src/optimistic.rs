//! Optimistic toggling of a split's settlement state.
//!
//! A toggle is split in two halves so the local change is visible before the
//! network call resolves:
//!
//! 1. [`Optimistic::begin`] snapshots the split, applies the new state with a
//!    fresh timestamp and hands back a [`PendingToggle`] ticket.
//! 2. [`Optimistic::complete`] consumes the ticket once the backend answered.
//!    On failure it restores the snapshot, but only for the split the ticket
//!    owns and only if no later toggle has taken that split over.
//!
//! The payer's split is always settled, so toggling it is a no-op.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::{Entry, EngineError, ResultEngine};

/// Identifies one split: the entry it belongs to and its member.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SplitKey {
    pub entry_id: String,
    pub user_id: String,
}

impl SplitKey {
    pub fn new(entry_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            entry_id: entry_id.into(),
            user_id: user_id.into(),
        }
    }
}

/// Ticket of a toggle in flight. Carries what is needed to undo it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingToggle {
    pub key: SplitKey,
    /// State requested by this toggle.
    pub paid: bool,
    /// Timestamp applied locally, also sent to the backend.
    pub changed_at: DateTime<Utc>,
    id: u64,
    previous_paid: bool,
    previous_changed_at: Option<DateTime<Utc>>,
}

/// What [`Optimistic::complete`] did with a ticket.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    /// The backend accepted the change; local state already matches.
    Confirmed,
    /// The backend refused; the split is back to its previous state.
    RolledBack,
    /// The backend refused, but a later toggle owns the split now, so the
    /// local state was left alone.
    Superseded,
}

/// Bookkeeping of the toggles in flight for one view.
#[derive(Debug, Default)]
pub struct Optimistic {
    next_id: u64,
    owners: HashMap<SplitKey, u64>,
}

impl Optimistic {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of toggles still waiting for the backend.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.owners.len()
    }

    #[must_use]
    pub fn is_pending(&self, key: &SplitKey) -> bool {
        self.owners.contains_key(key)
    }

    /// Applies `paid` to the split locally.
    ///
    /// Returns `Ok(None)` when the split belongs to the payer: nothing changes
    /// and no request must be made.
    pub fn begin(
        &mut self,
        entries: &mut [Entry],
        key: SplitKey,
        paid: bool,
        now: DateTime<Utc>,
    ) -> ResultEngine<Option<PendingToggle>> {
        let entry = entries
            .iter_mut()
            .find(|entry| entry.id == key.entry_id)
            .ok_or_else(|| EngineError::KeyNotFound(key.entry_id.clone()))?;
        if entry.is_payer(&key.user_id) {
            return Ok(None);
        }
        let split = entry
            .split_mut(&key.user_id)
            .ok_or_else(|| EngineError::KeyNotFound(key.user_id.clone()))?;

        self.next_id += 1;
        let ticket = PendingToggle {
            key,
            paid,
            changed_at: now,
            id: self.next_id,
            previous_paid: split.paid,
            previous_changed_at: split.changed_at,
        };
        split.paid = paid;
        split.changed_at = Some(now);
        self.owners.insert(ticket.key.clone(), ticket.id);
        Ok(Some(ticket))
    }

    /// Settles a ticket with the backend outcome.
    pub fn complete(
        &mut self,
        entries: &mut [Entry],
        ticket: PendingToggle,
        succeeded: bool,
    ) -> Completion {
        let owns = self.owners.get(&ticket.key) == Some(&ticket.id);
        if owns {
            self.owners.remove(&ticket.key);
        }
        if succeeded {
            return Completion::Confirmed;
        }
        if !owns {
            return Completion::Superseded;
        }

        // The entry may have vanished after a refetch; nothing to restore then.
        if let Some(split) = entries
            .iter_mut()
            .find(|entry| entry.id == ticket.key.entry_id)
            .and_then(|entry| entry.split_mut(&ticket.key.user_id))
        {
            split.paid = ticket.previous_paid;
            split.changed_at = ticket.previous_changed_at;
        }
        Completion::RolledBack
    }

    /// Forgets every ticket, e.g. after an authoritative refetch replaced the
    /// entries. Later completions then count as superseded.
    pub fn clear(&mut self) {
        self.owners.clear();
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};

    use super::*;
    use crate::{MoneyCents, Split, SplitType};

    fn entries() -> Vec<Entry> {
        vec![Entry {
            id: "e1".to_string(),
            title: "Dinner".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            group_id: "g1".to_string(),
            total: MoneyCents::new(9_000),
            split_type: SplitType::Equal,
            paid_by: "a".to_string(),
            created_by: None,
            splits: vec![
                Split {
                    paid: true,
                    ..Split::new("a", MoneyCents::new(3_000))
                },
                Split::new("b", MoneyCents::new(3_000)),
                Split::new("c", MoneyCents::new(3_000)),
            ],
        }]
    }

    #[test]
    fn payer_toggle_is_a_no_op() {
        let mut state = entries();
        let before = state.clone();
        let mut optimistic = Optimistic::new();
        let ticket = optimistic
            .begin(&mut state, SplitKey::new("e1", "a"), false, Utc::now())
            .unwrap();
        assert!(ticket.is_none());
        assert_eq!(state, before);
        assert_eq!(optimistic.in_flight(), 0);
    }

    #[test]
    fn begin_applies_before_completion() {
        let mut state = entries();
        let mut optimistic = Optimistic::new();
        let now = Utc::now();
        let ticket = optimistic
            .begin(&mut state, SplitKey::new("e1", "b"), true, now)
            .unwrap()
            .unwrap();
        let split = state[0].split("b").unwrap();
        assert!(split.paid);
        assert_eq!(split.changed_at, Some(now));
        assert!(optimistic.is_pending(&ticket.key));

        assert_eq!(
            optimistic.complete(&mut state, ticket, true),
            Completion::Confirmed
        );
        assert!(state[0].split("b").unwrap().paid);
        assert_eq!(optimistic.in_flight(), 0);
    }

    #[test]
    fn failure_restores_previous_state() {
        let mut state = entries();
        let before = state.clone();
        let mut optimistic = Optimistic::new();
        let ticket = optimistic
            .begin(&mut state, SplitKey::new("e1", "b"), true, Utc::now())
            .unwrap()
            .unwrap();
        assert_eq!(
            optimistic.complete(&mut state, ticket, false),
            Completion::RolledBack
        );
        assert_eq!(state, before);
    }

    #[test]
    fn overlapping_toggles_roll_back_only_their_own_split() {
        let mut state = entries();
        let mut optimistic = Optimistic::new();
        let now = Utc::now();
        let first = optimistic
            .begin(&mut state, SplitKey::new("e1", "b"), true, now)
            .unwrap()
            .unwrap();
        let second = optimistic
            .begin(&mut state, SplitKey::new("e1", "c"), true, now)
            .unwrap()
            .unwrap();

        optimistic.complete(&mut state, first, false);
        assert!(!state[0].split("b").unwrap().paid);
        assert!(state[0].split("c").unwrap().paid, "second toggle survives");

        optimistic.complete(&mut state, second, true);
        assert!(state[0].split("c").unwrap().paid);
    }

    #[test]
    fn superseded_ticket_does_not_clobber_later_toggle() {
        let mut state = entries();
        let mut optimistic = Optimistic::new();
        let t0 = Utc::now();
        let first = optimistic
            .begin(&mut state, SplitKey::new("e1", "b"), true, t0)
            .unwrap()
            .unwrap();
        let second = optimistic
            .begin(&mut state, SplitKey::new("e1", "b"), false, t0 + Duration::seconds(1))
            .unwrap()
            .unwrap();

        assert_eq!(
            optimistic.complete(&mut state, first, false),
            Completion::Superseded
        );
        assert!(!state[0].split("b").unwrap().paid);
        assert_eq!(
            optimistic.complete(&mut state, second, false),
            Completion::RolledBack
        );
        // Back to what the second toggle saw, i.e. the first toggle's state.
        assert!(state[0].split("b").unwrap().paid);
    }

    #[test]
    fn unknown_split_is_an_error() {
        let mut state = entries();
        let mut optimistic = Optimistic::new();
        assert!(matches!(
            optimistic.begin(&mut state, SplitKey::new("e9", "b"), true, Utc::now()),
            Err(EngineError::KeyNotFound(_))
        ));
        assert!(matches!(
            optimistic.begin(&mut state, SplitKey::new("e1", "z"), true, Utc::now()),
            Err(EngineError::KeyNotFound(_))
        ));
    }
}
