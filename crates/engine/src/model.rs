//! Domain model of the shared ledger: groups, entries (expenses) and the
//! splits that divide an entry among members.

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};

use crate::{EngineError, MoneyCents, ResultEngine};

/// How an entry total is divided among its members.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SplitType {
    #[default]
    Equal,
    Percentage,
    Manual,
}

impl SplitType {
    /// Canonical code used by the backend.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Equal => "EQUAL",
            Self::Percentage => "PERCENTAGE",
            Self::Manual => "MANUAL",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Equal => "Equal Split",
            Self::Percentage => "Percentage Split",
            Self::Manual => "Manual Split",
        }
    }
}

impl fmt::Display for SplitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for SplitType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EQUAL" => Ok(Self::Equal),
            "PERCENTAGE" => Ok(Self::Percentage),
            "MANUAL" => Ok(Self::Manual),
            other => Err(EngineError::InvalidSplit(format!(
                "unknown split type: {other}"
            ))),
        }
    }
}

/// One member's share of an entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Split {
    pub user_id: String,
    pub amount: MoneyCents,
    /// Stored settlement flag. Use [`Entry::split_is_paid`] to read it: the
    /// payer's split is always settled whatever this says.
    pub paid: bool,
    /// Last time `paid` changed.
    pub changed_at: Option<DateTime<Utc>>,
}

impl Split {
    pub fn new(user_id: impl Into<String>, amount: MoneyCents) -> Self {
        Self {
            user_id: user_id.into(),
            amount,
            paid: false,
            changed_at: None,
        }
    }
}

/// An expense recorded in a group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    pub group_id: String,
    pub total: MoneyCents,
    pub split_type: SplitType,
    pub paid_by: String,
    pub created_by: Option<String>,
    pub splits: Vec<Split>,
}

impl Entry {
    #[must_use]
    pub fn is_payer(&self, user_id: &str) -> bool {
        self.paid_by == user_id
    }

    pub fn split(&self, user_id: &str) -> Option<&Split> {
        self.splits.iter().find(|split| split.user_id == user_id)
    }

    pub fn split_mut(&mut self, user_id: &str) -> Option<&mut Split> {
        self.splits.iter_mut().find(|split| split.user_id == user_id)
    }

    /// Amount owed by `user_id` for this entry (zero if not part of it).
    #[must_use]
    pub fn share_of(&self, user_id: &str) -> MoneyCents {
        self.split(user_id)
            .map(|split| split.amount)
            .unwrap_or(MoneyCents::ZERO)
    }

    /// Settlement state of `split` as seen by the client. The payer's split
    /// reads as paid regardless of the stored flag.
    #[must_use]
    pub fn split_is_paid(&self, split: &Split) -> bool {
        split.paid || self.is_payer(&split.user_id)
    }

    #[must_use]
    pub fn splits_total(&self) -> Option<MoneyCents> {
        MoneyCents::checked_sum(self.splits.iter().map(|split| split.amount))
    }

    /// Checks the structural invariants of an entry: shares are within
    /// `[0, total]` and add up to the total within one cent.
    pub fn validate(&self) -> ResultEngine<()> {
        for split in &self.splits {
            if split.amount.is_negative() || split.amount > self.total {
                return Err(EngineError::InvalidSplit(format!(
                    "share of {} is out of range",
                    split.user_id
                )));
            }
        }
        if self.splits.is_empty() {
            return Ok(());
        }
        let sum = self
            .splits_total()
            .ok_or_else(|| EngineError::InvalidAmount("splits total overflows".to_string()))?;
        if !sum.reconciles_with(self.total) {
            return Err(EngineError::InvalidSplit(format!(
                "splits add up to {sum}, expected {}",
                self.total
            )));
        }
        Ok(())
    }

    /// Forces the payer's stored flag to paid. Applied to every entry the
    /// client receives so the rest of the code sees a consistent ledger.
    pub fn normalize_payer(&mut self) {
        let paid_by = self.paid_by.clone();
        if let Some(split) = self.split_mut(&paid_by) {
            split.paid = true;
        }
    }
}

/// A member as listed by the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Member {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl Member {
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.name, self.email)
    }
}

/// A group of members sharing expenses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub is_public: bool,
    pub owner_id: String,
    pub member_ids: Vec<String>,
}

impl Group {
    #[must_use]
    pub fn is_owner(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }

    #[must_use]
    pub fn is_member(&self, user_id: &str) -> bool {
        self.member_ids.iter().any(|id| id == user_id)
    }

    /// Owner-only operations (remove member, delete, change password,
    /// invite) are refused locally before any request is made.
    pub fn ensure_owner(&self, user_id: &str, action: &str) -> ResultEngine<()> {
        if self.is_owner(user_id) {
            return Ok(());
        }
        Err(EngineError::Forbidden(format!(
            "only the group owner can {action}"
        )))
    }

    /// The owner is removed only by deleting the group.
    pub fn ensure_removable(&self, actor_id: &str, member_id: &str) -> ResultEngine<()> {
        self.ensure_owner(actor_id, "remove members")?;
        if self.is_owner(member_id) {
            return Err(EngineError::Forbidden(
                "cannot remove the group owner".to_string(),
            ));
        }
        if !self.is_member(member_id) {
            return Err(EngineError::KeyNotFound(member_id.to_string()));
        }
        Ok(())
    }
}

/// Checks a new group before it is sent: a name is required and private
/// groups need a password.
pub fn validate_new_group(name: &str, is_public: bool, password: Option<&str>) -> ResultEngine<()> {
    if name.trim().is_empty() {
        return Err(EngineError::InvalidGroup("group name is required".to_string()));
    }
    let has_password = password.is_some_and(|p| !p.trim().is_empty());
    if !is_public && !has_password {
        return Err(EngineError::InvalidGroup(
            "private groups require a password".to_string(),
        ));
    }
    Ok(())
}

/// A shareable invite to a group. Only displayed, never stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InviteLink {
    pub token: String,
    pub group_id: String,
    pub group_name: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl InviteLink {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Link opened by the invitee, e.g. `https://host/join?token=abc`.
    #[must_use]
    pub fn url(&self, base: &str) -> String {
        format!("{}/join?token={}", base.trim_end_matches('/'), self.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> Entry {
        Entry {
            id: "e1".to_string(),
            title: "Dinner".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            group_id: "g1".to_string(),
            total: MoneyCents::new(9_000),
            split_type: SplitType::Equal,
            paid_by: "a".to_string(),
            created_by: Some("a".to_string()),
            splits: vec![
                Split::new("a", MoneyCents::new(3_000)),
                Split::new("b", MoneyCents::new(3_000)),
                Split::new("c", MoneyCents::new(3_000)),
            ],
        }
    }

    #[test]
    fn payer_split_reads_paid_even_if_stored_unpaid() {
        let entry = entry();
        let payer = entry.split("a").unwrap();
        assert!(!payer.paid);
        assert!(entry.split_is_paid(payer));
        assert!(!entry.split_is_paid(entry.split("b").unwrap()));
    }

    #[test]
    fn normalize_payer_sets_stored_flag() {
        let mut entry = entry();
        entry.normalize_payer();
        assert!(entry.split("a").unwrap().paid);
        assert!(!entry.split("b").unwrap().paid);
    }

    #[test]
    fn validate_checks_sum_and_range() {
        let mut entry = entry();
        assert!(entry.validate().is_ok());
        entry.splits[2].amount = MoneyCents::new(2_998);
        assert!(entry.validate().is_err());
        entry.splits[2].amount = MoneyCents::new(-1);
        assert!(entry.validate().is_err());
    }

    #[test]
    fn validate_reports_an_overflowing_splits_total() {
        let mut entry = entry();
        entry.total = MoneyCents::new(i64::MAX);
        for split in &mut entry.splits {
            split.amount = MoneyCents::new(i64::MAX);
        }
        assert_eq!(entry.splits_total(), None);
        assert!(matches!(entry.validate(), Err(EngineError::InvalidAmount(_))));
    }

    #[test]
    fn split_type_parses_backend_codes() {
        assert_eq!("percentage".parse::<SplitType>().unwrap(), SplitType::Percentage);
        assert_eq!(SplitType::Manual.to_string(), "MANUAL");
        assert!("THIRDS".parse::<SplitType>().is_err());
    }

    #[test]
    fn only_owner_may_remove_members_but_not_themselves() {
        let group = Group {
            id: "g1".to_string(),
            name: "Trip".to_string(),
            is_public: true,
            owner_id: "a".to_string(),
            member_ids: vec!["a".to_string(), "b".to_string()],
        };
        assert!(group.ensure_removable("a", "b").is_ok());
        assert!(matches!(
            group.ensure_removable("b", "a"),
            Err(EngineError::Forbidden(_))
        ));
        assert!(matches!(
            group.ensure_removable("a", "a"),
            Err(EngineError::Forbidden(_))
        ));
        assert!(matches!(
            group.ensure_removable("a", "z"),
            Err(EngineError::KeyNotFound(_))
        ));
    }

    #[test]
    fn private_group_needs_password() {
        assert!(validate_new_group("Trip", true, None).is_ok());
        assert!(validate_new_group("Trip", false, Some("secret")).is_ok());
        assert!(validate_new_group("Trip", false, Some("  ")).is_err());
        assert!(validate_new_group(" ", true, None).is_err());
    }
}
