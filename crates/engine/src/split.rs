//! Split calculator.
//!
//! Turns the expense form ([`SplitRequest`]) into per-member shares. Every
//! check runs before anything is sent to the backend and the first failure
//! wins, so the caller can show a single message.
//!
//! Rounding: shares are computed in cents. For EQUAL splits, and PERCENTAGE
//! splits whose percentages add up to exactly 100%, the cents lost to
//! rounding are handed out one at a time starting from the payer, so the
//! shares always add up to the total.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::{Entry, MoneyCents, Percent, Split, SplitError, SplitType};

/// One member's computed share, before it becomes a [`Split`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitShare {
    pub user_id: String,
    pub amount: MoneyCents,
}

/// Input of the expense form.
#[derive(Clone, Debug, Default)]
pub struct SplitRequest {
    pub title: String,
    /// `None` when the user left the field empty.
    pub total: Option<MoneyCents>,
    pub split_type: SplitType,
    /// Selected members, in display order.
    pub members: Vec<String>,
    pub paid_by: Option<String>,
    /// Used for [`SplitType::Percentage`]; missing members count as 0%.
    pub percentages: HashMap<String, Percent>,
    /// Used for [`SplitType::Manual`]; missing members count as 0.
    pub manual_amounts: HashMap<String, MoneyCents>,
}

impl SplitRequest {
    /// Selected members without duplicates, first occurrence wins.
    fn unique_members(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.members
            .iter()
            .map(String::as_str)
            .filter(|id| seen.insert(*id))
            .collect()
    }

    fn percent_of(&self, user_id: &str) -> Percent {
        self.percentages.get(user_id).copied().unwrap_or(Percent::ZERO)
    }

    fn manual_of(&self, user_id: &str) -> MoneyCents {
        self.manual_amounts
            .get(user_id)
            .copied()
            .unwrap_or(MoneyCents::ZERO)
    }

    /// Sum of the percentages of the selected members.
    #[must_use]
    pub fn total_percentage(&self) -> Percent {
        self.unique_members()
            .into_iter()
            .map(|id| self.percent_of(id))
            .sum()
    }

    /// Sum of the manual amounts of the selected members, `None` on
    /// overflow.
    #[must_use]
    pub fn total_manual(&self) -> Option<MoneyCents> {
        MoneyCents::checked_sum(
            self.unique_members()
                .into_iter()
                .map(|id| self.manual_of(id)),
        )
    }

    /// Runs every form check; returns the validated total.
    pub fn validate(&self) -> Result<MoneyCents, SplitError> {
        let members = self.unique_members();
        if members.is_empty() {
            return Err(SplitError::NoMembers);
        }
        if self.title.trim().is_empty() {
            return Err(SplitError::EmptyTitle);
        }
        let total = match self.total {
            Some(total) if total.is_positive() => total,
            _ => return Err(SplitError::InvalidTotal),
        };
        if self.paid_by.as_deref().is_none_or(|id| id.trim().is_empty()) {
            return Err(SplitError::NoPayer);
        }

        match self.split_type {
            SplitType::Equal => {}
            SplitType::Percentage => {
                let sum = self.total_percentage();
                if !sum.is_whole() {
                    return Err(SplitError::PercentageSum(sum));
                }
                if let Some(id) = members.iter().find(|id| self.percent_of(id) < Percent::ZERO) {
                    return Err(SplitError::ShareOutOfRange((*id).to_string()));
                }
            }
            SplitType::Manual => {
                let sum = self.total_manual().ok_or(SplitError::AmountTooLarge)?;
                if !sum.reconciles_with(total) {
                    return Err(SplitError::ManualSum {
                        expected: total,
                        actual: sum,
                    });
                }
                if let Some(id) = members.iter().find(|id| {
                    let amount = self.manual_of(id);
                    amount.is_negative() || amount > total
                }) {
                    return Err(SplitError::ShareOutOfRange((*id).to_string()));
                }
            }
        }

        Ok(total)
    }

    /// Validates the form and computes the shares, in member order.
    pub fn compute(&self) -> Result<Vec<SplitShare>, SplitError> {
        let total = self.validate()?;
        let members = self.unique_members();
        let payer = self.paid_by.as_deref();

        let shares = match self.split_type {
            SplitType::Equal => {
                let count = members.len() as i64;
                let base = MoneyCents::new(total.cents().div_euclid(count));
                let mut shares: Vec<SplitShare> = members
                    .iter()
                    .map(|id| SplitShare {
                        user_id: (*id).to_string(),
                        amount: base,
                    })
                    .collect();
                let residual = total - base * count;
                distribute_residual(&mut shares, residual, payer);
                shares
            }
            SplitType::Percentage => {
                let mut shares: Vec<SplitShare> = members
                    .iter()
                    .map(|id| SplitShare {
                        user_id: (*id).to_string(),
                        amount: total.percent_of(self.percent_of(id)),
                    })
                    .collect();
                let assigned = MoneyCents::checked_sum(shares.iter().map(|s| s.amount))
                    .ok_or(SplitError::AmountTooLarge)?;
                distribute_residual(&mut shares, total - assigned, payer);
                shares
            }
            SplitType::Manual => members
                .iter()
                .map(|id| SplitShare {
                    user_id: (*id).to_string(),
                    amount: self.manual_of(id),
                })
                .collect(),
        };

        Ok(shares)
    }
}

/// Spreads `residual` cents one at a time over `shares`, starting with the
/// payer when present and then in member order. Negative residuals take a
/// cent away instead, skipping shares that are already zero.
fn distribute_residual(shares: &mut [SplitShare], residual: MoneyCents, payer: Option<&str>) {
    if shares.is_empty() || residual.is_zero() {
        return;
    }
    let step = if residual.is_negative() { -1 } else { 1 };
    let start = payer
        .and_then(|payer| shares.iter().position(|share| share.user_id == payer))
        .unwrap_or(0);

    let len = shares.len();
    let mut remaining = residual.cents().abs();
    let mut offset = 0;
    while remaining > 0 {
        if step < 0 && shares.iter().all(|share| !share.amount.is_positive()) {
            break;
        }
        let share = &mut shares[(start + offset) % len];
        offset += 1;
        if step < 0 && !share.amount.is_positive() {
            continue;
        }
        share.amount += MoneyCents::new(step);
        remaining -= 1;
    }
}

/// Turns computed shares into splits for a new entry. The payer's split is
/// created already settled.
pub fn splits_for_new_entry(
    shares: Vec<SplitShare>,
    paid_by: &str,
    now: DateTime<Utc>,
) -> Vec<Split> {
    shares
        .into_iter()
        .map(|share| {
            let is_payer = share.user_id == paid_by;
            Split {
                user_id: share.user_id,
                amount: share.amount,
                paid: is_payer,
                changed_at: is_payer.then_some(now),
            }
        })
        .collect()
}

/// Splits for an edited entry: the payer's split is forced to paid, the other
/// members keep the settlement state (and timestamp) they had before.
pub fn splits_for_update(previous: &Entry, shares: Vec<SplitShare>, paid_by: &str) -> Vec<Split> {
    shares
        .into_iter()
        .map(|share| {
            if share.user_id == paid_by {
                return Split {
                    user_id: share.user_id,
                    amount: share.amount,
                    paid: true,
                    changed_at: None,
                };
            }
            let old = previous.split(&share.user_id);
            Split {
                paid: old.is_some_and(|split| split.paid),
                changed_at: old.and_then(|split| split.changed_at),
                user_id: share.user_id,
                amount: share.amount,
            }
        })
        .collect()
}

/// Per-member percentages of an existing entry, used to pre-fill the form
/// when a PERCENTAGE entry is edited.
pub fn percentages_from_entry(entry: &Entry) -> HashMap<String, Percent> {
    entry
        .splits
        .iter()
        .map(|split| {
            let percent = if entry.total.is_zero() {
                Percent::ZERO
            } else {
                let scaled = i128::from(split.amount.cents()) * 10_000;
                let total = i128::from(entry.total.cents());
                Percent::new(((scaled + total / 2) / total) as i64)
            };
            (split.user_id.clone(), percent)
        })
        .collect()
}

/// Rebuilds the form input of an existing entry for editing.
pub fn request_from_entry(entry: &Entry) -> SplitRequest {
    let members = entry.splits.iter().map(|s| s.user_id.clone()).collect();
    let mut request = SplitRequest {
        title: entry.title.clone(),
        total: Some(entry.total),
        split_type: entry.split_type,
        members,
        paid_by: Some(entry.paid_by.clone()),
        ..SplitRequest::default()
    };
    match entry.split_type {
        SplitType::Percentage => request.percentages = percentages_from_entry(entry),
        SplitType::Equal | SplitType::Manual => {
            request.manual_amounts = entry
                .splits
                .iter()
                .map(|split| (split.user_id.clone(), split.amount))
                .collect();
        }
    }
    request
}
