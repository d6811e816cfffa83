//! Balance and settlement reconciliation over a group's entries.
//!
//! Sign convention: a positive balance is owed *to* the member, a negative
//! balance is owed *by* the member.
//!
//! The payer's own split is always settled. This is enforced here through
//! [`Entry::split_is_paid`] and never read from the stored flag, because the
//! backend may transiently disagree.

use std::{collections::BTreeMap, fmt};

use crate::{Entry, MoneyCents};

/// A split the member still has to pay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutstandingSplit {
    pub entry_id: String,
    pub entry_title: String,
    /// Who fronted the money, i.e. who is owed.
    pub creditor: String,
    pub amount: MoneyCents,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberBalance {
    pub user_id: String,
    pub balance: MoneyCents,
    pub outstanding: Vec<OutstandingSplit>,
}

impl MemberBalance {
    #[must_use]
    pub fn is_owed(&self) -> bool {
        !self.balance.is_negative()
    }

    /// Sum of the outstanding splits.
    #[must_use]
    pub fn outstanding_total(&self) -> MoneyCents {
        self.outstanding.iter().map(|split| split.amount).sum()
    }
}

/// Net balance of `user_id` and the splits it still owes.
///
/// - entries paid by the member credit `total - own share`;
/// - entries paid by someone else debit the member's share while unpaid.
pub fn member_balance(entries: &[Entry], user_id: &str) -> MemberBalance {
    let mut balance = MoneyCents::ZERO;
    let mut outstanding = Vec::new();

    for entry in entries {
        if entry.is_payer(user_id) {
            balance += entry.total - entry.share_of(user_id);
            continue;
        }
        let Some(split) = entry.split(user_id) else {
            continue;
        };
        if !entry.split_is_paid(split) {
            balance -= split.amount;
            outstanding.push(OutstandingSplit {
                entry_id: entry.id.clone(),
                entry_title: entry.title.clone(),
                creditor: entry.paid_by.clone(),
                amount: split.amount,
            });
        }
    }

    MemberBalance {
        user_id: user_id.to_string(),
        balance,
        outstanding,
    }
}

/// Balances of every member of the group plus anyone appearing in the
/// entries, ordered by member id.
pub fn group_balances(entries: &[Entry], members: &[String]) -> Vec<MemberBalance> {
    let mut ids: Vec<&str> = members.iter().map(String::as_str).collect();
    for entry in entries {
        ids.push(entry.paid_by.as_str());
        ids.extend(entry.splits.iter().map(|split| split.user_id.as_str()));
    }
    ids.sort_unstable();
    ids.dedup();

    ids.into_iter()
        .map(|id| member_balance(entries, id))
        .collect()
}

/// Paid/total split count of one entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settlement {
    pub paid: usize,
    pub total: usize,
}

impl Settlement {
    /// Fully settled when every split reads as paid.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.paid == self.total
    }
}

impl fmt::Display for Settlement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} splits paid", self.paid, self.total)
    }
}

pub fn settlement(entry: &Entry) -> Settlement {
    Settlement {
        paid: entry
            .splits
            .iter()
            .filter(|split| entry.split_is_paid(split))
            .count(),
        total: entry.splits.len(),
    }
}

/// Number of fully settled entries out of all entries ("k of n settled").
pub fn settled_entries(entries: &[Entry]) -> Settlement {
    Settlement {
        paid: entries
            .iter()
            .filter(|entry| settlement(entry).is_settled())
            .count(),
        total: entries.len(),
    }
}

/// `from` owes `to` this amount.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Debt {
    pub from: String,
    pub to: String,
    pub amount: MoneyCents,
}

/// Who owes whom: unpaid non-payer splits summed per (debtor, creditor) pair,
/// with opposite directions netted. Sorted by debtor, then creditor.
pub fn debts(entries: &[Entry]) -> Vec<Debt> {
    // Key is the ordered pair; positive means key.0 owes key.1.
    let mut net: BTreeMap<(String, String), MoneyCents> = BTreeMap::new();

    for entry in entries {
        for split in &entry.splits {
            if entry.split_is_paid(split) || split.amount.is_zero() {
                continue;
            }
            let debtor = split.user_id.as_str();
            let creditor = entry.paid_by.as_str();
            let (key, amount) = if debtor < creditor {
                ((debtor.to_string(), creditor.to_string()), split.amount)
            } else {
                ((creditor.to_string(), debtor.to_string()), -split.amount)
            };
            *net.entry(key).or_insert(MoneyCents::ZERO) += amount;
        }
    }

    let mut out: Vec<Debt> = net
        .into_iter()
        .filter(|(_, amount)| !amount.is_zero())
        .map(|((a, b), amount)| {
            if amount.is_positive() {
                Debt {
                    from: a,
                    to: b,
                    amount,
                }
            } else {
                Debt {
                    from: b,
                    to: a,
                    amount: -amount,
                }
            }
        })
        .collect();
    out.sort_by(|x, y| x.from.cmp(&y.from).then_with(|| x.to.cmp(&y.to)));
    out
}
