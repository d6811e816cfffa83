//! Planning and tallying of batch settlement.
//!
//! A batch marks every non-payer split of the selected entries. Requests are
//! all awaited (no fail-fast); the report then says how many failed and which.

use std::fmt;

use crate::{Entry, SplitKey};

/// How many failing pairs are named in the summary.
pub const NAMED_FAILURES: usize = 3;

/// Splits targeted by a batch over `selected` entry ids, in entry then split
/// order. Payer splits are skipped; unknown ids are ignored.
pub fn plan(entries: &[Entry], selected: &[String]) -> Vec<SplitKey> {
    entries
        .iter()
        .filter(|entry| selected.contains(&entry.id))
        .flat_map(|entry| {
            entry
                .splits
                .iter()
                .filter(|split| !entry.is_payer(&split.user_id))
                .map(|split| SplitKey::new(entry.id.clone(), split.user_id.clone()))
        })
        .collect()
}

/// Outcome of a batch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub succeeded: usize,
    pub failures: Vec<SplitKey>,
}

impl BatchReport {
    /// Counts outcomes; failures keep their dispatch order.
    pub fn tally<I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = (SplitKey, bool)>,
    {
        let mut report = Self::default();
        for (key, ok) in outcomes {
            if ok {
                report.succeeded += 1;
            } else {
                report.failures.push(key);
            }
        }
        report
    }

    #[must_use]
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failures.len()
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Error banner text naming the first [`NAMED_FAILURES`] failing pairs,
    /// or `None` when nothing failed. `label` renders one pair.
    pub fn failure_summary<F>(&self, label: F) -> Option<String>
    where
        F: Fn(&SplitKey) -> String,
    {
        if self.failures.is_empty() {
            return None;
        }
        let named: Vec<String> = self
            .failures
            .iter()
            .take(NAMED_FAILURES)
            .map(&label)
            .collect();
        let mut message = format!(
            "Failed to update {} of {} splits: {}",
            self.failures.len(),
            self.attempted(),
            named.join(", ")
        );
        let rest = self.failures.len().saturating_sub(NAMED_FAILURES);
        if rest > 0 {
            message.push_str(&format!(" and {rest} more"));
        }
        Some(message)
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} splits updated",
            self.succeeded,
            self.attempted()
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::{MoneyCents, Split, SplitType};

    fn entry(id: &str, paid_by: &str, members: &[&str]) -> Entry {
        Entry {
            id: id.to_string(),
            title: id.to_uppercase(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            group_id: "g".to_string(),
            total: MoneyCents::new(100 * members.len() as i64),
            split_type: SplitType::Equal,
            paid_by: paid_by.to_string(),
            created_by: None,
            splits: members
                .iter()
                .map(|m| Split::new(*m, MoneyCents::new(100)))
                .collect(),
        }
    }

    #[test]
    fn plan_skips_payer_and_unselected_entries() {
        let entries = vec![
            entry("e1", "a", &["a", "b", "c"]),
            entry("e2", "b", &["a", "b"]),
            entry("e3", "a", &["a", "c"]),
        ];
        let selected = vec!["e1".to_string(), "e2".to_string(), "missing".to_string()];
        assert_eq!(
            plan(&entries, &selected),
            vec![
                SplitKey::new("e1", "b"),
                SplitKey::new("e1", "c"),
                SplitKey::new("e2", "a"),
            ]
        );
    }

    #[test]
    fn clean_report_has_no_summary() {
        let report = BatchReport::tally(vec![
            (SplitKey::new("e1", "b"), true),
            (SplitKey::new("e1", "c"), true),
        ]);
        assert!(report.is_clean());
        assert_eq!(report.failure_summary(|k| k.user_id.clone()), None);
        assert_eq!(report.to_string(), "2 of 2 splits updated");
    }

    #[test]
    fn summary_names_first_three_failures() {
        let report = BatchReport::tally(vec![
            (SplitKey::new("e1", "b"), false),
            (SplitKey::new("e1", "c"), true),
            (SplitKey::new("e2", "a"), false),
            (SplitKey::new("e3", "c"), false),
            (SplitKey::new("e4", "d"), false),
        ]);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failures.len(), 4);
        let summary = report
            .failure_summary(|k| format!("{}/{}", k.entry_id, k.user_id))
            .unwrap();
        assert_eq!(
            summary,
            "Failed to update 4 of 5 splits: e1/b, e2/a, e3/c and 1 more"
        );
    }
}
