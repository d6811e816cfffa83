//! Ordering of the entry list.

use std::{cmp::Ordering, fmt, str::FromStr};

use crate::{EngineError, Entry, balance::settlement};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Newest first.
    #[default]
    DateDesc,
    DateAsc,
    AmountDesc,
    AmountAsc,
    TitleAsc,
    TitleDesc,
    /// Entries with unpaid splits first; list order is kept within each
    /// group.
    Status,
}

impl SortOrder {
    pub const ALL: [SortOrder; 7] = [
        Self::DateDesc,
        Self::DateAsc,
        Self::AmountDesc,
        Self::AmountAsc,
        Self::TitleAsc,
        Self::TitleDesc,
        Self::Status,
    ];

    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::DateDesc => "date-desc",
            Self::DateAsc => "date-asc",
            Self::AmountDesc => "amount-desc",
            Self::AmountAsc => "amount-asc",
            Self::TitleAsc => "title-asc",
            Self::TitleDesc => "title-desc",
            Self::Status => "status",
        }
    }

    fn compare(self, a: &Entry, b: &Entry) -> Ordering {
        match self {
            Self::DateDesc => b.date.cmp(&a.date),
            Self::DateAsc => a.date.cmp(&b.date),
            Self::AmountDesc => b.total.cmp(&a.total),
            Self::AmountAsc => a.total.cmp(&b.total),
            Self::TitleAsc => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            Self::TitleDesc => b.title.to_lowercase().cmp(&a.title.to_lowercase()),
            Self::Status => settlement(a)
                .is_settled()
                .cmp(&settlement(b).is_settled()),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for SortOrder {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        match wanted.as_str() {
            "date" => return Ok(Self::DateDesc),
            "amount" => return Ok(Self::AmountDesc),
            "title" => return Ok(Self::TitleAsc),
            _ => {}
        }
        Self::ALL
            .into_iter()
            .find(|order| order.code() == wanted)
            .ok_or_else(|| EngineError::KeyNotFound(format!("sort order {s}")))
    }
}

/// Stable sort of `entries` in place.
pub fn sort_entries(entries: &mut [Entry], order: SortOrder) {
    entries.sort_by(|a, b| order.compare(a, b));
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::{MoneyCents, Split, SplitType};

    fn entry(id: &str, day: u32, total: i64, settled: bool) -> Entry {
        Entry {
            id: id.to_string(),
            title: id.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            group_id: "g".to_string(),
            total: MoneyCents::new(total),
            split_type: SplitType::Manual,
            paid_by: "a".to_string(),
            created_by: None,
            splits: vec![
                Split::new("a", MoneyCents::new(total / 2)),
                Split {
                    paid: settled,
                    ..Split::new("b", MoneyCents::new(total - total / 2))
                },
            ],
        }
    }

    fn ids(entries: &[Entry]) -> Vec<&str> {
        entries.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn sorts_by_date_and_amount() {
        let mut entries = vec![
            entry("b", 2, 300, false),
            entry("a", 1, 100, true),
            entry("c", 3, 200, false),
        ];
        sort_entries(&mut entries, SortOrder::DateDesc);
        assert_eq!(ids(&entries), vec!["c", "b", "a"]);
        sort_entries(&mut entries, SortOrder::AmountAsc);
        assert_eq!(ids(&entries), vec!["a", "c", "b"]);
        sort_entries(&mut entries, SortOrder::TitleDesc);
        assert_eq!(ids(&entries), vec!["c", "b", "a"]);
    }

    #[test]
    fn status_puts_unsettled_first_and_keeps_list_order() {
        let mut entries = vec![
            entry("settled", 5, 100, true),
            entry("old", 1, 100, false),
            entry("new", 4, 100, false),
        ];
        sort_entries(&mut entries, SortOrder::Status);
        assert_eq!(ids(&entries), vec!["old", "new", "settled"]);
    }

    #[test]
    fn parses_codes_and_short_names() {
        assert_eq!("amount".parse::<SortOrder>().unwrap(), SortOrder::AmountDesc);
        assert_eq!("Title-Desc".parse::<SortOrder>().unwrap(), SortOrder::TitleDesc);
        assert!("price".parse::<SortOrder>().is_err());
    }
}
