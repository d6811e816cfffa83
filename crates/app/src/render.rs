use std::collections::HashMap;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use engine::{Debt, Entry, Group, InviteLink, MemberBalance, settlement};

pub fn name<'a>(names: &'a HashMap<String, String>, user_id: &'a str) -> &'a str {
    names
        .get(user_id)
        .map(String::as_str)
        .filter(|name| !name.is_empty())
        .unwrap_or(user_id)
}

pub fn timestamp(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%Y-%m-%d %H:%M").to_string()
}

pub fn group_line(group: &Group, me: Option<&str>) -> String {
    let visibility = if group.is_public { "public" } else { "private" };
    let owner = if me.is_some_and(|me| group.is_owner(me)) {
        ", owner"
    } else {
        ""
    };
    format!(
        "{}  {}  ({visibility}, {} members{owner})",
        group.id,
        group.name,
        group.member_ids.len()
    )
}

pub fn entry_line(entry: &Entry, names: &HashMap<String, String>) -> String {
    format!(
        "{}  {}  {}  {}  paid by {}  [{}]",
        entry.id,
        entry.date.format("%Y-%m-%d"),
        entry.title,
        entry.total,
        name(names, &entry.paid_by),
        settlement(entry)
    )
}

/// One line per split, the payer's marked as such.
pub fn split_lines(entry: &Entry, names: &HashMap<String, String>, tz: Tz) -> Vec<String> {
    entry
        .splits
        .iter()
        .map(|split| {
            let state = if entry.is_payer(&split.user_id) {
                "payer".to_string()
            } else if split.paid {
                match split.changed_at {
                    Some(at) => format!("paid {}", timestamp(at, tz)),
                    None => "paid".to_string(),
                }
            } else {
                "unpaid".to_string()
            };
            format!(
                "    {}  {}  {state}",
                name(names, &split.user_id),
                split.amount
            )
        })
        .collect()
}

pub fn balance_line(balance: &MemberBalance, names: &HashMap<String, String>) -> String {
    let who = name(names, &balance.user_id);
    if balance.balance.is_zero() {
        format!("{who} is settled up")
    } else if balance.is_owed() {
        format!("{who} is owed {}", balance.balance)
    } else {
        format!("{who} owes {}", balance.balance.abs())
    }
}

pub fn debt_line(debt: &Debt, names: &HashMap<String, String>) -> String {
    format!(
        "{} owes {} {}",
        name(names, &debt.from),
        name(names, &debt.to),
        debt.amount
    )
}

pub fn invite_lines(invite: &InviteLink, base_url: &str, tz: Tz) -> Vec<String> {
    let mut lines = vec![
        format!("Invite to {}", invite.group_name),
        invite.url(base_url),
    ];
    if let Some(at) = invite.expires_at {
        lines.push(format!("Expires {}", timestamp(at, tz)));
    }
    lines
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone};
    use engine::{MoneyCents, Split, SplitType, member_balance};

    use super::*;

    fn names() -> HashMap<String, String> {
        HashMap::from([("a".to_string(), "Ada".to_string())])
    }

    fn dinner() -> Entry {
        let paid_at = Utc.with_ymd_and_hms(2024, 6, 2, 18, 30, 0).unwrap();
        Entry {
            id: "e1".to_string(),
            title: "Dinner".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            group_id: "trip".to_string(),
            total: MoneyCents::new(9_000),
            split_type: SplitType::Equal,
            paid_by: "a".to_string(),
            created_by: None,
            splits: vec![
                Split {
                    paid: true,
                    ..Split::new("a", MoneyCents::new(3_000))
                },
                Split {
                    paid: true,
                    changed_at: Some(paid_at),
                    ..Split::new("b", MoneyCents::new(3_000))
                },
                Split::new("c", MoneyCents::new(3_000)),
            ],
        }
    }

    #[test]
    fn entry_line_shows_settlement() {
        assert_eq!(
            entry_line(&dinner(), &names()),
            "e1  2024-06-01  Dinner  $90.00  paid by Ada  [2 of 3 splits paid]"
        );
    }

    #[test]
    fn split_times_use_the_configured_zone() {
        let lines = split_lines(&dinner(), &names(), chrono_tz::Europe::Rome);
        assert_eq!(
            lines,
            vec![
                "    Ada  $30.00  payer",
                "    b  $30.00  paid 2024-06-02 20:30",
                "    c  $30.00  unpaid",
            ]
        );
    }

    #[test]
    fn balance_wording_follows_the_sign() {
        let entries = vec![dinner()];
        assert_eq!(
            balance_line(&member_balance(&entries, "a"), &names()),
            "Ada is owed $60.00"
        );
        assert_eq!(
            balance_line(&member_balance(&entries, "c"), &names()),
            "c owes $30.00"
        );
        assert_eq!(
            balance_line(&member_balance(&entries, "b"), &names()),
            "b is settled up"
        );
    }
}
