//! Conversions between wire types and engine types.

use api_types::{
    entry::{Entry as WireEntry, EntryWithSplitsNew},
    group::{Group as WireGroup, Invite},
    split::Split as WireSplit,
    user::UserInfo,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use engine::{Entry, Group, InviteLink, Member, MoneyCents, Split, SplitRequest, SplitType};

use crate::error::{ClientError, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Timestamp as the backend stores it: ISO local date-time, in UTC.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Reads RFC 3339, ISO local date-time (taken as UTC) or a bare date.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    if let Ok(at) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(at.and_utc());
    }
    parse_date(raw).and_then(|date| date.and_hms_opt(0, 0, 0)).map(|at| at.and_utc())
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Entry dates may carry a time part; only the date is kept.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let head = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(head, DATE_FORMAT).ok()
}

fn money(value: f64, what: &str) -> Result<MoneyCents> {
    MoneyCents::from_major(value).map_err(|err| ClientError::Decode(format!("{what}: {err}")))
}

pub fn split_from_wire(split: WireSplit) -> Result<Split> {
    let changed_at = split
        .state_change_date
        .as_deref()
        .or(split.paid_date.as_deref())
        .and_then(parse_timestamp);
    Ok(Split {
        amount: money(split.amount, "split amount")?,
        user_id: split.user_id,
        paid: split.paid,
        changed_at,
    })
}

pub fn split_to_wire(split: &Split) -> WireSplit {
    let stamp = split.changed_at.map(format_timestamp);
    WireSplit {
        user_id: split.user_id.clone(),
        amount: split.amount.to_major(),
        paid: split.paid,
        paid_date: if split.paid { stamp.clone() } else { None },
        state_change_date: stamp,
    }
}

/// Converts a backend entry. The payer's split is forced to paid.
pub fn entry_from_wire(entry: WireEntry) -> Result<Entry> {
    let id = entry
        .id
        .ok_or_else(|| ClientError::Decode("entry without id".to_string()))?;
    let date = parse_date(&entry.date)
        .ok_or_else(|| ClientError::Decode(format!("entry {id}: bad date {}", entry.date)))?;
    let split_type = match entry.split_type.as_deref() {
        Some(code) => code.parse::<SplitType>()?,
        None => SplitType::default(),
    };
    let splits = entry
        .splits
        .into_iter()
        .map(split_from_wire)
        .collect::<Result<Vec<_>>>()?;

    let mut out = Entry {
        total: money(entry.amount, "entry amount")?,
        id,
        title: entry.title,
        date,
        group_id: entry.group_id,
        split_type,
        paid_by: entry.paid_by,
        created_by: entry.user_id_create_entry,
        splits,
    };
    out.normalize_payer();
    Ok(out)
}

/// Full entry body for `PUT /api/entries`.
pub fn entry_to_wire(entry: &Entry) -> WireEntry {
    WireEntry {
        id: Some(entry.id.clone()),
        title: entry.title.clone(),
        date: format_date(entry.date),
        group_id: entry.group_id.clone(),
        amount: entry.total.to_major(),
        split_type: Some(entry.split_type.code().to_string()),
        paid_by: entry.paid_by.clone(),
        user_id_create_entry: entry.created_by.clone(),
        splits: entry.splits.iter().map(split_to_wire).collect(),
        is_settled: Some(engine::settlement(entry).is_settled()),
    }
}

/// Body of `POST /api/entries/with-splits`. The form is validated first so an
/// invalid expense never reaches the backend.
pub fn new_entry_body(
    request: &SplitRequest,
    group_id: &str,
    date: NaiveDate,
) -> Result<EntryWithSplitsNew> {
    let shares = request.compute()?;
    let total = request.validate()?;
    let paid_by = request.paid_by.clone().unwrap_or_default();
    let user_ids: Vec<String> = shares.iter().map(|share| share.user_id.clone()).collect();

    let percentages = (request.split_type == SplitType::Percentage).then(|| {
        user_ids
            .iter()
            .map(|id| {
                request
                    .percentages
                    .get(id)
                    .copied()
                    .unwrap_or_default()
                    .to_f64()
            })
            .collect()
    });
    let amounts = (request.split_type == SplitType::Manual)
        .then(|| shares.iter().map(|share| share.amount.to_major()).collect());

    Ok(EntryWithSplitsNew {
        title: request.title.trim().to_string(),
        date: format_date(date),
        group_id: group_id.to_string(),
        total_amount: total.to_major(),
        split_type: request.split_type.code().to_string(),
        user_ids,
        paid_by,
        auto_mark_payer_as_paid: true,
        percentages,
        amounts,
    })
}

pub fn group_from_wire(group: WireGroup) -> Group {
    let mut member_ids = group.member_ids;
    let owner_id = group.owner_id.unwrap_or_default();
    if !owner_id.is_empty() && !member_ids.contains(&owner_id) {
        member_ids.push(owner_id.clone());
    }
    let mut seen = std::collections::HashSet::new();
    member_ids.retain(|id| seen.insert(id.clone()));

    Group {
        id: group.id,
        name: group.name,
        is_public: group.is_public,
        owner_id,
        member_ids,
    }
}

pub fn member_from_wire(user: UserInfo) -> Member {
    Member {
        id: user.id,
        name: user.name,
        email: user.email,
    }
}

pub fn invite_from_wire(invite: Invite, group: &Group) -> InviteLink {
    InviteLink {
        token: invite.invite_token,
        group_id: group.id.clone(),
        group_name: invite.group_name.unwrap_or_else(|| group.name.clone()),
        expires_at: invite.expiration_date.as_deref().and_then(parse_timestamp),
    }
}
