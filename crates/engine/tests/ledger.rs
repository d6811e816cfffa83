use std::collections::HashMap;

use chrono::{NaiveDate, Utc};

use engine::{
    BatchReport, Completion, Entry, MoneyCents, Optimistic, Percent, SplitError, SplitKey,
    SplitRequest, SplitType, batch, member_balance, settlement,
    split::{request_from_entry, splits_for_new_entry, splits_for_update},
};

fn members(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

fn new_entry(id: &str, request: &SplitRequest) -> Entry {
    let shares = request.compute().unwrap();
    let paid_by = request.paid_by.clone().unwrap();
    Entry {
        id: id.to_string(),
        title: request.title.clone(),
        date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        group_id: "trip".to_string(),
        total: request.total.unwrap(),
        split_type: request.split_type,
        splits: splits_for_new_entry(shares, &paid_by, Utc::now()),
        paid_by,
        created_by: Some("a".to_string()),
    }
}

#[test]
fn equal_expense_of_ninety_paid_by_a() {
    let request = SplitRequest {
        title: "Groceries".to_string(),
        total: Some("90".parse().unwrap()),
        split_type: SplitType::Equal,
        members: members(&["a", "b", "c"]),
        paid_by: Some("a".to_string()),
        ..SplitRequest::default()
    };
    let entry = new_entry("e1", &request);
    let amounts: Vec<String> = entry.splits.iter().map(|s| s.amount.to_string()).collect();
    assert_eq!(amounts, vec!["$30.00", "$30.00", "$30.00"]);

    let entries = vec![entry];
    assert_eq!(member_balance(&entries, "a").balance, MoneyCents::new(6_000));
    assert_eq!(member_balance(&entries, "b").balance, MoneyCents::new(-3_000));
    assert_eq!(member_balance(&entries, "c").balance, MoneyCents::new(-3_000));
    assert_eq!(settlement(&entries[0]).to_string(), "1 of 3 splits paid");
}

#[test]
fn percentage_expense_must_add_up() {
    let mut percentages = HashMap::new();
    percentages.insert("a".to_string(), Percent::new(6_000));
    percentages.insert("b".to_string(), Percent::new(4_000));
    let mut request = SplitRequest {
        title: "Hotel".to_string(),
        total: Some(MoneyCents::new(10_000)),
        split_type: SplitType::Percentage,
        members: members(&["a", "b"]),
        paid_by: Some("b".to_string()),
        percentages,
        ..SplitRequest::default()
    };
    let shares = request.compute().unwrap();
    assert_eq!(shares[0].amount, MoneyCents::new(6_000));
    assert_eq!(shares[1].amount, MoneyCents::new(4_000));

    request
        .percentages
        .insert("b".to_string(), "41".parse().unwrap());
    let err = request.compute().unwrap_err();
    assert!(matches!(err, SplitError::PercentageSum(_)));
    assert_eq!(
        err.to_string(),
        "Percentages must add up to 100%. Current total: 101.00%"
    );
}

#[test]
fn toggling_then_editing_keeps_settlement() {
    let request = SplitRequest {
        title: "Taxi".to_string(),
        total: Some(MoneyCents::new(3_000)),
        members: members(&["a", "b", "c"]),
        paid_by: Some("a".to_string()),
        ..SplitRequest::default()
    };
    let mut entries = vec![new_entry("e1", &request)];
    let mut optimistic = Optimistic::new();
    let ticket = optimistic
        .begin(&mut entries, SplitKey::new("e1", "b"), true, Utc::now())
        .unwrap()
        .unwrap();
    assert_eq!(
        optimistic.complete(&mut entries, ticket, true),
        Completion::Confirmed
    );

    let mut edit = request_from_entry(&entries[0]);
    edit.total = Some(MoneyCents::new(4_500));
    edit.split_type = SplitType::Equal;
    let shares = edit.compute().unwrap();
    let splits = splits_for_update(&entries[0], shares, "a");
    assert!(splits.iter().all(|s| s.amount == MoneyCents::new(1_500)));
    assert!(splits[0].paid && splits[1].paid && !splits[2].paid);
}

#[test]
fn batch_over_two_entries() {
    let first = SplitRequest {
        title: "Lunch".to_string(),
        total: Some(MoneyCents::new(2_000)),
        members: members(&["a", "b"]),
        paid_by: Some("a".to_string()),
        ..SplitRequest::default()
    };
    let second = SplitRequest {
        title: "Fuel".to_string(),
        total: Some(MoneyCents::new(3_000)),
        members: members(&["a", "b", "c"]),
        paid_by: Some("c".to_string()),
        ..SplitRequest::default()
    };
    let entries = vec![new_entry("e1", &first), new_entry("e2", &second)];
    let targets = batch::plan(&entries, &members(&["e1", "e2"]));
    assert_eq!(targets.len(), 3);

    let report = BatchReport::tally(
        targets
            .into_iter()
            .map(|key| (key.clone(), key.user_id != "b")),
    );
    assert_eq!(report.succeeded, 1);
    assert_eq!(
        report.failure_summary(|k| format!("{} ({})", k.entry_id, k.user_id)),
        Some("Failed to update 2 of 3 splits: e1 (b), e2 (b)".to_string())
    );
}
