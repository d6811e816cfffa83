use std::collections::HashMap;

use chrono::Utc;
use chrono_tz::Tz;
use client::{ApiClient, InviteOutcome, LedgerView, accept_invite, invite_error_message};
use engine::{MoneyCents, SplitRequest, SplitType, debts, group_balances, settled_entries};
use tracing::{debug, info};

use crate::{
    cli::{self, Command, EntryCommand, EntryForm, GroupCommand},
    config::AppConfig,
    error::{AppError, Result},
    render,
};

pub struct Context {
    pub api: ApiClient,
    pub config: AppConfig,
    pub tz: Tz,
}

pub async fn run(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Login(args) => login(ctx, &args.credential).await,
        Command::Logout => {
            ctx.api.logout().await?;
            println!("Logged out");
            Ok(())
        }
        Command::Group(group) => run_group(ctx, group.command).await,
        Command::Entry(entry) => run_entry(ctx, entry.command).await,
        Command::Pay(args) => set_paid(ctx, args, true).await,
        Command::Unpay(args) => set_paid(ctx, args, false).await,
        Command::Settle(args) => settle(ctx, args).await,
        Command::Balance(args) => balance(ctx, args).await,
    }
}

async fn login(ctx: &Context, credential: &str) -> Result<()> {
    let response = ctx.api.authenticate(credential).await?;
    match response.user {
        Some(user) => println!("Logged in as {}", user.name),
        None => println!("Logged in"),
    }
    match client::resume_pending_invite(&ctx.api, ctx.api.tokens().as_ref()).await {
        Ok(Some(group)) => println!("Joined {}", group.name),
        Ok(None) => {}
        Err(err) => eprintln!("{}", invite_error_message(&err)),
    }
    Ok(())
}

async fn run_group(ctx: &Context, command: GroupCommand) -> Result<()> {
    let api = &ctx.api;
    match command {
        GroupCommand::List => {
            for group in api.groups().await? {
                println!("{}", render::group_line(&group, None));
            }
        }
        GroupCommand::Show { group } => {
            let group = api.group(&group).await?;
            let me = current_user(api, &group.id).await.ok();
            println!("{}", render::group_line(&group, me.as_deref()));
            for member in api.members(&group.id).await? {
                println!("    {}  {}", member.id, member.display_name());
            }
        }
        GroupCommand::Create(args) => {
            let group = api
                .create_group(&args.name, !args.private, args.password.as_deref())
                .await?;
            println!("Created {}", render::group_line(&group, Some(group.owner_id.as_str())));
        }
        GroupCommand::Search { name } => {
            for group in api.search_groups(&name).await? {
                println!("{}", render::group_line(&group, None));
            }
        }
        GroupCommand::Join { group, password } => {
            api.join_group(&group, password.as_deref()).await?;
            println!("Joined {group}");
        }
        GroupCommand::Leave { group } => {
            api.leave_group(&group).await?;
            println!("Left {group}");
        }
        GroupCommand::Delete { group } => {
            let group = api.group(&group).await?;
            let me = current_user(api, &group.id).await?;
            api.delete_group(&group, &me).await?;
            println!("Deleted {}", group.name);
        }
        GroupCommand::Members { group } => {
            for member in api.members(&group).await? {
                println!("{}  {}", member.id, member.display_name());
            }
        }
        GroupCommand::RemoveMember { group, member } => {
            let group = api.group(&group).await?;
            let me = current_user(api, &group.id).await?;
            api.remove_member(&group, &me, &member).await?;
            println!("Removed {member} from {}", group.name);
        }
        GroupCommand::Password { group, password } => {
            let group = api.group(&group).await?;
            let me = current_user(api, &group.id).await?;
            api.update_password(&group, &me, &password).await?;
            println!("Password updated");
        }
        GroupCommand::Invite { group } => {
            let group = api.group(&group).await?;
            let me = current_user(api, &group.id).await?;
            let invite = api.create_invite(&group, &me).await?;
            for line in render::invite_lines(&invite, &ctx.config.base_url, ctx.tz) {
                println!("{line}");
            }
        }
        GroupCommand::JoinInvite { link } => {
            match accept_invite(api, api.tokens().as_ref(), &link, Utc::now()).await {
                Ok(InviteOutcome::Joined(group)) => println!("Joined {}", group.name),
                Ok(InviteOutcome::LoginRequired) => {
                    println!("Log in to finish joining; the invite was saved")
                }
                Err(err) => return Err(AppError::InvalidArgument(invite_error_message(&err))),
            }
        }
    }
    Ok(())
}

async fn run_entry(ctx: &Context, command: EntryCommand) -> Result<()> {
    let api = &ctx.api;
    match command {
        EntryCommand::List { group, sort } => {
            let mut view = open_view(ctx, &group).await?;
            view.sort(sort);
            let names = member_names(api, &group).await?;
            for entry in view.entries() {
                println!("{}", render::entry_line(entry, &names));
                for line in render::split_lines(entry, &names, ctx.tz) {
                    println!("{line}");
                }
            }
            let summary = settled_entries(view.entries());
            println!("{} of {} entries settled", summary.paid, summary.total);
        }
        EntryCommand::Add { group, form } => {
            let request = split_request(&form)?;
            let entry = api.create_entry(&request, &group, entry_date(&form, ctx.tz)).await?;
            let names = member_names(api, &group).await?;
            println!("Added {}", render::entry_line(&entry, &names));
        }
        EntryCommand::Edit { group, entry, form } => {
            let previous = api
                .entries(&group)
                .await?
                .into_iter()
                .find(|candidate| candidate.id == entry)
                .ok_or(engine::EngineError::KeyNotFound(entry))?;
            let request = split_request(&form)?;
            let date = form.date.unwrap_or(previous.date);
            let updated = api.update_entry(&previous, &request, date).await?;
            let names = member_names(api, &group).await?;
            println!("Updated {}", render::entry_line(&updated, &names));
        }
        EntryCommand::Delete { group, entry } => {
            api.delete_entry(&entry).await?;
            info!(group = %group, entry = %entry, "entry deleted");
            println!("Deleted {entry}");
        }
    }
    Ok(())
}

async fn set_paid(ctx: &Context, args: cli::SplitArgs, paid: bool) -> Result<()> {
    let mut view = open_view(ctx, &args.group).await?;
    view.set_split_paid(&args.entry, &args.user, paid).await?;
    let names = member_names(&ctx.api, &args.group).await?;
    if let Some(entry) = view.entry(&args.entry) {
        println!("{}", render::entry_line(entry, &names));
    }
    if let Some(balance) = view.balance() {
        println!("Your balance: {balance}");
    }
    Ok(())
}

async fn settle(ctx: &Context, args: cli::SettleArgs) -> Result<()> {
    let names = member_names(&ctx.api, &args.group).await?;
    let mut view = open_view(ctx, &args.group)
        .await?
        .with_member_names(names.clone());
    if args.entries.is_empty() {
        view.select_all();
    } else {
        for entry in &args.entries {
            view.toggle_selected(entry)?;
        }
    }

    let report = view.settle_selected(!args.unpay).await?;
    debug!(?report, "batch finished");
    println!("{report}");
    // A clean batch clears the selection; what is left failed at least once.
    for entry_id in view.selected() {
        if let Some(entry) = view.entry(&entry_id) {
            println!("{}", render::entry_line(entry, &names));
        }
    }
    match view.banner() {
        Some(banner) if !report.is_clean() => {
            Err(AppError::InvalidArgument(banner.message.clone()))
        }
        _ => Ok(()),
    }
}

async fn balance(ctx: &Context, args: cli::BalanceArgs) -> Result<()> {
    let api = &ctx.api;
    let members = api.members(&args.group).await?;
    let names: HashMap<String, String> = members
        .iter()
        .map(|member| (member.id.clone(), member.name.clone()))
        .collect();
    let member_ids: Vec<String> = members.into_iter().map(|member| member.id).collect();
    let entries = api.entries(&args.group).await?;

    for balance in group_balances(&entries, &member_ids) {
        println!("{}", render::balance_line(&balance, &names));
    }
    let owed = debts(&entries);
    if !owed.is_empty() {
        println!();
        for debt in &owed {
            println!("{}", render::debt_line(debt, &names));
        }
    }

    println!();
    match args.user {
        Some(user) => {
            let amount = api.user_balance(&args.group, &user).await?;
            println!("Backend balance of {}: {amount}", render::name(&names, &user));
            for split in api.unpaid_splits(&args.group, &user).await? {
                println!("    unpaid {}", split.amount);
            }
        }
        None => {
            let (amount, _) = api.my_balance(&args.group).await?;
            println!("Your balance: {amount}");
        }
    }
    Ok(())
}

async fn open_view(ctx: &Context, group_id: &str) -> Result<LedgerView<ApiClient>> {
    let mut view = LedgerView::new(ctx.api.clone(), group_id)
        .with_batch_limit(ctx.config.batch_concurrency);
    view.open().await?;
    Ok(view)
}

async fn member_names(api: &ApiClient, group_id: &str) -> Result<HashMap<String, String>> {
    Ok(api
        .members(group_id)
        .await?
        .into_iter()
        .map(|member| (member.id, member.name))
        .collect())
}

/// The backend reports the caller's id together with the group balance.
async fn current_user(api: &ApiClient, group_id: &str) -> Result<String> {
    let (_, member) = api.my_balance(group_id).await?;
    member
        .map(|member| member.id)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::InvalidArgument("could not identify the logged-in user".to_string()))
}

fn entry_date(form: &EntryForm, tz: Tz) -> chrono::NaiveDate {
    form.date
        .unwrap_or_else(|| Utc::now().with_timezone(&tz).date_naive())
}

/// Builds the expense form from the command line. Shares must match the
/// split type.
pub fn split_request(form: &EntryForm) -> Result<SplitRequest> {
    let mut request = SplitRequest {
        title: form.title.clone(),
        total: Some(form.total),
        split_type: form.split_type,
        members: form.members.clone(),
        paid_by: Some(form.paid_by.clone()),
        ..SplitRequest::default()
    };
    for (user, value) in &form.shares {
        match form.split_type {
            SplitType::Percentage => {
                let percent = cli::parse_percent(value).map_err(AppError::InvalidArgument)?;
                request.percentages.insert(user.clone(), percent);
            }
            SplitType::Manual => {
                let amount: MoneyCents = value.parse()?;
                request.manual_amounts.insert(user.clone(), amount);
            }
            SplitType::Equal => {
                return Err(AppError::InvalidArgument(
                    "--share is only used by percentage and manual splits".to_string(),
                ));
            }
        }
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use engine::{Percent, SplitError};

    use super::*;

    fn form(split_type: SplitType, shares: &[(&str, &str)]) -> EntryForm {
        EntryForm {
            title: "Hotel".to_string(),
            total: MoneyCents::new(10_000),
            paid_by: "a".to_string(),
            members: vec!["a".to_string(), "b".to_string()],
            split_type,
            shares: shares
                .iter()
                .map(|(user, value)| (user.to_string(), value.to_string()))
                .collect(),
            date: None,
        }
    }

    #[test]
    fn percentage_shares_feed_the_calculator() {
        let request = split_request(&form(SplitType::Percentage, &[("a", "60"), ("b", "41")]))
            .unwrap();
        assert_eq!(request.percentages["b"], Percent::new(4_100));
        assert_eq!(request.validate(), Err(SplitError::PercentageSum(Percent::new(10_100))));
    }

    #[test]
    fn manual_shares_are_parsed_as_amounts() {
        let request =
            split_request(&form(SplitType::Manual, &[("a", "70"), ("b", "30,00")])).unwrap();
        assert_eq!(request.manual_amounts["b"], MoneyCents::new(3_000));
        let shares = request.compute().unwrap();
        assert_eq!(shares.len(), 2);
    }

    #[test]
    fn equal_split_rejects_shares() {
        let err = split_request(&form(SplitType::Equal, &[("a", "50")])).unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }
}
