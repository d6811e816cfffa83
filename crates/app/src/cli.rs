use clap::{Args, Parser, Subcommand};
use engine::{MoneyCents, Percent, SortOrder, SplitType};

#[derive(Parser, Debug)]
#[command(name = "dividi")]
#[command(about = "Share expenses within a group and settle who owes whom")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Configuration file, `config/dividi.toml` when omitted.
    #[arg(long, global = true)]
    pub config: Option<String>,
    /// Backend base URL.
    #[arg(long, global = true)]
    pub base_url: Option<String>,
    #[arg(long, global = true)]
    pub level: Option<String>,
    /// IANA timezone used to show timestamps.
    #[arg(long, global = true)]
    pub timezone: Option<String>,
    /// Maximum batch requests in flight.
    #[arg(long, global = true)]
    pub batch_concurrency: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Exchange an identity provider credential for a session.
    Login(LoginArgs),
    Logout,
    Group(Group),
    Entry(Entry),
    /// Mark one split as paid.
    Pay(SplitArgs),
    /// Mark one split as unpaid.
    Unpay(SplitArgs),
    /// Mark every split of the chosen entries at once.
    Settle(SettleArgs),
    /// Balances and debts of a group.
    Balance(BalanceArgs),
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    #[arg(long, env = "DIVIDI_CREDENTIAL")]
    pub credential: String,
}

#[derive(Args, Debug)]
pub struct Group {
    #[command(subcommand)]
    pub command: GroupCommand,
}

#[derive(Subcommand, Debug)]
pub enum GroupCommand {
    List,
    Show { group: String },
    Create(GroupCreateArgs),
    Search { name: String },
    Join {
        group: String,
        #[arg(long)]
        password: Option<String>,
    },
    Leave { group: String },
    Delete { group: String },
    Members { group: String },
    RemoveMember { group: String, member: String },
    Password {
        group: String,
        #[arg(long)]
        password: String,
    },
    /// Create a shareable invite link.
    Invite { group: String },
    /// Join through an invite link or its bare token.
    JoinInvite { link: String },
}

#[derive(Args, Debug)]
pub struct GroupCreateArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub private: bool,
    #[arg(long)]
    pub password: Option<String>,
}

#[derive(Args, Debug)]
pub struct Entry {
    #[command(subcommand)]
    pub command: EntryCommand,
}

#[derive(Subcommand, Debug)]
pub enum EntryCommand {
    List {
        group: String,
        #[arg(long, default_value_t = SortOrder::default(), value_parser = parse_sort)]
        sort: SortOrder,
    },
    Add {
        group: String,
        #[command(flatten)]
        form: EntryForm,
    },
    Edit {
        group: String,
        entry: String,
        #[command(flatten)]
        form: EntryForm,
    },
    Delete { group: String, entry: String },
}

/// The expense form. Shares are `user=value`: a percentage for
/// `percentage` splits, an amount for `manual` ones.
#[derive(Args, Debug, Clone)]
pub struct EntryForm {
    #[arg(long)]
    pub title: String,
    #[arg(long, value_parser = parse_money)]
    pub total: MoneyCents,
    #[arg(long)]
    pub paid_by: String,
    /// Members sharing the expense, comma separated.
    #[arg(long, value_delimiter = ',', required = true)]
    pub members: Vec<String>,
    #[arg(long = "split", default_value = "equal", value_parser = parse_split_type)]
    pub split_type: SplitType,
    #[arg(long = "share", value_parser = parse_share)]
    pub shares: Vec<(String, String)>,
    /// `YYYY-MM-DD`, today when omitted.
    #[arg(long)]
    pub date: Option<chrono::NaiveDate>,
}

#[derive(Args, Debug)]
pub struct SplitArgs {
    pub group: String,
    pub entry: String,
    pub user: String,
}

#[derive(Args, Debug)]
pub struct SettleArgs {
    pub group: String,
    /// Entries to settle; all of them when omitted.
    pub entries: Vec<String>,
    /// Mark the splits unpaid instead.
    #[arg(long)]
    pub unpay: bool,
}

#[derive(Args, Debug)]
pub struct BalanceArgs {
    pub group: String,
    /// Ask the backend for this member's balance.
    #[arg(long)]
    pub user: Option<String>,
}

fn parse_sort(raw: &str) -> Result<SortOrder, String> {
    raw.parse().map_err(|err: engine::EngineError| err.to_string())
}

fn parse_money(raw: &str) -> Result<MoneyCents, String> {
    raw.parse().map_err(|err: engine::EngineError| err.to_string())
}

fn parse_split_type(raw: &str) -> Result<SplitType, String> {
    raw.parse().map_err(|err: engine::EngineError| err.to_string())
}

pub fn parse_share(raw: &str) -> Result<(String, String), String> {
    let (user, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected user=value, got {raw}"))?;
    let user = user.trim();
    if user.is_empty() {
        return Err(format!("missing user in {raw}"));
    }
    Ok((user.to_string(), value.trim().to_string()))
}

/// Same decimal rules as amounts: at most two decimals.
pub fn parse_percent(raw: &str) -> Result<Percent, String> {
    raw.parse().map_err(|err: engine::EngineError| err.to_string())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn add_entry_with_percentage_shares() {
        let cli = Cli::try_parse_from([
            "dividi",
            "entry",
            "add",
            "trip",
            "--title",
            "Hotel",
            "--total",
            "200",
            "--paid-by",
            "a",
            "--members",
            "a,b",
            "--split",
            "percentage",
            "--share",
            "a=60",
            "--share",
            "b=40%",
        ])
        .unwrap();

        let Command::Entry(Entry {
            command: EntryCommand::Add { group, form },
        }) = cli.command
        else {
            panic!("expected entry add");
        };
        assert_eq!(group, "trip");
        assert_eq!(form.total, MoneyCents::new(20_000));
        assert_eq!(form.members, vec!["a", "b"]);
        assert_eq!(form.split_type, SplitType::Percentage);
        assert_eq!(
            form.shares,
            vec![
                ("a".to_string(), "60".to_string()),
                ("b".to_string(), "40%".to_string())
            ]
        );
    }

    #[test]
    fn global_flags_after_the_subcommand() {
        let cli = Cli::try_parse_from([
            "dividi",
            "settle",
            "trip",
            "e1",
            "e2",
            "--batch-concurrency",
            "2",
        ])
        .unwrap();
        assert_eq!(cli.global.batch_concurrency, Some(2));
        let Command::Settle(args) = cli.command else {
            panic!("expected settle");
        };
        assert_eq!(args.entries, vec!["e1", "e2"]);
        assert!(!args.unpay);
    }

    #[test]
    fn list_accepts_short_sort_names() {
        let cli = Cli::try_parse_from(["dividi", "entry", "list", "trip", "--sort", "amount"])
            .unwrap();
        let Command::Entry(Entry {
            command: EntryCommand::List { sort, .. },
        }) = cli.command
        else {
            panic!("expected entry list");
        };
        assert_eq!(sort, SortOrder::AmountDesc);
    }

    #[test]
    fn malformed_share_is_rejected() {
        assert!(parse_share("60").is_err());
        assert!(parse_share("=60").is_err());
        assert_eq!(
            parse_share(" b = 12,50 ").unwrap(),
            ("b".to_string(), "12,50".to_string())
        );
        assert_eq!(parse_percent("33,34%").unwrap(), Percent::new(3_334));
    }

    #[test]
    fn percentages_reject_a_third_decimal_like_amounts() {
        assert!(parse_percent("33.335").is_err());
        assert!(parse_money("33.335").is_err());
        assert_eq!(parse_percent(" 12.5 ").unwrap(), Percent::new(1_250));
    }
}
