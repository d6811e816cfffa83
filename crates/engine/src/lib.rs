//! Pure domain of the shared ledger.
//!
//! Nothing here performs I/O: the client crate feeds entries in and applies
//! what comes out. Amounts are integer cents ([`MoneyCents`]) and percentages
//! integer hundredths ([`Percent`]).

pub use balance::{
    Debt, MemberBalance, OutstandingSplit, Settlement, debts, group_balances, member_balance,
    settled_entries, settlement,
};
pub use batch::BatchReport;
pub use error::{EngineError, SplitError};
pub use model::{Entry, Group, InviteLink, Member, Split, SplitType, validate_new_group};
pub use money::{MoneyCents, TOLERANCE};
pub use optimistic::{Completion, Optimistic, PendingToggle, SplitKey};
pub use percent::Percent;
pub use sort::{SortOrder, sort_entries};
pub use split::{SplitRequest, SplitShare};

pub mod balance;
pub mod batch;
mod decimal;
mod error;
mod model;
mod money;
pub mod optimistic;
mod percent;
pub mod sort;
pub mod split;

pub type ResultEngine<T> = Result<T, EngineError>;
