//! The seam between view state and the network.

use std::{future::Future, sync::Arc};

use chrono::{DateTime, Utc};
use engine::{Entry, Group, MoneyCents, SplitKey};

use crate::{api::ApiClient, error::Result};

/// Calls a ledger view needs. Implemented by [`ApiClient`] and by in-process
/// fakes in tests.
pub trait LedgerBackend {
    fn fetch_entries(&self, group_id: &str) -> impl Future<Output = Result<Vec<Entry>>> + Send;

    fn send_split_paid(
        &self,
        key: &SplitKey,
        paid: bool,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Balance of the logged-in user in the group.
    fn fetch_balance(&self, group_id: &str) -> impl Future<Output = Result<MoneyCents>> + Send;
}

/// Redeems invite tokens.
pub trait InviteBackend {
    fn redeem_invite(&self, token: &str) -> impl Future<Output = Result<Group>> + Send;
}

impl LedgerBackend for ApiClient {
    async fn fetch_entries(&self, group_id: &str) -> Result<Vec<Entry>> {
        self.entries(group_id).await
    }

    async fn send_split_paid(&self, key: &SplitKey, paid: bool, at: DateTime<Utc>) -> Result<()> {
        self.mark_split(key, paid, at).await
    }

    async fn fetch_balance(&self, group_id: &str) -> Result<MoneyCents> {
        self.my_balance(group_id).await.map(|(balance, _)| balance)
    }
}

impl InviteBackend for ApiClient {
    async fn redeem_invite(&self, token: &str) -> Result<Group> {
        self.join_by_invite(token).await
    }
}

impl<T: LedgerBackend + Send + Sync> LedgerBackend for Arc<T> {
    fn fetch_entries(&self, group_id: &str) -> impl Future<Output = Result<Vec<Entry>>> + Send {
        (**self).fetch_entries(group_id)
    }

    fn send_split_paid(
        &self,
        key: &SplitKey,
        paid: bool,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<()>> + Send {
        (**self).send_split_paid(key, paid, at)
    }

    fn fetch_balance(&self, group_id: &str) -> impl Future<Output = Result<MoneyCents>> + Send {
        (**self).fetch_balance(group_id)
    }
}

impl<T: InviteBackend + Send + Sync> InviteBackend for Arc<T> {
    fn redeem_invite(&self, token: &str) -> impl Future<Output = Result<Group>> + Send {
        (**self).redeem_invite(token)
    }
}
