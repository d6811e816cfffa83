//! State of one open ledger view (a group's entry list).
//!
//! The view owns its entry cache and mutates it through `&mut self` only
//! between suspension points. Single toggles and batch settlement share one
//! strategy: apply locally, send, then reconcile each split with its outcome.
//! A batch also refetches the entries afterwards.

use std::{
    collections::{BTreeSet, HashMap},
    future::Future,
    sync::Arc,
    time::Duration,
};

use chrono::Utc;
use engine::{
    BatchReport, Completion, Entry, MemberBalance, MoneyCents, Optimistic, PendingToggle,
    SortOrder, SplitKey, batch, member_balance, sort_entries,
};
use futures::future::join_all;
use tokio::{
    sync::{Semaphore, watch},
    time::Instant,
};
use tracing::{debug, info, warn};

use crate::{
    backend::LedgerBackend,
    error::{ClientError, Result},
};

/// How long a failed toggle stays on screen.
pub const TOGGLE_BANNER_TTL: Duration = Duration::from_secs(5);
/// How long a batch failure stays on screen.
pub const BATCH_BANNER_TTL: Duration = Duration::from_secs(8);

/// A transient error message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Banner {
    pub message: String,
    pub expires_at: Instant,
}

impl Banner {
    pub fn new(message: impl Into<String>, ttl: Duration) -> Self {
        Self {
            message: message.into(),
            expires_at: Instant::now() + ttl,
        }
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Cancels the requests of a view when it is closed.
#[derive(Clone, Debug)]
pub struct Cancellation {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for Cancellation {
    fn default() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }
}

impl Cancellation {
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Runs `fut` unless the view is closed first.
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let mut closed = self.sender.subscribe();
        if *closed.borrow_and_update() {
            return Err(ClientError::Cancelled);
        }
        tokio::select! {
            res = fut => res,
            _ = closed.wait_for(|closed| *closed) => Err(ClientError::Cancelled),
        }
    }
}

pub struct LedgerView<B> {
    backend: B,
    group_id: String,
    entries: Vec<Entry>,
    names: HashMap<String, String>,
    optimistic: Optimistic,
    selection: BTreeSet<String>,
    multi_select: bool,
    banner: Option<Banner>,
    balance: Option<MoneyCents>,
    batch_limit: Option<usize>,
    cancel: Cancellation,
}

impl<B: LedgerBackend> LedgerView<B> {
    pub fn new(backend: B, group_id: impl Into<String>) -> Self {
        Self {
            backend,
            group_id: group_id.into(),
            entries: Vec::new(),
            names: HashMap::new(),
            optimistic: Optimistic::new(),
            selection: BTreeSet::new(),
            multi_select: false,
            banner: None,
            balance: None,
            batch_limit: None,
            cancel: Cancellation::default(),
        }
    }

    /// Caps the number of batch requests in flight. `None` sends all at once.
    #[must_use]
    pub fn with_batch_limit(mut self, limit: Option<usize>) -> Self {
        self.batch_limit = limit.map(|limit| limit.max(1));
        self
    }

    /// Display names used in banners, keyed by user id.
    #[must_use]
    pub fn with_member_names<I>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.names = names.into_iter().collect();
        self
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entry(&self, entry_id: &str) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.id == entry_id)
    }

    /// Balance last reported by the backend.
    pub fn balance(&self) -> Option<MoneyCents> {
        self.balance
    }

    /// Balance of `user_id` computed from the cached entries.
    pub fn local_balance(&self, user_id: &str) -> MemberBalance {
        member_balance(&self.entries, user_id)
    }

    /// The current banner, hidden once expired.
    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref().filter(|banner| !banner.is_expired())
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    pub fn cancellation(&self) -> Cancellation {
        self.cancel.clone()
    }

    pub fn sort(&mut self, order: SortOrder) {
        sort_entries(&mut self.entries, order);
    }

    /// Loads entries and balance.
    pub async fn open(&mut self) -> Result<()> {
        self.refresh().await?;
        if let Err(err) = self.refresh_balance().await {
            warn!(group = %self.group_id, "balance unavailable: {err}");
        }
        Ok(())
    }

    /// Closes the view: requests in flight are cancelled and their results
    /// dropped.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Replaces the cache with the backend's entries.
    pub async fn refresh(&mut self) -> Result<()> {
        let mut entries = self
            .cancel
            .run(self.backend.fetch_entries(&self.group_id))
            .await?;
        for entry in &mut entries {
            entry.normalize_payer();
        }
        debug!(group = %self.group_id, count = entries.len(), "entries loaded");
        self.entries = entries;
        self.optimistic.clear();
        let entries = &self.entries;
        self.selection
            .retain(|id| entries.iter().any(|entry| &entry.id == id));
        Ok(())
    }

    pub async fn refresh_balance(&mut self) -> Result<MoneyCents> {
        let balance = self
            .cancel
            .run(self.backend.fetch_balance(&self.group_id))
            .await?;
        self.balance = Some(balance);
        Ok(balance)
    }

    pub fn is_multi_select(&self) -> bool {
        self.multi_select
    }

    /// Leaving multi-select mode clears the selection.
    pub fn set_multi_select(&mut self, on: bool) {
        self.multi_select = on;
        if !on {
            self.selection.clear();
        }
    }

    /// Toggles the selection of an entry; turns multi-select on.
    pub fn toggle_selected(&mut self, entry_id: &str) -> Result<bool> {
        if self.entry(entry_id).is_none() {
            return Err(engine::EngineError::KeyNotFound(entry_id.to_string()).into());
        }
        self.multi_select = true;
        if self.selection.remove(entry_id) {
            return Ok(false);
        }
        self.selection.insert(entry_id.to_string());
        Ok(true)
    }

    pub fn select_all(&mut self) {
        self.multi_select = true;
        self.selection = self.entries.iter().map(|entry| entry.id.clone()).collect();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn selected(&self) -> Vec<String> {
        self.selection.iter().cloned().collect()
    }

    /// First half of a toggle: the new state is visible right away. `None`
    /// for the payer's split, which never changes.
    pub fn begin_toggle(
        &mut self,
        entry_id: &str,
        user_id: &str,
        paid: bool,
    ) -> Result<Option<PendingToggle>> {
        let key = SplitKey::new(entry_id, user_id);
        Ok(self
            .optimistic
            .begin(&mut self.entries, key, paid, Utc::now())?)
    }

    pub async fn send_toggle(&self, ticket: &PendingToggle) -> Result<()> {
        self.cancel
            .run(
                self.backend
                    .send_split_paid(&ticket.key, ticket.paid, ticket.changed_at),
            )
            .await
    }

    /// Second half of a toggle. A failure rolls the split back and shows a
    /// banner.
    pub fn finish_toggle(&mut self, ticket: PendingToggle, outcome: &Result<()>) -> Completion {
        let key = ticket.key.clone();
        let completion = self
            .optimistic
            .complete(&mut self.entries, ticket, outcome.is_ok());
        if let Err(err) = outcome {
            warn!(entry = %key.entry_id, user = %key.user_id, ?completion, "split update failed: {err}");
            self.banner = Some(Banner::new(
                format!("Failed to update payment status: {}", err.user_message()),
                TOGGLE_BANNER_TTL,
            ));
        }
        completion
    }

    /// Marks one split paid or unpaid.
    ///
    /// The change is applied before the request and rolled back if it fails.
    /// Toggling the payer's split does nothing and sends nothing.
    pub async fn set_split_paid(&mut self, entry_id: &str, user_id: &str, paid: bool) -> Result<()> {
        let Some(ticket) = self.begin_toggle(entry_id, user_id, paid)? else {
            debug!(entry = entry_id, user = user_id, "payer split left unchanged");
            return Ok(());
        };

        let outcome = self.send_toggle(&ticket).await;
        if matches!(outcome, Err(ClientError::Cancelled)) {
            return Err(ClientError::Cancelled);
        }
        self.finish_toggle(ticket, &outcome);
        outcome?;

        if let Err(err) = self.refresh_balance().await {
            warn!(group = %self.group_id, "balance refresh failed: {err}");
        }
        Ok(())
    }

    /// Marks every non-payer split of the selected entries.
    ///
    /// All requests are awaited whatever their outcome, then the entries are
    /// refetched. Without failures the selection is cleared and multi-select
    /// ends; otherwise both stay and a banner names the first failures.
    pub async fn settle_selected(&mut self, paid: bool) -> Result<BatchReport> {
        let targets = batch::plan(&self.entries, &self.selected());
        let now = Utc::now();
        let mut tickets = Vec::with_capacity(targets.len());
        for key in targets {
            if let Some(ticket) = self.optimistic.begin(&mut self.entries, key, paid, now)? {
                tickets.push(ticket);
            }
        }
        info!(group = %self.group_id, splits = tickets.len(), paid, "batch settlement");

        let results = {
            let backend = &self.backend;
            let cancel = &self.cancel;
            let semaphore = self.batch_limit.map(Semaphore::new);
            let semaphore = semaphore.as_ref();
            let calls = tickets.iter().map(|ticket| async move {
                let _permit = match semaphore {
                    Some(semaphore) => semaphore.acquire().await.ok(),
                    None => None,
                };
                cancel
                    .run(backend.send_split_paid(&ticket.key, ticket.paid, ticket.changed_at))
                    .await
            });
            join_all(calls).await
        };
        if results
            .iter()
            .any(|result| matches!(result, Err(ClientError::Cancelled)))
        {
            return Err(ClientError::Cancelled);
        }

        let mut outcomes = Vec::with_capacity(tickets.len());
        for (ticket, result) in tickets.into_iter().zip(results) {
            let key = ticket.key.clone();
            let ok = result.is_ok();
            if let Err(err) = &result {
                warn!(entry = %key.entry_id, user = %key.user_id, "batch item failed: {err}");
            }
            self.optimistic.complete(&mut self.entries, ticket, ok);
            outcomes.push((key, ok));
        }
        let report = BatchReport::tally(outcomes);

        if let Err(err) = self.refresh().await {
            warn!(group = %self.group_id, "refetch after batch failed: {err}");
            if matches!(err, ClientError::Cancelled) {
                return Err(err);
            }
        }
        if let Err(err) = self.refresh_balance().await {
            warn!(group = %self.group_id, "balance refresh failed: {err}");
        }

        match report.failure_summary(|key| self.describe(key)) {
            None => {
                self.set_multi_select(false);
            }
            Some(message) => {
                self.banner = Some(Banner::new(message, BATCH_BANNER_TTL));
            }
        }
        Ok(report)
    }

    /// "Entry title (member name)" for banners.
    fn describe(&self, key: &SplitKey) -> String {
        let title = self
            .entry(&key.entry_id)
            .map(|entry| entry.title.as_str())
            .unwrap_or(key.entry_id.as_str());
        let name = self
            .names
            .get(&key.user_id)
            .map(String::as_str)
            .unwrap_or(key.user_id.as_str());
        format!("{title} ({name})")
    }
}
