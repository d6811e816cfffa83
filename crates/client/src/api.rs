//! HTTP client of the expense backend.
//!
//! Every call goes through [`ApiClient::send`]: non-2xx answers become
//! [`ClientError::Status`] with the body parsed as JSON when possible and kept
//! as text otherwise. The bearer token is read from the [`TokenStore`] on each
//! request, except for authentication and logout.

use std::{sync::Arc, time::Duration};

use api_types::{
    auth::{AuthenticateRequest, AuthenticateResponse},
    balance::Balance,
    entry::Entry as WireEntry,
    group::{
        Group as WireGroup, GroupNew, Invite, JoinByInvite, JoinGroup, RemoveMember,
        UpdatePassword,
    },
    split::{PayRequest, Split as WireSplit, UnpayRequest},
    user::UserInfo,
};
use chrono::{DateTime, NaiveDate, Utc};
use engine::{
    Entry, Group, InviteLink, Member, MoneyCents, Split, SplitKey, SplitRequest,
    split::splits_for_update, validate_new_group,
};
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::{
    convert,
    error::{ClientError, Result},
    token::TokenStore,
};

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    tokens: Arc<dyn TokenStore>,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        tokens: Arc<dyn TokenStore>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|err| ClientError::InvalidUrl(format!("{base_url}: {err}")))?;
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            base_url,
            tokens,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut req = self.anonymous(method, path);
        if let Some(token) = self.tokens.token() {
            req = req.bearer_auth(token);
        }
        req
    }

    fn anonymous(&self, method: Method, path: &str) -> RequestBuilder {
        debug!(%method, path, "request");
        self.http.request(method, self.url(path))
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response> {
        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let text = resp.text().await.unwrap_or_default();
        let body = if text.trim().is_empty() {
            None
        } else {
            Some(
                serde_json::from_str::<serde_json::Value>(&text)
                    .unwrap_or(serde_json::Value::String(text)),
            )
        };
        warn!(%status, "backend refused request");
        Err(ClientError::Status { status, body })
    }

    async fn json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let resp = self.send(req).await?;
        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|err| ClientError::Decode(err.to_string()))
    }

    /// For endpoints whose answer is ignored; any body (JSON or not) is
    /// accepted.
    async fn unit(&self, req: RequestBuilder) -> Result<()> {
        self.send(req).await?;
        Ok(())
    }

    /// Exchanges the identity provider credential for a session token and
    /// stores it.
    pub async fn authenticate(&self, credential: &str) -> Result<AuthenticateResponse> {
        let req = self
            .anonymous(Method::POST, "/api/authenticate")
            .json(&AuthenticateRequest {
                token: credential.to_string(),
            });
        let resp: AuthenticateResponse = self.json(req).await?;
        self.tokens.set_token(&resp.token)?;
        info!(
            user = resp.user.as_ref().map(|u| u.id.as_str()).unwrap_or("unknown"),
            "authenticated"
        );
        Ok(resp)
    }

    /// Ends the session. The local token is cleared even if the backend call
    /// fails.
    pub async fn logout(&self) -> Result<()> {
        let result = self.unit(self.anonymous(Method::POST, "/app/logout")).await;
        self.tokens.clear_token()?;
        result
    }

    pub async fn groups(&self) -> Result<Vec<Group>> {
        let groups: Vec<WireGroup> = self.json(self.request(Method::GET, "/api/groups/all")).await?;
        Ok(groups.into_iter().map(convert::group_from_wire).collect())
    }

    pub async fn group(&self, group_id: &str) -> Result<Group> {
        let group: WireGroup = self
            .json(self.request(Method::GET, &format!("/api/groups/{group_id}")))
            .await?;
        Ok(convert::group_from_wire(group))
    }

    pub async fn search_groups(&self, name: &str) -> Result<Vec<Group>> {
        let req = self
            .request(Method::GET, "/api/groups/search")
            .query(&[("name", name)]);
        let groups: Vec<WireGroup> = self.json(req).await?;
        Ok(groups.into_iter().map(convert::group_from_wire).collect())
    }

    pub async fn create_group(
        &self,
        name: &str,
        is_public: bool,
        password: Option<&str>,
    ) -> Result<Group> {
        validate_new_group(name, is_public, password)?;
        let req = self.request(Method::POST, "/api/groups").json(&GroupNew {
            name: name.trim().to_string(),
            is_public,
            password: (!is_public).then(|| password.unwrap_or_default().to_string()),
        });
        let group: WireGroup = self.json(req).await?;
        Ok(convert::group_from_wire(group))
    }

    pub async fn join_group(&self, group_id: &str, password: Option<&str>) -> Result<()> {
        let req = self.request(Method::POST, "/api/groups/join").json(&JoinGroup {
            group_id: group_id.to_string(),
            password: password.map(str::to_string),
        });
        self.unit(req).await
    }

    pub async fn leave_group(&self, group_id: &str) -> Result<()> {
        self.unit(self.request(Method::POST, &format!("/api/groups/leave/{group_id}")))
            .await
    }

    pub async fn members(&self, group_id: &str) -> Result<Vec<Member>> {
        let users: Vec<UserInfo> = self
            .json(self.request(Method::GET, &format!("/api/groups/{group_id}/members")))
            .await?;
        Ok(users.into_iter().map(convert::member_from_wire).collect())
    }

    /// Owner only; refused locally for anyone else.
    pub async fn delete_group(&self, group: &Group, actor_id: &str) -> Result<()> {
        group.ensure_owner(actor_id, "delete the group")?;
        self.unit(self.request(Method::DELETE, &format!("/api/groups/{}", group.id)))
            .await
    }

    /// Owner only; the owner cannot be removed.
    pub async fn remove_member(&self, group: &Group, actor_id: &str, member_id: &str) -> Result<()> {
        group.ensure_removable(actor_id, member_id)?;
        let req = self
            .request(Method::POST, "/api/groups/remove-member")
            .json(&RemoveMember {
                group_id: group.id.clone(),
                user_id: member_id.to_string(),
            });
        self.unit(req).await
    }

    /// Owner only.
    pub async fn update_password(&self, group: &Group, actor_id: &str, password: &str) -> Result<()> {
        group.ensure_owner(actor_id, "change the password")?;
        if password.trim().is_empty() {
            return Err(engine::EngineError::InvalidGroup("password is required".to_string()).into());
        }
        let req = self
            .request(Method::PUT, &format!("/api/groups/update-password/{}", group.id))
            .json(&UpdatePassword {
                password: password.to_string(),
            });
        self.unit(req).await
    }

    /// Owner only.
    pub async fn create_invite(&self, group: &Group, actor_id: &str) -> Result<InviteLink> {
        group.ensure_owner(actor_id, "invite members")?;
        let invite: Invite = self
            .json(self.request(Method::POST, &format!("/api/groups/{}/invite", group.id)))
            .await?;
        Ok(convert::invite_from_wire(invite, group))
    }

    pub async fn join_by_invite(&self, token: &str) -> Result<Group> {
        let req = self
            .request(Method::POST, "/api/groups/join-by-invite")
            .json(&JoinByInvite {
                token: token.to_string(),
            });
        let group: WireGroup = self.json(req).await?;
        Ok(convert::group_from_wire(group))
    }

    pub async fn entries(&self, group_id: &str) -> Result<Vec<Entry>> {
        let req = self
            .request(Method::GET, "/api/entries")
            .query(&[("groupId", group_id)]);
        let entries: Vec<WireEntry> = self.json(req).await?;
        entries.into_iter().map(convert::entry_from_wire).collect()
    }

    /// Validates the form, then lets the backend create the entry and its
    /// splits.
    pub async fn create_entry(
        &self,
        request: &SplitRequest,
        group_id: &str,
        date: NaiveDate,
    ) -> Result<Entry> {
        let body = convert::new_entry_body(request, group_id, date)?;
        let req = self
            .request(Method::POST, "/api/entries/with-splits")
            .json(&body);
        let entry: WireEntry = self.json(req).await?;
        convert::entry_from_wire(entry)
    }

    /// Saves an entry whose splits were built by the caller. An empty id
    /// creates a new entry.
    pub async fn save_entry(&self, entry: &Entry) -> Result<Entry> {
        entry.validate()?;
        let mut body = convert::entry_to_wire(entry);
        if entry.id.is_empty() {
            body.id = None;
        }
        let req = self.request(Method::POST, "/api/entries").json(&body);
        let saved: WireEntry = self.json(req).await?;
        convert::entry_from_wire(saved)
    }

    /// Recomputes the splits of an edited entry. Members keep their
    /// settlement state; the payer's split is settled.
    pub async fn update_entry(
        &self,
        previous: &Entry,
        request: &SplitRequest,
        date: NaiveDate,
    ) -> Result<Entry> {
        let shares = request.compute()?;
        let total = request.validate()?;
        let paid_by = request.paid_by.clone().unwrap_or_default();
        let updated = Entry {
            id: previous.id.clone(),
            title: request.title.trim().to_string(),
            date,
            group_id: previous.group_id.clone(),
            total,
            split_type: request.split_type,
            splits: splits_for_update(previous, shares, &paid_by),
            paid_by,
            created_by: previous.created_by.clone(),
        };
        updated.validate()?;
        let req = self
            .request(Method::PUT, "/api/entries")
            .json(&convert::entry_to_wire(&updated));
        let entry: WireEntry = self.json(req).await?;
        convert::entry_from_wire(entry)
    }

    pub async fn delete_entry(&self, entry_id: &str) -> Result<()> {
        self.unit(self.request(Method::DELETE, &format!("/api/entries/{entry_id}")))
            .await
    }

    fn split_paid_request(&self, key: &SplitKey, paid: bool, at: DateTime<Utc>) -> RequestBuilder {
        let stamp = convert::format_timestamp(at);
        if paid {
            self.request(Method::POST, "/api/splits/pay").json(&PayRequest {
                entry_id: key.entry_id.clone(),
                user_id: key.user_id.clone(),
                paid_date: stamp,
            })
        } else {
            self.request(Method::POST, "/api/splits/unpay")
                .json(&UnpayRequest {
                    entry_id: key.entry_id.clone(),
                    user_id: key.user_id.clone(),
                    unpaid_date: stamp,
                })
        }
    }

    /// Marks a split paid or unpaid; returns the entry as saved.
    pub async fn set_split_paid(
        &self,
        key: &SplitKey,
        paid: bool,
        at: DateTime<Utc>,
    ) -> Result<Entry> {
        let entry: WireEntry = self.json(self.split_paid_request(key, paid, at)).await?;
        convert::entry_from_wire(entry)
    }

    /// Marks a split paid or unpaid, checking only the status: any 2xx body
    /// is accepted.
    pub async fn mark_split(&self, key: &SplitKey, paid: bool, at: DateTime<Utc>) -> Result<()> {
        self.unit(self.split_paid_request(key, paid, at)).await
    }

    /// Balance of the logged-in user, with the user info when provided.
    pub async fn my_balance(&self, group_id: &str) -> Result<(MoneyCents, Option<Member>)> {
        let req = self
            .request(Method::GET, "/api/splits/my-balance")
            .query(&[("groupId", group_id)]);
        let balance: Balance = self.json(req).await?;
        let member = balance.user_info.map(convert::member_from_wire).or_else(|| {
            Some(Member {
                id: balance.user_id.clone(),
                name: String::new(),
                email: String::new(),
            })
        });
        Ok((money(balance.balance)?, member))
    }

    pub async fn user_balance(&self, group_id: &str, user_id: &str) -> Result<MoneyCents> {
        let req = self
            .request(Method::GET, "/api/splits/balance")
            .query(&[("groupId", group_id), ("userId", user_id)]);
        let balance: Balance = self.json(req).await?;
        money(balance.balance)
    }

    pub async fn unpaid_splits(&self, group_id: &str, user_id: &str) -> Result<Vec<Split>> {
        let req = self
            .request(Method::GET, "/api/splits/unpaid")
            .query(&[("groupId", group_id), ("userId", user_id)]);
        let splits: Vec<WireSplit> = self.json(req).await?;
        splits.into_iter().map(convert::split_from_wire).collect()
    }
}

fn money(value: f64) -> Result<MoneyCents> {
    MoneyCents::from_major(value).map_err(|err| ClientError::Decode(err.to_string()))
}
