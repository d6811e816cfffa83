//! JSON types of the expense backend REST contract.
//!
//! Field names follow the backend (camelCase). Amounts are JSON numbers in
//! major units and dates are the strings the backend emits; the client crate
//! converts both into engine types.

use serde::{Deserialize, Serialize};

/// Body of error responses that carry a JSON payload.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorResponse {
    pub fn text(&self) -> Option<&str> {
        self.message.as_deref().or(self.error.as_deref())
    }
}

pub mod user {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct UserInfo {
        pub id: String,
        #[serde(default)]
        pub name: String,
        #[serde(default)]
        pub email: String,
    }
}

pub mod auth {
    use super::*;
    use crate::user::UserInfo;

    /// The identity provider credential exchanged for a session token.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct AuthenticateRequest {
        pub token: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AuthenticateResponse {
        /// Session JWT, sent back as bearer token.
        pub token: String,
        #[serde(default)]
        pub user: Option<UserInfo>,
    }
}

pub mod group {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Group {
        pub id: String,
        pub name: String,
        #[serde(default, alias = "public")]
        pub is_public: bool,
        #[serde(default)]
        pub owner_id: Option<String>,
        /// Member user ids.
        #[serde(default, alias = "members")]
        pub member_ids: Vec<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GroupNew {
        pub name: String,
        pub is_public: bool,
        /// Required for private groups.
        #[serde(skip_serializing_if = "Option::is_none")]
        pub password: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct JoinGroup {
        pub group_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub password: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RemoveMember {
        pub group_id: String,
        pub user_id: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UpdatePassword {
        pub password: String,
    }

    /// Answer of `POST /api/groups/:id/invite`.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Invite {
        pub invite_token: String,
        #[serde(default)]
        pub expiration_date: Option<String>,
        #[serde(default)]
        pub group_name: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct JoinByInvite {
        pub token: String,
    }
}

pub mod split {
    use super::*;

    /// A split as exchanged with the backend.
    ///
    /// The backend knows two settlement flags, `paid` and `isPaid`. A split
    /// reads as paid when either is set and both are written on output.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(from = "SplitWire", into = "SplitWire")]
    pub struct Split {
        pub user_id: String,
        pub amount: f64,
        pub paid: bool,
        pub paid_date: Option<String>,
        pub state_change_date: Option<String>,
    }

    #[derive(Clone, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct SplitWire {
        user_id: String,
        #[serde(default)]
        amount: f64,
        #[serde(default)]
        paid: Option<bool>,
        #[serde(default)]
        is_paid: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        paid_date: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state_change_date: Option<String>,
    }

    impl From<SplitWire> for Split {
        fn from(wire: SplitWire) -> Self {
            Self {
                user_id: wire.user_id,
                amount: wire.amount,
                paid: wire.paid.unwrap_or(false) || wire.is_paid.unwrap_or(false),
                paid_date: wire.paid_date,
                state_change_date: wire.state_change_date,
            }
        }
    }

    impl From<Split> for SplitWire {
        fn from(split: Split) -> Self {
            Self {
                user_id: split.user_id,
                amount: split.amount,
                paid: Some(split.paid),
                is_paid: Some(split.paid),
                paid_date: split.paid_date,
                state_change_date: split.state_change_date,
            }
        }
    }

    /// Body of `POST /api/splits/pay`.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PayRequest {
        pub entry_id: String,
        pub user_id: String,
        pub paid_date: String,
    }

    /// Body of `POST /api/splits/unpay`.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct UnpayRequest {
        pub entry_id: String,
        pub user_id: String,
        pub unpaid_date: String,
    }
}

pub mod entry {
    use super::*;
    use crate::split::Split;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Entry {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub id: Option<String>,
        pub title: String,
        /// `YYYY-MM-DD`, sometimes followed by a time part.
        pub date: String,
        pub group_id: String,
        /// Total in major units. Older payloads name it `totalAmount`.
        #[serde(alias = "totalAmount")]
        pub amount: f64,
        #[serde(default)]
        pub split_type: Option<String>,
        pub paid_by: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub user_id_create_entry: Option<String>,
        #[serde(default)]
        pub splits: Vec<Split>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub is_settled: Option<bool>,
    }

    /// Body of `POST /api/entries/with-splits`; the backend computes the
    /// splits from these inputs.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct EntryWithSplitsNew {
        pub title: String,
        pub date: String,
        pub group_id: String,
        pub total_amount: f64,
        pub split_type: String,
        pub user_ids: Vec<String>,
        pub paid_by: String,
        pub auto_mark_payer_as_paid: bool,
        /// One per user id, PERCENTAGE only.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub percentages: Option<Vec<f64>>,
        /// One per user id, MANUAL only.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub amounts: Option<Vec<f64>>,
    }
}

pub mod balance {
    use super::*;
    use crate::user::UserInfo;

    /// Answer of `GET /api/splits/balance` and `/api/splits/my-balance`.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Balance {
        pub user_id: String,
        pub balance: f64,
        #[serde(default)]
        pub user_info: Option<UserInfo>,
    }
}
