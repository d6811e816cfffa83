//! Joining a group through an invite link.
//!
//! Without a valid session the invite token is parked in the token store and
//! redeemed after the next successful login.

use chrono::{DateTime, Utc};
use engine::Group;
use reqwest::Url;
use tracing::{info, warn};

use crate::{
    backend::InviteBackend,
    error::{ClientError, ErrorKind, Result},
    token::TokenStore,
};

#[derive(Clone, Debug, PartialEq)]
pub enum InviteOutcome {
    Joined(Group),
    /// The token was parked; log in to finish joining.
    LoginRequired,
}

/// Token of an invite given either as a full link (`…/join?token=abc`) or as
/// the bare token.
pub fn parse_invite_token(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    match Url::parse(input) {
        Ok(url) => url
            .query_pairs()
            .find(|(key, _)| key == "token")
            .map(|(_, value)| value.into_owned())
            .filter(|token| !token.is_empty()),
        Err(_) => Some(input.to_string()),
    }
}

pub async fn accept_invite<B: InviteBackend>(
    backend: &B,
    tokens: &dyn TokenStore,
    input: &str,
    now: DateTime<Utc>,
) -> Result<InviteOutcome> {
    let token = parse_invite_token(input).ok_or_else(|| {
        ClientError::InvalidUrl("Invalid invite link - no token provided".to_string())
    })?;

    if !tokens.is_authenticated(now) {
        tokens.park_invite(&token)?;
        info!("invite parked until login");
        return Ok(InviteOutcome::LoginRequired);
    }

    match backend.redeem_invite(&token).await {
        Ok(group) => {
            tokens.take_invite()?;
            info!(group = %group.id, "joined group by invite");
            Ok(InviteOutcome::Joined(group))
        }
        Err(err) if err.kind() == ErrorKind::Unauthorized => {
            tokens.park_invite(&token)?;
            Ok(InviteOutcome::LoginRequired)
        }
        Err(err) => Err(err),
    }
}

/// Redeems the parked invite, if any. Called right after authentication.
pub async fn resume_pending_invite<B: InviteBackend>(
    backend: &B,
    tokens: &dyn TokenStore,
) -> Result<Option<Group>> {
    let Some(token) = tokens.take_invite()? else {
        return Ok(None);
    };
    match backend.redeem_invite(&token).await {
        Ok(group) => Ok(Some(group)),
        Err(err) => {
            if err.kind() == ErrorKind::Unauthorized {
                tokens.park_invite(&token)?;
            }
            warn!("pending invite failed: {err}");
            Err(err)
        }
    }
}

/// Message shown when redeeming an invite fails.
pub fn invite_error_message(err: &ClientError) -> String {
    match err.kind() {
        ErrorKind::NotFound => "Invite link is invalid or has expired".to_string(),
        ErrorKind::BadRequest => "You are already a member of this group".to_string(),
        _ => err
            .server_message()
            .unwrap_or_else(|| "Failed to join group".to_string()),
    }
}
