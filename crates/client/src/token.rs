//! Session token storage.
//!
//! Two values are kept: the session JWT sent as bearer token and an invite
//! token parked while the user is not logged in.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTokens {
    #[serde(default)]
    pub jwt_token: Option<String>,
    #[serde(default)]
    pub pending_invite_token: Option<String>,
}

pub trait TokenStore: Send + Sync {
    fn load(&self) -> StoredTokens;

    fn update(&self, f: &mut dyn FnMut(&mut StoredTokens)) -> Result<()>;

    fn token(&self) -> Option<String> {
        self.load().jwt_token
    }

    fn set_token(&self, token: &str) -> Result<()> {
        self.update(&mut |tokens| tokens.jwt_token = Some(token.to_string()))
    }

    fn clear_token(&self) -> Result<()> {
        self.update(&mut |tokens| tokens.jwt_token = None)
    }

    fn pending_invite(&self) -> Option<String> {
        self.load().pending_invite_token
    }

    fn park_invite(&self, token: &str) -> Result<()> {
        self.update(&mut |tokens| tokens.pending_invite_token = Some(token.to_string()))
    }

    fn take_invite(&self) -> Result<Option<String>> {
        let mut taken = None;
        self.update(&mut |tokens| taken = tokens.pending_invite_token.take())?;
        Ok(taken)
    }

    /// A session exists and, when its expiry is readable, is not expired.
    fn is_authenticated(&self, now: DateTime<Utc>) -> bool {
        self.token()
            .is_some_and(|token| jwt_expiry(&token).is_none_or(|exp| exp > now))
    }
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    inner: Mutex<StoredTokens>,
}

impl MemoryTokenStore {
    pub fn new(tokens: StoredTokens) -> Self {
        Self {
            inner: Mutex::new(tokens),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> StoredTokens {
        self.inner
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn update(&self, f: &mut dyn FnMut(&mut StoredTokens)) -> Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| ClientError::Storage("token store poisoned".to_string()))?;
        f(&mut guard);
        Ok(())
    }
}

/// Tokens persisted as JSON. Every update is written through.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    inner: Mutex<StoredTokens>,
}

impl FileTokenStore {
    /// Opens the store at `path`; a missing or unreadable file starts empty.
    pub fn load_or_empty(path: PathBuf) -> Self {
        let tokens = read_json_file(&path).unwrap_or_default();
        Self {
            path,
            inner: Mutex::new(tokens),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> StoredTokens {
        self.inner
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn update(&self, f: &mut dyn FnMut(&mut StoredTokens)) -> Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| ClientError::Storage("token store poisoned".to_string()))?;
        f(&mut guard);
        write_json_file(&self.path, &guard)
            .map_err(|err| ClientError::Storage(format!("token save failed: {err}")))
    }
}

fn read_json_file(path: &Path) -> Option<StoredTokens> {
    let raw = fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}

fn write_json_file(path: &Path, tokens: &StoredTokens) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(tokens)
        .map_err(|_| std::io::Error::other("serialize failed"))?;

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json)?;
    match fs::rename(&tmp, path) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(&tmp, path)?;
            let _ = fs::remove_file(&tmp);
            Ok(())
        }
    }
}

#[derive(Deserialize)]
struct Claims {
    exp: Option<i64>,
}

/// Expiry of a JWT, read from its `exp` claim without verifying the
/// signature. `None` when the token is not a readable JWT or has no `exp`.
pub fn jwt_expiry(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    let raw = base64::prelude::BASE64_URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: Claims = serde_json::from_slice(&raw).ok()?;
    DateTime::from_timestamp(claims.exp?, 0)
}

#[cfg(test)]
mod tests {
    use base64::Engine;
    use chrono::TimeZone;

    use super::*;

    fn jwt(exp: i64) -> String {
        let encode = |value: &str| base64::prelude::BASE64_URL_SAFE_NO_PAD.encode(value);
        format!(
            "{}.{}.signature",
            encode(r#"{"alg":"HS256"}"#),
            encode(&format!(r#"{{"sub":"u1","exp":{exp}}}"#))
        )
    }

    #[test]
    fn reads_expiry_claim() {
        let exp = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(jwt_expiry(&jwt(exp.timestamp())), Some(exp));
        assert_eq!(jwt_expiry("not-a-jwt"), None);
    }

    #[test]
    fn expired_session_is_not_authenticated() {
        let store = MemoryTokenStore::default();
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        assert!(!store.is_authenticated(now));

        store.set_token(&jwt(now.timestamp() - 60)).unwrap();
        assert!(!store.is_authenticated(now));

        store.set_token(&jwt(now.timestamp() + 60)).unwrap();
        assert!(store.is_authenticated(now));

        store.set_token("opaque").unwrap();
        assert!(store.is_authenticated(now), "unreadable tokens are trusted");
    }

    #[test]
    fn invite_is_taken_once() {
        let store = MemoryTokenStore::default();
        store.park_invite("inv-1").unwrap();
        assert_eq!(store.pending_invite().as_deref(), Some("inv-1"));
        assert_eq!(store.take_invite().unwrap().as_deref(), Some("inv-1"));
        assert_eq!(store.take_invite().unwrap(), None);
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = std::env::temp_dir().join(format!("dividi-tokens-{}", std::process::id()));
        let path = dir.join("tokens.json");
        let store = FileTokenStore::load_or_empty(path.clone());
        store.set_token("abc").unwrap();
        store.park_invite("inv").unwrap();

        let reopened = FileTokenStore::load_or_empty(path);
        assert_eq!(reopened.token().as_deref(), Some("abc"));
        assert_eq!(reopened.pending_invite().as_deref(), Some("inv"));
        reopened.clear_token().unwrap();
        assert_eq!(reopened.token(), None);
        let _ = fs::remove_dir_all(dir);
    }
}
