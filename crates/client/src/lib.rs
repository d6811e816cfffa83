//! Client of the shared-expense backend.
//!
//! [`ApiClient`] speaks the REST contract, [`TokenStore`] keeps the session,
//! and [`LedgerView`] holds the state of an open group with optimistic
//! updates and batch settlement on top of any [`LedgerBackend`].

pub use api::ApiClient;
pub use backend::{InviteBackend, LedgerBackend};
pub use error::{ClientError, ErrorKind, Result};
pub use invite::{InviteOutcome, accept_invite, invite_error_message, resume_pending_invite};
pub use token::{FileTokenStore, MemoryTokenStore, StoredTokens, TokenStore, jwt_expiry};
pub use view::{BATCH_BANNER_TTL, Banner, Cancellation, LedgerView, TOGGLE_BANNER_TTL};

mod api;
mod backend;
pub mod convert;
mod error;
pub mod invite;
mod token;
mod view;
