use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{status}: {}", describe_body(.body))]
    Status {
        status: StatusCode,
        /// Parsed JSON body, or the raw text as a JSON string.
        body: Option<serde_json::Value>,
    },
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("request cancelled")]
    Cancelled,
    #[error("token storage error: {0}")]
    Storage(String),
    #[error(transparent)]
    Engine(#[from] engine::EngineError),
    #[error(transparent)]
    Validation(#[from] engine::SplitError),
}

/// Coarse classification of a failure, used to pick the message shown to the
/// user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    Server,
    Validation,
    Cancelled,
    Other,
}

impl ClientError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Network,
            Self::Status { status, .. } => match status.as_u16() {
                400 | 422 => ErrorKind::BadRequest,
                401 => ErrorKind::Unauthorized,
                403 => ErrorKind::Forbidden,
                404 => ErrorKind::NotFound,
                409 => ErrorKind::Conflict,
                500..=599 => ErrorKind::Server,
                _ => ErrorKind::Other,
            },
            Self::Engine(engine::EngineError::Forbidden(_)) => ErrorKind::Forbidden,
            Self::Engine(engine::EngineError::KeyNotFound(_)) => ErrorKind::NotFound,
            Self::Engine(_) | Self::Validation(_) => ErrorKind::Validation,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Decode(_) | Self::InvalidUrl(_) | Self::Storage(_) => ErrorKind::Other,
        }
    }

    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Text the backend put in the error body, if any.
    #[must_use]
    pub fn server_message(&self) -> Option<String> {
        match self {
            Self::Status {
                body: Some(body), ..
            } => body_text(body),
            _ => None,
        }
    }

    /// Message for the user. Validation errors keep their own wording.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::Network => "Network error. Please check your connection.".to_string(),
            ErrorKind::Unauthorized => "Your session has expired. Please log in again.".to_string(),
            ErrorKind::Forbidden => match self {
                Self::Engine(err) => err.to_string(),
                _ => "Access denied. You may not have permission for this action.".to_string(),
            },
            ErrorKind::NotFound => "Not found.".to_string(),
            ErrorKind::BadRequest => match self.server_message() {
                Some(message) => format!("Invalid data: {message}"),
                None => "Invalid data. Please check your input.".to_string(),
            },
            ErrorKind::Conflict => self
                .server_message()
                .unwrap_or_else(|| "Conflict with the current state.".to_string()),
            ErrorKind::Server => "Server error. Please try again later.".to_string(),
            ErrorKind::Validation | ErrorKind::Cancelled | ErrorKind::Other => self.to_string(),
        }
    }
}

fn body_text(body: &serde_json::Value) -> Option<String> {
    match body {
        serde_json::Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        serde_json::Value::Object(_) => {
            serde_json::from_value::<api_types::ErrorResponse>(body.clone())
                .ok()
                .and_then(|err| err.text().map(str::to_string))
        }
        _ => None,
    }
}

fn describe_body(body: &Option<serde_json::Value>) -> String {
    body.as_ref()
        .and_then(body_text)
        .unwrap_or_else(|| "no details".to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn status(code: u16, body: Option<serde_json::Value>) -> ClientError {
        ClientError::Status {
            status: StatusCode::from_u16(code).unwrap(),
            body,
        }
    }

    #[test]
    fn classifies_status_codes() {
        assert_eq!(status(400, None).kind(), ErrorKind::BadRequest);
        assert_eq!(status(401, None).kind(), ErrorKind::Unauthorized);
        assert_eq!(status(403, None).kind(), ErrorKind::Forbidden);
        assert_eq!(status(404, None).kind(), ErrorKind::NotFound);
        assert_eq!(status(409, None).kind(), ErrorKind::Conflict);
        assert_eq!(status(503, None).kind(), ErrorKind::Server);
        assert_eq!(status(418, None).kind(), ErrorKind::Other);
    }

    #[test]
    fn reads_message_from_text_or_json_body() {
        let text = status(400, Some(json!("Error: Entry not found")));
        assert_eq!(text.server_message().as_deref(), Some("Error: Entry not found"));
        assert_eq!(text.user_message(), "Invalid data: Error: Entry not found");

        let object = status(409, Some(json!({"message": "already a member"})));
        assert_eq!(object.server_message().as_deref(), Some("already a member"));
        assert_eq!(object.to_string(), "409 Conflict: already a member");
    }

    #[test]
    fn validation_errors_keep_their_wording() {
        let err = ClientError::from(engine::SplitError::NoPayer);
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.user_message(), "Please select who paid this expense");
    }
}
