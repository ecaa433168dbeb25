use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("http request failed with code {0}")]
    Http(StatusCode),
    #[error("{message}{}", code_suffix(.code))]
    Api {
        status: StatusCode,
        message: String,
        code: Option<String>,
        details: Option<String>,
        hint: Option<String>,
    },
    #[error("constraint violation: {0}")]
    Constraint(String),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("failed to deserialize response: {0}")]
    Deserialize(#[from] serde_json::Error),
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Error body returned by the REST backend on non-2xx responses.
#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    hint: Option<String>,
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref().map(|c| format!(" (code {c})")).unwrap_or_default()
}

impl DatabaseError {
    pub(crate) fn from_response(status: StatusCode, body: &[u8]) -> Self {
        match serde_json::from_slice::<ApiErrorBody>(body) {
            Ok(body) => DatabaseError::Api {
                status,
                message: body.message,
                code: body.code,
                details: body.details,
                hint: body.hint,
            },
            Err(_) => DatabaseError::Http(status),
        }
    }

    /// HTTP status of the failed request, when one was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            DatabaseError::Http(status) | DatabaseError::Api { status, .. } => Some(*status),
            DatabaseError::Request(e) => e.status(),
            _ => None,
        }
    }
}

impl From<StatusCode> for DatabaseError {
    fn from(code: StatusCode) -> Self {
        DatabaseError::Http(code)
    }
}
