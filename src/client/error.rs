use reqwest::StatusCode;
use serde_json::Value;

/// Everything that can go wrong talking to the Echo backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No response was obtained at all
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-2xx response with a `detail` in the body
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Non-2xx response without a usable body
    #[error("HTTP error {status}")]
    Http { status: u16 },

    /// 2xx response whose body didn't match what we expected
    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The request body couldn't be serialized, nothing was sent
    #[error("Invalid request body: {0}")]
    Encode(serde_json::Error),
}

impl ApiError {
    /// Build an error from a failed response's status and raw body.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let status = status.as_u16();
        match serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| detail_message(&v["detail"]))
        {
            Some(message) => ApiError::Api { status, message },
            None => ApiError::Http { status },
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } | ApiError::Http { status } => Some(*status),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            ApiError::Decode(_) | ApiError::Encode(_) => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED.as_u16())
    }
}

// FastAPI sends a plain string for `HTTPException` and a list of
// `{loc, msg, type}` objects for request validation failures.
fn detail_message(detail: &Value) -> Option<String> {
    match detail {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let msgs: Vec<&str> = items.iter().filter_map(|i| i["msg"].as_str()).collect();
            if msgs.is_empty() {
                None
            } else {
                Some(msgs.join("; "))
            }
        }
        _ => None,
    }
}
