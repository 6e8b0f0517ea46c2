use std::collections::HashMap;

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use serde_json::Value;

use crate::source::SourceError;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{error}")]
    Upstream {
        #[source]
        error: SourceError,
        trace: Option<backtrace::Backtrace>,
    },

    #[error("No comments API is configured for this server")]
    SourceNotConfigured,

    #[error("{0}")]
    Unhandled(String, StatusCode),
}

#[derive(Serialize)]
struct ErrorResponse {
    code: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    msg: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    debug_info: Option<HashMap<&'static str, Value>>,
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let (status_code, error_response) = match self {
            Error::Upstream { error, trace } => {
                tracing::error!(%error, "Comments API request failed");
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorResponse {
                        code: "UPSTREAM_ERR".into(),
                        msg: Some("Could not load comments".into()),
                        debug_info: trace.map(|trace| {
                            HashMap::from([
                                (
                                    "backtrace",
                                    serde_json::to_value(filter_backtrace(&trace))
                                        .unwrap_or(Value::Null),
                                ),
                                ("error", Value::String(error.to_string())),
                            ])
                        }),
                    },
                )
            }
            Error::SourceNotConfigured => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse {
                    code: "NO_SOURCE".into(),
                    msg: Some(Error::SourceNotConfigured.to_string()),
                    debug_info: None,
                },
            ),
            Error::Unhandled(msg, status) => (
                status,
                ErrorResponse {
                    code: "ERR".into(),
                    msg: Some(msg),
                    debug_info: None,
                },
            ),
        };

        (status_code, Json(error_response)).into_response()
    }
}

impl From<SourceError> for Error {
    fn from(error: SourceError) -> Self {
        Error::Upstream {
            error,
            trace: cfg!(debug_assertions).then(backtrace::Backtrace::new),
        }
    }
}

impl From<(String, StatusCode)> for Error {
    fn from((msg, status): (String, StatusCode)) -> Self {
        Error::Unhandled(msg, status)
    }
}

#[derive(Serialize, Debug)]
struct FrameInfo {
    name: String,
    loc: String,
}

fn filter_backtrace(backtrace: &backtrace::Backtrace) -> Vec<FrameInfo> {
    const MODULE_PREFIX: &str = concat!(env!("CARGO_CRATE_NAME"), "::");
    let mut frames_info: Vec<FrameInfo> = Vec::new();

    for frame in backtrace.frames() {
        for symbol in frame.symbols() {
            if let (Some(name), Some(filename), Some(lineno)) = (
                symbol.name().map(|n| n.to_string()),
                symbol.filename(),
                symbol.lineno(),
            ) {
                if name.contains(MODULE_PREFIX) {
                    frames_info.push(FrameInfo {
                        name,
                        loc: format!("{}:{}", filename.display(), lineno),
                    });
                }
            }
        }
    }

    frames_info
}

#[cfg(test)]
mod test {
    use super::*;

    async fn render(error: Error) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_unhandled_keeps_status_and_message() {
        let (status, body) = render(
            ("Thread id must be positive".to_string(), StatusCode::BAD_REQUEST).into(),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "ERR");
        assert_eq!(body["msg"], "Thread id must be positive");
        assert!(body.get("debug_info").is_none());
    }

    #[tokio::test]
    async fn test_upstream_error_is_bad_gateway() {
        let error: Error = SourceError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "boom".into(),
        }
        .into();

        let (status, body) = render(error).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], "UPSTREAM_ERR");
    }

    #[tokio::test]
    async fn test_missing_source_is_unavailable() {
        let (status, body) = render(Error::SourceNotConfigured).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "NO_SOURCE");
    }
}
