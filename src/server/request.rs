//! JSON-RPC request parsing into tagged A2A requests.
//!
//! The transport hands the raw request body to [`parse_request`], which
//! validates the JSON-RPC 2.0 envelope and produces one typed variant per
//! protocol method. Streaming and non-streaming methods live in separate
//! unions so the dispatcher can reject a streaming method on the
//! synchronous path (and vice versa) by construction.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::types::*;

/// Method name for `message/send`.
pub const SEND_MESSAGE_METHOD: &str = "message/send";
/// Method name for `message/stream`.
pub const SEND_STREAMING_MESSAGE_METHOD: &str = "message/stream";
/// Method name for `tasks/get`.
pub const GET_TASK_METHOD: &str = "tasks/get";
/// Method name for `tasks/list`.
pub const LIST_TASKS_METHOD: &str = "tasks/list";
/// Method name for `tasks/cancel`.
pub const CANCEL_TASK_METHOD: &str = "tasks/cancel";
/// Method name for `tasks/subscribe`.
pub const SUBSCRIBE_TO_TASK_METHOD: &str = "tasks/subscribe";
/// Method name for `tasks/pushNotificationConfig/set`.
pub const SET_PUSH_CONFIG_METHOD: &str = "tasks/pushNotificationConfig/set";
/// Method name for `tasks/pushNotificationConfig/get`.
pub const GET_PUSH_CONFIG_METHOD: &str = "tasks/pushNotificationConfig/get";
/// Method name for `tasks/pushNotificationConfig/list`.
pub const LIST_PUSH_CONFIG_METHOD: &str = "tasks/pushNotificationConfig/list";
/// Method name for `tasks/pushNotificationConfig/delete`.
pub const DELETE_PUSH_CONFIG_METHOD: &str = "tasks/pushNotificationConfig/delete";
/// Method name for `agent/getAuthenticatedExtendedCard`.
pub const GET_EXTENDED_CARD_METHOD: &str = "agent/getAuthenticatedExtendedCard";

/// A JSON-RPC 2.0 request/response correlation ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// String identifier.
    String(String),
    /// Numeric identifier.
    Number(i64),
    /// Null identifier.
    Null,
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::String(s) => write!(f, "{}", s),
            RequestId::Number(n) => write!(f, "{}", n),
            RequestId::Null => write!(f, "null"),
        }
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(n)
    }
}

/// A request whose response is a single JSON-RPC envelope.
#[derive(Debug, Clone)]
pub enum NonStreamingRequest {
    /// `message/send`
    SendMessage {
        /// Correlation id.
        id: RequestId,
        /// Typed parameters.
        params: MessageSendParams,
    },
    /// `tasks/get`
    GetTask {
        /// Correlation id.
        id: RequestId,
        /// Typed parameters.
        params: TaskQueryParams,
    },
    /// `tasks/list`
    ListTasks {
        /// Correlation id.
        id: RequestId,
        /// Typed parameters.
        params: ListTasksParams,
    },
    /// `tasks/cancel`
    CancelTask {
        /// Correlation id.
        id: RequestId,
        /// Typed parameters.
        params: TaskIdParams,
    },
    /// `tasks/pushNotificationConfig/set`
    SetPushConfig {
        /// Correlation id.
        id: RequestId,
        /// Typed parameters.
        params: TaskPushNotificationConfig,
    },
    /// `tasks/pushNotificationConfig/get`
    GetPushConfig {
        /// Correlation id.
        id: RequestId,
        /// Typed parameters.
        params: GetTaskPushNotificationConfigParams,
    },
    /// `tasks/pushNotificationConfig/list`
    ListPushConfig {
        /// Correlation id.
        id: RequestId,
        /// Typed parameters.
        params: ListTaskPushNotificationConfigParams,
    },
    /// `tasks/pushNotificationConfig/delete`
    DeletePushConfig {
        /// Correlation id.
        id: RequestId,
        /// Typed parameters.
        params: DeleteTaskPushNotificationConfigParams,
    },
    /// `agent/getAuthenticatedExtendedCard`
    GetExtendedCard {
        /// Correlation id.
        id: RequestId,
    },
}

impl NonStreamingRequest {
    /// The correlation id of this request.
    pub fn id(&self) -> &RequestId {
        match self {
            NonStreamingRequest::SendMessage { id, .. }
            | NonStreamingRequest::GetTask { id, .. }
            | NonStreamingRequest::ListTasks { id, .. }
            | NonStreamingRequest::CancelTask { id, .. }
            | NonStreamingRequest::SetPushConfig { id, .. }
            | NonStreamingRequest::GetPushConfig { id, .. }
            | NonStreamingRequest::ListPushConfig { id, .. }
            | NonStreamingRequest::DeletePushConfig { id, .. }
            | NonStreamingRequest::GetExtendedCard { id } => id,
        }
    }

    /// The protocol method name of this request.
    pub fn method(&self) -> &'static str {
        match self {
            NonStreamingRequest::SendMessage { .. } => SEND_MESSAGE_METHOD,
            NonStreamingRequest::GetTask { .. } => GET_TASK_METHOD,
            NonStreamingRequest::ListTasks { .. } => LIST_TASKS_METHOD,
            NonStreamingRequest::CancelTask { .. } => CANCEL_TASK_METHOD,
            NonStreamingRequest::SetPushConfig { .. } => SET_PUSH_CONFIG_METHOD,
            NonStreamingRequest::GetPushConfig { .. } => GET_PUSH_CONFIG_METHOD,
            NonStreamingRequest::ListPushConfig { .. } => LIST_PUSH_CONFIG_METHOD,
            NonStreamingRequest::DeletePushConfig { .. } => DELETE_PUSH_CONFIG_METHOD,
            NonStreamingRequest::GetExtendedCard { .. } => GET_EXTENDED_CARD_METHOD,
        }
    }
}

/// A request whose response is a stream of events.
#[derive(Debug, Clone)]
pub enum StreamingRequest {
    /// `message/stream`
    SendStreamingMessage {
        /// Correlation id.
        id: RequestId,
        /// Typed parameters.
        params: MessageSendParams,
    },
    /// `tasks/subscribe`
    SubscribeToTask {
        /// Correlation id.
        id: RequestId,
        /// Typed parameters.
        params: TaskIdParams,
    },
}

impl StreamingRequest {
    /// The correlation id of this request.
    pub fn id(&self) -> &RequestId {
        match self {
            StreamingRequest::SendStreamingMessage { id, .. }
            | StreamingRequest::SubscribeToTask { id, .. } => id,
        }
    }

    /// The protocol method name of this request.
    pub fn method(&self) -> &'static str {
        match self {
            StreamingRequest::SendStreamingMessage { .. } => SEND_STREAMING_MESSAGE_METHOD,
            StreamingRequest::SubscribeToTask { .. } => SUBSCRIBE_TO_TASK_METHOD,
        }
    }
}

/// A parsed A2A request, split by response mode.
#[derive(Debug, Clone)]
pub enum A2ARequest {
    /// Single-envelope response.
    NonStreaming(NonStreamingRequest),
    /// Event-stream response.
    Streaming(StreamingRequest),
}

impl A2ARequest {
    /// The correlation id of this request.
    pub fn id(&self) -> &RequestId {
        match self {
            A2ARequest::NonStreaming(req) => req.id(),
            A2ARequest::Streaming(req) => req.id(),
        }
    }

    /// The protocol method name of this request.
    pub fn method(&self) -> &'static str {
        match self {
            A2ARequest::NonStreaming(req) => req.method(),
            A2ARequest::Streaming(req) => req.method(),
        }
    }
}

/// Why a request body could not be turned into an [`A2ARequest`].
///
/// Each variant corresponds to one rung of the error taxonomy; variants
/// that occur after the id has been recovered carry it so the error
/// envelope can be correlated.
#[derive(Debug, Error)]
pub enum ParseFailure {
    /// The body is not syntactically valid JSON.
    #[error("malformed JSON: {message}")]
    Syntax {
        /// Parser diagnostic.
        message: String,
    },

    /// Valid JSON that is not a JSON-RPC 2.0 request envelope.
    #[error("invalid request: {message}")]
    InvalidEnvelope {
        /// What was wrong with the envelope.
        message: String,
    },

    /// The `id` member is present but not a string, number or null.
    #[error("invalid request id: {message}")]
    InvalidId {
        /// What was wrong with the id.
        message: String,
    },

    /// The method name is not part of the protocol surface.
    #[error("method not found: {method}")]
    MethodNotFound {
        /// Recovered correlation id.
        id: RequestId,
        /// The unknown method name.
        method: String,
    },

    /// The params member does not match the method's parameter schema.
    #[error("invalid params: {message}")]
    InvalidParams {
        /// Recovered correlation id.
        id: RequestId,
        /// Deserializer diagnostic.
        message: String,
    },
}

/// Parse a raw JSON-RPC request body into a tagged [`A2ARequest`].
///
/// Validation proceeds envelope-out: syntax, envelope shape, id, method,
/// then typed params, so the reported failure is always the outermost
/// problem with the request.
pub fn parse_request(body: &str) -> Result<A2ARequest, ParseFailure> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|err| ParseFailure::Syntax {
            message: err.to_string(),
        })?;

    let obj = value.as_object().ok_or_else(|| ParseFailure::InvalidEnvelope {
        message: "request must be a JSON object".to_string(),
    })?;

    match obj.get("jsonrpc").and_then(|v| v.as_str()) {
        Some("2.0") => {}
        Some(other) => {
            return Err(ParseFailure::InvalidEnvelope {
                message: format!("unsupported JSON-RPC version '{}'", other),
            })
        }
        None => {
            return Err(ParseFailure::InvalidEnvelope {
                message: "missing 'jsonrpc' version member".to_string(),
            })
        }
    }

    let id = match obj.get("id") {
        None | Some(serde_json::Value::Null) => RequestId::Null,
        Some(serde_json::Value::String(s)) => RequestId::String(s.clone()),
        Some(serde_json::Value::Number(n)) => match n.as_i64() {
            Some(n) => RequestId::Number(n),
            None => {
                return Err(ParseFailure::InvalidId {
                    message: format!("request id must be an integer, got {}", n),
                })
            }
        },
        Some(other) => {
            return Err(ParseFailure::InvalidId {
                message: format!("request id must be a string, number or null, got {}", other),
            })
        }
    };

    let method = match obj.get("method").and_then(|v| v.as_str()) {
        Some(method) => method,
        None => {
            return Err(ParseFailure::InvalidEnvelope {
                message: "missing 'method' member".to_string(),
            })
        }
    };

    let params = obj.get("params").cloned();

    let request = match method {
        SEND_MESSAGE_METHOD => A2ARequest::NonStreaming(NonStreamingRequest::SendMessage {
            params: typed_params(params, &id)?,
            id,
        }),
        SEND_STREAMING_MESSAGE_METHOD => {
            A2ARequest::Streaming(StreamingRequest::SendStreamingMessage {
                params: typed_params(params, &id)?,
                id,
            })
        }
        GET_TASK_METHOD => A2ARequest::NonStreaming(NonStreamingRequest::GetTask {
            params: typed_params(params, &id)?,
            id,
        }),
        LIST_TASKS_METHOD => A2ARequest::NonStreaming(NonStreamingRequest::ListTasks {
            params: optional_params(params, &id)?,
            id,
        }),
        CANCEL_TASK_METHOD => A2ARequest::NonStreaming(NonStreamingRequest::CancelTask {
            params: typed_params(params, &id)?,
            id,
        }),
        SUBSCRIBE_TO_TASK_METHOD => A2ARequest::Streaming(StreamingRequest::SubscribeToTask {
            params: typed_params(params, &id)?,
            id,
        }),
        SET_PUSH_CONFIG_METHOD => A2ARequest::NonStreaming(NonStreamingRequest::SetPushConfig {
            params: typed_params(params, &id)?,
            id,
        }),
        GET_PUSH_CONFIG_METHOD => A2ARequest::NonStreaming(NonStreamingRequest::GetPushConfig {
            params: typed_params(params, &id)?,
            id,
        }),
        LIST_PUSH_CONFIG_METHOD => A2ARequest::NonStreaming(NonStreamingRequest::ListPushConfig {
            params: typed_params(params, &id)?,
            id,
        }),
        DELETE_PUSH_CONFIG_METHOD => {
            A2ARequest::NonStreaming(NonStreamingRequest::DeletePushConfig {
                params: typed_params(params, &id)?,
                id,
            })
        }
        GET_EXTENDED_CARD_METHOD => {
            A2ARequest::NonStreaming(NonStreamingRequest::GetExtendedCard { id })
        }
        other => {
            return Err(ParseFailure::MethodNotFound {
                id,
                method: other.to_string(),
            })
        }
    };

    Ok(request)
}

/// Deserialize required params, reporting [`ParseFailure::InvalidParams`].
fn typed_params<T: DeserializeOwned>(
    params: Option<serde_json::Value>,
    id: &RequestId,
) -> Result<T, ParseFailure> {
    let value = params.ok_or_else(|| ParseFailure::InvalidParams {
        id: id.clone(),
        message: "missing 'params' member".to_string(),
    })?;
    serde_json::from_value(value).map_err(|err| ParseFailure::InvalidParams {
        id: id.clone(),
        message: err.to_string(),
    })
}

/// Deserialize params for methods where the member may be omitted.
fn optional_params<T: DeserializeOwned + Default>(
    params: Option<serde_json::Value>,
    id: &RequestId,
) -> Result<T, ParseFailure> {
    match params {
        None | Some(serde_json::Value::Null) => Ok(T::default()),
        Some(value) => serde_json::from_value(value).map_err(|err| ParseFailure::InvalidParams {
            id: id.clone(),
            message: err.to_string(),
        }),
    }
}
