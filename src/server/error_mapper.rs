//! Maps request failures onto the JSON-RPC error taxonomy.
//!
//! Every failure on the request path funnels through [`classify`], which
//! applies a first-match-wins ladder: invalid params, unknown method,
//! bad id, mapping failures (split by root cause into parse vs invalid
//! request), raw syntax errors, then domain errors pass through with
//! their own codes, and anything else is an internal error. Client-side
//! failures log at `warn`, server-side ones at `error`.

use std::any::Any;

use tracing::{error, warn};

use crate::error::A2AError;
use crate::server::request::{ParseFailure, RequestId};

/// A failed request, before mapping.
#[derive(Debug)]
pub enum RequestFailure {
    /// The body never became a tagged request.
    Parse(ParseFailure),
    /// A serde mapping failure outside the envelope parser.
    Mapping {
        /// Correlation id, when one was recovered.
        id: Option<RequestId>,
        /// The underlying serde error.
        source: serde_json::Error,
    },
    /// The handler rejected the operation.
    Domain {
        /// Correlation id of the failed request.
        id: RequestId,
        /// The domain error, passed through with its code.
        error: A2AError,
    },
}

impl From<ParseFailure> for RequestFailure {
    fn from(failure: ParseFailure) -> Self {
        RequestFailure::Parse(failure)
    }
}

/// A classified failure, ready to serialize as a JSON-RPC error response.
#[derive(Debug)]
pub struct ErrorEnvelope {
    /// Correlation id for the response envelope.
    pub id: RequestId,
    /// The mapped error.
    pub error: A2AError,
}

impl ErrorEnvelope {
    /// Render as a complete JSON-RPC 2.0 error response object.
    pub fn to_response_value(&self) -> serde_json::Value {
        let rpc_error: crate::types::JsonRpcError = self.error.clone().into();
        serde_json::json!({
            "jsonrpc": "2.0",
            "id": self.id,
            "error": rpc_error,
        })
    }
}

/// Classify a request failure into an error envelope.
///
/// Classification is idempotent: feeding a domain error through again
/// yields the same envelope.
pub fn classify(failure: RequestFailure) -> ErrorEnvelope {
    match failure {
        RequestFailure::Parse(ParseFailure::InvalidParams { id, message }) => {
            warn!("invalid params in request: {}", message);
            ErrorEnvelope {
                id,
                error: A2AError::invalid_params(message),
            }
        }
        RequestFailure::Parse(ParseFailure::MethodNotFound { id, method }) => {
            warn!("method not found in request: {}", method);
            ErrorEnvelope {
                id,
                error: A2AError::method_not_found(format!("method '{}' not found", method)),
            }
        }
        RequestFailure::Parse(ParseFailure::InvalidId { message }) => {
            warn!("invalid request id: {}", message);
            ErrorEnvelope {
                id: RequestId::Null,
                error: A2AError::invalid_request(message),
            }
        }
        RequestFailure::Mapping { id, source } => {
            warn!("JSON mapping error: {}", source);
            let error = match source.classify() {
                serde_json::error::Category::Syntax | serde_json::error::Category::Eof => {
                    A2AError::parse_error(source.to_string())
                }
                // Valid JSON that does not match the expected shape.
                _ => A2AError::invalid_request(source.to_string()),
            };
            ErrorEnvelope {
                id: id.unwrap_or(RequestId::Null),
                error,
            }
        }
        RequestFailure::Parse(ParseFailure::Syntax { message }) => {
            warn!("JSON syntax error: {}", message);
            ErrorEnvelope {
                id: RequestId::Null,
                error: A2AError::parse_error(message),
            }
        }
        RequestFailure::Parse(ParseFailure::InvalidEnvelope { message }) => {
            warn!("invalid request envelope: {}", message);
            ErrorEnvelope {
                id: RequestId::Null,
                error: A2AError::invalid_request(message),
            }
        }
        RequestFailure::Domain { id, error } => {
            match &error {
                A2AError::InternalError { message, .. } => {
                    error!("internal error processing request: {}", message)
                }
                other => warn!("error processing request: {}", other),
            }
            ErrorEnvelope { id, error }
        }
    }
}

/// Best-effort text for a panic payload.
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error as error_codes;

    #[test]
    fn invalid_params_keeps_id() {
        let envelope = classify(RequestFailure::Parse(ParseFailure::InvalidParams {
            id: RequestId::Number(7),
            message: "missing field `message`".to_string(),
        }));
        assert_eq!(envelope.id, RequestId::Number(7));
        assert_eq!(envelope.error.code(), error_codes::INVALID_PARAMS);
    }

    #[test]
    fn method_not_found_keeps_id() {
        let envelope = classify(RequestFailure::Parse(ParseFailure::MethodNotFound {
            id: RequestId::String("r1".to_string()),
            method: "tasks/frobnicate".to_string(),
        }));
        assert_eq!(envelope.id, RequestId::String("r1".to_string()));
        assert_eq!(envelope.error.code(), error_codes::METHOD_NOT_FOUND);
    }

    #[test]
    fn invalid_id_maps_to_invalid_request_with_null_id() {
        let envelope = classify(RequestFailure::Parse(ParseFailure::InvalidId {
            message: "id must be a string, number or null".to_string(),
        }));
        assert_eq!(envelope.id, RequestId::Null);
        assert_eq!(envelope.error.code(), error_codes::INVALID_REQUEST);
    }

    #[test]
    fn syntax_failure_maps_to_parse_error() {
        let envelope = classify(RequestFailure::Parse(ParseFailure::Syntax {
            message: "expected value at line 1".to_string(),
        }));
        assert_eq!(envelope.id, RequestId::Null);
        assert_eq!(envelope.error.code(), error_codes::PARSE_ERROR);
    }

    #[test]
    fn envelope_failure_maps_to_invalid_request() {
        let envelope = classify(RequestFailure::Parse(ParseFailure::InvalidEnvelope {
            message: "missing 'jsonrpc' version member".to_string(),
        }));
        assert_eq!(envelope.error.code(), error_codes::INVALID_REQUEST);
    }

    #[test]
    fn mapping_failure_split_by_root_cause() {
        let syntax_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let envelope = classify(RequestFailure::Mapping {
            id: None,
            source: syntax_err,
        });
        assert_eq!(envelope.error.code(), error_codes::PARSE_ERROR);

        let data_err =
            serde_json::from_value::<crate::types::TaskIdParams>(serde_json::json!({"nope": 1}))
                .unwrap_err();
        let envelope = classify(RequestFailure::Mapping {
            id: Some(RequestId::Number(3)),
            source: data_err,
        });
        assert_eq!(envelope.id, RequestId::Number(3));
        assert_eq!(envelope.error.code(), error_codes::INVALID_REQUEST);
    }

    #[test]
    fn domain_error_passes_through() {
        let envelope = classify(RequestFailure::Domain {
            id: RequestId::Number(1),
            error: A2AError::task_not_found("no task 't9'"),
        });
        assert_eq!(envelope.error.code(), error_codes::TASK_NOT_FOUND);

        // Classifying again yields the same envelope.
        let again = classify(RequestFailure::Domain {
            id: envelope.id.clone(),
            error: envelope.error.clone(),
        });
        assert_eq!(again.error.code(), error_codes::TASK_NOT_FOUND);
        assert_eq!(again.id, envelope.id);
    }

    #[test]
    fn panic_payload_text() {
        assert_eq!(panic_message(&String::from("boom")), "boom");
        assert_eq!(panic_message(&"boom"), "boom");
        assert_eq!(panic_message(&42usize), "non-string panic payload");
    }

    #[test]
    fn error_envelope_serializes_response() {
        let envelope = classify(RequestFailure::Domain {
            id: RequestId::String("r2".to_string()),
            error: A2AError::unsupported_operation("not implemented"),
        });
        let value = envelope.to_response_value();
        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["id"], "r2");
        assert_eq!(value["error"]["code"], error_codes::UNSUPPORTED_OPERATION);
        assert!(value.get("result").is_none());
    }
}
