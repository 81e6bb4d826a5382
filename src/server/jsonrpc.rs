//! JSON-RPC 2.0 transport over axum.
//!
//! A single `POST /a2a` endpoint serves both response modes: requests for
//! non-streaming methods get one JSON envelope back, streaming methods get
//! a Server-Sent-Events body whose frames are JSON-RPC envelopes carrying
//! the request id. The body is taken as a raw string rather than through
//! an extractor so malformed JSON is answered with the protocol's own
//! ParseError envelope instead of a transport-level rejection.

use std::any::Any;
use std::convert::Infallible;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use futures::stream::BoxStream;
use tower_http::catch_panic::CatchPanicLayer;
use tracing::{debug, warn};

use crate::error::A2AError;
use crate::server::dispatch::{dispatch, dispatch_streaming};
use crate::server::error_mapper::{classify, panic_message, ErrorEnvelope, RequestFailure};
use crate::server::request::{parse_request, A2ARequest, RequestId, StreamingRequest};
use crate::server::AppState;
use crate::types::StreamEvent;

/// Transport identifier advertised for the JSON-RPC interface.
pub const JSONRPC_TRANSPORT: &str = "JSONRPC";

/// Build the JSON-RPC router: the `/a2a` endpoint plus the agent card
/// discovery routes.
pub fn jsonrpc_router(state: AppState) -> Router {
    Router::new()
        .route("/a2a", post(handle_jsonrpc))
        .route("/.well-known/agent.json", get(agent_card))
        .route("/.well-known/agent", get(agent_card_deprecated))
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(state)
}

/// Recover from a panicking handler with an InternalError envelope.
///
/// The request id is lost with the panicked call, so the envelope
/// carries a null id.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let envelope = classify(RequestFailure::Domain {
        id: RequestId::Null,
        error: A2AError::internal_error(format!(
            "request handler panicked: {}",
            panic_message(panic.as_ref())
        )),
    });
    Json(envelope.to_response_value()).into_response()
}

/// Success envelope for a non-streaming result.
fn result_envelope(id: &RequestId, result: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result,
    })
}

async fn handle_jsonrpc(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    debug!("handling JSON-RPC request");

    let request = match parse_request(&body) {
        Ok(request) => request,
        Err(failure) => {
            return Json(classify(failure.into()).to_response_value()).into_response()
        }
    };

    let context = state
        .context_factory
        .build(&headers, Some(request.method()));

    match request {
        A2ARequest::NonStreaming(request) => {
            let id = request.id().clone();
            let outcome = dispatch(state.handler.as_ref(), request, &context).await;
            let envelope = match outcome {
                Ok(payload) => match payload.to_value() {
                    Ok(result) => result_envelope(&id, result),
                    Err(source) => classify(RequestFailure::Mapping {
                        id: Some(id),
                        source,
                    })
                    .to_response_value(),
                },
                Err(error) => classify(RequestFailure::Domain { id, error }).to_response_value(),
            };
            Json(envelope).into_response()
        }
        A2ARequest::Streaming(request) => handle_streaming(state, request, &context).await,
    }
}

async fn handle_streaming(
    state: AppState,
    request: StreamingRequest,
    context: &crate::server::call_context::ServerCallContext,
) -> Response {
    let id = request.id().clone();

    if !state
        .agent_card
        .capabilities
        .streaming
        .unwrap_or(false)
    {
        let envelope = classify(RequestFailure::Domain {
            id,
            error: A2AError::invalid_request("streaming is not supported by this agent"),
        });
        return sse_error_response(envelope);
    }

    match dispatch_streaming(state.handler.as_ref(), request, context).await {
        Ok(source) => {
            let frames = bridge_to_envelopes(&state, id, source);
            sse_response(frames)
        }
        Err(error) => {
            // The request failed before the first event; the error frame
            // is the whole stream.
            let envelope = classify(RequestFailure::Domain { id, error });
            sse_error_response(envelope)
        }
    }
}

/// Bridge an event stream into serialized JSON-RPC envelopes.
fn bridge_to_envelopes(
    state: &AppState,
    id: RequestId,
    source: BoxStream<'static, crate::error::A2AResult<StreamEvent>>,
) -> tokio::sync::mpsc::Receiver<String> {
    let item_id = id.clone();
    state.streams.bridge(
        source,
        move |event| {
            let result = serde_json::to_value(&event)?;
            Ok(result_envelope(&item_id, result).to_string())
        },
        move |error| {
            classify(RequestFailure::Domain {
                id: id.clone(),
                error,
            })
            .to_response_value()
            .to_string()
        },
    )
}

/// Turn a frame channel into an SSE response.
///
/// The connection closing after the last frame is the completion signal;
/// no trailing event is emitted.
pub(crate) fn sse_response(mut frames: tokio::sync::mpsc::Receiver<String>) -> Response {
    let events = async_stream::stream! {
        while let Some(frame) = frames.recv().await {
            yield Ok::<_, Infallible>(Event::default().data(frame));
        }
    };
    Sse::new(events).keep_alive(KeepAlive::default()).into_response()
}

/// An SSE body consisting of a single error envelope frame.
fn sse_error_response(envelope: ErrorEnvelope) -> Response {
    let frame = envelope.to_response_value().to_string();
    let events =
        futures::stream::once(async move { Ok::<_, Infallible>(Event::default().data(frame)) });
    Sse::new(events).keep_alive(KeepAlive::default()).into_response()
}

async fn agent_card(State(state): State<AppState>) -> Response {
    Json(state.agent_card.as_ref().clone()).into_response()
}

async fn agent_card_deprecated(state: State<AppState>) -> Response {
    warn!("deprecated card path /.well-known/agent requested; use /.well-known/agent.json");
    agent_card(state).await
}
