//! Server-side transport front-end for the A2A protocol.
//!
//! Two transports share one dispatch layer: the JSON-RPC endpoint at
//! `/a2a` and the resource-oriented REST routes. Both parse and validate
//! their requests into the same tagged unions, build a per-request
//! [`ServerCallContext`], and route every operation to the application's
//! [`RequestHandler`]. Streaming responses from either transport flow
//! through the shared [`StreamWorkerPool`].

pub mod call_context;
pub mod dispatch;
pub mod error_mapper;
pub mod handler;
pub mod jsonrpc;
pub mod request;
pub mod rest;
pub mod stream_bridge;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;

use crate::types::AgentCard;

pub use call_context::{
    CallContextFactory, IdentityResolver, NoIdentity, Principal, ServerCallContext,
    HEADERS_KEY, METHOD_NAME_KEY, X_A2A_EXTENSIONS, X_A2A_VERSION,
};
pub use dispatch::{dispatch, dispatch_streaming, ResponsePayload};
pub use error_mapper::{classify, ErrorEnvelope, RequestFailure};
pub use handler::{EventStream, RequestHandler};
pub use jsonrpc::{jsonrpc_router, JSONRPC_TRANSPORT};
pub use request::{
    parse_request, A2ARequest, NonStreamingRequest, ParseFailure, RequestId, StreamingRequest,
    CANCEL_TASK_METHOD, DELETE_PUSH_CONFIG_METHOD, GET_EXTENDED_CARD_METHOD,
    GET_PUSH_CONFIG_METHOD, GET_TASK_METHOD, LIST_PUSH_CONFIG_METHOD, LIST_TASKS_METHOD,
    SEND_MESSAGE_METHOD, SEND_STREAMING_MESSAGE_METHOD, SET_PUSH_CONFIG_METHOD,
    SUBSCRIBE_TO_TASK_METHOD,
};
pub use rest::{rest_router, REST_TRANSPORT};
pub use stream_bridge::StreamWorkerPool;

/// Default cap on concurrently running stream workers.
pub const DEFAULT_MAX_STREAMS: usize = 64;

/// Shared state behind both transports.
#[derive(Clone)]
pub struct AppState {
    /// The application's protocol handler.
    pub handler: Arc<dyn RequestHandler>,
    /// The card served on the discovery routes; its `capabilities`
    /// gate the streaming methods.
    pub agent_card: Arc<AgentCard>,
    /// Builds the per-request call context.
    pub context_factory: CallContextFactory,
    /// Bounded pool for streaming response workers.
    pub streams: StreamWorkerPool,
}

impl AppState {
    /// State with the default context factory and stream pool.
    pub fn new(handler: Arc<dyn RequestHandler>, agent_card: AgentCard) -> Self {
        Self {
            handler,
            agent_card: Arc::new(agent_card),
            context_factory: CallContextFactory::new(),
            streams: StreamWorkerPool::new(DEFAULT_MAX_STREAMS),
        }
    }

    /// Replace the call context factory.
    pub fn with_context_factory(mut self, factory: CallContextFactory) -> Self {
        self.context_factory = factory;
        self
    }

    /// Replace the stream worker pool.
    pub fn with_stream_pool(mut self, pool: StreamWorkerPool) -> Self {
        self.streams = pool;
        self
    }
}

/// Build a router serving both transports with permissive CORS.
pub fn a2a_router(handler: Arc<dyn RequestHandler>, agent_card: AgentCard) -> Router {
    let state = AppState::new(handler, agent_card);
    a2a_router_with_state(state)
}

/// Build the combined router from preconfigured state.
pub fn a2a_router_with_state(state: AppState) -> Router {
    jsonrpc_router(state.clone())
        .merge(rest_router(state))
        .layer(CorsLayer::permissive())
}
