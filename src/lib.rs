//! # a2a-server — server transport front-end for the Agent-to-Agent (A2A) Protocol v0.3
//!
//! This crate provides the HTTP-facing half of an
//! [A2A protocol](https://a2a-protocol.org/latest/specification/) agent:
//! it parses and validates incoming requests, routes them to your
//! [`server::RequestHandler`] implementation, and renders results, errors
//! and event streams back to the client.
//!
//! ## Overview
//!
//! Two transports are served from one router and share a single dispatch
//! layer:
//! - **JSON-RPC 2.0** at `POST /a2a`, with agent card discovery at
//!   `GET /.well-known/agent.json`
//! - **REST (HTTP+JSON)** resource routes under `/tasks` and `/messages`
//!
//! Both transports stream via Server-Sent Events (SSE). Streaming is
//! demand-driven end to end: the next event is pulled from your handler
//! only after the previous frame has been handed to the client, so a slow
//! consumer exerts backpressure into the agent instead of buffering.
//!
//! Supported operations:
//! - `message/send`, `message/stream`
//! - `tasks/get`, `tasks/list`, `tasks/cancel`, `tasks/subscribe`
//! - `tasks/pushNotificationConfig/{set,get,list,delete}`
//! - `agent/getAuthenticatedExtendedCard`
//!
//! ## Quick Start
//!
//! Implement [`server::RequestHandler`] for your agent, then serve it:
//!
//! ```rust,ignore
//! use a2a_server::server::a2a_router;
//! use a2a_server::AgentCardBuilder;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let agent_card = AgentCardBuilder::new(
//!         "Echo Agent",
//!         "Echoes messages back",
//!         "1.0.0",
//!     )
//!     .with_jsonrpc_interface("http://localhost:3000/a2a")
//!     .with_streaming(true)
//!     .build();
//!
//!     let handler = Arc::new(EchoHandler);
//!     let app = a2a_router(handler, agent_card);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`server::RequestHandler`] — trait your agent implements; one method
//!   per protocol operation
//! - [`server::ServerCallContext`] — per-request identity, tenant and
//!   header snapshot handed to every operation
//! - [`server::StreamWorkerPool`] — bounded pool bridging handler event
//!   streams to SSE frames
//! - [`server::a2a_router`] — builds the combined axum `Router`
//! - [`types`] — protocol data model (tasks, messages, parts, cards)
//! - [`error::A2AError`] — error taxonomy with JSON-RPC error codes

pub mod builders;
pub mod error;
pub mod server;
pub mod types;

/// Prelude module that re-exports commonly used types and traits.
///
/// Import this module with `use a2a_server::prelude::*;` to get access to
/// the most frequently used types without having to import them
/// individually.
pub mod prelude {
    // Core types
    pub use crate::types::{
        AgentCapabilities, AgentCard, AgentInterface, AgentSkill, Artifact, FileContent,
        FileWithBytes, FileWithUri, Message, MessageSendParams, Part, Role, SendMessageResult,
        StreamEvent, Task, TaskArtifactUpdateEvent, TaskState, TaskStatus, TaskStatusUpdateEvent,
    };

    // Error types
    pub use crate::error::{A2AError, A2AResult};

    // Builders
    pub use crate::builders::AgentCardBuilder;

    pub use crate::server::{
        a2a_router, AppState, CallContextFactory, EventStream, Principal, RequestHandler,
        ServerCallContext, StreamWorkerPool,
    };
}

// Re-export core types at crate root for convenience.
pub use builders::AgentCardBuilder;
pub use error::{A2AError, A2AResult};
pub use types::*;
