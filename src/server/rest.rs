//! REST (HTTP+JSON) transport over axum.
//!
//! Resource-oriented routes that reuse the same dispatch layer as the
//! JSON-RPC transport: each route builds the tagged request for its
//! operation and routes it through [`dispatch`]. Results come back as
//! bare JSON bodies (no envelope); errors map onto HTTP status codes
//! with a small `{code, message}` body. The two streaming routes return
//! Server-Sent-Events bodies whose frames are bare event JSON.

use std::any::Any;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tower_http::catch_panic::CatchPanicLayer;
use tracing::{debug, error, warn};

use crate::error::{A2AError, A2AResult};
use crate::server::call_context::ServerCallContext;
use crate::server::dispatch::{dispatch, dispatch_streaming, ResponsePayload};
use crate::server::error_mapper::panic_message;
use crate::server::jsonrpc::sse_response;
use crate::server::request::{
    NonStreamingRequest, RequestId, StreamingRequest, CANCEL_TASK_METHOD,
    DELETE_PUSH_CONFIG_METHOD, GET_EXTENDED_CARD_METHOD, GET_PUSH_CONFIG_METHOD, GET_TASK_METHOD,
    LIST_PUSH_CONFIG_METHOD, LIST_TASKS_METHOD, SEND_MESSAGE_METHOD, SEND_STREAMING_MESSAGE_METHOD,
    SET_PUSH_CONFIG_METHOD, SUBSCRIBE_TO_TASK_METHOD,
};
use crate::server::AppState;
use crate::types::{
    DeleteTaskPushNotificationConfigParams, GetTaskPushNotificationConfigParams,
    ListTaskPushNotificationConfigParams, ListTasksParams, MessageSendParams,
    PushNotificationConfig, TaskIdParams, TaskPushNotificationConfig, TaskQueryParams, TaskState,
};

/// Transport identifier advertised for the REST interface.
pub const REST_TRANSPORT: &str = "HTTP+JSON";

/// Build the REST router.
pub fn rest_router(state: AppState) -> Router {
    Router::new()
        .route("/messages/message:send", post(send_message))
        .route("/messages/message:stream", post(stream_message))
        .route("/tasks", get(list_tasks))
        .route("/tasks/{task_id}", get(get_task))
        .route("/tasks/{task_id}/cancel", post(cancel_task))
        .route("/tasks/{task_id}/subscribe", post(subscribe_to_task))
        .route(
            "/tasks/{task_id}/pushNotificationConfigs",
            get(push_configs_collection).post(set_push_config),
        )
        .route(
            "/tasks/{task_id}/pushNotificationConfigs/{config_id}",
            get(get_push_config).delete(delete_push_config),
        )
        .route("/card", get(agent_card))
        .route("/extendedCard", get(extended_card))
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(state)
}

/// Recover from a panicking handler with a plain internal error body.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    error_response(A2AError::internal_error(format!(
        "request handler panicked: {}",
        panic_message(panic.as_ref())
    )))
}

/// Error body returned by every failing REST route.
#[derive(Debug, Serialize)]
struct RestErrorResponse {
    code: i64,
    message: String,
}

fn status_for(error: &A2AError) -> StatusCode {
    match error {
        A2AError::TaskNotFound { .. } => StatusCode::NOT_FOUND,
        A2AError::ParseError { .. }
        | A2AError::InvalidRequest { .. }
        | A2AError::InvalidParams { .. } => StatusCode::BAD_REQUEST,
        A2AError::UnsupportedOperation { .. }
        | A2AError::PushNotificationNotSupported { .. } => StatusCode::NOT_IMPLEMENTED,
        A2AError::AuthenticatedExtendedCardNotConfigured { .. } => StatusCode::UNAUTHORIZED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: A2AError) -> Response {
    let status = status_for(&error);
    if status.is_server_error() {
        error!("request failed: {}", error);
    } else {
        warn!("request rejected: {}", error);
    }
    let body = RestErrorResponse {
        code: error.code(),
        message: error.to_string(),
    };
    (status, Json(body)).into_response()
}

/// Serialized frame for a terminal stream error.
fn error_frame(error: A2AError) -> String {
    serde_json::json!({
        "code": error.code(),
        "message": error.to_string(),
    })
    .to_string()
}

fn respond(outcome: A2AResult<ResponsePayload>) -> Response {
    match outcome {
        Ok(payload) => match payload.to_value() {
            Ok(value) => Json(value).into_response(),
            Err(err) => error_response(A2AError::internal_error(err.to_string())),
        },
        Err(error) => error_response(error),
    }
}

/// Map a body that failed to deserialize onto the protocol error codes:
/// malformed JSON is a parse error, well-formed JSON of the wrong shape
/// is invalid params.
fn body_error(err: serde_json::Error) -> A2AError {
    match err.classify() {
        serde_json::error::Category::Syntax | serde_json::error::Category::Eof => {
            A2AError::parse_error(err.to_string())
        }
        _ => A2AError::invalid_params(err.to_string()),
    }
}

async fn stream_response(
    state: &AppState,
    request: StreamingRequest,
    context: &ServerCallContext,
) -> Response {
    if !state.agent_card.capabilities.streaming.unwrap_or(false) {
        return error_response(A2AError::invalid_request(
            "streaming is not supported by this agent",
        ));
    }

    match dispatch_streaming(state.handler.as_ref(), request, context).await {
        Ok(source) => {
            let frames = state
                .streams
                .bridge(source, |event| serde_json::to_string(&event), error_frame);
            sse_response(frames)
        }
        Err(error) => error_response(error),
    }
}

async fn send_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    debug!("handling REST message:send");
    let params: MessageSendParams = match serde_json::from_str(&body) {
        Ok(params) => params,
        Err(err) => return error_response(body_error(err)),
    };
    let context = state.context_factory.build(&headers, Some(SEND_MESSAGE_METHOD));
    let outcome = dispatch(
        state.handler.as_ref(),
        NonStreamingRequest::SendMessage {
            id: RequestId::Null,
            params,
        },
        &context,
    )
    .await;
    respond(outcome)
}

async fn stream_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    debug!("handling REST message:stream");
    let params: MessageSendParams = match serde_json::from_str(&body) {
        Ok(params) => params,
        Err(err) => return error_response(body_error(err)),
    };
    let context = state
        .context_factory
        .build(&headers, Some(SEND_STREAMING_MESSAGE_METHOD));
    stream_response(
        &state,
        StreamingRequest::SendStreamingMessage {
            id: RequestId::Null,
            params,
        },
        &context,
    )
    .await
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ListTasksQuery {
    context_id: Option<String>,
    status: Option<TaskState>,
    page_size: Option<i32>,
    page_token: Option<String>,
    history_length: Option<i32>,
    last_updated_after: Option<String>,
    include_artifacts: Option<bool>,
    tenant: Option<String>,
}

impl From<ListTasksQuery> for ListTasksParams {
    fn from(query: ListTasksQuery) -> Self {
        ListTasksParams {
            context_id: query.context_id,
            status: query.status,
            page_size: query.page_size,
            page_token: query.page_token,
            history_length: query.history_length,
            status_timestamp_after: query.last_updated_after,
            include_artifacts: query.include_artifacts,
            tenant: query.tenant,
        }
    }
}

async fn list_tasks(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<ListTasksQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return error_response(A2AError::invalid_params(rejection.body_text())),
    };
    let context = state.context_factory.build(&headers, Some(LIST_TASKS_METHOD));
    let outcome = dispatch(
        state.handler.as_ref(),
        NonStreamingRequest::ListTasks {
            id: RequestId::Null,
            params: query.into(),
        },
        &context,
    )
    .await;
    respond(outcome)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct GetTaskQuery {
    history_length: Option<i32>,
    tenant: Option<String>,
}

async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    headers: HeaderMap,
    query: Result<Query<GetTaskQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return error_response(A2AError::invalid_params(rejection.body_text())),
    };
    let context = state.context_factory.build(&headers, Some(GET_TASK_METHOD));
    let outcome = dispatch(
        state.handler.as_ref(),
        NonStreamingRequest::GetTask {
            id: RequestId::Null,
            params: TaskQueryParams {
                id: task_id,
                history_length: query.history_length,
                metadata: None,
                tenant: query.tenant,
            },
        },
        &context,
    )
    .await;
    respond(outcome)
}

async fn cancel_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let context = state.context_factory.build(&headers, Some(CANCEL_TASK_METHOD));
    let outcome = dispatch(
        state.handler.as_ref(),
        NonStreamingRequest::CancelTask {
            id: RequestId::Null,
            params: TaskIdParams {
                id: task_id,
                metadata: None,
                tenant: None,
            },
        },
        &context,
    )
    .await;
    respond(outcome)
}

async fn subscribe_to_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    debug!("handling REST task subscribe");
    let context = state
        .context_factory
        .build(&headers, Some(SUBSCRIBE_TO_TASK_METHOD));
    stream_response(
        &state,
        StreamingRequest::SubscribeToTask {
            id: RequestId::Null,
            params: TaskIdParams {
                id: task_id,
                metadata: None,
                tenant: None,
            },
        },
        &context,
    )
    .await
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PushConfigPageQuery {
    page_size: Option<i32>,
    page_token: Option<String>,
}

impl PushConfigPageQuery {
    /// Pagination parameters select the list operation; without them the
    /// collection route retrieves the task's single active config.
    fn is_list(&self) -> bool {
        self.page_size.is_some() || self.page_token.is_some()
    }
}

async fn push_configs_collection(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    headers: HeaderMap,
    query: Result<Query<PushConfigPageQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return error_response(A2AError::invalid_params(rejection.body_text())),
    };

    let (method, request) = if query.is_list() {
        (
            LIST_PUSH_CONFIG_METHOD,
            NonStreamingRequest::ListPushConfig {
                id: RequestId::Null,
                params: ListTaskPushNotificationConfigParams {
                    id: task_id,
                    page_size: query.page_size,
                    page_token: query.page_token,
                    metadata: None,
                },
            },
        )
    } else {
        (
            GET_PUSH_CONFIG_METHOD,
            NonStreamingRequest::GetPushConfig {
                id: RequestId::Null,
                params: GetTaskPushNotificationConfigParams {
                    id: task_id,
                    push_notification_config_id: None,
                    metadata: None,
                },
            },
        )
    };

    let context = state.context_factory.build(&headers, Some(method));
    let outcome = dispatch(state.handler.as_ref(), request, &context).await;
    respond(outcome)
}

async fn set_push_config(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let config: PushNotificationConfig = match serde_json::from_str(&body) {
        Ok(config) => config,
        Err(err) => return error_response(body_error(err)),
    };
    let context = state
        .context_factory
        .build(&headers, Some(SET_PUSH_CONFIG_METHOD));
    let outcome = dispatch(
        state.handler.as_ref(),
        NonStreamingRequest::SetPushConfig {
            id: RequestId::Null,
            params: TaskPushNotificationConfig {
                id: config.id.clone(),
                task_id,
                push_notification_config: config,
                tenant: None,
            },
        },
        &context,
    )
    .await;
    respond(outcome)
}

async fn get_push_config(
    State(state): State<AppState>,
    Path((task_id, config_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let context = state
        .context_factory
        .build(&headers, Some(GET_PUSH_CONFIG_METHOD));
    let outcome = dispatch(
        state.handler.as_ref(),
        NonStreamingRequest::GetPushConfig {
            id: RequestId::Null,
            params: GetTaskPushNotificationConfigParams {
                id: task_id,
                push_notification_config_id: Some(config_id),
                metadata: None,
            },
        },
        &context,
    )
    .await;
    respond(outcome)
}

async fn delete_push_config(
    State(state): State<AppState>,
    Path((task_id, config_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let context = state
        .context_factory
        .build(&headers, Some(DELETE_PUSH_CONFIG_METHOD));
    let outcome = dispatch(
        state.handler.as_ref(),
        NonStreamingRequest::DeletePushConfig {
            id: RequestId::Null,
            params: DeleteTaskPushNotificationConfigParams {
                id: task_id,
                push_notification_config_id: config_id,
                metadata: None,
            },
        },
        &context,
    )
    .await;
    // Deletion responds 204 with no body.
    match outcome {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

async fn agent_card(State(state): State<AppState>) -> Response {
    Json(state.agent_card.as_ref().clone()).into_response()
}

async fn extended_card(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let context = state
        .context_factory
        .build(&headers, Some(GET_EXTENDED_CARD_METHOD));
    let outcome = dispatch(
        state.handler.as_ref(),
        NonStreamingRequest::GetExtendedCard { id: RequestId::Null },
        &context,
    )
    .await;
    respond(outcome)
}
