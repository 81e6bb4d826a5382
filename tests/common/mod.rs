//! Shared test utilities for integration tests.

use std::sync::Arc;

use a2a_server::builders::AgentCardBuilder;
use a2a_server::error::{A2AError, A2AResult};
use a2a_server::server::{a2a_router, EventStream, RequestHandler, ServerCallContext};
use a2a_server::types::{
    AgentCard, DeleteTaskPushNotificationConfigParams, GetTaskPushNotificationConfigParams,
    ListTaskPushNotificationConfigParams, ListTaskPushNotificationConfigResult, ListTasksParams,
    Message, MessageSendParams, Part, PushNotificationConfig, SendMessageResult, StreamEvent,
    Task, TaskIdParams, TaskList, TaskPushNotificationConfig, TaskQueryParams, TaskState,
    TaskStatusUpdateEvent,
};
use async_trait::async_trait;
use futures::StreamExt;

/// A scripted handler with deterministic behavior per operation.
///
/// Task id "missing" does not exist; a message whose text contains
/// "mid-stream" streams one event and then fails; a message whose text
/// contains "panic" panics instead of returning.
pub struct ScriptedHandler {
    pub extended_card: Option<AgentCard>,
}

impl ScriptedHandler {
    pub fn new() -> Self {
        Self {
            extended_card: None,
        }
    }

    pub fn with_extended_card(card: AgentCard) -> Self {
        Self {
            extended_card: Some(card),
        }
    }
}

fn first_text(message: &Message) -> String {
    message
        .parts
        .iter()
        .find_map(|part| match part {
            Part::Text { text, .. } => Some(text.clone()),
            _ => None,
        })
        .unwrap_or_default()
}

fn sample_config(task_id: &str, config_id: Option<&str>) -> TaskPushNotificationConfig {
    TaskPushNotificationConfig {
        id: config_id.map(str::to_string),
        task_id: task_id.to_string(),
        push_notification_config: PushNotificationConfig {
            id: config_id.map(str::to_string),
            url: "https://example.com/hook".to_string(),
            token: None,
            authentication: None,
        },
        tenant: None,
    }
}

#[async_trait]
impl RequestHandler for ScriptedHandler {
    async fn on_message_send(
        &self,
        params: MessageSendParams,
        _context: &ServerCallContext,
    ) -> A2AResult<SendMessageResult> {
        let text = first_text(&params.message);
        if text.contains("panic") {
            panic!("scripted handler failure");
        }
        if text.contains("as-task") {
            return Ok(SendMessageResult::Task(Task::new(
                "task-1",
                "ctx-1",
                TaskState::Working,
            )));
        }
        Ok(SendMessageResult::Message(Message::agent(
            "reply-1",
            format!("Echo: {}", text),
        )))
    }

    async fn on_message_send_stream(
        &self,
        params: MessageSendParams,
        _context: &ServerCallContext,
    ) -> A2AResult<EventStream> {
        let text = first_text(&params.message);
        if text.contains("refuse") {
            return Err(A2AError::unsupported_operation("refused before streaming"));
        }
        let events: Vec<A2AResult<StreamEvent>> = if text.contains("mid-stream") {
            vec![
                Ok(StreamEvent::Task(Task::new("task-1", "ctx-1", TaskState::Working))),
                Err(A2AError::internal_error("stream blew up")),
            ]
        } else {
            vec![
                Ok(StreamEvent::Task(Task::new("task-1", "ctx-1", TaskState::Working))),
                Ok(StreamEvent::StatusUpdate(TaskStatusUpdateEvent::new(
                    "task-1",
                    "ctx-1",
                    TaskState::Completed,
                    true,
                ))),
            ]
        };
        Ok(futures::stream::iter(events).boxed())
    }

    async fn on_get_task(
        &self,
        params: TaskQueryParams,
        _context: &ServerCallContext,
    ) -> A2AResult<Task> {
        if params.id == "missing" {
            return Err(A2AError::task_not_found(format!(
                "no task with id '{}'",
                params.id
            )));
        }
        Ok(Task::new(params.id, "ctx-1", TaskState::Working))
    }

    async fn on_list_tasks(
        &self,
        params: ListTasksParams,
        _context: &ServerCallContext,
    ) -> A2AResult<TaskList> {
        let tasks = vec![Task::new("task-1", "ctx-1", TaskState::Working)];
        Ok(TaskList {
            page_size: params.page_size.unwrap_or(tasks.len() as i32),
            total_size: tasks.len() as i32,
            tasks,
            next_page_token: String::new(),
        })
    }

    async fn on_cancel_task(
        &self,
        params: TaskIdParams,
        _context: &ServerCallContext,
    ) -> A2AResult<Task> {
        if params.id == "missing" {
            return Err(A2AError::task_not_found(format!(
                "no task with id '{}'",
                params.id
            )));
        }
        if params.id == "finished" {
            return Err(A2AError::task_not_cancelable("task already completed"));
        }
        Ok(Task::new(params.id, "ctx-1", TaskState::Canceled))
    }

    async fn on_subscribe_to_task(
        &self,
        params: TaskIdParams,
        _context: &ServerCallContext,
    ) -> A2AResult<EventStream> {
        if params.id == "missing" {
            return Err(A2AError::task_not_found(format!(
                "no task with id '{}'",
                params.id
            )));
        }
        let events: Vec<A2AResult<StreamEvent>> = vec![
            Ok(StreamEvent::StatusUpdate(TaskStatusUpdateEvent::new(
                params.id.clone(),
                "ctx-1",
                TaskState::Working,
                false,
            ))),
            Ok(StreamEvent::StatusUpdate(TaskStatusUpdateEvent::new(
                params.id,
                "ctx-1",
                TaskState::Completed,
                true,
            ))),
        ];
        Ok(futures::stream::iter(events).boxed())
    }

    async fn on_set_push_config(
        &self,
        params: TaskPushNotificationConfig,
        _context: &ServerCallContext,
    ) -> A2AResult<TaskPushNotificationConfig> {
        Ok(params)
    }

    async fn on_get_push_config(
        &self,
        params: GetTaskPushNotificationConfigParams,
        _context: &ServerCallContext,
    ) -> A2AResult<TaskPushNotificationConfig> {
        Ok(sample_config(
            &params.id,
            params.push_notification_config_id.as_deref(),
        ))
    }

    async fn on_list_push_configs(
        &self,
        params: ListTaskPushNotificationConfigParams,
        _context: &ServerCallContext,
    ) -> A2AResult<ListTaskPushNotificationConfigResult> {
        Ok(ListTaskPushNotificationConfigResult {
            configs: vec![sample_config(&params.id, Some("cfg-1"))],
            next_page_token: None,
        })
    }

    async fn on_delete_push_config(
        &self,
        params: DeleteTaskPushNotificationConfigParams,
        _context: &ServerCallContext,
    ) -> A2AResult<()> {
        if params.push_notification_config_id == "missing" {
            return Err(A2AError::task_not_found("no such config"));
        }
        Ok(())
    }

    async fn on_get_extended_card(&self, _context: &ServerCallContext) -> A2AResult<AgentCard> {
        self.extended_card.clone().ok_or_else(|| {
            A2AError::authenticated_extended_card_not_configured(
                "no authenticated extended card available",
            )
        })
    }
}

/// Build a default agent card for testing.
pub fn test_agent_card(url: &str) -> AgentCard {
    AgentCardBuilder::new("Test Echo Agent", "An echo agent for testing", "0.1.0")
        .with_jsonrpc_interface(url)
        .with_rest_interface(url)
        .with_streaming(true)
        .with_skill(
            "echo",
            "Echo",
            "Echoes back messages",
            vec!["test".to_string()],
        )
        .build()
}

/// Build a card with streaming disabled.
pub fn non_streaming_card(url: &str) -> AgentCard {
    AgentCardBuilder::new("Test Echo Agent", "An echo agent for testing", "0.1.0")
        .with_jsonrpc_interface(url)
        .with_streaming(false)
        .build()
}

/// Start a test server on a random port. Returns the base URL and a handle
/// to shut it down.
pub async fn start_test_server(
    handler: Arc<dyn RequestHandler>,
) -> (String, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{}", addr);
    let card = test_agent_card(&format!("{}/a2a", base_url));
    serve(listener, handler, card, base_url).await
}

/// Start a test server with a specific agent card.
pub async fn start_test_server_with_card(
    handler: Arc<dyn RequestHandler>,
    card_for: impl Fn(&str) -> AgentCard,
) -> (String, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{}", addr);
    let card = card_for(&format!("{}/a2a", base_url));
    serve(listener, handler, card, base_url).await
}

async fn serve(
    listener: tokio::net::TcpListener,
    handler: Arc<dyn RequestHandler>,
    card: AgentCard,
    base_url: String,
) -> (String, tokio::task::JoinHandle<()>) {
    let app = a2a_router(handler, card);

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Brief wait for the server to start accepting connections.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    (base_url, handle)
}

/// Helper to build a JSON-RPC request body.
pub fn jsonrpc_request(
    id: serde_json::Value,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params
    })
}

/// Helper to build a message/send request body.
pub fn message_send_request(id: i64, method: &str, text: &str) -> serde_json::Value {
    jsonrpc_request(
        serde_json::json!(id),
        method,
        serde_json::json!({
            "message": {
                "messageId": format!("test-msg-{}", id),
                "role": "user",
                "parts": [{"kind": "text", "text": text}]
            }
        }),
    )
}

/// Parse the `data:` payloads out of a raw SSE body, in order.
pub fn parse_sse_data(body: &str) -> Vec<serde_json::Value> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| serde_json::from_str(data.trim()).unwrap())
        .collect()
}
