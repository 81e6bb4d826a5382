//! Exhaustive routing of tagged requests to the handler.
//!
//! One dispatch function per response mode. Both match exhaustively on
//! the request union, so adding a protocol method without routing it is
//! a compile error, and the response payload union mirrors the request
//! tags one-to-one.

use crate::error::A2AResult;
use crate::server::call_context::ServerCallContext;
use crate::server::handler::{EventStream, RequestHandler};
use crate::server::request::{NonStreamingRequest, StreamingRequest};
use crate::types::*;

/// The result of a non-streaming operation, tagged by origin.
#[derive(Debug, Clone)]
pub enum ResponsePayload {
    /// Result of `message/send`.
    SendMessage(SendMessageResult),
    /// Result of `tasks/get`.
    GetTask(Task),
    /// Result of `tasks/list`.
    ListTasks(TaskList),
    /// Result of `tasks/cancel`.
    CancelTask(Task),
    /// Result of `tasks/pushNotificationConfig/set`.
    SetPushConfig(TaskPushNotificationConfig),
    /// Result of `tasks/pushNotificationConfig/get`.
    GetPushConfig(TaskPushNotificationConfig),
    /// Result of `tasks/pushNotificationConfig/list`.
    ListPushConfig(ListTaskPushNotificationConfigResult),
    /// Result of `tasks/pushNotificationConfig/delete` (no body).
    DeletePushConfig,
    /// Result of `agent/getAuthenticatedExtendedCard`.
    GetExtendedCard(AgentCard),
}

impl ResponsePayload {
    /// Serialize the payload to the JSON value placed in `result`.
    ///
    /// Deletion has no body and serializes as an empty object.
    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            ResponsePayload::SendMessage(inner) => serde_json::to_value(inner),
            ResponsePayload::GetTask(inner) => serde_json::to_value(inner),
            ResponsePayload::ListTasks(inner) => serde_json::to_value(inner),
            ResponsePayload::CancelTask(inner) => serde_json::to_value(inner),
            ResponsePayload::SetPushConfig(inner) => serde_json::to_value(inner),
            ResponsePayload::GetPushConfig(inner) => serde_json::to_value(inner),
            ResponsePayload::ListPushConfig(inner) => serde_json::to_value(inner),
            ResponsePayload::DeletePushConfig => Ok(serde_json::json!({})),
            ResponsePayload::GetExtendedCard(inner) => serde_json::to_value(inner),
        }
    }
}

/// Route a non-streaming request to its handler operation.
pub async fn dispatch(
    handler: &dyn RequestHandler,
    request: NonStreamingRequest,
    context: &ServerCallContext,
) -> A2AResult<ResponsePayload> {
    match request {
        NonStreamingRequest::SendMessage { params, .. } => handler
            .on_message_send(params, context)
            .await
            .map(ResponsePayload::SendMessage),
        NonStreamingRequest::GetTask { params, .. } => handler
            .on_get_task(params, context)
            .await
            .map(ResponsePayload::GetTask),
        NonStreamingRequest::ListTasks { params, .. } => handler
            .on_list_tasks(params, context)
            .await
            .map(ResponsePayload::ListTasks),
        NonStreamingRequest::CancelTask { params, .. } => handler
            .on_cancel_task(params, context)
            .await
            .map(ResponsePayload::CancelTask),
        NonStreamingRequest::SetPushConfig { params, .. } => handler
            .on_set_push_config(params, context)
            .await
            .map(ResponsePayload::SetPushConfig),
        NonStreamingRequest::GetPushConfig { params, .. } => handler
            .on_get_push_config(params, context)
            .await
            .map(ResponsePayload::GetPushConfig),
        NonStreamingRequest::ListPushConfig { params, .. } => handler
            .on_list_push_configs(params, context)
            .await
            .map(ResponsePayload::ListPushConfig),
        NonStreamingRequest::DeletePushConfig { params, .. } => handler
            .on_delete_push_config(params, context)
            .await
            .map(|()| ResponsePayload::DeletePushConfig),
        NonStreamingRequest::GetExtendedCard { .. } => handler
            .on_get_extended_card(context)
            .await
            .map(ResponsePayload::GetExtendedCard),
    }
}

/// Route a streaming request to its handler operation.
pub async fn dispatch_streaming(
    handler: &dyn RequestHandler,
    request: StreamingRequest,
    context: &ServerCallContext,
) -> A2AResult<EventStream> {
    match request {
        StreamingRequest::SendStreamingMessage { params, .. } => {
            handler.on_message_send_stream(params, context).await
        }
        StreamingRequest::SubscribeToTask { params, .. } => {
            handler.on_subscribe_to_task(params, context).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::A2AError;
    use crate::server::call_context::CallContextFactory;
    use crate::server::request::RequestId;
    use async_trait::async_trait;
    use futures::StreamExt;

    struct FixtureHandler;

    #[async_trait]
    impl RequestHandler for FixtureHandler {
        async fn on_message_send(
            &self,
            params: MessageSendParams,
            _context: &ServerCallContext,
        ) -> A2AResult<SendMessageResult> {
            Ok(SendMessageResult::Message(Message::agent(
                "reply-1",
                format!("echo: {}", params.message.message_id),
            )))
        }

        async fn on_message_send_stream(
            &self,
            _params: MessageSendParams,
            _context: &ServerCallContext,
        ) -> A2AResult<EventStream> {
            let events = vec![
                Ok(StreamEvent::Task(Task::new("t1", "ctx1", TaskState::Working))),
                Ok(StreamEvent::StatusUpdate(TaskStatusUpdateEvent::new(
                    "t1",
                    "ctx1",
                    TaskState::Completed,
                    true,
                ))),
            ];
            Ok(futures::stream::iter(events).boxed())
        }

        async fn on_get_task(
            &self,
            params: TaskQueryParams,
            _context: &ServerCallContext,
        ) -> A2AResult<Task> {
            Err(A2AError::task_not_found(params.id))
        }

        async fn on_list_tasks(
            &self,
            _params: ListTasksParams,
            _context: &ServerCallContext,
        ) -> A2AResult<TaskList> {
            Ok(TaskList {
                tasks: vec![],
                next_page_token: String::new(),
                page_size: 0,
                total_size: 0,
            })
        }

        async fn on_cancel_task(
            &self,
            params: TaskIdParams,
            _context: &ServerCallContext,
        ) -> A2AResult<Task> {
            Ok(Task::new(params.id, "ctx1", TaskState::Canceled))
        }

        async fn on_subscribe_to_task(
            &self,
            _params: TaskIdParams,
            _context: &ServerCallContext,
        ) -> A2AResult<EventStream> {
            Ok(futures::stream::empty().boxed())
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
            _params: GetTaskPushNotificationConfigParams,
            _context: &ServerCallContext,
        ) -> A2AResult<TaskPushNotificationConfig> {
            Err(A2AError::push_notification_not_supported("not configured"))
        }

        async fn on_list_push_configs(
            &self,
            _params: ListTaskPushNotificationConfigParams,
            _context: &ServerCallContext,
        ) -> A2AResult<ListTaskPushNotificationConfigResult> {
            Ok(ListTaskPushNotificationConfigResult {
                configs: vec![],
                next_page_token: None,
            })
        }

        async fn on_delete_push_config(
            &self,
            _params: DeleteTaskPushNotificationConfigParams,
            _context: &ServerCallContext,
        ) -> A2AResult<()> {
            Ok(())
        }

        async fn on_get_extended_card(
            &self,
            _context: &ServerCallContext,
        ) -> A2AResult<AgentCard> {
            Err(A2AError::authenticated_extended_card_not_configured(
                "no extended card",
            ))
        }
    }

    fn context() -> ServerCallContext {
        CallContextFactory::new().build(&axum::http::HeaderMap::new(), Some("test"))
    }

    #[tokio::test]
    async fn send_message_routes_and_tags_payload() {
        let params = MessageSendParams {
            message: Message::user("m1", "hi"),
            configuration: None,
            metadata: None,
            tenant: None,
        };
        let payload = dispatch(
            &FixtureHandler,
            NonStreamingRequest::SendMessage {
                id: RequestId::Number(1),
                params,
            },
            &context(),
        )
        .await
        .unwrap();

        match payload {
            ResponsePayload::SendMessage(SendMessageResult::Message(msg)) => {
                assert_eq!(msg.message_id, "reply-1");
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[tokio::test]
    async fn domain_error_propagates() {
        let err = dispatch(
            &FixtureHandler,
            NonStreamingRequest::GetTask {
                id: RequestId::Number(1),
                params: TaskQueryParams {
                    id: "t9".to_string(),
                    history_length: None,
                    metadata: None,
                    tenant: None,
                },
            },
            &context(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, A2AError::TaskNotFound { .. }));
    }

    #[tokio::test]
    async fn delete_serializes_empty_object() {
        let payload = dispatch(
            &FixtureHandler,
            NonStreamingRequest::DeletePushConfig {
                id: RequestId::Number(1),
                params: DeleteTaskPushNotificationConfigParams {
                    id: "t1".to_string(),
                    push_notification_config_id: "c1".to_string(),
                    metadata: None,
                },
            },
            &context(),
        )
        .await
        .unwrap();

        assert_eq!(payload.to_value().unwrap(), serde_json::json!({}));
    }

    #[tokio::test]
    async fn streaming_dispatch_returns_event_stream() {
        let params = MessageSendParams {
            message: Message::user("m1", "hi"),
            configuration: None,
            metadata: None,
            tenant: None,
        };
        let stream = dispatch_streaming(
            &FixtureHandler,
            StreamingRequest::SendStreamingMessage {
                id: RequestId::Number(1),
                params,
            },
            &context(),
        )
        .await
        .unwrap();

        let events: Vec<_> = stream.collect().await;
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[1].as_ref().unwrap(),
            StreamEvent::StatusUpdate(update) if update.r#final
        ));
    }
}
