//! The collaborator boundary between transports and agent logic.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::A2AResult;
use crate::server::call_context::ServerCallContext;
use crate::types::*;

/// Stream of events produced by a streaming operation.
///
/// The stream is pull-based: the transport polls for the next event only
/// after it has finished forwarding the previous one, so a slow consumer
/// exerts backpressure all the way into the handler. A `Err` item ends
/// the stream from the transport's point of view.
pub type EventStream = BoxStream<'static, A2AResult<StreamEvent>>;

/// Agent-side implementation of the A2A protocol operations.
///
/// The transports parse and validate requests, build the call context and
/// route each method here; implementations supply the domain behavior.
/// Domain failures are reported as [`crate::error::A2AError`] values and
/// surface to clients with their protocol error codes intact.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Handle `message/send`.
    async fn on_message_send(
        &self,
        params: MessageSendParams,
        context: &ServerCallContext,
    ) -> A2AResult<SendMessageResult>;

    /// Handle `message/stream`.
    ///
    /// Returns the event stream to bridge to the client; an error return
    /// fails the request before any event is delivered.
    async fn on_message_send_stream(
        &self,
        params: MessageSendParams,
        context: &ServerCallContext,
    ) -> A2AResult<EventStream>;

    /// Handle `tasks/get`.
    async fn on_get_task(
        &self,
        params: TaskQueryParams,
        context: &ServerCallContext,
    ) -> A2AResult<Task>;

    /// Handle `tasks/list`.
    async fn on_list_tasks(
        &self,
        params: ListTasksParams,
        context: &ServerCallContext,
    ) -> A2AResult<TaskList>;

    /// Handle `tasks/cancel`.
    async fn on_cancel_task(
        &self,
        params: TaskIdParams,
        context: &ServerCallContext,
    ) -> A2AResult<Task>;

    /// Handle `tasks/subscribe`.
    async fn on_subscribe_to_task(
        &self,
        params: TaskIdParams,
        context: &ServerCallContext,
    ) -> A2AResult<EventStream>;

    /// Handle `tasks/pushNotificationConfig/set`.
    async fn on_set_push_config(
        &self,
        params: TaskPushNotificationConfig,
        context: &ServerCallContext,
    ) -> A2AResult<TaskPushNotificationConfig>;

    /// Handle `tasks/pushNotificationConfig/get`.
    async fn on_get_push_config(
        &self,
        params: GetTaskPushNotificationConfigParams,
        context: &ServerCallContext,
    ) -> A2AResult<TaskPushNotificationConfig>;

    /// Handle `tasks/pushNotificationConfig/list`.
    async fn on_list_push_configs(
        &self,
        params: ListTaskPushNotificationConfigParams,
        context: &ServerCallContext,
    ) -> A2AResult<ListTaskPushNotificationConfigResult>;

    /// Handle `tasks/pushNotificationConfig/delete`.
    ///
    /// Deletion has no result body; success serializes as an empty object.
    async fn on_delete_push_config(
        &self,
        params: DeleteTaskPushNotificationConfigParams,
        context: &ServerCallContext,
    ) -> A2AResult<()>;

    /// Handle `agent/getAuthenticatedExtendedCard`.
    async fn on_get_extended_card(&self, context: &ServerCallContext) -> A2AResult<AgentCard>;
}
